use rand::Rng;
use std::{error, fmt, io, path::Path};

use super::{
    buffers::{self, LayerBuffers},
    codec::{self, LoadError},
    topology::Topology,
    trainer::{Trainer, TrainerConfig},
    weights::WeightStore,
};
use crate::classifier::Prediction;

/// Neural network structure
pub struct Net {
    /// Weight matrices, one per adjacent layer pair. Also owns the topology.
    pub(super) weights: WeightStore,

    /// Activations of every layer, cached by the last forward pass.
    ///
    /// Allocated once with a bias slot per layer that is always `1.0`.
    /// `Trainer` reads them back during backpropagation, so they must stay untouched
    /// between `Net::forward` and the weight update.
    pub(super) activations: LayerBuffers,

    /// Whether per-neuron work of a layer is spread over the rayon pool.
    pub(super) parallel: bool,
}

impl Net {
    /// Returns network for given topology.
    /// It will have random weights, see `WeightStore::random`.
    ///
    /// # Arguments
    /// * `topology` - network shape;
    /// * `rng` - random source for the initial weights.
    ///
    /// # Examples
    /// ```
    /// # use rand::{rngs::StdRng, SeedableRng};
    /// # use toponet::feedforward::{Net, Topology};
    /// let topology = Topology::new(&[10, 20, 20, 3]).unwrap();
    /// let mut net = Net::new(topology, &mut StdRng::seed_from_u64(1));
    /// ```
    pub fn new<R: Rng + ?Sized>(topology: Topology, rng: &mut R) -> Net {
        Net::with_weights(WeightStore::random(topology, rng))
    }

    /// Returns network using given weights.
    pub fn with_weights(weights: WeightStore) -> Net {
        let activations = LayerBuffers::new(weights.topology(), 1.0);
        Net {
            weights,
            activations,
            parallel: false,
        }
    }

    pub fn topology(&self) -> &Topology {
        self.weights.topology()
    }

    pub fn weights(&self) -> &WeightStore {
        &self.weights
    }

    pub fn weights_mut(&mut self) -> &mut WeightStore {
        &mut self.weights
    }

    /// Activations cached by the last forward pass.
    pub fn activations(&self) -> &LayerBuffers {
        &self.activations
    }

    /// Enables or disables spreading neuron computations across threads.
    pub fn set_parallel(&mut self, parallel: bool) {
        self.parallel = parallel;
    }

    /// Whether forward and backward passes spread neuron computations across threads.
    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Sigmoid function.
    /// Implements the formula:
    /// `1 / (1 + exp(-x))`.
    pub(super) fn sigmoid(x: f64) -> f64 {
        1.0 / (1.0 + (-x).exp())
    }

    /// Sigmoid derivative function, expressed in terms of sigmoid itself.
    /// Implements the formula:
    /// `s * (1 - s)`.
    pub(super) fn sigmoid_der_s(s: f64) -> f64 {
        s * (1.0 - s)
    }

    /// Copies `inputs` into the input layer, bias slot untouched.
    pub(super) fn load_inputs(&mut self, inputs: &[f64]) -> Result<(), SizeMismatch> {
        let input_layer = self.activations.neurons_mut(0);
        if input_layer.len() != inputs.len() {
            return Err(SizeMismatch {
                expected: input_layer.len(),
                got: inputs.len(),
            });
        }
        input_layer.copy_from_slice(inputs);
        Ok(())
    }

    /// Forward propagation over the loaded input layer.
    ///
    /// For every layer pair, in order, each destination neuron `j` gets
    /// `sigmoid(sum_i(prev[i] * w[i][j]))` where `i` runs over the previous layer and its bias.
    pub(super) fn forward(&mut self) {
        let parallel = self.parallel;
        for (pair, matrix) in self.weights.matrices().iter().enumerate() {
            let (prev, next) = self.activations.forward_pair(pair);
            buffers::fill_indexed(next, parallel, |j| {
                let sum: f64 = prev
                    .iter()
                    .enumerate()
                    .map(|(i, &a)| a * matrix.at(i, j))
                    .sum();
                Net::sigmoid(sum)
            });
        }
    }

    /// Calculates output of the network using given input.
    ///
    /// # Arguments
    /// * `inputs` - Slice that holds activations of input neurons.
    ///
    /// # Returns
    /// * `Ok(&[f64])` with activations of output neurons, each in `(0, 1)`;
    /// * `Err(ProcessError)` if amount of inputs is wrong.
    ///
    /// # Examples
    /// ```
    /// # use rand::{rngs::StdRng, SeedableRng};
    /// # use toponet::feedforward::{Net, Topology};
    /// let topology = Topology::new(&[10, 20, 20, 3]).unwrap();
    /// let mut net = Net::new(topology, &mut StdRng::seed_from_u64(1));
    /// let outputs = net.process(&[1.0; 10]).unwrap();
    /// assert_eq!(outputs.len(), 3);
    /// ```
    pub fn process(&mut self, inputs: &[f64]) -> Result<&[f64], ProcessError> {
        self.load_inputs(inputs).map_err(ProcessError::BadInputs)?;
        self.forward();
        Ok(self.activations.last())
    }

    /// Runs `inputs` through the network and picks a category, see `Prediction::from_outputs`.
    pub fn classify(&mut self, inputs: &[f64], threshold: f64) -> Result<Prediction, ProcessError> {
        let outputs = self.process(inputs)?;
        Ok(Prediction::from_outputs(outputs, threshold))
    }

    /// Calculates cost function of an output values given the desired values.
    /// Implements the formula:
    /// `sum((desired - output)^2)`
    ///
    /// # Arguments
    /// * `outputs` - Slice that holds activations of outputs neurons;
    /// * `desired_outputs` - Slice that holds corresponding desired activations.
    ///
    /// # Returns
    /// * `Ok(f64)` if `outputs` and `desired_outputs` have the same size;
    /// * `SizeMismatch` otherwise.
    ///
    /// # Examples
    /// ```
    /// # use toponet::feedforward::Net;
    /// let outputs = [10.0; 1000];
    /// let desired_outputs = [10.25; 1000];
    /// let cost = Net::calc_cost(&outputs, &desired_outputs).unwrap();
    /// assert_eq!(cost, 62.5);
    /// ```
    pub fn calc_cost(outputs: &[f64], desired_outputs: &[f64]) -> Result<f64, SizeMismatch> {
        if outputs.len() != desired_outputs.len() {
            return Err(SizeMismatch {
                expected: outputs.len(),
                got: desired_outputs.len(),
            });
        };

        Ok(outputs
            .iter()
            .zip(desired_outputs.iter())
            .map(|(&a, &b)| (b - a) * (b - a))
            .sum())
    }

    /// Writes topology and weights to `path`, see `codec` for the layout.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        codec::save(&self.weights, path)
    }

    /// Replaces weights with the ones stored at `path`.
    /// Weights stay untouched unless the whole file matches this network's topology.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), LoadError> {
        codec::load(&mut self.weights, path)
    }

    /// Consumes `Net` and builds `Trainer` object containing it.
    /// See `Trainer`'s documentation for details.
    pub fn build_trainer<R: Rng>(self, config: TrainerConfig, rng: R) -> Trainer<R> {
        Trainer::build(self, config, rng)
    }
}

/// Error structure for `Net::process`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    BadInputs(SizeMismatch),
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self {
            ProcessError::BadInputs(SizeMismatch { expected, got }) => {
                write!(f, "Expected {} input(s), but got {}!", expected, got)
            }
        }
    }
}

impl error::Error for ProcessError {}

/// Error structure for collections size mismatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeMismatch {
    pub expected: usize,
    pub got: usize,
}

impl fmt::Display for SizeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Expected {} values, but got {}!",
            self.expected, self.got
        )
    }
}

impl error::Error for SizeMismatch {}
