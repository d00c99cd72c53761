use log::{info, warn};
use rand::{rngs::StdRng, Rng};
use std::{fmt, time::Instant};

use super::{
    buffers::{self, LayerBuffers},
    net::{Net, SizeMismatch},
    progress::{EpochReport, ProgressObserver},
};
use crate::dataset::{Sample, SamplesSet};

/// Upper bound of forward/backward rounds `Trainer::train_sample` spends on one sample.
pub const MAX_SAMPLE_ITERATIONS: usize = 500;

/// Training hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainerConfig {
    /// Step size of every weight update.
    pub learning_rate: f64,
    /// Minimal output activation accepted as a confident classification.
    pub confidence_threshold: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.15,
            confidence_threshold: 0.5,
        }
    }
}

/// Net trainer structure.
///
/// To train Net, error buffers and a random source are needed. We will contain them in this structure.
/// Training procedure will look like this:
/// * One allocates additional buffers by calling `Net::build_trainer`, which will consume `Net`
/// and return `Trainer` object.
/// (Consuming `Net` is needed to prevent one from building another concurrent `Trainer`s.)
/// * Training data is processed via `Trainer::train_set` (full epochs) or `Trainer::train_sample`
/// (fine tuning on one sample). Every sample updates the weights right away.
/// Also, at any time one can call `Trainer::net_mut` to get access to `Net::process`.
/// * Once finished training, one can use `Trainer::teardown` to free the error buffers
/// and get `Net` object back.
///
/// Neither training nor inference may run concurrently on one `Trainer`:
/// both go through the same activation buffers, which `&mut self` enforces.
pub struct Trainer<R = StdRng> {
    /// The network object trainer posesses.
    pub(crate) net: Net,

    /// Error deltas of every layer, same shape as the activations of `net`.
    pub(crate) errors: LayerBuffers,

    pub(crate) config: TrainerConfig,

    /// Source for per-epoch shuffling.
    pub(crate) rng: R,
}

impl<R: Rng> Trainer<R> {
    /// Consumes `Net` and builds `Trainer` object containing it.
    ///
    /// Backpropagation spreads its work over threads whenever `net` does, see `Net::set_parallel`.
    pub(super) fn build(net: Net, config: TrainerConfig, rng: R) -> Trainer<R> {
        let errors = LayerBuffers::new(net.topology(), 0.0);
        Trainer {
            net,
            errors,
            config,
            rng,
        }
    }

    /// Returns reference to contained `Net`.
    pub fn net_ref(&self) -> &Net {
        &self.net
    }

    /// Returns mutable reference to contained `Net`, allowing the use of `Net::process`.
    pub fn net_mut(&mut self) -> &mut Net {
        &mut self.net
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn set_learning_rate(&mut self, learning_rate: f64) {
        self.config.learning_rate = learning_rate;
    }

    /// Error deltas left by the last backpropagation.
    pub fn errors(&self) -> &LayerBuffers {
        &self.errors
    }

    /// Backpropagation of `desired_outputs` against the activations of the last forward pass.
    ///
    /// Runs three passes, each finished before the next starts:
    /// * output deltas: `(desired - output) * output * (1 - output)`;
    /// * hidden deltas, last hidden layer down to the input layer, bias slots included:
    /// `sum_j(next_delta[j] * w[i][j]) * a[i] * (1 - a[i])`;
    /// * weight update of every pair: `w[i][j] += learning_rate * next_delta[j] * a[i]`.
    ///
    /// Since deltas are signed as `desired - output`, adding them descends the squared error.
    /// Bias deltas are never read: nothing feeds into a bias unit.
    fn backpropagate(&mut self, desired_outputs: &[f64]) {
        let parallel = self.net.parallel;
        let last = self.errors.len() - 1;

        let outputs = self.net.activations.neurons(last);
        buffers::fill_indexed(self.errors.neurons_mut(last), parallel, |j| {
            let output = outputs[j];
            (desired_outputs[j] - output) * Net::sigmoid_der_s(output)
        });

        for pair in (0..last).rev() {
            let matrix = &self.net.weights.matrices()[pair];
            let activations = self.net.activations.layer(pair);
            let (current, next) = self.errors.backward_pair(pair);
            let next = &next[..next.len() - 1];

            buffers::fill_indexed(current, parallel, |i| {
                let sum: f64 = next
                    .iter()
                    .enumerate()
                    .map(|(j, &delta)| delta * matrix.at(i, j))
                    .sum();
                sum * Net::sigmoid_der_s(activations[i])
            });
        }

        let learning_rate = self.config.learning_rate;
        for (pair, matrix) in self.net.weights.matrices_mut().iter_mut().enumerate() {
            let activations = self.net.activations.layer(pair);
            let deltas = self.errors.neurons(pair + 1);
            let columns = matrix.columns();

            buffers::for_each_row(matrix.values_mut(), columns, parallel, |i, row| {
                let activation = activations[i];
                for (weight, &delta) in row.iter_mut().zip(deltas.iter()) {
                    *weight += learning_rate * delta * activation;
                }
            });
        }
    }

    /// One forward and backward pass over already validated vectors.
    ///
    /// # Returns
    /// * Squared error of the outputs computed before the update.
    fn step(&mut self, inputs: &[f64], desired_outputs: &[f64]) -> f64 {
        self.net.activations.neurons_mut(0).copy_from_slice(inputs);
        self.net.forward();
        let cost = squared_error(self.net.activations.last(), desired_outputs);
        self.backpropagate(desired_outputs);
        cost
    }

    fn check_sample(&self, inputs: &[f64], desired_outputs: &[f64]) -> Result<(), TrainError> {
        let topology = self.net.topology();
        if inputs.len() != topology.inputs() {
            return Err(TrainError::BadInputs(SizeMismatch {
                expected: topology.inputs(),
                got: inputs.len(),
            }));
        }
        if desired_outputs.len() != topology.outputs() {
            return Err(TrainError::BadDesiredOutputs(SizeMismatch {
                expected: topology.outputs(),
                got: desired_outputs.len(),
            }));
        }
        Ok(())
    }

    /// Checks every sample before any weight is touched, so a run either processes all samples or none.
    fn check_set(&self, samples: &SamplesSet) -> Result<(), TrainError> {
        for (i, sample) in samples.iter().enumerate() {
            self.check_sample(sample.input(), sample.target())
                .map_err(|e| match e {
                    TrainError::BadInputs(SizeMismatch { expected, got }) => {
                        TrainError::WrongSampleInputsCount((i, expected, got))
                    }
                    TrainError::BadDesiredOutputs(SizeMismatch { expected, got }) => {
                        TrainError::WrongSampleDesiredOutputsCount((i, expected, got))
                    }
                    other => other,
                })?;
        }
        Ok(())
    }

    /// Trains on the whole set for up to `epochs_count` epochs.
    ///
    /// Every epoch shuffles `samples` in place, then runs forward and backward passes
    /// over every sample in the new order, updating weights after each one.
    /// Stops early once the epoch's mean squared error drops below `acceptable_error`.
    ///
    /// # Arguments
    /// * `samples` - training set, its order is left shuffled;
    /// * `epochs_count` - epoch budget;
    /// * `acceptable_error` - convergence threshold for the epoch mean squared error;
    /// * `observer` - receives an `EpochReport` after every epoch.
    ///
    /// # Returns
    /// * `Ok(f64)` - mean squared error of the last epoch (`0.0` for an empty set or budget);
    /// * `Err(TrainError)` if some sample has wrong shape (nothing is trained then),
    /// or if the error became NaN or infinite.
    ///
    /// # Examples
    /// ```
    /// # use rand::{rngs::StdRng, SeedableRng};
    /// # use toponet::dataset::{Sample, SamplesSet};
    /// # use toponet::feedforward::{Net, Topology, TrainerConfig};
    /// let topology = Topology::new(&[2, 3, 2]).unwrap();
    /// let net = Net::new(topology, &mut StdRng::seed_from_u64(1));
    /// let mut trainer = net.build_trainer(TrainerConfig::default(), StdRng::seed_from_u64(2));
    ///
    /// let mut samples: SamplesSet = vec![
    ///     Sample::one_hot(vec![0.0, 1.0], 2, 0).unwrap(),
    ///     Sample::one_hot(vec![1.0, 0.0], 2, 1).unwrap(),
    /// ]
    /// .into_iter()
    /// .collect();
    /// let error = trainer.train_set(&mut samples, 10, 0.01, &mut ()).unwrap();
    /// assert!(error.is_finite());
    /// ```
    pub fn train_set<O: ProgressObserver + ?Sized>(
        &mut self,
        samples: &mut SamplesSet,
        epochs_count: usize,
        acceptable_error: f64,
        observer: &mut O,
    ) -> Result<f64, TrainError> {
        self.check_set(samples)?;

        if samples.is_empty() {
            return Ok(0.0);
        }

        let watch = Instant::now();
        let mut epoch_error = 0.0;

        for epoch in 0..epochs_count {
            samples.shuffle(&mut self.rng);

            epoch_error = 0.0;
            for sample in samples.iter() {
                epoch_error += self.step(sample.input(), sample.target());
            }
            epoch_error /= samples.len() as f64;

            observer.on_epoch(&EpochReport {
                epoch,
                fraction: (epoch + 1) as f64 / epochs_count as f64,
                error: epoch_error,
                elapsed: watch.elapsed(),
            });

            if !epoch_error.is_finite() {
                warn!("training diverged at epoch {}", epoch);
                return Err(TrainError::Diverged(epoch));
            }
            if epoch_error < acceptable_error {
                info!(
                    "converged after {} epoch(s): error={:.6} elapsed={:.2?}",
                    epoch + 1,
                    epoch_error,
                    watch.elapsed()
                );
                return Ok(epoch_error);
            }
        }

        if epochs_count > 0 {
            warn!(
                "epoch budget of {} exhausted without converging: error={:.6} (acceptable {})",
                epochs_count, epoch_error, acceptable_error
            );
        }
        Ok(epoch_error)
    }

    /// Fine tunes the network on one sample.
    ///
    /// Repeats forward and backward passes until the sample's squared error drops below
    /// `acceptable_error` or `MAX_SAMPLE_ITERATIONS` rounds were spent.
    ///
    /// # Returns
    /// * `Ok(usize)` - rounds spent, the last one only checks the error if it converged;
    /// * `Err(TrainError)` if the sample has wrong shape.
    pub fn train_sample(&mut self, sample: &Sample, acceptable_error: f64) -> Result<usize, TrainError> {
        let (inputs, desired_outputs) = (sample.input(), sample.target());
        self.check_sample(inputs, desired_outputs)?;

        let mut iterations = 0;
        while iterations < MAX_SAMPLE_ITERATIONS {
            iterations += 1;

            self.net.activations.neurons_mut(0).copy_from_slice(inputs);
            self.net.forward();
            let cost = squared_error(self.net.activations.last(), desired_outputs);
            if cost < acceptable_error {
                break;
            }

            self.backpropagate(desired_outputs);
        }

        Ok(iterations)
    }

    /// Frees training buffers, consuming `Trainer` object, and returns contained `Net` back.
    pub fn teardown(self) -> Net {
        self.net
    }
}

fn squared_error(outputs: &[f64], desired_outputs: &[f64]) -> f64 {
    outputs
        .iter()
        .zip(desired_outputs.iter())
        .map(|(&o, &d)| (d - o) * (d - o))
        .sum()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainError {
    BadInputs(SizeMismatch),
    WrongSampleInputsCount((usize, usize, usize)),
    BadDesiredOutputs(SizeMismatch),
    WrongSampleDesiredOutputsCount((usize, usize, usize)),
    Diverged(usize),
}

impl fmt::Display for TrainError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self {
            TrainError::BadInputs(SizeMismatch { expected, got }) => {
                write!(f, "Expected {} input(s), but got {}!", expected, got)
            }
            TrainError::WrongSampleInputsCount((i, expected, got)) => write!(
                f,
                "Expected {} input(s), but samples[{}] got {}!",
                expected, i, got
            ),
            TrainError::BadDesiredOutputs(SizeMismatch { expected, got }) => write!(
                f,
                "Expected {} desired output(s), but got {}!",
                expected, got
            ),
            TrainError::WrongSampleDesiredOutputsCount((i, expected, got)) => write!(
                f,
                "Expected {} desired output(s), but samples[{}] got {}!",
                expected, i, got
            ),
            TrainError::Diverged(epoch) => write!(
                f,
                "Training error is not a finite number after epoch {}, lower the learning rate!",
                epoch
            ),
        }
    }
}

impl std::error::Error for TrainError {}
