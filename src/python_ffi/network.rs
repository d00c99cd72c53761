use pyo3::prelude::*;
use rand::{rngs::StdRng, SeedableRng};

use crate::classifier::Classifier;
use crate::dataset::{Sample, SamplesSet};
use crate::feedforward::{
    LoadError, LogProgress, Net, ProcessError, Topology, TopologyError, TrainError, Trainer,
    TrainerConfig,
};
use crate::Impl_to_PyErr;

/// Trainable network, ready for inference at any time.
#[pyclass]
pub struct Network {
    trainer: Trainer<StdRng>,
}

#[pymethods]
impl Network {
    /// `seed` makes weight initialization and shuffling reproducible.
    #[new]
    pub fn new(
        topology: Vec<usize>,
        learning_rate: Option<f64>,
        confidence_threshold: Option<f64>,
        seed: Option<u64>,
    ) -> Result<Self, TopologyError> {
        let topology = Topology::new(&topology)?;
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let defaults = TrainerConfig::default();
        let config = TrainerConfig {
            learning_rate: learning_rate.unwrap_or(defaults.learning_rate),
            confidence_threshold: confidence_threshold.unwrap_or(defaults.confidence_threshold),
            ..defaults
        };
        let net = Net::new(topology, &mut rng);
        Ok(Self {
            trainer: net.build_trainer(config, rng),
        })
    }

    pub fn topology(&self) -> Vec<usize> {
        self.trainer.net_ref().topology().layers().to_vec()
    }

    pub fn process(&mut self, inputs: Vec<f64>) -> Result<Vec<f64>, ProcessError> {
        Ok(self.trainer.net_mut().process(&inputs)?.to_vec())
    }

    /// Index of the recognized category, `None` when no output is confident enough.
    pub fn predict(&mut self, inputs: Vec<f64>) -> Result<Option<usize>, ProcessError> {
        Ok(Classifier::predict(&mut self.trainer, &inputs)?.category())
    }

    /// Trains on `(inputs, desired_outputs)` pairs, returns the last epoch's mean squared error.
    pub fn train(
        &mut self,
        samples: Vec<(Vec<f64>, Vec<f64>)>,
        epochs_count: usize,
        acceptable_error: f64,
    ) -> Result<f64, TrainError> {
        let mut samples: SamplesSet = samples
            .into_iter()
            .map(|(inputs, desired_outputs)| Sample::new(inputs, desired_outputs))
            .collect();
        self.trainer.train_set(
            &mut samples,
            epochs_count,
            acceptable_error,
            &mut LogProgress::default(),
        )
    }

    /// Fine tunes on one sample, returns the rounds spent.
    pub fn train_sample(
        &mut self,
        inputs: Vec<f64>,
        desired_outputs: Vec<f64>,
        acceptable_error: f64,
    ) -> Result<usize, TrainError> {
        self.trainer
            .train_sample(&Sample::new(inputs, desired_outputs), acceptable_error)
    }

    pub fn save(&self, path: &str) -> PyResult<()> {
        Ok(self.trainer.net_ref().save(path)?)
    }

    pub fn load(&mut self, path: &str) -> Result<(), LoadError> {
        self.trainer.net_mut().load(path)
    }
}

Impl_to_PyErr!(for TopologyError, ProcessError, TrainError, LoadError);
