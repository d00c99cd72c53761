//! Capability set shared by every network architecture, and what a classification yields.

use rand::Rng;
use std::{fmt, io, path::Path};

use crate::dataset::SamplesSet;
use crate::feedforward::{LoadError, ProcessError, ProgressObserver, TrainError, Trainer};

/// Outcome of classifying one input vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prediction {
    Category(usize),
    /// No output was confident enough.
    Undefined,
}

impl Prediction {
    /// Picks the most active output if its activation reaches `threshold`.
    ///
    /// Ties go to the lowest index. An empty output or any NaN activation gives `Undefined`.
    ///
    /// # Examples
    /// ```
    /// # use toponet::classifier::Prediction;
    /// assert_eq!(Prediction::from_outputs(&[0.1, 0.8, 0.3], 0.5), Prediction::Category(1));
    /// assert_eq!(Prediction::from_outputs(&[0.1, 0.4, 0.3], 0.5), Prediction::Undefined);
    /// ```
    pub fn from_outputs(outputs: &[f64], threshold: f64) -> Prediction {
        if outputs.iter().any(|o| o.is_nan()) {
            return Prediction::Undefined;
        }

        let mut best: Option<(usize, f64)> = None;
        for (i, &o) in outputs.iter().enumerate() {
            match best {
                Some((_, max)) if max >= o => {}
                _ => best = Some((i, o)),
            }
        }

        match best {
            Some((i, max)) if max >= threshold => Prediction::Category(i),
            _ => Prediction::Undefined,
        }
    }

    pub fn category(self) -> Option<usize> {
        match self {
            Prediction::Category(i) => Some(i),
            Prediction::Undefined => None,
        }
    }
}

/// Human-readable names of the output categories, indexed like the output layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    names: Vec<String>,
}

impl Labels {
    pub fn new<S: Into<String>, I: IntoIterator<Item = S>>(names: I) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Name of a predicted category, `None` for `Undefined` or an index without a name.
    pub fn describe(&self, prediction: Prediction) -> Option<&str> {
        prediction.category().and_then(|i| self.name(i))
    }
}

impl fmt::Display for Labels {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.names.join(", "))
    }
}

/// What a trainable, persistent classifier offers to its callers.
///
/// The training loop and the front end only go through this trait,
/// so another architecture can be swapped in by implementing it.
pub trait Classifier {
    /// Trains on `samples` for up to `epochs_count` epochs, returns the last epoch's mean squared error.
    fn train(
        &mut self,
        samples: &mut SamplesSet,
        epochs_count: usize,
        acceptable_error: f64,
        observer: &mut dyn ProgressObserver,
    ) -> Result<f64, TrainError>;

    fn predict(&mut self, inputs: &[f64]) -> Result<Prediction, ProcessError>;

    fn save(&self, path: &Path) -> io::Result<()>;

    fn load(&mut self, path: &Path) -> Result<(), LoadError>;

    /// Share of labeled samples predicted as their own class. Unlabeled samples are skipped.
    fn test(&mut self, samples: &SamplesSet) -> Result<f64, ProcessError> {
        let mut labeled = 0;
        let mut correct = 0;
        for sample in samples.iter() {
            if let Some(class) = sample.class() {
                labeled += 1;
                if self.predict(sample.input())? == Prediction::Category(class) {
                    correct += 1;
                }
            }
        }

        if labeled == 0 {
            return Ok(0.0);
        }
        Ok(correct as f64 / labeled as f64)
    }
}

impl<R: Rng> Classifier for Trainer<R> {
    fn train(
        &mut self,
        samples: &mut SamplesSet,
        epochs_count: usize,
        acceptable_error: f64,
        observer: &mut dyn ProgressObserver,
    ) -> Result<f64, TrainError> {
        self.train_set(samples, epochs_count, acceptable_error, observer)
    }

    fn predict(&mut self, inputs: &[f64]) -> Result<Prediction, ProcessError> {
        let threshold = self.config().confidence_threshold;
        self.net_mut().classify(inputs, threshold)
    }

    fn save(&self, path: &Path) -> io::Result<()> {
        self.net_ref().save(path)
    }

    fn load(&mut self, path: &Path) -> Result<(), LoadError> {
        self.net_mut().load(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_first_maximum() {
        assert_eq!(
            Prediction::from_outputs(&[0.7, 0.9, 0.9], 0.5),
            Prediction::Category(1)
        );
        assert_eq!(
            Prediction::from_outputs(&[0.5], 0.5),
            Prediction::Category(0)
        );
    }

    #[test]
    fn undefined_when_unsure_or_broken() {
        assert_eq!(Prediction::from_outputs(&[], 0.0), Prediction::Undefined);
        assert_eq!(
            Prediction::from_outputs(&[0.9, f64::NAN], 0.1),
            Prediction::Undefined
        );
        assert_eq!(
            Prediction::from_outputs(&[0.2, 0.3], 0.31),
            Prediction::Undefined
        );
    }

    #[test]
    fn labels_lookup() {
        let labels = Labels::new(vec!["apiary", "fir"]);
        assert_eq!(labels.name(1), Some("fir"));
        assert_eq!(labels.index_of("apiary"), Some(0));
        assert_eq!(labels.describe(Prediction::Category(0)), Some("apiary"));
        assert_eq!(labels.describe(Prediction::Category(5)), None);
        assert_eq!(labels.describe(Prediction::Undefined), None);
        assert_eq!(labels.to_string(), "apiary, fir");
    }
}
