//! Application settings, read from a JSON file.

use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::chat::DialogueRule;
use crate::classifier::Labels;
use crate::dataset::ImageVectorizer;
use crate::feedforward::{Topology, TrainerConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Neurons per layer, input first.
    pub topology: Vec<usize>,
    /// Category names, indexed like the output layer.
    pub labels: Vec<String>,
    /// Seed for weight initialization and shuffling.
    pub seed: u64,
    pub training: TrainingConfig,
    /// Minimal output activation accepted as a recognized symbol.
    pub confidence_threshold: f64,
    pub weights_path: PathBuf,
    /// Root of the `<label>/<image>` training images.
    pub dataset_dir: PathBuf,
    pub image: ImageConfig,
    pub dialogue: Vec<DialogueRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub learning_rate: f64,
    pub epochs: usize,
    pub acceptable_error: f64,
    /// Total training samples, split evenly between classes.
    pub samples: usize,
    /// Total test samples, split evenly between classes.
    pub test_samples: usize,
    /// Spread per-neuron work of the network over the rayon pool.
    pub parallel: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Images are scaled to `side x side` input neurons.
    pub side: u32,
    pub extension: String,
    pub ink_threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            topology: vec![400, 128, 32, 8],
            labels: [
                "apiary",
                "big_house",
                "cemetery",
                "church",
                "fir",
                "small_house",
                "tower",
                "yurt",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            seed: 42,
            training: TrainingConfig::default(),
            confidence_threshold: 0.5,
            weights_path: PathBuf::from("network.bin"),
            dataset_dir: PathBuf::from("dataset"),
            image: ImageConfig::default(),
            dialogue: Vec::new(),
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.15,
            epochs: 30,
            acceptable_error: 0.01,
            samples: 1040,
            test_samples: 200,
            parallel: true,
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            side: 20,
            extension: "png".to_owned(),
            ink_threshold: 0.1,
        }
    }
}

impl Config {
    /// Reads and validates a config file. Missing fields keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let s = fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&s)
            .with_context(|| format!("invalid config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the network shape fits the images and the labels.
    pub fn validate(&self) -> anyhow::Result<()> {
        let topology = self.topology()?;
        let side = self.image.side as usize;
        ensure!(
            topology.inputs() == side * side,
            "input layer has {} neurons, but {}x{} images give {} values",
            topology.inputs(),
            side,
            side,
            side * side
        );
        ensure!(
            topology.outputs() == self.labels.len(),
            "output layer has {} neurons, but there are {} labels",
            topology.outputs(),
            self.labels.len()
        );
        ensure!(
            self.training.learning_rate > 0.0,
            "learning rate must be positive"
        );
        Ok(())
    }

    pub fn topology(&self) -> anyhow::Result<Topology> {
        Ok(Topology::new(&self.topology)?)
    }

    pub fn labels(&self) -> Labels {
        Labels::new(self.labels.iter().cloned())
    }

    pub fn trainer(&self) -> TrainerConfig {
        TrainerConfig {
            learning_rate: self.training.learning_rate,
            confidence_threshold: self.confidence_threshold,
        }
    }

    pub fn vectorizer(&self) -> ImageVectorizer {
        ImageVectorizer::new(self.image.side, self.image.ink_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_consistent() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.trainer().learning_rate, 0.15);
        assert_eq!(config.labels().name(7), Some("yurt"));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: Config = serde_json::from_str(
            r#"{
                "topology": [16, 6, 2],
                "labels": ["fir", "tower"],
                "image": { "side": 4 },
                "training": { "epochs": 5 },
                "dialogue": [{ "pattern": "HELLO", "reply": "Hi!" }]
            }"#,
        )
        .unwrap();

        config.validate().unwrap();
        assert_eq!(config.training.epochs, 5);
        assert_eq!(config.training.acceptable_error, 0.01);
        assert_eq!(config.image.extension, "png");
        assert_eq!(config.weights_path, PathBuf::from("network.bin"));
        assert_eq!(config.dialogue.len(), 1);
    }

    #[test]
    fn mismatched_shape_is_rejected() {
        let mut config = Config::default();
        config.labels.pop();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.image.side = 10;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.topology = vec![400];
        assert!(config.validate().is_err());
    }
}
