//! Sigmoid multilayer perceptron for recognizing map symbols on small bitmaps,
//! with the dataset, persistence and chat pieces around it.

pub mod chat;
pub mod classifier;
pub mod config;
pub mod dataset;
pub mod feedforward;

#[cfg(feature = "python")]
pub mod python_ffi;
