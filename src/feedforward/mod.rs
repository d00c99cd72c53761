//! Feedforward sigmoid neural network with backpropagation-based gradient descent training

mod buffers;
pub mod codec;
mod net;
mod progress;
mod topology;
mod trainer;
mod weights;

pub use buffers::LayerBuffers;
pub use codec::{LoadError, Mismatch};
pub use net::*;
pub use progress::*;
pub use topology::*;
pub use trainer::*;
pub use weights::*;
