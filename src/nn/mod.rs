//! # Layer Configurations
//!
//! Kind-specific construction parameters for the layers of a
//! [`Model`](crate::model::Model). Each configuration is a plain value with
//! builder-style setters; it is validated when the layer is added.
//!
//! ## Available Layers
//!
//! - [`Conv2dConfig`]: 2D convolution with stride and weight sparsity
//! - [`LinearConfig`]: Fully connected layer
//! - [`Nonlinearity`]: ReLU, Sigmoid, Tanh
//! - [`PoolConfig`]: Max, average and global pooling
//! - [`DropoutConfig`]: Dropout with a keep probability
//!
//! ## Example
//!
//! ```ignore
//! use net_calculator::model::Model;
//! use net_calculator::nn::{Conv2dConfig, Nonlinearity};
//!
//! let mut model = Model::new();
//! let x = model.input("input", vec![3, 224, 224])?;
//! let x = model.conv2d("conv1", &[x], Conv2dConfig::new(64, (7, 7)).with_stride((2, 2)))?;
//! let x = model.nl("relu1", x, Nonlinearity::Relu)?;
//! ```

pub mod activations;
pub mod conv;
pub mod dropout;
pub mod linear;
pub mod pooling;

pub use activations::Nonlinearity;
pub use conv::Conv2dConfig;
pub use dropout::DropoutConfig;
pub use linear::LinearConfig;
pub use pooling::{PoolConfig, PoolType};

use crate::net::{NetError, NetResult};

fn check_density(layer: &str, what: &str, value: f64) -> NetResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(NetError::InvalidParameter {
            layer: layer.to_string(),
            reason: format!("{} must lie in [0, 1], got {}", what, value),
        })
    }
}
