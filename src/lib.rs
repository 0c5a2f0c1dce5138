//! # net-calculator: static cost analysis of neural-network layer graphs
//!
//! Describe a network as a directed acyclic graph of layers and get, without
//! running it, the multiply-accumulate counts of inference, error
//! propagation and weight update, the parameter count and the input volume
//! of every layer. Sparsity is tracked as a density per tensor and pushed
//! through the graph by a two-pass static propagation, so ReLU, dropout,
//! max pooling and sparse weights all shrink the estimates.
//!
//! ## Usage Example
//!
//! ```no_run
//! use net_calculator::model::Model;
//! use net_calculator::nn::{Conv2dConfig, Nonlinearity, PoolConfig};
//!
//! let mut model = Model::new();
//! let x = model.input("input", vec![3, 224, 224]).unwrap();
//! let x = model.conv2d("conv1", &[x], Conv2dConfig::square(64, 3)).unwrap();
//! let x = model.nl("relu1", x, Nonlinearity::Relu).unwrap();
//! model.pool("pool1", x, PoolConfig::max((2, 2), (2, 2))).unwrap();
//!
//! let report = model.profile().unwrap();
//! println!("{}", report);
//! ```

pub mod analysis;
pub mod config;
pub mod model;
pub mod models;
pub mod net;
pub mod nn;
pub mod report;
pub mod serialization;
pub mod tensor;
