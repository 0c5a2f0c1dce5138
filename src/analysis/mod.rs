//! # Graph Analysis Module
//!
//! Static passes over a [`Model`](crate::model::Model). Nothing here touches
//! real tensor data.
//!
//! ## Available Passes
//!
//! - [`ShapeInference`](shape_inference::ShapeInference): input/output tensors
//!   of a layer, run once when the layer is added.
//! - [`SparsityPropagation`](sparsity::SparsityPropagation): the two static
//!   sparsity passes filling activation and error masks.
//! - [`CostModel`](cost::CostModel): parameter and MAC counts, discounted by
//!   densities and masks.
//!
//! ## How It Works
//!
//! ```text
//! Model::add -> Shape Inference -> Model (tensors) -> Sparsity Propagation -> Cost Model
//! ```
//!
//! ## Example
//!
//! ```ignore
//! let mut model = net_calculator::models::vgg11()?;
//! model.propagate();
//! let macs = model.inference_mac_count(model.id_of("conv1")?)?;
//! ```

pub mod cost;
pub mod shape_inference;
pub mod sparsity;
