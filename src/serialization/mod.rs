//! Model serialization.
//!
//! Models are described in JSON: an ordered list of layers, each naming its
//! sources. Descriptions can be built into a [`Model`](crate::model::Model)
//! and any model can be described back.
//!
//! # Example
//!
//! ```rust,ignore
//! use net_calculator::serialization::{load_model, ModelDescription};
//!
//! let mut model = load_model("tiny.json")?;
//! let report = model.profile()?;
//!
//! ModelDescription::from_model(&model).save("copy.json")?;
//! ```

pub mod description;

pub use description::{load_model, KindDescription, LayerDescription, ModelDescription, SerializationError};
