//! JSON model descriptions.
//!
//! A description lists the layers of a model in order, each naming its
//! sources by layer name:
//!
//! ```json
//! {
//!   "name": "tiny",
//!   "layers": [
//!     { "name": "input", "kind": "input", "shape": [3, 32, 32] },
//!     { "name": "conv1", "kind": "conv2d", "sources": ["input"],
//!       "out_channels": 16, "kernel": [3, 3], "stride": [1, 1] },
//!     { "name": "relu1", "kind": "nl", "sources": ["conv1"], "function": "relu" },
//!     { "name": "pool1", "kind": "pool", "sources": ["relu1"],
//!       "pool_type": "max", "pool_size": [2, 2], "stride": [2, 2] },
//!     { "name": "drop", "kind": "dropout", "sources": ["pool1"], "keep_probability": 0.5 },
//!     { "name": "fc", "kind": "fc", "sources": ["drop"], "neurons": 10 }
//!   ]
//! }
//! ```

use crate::model::Model;
use crate::net::{LayerKind, LayerSpec, NetError, NodeId};
use crate::nn::{Conv2dConfig, DropoutConfig, LinearConfig, Nonlinearity, PoolConfig, PoolType};
use crate::tensor::Shape;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Model error: {0}")]
    NetError(#[from] NetError),
}

type Result<T> = std::result::Result<T, SerializationError>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelDescription {
    #[serde(default)]
    pub name: Option<String>,
    pub layers: Vec<LayerDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDescription {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(flatten)]
    pub kind: KindDescription,
}

/// Kind-specific fields, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum KindDescription {
    Input {
        shape: Shape,
    },
    Conv2d {
        out_channels: usize,
        kernel: Vec<usize>,
        #[serde(default = "unit_stride")]
        stride: Vec<usize>,
        #[serde(default = "dense")]
        weight_sparsity: f64,
    },
    Fc {
        neurons: usize,
        #[serde(default = "dense")]
        weight_sparsity: f64,
    },
    Nl {
        function: String,
    },
    Pool {
        pool_type: String,
        #[serde(default = "unit_stride")]
        pool_size: Vec<usize>,
        #[serde(default = "unit_stride")]
        stride: Vec<usize>,
    },
    Elewise,
    Dropout {
        keep_probability: f64,
    },
}

fn unit_stride() -> Vec<usize> {
    vec![1, 1]
}

fn dense() -> f64 {
    1.0
}

impl ModelDescription {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path.as_ref(), self.to_json()?)?;
        Ok(())
    }

    /// Describes an existing model.
    pub fn from_model(model: &Model) -> Self {
        let layers = model
            .iter()
            .map(|net| LayerDescription {
                name: net.name().to_string(),
                sources: net
                    .sources()
                    .iter()
                    .filter_map(|&id| model.get_node(id).ok().map(|s| s.name().to_string()))
                    .collect(),
                kind: KindDescription::from(net.kind()),
            })
            .collect();
        Self { name: None, layers }
    }

    /// Adds every layer, in order, to a fresh model.
    pub fn build(&self) -> Result<Model> {
        let mut model = Model::new();
        for layer in &self.layers {
            let sources = layer
                .sources
                .iter()
                .map(|name| model.id_of(name))
                .collect::<std::result::Result<Vec<NodeId>, NetError>>()?;
            let kind = layer.kind.to_layer_kind(&layer.name)?;
            model.add(LayerSpec::new(layer.name.clone(), kind, sources))?;
        }
        info!(
            model = self.name.as_deref().unwrap_or("unnamed"),
            layers = model.len(),
            "model description loaded"
        );
        Ok(model)
    }
}

impl KindDescription {
    fn to_layer_kind(&self, layer: &str) -> std::result::Result<LayerKind, NetError> {
        let invalid = |reason: String| NetError::InvalidParameter {
            layer: layer.to_string(),
            reason,
        };
        let pair = |what: &str, values: &[usize]| match values {
            [a, b] => Ok((*a, *b)),
            _ => Err(invalid(format!("{} needs exactly 2 values, got {:?}", what, values))),
        };

        Ok(match self {
            KindDescription::Input { shape } => LayerKind::Input { shape: shape.clone() },
            KindDescription::Conv2d { out_channels, kernel, stride, weight_sparsity } => {
                LayerKind::Conv2D(
                    Conv2dConfig::new(*out_channels, pair("kernel", kernel)?)
                        .with_stride(pair("stride", stride)?)
                        .with_weight_sparsity(*weight_sparsity),
                )
            }
            KindDescription::Fc { neurons, weight_sparsity } => {
                LayerKind::FC(LinearConfig::new(*neurons).with_weight_sparsity(*weight_sparsity))
            }
            KindDescription::Nl { function } => {
                LayerKind::NL(function.parse::<Nonlinearity>().map_err(invalid)?)
            }
            KindDescription::Pool { pool_type, pool_size, stride } => {
                let pool_type = pool_type.parse::<PoolType>().map_err(invalid)?;
                LayerKind::Pool(PoolConfig::new(pool_type, pair("pool_size", pool_size)?, pair("stride", stride)?))
            }
            KindDescription::Elewise => LayerKind::EleWise,
            KindDescription::Dropout { keep_probability } => {
                LayerKind::Dropout(DropoutConfig::new(*keep_probability))
            }
        })
    }
}

impl From<&LayerKind> for KindDescription {
    fn from(kind: &LayerKind) -> Self {
        match kind {
            LayerKind::Input { shape } => KindDescription::Input { shape: shape.clone() },
            LayerKind::Conv2D(c) => KindDescription::Conv2d {
                out_channels: c.out_channels,
                kernel: vec![c.kernel_size.0, c.kernel_size.1],
                stride: vec![c.stride.0, c.stride.1],
                weight_sparsity: c.weight_sparsity,
            },
            LayerKind::FC(c) => KindDescription::Fc {
                neurons: c.neurons,
                weight_sparsity: c.weight_sparsity,
            },
            LayerKind::NL(nl) => KindDescription::Nl { function: nl.to_string() },
            LayerKind::Pool(c) => KindDescription::Pool {
                pool_type: c.pool_type.to_string(),
                pool_size: vec![c.pool_size.0, c.pool_size.1],
                stride: vec![c.stride.0, c.stride.1],
            },
            LayerKind::EleWise => KindDescription::Elewise,
            LayerKind::Dropout(c) => KindDescription::Dropout {
                keep_probability: c.keep_probability,
            },
        }
    }
}

/// Loads a description file and builds the model it describes.
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Model> {
    ModelDescription::load(path)?.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TINY: &str = r#"{
        "name": "tiny",
        "layers": [
            { "name": "input", "kind": "input", "shape": [3, 32, 32] },
            { "name": "conv1", "kind": "conv2d", "sources": ["input"],
              "out_channels": 16, "kernel": [3, 3] },
            { "name": "relu1", "kind": "nl", "sources": ["conv1"], "function": "relu" },
            { "name": "pool1", "kind": "pool", "sources": ["relu1"],
              "pool_type": "max", "pool_size": [2, 2], "stride": [2, 2] },
            { "name": "drop", "kind": "dropout", "sources": ["pool1"], "keep_probability": 0.5 },
            { "name": "fc", "kind": "fc", "sources": ["drop"], "neurons": 10 }
        ]
    }"#;

    #[test]
    fn test_build_from_json() {
        let model = ModelDescription::from_json(TINY).unwrap().build().unwrap();
        assert_eq!(model.len(), 6);
        assert_eq!(model.find("pool1").unwrap().output().shape(), &[16, 16, 16]);
        assert_eq!(model.find("fc").unwrap().input().shape(), &[4096]);
    }

    #[test]
    fn test_describe_round_trips_structure() {
        let model = ModelDescription::from_json(TINY).unwrap().build().unwrap();
        let described = ModelDescription::from_model(&model);
        let rebuilt = described.build().unwrap();

        assert_eq!(rebuilt.len(), model.len());
        for (a, b) in model.iter().zip(rebuilt.iter()) {
            assert_eq!(a.name(), b.name());
            assert_eq!(a.kind(), b.kind());
            assert_eq!(a.output(), b.output());
        }
    }

    #[test]
    fn test_unknown_source_name() {
        let json = r#"{ "layers": [ { "name": "relu", "kind": "nl", "sources": ["nope"], "function": "relu" } ] }"#;
        let err = ModelDescription::from_json(json).unwrap().build().unwrap_err();
        assert!(matches!(err, SerializationError::NetError(NetError::UnknownName(_))));
    }

    #[test]
    fn test_malformed_kernel_rank() {
        let json = r#"{ "layers": [
            { "name": "input", "kind": "input", "shape": [3, 8, 8] },
            { "name": "conv", "kind": "conv2d", "sources": ["input"], "out_channels": 4, "kernel": [3, 3, 3] }
        ] }"#;
        let err = ModelDescription::from_json(json).unwrap().build().unwrap_err();
        assert!(matches!(err, SerializationError::NetError(NetError::InvalidParameter { .. })));
    }

    #[test]
    fn test_unknown_kind_is_a_json_error() {
        let json = r#"{ "layers": [ { "name": "x", "kind": "lstm" } ] }"#;
        assert!(matches!(
            ModelDescription::from_json(json),
            Err(SerializationError::JsonError(_))
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.json");
        ModelDescription::from_json(TINY).unwrap().save(&path).unwrap();

        let model = load_model(&path).unwrap();
        assert_eq!(model.find("conv1").unwrap().output().shape(), &[16, 32, 32]);
    }
}
