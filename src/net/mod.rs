//! Layer nodes of the network graph.
//!
//! A [`Net`] is one layer: its identity, its kind (with the kind's
//! construction parameters), the edges to the layers it reads from and the
//! layers that read from it, and the tensors flowing in and out of it.
//! Nodes live in the arena owned by [`Model`](crate::model::Model); edges are
//! plain [`NodeId`] indices into that arena.

use crate::nn::{Conv2dConfig, DropoutConfig, LinearConfig, Nonlinearity, PoolConfig};
use crate::tensor::{clamp_unit, Shape, Tensor, TensorError};
use std::fmt;
use thiserror::Error;

/// Node identifier, the index of the node in its model.
pub type NodeId = usize;

pub type NetResult<T> = std::result::Result<T, NetError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetError {
    #[error("Tensor error: {0}")]
    Tensor(#[from] TensorError),

    #[error("Shape mismatch while concatenating inputs of '{layer}': {source}")]
    ShapeMismatch { layer: String, source: TensorError },

    #[error("Incompatible shapes for '{layer}': {left:?} and {right:?}. \
             Element-wise layers need sources of identical shape.")]
    IncompatibleShapes { layer: String, left: Shape, right: Shape },

    #[error("Invalid rank for '{layer}': expected {expected}D input, got {actual}D.")]
    InvalidRank { layer: String, expected: usize, actual: usize },

    #[error("Layer '{layer}' expects {expected} source(s), got {actual}.")]
    InvalidArity { layer: String, expected: &'static str, actual: usize },

    #[error("Invalid parameter for '{layer}': {reason}")]
    InvalidParameter { layer: String, reason: String },

    #[error("A layer named '{0}' already exists in the model.")]
    DuplicateName(String),

    #[error("Node with ID {0} not found")]
    NodeNotFound(NodeId),

    #[error("No layer named '{0}'")]
    UnknownName(String),

    #[error("Sparsity masks of '{0}' were read before propagation. \
             Call Model::propagate() before evaluating costs.")]
    MasksNotPropagated(String),
}

/// The closed set of layer kinds, each carrying its construction parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    Input { shape: Shape },
    Conv2D(Conv2dConfig),
    FC(LinearConfig),
    NL(Nonlinearity),
    Pool(PoolConfig),
    EleWise,
    Dropout(DropoutConfig),
}

impl LayerKind {
    /// Short tag used in logs, reports and model descriptions.
    pub fn tag(&self) -> &'static str {
        match self {
            LayerKind::Input { .. } => "input",
            LayerKind::Conv2D(_) => "conv2d",
            LayerKind::FC(_) => "fc",
            LayerKind::NL(_) => "nl",
            LayerKind::Pool(_) => "pool",
            LayerKind::EleWise => "elewise",
            LayerKind::Dropout(_) => "dropout",
        }
    }

    /// Checks the kind's own parameters, independently of its inputs.
    pub fn validate(&self, layer: &str) -> NetResult<()> {
        match self {
            LayerKind::Input { shape } => {
                if shape.is_empty() || shape.contains(&0) {
                    return Err(NetError::InvalidParameter {
                        layer: layer.to_string(),
                        reason: format!("input shape {:?} must be non-empty with positive dimensions", shape),
                    });
                }
                Ok(())
            }
            LayerKind::Conv2D(config) => config.validate(layer),
            LayerKind::FC(config) => config.validate(layer),
            LayerKind::Pool(config) => config.validate(layer),
            LayerKind::Dropout(config) => config.validate(layer),
            LayerKind::NL(_) | LayerKind::EleWise => Ok(()),
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A node construction request handed to [`Model::add`](crate::model::Model::add).
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub name: String,
    pub kind: LayerKind,
    pub sources: Vec<NodeId>,
}

impl LayerSpec {
    pub fn new(name: impl Into<String>, kind: LayerKind, sources: Vec<NodeId>) -> Self {
        Self { name: name.into(), kind, sources }
    }

    pub fn input(name: impl Into<String>, shape: Shape) -> Self {
        Self::new(name, LayerKind::Input { shape }, vec![])
    }

    /// Convolution over the channel-wise concatenation of `sources`.
    pub fn conv2d(name: impl Into<String>, sources: Vec<NodeId>, config: Conv2dConfig) -> Self {
        Self::new(name, LayerKind::Conv2D(config), sources)
    }

    /// Fully connected layer over the flattened, concatenated `sources`.
    pub fn fc(name: impl Into<String>, sources: Vec<NodeId>, config: LinearConfig) -> Self {
        Self::new(name, LayerKind::FC(config), sources)
    }

    pub fn nl(name: impl Into<String>, source: NodeId, nl: Nonlinearity) -> Self {
        Self::new(name, LayerKind::NL(nl), vec![source])
    }

    pub fn pool(name: impl Into<String>, source: NodeId, config: PoolConfig) -> Self {
        Self::new(name, LayerKind::Pool(config), vec![source])
    }

    pub fn elewise(name: impl Into<String>, left: NodeId, right: NodeId) -> Self {
        Self::new(name, LayerKind::EleWise, vec![left, right])
    }

    pub fn dropout(name: impl Into<String>, source: NodeId, config: DropoutConfig) -> Self {
        Self::new(name, LayerKind::Dropout(config), vec![source])
    }
}

/// Static sparsity masks filled in by the propagation engine.
///
/// `None` means no contribution has reached the node yet.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PropagationState {
    activation_mask: Option<f64>,
    error_mask: Option<f64>,
}

impl PropagationState {
    pub fn activation_mask(&self) -> Option<f64> {
        self.activation_mask
    }

    pub fn error_mask(&self) -> Option<f64> {
        self.error_mask
    }

    pub fn mask_activation(&mut self, p: f64) {
        self.activation_mask = Some(or_combine(self.activation_mask, p));
    }

    pub fn mask_error(&mut self, p: f64) {
        self.error_mask = Some(or_combine(self.error_mask, p));
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Independent-event OR: the first contribution is taken as is, later ones
/// give `1 - (1 - mask)(1 - p)`.
pub fn or_combine(mask: Option<f64>, p: f64) -> f64 {
    let p = clamp_unit(p);
    match mask {
        None => p,
        Some(m) => clamp_unit(1.0 - (1.0 - m) * (1.0 - p)),
    }
}

/// One layer of the network graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Net {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) kind: LayerKind,
    pub(crate) sources: Vec<NodeId>,
    pub(crate) destinations: Vec<NodeId>,
    pub(crate) input: Tensor,
    pub(crate) output: Tensor,
    pub(crate) state: PropagationState,
}

impl Net {
    pub(crate) fn new(
        id: NodeId,
        spec: LayerSpec,
        input: Tensor,
        output: Tensor,
    ) -> Self {
        Self {
            id,
            name: spec.name,
            kind: spec.kind,
            sources: spec.sources,
            destinations: Vec::new(),
            input,
            output,
            state: PropagationState::default(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &LayerKind {
        &self.kind
    }

    pub fn sources(&self) -> &[NodeId] {
        &self.sources
    }

    pub fn destinations(&self) -> &[NodeId] {
        &self.destinations
    }

    /// The sources merged the way this kind consumes them.
    pub fn input(&self) -> &Tensor {
        &self.input
    }

    pub fn output(&self) -> &Tensor {
        &self.output
    }

    pub fn state(&self) -> &PropagationState {
        &self.state
    }

    pub fn is_sink(&self) -> bool {
        self.destinations.is_empty()
    }
}
