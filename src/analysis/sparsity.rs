//! Static sparsity propagation.
//!
//! Two passes over the model, each a single traversal since the graph is
//! acyclic:
//!
//! ```text
//! forward pass : nodes in reverse order, each pushes onto its sources' activation mask
//! backward pass: nodes in order,         each pushes onto its destinations' error mask
//! ```
//!
//! The forward pass completes before the backward pass starts. Contributions
//! are merged with the OR rule of [`PropagationState`](crate::net::PropagationState),
//! so running the passes twice without resetting keeps accumulating.

use crate::model::Model;
use crate::net::{LayerKind, Net, NodeId};
use crate::nn::PoolType;
use tracing::{debug, info};

pub struct SparsityPropagation;

impl SparsityPropagation {
    pub fn run(model: &mut Model) {
        Self::forward_pass(model);
        Self::backward_pass(model);
        model.mark_propagated();
    }

    /// Fraction of each node's output that its consumers need.
    pub fn forward_pass(model: &mut Model) {
        for id in (0..model.len()).rev() {
            Self::propagate_forward_static_sparsity(model, id);
        }
        info!(layers = model.len(), "forward static sparsity pass done");
    }

    /// Fraction of the back-propagated error that survives upstream layers.
    pub fn backward_pass(model: &mut Model) {
        for id in 0..model.len() {
            Self::propagate_backward_static_sparsity(model, id);
        }
        info!(layers = model.len(), "backward static sparsity pass done");
    }

    fn propagate_forward_static_sparsity(model: &mut Model, id: NodeId) {
        let Ok(net) = model.get_node(id) else { return };
        let Some(p) = Self::forward_contribution(net) else { return };
        let targets = net.sources().to_vec();
        for target in targets {
            if let Ok(source) = model.get_node_mut(target) {
                source.state.mask_activation(p);
                debug!(from = id, to = target, p, "activation mask");
            }
        }
    }

    fn propagate_backward_static_sparsity(model: &mut Model, id: NodeId) {
        let Ok(net) = model.get_node(id) else { return };
        let Some(p) = Self::backward_contribution(net) else { return };
        let targets = net.destinations().to_vec();
        for target in targets {
            if let Ok(destination) = model.get_node_mut(target) {
                destination.state.mask_error(p);
                debug!(from = id, to = target, p, "error mask");
            }
        }
    }

    /// What a node pushes onto its sources' activation masks.
    pub fn forward_contribution(net: &Net) -> Option<f64> {
        match net.kind() {
            LayerKind::Conv2D(_) | LayerKind::FC(_) => Some(1.0),
            LayerKind::Dropout(config) => Some(config.keep_probability),
            LayerKind::Input { .. } | LayerKind::NL(_) | LayerKind::Pool(_) | LayerKind::EleWise => None,
        }
    }

    /// What a node pushes onto its destinations' error masks.
    ///
    /// Reads the node's own error mask, which is final by then because every
    /// upstream node was visited first. Unset counts as 1.0.
    pub fn backward_contribution(net: &Net) -> Option<f64> {
        let em = net.state().error_mask().unwrap_or(1.0);
        match net.kind() {
            LayerKind::Input { .. } => None,
            LayerKind::Conv2D(_) | LayerKind::FC(_) => Some(1.0),
            LayerKind::NL(nl) => Some(nl.error_density() * em),
            LayerKind::Pool(config) => {
                let area = match config.pool_type {
                    PoolType::Global => {
                        let shape = net.input().shape();
                        shape.get(1).copied().unwrap_or(1) as f64 * shape.get(2).copied().unwrap_or(1) as f64
                    }
                    PoolType::Max | PoolType::Average => config.stride.0 as f64 * config.stride.1 as f64,
                };
                Some(1.0 - (1.0 - em).powf(area))
            }
            // Both branches already OR-combined into the node's own mask.
            LayerKind::EleWise => Some(em),
            LayerKind::Dropout(config) => Some(config.keep_probability),
        }
    }
}
