//! The layer graph.
//!
//! A [`Model`] owns every [`Net`] of a network in an insertion-ordered arena.
//! A layer can only name layers that already exist as its sources, so the
//! insertion order is always a valid topological order and no cycle check is
//! ever needed.

use crate::analysis::cost::{CostModel, LayerCost};
use crate::analysis::sparsity::SparsityPropagation;
use crate::analysis::shape_inference::ShapeInference;
use crate::net::{LayerSpec, Net, NetError, NetResult, NodeId};
use crate::nn::{Conv2dConfig, DropoutConfig, LinearConfig, Nonlinearity, PoolConfig};
use crate::report::Report;
use crate::tensor::{Shape, Tensor};
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct Model {
    nodes: Vec<Net>,
    names: HashMap<String, NodeId>,
    propagated: bool,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a layer built from `spec` and returns its ID.
    ///
    /// Shapes are inferred here. On any error the model is left exactly as it
    /// was: no partially built node is ever stored.
    pub fn add(&mut self, spec: LayerSpec) -> NetResult<NodeId> {
        if self.names.contains_key(&spec.name) {
            return Err(NetError::DuplicateName(spec.name));
        }
        spec.kind.validate(&spec.name)?;

        let inputs = spec
            .sources
            .iter()
            .map(|&id| self.get_node(id).map(Net::output))
            .collect::<NetResult<Vec<&Tensor>>>()?;
        let (input, output) = ShapeInference::infer(&spec.name, &spec.kind, &inputs)?;

        // Masks computed for the old graph do not describe the new one.
        if self.propagated {
            self.reset_masks();
        }

        let id = self.nodes.len();
        for &source in &spec.sources {
            self.nodes[source].destinations.push(id);
        }
        self.names.insert(spec.name.clone(), id);

        let net = Net::new(id, spec, input, output);
        debug!(layer = %net.name, kind = %net.kind, output = %net.output, "layer added");
        self.nodes.push(net);
        Ok(id)
    }

    pub fn input(&mut self, name: &str, shape: Shape) -> NetResult<NodeId> {
        self.add(LayerSpec::input(name, shape))
    }

    pub fn conv2d(&mut self, name: &str, sources: &[NodeId], config: Conv2dConfig) -> NetResult<NodeId> {
        self.add(LayerSpec::conv2d(name, sources.to_vec(), config))
    }

    pub fn fc(&mut self, name: &str, sources: &[NodeId], config: LinearConfig) -> NetResult<NodeId> {
        self.add(LayerSpec::fc(name, sources.to_vec(), config))
    }

    pub fn nl(&mut self, name: &str, source: NodeId, nl: Nonlinearity) -> NetResult<NodeId> {
        self.add(LayerSpec::nl(name, source, nl))
    }

    pub fn pool(&mut self, name: &str, source: NodeId, config: PoolConfig) -> NetResult<NodeId> {
        self.add(LayerSpec::pool(name, source, config))
    }

    pub fn elewise(&mut self, name: &str, left: NodeId, right: NodeId) -> NetResult<NodeId> {
        self.add(LayerSpec::elewise(name, left, right))
    }

    pub fn dropout(&mut self, name: &str, source: NodeId, keep_probability: f64) -> NetResult<NodeId> {
        self.add(LayerSpec::dropout(name, source, DropoutConfig::new(keep_probability)))
    }

    pub fn get_node(&self, id: NodeId) -> NetResult<&Net> {
        self.nodes.get(id).ok_or(NetError::NodeNotFound(id))
    }

    pub(crate) fn get_node_mut(&mut self, id: NodeId) -> NetResult<&mut Net> {
        self.nodes.get_mut(id).ok_or(NetError::NodeNotFound(id))
    }

    pub fn find(&self, name: &str) -> NetResult<&Net> {
        self.id_of(name).and_then(|id| self.get_node(id))
    }

    pub fn id_of(&self, name: &str) -> NetResult<NodeId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| NetError::UnknownName(name.to_string()))
    }

    /// Nodes in insertion (topological) order.
    pub fn nodes(&self) -> &[Net] {
        &self.nodes
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Net> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_propagated(&self) -> bool {
        self.propagated
    }

    pub(crate) fn mark_propagated(&mut self) {
        self.propagated = true;
    }

    /// Runs both static sparsity passes.
    ///
    /// Running it again without [`reset_masks`](Self::reset_masks) keeps
    /// accumulating contributions into the existing masks.
    pub fn propagate(&mut self) {
        SparsityPropagation::run(self);
    }

    pub fn reset_masks(&mut self) {
        for net in &mut self.nodes {
            net.state.reset();
        }
        self.propagated = false;
    }

    /// Activation mask of a node after propagation; 1.0 if nothing reached it.
    pub fn activation_mask(&self, id: NodeId) -> NetResult<f64> {
        let net = self.propagated_node(id)?;
        Ok(net.state.activation_mask().unwrap_or(1.0))
    }

    /// Error mask of a node after propagation; 1.0 if nothing reached it.
    pub fn error_mask(&self, id: NodeId) -> NetResult<f64> {
        let net = self.propagated_node(id)?;
        Ok(net.state.error_mask().unwrap_or(1.0))
    }

    fn propagated_node(&self, id: NodeId) -> NetResult<&Net> {
        let net = self.get_node(id)?;
        if !self.propagated {
            return Err(NetError::MasksNotPropagated(net.name.clone()));
        }
        Ok(net)
    }

    pub fn param_count(&self, id: NodeId) -> NetResult<f64> {
        Ok(CostModel::param_count(self.get_node(id)?))
    }

    pub fn inference_mac_count(&self, id: NodeId) -> NetResult<f64> {
        CostModel::inference_mac_count(self, id)
    }

    pub fn propagation_mac_count(&self, id: NodeId) -> NetResult<f64> {
        CostModel::propagation_mac_count(self, id)
    }

    pub fn update_mac_count(&self, id: NodeId) -> NetResult<f64> {
        CostModel::update_mac_count(self, id)
    }

    /// All cost figures of one node.
    pub fn cost(&self, id: NodeId) -> NetResult<LayerCost> {
        CostModel::evaluate(self, id)
    }

    /// Propagates sparsity if that has not happened yet and collects the
    /// per-layer report.
    pub fn profile(&mut self) -> NetResult<Report> {
        if !self.propagated {
            self.propagate();
        }
        let report = Report::from_model(self)?;
        info!(
            layers = report.rows.len(),
            inference = report.total.inference,
            params = report.total.params,
            "profile complete"
        );
        Ok(report)
    }
}
