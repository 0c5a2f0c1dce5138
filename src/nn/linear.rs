//! Configuration of fully connected layers.

use crate::net::{NetError, NetResult};
use crate::nn::check_density;

/// Fully connected (dense) layer configuration.
///
/// The layer flattens and concatenates all of its sources, so only the number
/// of output neurons is configured here.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConfig {
    pub neurons: usize,
    /// Ratio of non-zero weights.
    pub weight_sparsity: f64,
}

impl LinearConfig {
    pub fn new(neurons: usize) -> Self {
        Self {
            neurons,
            weight_sparsity: 1.0,
        }
    }

    pub fn with_weight_sparsity(mut self, weight_sparsity: f64) -> Self {
        self.weight_sparsity = weight_sparsity;
        self
    }

    pub(crate) fn validate(&self, layer: &str) -> NetResult<()> {
        if self.neurons == 0 {
            return Err(NetError::InvalidParameter {
                layer: layer.to_string(),
                reason: "neuron count must be positive".to_string(),
            });
        }
        check_density(layer, "weight_sparsity", self.weight_sparsity)
    }
}
