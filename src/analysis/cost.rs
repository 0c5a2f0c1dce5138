//! Per-layer cost formulas.
//!
//! Only Conv2D and FC layers carry weights and perform multiply-accumulates;
//! every other kind costs nothing. The raw count of a weighted layer is
//! discounted by:
//!
//! - `w`: the ratio of non-zero weights,
//! - `d_in`: the density of the layer's input tensor,
//! - `g`: the density of the gradient arriving at the layer's output, the mean
//!   of its destinations' dynamic error sparsity,
//! - `am` / `em`: the propagated static activation / error masks.
//!
//! | count       | formula              |
//! |-------------|----------------------|
//! | inference   | `raw * w * d_in * am`|
//! | propagation | `raw * w * g * em`   |
//! | update      | `raw * d_in * g`     |

use crate::model::Model;
use crate::net::{LayerKind, Net, NetResult, NodeId};
use crate::nn::{Conv2dConfig, PoolType};

/// All cost figures of one layer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayerCost {
    pub inference_macs: f64,
    pub propagation_macs: f64,
    pub update_macs: f64,
    pub params: f64,
    pub input_volume: f64,
}

pub struct CostModel;

impl CostModel {
    pub fn evaluate(model: &Model, id: NodeId) -> NetResult<LayerCost> {
        let net = model.get_node(id)?;
        Ok(LayerCost {
            inference_macs: Self::inference_mac_count(model, id)?,
            propagation_macs: Self::propagation_mac_count(model, id)?,
            update_macs: Self::update_mac_count(model, id)?,
            params: Self::param_count(net),
            input_volume: net.input().volume() as f64,
        })
    }

    pub fn param_count(net: &Net) -> f64 {
        match net.kind() {
            LayerKind::Conv2D(config) => {
                let in_channels = net.input().dim(0).unwrap_or(0);
                config.out_channels as f64 * Self::kernel_area(config) * in_channels as f64
            }
            LayerKind::FC(config) => net.input().volume() as f64 * config.neurons as f64,
            _ => 0.0,
        }
    }

    /// Undiscounted MAC count of a forward pass through the layer.
    pub fn raw_mac_count(net: &Net) -> f64 {
        match net.kind() {
            LayerKind::Conv2D(config) => {
                let in_channels = net.input().dim(0).unwrap_or(0);
                net.output().volume() as f64 * Self::kernel_area(config) * in_channels as f64
            }
            LayerKind::FC(_) => Self::param_count(net),
            _ => 0.0,
        }
    }

    pub fn inference_mac_count(model: &Model, id: NodeId) -> NetResult<f64> {
        let net = model.get_node(id)?;
        let am = model.activation_mask(id)?;
        let w = Self::weight_sparsity(net);
        Ok(Self::raw_mac_count(net) * w * net.input().sparsity() * am)
    }

    pub fn propagation_mac_count(model: &Model, id: NodeId) -> NetResult<f64> {
        let net = model.get_node(id)?;
        let em = model.error_mask(id)?;
        let w = Self::weight_sparsity(net);
        let g = Self::gradient_density(model, net)?;
        Ok(Self::raw_mac_count(net) * w * g * em)
    }

    pub fn update_mac_count(model: &Model, id: NodeId) -> NetResult<f64> {
        let net = model.get_node(id)?;
        // Same precondition as the other MAC counts.
        model.error_mask(id)?;
        let g = Self::gradient_density(model, net)?;
        Ok(Self::raw_mac_count(net) * net.input().sparsity() * g)
    }

    /// How much this kind of layer thins the activations it passes on.
    pub fn dynamic_activation_sparsity(net: &Net) -> f64 {
        match net.kind() {
            LayerKind::NL(nl) => nl.activation_density(),
            _ => 1.0,
        }
    }

    /// How much this kind of layer thins the errors it passes back.
    pub fn dynamic_error_sparsity(net: &Net) -> f64 {
        match net.kind() {
            LayerKind::NL(nl) => nl.error_density(),
            LayerKind::Pool(config) if config.pool_type == PoolType::Max => {
                1.0 / (config.stride.0 as f64 * config.stride.1 as f64)
            }
            _ => 1.0,
        }
    }

    // Kernel dims are not bounded by any tensor volume.
    fn kernel_area(config: &Conv2dConfig) -> f64 {
        config.kernel_size.0 as f64 * config.kernel_size.1 as f64
    }

    fn weight_sparsity(net: &Net) -> f64 {
        match net.kind() {
            LayerKind::Conv2D(config) => config.weight_sparsity,
            LayerKind::FC(config) => config.weight_sparsity,
            _ => 1.0,
        }
    }

    fn gradient_density(model: &Model, net: &Net) -> NetResult<f64> {
        let destinations = net.destinations();
        if destinations.is_empty() {
            return Ok(1.0);
        }
        let mut total = 0.0;
        for &dst in destinations {
            total += Self::dynamic_error_sparsity(model.get_node(dst)?);
        }
        Ok(total / destinations.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::{LinearConfig, Nonlinearity, PoolConfig};

    #[test]
    fn test_conv2d_counts() {
        let mut model = Model::new();
        let input = model.input("input", vec![3, 224, 224]).unwrap();
        let conv = model
            .conv2d("conv1", &[input], Conv2dConfig::new(64, (7, 7)).with_stride((2, 2)))
            .unwrap();
        model.propagate();

        let raw = (64 * 112 * 112 * 7 * 7 * 3) as f64;
        let cost = CostModel::evaluate(&model, conv).unwrap();
        assert_eq!(cost.params, 9408.0);
        assert_eq!(cost.inference_macs, raw);
        assert_eq!(cost.propagation_macs, raw);
        assert_eq!(cost.update_macs, raw);
        assert_eq!(cost.input_volume, (3 * 224 * 224) as f64);
    }

    #[test]
    fn test_weight_sparsity_discounts_inference() {
        let mut model = Model::new();
        let input = model.input("input", vec![100]).unwrap();
        let fc = model
            .fc("fc", &[input], LinearConfig::new(10).with_weight_sparsity(0.25))
            .unwrap();
        model.propagate();

        assert_eq!(model.param_count(fc).unwrap(), 1000.0);
        assert_eq!(model.inference_mac_count(fc).unwrap(), 250.0);
        // Weight updates are computed for every weight.
        assert_eq!(model.update_mac_count(fc).unwrap(), 1000.0);
    }

    #[test]
    fn test_max_pool_thins_gradient_of_preceding_layer() {
        let mut model = Model::new();
        let input = model.input("input", vec![3, 8, 8]).unwrap();
        let conv = model.conv2d("conv", &[input], Conv2dConfig::square(4, 3)).unwrap();
        let pool = model.pool("pool", conv, PoolConfig::max((2, 2), (2, 2))).unwrap();
        model.propagate();

        let raw = CostModel::raw_mac_count(model.get_node(conv).unwrap());
        assert_eq!(CostModel::dynamic_error_sparsity(model.get_node(pool).unwrap()), 0.25);
        assert_eq!(model.update_mac_count(conv).unwrap(), raw * 0.25);
        assert_eq!(model.inference_mac_count(pool).unwrap(), 0.0);
    }

    #[test]
    fn test_dynamic_factors() {
        let mut model = Model::new();
        let input = model.input("input", vec![3, 8, 8]).unwrap();
        let relu = model.nl("relu", input, Nonlinearity::Relu).unwrap();
        let tanh = model.nl("tanh", input, Nonlinearity::Tanh).unwrap();
        let avg = model.pool("avg", input, PoolConfig::average((2, 2), (2, 2))).unwrap();

        assert_eq!(CostModel::dynamic_activation_sparsity(model.get_node(relu).unwrap()), 0.5);
        assert_eq!(CostModel::dynamic_error_sparsity(model.get_node(relu).unwrap()), 0.5);
        assert_eq!(CostModel::dynamic_error_sparsity(model.get_node(tanh).unwrap()), 1.0);
        assert_eq!(CostModel::dynamic_error_sparsity(model.get_node(avg).unwrap()), 1.0);
        assert_eq!(CostModel::dynamic_activation_sparsity(model.get_node(input).unwrap()), 1.0);
    }

    #[test]
    fn test_huge_kernels_do_not_overflow() {
        let mut model = Model::new();
        let input = model.input("input", vec![4, 8, 8]).unwrap();
        let conv = model
            .conv2d("conv", &[input], Conv2dConfig::new(1 << 40, (1 << 20, 1 << 20)))
            .unwrap();
        let pool = model
            .pool("pool", conv, PoolConfig::max((1 << 40, 1 << 40), (1 << 40, 1 << 40)))
            .unwrap();
        model.propagate();

        let expected = 2f64.powi(40) * 2f64.powi(40) * 4.0;
        assert_eq!(model.param_count(conv).unwrap(), expected);
        assert!(model.inference_mac_count(conv).unwrap().is_finite());
        assert_eq!(model.get_node(pool).unwrap().output().shape(), &[1 << 40, 0, 0]);
        assert!(CostModel::dynamic_error_sparsity(model.get_node(pool).unwrap()) > 0.0);
    }
}
