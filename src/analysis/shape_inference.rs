//! Module for shape inference of layer nodes.
//!
//! Determines, for a layer about to be added to the model, the tensor it
//! consumes (its sources merged according to the layer kind) and the tensor it
//! produces. Densities are carried along: layers that thin their input
//! (ReLU, dropout) or merge several inputs (pooling windows, element-wise
//! addition) adjust the output sparsity here, once, at construction time.

use crate::net::{LayerKind, NetError, NetResult};
use crate::nn::{PoolConfig, PoolType};
use crate::tensor::{Tensor, TensorError};

type Result<T> = NetResult<T>;

/// Structure that performs shape inference for layer nodes.
pub struct ShapeInference;

#[derive(Debug, Clone, Copy)]
enum Arity {
    Exactly(usize),
    AtLeastOne,
}

impl Arity {
    fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exactly(k) => n == k,
            Arity::AtLeastOne => n >= 1,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Arity::Exactly(0) => "no",
            Arity::Exactly(1) => "exactly 1",
            Arity::Exactly(2) => "exactly 2",
            Arity::Exactly(_) => "a fixed number of",
            Arity::AtLeastOne => "at least 1",
        }
    }
}

impl ShapeInference {
    /// Infers `(input, output)` tensors for a layer.
    ///
    /// # Arguments
    /// * `layer` - Name of the layer, used in error messages.
    /// * `kind` - Kind of the layer with its parameters.
    /// * `sources` - Output tensors of the layer's sources, in order.
    ///
    /// Fails with [`TensorError::VolumeOverflow`] if either tensor has more
    /// elements than a `u64` can count.
    pub fn infer(layer: &str, kind: &LayerKind, sources: &[&Tensor]) -> Result<(Tensor, Tensor)> {
        let (input, output) = Self::infer_kind(layer, kind, sources)?;
        input.check_volume()?;
        output.check_volume()?;
        Ok((input, output))
    }

    fn infer_kind(layer: &str, kind: &LayerKind, sources: &[&Tensor]) -> Result<(Tensor, Tensor)> {
        match kind {
            LayerKind::Input { shape } => {
                Self::expect_arity(layer, sources, Arity::Exactly(0))?;
                let tensor = Tensor::dense(shape.clone());
                Ok((tensor.clone(), tensor))
            }

            // [C_in, H, W] -> [C_out, H / stride_h, W / stride_w]
            LayerKind::Conv2D(config) => {
                Self::expect_arity(layer, sources, Arity::AtLeastOne)?;
                let input = Self::concat(layer, sources.iter().map(|t| (*t).clone()))?;
                Self::expect_rank(layer, &input, 3)?;

                let shape = input.shape();
                let output = Tensor::dense(vec![
                    config.out_channels,
                    shape[1] / config.stride.0,
                    shape[2] / config.stride.1,
                ]);
                Ok((input, output))
            }

            LayerKind::FC(config) => {
                Self::expect_arity(layer, sources, Arity::AtLeastOne)?;
                let input = Self::concat(layer, sources.iter().map(|t| t.flatten()))?;
                Ok((input, Tensor::dense(vec![config.neurons])))
            }

            LayerKind::NL(nl) => {
                Self::expect_arity(layer, sources, Arity::Exactly(1))?;
                let input = sources[0].clone();
                let mut output = input.clone();
                output.mask(nl.activation_density());
                Ok((input, output))
            }

            LayerKind::Pool(config) => {
                Self::expect_arity(layer, sources, Arity::Exactly(1))?;
                let input = sources[0].clone();
                Self::expect_rank(layer, &input, 3)?;
                let output = Self::pool_output(&input, config)?;
                Ok((input, output))
            }

            LayerKind::EleWise => {
                Self::expect_arity(layer, sources, Arity::Exactly(2))?;
                let (left, right) = (sources[0], sources[1]);
                if !Tensor::shapes_match(left, right) {
                    return Err(NetError::IncompatibleShapes {
                        layer: layer.to_string(),
                        left: left.shape().to_vec(),
                        right: right.shape().to_vec(),
                    });
                }

                // Both operands are read: the input is the pair stacked.
                let mut stacked = vec![2];
                stacked.extend_from_slice(left.shape());
                let input = Tensor::new(stacked, (left.sparsity() + right.sparsity()) / 2.0)?;

                let mut output = left.clone();
                output.fill(right.sparsity());
                Ok((input, output))
            }

            LayerKind::Dropout(config) => {
                Self::expect_arity(layer, sources, Arity::Exactly(1))?;
                let input = sources[0].clone();
                let mut output = input.clone();
                output.mask(config.keep_probability);
                Ok((input, output))
            }
        }
    }

    /// A pooled value is non-zero if any value of its window is.
    fn pool_output(input: &Tensor, config: &PoolConfig) -> Result<Tensor> {
        let shape = input.shape();
        let (channels, h, w) = (shape[0], shape[1], shape[2]);

        let (out_h, out_w, window) = match config.pool_type {
            PoolType::Global => (1, 1, h as f64 * w as f64),
            PoolType::Max | PoolType::Average => (
                h / config.stride.0,
                w / config.stride.1,
                config.pool_size.0 as f64 * config.pool_size.1 as f64,
            ),
        };

        let density = 1.0 - (1.0 - input.sparsity()).powf(window);
        Ok(Tensor::new(vec![channels, out_h, out_w], density.clamp(0.0, 1.0))?)
    }

    /// Concatenates tensors along the first dimension.
    fn concat(layer: &str, tensors: impl Iterator<Item = Tensor>) -> Result<Tensor> {
        let mut merged = Tensor::default();
        for tensor in tensors {
            merged.concat(&tensor, 0).map_err(|source| match source {
                TensorError::VolumeOverflow(_) => NetError::Tensor(source),
                _ => NetError::ShapeMismatch {
                    layer: layer.to_string(),
                    source,
                },
            })?;
        }
        Ok(merged)
    }

    fn expect_arity(layer: &str, sources: &[&Tensor], arity: Arity) -> Result<()> {
        if arity.accepts(sources.len()) {
            Ok(())
        } else {
            Err(NetError::InvalidArity {
                layer: layer.to_string(),
                expected: arity.describe(),
                actual: sources.len(),
            })
        }
    }

    fn expect_rank(layer: &str, tensor: &Tensor, expected: usize) -> Result<()> {
        if tensor.rank() == expected {
            Ok(())
        } else {
            Err(NetError::InvalidRank {
                layer: layer.to_string(),
                expected,
                actual: tensor.rank(),
            })
        }
    }
}
