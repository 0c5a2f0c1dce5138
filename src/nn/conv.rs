//! Configuration of 2D convolutional layers.

use crate::net::{NetError, NetResult};
use crate::nn::check_density;

/// Configuration for a Conv2D layer.
///
/// The number of input channels is not part of the configuration: it is taken
/// from the (channel-concatenated) sources when the layer is added to a model.
#[derive(Debug, Clone, PartialEq)]
pub struct Conv2dConfig {
    /// Number of output channels (filters).
    pub out_channels: usize,
    /// Convolution kernel size (kH, kW).
    pub kernel_size: (usize, usize),
    /// Convolution stride (stride_h, stride_w).
    pub stride: (usize, usize),
    /// Ratio of non-zero weights.
    pub weight_sparsity: f64,
}

impl Default for Conv2dConfig {
    fn default() -> Self {
        Self {
            out_channels: 1,
            kernel_size: (3, 3),
            stride: (1, 1),
            weight_sparsity: 1.0,
        }
    }
}

impl Conv2dConfig {
    /// Creates a dense, stride-1 convolution configuration.
    pub fn new(out_channels: usize, kernel_size: (usize, usize)) -> Self {
        Self {
            out_channels,
            kernel_size,
            ..Default::default()
        }
    }

    /// Square kernel shorthand.
    pub fn square(out_channels: usize, size: usize) -> Self {
        Self::new(out_channels, (size, size))
    }

    /// Sets convolution stride.
    pub fn with_stride(mut self, stride: (usize, usize)) -> Self {
        self.stride = stride;
        self
    }

    /// Sets the ratio of non-zero weights.
    pub fn with_weight_sparsity(mut self, weight_sparsity: f64) -> Self {
        self.weight_sparsity = weight_sparsity;
        self
    }

    pub(crate) fn validate(&self, layer: &str) -> NetResult<()> {
        let invalid = |reason: String| NetError::InvalidParameter {
            layer: layer.to_string(),
            reason,
        };
        if self.out_channels == 0 {
            return Err(invalid("out_channels must be positive".to_string()));
        }
        if self.kernel_size.0 == 0 || self.kernel_size.1 == 0 {
            return Err(invalid(format!("kernel size {:?} must be positive", self.kernel_size)));
        }
        if self.stride.0 == 0 || self.stride.1 == 0 {
            return Err(invalid(format!("stride {:?} must be positive", self.stride)));
        }
        check_density(layer, "weight_sparsity", self.weight_sparsity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conv2d_config_builder() {
        let config = Conv2dConfig::new(64, (7, 7))
            .with_stride((2, 2))
            .with_weight_sparsity(0.5);

        assert_eq!(config.out_channels, 64);
        assert_eq!(config.kernel_size, (7, 7));
        assert_eq!(config.stride, (2, 2));
        assert_eq!(config.weight_sparsity, 0.5);
        assert!(config.validate("conv1").is_ok());
    }

    #[test]
    fn test_conv2d_config_rejects_zero_stride() {
        let config = Conv2dConfig::square(64, 3).with_stride((0, 1));
        assert!(matches!(
            config.validate("conv1"),
            Err(NetError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_conv2d_config_rejects_bad_weight_sparsity() {
        let config = Conv2dConfig::square(64, 3).with_weight_sparsity(1.2);
        assert!(config.validate("conv1").is_err());
    }
}
