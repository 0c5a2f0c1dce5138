//! Dropout layer configuration.
//!
//! For a static estimate dropout is a structural mask: it keeps a known
//! fraction of the values of its source and zeroes the rest.

use crate::net::NetResult;
use crate::nn::check_density;

/// Dropout keeping `keep_probability` of the values it sees.
///
/// # Example
/// ```ignore
/// let dropout = DropoutConfig::new(0.5); // keeps half of the activations
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DropoutConfig {
    /// Probability that a value is kept (0.0 - 1.0).
    pub keep_probability: f64,
}

impl DropoutConfig {
    pub fn new(keep_probability: f64) -> Self {
        Self { keep_probability }
    }

    pub(crate) fn validate(&self, layer: &str) -> NetResult<()> {
        check_density(layer, "keep_probability", self.keep_probability)
    }
}

impl Default for DropoutConfig {
    fn default() -> Self {
        Self::new(0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropout_creation() {
        let dropout = DropoutConfig::default();
        assert_eq!(dropout.keep_probability, 0.5);
        assert!(dropout.validate("drop").is_ok());
    }

    #[test]
    fn test_dropout_invalid_probability() {
        assert!(DropoutConfig::new(1.5).validate("drop").is_err());
        assert!(DropoutConfig::new(f64::NAN).validate("drop").is_err());
    }
}
