//! Nonlinearities.

use std::fmt;
use std::str::FromStr;

/// Element-wise nonlinearity applied by an NL layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nonlinearity {
    Relu,
    Sigmoid,
    Tanh,
}

impl Nonlinearity {
    /// Fraction of outputs expected to stay non-zero.
    ///
    /// ReLU zeroes the negative half of a symmetric input distribution.
    pub fn activation_density(self) -> f64 {
        match self {
            Nonlinearity::Relu => 0.5,
            Nonlinearity::Sigmoid | Nonlinearity::Tanh => 1.0,
        }
    }

    /// Fraction of back-propagated errors that pass the derivative.
    pub fn error_density(self) -> f64 {
        match self {
            Nonlinearity::Relu => 0.5,
            Nonlinearity::Sigmoid | Nonlinearity::Tanh => 1.0,
        }
    }
}

impl fmt::Display for Nonlinearity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Nonlinearity::Relu => "relu",
            Nonlinearity::Sigmoid => "sigmoid",
            Nonlinearity::Tanh => "tanh",
        };
        f.write_str(name)
    }
}

impl FromStr for Nonlinearity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relu" => Ok(Nonlinearity::Relu),
            "sigmoid" => Ok(Nonlinearity::Sigmoid),
            "tanh" => Ok(Nonlinearity::Tanh),
            other => Err(format!("unknown nonlinearity '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for nl in [Nonlinearity::Relu, Nonlinearity::Sigmoid, Nonlinearity::Tanh] {
            assert_eq!(nl.to_string().parse::<Nonlinearity>(), Ok(nl));
        }
        assert_eq!("ReLU".parse::<Nonlinearity>(), Ok(Nonlinearity::Relu));
        assert!("gelu".parse::<Nonlinearity>().is_err());
    }

    #[test]
    fn test_relu_halves_density() {
        assert_eq!(Nonlinearity::Relu.activation_density(), 0.5);
        assert_eq!(Nonlinearity::Tanh.error_density(), 1.0);
    }
}
