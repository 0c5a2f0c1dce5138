//! Configuration of pooling layers.

use crate::net::{NetError, NetResult};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolType {
    Max,
    Average,
    /// Collapses the spatial dimensions to 1x1, ignoring window and stride.
    Global,
}

impl fmt::Display for PoolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PoolType::Max => "max",
            PoolType::Average => "average",
            PoolType::Global => "global",
        };
        f.write_str(name)
    }
}

impl FromStr for PoolType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "max" => Ok(PoolType::Max),
            "average" | "avg" => Ok(PoolType::Average),
            "global" => Ok(PoolType::Global),
            other => Err(format!("unknown pool type '{}'", other)),
        }
    }
}

/// Pooling layer over a `[C, H, W]` input.
///
/// # Example
///
/// ```rust,ignore
/// let pool = PoolConfig::max((2, 2), (2, 2)); // halves H and W
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    pub pool_type: PoolType,
    /// Window size (kH, kW).
    pub pool_size: (usize, usize),
    /// Stride (stride_h, stride_w).
    pub stride: (usize, usize),
}

impl PoolConfig {
    pub fn new(pool_type: PoolType, pool_size: (usize, usize), stride: (usize, usize)) -> Self {
        Self { pool_type, pool_size, stride }
    }

    pub fn max(pool_size: (usize, usize), stride: (usize, usize)) -> Self {
        Self::new(PoolType::Max, pool_size, stride)
    }

    pub fn average(pool_size: (usize, usize), stride: (usize, usize)) -> Self {
        Self::new(PoolType::Average, pool_size, stride)
    }

    pub fn global() -> Self {
        Self::new(PoolType::Global, (1, 1), (1, 1))
    }

    pub(crate) fn validate(&self, layer: &str) -> NetResult<()> {
        if self.pool_type == PoolType::Global {
            return Ok(());
        }
        if self.pool_size.0 == 0 || self.pool_size.1 == 0 {
            return Err(NetError::InvalidParameter {
                layer: layer.to_string(),
                reason: format!("pool size {:?} must be positive", self.pool_size),
            });
        }
        if self.stride.0 == 0 || self.stride.1 == 0 {
            return Err(NetError::InvalidParameter {
                layer: layer.to_string(),
                reason: format!("stride {:?} must be positive", self.stride),
            });
        }
        Ok(())
    }
}
