//! Module defining the `Tensor` shape descriptor.
//!
//! A `Tensor` here never holds data. It describes the shape of the values
//! flowing between two layers plus a single scalar, `sparsity`, which is the
//! fraction of those values expected to be non-zero (a density, despite the
//! name). Layers refine the density as they thin or merge their inputs.

use std::fmt;
use thiserror::Error;

/// Tensor shape, first dimension is channels/features by convention.
pub type Shape = Vec<usize>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorError {
    #[error("Sparsity must lie in [0, 1], got {0}")]
    InvalidSparsity(f64),

    #[error("Rank mismatch: {0:?} and {1:?}")]
    RankMismatch(Shape, Shape),

    #[error("Dimension {dim} differs between {left:?} and {right:?}")]
    DimMismatch { dim: usize, left: Shape, right: Shape },

    #[error("Concatenation dimension {dim} is out of range for rank {rank}")]
    DimOutOfRange { dim: usize, rank: usize },

    #[error("Volume of shape {0:?} does not fit in 64 bits")]
    VolumeOverflow(Shape),
}

pub type TensorResult<T> = std::result::Result<T, TensorError>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tensor {
    shape: Shape,
    sparsity: f64,
}

impl Tensor {
    /// Creates a tensor, rejecting densities outside [0, 1] and shapes whose
    /// volume overflows.
    pub fn new(shape: Shape, sparsity: f64) -> TensorResult<Self> {
        if !(0.0..=1.0).contains(&sparsity) {
            return Err(TensorError::InvalidSparsity(sparsity));
        }
        if checked_volume(&shape).is_none() {
            return Err(TensorError::VolumeOverflow(shape));
        }
        Ok(Self { shape, sparsity })
    }

    /// Fully dense tensor of the given shape.
    pub fn dense(shape: Shape) -> Self {
        Self { shape, sparsity: 1.0 }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn sparsity(&self) -> f64 {
        self.sparsity
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn dim(&self, index: usize) -> Option<usize> {
        self.shape.get(index).copied()
    }

    /// An empty shape marks an uninitialized tensor.
    pub fn is_empty(&self) -> bool {
        self.shape.is_empty()
    }

    /// Number of elements. Uninitialized tensors have no elements.
    ///
    /// Saturates at `u64::MAX`; [`Tensor::new`] and [`Tensor::concat`] never
    /// produce such a shape.
    pub fn volume(&self) -> u64 {
        if self.shape.is_empty() {
            return 0;
        }
        checked_volume(&self.shape).unwrap_or(u64::MAX)
    }

    /// Fails if the volume does not fit in a `u64`.
    pub fn check_volume(&self) -> TensorResult<u64> {
        if self.shape.is_empty() {
            return Ok(0);
        }
        checked_volume(&self.shape).ok_or_else(|| TensorError::VolumeOverflow(self.shape.clone()))
    }

    /// Number of elements expected to be non-zero, rounded toward zero.
    pub fn nonzero_volume(&self) -> u64 {
        (self.volume() as f64 * self.sparsity) as u64
    }

    pub fn shapes_match(a: &Tensor, b: &Tensor) -> bool {
        a.shape == b.shape
    }

    /// Merges `other` into this tensor along `dim`.
    ///
    /// An uninitialized tensor simply becomes a copy of `other`. On failure
    /// the tensor is left untouched.
    pub fn concat(&mut self, other: &Tensor, dim: usize) -> TensorResult<()> {
        if self.is_empty() {
            *self = other.clone();
            return Ok(());
        }
        if self.rank() != other.rank() {
            return Err(TensorError::RankMismatch(self.shape.clone(), other.shape.clone()));
        }
        if dim >= self.rank() {
            return Err(TensorError::DimOutOfRange { dim, rank: self.rank() });
        }
        if let Some(bad) = (0..self.rank()).find(|&i| i != dim && self.shape[i] != other.shape[i]) {
            return Err(TensorError::DimMismatch {
                dim: bad,
                left: self.shape.clone(),
                right: other.shape.clone(),
            });
        }

        let mut shape = self.shape.clone();
        shape[dim] = match self.shape[dim].checked_add(other.shape[dim]) {
            Some(d) => d,
            None => return Err(TensorError::VolumeOverflow(shape)),
        };
        if checked_volume(&shape).is_none() {
            return Err(TensorError::VolumeOverflow(shape));
        }

        // Pool the two populations of zero/non-zero elements.
        let (va, vb) = (self.volume() as f64, other.volume() as f64);
        self.sparsity = if va + vb > 0.0 {
            clamp_unit((va * self.sparsity + vb * other.sparsity) / (va + vb))
        } else {
            clamp_unit((self.sparsity + other.sparsity) / 2.0)
        };
        self.shape = shape;
        Ok(())
    }

    /// Structural thinning, e.g. dropout keeping `keep_ratio` of the values.
    pub fn mask(&mut self, keep_ratio: f64) {
        self.sparsity = clamp_unit(self.sparsity * keep_ratio);
    }

    /// Combines an independent source of non-zeros: an element is zero only
    /// if it is zero in both.
    pub fn fill(&mut self, extra_zero_ratio: f64) {
        self.sparsity = clamp_unit(1.0 - (1.0 - self.sparsity) * (1.0 - extra_zero_ratio));
    }

    pub fn flatten(&self) -> Tensor {
        Tensor {
            shape: vec![self.volume() as usize],
            sparsity: self.sparsity,
        }
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self.shape.iter().map(|d| d.to_string()).collect();
        write!(f, "[{} @ {:.2}]", dims.join("x"), self.sparsity)
    }
}

/// Product of the dimensions, `None` on overflow.
pub fn checked_volume(shape: &[usize]) -> Option<u64> {
    shape.iter().try_fold(1u64, |acc, &d| acc.checked_mul(d as u64))
}

/// Clamps a probability into [0, 1]; NaN collapses to 0.
pub(crate) fn clamp_unit(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_and_nonzero_volume() {
        let t = Tensor::new(vec![3, 4, 5], 0.35).unwrap();
        assert_eq!(t.volume(), 60);
        // 60 * 0.35 = 21.0 (floating error would give 20.999..)
        assert_eq!(t.nonzero_volume(), (60.0 * 0.35) as u64);
        assert_eq!(Tensor::default().volume(), 0);
    }

    #[test]
    fn test_invalid_sparsity_rejected() {
        assert_eq!(Tensor::new(vec![1], 1.5), Err(TensorError::InvalidSparsity(1.5)));
        assert!(Tensor::new(vec![1], -0.1).is_err());
        assert!(Tensor::new(vec![1], f64::NAN).is_err());
    }

    #[test]
    fn test_concat_channels() {
        let mut a = Tensor::new(vec![64, 56, 56], 1.0).unwrap();
        let b = Tensor::new(vec![32, 56, 56], 0.25).unwrap();
        a.concat(&b, 0).unwrap();
        assert_eq!(a.shape(), &[96, 56, 56]);
        // (64 * 1.0 + 32 * 0.25) / 96
        assert!((a.sparsity() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_concat_into_empty_copies() {
        let mut a = Tensor::default();
        let b = Tensor::new(vec![8, 2, 2], 0.5).unwrap();
        a.concat(&b, 0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_concat_failure_leaves_tensor_unchanged() {
        let mut a = Tensor::new(vec![64, 56, 56], 0.5).unwrap();
        let before = a.clone();

        let wrong_rank = Tensor::dense(vec![64, 56]);
        assert!(matches!(a.concat(&wrong_rank, 0), Err(TensorError::RankMismatch(..))));
        assert_eq!(a, before);

        let wrong_dim = Tensor::dense(vec![64, 28, 56]);
        assert!(matches!(
            a.concat(&wrong_dim, 0),
            Err(TensorError::DimMismatch { dim: 1, .. })
        ));
        assert_eq!(a, before);

        assert!(matches!(
            a.concat(&before.clone(), 3),
            Err(TensorError::DimOutOfRange { dim: 3, rank: 3 })
        ));
        assert_eq!(a, before);
    }

    #[test]
    fn test_concat_on_last_dim() {
        let mut a = Tensor::dense(vec![4, 5, 6]);
        let b = Tensor::new(vec![4, 5, 2], 0.0).unwrap();
        a.concat(&b, 2).unwrap();
        assert_eq!(a.shape(), &[4, 5, 8]);
        // 120 non-zeros out of 160
        assert!((a.sparsity() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_volume_overflow_rejected() {
        let huge = vec![1usize << 32, 1usize << 32, 2];
        assert_eq!(
            Tensor::new(huge.clone(), 1.0),
            Err(TensorError::VolumeOverflow(huge.clone()))
        );
        assert_eq!(checked_volume(&huge), None);
        assert_eq!(checked_volume(&[1usize << 32, 1usize << 31]), Some(1u64 << 63));

        let unchecked = Tensor::dense(huge);
        assert_eq!(unchecked.volume(), u64::MAX);
        assert!(unchecked.check_volume().is_err());
    }

    #[test]
    fn test_concat_overflow_leaves_tensor_unchanged() {
        let mut a = Tensor::new(vec![1usize << 62, 2], 1.0).unwrap();
        let before = a.clone();
        let b = Tensor::new(vec![1usize << 62, 2], 1.0).unwrap();
        assert!(matches!(a.concat(&b, 0), Err(TensorError::VolumeOverflow(_))));
        assert_eq!(a, before);
    }

    #[test]
    fn test_mask_and_fill() {
        let mut t = Tensor::new(vec![10], 0.8).unwrap();
        t.mask(0.5);
        assert!((t.sparsity() - 0.4).abs() < 1e-12);
        t.fill(0.5);
        // 1 - 0.6 * 0.5
        assert!((t.sparsity() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_flatten_keeps_volume_and_density() {
        let t = Tensor::new(vec![512, 7, 7], 0.3).unwrap();
        let flat = t.flatten();
        assert_eq!(flat.shape(), &[25088]);
        assert_eq!(flat.volume(), t.volume());
        assert_eq!(flat.sparsity(), t.sparsity());
    }

    #[test]
    fn test_display() {
        let t = Tensor::dense(vec![3, 224, 224]);
        assert_eq!(t.to_string(), "[3x224x224 @ 1.00]");
    }
}
