//! Compactly supported B-spline weight kernels

use serde::{Deserialize, Serialize};

use crate::error::{MpmError, MpmResult};

/// One-dimensional B-spline kernel evaluated on a normalised distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplineKernel {
    /// Quadratic B-spline, support radius 1.5
    Quadratic,
    /// Cubic B-spline, support radius 1.0
    Cubic,
}

impl SplineKernel {
    /// Kernel for spline order 2 or 3
    pub fn from_order(order: u32) -> MpmResult<Self> {
        match order {
            2 => Ok(Self::Quadratic),
            3 => Ok(Self::Cubic),
            other => Err(MpmError::InvalidSplineOrder(other)),
        }
    }

    pub fn order(&self) -> u32 {
        match self {
            Self::Quadratic => 2,
            Self::Cubic => 3,
        }
    }

    /// Normalised distance at and beyond which the kernel is zero
    pub fn support_radius(&self) -> f64 {
        match self {
            Self::Quadratic => 1.5,
            Self::Cubic => 1.0,
        }
    }

    /// Kernel value at normalised distance `d >= 0`
    #[inline]
    pub fn value(&self, d: f64) -> f64 {
        let d = d.abs();
        match self {
            Self::Quadratic => {
                if d <= 0.5 {
                    0.75 - d * d
                } else if d < 1.5 {
                    0.5 * (1.5 - d) * (1.5 - d)
                } else {
                    0.0
                }
            }
            Self::Cubic => {
                let d2 = d * d;
                let d3 = d2 * d;
                if d <= 0.5 {
                    2.0 / 3.0 - 4.0 * d2 + 4.0 * d3
                } else if d < 1.0 {
                    4.0 / 3.0 - 4.0 * d + 4.0 * d2 - 4.0 * d3 / 3.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Tensor-product weight: product of per-axis kernel values of
    /// `|point - data| / span`
    #[inline]
    pub fn weight(&self, point: &[f64], data: &[f64], span: f64) -> f64 {
        point
            .iter()
            .zip(data)
            .map(|(p, q)| self.value((p - q).abs() / span))
            .product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_invalid_order() {
        assert!(matches!(
            SplineKernel::from_order(4),
            Err(MpmError::InvalidSplineOrder(4))
        ));
        assert!(SplineKernel::from_order(1).is_err());
        assert_eq!(SplineKernel::from_order(3).unwrap().order(), 3);
    }

    #[test]
    fn test_compact_support() {
        for kernel in [SplineKernel::Quadratic, SplineKernel::Cubic] {
            let r = kernel.support_radius();
            for d in [r, r + 1e-9, r + 0.3, 10.0, 1e6] {
                assert_eq!(kernel.value(d), 0.0, "{kernel:?} at {d}");
            }
        }
    }

    #[test]
    fn test_breakpoint_continuity() {
        let eps = 1e-12;
        let q = SplineKernel::Quadratic;
        assert_relative_eq!(q.value(0.5), 0.5, epsilon = 1e-15);
        assert_relative_eq!(q.value(0.5 + eps), 0.5, epsilon = 1e-10);

        let c = SplineKernel::Cubic;
        assert_relative_eq!(c.value(0.5), 1.0 / 6.0, epsilon = 1e-15);
        assert_relative_eq!(c.value(0.5 + eps), 1.0 / 6.0, epsilon = 1e-10);
    }

    #[test]
    fn test_peak_values() {
        assert_eq!(SplineKernel::Quadratic.value(0.0), 0.75);
        assert_relative_eq!(SplineKernel::Cubic.value(0.0), 2.0 / 3.0);
    }

    #[test]
    fn test_weight_is_separable() {
        let k = SplineKernel::Quadratic;
        let w = k.weight(&[0.0, 0.0], &[0.2, 0.7], 1.0);
        assert_relative_eq!(w, k.value(0.2) * k.value(0.7), epsilon = 1e-15);
        // One axis outside the support zeroes the product
        assert_eq!(k.weight(&[0.0, 0.0], &[0.1, 1.6], 1.0), 0.0);
    }
}
