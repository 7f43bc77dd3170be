//! Small numerical helpers shared by the node engine and the MLS engine

use nalgebra::{DMatrix, DVector, SMatrix, SVector};

pub type Mat = DMatrix<f64>;
pub type Vec = DVector<f64>;

/// Fixed-size column vector of spatial dimension `D`
pub type VectorDim<const D: usize> = SVector<f64, D>;
/// Square matrix of spatial dimension `D`
pub type MatrixDim<const D: usize> = SMatrix<f64, D, D>;
/// One column per phase, one row per spatial direction
pub type PhaseMatrix<const D: usize, const P: usize> = SMatrix<f64, D, P>;

/// Sign of `x` as -1, 0 or 1
///
/// Unlike `f64::signum`, zero maps to zero.
#[inline]
pub fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Set every entry with magnitude below `threshold` to exactly zero
#[inline]
pub fn flush_small<const R: usize, const C: usize>(m: &mut SMatrix<f64, R, C>, threshold: f64) {
    for value in m.iter_mut() {
        if value.abs() < threshold {
            *value = 0.0;
        }
    }
}

/// Solve a linear system using LU decomposition
pub fn solve_linear_system(a: &Mat, b: &Vec) -> Option<Vec> {
    a.clone().lu().solve(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix2;

    #[test]
    fn test_sign_of_zero() {
        assert_eq!(sign(0.0), 0.0);
        assert_eq!(sign(-0.0), 0.0);
        assert_eq!(sign(3.2), 1.0);
        assert_eq!(sign(-1e-300), -1.0);
    }

    #[test]
    fn test_flush_small() {
        let mut m = Matrix2::new(1e-20, 1.0, -1e-18, -2.0);
        flush_small(&mut m, 1e-15);
        assert_eq!(m, Matrix2::new(0.0, 1.0, 0.0, -2.0));
    }

    #[test]
    fn test_singular_system_has_no_solution() {
        let a = Mat::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 0.0]);
        let b = Vec::from_vec(vec![1.0, 1.0]);
        assert!(solve_linear_system(&a, &b).is_none());
    }
}
