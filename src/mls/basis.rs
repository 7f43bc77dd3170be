//! Complete polynomial bases in graded order

use nalgebra::DVector;

/// Monomials of total degree up to `order` in `dim` variables
///
/// Ordered by degree, then by decreasing power of the first variable:
/// in 2D with order 2 the basis is `1, x, y, x^2, xy, y^2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolynomialBasis {
    dim: usize,
    order: usize,
    exponents: Vec<Vec<i32>>,
}

impl PolynomialBasis {
    pub fn new(dim: usize, order: usize) -> Self {
        let mut exponents = Vec::new();
        let mut prefix = Vec::with_capacity(dim);
        for degree in 0..=order {
            push_compositions(dim, degree, &mut prefix, &mut exponents);
        }
        Self {
            dim,
            order,
            exponents,
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of monomials, `C(dim + order, order)`
    pub fn len(&self) -> usize {
        self.exponents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exponents.is_empty()
    }

    pub fn exponents(&self) -> &[Vec<i32>] {
        &self.exponents
    }

    /// Evaluate every monomial at `point`
    pub fn evaluate(&self, point: &[f64]) -> DVector<f64> {
        DVector::from_iterator(
            self.exponents.len(),
            self.exponents.iter().map(|powers| {
                powers
                    .iter()
                    .zip(point)
                    .map(|(&p, &x)| x.powi(p))
                    .product::<f64>()
            }),
        )
    }
}

/// Append every split of `degree` over the remaining `dims` variables
fn push_compositions(dims: usize, degree: usize, prefix: &mut Vec<i32>, out: &mut Vec<Vec<i32>>) {
    if dims == 0 {
        if degree == 0 {
            out.push(prefix.clone());
        }
        return;
    }
    if dims == 1 {
        prefix.push(degree as i32);
        out.push(prefix.clone());
        prefix.pop();
        return;
    }
    for first in (0..=degree).rev() {
        prefix.push(first as i32);
        push_compositions(dims - 1, degree - first, prefix, out);
        prefix.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basis_sizes() {
        assert_eq!(PolynomialBasis::new(2, 0).len(), 1);
        assert_eq!(PolynomialBasis::new(2, 1).len(), 3);
        assert_eq!(PolynomialBasis::new(2, 2).len(), 6);
        assert_eq!(PolynomialBasis::new(3, 1).len(), 4);
        assert_eq!(PolynomialBasis::new(3, 2).len(), 10);
        assert_eq!(PolynomialBasis::new(3, 3).len(), 20);
    }

    #[test]
    fn test_graded_order_2d() {
        let basis = PolynomialBasis::new(2, 2);
        let expected: Vec<Vec<i32>> = vec![
            vec![0, 0],
            vec![1, 0],
            vec![0, 1],
            vec![2, 0],
            vec![1, 1],
            vec![0, 2],
        ];
        assert_eq!(basis.exponents(), expected.as_slice());
    }

    #[test]
    fn test_evaluate_linear_3d() {
        let basis = PolynomialBasis::new(3, 1);
        let p = basis.evaluate(&[2.0, -1.0, 0.5]);
        assert_eq!(p.as_slice(), &[1.0, 2.0, -1.0, 0.5]);
    }

    #[test]
    fn test_evaluate_quadratic_2d() {
        let basis = PolynomialBasis::new(2, 2);
        let p = basis.evaluate(&[3.0, 2.0]);
        assert_eq!(p.as_slice(), &[1.0, 3.0, 2.0, 9.0, 6.0, 4.0]);
    }
}
