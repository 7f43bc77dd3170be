//! Moving-least-squares interpolation around a single query point
//!
//! An [`MlsInterpolation`] is built fresh for every query point. It weighs
//! the scattered data points with a separable B-spline kernel, assembles the
//! moment matrix `M = Σ wᵢ pᵢ pᵢᵀ` over a complete polynomial basis and, once
//! field values are supplied, the right-hand side `B = Σ wᵢ pᵢ φᵢ`.
//!
//! A singular moment matrix (too few independent points inside the kernel
//! support) is reported through `None` from the solving methods. Check
//! [`MlsInterpolation::moment_determinant`] to detect ill-conditioning ahead
//! of time; no regularisation is applied here.

pub mod basis;
pub mod kernel;

pub use basis::PolynomialBasis;
pub use kernel::SplineKernel;

use log::debug;
use nalgebra::DVector;

use crate::error::{MpmError, MpmResult};
use crate::math::{solve_linear_system, Mat, VectorDim};
use crate::options::MlsOptions;

#[derive(Debug, Clone)]
pub struct MlsInterpolation<const DIM: usize> {
    point: VectorDim<DIM>,
    data_points: Vec<VectorDim<DIM>>,
    kernel: SplineKernel,
    basis: PolynomialBasis,
    span: f64,
    weights: DVector<f64>,
    moment_matrix: Mat,
    data_monomials: Vec<DVector<f64>>,
    point_monomials: DVector<f64>,
    rhs: DVector<f64>,
}

impl<const DIM: usize> MlsInterpolation<DIM> {
    /// Compute weights, the moment matrix and the monomials at `point`
    ///
    /// Fails on a spline order other than 2 or 3, an empty data set, or a
    /// span that is not a positive finite number.
    pub fn initialise(
        point: VectorDim<DIM>,
        data_points: &[VectorDim<DIM>],
        spline_order: u32,
        poly_order: usize,
        span: f64,
    ) -> MpmResult<Self> {
        let kernel = SplineKernel::from_order(spline_order)?;
        if data_points.is_empty() {
            return Err(MpmError::EmptyDataPoints);
        }
        if !span.is_finite() || span <= 0.0 {
            return Err(MpmError::InvalidSpan(span));
        }

        let basis = PolynomialBasis::new(DIM, poly_order);
        let weights = compute_weights(kernel, &point, data_points, span);
        let data_monomials: Vec<DVector<f64>> = data_points
            .iter()
            .map(|data| basis.evaluate(data.as_slice()))
            .collect();

        let n = basis.len();
        let mut moment_matrix = Mat::zeros(n, n);
        for (w, p) in weights.iter().zip(&data_monomials) {
            if *w > 0.0 {
                moment_matrix += (p * p.transpose()) * *w;
            }
        }

        let point_monomials = basis.evaluate(point.as_slice());
        debug!(
            "MLS at {:?}: {} data points, {} monomials, {} in support",
            point.as_slice(),
            data_points.len(),
            n,
            weights.iter().filter(|w| **w > 0.0).count()
        );

        Ok(Self {
            point,
            data_points: data_points.to_vec(),
            kernel,
            basis,
            span,
            weights,
            moment_matrix,
            data_monomials,
            point_monomials,
            rhs: DVector::zeros(n),
        })
    }

    pub fn with_options(
        point: VectorDim<DIM>,
        data_points: &[VectorDim<DIM>],
        options: &MlsOptions,
    ) -> MpmResult<Self> {
        Self::initialise(
            point,
            data_points,
            options.spline_order,
            options.poly_order,
            options.span,
        )
    }

    /// Assemble `B = Σ wᵢ pᵢ φᵢ` from one field value per data point
    pub fn initialise_b_vector(&mut self, field: &[f64]) -> MpmResult<()> {
        if field.len() != self.data_points.len() {
            return Err(MpmError::FieldLengthMismatch {
                expected: self.data_points.len(),
                found: field.len(),
            });
        }
        self.rhs.fill(0.0);
        for ((w, p), phi) in self.weights.iter().zip(&self.data_monomials).zip(field) {
            self.rhs.axpy(w * phi, p, 1.0);
        }
        Ok(())
    }

    /// Local polynomial coefficients `a` solving `M a = B`
    pub fn coefficients(&self) -> Option<DVector<f64>> {
        solve_linear_system(&self.moment_matrix, &self.rhs)
    }

    /// Fitted field value at the query point, `p(x) · a`
    pub fn interpolate(&self) -> Option<f64> {
        self.coefficients()
            .map(|a| self.point_monomials.dot(&a))
    }

    /// Generalised shape functions `Φᵢ = wᵢ p(x)ᵀ M⁻¹ pᵢ`, one per data point
    ///
    /// With a complete basis these sum to one and reproduce every polynomial
    /// the basis spans.
    pub fn shape_functions(&self) -> Option<DVector<f64>> {
        // M is symmetric, so p(x)ᵀ M⁻¹ = (M⁻¹ p(x))ᵀ
        let c = solve_linear_system(&self.moment_matrix, &self.point_monomials)?;
        Some(DVector::from_iterator(
            self.data_monomials.len(),
            self.weights
                .iter()
                .zip(&self.data_monomials)
                .map(|(w, p)| w * c.dot(p)),
        ))
    }

    pub fn moment_determinant(&self) -> f64 {
        self.moment_matrix.determinant()
    }

    pub fn point(&self) -> &VectorDim<DIM> {
        &self.point
    }

    pub fn data_points(&self) -> &[VectorDim<DIM>] {
        &self.data_points
    }

    pub fn kernel(&self) -> SplineKernel {
        self.kernel
    }

    pub fn basis(&self) -> &PolynomialBasis {
        &self.basis
    }

    pub fn span(&self) -> f64 {
        self.span
    }

    pub fn weights(&self) -> &DVector<f64> {
        &self.weights
    }

    pub fn moment_matrix(&self) -> &Mat {
        &self.moment_matrix
    }

    pub fn rhs_vector(&self) -> &DVector<f64> {
        &self.rhs
    }

    pub fn point_monomials(&self) -> &DVector<f64> {
        &self.point_monomials
    }
}

/// Kernel weight of every data point relative to `point`
fn compute_weights<const DIM: usize>(
    kernel: SplineKernel,
    point: &VectorDim<DIM>,
    data_points: &[VectorDim<DIM>],
    span: f64,
) -> DVector<f64> {
    DVector::from_iterator(
        data_points.len(),
        data_points
            .iter()
            .map(|data| kernel.weight(point.as_slice(), data.as_slice(), span)),
    )
}
