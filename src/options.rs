//! Tunable options for nodes and the MLS engine

use serde::{Deserialize, Serialize};

use crate::error::MpmResult;

/// Numerical thresholds used by the nodal update engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeOptions {
    /// Nodes with mass at or below this value are skipped by the integrators
    pub mass_tolerance: f64,
    /// Velocity and acceleration components smaller than this are flushed to zero
    pub zero_threshold: f64,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            mass_tolerance: 1.0e-15,
            zero_threshold: 1.0e-15,
        }
    }
}

impl NodeOptions {
    /// Set the mass tolerance
    pub fn with_mass_tolerance(mut self, tol: f64) -> Self {
        self.mass_tolerance = tol;
        self
    }

    /// Set the zero threshold
    pub fn with_zero_threshold(mut self, tol: f64) -> Self {
        self.zero_threshold = tol;
        self
    }

    /// Parse options from a JSON object, missing fields take their defaults
    pub fn from_json(json: &str) -> MpmResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Options for a moving-least-squares fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlsOptions {
    /// B-spline kernel order: 2 (quadratic) or 3 (cubic)
    pub spline_order: u32,
    /// Total degree of the polynomial basis
    pub poly_order: usize,
    /// Kernel span used to normalise distances
    pub span: f64,
}

impl Default for MlsOptions {
    fn default() -> Self {
        Self {
            spline_order: 2,
            poly_order: 1,
            span: 1.0,
        }
    }
}

impl MlsOptions {
    /// Quadratic kernel with the given span
    pub fn quadratic(span: f64) -> Self {
        Self {
            spline_order: 2,
            span,
            ..Self::default()
        }
    }

    /// Cubic kernel with the given span
    pub fn cubic(span: f64) -> Self {
        Self {
            spline_order: 3,
            span,
            ..Self::default()
        }
    }

    /// Set the polynomial order
    pub fn with_poly_order(mut self, order: usize) -> Self {
        self.poly_order = order;
        self
    }

    /// Parse options from a JSON object, missing fields take their defaults
    pub fn from_json(json: &str) -> MpmResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_options_partial_json() {
        let opts = NodeOptions::from_json(r#"{ "mass_tolerance": 1e-9 }"#).unwrap();
        assert_eq!(opts.mass_tolerance, 1e-9);
        assert_eq!(opts.zero_threshold, NodeOptions::default().zero_threshold);
    }

    #[test]
    fn test_mls_options_builders() {
        let opts = MlsOptions::cubic(0.25).with_poly_order(2);
        assert_eq!(opts.spline_order, 3);
        assert_eq!(opts.poly_order, 2);
        assert_eq!(opts.span, 0.25);
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        assert!(MlsOptions::from_json("{ span: }").is_err());
    }
}
