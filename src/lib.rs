//! MPM Core - nodal update engine and MLS interpolation for the Material Point Method
//!
//! This library provides the grid-side core of an explicit MPM solver:
//! - Background grid nodes that accumulate particle mass, momentum and forces
//!   from many threads at once
//! - Explicit single-phase and two-phase (solid + liquid) integration, with
//!   optional Cundall damping
//! - Velocity, friction, pressure and concentrated-force boundary conditions
//! - Multi-material contact quantities shared through a nodal property pool
//! - Moving-least-squares fits and shape functions over scattered points
//!
//! ## Example
//! ```rust
//! use mpm_core::prelude::*;
//! use nalgebra::Vector2;
//!
//! let mut node = Node2D::new(0, Vector2::new(0.0, 0.0));
//!
//! // Particle contributions
//! node.update_mass(true, NodePhase::SOLID, 2.0);
//! node.update_momentum(true, NodePhase::SOLID, &Vector2::new(2.0, 0.0));
//! node.update_external_force(true, NodePhase::SOLID, &Vector2::new(0.0, -19.62));
//!
//! // Fixed in y
//! node.assign_velocity_constraint(1, 0.0).unwrap();
//!
//! node.compute_velocity();
//! assert!(node.compute_acceleration_velocity(NodePhase::SOLID, 0.01));
//! assert_eq!(node.velocity(NodePhase::SOLID).y, 0.0);
//! ```

pub mod error;
pub mod functions;
pub mod math;
pub mod mls;
pub mod node;
pub mod options;
pub mod pool;
pub mod sync;

// Re-export common types
pub mod prelude {
    pub use crate::error::{MpmError, MpmResult};
    pub use crate::functions::{LinearFunction, TimeFunction};
    pub use crate::mls::{MlsInterpolation, PolynomialBasis, SplineKernel};
    pub use crate::node::{
        Boolean, ConstraintSet, FrictionConstraint, Node, Node2D, Node3D, NodePhase, Scalar,
        TwoPhaseNode2D, TwoPhaseNode3D, Vector,
    };
    pub use crate::options::{MlsOptions, NodeOptions};
    pub use crate::pool::{keys, NodalProperties};
}
