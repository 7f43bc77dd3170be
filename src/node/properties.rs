//! Per-node property storage keyed by closed property enumerations

use serde::{Deserialize, Serialize};

use crate::math::{PhaseMatrix, VectorDim};

/// Scalar nodal properties, one value per phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scalar {
    Mass,
    Volume,
    MassPressure,
    Pressure,
}

impl Scalar {
    pub const COUNT: usize = 4;
    pub const ALL: [Scalar; Self::COUNT] = [
        Scalar::Mass,
        Scalar::Volume,
        Scalar::MassPressure,
        Scalar::Pressure,
    ];
}

/// Vector nodal properties, one `DIM` vector per phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vector {
    Momentum,
    Velocity,
    Acceleration,
    ExternalForce,
    InternalForce,
    /// Solid-fluid drag coefficient, stored on the solid phase
    DragForce,
}

impl Vector {
    pub const COUNT: usize = 6;
    pub const ALL: [Vector; Self::COUNT] = [
        Vector::Momentum,
        Vector::Velocity,
        Vector::Acceleration,
        Vector::ExternalForce,
        Vector::InternalForce,
        Vector::DragForce,
    ];
}

/// Boolean flags, persistent across steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Boolean {
    /// A friction constraint is assigned
    Friction,
    /// Constraints are expressed in a rotated frame
    GenericBC,
}

impl Boolean {
    pub const COUNT: usize = 2;
}

/// Scalar, vector and boolean attributes of one node
///
/// Phase indices are checked by indexing; an out-of-range phase panics
/// like an out-of-range slice index.
#[derive(Debug, Clone)]
pub struct PropertyStore<const DIM: usize, const NPHASES: usize> {
    scalars: [VectorDim<NPHASES>; Scalar::COUNT],
    vectors: [PhaseMatrix<DIM, NPHASES>; Vector::COUNT],
    booleans: [bool; Boolean::COUNT],
}

impl<const DIM: usize, const NPHASES: usize> Default for PropertyStore<DIM, NPHASES> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const DIM: usize, const NPHASES: usize> PropertyStore<DIM, NPHASES> {
    pub fn new() -> Self {
        Self {
            scalars: [VectorDim::<NPHASES>::zeros(); Scalar::COUNT],
            vectors: [PhaseMatrix::<DIM, NPHASES>::zeros(); Vector::COUNT],
            booleans: [false; Boolean::COUNT],
        }
    }

    /// Zero all scalar and vector accumulators; boolean flags are kept
    pub fn reset(&mut self) {
        for s in self.scalars.iter_mut() {
            s.fill(0.0);
        }
        for v in self.vectors.iter_mut() {
            v.fill(0.0);
        }
    }

    /// Add `value` to the stored scalar (`update`) or overwrite it
    #[inline]
    pub fn update_scalar(&mut self, property: Scalar, update: bool, phase: usize, value: f64) {
        let slot = &mut self.scalars[property as usize][phase];
        if update {
            *slot += value;
        } else {
            *slot = value;
        }
    }

    #[inline]
    pub fn scalar(&self, property: Scalar, phase: usize) -> f64 {
        self.scalars[property as usize][phase]
    }

    /// Add `value` to the stored vector (`update`) or overwrite it
    #[inline]
    pub fn update_vector(
        &mut self,
        property: Vector,
        update: bool,
        phase: usize,
        value: &VectorDim<DIM>,
    ) {
        let mut column = self.vectors[property as usize].column_mut(phase);
        if update {
            column += value;
        } else {
            column.copy_from(value);
        }
    }

    #[inline]
    pub fn vector(&self, property: Vector, phase: usize) -> VectorDim<DIM> {
        self.vectors[property as usize].column(phase).into_owned()
    }

    /// All phases of a vector property, one column per phase
    #[inline]
    pub fn vectors(&self, property: Vector) -> &PhaseMatrix<DIM, NPHASES> {
        &self.vectors[property as usize]
    }

    #[inline]
    pub fn vectors_mut(&mut self, property: Vector) -> &mut PhaseMatrix<DIM, NPHASES> {
        &mut self.vectors[property as usize]
    }

    /// Mutable velocity and acceleration together, for constraint application
    pub fn velocity_acceleration_mut(
        &mut self,
    ) -> (&mut PhaseMatrix<DIM, NPHASES>, &mut PhaseMatrix<DIM, NPHASES>) {
        let (head, tail) = self.vectors.split_at_mut(Vector::Acceleration as usize);
        (
            &mut head[Vector::Velocity as usize],
            &mut tail[0],
        )
    }

    #[inline]
    pub fn assign_boolean(&mut self, property: Boolean, value: bool) {
        self.booleans[property as usize] = value;
    }

    #[inline]
    pub fn boolean(&self, property: Boolean) -> bool {
        self.booleans[property as usize]
    }
}
