//! Explicit time integration of nodal equations of motion

use log::{debug, warn};

use super::{Node, NodePhase, Scalar, Vector};
use crate::math::{flush_small, sign, VectorDim};

/// Net force with Cundall damping: each component is scaled by
/// `1 - alpha * sign(f_i * v_i)`
#[inline]
fn cundall_damped<const DIM: usize>(
    force: &VectorDim<DIM>,
    velocity: &VectorDim<DIM>,
    damping_factor: f64,
) -> VectorDim<DIM> {
    force.zip_map(velocity, |f, v| f * (1.0 - damping_factor * sign(f * v)))
}

impl<const DIM: usize, const NPHASES: usize> Node<DIM, NPHASES> {
    /// Velocity from momentum for every phase with non-negligible mass, then
    /// velocity constraints
    pub fn compute_velocity(&mut self) {
        let tolerance = self.options.mass_tolerance;
        let threshold = self.options.zero_threshold;
        let properties = &mut self.state.get_mut().properties;
        for phase in 0..NPHASES {
            let mass = properties.scalar(Scalar::Mass, phase);
            if mass > tolerance {
                let velocity = properties.vector(Vector::Momentum, phase) / mass;
                properties.update_vector(Vector::Velocity, false, phase, &velocity);
            }
        }
        self.apply_velocity_constraints();
        let properties = &mut self.state.get_mut().properties;
        flush_small(properties.vectors_mut(Vector::Velocity), threshold);
    }

    /// Pressure from accumulated mass times pressure for every phase with mass
    ///
    /// Prescribed pressures are not applied here; call
    /// [`Self::apply_pressure_constraint`] with the current time afterwards.
    pub fn compute_pressure(&mut self) {
        let tolerance = self.options.mass_tolerance;
        let properties = &mut self.state.get_mut().properties;
        for phase in 0..NPHASES {
            let mass = properties.scalar(Scalar::Mass, phase);
            if mass > tolerance {
                let pressure = properties.scalar(Scalar::MassPressure, phase) / mass;
                properties.update_scalar(Scalar::Pressure, false, phase, pressure);
            }
        }
    }

    /// Solve `a = (f_ext + f_int) / m` and integrate `v += a dt` for `phase`
    ///
    /// Returns false, leaving the node untouched, when the phase is invalid
    /// or its mass is below the tolerance.
    pub fn compute_acceleration_velocity(&mut self, phase: usize, dt: f64) -> bool {
        self.integrate_phase(phase, dt, None)
    }

    /// As [`Self::compute_acceleration_velocity`] with Cundall damping
    /// `damping_factor` in `[0, 1)`
    pub fn compute_acceleration_velocity_cundall(
        &mut self,
        phase: usize,
        dt: f64,
        damping_factor: f64,
    ) -> bool {
        self.integrate_phase(phase, dt, Some(damping_factor))
    }

    fn integrate_phase(&mut self, phase: usize, dt: f64, damping: Option<f64>) -> bool {
        if phase >= NPHASES {
            warn!("node {}: cannot integrate invalid phase {}", self.id, phase);
            return false;
        }
        let tolerance = self.options.mass_tolerance;
        let properties = &mut self.state.get_mut().properties;
        let mass = properties.scalar(Scalar::Mass, phase);
        if mass <= tolerance {
            debug!("node {}: phase {} mass {} below tolerance", self.id, phase, mass);
            return false;
        }

        let mut force = properties.vector(Vector::ExternalForce, phase)
            + properties.vector(Vector::InternalForce, phase);
        if let Some(alpha) = damping {
            force = cundall_damped(&force, &properties.vector(Vector::Velocity, phase), alpha);
        }
        properties.update_vector(Vector::Acceleration, false, phase, &(force / mass));

        self.finish_integration(dt, &[phase]);
        true
    }

    /// Coupled solid-liquid update with drag between the phases
    ///
    /// Phase 0 carries the mixture forces and phase 1 the liquid forces. Per
    /// direction the system
    /// `[m_s m_l; 0 m_l] [a_s; a_l] = [f_mix; f_l - c_d (v_l - v_s)]`
    /// is solved by back substitution. Returns false if either mass is below
    /// the tolerance or the node has fewer than two phases.
    pub fn compute_acceleration_velocity_twophase_explicit(&mut self, dt: f64) -> bool {
        self.integrate_twophase(dt, None)
    }

    /// As [`Self::compute_acceleration_velocity_twophase_explicit`] with
    /// Cundall damping on both phases
    pub fn compute_acceleration_velocity_twophase_explicit_cundall(
        &mut self,
        dt: f64,
        damping_factor: f64,
    ) -> bool {
        self.integrate_twophase(dt, Some(damping_factor))
    }

    fn integrate_twophase(&mut self, dt: f64, damping: Option<f64>) -> bool {
        if NPHASES < 2 {
            warn!("node {}: two-phase update on a {}-phase node", self.id, NPHASES);
            return false;
        }
        const SOLID: usize = NodePhase::SOLID;
        const LIQUID: usize = NodePhase::LIQUID;

        let tolerance = self.options.mass_tolerance;
        let properties = &mut self.state.get_mut().properties;
        let mass_solid = properties.scalar(Scalar::Mass, SOLID);
        let mass_liquid = properties.scalar(Scalar::Mass, LIQUID);
        if mass_solid <= tolerance || mass_liquid <= tolerance {
            debug!(
                "node {}: two-phase masses ({}, {}) below tolerance",
                self.id, mass_solid, mass_liquid
            );
            return false;
        }

        let velocity_solid = properties.vector(Vector::Velocity, SOLID);
        let velocity_liquid = properties.vector(Vector::Velocity, LIQUID);
        let drag = properties
            .vector(Vector::DragForce, SOLID)
            .component_mul(&(velocity_liquid - velocity_solid));

        let mut force_liquid = properties.vector(Vector::ExternalForce, LIQUID)
            + properties.vector(Vector::InternalForce, LIQUID)
            - drag;
        if let Some(alpha) = damping {
            force_liquid = cundall_damped(&force_liquid, &velocity_liquid, alpha);
        }
        let acceleration_liquid = force_liquid / mass_liquid;

        let mut force_solid = properties.vector(Vector::ExternalForce, SOLID)
            + properties.vector(Vector::InternalForce, SOLID)
            - acceleration_liquid * mass_liquid;
        if let Some(alpha) = damping {
            force_solid = cundall_damped(&force_solid, &velocity_solid, alpha);
        }
        let acceleration_solid = force_solid / mass_solid;

        properties.update_vector(Vector::Acceleration, false, LIQUID, &acceleration_liquid);
        properties.update_vector(Vector::Acceleration, false, SOLID, &acceleration_solid);

        self.finish_integration(dt, &[SOLID, LIQUID]);
        true
    }

    /// Friction, velocity update, velocity constraints and flushing of
    /// round-off for `phases` only
    ///
    /// Friction acts on the solid phase and runs only when it is integrated.
    fn finish_integration(&mut self, dt: f64, phases: &[usize]) {
        if phases.contains(&NodePhase::SOLID) {
            self.apply_friction_constraints(dt);
        }
        let threshold = self.options.zero_threshold;
        let (velocity, acceleration) = self.state.get_mut().properties.velocity_acceleration_mut();
        for &phase in phases {
            let updated = velocity.column(phase) + acceleration.column(phase) * dt;
            velocity.set_column(phase, &updated);
        }
        self.constraints
            .apply_velocity_to_phases(velocity, acceleration, phases);

        for &phase in phases {
            let mut v: VectorDim<DIM> = velocity.column(phase).into_owned();
            let mut a: VectorDim<DIM> = acceleration.column(phase).into_owned();
            flush_small(&mut v, threshold);
            flush_small(&mut a, threshold);
            velocity.set_column(phase, &v);
            acceleration.set_column(phase, &a);
        }
    }
}
