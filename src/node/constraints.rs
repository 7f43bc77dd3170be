//! Boundary conditions and concentrated loads carried by a node

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{MpmError, MpmResult};
use crate::functions::TimeFunction;
use crate::math::{sign, MatrixDim, PhaseMatrix, VectorDim};

/// Coulomb friction on a boundary whose normal is a coordinate axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrictionConstraint {
    /// Normal direction of the boundary (0..DIM)
    pub direction: usize,
    /// Which side of the normal is outward: positive or negative
    pub sign: i32,
    /// Friction coefficient
    pub coefficient: f64,
}

/// Constraint frame for boundaries that are not axis-aligned
#[derive(Debug, Clone, Copy, PartialEq)]
struct Rotation<const DIM: usize> {
    matrix: MatrixDim<DIM>,
    inverse: MatrixDim<DIM>,
}

/// Prescribed value with an optional time multiplier
#[derive(Clone)]
pub(crate) struct Prescribed {
    pub value: f64,
    pub function: Option<Arc<dyn TimeFunction>>,
}

impl Prescribed {
    pub fn at(&self, time: f64) -> f64 {
        match &self.function {
            Some(f) => self.value * f.value(time),
            None => self.value,
        }
    }
}

impl fmt::Debug for Prescribed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prescribed")
            .field("value", &self.value)
            .field("function", &self.function.is_some())
            .finish()
    }
}

/// Velocity, friction, pressure and rotated-frame constraints of a node,
/// together with its concentrated force
pub struct ConstraintSet<const DIM: usize, const NPHASES: usize> {
    velocity: BTreeMap<usize, f64>,
    friction: Option<FrictionConstraint>,
    rotation: Option<Rotation<DIM>>,
    pressure: [Option<Prescribed>; NPHASES],
    concentrated_force: PhaseMatrix<DIM, NPHASES>,
    force_function: Option<Arc<dyn TimeFunction>>,
}

impl<const DIM: usize, const NPHASES: usize> Default for ConstraintSet<DIM, NPHASES> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const DIM: usize, const NPHASES: usize> fmt::Debug for ConstraintSet<DIM, NPHASES> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintSet")
            .field("velocity", &self.velocity)
            .field("friction", &self.friction)
            .field("rotation", &self.rotation.map(|r| r.matrix))
            .field("pressure", &self.pressure)
            .field("concentrated_force", &self.concentrated_force)
            .field("force_function", &self.force_function.is_some())
            .finish()
    }
}

impl<const DIM: usize, const NPHASES: usize> ConstraintSet<DIM, NPHASES> {
    pub fn new() -> Self {
        Self {
            velocity: BTreeMap::new(),
            friction: None,
            rotation: None,
            pressure: std::array::from_fn(|_| None),
            concentrated_force: PhaseMatrix::zeros(),
            force_function: None,
        }
    }

    /// Prescribe a velocity component
    ///
    /// `direction` runs over `0..DIM * NPHASES`; axis is `direction % DIM`
    /// and phase is `direction / DIM`. Reassigning a direction overwrites it.
    pub fn assign_velocity(&mut self, direction: usize, velocity: f64) -> MpmResult<()> {
        let limit = DIM * NPHASES;
        if direction >= limit {
            return Err(MpmError::InvalidDirection { direction, limit });
        }
        self.velocity.insert(direction, velocity);
        Ok(())
    }

    pub fn velocity_constraints(&self) -> &BTreeMap<usize, f64> {
        &self.velocity
    }

    pub fn assign_friction(&mut self, direction: usize, sign: i32, coefficient: f64) -> MpmResult<()> {
        if direction >= DIM {
            return Err(MpmError::InvalidDirection {
                direction,
                limit: DIM,
            });
        }
        self.friction = Some(FrictionConstraint {
            direction,
            sign,
            coefficient,
        });
        Ok(())
    }

    pub fn friction(&self) -> Option<&FrictionConstraint> {
        self.friction.as_ref()
    }

    /// Set the local constraint frame; fails if `matrix` has no inverse
    pub fn assign_rotation(&mut self, matrix: MatrixDim<DIM>) -> MpmResult<()> {
        let inverse = matrix.try_inverse().ok_or(MpmError::SingularRotation)?;
        self.rotation = Some(Rotation { matrix, inverse });
        Ok(())
    }

    pub fn rotation_matrix(&self) -> Option<&MatrixDim<DIM>> {
        self.rotation.as_ref().map(|r| &r.matrix)
    }

    pub fn assign_pressure(
        &mut self,
        phase: usize,
        pressure: f64,
        function: Option<Arc<dyn TimeFunction>>,
    ) -> MpmResult<()> {
        if phase >= NPHASES {
            return Err(MpmError::InvalidPhase {
                phase,
                nphases: NPHASES,
            });
        }
        self.pressure[phase] = Some(Prescribed {
            value: pressure,
            function,
        });
        Ok(())
    }

    /// Prescribed pressure of `phase` at `time`, if constrained
    pub fn pressure_at(&self, phase: usize, time: f64) -> Option<f64> {
        self.pressure.get(phase)?.as_ref().map(|p| p.at(time))
    }

    /// Store a concentrated force component; the time function is shared by
    /// all components of this node
    ///
    /// `direction` is an axis of `phase` in `0..DIM`, not the combined
    /// `phase * DIM + axis` index used by velocity constraints.
    pub fn assign_concentrated_force(
        &mut self,
        phase: usize,
        direction: usize,
        force: f64,
        function: Option<Arc<dyn TimeFunction>>,
    ) -> MpmResult<()> {
        if phase >= NPHASES {
            return Err(MpmError::InvalidPhase {
                phase,
                nphases: NPHASES,
            });
        }
        if direction >= DIM {
            return Err(MpmError::InvalidDirection {
                direction,
                limit: DIM,
            });
        }
        self.concentrated_force[(direction, phase)] = force;
        self.force_function = function;
        Ok(())
    }

    /// Concentrated force of `phase` scaled by the time function at `time`
    pub fn concentrated_force_at(&self, phase: usize, time: f64) -> VectorDim<DIM> {
        let scale = self
            .force_function
            .as_ref()
            .map_or(1.0, |f| f.value(time));
        self.concentrated_force.column(phase) * scale
    }

    /// Overwrite constrained velocity components and zero the matching
    /// accelerations
    pub fn apply_velocity(
        &self,
        velocity: &mut PhaseMatrix<DIM, NPHASES>,
        acceleration: &mut PhaseMatrix<DIM, NPHASES>,
    ) {
        self.apply_velocity_where(velocity, acceleration, |_| true);
    }

    /// As [`Self::apply_velocity`], leaving phases not in `phases` untouched
    pub fn apply_velocity_to_phases(
        &self,
        velocity: &mut PhaseMatrix<DIM, NPHASES>,
        acceleration: &mut PhaseMatrix<DIM, NPHASES>,
        phases: &[usize],
    ) {
        self.apply_velocity_where(velocity, acceleration, |phase| phases.contains(&phase));
    }

    fn apply_velocity_where(
        &self,
        velocity: &mut PhaseMatrix<DIM, NPHASES>,
        acceleration: &mut PhaseMatrix<DIM, NPHASES>,
        include: impl Fn(usize) -> bool,
    ) {
        for (&dir, &value) in &self.velocity {
            let direction = dir % DIM;
            let phase = dir / DIM;
            if !include(phase) {
                continue;
            }
            match &self.rotation {
                None => {
                    velocity[(direction, phase)] = value;
                    acceleration[(direction, phase)] = 0.0;
                }
                Some(rotation) => {
                    let mut local_velocity = rotation.inverse * velocity.column(phase);
                    let mut local_acceleration = rotation.inverse * acceleration.column(phase);
                    local_velocity[direction] = value;
                    local_acceleration[direction] = 0.0;
                    velocity.set_column(phase, &(rotation.matrix * local_velocity));
                    acceleration.set_column(phase, &(rotation.matrix * local_acceleration));
                }
            }
        }
    }

    /// Adjust the tangential acceleration of phase 0 for Coulomb friction
    ///
    /// Friction acts only while the normal acceleration points outward.
    /// A sliding node is decelerated by `mu * |a_n|`, and stopped if that
    /// would reverse its tangential velocity within `dt`. A sticking node
    /// stays put until the tangential acceleration exceeds `mu * |a_n|`.
    pub fn apply_friction(
        &self,
        velocity: &PhaseMatrix<DIM, NPHASES>,
        acceleration: &mut PhaseMatrix<DIM, NPHASES>,
        dt: f64,
    ) {
        let Some(friction) = self.friction else {
            return;
        };
        const PHASE: usize = 0;
        let dir_n = friction.direction;
        let mu = friction.coefficient;

        let (mut acc, vel): (VectorDim<DIM>, VectorDim<DIM>) = match &self.rotation {
            None => (
                acceleration.column(PHASE).into_owned(),
                velocity.column(PHASE).into_owned(),
            ),
            Some(rotation) => (
                rotation.inverse * acceleration.column(PHASE),
                rotation.inverse * velocity.column(PHASE),
            ),
        };

        let acc_n = acc[dir_n];
        if acc_n * sign(friction.sign as f64) <= 0.0 {
            return;
        }
        let limit = mu * acc_n.abs();

        let mut acc_t = acc;
        acc_t[dir_n] = 0.0;
        let mut vel_t = vel;
        vel_t[dir_n] = 0.0;

        if vel_t.norm() != 0.0 {
            // Kinetic
            let vel_net = vel_t + acc_t * dt;
            let vel_net_norm = vel_net.norm();
            if vel_net_norm <= limit * dt {
                acc_t = -vel_t / dt;
            } else {
                acc_t -= vel_net * (limit / vel_net_norm);
            }
        } else {
            // Static
            let acc_t_norm = acc_t.norm();
            if acc_t_norm <= limit {
                acc_t.fill(0.0);
            } else {
                acc_t -= acc_t * (limit / acc_t_norm);
            }
        }

        acc_t[dir_n] = acc_n;
        acc = acc_t;

        let global = match &self.rotation {
            None => acc,
            Some(rotation) => rotation.matrix * acc,
        };
        acceleration.set_column(PHASE, &global);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Matrix2, Matrix2x1, Vector2};

    #[test]
    fn test_velocity_direction_limits() {
        let mut set = ConstraintSet::<2, 2>::new();
        assert!(set.assign_velocity(3, 1.0).is_ok());
        assert!(matches!(
            set.assign_velocity(4, 1.0),
            Err(MpmError::InvalidDirection { direction: 4, limit: 4 })
        ));
    }

    #[test]
    fn test_velocity_constraint_maps_phase() {
        let mut set = ConstraintSet::<2, 2>::new();
        set.assign_velocity(3, -2.0).unwrap();
        let mut vel = PhaseMatrix::<2, 2>::from_element(1.0);
        let mut acc = PhaseMatrix::<2, 2>::from_element(1.0);
        set.apply_velocity(&mut vel, &mut acc);
        // direction 3 -> axis 1 of phase 1
        assert_eq!(vel[(1, 1)], -2.0);
        assert_eq!(acc[(1, 1)], 0.0);
        assert_eq!(vel[(1, 0)], 1.0);
    }

    #[test]
    fn test_velocity_constraint_skips_other_phases() {
        let mut set = ConstraintSet::<2, 2>::new();
        set.assign_velocity(0, 4.0).unwrap();
        set.assign_velocity(2, -4.0).unwrap();
        let mut vel = PhaseMatrix::<2, 2>::from_element(1.0);
        let mut acc = PhaseMatrix::<2, 2>::from_element(1.0);
        set.apply_velocity_to_phases(&mut vel, &mut acc, &[1]);
        assert_eq!(vel[(0, 1)], -4.0);
        assert_eq!(acc[(0, 1)], 0.0);
        // Phase 0 is left alone
        assert_eq!(vel[(0, 0)], 1.0);
        assert_eq!(acc[(0, 0)], 1.0);
    }

    #[test]
    fn test_singular_rotation_rejected() {
        let mut set = ConstraintSet::<2, 1>::new();
        assert!(matches!(
            set.assign_rotation(Matrix2::zeros()),
            Err(MpmError::SingularRotation)
        ));
        assert!(set.rotation_matrix().is_none());
    }

    #[test]
    fn test_rotated_constraint_acts_in_local_frame() {
        let theta = std::f64::consts::FRAC_PI_4;
        let rot = Matrix2::new(theta.cos(), -theta.sin(), theta.sin(), theta.cos());
        let mut set = ConstraintSet::<2, 1>::new();
        set.assign_rotation(rot).unwrap();
        // No velocity along the local x axis
        set.assign_velocity(0, 0.0).unwrap();

        let mut vel = Matrix2x1::new(1.0, 0.0);
        let mut acc = Matrix2x1::zeros();
        set.apply_velocity(&mut vel, &mut acc);

        let local = rot.transpose() * vel;
        assert_relative_eq!(local[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(local[1], -theta.sin(), epsilon = 1e-12);
    }

    #[test]
    fn test_static_friction_holds() {
        let mut set = ConstraintSet::<2, 1>::new();
        // Floor with outward normal along -y: friction active when a_y < 0
        set.assign_friction(1, -1, 0.5).unwrap();
        let vel = Matrix2x1::zeros();
        let mut acc = Matrix2x1::new(0.4, -1.0);
        set.apply_friction(&vel, &mut acc, 0.1);
        assert_eq!(acc[0], 0.0);
        assert_eq!(acc[1], -1.0);
    }

    #[test]
    fn test_static_friction_breaks_away() {
        let mut set = ConstraintSet::<2, 1>::new();
        set.assign_friction(1, -1, 0.5).unwrap();
        let vel = Matrix2x1::zeros();
        let mut acc = Matrix2x1::new(2.0, -1.0);
        set.apply_friction(&vel, &mut acc, 0.1);
        assert_relative_eq!(acc[0], 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_kinetic_friction_decelerates_and_stops() {
        let mut set = ConstraintSet::<2, 1>::new();
        set.assign_friction(1, -1, 0.5).unwrap();

        let vel = Matrix2x1::new(1.0, 0.0);
        let mut acc = Matrix2x1::new(0.0, -1.0);
        set.apply_friction(&vel, &mut acc, 0.1);
        assert_relative_eq!(acc[0], -0.5, epsilon = 1e-12);

        // Friction impulse exceeds tangential momentum: node stops
        let vel = Matrix2x1::new(0.01, 0.0);
        let mut acc = Matrix2x1::new(0.0, -1.0);
        set.apply_friction(&vel, &mut acc, 0.1);
        assert_relative_eq!(acc[0], -0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_friction_inactive_when_separating() {
        let mut set = ConstraintSet::<2, 1>::new();
        set.assign_friction(1, -1, 0.5).unwrap();
        let vel = Matrix2x1::new(1.0, 0.0);
        let mut acc = Matrix2x1::new(0.3, 2.0);
        set.apply_friction(&vel, &mut acc, 0.1);
        assert_eq!(acc, Matrix2x1::new(0.3, 2.0));
    }

    #[test]
    fn test_concentrated_force_validation() {
        let mut set = ConstraintSet::<2, 1>::new();
        assert!(set.assign_concentrated_force(1, 0, 1.0, None).is_err());
        assert!(set.assign_concentrated_force(0, 2, 1.0, None).is_err());
        set.assign_concentrated_force(0, 1, 4.0, Some(Arc::new(|t: f64| t)))
            .unwrap();
        assert_eq!(set.concentrated_force_at(0, 0.5), Vector2::new(0.0, 2.0));
    }
}
