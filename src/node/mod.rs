//! Background grid node: accumulated particle state, constraints and the
//! explicit update engine
//!
//! Accumulating methods take `&self` and hold the node's spin lock for the
//! read-modify-write, so many mapping threads may push into the same node.
//! Integration, contact and constraint passes take `&mut self` and run
//! without locking once accumulation for the step is complete.

mod constraints;
mod contact;
mod integration;
mod properties;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use log::warn;

use crate::error::{MpmError, MpmResult};
use crate::functions::TimeFunction;
use crate::math::{MatrixDim, VectorDim};
use crate::options::NodeOptions;
use crate::pool::NodalProperties;
use crate::sync::SpinMutex;

pub use constraints::{ConstraintSet, FrictionConstraint};
pub use properties::{Boolean, PropertyStore, Scalar, Vector};

/// Node and ghost identifiers
pub type Index = u64;

/// Phase indices of a two-phase node
pub struct NodePhase;

impl NodePhase {
    /// Solid skeleton; also carries mixture forces in two-phase analyses
    pub const SOLID: usize = 0;
    pub const MIXTURE: usize = 0;
    pub const LIQUID: usize = 1;
}

/// Single-phase 2D node
pub type Node2D = Node<2, 1>;
/// Single-phase 3D node
pub type Node3D = Node<3, 1>;
/// Solid-liquid 2D node
pub type TwoPhaseNode2D = Node<2, 2>;
/// Solid-liquid 3D node
pub type TwoPhaseNode3D = Node<3, 2>;

/// Per-step state written concurrently by the mapping routines
#[derive(Debug, Default)]
struct NodalState<const DIM: usize, const NPHASES: usize> {
    status: bool,
    properties: PropertyStore<DIM, NPHASES>,
    material_ids: BTreeSet<u32>,
    mpi_ranks: BTreeSet<u32>,
}

/// Handle into the shared nodal property pool
#[derive(Clone)]
struct PropertyHandle {
    prop_id: usize,
    pool: Arc<NodalProperties>,
}

/// A background grid node of dimension `DIM` carrying `NPHASES` phases
pub struct Node<const DIM: usize, const NPHASES: usize> {
    id: Index,
    coordinates: VectorDim<DIM>,
    ghost_id: Option<Index>,
    options: NodeOptions,
    state: SpinMutex<NodalState<DIM, NPHASES>>,
    constraints: ConstraintSet<DIM, NPHASES>,
    property_handle: Option<PropertyHandle>,
    contact_displacement: VectorDim<DIM>,
}

impl<const DIM: usize, const NPHASES: usize> fmt::Debug for Node<DIM, NPHASES> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("coordinates", &self.coordinates)
            .field("ghost_id", &self.ghost_id)
            .field("state", &self.state)
            .field("constraints", &self.constraints)
            .field("prop_id", &self.property_handle.as_ref().map(|h| h.prop_id))
            .finish()
    }
}

impl<const DIM: usize, const NPHASES: usize> Node<DIM, NPHASES> {
    /// Create a node with default tolerances
    pub fn new(id: Index, coordinates: VectorDim<DIM>) -> Self {
        Self::with_options(id, coordinates, NodeOptions::default())
    }

    pub fn with_options(id: Index, coordinates: VectorDim<DIM>, options: NodeOptions) -> Self {
        Self {
            id,
            coordinates,
            ghost_id: None,
            options,
            state: SpinMutex::new(NodalState::default()),
            constraints: ConstraintSet::new(),
            property_handle: None,
            contact_displacement: VectorDim::zeros(),
        }
    }

    /// Reset per-step state: status, accumulators and material ids
    ///
    /// Constraints, boolean flags and concentrated forces persist.
    pub fn initialise(&mut self) {
        let state = self.state.get_mut();
        state.status = false;
        state.properties.reset();
        state.material_ids.clear();
        self.contact_displacement.fill(0.0);
    }

    /// Attach the shared property pool; `prop_id` selects this node's rows
    pub fn initialise_property_handle(&mut self, prop_id: usize, pool: Arc<NodalProperties>) {
        self.property_handle = Some(PropertyHandle { prop_id, pool });
    }

    pub fn id(&self) -> Index {
        self.id
    }

    pub fn coordinates(&self) -> VectorDim<DIM> {
        self.coordinates
    }

    pub fn assign_coordinates(&mut self, coordinates: VectorDim<DIM>) {
        self.coordinates = coordinates;
    }

    /// Degrees of freedom per phase
    pub fn dof(&self) -> usize {
        DIM
    }

    pub fn options(&self) -> &NodeOptions {
        &self.options
    }

    pub fn assign_status(&self, status: bool) {
        self.state.lock().status = status;
    }

    pub fn status(&self) -> bool {
        self.state.lock().status
    }

    pub fn ghost_id(&self) -> Option<Index> {
        self.ghost_id
    }

    pub fn assign_ghost_id(&mut self, gid: Index) {
        self.ghost_id = Some(gid);
    }

    // ========================
    // Properties
    // ========================

    pub fn assign_boolean_property(&mut self, property: Boolean, value: bool) {
        self.state.get_mut().properties.assign_boolean(property, value);
    }

    pub fn boolean_property(&self, property: Boolean) -> bool {
        self.state.lock().properties.boolean(property)
    }

    /// Phases outside `0..NPHASES` are logged and ignored
    fn check_phase(&self, phase: usize) -> bool {
        if phase >= NPHASES {
            warn!("node {}: invalid phase {} of {}", self.id, phase, NPHASES);
            return false;
        }
        true
    }

    /// Add to (`update`) or overwrite a scalar property
    ///
    /// An invalid phase leaves the node unchanged.
    pub fn update_scalar_property(&self, property: Scalar, update: bool, phase: usize, value: f64) {
        if !self.check_phase(phase) {
            return;
        }
        self.state
            .lock()
            .properties
            .update_scalar(property, update, phase, value);
    }

    /// Stored scalar, or zero for an invalid phase
    pub fn scalar_property(&self, property: Scalar, phase: usize) -> f64 {
        if !self.check_phase(phase) {
            return 0.0;
        }
        self.state.lock().properties.scalar(property, phase)
    }

    /// Add to (`update`) or overwrite a vector property
    ///
    /// An invalid phase leaves the node unchanged.
    pub fn update_vector_property(
        &self,
        property: Vector,
        update: bool,
        phase: usize,
        value: &VectorDim<DIM>,
    ) {
        if !self.check_phase(phase) {
            return;
        }
        self.state
            .lock()
            .properties
            .update_vector(property, update, phase, value);
    }

    /// Stored vector, or zeros for an invalid phase
    pub fn vector_property(&self, property: Vector, phase: usize) -> VectorDim<DIM> {
        if !self.check_phase(phase) {
            return VectorDim::zeros();
        }
        self.state.lock().properties.vector(property, phase)
    }

    pub fn update_mass(&self, update: bool, phase: usize, mass: f64) {
        self.update_scalar_property(Scalar::Mass, update, phase, mass);
    }

    pub fn mass(&self, phase: usize) -> f64 {
        self.scalar_property(Scalar::Mass, phase)
    }

    pub fn update_volume(&self, update: bool, phase: usize, volume: f64) {
        self.update_scalar_property(Scalar::Volume, update, phase, volume);
    }

    pub fn volume(&self, phase: usize) -> f64 {
        self.scalar_property(Scalar::Volume, phase)
    }

    pub fn update_momentum(&self, update: bool, phase: usize, momentum: &VectorDim<DIM>) {
        self.update_vector_property(Vector::Momentum, update, phase, momentum);
    }

    pub fn momentum(&self, phase: usize) -> VectorDim<DIM> {
        self.vector_property(Vector::Momentum, phase)
    }

    pub fn velocity(&self, phase: usize) -> VectorDim<DIM> {
        self.vector_property(Vector::Velocity, phase)
    }

    pub fn update_acceleration(&self, update: bool, phase: usize, acceleration: &VectorDim<DIM>) {
        self.update_vector_property(Vector::Acceleration, update, phase, acceleration);
    }

    pub fn acceleration(&self, phase: usize) -> VectorDim<DIM> {
        self.vector_property(Vector::Acceleration, phase)
    }

    pub fn update_external_force(&self, update: bool, phase: usize, force: &VectorDim<DIM>) {
        self.update_vector_property(Vector::ExternalForce, update, phase, force);
    }

    pub fn external_force(&self, phase: usize) -> VectorDim<DIM> {
        self.vector_property(Vector::ExternalForce, phase)
    }

    pub fn update_internal_force(&self, update: bool, phase: usize, force: &VectorDim<DIM>) {
        self.update_vector_property(Vector::InternalForce, update, phase, force);
    }

    pub fn internal_force(&self, phase: usize) -> VectorDim<DIM> {
        self.vector_property(Vector::InternalForce, phase)
    }

    /// Drag coefficient between solid and liquid, stored on the solid phase
    pub fn update_drag_force_coefficient(&self, update: bool, drag: &VectorDim<DIM>) {
        self.update_vector_property(Vector::DragForce, update, NodePhase::SOLID, drag);
    }

    pub fn drag_force_coefficient(&self) -> VectorDim<DIM> {
        self.vector_property(Vector::DragForce, NodePhase::SOLID)
    }

    /// Accumulate mass times pressure, later divided out by `compute_pressure`
    pub fn update_mass_pressure(&self, update: bool, phase: usize, mass_pressure: f64) {
        self.update_scalar_property(Scalar::MassPressure, update, phase, mass_pressure);
    }

    pub fn update_pressure(&self, update: bool, phase: usize, pressure: f64) {
        self.update_scalar_property(Scalar::Pressure, update, phase, pressure);
    }

    pub fn pressure(&self, phase: usize) -> f64 {
        self.scalar_property(Scalar::Pressure, phase)
    }

    // ========================
    // Materials and ranks
    // ========================

    pub fn append_material_id(&self, id: u32) {
        self.state.lock().material_ids.insert(id);
    }

    pub fn material_ids(&self) -> BTreeSet<u32> {
        self.state.lock().material_ids.clone()
    }

    /// Record a rank sharing this node; false if it was already recorded
    pub fn assign_mpi_rank(&self, rank: u32) -> bool {
        self.state.lock().mpi_ranks.insert(rank)
    }

    pub fn mpi_ranks(&self) -> BTreeSet<u32> {
        self.state.lock().mpi_ranks.clone()
    }

    pub fn clear_mpi_ranks(&mut self) {
        self.state.get_mut().mpi_ranks.clear();
    }

    /// Push a per-material contribution into the shared pool
    ///
    /// `value` holds one entry per component of the named property.
    pub fn update_property(
        &self,
        update: bool,
        property: &str,
        value: &[f64],
        material_id: u32,
    ) -> MpmResult<()> {
        let handle = self
            .property_handle
            .as_ref()
            .ok_or(MpmError::MissingPropertyHandle(self.id))?;
        // Serialise writes to this node's rows
        let _guard = self.state.lock();
        if update {
            handle
                .pool
                .update_property(property, handle.prop_id, material_id as usize, value)
        } else {
            handle
                .pool
                .assign_property(property, handle.prop_id, material_id as usize, value)
        }
    }

    /// Read this node's entry of a pool property for one material
    pub fn property(&self, property: &str, material_id: u32) -> MpmResult<Vec<f64>> {
        let handle = self
            .property_handle
            .as_ref()
            .ok_or(MpmError::MissingPropertyHandle(self.id))?;
        let values = handle
            .pool
            .property(property, handle.prop_id, material_id as usize)?;
        Ok(values.iter().copied().collect())
    }

    // ========================
    // Constraints and loads
    // ========================

    pub fn constraints(&self) -> &ConstraintSet<DIM, NPHASES> {
        &self.constraints
    }

    /// Prescribe a velocity; `direction` runs over `0..DIM * NPHASES`
    pub fn assign_velocity_constraint(&mut self, direction: usize, velocity: f64) -> MpmResult<()> {
        self.constraints
            .assign_velocity(direction, velocity)
            .inspect_err(|e| warn!("node {}: velocity constraint rejected: {}", self.id, e))
    }

    /// Overwrite constrained velocity components and zero their accelerations
    pub fn apply_velocity_constraints(&mut self) {
        let (velocity, acceleration) = self.state.get_mut().properties.velocity_acceleration_mut();
        self.constraints.apply_velocity(velocity, acceleration);
    }

    /// Assign Coulomb friction on the boundary normal to `direction`
    pub fn assign_friction_constraint(&mut self, direction: usize, sign: i32, friction: f64) -> MpmResult<()> {
        self.constraints
            .assign_friction(direction, sign, friction)
            .inspect_err(|e| warn!("node {}: friction constraint rejected: {}", self.id, e))?;
        self.assign_boolean_property(Boolean::Friction, true);
        Ok(())
    }

    /// Apply friction to the phase 0 acceleration if a friction constraint is set
    pub fn apply_friction_constraints(&mut self, dt: f64) {
        let properties = &mut self.state.get_mut().properties;
        if !properties.boolean(Boolean::Friction) {
            return;
        }
        let (velocity, acceleration) = properties.velocity_acceleration_mut();
        self.constraints.apply_friction(velocity, acceleration, dt);
    }

    /// Express constraints of this node in the frame given by `rotation`
    pub fn assign_rotation_matrix(&mut self, rotation: MatrixDim<DIM>) -> MpmResult<()> {
        self.constraints
            .assign_rotation(rotation)
            .inspect_err(|e| warn!("node {}: rotation matrix rejected: {}", self.id, e))?;
        self.assign_boolean_property(Boolean::GenericBC, true);
        Ok(())
    }

    /// Prescribe the pressure of `phase`, optionally scaled in time
    pub fn assign_pressure_constraint(
        &mut self,
        phase: usize,
        pressure: f64,
        function: Option<Arc<dyn TimeFunction>>,
    ) -> MpmResult<()> {
        self.constraints
            .assign_pressure(phase, pressure, function)
            .inspect_err(|e| warn!("node {}: pressure constraint rejected: {}", self.id, e))
    }

    /// Overwrite the pressure of `phase` with its prescribed value at `current_time`
    pub fn apply_pressure_constraint(&mut self, phase: usize, current_time: f64) {
        if let Some(pressure) = self.constraints.pressure_at(phase, current_time) {
            self.state
                .get_mut()
                .properties
                .update_scalar(Scalar::Pressure, false, phase, pressure);
        }
    }

    /// Store a concentrated force component with an optional time function
    ///
    /// `direction` is a per-phase axis in `0..DIM`.
    pub fn assign_concentrated_force(
        &mut self,
        phase: usize,
        direction: usize,
        force: f64,
        function: Option<Arc<dyn TimeFunction>>,
    ) -> MpmResult<()> {
        self.constraints
            .assign_concentrated_force(phase, direction, force, function)
            .inspect_err(|e| warn!("node {}: concentrated force rejected: {}", self.id, e))
    }

    /// Add the concentrated force at `current_time` to the external force
    pub fn apply_concentrated_force(&self, phase: usize, current_time: f64) {
        if !self.check_phase(phase) {
            return;
        }
        let force = self.constraints.concentrated_force_at(phase, current_time);
        self.update_external_force(true, phase, &force);
    }
}
