use std::sync::Arc;

use approx::assert_relative_eq;
use mpm_core::prelude::*;
use nalgebra::{Matrix2, Vector2};
use rayon::prelude::*;

fn env_usize(name: &str, default_val: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(default_val)
}

/// Node 0 shared by materials 1 and 2 of a three-material pool
fn two_material_node() -> (Node2D, Arc<NodalProperties>) {
    let pool = Arc::new(NodalProperties::multimaterial(1, 3, 2));
    let mut node = Node2D::new(0, Vector2::zeros());
    node.initialise_property_handle(0, Arc::clone(&pool));

    let contributions = [
        (1u32, 2.0, Vector2::new(2.0, 0.0)),
        (2u32, 1.0, Vector2::new(0.0, 1.0)),
    ];
    for (material, mass, momentum) in contributions {
        node.append_material_id(material);
        node.update_mass(true, NodePhase::SOLID, mass);
        node.update_momentum(true, NodePhase::SOLID, &momentum);
        node.update_property(true, keys::MASSES, &[mass], material).unwrap();
        node.update_property(true, keys::MOMENTA, momentum.as_slice(), material)
            .unwrap();
    }
    (node, pool)
}

#[test]
fn two_materials_share_common_velocity() {
    let (mut node, _pool) = two_material_node();
    node.compute_velocity();

    assert_relative_eq!(node.mass(NodePhase::SOLID), 3.0);
    assert_relative_eq!(node.momentum(NodePhase::SOLID), Vector2::new(2.0, 1.0));
    assert_relative_eq!(
        node.velocity(NodePhase::SOLID),
        Vector2::new(2.0 / 3.0, 1.0 / 3.0),
        epsilon = 1e-12
    );

    node.compute_multimaterial_change_in_momentum();

    let dp1 = node.property(keys::CHANGE_IN_MOMENTA, 1).unwrap();
    let dp2 = node.property(keys::CHANGE_IN_MOMENTA, 2).unwrap();
    assert_relative_eq!(dp1[0], -2.0 / 3.0, epsilon = 1e-12);
    assert_relative_eq!(dp1[1], 2.0 / 3.0, epsilon = 1e-12);
    assert_relative_eq!(dp2[0], 2.0 / 3.0, epsilon = 1e-12);
    assert_relative_eq!(dp2[1], -2.0 / 3.0, epsilon = 1e-12);

    // Momentum is conserved across materials
    assert_relative_eq!(dp1[0] + dp2[0], 0.0, epsilon = 1e-12);
    assert_relative_eq!(dp1[1] + dp2[1], 0.0, epsilon = 1e-12);

    // Material 0 of the pool does not map to this node
    let untouched = node.property(keys::CHANGE_IN_MOMENTA, 0).unwrap();
    assert_eq!(untouched, vec![0.0, 0.0]);
}

#[test]
fn momentum_change_closes_gap_to_nodal_total() {
    let (mut node, _pool) = two_material_node();
    // Extra nodal momentum not carried by either material, e.g. from a
    // contribution mapped without a material id
    node.update_momentum(true, NodePhase::SOLID, &Vector2::new(1.0, 2.0));
    node.compute_velocity();
    let velocity = node.velocity(NodePhase::SOLID);
    assert_relative_eq!(velocity, Vector2::new(1.0, 1.0), epsilon = 1e-12);

    node.compute_multimaterial_change_in_momentum();

    let mut sum = Vector2::zeros();
    let (mut mass, mut momentum) = (0.0, Vector2::zeros());
    for material in [1, 2] {
        let dp = node.property(keys::CHANGE_IN_MOMENTA, material).unwrap();
        sum += Vector2::new(dp[0], dp[1]);
        mass += node.property(keys::MASSES, material).unwrap()[0];
        let p = node.property(keys::MOMENTA, material).unwrap();
        momentum += Vector2::new(p[0], p[1]);
    }
    // Σ Δp = v Σ m - Σ p
    assert_relative_eq!(sum, velocity * mass - momentum, epsilon = 1e-12);
    assert_relative_eq!(sum, Vector2::new(1.0, 2.0), epsilon = 1e-12);

    let dp1 = node.property(keys::CHANGE_IN_MOMENTA, 1).unwrap();
    assert_relative_eq!(dp1[0], 0.0, epsilon = 1e-12);
    assert_relative_eq!(dp1[1], 2.0, epsilon = 1e-12);
}

#[test]
fn velocity_constraint_overrides_accumulated_value() {
    let mut node = Node2D::new(7, Vector2::new(1.0, 2.0));
    node.update_mass(true, NodePhase::SOLID, 4.0);
    node.update_momentum(true, NodePhase::SOLID, &Vector2::new(-8.0, 12.0));
    node.assign_velocity_constraint(0, 5.0).unwrap();

    node.compute_velocity();
    assert_eq!(node.velocity(NodePhase::SOLID).x, 5.0);
    assert_relative_eq!(node.velocity(NodePhase::SOLID).y, 3.0);

    // A later accumulation is overridden again on the next pass
    node.update_vector_property(Vector::Velocity, true, NodePhase::SOLID, &Vector2::new(10.0, 0.0));
    node.apply_velocity_constraints();
    assert_eq!(node.velocity(NodePhase::SOLID).x, 5.0);
}

#[test]
fn velocity_constraints_are_idempotent() {
    let mut node = Node2D::new(0, Vector2::zeros());
    node.update_vector_property(Vector::Velocity, false, 0, &Vector2::new(1.5, -2.0));
    node.update_acceleration(false, 0, &Vector2::new(0.3, 0.4));
    node.assign_velocity_constraint(1, 0.25).unwrap();

    node.apply_velocity_constraints();
    let (v1, a1) = (node.velocity(0), node.acceleration(0));
    node.apply_velocity_constraints();
    assert_eq!(node.velocity(0), v1);
    assert_eq!(node.acceleration(0), a1);
    assert_eq!(a1.y, 0.0);
}

#[test]
fn rotated_velocity_constraints_are_idempotent() {
    let angle = std::f64::consts::FRAC_PI_6;
    let rotation = Matrix2::new(angle.cos(), -angle.sin(), angle.sin(), angle.cos());

    let mut node = Node2D::new(0, Vector2::zeros());
    node.update_vector_property(Vector::Velocity, false, 0, &Vector2::new(1.0, 1.0));
    node.assign_rotation_matrix(rotation).unwrap();
    node.assign_velocity_constraint(0, 0.0).unwrap();
    assert!(node.boolean_property(Boolean::GenericBC));

    node.apply_velocity_constraints();
    let once = node.velocity(0);
    // No velocity left along the rotated x axis
    let local = rotation.transpose() * once;
    assert_relative_eq!(local.x, 0.0, epsilon = 1e-12);

    node.apply_velocity_constraints();
    assert_relative_eq!(node.velocity(0), once, epsilon = 1e-12);
}

#[test]
fn invalid_assignments_are_rejected() {
    let mut node = Node2D::new(0, Vector2::zeros());
    assert!(matches!(
        node.assign_velocity_constraint(2, 1.0),
        Err(MpmError::InvalidDirection { direction: 2, .. })
    ));
    assert!(matches!(
        node.assign_concentrated_force(1, 0, 1.0, None),
        Err(MpmError::InvalidPhase { phase: 1, .. })
    ));
    assert!(matches!(
        node.assign_rotation_matrix(Matrix2::zeros()),
        Err(MpmError::SingularRotation)
    ));
    assert!(node.constraints().velocity_constraints().is_empty());
}

#[test]
fn concentrated_force_follows_time_function() {
    let mut node = Node2D::new(0, Vector2::zeros());
    let ramp: Arc<dyn TimeFunction> = Arc::new(LinearFunction::ramp(2.0).unwrap());
    node.assign_concentrated_force(0, 1, -10.0, Some(ramp)).unwrap();

    node.apply_concentrated_force(0, 0.5);
    assert_relative_eq!(node.external_force(0), Vector2::new(0.0, -2.5));

    // Past the ramp the full force is added on top
    node.apply_concentrated_force(0, 4.0);
    assert_relative_eq!(node.external_force(0), Vector2::new(0.0, -12.5));
}

#[test]
fn explicit_step_with_roller() {
    let mut node = Node2D::new(0, Vector2::zeros());
    node.update_mass(true, 0, 2.0);
    node.update_momentum(true, 0, &Vector2::new(2.0, 0.0));
    node.update_external_force(true, 0, &Vector2::new(1.0, -19.62));
    node.update_internal_force(true, 0, &Vector2::new(-0.5, 0.0));
    node.assign_velocity_constraint(1, 0.0).unwrap();

    node.compute_velocity();
    assert!(node.compute_acceleration_velocity(0, 0.1));
    assert_relative_eq!(node.acceleration(0), Vector2::new(0.25, 0.0), epsilon = 1e-12);
    assert_relative_eq!(node.velocity(0), Vector2::new(1.025, 0.0), epsilon = 1e-12);
}

#[test]
fn concurrent_accumulation_matches_serial_sum() {
    let nparticles = env_usize("MPM_TEST_PARTICLES", 20_000);
    let node = Node2D::new(0, Vector2::zeros());

    (0..nparticles).into_par_iter().for_each(|i| {
        let mass = 1.0 + (i % 7) as f64;
        let velocity = Vector2::new((i % 3) as f64, -((i % 5) as f64));
        node.update_mass(true, 0, mass);
        node.update_momentum(true, 0, &(velocity * mass));
        node.append_material_id((i % 4) as u32);
    });

    let (mut mass, mut momentum) = (0.0, Vector2::zeros());
    for i in 0..nparticles {
        let m = 1.0 + (i % 7) as f64;
        mass += m;
        momentum += Vector2::new((i % 3) as f64, -((i % 5) as f64)) * m;
    }

    // Integer-valued contributions sum exactly in any order
    assert_eq!(node.mass(0), mass);
    assert_eq!(node.momentum(0), momentum);
    assert_eq!(node.material_ids().len(), 4.min(nparticles));
}

#[test]
fn concurrent_pool_accumulation() {
    let nparticles = env_usize("MPM_TEST_PARTICLES", 20_000);
    let pool = Arc::new(NodalProperties::multimaterial(2, 2, 2));
    let mut nodes: Vec<Node2D> = (0..2).map(|id| Node2D::new(id, Vector2::zeros())).collect();
    for (prop_id, node) in nodes.iter_mut().enumerate() {
        node.initialise_property_handle(prop_id, Arc::clone(&pool));
    }

    (0..nparticles).into_par_iter().for_each(|i| {
        let node = &nodes[i % 2];
        node.update_property(true, keys::MASSES, &[1.0], (i % 2) as u32)
            .unwrap();
    });

    let half = (nparticles / 2) as f64;
    assert_eq!(pool.property(keys::MASSES, 0, 0).unwrap()[0], (nparticles - nparticles / 2) as f64);
    assert_eq!(pool.property(keys::MASSES, 1, 1).unwrap()[0], half);
    assert_eq!(pool.property(keys::MASSES, 0, 1).unwrap()[0], 0.0);
}

#[test]
fn two_phase_step_conserves_mixture_balance() {
    let mut node = TwoPhaseNode2D::new(0, Vector2::zeros());
    node.update_mass(true, NodePhase::SOLID, 2.0);
    node.update_mass(true, NodePhase::LIQUID, 1.0);
    node.update_external_force(true, NodePhase::MIXTURE, &Vector2::new(0.0, -30.0));
    node.update_external_force(true, NodePhase::LIQUID, &Vector2::new(0.0, -10.0));

    node.compute_velocity();
    assert!(node.compute_acceleration_velocity_twophase_explicit(0.01));

    // With no drag and no relative motion both phases fall together
    assert_relative_eq!(node.acceleration(NodePhase::SOLID), Vector2::new(0.0, -10.0), epsilon = 1e-12);
    assert_relative_eq!(node.acceleration(NodePhase::LIQUID), Vector2::new(0.0, -10.0), epsilon = 1e-12);
}
