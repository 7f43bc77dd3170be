//! MPM Core Example - two bodies meeting at a grid node, then an MLS fit

use std::sync::Arc;

use anyhow::{anyhow, Result};
use log::info;
use mpm_core::prelude::*;
use nalgebra::Vector2;

fn main() -> Result<()> {
    env_logger::init();

    println!("=== MPM Core Example: Two-material node ===\n");

    // One node shared by materials 1 and 2
    let pool = Arc::new(NodalProperties::multimaterial(1, 3, 2));
    let mut node = Node2D::new(0, Vector2::new(0.0, 0.0));
    node.initialise_property_handle(0, Arc::clone(&pool));

    //   material 1: m = 2.0, p = (2.0, 0.0)  --->
    //   material 2: m = 1.0, p = (0.0, 1.0)  ^
    let contributions = [
        (1u32, 2.0, Vector2::new(2.0, 0.0)),
        (2u32, 1.0, Vector2::new(0.0, 1.0)),
    ];
    for (material, mass, momentum) in &contributions {
        node.append_material_id(*material);
        node.update_mass(true, NodePhase::SOLID, *mass);
        node.update_momentum(true, NodePhase::SOLID, momentum);
        node.update_property(true, keys::MASSES, &[*mass], *material)?;
        node.update_property(true, keys::MOMENTA, momentum.as_slice(), *material)?;
    }

    node.compute_velocity();
    let velocity = node.velocity(NodePhase::SOLID);
    println!("Total mass:      {:.3}", node.mass(NodePhase::SOLID));
    println!("Common velocity: ({:.3}, {:.3})", velocity.x, velocity.y);

    node.compute_multimaterial_change_in_momentum();
    let mut total = Vector2::zeros();
    for (material, _, _) in &contributions {
        let change = node.property(keys::CHANGE_IN_MOMENTA, *material)?;
        println!(
            "Material {} change in momentum: ({:.3}, {:.3})",
            material, change[0], change[1]
        );
        total += Vector2::new(change[0], change[1]);
    }
    info!("momentum change sum = {:?}", total.as_slice());
    println!("Sum of changes:  ({:.3e}, {:.3e})", total.x, total.y);

    // Explicit step with a roller in y and gravity
    let dt = 1e-3;
    node.update_external_force(true, NodePhase::SOLID, &Vector2::new(0.0, -9.81 * 3.0));
    node.assign_velocity_constraint(1, 0.0)?;
    if node.compute_acceleration_velocity(NodePhase::SOLID, dt) {
        let v = node.velocity(NodePhase::SOLID);
        println!("\nVelocity after one step (dt = {dt}): ({:.4}, {:.4})", v.x, v.y);
    }

    println!("\n=== MLS fit of f(x, y) = 2 + 3x - y ===\n");

    let points = [
        Vector2::new(0.0, 0.0),
        Vector2::new(1.0, 0.0),
        Vector2::new(0.0, 1.0),
        Vector2::new(1.0, 1.2),
    ];
    let field: Vec<f64> = points.iter().map(|p| 2.0 + 3.0 * p.x - p.y).collect();
    let query = Vector2::new(0.5, 0.5);

    let mut mls = MlsInterpolation::with_options(query, &points, &MlsOptions::quadratic(1.0))?;
    mls.initialise_b_vector(&field)?;
    println!("Moment determinant: {:.6}", mls.moment_determinant());

    let value = mls
        .interpolate()
        .ok_or_else(|| anyhow!("singular moment matrix at {:?}", query.as_slice()))?;
    println!("Interpolated value at (0.5, 0.5): {value:.6} (exact 3.0)");

    if let Some(phi) = mls.shape_functions() {
        for (i, shape) in phi.iter().enumerate() {
            println!("  N{} = {:.6}", i, shape);
        }
        println!("  sum = {:.6}", phi.sum());
    }

    Ok(())
}
