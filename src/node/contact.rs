//! Multi-material contact response at a shared node
//!
//! These passes never fail a step. A node without a property pool, or a
//! pool missing one of the contact tables, is left untouched.

use log::{debug, warn};

use super::Node;
use crate::error::MpmResult;
use crate::math::VectorDim;
use crate::pool::{keys, NodalProperties};

impl<const DIM: usize, const NPHASES: usize> Node<DIM, NPHASES> {
    /// Pool, property id and material ids when more than one material maps here
    fn contact_context(&self) -> Option<(&NodalProperties, usize, Vec<u32>)> {
        let handle = self.property_handle.as_ref()?;
        let materials: Vec<u32> = self.state.lock().material_ids.iter().copied().collect();
        if materials.len() < 2 {
            return None;
        }
        Some((handle.pool.as_ref(), handle.prop_id, materials))
    }

    /// Momentum each material needs to move with the common nodal velocity:
    /// `dp_m = v * m_m - p_m`, written to `change_in_momenta`
    ///
    /// Expects `compute_velocity` to have run on the total nodal momentum.
    pub fn compute_multimaterial_change_in_momentum(&mut self) {
        let Some((pool, node, materials)) = self.contact_context() else {
            return;
        };
        let velocity = self.velocity(0);
        let result: MpmResult<()> = materials.iter().try_for_each(|&mat| {
            let mat = mat as usize;
            let mass = pool.property(keys::MASSES, node, mat)?[0];
            let momentum = read_vector::<DIM>(pool, keys::MOMENTA, node, mat)?;
            let change = velocity * mass - momentum;
            pool.assign_property(keys::CHANGE_IN_MOMENTA, node, mat, change.as_slice())
        });
        if let Err(e) = result {
            warn!("node {}: change in momentum skipped: {}", self.id, e);
        }
    }

    /// Displacement of each material relative to the contact displacement
    ///
    /// `displacements` holds mass-weighted displacements; the contact
    /// displacement is their sum over the total material mass. The result is
    /// written to `separation_vectors`.
    pub fn compute_multimaterial_separation_vector(&mut self) {
        let Some((pool, node, materials)) = self.contact_context() else {
            return;
        };
        let result = (|| -> MpmResult<Option<VectorDim<DIM>>> {
            let mut masses = Vec::with_capacity(materials.len());
            let mut weighted = Vec::with_capacity(materials.len());
            for &mat in &materials {
                masses.push(pool.property(keys::MASSES, node, mat as usize)?[0]);
                weighted.push(read_vector::<DIM>(pool, keys::DISPLACEMENTS, node, mat as usize)?);
            }
            let total_mass: f64 = masses.iter().sum();
            if total_mass <= self.options.mass_tolerance {
                return Ok(None);
            }
            let contact = weighted.iter().sum::<VectorDim<DIM>>() / total_mass;
            for ((&mat, &mass), displacement) in materials.iter().zip(&masses).zip(&weighted) {
                let separation = if mass > self.options.mass_tolerance {
                    displacement / mass - contact
                } else {
                    VectorDim::<DIM>::zeros()
                };
                pool.assign_property(keys::SEPARATION_VECTORS, node, mat as usize, separation.as_slice())?;
            }
            Ok(Some(contact))
        })();
        match result {
            Ok(Some(contact)) => self.contact_displacement = contact,
            Ok(None) => debug!("node {}: no material mass for separation", self.id),
            Err(e) => warn!("node {}: separation vector skipped: {}", self.id, e),
        }
    }

    /// Normalise each material's domain gradient into `normal_unit_vectors`
    ///
    /// Gradients shorter than the zero threshold give a zero normal, meaning
    /// no contact correction for that material.
    pub fn compute_multimaterial_normal_unit_vector(&mut self) {
        let Some((pool, node, materials)) = self.contact_context() else {
            return;
        };
        let threshold = self.options.zero_threshold;
        let result: MpmResult<()> = materials.iter().try_for_each(|&mat| {
            let mat = mat as usize;
            let gradient = read_vector::<DIM>(pool, keys::DOMAIN_GRADIENTS, node, mat)?;
            let normal = gradient
                .try_normalize(threshold)
                .unwrap_or_else(VectorDim::<DIM>::zeros);
            pool.assign_property(keys::NORMAL_UNIT_VECTORS, node, mat, normal.as_slice())
        });
        if let Err(e) = result {
            warn!("node {}: normal unit vector skipped: {}", self.id, e);
        }
    }

    /// Relative separation of `material` from `other` along `material`'s
    /// contact normal
    ///
    /// Positive values mean `material` moves towards `other`, negative values
    /// mean they separate. Returns `None` when the node has no pool or the
    /// tables do not hold both materials.
    pub fn separation_along_normal(&self, material: u32, other: u32) -> Option<f64> {
        let handle = self.property_handle.as_ref()?;
        let pool = handle.pool.as_ref();
        let node = handle.prop_id;
        let read = |name: &str, mat: u32| read_vector::<DIM>(pool, name, node, mat as usize).ok();
        let separation =
            read(keys::SEPARATION_VECTORS, material)? - read(keys::SEPARATION_VECTORS, other)?;
        let normal = read(keys::NORMAL_UNIT_VECTORS, material)?;
        Some(separation.dot(&normal))
    }

    /// Centre-of-mass displacement from the last separation pass
    pub fn contact_displacement(&self) -> VectorDim<DIM> {
        self.contact_displacement
    }
}

fn read_vector<const DIM: usize>(
    pool: &NodalProperties,
    name: &str,
    node: usize,
    material: usize,
) -> MpmResult<VectorDim<DIM>> {
    let values = pool.property(name, node, material)?;
    if values.len() != DIM {
        return Err(crate::error::MpmError::PropertySizeMismatch {
            name: name.to_string(),
            expected: DIM,
            found: values.len(),
        });
    }
    Ok(VectorDim::<DIM>::from_iterator(values.iter().copied()))
}
