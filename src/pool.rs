//! Shared per-material nodal property tables
//!
//! Each named property is a `(nnodes * nprops) x nmaterials` table: node `n`
//! owns rows `n * nprops .. (n + 1) * nprops`, material `m` owns column `m`.
//! Nodes reach their rows through a property id assigned at mesh creation.

use std::collections::HashMap;

use nalgebra::DVector;

use crate::error::{MpmError, MpmResult};
use crate::math::Mat;
use crate::sync::SpinMutex;

/// Names of the tables used by the multi-material contact passes
pub mod keys {
    /// Mass per material (1 value)
    pub const MASSES: &str = "masses";
    /// Momentum per material
    pub const MOMENTA: &str = "momenta";
    /// Momentum correction towards the common nodal velocity
    pub const CHANGE_IN_MOMENTA: &str = "change_in_momenta";
    /// Mass-weighted displacement per material
    pub const DISPLACEMENTS: &str = "displacements";
    /// Displacement relative to the contact (centre of mass) displacement
    pub const SEPARATION_VECTORS: &str = "separation_vectors";
    /// Gradient of the material domain indicator
    pub const DOMAIN_GRADIENTS: &str = "domain_gradients";
    /// Unit outward normal per material
    pub const NORMAL_UNIT_VECTORS: &str = "normal_unit_vectors";
}

#[derive(Debug)]
struct PropertyTable {
    nprops: usize,
    nnodes: usize,
    nmaterials: usize,
    data: SpinMutex<Mat>,
}

impl PropertyTable {
    fn check(&self, name: &str, node: usize, material: usize) -> MpmResult<usize> {
        if node >= self.nnodes || material >= self.nmaterials {
            return Err(MpmError::PropertyIndexOutOfRange {
                name: name.to_string(),
                node,
                material,
            });
        }
        Ok(node * self.nprops)
    }

    fn check_len(&self, name: &str, found: usize) -> MpmResult<()> {
        if found != self.nprops {
            return Err(MpmError::PropertySizeMismatch {
                name: name.to_string(),
                expected: self.nprops,
                found,
            });
        }
        Ok(())
    }
}

/// Pool of nodal properties shared by all nodes of a partition
#[derive(Debug, Default)]
pub struct NodalProperties {
    properties: HashMap<String, PropertyTable>,
}

impl NodalProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool with every table the contact passes read and write
    pub fn multimaterial(nnodes: usize, nmaterials: usize, dim: usize) -> Self {
        let mut pool = Self::new();
        let layout = [
            (keys::MASSES, 1),
            (keys::MOMENTA, dim),
            (keys::CHANGE_IN_MOMENTA, dim),
            (keys::DISPLACEMENTS, dim),
            (keys::SEPARATION_VECTORS, dim),
            (keys::DOMAIN_GRADIENTS, dim),
            (keys::NORMAL_UNIT_VECTORS, dim),
        ];
        for (name, nprops) in layout {
            pool.insert_table(name, nnodes, nprops, nmaterials);
        }
        pool
    }

    /// Create a zeroed table of `nprops` values per node and material
    pub fn create_property(
        &mut self,
        name: &str,
        nnodes: usize,
        nprops: usize,
        nmaterials: usize,
    ) -> MpmResult<()> {
        if self.properties.contains_key(name) {
            return Err(MpmError::DuplicateProperty(name.to_string()));
        }
        self.insert_table(name, nnodes, nprops, nmaterials);
        Ok(())
    }

    fn insert_table(&mut self, name: &str, nnodes: usize, nprops: usize, nmaterials: usize) {
        self.properties.insert(
            name.to_string(),
            PropertyTable {
                nprops,
                nnodes,
                nmaterials,
                data: SpinMutex::new(Mat::zeros(nnodes * nprops, nmaterials)),
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    fn table(&self, name: &str) -> MpmResult<&PropertyTable> {
        self.properties
            .get(name)
            .ok_or_else(|| MpmError::PropertyNotFound(name.to_string()))
    }

    /// Values of `name` for one node and material
    pub fn property(&self, name: &str, node: usize, material: usize) -> MpmResult<DVector<f64>> {
        let table = self.table(name)?;
        let row = table.check(name, node, material)?;
        let data = table.data.lock();
        Ok(data.view((row, material), (table.nprops, 1)).column(0).into_owned())
    }

    /// Overwrite the values of `name` for one node and material
    pub fn assign_property(&self, name: &str, node: usize, material: usize, value: &[f64]) -> MpmResult<()> {
        self.write(name, node, material, value, false)
    }

    /// Add to the values of `name` for one node and material
    pub fn update_property(&self, name: &str, node: usize, material: usize, value: &[f64]) -> MpmResult<()> {
        self.write(name, node, material, value, true)
    }

    fn write(&self, name: &str, node: usize, material: usize, value: &[f64], update: bool) -> MpmResult<()> {
        let table = self.table(name)?;
        let row = table.check(name, node, material)?;
        table.check_len(name, value.len())?;
        let mut data = table.data.lock();
        for (i, v) in value.iter().enumerate() {
            let slot = &mut data[(row + i, material)];
            if update {
                *slot += v;
            } else {
                *slot = *v;
            }
        }
        Ok(())
    }

    /// Zero every table, called once per step by the driver
    pub fn initialise_nodal_properties(&self) {
        for table in self.properties.values() {
            table.data.lock().fill(0.0);
        }
    }
}
