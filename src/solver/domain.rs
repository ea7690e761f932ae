use std::collections::BTreeMap;

use tracing::{debug, trace};

use super::engine::AnalysisEngine;
use super::materials::{UniaxialMaterial, UniaxialMaterialDef};
use crate::error::{Result, StructeasyError};

/// In-process engine
///
/// Keeps the model dimension, the created nodes and the registered uniaxial
/// materials, and runs strain driven material tests. It does not assemble or
/// solve anything.
#[derive(Default)]
pub struct Domain {
    dimension: Option<(usize, usize)>,
    nodes: BTreeMap<i32, Vec<f64>>,
    materials: BTreeMap<i32, UniaxialMaterialDef>,
    testing: Option<(i32, Box<dyn UniaxialMaterial>)>,
}

impl Domain {
    pub fn new() -> Domain {
        Domain::default()
    }

    /// Registers a uniaxial material under `tag`
    pub fn add_uniaxial_material(&mut self, tag: i32, material: UniaxialMaterialDef) -> Result<()> {
        material.validate()?;
        if self.materials.contains_key(&tag) {
            return Err(StructeasyError::Solver(format!(
                "Uniaxial material {tag} already exists"
            )));
        }
        debug!("uniaxial material {tag} ({})", material.type_name());
        self.materials.insert(tag, material);
        Ok(())
    }

    pub fn node_coords(&self, tag: i32) -> Option<&[f64]> {
        self.nodes.get(&tag).map(|c| c.as_slice())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn material(&self, tag: i32) -> Option<&UniaxialMaterialDef> {
        self.materials.get(&tag)
    }

    /// Tag of the material under test
    pub fn tested_material(&self) -> Option<i32> {
        self.testing.as_ref().map(|(tag, _)| *tag)
    }

    fn material_under_test(&mut self) -> Result<&mut Box<dyn UniaxialMaterial>> {
        match &mut self.testing {
            Some((_, material)) => Ok(material),
            None => Err(StructeasyError::Solver(
                "No material under test; call test_uniaxial_material first".to_owned(),
            )),
        }
    }
}

impl AnalysisEngine for Domain {
    fn wipe(&mut self) -> Result<()> {
        *self = Domain::default();
        Ok(())
    }

    fn model_basic(&mut self, ndm: usize, ndf: usize) -> Result<()> {
        if !(1..=3).contains(&ndm) || ndf == 0 {
            return Err(StructeasyError::Solver(format!(
                "Invalid model dimensions -ndm {ndm} -ndf {ndf}"
            )));
        }
        self.dimension = Some((ndm, ndf));
        Ok(())
    }

    fn dimension(&self) -> Option<(usize, usize)> {
        self.dimension
    }

    fn node(&mut self, tag: i32, coords: &[f64]) -> Result<()> {
        let (ndm, _) = self.dimension.ok_or_else(|| {
            StructeasyError::Solver("Nodes need a model; call model_basic first".to_owned())
        })?;
        if coords.len() != ndm {
            return Err(StructeasyError::Solver(format!(
                "Node {tag} has {} coordinates, the model has {ndm} dimensions",
                coords.len()
            )));
        }
        if self.nodes.contains_key(&tag) {
            return Err(StructeasyError::Solver(format!("Node {tag} already exists")));
        }
        self.nodes.insert(tag, coords.to_vec());
        Ok(())
    }

    fn test_uniaxial_material(&mut self, mat_tag: i32) -> Result<()> {
        let material = self.materials.get(&mat_tag).ok_or_else(|| {
            StructeasyError::Solver(format!("No uniaxial material with tag {mat_tag}"))
        })?;
        let instance = material.instantiate();
        debug!("testing uniaxial material {mat_tag} ({})", instance.name());
        self.testing = Some((mat_tag, instance));
        Ok(())
    }

    fn set_strain(&mut self, strain: f64) -> Result<()> {
        let material = self.material_under_test()?;
        material.set_trial_strain(strain);
        material.commit_state();
        trace!(
            "strain {strain}: stress {}, tangent {}",
            material.stress(),
            material.tangent()
        );
        Ok(())
    }

    fn get_stress(&self) -> Result<f64> {
        match &self.testing {
            Some((_, material)) => Ok(material.stress()),
            None => Err(StructeasyError::Solver(
                "No material under test; call test_uniaxial_material first".to_owned(),
            )),
        }
    }
}
