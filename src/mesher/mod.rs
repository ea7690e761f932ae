//! Geometry import.
//!
//! Points and curves of a gmsh geometry become [`Node`]s and [`Element`]s,
//! each tagged with the physical group it belongs to.

mod geo;
mod msh;
mod session;

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use indicatif::ProgressBar;
use tracing::{info, warn};

use crate::{
    datatypes::{Element, ElementKind, ElementMap, Node, NodeMap, UNGROUPED_TAG},
    error::{Result, StructeasyError},
};

pub use geo::{parse_geo, GeoReport};
pub use msh::parse_msh;
pub use session::GmshSession;

/// Environment variable naming the gmsh executable
pub const GMSH_ENV: &str = "STRUCTEASY_GMSH";

/// How a geometry file is turned into a [`GeometryModel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportBackend {
    /// Read natively when possible, otherwise run gmsh
    #[default]
    Auto,
    /// Only use the built-in `.geo` and `.msh` readers
    Native,
    /// Always run the gmsh executable
    Gmsh,
}

impl FromStr for ImportBackend {
    type Err = StructeasyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(ImportBackend::Auto),
            "native" => Ok(ImportBackend::Native),
            "gmsh" => Ok(ImportBackend::Gmsh),
            other => Err(StructeasyError::InvalidArgument(format!(
                "unknown import backend '{other}', try \"auto\", \"native\" or \"gmsh\""
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub backend: ImportBackend,
    pub gmsh_executable: PathBuf,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            backend: ImportBackend::Auto,
            gmsh_executable: PathBuf::from("gmsh"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhysicalGroup {
    pub name: Option<String>,
    pub entities: Vec<i32>,
}

/// Points, curves and physical groups of a geometry
///
/// The queries follow the entity model of gmsh: entities are `(dim, tag)`
/// pairs, physical groups are `(dim, tag)` pairs owning entity tags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryModel {
    points: BTreeMap<i32, [f64; 3]>,
    curves: BTreeMap<i32, Vec<i32>>,
    physical_groups: BTreeMap<(i32, i32), PhysicalGroup>,
}

impl GeometryModel {
    pub fn new() -> GeometryModel {
        GeometryModel::default()
    }

    pub fn add_point(&mut self, tag: i32, coords: [f64; 3]) -> Result<()> {
        if self.points.contains_key(&tag) {
            return Err(StructeasyError::Mesh(format!("Point {tag} already exists")));
        }
        self.points.insert(tag, coords);
        Ok(())
    }

    /// Registers a curve bounded by existing points
    pub fn add_curve(&mut self, tag: i32, bounding_points: Vec<i32>) -> Result<()> {
        if self.curves.contains_key(&tag) {
            return Err(StructeasyError::Mesh(format!("Curve {tag} already exists")));
        }
        if let Some(missing) = bounding_points
            .iter()
            .find(|p| !self.points.contains_key(p))
        {
            return Err(StructeasyError::Mesh(format!(
                "Curve {tag} references unknown point {missing}"
            )));
        }
        self.curves.insert(tag, bounding_points);
        Ok(())
    }

    pub fn has_point(&self, tag: i32) -> bool {
        self.points.contains_key(&tag)
    }

    pub fn add_to_physical_group(
        &mut self,
        dim: i32,
        tag: i32,
        name: Option<String>,
        entities: &[i32],
    ) {
        let group = self.physical_groups.entry((dim, tag)).or_default();
        if name.is_some() {
            group.name = name;
        }
        let mut present: HashSet<i32> = group.entities.iter().copied().collect();
        for entity in entities {
            if present.insert(*entity) {
                group.entities.push(*entity);
            }
        }
    }

    pub fn remove_from_physical_group(&mut self, dim: i32, tag: i32, entities: &[i32]) {
        if let Some(group) = self.physical_groups.get_mut(&(dim, tag)) {
            let removed: HashSet<i32> = entities.iter().copied().collect();
            group.entities.retain(|e| !removed.contains(e));
        }
    }

    /// Tag of the named group of dimension `dim`, if any
    pub fn physical_tag_by_name(&self, dim: i32, name: &str) -> Option<i32> {
        self.physical_groups
            .iter()
            .find(|((d, _), group)| *d == dim && group.name.as_deref() == Some(name))
            .map(|((_, tag), _)| *tag)
    }

    /// Largest physical tag over all dimensions, 0 when there is none
    pub fn max_physical_tag(&self) -> i32 {
        self.physical_groups
            .keys()
            .map(|(_, tag)| *tag)
            .max()
            .unwrap_or(0)
    }

    /// Entities of dimension `dim` as `(dim, tag)` pairs, ordered by tag
    pub fn entities(&self, dim: i32) -> Vec<(i32, i32)> {
        match dim {
            0 => self.points.keys().map(|t| (0, *t)).collect(),
            1 => self.curves.keys().map(|t| (1, *t)).collect(),
            _ => Vec::new(),
        }
    }

    /// Physical groups as `(dim, tag)` pairs, ordered by dimension then tag
    pub fn physical_groups(&self) -> Vec<(i32, i32)> {
        self.physical_groups.keys().copied().collect()
    }

    pub fn physical_name(&self, dim: i32, tag: i32) -> Option<&str> {
        self.physical_groups
            .get(&(dim, tag))
            .and_then(|g| g.name.as_deref())
    }

    pub fn entities_for_physical_group(&self, dim: i32, tag: i32) -> Vec<i32> {
        self.physical_groups
            .get(&(dim, tag))
            .map(|g| g.entities.clone())
            .unwrap_or_default()
    }

    /// Coordinates of a point entity
    pub fn value(&self, dim: i32, tag: i32) -> Result<[f64; 3]> {
        if dim != 0 {
            return Err(StructeasyError::Mesh(format!(
                "Coordinates are only available for points, got entity ({dim}, {tag})"
            )));
        }
        self.points
            .get(&tag)
            .copied()
            .ok_or_else(|| StructeasyError::Mesh(format!("Unknown point {tag}")))
    }

    /// Boundary of an entity as `(dim, tag)` pairs
    pub fn boundary(&self, dim: i32, tag: i32) -> Result<Vec<(i32, i32)>> {
        match dim {
            0 if self.points.contains_key(&tag) => Ok(Vec::new()),
            1 => match self.curves.get(&tag) {
                Some(points) => Ok(points.iter().map(|p| (0, *p)).collect()),
                None => Err(StructeasyError::Mesh(format!("Unknown curve {tag}"))),
            },
            _ => Err(StructeasyError::Mesh(format!(
                "No boundary available for entity ({dim}, {tag})"
            ))),
        }
    }
}

/// Finds the physical group an entity belongs to
///
/// Scans every group in order; the last group of dimension `dim` containing
/// `entity` wins. Several matches are reported as a warning.
///
/// # Arguments
/// * `entity` - The entity tag
/// * `dim` - The entity dimension
/// * `groups` - The physical groups of the model
/// * `model` - The model owning the groups
///
/// # Returns
/// The physical tag, or `UNGROUPED_TAG` when no group contains the entity
pub fn assign_tag(entity: i32, dim: i32, groups: &[(i32, i32)], model: &GeometryModel) -> i32 {
    let mut tag = UNGROUPED_TAG;
    let mut matches: Vec<i32> = Vec::new();

    for (group_dim, group_tag) in groups {
        if *group_dim == dim
            && model
                .entities_for_physical_group(*group_dim, *group_tag)
                .contains(&entity)
        {
            tag = *group_tag;
            matches.push(*group_tag);
        }
    }

    if matches.len() > 1 {
        warn!(
            "entity ({dim}, {entity}) belongs to physical groups {:?}; using {tag}",
            matches
        );
    }

    tag
}

/// Converts the entities of a geometry model into nodes and elements
///
/// # Arguments
/// * `model` - The geometry model
///
/// # Returns
/// A tuple with the node map and the element map, in that order
pub fn build_model(model: &GeometryModel) -> Result<(NodeMap, ElementMap)> {
    let groups = model.physical_groups();

    let mut nodes = NodeMap::new();
    for (_, tag) in model.entities(0) {
        let [x, y, z] = model.value(0, tag)?;
        let group = assign_tag(tag, 0, &groups, model);
        nodes.insert(tag, Node::new(tag, x, y, Some(z), group));
    }

    let curves = model.entities(1);
    let mut elements = ElementMap::new();
    let mut skipped: usize = 0;

    let bar = ProgressBar::new(curves.len() as u64);
    for (_, tag) in curves {
        bar.inc(1);

        let mut element_nodes: Vec<Node> = Vec::new();
        for (_, point) in model.boundary(1, tag)? {
            match nodes.get(&point) {
                Some(node) => element_nodes.push(node.clone()),
                None => {
                    return Err(StructeasyError::Mesh(format!(
                        "Curve {tag} is bounded by point {point}, which is not in the model"
                    )))
                }
            }
        }

        if element_nodes.len() < 2 {
            warn!("curve {tag} has fewer than two boundary points and was skipped");
            skipped += 1;
            continue;
        }

        let group = assign_tag(tag, 1, &groups, model);
        let element = Element::new(tag, element_nodes, group)?.with_kind(ElementKind::Uniaxial);
        elements.insert(tag, element);
    }
    bar.finish_and_clear();

    if skipped > 0 {
        warn!("skipped {skipped} closed or degenerate curves");
    }

    Ok((nodes, elements))
}

/// Imports a geometry file into node and element maps
///
/// The gmsh session is released when this returns, on success and on error.
///
/// # Arguments
/// * `geometry_file` - A `.geo`, `.msh` or any file gmsh can read
/// * `options` - Backend selection and gmsh executable
///
/// # Returns
/// A tuple with the node map and the element map, in that order
pub fn import_geofile(
    geometry_file: impl AsRef<Path>,
    options: &ImportOptions,
) -> Result<(NodeMap, ElementMap)> {
    let session = GmshSession::open(geometry_file.as_ref(), options)?;
    let (nodes, elements) = build_model(session.model())?;

    info!(
        "loaded {} nodes and {} elements",
        nodes.len(),
        elements.len()
    );

    Ok((nodes, elements))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> GeometryModel {
        let mut model = GeometryModel::new();
        model.add_point(1, [0.0, 0.0, 0.0]).unwrap();
        model.add_point(2, [0.0, 0.0, 3.0]).unwrap();
        model.add_point(3, [4.0, 0.0, 3.0]).unwrap();
        model.add_curve(1, vec![1, 2]).unwrap();
        model.add_curve(2, vec![2, 3]).unwrap();
        model.add_to_physical_group(0, 10, Some("supports".into()), &[1]);
        model.add_to_physical_group(1, 20, None, &[1]);
        model
    }

    #[test]
    fn test_assign_tag_no_group() {
        let model = frame();
        let groups = model.physical_groups();
        assert_eq!(assign_tag(3, 0, &groups, &model), UNGROUPED_TAG);
        assert_eq!(assign_tag(2, 1, &groups, &model), UNGROUPED_TAG);
    }

    #[test]
    fn test_assign_tag_single_match() {
        let model = frame();
        let groups = model.physical_groups();
        assert_eq!(assign_tag(1, 0, &groups, &model), 10);
        assert_eq!(assign_tag(1, 1, &groups, &model), 20);
    }

    #[test]
    fn test_assign_tag_ignores_other_dimensions() {
        let mut model = frame();
        // curve group containing tag 3 must not tag point 3
        model.add_to_physical_group(1, 30, None, &[3]);
        let groups = model.physical_groups();
        assert_eq!(assign_tag(3, 0, &groups, &model), UNGROUPED_TAG);
    }

    #[test]
    fn test_assign_tag_last_match_wins() {
        let mut model = frame();
        model.add_to_physical_group(1, 5, None, &[2]);
        model.add_to_physical_group(1, 7, None, &[2]);
        let groups = model.physical_groups();
        assert_eq!(assign_tag(2, 1, &groups, &model), 7);
    }

    #[test]
    fn test_duplicate_point_rejected() {
        let mut model = frame();
        assert!(model.add_point(1, [1.0, 1.0, 1.0]).is_err());
    }

    #[test]
    fn test_curve_with_unknown_point_rejected() {
        let mut model = frame();
        let err = model.add_curve(9, vec![1, 42]).unwrap_err();
        assert!(format!("{err}").contains("42"));
    }

    #[test]
    fn test_build_model() {
        let (nodes, elements) = build_model(&frame()).unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(elements.len(), 2);
        assert_eq!(nodes[&1].tag, 10);
        assert_eq!(nodes[&2].tag, UNGROUPED_TAG);
        assert_eq!(nodes[&3].z, Some(3.0));

        let beam = &elements[&2];
        assert_eq!(beam.kind, ElementKind::Uniaxial);
        assert_eq!((beam.nodei, beam.nodej), (2, 3));
        assert_eq!(beam.length(), Some(4.0));
        assert_eq!(elements[&1].tag, 20);
    }

    #[test]
    fn test_build_model_skips_degenerate_curve() {
        let mut model = frame();
        model.add_curve(3, vec![3]).unwrap();
        let (_, elements) = build_model(&model).unwrap();
        assert!(!elements.contains_key(&3));
    }

    #[test]
    fn test_physical_queries() {
        let model = frame();
        assert_eq!(model.physical_groups(), vec![(0, 10), (1, 20)]);
        assert_eq!(model.physical_name(0, 10), Some("supports"));
        assert_eq!(model.physical_tag_by_name(0, "supports"), Some(10));
        assert_eq!(model.max_physical_tag(), 20);
        assert_eq!(model.boundary(1, 2).unwrap(), vec![(0, 2), (0, 3)]);
        assert!(model.value(1, 1).is_err());
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("Native".parse::<ImportBackend>().unwrap(), ImportBackend::Native);
        assert!("cad".parse::<ImportBackend>().is_err());
    }
}
