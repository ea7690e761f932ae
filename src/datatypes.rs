use std::collections::BTreeMap;
use std::fmt::Display;

use json::JsonValue;
use nalgebra::Vector3;

use crate::error::{Result, StructeasyError};

/// Tag carried by entities that belong to no physical group
pub const UNGROUPED_TAG: i32 = -1;

/// Global vertical axis, the usual reference for `Element::vecxz`
pub const GLOBAL_VERTICAL: Vector3<f64> = Vector3::new(0.0, 0.0, 1.0);

/// Nodes keyed by node id
pub type NodeMap = BTreeMap<i32, Node>;

/// Elements keyed by element id
pub type ElementMap = BTreeMap<i32, Element>;

/// Classifier attached to nodes and elements
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ElementKind {
    #[default]
    Generic,
    Uniaxial,
    Custom(String),
}

impl Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementKind::Generic => write!(f, "generic"),
            ElementKind::Uniaxial => write!(f, "uniaxial"),
            ElementKind::Custom(name) => write!(f, "{name}"),
        }
    }
}

/// A point of the structural model, in 2D (`z` is `None`) or 3D
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: i32,
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    /// Coordinates as a list. Filled at construction only.
    pub coord: Vec<f64>,
    pub tag: i32,
    pub kind: ElementKind,
    /// Free storage for caller data
    pub container: Vec<JsonValue>,
    /// Free storage for analysis results
    pub data_analysis: Vec<JsonValue>,
}

impl Node {
    pub fn new(id: i32, x: f64, y: f64, z: Option<f64>, tag: i32) -> Node {
        let mut coord = vec![x, y];
        if let Some(z) = z {
            coord.push(z);
        }

        Node {
            id,
            x,
            y,
            z,
            coord,
            tag,
            kind: ElementKind::default(),
            container: Vec::new(),
            data_analysis: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: ElementKind) -> Node {
        self.kind = kind;
        self
    }

    /// Position in space. A 2D node lies on the `z = 0` plane.
    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z.unwrap_or(0.0))
    }

    pub fn is_grouped(&self) -> bool {
        self.tag != UNGROUPED_TAG
    }
}

/// A line member connecting two (or more) nodes
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub id: i32,
    pub nodes: Vec<Node>,
    /// Id of the first node at construction
    pub nodei: i32,
    /// Id of the second node at construction
    pub nodej: i32,
    pub tag: i32,
    pub kind: ElementKind,
    pub container: Vec<JsonValue>,
    pub data_analysis: Vec<JsonValue>,
}

impl Element {
    /// Creates an element from its nodes
    ///
    /// # Arguments
    /// * `id` - The element id
    /// * `nodes` - The connected nodes; at least two
    /// * `tag` - The physical group of the element, or `UNGROUPED_TAG`
    ///
    /// # Returns
    /// The element, or an input error when fewer than two nodes are given
    pub fn new(id: i32, nodes: Vec<Node>, tag: i32) -> Result<Element> {
        if nodes.len() < 2 {
            return Err(StructeasyError::Input(format!(
                "Element {id} needs at least two nodes, got {}",
                nodes.len()
            )));
        }

        let nodei = nodes[0].id;
        let nodej = nodes[1].id;

        Ok(Element {
            id,
            nodes,
            nodei,
            nodej,
            tag,
            kind: ElementKind::default(),
            container: Vec::new(),
            data_analysis: Vec::new(),
        })
    }

    pub fn with_kind(mut self, kind: ElementKind) -> Element {
        self.kind = kind;
        self
    }

    /// Distance between the two end nodes. Only defined for two-node elements.
    pub fn length(&self) -> Option<f64> {
        if self.nodes.len() != 2 {
            return None;
        }
        Some((self.nodes[1].position() - self.nodes[0].position()).norm())
    }

    /// Axial vector crossed with `reference`
    ///
    /// Gives the `vecxz` orientation of the local frame. The result is the
    /// zero vector when the element is parallel to `reference`.
    ///
    /// # Arguments
    /// * `reference` - The vector lying in the local x-y plane, usually
    ///     `GLOBAL_VERTICAL`
    pub fn vecxz(&self, reference: &Vector3<f64>) -> Vector3<f64> {
        let xaxis = self.nodes[1].position() - self.nodes[0].position();
        xaxis.cross(reference)
    }

    /// Arithmetic mean of the node positions
    pub fn midpoint(&self) -> Vector3<f64> {
        let sum = self
            .nodes
            .iter()
            .fold(Vector3::zeros(), |acc, node| acc + node.position());
        sum / self.nodes.len() as f64
    }

    pub fn is_grouped(&self) -> bool {
        self.tag != UNGROUPED_TAG
    }
}
