//! Import line-element structural geometry from gmsh files, inspect it in an
//! interactive 3D scene, and drive a structural analysis engine.

pub mod datatypes;
pub mod error;
pub mod input;
pub mod mesher;
pub mod post_processor;
pub mod solver;

pub use datatypes::{Element, ElementKind, ElementMap, Node, NodeMap};
pub use error::{Result, StructeasyError};
