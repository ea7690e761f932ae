use std::collections::HashMap;

use tracing::debug;

use super::GeometryModel;
use crate::error::{Result, StructeasyError};

enum MeshParseState {
    MeshFormat,
    PhysicalNames,
    Entities,
    Limbo,
}

/// Pulls whitespace separated values out of a section
struct Fields<'a> {
    inner: std::vec::IntoIter<&'a str>,
    section: &'static str,
}

impl<'a> Fields<'a> {
    fn new(words: Vec<&'a str>, section: &'static str) -> Fields<'a> {
        Fields {
            inner: words.into_iter(),
            section,
        }
    }

    fn next_str(&mut self) -> Result<&'a str> {
        self.inner.next().ok_or_else(|| {
            StructeasyError::Mesh(format!("Unexpected end of {} section", self.section))
        })
    }

    fn next<T: std::str::FromStr>(&mut self) -> Result<T> {
        let word = self.next_str()?;
        word.parse().map_err(|_| {
            StructeasyError::Mesh(format!(
                "Unexpected value '{word}' in {} section",
                self.section
            ))
        })
    }

    fn skip(&mut self, count: usize) -> Result<()> {
        for _ in 0..count {
            self.next_str()?;
        }
        Ok(())
    }

    fn tags(&mut self) -> Result<Vec<i32>> {
        let count: usize = self.next()?;
        (0..count).map(|_| self.next()).collect()
    }
}

/// Reads the geometry of a gmsh 4.x ASCII `.msh` file
///
/// Only `$MeshFormat`, `$PhysicalNames` and `$Entities` are read; mesh nodes
/// and elements are ignored.
///
/// # Arguments
/// * `contents` - The contents of the `.msh` file
///
/// # Returns
/// The geometry model with its physical groups
pub fn parse_msh(contents: &str) -> Result<GeometryModel> {
    let mut parser_state = MeshParseState::Limbo;
    let mut version: Option<f64> = None;
    let mut names: HashMap<(i32, i32), String> = HashMap::new();
    let mut entity_words: Vec<&str> = Vec::new();
    let mut physical_words: Vec<&str> = Vec::new();
    let mut seen_entities = false;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with("$End") {
            parser_state = MeshParseState::Limbo;
            continue;
        }

        match parser_state {
            MeshParseState::Limbo => {
                if line.starts_with("$MeshFormat") {
                    parser_state = MeshParseState::MeshFormat;
                } else if line.starts_with("$PhysicalNames") {
                    parser_state = MeshParseState::PhysicalNames;
                } else if line.starts_with("$Entities") {
                    parser_state = MeshParseState::Entities;
                    seen_entities = true;
                } else if line.starts_with('$') {
                    debug!("ignoring .msh section {line}");
                }
            }
            MeshParseState::MeshFormat => {
                let header: Vec<&str> = line.split_whitespace().collect();
                let parsed: f64 = header.first().and_then(|v| v.parse().ok()).ok_or_else(|| {
                    StructeasyError::Mesh(format!("Invalid $MeshFormat line '{line}'"))
                })?;
                if parsed < 4.0 {
                    return Err(StructeasyError::Mesh(format!(
                        "Unsupported .msh version {parsed}, version 4 is required"
                    )));
                }
                if header.get(1) != Some(&"0") {
                    return Err(StructeasyError::Mesh(
                        "Binary .msh files are not supported".to_owned(),
                    ));
                }
                version = Some(parsed);
            }
            MeshParseState::PhysicalNames => physical_words.push(line),
            MeshParseState::Entities => entity_words.extend(line.split_whitespace()),
        }
    }

    let version = version
        .ok_or_else(|| StructeasyError::Mesh("Missing $MeshFormat section".to_owned()))?;
    if !seen_entities {
        return Err(StructeasyError::Mesh(
            "Missing $Entities section; save the mesh with gmsh 4 or later".to_owned(),
        ));
    }

    // $PhysicalNames: count, then `dim tag "name"` per line
    for line in physical_words.iter().skip(1) {
        let mut parts = line.splitn(3, char::is_whitespace);
        let dim = parts.next().and_then(|d| d.parse().ok());
        let tag = parts.next().and_then(|t| t.parse().ok());
        let name = parts.next().map(|n| n.trim().trim_matches('"').to_owned());
        match (dim, tag, name) {
            (Some(dim), Some(tag), Some(name)) => {
                names.insert((dim, tag), name);
            }
            _ => {
                return Err(StructeasyError::Mesh(format!(
                    "Invalid $PhysicalNames line '{line}'"
                )))
            }
        }
    }

    let mut model = GeometryModel::new();
    let mut fields = Fields::new(entity_words, "$Entities");

    let num_points: usize = fields.next()?;
    let num_curves: usize = fields.next()?;
    let num_surfaces: usize = fields.next()?;
    let num_volumes: usize = fields.next()?;

    let mut physicals: Vec<(i32, i32, i32)> = Vec::new();

    // 4.0 stores a bounding box for points, 4.1 the coordinates
    let point_values = if version < 4.1 { 6 } else { 3 };
    for _ in 0..num_points {
        let tag: i32 = fields.next()?;
        let x: f64 = fields.next()?;
        let y: f64 = fields.next()?;
        let z: f64 = fields.next()?;
        fields.skip(point_values - 3)?;
        for physical in fields.tags()? {
            physicals.push((0, physical, tag));
        }
        model.add_point(tag, [x, y, z])?;
    }

    for _ in 0..num_curves {
        let tag: i32 = fields.next()?;
        fields.skip(6)?;
        for physical in fields.tags()? {
            physicals.push((1, physical, tag));
        }
        let bounding: Vec<i32> = fields.tags()?.into_iter().map(i32::abs).collect();
        model.add_curve(tag, bounding)?;
    }

    for (dim, count) in [(2, num_surfaces), (3, num_volumes)] {
        for _ in 0..count {
            let tag: i32 = fields.next()?;
            fields.skip(6)?;
            for physical in fields.tags()? {
                physicals.push((dim, physical, tag));
            }
            fields.tags()?;
        }
    }

    for (dim, physical, entity) in physicals {
        let name = names.get(&(dim, physical)).cloned();
        model.add_to_physical_group(dim, physical, name, &[entity]);
    }

    Ok(model)
}
