//! Material test input files.

use std::path::Path;

use json::JsonValue;
use tracing::info;

use crate::{
    error::{Result, StructeasyError},
    solver::{cyclic_strain_history, MaterialTestOptions, UniaxialMaterialDef},
};

/// A parsed material test input file
#[derive(Debug, Clone)]
pub struct MaterialTestInput {
    pub materials: Vec<(i32, UniaxialMaterialDef)>,
    pub mat_tag: i32,
    pub strain: Vec<f64>,
    pub options: MaterialTestOptions,
}

/// Loads a material test from a json file
///
/// # Arguments
/// * `path` - The path to the input file
///
/// # Returns
/// The materials to register and the test to run on one of them
pub fn load_material_test(path: impl AsRef<Path>) -> Result<MaterialTestInput> {
    let path = path.as_ref();
    let file_string = match std::fs::read_to_string(path) {
        Ok(f) => f,
        Err(err) => {
            return Err(StructeasyError::Input(format!(
                "Unable to open input file {}: {err}",
                path.display()
            )))
        }
    };

    let input = parse_material_test(&file_string)?;
    info!(
        "loaded {} materials, testing material {} over {} strain steps",
        input.materials.len(),
        input.mat_tag,
        input.strain.len()
    );
    Ok(input)
}

/// Parses the contents of a material test input file
pub fn parse_material_test(contents: &str) -> Result<MaterialTestInput> {
    let input_json = match json::parse(contents) {
        Ok(f) => f,
        Err(err) => {
            return Err(StructeasyError::Input(format!(
                "Error in input file json: {err}"
            )))
        }
    };

    if !input_json.has_key("materials") {
        return Err(StructeasyError::Input(
            "Input json missing materials field".to_string(),
        ));
    }
    if !input_json.has_key("test") {
        return Err(StructeasyError::Input(
            "Input json missing test field".to_string(),
        ));
    }
    if !input_json["materials"].is_array() {
        return Err(StructeasyError::Input(
            "materials field must be an array".to_string(),
        ));
    }

    let mut materials: Vec<(i32, UniaxialMaterialDef)> = Vec::new();
    for (i, material_json) in input_json["materials"].members().enumerate() {
        let tag = material_json["tag"].as_i32().ok_or_else(|| {
            StructeasyError::Input(format!("Material {i} is missing an integer tag"))
        })?;
        if materials.iter().any(|(t, _)| *t == tag) {
            return Err(StructeasyError::Input(format!(
                "Material tag {tag} is defined twice"
            )));
        }
        materials.push((tag, parse_material(tag, material_json)?));
    }

    let test_json = &input_json["test"];
    let mat_tag = test_json["material"].as_i32().ok_or_else(|| {
        StructeasyError::Input("Input json missing material field in test section".to_string())
    })?;
    if !materials.iter().any(|(t, _)| *t == mat_tag) {
        return Err(StructeasyError::Input(format!(
            "Test references undefined material {mat_tag}"
        )));
    }

    let strain = match (test_json.has_key("strain"), test_json.has_key("protocol")) {
        (true, false) => number_array(&test_json["strain"], "strain")?,
        (false, true) => {
            let protocol = &test_json["protocol"];
            let amplitudes = number_array(&protocol["amplitudes"], "protocol amplitudes")?;
            let steps = protocol["steps"].as_usize().ok_or_else(|| {
                StructeasyError::Input(
                    "protocol steps must be a non-negative integer".to_string(),
                )
            })?;
            cyclic_strain_history(&amplitudes, steps)
                .map_err(|err| StructeasyError::Input(format!("Invalid test protocol: {err}")))?
        }
        _ => {
            return Err(StructeasyError::Input(
                "test section needs exactly one of strain or protocol".to_string(),
            ))
        }
    };

    let mut options = MaterialTestOptions::default();
    if test_json.has_key("title") {
        options.title = test_json["title"]
            .as_str()
            .ok_or_else(|| StructeasyError::Input("test title must be a string".to_string()))?
            .to_owned();
    }
    if test_json.has_key("scale_stress") {
        options.scale_stress = test_json["scale_stress"].as_f64().ok_or_else(|| {
            StructeasyError::Input("scale_stress must be a number".to_string())
        })?;
    }

    Ok(MaterialTestInput {
        materials,
        mat_tag,
        strain,
        options,
    })
}

fn parse_material(tag: i32, material_json: &JsonValue) -> Result<UniaxialMaterialDef> {
    let field = |name: &str| -> Result<f64> {
        material_json[name].as_f64().ok_or_else(|| {
            StructeasyError::Input(format!("Material {tag} is missing numeric field {name}"))
        })
    };

    let material = match material_json["type"].as_str() {
        Some("Elastic") => UniaxialMaterialDef::Elastic { e: field("E")? },
        Some("ElasticPP") => UniaxialMaterialDef::ElasticPP {
            e: field("E")?,
            epsy: field("epsy")?,
        },
        Some("Steel01") => UniaxialMaterialDef::Steel01 {
            fy: field("fy")?,
            e0: field("E0")?,
            b: field("b")?,
        },
        Some(other) => {
            return Err(StructeasyError::Input(format!(
                "Material {tag} has unsupported type {other}"
            )))
        }
        None => {
            return Err(StructeasyError::Input(format!(
                "Material {tag} is missing type field"
            )))
        }
    };

    Ok(material)
}

fn number_array(value: &JsonValue, what: &str) -> Result<Vec<f64>> {
    if !value.is_array() {
        return Err(StructeasyError::Input(format!("{what} must be an array")));
    }
    value
        .members()
        .map(|v| {
            v.as_f64()
                .ok_or_else(|| StructeasyError::Input(format!("{what} must only hold numbers")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEEL_TEST: &str = r#"{
        "materials": [
            { "tag": 1, "type": "Steel01", "fy": 355.0, "E0": 210000.0, "b": 0.01 },
            { "tag": 2, "type": "Elastic", "E": 30000.0 }
        ],
        "test": {
            "material": 1, "strain": [0.0, 0.001, 0.002], "title": "S355", "scale_stress": 1000
        }
    }"#;

    #[test]
    fn test_parse_strain_list() {
        let input = parse_material_test(STEEL_TEST).unwrap();
        assert_eq!(input.materials.len(), 2);
        assert_eq!(
            input.materials[0].1,
            UniaxialMaterialDef::Steel01 {
                fy: 355.0,
                e0: 210000.0,
                b: 0.01
            }
        );
        assert_eq!(input.mat_tag, 1);
        assert_eq!(input.strain, vec![0.0, 0.001, 0.002]);
        assert_eq!(input.options.title, "S355");
        assert_eq!(input.options.scale_stress, 1000.0);
    }

    #[test]
    fn test_parse_protocol() {
        let input = parse_material_test(
            r#"{ "materials": [ { "tag": 7, "type": "ElasticPP", "E": 1000, "epsy": 0.002 } ],
                 "test": { "material": 7, "protocol": { "amplitudes": [0.004], "steps": 4 } } }"#,
        )
        .unwrap();
        assert_eq!(input.strain.len(), 1 + 16);
        assert_eq!(input.options.title, "Stress-Strain Behavior");
    }

    #[test]
    fn test_protocol_too_long() {
        let err = parse_material_test(
            r#"{ "materials": [ { "tag": 1, "type": "Elastic", "E": 1 } ],
                 "test": { "material": 1, "protocol": { "amplitudes": [0.01], "steps": 1e12 } } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, StructeasyError::Input(_)));
        assert!(format!("{err}").contains("protocol"));
    }

    #[test]
    fn test_strain_and_protocol_exclusive() {
        let err = parse_material_test(
            r#"{ "materials": [ { "tag": 1, "type": "Elastic", "E": 1 } ],
                 "test": { "material": 1, "strain": [0],
                           "protocol": { "amplitudes": [1], "steps": 1 } } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, StructeasyError::Input(_)));
    }

    #[test]
    fn test_missing_fields() {
        assert!(parse_material_test(r#"{ "test": {} }"#).is_err());
        assert!(parse_material_test(
            r#"{ "materials": [ { "tag": 1, "type": "Steel01", "fy": 1 } ],
                 "test": { "material": 1, "strain": [] } }"#
        )
        .is_err());
        assert!(parse_material_test(
            r#"{ "materials": [ { "tag": 1, "type": "Elastic", "E": 1 } ],
                 "test": { "material": 2, "strain": [] } }"#
        )
        .is_err());
        assert!(parse_material_test("not json").is_err());
    }

    #[test]
    fn test_unknown_material_type() {
        let err = parse_material_test(
            r#"{ "materials": [ { "tag": 1, "type": "Concrete02" } ],
                 "test": { "material": 1, "strain": [] } }"#,
        )
        .unwrap_err();
        assert!(format!("{err}").contains("Concrete02"));
    }
}
