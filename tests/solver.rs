use std::fs;

use approx::assert_relative_eq;
use structeasy::{
    datatypes::{Node, NodeMap},
    input::load_material_test,
    solver::{
        create_nodes, cyclic_strain_history, material_tester, start_model, Domain,
        MaterialTestOptions, TclScriptEngine, UniaxialMaterialDef,
    },
};

#[test]
fn steel_material_test_writes_svg() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("steel.json");
    fs::write(
        &input,
        r#"{
            "materials": [
                { "tag": 1, "type": "Steel01", "fy": 355.0, "E0": 210000.0, "b": 0.01 }
            ],
            "test": { "material": 1, "protocol": { "amplitudes": [0.002, 0.004], "steps": 10 },
                      "title": "S355" }
        }"#,
    )
    .unwrap();

    let test = load_material_test(&input).unwrap();
    let mut domain = Domain::new();
    for (tag, material) in test.materials {
        domain.add_uniaxial_material(tag, material).unwrap();
    }

    let svg_path = dir.path().join("curve.svg");
    let options = MaterialTestOptions {
        output: Some(svg_path.clone()),
        ..test.options
    };
    let curve = material_tester(&mut domain, test.mat_tag, &test.strain, &options).unwrap();

    assert_eq!(curve.strain.len(), 1 + 2 * 40);
    // hardening branch never exceeds fy + b E0 (eps - eps_y) at 0.004
    let bound = 355.0 + 0.01 * 210000.0 * (0.004 - 355.0 / 210000.0);
    assert!(curve.peak_stress() <= bound + 1e-9);

    let svg = fs::read_to_string(&svg_path).unwrap();
    let doc = roxmltree::Document::parse(&svg).unwrap();
    let polyline = doc
        .descendants()
        .find(|n| n.has_tag_name("polyline"))
        .unwrap();
    assert_eq!(polyline.attribute("stroke"), Some("#45818e"));
    assert_eq!(
        polyline.attribute("points").unwrap().split_whitespace().count(),
        curve.strain.len()
    );
    let texts: Vec<&str> = doc
        .descendants()
        .filter(|n| n.has_tag_name("text"))
        .filter_map(|n| n.text())
        .collect();
    assert!(texts.contains(&"S355 | Material Tag: 1"));
    assert!(texts.contains(&"Strain"));
    assert!(texts.contains(&"Stress"));
}

#[test]
fn elastic_pp_hysteresis() {
    let mut domain = Domain::new();
    domain
        .add_uniaxial_material(4, UniaxialMaterialDef::ElasticPP { e: 1000.0, epsy: 0.001 })
        .unwrap();

    let strain = cyclic_strain_history(&[0.003], 3).unwrap();
    let curve = material_tester(&mut domain, 4, &strain, &MaterialTestOptions::default()).unwrap();

    let peak = curve.stress.iter().cloned().fold(f64::MIN, f64::max);
    let trough = curve.stress.iter().cloned().fold(f64::MAX, f64::min);
    assert_relative_eq!(peak, 1.0, epsilon = 1e-12);
    assert_relative_eq!(trough, -1.0, epsilon = 1e-12);
    // back at zero strain after yielding in compression: residual tension
    assert!(*curve.stress.last().unwrap() > 0.0);
}

#[test]
fn tcl_export_of_a_frame() {
    let mut nodes = NodeMap::new();
    nodes.insert(1, Node::new(1, 0.0, 0.0, Some(0.0), 1));
    nodes.insert(2, Node::new(2, 0.0, 0.0, Some(3.0), -1));

    let mut engine = TclScriptEngine::new(Vec::new());
    start_model(&mut engine, "3d").unwrap();
    create_nodes(&mut engine, &nodes).unwrap();

    let script = String::from_utf8(engine.into_inner()).unwrap();
    assert_eq!(
        script,
        "wipe\nmodel basic -ndm 3 -ndf 6\nnode 1 0.0 0.0 0.0\nnode 2 0.0 0.0 3.0\n"
    );
}

#[test]
fn script_engine_cannot_test_materials() {
    let mut engine = TclScriptEngine::new(Vec::new());
    let curve = material_tester(&mut engine, 1, &[0.0], &MaterialTestOptions::default());
    assert!(curve.is_none());
}
