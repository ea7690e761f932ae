use std::fs;

use structeasy::{
    datatypes::{ElementKind, UNGROUPED_TAG},
    mesher::{import_geofile, ImportBackend, ImportOptions},
};

const PORTAL_GEO: &str = "// portal frame\n\
h = 3;\n\
L = 4;\n\
Point(1) = {0, 0, 0, 1.0};\n\
Point(2) = {0, 0, h, 1.0};\n\
Point(3) = {L, 0, h, 1.0};\n\
Point(4) = {L, 0, 0, 1.0};\n\
Line(1) = {1, 2};\n\
Line(2) = {2, 3};\n\
Line(3) = {4, 3};\n\
Physical Point(\"supports\", 1) = {1, 4};\n\
Physical Curve(\"columns\", 2) = {1:3:2};\n";

const PORTAL_MSH: &str = "$MeshFormat\n4.1 0 8\n$EndMeshFormat\n\
$PhysicalNames\n2\n0 1 \"supports\"\n1 2 \"columns\"\n$EndPhysicalNames\n\
$Entities\n4 3 0 0\n\
1 0 0 0 1 1\n\
2 0 0 3 0\n\
3 4 0 3 0\n\
4 4 0 0 1 1\n\
1 0 0 0 0 0 3 1 2 2 1 -2\n\
2 0 0 3 4 0 3 0 2 2 -3\n\
3 4 0 0 4 0 3 1 2 2 4 -3\n\
$EndEntities\n\
$Nodes\n0 0 0 0\n$EndNodes\n";

fn native() -> ImportOptions {
    ImportOptions {
        backend: ImportBackend::Native,
        ..ImportOptions::default()
    }
}

#[test]
fn geo_portal_frame() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("portal.geo");
    fs::write(&path, PORTAL_GEO).unwrap();

    let (nodes, elements) = import_geofile(&path, &native()).unwrap();

    assert_eq!(nodes.len(), 4);
    assert_eq!(elements.len(), 3);

    assert_eq!(nodes[&1].tag, 1);
    assert_eq!(nodes[&2].tag, UNGROUPED_TAG);
    assert_eq!(nodes[&4].tag, 1);
    assert_eq!(nodes[&3].z, Some(3.0));

    assert_eq!(elements[&1].tag, 2);
    assert_eq!(elements[&2].tag, UNGROUPED_TAG);
    assert_eq!(elements[&3].tag, 2);
    assert_eq!((elements[&3].nodei, elements[&3].nodej), (4, 3));
    assert_eq!(elements[&2].length(), Some(4.0));
    assert!(elements.values().all(|e| e.kind == ElementKind::Uniaxial));
}

#[test]
fn msh_matches_geo() {
    let dir = tempfile::tempdir().unwrap();
    let geo = dir.path().join("portal.geo");
    let msh = dir.path().join("portal.msh");
    fs::write(&geo, PORTAL_GEO).unwrap();
    fs::write(&msh, PORTAL_MSH).unwrap();

    let from_geo = import_geofile(&geo, &native()).unwrap();
    let from_msh = import_geofile(&msh, &ImportOptions::default()).unwrap();

    assert_eq!(from_geo, from_msh);
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(import_geofile(dir.path().join("nothing.geo"), &native()).is_err());
}

#[test]
fn native_backend_rejects_cad_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("part.step");
    fs::write(&path, "ISO-10303-21;").unwrap();
    assert!(import_geofile(&path, &native()).is_err());
}
