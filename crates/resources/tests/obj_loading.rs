//! Integration tests for OBJ loading from disk.

use std::fs;
use std::path::PathBuf;

use renderer_resources::{MeshData, ResourceError};

const CUBE: &str = "\
# unit cube, one normal per face
v -0.5 -0.5 -0.5
v  0.5 -0.5 -0.5
v  0.5  0.5 -0.5
v -0.5  0.5 -0.5
v -0.5 -0.5  0.5
v  0.5 -0.5  0.5
v  0.5  0.5  0.5
v -0.5  0.5  0.5
vn 0 0 -1
vn 0 0 1
vn -1 0 0
vn 1 0 0
vn 0 -1 0
vn 0 1 0
f 1//1 4//1 3//1 2//1
f 5//2 6//2 7//2 8//2
f 1//3 5//3 8//3 4//3
f 2//4 3//4 7//4 6//4
f 1//5 2//5 6//5 5//5
f 4//6 8//6 7//6 3//6
";

fn write_temp(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("renderer_resources_{}_{name}", std::process::id()));
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_load_cube_from_file() {
    let path = write_temp("cube.obj", CUBE);
    let mesh = MeshData::load_obj(&path).unwrap();
    fs::remove_file(&path).ok();

    // Four corners per face, six faces, two triangles per face.
    assert_eq!(mesh.vertices.len(), 24);
    assert_eq!(mesh.indices.len(), 36);
    assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));

    for vertex in &mesh.vertices {
        assert_eq!(vertex.position.abs().max_element(), 0.5);
        assert_eq!(vertex.normal.length(), 1.0);
    }
}

#[test]
fn test_file_and_reader_agree() {
    let path = write_temp("agree.obj", CUBE);
    let from_file = MeshData::load_obj(&path).unwrap();
    fs::remove_file(&path).ok();

    let from_reader = MeshData::from_obj_reader(&mut CUBE.as_bytes()).unwrap();
    assert_eq!(from_file, from_reader);
}

#[test]
fn test_malformed_file_is_load_error() {
    let path = write_temp("broken.obj", "v 0 0 0\nv 1 0\nf 1 2 3\n");
    let result = MeshData::load_obj(&path);
    fs::remove_file(&path).ok();

    assert!(matches!(result, Err(ResourceError::ObjLoad { .. })));
}

#[test]
fn test_shipped_cube_model_loads() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../models/cube.obj");
    let mesh = MeshData::load_obj(&path).unwrap();

    assert_eq!(mesh.vertices.len(), 24);
    assert_eq!(mesh.indices.len(), 36);
    assert!(mesh.vertices.iter().any(|v| v.color != glam::Vec3::ONE));
}
