//! Wavefront OBJ loading.
//!
//! Faces are triangulated and every face corner is resolved into a full
//! [`Vertex`] (position, color, normal, uv). Identical corners collapse into
//! one vertex, so the result is an indexed mesh.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use glam::{Vec2, Vec3};
use renderer_rhi::vertex::Vertex;
use tracing::debug;

use crate::error::{ResourceError, ResourceResult};

/// Color used when the file carries no vertex colors.
pub const DEFAULT_VERTEX_COLOR: Vec3 = Vec3::ONE;

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        single_index: false,
        ..Default::default()
    }
}

/// CPU-side indexed mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Loads and deduplicates an OBJ file. Materials are ignored.
    pub fn load_obj(path: impl AsRef<Path>) -> ResourceResult<Self> {
        let path = path.as_ref();
        let (models, _materials) =
            tobj::load_obj(path, &load_options()).map_err(|e| ResourceError::ObjLoad {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let mesh = Self::from_models(&models)?;
        debug!(
            "Loaded {:?}: {} vertices, {} indices",
            path,
            mesh.vertices.len(),
            mesh.indices.len()
        );
        Ok(mesh)
    }

    /// Parses OBJ text from a reader. Material libraries are not loaded.
    pub fn from_obj_reader(reader: &mut impl BufRead) -> ResourceResult<Self> {
        let (models, _materials) =
            tobj::load_obj_buf(reader, &load_options(), |_| Ok(Default::default())).map_err(
                |e| ResourceError::ObjLoad {
                    path: "<reader>".into(),
                    message: e.to_string(),
                },
            )?;

        Self::from_models(&models)
    }

    /// Resolves every face corner of every model and deduplicates them.
    pub fn from_models(models: &[tobj::Model]) -> ResourceResult<Self> {
        let mut mesh = Self::default();
        let mut unique_vertices: HashMap<Vertex, u32> = HashMap::new();

        for model in models {
            let source = &model.mesh;
            for corner in 0..source.indices.len() {
                let vertex = resolve_corner(&model.name, source, corner)?;

                let index = *unique_vertices.entry(vertex).or_insert_with(|| {
                    mesh.vertices.push(vertex);
                    (mesh.vertices.len() - 1) as u32
                });
                mesh.indices.push(index);
            }
        }

        Ok(mesh)
    }
}

fn resolve_corner(name: &str, mesh: &tobj::Mesh, corner: usize) -> ResourceResult<Vertex> {
    let position_index = mesh.indices[corner];
    let position = vec3_at(name, "position", &mesh.positions, position_index)?;

    let color = if mesh.vertex_color.is_empty() {
        DEFAULT_VERTEX_COLOR
    } else {
        vec3_at(name, "color", &mesh.vertex_color, position_index)?
    };

    let normal = match mesh.normal_indices.get(corner) {
        Some(&index) => vec3_at(name, "normal", &mesh.normals, index)?,
        None => Vec3::ZERO,
    };

    let uv = match mesh.texcoord_indices.get(corner) {
        Some(&index) => vec2_at(name, "texcoord", &mesh.texcoords, index)?,
        None => Vec2::ZERO,
    };

    Ok(Vertex::new(position, color, normal, uv))
}

fn vec3_at(mesh: &str, attribute: &'static str, data: &[f32], index: u32) -> ResourceResult<Vec3> {
    let start = 3 * index as usize;
    data.get(start..start + 3)
        .map(Vec3::from_slice)
        .ok_or_else(|| ResourceError::IndexOutOfRange {
            mesh: mesh.to_string(),
            attribute,
            index,
        })
}

fn vec2_at(mesh: &str, attribute: &'static str, data: &[f32], index: u32) -> ResourceResult<Vec2> {
    let start = 2 * index as usize;
    data.get(start..start + 2)
        .map(Vec2::from_slice)
        .ok_or_else(|| ResourceError::IndexOutOfRange {
            mesh: mesh.to_string(),
            attribute,
            index,
        })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const QUAD: &str = "\
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
vt 0 0
vt 1 0
vt 1 1
vt 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn test_quad_is_triangulated_and_deduplicated() {
        let mesh = MeshData::from_obj_reader(&mut Cursor::new(QUAD)).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices.len(), 6);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }

    #[test]
    fn test_attributes_are_resolved_per_corner() {
        let mesh = MeshData::from_obj_reader(&mut Cursor::new(QUAD)).unwrap();
        let corner = mesh.vertices[mesh.indices[2] as usize];
        assert_eq!(corner.position, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(corner.normal, Vec3::Z);
        assert_eq!(corner.uv, Vec2::new(1.0, 1.0));
        assert_eq!(corner.color, DEFAULT_VERTEX_COLOR);
    }

    #[test]
    fn test_vertex_colors_follow_positions() {
        let source = "\
v 0 0 0 1 0 0
v 1 0 0 0 1 0
v 0 1 0 0 0 1
f 1 2 3
";
        let mesh = MeshData::from_obj_reader(&mut Cursor::new(source)).unwrap();
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.vertices[0].color, Vec3::X);
        assert_eq!(mesh.vertices[2].color, Vec3::Z);
        assert_eq!(mesh.vertices[1].normal, Vec3::ZERO);
    }

    #[test]
    fn test_shared_position_with_different_normals_is_split() {
        let source = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 0 0 1
vn 0 0 1
vn 1 0 0
f 1//1 2//1 3//1
f 1//2 3//2 4//2
";
        let mesh = MeshData::from_obj_reader(&mut Cursor::new(source)).unwrap();
        // Corners 1 and 3 appear in both faces but with different normals.
        assert_eq!(mesh.vertices.len(), 6);
        assert_eq!(mesh.indices.len(), 6);
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let result = MeshData::load_obj("does/not/exist.obj");
        assert!(matches!(result, Err(ResourceError::ObjLoad { .. })));
    }

    #[test]
    fn test_out_of_range_index_is_reported() {
        let mesh = tobj::Mesh {
            positions: vec![0.0, 0.0, 0.0],
            indices: vec![0, 5, 0],
            ..Default::default()
        };
        let model = tobj::Model::new(mesh, "broken".to_string());
        let result = MeshData::from_models(&[model]);
        assert!(matches!(
            result,
            Err(ResourceError::IndexOutOfRange {
                attribute: "position",
                index: 5,
                ..
            })
        ));
    }
}
