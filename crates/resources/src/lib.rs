//! Resource loading and GPU geometry.
//!
//! This crate handles:
//! - Wavefront OBJ loading into deduplicated, indexed meshes
//! - Uploading meshes into device-local vertex and index buffers

mod error;
pub mod model;
pub mod obj;

pub use error::{ResourceError, ResourceResult};
pub use model::{DrawCall, Model};
pub use obj::MeshData;
