//! Error types for resource loading.

use std::path::PathBuf;

use renderer_rhi::RhiError;
use thiserror::Error;

/// Error type for resource loading operations.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The OBJ file could not be read or parsed.
    #[error("Failed to load OBJ file '{path}': {message}")]
    ObjLoad {
        /// Path to the file that failed to load.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// A face references an attribute index outside the attribute array.
    #[error("Mesh '{mesh}' references missing {attribute} index {index}")]
    IndexOutOfRange {
        mesh: String,
        attribute: &'static str,
        index: u32,
    },

    /// Geometry needs at least one triangle.
    #[error("Model needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),

    /// GPU upload failed.
    #[error("GPU error: {0}")]
    Rhi(#[from] RhiError),
}

/// Result type alias for resource operations.
pub type ResourceResult<T> = Result<T, ResourceError>;
