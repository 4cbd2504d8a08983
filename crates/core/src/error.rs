//! Error types shared by the renderer crates.

use thiserror::Error;

/// Main error type for the non-GPU parts of the renderer.
#[derive(Error, Debug)]
pub enum Error {
    /// Vulkan surface or extension errors raised outside the RHI
    #[error("Vulkan error: {0}")]
    Vulkan(String),

    /// Window creation or management errors
    #[error("Window error: {0}")]
    Window(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias using the renderer's Error type.
pub type Result<T> = std::result::Result<T, Error>;
