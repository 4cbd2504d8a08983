//! Core utilities for the Vulkan renderer.
//!
//! This crate provides foundational types and utilities used across the renderer:
//! - Error types and result aliases
//! - Logging initialization
//! - Frame timer
//! - Configuration loading

mod config;
mod error;
mod logging;
mod timer;

pub use config::{AppConfig, ControlsConfig, RendererConfig, SceneConfig, WindowConfig};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use timer::Timer;
