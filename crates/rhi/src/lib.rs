//! Vulkan abstraction layer (Render Hardware Interface).
//!
//! This crate provides a safe abstraction over Vulkan using the `ash` crate.
//! It handles:
//! - Instance, physical device and logical device creation
//! - Swapchain management and the in-flight frame protocol
//! - Command buffer recording
//! - Buffer and depth image management
//! - Render pass and pipeline creation

mod error;

pub mod buffer;
pub mod command;
pub mod device;
pub mod image;
pub mod instance;
pub mod physical_device;
pub mod pipeline;
pub mod render_pass;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod vertex;

pub use error::{RhiError, RhiResult};
pub use sync::MAX_FRAMES_IN_FLIGHT;

// Re-export ash types that users might need
pub use ash::vk;
