//! Platform abstraction layer for the Vulkan renderer.
//!
//! This crate provides platform-specific functionality:
//! - Window management via winit
//! - Vulkan surface creation
//! - Keyboard state for camera controls

mod input;
mod window;

pub use input::{InputState, KeyCode};
pub use window::{RenderWindow, Surface, Window, get_required_extensions};

// Re-export winit types that users might need
pub use winit::event::WindowEvent;
pub use winit::event_loop::{ActiveEventLoop, EventLoop};
