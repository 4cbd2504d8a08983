//! Frame orchestration and render systems.
//!
//! This crate drives rendering on top of the RHI:
//! - The [`Renderer`] frame state machine and swapchain recreation policy
//! - Per-frame data handed to render systems
//! - The simple forward render system

pub mod frame;
pub mod renderer;
pub mod simple_render_system;

pub use frame::{FrameInfo, FrameState};
pub use renderer::Renderer;
pub use simple_render_system::{SimplePushConstantData, SimpleRenderSystem};
