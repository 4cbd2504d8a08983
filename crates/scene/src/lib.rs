//! Scene-side collaborators of the renderer.
//!
//! This crate provides:
//! - A camera with Vulkan-convention projection and view matrices
//! - The per-object transform component
//! - Game objects and an explicit id allocator

pub mod camera;
pub mod game_object;
pub mod transform;

pub use camera::{Camera, DEFAULT_UP};
pub use game_object::{GameObject, GameObjectId, GameObjectIdAllocator};
pub use transform::TransformComponent;
