//! Vertex format and vertex input descriptions.

use std::hash::{Hash, Hasher};
use std::mem::{offset_of, size_of};

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Mesh vertex: position, color, normal and texture coordinate.
///
/// Equality and hashing compare the exact bit patterns of all four
/// attributes, so vertices can key a `HashMap` during deduplication.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub color: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl Vertex {
    #[inline]
    pub const fn new(position: Vec3, color: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            color,
            normal,
            uv,
        }
    }

    /// Vertex with only position and color set.
    #[inline]
    pub const fn colored(position: Vec3, color: Vec3) -> Self {
        Self::new(position, color, Vec3::ZERO, Vec2::ZERO)
    }

    /// One per-vertex binding at index 0.
    pub fn binding_descriptions() -> [vk::VertexInputBindingDescription; 1] {
        [vk::VertexInputBindingDescription {
            binding: 0,
            stride: size_of::<Self>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }]
    }

    /// Locations 0..=3: position, color, normal, uv.
    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 4] {
        let attribute = |location, format, offset: usize| vk::VertexInputAttributeDescription {
            binding: 0,
            location,
            format,
            offset: offset as u32,
        };

        [
            attribute(0, vk::Format::R32G32B32_SFLOAT, offset_of!(Self, position)),
            attribute(1, vk::Format::R32G32B32_SFLOAT, offset_of!(Self, color)),
            attribute(2, vk::Format::R32G32B32_SFLOAT, offset_of!(Self, normal)),
            attribute(3, vk::Format::R32G32_SFLOAT, offset_of!(Self, uv)),
        ]
    }

    fn bits(&self) -> [u32; 11] {
        bytemuck::cast(*self)
    }
}

impl PartialEq for Vertex {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for Vertex {}

impl Hash for Vertex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}
