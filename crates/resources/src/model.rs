//! Immutable GPU geometry.
//!
//! A [`Model`] owns a device-local vertex buffer and, when the mesh has
//! indices, a device-local index buffer. Both are filled at construction
//! through a host-visible staging buffer and a one-shot copy command.

use std::mem::size_of;
use std::path::Path;
use std::sync::Arc;

use bytemuck::Pod;
use renderer_rhi::buffer::{Buffer, BufferUsage};
use renderer_rhi::command::CommandBuffer;
use renderer_rhi::device::Device;
use renderer_rhi::vertex::Vertex;
use renderer_rhi::vk;
use tracing::debug;

use crate::error::{ResourceError, ResourceResult};
use crate::obj::MeshData;

/// Smallest vertex count a model accepts.
pub const MIN_VERTEX_COUNT: usize = 3;

/// The draw command a model records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawCall {
    Indexed { index_count: u32 },
    NonIndexed { vertex_count: u32 },
}

impl DrawCall {
    /// Indexed when there are indices, otherwise over all vertices.
    pub fn select(vertex_count: u32, index_count: u32) -> Self {
        if index_count > 0 {
            Self::Indexed { index_count }
        } else {
            Self::NonIndexed { vertex_count }
        }
    }

    /// Number of vertices the GPU processes for one instance.
    pub fn vertices_issued(self) -> u32 {
        match self {
            Self::Indexed { index_count } => index_count,
            Self::NonIndexed { vertex_count } => vertex_count,
        }
    }
}

/// Vertex (and optional index) buffers for one mesh.
pub struct Model {
    vertex_buffer: Buffer,
    vertex_count: u32,
    index_buffer: Option<Buffer>,
    index_count: u32,
}

impl Model {
    /// Uploads `mesh` into device-local buffers.
    ///
    /// # Errors
    ///
    /// [`ResourceError::TooFewVertices`] if the mesh has fewer than three
    /// vertices, or any buffer creation or copy failure.
    pub fn new(device: &Arc<Device>, mesh: &MeshData) -> ResourceResult<Self> {
        validate_vertices(&mesh.vertices)?;

        let vertex_buffer = upload(device, "model vertices", BufferUsage::Vertex, &mesh.vertices)?;
        let index_buffer = if mesh.indices.is_empty() {
            None
        } else {
            Some(upload(device, "model indices", BufferUsage::Index, &mesh.indices)?)
        };

        debug!(
            "Created model: {} vertices, {} indices",
            mesh.vertices.len(),
            mesh.indices.len()
        );

        Ok(Self {
            vertex_buffer,
            vertex_count: mesh.vertices.len() as u32,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        })
    }

    /// Loads an OBJ file and uploads it.
    pub fn from_obj_file(device: &Arc<Device>, path: impl AsRef<Path>) -> ResourceResult<Self> {
        let mesh = MeshData::load_obj(path)?;
        Self::new(device, &mesh)
    }

    /// Records the vertex binding and, if present, the index binding.
    pub fn bind(&self, command_buffer: &CommandBuffer) {
        command_buffer.bind_vertex_buffers(0, &[self.vertex_buffer.handle()], &[0]);

        if let Some(index_buffer) = &self.index_buffer {
            command_buffer.bind_index_buffer(index_buffer.handle(), 0, vk::IndexType::UINT32);
        }
    }

    /// Records one draw of the whole mesh.
    pub fn draw(&self, command_buffer: &CommandBuffer) {
        match self.draw_call() {
            DrawCall::Indexed { index_count } => command_buffer.draw_indexed(index_count, 1, 0, 0, 0),
            DrawCall::NonIndexed { vertex_count } => command_buffer.draw(vertex_count, 1, 0, 0),
        }
    }

    #[inline]
    pub fn draw_call(&self) -> DrawCall {
        DrawCall::select(self.vertex_count, self.index_count)
    }

    #[inline]
    pub fn has_index_buffer(&self) -> bool {
        self.index_buffer.is_some()
    }

    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

/// Copies `data` into a new device-local buffer through a staging buffer.
///
/// The staging buffer lives until the copy has completed on the GPU.
fn upload<T: Pod>(
    device: &Arc<Device>,
    name: &str,
    usage: BufferUsage,
    data: &[T],
) -> ResourceResult<Buffer> {
    let instance_size = size_of::<T>() as vk::DeviceSize;
    let count = data.len() as u32;

    let mut staging = Buffer::new(
        device.clone(),
        &format!("{name} staging"),
        BufferUsage::Staging,
        instance_size,
        count,
        1,
    )?;
    staging.map(vk::WHOLE_SIZE, 0)?;
    staging.write_to_buffer(bytemuck::cast_slice(data), vk::WHOLE_SIZE, 0)?;
    staging.unmap();

    let buffer = Buffer::new(device.clone(), name, usage, instance_size, count, 1)?;
    device.copy_buffer(staging.handle(), buffer.handle(), buffer.buffer_size())?;

    Ok(buffer)
}

/// Checks a vertex list before upload.
pub fn validate_vertices(vertices: &[Vertex]) -> ResourceResult<()> {
    if vertices.len() < MIN_VERTEX_COUNT {
        return Err(ResourceError::TooFewVertices(vertices.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_indexed_draw_covers_every_vertex() {
        for n in 3..64 {
            let call = DrawCall::select(n, 0);
            assert_eq!(call, DrawCall::NonIndexed { vertex_count: n });
            assert_eq!(call.vertices_issued(), n);
        }
    }

    #[test]
    fn test_indexed_draw_covers_every_index() {
        for count in [1, 3, 6, 36, 1024] {
            let call = DrawCall::select(4, count);
            assert_eq!(call, DrawCall::Indexed { index_count: count });
            assert_eq!(call.vertices_issued(), count);
        }
    }

    #[test]
    fn test_validate_vertices_needs_a_triangle() {
        let two = vec![Vertex::default(); 2];
        assert!(matches!(
            validate_vertices(&two),
            Err(ResourceError::TooFewVertices(2))
        ));
        assert!(validate_vertices(&[Vertex::default(); 3]).is_ok());
    }
}
