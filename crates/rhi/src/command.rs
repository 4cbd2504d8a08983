//! Command buffer recording.
//!
//! Command buffers are allocated from the device's shared pool (see
//! [`Device::allocate_command_buffers`]). [`CommandBuffer`] is a thin
//! recording wrapper around a raw handle; it does not free the handle when
//! dropped.
//!
//! ```no_run
//! use std::sync::Arc;
//! use renderer_rhi::device::Device;
//!
//! # fn example(device: Arc<Device>) -> Result<(), renderer_rhi::RhiError> {
//! device.execute_single_time_commands(|cmd| {
//!     // ... record transfer commands ...
//!     let _ = cmd.handle();
//! })?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use bytemuck::Pod;

use crate::device::Device;
use crate::error::RhiResult;

/// Vulkan command buffer wrapper.
///
/// The wrapper does NOT own the underlying VkCommandBuffer. Whoever
/// allocated it (the renderer for per-frame buffers, the device for
/// single-time buffers) is responsible for freeing it.
#[derive(Clone)]
pub struct CommandBuffer {
    device: Arc<Device>,
    buffer: vk::CommandBuffer,
}

impl CommandBuffer {
    /// Wraps an existing command buffer handle.
    #[inline]
    pub fn from_handle(device: Arc<Device>, buffer: vk::CommandBuffer) -> Self {
        Self { device, buffer }
    }

    /// Returns the raw Vulkan command buffer handle.
    #[inline]
    pub fn handle(&self) -> vk::CommandBuffer {
        self.buffer
    }

    // =========================================================================
    // Recording Control
    // =========================================================================

    /// Begins recording for a single submission.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is already recording.
    pub fn begin(&self) -> RhiResult<()> {
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe {
            self.device
                .handle()
                .begin_command_buffer(self.buffer, &begin_info)?;
        }

        Ok(())
    }

    /// Ends recording. The buffer is then ready for submission.
    pub fn end(&self) -> RhiResult<()> {
        unsafe {
            self.device.handle().end_command_buffer(self.buffer)?;
        }

        Ok(())
    }

    // =========================================================================
    // Render Pass
    // =========================================================================

    /// Begins a render pass with inline subpass contents.
    pub fn begin_render_pass(&self, begin_info: &vk::RenderPassBeginInfo) {
        unsafe {
            self.device.handle().cmd_begin_render_pass(
                self.buffer,
                begin_info,
                vk::SubpassContents::INLINE,
            );
        }
    }

    /// Ends the current render pass.
    pub fn end_render_pass(&self) {
        unsafe {
            self.device.handle().cmd_end_render_pass(self.buffer);
        }
    }

    // =========================================================================
    // Pipeline Binding
    // =========================================================================

    /// Binds a graphics pipeline.
    pub fn bind_pipeline(&self, pipeline: vk::Pipeline) {
        unsafe {
            self.device.handle().cmd_bind_pipeline(
                self.buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline,
            );
        }
    }

    /// Binds vertex buffers starting at `first_binding`.
    pub fn bind_vertex_buffers(
        &self,
        first_binding: u32,
        buffers: &[vk::Buffer],
        offsets: &[vk::DeviceSize],
    ) {
        unsafe {
            self.device.handle().cmd_bind_vertex_buffers(
                self.buffer,
                first_binding,
                buffers,
                offsets,
            );
        }
    }

    /// Binds an index buffer.
    pub fn bind_index_buffer(
        &self,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        index_type: vk::IndexType,
    ) {
        unsafe {
            self.device
                .handle()
                .cmd_bind_index_buffer(self.buffer, buffer, offset, index_type);
        }
    }

    // =========================================================================
    // Dynamic State
    // =========================================================================

    /// Sets viewport 0.
    pub fn set_viewport(&self, viewport: vk::Viewport) {
        unsafe {
            self.device
                .handle()
                .cmd_set_viewport(self.buffer, 0, &[viewport]);
        }
    }

    /// Sets scissor 0.
    pub fn set_scissor(&self, scissor: vk::Rect2D) {
        unsafe {
            self.device
                .handle()
                .cmd_set_scissor(self.buffer, 0, &[scissor]);
        }
    }

    // =========================================================================
    // Draw Commands
    // =========================================================================

    /// Issues a non-indexed draw command.
    pub fn draw(
        &self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        unsafe {
            self.device.handle().cmd_draw(
                self.buffer,
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            );
        }
    }

    /// Issues an indexed draw command.
    pub fn draw_indexed(
        &self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        unsafe {
            self.device.handle().cmd_draw_indexed(
                self.buffer,
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
        }
    }

    /// Updates push constant data.
    ///
    /// # Arguments
    ///
    /// * `layout` - Pipeline layout declaring the push constant range
    /// * `stages` - Shader stages that read the range
    /// * `offset` - Byte offset within push constant memory
    /// * `data` - Plain-old-data value to push
    pub fn push_constants<T: Pod>(
        &self,
        layout: vk::PipelineLayout,
        stages: vk::ShaderStageFlags,
        offset: u32,
        data: &T,
    ) {
        unsafe {
            self.device.handle().cmd_push_constants(
                self.buffer,
                layout,
                stages,
                offset,
                bytemuck::bytes_of(data),
            );
        }
    }

    // =========================================================================
    // Copy Commands
    // =========================================================================

    /// Copies regions between two buffers.
    pub fn copy_buffer(&self, src: vk::Buffer, dst: vk::Buffer, regions: &[vk::BufferCopy]) {
        unsafe {
            self.device
                .handle()
                .cmd_copy_buffer(self.buffer, src, dst, regions);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_buffer_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<CommandBuffer>();
    }
}
