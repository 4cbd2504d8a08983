//! Forward render system drawing every game object with one pipeline.
//!
//! Per object, the combined `projection * view * model` matrix and the
//! normal matrix are delivered through a push-constant block.

use std::mem::size_of;
use std::path::Path;
use std::sync::Arc;

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use tracing::{debug, info, trace};

use renderer_rhi::RhiResult;
use renderer_rhi::device::Device;
use renderer_rhi::pipeline::{Pipeline, PipelineConfig, PipelineLayout};
use renderer_scene::GameObject;

use crate::frame::FrameInfo;

/// Push-constant block read by the vertex and fragment shaders.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct SimplePushConstantData {
    /// Clip-space transform: `projection * view * model`.
    pub transform: Mat4,
    pub normal_matrix: Mat4,
}

impl Default for SimplePushConstantData {
    fn default() -> Self {
        Self {
            transform: Mat4::IDENTITY,
            normal_matrix: Mat4::IDENTITY,
        }
    }
}

/// Stages that read [`SimplePushConstantData`].
pub const PUSH_CONSTANT_STAGES: vk::ShaderStageFlags = vk::ShaderStageFlags::from_raw(
    vk::ShaderStageFlags::VERTEX.as_raw() | vk::ShaderStageFlags::FRAGMENT.as_raw(),
);

/// The single push-constant range of the simple pipeline layout.
pub fn push_constant_range() -> vk::PushConstantRange {
    vk::PushConstantRange {
        stage_flags: PUSH_CONSTANT_STAGES,
        offset: 0,
        size: size_of::<SimplePushConstantData>() as u32,
    }
}

/// Owns the pipeline and layout for drawing game objects.
pub struct SimpleRenderSystem {
    // Dropped before the layout it was created with.
    pipeline: Pipeline,
    pipeline_layout: PipelineLayout,
}

impl SimpleRenderSystem {
    /// Builds the pipeline for `render_pass` from two SPIR-V files.
    ///
    /// # Errors
    ///
    /// Returns an error if a shader file is missing or empty, or if layout or
    /// pipeline creation fails.
    pub fn new(
        device: &Arc<Device>,
        render_pass: vk::RenderPass,
        vert_path: &Path,
        frag_path: &Path,
    ) -> RhiResult<Self> {
        let pipeline_layout = PipelineLayout::new(device.clone(), &[], &[push_constant_range()])?;

        let config = PipelineConfig {
            render_pass,
            layout: pipeline_layout.handle(),
            ..Default::default()
        };
        let pipeline = Pipeline::new(device.clone(), vert_path, frag_path, &config)?;

        info!(
            "Simple render system ready ({} / {})",
            vert_path.display(),
            frag_path.display()
        );

        Ok(Self {
            pipeline,
            pipeline_layout,
        })
    }

    /// Records draws for every object that has a model.
    pub fn render_game_objects(&self, frame_info: &FrameInfo<'_>, game_objects: &[GameObject]) {
        let command_buffer = frame_info.command_buffer;
        self.pipeline.bind(command_buffer);

        let projection_view = frame_info.camera.projection_view();
        let mut drawn = 0;

        for object in game_objects {
            let Some(model) = &object.model else {
                continue;
            };

            let push = push_constants_for(projection_view, object);
            command_buffer.push_constants(
                self.pipeline_layout.handle(),
                PUSH_CONSTANT_STAGES,
                0,
                &push,
            );
            model.bind(command_buffer);
            model.draw(command_buffer);
            drawn += 1;
        }

        trace!("Frame {}: drew {} object(s)", frame_info.frame_index, drawn);
    }
}

impl Drop for SimpleRenderSystem {
    fn drop(&mut self) {
        debug!("Simple render system destroyed");
    }
}

/// Push constants for drawing `object` with camera matrix `projection_view`.
pub fn push_constants_for(projection_view: Mat4, object: &GameObject) -> SimplePushConstantData {
    SimplePushConstantData {
        transform: projection_view * object.transform.mat4(),
        normal_matrix: object.transform.normal_matrix(),
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use renderer_scene::{GameObjectIdAllocator, TransformComponent};

    use super::*;

    #[test]
    fn test_push_constant_block_size() {
        // Two column-major 4x4 float matrices, inside the 128-byte minimum.
        assert_eq!(size_of::<SimplePushConstantData>(), 128);
        assert_eq!(push_constant_range().size, 128);
        assert_eq!(push_constant_range().offset, 0);
    }

    #[test]
    fn test_push_constant_stages() {
        assert!(PUSH_CONSTANT_STAGES.contains(vk::ShaderStageFlags::VERTEX));
        assert!(PUSH_CONSTANT_STAGES.contains(vk::ShaderStageFlags::FRAGMENT));
    }

    #[test]
    fn test_push_constants_combine_camera_and_model() {
        let mut ids = GameObjectIdAllocator::new();
        let object = ids.create().with_transform(
            TransformComponent::new()
                .with_translation(Vec3::new(0.0, 0.0, 2.5))
                .with_scale(Vec3::splat(3.0)),
        );
        let projection_view = Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0));

        let push = push_constants_for(projection_view, &object);
        assert_eq!(push.transform, projection_view * object.transform.mat4());
        assert_eq!(push.normal_matrix, object.transform.normal_matrix());
    }
}
