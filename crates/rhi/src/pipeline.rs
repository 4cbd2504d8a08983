//! Graphics pipeline creation.
//!
//! A [`PipelineConfig`] is a plain value object holding one named group of
//! settings per fixed-function stage. [`PipelineConfig::default`] yields the
//! opaque triangle-list setup used by the renderer; callers then fill in the
//! render pass and layout.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::path::Path;
//! use renderer_rhi::device::Device;
//! use renderer_rhi::pipeline::{Pipeline, PipelineConfig};
//! use renderer_rhi::vk;
//!
//! # fn example(
//! #     device: Arc<Device>,
//! #     render_pass: vk::RenderPass,
//! #     layout: vk::PipelineLayout,
//! # ) -> Result<(), renderer_rhi::RhiError> {
//! let config = PipelineConfig {
//!     render_pass,
//!     layout,
//!     ..PipelineConfig::default()
//! };
//! let pipeline = Pipeline::new(
//!     device,
//!     Path::new("shaders/simple.vert.spv"),
//!     Path::new("shaders/simple.frag.spv"),
//!     &config,
//! )?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::command::CommandBuffer;
use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::shader::{Shader, ShaderStage};
use crate::vertex::Vertex;

/// Owned VkPipelineLayout.
pub struct PipelineLayout {
    device: Arc<Device>,
    layout: vk::PipelineLayout,
}

impl PipelineLayout {
    /// Creates a layout from descriptor set layouts and push constant ranges.
    pub fn new(
        device: Arc<Device>,
        descriptor_set_layouts: &[vk::DescriptorSetLayout],
        push_constant_ranges: &[vk::PushConstantRange],
    ) -> RhiResult<Self> {
        let create_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(descriptor_set_layouts)
            .push_constant_ranges(push_constant_ranges);

        let layout = unsafe { device.handle().create_pipeline_layout(&create_info, None)? };

        debug!(
            "Created pipeline layout with {} set layout(s) and {} push constant range(s)",
            descriptor_set_layouts.len(),
            push_constant_ranges.len()
        );

        Ok(Self { device, layout })
    }

    #[inline]
    pub fn handle(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for PipelineLayout {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_pipeline_layout(self.layout, None);
        }
    }
}

/// Input assembly stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputAssemblyConfig {
    pub topology: vk::PrimitiveTopology,
    pub primitive_restart: bool,
}

/// Rasterization stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterizationConfig {
    pub polygon_mode: vk::PolygonMode,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub line_width: f32,
    pub depth_clamp: bool,
    pub rasterizer_discard: bool,
}

/// Multisample stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MultisampleConfig {
    pub samples: vk::SampleCountFlags,
    pub sample_shading: bool,
    pub min_sample_shading: f32,
}

/// Blend state of the single color attachment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorBlendConfig {
    pub blend_enable: bool,
    pub src_color: vk::BlendFactor,
    pub dst_color: vk::BlendFactor,
    pub color_op: vk::BlendOp,
    pub src_alpha: vk::BlendFactor,
    pub dst_alpha: vk::BlendFactor,
    pub alpha_op: vk::BlendOp,
    pub write_mask: vk::ColorComponentFlags,
}

impl ColorBlendConfig {
    fn to_vk(self) -> vk::PipelineColorBlendAttachmentState {
        vk::PipelineColorBlendAttachmentState {
            blend_enable: self.blend_enable.into(),
            src_color_blend_factor: self.src_color,
            dst_color_blend_factor: self.dst_color,
            color_blend_op: self.color_op,
            src_alpha_blend_factor: self.src_alpha,
            dst_alpha_blend_factor: self.dst_alpha,
            alpha_blend_op: self.alpha_op,
            color_write_mask: self.write_mask,
        }
    }
}

/// Depth/stencil stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepthStencilConfig {
    pub depth_test: bool,
    pub depth_write: bool,
    pub compare_op: vk::CompareOp,
    pub stencil_test: bool,
}

/// Complete fixed-function state of a graphics pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub input_assembly: InputAssemblyConfig,
    pub rasterization: RasterizationConfig,
    pub multisample: MultisampleConfig,
    pub color_blend: ColorBlendConfig,
    pub depth_stencil: DepthStencilConfig,
    /// Viewport and scissor are always dynamic; other states may be added.
    pub dynamic_states: Vec<vk::DynamicState>,
    pub render_pass: vk::RenderPass,
    pub subpass: u32,
    pub layout: vk::PipelineLayout,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_assembly: InputAssemblyConfig {
                topology: vk::PrimitiveTopology::TRIANGLE_LIST,
                primitive_restart: false,
            },
            rasterization: RasterizationConfig {
                polygon_mode: vk::PolygonMode::FILL,
                cull_mode: vk::CullModeFlags::NONE,
                front_face: vk::FrontFace::COUNTER_CLOCKWISE,
                line_width: 1.0,
                depth_clamp: false,
                rasterizer_discard: false,
            },
            multisample: MultisampleConfig {
                samples: vk::SampleCountFlags::TYPE_1,
                sample_shading: false,
                min_sample_shading: 1.0,
            },
            color_blend: ColorBlendConfig {
                blend_enable: false,
                src_color: vk::BlendFactor::ONE,
                dst_color: vk::BlendFactor::ZERO,
                color_op: vk::BlendOp::ADD,
                src_alpha: vk::BlendFactor::ONE,
                dst_alpha: vk::BlendFactor::ZERO,
                alpha_op: vk::BlendOp::ADD,
                write_mask: vk::ColorComponentFlags::R
                    | vk::ColorComponentFlags::G
                    | vk::ColorComponentFlags::B
                    | vk::ColorComponentFlags::A,
            },
            depth_stencil: DepthStencilConfig {
                depth_test: true,
                depth_write: true,
                compare_op: vk::CompareOp::LESS,
                stencil_test: false,
            },
            dynamic_states: vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR],
            render_pass: vk::RenderPass::null(),
            subpass: 0,
            layout: vk::PipelineLayout::null(),
        }
    }
}

impl PipelineConfig {
    /// Checks that the handles a pipeline cannot be built without are set.
    pub fn validate(&self) -> RhiResult<()> {
        if self.layout == vk::PipelineLayout::null() {
            return Err(RhiError::PipelineError(
                "Cannot create pipeline: no pipeline layout in config".to_string(),
            ));
        }
        if self.render_pass == vk::RenderPass::null() {
            return Err(RhiError::PipelineError(
                "Cannot create pipeline: no render pass in config".to_string(),
            ));
        }
        Ok(())
    }
}

/// Owned graphics VkPipeline for the [`Vertex`] format.
pub struct Pipeline {
    device: Arc<Device>,
    pipeline: vk::Pipeline,
}

impl Pipeline {
    /// Loads both shader stages and builds the pipeline described by
    /// `config`.
    ///
    /// # Errors
    ///
    /// - [`RhiError::ShaderError`] for a missing or empty shader file
    /// - [`RhiError::PipelineError`] if the config lacks a layout or render
    ///   pass
    pub fn new(
        device: Arc<Device>,
        vert_path: &Path,
        frag_path: &Path,
        config: &PipelineConfig,
    ) -> RhiResult<Self> {
        config.validate()?;

        let vertex = Shader::from_spirv_file(device.clone(), vert_path, ShaderStage::Vertex)?;
        let fragment = Shader::from_spirv_file(device.clone(), frag_path, ShaderStage::Fragment)?;
        let stages = [vertex.stage_create_info(), fragment.stage_create_info()];

        let bindings = Vertex::binding_descriptions();
        let attributes = Vertex::attribute_descriptions();
        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(config.input_assembly.topology)
            .primitive_restart_enable(config.input_assembly.primitive_restart);

        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let raster = &config.rasterization;
        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(raster.depth_clamp)
            .rasterizer_discard_enable(raster.rasterizer_discard)
            .polygon_mode(raster.polygon_mode)
            .line_width(raster.line_width)
            .cull_mode(raster.cull_mode)
            .front_face(raster.front_face)
            .depth_bias_enable(false);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(config.multisample.samples)
            .sample_shading_enable(config.multisample.sample_shading)
            .min_sample_shading(config.multisample.min_sample_shading);

        let blend_attachments = [config.color_blend.to_vk()];
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&blend_attachments);

        let depth = &config.depth_stencil;
        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(depth.depth_test)
            .depth_write_enable(depth.depth_write)
            .depth_compare_op(depth.compare_op)
            .depth_bounds_test_enable(false)
            .min_depth_bounds(0.0)
            .max_depth_bounds(1.0)
            .stencil_test_enable(depth.stencil_test);

        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&config.dynamic_states);

        let create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .depth_stencil_state(&depth_stencil_state)
            .dynamic_state(&dynamic_state)
            .layout(config.layout)
            .render_pass(config.render_pass)
            .subpass(config.subpass);

        let pipeline = unsafe {
            device
                .handle()
                .create_graphics_pipelines(vk::PipelineCache::null(), &[create_info], None)
                .map_err(|(_, result)| result)?[0]
        };

        info!(
            "Graphics pipeline created from {:?} and {:?}",
            vert_path, frag_path
        );

        Ok(Self { device, pipeline })
    }

    /// Binds the pipeline for subsequent draws.
    pub fn bind(&self, command_buffer: &CommandBuffer) {
        command_buffer.bind_pipeline(self.pipeline);
    }

    #[inline]
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_pipeline(self.pipeline, None);
        }
        debug!("Graphics pipeline destroyed");
    }
}

#[cfg(test)]
mod tests {
    use ash::vk::Handle;

    use super::*;

    #[test]
    fn test_default_config_stage_settings() {
        let config = PipelineConfig::default();
        assert_eq!(
            config.input_assembly.topology,
            vk::PrimitiveTopology::TRIANGLE_LIST
        );
        assert_eq!(config.rasterization.polygon_mode, vk::PolygonMode::FILL);
        assert_eq!(config.rasterization.cull_mode, vk::CullModeFlags::NONE);
        assert_eq!(
            config.rasterization.front_face,
            vk::FrontFace::COUNTER_CLOCKWISE
        );
        assert_eq!(config.multisample.samples, vk::SampleCountFlags::TYPE_1);
        assert!(!config.color_blend.blend_enable);
        assert!(config.color_blend.write_mask.contains(
            vk::ColorComponentFlags::R | vk::ColorComponentFlags::A
        ));
    }

    #[test]
    fn test_default_config_depth_testing() {
        let depth = PipelineConfig::default().depth_stencil;
        assert!(depth.depth_test);
        assert!(depth.depth_write);
        assert_eq!(depth.compare_op, vk::CompareOp::LESS);
        assert!(!depth.stencil_test);
    }

    #[test]
    fn test_default_config_dynamic_viewport_and_scissor() {
        let config = PipelineConfig::default();
        assert_eq!(
            config.dynamic_states,
            vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR]
        );
    }

    #[test]
    fn test_validate_requires_layout_and_render_pass() {
        let config = PipelineConfig::default();
        assert!(matches!(config.validate(), Err(RhiError::PipelineError(_))));

        let missing_pass = PipelineConfig {
            layout: vk::PipelineLayout::from_raw(1),
            ..PipelineConfig::default()
        };
        assert!(matches!(
            missing_pass.validate(),
            Err(RhiError::PipelineError(msg)) if msg.contains("render pass")
        ));

        let complete = PipelineConfig {
            render_pass: vk::RenderPass::from_raw(2),
            ..missing_pass
        };
        assert!(complete.validate().is_ok());
    }

    #[test]
    fn test_color_blend_to_vk() {
        let state = PipelineConfig::default().color_blend.to_vk();
        assert_eq!(state.blend_enable, vk::FALSE);
        assert_eq!(state.src_color_blend_factor, vk::BlendFactor::ONE);
        assert!(state.color_write_mask.contains(vk::ColorComponentFlags::B));
    }
}
