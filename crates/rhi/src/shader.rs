//! SPIR-V shader modules.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::path::Path;
//! use renderer_rhi::device::Device;
//! use renderer_rhi::shader::{Shader, ShaderStage};
//!
//! # fn example(device: Arc<Device>) -> Result<(), renderer_rhi::RhiError> {
//! let vertex = Shader::from_spirv_file(
//!     device,
//!     Path::new("shaders/simple.vert.spv"),
//!     ShaderStage::Vertex,
//! )?;
//! let _stage = vertex.stage_create_info();
//! # Ok(())
//! # }
//! ```

use std::ffi::CStr;
use std::path::Path;
use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

const ENTRY_POINT: &CStr = c"main";

/// Pipeline stage a shader module is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn to_vk_stage(self) -> vk::ShaderStageFlags {
        match self {
            ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Decodes little-endian SPIR-V bytes into code words.
///
/// # Errors
///
/// Empty input or a length that is not a multiple of 4 is rejected.
pub fn spirv_words(bytes: &[u8]) -> RhiResult<Vec<u32>> {
    if bytes.is_empty() {
        return Err(RhiError::ShaderError("SPIR-V code is empty".to_string()));
    }
    if !bytes.len().is_multiple_of(4) {
        return Err(RhiError::ShaderError(format!(
            "SPIR-V code must be 4-byte aligned, got {} bytes",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Owned VkShaderModule with entry point `main`.
pub struct Shader {
    device: Arc<Device>,
    module: vk::ShaderModule,
    stage: ShaderStage,
}

impl Shader {
    /// Loads a compiled SPIR-V file.
    ///
    /// # Errors
    ///
    /// A missing, unreadable or empty file is a [`RhiError::ShaderError`].
    pub fn from_spirv_file(device: Arc<Device>, path: &Path, stage: ShaderStage) -> RhiResult<Self> {
        debug!("Loading {} shader from {:?}", stage, path);

        let bytes = std::fs::read(path).map_err(|e| {
            RhiError::ShaderError(format!("Failed to read shader file {:?}: {}", path, e))
        })?;
        if bytes.is_empty() {
            return Err(RhiError::ShaderError(format!(
                "Shader file {:?} is empty",
                path
            )));
        }

        Self::from_spirv_bytes(device, &bytes, stage)
    }

    /// Creates a module from SPIR-V bytes.
    pub fn from_spirv_bytes(device: Arc<Device>, bytes: &[u8], stage: ShaderStage) -> RhiResult<Self> {
        let code = spirv_words(bytes)?;
        let create_info = vk::ShaderModuleCreateInfo::default().code(&code);
        let module = unsafe { device.handle().create_shader_module(&create_info, None)? };

        Ok(Self {
            device,
            module,
            stage,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    #[inline]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Stage description for graphics pipeline creation.
    pub fn stage_create_info(&self) -> vk::PipelineShaderStageCreateInfo<'_> {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(self.stage.to_vk_stage())
            .module(self.module)
            .name(ENTRY_POINT)
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_shader_module(self.module, None);
        }
    }
}
