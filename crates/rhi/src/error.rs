//! RHI-specific error types.

use ash::vk;
use thiserror::Error;

/// RHI-specific error type.
#[derive(Error, Debug)]
pub enum RhiError {
    /// Vulkan API error
    #[error("Vulkan error: {0}")]
    VulkanError(#[from] vk::Result),

    /// Failed to load Vulkan library
    #[error("Failed to load Vulkan: {0}")]
    LoadingError(#[from] ash::LoadingError),

    /// GPU allocator error
    #[error("Allocator error: {0}")]
    AllocatorError(#[from] gpu_allocator::AllocationError),

    /// No suitable GPU found
    #[error("No suitable GPU found")]
    NoSuitableGpu,

    /// Shader loading error
    #[error("Shader error: {0}")]
    ShaderError(String),

    /// Surface creation error
    #[error("Surface error: {0}")]
    SurfaceError(String),

    /// Swapchain error
    #[error("Swapchain error: {0}")]
    SwapchainError(String),

    /// Invalid handle or argument
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    /// Pipeline creation error
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// None of the candidate formats supports the requested features
    #[error("No supported format among {0:?}")]
    UnsupportedFormat(Vec<vk::Format>),

    /// A recreated swapchain picked a different color or depth format
    #[error("Swapchain image or depth format has changed")]
    SwapchainFormatChanged,

    /// `begin_frame` called while a frame is in progress
    #[error("Cannot begin a frame while another frame is in progress")]
    FrameAlreadyStarted,

    /// Frame-scoped operation called with no frame in progress
    #[error("Cannot {0} while no frame is in progress")]
    FrameNotStarted(&'static str),

    /// Command buffer does not belong to the current frame
    #[error("Command buffer does not belong to the current frame")]
    CommandBufferMismatch,

    /// Buffer memory cannot be mapped by the host
    #[error("Buffer '{0}' is not host visible")]
    BufferNotHostVisible(String),

    /// Host access to a buffer that is not mapped
    #[error("Buffer '{0}' is not mapped")]
    BufferNotMapped(String),

    /// Access outside the mapped range of a buffer
    #[error("Buffer access out of bounds: offset {offset} + size {size} exceeds {limit}")]
    BufferOutOfBounds {
        offset: vk::DeviceSize,
        size: vk::DeviceSize,
        limit: vk::DeviceSize,
    },
}

/// Result type alias for RHI operations.
pub type RhiResult<T> = std::result::Result<T, RhiError>;
