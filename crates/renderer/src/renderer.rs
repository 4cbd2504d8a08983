//! Frame orchestration.
//!
//! This module provides the [`Renderer`], which owns the Vulkan instance,
//! surface, device and swapchain and drives the
//! `begin_frame → begin_render_pass → record → end_render_pass → end_frame`
//! sequence. It also owns the swapchain recreation policy for resizes,
//! minimized windows and out-of-date surfaces.

use std::mem::ManuallyDrop;
use std::sync::Arc;

use ash::vk;
use tracing::{debug, error, info, warn};

use renderer_core::RendererConfig;
use renderer_platform::{RenderWindow, Surface, Window};
use renderer_rhi::command::CommandBuffer;
use renderer_rhi::device::Device;
use renderer_rhi::instance::Instance;
use renderer_rhi::physical_device::select_physical_device;
use renderer_rhi::swapchain::{AcquireOutcome, Swapchain};
use renderer_rhi::{MAX_FRAMES_IN_FLIGHT, RhiError, RhiResult};

use crate::frame::FrameState;

/// Blocks until `window` reports a drawable area in both dimensions.
///
/// A minimized window reports a zero extent; there is nothing to present to
/// until it is restored.
pub fn wait_for_nonzero_extent(window: &impl RenderWindow) -> vk::Extent2D {
    let mut extent = window.extent();
    while extent.width == 0 || extent.height == 0 {
        window.wait_events();
        extent = window.extent();
    }
    extent
}

/// Viewport covering all of `extent` with the full depth range.
pub fn full_viewport(extent: vk::Extent2D) -> vk::Viewport {
    vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

/// Scissor covering all of `extent`.
pub fn full_scissor(extent: vk::Extent2D) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    }
}

/// Owns the presentation stack and the per-frame command buffers.
///
/// # Resource Destruction Order
///
/// 1. Wait for the device to go idle
/// 2. Free command buffers
/// 3. Destroy the swapchain and its attachments
/// 4. Destroy the surface
/// 5. Release the device
/// 6. Destroy the instance
///
/// Models and render systems hold their own device references and must be
/// dropped before the renderer.
pub struct Renderer {
    instance: ManuallyDrop<Instance>,
    surface: ManuallyDrop<Surface>,
    device: ManuallyDrop<Arc<Device>>,
    /// `None` only while a replacement is being built.
    swapchain: Option<Swapchain>,
    /// One per frame slot.
    command_buffers: Vec<CommandBuffer>,
    frame: FrameState,
    clear_color: [f32; 4],
}

impl Renderer {
    /// Creates the renderer for `window`.
    ///
    /// # Errors
    ///
    /// Returns an error if any step of Vulkan setup fails: instance,
    /// surface, device selection, swapchain or command buffer allocation.
    pub fn new(window: &Window, config: &RendererConfig) -> RhiResult<Self> {
        let extensions = window
            .required_extensions()
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?;
        let instance = Instance::new(c"renderer", &extensions, config.validation)?;

        let surface = window
            .create_surface(instance.entry(), instance.handle())
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?;

        let physical_device_info =
            select_physical_device(instance.handle(), surface.handle(), surface.loader())?;
        let device = Device::new(&instance, &physical_device_info)?;

        let extent = wait_for_nonzero_extent(window);
        let swapchain = Swapchain::new(&instance, device.clone(), surface.handle(), extent, None)?;
        let command_buffers = allocate_frame_command_buffers(&device)?;

        info!(
            "Renderer initialized: {}x{}, {} swapchain images, {} frames in flight",
            swapchain.width(),
            swapchain.height(),
            swapchain.image_count(),
            MAX_FRAMES_IN_FLIGHT
        );

        Ok(Self {
            instance: ManuallyDrop::new(instance),
            surface: ManuallyDrop::new(surface),
            device: ManuallyDrop::new(device),
            swapchain: Some(swapchain),
            command_buffers,
            frame: FrameState::new(),
            clear_color: config.clear_color,
        })
    }

    // =========================================================================
    // Frame lifecycle
    // =========================================================================

    /// Acquires the next image and starts recording the current frame slot's
    /// command buffer.
    ///
    /// Returns `Ok(None)` when the surface was out of date. The swapchain has
    /// then been recreated and the caller must skip this frame.
    ///
    /// # Errors
    ///
    /// [`RhiError::FrameAlreadyStarted`] if a frame is already in progress,
    /// or any acquisition, recreation or recording failure.
    pub fn begin_frame(
        &mut self,
        window: &impl RenderWindow,
    ) -> RhiResult<Option<CommandBuffer>> {
        self.frame.ensure_idle()?;

        let image_index = match self.swapchain()?.acquire_next_image()? {
            AcquireOutcome::Image { index, suboptimal } => {
                if suboptimal {
                    debug!("Acquired image {} from a suboptimal swapchain", index);
                }
                index
            }
            AcquireOutcome::OutOfDate => {
                debug!("Swapchain out of date on acquire, recreating");
                self.recreate_swapchain(window)?;
                return Ok(None);
            }
        };

        let command_buffer = self.command_buffers[self.frame.frame_index()].clone();
        self.frame
            .begin_with(image_index, || command_buffer.begin())?;
        Ok(Some(command_buffer))
    }

    /// Finishes recording, submits and presents the current frame.
    ///
    /// The swapchain is recreated when presentation reports an out-of-date or
    /// suboptimal surface, or when `window` reports a resize.
    ///
    /// # Errors
    ///
    /// [`RhiError::FrameNotStarted`] if no frame is in progress, or any
    /// submission, presentation or recreation failure.
    pub fn end_frame(&mut self, window: &mut impl RenderWindow) -> RhiResult<()> {
        let image_index = self.frame.image_index()?;
        let command_buffer = &self.command_buffers[self.frame.frame_index()];
        command_buffer.end()?;
        let command_buffer = command_buffer.handle();

        let status = self
            .swapchain_mut()?
            .submit_and_present(command_buffer, image_index)?;
        self.frame.end()?;

        if status.needs_recreation() || window.was_resized() {
            debug!("Presentation status {:?}, resized: {}", status, window.was_resized());
            window.reset_resized();
            self.recreate_swapchain(window)?;
        }

        Ok(())
    }

    /// Begins the swapchain render pass on `command_buffer` and sets a
    /// viewport and scissor covering the whole swapchain extent.
    ///
    /// # Errors
    ///
    /// [`RhiError::FrameNotStarted`] outside a frame and
    /// [`RhiError::CommandBufferMismatch`] if `command_buffer` is not the one
    /// returned by the current [`begin_frame`](Self::begin_frame).
    pub fn begin_render_pass(&self, command_buffer: &CommandBuffer) -> RhiResult<()> {
        self.frame.ensure_started("begin a render pass")?;
        self.check_current(command_buffer)?;

        let image_index = self.frame.image_index()?;
        let swapchain = self.swapchain()?;
        let extent = swapchain.extent();

        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: self.clear_color,
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            },
        ];

        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(swapchain.render_pass()?)
            .framebuffer(swapchain.framebuffer(image_index as usize))
            .render_area(full_scissor(extent))
            .clear_values(&clear_values);

        command_buffer.begin_render_pass(&begin_info);
        command_buffer.set_viewport(full_viewport(extent));
        command_buffer.set_scissor(full_scissor(extent));
        Ok(())
    }

    /// Ends the swapchain render pass on `command_buffer`.
    ///
    /// # Errors
    ///
    /// Same preconditions as [`begin_render_pass`](Self::begin_render_pass).
    pub fn end_render_pass(&self, command_buffer: &CommandBuffer) -> RhiResult<()> {
        self.frame.ensure_started("end a render pass")?;
        self.check_current(command_buffer)?;
        command_buffer.end_render_pass();
        Ok(())
    }

    fn check_current(&self, command_buffer: &CommandBuffer) -> RhiResult<()> {
        if command_buffer.handle() != self.command_buffers[self.frame.frame_index()].handle() {
            return Err(RhiError::CommandBufferMismatch);
        }
        Ok(())
    }

    // =========================================================================
    // Swapchain recreation
    // =========================================================================

    /// Replaces the swapchain with one matching the current window extent.
    ///
    /// Blocks while the window is minimized, then waits for the device to go
    /// idle. Command buffers are reallocated only if the image count
    /// changed.
    ///
    /// # Errors
    ///
    /// [`RhiError::SwapchainFormatChanged`] if the new swapchain picked a
    /// different color or depth format, or any creation failure.
    fn recreate_swapchain(&mut self, window: &impl RenderWindow) -> RhiResult<()> {
        let extent = wait_for_nonzero_extent(window);
        self.device.wait_idle()?;

        let previous = self.swapchain.take();
        let previous_formats = previous.as_ref().map(Swapchain::formats);
        let previous_image_count = previous.as_ref().map(Swapchain::image_count);

        let swapchain = Swapchain::new(
            &self.instance,
            Arc::clone(self.device()),
            self.surface.handle(),
            extent,
            previous,
        )?;
        let formats = swapchain.formats();
        let image_count = swapchain.image_count();
        self.swapchain = Some(swapchain);

        if let Some(previous_formats) = previous_formats
            && !previous_formats.is_compatible(&formats)
        {
            error!(
                "Swapchain formats changed from {:?} to {:?}",
                previous_formats, formats
            );
            return Err(RhiError::SwapchainFormatChanged);
        }

        if previous_image_count != Some(image_count) {
            debug!(
                "Swapchain image count changed ({:?} -> {}), reallocating command buffers",
                previous_image_count, image_count
            );
            self.free_command_buffers();
            self.command_buffers = allocate_frame_command_buffers(&self.device)?;
        }

        info!(
            "Swapchain recreated: {}x{}, {} images",
            extent.width, extent.height, image_count
        );
        Ok(())
    }

    fn free_command_buffers(&mut self) {
        let handles: Vec<vk::CommandBuffer> =
            self.command_buffers.drain(..).map(|cb| cb.handle()).collect();
        self.device.free_command_buffers(&handles);
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    fn swapchain(&self) -> RhiResult<&Swapchain> {
        self.swapchain
            .as_ref()
            .ok_or_else(|| RhiError::SwapchainError("No swapchain".to_string()))
    }

    fn swapchain_mut(&mut self) -> RhiResult<&mut Swapchain> {
        self.swapchain
            .as_mut()
            .ok_or_else(|| RhiError::SwapchainError("No swapchain".to_string()))
    }

    /// The device, for creating models and render systems.
    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Width over height of the swapchain extent.
    pub fn aspect_ratio(&self) -> RhiResult<f32> {
        Ok(self.swapchain()?.extent_aspect_ratio())
    }

    /// Render pass that pipelines drawing to the swapchain must use.
    pub fn swap_chain_render_pass(&self) -> RhiResult<vk::RenderPass> {
        self.swapchain()?.render_pass()
    }

    /// Command buffer of the frame in progress.
    pub fn current_command_buffer(&self) -> RhiResult<&CommandBuffer> {
        self.frame
            .ensure_started("get the current command buffer")?;
        Ok(&self.command_buffers[self.frame.frame_index()])
    }

    /// Frame slot of the frame in progress.
    pub fn frame_index(&self) -> RhiResult<usize> {
        self.frame.ensure_started("get the frame index")?;
        Ok(self.frame.frame_index())
    }

    #[inline]
    pub fn is_frame_in_progress(&self) -> bool {
        self.frame.is_in_progress()
    }

    /// Blocks until the GPU has finished all submitted work.
    pub fn wait_idle(&self) -> RhiResult<()> {
        self.device.wait_idle()
    }
}

fn allocate_frame_command_buffers(device: &Arc<Device>) -> RhiResult<Vec<CommandBuffer>> {
    let handles = device.allocate_command_buffers(MAX_FRAMES_IN_FLIGHT as u32)?;
    Ok(handles
        .into_iter()
        .map(|handle| CommandBuffer::from_handle(device.clone(), handle))
        .collect())
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            error!(
                "Failed to wait for device idle during renderer drop: {:?}",
                e
            );
        }

        self.free_command_buffers();
        self.swapchain = None;

        let outstanding = Arc::strong_count(self.device()) - 1;
        if outstanding > 0 {
            warn!(
                "{} device reference(s) outlive the renderer; GPU objects may leak",
                outstanding
            );
        }

        // SAFETY: each field is dropped exactly once, children before
        // parents, and none is used afterwards.
        unsafe {
            ManuallyDrop::drop(&mut self.surface);
            ManuallyDrop::drop(&mut self.device);
            ManuallyDrop::drop(&mut self.instance);
        }

        info!("Renderer destroyed");
    }
}
