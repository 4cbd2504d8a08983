//! Swapchain management.
//!
//! The [`Swapchain`] owns everything whose lifetime follows the presentable
//! images:
//! - the VkSwapchainKHR and its image views
//! - one depth image per swapchain image
//! - the render pass and one framebuffer per image
//! - the per-frame-slot synchronization objects
//!
//! Frame slots (at most [`MAX_FRAMES_IN_FLIGHT`]) and swapchain images (as
//! many as the surface hands out) are indexed independently. Acquisition
//! indexes by frame slot, presentation by the acquired image index, and
//! [`ImagesInFlight`] remembers which slot last rendered to each image.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use renderer_rhi::device::Device;
//! use renderer_rhi::instance::Instance;
//! use renderer_rhi::swapchain::{AcquireOutcome, Swapchain};
//! use renderer_rhi::vk;
//!
//! # fn example(
//! #     instance: &Instance,
//! #     device: Arc<Device>,
//! #     surface: vk::SurfaceKHR,
//! #     cmd: vk::CommandBuffer,
//! # ) -> Result<(), renderer_rhi::RhiError> {
//! let extent = vk::Extent2D { width: 800, height: 600 };
//! let mut swapchain = Swapchain::new(instance, device, surface, extent, None)?;
//!
//! if let AcquireOutcome::Image { index, .. } = swapchain.acquire_next_image()? {
//!     // ... record `cmd` against swapchain.framebuffer(index) ...
//!     let status = swapchain.submit_and_present(cmd, index)?;
//!     if status.needs_recreation() {
//!         // rebuild from `swapchain`
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info, warn};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::image::{DEPTH_FORMAT_CANDIDATES, DepthImage, create_image_view};
use crate::instance::Instance;
use crate::render_pass::RenderPass;
use crate::sync::{FrameSync, MAX_FRAMES_IN_FLIGHT};

/// Swapchain support details for a physical device and surface.
#[derive(Debug, Clone)]
pub struct SwapchainSupportDetails {
    /// Surface capabilities (image count, extent limits, transforms).
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats.
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes.
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupportDetails {
    /// Queries swapchain support for a physical device and surface.
    pub fn query(
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
    ) -> Result<Self, RhiError> {
        let capabilities = unsafe {
            surface_loader.get_physical_device_surface_capabilities(physical_device, surface)?
        };

        let formats = unsafe {
            surface_loader.get_physical_device_surface_formats(physical_device, surface)?
        };

        let present_modes = unsafe {
            surface_loader.get_physical_device_surface_present_modes(physical_device, surface)?
        };

        Ok(Self {
            capabilities,
            formats,
            present_modes,
        })
    }

    /// True if at least one format and one present mode are available.
    #[inline]
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// The color and depth formats a swapchain settled on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapchainFormats {
    pub color: vk::Format,
    pub depth: vk::Format,
}

impl SwapchainFormats {
    /// Render passes and pipelines built for `self` can be reused with
    /// `other` only if both formats match.
    #[inline]
    pub fn is_compatible(&self, other: &SwapchainFormats) -> bool {
        self == other
    }
}

/// Result of [`Swapchain::acquire_next_image`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image was acquired. It may be usable but suboptimal.
    Image { index: u32, suboptimal: bool },
    /// The surface changed; no image was acquired.
    OutOfDate,
}

impl AcquireOutcome {
    /// Classifies the raw result of `vkAcquireNextImageKHR`.
    ///
    /// Out-of-date is a regular outcome. Every other failure is an error.
    pub fn from_acquire(result: Result<(u32, bool), vk::Result>) -> RhiResult<Self> {
        match result {
            Ok((index, suboptimal)) => Ok(Self::Image { index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(Self::OutOfDate),
            Err(e) => Err(e.into()),
        }
    }
}

/// Surface status reported by presentation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceStatus {
    Optimal,
    Suboptimal,
    OutOfDate,
}

impl SurfaceStatus {
    /// Classifies the raw result of `vkQueuePresentKHR`.
    pub fn from_present(result: Result<bool, vk::Result>) -> RhiResult<Self> {
        match result {
            Ok(false) => Ok(Self::Optimal),
            Ok(true) => Ok(Self::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(Self::OutOfDate),
            Err(e) => Err(e.into()),
        }
    }

    /// True when the swapchain should be rebuilt before the next frame.
    #[inline]
    pub fn needs_recreation(self) -> bool {
        !matches!(self, Self::Optimal)
    }
}

/// Which frame slot last submitted work rendering to each swapchain image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImagesInFlight {
    owners: Vec<Option<usize>>,
}

impl ImagesInFlight {
    /// Creates an empty table for `image_count` images.
    pub fn new(image_count: usize) -> Self {
        Self {
            owners: vec![None; image_count],
        }
    }

    /// Records `frame_slot` as the new owner of `image_index` and returns
    /// the previous owner, whose fence must be waited on before reuse.
    pub fn claim(&mut self, image_index: usize, frame_slot: usize) -> Option<usize> {
        self.owners[image_index].replace(frame_slot)
    }

    /// Current owner of `image_index`.
    #[inline]
    pub fn owner(&self, image_index: usize) -> Option<usize> {
        self.owners[image_index]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

/// Frame slot following `current`.
#[inline]
pub fn next_frame_slot(current: usize) -> usize {
    (current + 1) % MAX_FRAMES_IN_FLIGHT
}

/// Vulkan swapchain with its attachments and frame synchronization.
///
/// Objects are destroyed in dependency order on drop: sync objects,
/// framebuffers, depth images, image views, render pass, swapchain.
pub struct Swapchain {
    device: Arc<Device>,
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    depth_images: Vec<DepthImage>,
    render_pass: Option<RenderPass>,
    framebuffers: Vec<vk::Framebuffer>,
    frame_syncs: Vec<FrameSync>,
    images_in_flight: ImagesInFlight,
    formats: SwapchainFormats,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
    current_frame: usize,
}

impl Swapchain {
    /// Creates a swapchain for `surface`.
    ///
    /// # Arguments
    ///
    /// * `instance` - The Vulkan instance the surface belongs to
    /// * `device` - The logical device
    /// * `surface` - The window surface
    /// * `window_extent` - Drawable size of the window in pixels
    /// * `previous` - Swapchain being replaced. Its handle is passed as the
    ///   old swapchain, and it is destroyed once the new one is built.
    ///
    /// # Errors
    ///
    /// Any failure along the init sequence is returned. Objects created so
    /// far are released.
    pub fn new(
        instance: &Instance,
        device: Arc<Device>,
        surface: vk::SurfaceKHR,
        window_extent: vk::Extent2D,
        previous: Option<Swapchain>,
    ) -> RhiResult<Self> {
        let swapchain_loader = ash::khr::swapchain::Device::new(instance.handle(), device.handle());
        let surface_loader = ash::khr::surface::Instance::new(instance.entry(), instance.handle());

        let support =
            SwapchainSupportDetails::query(device.physical_device(), surface, &surface_loader)?;
        if !support.is_adequate() {
            return Err(RhiError::SwapchainError(
                "Inadequate swapchain support (no formats or present modes)".to_string(),
            ));
        }

        let surface_format = choose_surface_format(&support.formats);
        let present_mode = choose_present_mode(&support.present_modes);
        let extent = choose_extent(&support.capabilities, window_extent);
        let image_count = determine_image_count(&support.capabilities);

        let (Some(graphics_family), Some(present_family)) = (
            device.queue_families().graphics_family,
            device.queue_families().present_family,
        ) else {
            return Err(RhiError::SwapchainError(
                "Device has no graphics or present queue family".to_string(),
            ));
        };
        let families = [graphics_family, present_family];
        let (sharing_mode, queue_family_indices) = if graphics_family != present_family {
            (vk::SharingMode::CONCURRENT, &families[..])
        } else {
            (vk::SharingMode::EXCLUSIVE, &[][..])
        };

        let old_swapchain = previous
            .as_ref()
            .map_or(vk::SwapchainKHR::null(), |old| old.swapchain);

        info!(
            "Creating swapchain: {}x{}, format {:?}, present mode {:?}, {} images{}",
            extent.width,
            extent.height,
            surface_format.format,
            present_mode,
            image_count,
            if previous.is_some() { " (recreated)" } else { "" }
        );

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(queue_family_indices)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = unsafe { swapchain_loader.create_swapchain(&create_info, None)? };

        // `this` owns every object created from here on, so an early return
        // releases them through Drop.
        let mut this = Self {
            device,
            swapchain_loader,
            swapchain,
            images: Vec::new(),
            image_views: Vec::new(),
            depth_images: Vec::new(),
            render_pass: None,
            framebuffers: Vec::new(),
            frame_syncs: Vec::new(),
            images_in_flight: ImagesInFlight::new(0),
            formats: SwapchainFormats {
                color: surface_format.format,
                depth: vk::Format::UNDEFINED,
            },
            extent,
            present_mode,
            current_frame: 0,
        };

        this.images = unsafe { this.swapchain_loader.get_swapchain_images(swapchain)? };
        this.create_image_views()?;
        this.create_depth_resources()?;
        this.render_pass = Some(RenderPass::new(
            this.device.clone(),
            this.formats.color,
            this.formats.depth,
        )?);
        this.create_framebuffers()?;
        this.frame_syncs = FrameSync::create_slots(&this.device)?;
        this.images_in_flight = ImagesInFlight::new(this.images.len());

        // The predecessor has been retired by the driver.
        drop(previous);

        info!("Swapchain ready with {} images", this.images.len());
        Ok(this)
    }

    fn create_image_views(&mut self) -> RhiResult<()> {
        for &image in &self.images {
            let view = create_image_view(
                &self.device,
                image,
                self.formats.color,
                vk::ImageAspectFlags::COLOR,
            )?;
            self.image_views.push(view);
        }
        Ok(())
    }

    fn create_depth_resources(&mut self) -> RhiResult<()> {
        let depth_format = self.device.find_supported_format(
            DEPTH_FORMAT_CANDIDATES,
            vk::ImageTiling::OPTIMAL,
            vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
        )?;
        self.formats.depth = depth_format;

        for _ in 0..self.images.len() {
            let depth = DepthImage::new(self.device.clone(), self.extent, depth_format)?;
            self.depth_images.push(depth);
        }
        debug!(
            "Created {} depth images ({:?})",
            self.depth_images.len(),
            depth_format
        );
        Ok(())
    }

    fn create_framebuffers(&mut self) -> RhiResult<()> {
        let render_pass = self.render_pass()?;
        for (view, depth) in self.image_views.iter().zip(&self.depth_images) {
            let attachments = [*view, depth.image_view()];
            let create_info = vk::FramebufferCreateInfo::default()
                .render_pass(render_pass)
                .attachments(&attachments)
                .width(self.extent.width)
                .height(self.extent.height)
                .layers(1);

            let framebuffer = unsafe { self.device.handle().create_framebuffer(&create_info, None)? };
            self.framebuffers.push(framebuffer);
        }
        Ok(())
    }

    // =========================================================================
    // Frame protocol
    // =========================================================================

    /// Waits for the current frame slot to retire, then acquires the next
    /// image.
    ///
    /// Both waits are unbounded. Out-of-date and suboptimal surfaces are
    /// reported, not treated as errors.
    pub fn acquire_next_image(&self) -> RhiResult<AcquireOutcome> {
        let sync = &self.frame_syncs[self.current_frame];
        sync.in_flight_fence().wait(u64::MAX)?;

        let result = unsafe {
            self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                sync.image_available(),
                vk::Fence::null(),
            )
        };
        AcquireOutcome::from_acquire(result)
    }

    /// Submits `command_buffer` for the current frame slot and presents
    /// `image_index`.
    ///
    /// If another slot still renders to the image, its fence is waited on
    /// first. The frame slot advances even when presentation reports an
    /// out-of-date surface.
    pub fn submit_and_present(
        &mut self,
        command_buffer: vk::CommandBuffer,
        image_index: u32,
    ) -> RhiResult<SurfaceStatus> {
        let index = image_index as usize;
        if index >= self.images.len() {
            return Err(RhiError::SwapchainError(format!(
                "Image index {} out of range ({} images)",
                image_index,
                self.images.len()
            )));
        }

        if let Some(owner) = self.images_in_flight.claim(index, self.current_frame) {
            self.frame_syncs[owner].in_flight_fence().wait(u64::MAX)?;
        }

        let sync = &self.frame_syncs[self.current_frame];
        let wait_semaphores = [sync.image_available()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_buffer];
        let signal_semaphores = [sync.render_finished()];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        sync.in_flight_fence().reset()?;
        unsafe {
            self.device
                .submit_graphics(&[submit_info], sync.in_flight_fence().handle())?;
        }

        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&signal_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe {
            self.swapchain_loader
                .queue_present(self.device.present_queue(), &present_info)
        };

        self.current_frame = next_frame_slot(self.current_frame);
        SurfaceStatus::from_present(result)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    #[inline]
    pub fn formats(&self) -> SwapchainFormats {
        self.formats
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.extent.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.extent.height
    }

    /// Width divided by height of the swapchain images.
    #[inline]
    pub fn extent_aspect_ratio(&self) -> f32 {
        self.extent.width as f32 / self.extent.height as f32
    }

    #[inline]
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    #[inline]
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    #[inline]
    pub fn image_view(&self, index: usize) -> vk::ImageView {
        self.image_views[index]
    }

    #[inline]
    pub fn framebuffer(&self, index: usize) -> vk::Framebuffer {
        self.framebuffers[index]
    }

    /// Frame slot used by the next acquire.
    #[inline]
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// The render pass all framebuffers were built against.
    pub fn render_pass(&self) -> RhiResult<vk::RenderPass> {
        self.render_pass
            .as_ref()
            .map(RenderPass::handle)
            .ok_or_else(|| RhiError::InvalidHandle("Swapchain has no render pass".to_string()))
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        let device = self.device.handle();

        self.frame_syncs.clear();
        for framebuffer in self.framebuffers.drain(..) {
            unsafe { device.destroy_framebuffer(framebuffer, None) };
        }
        self.depth_images.clear();
        for view in self.image_views.drain(..) {
            unsafe { device.destroy_image_view(view, None) };
        }
        self.render_pass = None;

        unsafe {
            self.swapchain_loader
                .destroy_swapchain(self.swapchain, None);
        }

        info!(
            "Swapchain destroyed (was {}x{}, {} images)",
            self.extent.width,
            self.extent.height,
            self.images.len()
        );
    }
}

/// Prefers `B8G8R8A8_SRGB` with `SRGB_NONLINEAR`, else the first format.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    let preferred = formats.iter().find(|f| {
        f.format == vk::Format::B8G8R8A8_SRGB && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
    });

    match preferred {
        Some(&format) => format,
        None => {
            let fallback = formats.first().copied().unwrap_or_default();
            warn!("Using first available surface format: {:?}", fallback.format);
            fallback
        }
    }
}

/// Prefers `MAILBOX`, else `FIFO`, which is always available.
pub fn choose_present_mode(present_modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if present_modes.contains(&vk::PresentModeKHR::MAILBOX) {
        debug!("Selected MAILBOX present mode");
        return vk::PresentModeKHR::MAILBOX;
    }

    debug!("Selected FIFO present mode (vsync)");
    vk::PresentModeKHR::FIFO
}

/// Uses the surface's fixed extent if it reports one, else clamps the
/// window extent to the surface limits.
pub fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    window_extent: vk::Extent2D,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    vk::Extent2D {
        width: window_extent.width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: window_extent.height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// One more than the minimum, capped by the maximum (0 means unlimited).
pub fn determine_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let preferred = capabilities.min_image_count + 1;

    if capabilities.max_image_count > 0 {
        preferred.min(capabilities.max_image_count)
    } else {
        preferred
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface_format(format: vk::Format) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }
    }

    #[test]
    fn test_choose_surface_format_prefers_srgb() {
        let formats = vec![
            surface_format(vk::Format::R8G8B8A8_UNORM),
            surface_format(vk::Format::B8G8R8A8_SRGB),
            surface_format(vk::Format::B8G8R8A8_UNORM),
        ];

        let selected = choose_surface_format(&formats);
        assert_eq!(selected.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(selected.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn test_choose_surface_format_falls_back_to_first() {
        let formats = vec![
            surface_format(vk::Format::R8G8B8A8_UNORM),
            surface_format(vk::Format::B8G8R8A8_UNORM),
        ];

        let selected = choose_surface_format(&formats);
        assert_eq!(selected.format, vk::Format::R8G8B8A8_UNORM);
    }

    #[test]
    fn test_choose_present_mode_prefers_mailbox() {
        let modes = vec![
            vk::PresentModeKHR::FIFO,
            vk::PresentModeKHR::MAILBOX,
            vk::PresentModeKHR::IMMEDIATE,
        ];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn test_choose_present_mode_falls_back_to_fifo() {
        let modes = vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn test_choose_extent_uses_current() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: 800,
                height: 600,
            },
            ..Default::default()
        };

        let extent = choose_extent(
            &capabilities,
            vk::Extent2D {
                width: 1024,
                height: 768,
            },
        );
        assert_eq!(extent.width, 800);
        assert_eq!(extent.height, 600);
    }

    #[test]
    fn test_choose_extent_clamps_to_limits() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: 100,
                height: 100,
            },
            max_image_extent: vk::Extent2D {
                width: 2000,
                height: 2000,
            },
            ..Default::default()
        };

        let clamp = |width, height| choose_extent(&capabilities, vk::Extent2D { width, height });
        assert_eq!(clamp(3000, 3000), vk::Extent2D { width: 2000, height: 2000 });
        assert_eq!(clamp(50, 50), vk::Extent2D { width: 100, height: 100 });
        assert_eq!(clamp(800, 600), vk::Extent2D { width: 800, height: 600 });
    }

    #[test]
    fn test_determine_image_count() {
        let capped = vk::SurfaceCapabilitiesKHR {
            min_image_count: 1,
            max_image_count: 2,
            ..Default::default()
        };
        assert_eq!(determine_image_count(&capped), 2);

        let roomy = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 8,
            ..Default::default()
        };
        assert_eq!(determine_image_count(&roomy), 3);

        let unlimited = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 0,
            ..Default::default()
        };
        assert_eq!(determine_image_count(&unlimited), 3);
    }

    #[test]
    fn test_swapchain_support_details_is_adequate() {
        let adequate = SwapchainSupportDetails {
            capabilities: vk::SurfaceCapabilitiesKHR::default(),
            formats: vec![vk::SurfaceFormatKHR::default()],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };
        assert!(adequate.is_adequate());

        let no_modes = SwapchainSupportDetails {
            present_modes: vec![],
            ..adequate.clone()
        };
        assert!(!no_modes.is_adequate());

        let no_formats = SwapchainSupportDetails {
            formats: vec![],
            ..adequate
        };
        assert!(!no_formats.is_adequate());
    }

    #[test]
    fn test_formats_compatible_only_when_identical() {
        let old = SwapchainFormats {
            color: vk::Format::B8G8R8A8_SRGB,
            depth: vk::Format::D32_SFLOAT_S8_UINT,
        };
        assert!(old.is_compatible(&old));

        let other_depth = SwapchainFormats {
            depth: vk::Format::D32_SFLOAT,
            ..old
        };
        assert!(!old.is_compatible(&other_depth));

        let other_color = SwapchainFormats {
            color: vk::Format::B8G8R8A8_UNORM,
            ..old
        };
        assert!(!old.is_compatible(&other_color));
    }

    #[test]
    fn test_recreation_with_same_capabilities_keeps_formats() {
        let formats = vec![
            surface_format(vk::Format::B8G8R8A8_UNORM),
            surface_format(vk::Format::B8G8R8A8_SRGB),
        ];
        let pick = || SwapchainFormats {
            color: choose_surface_format(&formats).format,
            depth: vk::Format::D32_SFLOAT,
        };
        assert!(pick().is_compatible(&pick()));
    }

    #[test]
    fn test_acquire_outcome_classification() {
        assert_eq!(
            AcquireOutcome::from_acquire(Ok((1, false))).unwrap(),
            AcquireOutcome::Image {
                index: 1,
                suboptimal: false
            }
        );
        assert_eq!(
            AcquireOutcome::from_acquire(Ok((0, true))).unwrap(),
            AcquireOutcome::Image {
                index: 0,
                suboptimal: true
            }
        );
        assert_eq!(
            AcquireOutcome::from_acquire(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).unwrap(),
            AcquireOutcome::OutOfDate
        );
        assert!(matches!(
            AcquireOutcome::from_acquire(Err(vk::Result::ERROR_DEVICE_LOST)),
            Err(RhiError::VulkanError(vk::Result::ERROR_DEVICE_LOST))
        ));
    }

    #[test]
    fn test_surface_status_classification() {
        assert_eq!(
            SurfaceStatus::from_present(Ok(false)).unwrap(),
            SurfaceStatus::Optimal
        );
        assert_eq!(
            SurfaceStatus::from_present(Ok(true)).unwrap(),
            SurfaceStatus::Suboptimal
        );
        assert_eq!(
            SurfaceStatus::from_present(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).unwrap(),
            SurfaceStatus::OutOfDate
        );
        assert!(SurfaceStatus::from_present(Err(vk::Result::ERROR_SURFACE_LOST_KHR)).is_err());

        assert!(!SurfaceStatus::Optimal.needs_recreation());
        assert!(SurfaceStatus::Suboptimal.needs_recreation());
        assert!(SurfaceStatus::OutOfDate.needs_recreation());
    }

    #[test]
    fn test_images_in_flight_tracks_owners() {
        let mut table = ImagesInFlight::new(3);
        assert_eq!(table.len(), 3);
        assert_eq!(table.owner(2), None);

        assert_eq!(table.claim(2, 0), None);
        assert_eq!(table.owner(2), Some(0));

        // Three images, two slots: slot 1 reuses image 2 while slot 0 owns it.
        assert_eq!(table.claim(2, 1), Some(0));
        assert_eq!(table.owner(2), Some(1));
        assert_eq!(table.owner(0), None);
    }

    #[test]
    fn test_frame_slot_advances_round_robin() {
        assert_eq!(next_frame_slot(0), 1);
        assert_eq!(next_frame_slot(1), 0);

        let mut slot = 0;
        for _ in 0..5 {
            slot = next_frame_slot(slot);
            assert!(slot < MAX_FRAMES_IN_FLIGHT);
        }
        assert_eq!(slot, 1);
    }
}
