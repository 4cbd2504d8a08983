//! Image views and depth attachments.
//!
//! - [`create_image_view`] builds a 2D single-mip view over an image
//! - [`DepthImage`] owns a depth image, its memory and its view
//! - [`DEPTH_FORMAT_CANDIDATES`] lists depth formats in preference order

use std::sync::Arc;

use ash::vk;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use tracing::{debug, error};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Depth formats in preference order: depth+stencil first, then depth only.
pub const DEPTH_FORMAT_CANDIDATES: &[vk::Format] = &[
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
    vk::Format::D32_SFLOAT,
];

/// Returns true if `format` carries a stencil component.
pub fn has_stencil_component(format: vk::Format) -> bool {
    matches!(
        format,
        vk::Format::D32_SFLOAT_S8_UINT | vk::Format::D24_UNORM_S8_UINT | vk::Format::D16_UNORM_S8_UINT
    )
}

/// Aspect mask of a depth attachment view for `format`.
pub fn depth_aspect_mask(format: vk::Format) -> vk::ImageAspectFlags {
    if has_stencil_component(format) {
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    } else {
        vk::ImageAspectFlags::DEPTH
    }
}

/// Creates a 2D view covering the first mip level and array layer.
pub fn create_image_view(
    device: &Device,
    image: vk::Image,
    format: vk::Format,
    aspect_mask: vk::ImageAspectFlags,
) -> RhiResult<vk::ImageView> {
    let view_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .subresource_range(
            vk::ImageSubresourceRange::default()
                .aspect_mask(aspect_mask)
                .base_mip_level(0)
                .level_count(1)
                .base_array_layer(0)
                .layer_count(1),
        );

    let view = unsafe { device.handle().create_image_view(&view_info, None)? };
    Ok(view)
}

/// Depth attachment: image, device-local memory and view.
///
/// All three are released together on drop.
pub struct DepthImage {
    device: Arc<Device>,
    image: vk::Image,
    image_view: vk::ImageView,
    allocation: Option<Allocation>,
    format: vk::Format,
    extent: vk::Extent2D,
}

impl DepthImage {
    /// Creates a depth attachment of the given extent and format.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero extent or if creation fails. Partially
    /// created objects are released before returning.
    pub fn new(device: Arc<Device>, extent: vk::Extent2D, format: vk::Format) -> RhiResult<Self> {
        if extent.width == 0 || extent.height == 0 {
            return Err(RhiError::InvalidHandle(
                "Depth image dimensions must be greater than 0".to_string(),
            ));
        }

        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = unsafe { device.handle().create_image(&image_info, None)? };

        // From here on, `depth` owns whatever has been created so far and
        // releases it if a later step fails.
        let mut depth = Self {
            device,
            image,
            image_view: vk::ImageView::null(),
            allocation: None,
            format,
            extent,
        };

        let requirements = unsafe {
            depth
                .device
                .handle()
                .get_image_memory_requirements(depth.image)
        };
        let allocation = depth.device.lock_allocator().allocate(&AllocationCreateDesc {
            name: "depth image",
            requirements,
            location: MemoryLocation::GpuOnly,
            linear: false,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        })?;

        unsafe {
            depth.device.handle().bind_image_memory(
                depth.image,
                allocation.memory(),
                allocation.offset(),
            )?;
        }
        depth.allocation = Some(allocation);

        depth.image_view =
            create_image_view(&depth.device, depth.image, format, depth_aspect_mask(format))?;

        debug!(
            "Created depth image: {}x{} ({:?})",
            extent.width, extent.height, format
        );

        Ok(depth)
    }

    #[inline]
    pub fn image(&self) -> vk::Image {
        self.image
    }

    #[inline]
    pub fn image_view(&self) -> vk::ImageView {
        self.image_view
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for DepthImage {
    fn drop(&mut self) {
        unsafe {
            if self.image_view != vk::ImageView::null() {
                self.device
                    .handle()
                    .destroy_image_view(self.image_view, None);
            }
            self.device.handle().destroy_image(self.image, None);
        }

        if let Some(allocation) = self.allocation.take()
            && let Err(e) = self.device.lock_allocator().free(allocation)
        {
            error!("Failed to free depth image allocation: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_candidates_prefer_stencil_formats() {
        assert_eq!(DEPTH_FORMAT_CANDIDATES[0], vk::Format::D32_SFLOAT_S8_UINT);
        assert_eq!(DEPTH_FORMAT_CANDIDATES[1], vk::Format::D24_UNORM_S8_UINT);
        assert_eq!(
            DEPTH_FORMAT_CANDIDATES.last(),
            Some(&vk::Format::D32_SFLOAT)
        );
    }

    #[test]
    fn test_depth_aspect_mask() {
        assert_eq!(
            depth_aspect_mask(vk::Format::D32_SFLOAT),
            vk::ImageAspectFlags::DEPTH
        );
        assert_eq!(
            depth_aspect_mask(vk::Format::D24_UNORM_S8_UINT),
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        );
    }

    #[test]
    fn test_has_stencil_component() {
        assert!(has_stencil_component(vk::Format::D32_SFLOAT_S8_UINT));
        assert!(!has_stencil_component(vk::Format::D32_SFLOAT));
        assert!(!has_stencil_component(vk::Format::B8G8R8A8_SRGB));
    }
}
