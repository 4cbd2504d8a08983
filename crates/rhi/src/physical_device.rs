//! Physical device (GPU) selection.
//!
//! A GPU is suitable when it has a graphics queue family, a family that can
//! present to the window surface, the swapchain extension, and at least one
//! surface format and present mode. Among suitable GPUs discrete ones win.

use std::ffi::CStr;

use ash::vk;
use tracing::{debug, info, warn};

use crate::error::RhiError;
use crate::swapchain::SwapchainSupportDetails;

/// Device extensions every selected GPU must expose.
pub const REQUIRED_DEVICE_EXTENSIONS: &[&CStr] = &[ash::khr::swapchain::NAME];

/// Queue family indices used by the renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    /// Family that supports graphics (and therefore transfer) operations.
    pub graphics_family: Option<u32>,
    /// Family that can present to the window surface.
    pub present_family: Option<u32>,
}

impl QueueFamilyIndices {
    /// Picks the first graphics family and the first presenting family.
    ///
    /// `supports_present` is asked about each family index in order until one
    /// answers true.
    pub fn from_properties(
        families: &[vk::QueueFamilyProperties],
        mut supports_present: impl FnMut(u32) -> bool,
    ) -> Self {
        let mut indices = Self::default();

        for (i, family) in families.iter().enumerate() {
            let i = i as u32;
            if family.queue_count == 0 {
                continue;
            }

            if indices.graphics_family.is_none()
                && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
            {
                indices.graphics_family = Some(i);
            }
            if indices.present_family.is_none() && supports_present(i) {
                indices.present_family = Some(i);
            }
            if indices.is_complete() {
                break;
            }
        }

        indices
    }

    /// True when both a graphics and a present family were found.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some() && self.present_family.is_some()
    }

    /// The distinct family indices, graphics first.
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families = Vec::with_capacity(2);
        if let Some(graphics) = self.graphics_family {
            families.push(graphics);
        }
        if let Some(present) = self.present_family
            && !families.contains(&present)
        {
            families.push(present);
        }
        families
    }
}

/// Information about the selected GPU.
#[derive(Clone)]
pub struct PhysicalDeviceInfo {
    /// Vulkan physical device handle.
    pub device: vk::PhysicalDevice,
    /// Device properties, including the limits used for buffer alignment.
    pub properties: vk::PhysicalDeviceProperties,
    /// Memory heaps and types.
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    /// Queue family indices for graphics and presentation.
    pub queue_families: QueueFamilyIndices,
}

impl PhysicalDeviceInfo {
    /// Returns the device name as a string.
    pub fn device_name(&self) -> &str {
        self.properties
            .device_name_as_c_str()
            .ok()
            .and_then(|name| name.to_str().ok())
            .unwrap_or("Unknown Device")
    }

    /// Returns a human-readable string for the device type.
    pub fn device_type_name(&self) -> &'static str {
        match self.properties.device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => "Discrete GPU",
            vk::PhysicalDeviceType::INTEGRATED_GPU => "Integrated GPU",
            vk::PhysicalDeviceType::VIRTUAL_GPU => "Virtual GPU",
            vk::PhysicalDeviceType::CPU => "CPU",
            _ => "Other",
        }
    }

    /// Returns the total device local memory in bytes.
    pub fn device_local_memory(&self) -> u64 {
        self.memory_properties
            .memory_heaps
            .iter()
            .take(self.memory_properties.memory_heap_count as usize)
            .filter(|heap| heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL))
            .map(|heap| heap.size)
            .sum()
    }
}

impl std::fmt::Debug for PhysicalDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicalDeviceInfo")
            .field("name", &self.device_name())
            .field("type", &self.device_type_name())
            .field("queue_families", &self.queue_families)
            .finish()
    }
}

/// Selects the most suitable physical device for rendering to `surface`.
///
/// # Errors
///
/// Returns [`RhiError::NoSuitableGpu`] if no GPU meets the requirements.
pub fn select_physical_device(
    instance: &ash::Instance,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> Result<PhysicalDeviceInfo, RhiError> {
    let devices = unsafe { instance.enumerate_physical_devices()? };
    if devices.is_empty() {
        warn!("No Vulkan-capable GPUs found");
        return Err(RhiError::NoSuitableGpu);
    }
    info!("Found {} GPU(s)", devices.len());

    let selected = devices
        .into_iter()
        .filter_map(|device| check_device_suitability(instance, device, surface, surface_loader))
        .map(|info| {
            let score = rate_device(info.properties.device_type, info.device_local_memory());
            debug!(
                "GPU '{}' ({}) - score {}",
                info.device_name(),
                info.device_type_name(),
                score
            );
            (info, score)
        })
        .max_by_key(|(_, score)| *score)
        .map(|(info, _)| info)
        .ok_or(RhiError::NoSuitableGpu)?;

    info!(
        "Selected GPU: '{}' ({})",
        selected.device_name(),
        selected.device_type_name()
    );
    Ok(selected)
}

fn check_device_suitability(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> Option<PhysicalDeviceInfo> {
    let properties = unsafe { instance.get_physical_device_properties(device) };
    let memory_properties = unsafe { instance.get_physical_device_memory_properties(device) };
    let name = properties
        .device_name_as_c_str()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let families = unsafe { instance.get_physical_device_queue_family_properties(device) };
    let queue_families = QueueFamilyIndices::from_properties(&families, |i| unsafe {
        surface_loader
            .get_physical_device_surface_support(device, i, surface)
            .unwrap_or(false)
    });
    if !queue_families.is_complete() {
        debug!("GPU '{}' skipped: missing graphics or present queue", name);
        return None;
    }

    let extensions = unsafe {
        instance
            .enumerate_device_extension_properties(device)
            .unwrap_or_default()
    };
    let available: Vec<&CStr> = extensions
        .iter()
        .filter_map(|ext| ext.extension_name_as_c_str().ok())
        .collect();
    if !supports_extensions(&available, REQUIRED_DEVICE_EXTENSIONS) {
        debug!("GPU '{}' skipped: swapchain extension missing", name);
        return None;
    }

    match SwapchainSupportDetails::query(device, surface, surface_loader) {
        Ok(support) if support.is_adequate() => {}
        _ => {
            debug!("GPU '{}' skipped: inadequate surface support", name);
            return None;
        }
    }

    Some(PhysicalDeviceInfo {
        device,
        properties,
        memory_properties,
        queue_families,
    })
}

fn supports_extensions(available: &[&CStr], required: &[&CStr]) -> bool {
    required.iter().all(|req| available.contains(req))
}

/// Higher is better. Device type dominates, memory breaks ties.
fn rate_device(device_type: vk::PhysicalDeviceType, device_local_memory: u64) -> u64 {
    let type_score = match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 100_000,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 10_000,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 1_000,
        vk::PhysicalDeviceType::CPU => 100,
        _ => 1,
    };
    let vram_mb = (device_local_memory / (1024 * 1024)).min(65_535);
    type_score * 100_000 + vram_mb
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags, count: u32) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: count,
            ..Default::default()
        }
    }

    #[test]
    fn test_queue_family_indices_default() {
        let indices = QueueFamilyIndices::default();
        assert!(indices.graphics_family.is_none());
        assert!(indices.present_family.is_none());
        assert!(!indices.is_complete());
    }

    #[test]
    fn test_same_family_for_graphics_and_present() {
        let families = [family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER, 1)];
        let indices = QueueFamilyIndices::from_properties(&families, |_| true);
        assert_eq!(indices.graphics_family, Some(0));
        assert_eq!(indices.present_family, Some(0));
        assert_eq!(indices.unique_families(), vec![0]);
    }

    #[test]
    fn test_separate_present_family() {
        let families = [
            family(vk::QueueFlags::GRAPHICS, 1),
            family(vk::QueueFlags::TRANSFER, 1),
        ];
        let indices = QueueFamilyIndices::from_properties(&families, |i| i == 1);
        assert_eq!(indices.graphics_family, Some(0));
        assert_eq!(indices.present_family, Some(1));
        assert_eq!(indices.unique_families(), vec![0, 1]);
    }

    #[test]
    fn test_empty_families_are_skipped() {
        let families = [
            family(vk::QueueFlags::GRAPHICS, 0),
            family(vk::QueueFlags::GRAPHICS, 2),
        ];
        let indices = QueueFamilyIndices::from_properties(&families, |_| true);
        assert_eq!(indices.graphics_family, Some(1));
        assert_eq!(indices.present_family, Some(1));
    }

    #[test]
    fn test_no_present_support_is_incomplete() {
        let families = [family(vk::QueueFlags::GRAPHICS, 1)];
        let indices = QueueFamilyIndices::from_properties(&families, |_| false);
        assert!(!indices.is_complete());
    }

    #[test]
    fn test_extension_check() {
        let available = [ash::khr::swapchain::NAME, c"VK_KHR_maintenance1"];
        assert!(supports_extensions(&available, REQUIRED_DEVICE_EXTENSIONS));
        assert!(!supports_extensions(
            &[c"VK_KHR_maintenance1"],
            REQUIRED_DEVICE_EXTENSIONS
        ));
    }

    #[test]
    fn test_discrete_preferred_over_integrated() {
        let discrete = rate_device(vk::PhysicalDeviceType::DISCRETE_GPU, 2 << 30);
        let integrated = rate_device(vk::PhysicalDeviceType::INTEGRATED_GPU, 64 << 30);
        assert!(discrete > integrated);
    }

    #[test]
    fn test_memory_breaks_ties() {
        let small = rate_device(vk::PhysicalDeviceType::DISCRETE_GPU, 4 << 30);
        let large = rate_device(vk::PhysicalDeviceType::DISCRETE_GPU, 8 << 30);
        assert!(large > small);
    }
}
