//! Vulkan logical device, command pool and queue access.
//!
//! The [`Device`] is the context every other GPU object hangs off. It owns:
//! - the logical device and its graphics/present queues
//! - the gpu-allocator instance used for all buffer and image memory
//! - one resettable command pool on the graphics family, used both for the
//!   per-frame command buffers and for one-shot transfer commands
//!
//! It is created once and shared through `Arc`. Every dependent object keeps an
//! `Arc<Device>`, so the device is destroyed last.
//!
//! # Example
//!
//! ```no_run
//! use renderer_rhi::instance::Instance;
//! use renderer_rhi::physical_device::select_physical_device;
//! use renderer_rhi::device::Device;
//! use ash::vk;
//!
//! let instance = Instance::new(c"Demo", &[], false).expect("Failed to create instance");
//! let surface: vk::SurfaceKHR = vk::SurfaceKHR::null(); // placeholder
//! let surface_loader = ash::khr::surface::Instance::new(instance.entry(), instance.handle());
//!
//! let physical_device_info = select_physical_device(instance.handle(), surface, &surface_loader)
//!     .expect("No suitable GPU found");
//! let device = Device::new(&instance, &physical_device_info)
//!     .expect("Failed to create logical device");
//!
//! let graphics_queue = device.graphics_queue();
//! ```

use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex, MutexGuard};

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use tracing::{debug, error, info};

use crate::command::CommandBuffer;
use crate::error::{RhiError, RhiResult};
use crate::instance::Instance;
use crate::physical_device::{PhysicalDeviceInfo, QueueFamilyIndices, REQUIRED_DEVICE_EXTENSIONS};

/// Vulkan logical device wrapper.
///
/// # Thread Safety
///
/// The renderer drives the device from a single thread. The allocator and
/// the command pool are still behind a `Mutex` so that `Arc<Device>` can be
/// shared safely.
pub struct Device {
    /// Vulkan logical device handle.
    device: ash::Device,
    /// Instance function table, used for format queries.
    instance: ash::Instance,
    /// Physical device handle.
    physical_device: vk::PhysicalDevice,
    /// Properties of the physical device, including limits.
    properties: vk::PhysicalDeviceProperties,
    /// GPU memory allocator. Dropped before the device is destroyed.
    allocator: ManuallyDrop<Mutex<Allocator>>,
    /// Command pool on the graphics queue family.
    command_pool: Mutex<vk::CommandPool>,
    /// Graphics queue handle.
    graphics_queue: vk::Queue,
    /// Presentation queue handle.
    present_queue: vk::Queue,
    /// Queue family indices.
    queue_families: QueueFamilyIndices,
}

impl Device {
    /// Creates the logical device, its queues, the allocator and the command pool.
    ///
    /// # Errors
    ///
    /// Returns an error if device creation, allocator initialization or
    /// command pool creation fails.
    pub fn new(
        instance: &Instance,
        physical_device_info: &PhysicalDeviceInfo,
    ) -> Result<Arc<Self>, RhiError> {
        let queue_families = physical_device_info.queue_families;
        let (Some(graphics_family), Some(present_family)) =
            (queue_families.graphics_family, queue_families.present_family)
        else {
            return Err(RhiError::NoSuitableGpu);
        };

        let unique_families = queue_families.unique_families();
        let queue_priorities = [1.0f32];
        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
            })
            .collect();
        debug!(
            "Creating {} queue(s) for families: {:?}",
            queue_create_infos.len(),
            unique_families
        );

        let extension_names: Vec<*const std::ffi::c_char> = REQUIRED_DEVICE_EXTENSIONS
            .iter()
            .map(|ext| ext.as_ptr())
            .collect();
        let features = vk::PhysicalDeviceFeatures::default();

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names)
            .enabled_features(&features);

        let device = unsafe {
            instance
                .handle()
                .create_device(physical_device_info.device, &create_info, None)?
        };
        info!(
            "Logical device created on '{}'",
            physical_device_info.device_name()
        );

        let graphics_queue = unsafe { device.get_device_queue(graphics_family, 0) };
        let present_queue = unsafe { device.get_device_queue(present_family, 0) };

        let allocator = match Allocator::new(&AllocatorCreateDesc {
            instance: instance.handle().clone(),
            device: device.clone(),
            physical_device: physical_device_info.device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        }) {
            Ok(allocator) => allocator,
            Err(e) => {
                unsafe { device.destroy_device(None) };
                return Err(e.into());
            }
        };

        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(graphics_family)
            .flags(
                vk::CommandPoolCreateFlags::TRANSIENT
                    | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            );
        let command_pool = match unsafe { device.create_command_pool(&pool_info, None) } {
            Ok(pool) => pool,
            Err(e) => {
                drop(allocator);
                unsafe { device.destroy_device(None) };
                return Err(e.into());
            }
        };
        debug!("Command pool created for family {}", graphics_family);

        Ok(Arc::new(Self {
            device,
            instance: instance.handle().clone(),
            physical_device: physical_device_info.device,
            properties: physical_device_info.properties,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            command_pool: Mutex::new(command_pool),
            graphics_queue,
            present_queue,
            queue_families,
        }))
    }

    /// Returns the raw ash device.
    #[inline]
    pub fn handle(&self) -> &ash::Device {
        &self.device
    }

    #[inline]
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    #[inline]
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    #[inline]
    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    #[inline]
    pub fn queue_families(&self) -> &QueueFamilyIndices {
        &self.queue_families
    }

    /// Device limits, e.g. `min_uniform_buffer_offset_alignment` and
    /// `non_coherent_atom_size`.
    #[inline]
    pub fn limits(&self) -> &vk::PhysicalDeviceLimits {
        &self.properties.limits
    }

    /// Locks the allocator, recovering from a poisoned lock.
    pub(crate) fn lock_allocator(&self) -> MutexGuard<'_, Allocator> {
        self.allocator
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_command_pool(&self) -> MutexGuard<'_, vk::CommandPool> {
        self.command_pool
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Blocks until the device has finished all submitted work.
    pub fn wait_idle(&self) -> Result<(), RhiError> {
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }

    /// Submits work to the graphics queue.
    ///
    /// # Safety
    ///
    /// All handles referenced by `submit_infos` must be valid, and the command
    /// buffers must be in the executable state.
    pub unsafe fn submit_graphics(
        &self,
        submit_infos: &[vk::SubmitInfo],
        fence: vk::Fence,
    ) -> Result<(), RhiError> {
        unsafe {
            self.device
                .queue_submit(self.graphics_queue, submit_infos, fence)?;
        }
        Ok(())
    }

    /// Allocates primary command buffers from the device command pool.
    pub fn allocate_command_buffers(&self, count: u32) -> RhiResult<Vec<vk::CommandBuffer>> {
        let pool = self.lock_command_pool();
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(*pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);
        let buffers = unsafe { self.device.allocate_command_buffers(&alloc_info)? };
        debug!("Allocated {} command buffer(s)", count);
        Ok(buffers)
    }

    /// Returns command buffers to the device command pool.
    ///
    /// The buffers must not be pending execution.
    pub fn free_command_buffers(&self, buffers: &[vk::CommandBuffer]) {
        if buffers.is_empty() {
            return;
        }
        let pool = self.lock_command_pool();
        unsafe { self.device.free_command_buffers(*pool, buffers) };
        debug!("Freed {} command buffer(s)", buffers.len());
    }

    /// Allocates a command buffer and begins one-time-submit recording.
    pub fn begin_single_time_commands(self: &Arc<Self>) -> RhiResult<CommandBuffer> {
        let handle = self
            .allocate_command_buffers(1)?
            .pop()
            .ok_or_else(|| RhiError::InvalidHandle("empty command buffer allocation".into()))?;
        let command_buffer = CommandBuffer::from_handle(self.clone(), handle);
        if let Err(e) = command_buffer.begin() {
            self.free_command_buffers(&[handle]);
            return Err(e);
        }
        Ok(command_buffer)
    }

    /// Ends recording, submits to the graphics queue, waits for the queue to
    /// go idle and frees the command buffer.
    pub fn end_single_time_commands(&self, command_buffer: CommandBuffer) -> RhiResult<()> {
        let handle = command_buffer.handle();
        let result = command_buffer.end().and_then(|()| {
            let command_buffers = [handle];
            let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
            unsafe {
                self.submit_graphics(&[submit_info], vk::Fence::null())?;
                self.device.queue_wait_idle(self.graphics_queue)?;
            }
            Ok(())
        });
        self.free_command_buffers(&[handle]);
        result
    }

    /// Records commands with `record` into a one-shot command buffer and
    /// executes them synchronously.
    pub fn execute_single_time_commands<F>(self: &Arc<Self>, record: F) -> RhiResult<()>
    where
        F: FnOnce(&CommandBuffer),
    {
        let command_buffer = self.begin_single_time_commands()?;
        record(&command_buffer);
        self.end_single_time_commands(command_buffer)
    }

    /// Copies `size` bytes from the start of `src` to the start of `dst` and
    /// waits for the copy to finish.
    pub fn copy_buffer(
        self: &Arc<Self>,
        src: vk::Buffer,
        dst: vk::Buffer,
        size: vk::DeviceSize,
    ) -> RhiResult<()> {
        let region = vk::BufferCopy::default().size(size);
        self.execute_single_time_commands(|cmd| cmd.copy_buffer(src, dst, &[region]))?;
        debug!("Copied {} bytes between buffers", size);
        Ok(())
    }

    /// Returns the first candidate whose `tiling` features contain `features`.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::UnsupportedFormat`] when no candidate qualifies.
    pub fn find_supported_format(
        &self,
        candidates: &[vk::Format],
        tiling: vk::ImageTiling,
        features: vk::FormatFeatureFlags,
    ) -> RhiResult<vk::Format> {
        select_supported_format(candidates, tiling, features, |format| unsafe {
            self.instance
                .get_physical_device_format_properties(self.physical_device, format)
        })
    }
}

/// Pure format selection over a properties lookup.
pub fn select_supported_format(
    candidates: &[vk::Format],
    tiling: vk::ImageTiling,
    features: vk::FormatFeatureFlags,
    mut properties: impl FnMut(vk::Format) -> vk::FormatProperties,
) -> RhiResult<vk::Format> {
    candidates
        .iter()
        .copied()
        .find(|&format| {
            let props = properties(format);
            match tiling {
                vk::ImageTiling::LINEAR => props.linear_tiling_features.contains(features),
                vk::ImageTiling::OPTIMAL => props.optimal_tiling_features.contains(features),
                _ => false,
            }
        })
        .ok_or_else(|| RhiError::UnsupportedFormat(candidates.to_vec()))
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                error!("Failed to wait for device idle during drop: {:?}", e);
            }

            let pool = *self.lock_command_pool();
            self.device.destroy_command_pool(pool, None);

            // The allocator frees its memory blocks through the device.
            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_device(None);
        }
        info!("Logical device destroyed");
    }
}

// Safety: the ash function tables are plain data, handles are Copy, and the
// allocator and command pool are guarded by a Mutex.
unsafe impl Send for Device {}
unsafe impl Sync for Device {}
