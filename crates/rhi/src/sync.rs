//! Synchronization primitives for the in-flight frame protocol.
//!
//! - [`Semaphore`] orders GPU work between queue operations
//! - [`Fence`] lets the host wait for submitted GPU work
//! - [`FrameSync`] bundles the objects belonging to one frame slot
//!
//! # Frame slot protocol
//!
//! ```text
//! 1. Wait for the slot's in-flight fence (GPU finished the last use of this slot)
//! 2. Acquire a swapchain image, signalling image_available
//! 3. If another slot still owns that image, wait on its fence
//! 4. Reset the slot's fence and submit:
//!    - wait on image_available
//!    - signal render_finished
//!    - signal the slot's fence on completion
//! 5. Present, waiting on render_finished
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Number of frames the CPU may record ahead of the GPU.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Vulkan semaphore wrapper, destroyed on drop.
pub struct Semaphore {
    device: Arc<Device>,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Creates an unsignaled binary semaphore.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::default();
        let semaphore = unsafe { device.handle().create_semaphore(&create_info, None)? };

        Ok(Self { device, semaphore })
    }

    #[inline]
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_semaphore(self.semaphore, None);
        }
    }
}

/// Vulkan fence wrapper, destroyed on drop.
pub struct Fence {
    device: Arc<Device>,
    fence: vk::Fence,
}

impl Fence {
    /// Creates a new fence.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device
    /// * `signaled` - Create the fence already signaled, so the first wait
    ///   on it returns immediately.
    pub fn new(device: Arc<Device>, signaled: bool) -> RhiResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };

        let create_info = vk::FenceCreateInfo::default().flags(flags);
        let fence = unsafe { device.handle().create_fence(&create_info, None)? };

        Ok(Self { device, fence })
    }

    #[inline]
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }

    /// Blocks until the fence is signaled or `timeout` nanoseconds pass.
    ///
    /// `u64::MAX` waits without bound.
    pub fn wait(&self, timeout: u64) -> Result<(), RhiError> {
        unsafe {
            self.device
                .handle()
                .wait_for_fences(&[self.fence], true, timeout)?
        };
        Ok(())
    }

    /// Returns the fence to the unsignaled state.
    ///
    /// The fence must not be pending on any queue.
    pub fn reset(&self) -> Result<(), RhiError> {
        unsafe { self.device.handle().reset_fences(&[self.fence])? };
        Ok(())
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_fence(self.fence, None);
        }
    }
}

/// Synchronization objects owned by one frame slot.
pub struct FrameSync {
    image_available: Semaphore,
    render_finished: Semaphore,
    in_flight: Fence,
}

impl FrameSync {
    /// Creates the slot's semaphores and a signaled in-flight fence.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let image_available = Semaphore::new(device.clone())?;
        let render_finished = Semaphore::new(device.clone())?;
        let in_flight = Fence::new(device, true)?;

        Ok(Self {
            image_available,
            render_finished,
            in_flight,
        })
    }

    /// Creates [`MAX_FRAMES_IN_FLIGHT`] slots.
    pub fn create_slots(device: &Arc<Device>) -> RhiResult<Vec<Self>> {
        let slots = (0..MAX_FRAMES_IN_FLIGHT)
            .map(|_| Self::new(device.clone()))
            .collect::<RhiResult<Vec<_>>>()?;
        debug!("Created {} frame synchronization slots", slots.len());
        Ok(slots)
    }

    /// Signaled when the acquired image is ready to be rendered to.
    #[inline]
    pub fn image_available(&self) -> vk::Semaphore {
        self.image_available.handle()
    }

    /// Signaled when the slot's submission finished rendering.
    #[inline]
    pub fn render_finished(&self) -> vk::Semaphore {
        self.render_finished.handle()
    }

    #[inline]
    pub fn in_flight_fence(&self) -> &Fence {
        &self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_frames_in_flight_constant() {
        assert_eq!(MAX_FRAMES_IN_FLIGHT, 2);
    }

    #[test]
    fn test_sync_objects_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Semaphore>();
        assert_send_sync::<Fence>();
        assert_send_sync::<FrameSync>();
    }
}
