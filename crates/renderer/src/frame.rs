//! Frame lifecycle state and the per-frame data handed to render systems.

use renderer_rhi::command::CommandBuffer;
use renderer_rhi::swapchain::next_frame_slot;
use renderer_rhi::{RhiError, RhiResult};
use renderer_scene::Camera;

/// Tracks whether a frame is being recorded and which slot and image it
/// uses.
///
/// `begin` and `end` must alternate. Calling either out of order is an
/// error and leaves the state untouched.
#[derive(Debug, Default)]
pub struct FrameState {
    frame_index: usize,
    image_index: u32,
    in_progress: bool,
}

impl FrameState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with [`RhiError::FrameAlreadyStarted`] while recording.
    pub fn ensure_idle(&self) -> RhiResult<()> {
        if self.in_progress {
            return Err(RhiError::FrameAlreadyStarted);
        }
        Ok(())
    }

    /// Fails with [`RhiError::FrameNotStarted`] unless recording. `operation`
    /// names the rejected call in the error message.
    pub fn ensure_started(&self, operation: &'static str) -> RhiResult<()> {
        if !self.in_progress {
            return Err(RhiError::FrameNotStarted(operation));
        }
        Ok(())
    }

    /// Starts recording into the current frame slot for `image_index`.
    pub fn begin(&mut self, image_index: u32) -> RhiResult<()> {
        self.ensure_idle()?;
        self.image_index = image_index;
        self.in_progress = true;
        Ok(())
    }

    /// Runs `start_recording` and only then marks the frame as started. A
    /// failed start leaves the state idle.
    pub fn begin_with(
        &mut self,
        image_index: u32,
        start_recording: impl FnOnce() -> RhiResult<()>,
    ) -> RhiResult<()> {
        self.ensure_idle()?;
        start_recording()?;
        self.begin(image_index)
    }

    /// Stops recording and moves to the next frame slot.
    pub fn end(&mut self) -> RhiResult<()> {
        self.ensure_started("end a frame")?;
        self.in_progress = false;
        self.frame_index = next_frame_slot(self.frame_index);
        Ok(())
    }

    #[inline]
    pub fn is_in_progress(&self) -> bool {
        self.in_progress
    }

    /// Frame slot of the current or next frame.
    #[inline]
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Swapchain image acquired by the current frame.
    pub fn image_index(&self) -> RhiResult<u32> {
        self.ensure_started("get the image index")?;
        Ok(self.image_index)
    }
}

/// Everything a render system needs to record one frame.
pub struct FrameInfo<'a> {
    pub frame_index: usize,
    /// Seconds since the previous frame.
    pub frame_time: f32,
    pub command_buffer: &'a CommandBuffer,
    pub camera: &'a Camera,
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use renderer_rhi::{MAX_FRAMES_IN_FLIGHT, vk};

    use super::*;

    #[test]
    fn test_new_state_is_idle() {
        let state = FrameState::new();
        assert!(!state.is_in_progress());
        assert_eq!(state.frame_index(), 0);
        assert!(state.ensure_idle().is_ok());
        assert!(matches!(
            state.image_index(),
            Err(RhiError::FrameNotStarted(_))
        ));
    }

    #[test]
    fn test_begin_then_end() {
        let mut state = FrameState::new();
        state.begin(2).unwrap();
        assert!(state.is_in_progress());
        assert_eq!(state.image_index().unwrap(), 2);

        state.end().unwrap();
        assert!(!state.is_in_progress());
        assert_eq!(state.frame_index(), 1);
    }

    #[test]
    fn test_double_begin_is_rejected() {
        let mut state = FrameState::new();
        state.begin(0).unwrap();
        assert!(matches!(state.begin(1), Err(RhiError::FrameAlreadyStarted)));
        // The first frame is still the one in progress.
        assert_eq!(state.image_index().unwrap(), 0);
    }

    #[test]
    fn test_failed_recording_start_leaves_state_idle() {
        let mut state = FrameState::new();
        let result = state.begin_with(1, || {
            Err(RhiError::VulkanError(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY))
        });
        assert!(matches!(
            result,
            Err(RhiError::VulkanError(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY))
        ));
        assert!(!state.is_in_progress());
        assert!(matches!(state.end(), Err(RhiError::FrameNotStarted(_))));

        // The next frame can start normally.
        state.begin_with(1, || Ok(())).unwrap();
        assert_eq!(state.image_index().unwrap(), 1);
    }

    #[test]
    fn test_begin_with_skips_recording_while_in_progress() {
        let mut state = FrameState::new();
        state.begin(0).unwrap();

        let started = Cell::new(false);
        let result = state.begin_with(1, || {
            started.set(true);
            Ok(())
        });
        assert!(matches!(result, Err(RhiError::FrameAlreadyStarted)));
        assert!(!started.get());
        assert_eq!(state.image_index().unwrap(), 0);
    }

    #[test]
    fn test_end_without_begin_is_rejected() {
        let mut state = FrameState::new();
        assert!(matches!(state.end(), Err(RhiError::FrameNotStarted(_))));
        assert_eq!(state.frame_index(), 0);
    }

    #[test]
    fn test_frame_index_wraps() {
        let mut state = FrameState::new();
        for frame in 0..(3 * MAX_FRAMES_IN_FLIGHT) {
            assert_eq!(state.frame_index(), frame % MAX_FRAMES_IN_FLIGHT);
            state.begin(0).unwrap();
            state.end().unwrap();
        }
    }
}
