//! Frame timer.

use std::time::{Duration, Instant};

/// Upper bound for a single frame step. Keeps movement sane after a stall
/// such as a window drag or a minimise.
pub const MAX_FRAME_TIME: Duration = Duration::from_millis(250);

/// Measures the wall-clock time between frames.
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    last_frame: Instant,
}

impl Timer {
    /// Start a timer at the current instant.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_frame: now,
        }
    }

    /// Seconds since the timer was created.
    pub fn elapsed_secs(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }

    /// Seconds since the previous call, clamped to [`MAX_FRAME_TIME`].
    pub fn frame_time(&mut self) -> f32 {
        let now = Instant::now();
        let delta = now.duration_since(self.last_frame);
        self.last_frame = now;
        clamp_frame_time(delta).as_secs_f32()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_frame_time(delta: Duration) -> Duration {
    delta.min(MAX_FRAME_TIME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_time_is_non_negative() {
        let mut timer = Timer::new();
        let first = timer.frame_time();
        let second = timer.frame_time();
        assert!(first >= 0.0);
        assert!(second >= 0.0);
    }

    #[test]
    fn test_frame_time_clamped() {
        assert_eq!(clamp_frame_time(Duration::from_secs(3)), MAX_FRAME_TIME);
        assert_eq!(
            clamp_frame_time(Duration::from_millis(16)),
            Duration::from_millis(16)
        );
    }

    #[test]
    fn test_elapsed_grows() {
        let timer = Timer::default();
        std::thread::sleep(Duration::from_millis(2));
        assert!(timer.elapsed_secs() > 0.0);
    }
}
