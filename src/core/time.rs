//! Frame timing utilities

use std::time::{Duration, Instant};

/// Measures the wall-clock delta between rendered frames.
///
/// The first tick has no previous frame to measure against and reports a
/// zero delta, which the fog broadcaster ignores.
pub struct FrameClock {
    last_frame: Option<Instant>,
    delta: Duration,
    frame_count: u64,
    fps_timer: Option<Instant>,
    fps: f32,
    fps_frame_count: u32,
}

impl FrameClock {
    /// Create a new frame clock
    pub fn new() -> Self {
        Self {
            last_frame: None,
            delta: Duration::ZERO,
            frame_count: 0,
            fps_timer: None,
            fps: 0.0,
            fps_frame_count: 0,
        }
    }

    /// Call once per frame. Returns the delta in seconds.
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    /// Tick with an explicit timestamp. Timestamps earlier than the previous
    /// tick produce a zero delta.
    pub fn tick_at(&mut self, now: Instant) -> f32 {
        self.delta = match self.last_frame {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::ZERO,
        };
        self.last_frame = Some(now);
        self.frame_count += 1;
        self.fps_frame_count += 1;

        // Update FPS every second
        let fps_timer = *self.fps_timer.get_or_insert(now);
        let fps_elapsed = now.saturating_duration_since(fps_timer);
        if fps_elapsed >= Duration::from_secs(1) {
            self.fps = self.fps_frame_count as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = 0;
            self.fps_timer = Some(now);
        }

        self.delta.as_secs_f32()
    }

    /// Get delta time in seconds
    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Get delta time as Duration
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Get current FPS (updated every second)
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Get total frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
