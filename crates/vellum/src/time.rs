//! Frame timing.
//!
//! [`Time`] measures wall-clock time between frames for
//! [`RenderHandle::frame`](crate::render::RenderHandle::frame). Code that
//! drives frames itself passes milliseconds to `step` instead.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct Time {
    startup: Instant,
    frame_start: Instant,
    delta: Duration,
    elapsed: Duration,
    frame_count: u64,
}

impl Time {
    pub(crate) fn new() -> Self {
        let now = Instant::now();
        Self {
            startup: now,
            frame_start: now,
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Call at the start of each frame.
    pub(crate) fn update(&mut self) {
        let now = Instant::now();
        self.delta = now - self.frame_start;
        self.frame_start = now;
        self.elapsed = now - self.startup;
        self.frame_count += 1;
    }

    /// Duration of the previous frame.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Delta time in milliseconds, as components receive it.
    pub fn delta_ms(&self) -> f32 {
        self.delta.as_secs_f32() * 1000.0
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Estimated FPS based on the last frame's delta.
    pub fn fps(&self) -> f32 {
        if self.delta.as_secs_f32() > 0.0 {
            1.0 / self.delta.as_secs_f32()
        } else {
            0.0
        }
    }
}
