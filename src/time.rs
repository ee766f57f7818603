//! Wall clock for the frame driver.
//!
//! [`Time::now`] is the timestamp handed to
//! [`FrameDriver::render_frame`](crate::driver::FrameDriver::render_frame).
//! Paused time does not count, so a pause shows up to the driver as a run of
//! zero deltas rather than one large jump.
//!
//! # Example
//!
//! ```ignore
//! let mut time = Time::new();
//!
//! // once per redraw:
//! time.tick();
//! driver.render_frame(time.now(), &mut session, &mut renderer);
//! log::trace!("{:.1} fps", time.fps());
//! ```

use std::time::{Duration, Instant};

/// Monotonic simulation clock with pause and an FPS estimate.
#[derive(Debug)]
pub struct Time {
    start: Instant,
    /// Seconds since start, excluding paused spans, as of the last tick.
    now_secs: f64,
    frame_count: u64,
    fps: f32,
    fps_frame_count: u64,
    fps_update_time: Instant,
    fps_update_interval: Duration,
    /// When the current pause began.
    paused_at: Option<Instant>,
    /// Total time spent paused.
    pause_elapsed: Duration,
}

impl Time {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            now_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_millis(500),
            paused_at: None,
            pause_elapsed: Duration::ZERO,
        }
    }

    /// Advance to the current instant. Call once per frame.
    ///
    /// Returns the new timestamp in seconds.
    pub fn tick(&mut self) -> f64 {
        let now = Instant::now();
        self.frame_count += 1;

        let fps_elapsed = now.duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
        }

        if self.paused_at.is_none() {
            let running = now.duration_since(self.start).saturating_sub(self.pause_elapsed);
            self.now_secs = running.as_secs_f64();
        }
        self.now_secs
    }

    /// Timestamp of the last tick, in seconds.
    #[inline]
    pub fn now(&self) -> f64 {
        self.now_secs
    }

    /// Ticks since start.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Stop the clock. `now()` holds its value until [`resume`](Self::resume).
    pub fn pause(&mut self) {
        if self.paused_at.is_none() {
            self.paused_at = Some(Instant::now());
        }
    }

    pub fn resume(&mut self) {
        if let Some(paused_at) = self.paused_at.take() {
            self.pause_elapsed += paused_at.elapsed();
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.is_paused() {
            self.resume();
        } else {
            self.pause();
        }
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}
