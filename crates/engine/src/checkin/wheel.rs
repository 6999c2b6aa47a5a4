//! Deterministic wheel animation timeline
//!
//! The wheel never moves on its own clock. A [`WheelTimeline`] is a pure
//! function from elapsed time to rotation; frames are pulled from a
//! [`FrameSource`], so the same spin replays identically under a test
//! source and the real interval-driven one.

use relay_core::{Error, Result};
use std::time::Duration;
use tokio::time::{Instant, Interval};

/// Full turns added before the wheel settles on the winning segment.
pub const SPIN_FULL_TURNS: f64 = 5.0;

/// Wall-clock length of one spin.
pub const SPIN_DURATION: Duration = Duration::from_millis(4000);

/// Ease-out cubic: fast launch, long deceleration into the landing.
pub fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

/// Rotation (mod 360) that centers segment `index` of `segments` under the
/// fixed top pointer. Segment 0 starts at the pointer and segments run
/// clockwise, so the wheel turns backwards by the segment's center angle.
fn pointer_alignment(segments: usize, index: usize) -> f64 {
    let seg = 360.0 / segments as f64;
    (360.0 - index as f64 * seg - seg / 2.0).rem_euclid(360.0)
}

/// A single spin from the wheel's current rest rotation to the winning
/// segment.
///
/// Rotation accumulates across spins and is never reset, so the target is
/// computed relative to wherever the wheel currently rests: five full turns
/// plus the smallest non-negative offset that aligns the winning segment's
/// center with the pointer. The landing therefore holds for any starting
/// rotation, not just multiples of 360.
#[derive(Debug, Clone)]
pub struct WheelTimeline {
    start: f64,
    target: f64,
    duration: Duration,
}

impl WheelTimeline {
    pub fn new(start_rotation: f64, segments: usize, index: usize) -> Result<Self> {
        if segments == 0 || index >= segments {
            return Err(Error::InvalidData(format!(
                "wheel index {} out of range for {} segments",
                index, segments
            )));
        }
        let offset = (pointer_alignment(segments, index) - start_rotation).rem_euclid(360.0);
        Ok(Self {
            start: start_rotation,
            target: start_rotation + SPIN_FULL_TURNS * 360.0 + offset,
            duration: SPIN_DURATION,
        })
    }

    pub fn start_rotation(&self) -> f64 {
        self.start
    }

    pub fn final_rotation(&self) -> f64 {
        self.target
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Rotation at `elapsed` since the spin began. Clamps past the end, so
    /// late frames hold the final rotation.
    pub fn sample(&self, elapsed: Duration) -> f64 {
        let t = (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0);
        self.start + (self.target - self.start) * ease_out_cubic(t)
    }

    pub fn is_complete(&self, elapsed: Duration) -> bool {
        elapsed >= self.duration
    }
}

/// Supplies elapsed-time frames for one spin.
#[async_trait::async_trait]
pub trait FrameSource: Send {
    /// The next frame's elapsed time since the spin began, or `None` when
    /// the source has stopped (view went away mid-animation).
    async fn next_frame(&mut self) -> Option<Duration>;
}

/// Real frame source: ticks at a fixed rate against the tokio clock.
pub struct IntervalFrames {
    interval: Interval,
    started: Option<Instant>,
}

impl IntervalFrames {
    pub fn new(fps: u32) -> Self {
        let period = Duration::from_secs(1) / fps.max(1);
        Self {
            interval: tokio::time::interval(period),
            started: None,
        }
    }
}

#[async_trait::async_trait]
impl FrameSource for IntervalFrames {
    async fn next_frame(&mut self) -> Option<Duration> {
        self.interval.tick().await;
        let started = *self.started.get_or_insert_with(Instant::now);
        Some(started.elapsed())
    }
}

/// Scripted frame source for deterministic replay in tests and headless
/// drivers.
pub struct ManualFrames {
    frames: std::collections::VecDeque<Duration>,
}

impl ManualFrames {
    pub fn new(frames: impl IntoIterator<Item = Duration>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn from_millis(frames: impl IntoIterator<Item = u64>) -> Self {
        Self::new(frames.into_iter().map(Duration::from_millis))
    }
}

#[async_trait::async_trait]
impl FrameSource for ManualFrames {
    async fn next_frame(&mut self) -> Option<Duration> {
        self.frames.pop_front()
    }
}

/// Drive a timeline against a frame source, reporting each sampled rotation.
///
/// Returns the final rotation when a frame at or past the duration arrives,
/// or `None` if the source stops first. Completion fires at most once per
/// call; the timeline itself is stateless and can be resumed with a fresh
/// source.
pub async fn run<F: FrameSource>(
    timeline: &WheelTimeline,
    frames: &mut F,
    mut on_frame: impl FnMut(f64) + Send,
) -> Option<f64> {
    while let Some(elapsed) = frames.next_frame().await {
        on_frame(timeline.sample(elapsed));
        if timeline.is_complete(elapsed) {
            return Some(timeline.final_rotation());
        }
    }
    None
}
