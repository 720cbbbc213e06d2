use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{TouchlineError, TouchlineResult};

/// Frames per second of a clip.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameRate(f64);

impl FrameRate {
    /// Create a frame rate. Must be finite and positive.
    pub fn new(fps: f64) -> TouchlineResult<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(TouchlineError::InvalidArgument(format!(
                "framerate must be positive, got {}",
                fps
            )));
        }
        Ok(Self(fps))
    }

    pub fn as_f64(&self) -> f64 {
        self.0
    }

    /// Frame index containing the given timestamp.
    pub fn frame_at(&self, ts: Timestamp) -> u64 {
        // Nudge before flooring so 1.0s at 30fps lands on frame 30, not 29.
        (ts.as_seconds() * self.0 + 1e-9).floor() as u64
    }

    /// Start time of the given frame.
    pub fn timestamp_of(&self, frame: u64) -> Timestamp {
        Timestamp::from_seconds(frame as f64 / self.0)
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self(30.0)
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}fps", self.0)
    }
}

/// A point in source time, in seconds from the start of the clip.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Timestamp {
    seconds: f64,
}

impl Timestamp {
    /// Create a timestamp from seconds. Negative values clamp to zero.
    pub fn from_seconds(s: f64) -> Self {
        Self {
            seconds: s.max(0.0),
        }
    }

    pub fn zero() -> Self {
        Self { seconds: 0.0 }
    }

    pub fn as_seconds(&self) -> f64 {
        self.seconds
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::zero()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_ms = (self.seconds * 1000.0) as u64;
        let hours = total_ms / 3_600_000;
        let minutes = (total_ms % 3_600_000) / 60_000;
        let secs = (total_ms % 60_000) / 1_000;
        let ms = total_ms % 1_000;
        write!(f, "{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, ms)
    }
}

/// Metadata of the clip being edited, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub total_frames: u64,
    pub framerate: FrameRate,
    pub width: u32,
    pub height: u32,
}

impl VideoMetadata {
    pub fn new(total_frames: u64, framerate: FrameRate, width: u32, height: u32) -> Self {
        Self {
            total_frames,
            framerate,
            width,
            height,
        }
    }

    /// Derive metadata from a clip duration in seconds.
    pub fn from_duration(seconds: f64, framerate: FrameRate, width: u32, height: u32) -> Self {
        let total_frames = (seconds.max(0.0) * framerate.as_f64()).round() as u64;
        Self::new(total_frames, framerate, width, height)
    }

    /// Index of the final frame. Zero for an empty clip.
    pub fn last_frame(&self) -> u64 {
        self.total_frames.saturating_sub(1)
    }

    /// Clip duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.total_frames as f64 / self.framerate.as_f64()
    }

    /// Convert a source time to a frame index, clamped to the clip.
    pub fn frame_at(&self, ts: Timestamp) -> u64 {
        self.framerate.frame_at(ts).min(self.last_frame())
    }

    /// Aspect ratio (width / height).
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }
}
