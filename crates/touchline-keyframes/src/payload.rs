//! Shape-specific keyframe payloads.
//!
//! A payload exposes its numeric fields as indexed *channels* so the
//! interpolator can stay generic over crop rectangles and highlight
//! ellipses. Fields that are not channels (such as a highlight color) are
//! never blended; they hold the value of the earlier keyframe.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use touchline_core::{Color, VideoMetadata};

/// The property a track animates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    Crop,
    Highlight,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadKind::Crop => write!(f, "crop"),
            PayloadKind::Highlight => write!(f, "highlight"),
        }
    }
}

/// How a channel behaves under interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Screen position; eligible for spline smoothing.
    Position,
    /// Width, height or radius; always linear, never negative.
    Extent,
    /// Any other linear quantity.
    Scalar,
}

/// A named numeric field of a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    pub name: &'static str,
    pub kind: ChannelKind,
}

impl Channel {
    pub const fn new(name: &'static str, kind: ChannelKind) -> Self {
        Self { name, kind }
    }
}

/// Payload carried by a keyframe.
pub trait KeyframePayload:
    Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + 'static
{
    /// Partial update merged by `UPDATE_KEYFRAME`.
    type Patch: Clone + PartialEq + fmt::Debug + Default + Serialize + DeserializeOwned;

    const KIND: PayloadKind;

    /// Numeric channels in a fixed order; indices are stable.
    const CHANNELS: &'static [Channel];

    fn channel(&self, index: usize) -> f64;

    fn set_channel(&mut self, index: usize, value: f64);

    fn apply_patch(&mut self, patch: &Self::Patch);

    /// Payload used for the permanent boundary keyframes of a fresh track.
    fn boundary_default(meta: &VideoMetadata) -> Self;

    /// Clamp fields into their legal ranges.
    fn sanitize(&mut self) {
        for (i, channel) in Self::CHANNELS.iter().enumerate() {
            if channel.kind == ChannelKind::Extent && self.channel(i) < 0.0 {
                self.set_channel(i, 0.0);
            }
        }
    }

    /// Name of the first non-finite channel, if any.
    fn non_finite_channel(&self) -> Option<&'static str> {
        Self::CHANNELS
            .iter()
            .enumerate()
            .find(|(i, _)| !self.channel(*i).is_finite())
            .map(|(_, c)| c.name)
    }

    /// Copy of `self` with `patch` applied and sanitized.
    fn merged(&self, patch: &Self::Patch) -> Self {
        let mut merged = self.clone();
        merged.apply_patch(patch);
        merged.sanitize();
        merged
    }
}

/// Crop rectangle, either normalized (0..1) or in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    pub const NORMALIZED_FULL: CropRect = CropRect {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whole source frame in pixels.
    pub fn full_frame(meta: &VideoMetadata) -> Self {
        Self::new(0.0, 0.0, meta.width as f64, meta.height as f64)
    }

    /// Largest rectangle with the given aspect ratio (width / height),
    /// centered in the source frame, in pixels.
    pub fn centered_aspect(meta: &VideoMetadata, aspect: f64) -> Self {
        let (w, h) = (meta.width as f64, meta.height as f64);
        if aspect <= 0.0 || w <= 0.0 || h <= 0.0 {
            return Self::full_frame(meta);
        }
        let (cw, ch) = if w / h > aspect {
            (h * aspect, h)
        } else {
            (w, w / aspect)
        };
        Self::new((w - cw) / 2.0, (h - ch) / 2.0, cw, ch)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CropPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

const CROP_CHANNELS: &[Channel] = &[
    Channel::new("x", ChannelKind::Position),
    Channel::new("y", ChannelKind::Position),
    Channel::new("width", ChannelKind::Extent),
    Channel::new("height", ChannelKind::Extent),
];

impl KeyframePayload for CropRect {
    type Patch = CropPatch;

    const KIND: PayloadKind = PayloadKind::Crop;
    const CHANNELS: &'static [Channel] = CROP_CHANNELS;

    fn channel(&self, index: usize) -> f64 {
        match index {
            0 => self.x,
            1 => self.y,
            2 => self.width,
            3 => self.height,
            _ => f64::NAN,
        }
    }

    fn set_channel(&mut self, index: usize, value: f64) {
        match index {
            0 => self.x = value,
            1 => self.y = value,
            2 => self.width = value,
            3 => self.height = value,
            _ => {}
        }
    }

    fn apply_patch(&mut self, patch: &CropPatch) {
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(width) = patch.width {
            self.width = width;
        }
        if let Some(height) = patch.height {
            self.height = height;
        }
    }

    fn boundary_default(meta: &VideoMetadata) -> Self {
        Self::full_frame(meta)
    }
}

/// Spotlight ellipse drawn over a player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightEllipse {
    pub x: f64,
    pub y: f64,
    pub radius_x: f64,
    pub radius_y: f64,
    pub opacity: f64,
    pub color: Color,
}

impl HighlightEllipse {
    pub const DEFAULT_OPACITY: f64 = 0.15;

    /// Zero-radius highlight centered in the source frame.
    pub fn centered(meta: &VideoMetadata) -> Self {
        Self {
            x: meta.width as f64 / 2.0,
            y: meta.height as f64 / 2.0,
            radius_x: 0.0,
            radius_y: 0.0,
            opacity: Self::DEFAULT_OPACITY,
            color: Color::HIGHLIGHT_YELLOW,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

const HIGHLIGHT_CHANNELS: &[Channel] = &[
    Channel::new("x", ChannelKind::Position),
    Channel::new("y", ChannelKind::Position),
    Channel::new("radiusX", ChannelKind::Extent),
    Channel::new("radiusY", ChannelKind::Extent),
    Channel::new("opacity", ChannelKind::Scalar),
];

impl KeyframePayload for HighlightEllipse {
    type Patch = HighlightPatch;

    const KIND: PayloadKind = PayloadKind::Highlight;
    const CHANNELS: &'static [Channel] = HIGHLIGHT_CHANNELS;

    fn channel(&self, index: usize) -> f64 {
        match index {
            0 => self.x,
            1 => self.y,
            2 => self.radius_x,
            3 => self.radius_y,
            4 => self.opacity,
            _ => f64::NAN,
        }
    }

    fn set_channel(&mut self, index: usize, value: f64) {
        match index {
            0 => self.x = value,
            1 => self.y = value,
            2 => self.radius_x = value,
            3 => self.radius_y = value,
            4 => self.opacity = value,
            _ => {}
        }
    }

    fn apply_patch(&mut self, patch: &HighlightPatch) {
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(rx) = patch.radius_x {
            self.radius_x = rx;
        }
        if let Some(ry) = patch.radius_y {
            self.radius_y = ry;
        }
        if let Some(opacity) = patch.opacity {
            self.opacity = opacity;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
    }

    fn boundary_default(meta: &VideoMetadata) -> Self {
        Self::centered(meta)
    }

    fn sanitize(&mut self) {
        self.radius_x = self.radius_x.max(0.0);
        self.radius_y = self.radius_y.max(0.0);
        // NaN survives clamp and is caught by the finite check instead.
        self.opacity = self.opacity.clamp(0.0, 1.0);
    }
}
