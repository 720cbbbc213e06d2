//! # touchline-core
//!
//! Core types and primitives for the Touchline keyframe engine.
//! This crate contains foundational types shared across all Touchline crates:
//! engine configuration, frame/time conversion, video metadata, colors,
//! interpolation math, and error types.

pub mod color;
pub mod config;
pub mod error;
pub mod math;
pub mod time;

pub use config::*;

pub use color::Color;
pub use error::{TouchlineError, TouchlineResult};
pub use time::{FrameRate, Timestamp, VideoMetadata};
