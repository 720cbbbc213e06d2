//! # touchline-keyframes
//!
//! Frame-based keyframe engine for animating a crop rectangle or a highlight
//! ellipse over a clip.
//!
//! Every change to a track goes through [`reduce`], a pure
//! `(state, action) -> state` function that keeps the keyframes sorted,
//! collision-free and anchored by two permanent keyframes at the first and
//! last frame. [`interpolate`] turns a track into the payload to draw at any
//! frame. [`EditorSession`] wraps both with undo history and a sample cache.

pub mod action;
pub mod history;
pub mod interpolate;
pub mod keyframe;
pub mod lifecycle;
pub mod payload;
pub mod persist;
pub mod reducer;
pub mod session;
pub mod track;
pub mod validate;

pub use action::{Action, Outcome, Reason};
pub use history::{History, Snapshot};
pub use interpolate::{interpolate, sample, select_segment, FrameSampler, SegmentStrategy};
pub use keyframe::{Keyframe, Origin};
pub use lifecycle::{seed_boundaries, TrimWindow};
pub use payload::{
    Channel, ChannelKind, CropPatch, CropRect, HighlightEllipse, HighlightPatch, KeyframePayload,
    PayloadKind,
};
pub use persist::{
    records_from_json, records_from_str, serialize_track, KeyframeRecord, PersistFilter,
    TrackDocument, TrackFile,
};
pub use reducer::{reduce, EditorState, Phase, Transition};
pub use session::{EditorSession, LoadSource};
pub use track::AnimationTrack;
pub use validate::{validate_keyframes, validate_track, InvariantViolation};
