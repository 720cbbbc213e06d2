use serde::{Deserialize, Serialize};

use crate::keyframe::Origin;
use crate::payload::KeyframePayload;
use crate::persist::KeyframeRecord;

/// The complete set of ways a track can be changed.
///
/// On the wire an action is an object tagged by `type`, e.g.
/// `{"type": "ADD_KEYFRAME", "frame": 150, "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase",
    bound = "P: KeyframePayload"
)]
pub enum Action<P: KeyframePayload> {
    Initialize {
        total_frames: u64,
        start: P,
        end: P,
    },
    RestoreKeyframes {
        total_frames: u64,
        keyframes: Vec<KeyframeRecord<P>>,
    },
    AddKeyframe {
        frame: u64,
        payload: P,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        origin: Option<Origin>,
    },
    UpdateKeyframe {
        frame: u64,
        patch: P::Patch,
    },
    RemoveKeyframe {
        frame: u64,
    },
    MoveKeyframe {
        from: u64,
        to: u64,
    },
    DeleteKeyframesInRange {
        start: u64,
        end: u64,
    },
    CopyKeyframe {
        frame: u64,
    },
    PasteKeyframe {
        frame: u64,
    },
    StartTrim {
        start: u64,
        end: u64,
    },
    EndTrim,
    CleanupTrimKeyframes,
    Reset,
}

impl<P: KeyframePayload> Action<P> {
    /// Wire name of the action, used in logs and undo labels.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Initialize { .. } => "INITIALIZE",
            Action::RestoreKeyframes { .. } => "RESTORE_KEYFRAMES",
            Action::AddKeyframe { .. } => "ADD_KEYFRAME",
            Action::UpdateKeyframe { .. } => "UPDATE_KEYFRAME",
            Action::RemoveKeyframe { .. } => "REMOVE_KEYFRAME",
            Action::MoveKeyframe { .. } => "MOVE_KEYFRAME",
            Action::DeleteKeyframesInRange { .. } => "DELETE_KEYFRAMES_IN_RANGE",
            Action::CopyKeyframe { .. } => "COPY_KEYFRAME",
            Action::PasteKeyframe { .. } => "PASTE_KEYFRAME",
            Action::StartTrim { .. } => "START_TRIM",
            Action::EndTrim => "END_TRIM",
            Action::CleanupTrimKeyframes => "CLEANUP_TRIM_KEYFRAMES",
            Action::Reset => "RESET",
        }
    }

    /// Actions that replace or discard the whole track.
    pub fn replaces_track(&self) -> bool {
        matches!(
            self,
            Action::Initialize { .. } | Action::RestoreKeyframes { .. } | Action::Reset
        )
    }
}

/// Why an action did nothing or was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Reason {
    #[error("no track is loaded")]
    NotInitialized,
    #[error("keyframe at frame {frame} is permanent")]
    PermanentKeyframe { frame: u64 },
    #[error("keyframe at frame {frame} anchors the active trim")]
    TrimBoundary { frame: u64 },
    #[error("frame {frame} already holds a keyframe")]
    FrameOccupied { frame: u64 },
    #[error("frame {frame} is outside the clip (last frame {last})")]
    OutOfRange { frame: u64, last: u64 },
    #[error("frame {frame} is outside the trim range {start}..={end}")]
    OutsideTrimRange { frame: u64, start: u64, end: u64 },
    #[error("invalid range {start}..={end}")]
    InvalidRange { start: u64, end: u64 },
    #[error("permanent keyframes are created by the engine only")]
    PermanentOriginReserved,
    #[error("payload has a non-finite {channel}")]
    InvalidPayload { channel: &'static str },
    #[error("a trim is already active")]
    AlreadyTrimming,
    #[error("no trim is active")]
    NotTrimming,
    #[error("no keyframe at frame {frame}")]
    NoKeyframeAtFrame { frame: u64 },
    #[error("no keyframes in range")]
    NothingInRange,
    #[error("no trim keyframes to clean up")]
    NoTrimKeyframes,
    #[error("clipboard is empty")]
    ClipboardEmpty,
    #[error("action would not change anything")]
    Unchanged,
    #[error("action broke track invariants: {0}")]
    InvariantViolation(String),
}

impl Reason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Reason::NotInitialized => "not_initialized",
            Reason::PermanentKeyframe { .. } => "permanent_keyframe",
            Reason::TrimBoundary { .. } => "trim_boundary",
            Reason::FrameOccupied { .. } => "frame_occupied",
            Reason::OutOfRange { .. } => "out_of_range",
            Reason::OutsideTrimRange { .. } => "outside_trim_range",
            Reason::InvalidRange { .. } => "invalid_range",
            Reason::PermanentOriginReserved => "permanent_origin_reserved",
            Reason::InvalidPayload { .. } => "invalid_payload",
            Reason::AlreadyTrimming => "already_trimming",
            Reason::NotTrimming => "not_trimming",
            Reason::NoKeyframeAtFrame { .. } => "no_keyframe_at_frame",
            Reason::NothingInRange => "nothing_in_range",
            Reason::NoTrimKeyframes => "no_trim_keyframes",
            Reason::ClipboardEmpty => "clipboard_empty",
            Reason::Unchanged => "unchanged",
            Reason::InvariantViolation(_) => "invariant_violation",
        }
    }
}

/// Result of one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// The target did not exist or nothing would change; state unchanged.
    NoOp(Reason),
    /// The action was refused by policy; state unchanged.
    Rejected(Reason),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Outcome::Rejected(_))
    }

    pub fn reason(&self) -> Option<&Reason> {
        match self {
            Outcome::Applied => None,
            Outcome::NoOp(r) | Outcome::Rejected(r) => Some(r),
        }
    }

    /// `"applied"`, `"no_op"` or `"rejected"`.
    pub fn status(&self) -> &'static str {
        match self {
            Outcome::Applied => "applied",
            Outcome::NoOp(_) => "no_op",
            Outcome::Rejected(_) => "rejected",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.reason() {
            None => write!(f, "{}", self.status()),
            Some(reason) => write!(f, "{} ({}): {}", self.status(), reason.code(), reason),
        }
    }
}
