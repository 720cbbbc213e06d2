//! The keyframe state machine.
//!
//! `reduce` is a pure function from the current [`EditorState`] and one
//! [`Action`] to the next state. Refused or no-op actions hand back the
//! previous state untouched; applied actions are re-validated before the
//! new state is returned.

use std::fmt;

use touchline_core::{
    DuplicatePolicy, InvariantPolicy, KeyframeConfig, TouchlineError, TouchlineResult,
};

use crate::action::{Action, Outcome, Reason};
use crate::history::Snapshot;
use crate::keyframe::{Keyframe, Origin};
use crate::lifecycle::{self, TrimWindow};
use crate::payload::KeyframePayload;
use crate::persist::{restore_track, PersistFilter};
use crate::track::AnimationTrack;
use crate::validate::validate_track;

/// Observable lifecycle phase of an editor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Initialized,
    Trimming,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Uninitialized => write!(f, "uninitialized"),
            Phase::Initialized => write!(f, "initialized"),
            Phase::Trimming => write!(f, "trimming"),
        }
    }
}

/// Everything the reducer owns for one animated property.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorState<P> {
    track: Option<AnimationTrack<P>>,
    trim: Option<TrimWindow<P>>,
    clipboard: Option<P>,
    revision: u64,
}

impl<P> Default for EditorState<P> {
    fn default() -> Self {
        Self {
            track: None,
            trim: None,
            clipboard: None,
            revision: 0,
        }
    }
}

impl<P: KeyframePayload> EditorState<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        match (&self.track, &self.trim) {
            (None, _) => Phase::Uninitialized,
            (Some(_), None) => Phase::Initialized,
            (Some(_), Some(_)) => Phase::Trimming,
        }
    }

    pub fn track(&self) -> Option<&AnimationTrack<P>> {
        self.track.as_ref()
    }

    pub fn trim(&self) -> Option<&TrimWindow<P>> {
        self.trim.as_ref()
    }

    pub fn clipboard(&self) -> Option<&P> {
        self.clipboard.as_ref()
    }

    /// Bumped on every applied action. Equal revisions imply equal content.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn snapshot(&self) -> Snapshot<P> {
        Snapshot {
            track: self.track.clone(),
            trim: self.trim.clone(),
        }
    }

    /// The track as it should be stored. While trimming this is what
    /// `END_TRIM` would leave behind, hidden keyframes included, unless
    /// `filter` is [`PersistFilter::UserAndTrim`], which commits the trim.
    pub fn storable_track(
        &self,
        filter: PersistFilter,
        tolerance: u64,
    ) -> TouchlineResult<Option<AnimationTrack<P>>> {
        let Some(track) = &self.track else {
            return Ok(None);
        };
        let mut track = track.clone();
        if let Some(window) = &self.trim {
            if filter != PersistFilter::UserAndTrim {
                lifecycle::end_trim(&mut track, window.clone(), tolerance)?;
            }
        }
        Ok(Some(track))
    }

    /// Replace track and trim window with `snapshot`, keeping the clipboard.
    pub(crate) fn restore_snapshot(&mut self, snapshot: Snapshot<P>) {
        self.track = snapshot.track;
        self.trim = snapshot.trim;
        self.revision += 1;
    }

    fn same_content(&self, other: &Self) -> bool {
        self.track == other.track && self.trim == other.trim && self.clipboard == other.clipboard
    }
}

/// Result of one `reduce` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<P> {
    pub state: EditorState<P>,
    pub outcome: Outcome,
}

/// Apply `action` to `state`.
///
/// Returns `Err` only for malformed input (bad restore, fewer than two
/// frames) or, under [`InvariantPolicy::FailFast`], when an applied action
/// leaves the track invalid.
pub fn reduce<P: KeyframePayload>(
    state: &EditorState<P>,
    action: Action<P>,
    config: &KeyframeConfig,
) -> TouchlineResult<Transition<P>> {
    let name = action.name();
    let mut next = state.clone();
    let outcome = apply(&mut next, action, config)?;

    if !outcome.is_applied() {
        return Ok(Transition {
            state: state.clone(),
            outcome,
        });
    }
    if next.same_content(state) {
        return Ok(Transition {
            state: state.clone(),
            outcome: Outcome::NoOp(Reason::Unchanged),
        });
    }
    next.revision = state.revision + 1;

    let tolerance = config.frame_tolerance;
    if let Some(track) = next.track.as_mut() {
        if let Err(violations) = validate_track(track, tolerance) {
            match config.invariant_policy {
                InvariantPolicy::FailFast => return Err(TouchlineError::invariant(violations)),
                InvariantPolicy::Reject => {
                    let message = TouchlineError::invariant(violations).to_string();
                    tracing::error!(action = name, %message, "action rejected: invariant violated");
                    return Ok(Transition {
                        state: state.clone(),
                        outcome: Outcome::Rejected(Reason::InvariantViolation(message)),
                    });
                }
                InvariantPolicy::Repair => {
                    tracing::warn!(
                        action = name,
                        violations = violations.len(),
                        "repairing track after invariant violation"
                    );
                    lifecycle::repair(track, tolerance)?;
                    validate_track(track, tolerance).map_err(TouchlineError::invariant)?;
                }
            }
        }
    }

    Ok(Transition {
        state: next,
        outcome: Outcome::Applied,
    })
}

fn apply<P: KeyframePayload>(
    state: &mut EditorState<P>,
    action: Action<P>,
    config: &KeyframeConfig,
) -> TouchlineResult<Outcome> {
    let step: Step = match action {
        Action::Initialize {
            total_frames,
            start,
            end,
        } => {
            state.track = Some(lifecycle::seed_boundaries(total_frames, start, end)?);
            state.trim = None;
            Ok(Outcome::Applied)
        }
        Action::RestoreKeyframes {
            total_frames,
            keyframes,
        } => {
            state.track = Some(restore_track(
                total_frames,
                keyframes,
                config.frame_tolerance,
            )?);
            state.trim = None;
            Ok(Outcome::Applied)
        }
        Action::AddKeyframe {
            frame,
            payload,
            origin,
        } => add_keyframe(state, frame, payload, origin, config),
        Action::UpdateKeyframe { frame, patch } => update_keyframe(state, frame, &patch, config),
        Action::RemoveKeyframe { frame } => remove_keyframe(state, frame, config),
        Action::MoveKeyframe { from, to } => move_keyframe(state, from, to, config),
        Action::DeleteKeyframesInRange { start, end } => delete_in_range(state, start, end),
        Action::CopyKeyframe { frame } => copy_keyframe(state, frame, config),
        Action::PasteKeyframe { frame } => paste_keyframe(state, frame, config),
        Action::StartTrim { start, end } => start_trim(state, start, end, config),
        Action::EndTrim => end_trim(state, config)?,
        Action::CleanupTrimKeyframes => cleanup_trim(state, config)?,
        Action::Reset => {
            state.track = None;
            state.trim = None;
            Ok(Outcome::Applied)
        }
    };
    Ok(step.unwrap_or_else(Outcome::Rejected))
}

/// `Err` carries the rejection reason.
type Step = Result<Outcome, Reason>;

/// The loaded track and the active trim window, or `NotInitialized`.
fn editable<P>(
    state: &mut EditorState<P>,
) -> Result<(&mut AnimationTrack<P>, Option<&TrimWindow<P>>), Reason> {
    let EditorState { track, trim, .. } = state;
    let track = track.as_mut().ok_or(Reason::NotInitialized)?;
    Ok((track, trim.as_ref()))
}

/// A frame an edit may target: inside the clip and inside any active trim.
fn check_target<P>(
    track: &AnimationTrack<P>,
    trim: Option<&TrimWindow<P>>,
    frame: u64,
) -> Result<(), Reason> {
    let last = track.last_frame();
    if frame > last {
        return Err(Reason::OutOfRange { frame, last });
    }
    match trim {
        Some(window) if !window.contains(frame) => Err(Reason::OutsideTrimRange {
            frame,
            start: window.start,
            end: window.end,
        }),
        _ => Ok(()),
    }
}

fn check_payload<P: KeyframePayload>(payload: &P) -> Result<(), Reason> {
    match payload.non_finite_channel() {
        Some(channel) => Err(Reason::InvalidPayload { channel }),
        None => Ok(()),
    }
}

/// Editing a trim anchor turns it into a user keyframe.
fn promote<P>(kf: &mut Keyframe<P>) {
    if kf.origin == Origin::Trim {
        kf.origin = Origin::User;
    }
}

/// Write `payload` over the keyframe at `index`.
fn overwrite<P>(track: &mut AnimationTrack<P>, index: usize, payload: P) {
    if let Some(kf) = track.get_mut(index) {
        kf.payload = payload;
        promote(kf);
    }
}

fn add_keyframe<P: KeyframePayload>(
    state: &mut EditorState<P>,
    frame: u64,
    mut payload: P,
    origin: Option<Origin>,
    config: &KeyframeConfig,
) -> Step {
    let (track, trim) = editable(state)?;
    let origin = origin.unwrap_or(Origin::User);
    if origin == Origin::Permanent {
        return Err(Reason::PermanentOriginReserved);
    }
    check_payload(&payload)?;
    check_target(track, trim, frame)?;
    payload.sanitize();

    match track.position(frame, config.frame_tolerance) {
        Some(index) => match config.duplicate_policy {
            DuplicatePolicy::Reject => Err(Reason::FrameOccupied { frame }),
            DuplicatePolicy::Coalesce => {
                overwrite(track, index, payload);
                Ok(Outcome::Applied)
            }
        },
        None => {
            track.insert(Keyframe::new(frame, origin, payload));
            Ok(Outcome::Applied)
        }
    }
}

fn update_keyframe<P: KeyframePayload>(
    state: &mut EditorState<P>,
    frame: u64,
    patch: &P::Patch,
    config: &KeyframeConfig,
) -> Step {
    let (track, trim) = editable(state)?;
    let Some(index) = track.position(frame, config.frame_tolerance) else {
        return Ok(Outcome::NoOp(Reason::NoKeyframeAtFrame { frame }));
    };
    let current = &track.keyframes()[index];
    check_target(track, trim, current.frame)?;

    let merged = current.payload.merged(patch);
    check_payload(&merged)?;
    overwrite(track, index, merged);
    Ok(Outcome::Applied)
}

fn remove_keyframe<P: KeyframePayload>(
    state: &mut EditorState<P>,
    frame: u64,
    config: &KeyframeConfig,
) -> Step {
    let (track, trim) = editable(state)?;
    let Some(index) = track.position(frame, config.frame_tolerance) else {
        return Ok(Outcome::NoOp(Reason::NoKeyframeAtFrame { frame }));
    };
    let target = &track.keyframes()[index];
    if !target.origin.is_user_deletable() {
        return Err(Reason::PermanentKeyframe {
            frame: target.frame,
        });
    }
    if trim.is_some() && target.origin == Origin::Trim {
        return Err(Reason::TrimBoundary {
            frame: target.frame,
        });
    }
    track.remove(index);
    Ok(Outcome::Applied)
}

fn move_keyframe<P: KeyframePayload>(
    state: &mut EditorState<P>,
    from: u64,
    to: u64,
    config: &KeyframeConfig,
) -> Step {
    let tolerance = config.frame_tolerance;
    let (track, trim) = editable(state)?;
    let Some(index) = track.position(from, tolerance) else {
        return Ok(Outcome::NoOp(Reason::NoKeyframeAtFrame { frame: from }));
    };
    let source = &track.keyframes()[index];
    if source.is_permanent() {
        return Err(Reason::PermanentKeyframe {
            frame: source.frame,
        });
    }
    if trim.is_some() && source.origin == Origin::Trim {
        return Err(Reason::TrimBoundary {
            frame: source.frame,
        });
    }
    check_target(track, trim, to)?;

    let mut moved = track.remove(index);
    match track.position(to, tolerance) {
        Some(target) => match config.duplicate_policy {
            DuplicatePolicy::Reject => Err(Reason::FrameOccupied { frame: to }),
            DuplicatePolicy::Coalesce => {
                overwrite(track, target, moved.payload);
                Ok(Outcome::Applied)
            }
        },
        None => {
            moved.frame = to;
            promote(&mut moved);
            track.insert(moved);
            Ok(Outcome::Applied)
        }
    }
}

fn delete_in_range<P: KeyframePayload>(state: &mut EditorState<P>, start: u64, end: u64) -> Step {
    let (track, trim) = editable(state)?;
    if start > end {
        return Err(Reason::InvalidRange { start, end });
    }
    let trimming = trim.is_some();
    let removed = track.extract_if(|kf| {
        kf.frame >= start
            && kf.frame <= end
            && !kf.is_permanent()
            && !(trimming && kf.origin == Origin::Trim)
    });
    if removed.is_empty() {
        return Ok(Outcome::NoOp(Reason::NothingInRange));
    }
    Ok(Outcome::Applied)
}

fn copy_keyframe<P: KeyframePayload>(
    state: &mut EditorState<P>,
    frame: u64,
    config: &KeyframeConfig,
) -> Step {
    let (track, _) = editable(state)?;
    let Some(kf) = track.find(frame, config.frame_tolerance) else {
        return Ok(Outcome::NoOp(Reason::NoKeyframeAtFrame { frame }));
    };
    let payload = kf.payload.clone();
    state.clipboard = Some(payload);
    Ok(Outcome::Applied)
}

fn paste_keyframe<P: KeyframePayload>(
    state: &mut EditorState<P>,
    frame: u64,
    config: &KeyframeConfig,
) -> Step {
    let Some(payload) = state.clipboard.clone() else {
        return match state.track {
            Some(_) => Ok(Outcome::NoOp(Reason::ClipboardEmpty)),
            None => Err(Reason::NotInitialized),
        };
    };
    let (track, trim) = editable(state)?;
    check_target(track, trim, frame)?;

    // Paste is always an upsert, whatever the duplicate policy says.
    match track.position(frame, config.frame_tolerance) {
        Some(index) => overwrite(track, index, payload),
        None => {
            track.insert(Keyframe::user(frame, payload));
        }
    }
    Ok(Outcome::Applied)
}

fn start_trim<P: KeyframePayload>(
    state: &mut EditorState<P>,
    start: u64,
    end: u64,
    config: &KeyframeConfig,
) -> Step {
    let (track, trim) = editable(state)?;
    if trim.is_some() {
        return Err(Reason::AlreadyTrimming);
    }
    // Both anchors must fit without colliding with each other.
    if start >= end || end - start <= config.frame_tolerance {
        return Err(Reason::InvalidRange { start, end });
    }
    let last = track.last_frame();
    if end > last {
        return Err(Reason::OutOfRange { frame: end, last });
    }

    let window = lifecycle::start_trim(track, start, end, config);
    state.trim = Some(window);
    Ok(Outcome::Applied)
}

fn end_trim<P: KeyframePayload>(
    state: &mut EditorState<P>,
    config: &KeyframeConfig,
) -> TouchlineResult<Step> {
    let EditorState { track, trim, .. } = state;
    let Some(track) = track.as_mut() else {
        return Ok(Err(Reason::NotInitialized));
    };
    let Some(window) = trim.take() else {
        return Ok(Ok(Outcome::NoOp(Reason::NotTrimming)));
    };
    lifecycle::end_trim(track, window, config.frame_tolerance)?;
    Ok(Ok(Outcome::Applied))
}

fn cleanup_trim<P: KeyframePayload>(
    state: &mut EditorState<P>,
    config: &KeyframeConfig,
) -> TouchlineResult<Step> {
    if state.trim.is_some() {
        return end_trim(state, config);
    }
    let Some(track) = state.track.as_mut() else {
        return Ok(Err(Reason::NotInitialized));
    };
    if lifecycle::strip_trim_keyframes(track) == 0 {
        return Ok(Ok(Outcome::NoOp(Reason::NoTrimKeyframes)));
    }
    Ok(Ok(Outcome::Applied))
}
