//! Origin lifecycle: permanent clip boundaries and trim-boundary keyframes.
//!
//! Kept apart from the reducer so the reducer only deals with generic
//! keyframe edits while this module owns the rules about which keyframes
//! must exist, which are synthesized, and which get hidden during a trim.

use touchline_core::{
    InterpolationMode, KeyframeConfig, TouchlineError, TouchlineResult, TrimRetention,
};

use crate::interpolate::interpolate;
use crate::keyframe::{Keyframe, Origin};
use crate::payload::KeyframePayload;
use crate::track::AnimationTrack;

/// An active trim range and the keyframes it is hiding.
#[derive(Debug, Clone, PartialEq)]
pub struct TrimWindow<P> {
    pub start: u64,
    pub end: u64,
    /// Keyframes outside the range, kept for `END_TRIM` when the retention
    /// policy is `restore`.
    pub hidden: Vec<Keyframe<P>>,
}

impl<P> TrimWindow<P> {
    pub fn contains(&self, frame: u64) -> bool {
        frame >= self.start && frame <= self.end
    }
}

/// Fresh track holding only the two permanent boundary keyframes.
pub fn seed_boundaries<P: KeyframePayload>(
    total_frames: u64,
    mut start: P,
    mut end: P,
) -> TouchlineResult<AnimationTrack<P>> {
    if total_frames < 2 {
        return Err(TouchlineError::InvalidArgument(format!(
            "a track needs at least two frames, got {}",
            total_frames
        )));
    }
    for payload in [&start, &end] {
        if let Some(channel) = payload.non_finite_channel() {
            return Err(TouchlineError::InvalidArgument(format!(
                "boundary payload has a non-finite {}",
                channel
            )));
        }
    }
    start.sanitize();
    end.sanitize();
    Ok(AnimationTrack::from_parts(
        total_frames,
        vec![
            Keyframe::permanent(0, start),
            Keyframe::permanent(total_frames - 1, end),
        ],
    ))
}

/// Make sure both clip boundaries carry a permanent keyframe.
///
/// A keyframe already at (or within tolerance of) a boundary is snapped
/// onto it and promoted; otherwise one is synthesized from the value the
/// track currently shows at that frame. Returns whether anything changed.
pub(crate) fn ensure_boundaries<P: KeyframePayload>(
    track: &mut AnimationTrack<P>,
    tolerance: u64,
) -> TouchlineResult<bool> {
    let last = track.last_frame();
    let mut changed = false;

    for boundary in [0, last] {
        if track
            .get(boundary)
            .is_some_and(|kf| kf.origin == Origin::Permanent)
        {
            continue;
        }
        // On very short clips the opposite boundary can sit within tolerance;
        // it must stay where it is.
        let nearby = track
            .position(boundary, tolerance)
            .filter(|&i| !track.keyframes()[i].is_permanent());
        match nearby {
            Some(index) => {
                let mut kf = track.remove(index);
                kf.frame = boundary;
                kf.origin = Origin::Permanent;
                track.insert(kf);
            }
            None => {
                let payload =
                    interpolate(track.keyframes(), boundary as f64, InterpolationMode::Linear)
                        .ok_or_else(|| {
                            TouchlineError::Invariant(format!(
                                "cannot rebuild boundary at frame {} on an empty track",
                                boundary
                            ))
                        })?;
                track.insert(Keyframe::permanent(boundary, payload));
            }
        }
        changed = true;
    }

    Ok(changed)
}

/// Enter trimming: anchor both cut points and hide what lies outside.
pub(crate) fn start_trim<P: KeyframePayload>(
    track: &mut AnimationTrack<P>,
    start: u64,
    end: u64,
    config: &KeyframeConfig,
) -> TrimWindow<P> {
    let tolerance = config.frame_tolerance;

    // Sample both cut points before anything moves so the synthesized
    // keyframes reproduce exactly what was on screen.
    let anchors: Vec<Keyframe<P>> = [start, end]
        .into_iter()
        .filter(|frame| !track.contains(*frame, tolerance))
        .filter_map(|frame| {
            interpolate(track.keyframes(), frame as f64, config.interpolation)
                .map(|payload| Keyframe::new(frame, Origin::Trim, payload))
        })
        .collect();
    for anchor in anchors {
        track.insert(anchor);
    }

    let outside = track.extract_if(|kf| {
        !kf.is_permanent()
            && (kf.frame.saturating_add(tolerance) < start
                || kf.frame > end.saturating_add(tolerance))
    });

    let hidden = match config.trim_retention {
        TrimRetention::Restore => outside,
        TrimRetention::Discard => Vec::new(),
    };

    TrimWindow { start, end, hidden }
}

/// Leave trimming: drop the trim anchors, bring hidden keyframes back and
/// re-check the boundaries.
pub(crate) fn end_trim<P: KeyframePayload>(
    track: &mut AnimationTrack<P>,
    window: TrimWindow<P>,
    tolerance: u64,
) -> TouchlineResult<()> {
    strip_trim_keyframes(track);

    for kf in window.hidden {
        // Edits made while trimming win over what was hidden.
        if !track.contains(kf.frame, tolerance) {
            track.insert(kf);
        }
    }

    ensure_boundaries(track, tolerance)?;
    Ok(())
}

/// Remove every trim-origin keyframe. Returns how many were removed.
pub(crate) fn strip_trim_keyframes<P>(track: &mut AnimationTrack<P>) -> usize {
    track.extract_if(|kf| kf.origin == Origin::Trim).len()
}

/// Bring an invalid track back into shape: clamp to range, demote stray
/// permanent keyframes, sort, collapse collisions and rebuild boundaries.
pub(crate) fn repair<P: KeyframePayload>(
    track: &mut AnimationTrack<P>,
    tolerance: u64,
) -> TouchlineResult<()> {
    let last = track.last_frame();
    let keyframes = track.keyframes_mut();

    keyframes.retain(|kf| kf.frame <= last && kf.payload.non_finite_channel().is_none());
    for kf in keyframes.iter_mut() {
        if kf.origin == Origin::Permanent && kf.frame != 0 && kf.frame != last {
            kf.origin = Origin::User;
        }
    }
    keyframes.sort_by_key(|kf| kf.frame);

    let mut collapsed: Vec<Keyframe<P>> = Vec::with_capacity(keyframes.len());
    for kf in keyframes.drain(..) {
        match collapsed.last_mut() {
            Some(prev)
                if kf.frame - prev.frame <= tolerance
                    && !(prev.is_permanent() && kf.is_permanent() && prev.frame != kf.frame) =>
            {
                if kf.origin.priority() >= prev.origin.priority() {
                    *prev = kf;
                }
            }
            _ => collapsed.push(kf),
        }
    }
    *keyframes = collapsed;

    ensure_boundaries(track, tolerance)?;
    Ok(())
}
