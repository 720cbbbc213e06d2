use crate::keyframe::{Keyframe, Origin};
use crate::payload::KeyframePayload;
use crate::track::AnimationTrack;

/// One structural problem found in a track.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("track must span at least two frames, got {total_frames}")]
    TooShort { total_frames: u64 },

    #[error("keyframe {index} at frame {frame} is not after frame {previous}")]
    Unsorted { index: usize, previous: u64, frame: u64 },

    #[error("keyframes at frames {first} and {second} are within tolerance {tolerance}")]
    Duplicate {
        first: u64,
        second: u64,
        tolerance: u64,
    },

    #[error("frame {frame} is outside the clip (last frame {last})")]
    OutOfRange { frame: u64, last: u64 },

    #[error("missing permanent keyframe at frame {frame}")]
    MissingBoundary { frame: u64 },

    #[error("permanent keyframe at frame {frame} is not a clip boundary")]
    StrayPermanent { frame: u64 },

    #[error("keyframe at frame {frame} has a non-finite {channel}")]
    NonFinite { frame: u64, channel: &'static str },
}

/// Validate a track for structural correctness.
pub fn validate_track<P: KeyframePayload>(
    track: &AnimationTrack<P>,
    tolerance: u64,
) -> Result<(), Vec<InvariantViolation>> {
    validate_keyframes(track.keyframes(), track.total_frames(), tolerance)
}

/// Validate a keyframe sequence against a clip length.
pub fn validate_keyframes<P: KeyframePayload>(
    keyframes: &[Keyframe<P>],
    total_frames: u64,
    tolerance: u64,
) -> Result<(), Vec<InvariantViolation>> {
    let mut errors = Vec::new();

    if total_frames < 2 {
        errors.push(InvariantViolation::TooShort { total_frames });
        return Err(errors);
    }
    let last = total_frames - 1;

    for (index, kf) in keyframes.iter().enumerate() {
        if kf.frame > last {
            errors.push(InvariantViolation::OutOfRange {
                frame: kf.frame,
                last,
            });
        }
        if let Some(channel) = kf.payload.non_finite_channel() {
            errors.push(InvariantViolation::NonFinite {
                frame: kf.frame,
                channel,
            });
        }
        if kf.origin == Origin::Permanent && kf.frame != 0 && kf.frame != last {
            errors.push(InvariantViolation::StrayPermanent { frame: kf.frame });
        }

        if index == 0 {
            continue;
        }
        let prev = &keyframes[index - 1];
        if kf.frame < prev.frame {
            errors.push(InvariantViolation::Unsorted {
                index,
                previous: prev.frame,
                frame: kf.frame,
            });
        } else if kf.frame - prev.frame <= tolerance && tolerance_applies(prev, kf) {
            errors.push(InvariantViolation::Duplicate {
                first: prev.frame,
                second: kf.frame,
                tolerance,
            });
        }
    }

    for boundary in [0, last] {
        let count = keyframes
            .iter()
            .filter(|kf| kf.frame == boundary && kf.origin == Origin::Permanent)
            .count();
        if count == 0 {
            errors.push(InvariantViolation::MissingBoundary { frame: boundary });
        } else if count > 1 {
            errors.push(InvariantViolation::Duplicate {
                first: boundary,
                second: boundary,
                tolerance,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// The two boundary keyframes may sit closer than the tolerance on very
/// short clips; every other pair is subject to it.
fn tolerance_applies<P>(a: &Keyframe<P>, b: &Keyframe<P>) -> bool {
    !(a.is_permanent() && b.is_permanent() && a.frame != b.frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::CropRect;

    fn kf(frame: u64, origin: Origin) -> Keyframe<CropRect> {
        Keyframe::new(frame, origin, CropRect::NORMALIZED_FULL)
    }

    #[test]
    fn test_valid_minimal_track() {
        let kfs = vec![kf(0, Origin::Permanent), kf(299, Origin::Permanent)];
        assert!(validate_keyframes(&kfs, 300, 0).is_ok());
    }

    #[test]
    fn test_two_frame_clip_with_tolerance() {
        let kfs = vec![kf(0, Origin::Permanent), kf(1, Origin::Permanent)];
        assert!(validate_keyframes(&kfs, 2, 5).is_ok());
    }

    #[test]
    fn test_too_short() {
        let kfs = vec![kf(0, Origin::Permanent)];
        let errs = validate_keyframes(&kfs, 1, 0).unwrap_err();
        assert_eq!(errs, vec![InvariantViolation::TooShort { total_frames: 1 }]);
    }

    #[test]
    fn test_unsorted() {
        let kfs = vec![
            kf(0, Origin::Permanent),
            kf(50, Origin::User),
            kf(20, Origin::User),
            kf(299, Origin::Permanent),
        ];
        let errs = validate_keyframes(&kfs, 300, 0).unwrap_err();
        assert!(errs
            .iter()
            .any(|e| matches!(e, InvariantViolation::Unsorted { index: 2, .. })));
    }

    #[test]
    fn test_duplicate_exact_and_within_tolerance() {
        let kfs = vec![
            kf(0, Origin::Permanent),
            kf(40, Origin::User),
            kf(40, Origin::Trim),
            kf(299, Origin::Permanent),
        ];
        let errs = validate_keyframes(&kfs, 300, 0).unwrap_err();
        assert!(errs
            .iter()
            .any(|e| matches!(e, InvariantViolation::Duplicate { first: 40, .. })));

        let kfs = vec![
            kf(0, Origin::Permanent),
            kf(40, Origin::User),
            kf(42, Origin::User),
            kf(299, Origin::Permanent),
        ];
        assert!(validate_keyframes(&kfs, 300, 1).is_ok());
        assert!(validate_keyframes(&kfs, 300, 2).is_err());
    }

    #[test]
    fn test_user_keyframe_near_boundary_collides() {
        let kfs = vec![
            kf(0, Origin::Permanent),
            kf(1, Origin::User),
            kf(299, Origin::Permanent),
        ];
        assert!(validate_keyframes(&kfs, 300, 1).is_err());
    }

    #[test]
    fn test_missing_and_stray_permanent() {
        let kfs = vec![kf(0, Origin::Permanent), kf(100, Origin::Permanent)];
        let errs = validate_keyframes(&kfs, 300, 0).unwrap_err();
        assert!(errs.contains(&InvariantViolation::MissingBoundary { frame: 299 }));
        assert!(errs.contains(&InvariantViolation::StrayPermanent { frame: 100 }));
    }

    #[test]
    fn test_out_of_range() {
        let kfs = vec![
            kf(0, Origin::Permanent),
            kf(299, Origin::Permanent),
            kf(300, Origin::User),
        ];
        let errs = validate_keyframes(&kfs, 300, 0).unwrap_err();
        assert!(errs.contains(&InvariantViolation::OutOfRange {
            frame: 300,
            last: 299
        }));
    }

    #[test]
    fn test_non_finite_payload() {
        let mut bad = kf(10, Origin::User);
        bad.payload.x = f64::NAN;
        let kfs = vec![kf(0, Origin::Permanent), bad, kf(299, Origin::Permanent)];
        let errs = validate_keyframes(&kfs, 300, 0).unwrap_err();
        assert!(errs.contains(&InvariantViolation::NonFinite {
            frame: 10,
            channel: "x"
        }));
    }
}
