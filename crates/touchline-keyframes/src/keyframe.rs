use serde::{Deserialize, Serialize};

/// Provenance of a keyframe. Controls whether it can be deleted and whether
/// it is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Clip boundary keyframe at the first or last frame. Never deletable.
    Permanent,
    /// Placed by the user.
    User,
    /// Synthesized at a trim boundary; removed when trimming ends.
    Trim,
}

impl Origin {
    /// Whether `REMOVE_KEYFRAME` may delete a keyframe of this origin
    /// outside of an active trim.
    pub fn is_user_deletable(self) -> bool {
        !matches!(self, Origin::Permanent)
    }

    /// Tie-break rank when two keyframes compete for the same frame.
    pub(crate) fn priority(self) -> u8 {
        match self {
            Origin::Permanent => 2,
            Origin::User => 1,
            Origin::Trim => 0,
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Permanent => write!(f, "permanent"),
            Origin::User => write!(f, "user"),
            Origin::Trim => write!(f, "trim"),
        }
    }
}

/// A payload pinned to a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe<P> {
    /// Authoritative position, in frames from the start of the clip.
    pub frame: u64,
    pub origin: Origin,
    #[serde(flatten)]
    pub payload: P,
}

impl<P> Keyframe<P> {
    pub fn new(frame: u64, origin: Origin, payload: P) -> Self {
        Self {
            frame,
            origin,
            payload,
        }
    }

    pub fn user(frame: u64, payload: P) -> Self {
        Self::new(frame, Origin::User, payload)
    }

    pub fn permanent(frame: u64, payload: P) -> Self {
        Self::new(frame, Origin::Permanent, payload)
    }

    pub fn is_permanent(&self) -> bool {
        self.origin == Origin::Permanent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::CropRect;

    #[test]
    fn test_origin_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Origin::Permanent).unwrap(), "\"permanent\"");
        let o: Origin = serde_json::from_str("\"trim\"").unwrap();
        assert_eq!(o, Origin::Trim);
        assert!(serde_json::from_str::<Origin>("\"auto\"").is_err());
    }

    #[test]
    fn test_only_permanent_is_protected() {
        assert!(!Origin::Permanent.is_user_deletable());
        assert!(Origin::User.is_user_deletable());
        assert!(Origin::Trim.is_user_deletable());
    }

    #[test]
    fn test_keyframe_flattens_payload() {
        let kf = Keyframe::user(12, CropRect::new(0.1, 0.2, 0.3, 0.4));
        let json = serde_json::to_value(&kf).unwrap();
        assert_eq!(json["frame"], 12);
        assert_eq!(json["origin"], "user");
        assert_eq!(json["width"], 0.3);
    }
}
