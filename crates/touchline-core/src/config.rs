use serde::{Deserialize, Serialize};

use crate::error::{TouchlineError, TouchlineResult};

/// What `ADD_KEYFRAME` and `MOVE_KEYFRAME` do when the target frame is
/// already occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Merge the incoming payload into the existing keyframe.
    #[default]
    Coalesce,
    /// Refuse the action and report `frame_occupied`.
    Reject,
}

/// How the reducer reacts when an applied action leaves the track invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvariantPolicy {
    /// Return an error immediately.
    FailFast,
    /// Keep the previous state and report the action as rejected.
    Reject,
    /// Re-sort, dedupe and regenerate boundaries, then continue.
    Repair,
}

impl Default for InvariantPolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            InvariantPolicy::FailFast
        } else {
            InvariantPolicy::Reject
        }
    }
}

/// Fate of keyframes that fall outside an active trim range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrimRetention {
    /// Hide them while trimming and bring them back on `END_TRIM`.
    #[default]
    Restore,
    /// Drop them when the trim starts.
    Discard,
}

/// Blending used between two keyframes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMode {
    #[default]
    Linear,
    /// Cubic Hermite with Catmull-Rom tangents on position channels.
    Spline,
}

impl std::fmt::Display for InterpolationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterpolationMode::Linear => write!(f, "linear"),
            InterpolationMode::Spline => write!(f, "spline"),
        }
    }
}

impl std::str::FromStr for InterpolationMode {
    type Err = TouchlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(InterpolationMode::Linear),
            "spline" => Ok(InterpolationMode::Spline),
            other => Err(TouchlineError::InvalidArgument(format!(
                "unknown interpolation mode '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct KeyframeConfig {
    /// Two keyframes whose frames differ by at most this much collide.
    pub frame_tolerance: u64,
    pub duplicate_policy: DuplicatePolicy,
    pub invariant_policy: InvariantPolicy,
    pub trim_retention: TrimRetention,
    /// Maximum number of undo steps kept by an editor session.
    pub history_depth: usize,
    #[serde(skip)]
    pub interpolation: InterpolationMode,
}

impl Default for KeyframeConfig {
    fn default() -> Self {
        Self {
            frame_tolerance: 0,
            duplicate_policy: DuplicatePolicy::default(),
            invariant_policy: InvariantPolicy::default(),
            trim_retention: TrimRetention::default(),
            history_depth: 100,
            interpolation: InterpolationMode::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InterpolationConfig {
    pub mode: InterpolationMode,
    /// Upper bound on memoized samples per session.
    pub sampler_capacity: usize,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            mode: InterpolationMode::Linear,
            sampler_capacity: 512,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub keyframes: KeyframeConfig,
    #[serde(default)]
    pub interpolation: InterpolationConfig,
}

impl EngineConfig {
    pub fn load_from_file(path: &std::path::Path) -> TouchlineResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&contents)
            .map_err(|e| TouchlineError::config(e.to_string(), path))?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &std::path::Path) -> TouchlineResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| TouchlineError::config(e.to_string(), path))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Keyframe settings with the configured interpolation mode folded in,
    /// ready to hand to the reducer.
    pub fn reducer_config(&self) -> KeyframeConfig {
        KeyframeConfig {
            interpolation: self.interpolation.mode,
            ..self.keyframes.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.keyframes.frame_tolerance, 0);
        assert_eq!(config.keyframes.duplicate_policy, DuplicatePolicy::Coalesce);
        assert_eq!(config.keyframes.trim_retention, TrimRetention::Restore);
        assert_eq!(config.interpolation.mode, InterpolationMode::Linear);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [keyframes]
            frame_tolerance = 2
            duplicate_policy = "reject"

            [interpolation]
            mode = "spline"
            "#,
        )
        .unwrap();
        assert_eq!(config.keyframes.frame_tolerance, 2);
        assert_eq!(config.keyframes.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(config.keyframes.history_depth, 100);
        assert_eq!(config.interpolation.sampler_capacity, 512);

        let reducer = config.reducer_config();
        assert_eq!(reducer.interpolation, InterpolationMode::Spline);
        assert_eq!(reducer.frame_tolerance, 2);
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let result: Result<EngineConfig, _> = toml::from_str(
            r#"
            [keyframes]
            invariant_policy = "shrug"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_interpolation_mode_from_str() {
        assert_eq!(
            "spline".parse::<InterpolationMode>().unwrap(),
            InterpolationMode::Spline
        );
        assert!("cubic".parse::<InterpolationMode>().is_err());
    }
}
