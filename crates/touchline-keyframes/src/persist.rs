//! Persisted keyframe records and the track document format.

use serde::{Deserialize, Serialize};
use touchline_core::{FrameRate, TouchlineError, TouchlineResult};

use crate::keyframe::{Keyframe, Origin};
use crate::lifecycle::ensure_boundaries;
use crate::payload::{CropRect, HighlightEllipse, KeyframePayload, PayloadKind};
use crate::track::AnimationTrack;
use crate::validate::{validate_keyframes, validate_track, InvariantViolation};

/// A keyframe as stored by the host. `origin` is optional on the wire so a
/// record missing it can be reported rather than silently defaulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyframeRecord<P> {
    pub frame: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
    #[serde(flatten)]
    pub payload: P,
}

impl<P: Clone> From<&Keyframe<P>> for KeyframeRecord<P> {
    fn from(kf: &Keyframe<P>) -> Self {
        Self {
            frame: kf.frame,
            origin: Some(kf.origin),
            payload: kf.payload.clone(),
        }
    }
}

/// Which keyframes to write out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PersistFilter {
    /// Everything, including permanent keyframes. Lossless.
    #[default]
    All,
    /// Only user keyframes; permanent ones are rebuilt from metadata.
    UserOnly,
    /// User keyframes plus trim anchors, for committing a trim.
    UserAndTrim,
}

impl PersistFilter {
    fn keeps(self, origin: Origin) -> bool {
        match self {
            PersistFilter::All => true,
            PersistFilter::UserOnly => origin == Origin::User,
            PersistFilter::UserAndTrim => matches!(origin, Origin::User | Origin::Trim),
        }
    }
}

/// Records for `track`, in frame order.
pub fn serialize_track<P: KeyframePayload>(
    track: &AnimationTrack<P>,
    filter: PersistFilter,
) -> Vec<KeyframeRecord<P>> {
    track
        .keyframes()
        .iter()
        .filter(|kf| filter.keeps(kf.origin))
        .map(KeyframeRecord::from)
        .collect()
}

/// Parse records from JSON. Any shape problem (missing field, fractional or
/// negative frame) fails the whole batch.
pub fn records_from_json<P: KeyframePayload>(
    value: serde_json::Value,
) -> TouchlineResult<Vec<KeyframeRecord<P>>> {
    serde_json::from_value(value).map_err(|e| TouchlineError::MalformedPayload(e.to_string()))
}

pub fn records_from_str<P: KeyframePayload>(json: &str) -> TouchlineResult<Vec<KeyframeRecord<P>>> {
    serde_json::from_str(json).map_err(|e| TouchlineError::MalformedPayload(e.to_string()))
}

/// Rebuild a track from persisted records.
///
/// Records must already be sorted and collision-free; nothing is silently
/// reordered. Missing permanent boundaries are rebuilt from the nearest
/// restored values. Any failure rejects the whole restore.
pub(crate) fn restore_track<P: KeyframePayload>(
    total_frames: u64,
    records: Vec<KeyframeRecord<P>>,
    tolerance: u64,
) -> TouchlineResult<AnimationTrack<P>> {
    if total_frames < 2 {
        return Err(TouchlineError::InvalidArgument(format!(
            "a track needs at least two frames, got {}",
            total_frames
        )));
    }
    if records.is_empty() {
        return Err(TouchlineError::MalformedPayload(
            "no keyframes to restore".into(),
        ));
    }

    let mut keyframes = Vec::with_capacity(records.len());
    for record in records {
        let origin = record.origin.ok_or_else(|| {
            TouchlineError::Invariant(format!("keyframe at frame {} has no origin", record.frame))
        })?;
        if let Some(channel) = record.payload.non_finite_channel() {
            return Err(TouchlineError::MalformedPayload(format!(
                "keyframe at frame {} has a non-finite {}",
                record.frame, channel
            )));
        }
        let mut payload = record.payload;
        payload.sanitize();
        keyframes.push(Keyframe::new(record.frame, origin, payload));
    }

    if let Err(errors) = validate_keyframes(&keyframes, total_frames, tolerance) {
        let structural: Vec<InvariantViolation> = errors
            .into_iter()
            .filter(|e| !matches!(e, InvariantViolation::MissingBoundary { .. }))
            .collect();
        if !structural.is_empty() {
            return Err(TouchlineError::invariant(structural));
        }
    }

    let mut track = AnimationTrack::from_parts(total_frames, keyframes);
    ensure_boundaries(&mut track, tolerance)?;
    validate_track(&track, tolerance).map_err(TouchlineError::invariant)?;
    Ok(track)
}

/// On-disk form of one track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackFile<P> {
    pub total_frames: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framerate: Option<FrameRate>,
    pub keyframes: Vec<KeyframeRecord<P>>,
}

impl<P: KeyframePayload> TrackFile<P> {
    pub fn from_track(
        track: &AnimationTrack<P>,
        framerate: Option<FrameRate>,
        filter: PersistFilter,
    ) -> Self {
        Self {
            total_frames: track.total_frames(),
            framerate,
            keyframes: serialize_track(track, filter),
        }
    }
}

/// A track file tagged with the property it animates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackDocument {
    Crop(TrackFile<CropRect>),
    Highlight(TrackFile<HighlightEllipse>),
}

impl TrackDocument {
    pub fn kind(&self) -> PayloadKind {
        match self {
            TrackDocument::Crop(_) => PayloadKind::Crop,
            TrackDocument::Highlight(_) => PayloadKind::Highlight,
        }
    }

    pub fn from_json(json: &str) -> TouchlineResult<Self> {
        serde_json::from_str(json).map_err(|e| TouchlineError::MalformedPayload(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> TouchlineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::seed_boundaries;
    use serde_json::json;

    fn sample_track() -> AnimationTrack<CropRect> {
        let mut track =
            seed_boundaries(300, CropRect::NORMALIZED_FULL, CropRect::NORMALIZED_FULL).unwrap();
        track.insert(Keyframe::user(150, CropRect::new(0.5, 0.5, 0.5, 0.5)));
        track.insert(Keyframe::new(200, Origin::Trim, CropRect::new(0.1, 0.1, 0.9, 0.9)));
        track
    }

    #[test]
    fn test_filters() {
        let track = sample_track();
        assert_eq!(serialize_track(&track, PersistFilter::All).len(), 4);
        assert_eq!(serialize_track(&track, PersistFilter::UserOnly).len(), 1);
        assert_eq!(serialize_track(&track, PersistFilter::UserAndTrim).len(), 2);
    }

    #[test]
    fn test_restore_all_is_lossless() {
        let track = sample_track();
        let records = serialize_track(&track, PersistFilter::All);
        let restored = restore_track(300, records, 0).unwrap();
        assert_eq!(restored, track);
    }

    #[test]
    fn test_restore_user_only_rebuilds_boundaries() {
        let track = sample_track();
        let records = serialize_track(&track, PersistFilter::UserOnly);
        let restored = restore_track(300, records, 0).unwrap();
        assert_eq!(restored.len(), 3);
        assert_eq!(restored.first().unwrap().origin, Origin::Permanent);
        assert_eq!(restored.first().unwrap().payload, CropRect::new(0.5, 0.5, 0.5, 0.5));
    }

    #[test]
    fn test_restore_rejects_missing_origin() {
        let records: Vec<KeyframeRecord<CropRect>> = records_from_json(json!([
            {"frame": 0, "origin": "permanent", "x": 0.0, "y": 0.0, "width": 1.0, "height": 1.0},
            {"frame": 10, "x": 0.0, "y": 0.0, "width": 1.0, "height": 1.0},
        ]))
        .unwrap();
        let err = restore_track(300, records, 0).unwrap_err();
        assert!(matches!(err, TouchlineError::Invariant(_)));
    }

    #[test]
    fn test_non_integer_frame_is_malformed() {
        let result: TouchlineResult<Vec<KeyframeRecord<CropRect>>> = records_from_json(json!([
            {"frame": 1.5, "origin": "user", "x": 0.0, "y": 0.0, "width": 1.0, "height": 1.0},
        ]));
        assert!(matches!(result, Err(TouchlineError::MalformedPayload(_))));

        let result: TouchlineResult<Vec<KeyframeRecord<CropRect>>> = records_from_json(json!([
            {"frame": 3, "origin": "user", "x": 0.0, "y": 0.0, "width": 1.0},
        ]));
        assert!(matches!(result, Err(TouchlineError::MalformedPayload(_))));
    }

    #[test]
    fn test_restore_rejects_unsorted() {
        let records = vec![
            KeyframeRecord {
                frame: 100,
                origin: Some(Origin::User),
                payload: CropRect::NORMALIZED_FULL,
            },
            KeyframeRecord {
                frame: 50,
                origin: Some(Origin::User),
                payload: CropRect::NORMALIZED_FULL,
            },
        ];
        assert!(restore_track(300, records, 0).is_err());
    }

    #[test]
    fn test_restore_rejects_empty_and_out_of_range() {
        assert!(restore_track::<CropRect>(300, Vec::new(), 0).is_err());
        let records = vec![KeyframeRecord {
            frame: 400,
            origin: Some(Origin::User),
            payload: CropRect::NORMALIZED_FULL,
        }];
        assert!(restore_track(300, records, 0).is_err());
    }

    #[test]
    fn test_document_is_tagged_by_kind() {
        let doc = TrackDocument::Crop(TrackFile::from_track(
            &sample_track(),
            Some(FrameRate::new(30.0).unwrap()),
            PersistFilter::All,
        ));
        let json = doc.to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["kind"], "crop");
        assert_eq!(value["totalFrames"], 300);
        assert_eq!(value["keyframes"][1]["origin"], "user");

        let back = TrackDocument::from_json(&json).unwrap();
        assert_eq!(back, doc);
        assert_eq!(back.kind(), PayloadKind::Crop);
    }
}
