//! Stateful wrapper around the reducer for one animated property of one clip.

use touchline_core::{
    EngineConfig, KeyframeConfig, Timestamp, TouchlineError, TouchlineResult, VideoMetadata,
};
use uuid::Uuid;

use crate::action::{Action, Outcome};
use crate::history::History;
use crate::interpolate::FrameSampler;
use crate::payload::KeyframePayload;
use crate::persist::{serialize_track, KeyframeRecord, PersistFilter};
use crate::reducer::{reduce, EditorState, Phase};
use crate::track::AnimationTrack;

/// Where the keyframes of a freshly loaded clip came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Restored,
    Defaults,
}

/// Owns the editor state, undo history and sample cache for one track.
#[derive(Debug, Clone)]
pub struct EditorSession<P: KeyframePayload> {
    id: Uuid,
    state: EditorState<P>,
    config: KeyframeConfig,
    sampler: FrameSampler<P>,
    history: History<P>,
    metadata: Option<VideoMetadata>,
}

impl<P: KeyframePayload> EditorSession<P> {
    pub fn new(engine: &EngineConfig) -> Self {
        let config = engine.reducer_config();
        Self {
            id: Uuid::new_v4(),
            state: EditorState::new(),
            sampler: FrameSampler::new(config.interpolation, engine.interpolation.sampler_capacity),
            history: History::new(config.history_depth),
            config,
            metadata: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &EditorState<P> {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn track(&self) -> Option<&AnimationTrack<P>> {
        self.state.track()
    }

    pub fn config(&self) -> &KeyframeConfig {
        &self.config
    }

    pub fn metadata(&self) -> Option<&VideoMetadata> {
        self.metadata.as_ref()
    }

    /// Run one action through the reducer and record it for undo.
    pub fn dispatch(&mut self, action: Action<P>) -> TouchlineResult<Outcome> {
        let name = action.name();
        let replaces_track = action.replaces_track();
        let transition = reduce(&self.state, action, &self.config)?;
        let outcome = transition.outcome;

        match &outcome {
            Outcome::Applied => {
                let previous = std::mem::replace(&mut self.state, transition.state);
                if replaces_track {
                    self.history.clear();
                } else if previous.track() != self.state.track()
                    || previous.trim() != self.state.trim()
                {
                    self.history.push(name, previous.snapshot());
                }
                tracing::debug!(
                    session = %self.id,
                    action = name,
                    revision = self.state.revision(),
                    "action applied"
                );
            }
            Outcome::NoOp(reason) => {
                tracing::debug!(
                    session = %self.id,
                    action = name,
                    reason = reason.code(),
                    "action had no effect"
                );
            }
            Outcome::Rejected(reason) => {
                tracing::warn!(
                    session = %self.id,
                    action = name,
                    reason = reason.code(),
                    "action rejected: {}",
                    reason
                );
            }
        }

        Ok(outcome)
    }

    /// Start a fresh track with the default boundary payloads for `meta`.
    pub fn initialize_from_metadata(&mut self, meta: VideoMetadata) -> TouchlineResult<Outcome> {
        let default = P::boundary_default(&meta);
        self.initialize_with(meta, default.clone(), default)
    }

    pub fn initialize_with(
        &mut self,
        meta: VideoMetadata,
        start: P,
        end: P,
    ) -> TouchlineResult<Outcome> {
        let outcome = self.dispatch(Action::Initialize {
            total_frames: meta.total_frames,
            start,
            end,
        })?;
        self.metadata = Some(meta);
        Ok(outcome)
    }

    /// Load persisted keyframes for a clip. Fails without touching the
    /// current state if the records cannot be restored.
    pub fn restore(
        &mut self,
        meta: VideoMetadata,
        records: Vec<KeyframeRecord<P>>,
    ) -> TouchlineResult<Outcome> {
        let outcome = self.dispatch(Action::RestoreKeyframes {
            total_frames: meta.total_frames,
            keyframes: records,
        })?;
        self.metadata = Some(meta);
        Ok(outcome)
    }

    /// Load persisted keyframes for a clip, falling back to a fresh track
    /// when there are none or they cannot be restored.
    pub fn restore_or_initialize(
        &mut self,
        meta: VideoMetadata,
        records: Vec<KeyframeRecord<P>>,
    ) -> TouchlineResult<LoadSource> {
        if records.is_empty() {
            self.initialize_from_metadata(meta)?;
            return Ok(LoadSource::Defaults);
        }

        match self.restore(meta, records) {
            Ok(_) => Ok(LoadSource::Restored),
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "restore failed, using defaults");
                self.initialize_from_metadata(meta)?;
                Ok(LoadSource::Defaults)
            }
        }
    }

    /// Start a trim given in source seconds.
    pub fn start_trim_seconds(&mut self, start: f64, end: f64) -> TouchlineResult<Outcome> {
        let meta = self.metadata.as_ref().ok_or_else(|| {
            TouchlineError::InvalidArgument("no video metadata loaded".to_string())
        })?;
        let start = meta.frame_at(Timestamp::from_seconds(start));
        let end = meta.frame_at(Timestamp::from_seconds(end));
        self.dispatch(Action::StartTrim { start, end })
    }

    /// Interpolated payload at `frame`, memoized per state revision.
    pub fn sample(&mut self, frame: u64) -> Option<P> {
        let track = self.state.track()?;
        self.sampler.sample(self.state.revision(), track, frame)
    }

    /// Interpolated payload at a source time in seconds.
    pub fn sample_at(&mut self, seconds: f64) -> Option<P> {
        let frame = self.metadata.as_ref()?.frame_at(Timestamp::from_seconds(seconds));
        self.sample(frame)
    }

    /// Records to hand to the host for storage. Keyframes hidden by an
    /// active trim are included; see [`EditorState::storable_track`].
    pub fn persisted(&self, filter: PersistFilter) -> TouchlineResult<Vec<KeyframeRecord<P>>> {
        let track = self
            .state
            .storable_track(filter, self.config.frame_tolerance)?
            .ok_or_else(|| TouchlineError::InvalidArgument("no track loaded".to_string()))?;
        Ok(serialize_track(&track, filter))
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo(self.state.snapshot()) {
            Some(snapshot) => {
                self.state.restore_snapshot(snapshot);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo(self.state.snapshot()) {
            Some(snapshot) => {
                self.state.restore_snapshot(snapshot);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Fold every applied action until `end_batch` into one undo step.
    pub fn begin_batch(&mut self, label: &str) -> bool {
        self.history.begin_batch(label, self.state.snapshot())
    }

    pub fn end_batch(&mut self) -> bool {
        self.history.end_batch()
    }
}
