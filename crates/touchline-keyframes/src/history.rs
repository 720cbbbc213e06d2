//! Snapshot-based undo/redo for an editor session.
//!
//! Each entry holds the track and trim window as they were *before* an
//! applied action. The clipboard is not part of a snapshot, so undo never
//! loses a copied payload.
//!
//! ```ignore
//! history.begin_batch("drag", state.snapshot());
//! // many MOVE_KEYFRAME / UPDATE_KEYFRAME dispatches, pushes are folded
//! history.end_batch();
//! ```

use std::collections::VecDeque;

use crate::lifecycle::TrimWindow;
use crate::track::AnimationTrack;

/// Track and trim window at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<P> {
    pub(crate) track: Option<AnimationTrack<P>>,
    pub(crate) trim: Option<TrimWindow<P>>,
}

impl<P> Snapshot<P> {
    pub fn track(&self) -> Option<&AnimationTrack<P>> {
        self.track.as_ref()
    }

    pub fn trim(&self) -> Option<&TrimWindow<P>> {
        self.trim.as_ref()
    }
}

#[derive(Debug, Clone)]
pub struct HistoryEntry<P> {
    /// Action name or batch label.
    pub label: String,
    pub snapshot: Snapshot<P>,
}

#[derive(Debug, Clone)]
struct Batch<P> {
    label: String,
    before: Snapshot<P>,
    dirty: bool,
}

/// Bounded undo and redo stacks.
#[derive(Debug, Clone)]
pub struct History<P> {
    undo_stack: VecDeque<HistoryEntry<P>>,
    redo_stack: Vec<HistoryEntry<P>>,
    max_entries: usize,
    batch: Option<Batch<P>>,
}

impl<P: Clone> History<P> {
    pub fn new(max_entries: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_entries,
            batch: None,
        }
    }

    /// Record the state before an applied action. Clears the redo stack.
    /// Inside a batch the push is folded into the batch entry.
    pub fn push(&mut self, label: &str, before: Snapshot<P>) {
        self.redo_stack.clear();

        if let Some(batch) = self.batch.as_mut() {
            batch.dirty = true;
            tracing::trace!(label, batch = %batch.label, "history push folded into batch");
            return;
        }

        self.push_entry(HistoryEntry {
            label: label.to_string(),
            snapshot: before,
        });
    }

    fn push_entry(&mut self, entry: HistoryEntry<P>) {
        if self.max_entries == 0 {
            return;
        }
        self.undo_stack.push_back(entry);
        while self.undo_stack.len() > self.max_entries {
            self.undo_stack.pop_front();
        }
        tracing::debug!(undo_depth = self.undo_stack.len(), "history entry pushed");
    }

    /// Step back. `current` is saved for redo; the returned snapshot is the
    /// state to restore.
    pub fn undo(&mut self, current: Snapshot<P>) -> Option<Snapshot<P>> {
        self.close_stuck_batch();
        let entry = self.undo_stack.pop_back()?;
        tracing::debug!(label = %entry.label, undo_remaining = self.undo_stack.len(), "undo");
        self.redo_stack.push(HistoryEntry {
            label: entry.label,
            snapshot: current,
        });
        Some(entry.snapshot)
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self, current: Snapshot<P>) -> Option<Snapshot<P>> {
        self.close_stuck_batch();
        let entry = self.redo_stack.pop()?;
        tracing::debug!(label = %entry.label, redo_remaining = self.redo_stack.len(), "redo");
        self.push_entry(HistoryEntry {
            label: entry.label,
            snapshot: current,
        });
        Some(entry.snapshot)
    }

    /// Start collapsing pushes into one entry. Returns `false` if a batch is
    /// already open.
    pub fn begin_batch(&mut self, label: &str, before: Snapshot<P>) -> bool {
        if self.in_batch() {
            return false;
        }
        self.batch = Some(Batch {
            label: label.to_string(),
            before,
            dirty: false,
        });
        true
    }

    /// Close the open batch. Returns whether an undo entry was recorded.
    pub fn end_batch(&mut self) -> bool {
        match self.batch.take() {
            Some(batch) if batch.dirty => {
                self.push_entry(HistoryEntry {
                    label: batch.label,
                    snapshot: batch.before,
                });
                true
            }
            _ => false,
        }
    }

    pub fn in_batch(&self) -> bool {
        self.batch.is_some()
    }

    fn close_stuck_batch(&mut self) {
        if self.in_batch() {
            tracing::warn!("ending open history batch before undo/redo");
            self.end_batch();
        }
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.batch = None;
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    /// Label of the step `undo` would revert.
    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.back().map(|e| e.label.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyframe::Keyframe;
    use crate::lifecycle::seed_boundaries;
    use crate::payload::CropRect;

    fn snap(extra: Option<u64>) -> Snapshot<CropRect> {
        let mut track =
            seed_boundaries(300, CropRect::NORMALIZED_FULL, CropRect::NORMALIZED_FULL).unwrap();
        if let Some(frame) = extra {
            track.insert(Keyframe::user(frame, CropRect::NORMALIZED_FULL));
        }
        Snapshot {
            track: Some(track),
            trim: None,
        }
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut history = History::new(10);
        history.push("ADD_KEYFRAME", snap(None));

        let restored = history.undo(snap(Some(10))).unwrap();
        assert_eq!(restored, snap(None));
        assert!(history.can_redo());

        let again = history.redo(restored).unwrap();
        assert_eq!(again, snap(Some(10)));
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_push_clears_redo() {
        let mut history = History::new(10);
        history.push("a", snap(None));
        history.undo(snap(Some(1)));
        assert!(history.can_redo());
        history.push("b", snap(None));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_depth_is_bounded() {
        let mut history = History::new(3);
        for i in 0..5 {
            history.push("step", snap(Some(i + 1)));
        }
        assert_eq!(history.undo_len(), 3);
        // Oldest entries were dropped.
        let oldest = (0..3).filter_map(|_| history.undo(snap(None))).last();
        assert_eq!(oldest, Some(snap(Some(3))));
    }

    #[test]
    fn test_batch_collapses_pushes() {
        let mut history = History::new(10);
        assert!(history.begin_batch("drag", snap(None)));
        assert!(!history.begin_batch("nested", snap(None)));
        for i in 0..4 {
            history.push("MOVE_KEYFRAME", snap(Some(i + 1)));
        }
        assert_eq!(history.undo_len(), 0);
        assert!(history.end_batch());
        assert_eq!(history.undo_len(), 1);
        assert_eq!(history.undo_label(), Some("drag"));
        assert_eq!(history.undo(snap(Some(4))), Some(snap(None)));
    }

    #[test]
    fn test_empty_batch_records_nothing() {
        let mut history: History<CropRect> = History::new(10);
        history.begin_batch("drag", snap(None));
        assert!(!history.end_batch());
        assert!(!history.can_undo());
    }

    #[test]
    fn test_undo_on_empty_returns_none() {
        let mut history: History<CropRect> = History::new(10);
        assert!(history.undo(snap(None)).is_none());
        assert!(history.redo(snap(None)).is_none());
    }
}
