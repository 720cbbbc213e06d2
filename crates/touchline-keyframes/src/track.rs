use crate::keyframe::{Keyframe, Origin};

/// Ordered keyframes animating one property of one clip.
///
/// The public surface is read-only. Mutation goes through the reducer, which
/// re-validates the track after every action.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationTrack<P> {
    keyframes: Vec<Keyframe<P>>,
    total_frames: u64,
}

impl<P> AnimationTrack<P> {
    pub(crate) fn from_parts(total_frames: u64, keyframes: Vec<Keyframe<P>>) -> Self {
        Self {
            keyframes,
            total_frames,
        }
    }

    pub fn keyframes(&self) -> &[Keyframe<P>] {
        &self.keyframes
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn last_frame(&self) -> u64 {
        self.total_frames.saturating_sub(1)
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    pub fn first(&self) -> Option<&Keyframe<P>> {
        self.keyframes.first()
    }

    pub fn last(&self) -> Option<&Keyframe<P>> {
        self.keyframes.last()
    }

    /// Keyframe exactly at `frame`.
    pub fn get(&self, frame: u64) -> Option<&Keyframe<P>> {
        self.keyframes
            .binary_search_by_key(&frame, |kf| kf.frame)
            .ok()
            .map(|i| &self.keyframes[i])
    }

    /// Index of the keyframe closest to `frame` within `tolerance`.
    pub fn position(&self, frame: u64, tolerance: u64) -> Option<usize> {
        let lo = frame.saturating_sub(tolerance);
        let hi = frame.saturating_add(tolerance);
        let start = self.keyframes.partition_point(|kf| kf.frame < lo);
        self.keyframes[start..]
            .iter()
            .take_while(|kf| kf.frame <= hi)
            .enumerate()
            .min_by_key(|(_, kf)| kf.frame.abs_diff(frame))
            .map(|(offset, _)| start + offset)
    }

    /// Keyframe closest to `frame` within `tolerance`.
    pub fn find(&self, frame: u64, tolerance: u64) -> Option<&Keyframe<P>> {
        self.position(frame, tolerance).map(|i| &self.keyframes[i])
    }

    pub fn contains(&self, frame: u64, tolerance: u64) -> bool {
        self.position(frame, tolerance).is_some()
    }

    pub fn count_origin(&self, origin: Origin) -> usize {
        self.keyframes.iter().filter(|kf| kf.origin == origin).count()
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Keyframe<P>> {
        self.keyframes.get_mut(index)
    }

    /// Insert keeping frame order. Returns the insertion index.
    pub(crate) fn insert(&mut self, keyframe: Keyframe<P>) -> usize {
        let index = self.keyframes.partition_point(|kf| kf.frame <= keyframe.frame);
        self.keyframes.insert(index, keyframe);
        index
    }

    pub(crate) fn remove(&mut self, index: usize) -> Keyframe<P> {
        self.keyframes.remove(index)
    }

    /// Remove and return every keyframe for which `pred` is true.
    pub(crate) fn extract_if<F>(&mut self, mut pred: F) -> Vec<Keyframe<P>>
    where
        F: FnMut(&Keyframe<P>) -> bool,
    {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.keyframes.len());
        for kf in self.keyframes.drain(..) {
            if pred(&kf) {
                removed.push(kf);
            } else {
                kept.push(kf);
            }
        }
        self.keyframes = kept;
        removed
    }

    pub(crate) fn keyframes_mut(&mut self) -> &mut Vec<Keyframe<P>> {
        &mut self.keyframes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::CropRect;

    fn track(frames: &[u64]) -> AnimationTrack<CropRect> {
        AnimationTrack::from_parts(
            300,
            frames
                .iter()
                .map(|f| Keyframe::user(*f, CropRect::NORMALIZED_FULL))
                .collect(),
        )
    }

    #[test]
    fn test_insert_keeps_order() {
        let mut t = track(&[0, 100, 299]);
        assert_eq!(t.insert(Keyframe::user(50, CropRect::NORMALIZED_FULL)), 1);
        assert_eq!(t.insert(Keyframe::user(200, CropRect::NORMALIZED_FULL)), 3);
        let frames: Vec<u64> = t.keyframes().iter().map(|k| k.frame).collect();
        assert_eq!(frames, vec![0, 50, 100, 200, 299]);
    }

    #[test]
    fn test_position_picks_closest_within_tolerance() {
        let t = track(&[0, 10, 14, 299]);
        assert_eq!(t.position(12, 0), None);
        assert_eq!(t.position(13, 2), Some(2));
        assert_eq!(t.position(11, 2), Some(1));
        assert_eq!(t.position(1, 1), Some(0));
        assert_eq!(t.position(298, 0), None);
    }

    #[test]
    fn test_get_exact() {
        let t = track(&[0, 10, 299]);
        assert!(t.get(10).is_some());
        assert!(t.get(11).is_none());
    }

    #[test]
    fn test_extract_if() {
        let mut t = track(&[0, 10, 20, 299]);
        let removed = t.extract_if(|kf| kf.frame > 5 && kf.frame < 100);
        assert_eq!(removed.len(), 2);
        assert_eq!(t.len(), 2);
    }
}
