//! Sub-queue: "play next" tracks consumed before the play queue advances

use crate::error::{Error, Result};
use playd_common::TrackId;
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct SubQueue {
    tracks: VecDeque<TrackId>,
}

impl SubQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, track: TrackId) {
        self.tracks.push_back(track);
    }

    pub fn pop_front(&mut self) -> Option<TrackId> {
        self.tracks.pop_front()
    }

    pub fn remove(&mut self, pos: usize) -> Result<TrackId> {
        let len = self.tracks.len();
        self.tracks
            .remove(pos)
            .ok_or_else(|| Error::Queue(format!("sub-queue position {} out of range ({})", pos, len)))
    }

    /// Drop the first `count` entries
    pub fn skip(&mut self, count: usize) {
        let count = count.min(self.tracks.len());
        self.tracks.drain(..count);
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    pub fn snapshot(&self) -> Vec<TrackId> {
        self.tracks.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order_and_skip() {
        let mut sub = SubQueue::new();
        for id in [1, 2, 3, 4] {
            sub.push(TrackId(id));
        }

        assert_eq!(sub.pop_front(), Some(TrackId(1)));
        sub.skip(2);
        assert_eq!(sub.snapshot(), vec![TrackId(4)]);

        sub.skip(10);
        assert!(sub.is_empty());
        assert_eq!(sub.pop_front(), None);
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut sub = SubQueue::new();
        sub.push(TrackId(7));
        assert!(sub.remove(3).is_err());
        assert_eq!(sub.remove(0).unwrap(), TrackId(7));
    }
}
