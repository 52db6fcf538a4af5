//! Play queue
//!
//! An ordered list of tracks with a cursor, a repeat policy and a shuffle
//! policy. Positions taken and reported by every operation are positions in
//! play order, which is the insertion order unless shuffle is on.

use crate::error::{Error, Result};
use playd_common::protocol::QueueSnapshot;
use playd_common::{RepeatMode, ShuffleMode, TrackId};
use rand::seq::SliceRandom;

/// Direction of a queue step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

#[derive(Debug, Default)]
pub struct PlayQueue {
    /// Insertion order
    tracks: Vec<TrackId>,
    /// Play order as indices into `tracks`
    order: Vec<usize>,
    /// Cursor into `order`; `None` means no current track
    index: Option<usize>,
    repeat: RepeatMode,
    shuffle: ShuffleMode,
}

impl PlayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat
    }

    pub fn shuffle_mode(&self) -> ShuffleMode {
        self.shuffle
    }

    /// Cursor position in play order
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Track under the cursor
    pub fn current(&self) -> Option<TrackId> {
        self.index.and_then(|i| self.at(i))
    }

    /// Track at a play-order position
    pub fn at(&self, pos: usize) -> Option<TrackId> {
        self.order.get(pos).map(|&t| self.tracks[t])
    }

    /// Replace the queue. An out-of-range `start` leaves no current track.
    pub fn set_queue(&mut self, tracks: Vec<TrackId>, start: usize) {
        let len = tracks.len();
        self.tracks = tracks;
        self.order = (0..len).collect();
        self.index = (start < len).then_some(start);

        if self.shuffle == ShuffleMode::On {
            self.shuffle_order();
        }
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.order.clear();
        self.index = None;
    }

    /// Automatic step (end of track): honours every repeat mode
    pub fn advance(&mut self, direction: Direction) -> Option<TrackId> {
        self.step(direction, self.repeat)
    }

    /// User-initiated step: repeat-one behaves like repeat-all so the user
    /// can always leave a repeated track
    pub fn skip(&mut self, direction: Direction) -> Option<TrackId> {
        let repeat = match self.repeat {
            RepeatMode::One => RepeatMode::All,
            other => other,
        };
        self.step(direction, repeat)
    }

    fn step(&mut self, direction: Direction, repeat: RepeatMode) -> Option<TrackId> {
        let len = self.order.len();
        if len == 0 {
            self.index = None;
            return None;
        }

        self.index = match (direction, self.index) {
            (Direction::Next, None) => match repeat {
                RepeatMode::All => Some(0),
                _ => None,
            },
            (Direction::Next, Some(i)) => match repeat {
                RepeatMode::One => Some(i),
                _ if i + 1 < len => Some(i + 1),
                RepeatMode::All => Some(0),
                RepeatMode::Off => None,
            },
            (Direction::Previous, None) => Some(len - 1),
            (Direction::Previous, Some(i)) => match repeat {
                RepeatMode::One => Some(i),
                _ if i > 0 => Some(i - 1),
                RepeatMode::All => Some(len - 1),
                RepeatMode::Off => Some(0),
            },
        };
        self.current()
    }

    /// Move the cursor to `pos`
    pub fn set_index(&mut self, pos: usize) -> Result<TrackId> {
        let track = self
            .at(pos)
            .ok_or_else(|| Error::Queue(format!("index {} out of range ({})", pos, self.len())))?;
        self.index = Some(pos);
        Ok(track)
    }

    /// Insert `track` at play-order position `pos` (clamped to the end).
    /// The cursor stays on the same track.
    pub fn insert(&mut self, pos: usize, track: TrackId) {
        let pos = pos.min(self.order.len());

        match self.shuffle {
            ShuffleMode::Off => {
                self.tracks.insert(pos, track);
                self.order = (0..self.tracks.len()).collect();
            }
            ShuffleMode::On => {
                self.tracks.push(track);
                self.order.insert(pos, self.tracks.len() - 1);
            }
        }

        if let Some(i) = self.index {
            if pos <= i {
                self.index = Some(i + 1);
            }
        }
    }

    /// Remove the entry at `pos`. The current entry cannot be removed.
    pub fn remove(&mut self, pos: usize) -> Result<TrackId> {
        if pos >= self.order.len() {
            return Err(Error::Queue(format!(
                "position {} out of range ({})",
                pos,
                self.len()
            )));
        }
        if self.index == Some(pos) {
            return Err(Error::Queue(
                "cannot remove the current track".to_string(),
            ));
        }

        let removed = self.order.remove(pos);
        let track = self.tracks.remove(removed);
        for t in self.order.iter_mut() {
            if *t > removed {
                *t -= 1;
            }
        }

        if let Some(i) = self.index {
            if pos < i {
                self.index = Some(i - 1);
            }
        }
        Ok(track)
    }

    /// Move the entry at `from` to `to`. The cursor stays on the same track.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.order.len();
        if from >= len || to >= len {
            return Err(Error::Queue(format!(
                "move {} -> {} out of range ({})",
                from, to, len
            )));
        }

        match self.shuffle {
            ShuffleMode::Off => {
                let track = self.tracks.remove(from);
                self.tracks.insert(to, track);
            }
            ShuffleMode::On => {
                let entry = self.order.remove(from);
                self.order.insert(to, entry);
            }
        }

        if let Some(i) = self.index {
            self.index = Some(if i == from {
                to
            } else if from < i && to >= i {
                i - 1
            } else if from > i && to <= i {
                i + 1
            } else {
                i
            });
        }
        Ok(())
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.repeat = mode;
    }

    /// Switching shuffle on puts the current track first in a random order;
    /// switching it off restores insertion order. Either way the cursor stays
    /// on the same track.
    pub fn set_shuffle_mode(&mut self, mode: ShuffleMode) {
        if mode == self.shuffle {
            return;
        }
        self.shuffle = mode;

        match mode {
            ShuffleMode::On => self.shuffle_order(),
            ShuffleMode::Off => {
                let current = self.index.map(|i| self.order[i]);
                self.order = (0..self.tracks.len()).collect();
                self.index = current;
            }
        }
    }

    fn shuffle_order(&mut self) {
        let current = self.index.map(|i| self.order[i]);
        self.order.shuffle(&mut rand::thread_rng());

        if let Some(t) = current {
            if let Some(pos) = self.order.iter().position(|&o| o == t) {
                self.order.swap(0, pos);
            }
            self.index = Some(0);
        }
    }

    /// Tracks in play order plus the cursor
    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            tracks: self.order.iter().map(|&t| self.tracks[t]).collect(),
            index: self.index,
        }
    }
}
