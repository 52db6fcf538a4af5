//! The active source slot
//!
//! At most one decoder source is active. The slot's mutex is the source
//! lock: the renderer holds it for one `decode()` call, the playback-control
//! thread holds it to swap or seek. Everything the status query needs is
//! mirrored into atomics so it never waits on a decode.

use crate::sources::Source;
use parking_lot::{Mutex, MutexGuard};
use playd_common::TrackId;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU64, Ordering};

/// Where the active track was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Queue,
    SubQueue,
}

pub struct ActiveSource {
    pub track: TrackId,
    pub origin: Origin,
    pub source: Box<dyn Source>,
}

pub struct SourceSlot {
    active: Mutex<Option<ActiveSource>>,
    // Lock-free mirrors (-1 = no track)
    track: AtomicI64,
    from_sub_queue: AtomicBool,
    position: AtomicU64,
    sample_rate: AtomicU32,
    total_frames: AtomicU64,
    /// Bumped on every swap and seek; renderer output from an older
    /// generation is discarded, and a pending guarded swap goes stale
    generation: AtomicU64,
    finished: AtomicBool,
}

impl Default for SourceSlot {
    fn default() -> Self {
        Self {
            active: Mutex::new(None),
            track: AtomicI64::new(-1),
            from_sub_queue: AtomicBool::new(false),
            position: AtomicU64::new(0),
            sample_rate: AtomicU32::new(0),
            total_frames: AtomicU64::new(0),
            generation: AtomicU64::new(0),
            finished: AtomicBool::new(false),
        }
    }
}

impl SourceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the source lock
    pub fn lock(&self) -> MutexGuard<'_, Option<ActiveSource>> {
        self.active.lock()
    }

    /// Replace the active source and return the previous one.
    ///
    /// The lock is released before this returns, so dropping the returned
    /// source never happens under the lock.
    pub fn swap(&self, next: Option<ActiveSource>) -> Option<ActiveSource> {
        self.swap_with(next, || {})
    }

    /// Like [`SourceSlot::swap`], running `on_swap` under the source lock
    /// before the generation moves. Output flushes and state changes that
    /// belong to the swap go there.
    pub fn swap_with(
        &self,
        next: Option<ActiveSource>,
        on_swap: impl FnOnce(),
    ) -> Option<ActiveSource> {
        let mut guard = self.active.lock();
        on_swap();
        self.install(&mut guard, next)
    }

    /// Swap only if the generation is still `expected`. A stale swap hands
    /// `next` back untouched in `Err`.
    pub fn swap_if(
        &self,
        expected: u64,
        next: Option<ActiveSource>,
        on_swap: impl FnOnce(),
    ) -> Result<Option<ActiveSource>, Option<ActiveSource>> {
        let mut guard = self.active.lock();
        if self.generation() != expected {
            return Err(next);
        }
        on_swap();
        Ok(self.install(&mut guard, next))
    }

    fn install(
        &self,
        guard: &mut Option<ActiveSource>,
        next: Option<ActiveSource>,
    ) -> Option<ActiveSource> {
        match &next {
            Some(active) => {
                self.track.store(active.track.0 as i64, Ordering::Release);
                self.from_sub_queue
                    .store(active.origin == Origin::SubQueue, Ordering::Release);
                self.position.store(active.source.tell(), Ordering::Release);
                self.sample_rate
                    .store(active.source.sample_rate(), Ordering::Release);
                self.total_frames
                    .store(active.source.total_frames(), Ordering::Release);
            }
            None => {
                self.track.store(-1, Ordering::Release);
                self.from_sub_queue.store(false, Ordering::Release);
                self.position.store(0, Ordering::Release);
                self.sample_rate.store(0, Ordering::Release);
                self.total_frames.store(0, Ordering::Release);
            }
        }
        self.finished.store(false, Ordering::Release);
        self.generation.fetch_add(1, Ordering::AcqRel);

        std::mem::replace(guard, next)
    }

    /// Seek the active source to `seconds`, clamped to its length, running
    /// `on_seek` under the source lock first. Returns false when nothing is
    /// active.
    pub fn seek_seconds(&self, seconds: f64, on_seek: impl FnOnce()) -> bool {
        let mut guard = self.active.lock();
        let Some(active) = guard.as_mut() else {
            return false;
        };

        let rate = active.source.sample_rate() as f64;
        let mut frame = (seconds.max(0.0) * rate) as u64;
        let total = active.source.total_frames();
        if total > 0 {
            frame = frame.min(total);
        }

        on_seek();
        active.source.seek(frame);
        self.position.store(active.source.tell(), Ordering::Release);
        self.finished.store(false, Ordering::Release);
        self.generation.fetch_add(1, Ordering::AcqRel);
        true
    }

    pub fn track(&self) -> Option<TrackId> {
        match self.track.load(Ordering::Acquire) {
            -1 => None,
            id => Some(TrackId(id as i32)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.track().is_some()
    }

    pub fn origin(&self) -> Option<Origin> {
        self.track().map(|_| {
            if self.from_sub_queue.load(Ordering::Acquire) {
                Origin::SubQueue
            } else {
                Origin::Queue
            }
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Record the decode position; called with the source lock held
    pub fn update_position(&self, frame: u64) {
        self.position.store(frame, Ordering::Release);
    }

    pub fn mark_finished(&self) {
        self.finished.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    pub fn position_secs(&self) -> f64 {
        let rate = self.sample_rate.load(Ordering::Acquire);
        if rate == 0 {
            return 0.0;
        }
        self.position.load(Ordering::Acquire) as f64 / rate as f64
    }

    pub fn duration_secs(&self) -> f64 {
        let rate = self.sample_rate.load(Ordering::Acquire);
        if rate == 0 {
            return 0.0;
        }
        self.total_frames.load(Ordering::Acquire) as f64 / rate as f64
    }
}
