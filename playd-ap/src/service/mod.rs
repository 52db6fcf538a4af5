//! Main service
//!
//! Owns the play queue, the sub-queue, the active source slot and the
//! transport intent, and mediates every state transition between them.
//!
//! Three locks guard shared state: the play queue, the sub-queue and the
//! source slot. No code path holds two of them at once. The track to open is
//! resolved with the queue locks released, opened with no lock held, and
//! only then swapped in under the source lock.
//!
//! Command-thread operations record intent and return; the
//! playback-control thread ([`MainService::tick`]) acts on it. Stop and
//! Reset are the exception: they clear the slot themselves, and the
//! generation bump that comes with it makes any track the playback thread
//! is still opening go stale, so it is dropped instead of swapped in.

pub mod command;
pub mod headset;
pub mod server;
pub mod threads;

use crate::audio::{ActiveSource, Origin, OutputControl, SourceSlot};
use crate::error::Result;
use crate::playback::{Direction, PlayQueue, PlaybackIntent, PreviousPress, SongAction, SubQueue};
use crate::sources::{EqualizerBands, SourceOpener};
use crate::store::TrackStore;
use parking_lot::{Mutex, RwLock};
use playd_common::protocol::{QueueSnapshot, StatusSnapshot, EQUALIZER_BANDS};
use playd_common::{PlaybackState, RepeatMode, ShuffleMode, TrackId, TrackInfo};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Tunables for the service
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub poll_interval: Duration,
    pub previous_threshold: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            previous_threshold: Duration::from_secs(2),
        }
    }
}

/// Track chosen for the next transition
type Selection = Option<(TrackId, Origin)>;

pub struct MainService {
    queue: RwLock<PlayQueue>,
    sub_queue: RwLock<SubQueue>,
    slot: Arc<SourceSlot>,
    intent: Arc<PlaybackIntent>,
    output: Arc<OutputControl>,
    equalizer: Arc<EqualizerBands>,
    opener: Arc<dyn SourceOpener>,
    store: Arc<dyn TrackStore>,
    state: AtomicU8,
    previous_press: Mutex<PreviousPress>,
    settings: ServiceSettings,
    exit_notify: Notify,
}

impl MainService {
    pub fn new(
        opener: Arc<dyn SourceOpener>,
        store: Arc<dyn TrackStore>,
        output: Arc<OutputControl>,
        equalizer: Arc<EqualizerBands>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            queue: RwLock::new(PlayQueue::new()),
            sub_queue: RwLock::new(SubQueue::new()),
            slot: Arc::new(SourceSlot::new()),
            intent: Arc::new(PlaybackIntent::new()),
            output,
            equalizer,
            opener,
            store,
            state: AtomicU8::new(PlaybackState::Idle as u8),
            previous_press: Mutex::new(PreviousPress::default()),
            settings,
            exit_notify: Notify::new(),
        }
    }

    pub fn slot(&self) -> &Arc<SourceSlot> {
        &self.slot
    }

    pub fn intent(&self) -> &Arc<PlaybackIntent> {
        &self.intent
    }

    pub fn output(&self) -> &Arc<OutputControl> {
        &self.output
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    fn set_state(&self, state: PlaybackState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Current transition state; Playing reads as Paused while output is held
    pub fn state(&self) -> PlaybackState {
        let state = PlaybackState::try_from(self.state.load(Ordering::Acquire))
            .unwrap_or(PlaybackState::Idle);
        if state == PlaybackState::Playing && self.output.is_paused() {
            PlaybackState::Paused
        } else {
            state
        }
    }

    // ========================================================================
    // Transport (command thread)
    // ========================================================================

    /// Resume, or start the queue's current track when nothing is active.
    /// Returns false when there is nothing to play.
    pub fn play(&self) -> bool {
        if self.slot.is_active() {
            self.output.set_paused(false);
            return true;
        }
        if self.queue.read().current().is_none() {
            return false;
        }
        self.intent.request(SongAction::Jump);
        true
    }

    /// Returns false when nothing is active
    pub fn pause(&self) -> bool {
        if !self.slot.is_active() {
            return false;
        }
        self.output.set_paused(true);
        true
    }

    /// Drop the active source, or cancel the track being loaded. The queue
    /// cursor is kept, so Play resumes from the same track.
    pub fn stop(&self) -> bool {
        if !self.slot.is_active() && self.state() != PlaybackState::Loading {
            return false;
        }
        self.intent.take_action();
        self.intent.clear_seek();
        self.stop_playback();
        true
    }

    pub fn next(&self) -> bool {
        if !self.slot.is_active() {
            return false;
        }
        self.intent.request(SongAction::Next);
        true
    }

    /// First press restarts the track; a second press within the threshold
    /// moves back one
    pub fn previous(&self) -> bool {
        self.previous_at(Instant::now())
    }

    pub fn previous_at(&self, now: Instant) -> bool {
        if !self.slot.is_active() {
            return false;
        }
        let action = self
            .previous_press
            .lock()
            .press(now, self.settings.previous_threshold);
        self.intent.request(action);
        true
    }

    pub fn seek(&self, seconds: f64) -> bool {
        if !self.slot.is_active() {
            return false;
        }
        self.intent.request_seek(seconds);
        true
    }

    pub fn set_volume(&self, level: f32) {
        self.output.volume.set_volume(level);
    }

    pub fn set_muted(&self, muted: bool) {
        self.output.volume.set_muted(muted);
    }

    /// Pause on headset unplug, same effect as the Pause command
    pub fn headset_unplugged(&self) {
        if self.pause() {
            info!("Headset unplugged, playback paused");
        }
    }

    // ========================================================================
    // Queue (command thread, never takes the source lock)
    // ========================================================================

    pub fn set_repeat_mode(&self, mode: RepeatMode) {
        self.queue.write().set_repeat_mode(mode);
        debug!("Repeat mode: {:?}", mode);
    }

    pub fn set_shuffle_mode(&self, mode: ShuffleMode) {
        self.queue.write().set_shuffle_mode(mode);
        debug!("Shuffle mode: {:?}", mode);
    }

    /// Replace the play queue and start at `start`; an out-of-range start
    /// stops playback
    pub fn set_queue(&self, tracks: Vec<TrackId>, start: usize) {
        let len = tracks.len();
        self.queue.write().set_queue(tracks, start);
        info!("Queue replaced: {} tracks, start {}", len, start);
        self.intent.request(SongAction::Jump);
    }

    pub fn set_queue_index(&self, pos: usize) -> Result<()> {
        self.queue.write().set_index(pos)?;
        self.intent.request(SongAction::Jump);
        Ok(())
    }

    pub fn insert_into_queue(&self, pos: usize, track: TrackId) {
        self.queue.write().insert(pos, track);
    }

    pub fn remove_from_queue(&self, pos: usize) -> Result<TrackId> {
        self.queue.write().remove(pos)
    }

    pub fn move_in_queue(&self, from: usize, to: usize) -> Result<()> {
        self.queue.write().reorder(from, to)
    }

    pub fn queue_snapshot(&self) -> QueueSnapshot {
        self.queue.read().snapshot()
    }

    pub fn add_to_sub_queue(&self, track: TrackId) {
        self.sub_queue.write().push(track);
    }

    pub fn remove_from_sub_queue(&self, pos: usize) -> Result<TrackId> {
        self.sub_queue.write().remove(pos)
    }

    pub fn skip_sub_queue(&self, count: usize) {
        self.sub_queue.write().skip(count);
    }

    pub fn sub_queue_snapshot(&self) -> Vec<TrackId> {
        self.sub_queue.read().snapshot()
    }

    // ========================================================================
    // Misc
    // ========================================================================

    pub fn set_equalizer(&self, bands: &[f32]) {
        self.equalizer.set(bands);
    }

    pub fn equalizer(&self) -> [f32; EQUALIZER_BANDS] {
        self.equalizer.get()
    }

    pub fn set_playing_from(&self, label: String) {
        self.intent.set_playing_from(label);
    }

    /// Back to a freshly started service: playback stopped, queues emptied,
    /// repeat and shuffle off, equalizer flat. Volume is kept.
    pub fn reset(&self) {
        self.intent.take_action();
        self.intent.clear_seek();
        self.stop_playback();
        {
            let mut queue = self.queue.write();
            queue.clear();
            queue.set_repeat_mode(RepeatMode::Off);
            queue.set_shuffle_mode(ShuffleMode::Off);
        }
        self.sub_queue.write().clear();
        self.equalizer.reset();
        self.intent.set_playing_from(String::new());
        self.previous_press.lock().reset();
        info!("Service reset");
    }

    pub fn version(&self) -> String {
        format!("{} ({})", env!("CARGO_PKG_VERSION"), env!("GIT_HASH"))
    }

    /// Ask every service thread to return
    pub fn request_exit(&self) {
        info!("Exit requested");
        self.intent.request_exit();
        self.exit_notify.notify_one();
    }

    pub fn exit_requested(&self) -> bool {
        self.intent.should_exit()
    }

    /// Resolves once [`MainService::request_exit`] has been called
    pub async fn exited(&self) {
        if self.exit_requested() {
            return;
        }
        self.exit_notify.notified().await;
    }

    /// Status snapshot from lock-free mirrors and the queue lock only
    pub fn status(&self) -> StatusSnapshot {
        let track = self.slot.track();
        let info = track.map(|id| self.track_info(id));
        let (queue_index, repeat, shuffle) = {
            let queue = self.queue.read();
            (queue.index(), queue.repeat_mode(), queue.shuffle_mode())
        };

        StatusSnapshot {
            state: self.state(),
            track,
            info,
            position_secs: self.slot.position_secs(),
            duration_secs: self.slot.duration_secs(),
            from_sub_queue: self.slot.origin() == Some(Origin::SubQueue),
            queue_index,
            repeat,
            shuffle,
            volume: self.output.volume.level(),
            muted: self.output.volume.is_muted(),
            playing_from: self.intent.playing_from(),
        }
    }

    fn track_info(&self, id: TrackId) -> TrackInfo {
        match self.store.info_for(id) {
            Ok(Some(info)) => info,
            Ok(None) => TrackInfo::unknown(id),
            Err(e) => {
                warn!("Metadata lookup for track {} failed: {}", id, e);
                TrackInfo::unknown(id)
            }
        }
    }

    // ========================================================================
    // Playback control (playback thread)
    // ========================================================================

    /// Run the playback-control loop until exit is requested
    pub fn run_playback(&self) {
        info!("Playback thread started");
        while !self.exit_requested() {
            self.tick();
            std::thread::sleep(self.settings.poll_interval);
        }
        info!("Playback thread stopped");
    }

    /// One playback-control step: apply a pending seek, then a pending
    /// action or a natural end of track
    pub fn tick(&self) {
        if let Some(seconds) = self.intent.take_seek() {
            if self.slot.seek_seconds(seconds, || self.output.request_flush()) {
                debug!("Seeked to {:.2}s", seconds);
            }
        }

        // Read before the action is taken: a Stop landing after this point
        // moves the generation and the transition below goes stale
        let generation = self.slot.generation();

        let action = self.intent.take_action();
        if action != SongAction::Nothing {
            debug!("Song action: {:?}", action);
            let selection = self.select(action);
            self.transition(generation, selection, false);
            return;
        }

        if self.slot.is_active() && self.slot.is_finished() {
            self.set_state(PlaybackState::Finished);
            let selection = self.select_after_finish();
            self.transition(generation, selection, true);
        }
    }

    /// Resolve an action to a track. Takes and releases the queue locks.
    fn select(&self, action: SongAction) -> Selection {
        let active_origin = self.slot.origin();
        let active_track = self.slot.track();

        match action {
            SongAction::Nothing => None,
            SongAction::Next => {
                if let Some(track) = self.sub_queue.write().pop_front() {
                    return Some((track, Origin::SubQueue));
                }
                self.queue
                    .write()
                    .skip(Direction::Next)
                    .map(|t| (t, Origin::Queue))
            }
            SongAction::Previous => {
                let mut queue = self.queue.write();
                if active_origin == Some(Origin::SubQueue) {
                    queue.current()
                } else {
                    queue.skip(Direction::Previous)
                }
                .map(|t| (t, Origin::Queue))
            }
            SongAction::Replay => match (active_origin, active_track) {
                (Some(Origin::SubQueue), Some(track)) => Some((track, Origin::SubQueue)),
                _ => self.queue.read().current().map(|t| (t, Origin::Queue)),
            },
            SongAction::Jump => self.queue.read().current().map(|t| (t, Origin::Queue)),
        }
    }

    /// Natural end of track: sub-queue first, then the queue honouring
    /// repeat-one
    fn select_after_finish(&self) -> Selection {
        if let Some(track) = self.sub_queue.write().pop_front() {
            return Some((track, Origin::SubQueue));
        }
        self.queue
            .write()
            .advance(Direction::Next)
            .map(|t| (t, Origin::Queue))
    }

    /// Open and swap in the selected track, skipping tracks that fail to
    /// open. Gives up after as many failures as there are candidates.
    fn transition(&self, generation: u64, mut selection: Selection, natural: bool) {
        let candidates = (self.queue.read().len() + self.sub_queue.read().len()).max(1);
        let mut failures = 0;

        loop {
            let Some((track, origin)) = selection else {
                info!("Nothing left to play");
                self.stop_playback();
                return;
            };

            if self.slot.generation() != generation {
                self.set_idle_if_empty();
                debug!("Playback stopped before track {} was opened", track);
                return;
            }
            self.set_state(PlaybackState::Loading);
            if let Some(source) = self.open(track) {
                let next = Some(ActiveSource {
                    track,
                    origin,
                    source,
                });
                let swapped = self.slot.swap_if(generation, next, || {
                    if !natural {
                        self.output.request_flush();
                    }
                    self.output.set_paused(false);
                    self.set_state(PlaybackState::Playing);
                });

                match swapped {
                    Ok(previous) => {
                        drop(previous);
                        info!(
                            "Playing track {}{}",
                            track,
                            if origin == Origin::SubQueue { " (sub-queue)" } else { "" }
                        );
                    }
                    Err(stale) => {
                        drop(stale);
                        // Stop already left the slot empty
                        self.set_idle_if_empty();
                        debug!("Playback stopped while opening track {}, dropped", track);
                    }
                }
                return;
            }

            failures += 1;
            if failures >= candidates {
                warn!("{} tracks in a row failed to open, stopping", failures);
                self.stop_playback();
                return;
            }
            selection = self.select(SongAction::Next);
        }
    }

    /// Resolve and open a track with no lock held
    fn open(&self, track: TrackId) -> Option<Box<dyn crate::sources::Source>> {
        let path = match self.store.path_for(track) {
            Ok(Some(path)) => path,
            Ok(None) => {
                warn!("Track {} not found in store", track);
                return None;
            }
            Err(e) => {
                warn!("Path lookup for track {} failed: {}", track, e);
                return None;
            }
        };
        debug!("Opening track {} from {}", track, path.display());
        self.opener.make_source(&path)
    }

    fn stop_playback(&self) {
        let previous = self.slot.swap_with(None, || {
            self.output.request_flush();
            self.output.set_paused(false);
            self.set_state(PlaybackState::Idle);
        });
        drop(previous);
    }

    /// Settle a stale Loading state without racing a swap
    fn set_idle_if_empty(&self) {
        let guard = self.slot.lock();
        if guard.is_none() {
            self.set_state(PlaybackState::Idle);
        }
    }
}
