//! Named service threads
//!
//! The renderer, playback-control, command and headset loops each run on
//! their own OS thread and return once the exit flag is set.

use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

#[derive(Default)]
pub struct ThreadSet {
    handles: Vec<(String, JoinHandle<()>)>,
}

impl ThreadSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&mut self, name: &str, body: F) -> std::io::Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = thread::Builder::new().name(name.to_string()).spawn(body)?;
        debug!("Spawned {} thread", name);
        self.handles.push((name.to_string(), handle));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Run `start` against this set. If it fails, call `stop` and join
    /// whatever it had already spawned before handing back the error.
    pub fn start_or_unwind<E>(
        mut self,
        start: impl FnOnce(&mut Self) -> Result<(), E>,
        stop: impl FnOnce(),
    ) -> Result<Self, E> {
        match start(&mut self) {
            Ok(()) => Ok(self),
            Err(e) => {
                warn!("Startup failed with {} threads running, stopping them", self.len());
                stop();
                self.join_all();
                Err(e)
            }
        }
    }

    /// Join every thread; returns how many panicked
    pub fn join_all(self) -> usize {
        let mut panicked = 0;
        for (name, handle) in self.handles {
            if handle.join().is_err() {
                error!("{} thread panicked", name);
                panicked += 1;
            } else {
                debug!("{} thread joined", name);
            }
        }
        panicked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use std::sync::Arc;

    #[test]
    fn test_join_all_counts_panics() {
        let ran = Arc::new(AtomicUsize::new(0));
        let mut threads = ThreadSet::new();

        let counter = Arc::clone(&ran);
        threads
            .spawn("worker", move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        threads.spawn("broken", || panic!("boom")).unwrap();

        assert_eq!(threads.len(), 2);
        assert_eq!(threads.join_all(), 1);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_startup_stops_spawned_threads() {
        let exit = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicUsize::new(0));

        let result = ThreadSet::new().start_or_unwind(
            |threads| {
                let exit = Arc::clone(&exit);
                let finished = Arc::clone(&finished);
                threads
                    .spawn("looping", move || {
                        while !exit.load(Ordering::SeqCst) {
                            thread::sleep(Duration::from_millis(1));
                        }
                        finished.fetch_add(1, Ordering::SeqCst);
                    })
                    .unwrap();
                Err("second thread failed")
            },
            || exit.store(true, Ordering::SeqCst),
        );

        assert_eq!(result.err(), Some("second thread failed"));
        // Joined before returning, so the loop has already observed the flag
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_successful_startup_keeps_threads() {
        let threads = ThreadSet::new()
            .start_or_unwind(
                |threads| threads.spawn("quick", || {}),
                || panic!("stop must not run"),
            )
            .unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads.join_all(), 0);
    }
}
