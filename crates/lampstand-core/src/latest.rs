//! Last-request-wins publication.
//!
//! A [`Latest`] hands out a generation number each time a new request
//! begins. Results carry the generation they were started under and are
//! only published if no newer request has begun since.

use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

pub struct Latest<T> {
    generation: Mutex<u64>,
    tx: watch::Sender<T>,
}

impl<T> Latest<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            generation: Mutex::new(0),
            tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> T
    where
        T: Clone,
    {
        self.tx.borrow().clone()
    }

    /// Start a new request: invalidate older ones and publish `state`.
    pub fn begin(&self, state: T) -> u64 {
        let mut generation = self.lock();
        *generation += 1;
        self.tx.send_replace(state);
        *generation
    }

    /// Publish `state` if `generation` is still the newest request.
    pub fn finish(&self, generation: u64, state: T) -> bool {
        let current = self.lock();
        if *current != generation {
            return false;
        }
        self.tx.send_replace(state);
        true
    }

    // the counter stays meaningful even if a holder panicked
    fn lock(&self) -> MutexGuard<'_, u64> {
        self.generation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
