use crate::debug::DebugSnapshot;
use crate::engine::RewardEngine;
use crate::store::KeyValueStore;
use reward_core::{
    Clock, DailyProgress, ListeningSession, PlaybackSample, RewardEvent, RewardLedgerState,
    TickOutcome,
};
use std::sync::{Arc, Mutex, MutexGuard};

/// Cloneable handle serializing every engine call behind one mutex, for
/// embedders that tick from one thread and read from others.
pub struct SharedRewardEngine<S, C> {
    inner: Arc<Mutex<RewardEngine<S, C>>>,
}

impl<S, C> Clone for SharedRewardEngine<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: KeyValueStore, C: Clock> SharedRewardEngine<S, C> {
    pub fn new(engine: RewardEngine<S, C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Every mutation completes before the guard drops, so a poisoned lock
    /// still holds a consistent engine.
    fn lock(&self) -> MutexGuard<'_, RewardEngine<S, C>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut RewardEngine<S, C>) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn start_session(&self, track_id: &str, track_duration_seconds: u64) -> Option<ListeningSession> {
        self.lock().start_session(track_id, track_duration_seconds)
    }

    pub fn end_session(&self) -> Option<ListeningSession> {
        self.lock().end_session()
    }

    pub fn tick(&self, sample: PlaybackSample) -> TickOutcome {
        self.lock().tick_sample(sample)
    }

    pub fn state(&self) -> RewardLedgerState {
        self.lock().state().clone()
    }

    pub fn daily_progress(&self) -> DailyProgress {
        self.lock().daily_progress()
    }

    pub fn history(&self) -> Vec<RewardEvent> {
        self.lock().history().to_vec()
    }

    pub fn debug_snapshot(&self) -> DebugSnapshot {
        self.lock().debug_snapshot()
    }
}
