use crate::daily_cap::{roll_over, DailyCap};
use crate::store::{KeyValueStore, StoreError};
use chrono::{DateTime, Utc};
use reward_core::{
    Credit, DailyProgress, LedgerOptions, ListeningSession, RewardEvent, RewardKind,
    RewardLedgerState,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// How the ledger state was obtained at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Restored,
    Fresh,
    /// Persisted state could not be decoded and was replaced.
    ResetCorrupted,
    /// The store could not be read; running on an in-memory ledger.
    ReadFailed,
}

/// Stored shape of the ledger key: the state fields plus the live session's
/// markers, so a credit and the marker that consumed it land in one write.
#[derive(Deserialize)]
struct StoredLedger {
    #[serde(flatten)]
    state: RewardLedgerState,
    #[serde(default)]
    active_session: Option<ListeningSession>,
}

#[derive(Serialize)]
struct LedgerRecord<'a> {
    #[serde(flatten)]
    state: &'a RewardLedgerState,
    #[serde(skip_serializing_if = "Option::is_none")]
    active_session: Option<&'a ListeningSession>,
}

/// Durable balance, lifetime counters and bounded history. All mutation of
/// [`RewardLedgerState`] goes through this type.
pub struct RewardLedger<S> {
    state: RewardLedgerState,
    session: Option<ListeningSession>,
    store: S,
    options: LedgerOptions,
    dirty: bool,
    load_outcome: LoadOutcome,
}

impl<S: KeyValueStore> RewardLedger<S> {
    /// Load the ledger from `store`, falling back to a zeroed ledger dated
    /// `today` (or left undated when the day is unknown).
    pub fn open(store: S, options: LedgerOptions, today: Option<&str>) -> Self {
        let fresh = || RewardLedgerState::fresh(today.unwrap_or_default());
        let (mut state, session, load_outcome) = match store.get(&options.state_key) {
            Ok(Some(value)) => match serde_json::from_value::<StoredLedger>(value) {
                Ok(stored) => (stored.state, stored.active_session, LoadOutcome::Restored),
                Err(err) => {
                    error!(key = %options.state_key, error = %err, "persisted reward ledger is corrupted, resetting to a fresh ledger");
                    (fresh(), None, LoadOutcome::ResetCorrupted)
                }
            },
            Ok(None) => {
                info!(key = %options.state_key, "no persisted reward ledger, starting fresh");
                (fresh(), None, LoadOutcome::Fresh)
            }
            Err(StoreError::Serde(err)) => {
                error!(key = %options.state_key, error = %err, "persisted reward ledger is corrupted, resetting to a fresh ledger");
                (fresh(), None, LoadOutcome::ResetCorrupted)
            }
            Err(err) => {
                warn!(key = %options.state_key, error = %err, "reward ledger read failed, continuing in memory");
                (fresh(), None, LoadOutcome::ReadFailed)
            }
        };
        trim_history(&mut state.history, options.history_limit);
        let session = session.filter(|_| options.persist_session_snapshots);

        let mut ledger = Self {
            state,
            session,
            store,
            options,
            dirty: false,
            load_outcome,
        };
        if ledger.state.today_date_key.is_empty() {
            if let Some(day) = today {
                ledger.state.today_date_key = day.to_string();
            }
        }
        let rolled = ledger.roll_over(today);
        let needs_write = matches!(
            ledger.load_outcome,
            LoadOutcome::Fresh | LoadOutcome::ResetCorrupted
        );
        if needs_write && !rolled {
            ledger.persist();
        }
        ledger
    }

    pub fn state(&self) -> &RewardLedgerState {
        &self.state
    }

    pub fn history(&self) -> &[RewardEvent] {
        &self.state.history
    }

    pub fn options(&self) -> &LedgerOptions {
        &self.options
    }

    pub fn load_outcome(&self) -> LoadOutcome {
        self.load_outcome
    }

    /// True while the last write has not reached the store.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn daily_progress(&self, cap: DailyCap, today: Option<&str>) -> DailyProgress {
        cap.progress(&self.state, today)
    }

    /// Roll the day over if needed and persist it immediately.
    pub fn roll_over(&mut self, today: Option<&str>) -> bool {
        let rolled = roll_over(&mut self.state, today);
        if rolled {
            self.persist();
        }
        rolled
    }

    /// Record a policy decision together with the session markers that
    /// consumed it, in a single write.
    ///
    /// `lifetime_minutes` counts every consumed minute, capped or not.
    /// Balances, `songs_completed` and history move only for credits above
    /// zero.
    pub fn apply(
        &mut self,
        credit: &Credit,
        session: Option<&ListeningSession>,
        now: DateTime<Utc>,
    ) {
        if credit.kind == RewardKind::Minute {
            self.state.lifetime_minutes += credit.minutes;
        }

        if credit.tokens > 0 {
            if credit.kind == RewardKind::SongComplete {
                self.state.songs_completed += 1;
            }
            self.state.total_tokens += credit.tokens;
            self.state.today_tokens_earned += credit.tokens;
            let event = match credit.kind {
                RewardKind::Minute => RewardEvent::minute(credit.minutes, credit.tokens, now),
                RewardKind::SongComplete => RewardEvent::song_complete(credit.tokens, now),
            };
            self.state.history.insert(0, event);
            trim_history(&mut self.state.history, self.options.history_limit);
            debug!(
                kind = credit.kind.as_str(),
                tokens = credit.tokens,
                total_tokens = self.state.total_tokens,
                today_tokens_earned = self.state.today_tokens_earned,
                "reward credited"
            );
        } else {
            info!(
                kind = credit.kind.as_str(),
                reason = credit.reason.as_str(),
                nominal = credit.nominal,
                "milestone consumed without credit"
            );
        }
        if self.options.persist_session_snapshots {
            self.session = session.cloned();
        }
        self.persist();
    }

    /// Retry a pending write now instead of waiting for the next mutation.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        let record = LedgerRecord {
            state: &self.state,
            active_session: self.session.as_ref(),
        };
        let value = serde_json::to_value(&record)?;
        self.store.set(&self.options.state_key, &value)?;
        if self.dirty {
            info!(key = %self.options.state_key, "reward ledger persistence recovered");
        }
        self.dirty = false;
        Ok(())
    }

    fn persist(&mut self) {
        if let Err(err) = self.flush() {
            warn!(key = %self.options.state_key, error = %err, "reward ledger write failed, will retry on next mutation");
            self.dirty = true;
        }
    }

    /// Mirror the live session into the stored record for crash recovery.
    /// Unchanged markers are not rewritten.
    pub fn save_session(&mut self, session: Option<&ListeningSession>) {
        if !self.options.persist_session_snapshots || self.session.as_ref() == session {
            return;
        }
        self.session = session.cloned();
        self.persist();
    }

    /// Session markers found in the stored record, or last saved.
    pub fn session_snapshot(&self) -> Option<&ListeningSession> {
        self.session.as_ref()
    }
}

fn trim_history(history: &mut Vec<RewardEvent>, limit: usize) {
    history.truncate(limit);
}
