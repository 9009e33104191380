use crate::eligibility::{check_eligibility, Ineligibility};
use crate::ledger::{LoadOutcome, RewardLedger};
use crate::policy::RewardPolicy;
use crate::store::KeyValueStore;
use crate::session::{completion_reached, SessionTracker, TrackerState};
use reward_core::{DailyProgress, ListeningSession, PlaybackSample, RewardPolicyConfig};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct SessionDebug {
    #[serde(flatten)]
    pub session: ListeningSession,
    pub listened_fraction: f64,
    pub seconds_to_next_minute: u64,
    pub completion_ready: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerDebug {
    pub total_tokens: u64,
    pub lifetime_minutes: u64,
    pub songs_completed: u64,
    pub today_tokens_earned: u64,
    pub today_date_key: String,
    pub history_len: usize,
    pub history_limit: usize,
    pub persistence_dirty: bool,
    pub load_outcome: &'static str,
}

/// Read-only view for operators and QA. Nothing here feeds back into
/// crediting.
#[derive(Debug, Clone, Serialize)]
pub struct DebugSnapshot {
    pub tracker_state: TrackerState,
    pub last_sample: Option<PlaybackSample>,
    pub last_sample_eligible: Option<bool>,
    pub ineligibility: Option<Ineligibility>,
    pub session: Option<SessionDebug>,
    pub recovered_session_pending: Option<String>,
    pub ledger: LedgerDebug,
    pub daily_progress: DailyProgress,
    pub policy: RewardPolicyConfig,
}

pub(crate) fn project<S: KeyValueStore>(
    last_sample: Option<&PlaybackSample>,
    tracker: &SessionTracker,
    ledger: &RewardLedger<S>,
    policy: &RewardPolicy,
    daily_progress: DailyProgress,
) -> DebugSnapshot {
    let eligibility = last_sample.map(check_eligibility);
    let progress_fraction = last_sample.and_then(|s| s.progress_fraction);

    let session = tracker.active().map(|s| SessionDebug {
        session: s.clone(),
        listened_fraction: s.listened_fraction(),
        seconds_to_next_minute: s.seconds_to_next_minute(),
        completion_ready: completion_reached(s, progress_fraction),
    });

    let state = ledger.state();
    DebugSnapshot {
        tracker_state: tracker.state(),
        last_sample: last_sample.copied(),
        last_sample_eligible: eligibility.map(|e| e.is_ok()),
        ineligibility: eligibility.and_then(Result::err),
        session,
        recovered_session_pending: tracker.recovered().map(|s| s.track_id.clone()),
        ledger: LedgerDebug {
            total_tokens: state.total_tokens,
            lifetime_minutes: state.lifetime_minutes,
            songs_completed: state.songs_completed,
            today_tokens_earned: state.today_tokens_earned,
            today_date_key: state.today_date_key.clone(),
            history_len: state.history.len(),
            history_limit: ledger.options().history_limit,
            persistence_dirty: ledger.is_dirty(),
            load_outcome: match ledger.load_outcome() {
                LoadOutcome::Restored => "restored",
                LoadOutcome::Fresh => "fresh",
                LoadOutcome::ResetCorrupted => "reset_corrupted",
                LoadOutcome::ReadFailed => "read_failed",
            },
        },
        daily_progress,
        policy: *policy.config(),
    }
}
