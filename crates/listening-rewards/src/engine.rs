use crate::debug::{project, DebugSnapshot};
use crate::eligibility::check_eligibility;
use crate::ledger::RewardLedger;
use crate::policy::RewardPolicy;
use crate::session::{Advance, SessionTracker};
use crate::store::{KeyValueStore, StoreError};
use reward_core::{
    Clock, ConfigError, Credit, DailyProgress, LedgerOptions, ListeningSession, PlaybackSample,
    RewardEvent, RewardLedgerState, RewardPolicyConfig, RewardReason, TickOutcome,
};
use tracing::{debug, info};

/// Single-writer entry point: sampler ticks in, credited rewards out.
pub struct RewardEngine<S, C> {
    policy: RewardPolicy,
    tracker: SessionTracker,
    ledger: RewardLedger<S>,
    clock: C,
    last_sample: Option<PlaybackSample>,
}

impl<S: KeyValueStore, C: Clock> RewardEngine<S, C> {
    /// Validate `config`, load the ledger and pick up any surviving session
    /// snapshot as a recovery candidate.
    pub fn open(
        config: RewardPolicyConfig,
        options: LedgerOptions,
        store: S,
        clock: C,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let today = clock.today_key();
        let ledger = RewardLedger::open(store, options, today.as_deref());
        let recovered = ledger.session_snapshot().cloned();
        if let Some(session) = &recovered {
            info!(
                track_id = %session.track_id,
                accumulated_seconds = session.accumulated_seconds,
                "found session snapshot from a previous run"
            );
        }
        Ok(Self {
            policy: RewardPolicy::new(config),
            tracker: SessionTracker::with_recovered(recovered),
            ledger,
            clock,
            last_sample: None,
        })
    }

    pub fn config(&self) -> &RewardPolicyConfig {
        self.policy.config()
    }

    /// Start crediting `track_id`. Any live session is finalized first and
    /// returned.
    pub fn start_session(
        &mut self,
        track_id: &str,
        track_duration_seconds: u64,
    ) -> Option<ListeningSession> {
        let finalized = self
            .tracker
            .start(track_id, track_duration_seconds, self.clock.now());
        self.ledger.save_session(self.tracker.active());
        finalized
    }

    pub fn end_session(&mut self) -> Option<ListeningSession> {
        let finalized = self.tracker.finalize();
        self.ledger.save_session(None);
        finalized
    }

    pub fn tick(
        &mut self,
        is_playing: bool,
        volume: f64,
        is_surface_visible: bool,
        progress_fraction: Option<f64>,
    ) -> TickOutcome {
        self.tick_sample(PlaybackSample::new(
            is_playing,
            volume,
            is_surface_visible,
            progress_fraction,
        ))
    }

    /// Tick for a sampler that reports the track alongside each sample. A
    /// different track than the live one starts a new session first.
    pub fn tick_for_track(
        &mut self,
        track_id: &str,
        track_duration_seconds: u64,
        sample: PlaybackSample,
    ) -> TickOutcome {
        let switched = self
            .tracker
            .active()
            .map_or(true, |s| s.track_id != track_id);
        if switched {
            self.start_session(track_id, track_duration_seconds);
        }
        self.tick_sample(sample)
    }

    pub fn tick_sample(&mut self, sample: PlaybackSample) -> TickOutcome {
        let sample = sample.sanitized();
        self.last_sample = Some(sample);

        let today = self.clock.today_key();
        self.ledger.roll_over(today.as_deref());

        let milestones = match self.tracker.advance(&sample) {
            Advance::NoSession => return self.outcome(RewardReason::NoActiveSession, Vec::new()),
            Advance::Ineligible => {
                if let Err(why) = check_eligibility(&sample) {
                    debug!(?why, "tick not eligible");
                }
                return self.outcome(RewardReason::NotEligible, Vec::new());
            }
            Advance::Accumulated(milestones) => milestones,
        };

        let now = self.clock.now();
        let mut credits = Vec::with_capacity(milestones.len());
        for milestone in &milestones {
            let Some(session) = self.tracker.active() else {
                break;
            };
            let credit = self.policy.evaluate(milestone, session, self.ledger.state());
            self.tracker.consume(milestone);
            if credit.reason != RewardReason::AlreadyCredited {
                self.ledger.apply(&credit, self.tracker.active(), now);
            }
            credits.push(credit);
        }
        self.ledger.save_session(self.tracker.active());

        let reason = summarize(&credits);
        self.outcome(reason, credits)
    }

    fn outcome(&self, reason: RewardReason, credits: Vec<Credit>) -> TickOutcome {
        TickOutcome {
            tokens_earned: credits.iter().map(|c| c.tokens).sum(),
            reason,
            total_tokens: self.ledger.state().total_tokens,
            session: self.tracker.active().cloned(),
            daily_progress: self.daily_progress(),
            credits,
        }
    }

    pub fn state(&self) -> &RewardLedgerState {
        self.ledger.state()
    }

    pub fn daily_progress(&self) -> DailyProgress {
        let today = self.clock.today_key();
        self.ledger
            .daily_progress(self.policy.daily_cap(), today.as_deref())
    }

    /// Credited events, newest first.
    pub fn history(&self) -> &[RewardEvent] {
        self.ledger.history()
    }

    pub fn session(&self) -> Option<&ListeningSession> {
        self.tracker.active()
    }

    pub fn debug_snapshot(&self) -> DebugSnapshot {
        project(
            self.last_sample.as_ref(),
            &self.tracker,
            &self.ledger,
            &self.policy,
            self.daily_progress(),
        )
    }

    pub fn flush(&mut self) -> Result<(), StoreError> {
        self.ledger.flush()
    }

    pub fn ledger(&self) -> &RewardLedger<S> {
        &self.ledger
    }
}

/// The reason of the last credit that paid out, otherwise the first
/// zero-credit reason.
fn summarize(credits: &[Credit]) -> RewardReason {
    credits
        .iter()
        .rev()
        .find(|c| c.tokens > 0)
        .or_else(|| credits.first())
        .map_or(RewardReason::Listening, |c| c.reason)
}
