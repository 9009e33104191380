use crate::daily_cap::DailyCap;
use crate::session::Milestone;
use reward_core::{Credit, ListeningSession, RewardKind, RewardLedgerState, RewardPolicyConfig, RewardReason};

/// Maps milestones to token amounts, clamped to the day's headroom.
#[derive(Debug, Clone, Copy)]
pub struct RewardPolicy {
    config: RewardPolicyConfig,
}

impl RewardPolicy {
    pub fn new(config: RewardPolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RewardPolicyConfig {
        &self.config
    }

    pub fn daily_cap(&self) -> DailyCap {
        DailyCap::new(self.config.daily_cap)
    }

    pub fn nominal(&self, milestone: &Milestone) -> u64 {
        match milestone {
            Milestone::Minute { .. } => self
                .config
                .tokens_per_minute
                .saturating_mul(milestone.minutes()),
            Milestone::SongComplete => self.config.song_completion_bonus,
        }
    }

    /// Decide the credit for `milestone`. `state` must already be rolled over
    /// to the current day.
    pub fn evaluate(
        &self,
        milestone: &Milestone,
        session: &ListeningSession,
        state: &RewardLedgerState,
    ) -> Credit {
        let (kind, minutes) = match milestone {
            Milestone::Minute { .. } => (RewardKind::Minute, milestone.minutes()),
            Milestone::SongComplete => (RewardKind::SongComplete, 0),
        };
        let nominal = self.nominal(milestone);

        if already_consumed(milestone, session) {
            return Credit {
                kind,
                minutes,
                nominal,
                tokens: 0,
                reason: RewardReason::AlreadyCredited,
            };
        }

        let tokens = self.daily_cap().clamp(nominal, state);
        let reason = if tokens == 0 && nominal > 0 {
            RewardReason::DailyCapReached
        } else {
            kind.into()
        };
        Credit {
            kind,
            minutes,
            nominal,
            tokens,
            reason,
        }
    }
}

fn already_consumed(milestone: &Milestone, session: &ListeningSession) -> bool {
    match *milestone {
        Milestone::Minute { last, .. } => last <= session.last_minute_rewarded,
        Milestone::SongComplete => session.completion_credited,
    }
}
