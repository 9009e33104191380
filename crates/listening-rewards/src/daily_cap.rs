use reward_core::{DailyProgress, RewardLedgerState};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyCap {
    cap: u64,
}

impl DailyCap {
    pub fn new(cap: u64) -> Self {
        Self { cap }
    }

    pub fn cap(&self) -> u64 {
        self.cap
    }

    pub fn headroom(&self, state: &RewardLedgerState) -> u64 {
        self.cap.saturating_sub(state.today_tokens_earned)
    }

    /// `max(0, min(nominal, cap - today))`
    pub fn clamp(&self, nominal: u64, state: &RewardLedgerState) -> u64 {
        nominal.min(self.headroom(state))
    }

    /// Progress as it would read for `today`, without mutating `state`. An
    /// unknown day is read as the stored day.
    pub fn progress(&self, state: &RewardLedgerState, today: Option<&str>) -> DailyProgress {
        let earned = match today {
            Some(day) if day != state.today_date_key => 0,
            _ => state.today_tokens_earned,
        };
        DailyProgress::new(earned, self.cap)
    }
}

/// Reset the day's counter when the calendar day changed. Returns whether a
/// rollover happened; the caller persists it before evaluating any credit.
/// An unknown day never rolls over, so no extra headroom is granted.
pub fn roll_over(state: &mut RewardLedgerState, today: Option<&str>) -> bool {
    let Some(today) = today else {
        return false;
    };
    if today == state.today_date_key {
        return false;
    }
    info!(
        previous_day = %state.today_date_key,
        today,
        previous_earned = state.today_tokens_earned,
        "daily cap rolled over"
    );
    state.today_tokens_earned = 0;
    state.today_date_key = today.to_string();
    true
}
