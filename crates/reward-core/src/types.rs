use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Volumes at or below this are treated as muted.
pub const NEAR_ZERO_VOLUME: f64 = 0.01;
/// Fraction of a track that must be both listened and reported as played.
pub const COMPLETION_THRESHOLD: f64 = 0.8;
pub const SECONDS_PER_MINUTE: u64 = 60;

/// One playback-state sample, as emitted by the sampler roughly once a second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSample {
    pub is_playing: bool,
    pub volume: f64,
    pub is_surface_visible: bool,
    /// `None` when the player cannot report a position.
    #[serde(default)]
    pub progress_fraction: Option<f64>,
}

impl PlaybackSample {
    pub fn new(
        is_playing: bool,
        volume: f64,
        is_surface_visible: bool,
        progress_fraction: Option<f64>,
    ) -> Self {
        Self {
            is_playing,
            volume,
            is_surface_visible,
            progress_fraction,
        }
    }

    /// Clamp volume and progress into `0.0..=1.0`. A NaN volume reads as
    /// silence and a NaN progress as unknown.
    pub fn sanitized(self) -> Self {
        let volume = if self.volume.is_nan() {
            0.0
        } else {
            self.volume.clamp(0.0, 1.0)
        };
        let progress_fraction = self
            .progress_fraction
            .filter(|p| !p.is_nan())
            .map(|p| p.clamp(0.0, 1.0));
        Self {
            volume,
            progress_fraction,
            ..self
        }
    }
}

/// Live accumulation record for the track currently being credited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListeningSession {
    pub track_id: String,
    pub track_duration_seconds: u64,
    pub accumulated_seconds: u64,
    pub last_minute_rewarded: u64,
    pub track_listened_seconds: u64,
    pub completion_credited: bool,
    pub started_at: DateTime<Utc>,
}

impl ListeningSession {
    pub fn new(track_id: impl Into<String>, track_duration_seconds: u64, now: DateTime<Utc>) -> Self {
        Self {
            track_id: track_id.into(),
            track_duration_seconds,
            accumulated_seconds: 0,
            last_minute_rewarded: 0,
            track_listened_seconds: 0,
            completion_credited: false,
            started_at: now,
        }
    }

    pub fn current_minute(&self) -> u64 {
        self.accumulated_seconds / SECONDS_PER_MINUTE
    }

    /// Whole minutes reached but not yet consumed by the policy.
    pub fn pending_minutes(&self) -> u64 {
        self.current_minute().saturating_sub(self.last_minute_rewarded)
    }

    /// Listened fraction of the track; zero for tracks without a duration.
    pub fn listened_fraction(&self) -> f64 {
        if self.track_duration_seconds == 0 {
            return 0.0;
        }
        self.track_listened_seconds as f64 / self.track_duration_seconds as f64
    }

    pub fn seconds_to_next_minute(&self) -> u64 {
        SECONDS_PER_MINUTE - self.accumulated_seconds % SECONDS_PER_MINUTE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    Minute,
    SongComplete,
}

impl RewardKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RewardKind::Minute => "minute",
            RewardKind::SongComplete => "song_complete",
        }
    }
}

/// Audit-trail entry for one credited event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardEvent {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: RewardKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes: Option<u64>,
    pub tokens: u64,
    pub timestamp: DateTime<Utc>,
}

impl RewardEvent {
    pub fn minute(minutes: u64, tokens: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: RewardKind::Minute,
            minutes: Some(minutes),
            tokens,
            timestamp,
        }
    }

    pub fn song_complete(tokens: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: RewardKind::SongComplete,
            minutes: None,
            tokens,
            timestamp,
        }
    }
}

/// Durable balance, counters and bounded history (newest first).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardLedgerState {
    pub total_tokens: u64,
    pub lifetime_minutes: u64,
    pub songs_completed: u64,
    pub today_tokens_earned: u64,
    pub today_date_key: String,
    #[serde(default)]
    pub history: Vec<RewardEvent>,
}

impl RewardLedgerState {
    pub fn fresh(today_date_key: impl Into<String>) -> Self {
        Self {
            today_date_key: today_date_key.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyProgress {
    pub earned: u64,
    pub cap: u64,
    pub remaining: u64,
    /// Percentage of the cap earned, `0.0..=100.0`.
    pub progress: f64,
}

impl DailyProgress {
    pub fn new(earned: u64, cap: u64) -> Self {
        let remaining = cap.saturating_sub(earned);
        let progress = if cap == 0 {
            100.0
        } else {
            (earned as f64 / cap as f64 * 100.0).min(100.0)
        };
        Self {
            earned,
            cap,
            remaining,
            progress,
        }
    }
}

/// Why a tick or a single milestone produced the tokens it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardReason {
    Minute,
    SongComplete,
    /// Eligible tick with no milestone crossed.
    Listening,
    DailyCapReached,
    NotEligible,
    AlreadyCredited,
    NoActiveSession,
}

impl RewardReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RewardReason::Minute => "minute",
            RewardReason::SongComplete => "song_complete",
            RewardReason::Listening => "listening",
            RewardReason::DailyCapReached => "daily_cap_reached",
            RewardReason::NotEligible => "not_eligible",
            RewardReason::AlreadyCredited => "already_credited",
            RewardReason::NoActiveSession => "no_active_session",
        }
    }
}

impl From<RewardKind> for RewardReason {
    fn from(kind: RewardKind) -> Self {
        match kind {
            RewardKind::Minute => RewardReason::Minute,
            RewardKind::SongComplete => RewardReason::SongComplete,
        }
    }
}

/// Outcome of evaluating one milestone against the policy and daily cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credit {
    pub kind: RewardKind,
    /// Whole minutes covered; zero for completion credits.
    pub minutes: u64,
    pub nominal: u64,
    pub tokens: u64,
    pub reason: RewardReason,
}

/// What `tick` hands back to the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickOutcome {
    pub tokens_earned: u64,
    pub reason: RewardReason,
    pub total_tokens: u64,
    pub session: Option<ListeningSession>,
    pub daily_progress: DailyProgress,
    pub credits: Vec<Credit>,
}
