use crate::eligibility::is_eligible;
use chrono::{DateTime, Utc};
use reward_core::{ListeningSession, PlaybackSample, COMPLETION_THRESHOLD};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// A session milestone awaiting a policy decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Milestone {
    /// Minute boundaries `first..=last` crossed since the last credit,
    /// coalesced into one milestone.
    Minute { first: u64, last: u64 },
    SongComplete,
}

impl Milestone {
    pub fn minutes(&self) -> u64 {
        match *self {
            Milestone::Minute { first, last } => last + 1 - first,
            Milestone::SongComplete => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    NoSession,
    Ineligible,
    Accumulated(Vec<Milestone>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerState {
    Idle,
    Active,
}

/// Owns the single live listening session.
#[derive(Debug, Default)]
pub struct SessionTracker {
    active: Option<ListeningSession>,
    recovered: Option<ListeningSession>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker holding a session snapshot that survived a restart. It is
    /// resumed only by a matching `start`.
    pub fn with_recovered(recovered: Option<ListeningSession>) -> Self {
        Self {
            active: None,
            recovered,
        }
    }

    pub fn state(&self) -> TrackerState {
        if self.active.is_some() {
            TrackerState::Active
        } else {
            TrackerState::Idle
        }
    }

    pub fn active(&self) -> Option<&ListeningSession> {
        self.active.as_ref()
    }

    pub fn recovered(&self) -> Option<&ListeningSession> {
        self.recovered.as_ref()
    }

    /// Begin a session for `track_id`, finalizing any live one first.
    /// Returns the finalized session.
    pub fn start(
        &mut self,
        track_id: &str,
        track_duration_seconds: u64,
        now: DateTime<Utc>,
    ) -> Option<ListeningSession> {
        let finalized = self.finalize();

        if track_duration_seconds == 0 {
            warn!(track_id, "track has no duration, completion bonus disabled");
        }

        let resumed = self.recovered.take().filter(|s| {
            s.track_id == track_id && s.track_duration_seconds == track_duration_seconds
        });
        let session = match resumed {
            Some(session) => {
                info!(
                    track_id,
                    accumulated_seconds = session.accumulated_seconds,
                    "resumed recovered listening session"
                );
                session
            }
            None => ListeningSession::new(track_id, track_duration_seconds, now),
        };
        self.active = Some(session);
        finalized
    }

    /// Close out the live session. Already-credited tokens are untouched.
    pub fn finalize(&mut self) -> Option<ListeningSession> {
        let finalized = self.active.take();
        if let Some(session) = &finalized {
            debug!(
                track_id = %session.track_id,
                accumulated_seconds = session.accumulated_seconds,
                "listening session finalized"
            );
        }
        finalized
    }

    /// Count one eligible second and report the milestones it reaches.
    /// Markers are not moved here; see [`SessionTracker::consume`].
    pub fn advance(&mut self, sample: &PlaybackSample) -> Advance {
        let Some(session) = self.active.as_mut() else {
            return Advance::NoSession;
        };
        if !is_eligible(sample) {
            return Advance::Ineligible;
        }

        // A long gap between ticks still counts as a single second.
        session.accumulated_seconds += 1;
        session.track_listened_seconds += 1;

        let mut milestones = Vec::new();
        let pending = session.pending_minutes();
        if pending > 0 {
            milestones.push(Milestone::Minute {
                first: session.last_minute_rewarded + 1,
                last: session.current_minute(),
            });
        }
        if completion_reached(session, sample.progress_fraction) {
            milestones.push(Milestone::SongComplete);
        }
        Advance::Accumulated(milestones)
    }

    /// Mark a milestone as consumed, whether or not it yielded tokens.
    pub fn consume(&mut self, milestone: &Milestone) {
        let Some(session) = self.active.as_mut() else {
            return;
        };
        match *milestone {
            Milestone::Minute { last, .. } => {
                session.last_minute_rewarded = session.last_minute_rewarded.max(last);
            }
            Milestone::SongComplete => session.completion_credited = true,
        }
    }
}

/// Listened time and reported progress must both reach the threshold. A
/// missing progress report leaves listened time as the only signal.
pub fn completion_reached(session: &ListeningSession, progress_fraction: Option<f64>) -> bool {
    !session.completion_credited
        && session.track_duration_seconds > 0
        && session.listened_fraction() >= COMPLETION_THRESHOLD
        && progress_fraction.map_or(true, |p| p >= COMPLETION_THRESHOLD)
}
