use reward_core::{PlaybackSample, NEAR_ZERO_VOLUME};
use serde::{Deserialize, Serialize};

/// First failing condition of a sample, for introspection only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ineligibility {
    NotPlaying,
    Muted,
    SurfaceHidden,
}

pub fn check_eligibility(sample: &PlaybackSample) -> Result<(), Ineligibility> {
    if !sample.is_playing {
        return Err(Ineligibility::NotPlaying);
    }
    if sample.volume.is_nan() || sample.volume <= NEAR_ZERO_VOLUME {
        return Err(Ineligibility::Muted);
    }
    if !sample.is_surface_visible {
        return Err(Ineligibility::SurfaceHidden);
    }
    Ok(())
}

/// Whether this tick counts toward accumulation: audibly playing and
/// foregrounded.
pub fn is_eligible(sample: &PlaybackSample) -> bool {
    check_eligibility(sample).is_ok()
}
