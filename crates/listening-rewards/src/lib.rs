//! Listening-time reward ledger.
//!
//! A once-per-second playback sample drives a [`RewardEngine`]. Eligible
//! seconds accumulate in the live session, and minute boundaries or track
//! completion become credits clamped by the daily cap. Credits are applied to
//! a durable ledger behind a [`KeyValueStore`].

pub mod daily_cap;
pub mod debug;
pub mod eligibility;
pub mod engine;
pub mod ledger;
pub mod policy;
pub mod session;
pub mod shared;
pub mod store;


pub use daily_cap::DailyCap;
pub use debug::DebugSnapshot;
pub use eligibility::{is_eligible, Ineligibility};
pub use engine::RewardEngine;
pub use ledger::{LoadOutcome, RewardLedger};
pub use policy::RewardPolicy;
pub use session::{Milestone, SessionTracker, TrackerState};
pub use shared::SharedRewardEngine;
pub use store::{JsonFileStore, KeyValueStore, MemoryStore, StoreError};
