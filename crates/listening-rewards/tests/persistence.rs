use listening_rewards::{JsonFileStore, KeyValueStore, LoadOutcome, RewardEngine};
use reward_core::{LedgerOptions, ManualClock, RewardPolicyConfig};
use tempfile::TempDir;

fn open(dir: &TempDir, clock: &ManualClock, options: LedgerOptions) -> RewardEngine<JsonFileStore, ManualClock> {
    let store = JsonFileStore::open(dir.path()).unwrap();
    RewardEngine::open(RewardPolicyConfig::default(), options, store, clock.clone()).unwrap()
}

#[test]
fn ledger_round_trips_through_file_store() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at(2026, 3, 1, 9, 30);

    let before = {
        let mut engine = open(&dir, &clock, LedgerOptions::default());
        engine.start_session("song-a", 120);
        for second in 1..=130u64 {
            engine.tick(true, 0.6, true, Some((second as f64 / 120.0).min(1.0)));
        }
        engine.end_session();
        engine.state().clone()
    };
    assert_eq!(before.total_tokens, 7);
    assert_eq!(before.history.len(), 3);

    let engine = open(&dir, &clock, LedgerOptions::default());
    assert_eq!(engine.ledger().load_outcome(), LoadOutcome::Restored);
    assert_eq!(engine.state(), &before);
}

#[test]
fn reload_applies_the_history_bound() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at(2026, 3, 1, 9, 30);
    {
        let mut engine = open(&dir, &clock, LedgerOptions::default());
        engine.start_session("mix", 3600);
        for _ in 0..300 {
            engine.tick(true, 0.6, true, None);
        }
        assert_eq!(engine.history().len(), 5);
    }

    let options = LedgerOptions {
        history_limit: 2,
        ..LedgerOptions::default()
    };
    let engine = open(&dir, &clock, options);
    assert_eq!(engine.history().len(), 2);
    assert_eq!(engine.state().total_tokens, 5);
    assert!(engine.history()[0].timestamp >= engine.history()[1].timestamp);
}

#[test]
fn interrupted_session_resumes_for_the_same_track() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at(2026, 3, 1, 9, 30);
    {
        let mut engine = open(&dir, &clock, LedgerOptions::default());
        engine.start_session("song-a", 300);
        for _ in 0..90 {
            engine.tick(true, 0.6, true, None);
        }
        // Dropped without end_session, as in a crash.
    }

    let mut engine = open(&dir, &clock, LedgerOptions::default());
    let snapshot = engine.debug_snapshot();
    assert_eq!(snapshot.recovered_session_pending.as_deref(), Some("song-a"));
    assert!(engine.session().is_none());

    engine.start_session("song-a", 300);
    let session = engine.session().unwrap();
    assert_eq!(session.accumulated_seconds, 90);
    assert_eq!(session.last_minute_rewarded, 1);

    for _ in 0..30 {
        engine.tick(true, 0.6, true, None);
    }
    assert_eq!(engine.state().total_tokens, 2);
    assert_eq!(engine.state().lifetime_minutes, 2);
}

#[test]
fn interrupted_session_is_dropped_for_another_track() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at(2026, 3, 1, 9, 30);
    {
        let mut engine = open(&dir, &clock, LedgerOptions::default());
        engine.start_session("song-a", 300);
        for _ in 0..45 {
            engine.tick(true, 0.6, true, None);
        }
    }

    let mut engine = open(&dir, &clock, LedgerOptions::default());
    engine.start_session("song-b", 300);
    assert_eq!(engine.session().unwrap().accumulated_seconds, 0);
    assert!(engine.debug_snapshot().recovered_session_pending.is_none());
}

#[test]
fn ended_session_leaves_no_snapshot() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at(2026, 3, 1, 9, 30);
    let options = LedgerOptions::default();
    {
        let mut engine = open(&dir, &clock, options.clone());
        engine.start_session("song-a", 300);
        engine.tick(true, 0.6, true, None);
        engine.end_session();
    }
    let store = JsonFileStore::open(dir.path()).unwrap();
    let record = store.get(&options.state_key).unwrap().unwrap();
    assert!(record.get("active_session").is_none());
    assert_eq!(record["total_tokens"], 0);
}

#[test]
fn corrupted_file_resets_to_a_fresh_ledger() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at(2026, 3, 1, 9, 30);
    let options = LedgerOptions::default();
    let store = JsonFileStore::open(dir.path()).unwrap();
    std::fs::write(store.path_for(&options.state_key), b"{ truncated").unwrap();

    let mut engine = open(&dir, &clock, options);
    assert_eq!(engine.ledger().load_outcome(), LoadOutcome::ResetCorrupted);
    assert_eq!(engine.state().total_tokens, 0);
    assert_eq!(engine.debug_snapshot().ledger.load_outcome, "reset_corrupted");

    engine.start_session("song-a", 600);
    for _ in 0..60 {
        engine.tick(true, 0.6, true, None);
    }
    assert_eq!(engine.state().total_tokens, 1);
}

#[test]
fn file_store_sanitizes_keys() {
    let dir = TempDir::new().unwrap();
    let mut store = JsonFileStore::open(dir.path()).unwrap();
    let path = store.path_for("user/42:ledger");
    assert_eq!(path.file_name().unwrap(), "user_42_ledger.json");

    store.set("user/42:ledger", &serde_json::json!({ "ok": true })).unwrap();
    assert_eq!(store.get("user/42:ledger").unwrap().unwrap()["ok"], true);
    store.remove("user/42:ledger").unwrap();
    store.remove("user/42:ledger").unwrap();
    assert!(store.get("user/42:ledger").unwrap().is_none());
}

#[test]
fn restart_right_after_a_minute_credit_does_not_repeat_it() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at(2026, 3, 1, 9, 30);
    {
        let mut engine = open(&dir, &clock, LedgerOptions::default());
        engine.start_session("song-a", 600);
        for _ in 0..60 {
            engine.tick(true, 0.6, true, None);
        }
        assert_eq!(engine.state().total_tokens, 1);
    }

    let mut engine = open(&dir, &clock, LedgerOptions::default());
    engine.start_session("song-a", 600);
    assert_eq!(engine.session().unwrap().last_minute_rewarded, 1);

    let out = engine.tick(true, 0.6, true, None);
    assert_eq!(out.tokens_earned, 0);
    assert_eq!(engine.state().total_tokens, 1);
    assert_eq!(engine.state().lifetime_minutes, 1);
    assert_eq!(engine.session().unwrap().accumulated_seconds, 61);
}

#[test]
fn session_markers_share_the_ledger_record() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at(2026, 3, 1, 9, 30);
    let options = LedgerOptions::default();
    let mut engine = open(&dir, &clock, options.clone());
    engine.start_session("song-a", 600);
    for _ in 0..75 {
        engine.tick(true, 0.6, true, None);
    }

    let store = JsonFileStore::open(dir.path()).unwrap();
    let record = store.get(&options.state_key).unwrap().unwrap();
    assert_eq!(record["total_tokens"], 1);
    assert_eq!(record["active_session"]["accumulated_seconds"], 75);
    assert_eq!(record["active_session"]["last_minute_rewarded"], 1);
}

#[test]
fn file_store_replaces_without_leaving_temp_files() {
    let dir = TempDir::new().unwrap();
    let mut store = JsonFileStore::open(dir.path()).unwrap();
    store.set("ledger", &serde_json::json!({ "n": 1 })).unwrap();
    store.set("ledger", &serde_json::json!({ "n": 2 })).unwrap();

    assert_eq!(store.get("ledger").unwrap().unwrap()["n"], 2);
    let names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["ledger.json".to_string()]);
}
