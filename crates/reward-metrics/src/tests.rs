use crate::RewardMetrics;
use listening_rewards::{MemoryStore, RewardEngine};
use reward_core::{LedgerOptions, ManualClock, RewardPolicyConfig};

#[test]
fn credits_and_capped_milestones_are_counted() {
    let clock = ManualClock::at(2026, 3, 1, 12, 0);
    let cfg = RewardPolicyConfig {
        tokens_per_minute: 2,
        song_completion_bonus: 2,
        daily_cap: 5,
    };
    let mut engine = RewardEngine::open(cfg, LedgerOptions::default(), MemoryStore::new(), clock).unwrap();
    let metrics = RewardMetrics::new().unwrap();
    metrics.observe_state(engine.state());

    engine.start_session("long-mix", 3600);
    for _ in 0..240 {
        metrics.observe_tick(&engine.tick(true, 0.8, true, None));
    }
    metrics.observe_tick(&engine.tick(true, 0.0, true, None));

    assert_eq!(
        metrics.tokens_credited_total.with_label_values(&["minute"]).get(),
        5
    );
    assert_eq!(
        metrics.milestones_capped_total.with_label_values(&["minute"]).get(),
        1
    );
    assert_eq!(metrics.ticks_total.with_label_values(&["minute"]).get(), 3);
    assert_eq!(metrics.ticks_total.with_label_values(&["not_eligible"]).get(), 1);
    assert_eq!(metrics.total_tokens.get(), 5);
    assert_eq!(metrics.daily_progress_percent.get(), 100.0);

    let text = metrics.render().unwrap();
    assert!(text.contains("listening_tokens_credited_total{kind=\"minute\"} 5"));
    assert!(text.contains("listening_today_tokens_earned 5"));
}

#[test]
fn separate_instances_do_not_collide() {
    let a = RewardMetrics::new().unwrap();
    let b = RewardMetrics::new().unwrap();
    a.total_tokens.set(3);
    assert_eq!(b.total_tokens.get(), 0);
    assert!(!a.registry().gather().is_empty());
}
