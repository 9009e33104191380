use prometheus::{
    Encoder, Gauge, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use reward_core::{RewardLedgerState, RewardReason, TickOutcome};

/// Prometheus view of the reward stream, on its own registry so several
/// engines can be observed in one process.
pub struct RewardMetrics {
    registry: Registry,
    pub ticks_total: IntCounterVec,
    pub tokens_credited_total: IntCounterVec,
    pub milestones_capped_total: IntCounterVec,
    pub total_tokens: IntGauge,
    pub today_tokens_earned: IntGauge,
    pub daily_progress_percent: Gauge,
}

impl RewardMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let ticks_total = IntCounterVec::new(
            Opts::new("listening_ticks_total", "Sampling ticks by outcome reason"),
            &["reason"],
        )?;
        let tokens_credited_total = IntCounterVec::new(
            Opts::new("listening_tokens_credited_total", "Tokens credited by milestone kind"),
            &["kind"],
        )?;
        let milestones_capped_total = IntCounterVec::new(
            Opts::new(
                "listening_milestones_capped_total",
                "Milestones consumed with zero tokens because the daily cap was reached",
            ),
            &["kind"],
        )?;
        let total_tokens = IntGauge::new("listening_total_tokens", "All-time token balance")?;
        let today_tokens_earned =
            IntGauge::new("listening_today_tokens_earned", "Tokens credited today")?;
        let daily_progress_percent = Gauge::new(
            "listening_daily_progress_percent",
            "Share of the daily cap earned today",
        )?;

        registry.register(Box::new(ticks_total.clone()))?;
        registry.register(Box::new(tokens_credited_total.clone()))?;
        registry.register(Box::new(milestones_capped_total.clone()))?;
        registry.register(Box::new(total_tokens.clone()))?;
        registry.register(Box::new(today_tokens_earned.clone()))?;
        registry.register(Box::new(daily_progress_percent.clone()))?;

        Ok(Self {
            registry,
            ticks_total,
            tokens_credited_total,
            milestones_capped_total,
            total_tokens,
            today_tokens_earned,
            daily_progress_percent,
        })
    }

    pub fn observe_tick(&self, outcome: &TickOutcome) {
        self.ticks_total
            .with_label_values(&[outcome.reason.as_str()])
            .inc();
        for credit in &outcome.credits {
            let kind = credit.kind.as_str();
            if credit.tokens > 0 {
                self.tokens_credited_total
                    .with_label_values(&[kind])
                    .inc_by(credit.tokens);
            } else if credit.reason == RewardReason::DailyCapReached {
                self.milestones_capped_total.with_label_values(&[kind]).inc();
            }
        }
        self.total_tokens.set(clamp_i64(outcome.total_tokens));
        self.today_tokens_earned
            .set(clamp_i64(outcome.daily_progress.earned));
        self.daily_progress_percent
            .set(outcome.daily_progress.progress);
    }

    /// Seed the gauges from a loaded ledger before any tick arrives.
    pub fn observe_state(&self, state: &RewardLedgerState) {
        self.total_tokens.set(clamp_i64(state.total_tokens));
        self.today_tokens_earned
            .set(clamp_i64(state.today_tokens_earned));
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Text exposition format of every registered metric.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

fn clamp_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}
