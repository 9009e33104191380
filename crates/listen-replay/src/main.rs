mod trace;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use listening_rewards::{JsonFileStore, KeyValueStore, MemoryStore, RewardEngine};
use reward_core::{LedgerOptions, RewardPolicyConfig, SystemClock};
use reward_metrics::RewardMetrics;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use trace::{read_trace, TraceEntry};
use tracing::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Replay a JSON-lines playback trace through the listening reward engine.
#[derive(Debug, Parser)]
#[command(name = "listen-replay", version)]
struct Args {
    /// Trace file, or `-` for stdin.
    trace: PathBuf,

    /// Persist the ledger as JSON files in this directory instead of memory.
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Reward policy config (JSON).
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 50)]
    history_limit: usize,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Print the debug snapshot after the replay.
    #[arg(long)]
    snapshot: bool,

    /// Print Prometheus metrics after the replay.
    #[arg(long)]
    metrics: bool,
}

#[derive(Serialize)]
struct CreditLine<'a> {
    tick: u64,
    tokens_earned: u64,
    reason: &'a str,
    total_tokens: u64,
    today_remaining: u64,
}

fn init_tracing(format: LogFormat) {
    let builder = tracing_subscriber::fmt().with_writer(io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn open_store(state_dir: Option<&PathBuf>) -> Result<Box<dyn KeyValueStore + Send>> {
    Ok(match state_dir {
        Some(dir) => Box::new(
            JsonFileStore::open(dir)
                .with_context(|| format!("opening state dir {}", dir.display()))?,
        ),
        None => Box::new(MemoryStore::new()),
    })
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let config = match &args.config {
        Some(path) => RewardPolicyConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RewardPolicyConfig::default(),
    };
    let options = LedgerOptions {
        history_limit: args.history_limit,
        ..LedgerOptions::default()
    };

    let entries = if args.trace.as_os_str() == "-" {
        read_trace(io::stdin().lock())?
    } else {
        let file = File::open(&args.trace)
            .with_context(|| format!("opening trace {}", args.trace.display()))?;
        read_trace(BufReader::new(file))?
    };

    let store = open_store(args.state_dir.as_ref())?;
    let mut engine = RewardEngine::open(config, options, store, SystemClock)?;
    let metrics = RewardMetrics::new()?;
    metrics.observe_state(engine.state());

    info!(entries = entries.len(), "replaying trace");
    let mut tick = 0u64;
    for entry in entries {
        match entry {
            TraceEntry::Start { track_id, duration } => {
                engine.start_session(&track_id, duration);
            }
            TraceEntry::Tick { sample, repeat } => {
                for _ in 0..repeat {
                    tick += 1;
                    let outcome = engine.tick_sample(sample);
                    metrics.observe_tick(&outcome);
                    if outcome.credits.is_empty() {
                        continue;
                    }
                    let line = CreditLine {
                        tick,
                        tokens_earned: outcome.tokens_earned,
                        reason: outcome.reason.as_str(),
                        total_tokens: outcome.total_tokens,
                        today_remaining: outcome.daily_progress.remaining,
                    };
                    println!("{}", serde_json::to_string(&line)?);
                }
            }
            TraceEntry::End => {
                engine.end_session();
            }
        }
    }

    if let Err(err) = engine.flush() {
        tracing::warn!(error = %err, "final ledger write failed");
    }

    println!("{}", serde_json::to_string_pretty(engine.state())?);
    if args.snapshot {
        println!("{}", serde_json::to_string_pretty(&engine.debug_snapshot())?);
    }
    if args.metrics {
        print!("{}", metrics.render()?);
    }
    Ok(())
}
