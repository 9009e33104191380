use anyhow::{Context, Result};
use reward_core::PlaybackSample;
use serde::Deserialize;
use std::io::BufRead;

/// One line of a replay trace.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TraceEntry {
    Start {
        track_id: String,
        duration: u64,
    },
    Tick {
        #[serde(flatten)]
        sample: PlaybackSample,
        /// Repeat the same sample this many times.
        #[serde(default = "one")]
        repeat: u32,
    },
    End,
}

fn one() -> u32 {
    1
}

/// Parse a JSON-lines trace. Blank lines and `#` comments are skipped.
pub fn read_trace(reader: impl BufRead) -> Result<Vec<TraceEntry>> {
    let mut entries = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading trace line {}", idx + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let entry = serde_json::from_str(trimmed)
            .with_context(|| format!("parsing trace line {}", idx + 1))?;
        entries.push(entry);
    }
    Ok(entries)
}
