pub mod metrics;

#[cfg(test)]
mod tests;

pub use metrics::RewardMetrics;
