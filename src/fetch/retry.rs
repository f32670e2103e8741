//! Round-based retry driver with exponential backoff and jitter.
//!
//! Both tiers funnel their batch calls through [`run_rounds`]. The driver
//! owns the per-round working set exclusively: each round partitions the
//! remaining keys into fixed-size batches, calls `process` on each batch
//! sequentially, and settles keys the resolution accounts for. A batch
//! error keeps the whole batch in play; a successful resolution settles
//! its `found` and `absent` keys and keeps only the keys it never
//! mentioned. The distinction between a definitive negative and no answer
//! at all is what keeps permanently-abstract-less pages from eating the
//! retry budget while genuinely delayed responses still get retried.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::fetch::FetchError;

pub const DEFAULT_MAX_ROUNDS: u32 = 5;
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Per-tier retry parameters.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum number of rounds over the shrinking work set
    pub max_rounds: u32,
    /// Keys per network call
    pub batch_size: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// What one successful batch call resolved.
///
/// Keys in neither list are considered unanswered and stay in the working
/// set for the next round.
#[derive(Debug)]
pub struct BatchResolution<P> {
    /// Keys with a usable payload
    pub found: Vec<(String, P)>,
    /// Keys the service definitively had nothing for
    pub absent: Vec<String>,
}

impl<P> Default for BatchResolution<P> {
    fn default() -> Self {
        Self {
            found: Vec::new(),
            absent: Vec::new(),
        }
    }
}

/// Final partition after the round budget.
#[derive(Debug)]
pub struct RoundReport<P> {
    pub found: Vec<(String, P)>,
    pub absent: Vec<String>,
    /// Keys still unanswered when the budget ran out
    pub failed: Vec<String>,
}

/// Backoff before round `round` (0-indexed): `2^round + jitter` seconds.
///
/// Pure so tests can pin the deterministic component; callers draw
/// `jitter` from `[0, 1)`.
pub fn backoff_delay(round: u32, jitter: f64) -> Duration {
    Duration::from_secs_f64(2f64.powi(round as i32) + jitter)
}

/// Drive up to `max_rounds` rounds of batched calls over `keys`.
///
/// `process` receives one batch and either resolves it (possibly
/// partially) or fails as a whole. No delay precedes round 0.
pub async fn run_rounds<P, F, Fut>(
    keys: Vec<String>,
    config: &RetryConfig,
    mut process: F,
) -> RoundReport<P>
where
    F: FnMut(Vec<String>) -> Fut,
    Fut: Future<Output = Result<BatchResolution<P>, FetchError>>,
{
    let mut remaining = keys;
    let mut found = Vec::new();
    let mut absent = Vec::new();

    for round in 0..config.max_rounds {
        if remaining.is_empty() {
            break;
        }

        if round > 0 {
            let delay = backoff_delay(round, rand::thread_rng().gen::<f64>());
            tracing::debug!(
                round,
                remaining = remaining.len(),
                delay_ms = delay.as_millis() as u64,
                "backing off before retry round"
            );
            tokio::time::sleep(delay).await;
        }

        let batches: Vec<Vec<String>> = remaining
            .chunks(config.batch_size.max(1))
            .map(<[String]>::to_vec)
            .collect();
        let mut next_round = Vec::new();

        for batch in batches {
            match process(batch.clone()).await {
                Ok(resolution) => {
                    let mut settled: HashSet<String> = resolution.absent.iter().cloned().collect();
                    settled.extend(resolution.found.iter().map(|(key, _)| key.clone()));

                    next_round.extend(batch.into_iter().filter(|key| !settled.contains(key)));
                    found.extend(resolution.found);
                    absent.extend(resolution.absent);
                }
                Err(err) => {
                    tracing::warn!(
                        round,
                        batch_len = batch.len(),
                        error = %err,
                        "batch call failed, keeping items for retry"
                    );
                    next_round.extend(batch);
                }
            }
        }

        remaining = next_round;
    }

    if !remaining.is_empty() {
        tracing::warn!(failed = remaining.len(), "retry budget exhausted");
    }

    RoundReport {
        found,
        absent,
        failed: remaining,
    }
}
