//! Tiered abstract fetchers and the retry engine they share.
//!
//! Both tiers implement [`FetchTier`]: take a set of papers, classify every
//! one of them into found / confirmed-absent / failed, and never raise.
//! Service failures are absorbed by the retry engine and surface only as
//! the `failed` bucket.

mod extract_service;
mod http;
mod metadata_api;
pub mod mock;
mod retry;

pub use extract_service::{urls_match, ExtractServiceFetcher};
pub use http::HttpClient;
pub use metadata_api::MetadataApiFetcher;
pub use mock::MockTier;
pub use retry::{
    backoff_delay, run_rounds, BatchResolution, RetryConfig, RoundReport, DEFAULT_BATCH_SIZE,
    DEFAULT_MAX_ROUNDS,
};

use async_trait::async_trait;

use crate::models::{Paper, TierOutcome};

/// One fetch strategy in the fallback chain.
#[async_trait]
pub trait FetchTier: Send + Sync + std::fmt::Debug {
    /// Short identifier used in logs (e.g. "metadata-api")
    fn id(&self) -> &str;

    /// Classify every input paper.
    ///
    /// `source` is the caller-declared publisher tag; Tier-2 uses it to
    /// dispatch content-parsing rules. The returned outcome always covers
    /// the full input set.
    async fn fetch(&self, papers: Vec<Paper>, source: &str) -> TierOutcome;
}

/// Errors raised by a single batch request.
///
/// All variants except `InvalidConfig` are retryable: the engine treats any
/// batch error uniformly and keeps the batch for the next round.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Network or transport error
    #[error("network error: {0}")]
    Network(String),

    /// Non-success status from the service
    #[error("api returned status {status}: {message}")]
    Api { status: u16, message: String },

    /// Malformed payload
    #[error("parse error: {0}")]
    Parse(String),

    /// Well-formed transport, nothing in the body
    #[error("empty response")]
    EmptyResponse,

    /// Bad caller-supplied configuration; surfaces only at construction
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(format!("JSON: {}", err))
    }
}
