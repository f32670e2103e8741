//! Configuration management.
//!
//! Credentials and base URLs for the two services are caller-supplied
//! opaque configuration; API keys fall back to environment variables when
//! a config file leaves them out.

use serde::{Deserialize, Serialize};

use crate::fetch::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_ROUNDS};

/// Pipeline configuration.
///
/// A tier without configuration is simply not run; the orchestrator still
/// classifies every paper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Tier-1 metadata API, if the deployment has one
    #[serde(default)]
    pub metadata_api: Option<MetadataApiConfig>,

    /// Tier-2 content-extraction service
    #[serde(default)]
    pub extract_service: Option<ExtractServiceConfig>,

    /// Per-request timeout, seconds
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            metadata_api: Some(MetadataApiConfig::default()),
            extract_service: Some(ExtractServiceConfig::default()),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

/// Tier-1 service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataApiConfig {
    #[serde(default = "default_metadata_base_url")]
    pub base_url: String,

    /// Falls back to the `METADATA_API_KEY` env var
    #[serde(default = "metadata_api_key_from_env")]
    pub api_key: Option<String>,

    /// Publisher tag this API serves; Tier-1 only runs for this source
    #[serde(default = "default_metadata_source")]
    pub source: String,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
}

impl Default for MetadataApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_metadata_base_url(),
            api_key: metadata_api_key_from_env(),
            source: default_metadata_source(),
            batch_size: default_batch_size(),
            max_rounds: default_max_rounds(),
        }
    }
}

/// Tier-2 service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractServiceConfig {
    #[serde(default = "default_extract_base_url")]
    pub base_url: String,

    /// Falls back to the `EXTRACT_API_KEY` env var
    #[serde(default = "extract_api_key_from_env")]
    pub api_key: Option<String>,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
}

impl Default for ExtractServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_extract_base_url(),
            api_key: extract_api_key_from_env(),
            batch_size: default_batch_size(),
            max_rounds: default_max_rounds(),
        }
    }
}

fn default_metadata_base_url() -> String {
    "https://api.springernature.com/meta/v2/json".to_string()
}

fn default_extract_base_url() -> String {
    "https://api.tavily.com/extract".to_string()
}

fn default_metadata_source() -> String {
    "nature".to_string()
}

fn metadata_api_key_from_env() -> Option<String> {
    std::env::var("METADATA_API_KEY").ok()
}

fn extract_api_key_from_env() -> Option<String> {
    std::env::var("EXTRACT_API_KEY").ok()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_max_rounds() -> u32 {
    DEFAULT_MAX_ROUNDS
}
