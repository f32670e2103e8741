//! # Paper Enrich
//!
//! Tiered abstract acquisition for academic-paper feeds: turn partial
//! paper records (title + link, no abstract) into complete ones.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (Paper, ExtractionResult, TierOutcome)
//! - [`fetch`]: The two fetch tiers and the shared retry/backoff engine
//! - [`parse`]: Per-publisher content parsing with a generic fallback
//! - [`pipeline`]: The orchestrator sequencing Tier-1 and Tier-2
//! - [`config`]: Caller-supplied service configuration
//!
//! ## Usage
//!
//! ```rust,no_run
//! use paper_enrich::{AbstractPipeline, Paper, PipelineConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = AbstractPipeline::from_config(&PipelineConfig::default())?;
//! let papers = vec![Paper::new(
//!     "10.1038/s41566-025-1",
//!     "https://doi.org/10.1038/s41566-025-1",
//!     "A tunable photonic lattice",
//! )];
//! for enriched in pipeline.enrich(papers, "nature").await {
//!     println!("{}: {}", enriched.paper.id, enriched.result);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod fetch;
pub mod models;
pub mod parse;
pub mod pipeline;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use models::{EnrichedPaper, ExtractionResult, Paper};
pub use pipeline::AbstractPipeline;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
