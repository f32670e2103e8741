//! Core data models for papers and extraction outcomes.

mod outcome;
mod paper;

pub use outcome::{EnrichedPaper, ExtractionResult, TierOutcome};
pub use paper::Paper;
