//! Terminal classification types for the acquisition pipeline.

use serde::{Deserialize, Serialize};

use crate::models::Paper;

/// The three-way classification every paper ends in after the full pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionResult {
    /// A non-empty abstract was acquired
    WithAbstract,
    /// A service responded but had no abstract for this paper (settled, not retried)
    NoAbstractFound,
    /// No service produced a usable response after exhausting retries
    FetchFailed,
}

impl std::fmt::Display for ExtractionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExtractionResult::WithAbstract => "with_abstract",
            ExtractionResult::NoAbstractFound => "no_abstract_found",
            ExtractionResult::FetchFailed => "fetch_failed",
        };
        write!(f, "{}", s)
    }
}

/// A paper together with its terminal classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedPaper {
    pub paper: Paper,
    pub result: ExtractionResult,
}

impl EnrichedPaper {
    pub fn new(paper: Paper, result: ExtractionResult) -> Self {
        Self { paper, result }
    }
}

/// What one tier resolved for its input set.
///
/// `found` papers have their `summary` populated; `absent` papers received a
/// definitive negative from the service; `failed` papers exhausted the tier's
/// retry budget without a usable response.
#[derive(Debug, Default)]
pub struct TierOutcome {
    pub found: Vec<Paper>,
    pub absent: Vec<Paper>,
    pub failed: Vec<Paper>,
}

impl TierOutcome {
    /// Total number of papers across all three buckets.
    pub fn len(&self) -> usize {
        self.found.len() + self.absent.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Papers this tier could not populate, in bucket order.
    pub fn unresolved(self) -> Vec<Paper> {
        let mut papers = self.absent;
        papers.extend(self.failed);
        papers
    }
}
