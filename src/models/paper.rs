//! Paper model representing one academic article being enriched.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A paper record produced by the feed collector.
///
/// Field names match the collector's JSONL schema so records round-trip
/// through serde untouched. The pipeline consumes records with an empty
/// `summary` and fills it in place; a non-empty `summary` is never
/// overwritten by any tier or retry round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    /// Journal or venue name
    #[serde(default)]
    pub journal: String,

    /// Stable identifier (DOI or publisher-specific id)
    pub id: String,

    /// Direct PDF URL, if the feed exposed one
    #[serde(default)]
    pub pdf: String,

    /// Canonical landing-page URL
    #[serde(default)]
    pub abs: String,

    /// Paper title
    pub title: String,

    /// Abstract text; empty string means "no abstract found"
    #[serde(default)]
    pub summary: String,

    /// Ordered author list
    #[serde(default)]
    pub authors: Vec<String>,

    /// Publication date string (feed-dependent format)
    #[serde(default)]
    pub published: String,

    /// Topic/category labels
    #[serde(default)]
    pub category: Vec<String>,
}

impl Paper {
    /// Create a minimal paper with the fields every feed provides.
    pub fn new(id: impl Into<String>, abs: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            journal: String::new(),
            id: id.into(),
            pdf: String::new(),
            abs: abs.into(),
            title: title.into(),
            summary: String::new(),
            authors: Vec::new(),
            published: String::new(),
            category: Vec::new(),
        }
    }

    /// Whether an abstract has already been acquired.
    pub fn has_summary(&self) -> bool {
        !self.summary.is_empty()
    }

    /// The DOI to key metadata-API lookups on.
    ///
    /// Falls back to extracting a DOI-shaped substring from a `doi.org`
    /// landing URL when the feed left `id` empty.
    pub fn doi(&self) -> Option<String> {
        static DOI_IN_URL: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"doi\.org/(10\.\d{4,}/\S+)").expect("hard-coded pattern"));
        if !self.id.is_empty() {
            return Some(self.id.clone());
        }
        DOI_IN_URL
            .captures(&self.abs)
            .map(|c| c[1].trim_end_matches('/').to_string())
    }
}
