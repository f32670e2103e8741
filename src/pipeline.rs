//! Pipeline orchestrator: Tier-1, then Tier-2, then a full classification.
//!
//! The orchestrator guarantees every input paper appears exactly once in
//! the return value and never raises for partial failure; callers detect
//! incomplete enrichment from per-paper classifications.

use std::sync::Arc;
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::fetch::{ExtractServiceFetcher, FetchError, FetchTier, MetadataApiFetcher};
use crate::models::{EnrichedPaper, ExtractionResult, Paper};
use crate::parse::ContentParser;

/// Sequences the abstract-acquisition tiers over a batch of papers.
pub struct AbstractPipeline {
    tier1: Option<Box<dyn FetchTier>>,
    /// Publisher tag Tier-1 serves; Tier-1 is skipped for everything else
    metadata_source: Option<String>,
    tier2: Option<Box<dyn FetchTier>>,
}

impl AbstractPipeline {
    /// Build the pipeline from caller-supplied service configuration.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, FetchError> {
        let timeout = Duration::from_secs(config.request_timeout_secs);

        let tier1 = match &config.metadata_api {
            Some(api) => Some(Box::new(MetadataApiFetcher::new(api, timeout)?) as Box<dyn FetchTier>),
            None => None,
        };
        let metadata_source = config.metadata_api.as_ref().map(|api| api.source.clone());

        let tier2 = match &config.extract_service {
            Some(extract) => {
                let parser = Arc::new(ContentParser::new());
                Some(Box::new(ExtractServiceFetcher::new(extract, parser, timeout)?)
                    as Box<dyn FetchTier>)
            }
            None => None,
        };

        Ok(Self {
            tier1,
            metadata_source,
            tier2,
        })
    }

    /// Assemble a pipeline from pre-built tiers (test seam).
    pub fn with_tiers(
        tier1: Option<Box<dyn FetchTier>>,
        metadata_source: Option<String>,
        tier2: Option<Box<dyn FetchTier>>,
    ) -> Self {
        Self {
            tier1,
            metadata_source,
            tier2,
        }
    }

    /// Enrich a batch of papers from the publisher tagged `source`.
    ///
    /// Returns every input paper exactly once with its terminal
    /// classification. Papers arriving with a non-empty `summary` are
    /// passed through untouched.
    pub async fn enrich(&self, papers: Vec<Paper>, source: &str) -> Vec<EnrichedPaper> {
        let total = papers.len();
        tracing::info!(source, papers = total, "starting abstract acquisition");

        let mut enriched: Vec<EnrichedPaper> = Vec::with_capacity(total);
        let mut remaining: Vec<Paper> = Vec::new();
        for paper in papers {
            if paper.has_summary() {
                enriched.push(EnrichedPaper::new(paper, ExtractionResult::WithAbstract));
            } else {
                remaining.push(paper);
            }
        }

        let tier1_applies = self.metadata_source.as_deref() == Some(source);
        if let (Some(tier1), true) = (&self.tier1, tier1_applies) {
            if !remaining.is_empty() {
                let mut outcome = tier1.fetch(std::mem::take(&mut remaining), source).await;
                tracing::debug!(
                    source,
                    tier = tier1.id(),
                    found = outcome.found.len(),
                    unresolved = outcome.absent.len() + outcome.failed.len(),
                    "tier-1 done"
                );
                enriched.extend(
                    std::mem::take(&mut outcome.found)
                        .into_iter()
                        .map(|p| EnrichedPaper::new(p, ExtractionResult::WithAbstract)),
                );
                if self.tier2.is_some() {
                    // Everything Tier-1 could not resolve gets a second chance
                    remaining = outcome.unresolved();
                } else {
                    enriched.extend(
                        outcome
                            .absent
                            .into_iter()
                            .map(|p| EnrichedPaper::new(p, ExtractionResult::NoAbstractFound)),
                    );
                    enriched.extend(
                        outcome
                            .failed
                            .into_iter()
                            .map(|p| EnrichedPaper::new(p, ExtractionResult::FetchFailed)),
                    );
                }
            }
        }

        if let Some(tier2) = &self.tier2 {
            if !remaining.is_empty() {
                let outcome = tier2.fetch(std::mem::take(&mut remaining), source).await;
                tracing::debug!(
                    source,
                    tier = tier2.id(),
                    found = outcome.found.len(),
                    absent = outcome.absent.len(),
                    failed = outcome.failed.len(),
                    "tier-2 done"
                );
                enriched.extend(
                    outcome
                        .found
                        .into_iter()
                        .map(|p| EnrichedPaper::new(p, ExtractionResult::WithAbstract)),
                );
                enriched.extend(
                    outcome
                        .absent
                        .into_iter()
                        .map(|p| EnrichedPaper::new(p, ExtractionResult::NoAbstractFound)),
                );
                enriched.extend(
                    outcome
                        .failed
                        .into_iter()
                        .map(|p| EnrichedPaper::new(p, ExtractionResult::FetchFailed)),
                );
            }
        }

        // No tier could process what's left: papers without any key are a
        // definitive negative, the rest never got a service response
        for paper in remaining {
            let result = if paper.id.is_empty() && paper.abs.is_empty() {
                ExtractionResult::NoAbstractFound
            } else {
                ExtractionResult::FetchFailed
            };
            enriched.push(EnrichedPaper::new(paper, result));
        }

        debug_assert_eq!(enriched.len(), total);

        let with_abstract = enriched
            .iter()
            .filter(|e| e.result == ExtractionResult::WithAbstract)
            .count();
        let failed = enriched
            .iter()
            .filter(|e| e.result == ExtractionResult::FetchFailed)
            .count();
        tracing::info!(
            source,
            total,
            with_abstract,
            no_abstract = total - with_abstract - failed,
            failed,
            "abstract acquisition complete"
        );

        enriched
    }
}

impl std::fmt::Debug for AbstractPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbstractPipeline")
            .field("tier1", &self.tier1.as_ref().map(|t| t.id()))
            .field("metadata_source", &self.metadata_source)
            .field("tier2", &self.tier2.as_ref().map(|t| t.id()))
            .finish()
    }
}
