//! Mock tier for orchestrator tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::fetch::FetchTier;
use crate::models::{Paper, TierOutcome};

/// A scriptable tier that classifies papers by id.
///
/// Papers scripted with [`MockTier::finds`] come back in `found` with the
/// given summary installed; ids scripted with [`MockTier::misses`] come
/// back `absent`; everything else is `failed`. Input ids are recorded per
/// call for assertions.
#[derive(Debug, Default)]
pub struct MockTier {
    id: String,
    found: HashMap<String, String>,
    absent: HashSet<String>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl MockTier {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Script a paper id to be found with this summary.
    pub fn finds(mut self, paper_id: impl Into<String>, summary: impl Into<String>) -> Self {
        self.found.insert(paper_id.into(), summary.into());
        self
    }

    /// Script a paper id as confirmed-absent.
    pub fn misses(mut self, paper_id: impl Into<String>) -> Self {
        self.absent.insert(paper_id.into());
        self
    }

    /// Ids seen by each `fetch` call, in call order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

/// Shared handles work as tiers too, so tests can keep a reference for
/// assertions after handing the tier to a pipeline.
#[async_trait]
impl FetchTier for std::sync::Arc<MockTier> {
    fn id(&self) -> &str {
        <MockTier as FetchTier>::id(&**self)
    }

    async fn fetch(&self, papers: Vec<Paper>, source: &str) -> TierOutcome {
        <MockTier as FetchTier>::fetch(&**self, papers, source).await
    }
}

#[async_trait]
impl FetchTier for MockTier {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch(&self, papers: Vec<Paper>, _source: &str) -> TierOutcome {
        self.calls
            .lock()
            .unwrap()
            .push(papers.iter().map(|p| p.id.clone()).collect());

        let mut outcome = TierOutcome::default();
        for mut paper in papers {
            if let Some(summary) = self.found.get(&paper.id) {
                if !paper.has_summary() {
                    paper.summary = summary.clone();
                }
                outcome.found.push(paper);
            } else if self.absent.contains(&paper.id) {
                outcome.absent.push(paper);
            } else {
                outcome.failed.push(paper);
            }
        }
        outcome
    }
}
