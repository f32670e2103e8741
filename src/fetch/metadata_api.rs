//! Tier-1 fetcher: structured bibliographic metadata API.
//!
//! Queries a Springer Nature-style metadata endpoint by DOI. Identifiers
//! are combined into a single `(doi:"A" OR doi:"B" ...)` query per batch,
//! so one request can resolve 0..N records. A successful response is proof
//! of absence for any batch DOI it does not cover.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::MetadataApiConfig;
use crate::fetch::{
    run_rounds, BatchResolution, FetchError, FetchTier, HttpClient, RetryConfig,
};
use crate::models::{Paper, TierOutcome};
use crate::parse::truncate_chars;

/// Abstracts from the API are truncated at this many characters, with a
/// `...` marker appended.
pub const API_ABSTRACT_MAX_CHARS: usize = 3000;

/// Metadata-API tier.
#[derive(Debug, Clone)]
pub struct MetadataApiFetcher {
    client: HttpClient,
    base_url: String,
    api_key: Option<String>,
    source: String,
    retry: RetryConfig,
}

impl MetadataApiFetcher {
    pub fn new(config: &MetadataApiConfig, timeout: Duration) -> Result<Self, FetchError> {
        url::Url::parse(&config.base_url)
            .map_err(|e| FetchError::InvalidConfig(format!("metadata api base_url: {}", e)))?;
        Ok(Self {
            client: HttpClient::new(timeout)?,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            source: config.source.clone(),
            retry: RetryConfig {
                max_rounds: config.max_rounds,
                batch_size: config.batch_size,
            },
        })
    }

    /// The publisher tag this API serves (e.g. "nature").
    pub fn source(&self) -> &str {
        &self.source
    }
}

#[async_trait]
impl FetchTier for MetadataApiFetcher {
    fn id(&self) -> &str {
        "metadata-api"
    }

    async fn fetch(&self, papers: Vec<Paper>, source: &str) -> TierOutcome {
        let mut outcome = TierOutcome::default();
        // Papers sharing a DOI are settled together by one lookup
        let mut by_doi: HashMap<String, Vec<Paper>> = HashMap::new();
        let mut dois: Vec<String> = Vec::new();

        for paper in papers {
            if paper.has_summary() {
                outcome.found.push(paper);
                continue;
            }
            match paper.doi() {
                Some(doi) => {
                    let bucket = by_doi.entry(doi.clone()).or_default();
                    if bucket.is_empty() {
                        dois.push(doi);
                    }
                    bucket.push(paper);
                }
                // Nothing to key the lookup on
                None => outcome.absent.push(paper),
            }
        }

        if dois.is_empty() {
            return outcome;
        }

        tracing::info!(source, dois = dois.len(), "querying metadata api");

        let report = run_rounds(dois, &self.retry, |batch| {
            let client = self.client.clone();
            let base_url = self.base_url.clone();
            let api_key = self.api_key.clone();
            async move { fetch_batch(&client, &base_url, api_key.as_deref(), &batch).await }
        })
        .await;

        tracing::info!(
            source,
            found = report.found.len(),
            absent = report.absent.len(),
            failed = report.failed.len(),
            "metadata api tier complete"
        );

        for (doi, record) in report.found {
            if let Some(papers) = by_doi.remove(&doi) {
                for mut paper in papers {
                    apply_record(&mut paper, record.clone());
                    outcome.found.push(paper);
                }
            }
        }
        for doi in report.absent {
            if let Some(papers) = by_doi.remove(&doi) {
                outcome.absent.extend(papers);
            }
        }
        for doi in report.failed {
            if let Some(papers) = by_doi.remove(&doi) {
                outcome.failed.extend(papers);
            }
        }

        outcome
    }
}

async fn fetch_batch(
    client: &HttpClient,
    base_url: &str,
    api_key: Option<&str>,
    dois: &[String],
) -> Result<BatchResolution<ApiRecord>, FetchError> {
    let query = dois
        .iter()
        .map(|doi| format!("doi:\"{}\"", doi))
        .collect::<Vec<_>>()
        .join(" OR ");
    let url = format!(
        "{}?api_key={}&p={}&q=({})",
        base_url,
        api_key.unwrap_or(""),
        dois.len(),
        urlencoding::encode(&query)
    );

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| FetchError::Network(format!("metadata api request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(FetchError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let body = response.text().await?;
    if body.trim().is_empty() {
        return Err(FetchError::EmptyResponse);
    }
    let parsed: ApiResponse = serde_json::from_str(&body)?;

    let mut records: HashMap<String, ApiRecord> = parsed
        .records
        .into_iter()
        .filter_map(|record| record.doi.clone().map(|doi| (doi, record)))
        .collect();

    let mut resolution = BatchResolution::default();
    for doi in dois {
        match records.remove(doi) {
            Some(record) if record.has_abstract() => {
                resolution.found.push((doi.clone(), record));
            }
            // A successful query that omits the DOI, or returns a record
            // with no abstract text, is a definitive negative
            _ => resolution.absent.push(doi.clone()),
        }
    }
    Ok(resolution)
}

/// Merge an API record into the paper, filling only what the feed left
/// empty. `summary` is the exception: the paper reached this point with an
/// empty summary, so it is always written.
fn apply_record(paper: &mut Paper, record: ApiRecord) {
    let text = record.abstract_text.unwrap_or_default();
    let truncated = text.chars().count() > API_ABSTRACT_MAX_CHARS;
    let mut summary = truncate_chars(&text, API_ABSTRACT_MAX_CHARS).to_string();
    if truncated {
        summary.push_str("...");
    }
    paper.summary = summary;

    if paper.category.is_empty() {
        let mut seen = std::collections::HashSet::new();
        paper.category = record
            .subjects
            .iter()
            .flat_map(|s| s.split(", "))
            .map(str::to_string)
            .filter(|s| !s.is_empty())
            .filter(|s| seen.insert(s.clone()))
            .collect();
    }
    if paper.journal.is_empty() {
        paper.journal = record.journal.unwrap_or_default();
    }
    if paper.authors.is_empty() {
        paper.authors = record
            .creators
            .into_iter()
            .filter_map(|c| c.creator)
            .filter(|name| !name.is_empty())
            .collect();
    }
    if paper.published.is_empty() {
        paper.published = record.published.unwrap_or_default();
    }
}

/// Metadata API response body.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    records: Vec<ApiRecord>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiRecord {
    #[serde(default)]
    doi: Option<String>,
    #[serde(rename = "abstract", default)]
    abstract_text: Option<String>,
    #[serde(rename = "publicationName", default)]
    journal: Option<String>,
    #[serde(rename = "publicationDate", default)]
    published: Option<String>,
    #[serde(default)]
    creators: Vec<ApiCreator>,
    #[serde(default)]
    subjects: Vec<String>,
}

impl ApiRecord {
    fn has_abstract(&self) -> bool {
        self.abstract_text
            .as_deref()
            .map_or(false, |a| !a.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ApiCreator {
    #[serde(default)]
    creator: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(base_url: String, max_rounds: u32) -> MetadataApiConfig {
        MetadataApiConfig {
            base_url,
            api_key: Some("test-key".to_string()),
            source: "nature".to_string(),
            batch_size: 20,
            max_rounds,
        }
    }

    fn fetcher(base_url: String, max_rounds: u32) -> MetadataApiFetcher {
        MetadataApiFetcher::new(&test_config(base_url, max_rounds), Duration::from_secs(5))
            .unwrap()
    }

    fn long_abstract() -> String {
        "Optical frequency combs enable precision metrology across the spectrum. ".repeat(4)
    }

    #[tokio::test]
    async fn test_found_and_confirmed_absent_split() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::json!({
            "records": [{
                "doi": "10.1038/a",
                "abstract": long_abstract(),
                "publicationName": "Nature Photonics",
                "publicationDate": "2025-03-01",
                "creators": [{"creator": "Doe, J."}, {"creator": "Roe, R."}],
                "subjects": ["Optics, Photonics", "Metrology"]
            }]
        });
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let fetcher = fetcher(server.url(), 1);
        let papers = vec![
            Paper::new("10.1038/a", "https://doi.org/10.1038/a", "Hit"),
            Paper::new("10.1038/b", "https://doi.org/10.1038/b", "Miss"),
        ];
        let outcome = fetcher.fetch(papers, "nature").await;
        mock.assert_async().await;

        assert_eq!(outcome.found.len(), 1);
        assert_eq!(outcome.absent.len(), 1);
        assert!(outcome.failed.is_empty());

        let hit = &outcome.found[0];
        assert!(hit.summary.starts_with("Optical frequency combs"));
        assert_eq!(hit.journal, "Nature Photonics");
        assert_eq!(hit.authors, vec!["Doe, J.", "Roe, R."]);
        assert_eq!(hit.published, "2025-03-01");
        assert_eq!(hit.category, vec!["Optics", "Photonics", "Metrology"]);
        assert_eq!(outcome.absent[0].id, "10.1038/b");
        assert!(outcome.absent[0].summary.is_empty());
    }

    #[tokio::test]
    async fn test_papers_sharing_a_doi_are_all_returned() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::json!({
            "records": [{"doi": "10.1038/a", "abstract": long_abstract()}]
        });
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let fetcher = fetcher(server.url(), 1);
        let papers = vec![
            Paper::new("10.1038/a", "https://doi.org/10.1038/a", "First"),
            Paper::new("10.1038/a", "https://doi.org/10.1038/a", "Second"),
        ];
        let outcome = fetcher.fetch(papers, "nature").await;
        mock.assert_async().await;

        assert_eq!(outcome.len(), 2);
        assert_eq!(outcome.found.len(), 2);
        assert!(outcome
            .found
            .iter()
            .all(|p| p.summary.starts_with("Optical frequency combs")));
    }

    #[tokio::test]
    async fn test_server_error_exhausts_rounds_into_failed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(503)
            .with_body("unavailable")
            .expect(2)
            .create_async()
            .await;

        let fetcher = fetcher(server.url(), 2);
        let papers = vec![Paper::new("10.1038/a", "https://doi.org/10.1038/a", "T")];
        let outcome = fetcher.fetch(papers, "nature").await;
        mock.assert_async().await;

        assert!(outcome.found.is_empty());
        assert!(outcome.absent.is_empty());
        assert_eq!(outcome.failed.len(), 1);
        assert!(outcome.failed[0].summary.is_empty());
    }

    #[tokio::test]
    async fn test_empty_body_is_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_body("")
            .expect(2)
            .create_async()
            .await;

        let fetcher = fetcher(server.url(), 2);
        let outcome = fetcher
            .fetch(
                vec![Paper::new("10.1038/a", "https://doi.org/10.1038/a", "T")],
                "nature",
            )
            .await;
        mock.assert_async().await;
        assert_eq!(outcome.failed.len(), 1);
    }

    #[tokio::test]
    async fn test_prefilled_summary_bypasses_api() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let mut paper = Paper::new("10.1038/a", "https://doi.org/10.1038/a", "T");
        paper.summary = "Already here.".to_string();
        let fetcher = fetcher(server.url(), 3);
        let outcome = fetcher.fetch(vec![paper], "nature").await;
        mock.assert_async().await;

        assert_eq!(outcome.found.len(), 1);
        assert_eq!(outcome.found[0].summary, "Already here.");
    }

    #[tokio::test]
    async fn test_paper_without_identifier_is_absent() {
        let fetcher = fetcher("http://127.0.0.1:1".to_string(), 3);
        let outcome = fetcher
            .fetch(vec![Paper::new("", "https://example.com/page", "T")], "nature")
            .await;
        assert_eq!(outcome.absent.len(), 1);
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let config = test_config("not a url".to_string(), 1);
        assert!(MetadataApiFetcher::new(&config, Duration::from_secs(5)).is_err());
    }

    #[test]
    fn test_abstract_truncation_marker() {
        let mut paper = Paper::new("10.1/x", "https://doi.org/10.1/x", "T");
        let record = ApiRecord {
            doi: Some("10.1/x".to_string()),
            abstract_text: Some("a".repeat(API_ABSTRACT_MAX_CHARS + 10)),
            journal: None,
            published: None,
            creators: vec![],
            subjects: vec![],
        };
        apply_record(&mut paper, record);
        assert_eq!(paper.summary.chars().count(), API_ABSTRACT_MAX_CHARS + 3);
        assert!(paper.summary.ends_with("..."));
    }

    #[test]
    fn test_merge_respects_existing_fields() {
        let mut paper = Paper::new("10.1/x", "https://doi.org/10.1/x", "T");
        paper.journal = "Feed Journal".to_string();
        paper.category = vec!["feed-topic".to_string()];
        let record = ApiRecord {
            doi: Some("10.1/x".to_string()),
            abstract_text: Some(long_abstract()),
            journal: Some("Api Journal".to_string()),
            published: Some("2025-01-01".to_string()),
            creators: vec![],
            subjects: vec!["Api Topic".to_string()],
        };
        apply_record(&mut paper, record);
        assert_eq!(paper.journal, "Feed Journal");
        assert_eq!(paper.category, vec!["feed-topic"]);
        assert_eq!(paper.published, "2025-01-01");
    }
}
