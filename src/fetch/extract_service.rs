//! Tier-2 fetcher: web-content extraction service.
//!
//! Sends landing-page URLs in batches to a Tavily-style extract endpoint
//! and matches results back by URL, exactly first and then normalized
//! (DOI substring, else protocol/www/trailing-slash stripping). A matched
//! result settles its URL even when parsing yields nothing: the service
//! answered, so that is a definitive negative. URLs missing from the
//! response entirely stay in the working set: the service may simply not
//! have processed them yet.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ExtractServiceConfig;
use crate::fetch::{
    run_rounds, BatchResolution, FetchError, FetchTier, HttpClient, RetryConfig,
};
use crate::models::{Paper, TierOutcome};
use crate::parse::{ContentParser, ParsedContent};

/// Content-extraction tier.
#[derive(Debug, Clone)]
pub struct ExtractServiceFetcher {
    client: HttpClient,
    base_url: String,
    api_key: Option<String>,
    parser: Arc<ContentParser>,
    retry: RetryConfig,
}

impl ExtractServiceFetcher {
    pub fn new(
        config: &ExtractServiceConfig,
        parser: Arc<ContentParser>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        url::Url::parse(&config.base_url)
            .map_err(|e| FetchError::InvalidConfig(format!("extract service base_url: {}", e)))?;
        Ok(Self {
            client: HttpClient::new(timeout)?,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            parser,
            retry: RetryConfig {
                max_rounds: config.max_rounds,
                batch_size: config.batch_size,
            },
        })
    }
}

#[async_trait]
impl FetchTier for ExtractServiceFetcher {
    fn id(&self) -> &str {
        "extract-service"
    }

    async fn fetch(&self, papers: Vec<Paper>, source: &str) -> TierOutcome {
        let mut outcome = TierOutcome::default();
        // Papers sharing a landing URL are settled together by one lookup
        let mut by_url: HashMap<String, Vec<Paper>> = HashMap::new();
        let mut urls: Vec<String> = Vec::new();

        for paper in papers {
            if paper.has_summary() {
                outcome.found.push(paper);
                continue;
            }
            if paper.abs.is_empty() {
                // No URL to extract from
                outcome.absent.push(paper);
                continue;
            }
            let bucket = by_url.entry(paper.abs.clone()).or_default();
            if bucket.is_empty() {
                urls.push(paper.abs.clone());
            }
            bucket.push(paper);
        }

        if urls.is_empty() {
            return outcome;
        }

        tracing::info!(source, urls = urls.len(), "querying extraction service");

        let report = run_rounds(urls, &self.retry, |batch| {
            let client = self.client.clone();
            let base_url = self.base_url.clone();
            let api_key = self.api_key.clone();
            let parser = Arc::clone(&self.parser);
            let source = source.to_string();
            async move {
                extract_batch(&client, &base_url, api_key.as_deref(), &parser, &source, &batch)
                    .await
            }
        })
        .await;

        tracing::info!(
            source,
            found = report.found.len(),
            absent = report.absent.len(),
            failed = report.failed.len(),
            "extraction service tier complete"
        );

        for (url, parsed) in report.found {
            if let Some(papers) = by_url.remove(&url) {
                for mut paper in papers {
                    paper.summary = parsed.abstract_text.clone();
                    if paper.category.is_empty() && !parsed.categories.is_empty() {
                        paper.category = parsed.categories.clone();
                    }
                    outcome.found.push(paper);
                }
            }
        }
        for url in report.absent {
            if let Some(papers) = by_url.remove(&url) {
                outcome.absent.extend(papers);
            }
        }
        for url in report.failed {
            if let Some(papers) = by_url.remove(&url) {
                outcome.failed.extend(papers);
            }
        }

        outcome
    }
}

async fn extract_batch(
    client: &HttpClient,
    base_url: &str,
    api_key: Option<&str>,
    parser: &ContentParser,
    source: &str,
    urls: &[String],
) -> Result<BatchResolution<ParsedContent>, FetchError> {
    let mut request = client.post(base_url).json(&ExtractRequest {
        urls: urls.to_vec(),
        extract_depth: "advanced",
    });
    if let Some(key) = api_key {
        request = request.bearer_auth(key);
    }

    let response = request
        .send()
        .await
        .map_err(|e| FetchError::Network(format!("extract request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(FetchError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let body: ExtractResponse = response
        .json()
        .await
        .map_err(|e| FetchError::Parse(format!("extract response: {}", e)))?;

    if body.results.is_empty() {
        // An empty payload tells us nothing about any URL in the batch
        return Err(FetchError::EmptyResponse);
    }

    let mut resolution = BatchResolution::default();
    let mut settled: HashSet<String> = HashSet::new();

    for result in &body.results {
        let matched = urls
            .iter()
            .find(|url| **url == result.url)
            .or_else(|| urls.iter().find(|url| urls_match(url, &result.url)));

        let Some(matched) = matched else {
            tracing::debug!(url = %result.url, "extract result matched no requested url");
            continue;
        };
        if !settled.insert(matched.clone()) {
            continue;
        }

        let parsed = parser.parse(source, &result.raw_content);
        if parsed.abstract_text.is_empty() {
            // Service answered but nothing parseable: settle, don't retry
            resolution.absent.push(matched.clone());
        } else {
            resolution.found.push((matched.clone(), parsed));
        }
    }

    Ok(resolution)
}

/// Whether two URLs refer to the same landing page.
///
/// DOI-shaped substrings win when both sides carry one; otherwise compare
/// after lower-casing and stripping protocol, `www.` and trailing slash.
pub fn urls_match(a: &str, b: &str) -> bool {
    static DOI_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"10\.\d{4,}/\S+").expect("hard-coded pattern"));
    if let (Some(da), Some(db)) = (DOI_RE.find(a), DOI_RE.find(b)) {
        return da.as_str().trim_end_matches('/') == db.as_str().trim_end_matches('/');
    }
    normalize_url(a) == normalize_url(b)
}

fn normalize_url(url: &str) -> String {
    let lowered = url.to_lowercase();
    let mut s = lowered.trim_end_matches('/');
    s = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"))
        .unwrap_or(s);
    s = s.strip_prefix("www.").unwrap_or(s);
    s.to_string()
}

#[derive(Debug, Serialize)]
struct ExtractRequest {
    urls: Vec<String>,
    extract_depth: &'static str,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    results: Vec<ExtractResult>,
}

#[derive(Debug, Deserialize)]
struct ExtractResult {
    #[serde(default)]
    url: String,
    #[serde(default)]
    raw_content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(base_url: String, max_rounds: u32) -> ExtractServiceConfig {
        ExtractServiceConfig {
            base_url,
            api_key: Some("test-key".to_string()),
            batch_size: 20,
            max_rounds,
        }
    }

    fn fetcher(base_url: String, max_rounds: u32) -> ExtractServiceFetcher {
        ExtractServiceFetcher::new(
            &test_config(base_url, max_rounds),
            Arc::new(ContentParser::new()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn article_page() -> String {
        let body = "We report on the generation of squeezed light in an integrated \
                    photonic circuit and its application to sub-shot-noise interferometry. "
            .repeat(3);
        format!("Abstract\n--------\n{}\n© 2025 Publisher", body)
    }

    #[test]
    fn test_urls_match_doi_trailing_slash() {
        assert!(urls_match(
            "https://doi.org/10.1/abc",
            "https://doi.org/10.1234/abc"
        ) == false);
        assert!(urls_match(
            "https://doi.org/10.1364/abc",
            "https://doi.org/10.1364/abc/"
        ));
    }

    #[test]
    fn test_urls_match_redirect_hosts_with_same_doi() {
        assert!(urls_match(
            "https://doi.org/10.1364/optica.1",
            "https://opg.optica.org/abstract.cfm?doi=10.1364/optica.1"
        ));
    }

    #[test]
    fn test_urls_match_normalized() {
        assert!(urls_match(
            "https://www.example.com/article/1/",
            "http://example.com/Article/1"
        ));
        assert!(!urls_match(
            "https://example.com/article/1",
            "https://example.com/article/2"
        ));
    }

    #[tokio::test]
    async fn test_matched_results_settle_found_and_absent() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::json!({
            "results": [
                {"url": "https://doi.org/10.1364/a/", "raw_content": article_page()},
                {"url": "https://doi.org/10.1364/b", "raw_content": "Abstract\n----\nShort."}
            ]
        });
        let mock = server
            .mock("POST", mockito::Matcher::Any)
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let fetcher = fetcher(server.url(), 1);
        let papers = vec![
            Paper::new("10.1364/a", "https://doi.org/10.1364/a", "Full"),
            Paper::new("10.1364/b", "https://doi.org/10.1364/b", "Thin"),
        ];
        let outcome = fetcher.fetch(papers, "optica").await;
        mock.assert_async().await;

        // Trailing-slash variant still matches paper "a"
        assert_eq!(outcome.found.len(), 1);
        assert_eq!(outcome.found[0].id, "10.1364/a");
        assert!(outcome.found[0].summary.starts_with("We report"));

        // "b" was answered but unparseable: settled absent, not retried
        assert_eq!(outcome.absent.len(), 1);
        assert_eq!(outcome.absent[0].id, "10.1364/b");
        assert!(outcome.failed.is_empty());
    }

    #[tokio::test]
    async fn test_papers_sharing_a_url_are_all_returned() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::json!({
            "results": [
                {"url": "https://doi.org/10.1364/a", "raw_content": article_page()}
            ]
        });
        let mock = server
            .mock("POST", mockito::Matcher::Any)
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let fetcher = fetcher(server.url(), 1);
        let papers = vec![
            Paper::new("10.1364/a1", "https://doi.org/10.1364/a", "First"),
            Paper::new("10.1364/a2", "https://doi.org/10.1364/a", "Second"),
        ];
        let outcome = fetcher.fetch(papers, "optica").await;
        mock.assert_async().await;

        assert_eq!(outcome.len(), 2);
        assert_eq!(outcome.found.len(), 2);
        assert!(outcome
            .found
            .iter()
            .all(|p| p.summary.starts_with("We report")));
    }

    #[tokio::test]
    async fn test_unanswered_url_retries_then_fails() {
        let mut server = mockito::Server::new_async().await;
        // Response only ever covers "a"; "b" is never mentioned
        let body = serde_json::json!({
            "results": [
                {"url": "https://doi.org/10.1364/a", "raw_content": article_page()}
            ]
        });
        let mock = server
            .mock("POST", mockito::Matcher::Any)
            .with_status(200)
            .with_body(body.to_string())
            .expect(2)
            .create_async()
            .await;

        let fetcher = fetcher(server.url(), 2);
        let papers = vec![
            Paper::new("10.1364/a", "https://doi.org/10.1364/a", "Answered"),
            Paper::new("10.1364/b", "https://doi.org/10.1364/b", "Ghost"),
        ];
        let outcome = fetcher.fetch(papers, "optica").await;
        mock.assert_async().await;

        assert_eq!(outcome.found.len(), 1);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].id, "10.1364/b");
    }

    #[tokio::test]
    async fn test_api_error_exhausts_rounds() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", mockito::Matcher::Any)
            .with_status(500)
            .expect(2)
            .create_async()
            .await;

        let fetcher = fetcher(server.url(), 2);
        let outcome = fetcher
            .fetch(
                vec![Paper::new("10.1364/a", "https://doi.org/10.1364/a", "T")],
                "optica",
            )
            .await;
        mock.assert_async().await;
        assert_eq!(outcome.failed.len(), 1);
        assert!(outcome.failed[0].summary.is_empty());
    }

    #[tokio::test]
    async fn test_empty_result_list_is_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"results": []}"#)
            .expect(2)
            .create_async()
            .await;

        let fetcher = fetcher(server.url(), 2);
        let outcome = fetcher
            .fetch(
                vec![Paper::new("10.1364/a", "https://doi.org/10.1364/a", "T")],
                "optica",
            )
            .await;
        mock.assert_async().await;
        assert_eq!(outcome.failed.len(), 1);
    }

    #[tokio::test]
    async fn test_paper_without_url_is_absent() {
        let fetcher = fetcher("http://127.0.0.1:1".to_string(), 3);
        let outcome = fetcher
            .fetch(vec![Paper::new("id-only", "", "T")], "optica")
            .await;
        assert_eq!(outcome.absent.len(), 1);
    }
}
