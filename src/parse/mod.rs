//! Content parsing: raw extraction-service text to `(abstract, categories)`.
//!
//! Publisher layouts are handled by a registry of [`SourceRules`]
//! strategies selected once at construction; unrecognized sources fall
//! through to [`GenericRules`]. Parsing is pure: no I/O, and identical
//! `(source, text)` input always yields identical output.

mod clean;
mod rules;

pub use clean::{truncate_chars, TextCleaner, MAX_ABSTRACT_CHARS};
pub use rules::{ApsRules, GenericRules, MIN_ABSTRACT_CHARS, OpticaRules, ScienceRules, SourceRules};

use std::collections::HashMap;

use regex::Regex;

/// What the parser recovered from one raw content blob.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedContent {
    /// Cleaned abstract text; empty when nothing qualified
    pub abstract_text: String,
    /// Topic labels in first-seen order, deduplicated
    pub categories: Vec<String>,
}

/// Registry-dispatched abstract and topic extractor.
#[derive(Debug)]
pub struct ContentParser {
    rules: HashMap<String, Box<dyn SourceRules>>,
    generic: GenericRules,
    cleaner: TextCleaner,
    related_section: Regex,
    related_topic_link: Regex,
    photonics_section: Regex,
    any_link: Regex,
}

impl ContentParser {
    /// Build a parser with the stock publisher rules registered.
    pub fn new() -> Self {
        let mut rules: HashMap<String, Box<dyn SourceRules>> = HashMap::new();
        rules.insert("optica".to_string(), Box::new(OpticaRules::new()));
        rules.insert("science".to_string(), Box::new(ScienceRules::new()));
        rules.insert("aps".to_string(), Box::new(ApsRules::new()));

        Self {
            rules,
            generic: GenericRules::new(),
            cleaner: TextCleaner::new(),
            related_section: Regex::new(
                r"(?is)Related Topics(.*?)(\n### |\n\*\s+###|About this Article|\z)",
            )
            .expect("hard-coded pattern"),
            related_topic_link: Regex::new(r"\[([^\]]+)\]\(https?://[^)]*search[^)]*\)")
                .expect("hard-coded pattern"),
            photonics_section: Regex::new(r"(?is)Optics & Photonics Topics(.*?)(\n### |\n## |About|\z)")
                .expect("hard-coded pattern"),
            any_link: Regex::new(r"\[([^\]]+)\]\(https?://[^)]+\)").expect("hard-coded pattern"),
        }
    }

    /// Register (or replace) the rules for a source tag.
    pub fn register(&mut self, source: impl Into<String>, rules: Box<dyn SourceRules>) {
        self.rules.insert(source.into(), rules);
    }

    /// Extract an abstract and topic labels from raw page content.
    ///
    /// Dispatches on `source`; the source-specific rules get first shot,
    /// then the generic fallback.
    pub fn parse(&self, source: &str, text: &str) -> ParsedContent {
        if text.is_empty() {
            return ParsedContent::default();
        }

        let abstract_text = self
            .rules
            .get(source)
            .and_then(|r| r.extract(text, &self.cleaner))
            .or_else(|| self.generic.extract(text, &self.cleaner))
            .unwrap_or_default();

        let categories = self.extract_topics(text);

        tracing::debug!(
            source,
            abstract_chars = abstract_text.chars().count(),
            topics = categories.len(),
            "parsed extraction-service content"
        );

        ParsedContent {
            abstract_text,
            categories,
        }
    }

    /// Collect topic labels from a "related topics" style section.
    fn extract_topics(&self, text: &str) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();

        if let Some(caps) = self.related_section.captures(text) {
            let section = &caps[0];
            labels.extend(
                self.related_topic_link
                    .captures_iter(section)
                    .map(|c| c[1].to_string()),
            );
        }

        if labels.is_empty() {
            if let Some(caps) = self.photonics_section.captures(text) {
                let section = &caps[0];
                labels.extend(self.any_link.captures_iter(section).map(|c| c[1].to_string()));
            }
        }

        let mut seen = std::collections::HashSet::new();
        labels
            .into_iter()
            .filter(|label| Self::is_topic_label(label))
            .filter(|label| seen.insert(label.clone()))
            .collect()
    }

    /// Reject short or navigation-like link labels.
    fn is_topic_label(label: &str) -> bool {
        label.len() > 3 && !label.starts_with('?') && !label.to_lowercase().contains("http")
    }
}

impl Default for ContentParser {
    fn default() -> Self {
        Self::new()
    }
}
