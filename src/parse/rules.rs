//! Per-publisher abstract extraction rules.
//!
//! Each rule set is an ordered list of heading/boundary patterns: find an
//! "Abstract" heading, capture up to the next known section boundary, and
//! accept the first span that still has real content after cleaning. The
//! [`GenericRules`] fallback uses looser boundaries and, as a last resort,
//! a cleaned prefix of the raw text.

use regex::Regex;

use crate::parse::clean::TextCleaner;

/// Spans shorter than this after cleaning are headings with no real
/// content and are rejected.
pub const MIN_ABSTRACT_CHARS: usize = 150;

/// The capability "extract an abstract from raw page text" for one
/// publisher layout.
pub trait SourceRules: Send + Sync + std::fmt::Debug {
    fn extract(&self, text: &str, cleaner: &TextCleaner) -> Option<String>;
}

/// Try patterns in order, returning the first cleaned capture that clears
/// the minimum length threshold.
fn first_accepted(patterns: &[Regex], text: &str, cleaner: &TextCleaner) -> Option<String> {
    for pattern in patterns {
        if let Some(caps) = pattern.captures(text) {
            let cleaned = cleaner.clean(&caps[1]);
            if cleaned.chars().count() >= MIN_ABSTRACT_CHARS {
                return Some(cleaned);
            }
        }
    }
    None
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("hard-coded pattern"))
        .collect()
}

/// Optica/OSA article layout: dash-underlined "Abstract" heading, topics
/// sections and a copyright line after the body.
#[derive(Debug)]
pub struct OpticaRules {
    patterns: Vec<Regex>,
}

impl OpticaRules {
    pub fn new() -> Self {
        Self {
            patterns: compile(&[
                r"(?is)Abstract\s*\n[-=]+\s*\n(.+?)(\n[-=]{4,}|© \d{4}|\nReferences|Optics & Photonics Topics|Related Topics)",
                r"(?is)\bAbstract\b[:\s]*\n?(.+?)(© \d{4}|\n##|\nReferences|Related Topics)",
            ]),
        }
    }
}

impl Default for OpticaRules {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceRules for OpticaRules {
    fn extract(&self, text: &str, cleaner: &TextCleaner) -> Option<String> {
        first_accepted(&self.patterns, text, cleaner)
    }
}

/// Science/AAAS layout: structured abstracts with upper-case section
/// headings and an optional editor's summary above the abstract proper.
#[derive(Debug)]
pub struct ScienceRules {
    patterns: Vec<Regex>,
}

impl ScienceRules {
    pub fn new() -> Self {
        Self {
            patterns: compile(&[
                r"(?is)\bAbstract\b[:\s]*\n?(.+?)(\nINTRODUCTION|\nRATIONALE|\nRESULTS|© \d{4}|\n##|\nKeywords)",
                r"(?is)Editor.s summary\s*\n[-=]*\s*\n?(.+?)(\nAbstract|© \d{4}|\n##)",
            ]),
        }
    }
}

impl Default for ScienceRules {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceRules for ScienceRules {
    fn extract(&self, text: &str, cleaner: &TextCleaner) -> Option<String> {
        first_accepted(&self.patterns, text, cleaner)
    }
}

/// APS (Physical Review) layout: abstract bounded by reception metadata,
/// DOI lines, or the APS copyright notice.
#[derive(Debug)]
pub struct ApsRules {
    patterns: Vec<Regex>,
}

impl ApsRules {
    pub fn new() -> Self {
        Self {
            patterns: compile(&[
                r"(?is)\bAbstract\b[:\s]*\n?(.+?)(\nReceived \d|\nDOI:|© \d{4} American Physical Society|© \d{4}|\n##)",
                r"(?is)Abstract\s*\n[-=]+\s*\n(.+?)(\nReceived|\nDOI:|© \d{4})",
            ]),
        }
    }
}

impl Default for ApsRules {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceRules for ApsRules {
    fn extract(&self, text: &str, cleaner: &TextCleaner) -> Option<String> {
        first_accepted(&self.patterns, text, cleaner)
    }
}

/// Source-agnostic fallback rules.
#[derive(Debug)]
pub struct GenericRules {
    patterns: Vec<Regex>,
    abstract_marker: Regex,
}

/// Raw-text length window for the no-marker prefix fallback.
const PREFIX_FALLBACK_MIN: usize = 500;
const PREFIX_FALLBACK_MAX: usize = 10000;

impl GenericRules {
    pub fn new() -> Self {
        Self {
            patterns: compile(&[
                r"(?is)Abstract\s*\n[-=]+\s*\n(.+?)(\n\d+\.\s|\n[A-Z][A-Z]+\n|© \d{4}|INTRODUCTION|Keywords)",
                r"(?is)\bAbstract\b[:\s]*\n?(.+?)(\n\d+\.\s|\n##|\n\*\*[A-Z]|© \d{4}|\n[A-Z]{4,}\n|Introduction\n)",
                r"(?is)\bAbstract\b[:\s]+(.+?)(\n\n\d+\.|\n\n[A-Z][a-z]+:)",
            ]),
            abstract_marker: Regex::new(r"(?i)\babstract\b").expect("hard-coded pattern"),
        }
    }
}

impl Default for GenericRules {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceRules for GenericRules {
    fn extract(&self, text: &str, cleaner: &TextCleaner) -> Option<String> {
        if let Some(found) = first_accepted(&self.patterns, text, cleaner) {
            return Some(found);
        }

        // Last resort: pages with no "Abstract" marker at all sometimes
        // consist of little more than the abstract itself. Only plausible
        // lengths qualify.
        let chars = text.chars().count();
        if !self.abstract_marker.is_match(text)
            && (PREFIX_FALLBACK_MIN..=PREFIX_FALLBACK_MAX).contains(&chars)
        {
            let cleaned = cleaner.clean(text);
            if cleaned.chars().count() >= MIN_ABSTRACT_CHARS {
                return Some(cleaned);
            }
        }
        None
    }
}
