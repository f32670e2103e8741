//! Text-cleaning normalizer for extracted abstracts.

use regex::Regex;

/// Upper bound on a cleaned abstract, in characters.
pub const MAX_ABSTRACT_CHARS: usize = 6000;

/// Normalizes raw extracted spans into plain abstract text.
///
/// Patterns are compiled once at construction; `clean` itself is pure.
#[derive(Debug)]
pub struct TextCleaner {
    markdown_link: Regex,
    noise: Vec<Regex>,
}

impl TextCleaner {
    pub fn new() -> Self {
        let noise_patterns = [
            // Reference markers like [12]
            r"\[\d+\]",
            // Bolded figure captions
            r"(?s)\*\*Fig\..*?\*\*",
            // Download/view boilerplate lines
            r"(?is)Download Full Size.*?PDF",
            r"(?i)View in Article.*",
        ];
        Self {
            markdown_link: Regex::new(r"\[([^\]]+)\]\([^)]*\)").expect("hard-coded pattern"),
            noise: noise_patterns
                .iter()
                .map(|p| Regex::new(p).expect("hard-coded pattern"))
                .collect(),
        }
    }

    /// Strip markdown link syntax to its label, drop noise patterns,
    /// collapse whitespace, and cap the result at [`MAX_ABSTRACT_CHARS`].
    pub fn clean(&self, text: &str) -> String {
        let mut text = self.markdown_link.replace_all(text, "$1").into_owned();
        for re in &self.noise {
            text = re.replace_all(&text, "").into_owned();
        }
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        truncate_chars(&collapsed, MAX_ABSTRACT_CHARS).to_string()
    }
}

impl Default for TextCleaner {
    fn default() -> Self {
        Self::new()
    }
}

/// Truncate to at most `max` characters on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
