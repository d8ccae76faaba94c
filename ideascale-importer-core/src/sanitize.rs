//! Rich-text cleanup for titles, summaries, descriptions and custom fields.
//!
//! Inline tags from the strip set are dropped while their text content is
//! kept; whatever block structure remains is rendered as markdown.

use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

/// Inline tags removed from every rich-text value by default.
pub const DEFAULT_STRIP_TAGS: [&str; 8] = ["a", "b", "img", "strong", "u", "i", "embed", "iframe"];

#[derive(Debug, Clone)]
pub struct Sanitizer {
    strip: Option<Regex>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(&DEFAULT_STRIP_TAGS)
    }
}

impl Sanitizer {
    pub fn new<S: AsRef<str>>(tags: &[S]) -> Self {
        if tags.is_empty() {
            return Self { strip: None };
        }
        let alternation = tags
            .iter()
            .map(|t| regex::escape(t.as_ref()))
            .collect::<Vec<_>>()
            .join("|");
        // Opening, closing and self-closing forms; `\b` keeps `<b>` from matching `<br>`.
        // Quoted attribute values may contain `>`.
        let pattern = format!(r#"(?is)</?(?:{alternation})\b(?:"[^"]*"|'[^']*'|[^'">])*>"#);
        // Tag names are escaped, so the pattern always compiles.
        Self {
            strip: Regex::new(&pattern).ok(),
        }
    }

    pub fn sanitize(&self, text: &str) -> String {
        let stripped = match &self.strip {
            Some(re) => re.replace_all(text, ""),
            None => text.into(),
        };
        match htmd::convert(&stripped) {
            Ok(markdown) => unescape_markdown(markdown.trim()),
            Err(e) => {
                warn!(error = ?e, "Markdown conversion failed, keeping tag-stripped text");
                stripped.trim().to_string()
            }
        }
    }
}

/// htmd escapes every markdown-significant character; only `*` and `_` stay
/// escaped in the exported text.
fn unescape_markdown(markdown: &str) -> String {
    static ESCAPED: OnceLock<Option<Regex>> = OnceLock::new();
    let escaped = ESCAPED.get_or_init(|| Regex::new(r"\\([\[\]()#+\-.!`>|{}~=<])").ok());
    match escaped {
        Some(re) => re.replace_all(markdown, "$1").into_owned(),
        None => markdown.to_string(),
    }
}

/// Sanitizes with the default strip set.
pub fn strip_tags(text: &str) -> String {
    Sanitizer::default().sanitize(text)
}
