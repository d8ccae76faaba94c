use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

/// Amount token (must carry a digit), optional `in` marker, currency label.
/// Covers `$500,000 in ada`, `$200,000 in CLAP tokens` and `12,800,000 ada`.
fn rewards_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\s*\$?(\S*\d\S*)\s+(?:in\s+)?(.*?)\s*$").ok())
        .as_ref()
}

/// Splits a campaign tagline into a digits-only amount and a currency label.
/// Returns two empty strings when the tagline does not look like a budget.
pub fn parse_rewards(subtitle: &str) -> (String, String) {
    let Some(caps) = rewards_pattern().and_then(|re| re.captures(subtitle)) else {
        debug!(subtitle, "Tagline does not match rewards pattern");
        return (String::new(), String::new());
    };
    let amount: String = caps[1].chars().filter(char::is_ascii_digit).collect();
    if amount.is_empty() {
        return (String::new(), String::new());
    }
    (amount, caps[2].to_string())
}
