use ideascale_importer_core::rewards::parse_rewards;
use ideascale_importer_core::sanitize::{strip_tags, Sanitizer};
use pretty_assertions::assert_eq;

#[test]
fn strip_tags_keeps_inline_text() {
    assert_eq!(strip_tags("<p>Hello <b>world</b></p>"), "Hello world");
    assert_eq!(strip_tags("<a href=\"https://x.io\">link</a> text"), "link text");
    assert_eq!(strip_tags("<strong>Bold</strong> and <i>italic</i>"), "Bold and italic");
}

#[test]
fn strip_tags_leaves_no_stripped_markup() {
    let cleaned = strip_tags("<b>bold</b> and <a href=#>link</a>");
    assert!(!cleaned.contains("<b>"));
    assert!(!cleaned.contains("<a"));
    assert_eq!(cleaned, "bold and link");
}

#[test]
fn quoted_attribute_values_do_not_end_a_stripped_tag() {
    assert_eq!(strip_tags("<a href=\"x>y\">link</a>"), "link");
    assert_eq!(strip_tags("<img alt='1 > 0'/>Chart"), "Chart");
    assert_eq!(
        strip_tags("<p>See <a title=\"a>b\" href=\"https://x.io\">docs</a></p>"),
        "See docs"
    );
}

#[test]
fn bracketed_and_numbered_titles_stay_readable() {
    assert_eq!(strip_tags("[SPO] Tooling"), "[SPO] Tooling");
    assert_eq!(strip_tags("1. Build wallets"), "1. Build wallets");
    assert_eq!(strip_tags("<b>[DeFi]</b> Lending (v2)!"), "[DeFi] Lending (v2)!");
}

#[test]
fn strip_tags_drops_embedded_media() {
    assert_eq!(strip_tags("Before<img src=\"a.png\"/> after"), "Before after");
    assert_eq!(strip_tags("<iframe src=\"https://v.io\"></iframe>Watch"), "Watch");
}

#[test]
fn strip_tags_trims_plain_text() {
    assert_eq!(strip_tags("  plain text \n"), "plain text");
    assert_eq!(strip_tags(""), "");
}

#[test]
fn empty_strip_set_leaves_inline_markup_for_markdown() {
    let sanitizer = Sanitizer::new::<&str>(&[]);
    assert_eq!(sanitizer.sanitize("<b>bold</b>"), "**bold**");
}

#[test]
fn custom_strip_set_only_strips_listed_tags() {
    let sanitizer = Sanitizer::new(&["i"]);
    assert_eq!(sanitizer.sanitize("<i>quiet</i> <b>loud</b>"), "quiet **loud**");
}

#[test]
fn rewards_with_in_marker() {
    assert_eq!(parse_rewards("$500,000 in ada"), ("500000".to_string(), "ada".to_string()));
    assert_eq!(
        parse_rewards("$200,000 in CLAP tokens"),
        ("200000".to_string(), "CLAP tokens".to_string())
    );
}

#[test]
fn rewards_without_dollar_or_marker() {
    assert_eq!(parse_rewards("12,800,000 ada"), ("12800000".to_string(), "ada".to_string()));
}

#[test]
fn rewards_unparseable_tagline_is_empty() {
    assert_eq!(parse_rewards("no match here"), (String::new(), String::new()));
    assert_eq!(parse_rewards(""), (String::new(), String::new()));
    assert_eq!(parse_rewards("$500,000"), (String::new(), String::new()));
}
