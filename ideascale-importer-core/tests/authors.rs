use ideascale_importer_core::authors::{aggregate_authors, AuthorEntry, Authors};
use ideascale_importer_core::config::{AuthorMode, AuthorOptions};
use ideascale_importer_core::error::ConfigError;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn single_mode_ignores_contributors() {
    let authors = aggregate_authors("Alice", &["Bob"], AuthorMode::Single);
    assert_eq!(authors, Authors::Name("Alice".to_string()));
    assert_eq!(authors.field_name(), "proposer_name");
}

#[test]
fn merged_mode_joins_names_in_order() {
    let authors = aggregate_authors("Alice", &["Bob", "Carol"], AuthorMode::Merged);
    assert_eq!(authors, Authors::Name("Alice, Bob, Carol".to_string()));
}

#[test]
fn merged_mode_without_contributors_is_primary_only() {
    let authors = aggregate_authors::<&str>("Alice", &[], AuthorMode::Merged);
    assert_eq!(authors, Authors::Name("Alice".to_string()));
}

#[test]
fn structured_mode_flags_primary_author() {
    let authors = aggregate_authors("Alice", &["Bob".to_string()], AuthorMode::Structured);
    assert_eq!(
        authors,
        Authors::Structured(vec![
            AuthorEntry {
                name: "Alice".to_string(),
                is_primary: true,
            },
            AuthorEntry {
                name: "Bob".to_string(),
                is_primary: false,
            },
        ])
    );
    assert_eq!(authors.field_name(), "proposers");
}

#[test]
fn authors_serialise_under_their_field_name() {
    let name = serde_json::to_value(Authors::Name("Alice".to_string())).unwrap();
    assert_eq!(name, json!({"proposer_name": "Alice"}));

    let structured = serde_json::to_value(aggregate_authors::<&str>("Alice", &[], AuthorMode::Structured)).unwrap();
    assert_eq!(structured, json!({"proposers": [{"name": "Alice", "is_primary": true}]}));
}

#[test]
fn author_options_are_mutually_exclusive() {
    let both = AuthorOptions {
        merge_multiple: true,
        structured: true,
    };
    assert!(matches!(both.mode(), Err(ConfigError::ConflictingAuthorModes)));
    assert_eq!(AuthorOptions::default().mode().unwrap(), AuthorMode::Single);
}
