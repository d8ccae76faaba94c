use std::collections::BTreeSet;

use ideascale_importer_core::mapping::{extract_custom_fields, resolve, MappingConfig, MappingKey, Record};
use ideascale_importer_core::sanitize::Sanitizer;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

#[test]
fn single_key_resolves_even_when_empty() {
    let source = record(json!({"problem": ""}));
    let key = MappingKey::from("problem");
    assert_eq!(resolve(&key, &source), Some(&json!("")));
}

#[test]
fn single_key_missing_is_unresolved() {
    let source = record(json!({"other": "x"}));
    assert_eq!(resolve(&MappingKey::from("problem"), &source), None);
}

#[test]
fn candidates_pick_first_present_non_empty_value() {
    let source = record(json!({"f9_problem": "", "f8_problem": null, "problem": "Too slow"}));
    let key = MappingKey::from(vec!["f9_problem", "f8_problem", "problem"]);
    assert_eq!(resolve(&key, &source), Some(&json!("Too slow")));
}

#[test]
fn candidates_fall_through_missing_and_empty_keys() {
    let key = MappingKey::from(vec!["a", "b"]);
    assert_eq!(resolve(&key, &record(json!({"b": "x"}))), Some(&json!("x")));
    assert_eq!(resolve(&key, &record(json!({"a": "", "b": "x"}))), Some(&json!("x")));
}

#[test]
fn candidates_keep_falsy_scalars_that_are_not_empty() {
    let source = record(json!({"a": [], "b": 0, "c": "later"}));
    let key = MappingKey::from(vec!["a", "b", "c"]);
    assert_eq!(resolve(&key, &source), Some(&json!(0)));
}

#[test]
fn candidates_all_empty_is_unresolved() {
    let source = record(json!({"a": "", "b": {}}));
    let key = MappingKey::from(vec!["a", "b", "missing"]);
    assert_eq!(resolve(&key, &source), None);
}

#[test]
fn mapping_config_keeps_file_order_and_accepts_both_key_forms() {
    let config: MappingConfig = serde_json::from_str(
        r#"{"proposal_solution": "solution", "proposal_problem": ["f10_problem", "problem"], "importance": "importance"}"#,
    )
    .expect("mapping parses");

    let fields: Vec<&str> = config.entries().map(|(field, _)| field).collect();
    assert_eq!(fields, vec!["proposal_solution", "proposal_problem", "importance"]);
    assert_eq!(config.len(), 3);

    let expected: BTreeSet<String> = ["solution", "f10_problem", "problem", "importance"]
        .into_iter()
        .map(str::to_string)
        .collect();
    assert_eq!(config.relevant_keys(), expected);
}

#[test]
fn mapping_config_rejects_non_key_values() {
    let result = serde_json::from_str::<MappingConfig>(r#"{"field": 42}"#);
    assert!(result.is_err());
}

#[test]
fn resolve_all_leaves_out_unresolved_entries() {
    let config = MappingConfig::new([
        ("proposal_solution", MappingKey::from("solution")),
        ("proposal_problem", MappingKey::from(vec!["f10_problem", "problem"])),
        ("proposal_budget", MappingKey::from("budget")),
    ]);
    let source = record(json!({"solution": "Build it", "problem": "Nothing exists", "budget": 1500}));
    let missing_budget = record(json!({"solution": "Build it"}));

    assert_eq!(
        config.resolve_all(&source),
        vec![
            ("proposal_solution".to_string(), json!("Build it")),
            ("proposal_problem".to_string(), json!("Nothing exists")),
            ("proposal_budget".to_string(), json!(1500)),
        ]
    );
    assert_eq!(
        config.resolve_all(&missing_budget),
        vec![("proposal_solution".to_string(), json!("Build it"))]
    );
}

#[test]
fn extract_custom_fields_narrows_and_sanitises() {
    let idea = record(json!({
        "id": 1,
        "customFieldsByKey": {
            "solution": "<p>Use <b>rust</b></p>",
            "budget": 1200,
            "unrelated": "dropped"
        }
    }));
    let keys: BTreeSet<String> = ["solution", "budget", "absent"].into_iter().map(str::to_string).collect();

    let extracted = extract_custom_fields(&idea, "customFieldsByKey", &keys, &Sanitizer::default());

    assert_eq!(extracted.len(), 2);
    assert_eq!(extracted.get("solution"), Some(&json!("Use rust")));
    assert_eq!(extracted.get("budget"), Some(&json!(1200)));
    assert!(!extracted.contains_key("unrelated"));
}

#[test]
fn extract_custom_fields_without_bag_is_empty() {
    let idea = record(json!({"id": 1}));
    let keys: BTreeSet<String> = ["solution".to_string()].into_iter().collect();
    assert!(extract_custom_fields(&idea, "customFieldsByKey", &keys, &Sanitizer::default()).is_empty());
}
