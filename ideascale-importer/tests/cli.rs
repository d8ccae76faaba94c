use assert_cmd::Command;
use ideascale_importer::cli::{run, Cli, Commands};
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs::write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{event:?}"));
    }
}

fn write_run_files(dir: &Path, base_url: &str, authors: &str) -> std::path::PathBuf {
    write(dir.join("proposals_map.json"), r#"{"proposal_solution": "solution"}"#).unwrap();
    write(
        dir.join("reviews_map.json"),
        r#"{"cols": {"proposal_id": "proposal_id"}, "rating_cols": []}"#,
    )
    .unwrap();
    write(
        dir.join("challenges_format.json"),
        r#"{"id": "int", "title": "string", "rewards_total": "int"}"#,
    )
    .unwrap();
    let config = format!(
        r#"
api:
  base_url: "{base_url}"
  retry:
    max_attempts: 1
fund:
  id: 9
  group_id: 37
  stages: [4590]
proposals:
  authors:
{authors}
templates:
  proposals_map: proposals_map.json
  reviews_map: reviews_map.json
  challenges_format: challenges_format.json
output_dir: out
"#
    );
    let config_path = dir.join("import.yaml");
    write(&config_path, config).unwrap();
    config_path
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    let cli = Cli {
        command: Commands::Import {
            config: std::path::PathBuf::from("dummy.yaml"),
            output_dir: None,
            api_token: None,
        },
    };

    // The config does not exist; the event must still come first.
    let _ = run(cli).await;

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn import_writes_artifacts_from_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/campaigns/groups/37"))
        .and(header("api_token", "cli-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 37,
            "campaigns": [{"id": 501, "name": "F9: DApps", "tagline": "$1,000 in ada", "description": "Apps"}]
        }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/stages/4590/ideas/0/50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 11,
            "campaignId": 501,
            "title": "First",
            "text": "One",
            "url": "https://x/11",
            "authorInfo": {"name": "Alice", "email": "a@x"},
            "customFieldsByKey": {"solution": "Do it"}
        }])))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let config_path = write_run_files(dir.path(), &server.uri(), "    merge_multiple: false");
    let out = dir.path().join("custom_out");

    run(Cli {
        command: Commands::Import {
            config: config_path,
            output_dir: Some(out.clone()),
            api_token: Some("cli-token".to_string()),
        },
    })
    .await
    .expect("import should succeed");

    let challenges: Value = serde_json::from_str(&std::fs::read_to_string(out.join("challenges.json")).unwrap()).unwrap();
    assert_eq!(challenges, json!([{"id": 1, "title": "DApps", "rewards_total": 1000}]));
    let proposals: Value = serde_json::from_str(&std::fs::read_to_string(out.join("proposals.json")).unwrap()).unwrap();
    assert_eq!(proposals[0]["proposal_solution"], json!("Do it"));
    assert_eq!(proposals[0]["challenge_id"], json!(1));
    assert!(out.join("scores.csv").exists());
    assert!(!dir.path().join("out").exists());
}

#[test]
fn help_lists_import_subcommand() {
    let mut cmd = Command::cargo_bin("ideascale-importer").expect("Binary exists");
    cmd.arg("--help");
    cmd.assert().success().stdout(predicate::str::contains("import"));
}

#[test]
fn conflicting_author_modes_fail_without_output() {
    let dir = tempdir().unwrap();
    let config_path = write_run_files(
        dir.path(),
        "http://127.0.0.1:9",
        "    merge_multiple: true\n    structured: true",
    );

    let mut cmd = Command::cargo_bin("ideascale-importer").expect("Binary exists");
    cmd.arg("import").arg("--config").arg(&config_path);

    cmd.assert().failure();
    assert!(!dir.path().join("out").exists());
}
