use ideascale_importer_core::contract::MockFetcher;
use ideascale_importer_core::error::FetchError;
use ideascale_importer_core::fetch::{fetch_campaign_groups, fetch_listing};
use mockall::Sequence;
use serde_json::{json, Value};

fn page(ids: std::ops::Range<i64>) -> Value {
    Value::Array(ids.map(|id| json!({"id": id})).collect())
}

#[tokio::test]
async fn listing_stops_on_short_page() {
    let mut fetcher = MockFetcher::new();
    let mut seq = Sequence::new();
    fetcher
        .expect_get_json()
        .withf(|path: &str| path == "/v1/stages/4590/ideas/0/3")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(page(0..3)));
    fetcher
        .expect_get_json()
        .withf(|path: &str| path == "/v1/stages/4590/ideas/1/3")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(page(3..5)));

    let ideas = fetch_listing(&fetcher, 4590, 3, 20).await;

    let ids: Vec<i64> = ideas.iter().filter_map(|i| i.get("id").and_then(Value::as_i64)).collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn listing_respects_page_cap() {
    let mut fetcher = MockFetcher::new();
    fetcher
        .expect_get_json()
        .times(2)
        .returning(|_| Ok(page(0..2)));

    let ideas = fetch_listing(&fetcher, 1, 2, 2).await;

    assert_eq!(ideas.len(), 4);
}

#[tokio::test]
async fn failed_page_skips_rest_of_stage() {
    let mut fetcher = MockFetcher::new();
    let mut seq = Sequence::new();
    fetcher
        .expect_get_json()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(page(0..2)));
    fetcher
        .expect_get_json()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|path| {
            Err(FetchError::Status {
                url: path.to_string(),
                status: 404,
            })
        });

    let ideas = fetch_listing(&fetcher, 1, 2, 10).await;

    assert_eq!(ideas.len(), 2);
}

#[tokio::test]
async fn non_array_page_ends_listing() {
    let mut fetcher = MockFetcher::new();
    fetcher
        .expect_get_json()
        .times(1)
        .returning(|_| Ok(json!({"error": "nope"})));

    assert!(fetch_listing(&fetcher, 1, 50, 10).await.is_empty());
}

#[tokio::test]
async fn empty_first_page_yields_nothing() {
    let mut fetcher = MockFetcher::new();
    fetcher.expect_get_json().times(1).returning(|_| Ok(json!([])));

    assert!(fetch_listing(&fetcher, 1, 50, 10).await.is_empty());
}

#[tokio::test]
async fn campaign_groups_accept_list_or_single_object() {
    let mut fetcher = MockFetcher::new();
    fetcher
        .expect_get_json()
        .withf(|path: &str| path == "/v1/campaigns/groups/37")
        .times(1)
        .returning(|_| Ok(json!([{"id": 37, "campaigns": []}, {"id": 38, "campaigns": []}])));
    assert_eq!(fetch_campaign_groups(&fetcher, 37).await.len(), 2);

    let mut fetcher = MockFetcher::new();
    fetcher
        .expect_get_json()
        .times(1)
        .returning(|_| Ok(json!({"id": 37, "campaigns": []})));
    assert_eq!(fetch_campaign_groups(&fetcher, 37).await.len(), 1);
}

#[tokio::test]
async fn unavailable_campaign_groups_yield_no_groups() {
    let mut fetcher = MockFetcher::new();
    fetcher.expect_get_json().times(1).returning(|path| {
        Err(FetchError::Status {
            url: path.to_string(),
            status: 503,
        })
    });
    assert!(fetch_campaign_groups(&fetcher, 37).await.is_empty());
}
