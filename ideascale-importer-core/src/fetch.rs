use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::Client;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::{ApiConfig, RetryPolicy};
use crate::contract::Fetcher;
use crate::error::FetchError;
use crate::mapping::Record;

/// Header carrying the API token on every request.
pub const API_TOKEN_HEADER: &str = "api_token";

/// [`Fetcher`] over HTTPS with bounded exponential backoff on transient
/// failures (429/5xx and transport errors).
pub struct HttpFetcher {
    client: Client,
    base_url: String,
    token: String,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(api: &ApiConfig, token: impl Into<String>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(api.request_timeout_ms))
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self {
            client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            retry: api.retry.clone(),
        })
    }

    fn backoff(&self) -> ExponentialBuilder {
        // `max_attempts` counts the first request; backon counts retries only.
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(self.retry.initial_backoff_ms))
            .with_max_delay(Duration::from_millis(self.retry.max_backoff_ms))
            .with_factor(2.0)
            .with_max_times(self.retry.max_attempts.saturating_sub(1))
    }

    async fn get_once(&self, url: &str) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(url)
            .header(API_TOKEN_HEADER, &self.token)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status.as_u16() != 200 {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.json::<Value>().await.map_err(|e| FetchError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get_json(&self, path: &str) -> Result<Value, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        info!(url = %url, "Requesting url");
        let result = (|| self.get_once(&url))
            .retry(self.backoff())
            .when(FetchError::is_retryable)
            .notify(|err: &FetchError, after: Duration| {
                warn!(error = %err, retry_in_ms = after.as_millis() as u64, "Transient failure, retrying");
            })
            .await;
        if let Err(e) = &result {
            error!(error = %e, url = %url, "Request failed");
        }
        result
    }
}

/// Fetches one stage's ideas page by page.
///
/// Stops on the first page shorter than `page_size`, after `max_pages` pages,
/// or on a failed page (the rest of the listing is skipped).
pub async fn fetch_listing<F>(fetcher: &F, stage: i64, page_size: usize, max_pages: usize) -> Vec<Record>
where
    F: Fetcher + ?Sized,
{
    let mut ideas = Vec::new();
    for page in 0..max_pages {
        let path = format!("/v1/stages/{stage}/ideas/{page}/{page_size}");
        let rows = match fetcher.get_json(&path).await {
            Ok(Value::Array(rows)) => rows,
            Ok(other) => {
                warn!(stage, page, kind = json_kind(&other), "Listing page is not an array, skipping rest of stage");
                break;
            }
            Err(e) => {
                warn!(stage, page, error = %e, "Listing page unavailable, skipping rest of stage");
                break;
            }
        };
        let count = rows.len();
        ideas.extend(rows.into_iter().filter_map(|row| match row {
            Value::Object(idea) => Some(idea),
            other => {
                warn!(stage, page, kind = json_kind(&other), "Ignoring non-object idea");
                None
            }
        }));
        if count < page_size {
            break;
        }
        if page + 1 == max_pages {
            warn!(stage, max_pages, "Reached page limit for stage");
        }
    }
    ideas
}

/// Fetches the campaign groups of a fund. A failed request yields no groups.
pub async fn fetch_campaign_groups<F>(fetcher: &F, group_id: i64) -> Vec<Record>
where
    F: Fetcher + ?Sized,
{
    let path = format!("/v1/campaigns/groups/{group_id}");
    match fetcher.get_json(&path).await {
        Ok(Value::Array(groups)) => groups
            .into_iter()
            .filter_map(|g| match g {
                Value::Object(group) => Some(group),
                _ => None,
            })
            .collect(),
        // Some deployments answer with the single group object.
        Ok(Value::Object(group)) => vec![group],
        Ok(other) => {
            warn!(group_id, kind = json_kind(&other), "Unexpected campaign groups payload");
            Vec::new()
        }
        Err(e) => {
            warn!(group_id, error = %e, "Campaign groups unavailable, continuing without challenges");
            Vec::new()
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
