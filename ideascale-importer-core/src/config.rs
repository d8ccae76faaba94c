use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://cardano.ideascale.com/a/rest";
pub const DEFAULT_CAMPAIGN_URL_BASE: &str = "https://cardano.ideascale.com/c/campaigns";

/// Immutable settings for one import run. Built once by the caller and
/// passed by reference into every pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(default)]
    pub api: ApiConfig,
    pub fund: FundConfig,
    #[serde(default)]
    pub proposals: ProposalConfig,
}

impl ImportConfig {
    /// Rejects option combinations that cannot produce a coherent run.
    /// Called before any network or file activity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.proposals.authors.mode()?;
        if self.api.page_size == 0 {
            return Err(ConfigError::Invalid("api.page_size must be greater than zero".into()));
        }
        if self.api.max_pages == 0 {
            return Err(ConfigError::Invalid("api.max_pages must be greater than zero".into()));
        }
        if self.api.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "api.request_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.api.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "api.retry.max_attempts must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn trace_loaded(&self) {
        info!(
            fund_id = self.fund.id,
            group_id = self.fund.group_id,
            stages = self.fund.stages.len(),
            base_url = %self.api.base_url,
            "Loaded ImportConfig"
        );
        debug!(?self, "ImportConfig loaded (full debug)");
    }
}

/// Remote API location and the limits applied when talking to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_campaign_url_base")]
    pub campaign_url_base: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Hard upper bound on pages fetched per listing.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Key of the free-form custom field bag on each idea.
    #[serde(default = "default_custom_fields_key")]
    pub custom_fields_key: String,
    /// Per-request deadline covering connect, headers and body.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            campaign_url_base: default_campaign_url_base(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            custom_fields_key: default_custom_fields_key(),
            request_timeout_ms: default_request_timeout_ms(),
            retry: RetryPolicy::default(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_campaign_url_base() -> String {
    DEFAULT_CAMPAIGN_URL_BASE.to_string()
}

fn default_page_size() -> usize {
    50
}

fn default_max_pages() -> usize {
    20
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_custom_fields_key() -> String {
    "customFieldsByKey".to_string()
}

/// Bounded exponential backoff for transient HTTP failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_max_attempts() -> usize {
    5
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundConfig {
    pub id: i64,
    #[serde(default = "default_group_id")]
    pub group_id: i64,
    #[serde(default = "default_threshold")]
    pub threshold: i64,
    #[serde(default)]
    pub goal: FundGoal,
    /// IdeaScale stage ids whose ideas become proposals.
    #[serde(default)]
    pub stages: Vec<i64>,
}

fn default_group_id() -> i64 {
    1
}

fn default_threshold() -> i64 {
    450
}

/// The fund goal is either plain text or a themes/timestamp payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FundGoal {
    Text(String),
    Themed {
        themes: Vec<String>,
        timestamp: String,
    },
}

impl Default for FundGoal {
    fn default() -> Self {
        FundGoal::Text("Lorem ipsum".to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalConfig {
    #[serde(default = "default_chain_vote_type")]
    pub chain_vote_type: String,
    #[serde(default = "default_vote_options")]
    pub vote_options: String,
    /// Category label template; `{fund}` is replaced by the fund id.
    #[serde(default = "default_category_label")]
    pub category_label: String,
    #[serde(default)]
    pub authors: AuthorOptions,
}

impl Default for ProposalConfig {
    fn default() -> Self {
        Self {
            chain_vote_type: default_chain_vote_type(),
            vote_options: default_vote_options(),
            category_label: default_category_label(),
            authors: AuthorOptions::default(),
        }
    }
}

impl ProposalConfig {
    pub fn category_name(&self, fund_id: i64) -> String {
        self.category_label.replace("{fund}", &fund_id.to_string())
    }
}

fn default_chain_vote_type() -> String {
    "private".to_string()
}

fn default_vote_options() -> String {
    "blank,yes,no".to_string()
}

fn default_category_label() -> String {
    "Fund {fund}".to_string()
}

/// Raw author flags as they appear in configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorOptions {
    #[serde(default)]
    pub merge_multiple: bool,
    #[serde(default)]
    pub structured: bool,
}

impl AuthorOptions {
    pub fn mode(&self) -> Result<AuthorMode, ConfigError> {
        match (self.merge_multiple, self.structured) {
            (true, true) => Err(ConfigError::ConflictingAuthorModes),
            (true, false) => Ok(AuthorMode::Merged),
            (false, true) => Ok(AuthorMode::Structured),
            (false, false) => Ok(AuthorMode::Single),
        }
    }
}

/// How the primary author and contributors end up in a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorMode {
    Single,
    Merged,
    Structured,
}
