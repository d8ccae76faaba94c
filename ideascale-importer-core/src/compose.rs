//! Record composition.
//!
//! Raw API objects come in as [`RawIdea`] / [`RawCampaign`] (opaque JSON,
//! read field by field) and leave as the typed [`Fund`], [`Challenge`] and
//! [`Proposal`] records. `to_record` on each typed record is the only way back
//! to an open JSON object, used by the export formatter and the writers.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::assessment::{ImpactScore, ScoreBook};
use crate::authors::{aggregate_authors, Authors};
use crate::config::{AuthorMode, FundGoal, ImportConfig};
use crate::error::ConfigError;
use crate::mapping::{extract_custom_fields, MappingConfig, Record};
use crate::rewards::parse_rewards;
use crate::sanitize::Sanitizer;

/// Key of the nested object holding resolved extra fields.
pub const EXTRA_FIELDS_KEY: &str = "extra";

fn to_record<T: Serialize>(value: &T) -> Record {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        Ok(_) => Record::new(),
        Err(e) => {
            // Plain structs with string keys always serialise to an object.
            warn!(error = %e, "Failed to serialise record");
            Record::new()
        }
    }
}

fn str_field<'a>(record: &'a Record, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

/// Integer ids sometimes arrive as numeric strings.
fn int_field(record: &Record, key: &str) -> Option<i64> {
    match record.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A campaign object from `/v1/campaigns/groups/{id}`.
#[derive(Debug, Clone)]
pub struct RawCampaign(pub Record);

impl RawCampaign {
    pub fn id(&self) -> Option<i64> {
        int_field(&self.0, "id")
    }

    pub fn name(&self) -> &str {
        str_field(&self.0, "name").unwrap_or_default()
    }

    pub fn tagline(&self) -> &str {
        str_field(&self.0, "tagline").unwrap_or_default()
    }

    pub fn description(&self) -> &str {
        str_field(&self.0, "description").unwrap_or_default()
    }
}

/// An idea object from a stage listing.
#[derive(Debug, Clone)]
pub struct RawIdea(pub Record);

impl RawIdea {
    pub fn id(&self) -> Option<i64> {
        int_field(&self.0, "id")
    }

    pub fn campaign_id(&self) -> Option<i64> {
        int_field(&self.0, "campaignId")
    }

    pub fn title(&self) -> &str {
        str_field(&self.0, "title").unwrap_or_default()
    }

    pub fn text(&self) -> &str {
        str_field(&self.0, "text").unwrap_or_default()
    }

    pub fn url(&self) -> &str {
        str_field(&self.0, "url").unwrap_or_default()
    }

    fn author_info(&self, key: &str) -> &str {
        self.0
            .get("authorInfo")
            .and_then(Value::as_object)
            .and_then(|info| str_field(info, key))
            .unwrap_or_default()
    }

    pub fn author_name(&self) -> &str {
        self.author_info("name")
    }

    pub fn author_email(&self) -> &str {
        self.author_info("email")
    }

    /// Contributor names in source order. Entries are either plain names or
    /// objects carrying `name`.
    pub fn contributors(&self) -> Vec<String> {
        let Some(Value::Array(entries)) = self.0.get("contributors") else {
            return Vec::new();
        };
        entries
            .iter()
            .filter_map(|entry| match entry {
                Value::String(name) => Some(name.clone()),
                Value::Object(obj) => str_field(obj, "name").map(str::to_string),
                _ => None,
            })
            .filter(|name| !name.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Fund {
    pub id: i64,
    pub goal: String,
    pub threshold: i64,
    pub rewards_info: String,
}

impl Fund {
    pub fn to_record(&self) -> Record {
        to_record(self)
    }
}

/// The structured goal is embedded as a compact JSON string.
pub fn render_goal(goal: &FundGoal) -> String {
    match goal {
        FundGoal::Text(text) => text.clone(),
        FundGoal::Themed { themes, timestamp } => json!({
            "timestamp": timestamp,
            "themes": themes,
        })
        .to_string(),
    }
}

pub fn compose_fund(config: &ImportConfig) -> Fund {
    info!(fund_id = config.fund.id, "Preparing fund");
    Fund {
        id: config.fund.id,
        goal: render_goal(&config.fund.goal),
        threshold: config.fund.threshold,
        rewards_info: String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChallengeType {
    Native,
    CommunityChoice,
    Simple,
}

impl ChallengeType {
    pub fn from_title(title: &str) -> Self {
        let lower = title.to_lowercase();
        if lower.contains("catalyst natives") {
            ChallengeType::Native
        } else if lower.contains("challenge setting") {
            ChallengeType::CommunityChoice
        } else {
            ChallengeType::Simple
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Challenge {
    pub id: i64,
    pub title: String,
    pub challenge_type: ChallengeType,
    pub challenge_url: String,
    pub description: String,
    pub fund_id: i64,
    pub rewards_total: String,
    pub proposers_rewards: String,
    pub rewards_currency: String,
    /// Campaign id in the source system; only used to link proposals.
    #[serde(skip)]
    pub internal_id: i64,
}

impl Challenge {
    pub fn to_record(&self) -> Record {
        to_record(self)
    }
}

/// Builds challenges from every campaign of every group, numbering them
/// densely from 1.
pub fn compose_challenges(groups: &[Record], config: &ImportConfig, sanitizer: &Sanitizer) -> Vec<Challenge> {
    let fund_prefix = format!("F{}:", config.fund.id);
    let url_base = config.api.campaign_url_base.trim_end_matches('/');
    let campaigns = groups
        .iter()
        .filter_map(|g| g.get("campaigns").and_then(Value::as_array))
        .flatten()
        .filter_map(|c| c.as_object().cloned().map(RawCampaign));

    let mut challenges = Vec::new();
    for campaign in campaigns {
        let Some(internal_id) = campaign.id() else {
            warn!("Campaign without id, skipped");
            continue;
        };
        let title = campaign.name().replace(&fund_prefix, "").trim().to_string();
        let (rewards, currency) = parse_rewards(campaign.tagline());
        let challenge = Challenge {
            id: challenges.len() as i64 + 1,
            challenge_type: ChallengeType::from_title(&title),
            title,
            // The canonical API URL points at the brief rather than the proposals.
            challenge_url: format!("{url_base}/{internal_id}/"),
            description: sanitizer.sanitize(campaign.description()),
            fund_id: config.fund.id,
            rewards_total: rewards.clone(),
            proposers_rewards: rewards,
            rewards_currency: currency,
            internal_id,
        };
        debug!(id = challenge.id, internal_id, title = %challenge.title, "Composed challenge");
        challenges.push(challenge);
    }
    info!(count = challenges.len(), "Total challenges pulled");
    challenges
}

pub fn find_challenge(campaign_id: i64, challenges: &[Challenge]) -> Option<&Challenge> {
    challenges.iter().find(|c| c.internal_id == campaign_id)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Proposal {
    pub category_name: String,
    pub chain_vote_options: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge_type: Option<ChallengeType>,
    pub chain_vote_type: String,
    pub internal_id: usize,
    pub proposal_id: i64,
    pub proposal_impact_score: String,
    pub proposal_summary: String,
    pub proposal_title: String,
    pub proposal_url: String,
    pub proposer_email: String,
    #[serde(flatten)]
    pub authors: Authors,
    /// Fields resolved through the proposals mapping, in mapping order.
    #[serde(skip)]
    pub fields: Vec<(String, Value)>,
    /// Fields resolved through the extra mapping; `None` when none resolved.
    #[serde(skip)]
    pub extra: Option<Record>,
}

impl Proposal {
    /// Mapped fields win over fixed fields of the same name.
    pub fn to_record(&self) -> Record {
        let mut record = to_record(self);
        for (key, value) in &self.fields {
            record.insert(key.clone(), value.clone());
        }
        if let Some(extra) = &self.extra {
            record.insert(EXTRA_FIELDS_KEY.to_string(), Value::Object(extra.clone()));
        }
        record
    }
}

/// Composes proposals from raw ideas. Holds the per-run lookups and hands out
/// internal ids densely from 0 in composition order.
pub struct ProposalComposer<'a> {
    config: &'a ImportConfig,
    mappings: &'a MappingConfig,
    extra: &'a MappingConfig,
    scores: &'a ScoreBook,
    sanitizer: &'a Sanitizer,
    author_mode: AuthorMode,
    relevant_keys: BTreeSet<String>,
    next_internal_id: usize,
}

impl<'a> ProposalComposer<'a> {
    pub fn new(
        config: &'a ImportConfig,
        mappings: &'a MappingConfig,
        extra: &'a MappingConfig,
        scores: &'a ScoreBook,
        sanitizer: &'a Sanitizer,
    ) -> Result<Self, ConfigError> {
        let mut relevant_keys = mappings.relevant_keys();
        relevant_keys.extend(extra.relevant_keys());
        Ok(Self {
            config,
            mappings,
            extra,
            scores,
            sanitizer,
            author_mode: config.proposals.authors.mode()?,
            relevant_keys,
            next_internal_id: 0,
        })
    }

    /// `None` only for ideas without an id; those are skipped.
    pub fn compose(&mut self, idea: &RawIdea, challenges: &[Challenge]) -> Option<Proposal> {
        let Some(proposal_id) = idea.id() else {
            warn!("Idea without id, skipped");
            return None;
        };

        let challenge = idea
            .campaign_id()
            .and_then(|campaign_id| find_challenge(campaign_id, challenges));
        if challenge.is_none() {
            warn!(
                proposal_id,
                campaign_id = ?idea.campaign_id(),
                "Challenge not found for proposal"
            );
        }

        let impact = self.scores.impact(proposal_id);
        if impact == ImpactScore::Unassessed {
            warn!(proposal_id, "No assessments rate this proposal, impact score set to 0");
        }

        let custom = extract_custom_fields(
            &idea.0,
            &self.config.api.custom_fields_key,
            &self.relevant_keys,
            self.sanitizer,
        );
        let fields = self.mappings.resolve_all(&custom);
        let extra_fields = self.extra.resolve_all(&custom);
        let extra = (!extra_fields.is_empty()).then(|| extra_fields.into_iter().collect::<Record>());

        let internal_id = self.next_internal_id;
        self.next_internal_id += 1;

        let proposal = Proposal {
            category_name: self.config.proposals.category_name(self.config.fund.id),
            chain_vote_options: self.config.proposals.vote_options.clone(),
            challenge_id: challenge.map(|c| c.id),
            challenge_type: challenge.map(|c| c.challenge_type),
            chain_vote_type: self.config.proposals.chain_vote_type.clone(),
            internal_id,
            proposal_id,
            proposal_impact_score: impact.percentile(),
            proposal_summary: self.sanitizer.sanitize(idea.text()),
            proposal_title: self.sanitizer.sanitize(idea.title()),
            proposal_url: idea.url().to_string(),
            proposer_email: idea.author_email().to_string(),
            authors: aggregate_authors(idea.author_name(), &idea.contributors(), self.author_mode),
            fields,
            extra,
        };
        debug!(proposal_id, internal_id, "Composed proposal");
        Some(proposal)
    }
}

pub fn compose_proposals(ideas: &[RawIdea], challenges: &[Challenge], composer: &mut ProposalComposer<'_>) -> Vec<Proposal> {
    let proposals: Vec<Proposal> = ideas
        .iter()
        .filter_map(|idea| composer.compose(idea, challenges))
        .collect();
    info!(count = proposals.len(), "Total ideas pulled");
    proposals
}
