//! High-level pipeline: fetch → compose → format → write.
//!
//! [`import_fund`] pulls remote data through a [`Fetcher`], merges it with the
//! optional spreadsheets and returns the composed artifacts in memory.
//! [`write_outputs`] formats and persists them one file at a time.
//!
//! # Error Handling
//! Unavailable listings, unmatched challenges and missing optional inputs are
//! logged and degrade to empty data. Invalid configuration, unreadable
//! spreadsheets and export coercion failures abort the run. Files already
//! written when a later write fails stay on disk.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info};

use crate::assessment::{read_assessments, read_withdrawn, reviews, ReviewsConfig, Score, ScoreBook};
use crate::compose::{
    compose_challenges, compose_fund, compose_proposals, Challenge, Fund, Proposal, ProposalComposer, RawIdea,
};
use crate::config::ImportConfig;
use crate::contract::Fetcher;
use crate::error::{ExportError, ImportError};
use crate::export::{format_records, write_json, write_scores_csv, ExportFormat};
use crate::fetch::{fetch_campaign_groups, fetch_listing};
use crate::mapping::{MappingConfig, Record};
use crate::sanitize::Sanitizer;

/// Mapping tables and optional spreadsheets for one run.
#[derive(Debug, Clone, Default)]
pub struct ImportInputs {
    pub mappings: MappingConfig,
    /// Resolved into the nested `extra` object of each proposal.
    pub extra_mappings: MappingConfig,
    pub reviews: ReviewsConfig,
    pub assessments: Option<PathBuf>,
    pub withdrawn: Option<PathBuf>,
}

/// Output schemas applied just before writing.
#[derive(Debug, Clone, Default)]
pub struct ExportFormats {
    pub challenges: ExportFormat,
    /// Proposals are written unformatted when absent.
    pub proposals: Option<ExportFormat>,
}

/// Everything one run produces, before formatting.
#[derive(Debug, Clone)]
pub struct ImportArtifacts {
    pub fund: Fund,
    pub challenges: Vec<Challenge>,
    pub proposals: Vec<Proposal>,
    pub reviews: Vec<Record>,
    pub scores: Vec<Score>,
    pub excluded: Vec<i64>,
}

#[derive(Debug)]
pub struct ImportReport {
    pub output_dir: PathBuf,
    pub files: Vec<PathBuf>,
    pub challenges: usize,
    pub proposals: usize,
    pub reviews: usize,
    pub scores: usize,
    pub excluded: usize,
}

pub async fn import_fund<F>(
    config: &ImportConfig,
    inputs: &ImportInputs,
    fetcher: &F,
) -> Result<ImportArtifacts, ImportError>
where
    F: Fetcher + ?Sized,
{
    if let Err(e) = config.validate() {
        error!(error = %e, "[IMPORT] Invalid configuration");
        return Err(e.into());
    }
    info!(fund_id = config.fund.id, "[IMPORT] Starting import");

    let assessments = inputs
        .assessments
        .as_deref()
        .map(|path| read_assessments(path, &inputs.reviews))
        .transpose()?;
    let withdrawn = inputs.withdrawn.as_deref().map(read_withdrawn).transpose()?;

    let sanitizer = Sanitizer::default();
    let fund = compose_fund(config);

    info!("[IMPORT] Requesting challenges");
    let groups = fetch_campaign_groups(fetcher, config.fund.group_id).await;
    let challenges = compose_challenges(&groups, config, &sanitizer);

    info!(stages = config.fund.stages.len(), "[IMPORT] Requesting proposals");
    let mut ideas = Vec::new();
    for stage in &config.fund.stages {
        let listing = fetch_listing(fetcher, *stage, config.api.page_size, config.api.max_pages).await;
        info!(stage, ideas = listing.len(), "[IMPORT] Stage listing fetched");
        ideas.extend(listing.into_iter().map(RawIdea));
    }

    let score_book = ScoreBook::new(assessments.as_deref());
    let mut composer = ProposalComposer::new(
        config,
        &inputs.mappings,
        &inputs.extra_mappings,
        &score_book,
        &sanitizer,
    )?;
    let proposals = compose_proposals(&ideas, &challenges, &mut composer);

    let reviews = assessments
        .as_deref()
        .map(|a| reviews(a, &inputs.reviews))
        .unwrap_or_default();
    info!("[IMPORT] Preparing proposals scores");
    let scores = score_book.scores();
    info!("[IMPORT] Preparing withdrawn proposals");
    let excluded = withdrawn.unwrap_or_default();

    Ok(ImportArtifacts {
        fund,
        challenges,
        proposals,
        reviews,
        scores,
        excluded,
    })
}

/// Formats and writes every artifact into `output_dir`, in a fixed order.
pub fn write_outputs(
    output_dir: &Path,
    artifacts: &ImportArtifacts,
    formats: &ExportFormats,
) -> Result<ImportReport, ImportError> {
    info!(output_dir = %output_dir.display(), "[IMPORT] Saving data");
    std::fs::create_dir_all(output_dir).map_err(|source| ExportError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    save(output_dir, "funds.json", &[artifacts.fund.to_record()], &mut files)?;

    let challenges: Vec<Record> = artifacts.challenges.iter().map(Challenge::to_record).collect();
    let challenges = format_records(&challenges, &formats.challenges)?;
    save(output_dir, "challenges.json", &challenges, &mut files)?;

    let proposals: Vec<Record> = artifacts.proposals.iter().map(Proposal::to_record).collect();
    let proposals = match &formats.proposals {
        Some(format) => format_records(&proposals, format)?,
        None => proposals,
    };
    save(output_dir, "proposals.json", &proposals, &mut files)?;

    save(output_dir, "reviews.json", &artifacts.reviews, &mut files)?;

    let scores_path = output_dir.join("scores.csv");
    write_scores_csv(&scores_path, &artifacts.scores)?;
    files.push(scores_path);

    save(output_dir, "excluded_proposals.json", &artifacts.excluded, &mut files)?;

    info!(output_dir = %output_dir.display(), files = files.len(), "[IMPORT] All data saved");
    Ok(ImportReport {
        output_dir: output_dir.to_path_buf(),
        files,
        challenges: artifacts.challenges.len(),
        proposals: artifacts.proposals.len(),
        reviews: artifacts.reviews.len(),
        scores: artifacts.scores.len(),
        excluded: artifacts.excluded.len(),
    })
}

fn save<T: Serialize + ?Sized>(
    output_dir: &Path,
    name: &str,
    data: &T,
    files: &mut Vec<PathBuf>,
) -> Result<(), ExportError> {
    let path = output_dir.join(name);
    write_json(&path, data)?;
    info!(path = %path.display(), "[IMPORT] Saved");
    files.push(path);
    Ok(())
}
