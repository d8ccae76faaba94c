//! Assessment spreadsheets: composite ratings, per-proposal scores, the
//! reviews projection, and the withdrawn-proposal list.
//!
//! Both spreadsheets are optional inputs. A run without assessments still
//! produces proposals (with impact score `"0"`), an empty reviews list and an
//! empty scores file.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};
use tracing::{debug, info, warn};

use crate::error::AssessmentError;
use crate::mapping::Record;

pub const PROPOSAL_ID_COLUMN: &str = "proposal_id";
/// Name under which the computed composite rating can be referenced in `cols`.
pub const RATING_COLUMN: &str = "Rating";

/// Column rename table and rating columns for the reviews export.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewsConfig {
    /// Source column -> output field, in output order.
    #[serde(deserialize_with = "ordered_pairs")]
    pub cols: Vec<(String, String)>,
    pub rating_cols: Vec<String>,
}

fn ordered_pairs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<(String, String)>, D::Error> {
    let raw = Map::<String, Value>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(from, to)| match to {
            Value::String(to) => Ok((from, to)),
            other => Err(<D::Error as serde::de::Error>::custom(format!(
                "rename target for `{from}` must be a string, got {other}"
            ))),
        })
        .collect()
}

/// One reviewer's assessment of one proposal.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub proposal_id: i64,
    pub cells: HashMap<String, String>,
    /// Mean of the configured rating columns; `None` when none of them hold a number.
    pub rating: Option<f64>,
}

impl Assessment {
    pub fn new(proposal_id: i64, cells: HashMap<String, String>, rating_cols: &[String]) -> Self {
        let rating = composite_rating(&cells, rating_cols);
        Self {
            proposal_id,
            cells,
            rating,
        }
    }
}

/// Arithmetic mean of the numeric values found in `rating_cols`. Blank or
/// non-numeric cells are skipped.
pub fn composite_rating(cells: &HashMap<String, String>, rating_cols: &[String]) -> Option<f64> {
    let values: Vec<f64> = rating_cols
        .iter()
        .filter_map(|col| cells.get(col))
        .filter_map(|raw| raw.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .collect();
    mean(&values)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Rounds to two decimals, ties to even.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Impact score of one proposal as seen by the composer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImpactScore {
    /// No assessment input was supplied for the run.
    NotAssessed,
    /// Assessments were supplied but none rate this proposal.
    Unassessed,
    Scored(f64),
}

impl ImpactScore {
    /// `floor(round(mean, 2) * 100)` as text; `"0"` when there is no mean.
    pub fn percentile(&self) -> String {
        match self {
            ImpactScore::Scored(mean) => ((round2(*mean) * 100.0).floor() as i64).to_string(),
            ImpactScore::NotAssessed | ImpactScore::Unassessed => "0".to_string(),
        }
    }
}

/// Per-proposal aggregate rating; one row of `scores.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Score {
    pub proposal_id: i64,
    pub rating_given: f64,
}

/// Aggregated ratings keyed by proposal id, built once per run.
#[derive(Debug, Clone, Default)]
pub struct ScoreBook {
    means: Option<BTreeMap<i64, f64>>,
}

impl ScoreBook {
    /// `None` means the run has no assessment input at all.
    pub fn new(assessments: Option<&[Assessment]>) -> Self {
        let Some(assessments) = assessments else {
            return Self { means: None };
        };
        let mut grouped: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
        for a in assessments {
            match a.rating {
                Some(r) => grouped.entry(a.proposal_id).or_default().push(r),
                None => {
                    warn!(proposal_id = a.proposal_id, "Assessment row has no numeric rating, ignored for scoring");
                }
            }
        }
        let means = grouped
            .into_iter()
            .filter_map(|(id, ratings)| mean(&ratings).map(|m| (id, m)))
            .collect();
        Self { means: Some(means) }
    }

    pub fn impact(&self, proposal_id: i64) -> ImpactScore {
        match &self.means {
            None => ImpactScore::NotAssessed,
            Some(means) => match means.get(&proposal_id) {
                Some(m) => ImpactScore::Scored(*m),
                None => ImpactScore::Unassessed,
            },
        }
    }

    /// Scores ordered by proposal id, each rounded to two decimals.
    pub fn scores(&self) -> Vec<Score> {
        self.means
            .iter()
            .flatten()
            .map(|(id, m)| Score {
                proposal_id: *id,
                rating_given: round2(*m),
            })
            .collect()
    }
}

/// Per-proposal mean of composite ratings, ordered by proposal id.
pub fn compute_scores(assessments: &[Assessment]) -> Vec<Score> {
    ScoreBook::new(Some(assessments)).scores()
}

/// Convenience over [`ScoreBook`] for a single proposal.
pub fn impact_score(proposal_id: i64, assessments: Option<&[Assessment]>) -> String {
    ScoreBook::new(assessments).impact(proposal_id).percentile()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Integer,
    Float,
    Text,
}

fn infer_kind<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut kind = ColumnKind::Integer;
    for cell in cells.filter(|c| !c.is_empty()) {
        if cell.parse::<i64>().is_ok() {
            continue;
        }
        if cell.parse::<f64>().map(f64::is_finite).unwrap_or(false) {
            kind = ColumnKind::Float;
            continue;
        }
        return ColumnKind::Text;
    }
    kind
}

fn typed_cell(raw: &str, kind: ColumnKind) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    match kind {
        ColumnKind::Integer => raw
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        ColumnKind::Float => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(raw.to_string())),
        ColumnKind::Text => Value::String(raw.to_string()),
    }
}

/// Projects assessments through the rename table. Column types are inferred
/// across all rows so a numeric column stays numeric in every review.
pub fn reviews(assessments: &[Assessment], config: &ReviewsConfig) -> Vec<Record> {
    info!(count = assessments.len(), "Preparing reviews");
    let kinds: HashMap<&str, ColumnKind> = config
        .cols
        .iter()
        .filter(|(from, _)| from != RATING_COLUMN)
        .map(|(from, _)| {
            let cells = assessments
                .iter()
                .filter_map(|a| a.cells.get(from).map(String::as_str));
            (from.as_str(), infer_kind(cells))
        })
        .collect();

    assessments
        .iter()
        .map(|a| {
            config
                .cols
                .iter()
                .map(|(from, to)| {
                    let value = if from == RATING_COLUMN {
                        a.rating
                            .and_then(|r| Number::from_f64(round2(r)))
                            .map(Value::Number)
                            .unwrap_or(Value::Null)
                    } else {
                        let kind = kinds.get(from.as_str()).copied().unwrap_or(ColumnKind::Text);
                        a.cells
                            .get(from)
                            .map(|raw| typed_cell(raw, kind))
                            .unwrap_or(Value::Null)
                    };
                    (to.clone(), value)
                })
                .collect()
        })
        .collect()
}

fn parse_proposal_id(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        // Spreadsheet exports sometimes write integer ids as `123.0`.
        raw.parse::<f64>()
            .ok()
            .filter(|f| f.fract() == 0.0 && f.is_finite())
            .map(|f| f as i64)
    })
}

fn open_reader(path: &Path) -> Result<(csv::Reader<std::fs::File>, Vec<String>), AssessmentError> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| AssessmentError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    let headers = reader
        .headers()
        .map_err(|source| AssessmentError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .iter()
        .map(str::to_string)
        .collect();
    Ok((reader, headers))
}

fn require_columns<'a>(
    path: &Path,
    headers: &[String],
    required: impl IntoIterator<Item = &'a str>,
) -> Result<(), AssessmentError> {
    for column in required {
        if !headers.iter().any(|h| h == column) {
            return Err(AssessmentError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

/// Reads the assessments spreadsheet and computes each row's composite rating.
pub fn read_assessments(path: &Path, config: &ReviewsConfig) -> Result<Vec<Assessment>, AssessmentError> {
    info!(path = %path.display(), "Reading assessments");
    let (mut reader, headers) = open_reader(path)?;
    let renamed = config
        .cols
        .iter()
        .map(|(from, _)| from.as_str())
        .filter(|from| *from != RATING_COLUMN);
    require_columns(
        path,
        &headers,
        std::iter::once(PROPOSAL_ID_COLUMN)
            .chain(config.rating_cols.iter().map(String::as_str))
            .chain(renamed),
    )?;

    let mut assessments = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        let row = row.map_err(|source| AssessmentError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let cells: HashMap<String, String> = headers
            .iter()
            .cloned()
            .zip(row.iter().map(str::to_string))
            .collect();
        let raw_id = cells.get(PROPOSAL_ID_COLUMN).map(String::as_str).unwrap_or("");
        let proposal_id = parse_proposal_id(raw_id).ok_or_else(|| AssessmentError::InvalidProposalId {
            path: path.to_path_buf(),
            row: idx + 1,
            value: raw_id.to_string(),
        })?;
        assessments.push(Assessment::new(proposal_id, cells, &config.rating_cols));
    }
    debug!(count = assessments.len(), "Assessments parsed");
    Ok(assessments)
}

/// Reads the `proposal_id` column of the withdrawn-proposals spreadsheet.
pub fn read_withdrawn(path: &Path) -> Result<Vec<i64>, AssessmentError> {
    info!(path = %path.display(), "Reading withdrawn proposals");
    let (mut reader, headers) = open_reader(path)?;
    require_columns(path, &headers, [PROPOSAL_ID_COLUMN])?;
    let position = headers
        .iter()
        .position(|h| h == PROPOSAL_ID_COLUMN)
        .unwrap_or_default();

    let mut ids = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        let row = row.map_err(|source| AssessmentError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let raw = row.get(position).unwrap_or("");
        let id = parse_proposal_id(raw).ok_or_else(|| AssessmentError::InvalidProposalId {
            path: path.to_path_buf(),
            row: idx + 1,
            value: raw.to_string(),
        })?;
        ids.push(id);
    }
    Ok(ids)
}
