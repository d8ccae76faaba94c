//! Export formatting and artifact writers.
//!
//! An export format declares which fields of a composed record reach the
//! output file and what primitive type each one is coerced to. Fields that
//! are declared but absent from a record are omitted, never defaulted.
//! A value that cannot be coerced aborts the run.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};
use tracing::{debug, error, info};

use crate::assessment::Score;
use crate::error::ExportError;
use crate::mapping::Record;

/// Declared type of one exported field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Int,
    Float,
    Bool,
    List,
    Dict,
    String,
    /// Copied as is; used for the legacy `export_cols` list form.
    Keep,
}

impl FieldType {
    pub fn parse(name: &str) -> Self {
        match name {
            "int" => FieldType::Int,
            "float" => FieldType::Float,
            "bool" => FieldType::Bool,
            "list" => FieldType::List,
            "dict" => FieldType::Dict,
            _ => FieldType::String,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
            FieldType::List => "list",
            FieldType::Dict => "dict",
            FieldType::String => "string",
            FieldType::Keep => "keep",
        }
    }
}

/// Ordered `field -> type` declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportFormat {
    fields: Vec<(String, FieldType)>,
}

impl ExportFormat {
    pub fn new<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, FieldType)>,
        K: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(|(k, t)| (k.into(), t)).collect(),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, FieldType)> {
        self.fields.iter().map(|(k, t)| (k.as_str(), *t))
    }
}

impl<'de> Deserialize<'de> for ExportFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        // Legacy form: {"export_cols": ["id", "title", ...]}
        if let (1, Some(Value::Array(cols))) = (raw.len(), raw.get("export_cols")) {
            let fields = cols
                .iter()
                .map(|c| match c {
                    Value::String(name) => Ok((name.clone(), FieldType::Keep)),
                    other => Err(<D::Error as serde::de::Error>::custom(format!(
                        "export_cols entries must be strings, got {other}"
                    ))),
                })
                .collect::<Result<_, _>>()?;
            return Ok(Self { fields });
        }
        let fields = raw
            .into_iter()
            .map(|(field, ty)| match ty {
                Value::String(name) => Ok((field, FieldType::parse(&name))),
                other => Err(<D::Error as serde::de::Error>::custom(format!(
                    "type of `{field}` must be a type name, got {other}"
                ))),
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { fields })
    }
}

fn coercion_error(field: &str, ty: FieldType, value: &Value) -> ExportError {
    ExportError::Coercion {
        field: field.to_string(),
        expected: ty.name().to_string(),
        value: value.to_string(),
    }
}

/// Coerces one value to its declared type.
pub fn coerce(field: &str, ty: FieldType, value: &Value) -> Result<Value, ExportError> {
    let fail = || coercion_error(field, ty, value);
    match ty {
        FieldType::Int => match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
                .map(Value::from)
                .ok_or_else(fail),
            Value::String(s) => s.trim().parse::<i64>().map(Value::from).map_err(|_| fail()),
            Value::Bool(b) => Ok(Value::from(i64::from(*b))),
            _ => Err(fail()),
        },
        FieldType::Float => {
            let parsed = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                _ => None,
            };
            parsed
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(fail)
        }
        FieldType::Bool => Ok(Value::Bool(match value {
            Value::Bool(b) => *b,
            Value::String(s) => s.eq_ignore_ascii_case("true"),
            _ => false,
        })),
        FieldType::List | FieldType::Dict | FieldType::Keep => Ok(value.clone()),
        FieldType::String => Ok(Value::String(match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        })),
    }
}

/// Projects each record onto `format`, dropping undeclared fields.
pub fn format_records(records: &[Record], format: &ExportFormat) -> Result<Vec<Record>, ExportError> {
    records
        .iter()
        .map(|record| {
            format
                .fields()
                .filter_map(|(field, ty)| record.get(field).map(|value| (field, ty, value)))
                .map(|(field, ty, value)| coerce(field, ty, value).map(|v| (field.to_string(), v)))
                .collect::<Result<Record, _>>()
        })
        .collect::<Result<Vec<_>, _>>()
        .inspect_err(|e| error!(error = %e, "Export formatting failed"))
}

/// Writes `data` as pretty JSON, replacing any existing file.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<(), ExportError> {
    let file = File::create(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, data).map_err(|e| ExportError::Serialise {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "Wrote JSON artifact");
    Ok(())
}

/// Writes `proposal_id,rating_given` rows.
pub fn write_scores_csv(path: &Path, scores: &[Score]) -> Result<(), ExportError> {
    let serialise_error = |e: csv::Error| ExportError::Serialise {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    let mut writer = csv::Writer::from_path(path).map_err(serialise_error)?;
    if scores.is_empty() {
        // Serialising rows emits the header; an empty file still needs one.
        writer
            .write_record(["proposal_id", "rating_given"])
            .map_err(serialise_error)?;
    }
    for score in scores {
        writer.serialize(score).map_err(serialise_error)?;
    }
    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), rows = scores.len(), "Wrote scores");
    Ok(())
}
