/// `load_config` module: loads the YAML run configuration and the JSON mapping
/// templates it points at, producing everything the core pipeline needs.
///
/// This is the only place where user-supplied files are parsed into the core's
/// typed configuration.
///
/// # Responsibilities
/// - Parse the YAML run file into [`ImportConfig`] plus input/template/output sections
/// - Resolve relative paths against the directory holding the YAML file
/// - Load mapping, reviews and export-format templates (JSON)
/// - Validate option combinations before any network or file output happens
///
/// # Errors
/// Every failure is an `anyhow::Error` with the offending path in context,
/// surfaced at the CLI boundary.
use anyhow::{Context, Result};
use ideascale_importer_core::assessment::ReviewsConfig;
use ideascale_importer_core::config::ImportConfig;
use ideascale_importer_core::export::ExportFormat;
use ideascale_importer_core::import::{ExportFormats, ImportInputs};
use ideascale_importer_core::mapping::MappingConfig;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Debug)]
pub struct CliConfig {
    pub import: ImportConfig,
    pub inputs: ImportInputs,
    pub formats: ExportFormats,
    pub output_dir: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
pub struct InputsSection {
    #[serde(default)]
    pub assessments: Option<PathBuf>,
    #[serde(default)]
    pub withdrawn: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct TemplatesSection {
    pub proposals_map: PathBuf,
    #[serde(default)]
    pub extra_map: Option<PathBuf>,
    pub reviews_map: PathBuf,
    pub challenges_format: PathBuf,
    #[serde(default)]
    pub proposals_format: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(flatten)]
    import: ImportConfig,
    #[serde(default)]
    inputs: InputsSection,
    templates: TemplatesSection,
    output_dir: PathBuf,
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let content = fs::read_to_string(path).with_context(|| {
        error!(path = %path.display(), what, "Failed to read template");
        format!("Failed to read {what} template {}", path.display())
    })?;
    let parsed = serde_json::from_str(&content).with_context(|| {
        error!(path = %path.display(), what, "Failed to parse template");
        format!("Failed to parse {what} template {} as JSON", path.display())
    })?;
    info!(path = %path.display(), what, "Loaded template");
    Ok(parsed)
}

/// Loads the YAML run file at `path` and every template it references.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if let Err(e) = raw.import.validate() {
        error!(error = %e, config_path = ?path_ref, "Configuration rejected");
        return Err(anyhow::Error::new(e).context("Invalid configuration"));
    }
    raw.import.trace_loaded();

    let base = path_ref.parent().unwrap_or_else(|| Path::new("."));
    let templates = &raw.templates;

    let mappings: MappingConfig = read_json(&resolve(base, &templates.proposals_map), "proposals mapping")?;
    let extra_mappings: MappingConfig = match &templates.extra_map {
        Some(p) => read_json(&resolve(base, p), "extra fields mapping")?,
        None => MappingConfig::default(),
    };
    let reviews: ReviewsConfig = read_json(&resolve(base, &templates.reviews_map), "reviews mapping")?;
    let challenges: ExportFormat = read_json(&resolve(base, &templates.challenges_format), "challenges format")?;
    let proposals: Option<ExportFormat> = match &templates.proposals_format {
        Some(p) => Some(read_json(&resolve(base, p), "proposals format")?),
        None => None,
    };

    let inputs = ImportInputs {
        mappings,
        extra_mappings,
        reviews,
        assessments: raw.inputs.assessments.as_deref().map(|p| resolve(base, p)),
        withdrawn: raw.inputs.withdrawn.as_deref().map(|p| resolve(base, p)),
    };

    info!(
        output_dir = %raw.output_dir.display(),
        mapped_fields = inputs.mappings.len(),
        extra_fields = inputs.extra_mappings.len(),
        "Config loaded and merged successfully"
    );

    Ok(CliConfig {
        import: raw.import,
        inputs,
        formats: ExportFormats { challenges, proposals },
        output_dir: resolve(base, &raw.output_dir),
    })
}
