/// Command line front end of the importer.
///
/// `ideascale-importer import --config run.yaml` reads the run file, pulls the
/// fund's campaign groups and stage listings from IdeaScale, and writes
/// `funds.json`, `challenges.json`, `proposals.json`, `reviews.json`,
/// `scores.csv` and `excluded_proposals.json` into the output directory.
///
/// Invalid run files (unreadable templates, both author modes selected) are
/// rejected before the first request. Remote failures only shrink the output;
/// a value that does not fit its export type stops the run with a non-zero exit.
///
/// The API token comes from `--api-token` or `IDEASCALE_API_TOKEN` (a `.env`
/// file is loaded by `main`). Tests drive [`run`] directly with a built [`Cli`].
use crate::load_config::load_config;
use anyhow::Result;
use clap::{Parser, Subcommand};
use ideascale_importer_core::fetch::HttpFetcher;
use ideascale_importer_core::import::{import_fund, write_outputs};
use std::path::PathBuf;

/// Environment variable holding the IdeaScale API token.
pub const API_TOKEN_ENV: &str = "IDEASCALE_API_TOKEN";

/// CLI for ideascale-importer: turn an IdeaScale fund into importable artifacts.
#[derive(Parser)]
#[clap(
    name = "ideascale-importer",
    version,
    about = "Import IdeaScale campaigns and ideas as funds, challenges, proposals, reviews and scores"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch, compose and write all artifacts for the fund described in the config file
    Import {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Overrides the output directory from the config file
        #[clap(long)]
        output_dir: Option<PathBuf>,
        /// API token; defaults to the IDEASCALE_API_TOKEN environment variable
        #[clap(long)]
        api_token: Option<String>,
    },
}

fn resolve_token(flag: Option<String>) -> String {
    if let Some(token) = flag {
        return token;
    }
    match std::env::var(API_TOKEN_ENV) {
        Ok(token) => token,
        Err(_) => {
            tracing::warn!(env = API_TOKEN_ENV, "No API token configured, requests are sent unauthenticated");
            String::new()
        }
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Import {
            config,
            output_dir,
            api_token,
        } => {
            let config = load_config(config)?;
            tracing::info!(command = "import", fund_id = config.import.fund.id, "Starting import");

            let fetcher = HttpFetcher::new(&config.import.api, resolve_token(api_token))?;
            let artifacts = import_fund(&config.import, &config.inputs, &fetcher)
                .await
                .inspect_err(|e| tracing::error!(command = "import", error = %e, "Import failed"))?;

            let output_dir = output_dir.unwrap_or(config.output_dir);
            match write_outputs(&output_dir, &artifacts, &config.formats) {
                Ok(report) => {
                    tracing::info!(command = "import", ?report, "Import complete");
                    println!(
                        "Import complete: {} challenges, {} proposals, {} reviews, {} scores, {} excluded -> {}",
                        report.challenges,
                        report.proposals,
                        report.reviews,
                        report.scores,
                        report.excluded,
                        report.output_dir.display()
                    );
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "import", error = %e, "Writing artifacts failed");
                    Err(e.into())
                }
            }
        }
    }
}
