//! medmatch — Clinical trial matching from free-text patient narratives.
//! Entry point for the command-line binary.

mod config;

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use medmatch_common::{MatchReport, TrialRecord};
use medmatch_ner::ClinicalPipeline;
use medmatch_ranker::{CatalogConfig, MatchPolicy, Ranker, Scorer};
use serde::Serialize;
use tracing::info;

#[derive(Parser)]
#[command(name = "medmatch")]
#[command(version)]
#[command(about = "Match English/Italian clinical narratives against oncology trials", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a structured patient profile from a narrative
    Extract {
        /// Narrative text file, or - for stdin
        #[arg(value_name = "INPUT", default_value = "-")]
        input: String,

        /// Print the raw entities instead of the aggregated profile
        #[arg(long)]
        entities: bool,
    },

    /// Extract a profile and rank catalog trials for it
    Match {
        /// Narrative text file, or - for stdin
        #[arg(value_name = "INPUT", default_value = "-")]
        input: String,

        /// Trial catalog (JSON or YAML); bundled seed trials when omitted
        #[arg(long, value_name = "CATALOG")]
        catalog: Option<PathBuf>,

        /// Only return trials with a positive score
        #[arg(long, conflicts_with = "lenient")]
        strict: bool,

        /// Return every trial, whatever its score
        #[arg(long)]
        lenient: bool,

        /// Maximum number of trials to return
        #[arg(long, value_name = "N")]
        top: Option<usize>,

        /// Factors shown per list on each trial
        #[arg(long, value_name = "N")]
        max_factors: Option<usize>,
    },

    /// Print the trial catalog in use
    Catalog {
        /// Trial catalog (JSON or YAML); bundled seed trials when omitted
        #[arg(long, value_name = "CATALOG")]
        catalog: Option<PathBuf>,
    },
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read narrative from stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read narrative {input}"))
    }
}

fn load_trials(catalog: &CatalogConfig, path: Option<PathBuf>) -> Vec<TrialRecord> {
    let catalog = CatalogConfig {
        path: path.or_else(|| catalog.path.clone()),
        ..catalog.clone()
    };
    catalog.cached().trials(chrono::Utc::now())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries JSON only.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medmatch=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = config::Config::load().context("Failed to load medmatch configuration")?;

    match cli.command {
        Commands::Extract { input, entities } => {
            let text = read_input(&input)?;
            let pipeline = ClinicalPipeline::new(config.extraction);
            if entities {
                print_json(&pipeline.extract_entities(&text))?;
            } else {
                print_json(&pipeline.extract_profile(&text))?;
            }
        }

        Commands::Match { input, catalog, strict, lenient, top, max_factors } => {
            let text = read_input(&input)?;
            let profile = ClinicalPipeline::new(config.extraction).extract_profile(&text);
            let trials = load_trials(&config.catalog, catalog);

            let policy = if strict {
                MatchPolicy::Strict
            } else if lenient {
                MatchPolicy::Lenient
            } else {
                config.scoring.policy
            };
            if top.is_some() {
                config.ranking.max_results = top;
            }
            if let Some(max) = max_factors {
                config.ranking.max_factors = max;
            }

            let scorer = Scorer::new(config.scoring);
            let results = scorer.score_all(&profile, &trials, policy);
            let matched_trials = Ranker::new(config.ranking).rank(results);
            info!(
                catalog = trials.len(),
                returned = matched_trials.len(),
                best = matched_trials.first().map(|m| m.result.score).unwrap_or(0),
                "Matching complete"
            );

            print_json(&MatchReport {
                extracted_info: profile,
                matched_trials,
            })?;
        }

        Commands::Catalog { catalog } => {
            let trials = load_trials(&config.catalog, catalog);
            print_json(&trials)?;
        }
    }

    Ok(())
}
