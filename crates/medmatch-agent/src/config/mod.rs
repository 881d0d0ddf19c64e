//! Configuration loading for medmatch.
//! Reads medmatch.toml from the current directory or the path in MEDMATCH_CONFIG.
//! A missing file means defaults for every section.

use medmatch_common::{MedmatchError, Result};
use medmatch_ner::ExtractionConfig;
use medmatch_ranker::{CatalogConfig, RankingConfig, ScoringConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

fn default_config_path() -> String { "medmatch.toml".to_string() }

mod tests;

impl Config {
    /// Load configuration from medmatch.toml.
    /// Checks MEDMATCH_CONFIG env var first, then current directory.
    pub fn load() -> Result<Self> {
        let path = std::env::var("MEDMATCH_CONFIG").unwrap_or_else(|_| default_config_path());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let wrong = self.scoring.weights.invalid_signs();
        if !wrong.is_empty() {
            return Err(MedmatchError::Config(format!(
                "scoring weights with the wrong sign: {}",
                wrong.join(", ")
            )));
        }
        if self.extraction.languages.is_empty() {
            return Err(MedmatchError::Config("extraction.languages is empty".to_string()));
        }
        Ok(())
    }
}
