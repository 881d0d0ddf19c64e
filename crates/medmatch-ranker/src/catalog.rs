//! Trial catalog sources.
//!
//! The scorer only ever sees a `&[TrialRecord]`. Where those records come
//! from is abstracted behind [`TrialSource`]:
//! - [`StaticCatalog`]: a fixed list, by default the bundled seed set
//! - [`FileCatalog`]: a JSON or YAML file on disk
//! - [`CachedCatalog`]: any source behind a freshness window with fallback

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Duration, Utc};
use medmatch_common::{MedmatchError, Result, TrialRecord};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const SEED_JSON: &str = include_str!("../data/seed_trials.json");

/// The bundled seed catalog.
pub fn seed_trials() -> &'static [TrialRecord] {
    static SEED: OnceLock<Vec<TrialRecord>> = OnceLock::new();
    SEED.get_or_init(|| serde_json::from_str(SEED_JSON).expect("bundled seed catalog is valid JSON"))
}

/// Anything that can produce the current list of trials.
pub trait TrialSource: Send + Sync {
    fn name(&self) -> &str;

    fn fetch(&self) -> Result<Vec<TrialRecord>>;
}

// ── Static ──────────────────────────────────────────────────────────────────

pub struct StaticCatalog {
    name: String,
    trials: Vec<TrialRecord>,
}

impl StaticCatalog {
    pub fn new(name: impl Into<String>, trials: Vec<TrialRecord>) -> Self {
        Self {
            name: name.into(),
            trials,
        }
    }

    pub fn seed() -> Self {
        Self::new("seed", seed_trials().to_vec())
    }
}

impl TrialSource for StaticCatalog {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> Result<Vec<TrialRecord>> {
        Ok(self.trials.clone())
    }
}

// ── File ────────────────────────────────────────────────────────────────────

/// Accepted file layouts: a bare list or `{ "trials": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    List(Vec<TrialRecord>),
    Wrapped { trials: Vec<TrialRecord> },
}

impl CatalogFile {
    fn into_trials(self) -> Vec<TrialRecord> {
        match self {
            CatalogFile::List(trials) | CatalogFile::Wrapped { trials } => trials,
        }
    }
}

pub struct FileCatalog {
    path: PathBuf,
    name: String,
}

impl FileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TrialSource for FileCatalog {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> Result<Vec<TrialRecord>> {
        let content = std::fs::read_to_string(&self.path)?;
        let extension = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        let file: CatalogFile = match extension.as_deref() {
            Some("json") => serde_json::from_str(&content)?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            other => {
                return Err(MedmatchError::Catalog(format!(
                    "unsupported catalog format {:?} for {}",
                    other.unwrap_or(""),
                    self.path.display()
                )))
            }
        };
        Ok(file.into_trials())
    }
}

// ── Cached ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// JSON or YAML catalog; the bundled seed set when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_freshness_hours")]
    pub freshness_hours: u32,
}

fn default_freshness_hours() -> u32 {
    24
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: None,
            freshness_hours: default_freshness_hours(),
        }
    }
}

impl CatalogConfig {
    pub fn source(&self) -> Box<dyn TrialSource> {
        match &self.path {
            Some(path) => Box::new(FileCatalog::new(path.clone())),
            None => Box::new(StaticCatalog::seed()),
        }
    }

    pub fn cached(&self) -> CachedCatalog {
        CachedCatalog::new(self.source(), Duration::hours(i64::from(self.freshness_hours)))
    }
}

struct Snapshot {
    trials: Vec<TrialRecord>,
    fetched_at: DateTime<Utc>,
}

/// Serves a source's trials, refreshing them once older than `freshness`.
///
/// Refresh failures never surface: the last good snapshot is served, and
/// without one the bundled seed set.
pub struct CachedCatalog {
    source: Box<dyn TrialSource>,
    freshness: Duration,
    cache: Option<Snapshot>,
}

impl CachedCatalog {
    pub fn new(source: Box<dyn TrialSource>, freshness: Duration) -> Self {
        Self {
            source,
            freshness,
            cache: None,
        }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.cache
            .as_ref()
            .is_some_and(|snapshot| now - snapshot.fetched_at < self.freshness)
    }

    pub fn trials(&mut self, now: DateTime<Utc>) -> Vec<TrialRecord> {
        if self.is_fresh(now) {
            if let Some(snapshot) = &self.cache {
                return snapshot.trials.clone();
            }
        }

        match self.source.fetch() {
            Ok(trials) => {
                info!(source = self.source.name(), count = trials.len(), "Loaded trial catalog");
                self.cache = Some(Snapshot {
                    trials: trials.clone(),
                    fetched_at: now,
                });
                trials
            }
            Err(e) => match &self.cache {
                Some(snapshot) => {
                    warn!(source = self.source.name(), error = %e, "Catalog refresh failed, serving cached trials");
                    snapshot.trials.clone()
                }
                None => {
                    warn!(source = self.source.name(), error = %e, "Catalog refresh failed, serving seed trials");
                    seed_trials().to_vec()
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Succeeds on the first `successes` fetches, then fails.
    struct Flaky {
        calls: Arc<AtomicUsize>,
        successes: usize,
    }

    impl TrialSource for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        fn fetch(&self) -> Result<Vec<TrialRecord>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.successes {
                Ok(vec![TrialRecord {
                    nct_id: format!("NCT-FETCH-{call}"),
                    ..TrialRecord::default()
                }])
            } else {
                Err(MedmatchError::Catalog("registry unavailable".to_string()))
            }
        }
    }

    fn flaky(successes: usize) -> (CachedCatalog, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = Flaky {
            calls: Arc::clone(&calls),
            successes,
        };
        (CachedCatalog::new(Box::new(source), Duration::hours(24)), calls)
    }

    #[test]
    fn test_seed_catalog_parses() {
        let seed = seed_trials();
        assert!(seed.len() >= 8);
        assert!(seed.iter().all(|t| t.nct_id.starts_with("NCT")));
        assert!(seed.iter().all(|t| !t.eligibility.inclusions.is_empty()));
    }

    #[test]
    fn test_fresh_cache_is_served_without_fetching() {
        let (mut catalog, calls) = flaky(usize::MAX);
        let now = Utc::now();
        catalog.trials(now);
        let trials = catalog.trials(now + Duration::hours(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(trials[0].nct_id, "NCT-FETCH-0");

        let trials = catalog.trials(now + Duration::hours(25));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(trials[0].nct_id, "NCT-FETCH-1");
    }

    #[test]
    fn test_failed_refresh_serves_stale_cache() {
        let (mut catalog, _) = flaky(1);
        let now = Utc::now();
        catalog.trials(now);
        let trials = catalog.trials(now + Duration::hours(48));
        assert_eq!(trials[0].nct_id, "NCT-FETCH-0");
    }

    #[test]
    fn test_failed_first_fetch_serves_seed() {
        let (mut catalog, _) = flaky(0);
        let trials = catalog.trials(Utc::now());
        assert_eq!(trials, seed_trials().to_vec());
    }

    #[test]
    fn test_file_catalog_json_and_yaml() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("trials.json");
        std::fs::write(&json_path, r#"[{"nctId": "NCT-J", "title": "JSON trial"}]"#).unwrap();
        let trials = FileCatalog::new(&json_path).fetch().unwrap();
        assert_eq!(trials[0].nct_id, "NCT-J");

        let yaml_path = dir.path().join("trials.yaml");
        std::fs::write(
            &yaml_path,
            "trials:\n  - nctId: NCT-Y\n    title: YAML trial\n    eligibility:\n      inclusions:\n        - Stage IV\n",
        )
        .unwrap();
        let trials = FileCatalog::new(&yaml_path).fetch().unwrap();
        assert_eq!(trials[0].nct_id, "NCT-Y");
        assert_eq!(trials[0].eligibility.inclusions, vec!["Stage IV".to_string()]);
    }

    #[test]
    fn test_file_catalog_errors() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("trials.csv");
        std::fs::write(&csv, "nct_id\n").unwrap();
        assert!(matches!(FileCatalog::new(&csv).fetch(), Err(MedmatchError::Catalog(_))));

        let missing = dir.path().join("missing.json");
        assert!(matches!(FileCatalog::new(&missing).fetch(), Err(MedmatchError::Io(_))));
    }
}
