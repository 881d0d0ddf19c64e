//! medmatch-ranker: Eligibility scoring and ranking of trials for a patient profile.

pub mod catalog;
pub mod criteria;
pub mod markers;
pub mod patient;
pub mod ranker;
pub mod rules;
pub mod scorer;
pub mod weights;

pub use catalog::{CachedCatalog, CatalogConfig, FileCatalog, StaticCatalog, TrialSource};
pub use criteria::TrialCriteria;
pub use patient::PatientFacts;
pub use ranker::{Ranker, RankingConfig};
pub use rules::{Evidence, RuleKind};
pub use scorer::{MatchPolicy, Scorer, ScoringConfig};
pub use weights::ScoringWeights;

use medmatch_common::{PatientProfile, RankedMatch, TrialRecord};

/// Score and rank `trials` for `profile` with default weights and limits.
pub fn match_trials(
    profile: &PatientProfile,
    trials: &[TrialRecord],
    policy: MatchPolicy,
) -> Vec<RankedMatch> {
    Ranker::default().rank(Scorer::default().score_all(profile, trials, policy))
}
