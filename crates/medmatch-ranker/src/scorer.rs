//! Eligibility scoring of a patient profile against catalog trials.
//!
//! The score of one (profile, trial) pair is `base_score` plus the signed
//! weight of every piece of evidence the enabled rules produce, clamped into
//! `[0, 100]`.

use medmatch_common::{MatchFactor, MatchResult, PatientProfile, TrialRecord};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::criteria::TrialCriteria;
use crate::patient::PatientFacts;
use crate::rules::RuleKind;
use crate::weights::ScoringWeights;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub const MIN_SCORE: i32 = 0;
pub const MAX_SCORE: i32 = 100;

/// Which scored trials are returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Every trial, whatever its score.
    #[default]
    Lenient,
    /// Only trials with a strictly positive score.
    Strict,
}

impl MatchPolicy {
    pub fn keeps(&self, result: &MatchResult) -> bool {
        match self {
            MatchPolicy::Lenient => true,
            MatchPolicy::Strict => result.score > 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_base_score")]
    pub base_score: i32,
    #[serde(default)]
    pub policy: MatchPolicy,
    /// Rules left out of evaluation, for auditing individual contributions.
    #[serde(default)]
    pub disabled_rules: Vec<RuleKind>,
    #[serde(default)]
    pub weights: ScoringWeights,
}

fn default_base_score() -> i32 {
    0
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_score: default_base_score(),
            policy: MatchPolicy::default(),
            disabled_rules: Vec::new(),
            weights: ScoringWeights::default(),
        }
    }
}

pub struct Scorer {
    config: ScoringConfig,
    rules: Vec<RuleKind>,
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

impl Scorer {
    pub fn new(config: ScoringConfig) -> Self {
        let rules = RuleKind::ALL
            .into_iter()
            .filter(|rule| !config.disabled_rules.contains(rule))
            .collect();
        Self { config, rules }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score one profile against one trial.
    pub fn score(&self, profile: &PatientProfile, trial: &TrialRecord) -> MatchResult {
        self.score_facts(&PatientFacts::from_profile(profile), trial)
    }

    fn score_facts(&self, patient: &PatientFacts, trial: &TrialRecord) -> MatchResult {
        let criteria = TrialCriteria::parse(trial);
        let mut total = self.config.base_score;
        let mut match_reasons = Vec::new();
        let mut limiting_factors = Vec::new();

        for rule in &self.rules {
            for evidence in rule.evaluate(patient, &criteria, &self.config.weights) {
                total = total.saturating_add(evidence.weight);
                let supporting = evidence.is_supporting();
                let factor = MatchFactor::new(evidence.factor, evidence.description, evidence.weight);
                if supporting {
                    match_reasons.push(factor);
                } else {
                    limiting_factors.push(factor);
                }
            }
        }

        let score = total.clamp(MIN_SCORE, MAX_SCORE) as u32;
        debug!(
            trial_id = %trial.nct_id,
            raw = total,
            score,
            reasons = match_reasons.len(),
            limits = limiting_factors.len(),
            "Scored trial"
        );

        MatchResult {
            trial_id: trial.nct_id.clone(),
            score,
            match_reasons,
            limiting_factors,
        }
    }

    /// Score one profile against every trial, in catalog order, keeping what
    /// `policy` admits.
    pub fn score_all(
        &self,
        profile: &PatientProfile,
        trials: &[TrialRecord],
        policy: MatchPolicy,
    ) -> Vec<MatchResult> {
        let patient = PatientFacts::from_profile(profile);

        #[cfg(feature = "parallel")]
        let scored: Vec<MatchResult> = trials
            .par_iter()
            .map(|trial| self.score_facts(&patient, trial))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let scored: Vec<MatchResult> = trials
            .iter()
            .map(|trial| self.score_facts(&patient, trial))
            .collect();

        let kept: Vec<MatchResult> = scored.into_iter().filter(|r| policy.keeps(r)).collect();
        info!(
            trials = trials.len(),
            kept = kept.len(),
            policy = ?policy,
            "Scored profile against catalog"
        );
        kept
    }
}
