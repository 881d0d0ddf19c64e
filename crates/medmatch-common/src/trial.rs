//! Trial catalog records and match results.

use serde::{Deserialize, Serialize};

use crate::profile::PatientProfile;

/// Eligibility criteria of a registered trial.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eligibility {
    #[serde(default)]
    pub inclusions: Vec<String>,
    #[serde(default)]
    pub exclusions: Vec<String>,
    #[serde(default)]
    pub limitations: Vec<String>,
}

impl Eligibility {
    pub fn inclusion_text(&self) -> String {
        self.inclusions.join("\n")
    }

    pub fn exclusion_text(&self) -> String {
        self.exclusions.join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.inclusions.is_empty() && self.exclusions.is_empty() && self.limitations.is_empty()
    }
}

/// A trial as served by the catalog collaborator. Read-only inside the core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialRecord {
    #[serde(default)]
    pub nct_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub facility: Option<String>,
    #[serde(default)]
    pub eligibility: Eligibility,
}

/// One unit of scoring evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchFactor {
    pub factor: String,
    pub description: String,
    /// Signed contribution to the score (0 for pure caveats).
    #[serde(default)]
    pub weight: i32,
}

impl MatchFactor {
    pub fn new(factor: impl Into<String>, description: impl Into<String>, weight: i32) -> Self {
        Self {
            factor: factor.into(),
            description: description.into(),
            weight,
        }
    }
}

/// Score of one patient profile against one trial. `score` is always in `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub trial_id: String,
    pub score: u32,
    pub match_reasons: Vec<MatchFactor>,
    pub limiting_factors: Vec<MatchFactor>,
}

/// A match result as presented after ranking.
///
/// Factor lists may be capped; the totals keep the full counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedMatch {
    pub rank: usize,
    #[serde(flatten)]
    pub result: MatchResult,
    pub total_match_reasons: usize,
    pub total_limiting_factors: usize,
}

/// Response envelope: the extracted profile plus the ranked trials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchReport {
    pub extracted_info: PatientProfile,
    pub matched_trials: Vec<RankedMatch>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trial_tolerates_missing_fields() {
        let trial: TrialRecord = serde_json::from_str(r#"{"nctId": "NCT00000001"}"#).unwrap();
        assert_eq!(trial.nct_id, "NCT00000001");
        assert!(trial.eligibility.is_empty());
        assert!(trial.status.is_none());
    }

    #[test]
    fn test_ranked_match_flattens_result() {
        let ranked = RankedMatch {
            rank: 1,
            result: MatchResult {
                trial_id: "NCT1".to_string(),
                score: 42,
                match_reasons: vec![MatchFactor::new("Stage match", "Stage 2 is eligible.", 25)],
                limiting_factors: vec![],
            },
            total_match_reasons: 1,
            total_limiting_factors: 0,
        };
        let json = serde_json::to_value(&ranked).unwrap();
        assert_eq!(json["trialId"], "NCT1");
        assert_eq!(json["score"], 42);
        assert_eq!(json["matchReasons"][0]["factor"], "Stage match");
        assert_eq!(json["totalMatchReasons"], 1);
    }
}
