//! Signed weights of the eligibility rules.
//!
//! Rewards are non-negative and penalties non-positive. The defaults are the
//! canonical table; every entry can be overridden from `[scoring.weights]`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Trial names the patient's tumour site
    pub cancer_type_match: i32,
    /// Trial accepts any solid tumour
    pub cancer_type_generic: i32,
    /// Trial names only other tumour sites
    pub cancer_type_mismatch: i32,

    pub stage_match: i32,
    pub stage_framing_match: i32,
    pub stage_framing_conflict: i32,
    /// Exclusion names the patient's stage or disease extent
    pub stage_excluded: i32,

    pub biomarker_threshold_met: i32,
    pub biomarker_threshold_missed: i32,
    pub biomarker_keyword: i32,
    pub biomarker_excluded: i32,

    pub prior_treatment: i32,

    pub age_outside: i32,
    pub age_compatible: i32,
    pub gender_conflict: i32,
    pub gender_compatible: i32,

    /// Per comorbidity on the interaction watch-list
    pub comorbidity_watch: i32,
    pub comorbidity_excluded: i32,

    pub performance_above_max: i32,
    pub performance_within_max: i32,

    pub not_recruiting: i32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            cancer_type_match:          30,
            cancer_type_generic:        10,
            cancer_type_mismatch:      -40,
            stage_match:                25,
            stage_framing_match:        20,
            stage_framing_conflict:    -20,
            stage_excluded:            -40,
            biomarker_threshold_met:    25,
            biomarker_threshold_missed:-20,
            biomarker_keyword:          20,
            biomarker_excluded:        -50,
            prior_treatment:            15,
            age_outside:               -50,
            age_compatible:              5,
            gender_conflict:           -50,
            gender_compatible:           5,
            comorbidity_watch:          -5,
            comorbidity_excluded:      -30,
            performance_above_max:     -40,
            performance_within_max:     10,
            not_recruiting:            -10,
        }
    }
}

impl ScoringWeights {
    fn rewards(&self) -> [(&'static str, i32); 10] {
        [
            ("cancer_type_match", self.cancer_type_match),
            ("cancer_type_generic", self.cancer_type_generic),
            ("stage_match", self.stage_match),
            ("stage_framing_match", self.stage_framing_match),
            ("biomarker_threshold_met", self.biomarker_threshold_met),
            ("biomarker_keyword", self.biomarker_keyword),
            ("prior_treatment", self.prior_treatment),
            ("age_compatible", self.age_compatible),
            ("gender_compatible", self.gender_compatible),
            ("performance_within_max", self.performance_within_max),
        ]
    }

    fn penalties(&self) -> [(&'static str, i32); 11] {
        [
            ("cancer_type_mismatch", self.cancer_type_mismatch),
            ("stage_framing_conflict", self.stage_framing_conflict),
            ("stage_excluded", self.stage_excluded),
            ("biomarker_threshold_missed", self.biomarker_threshold_missed),
            ("biomarker_excluded", self.biomarker_excluded),
            ("age_outside", self.age_outside),
            ("gender_conflict", self.gender_conflict),
            ("comorbidity_watch", self.comorbidity_watch),
            ("comorbidity_excluded", self.comorbidity_excluded),
            ("performance_above_max", self.performance_above_max),
            ("not_recruiting", self.not_recruiting),
        ]
    }

    /// Names of weights whose sign contradicts their role.
    pub fn invalid_signs(&self) -> Vec<&'static str> {
        let wrong_rewards = self.rewards().into_iter().filter(|(_, w)| *w < 0);
        let wrong_penalties = self.penalties().into_iter().filter(|(_, w)| *w > 0);
        wrong_rewards.chain(wrong_penalties).map(|(name, _)| name).collect()
    }

    /// Validate that every reward is non-negative and every penalty non-positive.
    pub fn validate(&self) -> bool {
        self.invalid_signs().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_have_consistent_signs() {
        let w = ScoringWeights::default();
        assert!(w.validate(), "wrong signs: {:?}", w.invalid_signs());
    }

    #[test]
    fn test_sign_violations_are_named() {
        let w = ScoringWeights {
            stage_match: -1,
            not_recruiting: 3,
            ..ScoringWeights::default()
        };
        assert!(!w.validate());
        assert_eq!(w.invalid_signs(), vec!["stage_match", "not_recruiting"]);
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let w: ScoringWeights = from_json(r#"{"stage_match": 40}"#);
        assert_eq!(w.stage_match, 40);
        assert_eq!(w.biomarker_keyword, 20);
    }

    fn from_json(json: &str) -> ScoringWeights {
        serde_json::from_str(json).unwrap()
    }
}
