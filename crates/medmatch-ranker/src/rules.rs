//! The ordered eligibility rule list.
//!
//! Each rule inspects one aspect of (patient, trial) and yields zero or more
//! pieces of [`Evidence`]. Rules never fail: when the profile or the trial
//! lacks the data a rule needs, the rule yields nothing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::criteria::{names_condition, TrialCriteria, INTERACTION_WATCH_LIST};
use crate::markers::Marker;
use crate::patient::PatientFacts;
use crate::weights::ScoringWeights;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    CancerType,
    Stage,
    BiomarkerThreshold,
    BiomarkerKeyword,
    BiomarkerExclusion,
    PriorTreatment,
    Age,
    Gender,
    Comorbidity,
    PerformanceStatus,
    EnrollmentStatus,
    TrialLimitations,
}

impl RuleKind {
    /// Evaluation order.
    pub const ALL: [RuleKind; 12] = [
        RuleKind::CancerType,
        RuleKind::Stage,
        RuleKind::BiomarkerThreshold,
        RuleKind::BiomarkerKeyword,
        RuleKind::BiomarkerExclusion,
        RuleKind::PriorTreatment,
        RuleKind::Age,
        RuleKind::Gender,
        RuleKind::Comorbidity,
        RuleKind::PerformanceStatus,
        RuleKind::EnrollmentStatus,
        RuleKind::TrialLimitations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::CancerType => "cancer_type",
            RuleKind::Stage => "stage",
            RuleKind::BiomarkerThreshold => "biomarker_threshold",
            RuleKind::BiomarkerKeyword => "biomarker_keyword",
            RuleKind::BiomarkerExclusion => "biomarker_exclusion",
            RuleKind::PriorTreatment => "prior_treatment",
            RuleKind::Age => "age",
            RuleKind::Gender => "gender",
            RuleKind::Comorbidity => "comorbidity",
            RuleKind::PerformanceStatus => "performance_status",
            RuleKind::EnrollmentStatus => "enrollment_status",
            RuleKind::TrialLimitations => "trial_limitations",
        }
    }

    /// Apply this rule to one patient/trial pair.
    pub fn evaluate(
        &self,
        patient: &PatientFacts,
        trial: &TrialCriteria,
        weights: &ScoringWeights,
    ) -> Vec<Evidence> {
        match self {
            RuleKind::CancerType => cancer_type(patient, trial, weights),
            RuleKind::Stage => stage(patient, trial, weights),
            RuleKind::BiomarkerThreshold => biomarker_threshold(patient, trial, weights),
            RuleKind::BiomarkerKeyword => biomarker_keyword(patient, trial, weights),
            RuleKind::BiomarkerExclusion => biomarker_exclusion(patient, trial, weights),
            RuleKind::PriorTreatment => prior_treatment(patient, trial, weights),
            RuleKind::Age => age(patient, trial, weights),
            RuleKind::Gender => gender(patient, trial, weights),
            RuleKind::Comorbidity => comorbidity(patient, trial, weights),
            RuleKind::PerformanceStatus => performance_status(patient, trial, weights),
            RuleKind::EnrollmentStatus => enrollment_status(trial, weights),
            RuleKind::TrialLimitations => trial_limitations(trial),
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scored observation. Caveats carry no weight but are always reported
/// as limiting factors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evidence {
    pub factor: &'static str,
    pub description: String,
    pub weight: i32,
    pub caveat: bool,
}

impl Evidence {
    fn scored(factor: &'static str, description: impl Into<String>, weight: i32) -> Self {
        Self {
            factor,
            description: description.into(),
            weight,
            caveat: false,
        }
    }

    fn caveat(factor: &'static str, description: impl Into<String>) -> Self {
        Self {
            factor,
            description: description.into(),
            weight: 0,
            caveat: true,
        }
    }

    /// Supporting evidence goes to match reasons, the rest to limiting factors.
    pub fn is_supporting(&self) -> bool {
        !self.caveat && self.weight >= 0
    }
}

fn cancer_type(patient: &PatientFacts, trial: &TrialCriteria, w: &ScoringWeights) -> Vec<Evidence> {
    let Some(cancer) = patient.cancer.as_deref() else {
        return vec![];
    };
    if patient.sites.is_empty() {
        return vec![];
    }
    if let Some(site) = patient.sites.iter().find(|s| trial.sites.contains(s)) {
        return vec![Evidence::scored(
            "Cancer Type",
            format!("Trial targets {site} cancer, matching {cancer}"),
            w.cancer_type_match,
        )];
    }
    if trial.accepts_any_tumour {
        return vec![Evidence::scored(
            "Cancer Type",
            format!("Trial accepts solid tumours including {cancer}"),
            w.cancer_type_generic,
        )];
    }
    if !trial.sites.is_empty() {
        let named: Vec<&str> = trial.sites.iter().map(|s| s.as_str()).collect();
        return vec![Evidence::scored(
            "Cancer Type",
            format!("Trial targets {} cancer, not {cancer}", named.join("/")),
            w.cancer_type_mismatch,
        )];
    }
    vec![]
}

fn stage(patient: &PatientFacts, trial: &TrialCriteria, w: &ScoringWeights) -> Vec<Evidence> {
    let Some(label) = patient.stage.as_deref() else {
        return vec![];
    };
    let mut evidence = Vec::new();

    if let Some(level) = &patient.stage_level {
        if let Some(range) = trial.inclusion_stages.iter().find(|r| r.contains(level)) {
            evidence.push(Evidence::scored(
                "Stage",
                format!("{label} falls within required {range}"),
                w.stage_match,
            ));
        }
    }

    if let (Some(required), Some(actual)) = (trial.inclusion_framing, patient.framing) {
        if required == actual {
            evidence.push(Evidence::scored(
                "Stage",
                format!("Trial enrolls {} disease, consistent with {label}", required.as_str()),
                w.stage_framing_match,
            ));
        } else {
            evidence.push(Evidence::scored(
                "Stage",
                format!("Trial enrolls {} disease, but patient has {label}", required.as_str()),
                w.stage_framing_conflict,
            ));
        }
    }

    let excluded_range = patient
        .stage_level
        .as_ref()
        .and_then(|level| trial.exclusion_stages.iter().find(|r| r.contains(level)));
    let excluded_framing = trial
        .exclusion_framing
        .filter(|framing| patient.framing == Some(*framing));
    if let Some(range) = excluded_range {
        evidence.push(Evidence::scored(
            "Stage",
            format!("{label} is excluded ({range})"),
            w.stage_excluded,
        ));
    } else if let Some(framing) = excluded_framing {
        evidence.push(Evidence::scored(
            "Stage",
            format!("Trial excludes {} disease ({label})", framing.as_str()),
            w.stage_excluded,
        ));
    }
    evidence
}

fn measured<'p>(patient: &'p PatientFacts, name: &str) -> Option<&'p Marker> {
    patient
        .markers
        .iter()
        .find(|m| m.name == name && m.value.is_some())
}

fn biomarker_threshold(patient: &PatientFacts, trial: &TrialCriteria, w: &ScoringWeights) -> Vec<Evidence> {
    let mut evidence = Vec::new();
    for threshold in &trial.thresholds {
        let Some(value) = measured(patient, &threshold.marker).and_then(|m| m.value) else {
            continue;
        };
        if threshold.is_met_by(value) {
            evidence.push(Evidence::scored(
                "Biomarker Threshold",
                format!("{} {value} meets required {threshold}", threshold.marker),
                w.biomarker_threshold_met,
            ));
        } else {
            evidence.push(Evidence::scored(
                "Biomarker Threshold",
                format!("{} {value} does not meet required {threshold}", threshold.marker),
                w.biomarker_threshold_missed,
            ));
        }
    }
    evidence
}

fn biomarker_keyword(patient: &PatientFacts, trial: &TrialCriteria, w: &ScoringWeights) -> Vec<Evidence> {
    let mut matched: Vec<String> = Vec::new();
    for criterion in &trial.inclusion_markers {
        // Markers compared numerically are left to the threshold rule.
        let thresholded = trial.thresholds.iter().any(|t| t.marker == criterion.name)
            && measured(patient, &criterion.name).is_some();
        if thresholded {
            continue;
        }
        if let Some(hit) = patient.markers.iter().find(|m| criterion.compatible_with(m)) {
            let label = hit.to_string();
            if !matched.contains(&label) {
                matched.push(label);
            }
        }
    }
    if matched.is_empty() {
        return vec![];
    }
    vec![Evidence::scored(
        "Biomarker",
        format!("Inclusion criteria name {}", matched.join(", ")),
        w.biomarker_keyword,
    )]
}

fn biomarker_exclusion(patient: &PatientFacts, trial: &TrialCriteria, w: &ScoringWeights) -> Vec<Evidence> {
    let mut excluded: Vec<String> = Vec::new();
    for criterion in &trial.exclusion_markers {
        // Only an explicit status or variant excludes; a bare gene name does not.
        let Some(polarity) = criterion.polarity else {
            continue;
        };
        let hit = patient.markers.iter().find(|m| {
            m.polarity == Some(polarity)
                && criterion.same_marker(m)
                && match (&criterion.variant, &m.variant) {
                    (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                    _ => true,
                }
        });
        if let Some(hit) = hit {
            let label = hit.to_string();
            if !excluded.contains(&label) {
                excluded.push(label);
            }
        }
    }
    if excluded.is_empty() {
        return vec![];
    }
    vec![Evidence::scored(
        "Biomarker Exclusion",
        format!("Exclusion criteria name {}", excluded.join(", ")),
        w.biomarker_excluded,
    )]
}

fn prior_treatment(patient: &PatientFacts, trial: &TrialCriteria, w: &ScoringWeights) -> Vec<Evidence> {
    trial
        .required_treatments
        .iter()
        .filter_map(|required| {
            let (_, received) = patient.past_treatments.iter().find(|(c, _)| c == required)?;
            Some(Evidence::scored(
                "Prior Treatment",
                format!("Required prior {required} satisfied by {received}"),
                w.prior_treatment,
            ))
        })
        .collect()
}

fn age(patient: &PatientFacts, trial: &TrialCriteria, w: &ScoringWeights) -> Vec<Evidence> {
    let Some(age) = patient.age else {
        return vec![];
    };
    let evidence = match trial.age {
        Some(range) if !range.contains(age) => Evidence::scored(
            "Age",
            format!("Age {age} is outside the required {range}"),
            w.age_outside,
        ),
        Some(range) => Evidence::scored("Age", format!("Age {age} is within {range}"), w.age_compatible),
        None => Evidence::scored("Age", format!("No age restriction (age {age})"), w.age_compatible),
    };
    vec![evidence]
}

fn gender(patient: &PatientFacts, trial: &TrialCriteria, w: &ScoringWeights) -> Vec<Evidence> {
    let Some(gender) = patient.gender else {
        return vec![];
    };
    let evidence = match trial.gender {
        Some(required) if required != gender => Evidence::scored(
            "Gender",
            format!("Trial enrolls {} patients only", required.as_str().to_lowercase()),
            w.gender_conflict,
        ),
        Some(required) => Evidence::scored(
            "Gender",
            format!("Trial enrolls {} patients", required.as_str().to_lowercase()),
            w.gender_compatible,
        ),
        None => Evidence::scored("Gender", "No gender restriction", w.gender_compatible),
    };
    vec![evidence]
}

fn comorbidity(patient: &PatientFacts, trial: &TrialCriteria, w: &ScoringWeights) -> Vec<Evidence> {
    let mut evidence = Vec::new();
    for condition in &patient.comorbidities {
        if INTERACTION_WATCH_LIST.contains(&condition.as_str()) {
            evidence.push(Evidence::scored(
                "Comorbidity",
                format!("{condition} may interact with investigational treatment"),
                w.comorbidity_watch,
            ));
        }
        if !trial.exclusion_text.is_empty() && names_condition(&trial.exclusion_text, condition) {
            evidence.push(Evidence::scored(
                "Comorbidity",
                format!("{condition} is named in the exclusion criteria"),
                w.comorbidity_excluded,
            ));
        }
    }
    evidence
}

fn performance_status(patient: &PatientFacts, trial: &TrialCriteria, w: &ScoringWeights) -> Vec<Evidence> {
    let (Some(ecog), Some(max)) = (patient.ecog, trial.ecog_max) else {
        return vec![];
    };
    let evidence = if ecog > max {
        Evidence::scored(
            "Performance Status",
            format!("ECOG {ecog} exceeds the trial maximum of {max}"),
            w.performance_above_max,
        )
    } else {
        Evidence::scored(
            "Performance Status",
            format!("ECOG {ecog} is within the trial maximum of {max}"),
            w.performance_within_max,
        )
    };
    vec![evidence]
}

fn enrollment_status(trial: &TrialCriteria, w: &ScoringWeights) -> Vec<Evidence> {
    match trial.recruiting {
        Some(false) => vec![Evidence::scored(
            "Enrollment Status",
            "Trial is not currently recruiting",
            w.not_recruiting,
        )],
        _ => vec![],
    }
}

fn trial_limitations(trial: &TrialCriteria) -> Vec<Evidence> {
    trial
        .limitations
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| Evidence::caveat("Trial Limitation", l.trim()))
        .collect()
}
