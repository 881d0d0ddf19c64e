//! Profile fields parsed into the shapes the rules compare against.

use medmatch_common::{split_list, PatientProfile};
use medmatch_ner::stage::{framing_of, parse_stage, StageFraming, StageLevel};

use crate::criteria::{ecog_grade, tumour_sites, Gender, TreatmentCategory, TumourSite};
use crate::markers::{patient_markers, Marker};

/// A patient profile, parsed once and shared by every trial evaluation.
#[derive(Debug, Clone, Default)]
pub struct PatientFacts {
    /// Cancer type, or the primary diagnosis when no type was recognised.
    pub cancer: Option<String>,
    pub sites: Vec<TumourSite>,
    pub stage: Option<String>,
    pub stage_level: Option<StageLevel>,
    pub framing: Option<StageFraming>,
    pub markers: Vec<Marker>,
    /// Completed treatments with their category.
    pub past_treatments: Vec<(TreatmentCategory, String)>,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub ecog: Option<u8>,
    pub comorbidities: Vec<String>,
}

impl PatientFacts {
    pub fn from_profile(profile: &PatientProfile) -> Self {
        let diagnosis = &profile.diagnosis;
        let cancer = diagnosis
            .cancer_type
            .clone()
            .or_else(|| diagnosis.primary_diagnosis.clone());
        let stage = diagnosis.stage.clone();

        let past_treatments = profile
            .treatments
            .past_treatments
            .as_deref()
            .map(|field| {
                split_list(field)
                    .filter_map(|t| TreatmentCategory::of_treatment(t).map(|c| (c, t.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            sites: cancer.as_deref().map(tumour_sites).unwrap_or_default(),
            cancer,
            stage_level: stage.as_deref().and_then(parse_stage),
            framing: stage.as_deref().and_then(framing_of),
            stage,
            markers: diagnosis.subtype.as_deref().map(patient_markers).unwrap_or_default(),
            past_treatments,
            age: profile.age_years(),
            gender: profile.demographics.gender.as_deref().and_then(Gender::parse),
            ecog: diagnosis.performance_status.as_deref().and_then(ecog_grade),
            comorbidities: profile
                .medical_history
                .comorbidities
                .as_deref()
                .map(|field| split_list(field).map(str::to_string).collect())
                .unwrap_or_default(),
        }
    }
}
