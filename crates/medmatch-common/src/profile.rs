//! Structured patient profile assembled from extracted entities.
//!
//! Every field is optional: `None` means "not observed in the narrative",
//! never an error. List-valued fields are joined with [`LIST_DELIMITER`].

use serde::{Deserialize, Serialize};

/// Separator used for every list-valued profile field.
pub const LIST_DELIMITER: &str = ", ";

/// Split a delimited profile field back into its items.
pub fn split_list(field: &str) -> impl Iterator<Item = &str> {
    field
        .split(LIST_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    #[serde(default)]
    pub diagnosis: DiagnosisInfo,
    #[serde(default)]
    pub treatments: TreatmentHistory,
    #[serde(default)]
    pub medical_history: MedicalHistory,
    #[serde(default)]
    pub demographics: Demographics,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisInfo {
    #[serde(default)]
    pub primary_diagnosis: Option<String>,
    #[serde(default)]
    pub cancer_type: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    /// Biomarkers and molecular subtype, joined.
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub diagnosis_date: Option<String>,
    /// ECOG performance status, e.g. "ECOG 1".
    #[serde(default)]
    pub performance_status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentHistory {
    #[serde(default)]
    pub past_treatments: Option<String>,
    #[serde(default)]
    pub current_treatment: Option<String>,
    #[serde(default)]
    pub planned_treatment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalHistory {
    #[serde(default)]
    pub comorbidities: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default)]
    pub medications: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Demographics {
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
}

impl PatientProfile {
    /// True when no field carries a value.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Numeric age, when the recorded age parses as an integer.
    pub fn age_years(&self) -> Option<u32> {
        self.demographics.age.as_deref()?.trim().parse().ok()
    }

    /// Every treatment the patient has received, is receiving or will receive.
    pub fn all_treatments(&self) -> Vec<&str> {
        [
            &self.treatments.past_treatments,
            &self.treatments.current_treatment,
            &self.treatments.planned_treatment,
        ]
        .into_iter()
        .flatten()
        .flat_map(|field| split_list(field))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_profile_is_empty() {
        assert!(PatientProfile::default().is_empty());
    }

    #[test]
    fn test_split_list_skips_blanks() {
        let items: Vec<_> = split_list("Chemotherapy, , Radiotherapy").collect();
        assert_eq!(items, vec!["Chemotherapy", "Radiotherapy"]);
    }

    #[test]
    fn test_serializes_camel_case_with_nulls() {
        let mut p = PatientProfile::default();
        p.diagnosis.stage = Some("Stage 2".to_string());
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["diagnosis"]["stage"], "Stage 2");
        assert!(json["diagnosis"]["primaryDiagnosis"].is_null());
        assert!(json["medicalHistory"].is_object());
    }

    #[test]
    fn test_age_years() {
        let mut p = PatientProfile::default();
        assert_eq!(p.age_years(), None);
        p.demographics.age = Some("64".to_string());
        assert_eq!(p.age_years(), Some(64));
    }
}
