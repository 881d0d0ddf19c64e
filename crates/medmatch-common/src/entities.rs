//! Typed clinical entities produced by the extractor.

use serde::{Deserialize, Serialize};

/// Entity categories recognised in clinical narratives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    Diagnosis,
    CancerType,
    Stage,
    /// Molecular subtype or biomarker (receptor status, mutation, expression level).
    Biomarker,
    Treatment,
    Medication,
    Comorbidity,
    Allergy,
    Age,
    Gender,
    Date,
    /// ECOG performance status.
    PerformanceStatus,
}

impl EntityType {
    pub const ALL: [EntityType; 12] = [
        EntityType::Diagnosis,
        EntityType::CancerType,
        EntityType::Stage,
        EntityType::Biomarker,
        EntityType::Treatment,
        EntityType::Medication,
        EntityType::Comorbidity,
        EntityType::Allergy,
        EntityType::Age,
        EntityType::Gender,
        EntityType::Date,
        EntityType::PerformanceStatus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Diagnosis => "DIAGNOSIS",
            EntityType::CancerType => "CANCER_TYPE",
            EntityType::Stage => "STAGE",
            EntityType::Biomarker => "BIOMARKER",
            EntityType::Treatment => "TREATMENT",
            EntityType::Medication => "MEDICATION",
            EntityType::Comorbidity => "COMORBIDITY",
            EntityType::Allergy => "ALLERGY",
            EntityType::Age => "AGE",
            EntityType::Gender => "GENDER",
            EntityType::Date => "DATE",
            EntityType::PerformanceStatus => "PERFORMANCE_STATUS",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source language a pattern rule is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    It,
    /// Language-agnostic notation (TNM codes, percentages, dates).
    Any,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::It => "it",
            Language::Any => "any",
        }
    }
}

/// A single entity recognised in a document.
///
/// `position` is a character offset into the original (un-normalized) text,
/// and `context` is the window of original text surrounding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalEntity {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub value: String,
    pub position: usize,
    pub context: String,
}

impl MedicalEntity {
    pub fn new(
        entity_type: EntityType,
        value: impl Into<String>,
        position: usize,
        context: impl Into<String>,
    ) -> Self {
        Self {
            entity_type,
            value: value.into(),
            position,
            context: context.into(),
        }
    }
}
