//! End-to-end extraction over realistic narratives.

use medmatch_common::{split_list, EntityType};
use medmatch_ner::{extract_profile, ClinicalPipeline};
use medmatch_test_utils::narratives;
use medmatch_test_utils::pretty_assertions::assert_eq;

fn items(field: Option<&str>) -> Vec<&str> {
    split_list(field.unwrap_or_default()).collect()
}

#[test]
fn english_breast_profile() {
    let profile = extract_profile(narratives::ENGLISH_BREAST);

    assert_eq!(
        profile.diagnosis.cancer_type.as_deref(),
        Some("Invasive Ductal Breast Carcinoma")
    );
    assert_eq!(
        profile.diagnosis.primary_diagnosis.as_deref(),
        Some("Invasive Ductal Breast Carcinoma (pT2N0M0)")
    );
    assert_eq!(profile.diagnosis.stage.as_deref(), Some("Stage 2A"));
    assert_eq!(profile.diagnosis.subtype.as_deref(), Some("ER+/PR+/HER2-, Ki-67 20%"));
    assert_eq!(profile.diagnosis.diagnosis_date.as_deref(), Some("2021-03-12"));
    assert_eq!(profile.diagnosis.performance_status.as_deref(), Some("ECOG 0"));

    assert_eq!(
        profile.treatments.past_treatments.as_deref(),
        Some("Lumpectomy, Chemotherapy")
    );
    assert_eq!(profile.treatments.current_treatment.as_deref(), Some("Tamoxifen"));
    assert_eq!(profile.treatments.planned_treatment.as_deref(), Some("Radiotherapy"));

    assert_eq!(profile.medical_history.comorbidities.as_deref(), Some("Hypertension"));
    assert_eq!(profile.medical_history.medications.as_deref(), Some("Ramipril"));
    assert_eq!(profile.medical_history.allergies.as_deref(), Some("None known"));

    assert_eq!(profile.demographics.age.as_deref(), Some("58"));
    assert_eq!(profile.demographics.gender.as_deref(), Some("Female"));
}

#[test]
fn italian_breast_profile() {
    let profile = extract_profile(narratives::ITALIAN_BREAST);

    assert_eq!(
        profile.diagnosis.cancer_type.as_deref(),
        Some("Invasive Ductal Breast Carcinoma")
    );
    assert_eq!(profile.diagnosis.stage.as_deref(), Some("Stage 3A"));
    assert_eq!(profile.diagnosis.diagnosis_date.as_deref(), Some("2020-11-05"));

    let markers = items(profile.diagnosis.subtype.as_deref());
    assert!(markers.contains(&"HR+"), "{markers:?}");
    assert!(markers.contains(&"HER2-"), "{markers:?}");
    assert!(markers.contains(&"Ki-67 30%"), "{markers:?}");

    let past = items(profile.treatments.past_treatments.as_deref());
    assert!(past.contains(&"Quadrantectomy"), "{past:?}");
    let current = items(profile.treatments.current_treatment.as_deref());
    assert!(current.contains(&"Chemotherapy"), "{current:?}");

    assert_eq!(profile.medical_history.comorbidities.as_deref(), Some("Type 2 Diabetes"));
    assert_eq!(profile.medical_history.medications.as_deref(), Some("Metformin"));
    assert_eq!(profile.medical_history.allergies.as_deref(), Some("Penicillin"));
    assert_eq!(profile.demographics.age.as_deref(), Some("64"));
    assert_eq!(profile.demographics.gender.as_deref(), Some("Female"));
}

#[test]
fn italian_lung_age_ignores_smoking_duration() {
    let profile = extract_profile(narratives::ITALIAN_LUNG);
    assert_eq!(profile.demographics.age.as_deref(), Some("71"));
    assert_eq!(profile.demographics.gender.as_deref(), Some("Male"));
    assert_eq!(profile.diagnosis.stage.as_deref(), Some("Stage 4"));
}

#[test]
fn unrelated_text_gives_empty_profile() {
    let pipeline = ClinicalPipeline::default();
    assert!(pipeline.extract_entities(narratives::UNRELATED).is_empty());
    assert!(pipeline.extract_profile(narratives::UNRELATED).is_empty());
    assert!(pipeline.extract_profile("").is_empty());
}

#[test]
fn entities_are_in_document_order_per_sentence() {
    let pipeline = ClinicalPipeline::default();
    let entities = pipeline.extract_entities(narratives::ENGLISH_BREAST);
    assert!(!entities.is_empty());
    assert!(entities.windows(2).all(|w| w[0].position <= w[1].position));

    let chars = narratives::ENGLISH_BREAST.chars().count();
    assert!(entities.iter().all(|e| e.position < chars));
    assert!(entities
        .iter()
        .filter(|e| e.entity_type == EntityType::Age)
        .all(|e| e.value == "58"));
}

#[test]
fn positions_stay_inside_unusual_inputs() {
    let pipeline = ClinicalPipeline::default();
    let inputs = [
        "Pt",
        "pz.",
        "Pz. di 70 aa",
        "Paziente di 62 anni, carcinoma polmonare.",
        "Stage IIA breast cancer\n",
        "HER2+\0 ECOG 1\u{ffff}",
        "\u{feff}58 y/o female, dx 03/2021",
        "  \n\n  ",
    ];
    for text in inputs {
        let chars = text.chars().count();
        for entity in pipeline.extract_entities(text) {
            assert!(
                entity.position < chars,
                "{:?} at {} in {:?}",
                entity.value,
                entity.position,
                text
            );
        }
    }
}

#[test]
fn batch_profiles_match_single_extraction() {
    let pipeline = ClinicalPipeline::default();
    let texts = [narratives::ENGLISH_LUNG, narratives::ITALIAN_BREAST];
    let profiles = pipeline.extract_profiles(&texts);
    assert_eq!(profiles.len(), 2);
    assert_eq!(profiles[1], pipeline.extract_profile(texts[1]));
}
