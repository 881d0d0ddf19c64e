//! Folding extracted entities into a [`PatientProfile`].
//!
//! Conflicts between candidates are resolved deterministically:
//! - cancer type: the longest value wins, ties go to the first one
//! - stage: an explicit numeric stage beats a TNM code, which beats a
//!   descriptive stage; a TNM code that loses to an explicit stage is kept as
//!   a parenthetical on the primary diagnosis
//! - diagnosis date: the date nearest to a diagnosis or cancer type mention
//! - treatments: bucketed past/current/planned by the nearest timing cue
//! - demographics and performance status: first occurrence

use std::sync::OnceLock;

use medmatch_common::{EntityType, MedicalEntity, PatientProfile, LIST_DELIMITER};
use regex::Regex;
use tracing::debug;

use crate::stage;

/// When a treatment happened relative to the narrative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreatmentTiming {
    Past,
    Current,
    Planned,
}

pub struct ProfileAggregator {
    context_window: usize,
}

impl Default for ProfileAggregator {
    fn default() -> Self {
        Self::new(25)
    }
}

impl ProfileAggregator {
    /// `context_window` must match the window used during extraction; it
    /// locates each entity inside its context string.
    pub fn new(context_window: usize) -> Self {
        Self { context_window }
    }

    pub fn aggregate(&self, entities: &[MedicalEntity]) -> PatientProfile {
        let mut profile = PatientProfile::default();
        let of = |entity_type: EntityType| entities.iter().filter(move |e| e.entity_type == entity_type);

        // Cancer type and primary diagnosis.
        let cancer = longest(of(EntityType::CancerType));
        profile.diagnosis.cancer_type = cancer.map(|e| e.value.clone());
        let mut primary = profile
            .diagnosis
            .cancer_type
            .clone()
            .or_else(|| of(EntityType::Diagnosis).next().map(|e| e.value.clone()));

        // Stage.
        let explicit = of(EntityType::Stage).find(|e| stage::parse_stage(&e.value).is_some());
        let tnm = of(EntityType::Stage).find(|e| stage::is_tnm(&e.value));
        let descriptive = of(EntityType::Stage)
            .find(|e| stage::parse_stage(&e.value).is_none() && !stage::is_tnm(&e.value));
        profile.diagnosis.stage = match (explicit, tnm) {
            (Some(explicit), Some(tnm)) => {
                primary = primary.map(|p| format!("{p} ({})", tnm.value));
                Some(explicit.value.clone())
            }
            (Some(explicit), None) => Some(explicit.value.clone()),
            (None, Some(tnm)) => Some(tnm.value.clone()),
            (None, None) => descriptive.map(|e| e.value.clone()),
        };
        profile.diagnosis.primary_diagnosis = primary;

        profile.diagnosis.subtype = join(drop_subsumed_markers(unique_values(of(EntityType::Biomarker))));
        profile.diagnosis.diagnosis_date = diagnosis_date(entities).map(|e| e.value.clone());
        profile.diagnosis.performance_status =
            of(EntityType::PerformanceStatus).next().map(|e| e.value.clone());

        // Treatments by timing.
        let mut past = Vec::new();
        let mut current = Vec::new();
        let mut planned = Vec::new();
        for treatment in of(EntityType::Treatment) {
            let bucket = match self.timing_of(treatment) {
                TreatmentTiming::Past => &mut past,
                TreatmentTiming::Current => &mut current,
                TreatmentTiming::Planned => &mut planned,
            };
            if !bucket.contains(&treatment.value.as_str()) {
                bucket.push(treatment.value.as_str());
            }
        }
        profile.treatments.past_treatments = join(past);
        profile.treatments.current_treatment = join(current);
        profile.treatments.planned_treatment = join(planned);

        // Medical history.
        profile.medical_history.comorbidities =
            join(drop_less_specific(unique_values(of(EntityType::Comorbidity))));
        profile.medical_history.medications = join(unique_values(of(EntityType::Medication)));
        let mut allergies = unique_values(of(EntityType::Allergy));
        if allergies.len() > 1 {
            allergies.retain(|a| *a != "None known");
        }
        profile.medical_history.allergies = join(allergies);

        profile.demographics.age = of(EntityType::Age).next().map(|e| e.value.clone());
        profile.demographics.gender = of(EntityType::Gender).next().map(|e| e.value.clone());

        debug!("Aggregated {} entities into profile", entities.len());
        profile
    }

    /// Offset of the entity inside its own context string, in characters.
    fn anchor(&self, entity: &MedicalEntity) -> usize {
        entity.position.min(self.context_window)
    }

    /// Classify a treatment by the timing cue nearest to it in its context.
    pub fn timing_of(&self, entity: &MedicalEntity) -> TreatmentTiming {
        let context = entity.context.as_str();
        let anchor_char = self.anchor(entity);
        let anchor = context
            .char_indices()
            .nth(anchor_char)
            .map_or(context.len(), |(i, _)| i);
        // Trailing cues are measured from the end of the first word of the term.
        let term_end = context[anchor..]
            .find(|c: char| !(c.is_alphanumeric() || c == '-'))
            .map_or(context.len(), |i| anchor + i);

        let mut best: Option<(usize, TreatmentTiming)> = None;
        for (timing, cues) in timing_cues() {
            for cue in cues.find_iter(context) {
                let distance = if cue.end() <= anchor {
                    anchor - cue.end()
                } else if cue.start() >= term_end {
                    cue.start() - term_end
                } else {
                    0
                };
                if best.map_or(true, |(d, _)| distance < d) {
                    best = Some((distance, *timing));
                }
            }
        }
        best.map_or(TreatmentTiming::Past, |(_, timing)| timing)
    }
}

fn timing_cues() -> &'static [(TreatmentTiming, Regex)] {
    static CUES: OnceLock<Vec<(TreatmentTiming, Regex)>> = OnceLock::new();
    CUES.get_or_init(|| {
        let cue = |pattern: &str| {
            Regex::new(&format!(r"(?i)\b(?:{pattern})\b")).expect("timing cue pattern is valid")
        };
        vec![
            (
                TreatmentTiming::Planned,
                cue(r"scheduled|planned|will\s+(?:undergo|start|begin|receive)|to\s+(?:start|begin|undergo)|candidate\s+for|upcoming|referred\s+for|programmat[oa]|pianificat[oa]|previst[oa]|in\s+programma|da\s+(?:iniziare|eseguire|effettuare)|inizier[aà]|candidat[oa]\s+a|in\s+attesa\s+di"),
            ),
            (
                TreatmentTiming::Current,
                cue(r"currently|ongoing|on\s+(?:treatment|therapy)|receiving|undergoing|continues|attualmente|in\s+corso|in\s+trattamento|sta\s+(?:eseguendo|effettuando|ricevendo)|tuttora|prosegue"),
            ),
            (
                TreatmentTiming::Past,
                cue(r"completed|underwent|received|finished|previous(?:ly)?|prior|history\s+of|status\s+post|treated\s+with|after|following|eseguit[oa]|effettuat[oa]|sottopost[oa]|completat[oa]|terminat[oa]|pregress[oa]|precedente|gi[aà]|dopo"),
            ),
        ]
    })
}

/// First entity with the longest value.
fn longest<'e>(entities: impl Iterator<Item = &'e MedicalEntity>) -> Option<&'e MedicalEntity> {
    entities.fold(None, |best: Option<&MedicalEntity>, e| match best {
        Some(b) if b.value.chars().count() >= e.value.chars().count() => Some(b),
        _ => Some(e),
    })
}

/// The date closest to any diagnosis or cancer type mention; the first date
/// when there is nothing to anchor on.
fn diagnosis_date(entities: &[MedicalEntity]) -> Option<&MedicalEntity> {
    let anchors: Vec<usize> = entities
        .iter()
        .filter(|e| matches!(e.entity_type, EntityType::Diagnosis | EntityType::CancerType))
        .map(|e| e.position)
        .collect();
    let mut dates = entities.iter().filter(|e| e.entity_type == EntityType::Date);
    if anchors.is_empty() {
        return dates.next();
    }
    dates.fold(None, |best: Option<(usize, &MedicalEntity)>, date| {
        let distance = anchors
            .iter()
            .map(|a| a.abs_diff(date.position))
            .min()
            .unwrap_or(usize::MAX);
        match best {
            Some((d, _)) if d <= distance => best,
            _ => Some((distance, date)),
        }
    })
    .map(|(_, date)| date)
}

fn unique_values<'e>(entities: impl Iterator<Item = &'e MedicalEntity>) -> Vec<&'e str> {
    let mut values: Vec<&str> = Vec::new();
    for e in entities {
        if !values.contains(&e.value.as_str()) {
            values.push(&e.value);
        }
    }
    values
}

/// Drop markers that a more detailed value already covers: word prefixes
/// ("PD-L1" vs "PD-L1 60%") and members of a receptor panel ("HER2-" vs
/// "HR+/HER2-").
fn drop_subsumed_markers(values: Vec<&str>) -> Vec<&str> {
    values
        .iter()
        .copied()
        .filter(|&v| {
            !values.iter().any(|&w| {
                w != v
                    && (w.strip_prefix(v).is_some_and(|rest| rest.starts_with(' '))
                        || (w.contains('/') && w.split('/').any(|part| part == v)))
            })
        })
        .collect()
}

/// Drop conditions that a more specific one ends with ("Diabetes" vs
/// "Type 2 Diabetes").
fn drop_less_specific(values: Vec<&str>) -> Vec<&str> {
    values
        .iter()
        .copied()
        .filter(|&v| {
            !values
                .iter()
                .any(|&w| w != v && w.strip_suffix(v).is_some_and(|rest| rest.ends_with(' ')))
        })
        .collect()
}

fn join(values: Vec<&str>) -> Option<String> {
    (!values.is_empty()).then(|| values.join(LIST_DELIMITER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entity(entity_type: EntityType, value: &str, position: usize) -> MedicalEntity {
        MedicalEntity::new(entity_type, value, position, "")
    }

    fn with_context(entity_type: EntityType, value: &str, position: usize, context: &str) -> MedicalEntity {
        MedicalEntity::new(entity_type, value, position, context)
    }

    #[test]
    fn test_empty_entities_give_empty_profile() {
        assert!(ProfileAggregator::default().aggregate(&[]).is_empty());
    }

    #[test]
    fn test_longest_cancer_type_wins() {
        let profile = ProfileAggregator::default().aggregate(&[
            entity(EntityType::CancerType, "Breast Cancer", 10),
            entity(EntityType::CancerType, "Invasive Ductal Breast Carcinoma", 40),
            entity(EntityType::CancerType, "Lung Cancer", 80),
        ]);
        assert_eq!(
            profile.diagnosis.cancer_type.as_deref(),
            Some("Invasive Ductal Breast Carcinoma")
        );
        assert_eq!(profile.diagnosis.primary_diagnosis, profile.diagnosis.cancer_type);
    }

    #[test]
    fn test_diagnosis_fallback_leaves_cancer_type_empty() {
        let profile = ProfileAggregator::default().aggregate(&[
            entity(EntityType::Diagnosis, "Carcinoma Mammario", 5),
            entity(EntityType::Diagnosis, "Carcinoma", 5),
        ]);
        assert_eq!(profile.diagnosis.primary_diagnosis.as_deref(), Some("Carcinoma Mammario"));
        assert_eq!(profile.diagnosis.cancer_type, None);
    }

    #[test]
    fn test_explicit_stage_with_tnm_parenthetical() {
        let profile = ProfileAggregator::default().aggregate(&[
            entity(EntityType::CancerType, "Breast Cancer", 0),
            entity(EntityType::Stage, "pT2N0M0", 20),
            entity(EntityType::Stage, "Stage 2", 40),
        ]);
        assert_eq!(profile.diagnosis.stage.as_deref(), Some("Stage 2"));
        assert_eq!(
            profile.diagnosis.primary_diagnosis.as_deref(),
            Some("Breast Cancer (pT2N0M0)")
        );
        assert_eq!(profile.diagnosis.cancer_type.as_deref(), Some("Breast Cancer"));
    }

    #[test]
    fn test_descriptive_stage_is_last_resort() {
        let only_descriptive =
            ProfileAggregator::default().aggregate(&[entity(EntityType::Stage, "Metastatic", 3)]);
        assert_eq!(only_descriptive.diagnosis.stage.as_deref(), Some("Metastatic"));

        let with_tnm = ProfileAggregator::default().aggregate(&[
            entity(EntityType::Stage, "Metastatic", 3),
            entity(EntityType::Stage, "T2N1M1", 30),
        ]);
        assert_eq!(with_tnm.diagnosis.stage.as_deref(), Some("T2N1M1"));
    }

    #[test]
    fn test_biomarker_subsumption() {
        let profile = ProfileAggregator::default().aggregate(&[
            entity(EntityType::Biomarker, "HR+/HER2-", 0),
            entity(EntityType::Biomarker, "HR+", 0),
            entity(EntityType::Biomarker, "HER2-", 4),
            entity(EntityType::Biomarker, "PD-L1", 20),
            entity(EntityType::Biomarker, "PD-L1 60%", 20),
            entity(EntityType::Biomarker, "Ki-67 20%", 40),
            entity(EntityType::Biomarker, "Ki-67 20%", 90),
        ]);
        assert_eq!(
            profile.diagnosis.subtype.as_deref(),
            Some("HR+/HER2-, PD-L1 60%, Ki-67 20%")
        );
    }

    #[test]
    fn test_nearest_date_to_diagnosis() {
        let profile = ProfileAggregator::default().aggregate(&[
            entity(EntityType::Date, "2019-01-10", 0),
            entity(EntityType::CancerType, "Lung Cancer", 100),
            entity(EntityType::Date, "2021-03-12", 120),
            entity(EntityType::Date, "2022-06-01", 300),
        ]);
        assert_eq!(profile.diagnosis.diagnosis_date.as_deref(), Some("2021-03-12"));
    }

    #[test]
    fn test_first_date_without_anchor() {
        let profile = ProfileAggregator::default().aggregate(&[
            entity(EntityType::Date, "2019-01", 0),
            entity(EntityType::Date, "2021", 50),
        ]);
        assert_eq!(profile.diagnosis.diagnosis_date.as_deref(), Some("2019-01"));
    }

    #[test]
    fn test_treatment_timing_buckets() {
        let aggregator = ProfileAggregator::new(25);
        let profile = aggregator.aggregate(&[
            with_context(EntityType::Treatment, "Lumpectomy", 40, "st cancer. She underwent lumpectomy in March"),
            with_context(EntityType::Treatment, "Chemotherapy", 100, "d is currently receiving chemotherapy with good tol"),
            with_context(EntityType::Treatment, "Radiotherapy", 160, "ient is planned to start radiotherapy next month"),
            with_context(EntityType::Treatment, "Surgery", 6, "Prior surgery was uneventf"),
        ]);
        assert_eq!(profile.treatments.past_treatments.as_deref(), Some("Lumpectomy, Surgery"));
        assert_eq!(profile.treatments.current_treatment.as_deref(), Some("Chemotherapy"));
        assert_eq!(profile.treatments.planned_treatment.as_deref(), Some("Radiotherapy"));
    }

    #[test]
    fn test_treatment_without_cue_is_past() {
        let aggregator = ProfileAggregator::new(25);
        let entity = with_context(EntityType::Treatment, "Mastectomy", 0, "Mastectomy.");
        assert_eq!(aggregator.timing_of(&entity), TreatmentTiming::Past);
    }

    #[test]
    fn test_history_and_demographics() {
        let profile = ProfileAggregator::default().aggregate(&[
            entity(EntityType::Comorbidity, "Type 2 Diabetes", 0),
            entity(EntityType::Comorbidity, "Diabetes", 7),
            entity(EntityType::Comorbidity, "Hypertension", 30),
            entity(EntityType::Allergy, "None known", 50),
            entity(EntityType::Allergy, "Penicillin", 70),
            entity(EntityType::Age, "64", 2),
            entity(EntityType::Age, "70", 90),
            entity(EntityType::Gender, "Female", 4),
            entity(EntityType::PerformanceStatus, "ECOG 1", 99),
        ]);
        assert_eq!(
            profile.medical_history.comorbidities.as_deref(),
            Some("Type 2 Diabetes, Hypertension")
        );
        assert_eq!(profile.medical_history.allergies.as_deref(), Some("Penicillin"));
        assert_eq!(profile.demographics.age.as_deref(), Some("64"));
        assert_eq!(profile.demographics.gender.as_deref(), Some("Female"));
        assert_eq!(profile.diagnosis.performance_status.as_deref(), Some("ECOG 1"));
    }
}
