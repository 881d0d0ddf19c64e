//! Shared fixtures: sample narratives, trial builders and profile builders.

pub use pretty_assertions;

pub mod narratives {
    //! Realistic narratives in both supported languages.

    pub const ENGLISH_BREAST: &str = "Mrs. Jones is a 58-year-old woman diagnosed with invasive ductal carcinoma of the breast on 12/03/2021. \
Pathology: pT2N0M0, stage IIA, ER+/PR+/HER2-, Ki-67 20%. She underwent lumpectomy in April 2021 and completed adjuvant chemotherapy. \
She is currently receiving tamoxifen. Radiotherapy is planned for next month. \
History of hypertension treated with ramipril. No known drug allergies. ECOG PS 0.";

    pub const ITALIAN_BREAST: &str = "La paziente, di 64 anni, è affetta da carcinoma duttale infiltrante della mammella, stadio IIIA, \
diagnosticato il 05/11/2020. Recettori ormonali positivi, HER2 negativo, Ki67 pari al 30%. \
Già sottoposta a quadrantectomia. Attualmente in corso chemioterapia con paclitaxel. \
In anamnesi diabete mellito di tipo 2 in terapia con metformina. Allergia alla penicillina.";

    pub const ENGLISH_LUNG: &str = "65 y/o male with metastatic non-small cell lung cancer diagnosed in 2022. \
KRAS G12C detected, EGFR wild-type, PD-L1 TPS 60%. Brain metastases treated with SBRT. \
Prior carboplatin and pemetrexed. Comorbidities: COPD. ECOG performance status 1.";

    pub const ITALIAN_LUNG: &str = "Paziente maschio di 71 anni con adenocarcinoma polmonare stadio IV, EGFR mutato (esone 19 del). \
Fumatore da 40 anni. Attualmente in trattamento con osimertinib. Ipertensione arteriosa in terapia con amlodipina.";

    /// Narrative with nothing clinically recognisable.
    pub const UNRELATED: &str = "The weather in Milan was pleasant and the meeting ended early.";
}

pub mod trials {
    //! Trial builders.

    use medmatch_common::{Eligibility, TrialRecord};

    /// A recruiting trial with the given criteria.
    pub fn trial(nct_id: &str, inclusions: &[&str], exclusions: &[&str]) -> TrialRecord {
        TrialRecord {
            nct_id: nct_id.to_string(),
            title: format!("Study {nct_id}"),
            phase: Some("Phase 2".to_string()),
            status: Some("Recruiting".to_string()),
            facility: None,
            eligibility: Eligibility {
                inclusions: inclusions.iter().map(|s| s.to_string()).collect(),
                exclusions: exclusions.iter().map(|s| s.to_string()).collect(),
                limitations: Vec::new(),
            },
        }
    }

    /// Parse a trial from catalog JSON. Panics on malformed input.
    pub fn trial_from_json(json: &str) -> TrialRecord {
        serde_json::from_str(json).expect("fixture trial JSON is valid")
    }
}

pub mod profiles {
    //! Profile builders.

    use medmatch_common::PatientProfile;

    /// Fluent builder over [`PatientProfile`] for scoring tests.
    #[derive(Debug, Clone, Default)]
    pub struct ProfileBuilder {
        profile: PatientProfile,
    }

    impl ProfileBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn cancer(mut self, cancer_type: &str) -> Self {
            self.profile.diagnosis.cancer_type = Some(cancer_type.to_string());
            self.profile.diagnosis.primary_diagnosis = Some(cancer_type.to_string());
            self
        }

        pub fn stage(mut self, stage: &str) -> Self {
            self.profile.diagnosis.stage = Some(stage.to_string());
            self
        }

        pub fn subtype(mut self, subtype: &str) -> Self {
            self.profile.diagnosis.subtype = Some(subtype.to_string());
            self
        }

        pub fn performance_status(mut self, ecog: &str) -> Self {
            self.profile.diagnosis.performance_status = Some(ecog.to_string());
            self
        }

        pub fn past_treatments(mut self, treatments: &str) -> Self {
            self.profile.treatments.past_treatments = Some(treatments.to_string());
            self
        }

        pub fn current_treatment(mut self, treatments: &str) -> Self {
            self.profile.treatments.current_treatment = Some(treatments.to_string());
            self
        }

        pub fn comorbidities(mut self, comorbidities: &str) -> Self {
            self.profile.medical_history.comorbidities = Some(comorbidities.to_string());
            self
        }

        pub fn age(mut self, age: u32) -> Self {
            self.profile.demographics.age = Some(age.to_string());
            self
        }

        pub fn gender(mut self, gender: &str) -> Self {
            self.profile.demographics.gender = Some(gender.to_string());
            self
        }

        pub fn build(self) -> PatientProfile {
            self.profile
        }
    }
}
