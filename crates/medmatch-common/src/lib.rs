//! medmatch-common: Shared data model and error type used across all medmatch crates.

pub mod error;
pub mod entities;
pub mod profile;
pub mod trial;

// Re-export commonly used types
pub use entities::{EntityType, Language, MedicalEntity};
pub use error::{MedmatchError, Result};
pub use profile::{
    split_list, Demographics, DiagnosisInfo, MedicalHistory, PatientProfile, TreatmentHistory,
    LIST_DELIMITER,
};
pub use trial::{Eligibility, MatchFactor, MatchReport, MatchResult, RankedMatch, TrialRecord};
