//! Bilingual (English/Italian) clinical entity extraction.
//!
//! A narrative goes through three stages:
//! 1. [`normalize`]: diacritic folding, shorthand expansion, sentence split
//! 2. [`extractor`]: pattern rules from [`rules`] produce typed entities
//! 3. [`aggregator`]: entities are folded into a [`PatientProfile`]
//!
//! ```
//! use medmatch_ner::extract_profile;
//!
//! let profile = extract_profile("65-year-old woman with stage II breast cancer.");
//! assert_eq!(profile.diagnosis.stage.as_deref(), Some("Stage 2"));
//! ```
//!
//! [`PatientProfile`]: medmatch_common::PatientProfile

pub mod aggregator;
pub mod extractor;
pub mod normalize;
pub mod pipeline;
pub mod rules;
pub mod stage;

pub use aggregator::{ProfileAggregator, TreatmentTiming};
pub use extractor::{EntityExtractor, ExtractionConfig};
pub use normalize::{AbbreviationTable, NormalizedText, Sentence};
pub use pipeline::ClinicalPipeline;
pub use rules::{PatternRule, Qualifier, RuleSet, RuleStats, ValueTemplate};
pub use stage::{StageFraming, StageLevel};

use medmatch_common::PatientProfile;

/// Extract a profile with the default bilingual configuration.
pub fn extract_profile(text: &str) -> PatientProfile {
    ClinicalPipeline::default().extract_profile(text)
}
