//! End-to-end narrative processing: normalize, extract, aggregate.

use medmatch_common::{MedicalEntity, PatientProfile};
use tracing::info;

use crate::aggregator::ProfileAggregator;
use crate::extractor::{EntityExtractor, ExtractionConfig};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Turns free-text narratives into structured patient profiles.
pub struct ClinicalPipeline {
    extractor: EntityExtractor<'static>,
    aggregator: ProfileAggregator,
}

impl Default for ClinicalPipeline {
    fn default() -> Self {
        Self::new(ExtractionConfig::default())
    }
}

impl ClinicalPipeline {
    pub fn new(config: ExtractionConfig) -> Self {
        let aggregator = ProfileAggregator::new(config.context_window);
        Self {
            extractor: EntityExtractor::bilingual(config),
            aggregator,
        }
    }

    pub fn extract_entities(&self, text: &str) -> Vec<MedicalEntity> {
        self.extractor.extract(text)
    }

    pub fn aggregate(&self, entities: &[MedicalEntity]) -> PatientProfile {
        self.aggregator.aggregate(entities)
    }

    pub fn extract_profile(&self, text: &str) -> PatientProfile {
        self.aggregate(&self.extract_entities(text))
    }

    /// Profiles for many narratives, in input order.
    pub fn extract_profiles(&self, texts: &[&str]) -> Vec<PatientProfile> {
        info!("Extracting profiles from {} narratives", texts.len());

        #[cfg(feature = "parallel")]
        let profiles = texts.par_iter().map(|text| self.extract_profile(text)).collect();

        #[cfg(not(feature = "parallel"))]
        let profiles = texts.iter().map(|text| self.extract_profile(text)).collect();

        profiles
    }
}
