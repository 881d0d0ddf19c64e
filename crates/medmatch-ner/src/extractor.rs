//! Rule-driven entity extraction.

use std::sync::OnceLock;

use medmatch_common::{Language, MedicalEntity};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::normalize::{NormalizedText, Sentence};
use crate::rules::{PatternRule, Qualifier, RuleSet};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Characters of original text kept on each side of a match.
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    /// Rule languages to run. Language-agnostic rules always run.
    #[serde(default = "default_languages")]
    pub languages: Vec<Language>,
}

fn default_context_window() -> usize {
    25
}

fn default_languages() -> Vec<Language> {
    vec![Language::En, Language::It]
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            context_window: default_context_window(),
            languages: default_languages(),
        }
    }
}

/// Applies a [`RuleSet`] to clinical narratives.
pub struct EntityExtractor<'r> {
    rules: &'r RuleSet,
    config: ExtractionConfig,
}

impl EntityExtractor<'static> {
    /// Extractor over the process-wide bilingual rule library.
    pub fn bilingual(config: ExtractionConfig) -> Self {
        Self::new(RuleSet::global(), config)
    }
}

impl<'r> EntityExtractor<'r> {
    pub fn new(rules: &'r RuleSet, config: ExtractionConfig) -> Self {
        Self { rules, config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    fn runs(&self, rule: &PatternRule) -> bool {
        rule.language == Language::Any || self.config.languages.contains(&rule.language)
    }

    /// Extract every entity of `text`, in document order.
    ///
    /// Blank input yields no entities; extraction never fails.
    pub fn extract(&self, text: &str) -> Vec<MedicalEntity> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let doc = NormalizedText::new(text, self.rules.abbreviations());
        let sentences = doc.sentences();
        let entities: Vec<MedicalEntity> = sentences
            .iter()
            .flat_map(|sentence| self.extract_sentence(&doc, sentence))
            .collect();
        debug!(
            "Extracted {} entities from {} sentences ({} chars)",
            entities.len(),
            sentences.len(),
            doc.char_len()
        );
        entities
    }

    /// Extract from many documents, in parallel when the `parallel` feature is on.
    pub fn extract_batch(&self, texts: &[&str]) -> Vec<Vec<MedicalEntity>> {
        #[cfg(feature = "parallel")]
        {
            texts.par_iter().map(|text| self.extract(text)).collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            texts.iter().map(|text| self.extract(text)).collect()
        }
    }

    fn extract_sentence(&self, doc: &NormalizedText<'_>, sentence: &Sentence<'_>) -> Vec<MedicalEntity> {
        let window = self.config.context_window;
        let mut found = Vec::new();

        for rule in self.rules.rules().iter().filter(|rule| self.runs(rule)) {
            for caps in rule.pattern.captures_iter(sentence.text) {
                let Some(whole) = caps.get(0) else { continue };
                let Some(mut value) = rule.value.render(&caps) else {
                    continue;
                };

                match rule.qualifier {
                    Some(Qualifier::Negatable) => {
                        if is_negated(clause_before(sentence.text, whole.start(), window)) {
                            continue;
                        }
                    }
                    Some(Qualifier::MarkerStatus) => {
                        let before = clause_before(sentence.text, whole.start(), window);
                        let after = clause_after(sentence.text, whole.end(), window);
                        if let Some(status) = marker_status(before, after) {
                            value = format!("{value} {status}");
                        }
                    }
                    None => {}
                }

                let anchor = caps.get(rule.anchor).unwrap_or(whole);
                let position = doc.original_char(sentence.offset + anchor.start());
                let end = doc.original_char(sentence.offset + whole.end());
                found.push(MedicalEntity::new(
                    rule.entity_type,
                    value,
                    position,
                    doc.context(position, end, window),
                ));
            }
        }

        // Stable: rule order breaks ties at the same position.
        found.sort_by_key(|entity| entity.position);
        found
    }
}

/// Text of the same clause before `start`, at most `window` characters.
fn clause_before(sentence: &str, start: usize, window: usize) -> &str {
    let head = &sentence[..start];
    let head = head
        .rfind(|c: char| matches!(c, ',' | ';' | '('))
        .map_or(head, |i| &head[i + 1..]);
    let head = contrast_regex()
        .find_iter(head)
        .last()
        .map_or(head, |m| &head[m.end()..]);
    let skip = head.chars().count().saturating_sub(window);
    head.char_indices().nth(skip).map_or("", |(i, _)| &head[i..])
}

/// Text of the same clause after `end`, at most `window` characters.
fn clause_after(sentence: &str, end: usize, window: usize) -> &str {
    let tail = &sentence[end..];
    let tail = tail
        .find(|c: char| matches!(c, ',' | ';' | ')'))
        .map_or(tail, |i| &tail[..i]);
    tail.char_indices().nth(window).map_or(tail, |(i, _)| &tail[..i])
}

fn contrast_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:but|however|although|whereas|ma|tuttavia|pero|mentre)\b")
            .expect("contrast pattern is valid")
    })
}

fn negation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:no|not|denies|denied|without|negative\s+for|absence\s+of|free\s+of|non|nega|senza|assenza\s+di|esclus[oa]|nessun[oa]?)\b(?:\s+\S+){0,3}\s*$",
        )
        .expect("negation pattern is valid")
    })
}

fn is_negated(clause_before: &str) -> bool {
    negation_regex().is_match(clause_before)
}

fn negated_marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:negative\s+for|negativ[oa]\s+per|no|without|assenza\s+di|senza)\s+(?:\S+\s+)?$")
            .expect("negated marker pattern is valid")
    })
}

fn marker_status_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(not\s+mutated|non\s+mutat[oa]|mutation[-\s]negative|wild[-\s]?type|wt|negative|negativ[oa]|positive|positiv[oa]|mutated|mutations?|mutant|mutat[oa]|mutazion[ei]|amplified|amplification|amplificat[oa]|amplificazione|fusion|fusione|rearranged|rearrangement|riarrangiat[oa]|riarrangiamento|high|alto|alta|elevat[oa]|low|bass[oa])\b",
        )
        .expect("marker status pattern is valid")
    })
}

fn status_label(word: &str) -> &'static str {
    let word = word.to_lowercase();
    match word.as_str() {
        w if w.starts_with("not") || w.starts_with("non") || w.starts_with("wild") || w == "wt" => {
            "wild-type"
        }
        w if w.starts_with("mutation") && w.ends_with("negative") => "wild-type",
        w if w.starts_with("negativ") => "negative",
        w if w.starts_with("positiv") => "positive",
        w if w.starts_with("mutat") || w.starts_with("mutant") => "mutated",
        w if w.starts_with("amplif") => "amplified",
        w if w.starts_with("fusion") || w.starts_with("rearrang") || w.starts_with("riarrang") => {
            "fusion"
        }
        "high" | "alto" | "alta" => "high",
        w if w.starts_with("elevat") => "high",
        _ => "low",
    }
}

/// Status of a marker from its clause: explicit negation right before it,
/// then the nearest status word after it, then the nearest one before it.
fn marker_status(before: &str, after: &str) -> Option<&'static str> {
    if negated_marker_regex().is_match(before) {
        return Some("negative");
    }
    if let Some(m) = marker_status_regex().find(after) {
        return Some(status_label(m.as_str()));
    }
    marker_status_regex()
        .find_iter(before)
        .last()
        .map(|m| status_label(m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use medmatch_common::EntityType;
    use pretty_assertions::assert_eq;

    fn extract(text: &str) -> Vec<MedicalEntity> {
        EntityExtractor::bilingual(ExtractionConfig::default()).extract(text)
    }

    fn values_of(entities: &[MedicalEntity], entity_type: EntityType) -> Vec<&str> {
        entities
            .iter()
            .filter(|e| e.entity_type == entity_type)
            .map(|e| e.value.as_str())
            .collect()
    }

    #[test]
    fn test_blank_input_yields_nothing() {
        assert!(extract("").is_empty());
        assert!(extract("   \n ").is_empty());
    }

    #[test]
    fn test_positions_refer_to_original_text() {
        let text = "Età 70. La pz. è affetta da carcinoma mammario.";
        let entities = extract(text);
        let cancer = entities
            .iter()
            .find(|e| e.entity_type == EntityType::CancerType)
            .unwrap();
        assert_eq!(cancer.value, "Breast Cancer");
        let expected = text[..text.find("carcinoma").unwrap()].chars().count();
        assert_eq!(cancer.position, expected);
        assert!(cancer.context.contains("carcinoma mammario"));
    }

    #[test]
    fn test_marker_status_from_trailing_then_leading_context() {
        let entities = extract("KRAS mutated. Negative for ALK rearrangement. EGFR wild-type.");
        let markers = values_of(&entities, EntityType::Biomarker);
        assert!(markers.contains(&"KRAS mutated"));
        assert!(markers.contains(&"ALK negative"));
        assert!(markers.contains(&"EGFR wild-type"));
    }

    #[test]
    fn test_negated_comorbidity_is_dropped() {
        let entities = extract("No history of diabetes, but hypertension on ramipril.");
        assert_eq!(values_of(&entities, EntityType::Comorbidity), vec!["Hypertension"]);
        assert_eq!(values_of(&entities, EntityType::Medication), vec!["Ramipril"]);
    }

    #[test]
    fn test_language_filter() {
        let config = ExtractionConfig {
            languages: vec![Language::En],
            ..ExtractionConfig::default()
        };
        let entities = EntityExtractor::bilingual(config).extract("Paziente con ipertensione arteriosa.");
        assert!(values_of(&entities, EntityType::Comorbidity).is_empty());
    }

    #[test]
    fn test_batch_matches_single() {
        let extractor = EntityExtractor::bilingual(ExtractionConfig::default());
        let texts = ["Stage II breast cancer.", "Stadio IV."];
        let batch = extractor.extract_batch(&texts);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], extractor.extract(texts[0]));
        assert_eq!(values_of(&batch[1], EntityType::Stage), vec!["Stage 4"]);
    }
}
