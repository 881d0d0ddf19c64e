//! Pattern rule library.
//!
//! Every [`EntityType`] owns an ordered list of [`PatternRule`]s tagged with
//! the language they are written for. Rules are not mutually exclusive: every
//! match of every enabled rule yields a candidate entity, and the aggregator
//! decides which candidates survive.

mod demographics;
mod history;
mod oncology;
mod therapy;

use std::sync::OnceLock;

use medmatch_common::{EntityType, Language};
use regex::{Captures, Regex};
use tracing::info;

use crate::normalize::AbbreviationTable;

/// Computes an entity value from a match. Returning `None` declines the match.
pub type DeriveFn = fn(&Captures<'_>) -> Option<String>;

/// How the value of an entity is built from a regex match.
#[derive(Clone)]
pub enum ValueTemplate {
    /// The matched text, trimmed.
    Matched,
    /// A fixed canonical value.
    Canonical(&'static str),
    /// A template over capture groups (`${1}`, `${gene}`).
    Expand(&'static str),
    /// A function of the captures.
    Derive(DeriveFn),
}

impl ValueTemplate {
    pub fn render(&self, caps: &Captures<'_>) -> Option<String> {
        let value = match self {
            ValueTemplate::Matched => caps.get(0)?.as_str().trim().to_string(),
            ValueTemplate::Canonical(value) => (*value).to_string(),
            ValueTemplate::Expand(template) => {
                let mut out = String::new();
                caps.expand(template, &mut out);
                out.trim().to_string()
            }
            ValueTemplate::Derive(derive) => derive(caps)?,
        };
        (!value.is_empty()).then_some(value)
    }
}

impl std::fmt::Debug for ValueTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueTemplate::Matched => f.write_str("Matched"),
            ValueTemplate::Canonical(v) => f.debug_tuple("Canonical").field(v).finish(),
            ValueTemplate::Expand(t) => f.debug_tuple("Expand").field(t).finish(),
            ValueTemplate::Derive(_) => f.write_str("Derive(..)"),
        }
    }
}

/// Post-match refinement looked up in the surrounding clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualifier {
    /// Append a nearby marker status ("mutated", "wild-type", "high").
    MarkerStatus,
    /// Drop the match when the clause negates it ("no history of diabetes").
    Negatable,
}

#[derive(Debug, Clone)]
pub struct PatternRule {
    pub entity_type: EntityType,
    pub language: Language,
    pub pattern: Regex,
    pub value: ValueTemplate,
    pub qualifier: Option<Qualifier>,
    /// Capture group whose start is reported as the entity position.
    pub anchor: usize,
}

impl PatternRule {
    /// Build a rule from a constant pattern.
    ///
    /// # Panics
    /// When `pattern` is not a valid regex. Rule tables are compiled once at
    /// startup, so a bad pattern is a programming error.
    pub fn new(
        entity_type: EntityType,
        language: Language,
        pattern: &str,
        value: ValueTemplate,
    ) -> Self {
        let pattern = Regex::new(pattern)
            .unwrap_or_else(|e| panic!("invalid {entity_type} rule {pattern:?}: {e}"));
        Self {
            entity_type,
            language,
            pattern,
            value,
            qualifier: None,
            anchor: 0,
        }
    }

    pub fn qualified(mut self, qualifier: Qualifier) -> Self {
        self.qualifier = Some(qualifier);
        self
    }

    pub fn anchored(mut self, group: usize) -> Self {
        self.anchor = group;
        self
    }
}

/// A lexicon entry: word-bounded, case-insensitive alternatives mapped to one
/// canonical value.
pub(crate) fn term(
    entity_type: EntityType,
    language: Language,
    canonical: &'static str,
    alternatives: &str,
) -> PatternRule {
    PatternRule::new(
        entity_type,
        language,
        &format!(r"(?i)\b(?:{alternatives})\b"),
        ValueTemplate::Canonical(canonical),
    )
}

/// "invasive ductal carcinoma" -> "Invasive Ductal Carcinoma".
pub(crate) fn title_case(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[derive(Debug, Clone, Default)]
pub struct RuleStats {
    pub per_type: Vec<(EntityType, usize)>,
    pub total_rules: usize,
    pub abbreviations: usize,
}

/// The compiled rule library plus the shorthand table used during normalization.
pub struct RuleSet {
    rules: Vec<PatternRule>,
    abbreviations: AbbreviationTable,
}

impl RuleSet {
    pub fn new(rules: Vec<PatternRule>, abbreviations: AbbreviationTable) -> Self {
        Self {
            rules,
            abbreviations,
        }
    }

    /// Build the English and Italian rule library.
    pub fn bilingual() -> Self {
        let mut rules = Vec::new();
        rules.extend(oncology::diagnosis_rules());
        rules.extend(oncology::cancer_type_rules());
        rules.extend(oncology::stage_rules());
        rules.extend(oncology::biomarker_rules());
        rules.extend(therapy::treatment_rules());
        rules.extend(therapy::medication_rules());
        rules.extend(history::comorbidity_rules());
        rules.extend(history::allergy_rules());
        rules.extend(demographics::age_rules());
        rules.extend(demographics::gender_rules());
        rules.extend(demographics::date_rules());
        rules.extend(oncology::performance_status_rules());

        let set = Self::new(rules, AbbreviationTable::bilingual());
        let stats = set.stats();
        info!(
            "Rule library loaded: {} rules across {} entity types, {} abbreviations",
            stats.total_rules,
            stats.per_type.iter().filter(|(_, n)| *n > 0).count(),
            stats.abbreviations
        );
        set
    }

    /// Process-wide bilingual library, compiled on first use.
    pub fn global() -> &'static RuleSet {
        static RULES: OnceLock<RuleSet> = OnceLock::new();
        RULES.get_or_init(RuleSet::bilingual)
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    pub fn rules_for(&self, entity_type: EntityType) -> impl Iterator<Item = &PatternRule> {
        self.rules
            .iter()
            .filter(move |rule| rule.entity_type == entity_type)
    }

    pub fn abbreviations(&self) -> &AbbreviationTable {
        &self.abbreviations
    }

    pub fn stats(&self) -> RuleStats {
        RuleStats {
            per_type: EntityType::ALL
                .iter()
                .map(|t| (*t, self.rules_for(*t).count()))
                .collect(),
            total_rules: self.rules.len(),
            abbreviations: self.abbreviations.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(entity_type: EntityType, text: &str) -> Vec<String> {
        RuleSet::global()
            .rules_for(entity_type)
            .flat_map(|rule| {
                rule.pattern
                    .captures_iter(text)
                    .filter_map(|caps| rule.value.render(&caps))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    #[test]
    fn test_every_entity_type_has_rules() {
        let stats = RuleSet::global().stats();
        for (entity_type, count) in stats.per_type {
            assert!(count > 0, "no rules for {entity_type}");
        }
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("invasive  DUCTAL carcinoma"), "Invasive Ductal Carcinoma");
    }

    #[test]
    fn test_expand_template() {
        let rule = PatternRule::new(
            EntityType::PerformanceStatus,
            Language::Any,
            r"ECOG (\d)",
            ValueTemplate::Expand("ECOG ${1}"),
        );
        let caps = rule.pattern.captures("ECOG 2").unwrap();
        assert_eq!(rule.value.render(&caps).as_deref(), Some("ECOG 2"));
    }

    #[test]
    fn test_stage_rules_canonicalize() {
        assert_eq!(values(EntityType::Stage, "stage IIIB disease"), vec!["Stage 3B"]);
        assert_eq!(values(EntityType::Stage, "stadio II"), vec!["Stage 2"]);
        assert_eq!(values(EntityType::Stage, "pT2 N0 M0"), vec!["pT2N0M0"]);
    }

    #[test]
    fn test_small_cell_rule_declines_non_small_cell() {
        let found = values(EntityType::CancerType, "non-small cell lung cancer");
        assert!(found.contains(&"Non-Small Cell Lung Cancer".to_string()));
        assert!(!found.contains(&"Small Cell Lung Cancer".to_string()));
    }

    #[test]
    fn test_receptor_panel_is_compacted() {
        let found = values(EntityType::Biomarker, "tumor ER + / PR+ / HER-2 -");
        assert!(found.contains(&"ER+/PR+/HER2-".to_string()));
    }

    #[test]
    fn test_gene_rule_declines_when_variant_follows() {
        let found = values(EntityType::Biomarker, "KRAS G12C detected");
        assert!(found.contains(&"KRAS G12C".to_string()));
        assert!(!found.contains(&"KRAS".to_string()));
    }

    #[test]
    fn test_age_rules_reject_durations() {
        assert!(values(EntityType::Age, "trattata per 5 anni").is_empty());
        assert!(values(EntityType::Age, "diagnosi 3 anni fa").is_empty());
        assert_eq!(values(EntityType::Age, "paziente di 67 anni"), vec!["67"]);
        assert_eq!(values(EntityType::Age, "donna sessantottenne"), vec!["68"]);
        assert_eq!(values(EntityType::Age, "a fifty-two-year-old woman"), vec!["52"]);
    }

    #[test]
    fn test_date_rules_canonicalize() {
        assert_eq!(values(EntityType::Date, "on 12/03/2021"), vec!["2021-03-12"]);
        assert_eq!(values(EntityType::Date, "nel marzo 2020"), vec!["2020-03"]);
        assert_eq!(values(EntityType::Date, "March 5, 2019"), vec!["2019-03-05"]);
        assert!(values(EntityType::Date, "on 31/02/2021").is_empty());
    }
}
