//! Parsers over eligibility criteria text.
//!
//! Criteria are free text. Each parser looks for one kind of restriction
//! and returns `None`/empty when the text does not state one, so a rule
//! depending on it is skipped rather than penalised.

use std::fmt;
use std::sync::OnceLock;

use medmatch_common::TrialRecord;
use medmatch_ner::normalize::fold;
use medmatch_ner::stage::{numeral_value, StageFraming, StageLevel};
use regex::Regex;

use crate::markers::{criteria_markers, thresholds, Marker, Threshold};

// ── Tumour sites ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TumourSite {
    Breast,
    Lung,
    Colorectal,
    Pancreas,
    Prostate,
    Ovary,
    Melanoma,
    Liver,
    Kidney,
    Bladder,
    Stomach,
    Esophagus,
    HeadAndNeck,
    Brain,
    Thyroid,
    Cervix,
    Endometrium,
    Lymphoma,
    Leukemia,
    Myeloma,
    Sarcoma,
}

impl TumourSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            TumourSite::Breast => "breast",
            TumourSite::Lung => "lung",
            TumourSite::Colorectal => "colorectal",
            TumourSite::Pancreas => "pancreas",
            TumourSite::Prostate => "prostate",
            TumourSite::Ovary => "ovary",
            TumourSite::Melanoma => "melanoma",
            TumourSite::Liver => "liver",
            TumourSite::Kidney => "kidney",
            TumourSite::Bladder => "bladder",
            TumourSite::Stomach => "stomach",
            TumourSite::Esophagus => "esophagus",
            TumourSite::HeadAndNeck => "head and neck",
            TumourSite::Brain => "brain",
            TumourSite::Thyroid => "thyroid",
            TumourSite::Cervix => "cervix",
            TumourSite::Endometrium => "endometrium",
            TumourSite::Lymphoma => "lymphoma",
            TumourSite::Leukemia => "leukemia",
            TumourSite::Myeloma => "myeloma",
            TumourSite::Sarcoma => "sarcoma",
        }
    }
}

impl fmt::Display for TumourSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn site_lexicon() -> &'static [(TumourSite, Regex)] {
    static LEXICON: OnceLock<Vec<(TumourSite, Regex)>> = OnceLock::new();
    LEXICON.get_or_init(|| {
        use TumourSite::*;
        let entries: &[(TumourSite, &str)] = &[
            (Breast, r"breast|mammella|mammari[oa]|seno"),
            (Lung, r"lung|nsclc|sclc|polmon[ei]|polmonar[ei]|bronchial\s+carcinoma"),
            (Colorectal, r"colorectal|colon|rectal|rectum|crc|colorettal[ei]|colon[-\s]?retto|retto"),
            (Pancreas, r"pancrea\w*|pdac"),
            (Prostate, r"prostat\w*|m?crpc"),
            (Ovary, r"ovar\w*"),
            (Melanoma, r"melanoma"),
            (Liver, r"hepatocellular|hcc|liver\s+(?:cancer|carcinoma)|epatocarcinoma|epatocellulare"),
            (Kidney, r"renal[-\s]cell|rcc|kidney\s+(?:cancer|carcinoma)|carcinoma\s+renale|tumore\s+(?:del\s+)?rene"),
            (Bladder, r"bladder|urothelial|vescica|vescicale|uroteliale"),
            (Stomach, r"gastric|stomach|gastro-?(?:o)?esophageal\s+junction|gastrico|stomaco"),
            (Esophagus, r"esophag\w*|oesophag\w*|esofag\w*"),
            (HeadAndNeck, r"head\s+and\s+neck|hnscc|testa[-\s]collo|oropharyn\w*|laryn\w*"),
            (Brain, r"glioblastoma|glioma|gbm"),
            (Thyroid, r"thyroid\s+(?:cancer|carcinoma)|carcinoma\s+(?:della\s+)?tiroide|tiroideo"),
            (Cervix, r"cervical\s+cancer|cervix|cervice\s+uterina"),
            (Endometrium, r"endometri\w*|uterine"),
            (Lymphoma, r"lymphoma|linfoma"),
            (Leukemia, r"leuka?emia|leucemia"),
            (Myeloma, r"myeloma|mieloma"),
            (Sarcoma, r"sarcoma"),
        ];
        entries
            .iter()
            .map(|(site, pattern)| {
                let regex = Regex::new(&format!(r"(?i)\b(?:{pattern})\b"))
                    .expect("site lexicon pattern is valid");
                (*site, regex)
            })
            .collect()
    })
}

/// Tumour sites named in `text`, in lexicon order.
pub fn tumour_sites(text: &str) -> Vec<TumourSite> {
    let text = fold(text);
    site_lexicon()
        .iter()
        .filter(|(_, regex)| regex.is_match(&text))
        .map(|(site, _)| *site)
        .collect()
}

fn generic_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:solid\s+tumou?rs?|any\s+(?:type\s+of\s+)?(?:cancer|malignanc\w+|solid\s+tumou?r)|all[-\s]comers|tumori\s+solidi|qualsiasi\s+tumore|advanced\s+cancers|malignancies)\b",
        )
        .expect("generic tumour pattern is valid")
    })
}

/// True when the criteria admit any solid tumour.
pub fn accepts_any_tumour(text: &str) -> bool {
    generic_regex().is_match(&fold(text))
}

// ── Stage ───────────────────────────────────────────────────────────────────

/// An inclusive range of stages; a single stage is a range of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageRange {
    pub low: StageLevel,
    pub high: StageLevel,
}

impl StageRange {
    pub fn single(level: StageLevel) -> Self {
        Self { low: level, high: level }
    }

    /// Sub-stage letters are only compared when both sides carry one, so
    /// "Stage 3" lies inside "Stage 3B" and vice versa.
    pub fn contains(&self, level: &StageLevel) -> bool {
        let above_low = level.number > self.low.number
            || (level.number == self.low.number
                && match (level.letter, self.low.letter) {
                    (Some(l), Some(bound)) => l >= bound,
                    _ => true,
                });
        let below_high = level.number < self.high.number
            || (level.number == self.high.number
                && match (level.letter, self.high.letter) {
                    (Some(l), Some(bound)) => l <= bound,
                    _ => true,
                });
        above_low && below_high
    }
}

impl fmt::Display for StageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.low == self.high {
            write!(f, "{}", self.low)
        } else {
            let high = self.high.to_string();
            write!(f, "{}-{}", self.low, high.trim_start_matches("Stage "))
        }
    }
}

fn stage_mention_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:stages?|stadi[oa]?)\s*:?\s*(>=|>)?\s*(IV|I{1,3}|[0-4])([ABC])?(?:\s*(-|to|through|a|or|/|and|e|o|,)\s*(?:stages?\s+|stadi[oa]?\s+)?(IV|I{1,3}|[0-4])([ABC])?)?(\s*(?:or\s+(?:higher|greater|above)|o\s+superiore))?\b",
        )
        .expect("stage mention pattern is valid")
    })
}

fn level(numeral: &str, letter: Option<regex::Match<'_>>) -> Option<StageLevel> {
    let letter = letter.and_then(|m| m.as_str().chars().next());
    Some(StageLevel::new(numeral_value(numeral)?, letter))
}

/// Stage ranges named in `text` ("stage II", "stage IIIB-IV", "stadio III o IV",
/// "stage III or higher").
pub fn stage_ranges(text: &str) -> Vec<StageRange> {
    let text = fold(text);
    let mut ranges = Vec::new();
    for caps in stage_mention_regex().captures_iter(&text) {
        let Some(first) = level(&caps[2], caps.get(3)) else {
            continue;
        };
        let open_ended = caps.get(1).is_some() || caps.get(7).is_some();
        let top = StageLevel::new(4, None);
        match (caps.get(4).map(|m| m.as_str().to_lowercase()), caps.get(5)) {
            (Some(sep), Some(second)) => {
                let Some(second) = level(second.as_str(), caps.get(6)) else {
                    continue;
                };
                if matches!(sep.as_str(), "-" | "to" | "through" | "a") {
                    ranges.push(StageRange { low: first, high: second });
                } else {
                    ranges.push(StageRange::single(first));
                    ranges.push(StageRange::single(second));
                }
            }
            _ if open_ended => {
                let low = if caps.get(1).is_some_and(|m| m.as_str() == ">") {
                    StageLevel::new(first.number + 1, None)
                } else {
                    first
                };
                ranges.push(StageRange { low, high: top });
            }
            _ => ranges.push(StageRange::single(first)),
        }
    }
    ranges
}

fn framing_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Negated forms come first so "non-metastatic" is early and
        // "unresectable" advanced.
        Regex::new(
            r"(?i)\b(?:(non[-\s]?metastatic[oa]?|early(?:[-\s]stage)?|resectable|operable|locali[sz]ed|localizzat[oa]|iniziale|precoce|resecabile|operabile)|(unresectable|non[-\s]?resectable|non\s+resecabile|inoperable|non[-\s]?operable|non\s+operabile|(?:locally\s+)?advanced|localmente\s+avanzat[oa]|avanzat[oa]|metastatic[oa]?))\b",
        )
        .expect("framing pattern is valid")
    })
}

/// Disease extent the text asks for, when it is unambiguous.
pub fn stage_framing(text: &str) -> Option<StageFraming> {
    let text = fold(text);
    let mut early = false;
    let mut advanced = false;
    for caps in framing_regex().captures_iter(&text) {
        early |= caps.get(1).is_some();
        advanced |= caps.get(2).is_some();
    }
    match (early, advanced) {
        (true, false) => Some(StageFraming::Early),
        (false, true) => Some(StageFraming::Advanced),
        _ => None,
    }
}

// ── Age ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgeRange {
    pub min: Option<u32>,
    pub max: Option<u32>,
}

impl AgeRange {
    pub fn contains(&self, age: u32) -> bool {
        self.min.map_or(true, |min| age >= min) && self.max.map_or(true, |max| age <= max)
    }

    fn tighten_min(&mut self, min: u32) {
        self.min = Some(self.min.map_or(min, |m| m.max(min)));
    }

    fn tighten_max(&mut self, max: u32) {
        self.max = Some(self.max.map_or(max, |m| m.min(max)));
    }
}

impl fmt::Display for AgeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (Some(min), Some(max)) => write!(f, "{min}-{max} years"),
            (Some(min), None) => write!(f, ">= {min} years"),
            (None, Some(max)) => write!(f, "<= {max} years"),
            (None, None) => write!(f, "any age"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum AgeBound {
    Range,
    AtLeast,
    Above,
    AtMost,
    Below,
}

fn age_patterns() -> &'static [(AgeBound, Regex)] {
    static PATTERNS: OnceLock<Vec<(AgeBound, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        use AgeBound::*;
        const YEARS: &str = r"\s*(?:years?|yrs?|anni)\b";
        const AGE: &str = r"\b(?:age[ds]?|eta)\b";
        let entries = [
            (Range, format!(r"\b(\d{{1,3}})\s*(?:-|to|and|e|a)\s*(\d{{1,3}}){YEARS}")),
            (Range, format!(r"{AGE}[^\d\n]{{0,20}}?(\d{{1,3}})\s*(?:-|to|and|e|a)\s*(\d{{1,3}})\b")),
            (AtLeast, format!(r"(?:>=|=>)\s*(\d{{1,3}}){YEARS}")),
            (AtLeast, format!(r"{AGE}\s*(?:>=|=>)\s*(\d{{1,3}})")),
            (AtLeast, format!(r"\b(\d{{1,3}}){YEARS}\s*(?:of\s+age\s*)?(?:or\s+(?:older|over|above|more)|and\s+(?:older|over|above)|o\s+(?:piu|superiore))")),
            (AtLeast, format!(r"\b(?:at\s+least|almeno)\s*(\d{{1,3}}){YEARS}")),
            (Above, format!(r"{AGE}\s*>\s*(\d{{1,3}})")),
            (Above, format!(r"(?:^|[^<=])>\s*(\d{{1,3}}){YEARS}")),
            (Above, format!(r"\b(?:older\s+than|over|above|maggiore\s+di|superiore\s+a|piu\s+di)\s*(\d{{1,3}}){YEARS}")),
            (AtMost, format!(r"(?:<=|=<)\s*(\d{{1,3}}){YEARS}")),
            (AtMost, format!(r"{AGE}\s*(?:<=|=<)\s*(\d{{1,3}})")),
            (AtMost, format!(r"\b(\d{{1,3}}){YEARS}\s*(?:of\s+age\s*)?(?:or\s+(?:younger|less|under)|o\s+(?:meno|inferiore))")),
            (AtMost, format!(r"\b(?:no\s+older\s+than|up\s+to|fino\s+a|massimo)\s*(\d{{1,3}}){YEARS}")),
            (Below, format!(r"{AGE}\s*<\s*(\d{{1,3}})")),
            (Below, format!(r"(?:^|[^>=])<\s*(\d{{1,3}}){YEARS}")),
            (Below, format!(r"\b(?:younger\s+than|under|below|less\s+than|minore\s+di|inferiore\s+a|meno\s+di)\s*(\d{{1,3}}){YEARS}")),
        ];
        entries
            .into_iter()
            .map(|(bound, pattern)| {
                let regex = Regex::new(&format!("(?i){pattern}")).expect("age pattern is valid");
                (bound, regex)
            })
            .collect()
    })
}

fn age_clause_regexes() -> &'static (Regex, Regex) {
    static RE: OnceLock<(Regex, Regex)> = OnceLock::new();
    RE.get_or_init(|| {
        let anchor = Regex::new(
            r"(?i)\b(?:age[ds]?|eta|of\s+age|years?\s+old|older|younger|adults?|adulti|maggiorenni|patients?|subjects?|pazienti|wom[ae]n|men|uomini|donne)\b",
        )
        .expect("age anchor pattern is valid");
        let duration = Regex::new(
            r"(?i)\b(?:for|within|interval|since|ago|after|duration|follow-?up|per|da|dopo|entro|durata|intervallo)\b",
        )
        .expect("duration cue pattern is valid");
        (anchor, duration)
    })
}

/// True when a clause speaks about the patient's age rather than a
/// duration ("therapy for up to 5 years").
fn is_age_clause(clause: &str) -> bool {
    let (anchor, duration) = age_clause_regexes();
    anchor.is_match(clause) && !duration.is_match(clause)
}

/// Explicit numeric age restriction stated in `text`.
pub fn age_range(text: &str) -> Option<AgeRange> {
    let text = fold(text);
    let mut range = AgeRange::default();
    for clause in text.split(['\n', ';']).filter(|c| is_age_clause(c)) {
        tighten_from_clause(clause, &mut range);
    }
    (range != AgeRange::default()).then_some(range)
}

fn tighten_from_clause(text: &str, range: &mut AgeRange) {
    for (bound, regex) in age_patterns() {
        for caps in regex.captures_iter(text) {
            let Some(n) = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) else {
                continue;
            };
            match bound {
                AgeBound::Range => {
                    let Some(m) = caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok()) else {
                        continue;
                    };
                    if n < m {
                        range.tighten_min(n);
                        range.tighten_max(m);
                    }
                }
                AgeBound::AtLeast => range.tighten_min(n),
                AgeBound::Above => range.tighten_min(n + 1),
                AgeBound::AtMost => range.tighten_max(n),
                AgeBound::Below => range.tighten_max(n.saturating_sub(1)),
            }
        }
    }
}

// ── Gender ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "female" | "f" | "femmina" | "donna" => Some(Gender::Female),
            "male" | "m" | "maschio" | "uomo" => Some(Gender::Male),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Female => "Female",
            Gender::Male => "Male",
        }
    }
}

fn gender_regexes() -> &'static (Regex, Regex, Regex) {
    static RE: OnceLock<(Regex, Regex, Regex)> = OnceLock::new();
    RE.get_or_init(|| {
        let female = Regex::new(
            r"(?i)\b(?:females?|wom[ae]n|post-?menopausal|pre-?menopausal|donne|donna|femminile|(?:in\s+)?(?:post|pre)menopausa)\b",
        )
        .expect("female pattern is valid");
        let male = Regex::new(r"(?i)\b(?:males?|m[ae]n|uomini|uomo|maschile|maschi)\b")
            .expect("male pattern is valid");
        // Lines about contraception or pregnancy address both sexes.
        let reproductive = Regex::new(
            r"(?i)childbearing|pregnan|contracept|breast-?feeding|lactat|potenziale\s+fertile|gravidanz|contracce|allattamento",
        )
        .expect("reproductive pattern is valid");
        (female, male, reproductive)
    })
}

/// Single gender the inclusion criteria restrict to, if any.
pub fn gender_restriction(inclusions: &[String]) -> Option<Gender> {
    let (female, male, reproductive) = gender_regexes();
    let mut females = false;
    let mut males = false;
    for line in inclusions.iter().map(|l| fold(l)) {
        if reproductive.is_match(&line) {
            continue;
        }
        females |= female.is_match(&line);
        males |= male.is_match(&line);
    }
    match (females, males) {
        (true, false) => Some(Gender::Female),
        (false, true) => Some(Gender::Male),
        _ => None,
    }
}

// ── Performance status ──────────────────────────────────────────────────────

fn ecog_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:ecog|performance\s+status|ps)\b[^\d\n;]{0,40}?(<=|=<|<)?\s*([0-4])(?:\s*(?:-|to|or|,|o|a|and|e)\s*([0-4]))*",
        )
        .expect("ECOG pattern is valid")
    })
}

/// Highest ECOG performance status the text admits.
pub fn ecog_max(text: &str) -> Option<u8> {
    let text = fold(text);
    let caps = ecog_regex().captures(&text)?;
    let first: u8 = caps[2].parse().ok()?;
    let max = match (caps.get(1).map(|m| m.as_str()), caps.get(3)) {
        (Some("<"), _) => first.checked_sub(1)?,
        (Some(_), _) => first,
        (None, Some(last)) => last.as_str().parse().ok()?,
        (None, None) => first,
    };
    Some(max)
}

/// ECOG grade of a profile value such as "ECOG 1".
pub fn ecog_grade(value: &str) -> Option<u8> {
    value
        .chars()
        .filter(char::is_ascii_digit)
        .last()
        .and_then(|c| c.to_digit(10))
        .and_then(|d| u8::try_from(d).ok())
        .filter(|d| *d <= 4)
}

// ── Prior treatment ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreatmentCategory {
    Surgery,
    Chemotherapy,
    Radiotherapy,
    Immunotherapy,
    HormoneTherapy,
    TargetedTherapy,
}

impl TreatmentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TreatmentCategory::Surgery => "surgery",
            TreatmentCategory::Chemotherapy => "chemotherapy",
            TreatmentCategory::Radiotherapy => "radiotherapy",
            TreatmentCategory::Immunotherapy => "immunotherapy",
            TreatmentCategory::HormoneTherapy => "hormone therapy",
            TreatmentCategory::TargetedTherapy => "targeted therapy",
        }
    }

    /// Category of a canonical treatment name as produced by extraction.
    pub fn of_treatment(value: &str) -> Option<Self> {
        use TreatmentCategory::*;
        let category = match value.trim() {
            "Lumpectomy" | "Quadrantectomy" | "Mastectomy" | "Lobectomy" | "Pneumonectomy"
            | "Whipple Procedure" | "Colectomy" | "Prostatectomy" | "Surgery" => Surgery,
            "Chemotherapy" | "Carboplatin" | "Cisplatin" | "Oxaliplatin" | "Paclitaxel"
            | "Docetaxel" | "Gemcitabine" | "Capecitabine" | "Fluorouracil" | "FOLFOX"
            | "FOLFIRI" | "FOLFIRINOX" | "Doxorubicin" | "Cyclophosphamide" => Chemotherapy,
            "Radiotherapy" => Radiotherapy,
            "Immunotherapy" | "Pembrolizumab" | "Nivolumab" | "Atezolizumab" | "Durvalumab"
            | "Ipilimumab" => Immunotherapy,
            "Hormone Therapy" | "Tamoxifen" | "Letrozole" | "Anastrozole" | "Exemestane"
            | "Fulvestrant" | "Enzalutamide" | "Abiraterone" => HormoneTherapy,
            "Targeted Therapy" | "Trastuzumab" | "Pertuzumab" | "Palbociclib" | "Ribociclib"
            | "Abemaciclib" | "Olaparib" | "Osimertinib" | "Erlotinib" | "Gefitinib"
            | "Alectinib" | "Sotorasib" | "Adagrasib" | "Bevacizumab" | "Cetuximab"
            | "Panitumumab" => TargetedTherapy,
            _ => return None,
        };
        Some(category)
    }
}

impl fmt::Display for TreatmentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn prior_treatment_regexes() -> &'static (Regex, Regex, Vec<(TreatmentCategory, Regex)>) {
    static RE: OnceLock<(Regex, Regex, Vec<(TreatmentCategory, Regex)>)> = OnceLock::new();
    RE.get_or_init(|| {
        let cue = Regex::new(
            r"(?i)\b(?:completed|complete|prior|previous(?:ly)?|received|after|following|post|progress\w*|pre-?treated|treated\s+with|pregress[oa]|precedente|dopo|sottopost[oia]|ricevuto|completat[oa]|terminat[oa])\b",
        )
        .expect("treatment cue pattern is valid");
        let negation = Regex::new(r"(?i)\b(?:no|not|without|naive|never|senza|nessun[ao]?|mai)\b")
            .expect("treatment negation pattern is valid");
        use TreatmentCategory::*;
        let categories = [
            (Surgery, r"surgery|surgical|resection|resected|mastectomy|lumpectomy|chirurgi\w*|intervento|resezione"),
            (Chemotherapy, r"chemotherapy|chemo|platinum(?:-based)?|chemioterapia|platino"),
            (Radiotherapy, r"radiotherapy|radiation|radioterapia"),
            (Immunotherapy, r"immunotherapy|checkpoint|anti-pd-?l?1|immunoterapia"),
            (HormoneTherapy, r"endocrine|hormon\w*|aromatase|ormon\w*"),
            (TargetedTherapy, r"targeted|tki|tyrosine\s+kinase|bersaglio"),
        ]
        .into_iter()
        .map(|(category, pattern)| {
            let regex = Regex::new(&format!(r"(?i)\b(?:{pattern})\b"))
                .expect("treatment category pattern is valid");
            (category, regex)
        })
        .collect();
        (cue, negation, categories)
    })
}

/// Treatment categories the inclusion criteria require to have been received.
pub fn required_treatments(inclusions: &[String]) -> Vec<TreatmentCategory> {
    let (cue, negation, categories) = prior_treatment_regexes();
    let mut required = Vec::new();
    for line in inclusions.iter().map(|l| fold(l)) {
        if !cue.is_match(&line) || negation.is_match(&line) {
            continue;
        }
        for (category, regex) in categories {
            if regex.is_match(&line) && !required.contains(category) {
                required.push(*category);
            }
        }
    }
    required
}

// ── Comorbidities ───────────────────────────────────────────────────────────

/// Conditions that interact with most investigational oncology agents.
pub const INTERACTION_WATCH_LIST: &[&str] = &[
    "Type 2 Diabetes",
    "Diabetes",
    "Hypertension",
    "Interstitial Lung Disease",
    "Autoimmune Disease",
    "Heart Failure",
    "Chronic Kidney Disease",
    "Hepatitis B",
    "Hepatitis C",
    "HIV",
    "Lupus",
    "Inflammatory Bowel Disease",
    "Rheumatoid Arthritis",
];

fn condition_synonyms() -> &'static [(&'static str, Regex)] {
    static SYNONYMS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    SYNONYMS.get_or_init(|| {
        let entries: &[(&'static str, &str)] = &[
            ("Type 2 Diabetes", r"diabet\w*"),
            ("Diabetes", r"diabet\w*"),
            ("Hypertension", r"hypertension|ipertensione"),
            ("COPD", r"copd|chronic\s+obstructive|bpco|broncopneumopatia"),
            ("Heart Failure", r"heart\s+failure|cardiac\s+failure|nyha|scompenso\s+cardiaco|insufficienza\s+cardiaca"),
            ("Coronary Artery Disease", r"coronary|myocardial\s+infarction|unstable\s+angina|infarto|cardiopatia\s+ischemica|coronaropatia|angina\s+instabile"),
            ("Atrial Fibrillation", r"atrial\s+fibrillation|arrhythmi\w*|aritmi\w*|fibrillazione"),
            ("Chronic Kidney Disease", r"renal\s+(?:insufficiency|failure|impairment)|kidney\s+disease|insufficienza\s+renale|malattia\s+renale\s+cronica|nefropatia\s+cronica"),
            ("Hepatitis B", r"hepatitis\s+b|hbv|epatite\s+b"),
            ("Hepatitis C", r"hepatitis\s+(?:b\s+or\s+)?c|hcv|epatite\s+(?:b\s+[eo]\s+)?c"),
            ("HIV", r"hiv|human\s+immunodeficiency|immunodeficienza\s+umana"),
            ("Autoimmune Disease", r"autoimmun\w*"),
            ("Lupus", r"lupus|autoimmun\w*"),
            ("Rheumatoid Arthritis", r"rheumatoid|artrite\s+reumatoide|autoimmun\w*"),
            ("Inflammatory Bowel Disease", r"inflammatory\s+bowel|crohn\w*|ulcerative\s+colitis|colite\s+ulcerosa|malattia\s+infiammatoria\s+(?:cronica\s+)?intestinale|mici|autoimmun\w*"),
            ("Interstitial Lung Disease", r"interstitial\s+lung|pneumonitis|pulmonary\s+fibrosis|polmonite|interstiziopatia|fibrosi\s+polmonare"),
            ("Hypothyroidism", r"hypothyroid\w*|thyroid\s+(?:disease|dysfunction)|ipotiroidismo|tiroidite|disfunzione\s+tiroidea"),
        ];
        entries
            .iter()
            .map(|(name, pattern)| {
                let regex = Regex::new(&format!(r"(?i)\b(?:{pattern})\b"))
                    .expect("condition synonym pattern is valid");
                (*name, regex)
            })
            .collect()
    })
}

/// True when `text` names `condition` or one of its synonyms.
pub fn names_condition(text: &str, condition: &str) -> bool {
    let text = fold(text);
    match condition_synonyms().iter().find(|(name, _)| *name == condition) {
        Some((_, regex)) => regex.is_match(&text),
        None => text.to_lowercase().contains(&condition.to_lowercase()),
    }
}

// ── Enrollment ──────────────────────────────────────────────────────────────

/// Recruitment state of a registry status string; `None` when absent.
pub fn is_recruiting(status: Option<&str>) -> Option<bool> {
    let status = status?.trim().to_lowercase();
    if status.is_empty() {
        return None;
    }
    Some(matches!(
        status.as_str(),
        "recruiting" | "enrolling by invitation" | "in arruolamento" | "reclutamento attivo"
    ))
}

// ── Per-trial bundle ────────────────────────────────────────────────────────

/// Everything the rules need from one trial, parsed once.
#[derive(Debug, Clone, Default)]
pub struct TrialCriteria {
    pub sites: Vec<TumourSite>,
    pub accepts_any_tumour: bool,
    pub inclusion_stages: Vec<StageRange>,
    pub inclusion_framing: Option<StageFraming>,
    pub exclusion_stages: Vec<StageRange>,
    pub exclusion_framing: Option<StageFraming>,
    pub inclusion_markers: Vec<Marker>,
    pub exclusion_markers: Vec<Marker>,
    pub thresholds: Vec<Threshold>,
    pub required_treatments: Vec<TreatmentCategory>,
    pub age: Option<AgeRange>,
    pub gender: Option<Gender>,
    pub ecog_max: Option<u8>,
    pub exclusion_text: String,
    pub recruiting: Option<bool>,
    pub limitations: Vec<String>,
}

impl TrialCriteria {
    pub fn parse(trial: &TrialRecord) -> Self {
        let inclusion = fold(&trial.eligibility.inclusion_text());
        let exclusion = fold(&trial.eligibility.exclusion_text());
        let site_text = format!("{}\n{}", trial.title, inclusion);

        Self {
            sites: tumour_sites(&site_text),
            accepts_any_tumour: accepts_any_tumour(&site_text),
            inclusion_stages: stage_ranges(&inclusion),
            inclusion_framing: stage_framing(&inclusion),
            exclusion_stages: stage_ranges(&exclusion),
            exclusion_framing: stage_framing(&exclusion),
            inclusion_markers: criteria_markers(&inclusion),
            exclusion_markers: criteria_markers(&exclusion),
            thresholds: thresholds(&inclusion),
            required_treatments: required_treatments(&trial.eligibility.inclusions),
            age: age_range(&inclusion),
            gender: gender_restriction(&trial.eligibility.inclusions),
            ecog_max: ecog_max(&inclusion),
            exclusion_text: exclusion,
            recruiting: is_recruiting(trial.status.as_deref()),
            limitations: trial.eligibility.limitations.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stage(number: u8, letter: Option<char>) -> StageLevel {
        StageLevel::new(number, letter)
    }

    #[test]
    fn test_sites_in_both_languages() {
        assert_eq!(tumour_sites("HR+/HER2- breast cancer"), vec![TumourSite::Breast]);
        assert_eq!(tumour_sites("Adenocarcinoma polmonare"), vec![TumourSite::Lung]);
        assert_eq!(tumour_sites("metastatic NSCLC"), vec![TumourSite::Lung]);
        assert!(tumour_sites("Adequate liver and renal function").is_empty());
    }

    #[test]
    fn test_generic_tumour_wording() {
        assert!(accepts_any_tumour("Advanced solid tumors with KRAS G12C"));
        assert!(accepts_any_tumour("Tumori solidi avanzati"));
        assert!(!accepts_any_tumour("Breast cancer"));
    }

    #[test]
    fn test_stage_ranges() {
        let ranges = stage_ranges("Stage IIIB-IV disease");
        assert_eq!(ranges, vec![StageRange { low: stage(3, Some('B')), high: stage(4, None) }]);
        assert!(ranges[0].contains(&stage(4, None)));
        assert!(ranges[0].contains(&stage(3, Some('C'))));
        assert!(!ranges[0].contains(&stage(3, Some('A'))));

        let listed = stage_ranges("stadio III o IV");
        assert_eq!(listed, vec![StageRange::single(stage(3, None)), StageRange::single(stage(4, None))]);

        let open = stage_ranges("Stage II or higher");
        assert_eq!(open, vec![StageRange { low: stage(2, None), high: stage(4, None) }]);
    }

    #[test]
    fn test_single_stage_covers_substages() {
        let ranges = stage_ranges("Stage 2");
        assert_eq!(ranges.len(), 1);
        assert!(ranges[0].contains(&stage(2, Some('A'))));
        assert!(!ranges[0].contains(&stage(3, None)));
    }

    #[test]
    fn test_framing() {
        assert_eq!(stage_framing("Locally advanced or metastatic disease"), Some(StageFraming::Advanced));
        assert_eq!(stage_framing("Unresectable disease"), Some(StageFraming::Advanced));
        assert_eq!(stage_framing("Early-stage, resectable tumour"), Some(StageFraming::Early));
        assert_eq!(stage_framing("Non-metastatic disease"), Some(StageFraming::Early));
        assert_eq!(stage_framing("Early or advanced disease"), None);
        assert_eq!(stage_framing("Untreated brain metastases"), None);
    }

    #[test]
    fn test_age_ranges() {
        assert_eq!(age_range("Age 18-75 years"), Some(AgeRange { min: Some(18), max: Some(75) }));
        assert_eq!(age_range("Aged ≥ 18 years"), Some(AgeRange { min: Some(18), max: None }));
        assert_eq!(age_range("18 years of age or older"), Some(AgeRange { min: Some(18), max: None }));
        assert_eq!(age_range("Eta compresa tra 18 e 70 anni"), Some(AgeRange { min: Some(18), max: Some(70) }));
        assert_eq!(age_range("Patients younger than 40 years"), Some(AgeRange { min: None, max: Some(39) }));
        assert_eq!(age_range("ECOG 0-1"), None);
    }

    #[test]
    fn test_durations_are_not_age_limits() {
        assert_eq!(age_range("Adjuvant endocrine therapy for up to 5 years"), None);
        assert_eq!(age_range("Disease-free interval of 1 to 5 years"), None);
        assert_eq!(age_range("Fumatore da 40 anni"), None);
        assert_eq!(
            age_range("Adults 18 to 75 years\nEndocrine therapy for up to 5 years"),
            Some(AgeRange { min: Some(18), max: Some(75) })
        );
    }

    #[test]
    fn test_gender_restriction() {
        let only_women = vec!["Postmenopausal women".to_string()];
        assert_eq!(gender_restriction(&only_women), Some(Gender::Female));
        let both = vec!["Men and women aged 18 or older".to_string()];
        assert_eq!(gender_restriction(&both), None);
        let contraception = vec!["Women of childbearing potential must use contraception".to_string()];
        assert_eq!(gender_restriction(&contraception), None);
        assert_eq!(gender_restriction(&["Uomini con carcinoma prostatico".to_string()]), Some(Gender::Male));
    }

    #[test]
    fn test_ecog_max() {
        assert_eq!(ecog_max("ECOG performance status 0-1"), Some(1));
        assert_eq!(ecog_max("ECOG PS 0, 1 or 2"), Some(2));
        assert_eq!(ecog_max("ECOG ≤ 1"), Some(1));
        assert_eq!(ecog_max("ECOG < 2"), Some(1));
        assert_eq!(ecog_max("Adequate organ function"), None);
        assert_eq!(ecog_grade("ECOG 2"), Some(2));
    }

    #[test]
    fn test_required_treatments() {
        let lines = vec![
            "Completed Surgery".to_string(),
            "Progression after platinum-based chemotherapy".to_string(),
            "No prior immunotherapy".to_string(),
        ];
        assert_eq!(
            required_treatments(&lines),
            vec![TreatmentCategory::Surgery, TreatmentCategory::Chemotherapy]
        );
        assert_eq!(TreatmentCategory::of_treatment("Lumpectomy"), Some(TreatmentCategory::Surgery));
    }

    #[test]
    fn test_condition_synonyms() {
        assert!(names_condition("History of pneumonitis requiring steroids", "Interstitial Lung Disease"));
        assert!(names_condition("Uncontrolled diabetes", "Type 2 Diabetes"));
        assert!(names_condition("Active hepatitis B or C", "Hepatitis C"));
        assert!(!names_condition("Active infection", "HIV"));
        assert!(names_condition("Severe asthma", "Asthma"));
    }

    #[test]
    fn test_italian_exclusion_wording() {
        assert!(names_condition("Malattia infiammatoria intestinale", "Inflammatory Bowel Disease"));
        assert!(names_condition("Malattia infiammatoria cronica intestinale attiva", "Inflammatory Bowel Disease"));
        assert!(names_condition("Malattia renale cronica", "Chronic Kidney Disease"));
        assert!(names_condition("Infezione da virus dell'immunodeficienza umana", "HIV"));
        assert!(names_condition("Scompenso cardiaco non controllato", "Heart Failure"));
        assert!(names_condition("Storia di polmonite interstiziale", "Interstitial Lung Disease"));
    }

    #[test]
    fn test_recruiting_status() {
        assert_eq!(is_recruiting(Some("Recruiting")), Some(true));
        assert_eq!(is_recruiting(Some("Active, not recruiting")), Some(false));
        assert_eq!(is_recruiting(None), None);
    }
}
