//! Biomarker parsing for scoring.
//!
//! Patient markers come from the joined `subtype` profile field ("HR+/HER2-,
//! PD-L1 60%, KRAS G12C"); trial markers come from free criteria text. Both
//! sides are reduced to [`Marker`] so they can be compared by name, polarity
//! and variant.

use std::fmt;
use std::sync::OnceLock;

use medmatch_common::split_list;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    fn sign(&self) -> char {
        match self {
            Polarity::Positive => '+',
            Polarity::Negative => '-',
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Canonical marker name ("HER2", "PD-L1", "KRAS").
    pub name: String,
    pub polarity: Option<Polarity>,
    /// Protein change or exon alteration ("G12C", "exon 19 deletion").
    pub variant: Option<String>,
    /// Numeric measurement (percent or mut/Mb).
    pub value: Option<f64>,
}

impl Marker {
    pub fn new(name: impl Into<String>, polarity: Option<Polarity>) -> Self {
        Self {
            name: name.into(),
            polarity,
            variant: None,
            value: None,
        }
    }

    fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    /// True when both sides refer to the same marker. "HR" stands for either
    /// hormone receptor.
    pub fn same_marker(&self, other: &Marker) -> bool {
        let hormone = |name: &str| matches!(name, "ER" | "PR");
        self.name == other.name
            || (self.name == "HR" && hormone(&other.name))
            || (other.name == "HR" && hormone(&self.name))
    }

    /// True when `other` (a patient marker) satisfies this criterion marker.
    /// Missing polarity or variant on either side does not disqualify.
    pub fn compatible_with(&self, other: &Marker) -> bool {
        if !self.same_marker(other) {
            return false;
        }
        let polarity = match (self.polarity, other.polarity) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        };
        let variant = match (&self.variant, &other.variant) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => true,
        };
        polarity && variant
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(variant) = &self.variant {
            write!(f, " {variant}")?;
        }
        if let Some(value) = self.value {
            write!(f, " {value}")?;
        }
        if let Some(polarity) = self.polarity {
            write!(f, "{}", polarity.sign())?;
        }
        Ok(())
    }
}

/// Canonical name of a marker mention, plus the polarity the name itself
/// implies ("MSS" is microsatellite-stable, i.e. not MSI-H).
fn canonical(raw: &str) -> (String, Option<Polarity>) {
    let lower = raw.trim().to_lowercase();
    let lower = lower.split_whitespace().collect::<Vec<_>>().join(" ");
    let name = match lower.as_str() {
        "er" | "estrogen receptor" | "recettori estrogenici" => "ER",
        "pr" | "pgr" | "progesterone receptor" | "recettori progestinici" => "PR",
        "hr" | "hormone receptor" | "recettori ormonali" => "HR",
        "her2" | "her-2" | "erbb2" => "HER2",
        "pd-l1" | "pdl1" => "PD-L1",
        "ki-67" | "ki67" => "Ki-67",
        "tmb" => "TMB",
        "tmb-h" => return ("TMB".to_string(), Some(Polarity::Positive)),
        "msi-h" | "msi" | "microsatellite instability" | "microsatellite instability-high" => {
            return ("MSI-H".to_string(), Some(Polarity::Positive))
        }
        "msi-l" | "mss" => return ("MSI-H".to_string(), Some(Polarity::Negative)),
        "dmmr" => return ("dMMR".to_string(), Some(Polarity::Positive)),
        "pmmr" => return ("dMMR".to_string(), Some(Polarity::Negative)),
        _ => return (raw.trim().to_uppercase(), None),
    };
    (name.to_string(), None)
}

fn status_polarity(word: &str) -> Option<Polarity> {
    let word = word.to_lowercase();
    let word = word.trim_start_matches('-');
    match word {
        "+" | "high" => Some(Polarity::Positive),
        "-" | "wild-type" | "negative" => Some(Polarity::Negative),
        w if w.starts_with("positiv")
            || w.starts_with("mutat")
            || w.starts_with("amplif")
            || w.starts_with("fusion")
            || w.starts_with("rearrang") =>
        {
            Some(Polarity::Positive)
        }
        w if w.starts_with("negativ") || w.starts_with("wild") => Some(Polarity::Negative),
        _ => None,
    }
}

fn variant_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:p\.)?([ACDEFGHIKLMNPQRSTVWY]\d{1,4}(?:[ACDEFGHIKLMNPQRSTVWY]|fs))$|^(exon \d{1,2}(?: \w+)?)$")
            .expect("variant pattern is valid")
    })
}

/// Parse the `subtype` profile field into markers.
pub fn patient_markers(subtype: &str) -> Vec<Marker> {
    let mut markers = Vec::new();
    for item in split_list(subtype) {
        if item.eq_ignore_ascii_case("Triple-Negative") {
            for name in ["ER", "PR", "HER2"] {
                markers.push(Marker::new(name, Some(Polarity::Negative)));
            }
            continue;
        }
        if item.contains('/') {
            markers.extend(item.split('/').filter_map(receptor_token));
            continue;
        }
        if let Some(marker) = receptor_token(item).or_else(|| described_marker(item)) {
            markers.push(marker);
        }
    }
    markers
}

/// "ER+", "HER2-": a name directly followed by a sign.
fn receptor_token(token: &str) -> Option<Marker> {
    let token = token.trim();
    let sign = token.chars().last()?;
    let polarity = match sign {
        '+' => Polarity::Positive,
        '-' => Polarity::Negative,
        _ => return None,
    };
    let name = token[..token.len() - 1].trim();
    if name.is_empty() || name.contains(' ') {
        return None;
    }
    let (name, _) = canonical(name);
    Some(Marker::new(name, Some(polarity)))
}

/// "PD-L1 60%", "KRAS G12C", "EGFR exon 19 deletion", "ALK negative",
/// "HER2 3+", "TMB 12 mut/Mb", "MSI-H".
fn described_marker(item: &str) -> Option<Marker> {
    let (head, rest) = item.split_once(' ').unwrap_or((item, ""));
    let (name, implied) = canonical(head);
    let rest = rest.trim();
    let marker = Marker::new(name, implied);

    if rest.is_empty() {
        return Some(marker);
    }
    if let Some(number) = rest.strip_suffix('%').or_else(|| rest.strip_suffix("mut/Mb")) {
        let value = number.trim().replace(',', ".").parse().ok()?;
        return Some(marker.with_value(value));
    }
    if marker.name == "HER2" {
        // IHC score: 3+ is positive, 2+ equivocal, 0/1+ negative.
        let polarity = match rest {
            "3+" => Some(Polarity::Positive),
            "2+" => None,
            "0+" | "1+" => Some(Polarity::Negative),
            _ => status_polarity(rest),
        };
        return Some(Marker { polarity, ..marker });
    }
    if variant_regex().is_match(rest) {
        return Some(Marker {
            polarity: Some(Polarity::Positive),
            ..marker.with_variant(rest)
        });
    }
    Some(Marker {
        polarity: status_polarity(rest).or(marker.polarity),
        ..marker
    })
}

fn mention_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Symbols are case-sensitive ("MET" is a gene, "met" is a verb).
        Regex::new(
            r"\b(?:(?i:(estrogen\s+receptor|progesterone\s+receptor|hormone\s+receptor|recettori\s+(?:estrogenici|progestinici|ormonali)|microsatellite\s+instability(?:-high)?|tripl[eo][-\s]negativ[eoa]|ki-?67|pd-?l1|her-?2))|(ER|PR|PgR|HR|ERBB2|MSI-H|MSI-L|MSI|MSS|[dp]MMR|TMB-H|TMB|KRAS|NRAS|BRAF|EGFR|ALK|ROS1|RET|MET|NTRK[1-3]?|BRCA[12]?|PIK3CA|IDH[12]|FGFR[1-4]?|KIT))\b",
        )
        .expect("marker mention pattern is valid")
    })
}

fn trailing_status_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*(?:(?:p\.)?([ACDEFGHIKLMNPQRSTVWY]\d{1,4}(?:[ACDEFGHIKLMNPQRSTVWY]|fs))\b|(exon\s*\d{1,2}(?:\s+(?:deletion|insertion|skipping))?))?[\s-]*(?:[a-z]+\s+){0,2}?(?:(\+|positiv[eoi]|mutat\w*|mutant|mutations?|alterations?|altered|amplif\w*|fusions?|rearrange\w*|riarrang\w*|overexpress\w*|high|alt[oa]|deficient)|(-|negativ[eoi]|wild[-\s]?type|wt|non[-\s]?mutat\w*|proficient|stable))",
        )
        .expect("trailing marker status pattern is valid")
    })
}

fn leading_status_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:\b(negative\s+for|no|without|absence\s+of|assenza\s+di|senza|wild[-\s]?type)|\b(positive\s+for|harbou?ring|carrying|presence\s+of|presenza\s+di|portatori\s+di))\s+(?:\S+\s+)?$",
        )
        .expect("leading marker status pattern is valid")
    })
}

fn therapy_regexes() -> &'static (Regex, Regex) {
    static RE: OnceLock<(Regex, Regex)> = OnceLock::new();
    RE.get_or_init(|| {
        let after = Regex::new(
            r"(?i)^[\s-]*(?:[\w/-]+\s+){0,2}?(?:inhibitors?|tkis?|therap\w*|treatments?|agents?|targeted|targeting|directed|antibod\w*|inibitor\w*|terapi[ae])\b",
        )
        .expect("therapy reference pattern is valid");
        let before = Regex::new(
            r"(?i)(?:\b(?:prior|previous|precedente|pregress[oa])(?:\s+(?:treatment|therapy|trattamento|terapia)\s+(?:with|con))?(?:\s+(?:a|an|the|any|un[ao]?))?|\banti)[\s-]*$",
        )
        .expect("prior therapy pattern is valid");
        (after, before)
    })
}

/// True when a marker mention names a drug class or earlier treatment
/// ("prior EGFR TKI", "anti-HER2 therapy") rather than a tumour status.
fn is_therapy_reference(before: &str, after: &str) -> bool {
    let (after_re, before_re) = therapy_regexes();
    after_re.is_match(after) || before_re.is_match(before)
}

/// Every marker mentioned in criteria text, with the polarity and variant
/// stated next to it. Mentions of a marker-targeted treatment are skipped.
pub fn criteria_markers(text: &str) -> Vec<Marker> {
    let mut markers = Vec::new();
    for caps in mention_regex().captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let raw = whole.as_str();
        if caps.get(1).is_some_and(|m| {
            let lower = m.as_str().to_lowercase();
            lower.starts_with("tripl")
        }) {
            for name in ["ER", "PR", "HER2"] {
                markers.push(Marker::new(name, Some(Polarity::Negative)));
            }
            continue;
        }

        let (name, implied) = canonical(raw);
        let mut marker = Marker::new(name, implied);

        let line_start = text[..whole.start()].rfind('\n').map_or(0, |i| i + 1);
        let line_end = text[whole.end()..]
            .find(|c: char| matches!(c, '\n' | ';' | ','))
            .map_or(text.len(), |i| whole.end() + i);
        let before = &text[line_start..whole.start()];
        let after = &text[whole.end()..line_end];
        if is_therapy_reference(before, after) {
            continue;
        }

        if let Some(status) = trailing_status_regex().captures(after) {
            if let Some(variant) = status.get(1).or_else(|| status.get(2)) {
                marker.variant = Some(variant.as_str().to_string());
            }
            if status.get(3).is_some() {
                marker.polarity = Some(Polarity::Positive);
            } else if status.get(4).is_some() {
                marker.polarity = Some(Polarity::Negative);
            }
        }
        if let Some(status) = leading_status_regex().captures(before) {
            if status.get(1).is_some() {
                marker.polarity = Some(Polarity::Negative);
            } else if marker.polarity.is_none() {
                marker.polarity = Some(Polarity::Positive);
            }
        }
        if marker.variant.is_some() && marker.polarity.is_none() {
            marker.polarity = Some(Polarity::Positive);
        }
        markers.push(marker);
    }
    markers
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
}

impl Comparison {
    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            ">" => Some(Comparison::Gt),
            ">=" | "=>" => Some(Comparison::Ge),
            "<" => Some(Comparison::Lt),
            "<=" | "=<" => Some(Comparison::Le),
            "=" => Some(Comparison::Eq),
            _ => None,
        }
    }

    pub fn holds(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparison::Gt => lhs > rhs,
            Comparison::Ge => lhs >= rhs,
            Comparison::Lt => lhs < rhs,
            Comparison::Le => lhs <= rhs,
            Comparison::Eq => (lhs - rhs).abs() < f64::EPSILON,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Eq => "=",
        }
    }
}

/// A numeric cut-off on a marker, e.g. "PD-L1 >= 50%".
#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    pub marker: String,
    pub comparison: Comparison,
    pub value: f64,
}

impl Threshold {
    pub fn is_met_by(&self, measured: f64) -> bool {
        self.comparison.holds(measured, self.value)
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = if self.marker == "TMB" { " mut/Mb" } else { "%" };
        write!(f, "{} {} {}{unit}", self.marker, self.comparison.symbol(), self.value)
    }
}

fn symbolic_threshold_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(pd-?l1|ki-?67|tmb)\b[^<>=\d\n;]{0,30}?(?:(>=|=>|<=|=<|>|<|=)|(at\s+least|greater\s+than\s+or\s+equal\s+to|equal\s+to\s+or\s+greater\s+than|almeno|maggiore\s+o\s+uguale\s+a|superiore\s+o\s+uguale\s+a)|(greater\s+than|more\s+than|higher\s+than|above|over|superiore\s+a|maggiore\s+di)|(less\s+than|lower\s+than|below|under|inferiore\s+a|minore\s+di))\s*(\d{1,3}(?:[.,]\d+)?)",
        )
        .expect("threshold pattern is valid")
    })
}

fn trailing_threshold_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(pd-?l1|ki-?67|tmb)\b[^<>=\d\n;]{0,30}?(\d{1,3}(?:[.,]\d+)?)\s*(?:%|mut/mb)?\s*(?:(or\s+(?:higher|greater|more|above)|o\s+(?:superiore|piu))|(or\s+(?:lower|less|below)|o\s+(?:inferiore|meno)))",
        )
        .expect("trailing threshold pattern is valid")
    })
}

fn number(raw: &str) -> Option<f64> {
    raw.replace(',', ".").parse().ok()
}

/// Numeric cut-offs stated in criteria text.
pub fn thresholds(text: &str) -> Vec<Threshold> {
    let mut found: Vec<(usize, Threshold)> = Vec::new();
    for caps in symbolic_threshold_regex().captures_iter(text) {
        let comparison = if let Some(symbol) = caps.get(2) {
            Comparison::from_symbol(symbol.as_str())
        } else if caps.get(3).is_some() {
            Some(Comparison::Ge)
        } else if caps.get(4).is_some() {
            Some(Comparison::Gt)
        } else {
            Some(Comparison::Lt)
        };
        let (Some(comparison), Some(value)) = (comparison, number(&caps[6])) else {
            continue;
        };
        let start = caps.get(0).map_or(0, |m| m.start());
        found.push((
            start,
            Threshold {
                marker: canonical(&caps[1]).0,
                comparison,
                value,
            },
        ));
    }
    for caps in trailing_threshold_regex().captures_iter(text) {
        let start = caps.get(0).map_or(0, |m| m.start());
        if found.iter().any(|(s, _)| *s == start) {
            continue;
        }
        let comparison = if caps.get(3).is_some() {
            Comparison::Ge
        } else {
            Comparison::Le
        };
        let Some(value) = number(&caps[2]) else { continue };
        found.push((
            start,
            Threshold {
                marker: canonical(&caps[1]).0,
                comparison,
                value,
            },
        ));
    }
    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, threshold)| threshold).collect()
}
