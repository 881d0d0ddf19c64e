//! Cancer stage notation: Roman/Arabic numerals, TNM codes and framing.
//!
//! Shared by the extractor (to canonicalize "stadio IIIA" into "Stage 3A")
//! and by trial scoring (to compare patient stages against criteria text).

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Numeric stage with an optional sub-stage letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StageLevel {
    pub number: u8,
    pub letter: Option<char>,
}

impl StageLevel {
    pub fn new(number: u8, letter: Option<char>) -> Self {
        Self {
            number,
            letter: letter.map(|c| c.to_ascii_uppercase()),
        }
    }

    /// Parse a numeral ("IIIA", "3a", "0") into a level.
    pub fn from_numeral(numeral: &str) -> Option<Self> {
        let numeral = numeral.trim();
        let (digits, letter) = match numeral.char_indices().last() {
            Some((i, c)) if matches!(c.to_ascii_uppercase(), 'A' | 'B' | 'C') && i > 0 => {
                (&numeral[..i], Some(c))
            }
            _ => (numeral, None),
        };
        Some(Self::new(numeral_value(digits)?, letter))
    }

    /// True when `other` is this level or one of its sub-stages
    /// ("Stage 3" covers "Stage 3B").
    pub fn covers(&self, other: &StageLevel) -> bool {
        self.number == other.number && (self.letter.is_none() || self.letter == other.letter)
    }

    pub fn framing(&self) -> StageFraming {
        if self.number >= 3 {
            StageFraming::Advanced
        } else {
            StageFraming::Early
        }
    }
}

impl fmt::Display for StageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stage {}", self.number)?;
        if let Some(letter) = self.letter {
            write!(f, "{letter}")?;
        }
        Ok(())
    }
}

/// Coarse disease extent used when criteria speak in words rather than stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageFraming {
    Early,
    Advanced,
}

impl StageFraming {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageFraming::Early => "early",
            StageFraming::Advanced => "advanced",
        }
    }
}

/// Value of a Roman (0, I..IV) or Arabic (0..4) stage numeral.
pub fn numeral_value(numeral: &str) -> Option<u8> {
    match numeral.trim().to_ascii_uppercase().as_str() {
        "0" => Some(0),
        "I" | "1" => Some(1),
        "II" | "2" => Some(2),
        "III" | "3" => Some(3),
        "IV" | "4" => Some(4),
        _ => None,
    }
}

/// Canonical stage label, e.g. `canonical_stage("IIIa")` is `"Stage 3A"`.
pub fn canonical_stage(numeral: &str) -> Option<String> {
    StageLevel::from_numeral(numeral).map(|level| level.to_string())
}

fn stage_value_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:stage|stadio)\s+(IV|I{1,3}|[0-4])([ABC])?\s*$")
            .expect("stage value pattern is valid")
    })
}

fn tnm_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[cpy]{0,2}T(is|x|[0-4])[a-d]?N(x|[0-3])[a-c]?M(x|[01])[a-c]?$")
            .expect("TNM pattern is valid")
    })
}

/// Parse a stage value such as "Stage 3A" or "stadio IIIA".
pub fn parse_stage(value: &str) -> Option<StageLevel> {
    let caps = stage_value_regex().captures(value)?;
    let letter = caps.get(2).and_then(|m| m.as_str().chars().next());
    Some(StageLevel::new(numeral_value(&caps[1])?, letter))
}

/// True for compact TNM codes such as "pT2N0M0".
pub fn is_tnm(value: &str) -> bool {
    tnm_regex().is_match(value.trim())
}

/// Extent implied by any stage value the extractor can produce.
///
/// Numeric stages 3 and 4 are advanced; TNM codes are advanced with distant
/// metastasis, T4 or N2+; descriptive values map directly.
pub fn framing_of(value: &str) -> Option<StageFraming> {
    if let Some(level) = parse_stage(value) {
        return Some(level.framing());
    }
    let value = value.trim();
    if let Some(caps) = tnm_regex().captures(value) {
        let advanced = &caps[3] == "1" || &caps[1] == "4" || matches!(&caps[2], "2" | "3");
        return Some(if advanced {
            StageFraming::Advanced
        } else {
            StageFraming::Early
        });
    }
    match value.to_ascii_lowercase().as_str() {
        "metastatic" | "locally advanced" | "advanced" => Some(StageFraming::Advanced),
        "early" | "localized" => Some(StageFraming::Early),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_stage() {
        assert_eq!(canonical_stage("IIIa").as_deref(), Some("Stage 3A"));
        assert_eq!(canonical_stage("IV").as_deref(), Some("Stage 4"));
        assert_eq!(canonical_stage("2").as_deref(), Some("Stage 2"));
        assert_eq!(canonical_stage("0").as_deref(), Some("Stage 0"));
        assert_eq!(canonical_stage("V"), None);
    }

    #[test]
    fn test_parse_stage_both_languages() {
        assert_eq!(parse_stage("Stage 3A"), Some(StageLevel::new(3, Some('A'))));
        assert_eq!(parse_stage("stadio IIB"), Some(StageLevel::new(2, Some('B'))));
        assert_eq!(parse_stage("Metastatic"), None);
    }

    #[test]
    fn test_covers_sub_stages() {
        let three = StageLevel::new(3, None);
        assert!(three.covers(&StageLevel::new(3, Some('B'))));
        assert!(!StageLevel::new(3, Some('A')).covers(&StageLevel::new(3, Some('B'))));
        assert!(!three.covers(&StageLevel::new(4, None)));
    }

    #[test]
    fn test_tnm_detection_and_framing() {
        assert!(is_tnm("pT2N0M0"));
        assert!(is_tnm("T1cN1aM0"));
        assert!(!is_tnm("Stage 2"));
        assert_eq!(framing_of("pT2N0M0"), Some(StageFraming::Early));
        assert_eq!(framing_of("T2N1M1"), Some(StageFraming::Advanced));
        assert_eq!(framing_of("T4N0M0"), Some(StageFraming::Advanced));
        assert_eq!(framing_of("Metastatic"), Some(StageFraming::Advanced));
        assert_eq!(framing_of("Stage 1B"), Some(StageFraming::Early));
        assert_eq!(framing_of("unknown"), None);
    }
}
