//! Age, gender and date rules.

use chrono::NaiveDate;
use medmatch_common::{EntityType, Language};
use regex::Captures;

use super::{PatternRule, ValueTemplate};

use EntityType::{Age, Date, Gender};
use Language::{Any, En, It};

const MAX_AGE: u32 = 120;

pub(super) fn age_rules() -> Vec<PatternRule> {
    vec![
        PatternRule::new(
            Age,
            En,
            r"(?i)\b(\d{1,3})[-\s]?(?:years?|yrs?)[-\s]?old\b",
            ValueTemplate::Derive(numeric_age),
        ),
        PatternRule::new(
            Age,
            En,
            r"(?i)\b(?:aged?|age\s*:)\s*(\d{1,3})\b",
            ValueTemplate::Derive(numeric_age),
        ),
        PatternRule::new(
            Age,
            En,
            r"(?i)\b(twenty|thirty|forty|fifty|sixty|seventy|eighty|ninety)(?:[-\s](one|two|three|four|five|six|seven|eight|nine))?[-\s]years?[-\s]old\b",
            ValueTemplate::Derive(english_words_age),
        ),
        // "di 67 anni", but not "per 5 anni" or "3 anni fa"
        PatternRule::new(
            Age,
            It,
            r"(?i)\b(?:(da|per|dopo|entro|ogni)\s+)?(\d{1,3})\s*anni\b(\s+fa\b)?",
            ValueTemplate::Derive(italian_years_age),
        )
        .anchored(2),
        PatternRule::new(
            Age,
            It,
            r"(?i)\beta\s*:?\s*(\d{1,3})\b",
            ValueTemplate::Derive(numeric_age),
        ),
        PatternRule::new(
            Age,
            It,
            r"(?i)\bdi\s+anni\s+(\d{1,3})\b",
            ValueTemplate::Derive(numeric_age),
        ),
        PatternRule::new(
            Age,
            It,
            r"(?i)\b(\d{1,3})\s*-?\s*enne\b",
            ValueTemplate::Derive(numeric_age),
        ),
        PatternRule::new(
            Age,
            It,
            r"(?i)\b(vent|trent|quarant|cinquant|sessant|settant|ottant|novant)[ai]?(un|du|tre|quattr|cinqu|sei|sett|ott|nov)?enne\b",
            ValueTemplate::Derive(italian_words_age),
        ),
    ]
}

fn bounded_age(years: u32) -> Option<String> {
    (years <= MAX_AGE).then(|| years.to_string())
}

fn numeric_age(caps: &Captures<'_>) -> Option<String> {
    bounded_age(caps.get(1)?.as_str().parse().ok()?)
}

fn italian_years_age(caps: &Captures<'_>) -> Option<String> {
    if caps.get(1).is_some() || caps.get(3).is_some() {
        return None;
    }
    bounded_age(caps.get(2)?.as_str().parse().ok()?)
}

fn english_words_age(caps: &Captures<'_>) -> Option<String> {
    let tens = match caps.get(1)?.as_str().to_lowercase().as_str() {
        "twenty" => 20,
        "thirty" => 30,
        "forty" => 40,
        "fifty" => 50,
        "sixty" => 60,
        "seventy" => 70,
        "eighty" => 80,
        "ninety" => 90,
        _ => return None,
    };
    let units = match caps.get(2).map(|m| m.as_str().to_lowercase()) {
        None => 0,
        Some(unit) => match unit.as_str() {
            "one" => 1,
            "two" => 2,
            "three" => 3,
            "four" => 4,
            "five" => 5,
            "six" => 6,
            "seven" => 7,
            "eight" => 8,
            "nine" => 9,
            _ => return None,
        },
    };
    bounded_age(tens + units)
}

/// "sessantottenne" -> 68, "cinquantenne" -> 50.
fn italian_words_age(caps: &Captures<'_>) -> Option<String> {
    let tens = match caps.get(1)?.as_str().to_lowercase().as_str() {
        "vent" => 20,
        "trent" => 30,
        "quarant" => 40,
        "cinquant" => 50,
        "sessant" => 60,
        "settant" => 70,
        "ottant" => 80,
        "novant" => 90,
        _ => return None,
    };
    let units = match caps.get(2).map(|m| m.as_str().to_lowercase()) {
        None => 0,
        Some(unit) => match unit.as_str() {
            "un" => 1,
            "du" => 2,
            "tre" => 3,
            "quattr" => 4,
            "cinqu" => 5,
            "sei" => 6,
            "sett" => 7,
            "ott" => 8,
            "nov" => 9,
            _ => return None,
        },
    };
    bounded_age(tens + units)
}

pub(super) fn gender_rules() -> Vec<PatternRule> {
    vec![
        PatternRule::new(
            Gender,
            En,
            r"(?i)\b(female|woman|lady|girl|male|man|gentleman|boy)\b",
            ValueTemplate::Derive(gender_word),
        ),
        PatternRule::new(
            Gender,
            En,
            r"(?i)\b(?:sex|gender)\s*:?\s*(f|m|female|male)\b",
            ValueTemplate::Derive(gender_word),
        ),
        PatternRule::new(
            Gender,
            En,
            r"\b(Mrs|Ms|Miss|Mr)\.?\s+[A-Z]",
            ValueTemplate::Derive(gender_word),
        ),
        PatternRule::new(
            Gender,
            It,
            r"(?i)\b(donna|signora|signorina|femmina|uomo|signore?|maschio)\b",
            ValueTemplate::Derive(gender_word),
        ),
        PatternRule::new(
            Gender,
            It,
            r"(?i)\bsesso\s*:?\s*(f|m|femminile|maschile)\b",
            ValueTemplate::Derive(gender_word),
        ),
        PatternRule::new(
            Gender,
            It,
            r"(?i)\b(la|una|della|alla|dalla|il|un|del|al|dal)\s+paziente\b",
            ValueTemplate::Derive(gendered_article),
        ),
        PatternRule::new(
            Gender,
            It,
            r"(?i)\bnat([oa])\s+(?:il|a|nel|in)\b",
            ValueTemplate::Derive(gendered_suffix),
        ),
        PatternRule::new(
            Gender,
            It,
            r"(?i)\b(?:sottopost|operat|trattat|ricoverat|affett|giunt)([oa])\b",
            ValueTemplate::Derive(gendered_suffix),
        ),
    ]
}

fn gender_word(caps: &Captures<'_>) -> Option<String> {
    let value = match caps.get(1)?.as_str().to_lowercase().as_str() {
        "female" | "woman" | "lady" | "girl" | "f" | "mrs" | "ms" | "miss" | "donna" | "signora"
        | "signorina" | "femmina" | "femminile" => "Female",
        "male" | "man" | "gentleman" | "boy" | "m" | "mr" | "uomo" | "signor" | "signore"
        | "maschio" | "maschile" => "Male",
        _ => return None,
    };
    Some(value.to_string())
}

fn gendered_article(caps: &Captures<'_>) -> Option<String> {
    let article = caps.get(1)?.as_str().to_lowercase();
    Some(if article.ends_with('a') { "Female" } else { "Male" }.to_string())
}

fn gendered_suffix(caps: &Captures<'_>) -> Option<String> {
    let suffix = caps.get(1)?.as_str().to_lowercase();
    Some(if suffix == "a" { "Female" } else { "Male" }.to_string())
}

const EN_MONTHS: &str = r"January|February|March|April|May|June|July|August|September|October|November|December|Jan|Feb|Mar|Apr|Jun|Jul|Aug|Sept|Sep|Oct|Nov|Dec";
const IT_MONTHS: &str =
    r"gennaio|febbraio|marzo|aprile|maggio|giugno|luglio|agosto|settembre|ottobre|novembre|dicembre";

pub(super) fn date_rules() -> Vec<PatternRule> {
    vec![
        PatternRule::new(
            Date,
            Any,
            r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b",
            ValueTemplate::Derive(iso_date),
        ),
        PatternRule::new(
            Date,
            Any,
            r"\b(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4}|\d{2})\b",
            ValueTemplate::Derive(day_month_year),
        ),
        PatternRule::new(
            Date,
            En,
            &format!(
                r"(?i)\b(?:(\d{{1,2}})(?:st|nd|rd|th)?\s+)?({EN_MONTHS})\.?\s+(?:(\d{{1,2}})(?:st|nd|rd|th)?,?\s+)?(\d{{4}})\b"
            ),
            ValueTemplate::Derive(english_month_date),
        ),
        PatternRule::new(
            Date,
            It,
            &format!(r"(?i)\b(?:(\d{{1,2}})\s+)?({IT_MONTHS})\s+(?:del\s+)?(\d{{4}})\b"),
            ValueTemplate::Derive(italian_month_date),
        ),
        PatternRule::new(
            Date,
            Any,
            r"(?:^|[^/\d.\-])(\d{1,2})/(\d{4})\b",
            ValueTemplate::Derive(month_year),
        )
        .anchored(1),
        PatternRule::new(
            Date,
            En,
            r"(?i)\b(?:in|since|during|from)\s+((?:19|20)\d{2})\b",
            ValueTemplate::Derive(year_only),
        )
        .anchored(1),
        PatternRule::new(
            Date,
            It,
            r"(?i)\b(?:nel|dal|del|a\s+partire\s+dal)\s+((?:19|20)\d{2})\b",
            ValueTemplate::Derive(year_only),
        )
        .anchored(1),
    ]
}

fn number(caps: &Captures<'_>, group: usize) -> Option<u32> {
    caps.get(group)?.as_str().parse().ok()
}

fn full_year(year: u32) -> u32 {
    match year {
        0..=49 => 2000 + year,
        50..=99 => 1900 + year,
        _ => year,
    }
}

fn format_day(year: u32, month: u32, day: u32) -> Option<String> {
    let date = NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)?;
    Some(date.format("%Y-%m-%d").to_string())
}

fn format_month(year: u32, month: u32) -> Option<String> {
    let date = NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, 1)?;
    Some(date.format("%Y-%m").to_string())
}

fn iso_date(caps: &Captures<'_>) -> Option<String> {
    format_day(number(caps, 1)?, number(caps, 2)?, number(caps, 3)?)
}

/// Day-first, unless only the month-first reading is a real date.
fn day_month_year(caps: &Captures<'_>) -> Option<String> {
    let (first, second) = (number(caps, 1)?, number(caps, 2)?);
    let year = full_year(number(caps, 3)?);
    format_day(year, second, first).or_else(|| format_day(year, first, second))
}

fn month_number(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    let month = match name.get(..3)? {
        "jan" | "gen" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" | "mag" => 5,
        "jun" | "giu" => 6,
        "jul" | "lug" => 7,
        "aug" | "ago" => 8,
        "sep" | "set" => 9,
        "oct" | "ott" => 10,
        "nov" => 11,
        "dec" | "dic" => 12,
        _ => return None,
    };
    Some(month)
}

fn english_month_date(caps: &Captures<'_>) -> Option<String> {
    let month = month_number(caps.get(2)?.as_str())?;
    let year = number(caps, 4)?;
    match number(caps, 1).or_else(|| number(caps, 3)) {
        Some(day) => format_day(year, month, day),
        None => format_month(year, month),
    }
}

fn italian_month_date(caps: &Captures<'_>) -> Option<String> {
    let month = month_number(caps.get(2)?.as_str())?;
    let year = number(caps, 3)?;
    match number(caps, 1) {
        Some(day) => format_day(year, month, day),
        None => format_month(year, month),
    }
}

fn month_year(caps: &Captures<'_>) -> Option<String> {
    format_month(number(caps, 2)?, number(caps, 1)?)
}

fn year_only(caps: &Captures<'_>) -> Option<String> {
    Some(caps.get(1)?.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_all(rules: &[PatternRule], text: &str) -> Vec<String> {
        rules
            .iter()
            .flat_map(|rule| {
                rule.pattern
                    .captures_iter(text)
                    .filter_map(|caps| rule.value.render(&caps))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    #[test]
    fn test_age_out_of_range_is_rejected() {
        assert!(render_all(&age_rules(), "a 150-year-old tree").is_empty());
        assert_eq!(render_all(&age_rules(), "72-year-old"), vec!["72"]);
    }

    #[test]
    fn test_italian_age_idioms() {
        assert_eq!(render_all(&age_rules(), "uomo 65enne"), vec!["65"]);
        assert_eq!(render_all(&age_rules(), "eta: 59"), vec!["59"]);
        assert_eq!(render_all(&age_rules(), "ottantaduenne"), vec!["82"]);
    }

    #[test]
    fn test_gender_cues() {
        assert_eq!(render_all(&gender_rules(), "Mrs. Smith"), vec!["Female"]);
        assert_eq!(render_all(&gender_rules(), "il paziente"), vec!["Male"]);
        assert_eq!(render_all(&gender_rules(), "nata il"), vec!["Female"]);
        assert_eq!(render_all(&gender_rules(), "Sex: M"), vec!["Male"]);
    }

    #[test]
    fn test_month_year_is_not_taken_from_full_dates() {
        assert_eq!(render_all(&date_rules(), "il 05/11/2020"), vec!["2020-11-05"]);
        assert_eq!(render_all(&date_rules(), "dal 11/2020"), vec!["2020-11"]);
    }

    #[test]
    fn test_year_only_and_two_digit_years() {
        assert_eq!(render_all(&date_rules(), "since 2018"), vec!["2018"]);
        assert_eq!(render_all(&date_rules(), "on 3.4.19"), vec!["2019-04-03"]);
        assert_eq!(render_all(&date_rules(), "on 03/25/2021"), vec!["2021-03-25"]);
    }
}
