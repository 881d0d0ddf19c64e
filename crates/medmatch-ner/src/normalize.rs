//! Text normalization and sentence segmentation.
//!
//! Narratives are folded to a matching-friendly form before any pattern runs:
//! diacritics are stripped (NFD, combining marks dropped), typographic quotes,
//! dashes and comparison signs are mapped to ASCII, and clinical shorthand is
//! expanded via an Aho-Corasick table. Every byte of the normalized text keeps
//! a back-reference to the character of the original text it came from, so
//! entity positions and context windows always refer to the caller's input.

use aho_corasick::{AhoCorasick, MatchKind};
use unicode_normalization::char::{decompose_canonical, is_combining_mark};

/// Shorthand found in EN/IT clinical notes, keyed in folded lowercase form.
///
/// Ambiguous tokens (`dx`/`sx` are "right"/"left" in Italian) are only
/// expanded in an unambiguous spelling.
const BILINGUAL_ABBREVIATIONS: &[(&str, &str)] = &[
    // English
    ("pt", "patient"),
    ("pts", "patients"),
    ("dx:", "diagnosis:"),
    ("hx", "history"),
    ("h/o", "history of"),
    ("s/p", "status post"),
    ("y/o", "years old"),
    ("y.o.", "years old"),
    ("yo", "years old"),
    ("yrs", "years"),
    ("tx", "treatment"),
    ("chemo", "chemotherapy"),
    ("rt", "radiotherapy"),
    ("mets", "metastases"),
    ("htn", "hypertension"),
    ("t2dm", "type 2 diabetes"),
    ("dm2", "type 2 diabetes"),
    ("dm", "diabetes mellitus"),
    ("chf", "congestive heart failure"),
    ("cad", "coronary artery disease"),
    ("ckd", "chronic kidney disease"),
    ("afib", "atrial fibrillation"),
    ("nkda", "no known drug allergies"),
    ("f/u", "follow up"),
    // Italian
    ("pz", "paziente"),
    ("pz.", "paziente"),
    ("paz.", "paziente"),
    ("sig.ra", "signora"),
    ("sig.na", "signorina"),
    ("sig.", "signor"),
    ("aa", "anni"),
    ("chemio", "chemioterapia"),
    ("mts", "metastasi"),
    ("ipa", "ipertensione arteriosa"),
    ("bpco", "broncopneumopatia cronica ostruttiva"),
    ("eta'", "eta"),
];

/// Words that end with a period without ending the sentence.
const NON_TERMINAL_ABBREVIATIONS: &[&str] = &[
    "dr", "mr", "mrs", "ms", "sig", "dott", "dott.ssa", "prof", "vs", "e.g", "i.e", "nr", "n",
];

/// Case-insensitive shorthand expansion table.
pub struct AbbreviationTable {
    automaton: AhoCorasick,
    expansions: Vec<&'static str>,
}

impl AbbreviationTable {
    pub fn new(entries: &[(&str, &'static str)]) -> Result<Self, aho_corasick::BuildError> {
        let automaton = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostLongest)
            .build(entries.iter().map(|(short, _)| short))?;
        Ok(Self {
            automaton,
            expansions: entries.iter().map(|(_, long)| *long).collect(),
        })
    }

    /// The built-in English and Italian table.
    pub fn bilingual() -> Self {
        Self::new(BILINGUAL_ABBREVIATIONS).expect("built-in abbreviation table is valid")
    }

    /// An empty table; text is folded but never expanded.
    pub fn empty() -> Self {
        Self::new(&[]).expect("empty abbreviation table is valid")
    }

    pub fn len(&self) -> usize {
        self.expansions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expansions.is_empty()
    }

    /// Expand shorthand in `text`, carrying `origin` (one entry per byte plus
    /// a trailing sentinel) through the rewrite.
    fn expand(&self, text: &str, origin: &[usize]) -> (String, Vec<usize>) {
        let mut out = String::with_capacity(text.len() + text.len() / 8);
        let mut map = Vec::with_capacity(origin.len() + origin.len() / 8);
        let mut last = 0;

        for mat in self.automaton.find_iter(text) {
            if !is_standalone(text, mat.start(), mat.end()) {
                continue;
            }
            out.push_str(&text[last..mat.start()]);
            map.extend_from_slice(&origin[last..mat.start()]);

            // Inserted characters all point at the start of the shorthand.
            out.push_str(self.expansions[mat.pattern().as_usize()]);
            map.resize(out.len(), origin[mat.start()]);
            last = mat.end();
        }

        out.push_str(&text[last..]);
        map.extend_from_slice(&origin[last..]);
        (out, map)
    }
}

/// Shorthand must not be glued to letters on the left or to any word
/// character on the right ("65yo" expands, "pT2" does not). Edges that are
/// punctuation ("dx:", "pz.") need no boundary.
fn is_standalone(text: &str, start: usize, end: usize) -> bool {
    let matched = &text[start..end];
    let before = !matched.starts_with(char::is_alphanumeric)
        || text[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphabetic());
    let after = !matched.ends_with(char::is_alphanumeric)
        || text[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
    before && after
}

/// Fold a single character into `out`.
fn fold_char(c: char, out: &mut String) {
    match c {
        '\u{2018}' | '\u{2019}' | '\u{00b4}' | '`' => out.push('\''),
        '\u{201c}' | '\u{201d}' | '\u{00ab}' | '\u{00bb}' => out.push('"'),
        '\u{2010}'..='\u{2015}' | '\u{2212}' => out.push('-'),
        '\u{2265}' => out.push_str(">="),
        '\u{2264}' => out.push_str("<="),
        '\u{00a0}' | '\u{2009}' | '\u{202f}' => out.push(' '),
        c if c.is_ascii() => out.push(c),
        c => decompose_canonical(c, |d| {
            if !is_combining_mark(d) {
                out.push(d);
            }
        }),
    }
}

/// Fold a whole string (no shorthand expansion, no offset tracking).
pub fn fold(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        fold_char(c, &mut out);
    }
    out
}

/// A narrative after folding and shorthand expansion.
pub struct NormalizedText<'a> {
    original: &'a str,
    text: String,
    /// Original character index for every byte of `text`, plus a sentinel
    /// equal to the original character count.
    origin: Vec<usize>,
    /// Byte offset of every original character, plus `original.len()`.
    char_starts: Vec<usize>,
}

impl<'a> NormalizedText<'a> {
    pub fn new(original: &'a str, abbreviations: &AbbreviationTable) -> Self {
        let mut folded = String::with_capacity(original.len());
        let mut origin = Vec::with_capacity(original.len() + 1);
        let mut char_starts = Vec::with_capacity(original.len() + 1);

        for (index, (byte, c)) in original.char_indices().enumerate() {
            char_starts.push(byte);
            fold_char(c, &mut folded);
            origin.resize(folded.len(), index);
        }
        origin.push(char_starts.len());
        char_starts.push(original.len());

        let (text, origin) = abbreviations.expand(&folded, &origin);
        Self {
            original,
            text,
            origin,
            char_starts,
        }
    }

    /// The normalized text that patterns run against.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn original(&self) -> &'a str {
        self.original
    }

    /// Length of the original text in characters.
    pub fn char_len(&self) -> usize {
        self.char_starts.len() - 1
    }

    /// Map a byte offset of the normalized text to a character offset of the
    /// original text.
    pub fn original_char(&self, byte: usize) -> usize {
        self.origin[byte.min(self.origin.len() - 1)]
    }

    /// Original text covering `[start, end)` (character offsets) widened by
    /// `window` characters on each side, clamped to the document.
    pub fn context(&self, start: usize, end: usize, window: usize) -> &'a str {
        let lo = start.saturating_sub(window).min(self.char_len());
        let hi = end.max(start).saturating_add(window).min(self.char_len());
        &self.original[self.char_starts[lo]..self.char_starts[hi]]
    }

    pub fn sentences(&self) -> Vec<Sentence<'_>> {
        split_sentences(&self.text)
    }
}

/// A sentence of the normalized text. `offset` is its byte offset in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentence<'t> {
    pub text: &'t str,
    pub offset: usize,
}

/// Split on runs of `.`, `!` or `?` followed by whitespace (or end of text)
/// and on line breaks. A period after a title or a Latin shorthand does not
/// end a sentence. Blank sentences are dropped.
pub fn split_sentences(text: &str) -> Vec<Sentence<'_>> {
    let bytes = text.as_bytes();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\n' | b'\r' => {
                push_trimmed(text, start, i, &mut sentences);
                start = i + 1;
                i += 1;
            }
            b'.' | b'!' | b'?' => {
                let mut j = i + 1;
                while j < bytes.len() && matches!(bytes[j], b'.' | b'!' | b'?') {
                    j += 1;
                }
                let at_break = j == bytes.len() || bytes[j].is_ascii_whitespace();
                let after_title =
                    bytes[i] == b'.' && j == i + 1 && ends_with_non_terminal(&text[start..i]);
                if at_break && !after_title {
                    push_trimmed(text, start, j, &mut sentences);
                    start = j;
                }
                i = j;
            }
            _ => i += 1,
        }
    }
    push_trimmed(text, start, bytes.len(), &mut sentences);
    sentences
}

fn ends_with_non_terminal(head: &str) -> bool {
    let word = head
        .rsplit(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    NON_TERMINAL_ABBREVIATIONS.contains(&word.as_str())
}

fn push_trimmed<'t>(text: &'t str, start: usize, end: usize, out: &mut Vec<Sentence<'t>>) {
    let raw = &text[start..end];
    let trimmed = raw.trim_start();
    let offset = start + (raw.len() - trimmed.len());
    let trimmed = trimmed.trim_end();
    if !trimmed.is_empty() {
        out.push(Sentence {
            text: trimmed,
            offset,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn normalized(text: &str) -> String {
        NormalizedText::new(text, &AbbreviationTable::bilingual())
            .text()
            .to_string()
    }

    #[test]
    fn test_fold_strips_diacritics_and_typography() {
        assert_eq!(fold("età più’ – ≥50%"), "eta piu' - >=50%");
        assert_eq!(fold("Ségolène"), "Segolene");
    }

    #[test]
    fn test_expands_shorthand_case_insensitively() {
        assert_eq!(normalized("Pt with HTN."), "patient with hypertension.");
        assert_eq!(normalized("Pz. di 70 aa"), "paziente di 70 anni");
        assert_eq!(normalized("65yo woman"), "65years old woman");
    }

    #[test]
    fn test_shorthand_inside_words_is_untouched() {
        assert_eq!(normalized("pT2N0M0 adult"), "pT2N0M0 adult");
        assert_eq!(normalized("Dx:breast"), "diagnosis:breast");
        assert_eq!(normalized("dxt"), "dxt");
    }

    #[test]
    fn test_offsets_map_back_to_original_chars() {
        let doc = NormalizedText::new("Età: 70. Pt ok", &AbbreviationTable::bilingual());
        let text = doc.text();
        let seventy = text.find("70").unwrap();
        assert_eq!(doc.original_char(seventy), 5);
        // expansion maps to the shorthand's start
        let patient = text.find("patient").unwrap();
        assert_eq!(doc.original_char(patient), 9);
        assert_eq!(doc.original_char(patient + 3), 9);
        assert_eq!(doc.original_char(text.len()), doc.char_len());
    }

    #[test]
    fn test_context_is_clamped() {
        let doc = NormalizedText::new("abcdefghij", &AbbreviationTable::empty());
        assert_eq!(doc.context(1, 3, 2), "abcde");
        assert_eq!(doc.context(8, 10, 25), "abcdefghij");
    }

    #[test]
    fn test_sentence_split() {
        let s: Vec<_> = split_sentences("First one. Second!  Third?\nFourth")
            .into_iter()
            .map(|s| s.text)
            .collect();
        assert_eq!(s, vec!["First one.", "Second!", "Third?", "Fourth"]);
    }

    #[test]
    fn test_sentence_split_keeps_titles_and_decimals() {
        let s: Vec<_> = split_sentences("Seen by Dr. Rossi. Ki-67 2.5% today. See e.g. notes")
            .into_iter()
            .map(|s| s.text)
            .collect();
        assert_eq!(
            s,
            vec!["Seen by Dr. Rossi.", "Ki-67 2.5% today.", "See e.g. notes"]
        );
    }

    #[test]
    fn test_sentence_offsets() {
        let text = "  One.   Two.";
        let s = split_sentences(text);
        assert_eq!(s.len(), 2);
        assert_eq!(&text[s[1].offset..s[1].offset + s[1].text.len()], "Two.");
    }

    #[test]
    fn test_blank_input_has_no_sentences() {
        assert!(split_sentences("  \n\n ").is_empty());
    }
}
