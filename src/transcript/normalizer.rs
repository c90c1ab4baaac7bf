//! Clean-up of final transcript text: informal Indonesian abbreviations are
//! expanded, the first letter is capitalized and terminal punctuation added.
//!
//! No expansion is itself an abbreviation, so normalizing twice gives the same
//! text as normalizing once.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

const ABBREVIATIONS: &[(&str, &str)] = &[
    ("yg", "yang"),
    ("gak", "tidak"),
    ("ga", "tidak"),
    ("nggak", "tidak"),
    ("ngga", "tidak"),
    ("tdk", "tidak"),
    ("sy", "saya"),
    ("gw", "saya"),
    ("gue", "saya"),
    ("dgn", "dengan"),
    ("utk", "untuk"),
    ("krn", "karena"),
    ("karna", "karena"),
    ("tp", "tapi"),
    ("sdh", "sudah"),
    ("udah", "sudah"),
    ("udh", "sudah"),
    ("blm", "belum"),
    ("bgt", "sekali"),
    ("aja", "saja"),
    ("sj", "saja"),
    ("jg", "juga"),
    ("dr", "dari"),
    ("kalo", "kalau"),
    ("klo", "kalau"),
    ("gmn", "bagaimana"),
    ("knp", "kenapa"),
    ("org", "orang"),
    ("bs", "bisa"),
    ("hrs", "harus"),
    ("lg", "lagi"),
    ("sm", "sama"),
    ("dll", "dan lain-lain"),
    ("dsb", "dan sebagainya"),
    ("trs", "terus"),
    ("emg", "memang"),
    ("jd", "jadi"),
    ("kyk", "seperti"),
    ("bkn", "bukan"),
    ("pd", "pada"),
    ("thd", "terhadap"),
    ("tsb", "tersebut"),
];

static TABLE: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| ABBREVIATIONS.iter().copied().collect());

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("valid word pattern"));

#[derive(Debug, Clone, Copy, Default)]
pub struct TranscriptNormalizer;

impl TranscriptNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, text: &str) -> String {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return String::new();
        }

        let expanded = WORD.replace_all(trimmed, |caps: &Captures| {
            let token = &caps[0];
            match TABLE.get(token.to_lowercase().as_str()) {
                Some(expansion) => preserve_case(token, expansion),
                None => token.to_string(),
            }
        });

        let mut out = capitalize_first(&expanded);
        if !out.ends_with(['.', '!', '?']) {
            out.push('.');
        }
        out
    }

    /// Number of known abbreviations
    pub fn table_len(&self) -> usize {
        TABLE.len()
    }
}

fn preserve_case(original: &str, replacement: &str) -> String {
    if original.chars().all(|c| c.is_uppercase()) {
        replacement.to_uppercase()
    } else if original.chars().next().is_some_and(|c| c.is_uppercase()) {
        capitalize_first(replacement)
    } else {
        replacement.to_string()
    }
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
