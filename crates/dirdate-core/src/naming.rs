use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Any prefix made only of digits, dots, dashes, slashes and whitespace,
/// e.g. an existing `2019.02 ` or `12/03/2018 - ` date.
static LEADING_DATE_NOISE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d./\-\s]+").unwrap());

/// Characters that are illegal in a file name on at least one common platform.
static ILLEGAL_NAME_CHARS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());

/// How the descriptive part of a folder name is cased after cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CaseStyle {
    /// Every word capitalised
    #[default]
    Title,
    Upper,
    Lower,
    /// First letter upper, everything else lower
    Sentence,
    /// Keep the name as typed
    Original,
}

impl CaseStyle {
    pub fn apply(self, s: &str) -> String {
        match self {
            CaseStyle::Title => title_case(s),
            CaseStyle::Upper => s.to_uppercase(),
            CaseStyle::Lower => s.to_lowercase(),
            CaseStyle::Sentence => sentence_case(s),
            CaseStyle::Original => s.to_string(),
        }
    }
}

/// Uppercase a letter when the previous char is not a letter, lowercase otherwise.
/// Apostrophes stay inside the word, so "it's" becomes "It's".
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_alpha = false;
    for c in s.chars() {
        if c == '\'' || c == '\u{2019}' {
            out.push(c);
        } else if c.is_alphabetic() {
            if prev_is_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_alpha = true;
        } else {
            out.push(c);
            prev_is_alpha = false;
        }
    }
    out
}

fn sentence_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Remove a leading date-like prefix and surrounding whitespace.
pub fn strip_leading_date_noise(name: &str) -> &str {
    let rest = match LEADING_DATE_NOISE_RE.find(name) {
        Some(m) => &name[m.end()..],
        None => name,
    };
    rest.trim()
}

/// Descriptive part of a folder name: noise stripped, then cased.
/// Falls back to the untouched folder name when nothing is left.
pub fn clean_folder_name(folder_name: &str, case: CaseStyle) -> String {
    let cased = case.apply(strip_leading_date_noise(folder_name));
    if cased.trim().is_empty() {
        folder_name.to_string()
    } else {
        cased
    }
}

/// Drop characters no filesystem will accept in a name.
pub fn sanitize_name(name: &str) -> String {
    ILLEGAL_NAME_CHARS_RE.replace_all(name, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_leading_date_noise() {
        assert_eq!(strip_leading_date_noise("2019.02 Old Trip"), "Old Trip");
        assert_eq!(strip_leading_date_noise("2020-05-01 Old Trip"), "Old Trip");
        assert_eq!(strip_leading_date_noise("12/03/2018 - Party"), "Party");
        assert_eq!(strip_leading_date_noise("Trip 2019"), "Trip 2019");
        assert_eq!(strip_leading_date_noise("2019.02"), "");
    }

    #[test]
    fn test_case_styles() {
        assert_eq!(CaseStyle::Title.apply("old TRIP to paris"), "Old Trip To Paris");
        assert_eq!(CaseStyle::Title.apply("it's a party-time"), "It's A Party-Time");
        assert_eq!(CaseStyle::Upper.apply("Old Trip"), "OLD TRIP");
        assert_eq!(CaseStyle::Lower.apply("Old Trip"), "old trip");
        assert_eq!(CaseStyle::Sentence.apply("old TRIP"), "Old trip");
        assert_eq!(CaseStyle::Original.apply("oLd TriP"), "oLd TriP");
        assert_eq!(CaseStyle::Sentence.apply(""), "");
    }

    #[test]
    fn test_clean_folder_name_fallback() {
        assert_eq!(clean_folder_name("2019.02 old trip", CaseStyle::Title), "Old Trip");
        assert_eq!(clean_folder_name("2019.02", CaseStyle::Title), "2019.02");
        assert_eq!(clean_folder_name("  ", CaseStyle::Upper), "  ");
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("2020-05-01 A/B: \"C\"?"), "2020-05-01 AB C");
        assert_eq!(sanitize_name("<>|*"), "");
        assert_eq!(sanitize_name("2020-05-01 Plain"), "2020-05-01 Plain");
    }
}
