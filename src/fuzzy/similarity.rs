//! String similarity primitives (spec §4.1): `normalize` and `similarity`.
//!
//! Pure functions, cheap enough to call per comparison but cacheable by
//! callers that need to avoid recomputing a normalized form per record per
//! scan (see [`crate::fuzzy::DuplicateEngine`]).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::FuzzyConfig;

static FEAT_PAREN_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*\(\s*feat(?:\.|uring)?\s+[^)]*\)\s*$").unwrap());
static FEAT_BARE_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+feat(?:\.|uring)?\s+.*$").unwrap());

const ALBUM_EDITION_WORDS: &[&str] = &[
    "deluxe",
    "remastered",
    "expanded",
    "anniversary",
    "special",
    "bonus",
    "edition",
    "version",
];

static ALBUM_EDITION_TAIL: Lazy<Regex> = Lazy::new(|| {
    let words = ALBUM_EDITION_WORDS.join("|");
    Regex::new(&format!(r"(?i)\s*\([^()]*\b(?:{words})\b[^()]*\)\s*$")).unwrap()
});

static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{P}").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const ARTIST_PREFIXES: &[&str] = &["the ", "a ", "an "];

/// Apply the configured normalization pipeline to `s`, in the order
/// specified by spec §4.1: case-fold, strip artist prefix, strip
/// feat./featuring tail, strip album-edition parenthetical, drop
/// punctuation, collapse whitespace, trim.
pub fn normalize(s: &str, cfg: &FuzzyConfig) -> String {
    let mut out = s.to_string();

    if cfg.ignore_case {
        out = out.to_lowercase();
    }

    if cfg.ignore_artist_prefixes {
        out = strip_artist_prefix(&out, cfg.ignore_case);
    }

    if cfg.ignore_featuring {
        out = FEAT_PAREN_TAIL.replace(&out, "").into_owned();
        out = FEAT_BARE_TAIL.replace(&out, "").into_owned();
    }

    if cfg.ignore_album_editions {
        out = ALBUM_EDITION_TAIL.replace(&out, "").into_owned();
    }

    if cfg.ignore_punctuation {
        out = PUNCTUATION.replace_all(&out, "").into_owned();
    }

    out = WHITESPACE_RUN.replace_all(&out, " ").into_owned();
    out.trim().to_string()
}

fn strip_artist_prefix(s: &str, already_lowercased: bool) -> String {
    let haystack = if already_lowercased {
        s.to_string()
    } else {
        s.to_lowercase()
    };
    for prefix in ARTIST_PREFIXES {
        if haystack.starts_with(prefix) {
            return s[prefix.len()..].to_string();
        }
    }
    s.to_string()
}

/// Similarity in `[0, 100]`, the higher of Jaro-Winkler and
/// `1 - levenshtein(a,b)/max(|a|,|b|)`, rounded to one decimal. Two empty
/// strings are identical (100); exactly one empty is a total mismatch (0).
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let jw = strsim::jaro_winkler(a, b) * 100.0;

    let max_len = a.chars().count().max(b.chars().count()) as f64;
    let lev = if max_len == 0.0 {
        100.0
    } else {
        (1.0 - strsim::levenshtein(a, b) as f64 / max_len) * 100.0
    };

    let score = jw.max(lev);
    (score * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Preset;

    #[test]
    fn similarity_bounds_and_symmetry() {
        let pairs = [
            ("Hey Jude", "Hey Jude"),
            ("Hey Jude", "Let It Be"),
            ("", "Hey Jude"),
            ("", ""),
            ("abc", "cba"),
        ];
        for (a, b) in pairs {
            let s = similarity(a, b);
            assert!((0.0..=100.0).contains(&s), "{a:?} vs {b:?} = {s}");
            assert_eq!(similarity(a, a), if a.is_empty() { 100.0 } else { 100.0 });
            assert_eq!(s, similarity(b, a));
        }
    }

    #[test]
    fn empty_vs_empty_is_100_one_empty_is_0() {
        assert_eq!(similarity("", ""), 100.0);
        assert_eq!(similarity("", "x"), 0.0);
        assert_eq!(similarity("x", ""), 0.0);
    }

    #[test]
    fn normalize_is_idempotent() {
        let cfg = FuzzyConfig::preset(Preset::Balanced);
        for s in [
            "The Beatles",
            "Hey Jude (feat. Someone)",
            "1 (Remastered)",
            "  multiple   spaces  ",
            "Weird!!! Punctuation???",
        ] {
            let once = normalize(s, &cfg);
            let twice = normalize(&once, &cfg);
            assert_eq!(once, twice, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn s1_similarity_scenario() {
        let aggressive = FuzzyConfig::custom(
            85.0, 85.0, 85.0, 10, 5.0, true, true, false, true, true, true, 2,
        )
        .unwrap();
        let a = normalize("The Beatles", &aggressive);
        let b = normalize("beatles", &aggressive);
        assert!(similarity(&a, &b) >= 99.0);

        let strict_literal = FuzzyConfig::custom(
            85.0, 85.0, 85.0, 10, 5.0, false, false, false, false, false, false, 2,
        )
        .unwrap();
        let a2 = normalize("The Beatles", &strict_literal);
        let b2 = normalize("beatles", &strict_literal);
        assert!(similarity(&a2, &b2) <= 70.0);
    }

    #[test]
    fn strips_feat_and_album_edition_tails() {
        let cfg = FuzzyConfig::preset(Preset::Balanced);
        assert_eq!(normalize("Hey Jude feat. Someone", &cfg), "hey jude");
        assert_eq!(normalize("Hey Jude (feat. Someone)", &cfg), "hey jude");
        assert_eq!(normalize("1 (Remastered)", &cfg), "1");
        assert_eq!(normalize("1 (2009 Remastered Version)", &cfg), "1");
    }
}
