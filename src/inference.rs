//! Attribution and subject inference.
//!
//! A best-effort curated lookup, not a classifier. Three static tables:
//!
//! - [`SUBJECT_STEMS`] maps transliterated stems to canonical subject names
//!   and is consulted with tokens taken from the opening verses.
//! - [`MAJOR_DEFAULT_SUBJECTS`] gives a subject for whole major groups.
//! - [`CURATED_ATTRIBUTIONS`] and [`MAJOR_DEFAULT_ATTRIBUTIONS`] give
//!   historical attributions by hymn number range and by major group.
//!
//! When nothing matches the result is `None`; no placeholder is produced.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::CanonicalVerse;

/// Number of leading verses scanned for subject stems.
pub const INFERENCE_VERSE_WINDOW: usize = 3;

/// Transliterated stem → canonical subject. Checked in order.
pub const SUBJECT_STEMS: &[(&str, &str)] = &[
    ("agni", "Agni"),
    ("indra", "Indra"),
    ("soma", "Soma"),
    ("varuna", "Varuna"),
    ("mitra", "Mitra"),
    ("usas", "Ushas"),
    ("ushas", "Ushas"),
    ("surya", "Surya"),
    ("savitr", "Savitr"),
    ("savita", "Savitr"),
    ("vayu", "Vayu"),
    ("asvin", "Ashvins"),
    ("ashvin", "Ashvins"),
    ("marut", "Maruts"),
    ("rudra", "Rudra"),
    ("visnu", "Vishnu"),
    ("vishnu", "Vishnu"),
    ("pusan", "Pushan"),
    ("pushan", "Pushan"),
    ("brhaspati", "Brihaspati"),
    ("brihaspati", "Brihaspati"),
    ("sarasvati", "Sarasvati"),
    ("aditi", "Aditi"),
    ("parjanya", "Parjanya"),
];

/// Major group → subject addressed by the whole group.
pub const MAJOR_DEFAULT_SUBJECTS: &[(u32, &str)] = &[(9, "Soma")];

/// (major, first minor, last minor) → attribution.
pub const CURATED_ATTRIBUTIONS: &[(u32, u32, u32, &str)] = &[
    (1, 1, 10, "Madhuchchhandas"),
    (1, 12, 23, "Medhatithi Kanva"),
    (1, 24, 30, "Shunahshepa"),
    (1, 164, 164, "Dirghatamas"),
    (3, 62, 62, "Vishvamitra"),
    (10, 90, 90, "Narayana"),
    (10, 129, 129, "Prajapati"),
];

/// Major group → attribution of its family of seers.
pub const MAJOR_DEFAULT_ATTRIBUTIONS: &[(u32, &str)] = &[
    (2, "Gritsamada"),
    (3, "Vishvamitra"),
    (4, "Vamadeva"),
    (5, "Atri"),
    (6, "Bharadvaja"),
    (7, "Vasistha"),
    (8, "Kanva"),
];

/// Lowercase ASCII-folded token: NFD, combining marks dropped, letters only.
pub fn fold_token(raw: &str) -> String {
    raw.nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Subject for a single folded token: exact stem or stem prefix.
pub fn subject_for_token(token: &str) -> Option<&'static str> {
    if token.is_empty() {
        return None;
    }
    SUBJECT_STEMS
        .iter()
        .find(|(stem, _)| token.starts_with(stem))
        .map(|(_, subject)| *subject)
}

/// Scan the first verses for a known subject stem.
///
/// Uses each verse's transliteration, or its original script when the
/// transliteration is empty. The first token that matches wins.
pub fn infer_subject_from_text(verses: &[CanonicalVerse]) -> Option<&'static str> {
    verses
        .iter()
        .take(INFERENCE_VERSE_WINDOW)
        .map(|v| {
            if v.transliteration.is_empty() {
                v.original_script.as_str()
            } else {
                v.transliteration.as_str()
            }
        })
        .flat_map(str::split_whitespace)
        .find_map(|raw| subject_for_token(&fold_token(raw)))
}

pub fn default_subject(major: Option<u32>) -> Option<&'static str> {
    let major = major?;
    MAJOR_DEFAULT_SUBJECTS
        .iter()
        .find(|(m, _)| *m == major)
        .map(|(_, s)| *s)
}

/// Curated attribution for a hymn, falling back to the major group's seer family.
pub fn curated_attribution(major: Option<u32>, minor: Option<u32>) -> Option<&'static str> {
    let major = major?;
    minor
        .and_then(|minor| {
            CURATED_ATTRIBUTIONS
                .iter()
                .find(|(m, lo, hi, _)| *m == major && (*lo..=*hi).contains(&minor))
                .map(|(_, _, _, name)| *name)
        })
        .or_else(|| {
            MAJOR_DEFAULT_ATTRIBUTIONS
                .iter()
                .find(|(m, _)| *m == major)
                .map(|(_, name)| *name)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translit(text: &str) -> CanonicalVerse {
        CanonicalVerse {
            transliteration: text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_fold_token_strips_diacritics_and_punctuation() {
        assert_eq!(fold_token("indraṃ"), "indram");
        assert_eq!(fold_token("agním"), "agnim");
        assert_eq!(fold_token("Uṣásaḥ,"), "usasah");
        assert_eq!(fold_token("viśva-mā́nuṣam"), "visvamanusam");
        assert_eq!(fold_token("1.2|"), "");
    }

    #[test]
    fn test_subject_from_inflected_token() {
        let verses = vec![translit("agním īḷe puróhitaṃ")];
        assert_eq!(infer_subject_from_text(&verses), Some("Agni"));
    }

    #[test]
    fn test_first_match_in_token_order_wins() {
        let verses = vec![translit("índra vā́yū imé sutā́")];
        assert_eq!(infer_subject_from_text(&verses), Some("Indra"));
    }

    #[test]
    fn test_only_first_three_verses_are_scanned() {
        // Known approximation: a subject named only from the fourth verse on is missed.
        let verses = vec![
            translit("a b"),
            translit("c d"),
            translit("e f"),
            translit("somam"),
        ];
        assert_eq!(infer_subject_from_text(&verses), None);
    }

    #[test]
    fn test_script_used_when_transliteration_empty() {
        let verses = vec![CanonicalVerse {
            original_script: "mitraṃ huve".to_string(),
            ..Default::default()
        }];
        assert_eq!(infer_subject_from_text(&verses), Some("Mitra"));
    }

    #[test]
    fn test_no_match_stays_absent() {
        let verses = vec![translit("bhadrám kárṇebhiḥ"), translit("")];
        assert_eq!(infer_subject_from_text(&[translit("xyz abc")]), None);
        assert_eq!(infer_subject_from_text(&verses), None);
    }

    #[test]
    fn test_default_subject_by_major() {
        assert_eq!(default_subject(Some(9)), Some("Soma"));
        assert_eq!(default_subject(Some(1)), None);
        assert_eq!(default_subject(None), None);
    }

    #[test]
    fn test_curated_attribution_ranges_then_major_default() {
        assert_eq!(curated_attribution(Some(1), Some(1)), Some("Madhuchchhandas"));
        assert_eq!(curated_attribution(Some(1), Some(10)), Some("Madhuchchhandas"));
        assert_eq!(curated_attribution(Some(1), Some(11)), None);
        assert_eq!(curated_attribution(Some(3), Some(62)), Some("Vishvamitra"));
        assert_eq!(curated_attribution(Some(7), Some(77)), Some("Vasistha"));
        assert_eq!(curated_attribution(Some(7), None), Some("Vasistha"));
        assert_eq!(curated_attribution(None, Some(1)), None);
    }
}
