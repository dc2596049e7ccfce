//! Core data models used throughout the hymnal.
//!
//! These types represent the normalized records and canonical hymns that flow
//! from the refresh pipeline and the corpus builder into the query engine.
//! All of them serialize with camelCase keys, which is also the JSON shape of
//! the refresh artifact and of the `/hymns` response items.

use serde::{Deserialize, Serialize};

/// One verse of a hymn: the three textual layers plus its ordinal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalVerse {
    pub original_script: String,
    pub transliteration: String,
    pub translation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
}

impl CanonicalVerse {
    /// True when script, transliteration, and translation are all empty.
    pub fn is_blank(&self) -> bool {
        self.original_script.is_empty()
            && self.transliteration.is_empty()
            && self.translation.is_empty()
    }
}

/// A verse-group: the unit returned by search and filter.
///
/// Built only through [`CanonicalHymn::new`], which derives `verse_count` and
/// the combined text fields from `verses`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalHymn {
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_group: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minor_group: Option<u32>,
    pub verses: Vec<CanonicalVerse>,
    pub verse_count: usize,
    pub combined_original_script: String,
    pub combined_transliteration: String,
    pub combined_translation: String,
}

/// Attribution metadata shared by every verse of a hymn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HymnMeta {
    pub reference: String,
    pub attribution: Option<String>,
    pub subject: Option<String>,
    pub theme: Option<String>,
    pub major_group: Option<u32>,
    pub minor_group: Option<u32>,
}

impl CanonicalHymn {
    pub fn new(meta: HymnMeta, verses: Vec<CanonicalVerse>) -> Self {
        let combined_original_script = combine(&verses, |v| v.original_script.as_str());
        let combined_transliteration = combine(&verses, |v| v.transliteration.as_str());
        let combined_translation = combine(&verses, |v| v.translation.as_str());
        Self {
            reference: meta.reference,
            attribution: meta.attribution,
            subject: meta.subject,
            theme: meta.theme,
            major_group: meta.major_group,
            minor_group: meta.minor_group,
            verse_count: verses.len(),
            verses,
            combined_original_script,
            combined_transliteration,
            combined_translation,
        }
    }
}

/// Join the non-empty values of one verse field with newlines, trimmed.
fn combine<'a>(
    verses: &'a [CanonicalVerse],
    field: impl Fn(&'a CanonicalVerse) -> &'a str,
) -> String {
    verses
        .iter()
        .map(field)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// A partial verse-level record produced by the source normalizer.
///
/// Text fields default to the empty string and numeric fields to `None`.
/// Serializing a record and normalizing the result yields the same record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    pub original_script: String,
    pub transliteration: String,
    pub translation: String,
    pub reference: String,
    pub attribution: String,
    pub subject: String,
    pub theme: String,
    pub major_group: Option<u32>,
    pub minor_group: Option<u32>,
    pub verse: Option<u32>,
}

impl NormalizedRecord {
    /// Lift the record into a one-verse hymn, as the refresh artifact stores it.
    pub fn into_hymn(self) -> CanonicalHymn {
        let meta = HymnMeta {
            reference: self.reference,
            attribution: non_empty(self.attribution),
            subject: non_empty(self.subject),
            theme: non_empty(self.theme),
            major_group: self.major_group,
            minor_group: self.minor_group,
        };
        let verse = CanonicalVerse {
            original_script: self.original_script,
            transliteration: self.transliteration,
            translation: self.translation,
            number: self.verse,
        };
        CanonicalHymn::new(meta, vec![verse])
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verse(script: &str, translit: &str, translation: &str) -> CanonicalVerse {
        CanonicalVerse {
            original_script: script.to_string(),
            transliteration: translit.to_string(),
            translation: translation.to_string(),
            number: None,
        }
    }

    #[test]
    fn test_combined_fields_skip_empty_verses() {
        let hymn = CanonicalHymn::new(
            HymnMeta {
                reference: "Rig Veda 1.1".to_string(),
                ..Default::default()
            },
            vec![verse("", "agnim ile", "I praise Agni"), verse("", "", "the priest")],
        );
        assert_eq!(hymn.verse_count, 2);
        assert_eq!(hymn.combined_original_script, "");
        assert_eq!(hymn.combined_transliteration, "agnim ile");
        assert_eq!(hymn.combined_translation, "I praise Agni\nthe priest");
    }

    #[test]
    fn test_blank_verse() {
        assert!(verse("", "", "").is_blank());
        assert!(!verse("", "x", "").is_blank());
    }

    #[test]
    fn test_hymn_serializes_camel_case_without_absent_fields() {
        let hymn = CanonicalHymn::new(
            HymnMeta {
                reference: "Rig Veda 2.1".to_string(),
                major_group: Some(2),
                ..Default::default()
            },
            vec![verse("a", "", "")],
        );
        let json = serde_json::to_value(&hymn).unwrap();
        assert_eq!(json["majorGroup"], 2);
        assert_eq!(json["verseCount"], 1);
        assert_eq!(json["verses"][0]["originalScript"], "a");
        assert!(json.get("attribution").is_none());
        assert!(json.get("minorGroup").is_none());
    }

    #[test]
    fn test_record_into_hymn_keeps_blank_verse() {
        let record = NormalizedRecord {
            reference: "RV 1.1.1".to_string(),
            attribution: "Madhuchchhandas".to_string(),
            ..Default::default()
        };
        let hymn = record.into_hymn();
        assert_eq!(hymn.verse_count, 1);
        assert_eq!(hymn.attribution.as_deref(), Some("Madhuchchhandas"));
        assert_eq!(hymn.subject, None);
    }
}
