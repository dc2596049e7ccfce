//! Source normalizer.
//!
//! Converts one raw record of unknown shape into a [`NormalizedRecord`].
//! Each output field is looked up independently through an ordered list of
//! alternative key paths held in a [`FieldAliases`] table; the first present,
//! non-empty value wins. The table is plain data and can be extended from the
//! `[normalize]` section of the configuration as new sources appear.
//!
//! # Example
//!
//! ```rust
//! use hymnal::normalize::{normalize, FieldAliases};
//! use serde_json::json;
//!
//! let raw = json!({"ref": "RV 1.1.1", "english": "I glorify Agni", "mandala": 1});
//! let record = normalize(&raw, &FieldAliases::default());
//! assert_eq!(record.reference, "RV 1.1.1");
//! assert_eq!(record.translation, "I glorify Agni");
//! assert_eq!(record.major_group, Some(1));
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::fields::{first_ordinal, first_text};
use crate::models::NormalizedRecord;

/// Ordered alternative key paths for every normalized field.
///
/// Each list starts with the canonical camelCase name so that normalizing an
/// already-normalized record is a no-op.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct FieldAliases {
    #[serde(default = "default_original_script")]
    pub original_script: Vec<String>,
    #[serde(default = "default_transliteration")]
    pub transliteration: Vec<String>,
    #[serde(default = "default_translation")]
    pub translation: Vec<String>,
    #[serde(default = "default_reference")]
    pub reference: Vec<String>,
    #[serde(default = "default_attribution")]
    pub attribution: Vec<String>,
    #[serde(default = "default_subject")]
    pub subject: Vec<String>,
    #[serde(default = "default_theme")]
    pub theme: Vec<String>,
    #[serde(default = "default_major_group")]
    pub major_group: Vec<String>,
    #[serde(default = "default_minor_group")]
    pub minor_group: Vec<String>,
    #[serde(default = "default_verse")]
    pub verse: Vec<String>,
}

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn default_original_script() -> Vec<String> {
    keys(&["originalScript", "sanskrit", "devanagari", "text", "rv_devanagari"])
}
fn default_transliteration() -> Vec<String> {
    keys(&["transliteration", "roman", "iast", "padapatha_translit"])
}
fn default_translation() -> Vec<String> {
    keys(&["translation", "english", "en"])
}
fn default_reference() -> Vec<String> {
    keys(&["reference", "ref", "location", "rigveda_ref"])
}
fn default_attribution() -> Vec<String> {
    keys(&["attribution", "rishi", "seer", "author"])
}
fn default_subject() -> Vec<String> {
    keys(&["subject", "deity", "devata"])
}
fn default_theme() -> Vec<String> {
    keys(&["theme", "topic"])
}
fn default_major_group() -> Vec<String> {
    keys(&["majorGroup", "mandala", "book", "m"])
}
fn default_minor_group() -> Vec<String> {
    keys(&["minorGroup", "sukta", "hymn", "s"])
}
fn default_verse() -> Vec<String> {
    keys(&["verse", "rik", "v"])
}

impl Default for FieldAliases {
    fn default() -> Self {
        Self {
            original_script: default_original_script(),
            transliteration: default_transliteration(),
            translation: default_translation(),
            reference: default_reference(),
            attribution: default_attribution(),
            subject: default_subject(),
            theme: default_theme(),
            major_group: default_major_group(),
            minor_group: default_minor_group(),
            verse: default_verse(),
        }
    }
}

impl FieldAliases {
    /// Name of the first field whose alias list is empty, if any.
    pub fn first_empty_list(&self) -> Option<&'static str> {
        [
            ("original_script", &self.original_script),
            ("transliteration", &self.transliteration),
            ("translation", &self.translation),
            ("reference", &self.reference),
            ("attribution", &self.attribution),
            ("subject", &self.subject),
            ("theme", &self.theme),
            ("major_group", &self.major_group),
            ("minor_group", &self.minor_group),
            ("verse", &self.verse),
        ]
        .into_iter()
        .find(|(_, list)| list.is_empty())
        .map(|(name, _)| name)
    }
}

/// Normalize one raw record. Never fails; absent fields degrade to defaults.
pub fn normalize(raw: &Value, aliases: &FieldAliases) -> NormalizedRecord {
    NormalizedRecord {
        original_script: first_text(raw, &aliases.original_script),
        transliteration: first_text(raw, &aliases.transliteration),
        translation: first_text(raw, &aliases.translation),
        reference: first_text(raw, &aliases.reference),
        attribution: first_text(raw, &aliases.attribution),
        subject: first_text(raw, &aliases.subject),
        theme: first_text(raw, &aliases.theme),
        major_group: first_ordinal(raw, &aliases.major_group),
        minor_group: first_ordinal(raw, &aliases.minor_group),
        verse: first_ordinal(raw, &aliases.verse),
    }
}
