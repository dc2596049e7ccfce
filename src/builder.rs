//! Corpus builder and shape reconciler.
//!
//! The authoritative backing document comes in one of two layouts:
//!
//! ```text
//! Shape A (nested arrays)              Shape B (keyed objects)
//! { "mandalas": [                      { "Mandala 1": {
//!     { "number": 1, "suktas": [           "Sukta 1": [ {verse}, ... ],
//!         { "number": 1, "rishi": …,       ...
//!           "riks": [ {verse}, ... ] }   },
//!     ] } ] }                            ... }
//! ```
//!
//! [`CorpusBuilder::detect`] decides which layout is present and returns a
//! [`DocumentShape`]; each variant has its own walk that yields raw verse
//! groups, and both feed the same verse-extraction and attribution logic.
//! A document matching neither layout builds an empty corpus.

use anyhow::Result;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

use crate::config::CorpusConfig;
use crate::fields::{first_array, first_of, first_opt_text, first_ordinal, first_text};
use crate::inference;
use crate::models::{CanonicalHymn, CanonicalVerse, HymnMeta};

/// Key names used to walk the backing document.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ShapeKeys {
    /// Shape A: top-level keys holding the array of major groups.
    #[serde(default = "default_top_level")]
    pub top_level: Vec<String>,
    #[serde(default = "default_major_number")]
    pub major_number: Vec<String>,
    /// Shape A: keys on a major group holding its minor groups.
    #[serde(default = "default_minor_list")]
    pub minor_list: Vec<String>,
    #[serde(default = "default_minor_number")]
    pub minor_number: Vec<String>,
    /// Shape A: keys on a minor group holding its verses.
    #[serde(default = "default_verse_list")]
    pub verse_list: Vec<String>,
    #[serde(default = "default_verse_number")]
    pub verse_number: Vec<String>,
    /// Shape B: label that, followed by digits, names a major group key.
    #[serde(default = "default_major_label")]
    pub major_label: String,
    /// Shape B: label that, followed by digits, names a minor group key.
    #[serde(default = "default_minor_label")]
    pub minor_label: String,
    #[serde(default = "default_attribution")]
    pub attribution: Vec<String>,
    #[serde(default = "default_subject")]
    pub subject: Vec<String>,
    #[serde(default = "default_theme")]
    pub theme: Vec<String>,
}

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn default_top_level() -> Vec<String> {
    keys(&["mandalas", "books"])
}
fn default_major_number() -> Vec<String> {
    keys(&["number", "major"])
}
fn default_minor_list() -> Vec<String> {
    keys(&["suktas", "groups"])
}
fn default_minor_number() -> Vec<String> {
    keys(&["number", "minor"])
}
fn default_verse_list() -> Vec<String> {
    keys(&["riks", "verses"])
}
fn default_verse_number() -> Vec<String> {
    keys(&["number", "rik_number"])
}
fn default_major_label() -> String {
    "mandala".to_string()
}
fn default_minor_label() -> String {
    "sukta".to_string()
}
fn default_attribution() -> Vec<String> {
    keys(&["rishi", "attribution"])
}
fn default_subject() -> Vec<String> {
    keys(&["deity", "subject"])
}
fn default_theme() -> Vec<String> {
    keys(&["theme", "topic"])
}

impl Default for ShapeKeys {
    fn default() -> Self {
        Self {
            top_level: default_top_level(),
            major_number: default_major_number(),
            minor_list: default_minor_list(),
            minor_number: default_minor_number(),
            verse_list: default_verse_list(),
            verse_number: default_verse_number(),
            major_label: default_major_label(),
            minor_label: default_minor_label(),
            attribution: default_attribution(),
            subject: default_subject(),
            theme: default_theme(),
        }
    }
}

/// Alternative key paths for the three text layers of a verse.
struct VersePaths {
    script: &'static [&'static str],
    transliteration: &'static [&'static str],
    translation: &'static [&'static str],
}

const NESTED_VERSE_PATHS: VersePaths = VersePaths {
    script: &["samhita", "devanagari", "samhita.devanagari.text", "text"],
    transliteration: &[
        "padapatha_transliteration",
        "transliteration",
        "padapatha.transliteration.text",
    ],
    translation: &["english", "translation"],
};

const KEYED_VERSE_PATHS: VersePaths = VersePaths {
    script: &["samhita.devanagari.text", "samhita", "devanagari", "text"],
    transliteration: &[
        "padapatha.transliteration.text",
        "transliteration",
        "padapatha_transliteration",
    ],
    translation: &["english", "translation"],
};

/// The detected layout of a backing document.
#[derive(Debug)]
pub enum DocumentShape<'a> {
    /// Shape A: the array of major groups.
    Nested(&'a [Value]),
    /// Shape B: `(major number, minor-group mapping)` in document order.
    Keyed(Vec<(u32, &'a Value)>),
    Unrecognized,
}

impl DocumentShape<'_> {
    pub fn kind(&self) -> ShapeKind {
        match self {
            DocumentShape::Nested(_) => ShapeKind::Nested,
            DocumentShape::Keyed(_) => ShapeKind::Keyed,
            DocumentShape::Unrecognized => ShapeKind::Unrecognized,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Nested,
    Keyed,
    Unrecognized,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShapeKind::Nested => "nested-array",
            ShapeKind::Keyed => "nested-object",
            ShapeKind::Unrecognized => "unrecognized",
        };
        f.write_str(name)
    }
}

/// One minor group before flattening.
struct RawGroup<'a> {
    major: u32,
    minor: u32,
    /// The minor-group object itself, when the layout has one.
    group: Option<&'a Value>,
    verses: &'a [Value],
    paths: &'static VersePaths,
}

/// Flattens backing documents into canonical hymns.
#[derive(Debug, Clone)]
pub struct CorpusBuilder {
    collection: String,
    keys: ShapeKeys,
    major_pattern: Regex,
    minor_pattern: Regex,
}

fn label_pattern(label: &str) -> Result<Regex> {
    Ok(Regex::new(&format!(r"(?i){}\D*?(\d+)", regex::escape(label)))?)
}

/// Group number named by `key`. Zero never names a group.
fn label_number(pattern: &Regex, key: &str) -> Option<u32> {
    pattern
        .captures(key)?
        .get(1)?
        .as_str()
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
}

impl CorpusBuilder {
    pub fn new(collection: impl Into<String>, keys: ShapeKeys) -> Result<Self> {
        let major_pattern = label_pattern(&keys.major_label)?;
        let minor_pattern = label_pattern(&keys.minor_label)?;
        Ok(Self {
            collection: collection.into(),
            keys,
            major_pattern,
            minor_pattern,
        })
    }

    pub fn from_config(config: &CorpusConfig) -> Result<Self> {
        Self::new(config.collection.clone(), config.shape.clone())
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Decide which layout `doc` uses.
    ///
    /// Shape A wins when a known top-level array key holds a non-empty array;
    /// otherwise Shape B when any top-level key carries the major label.
    pub fn detect<'a>(&self, doc: &'a Value) -> DocumentShape<'a> {
        let non_empty = |v: &'a Value| v.as_array().filter(|a| !a.is_empty()).map(Vec::as_slice);
        if let Some(majors) = first_of(doc, &self.keys.top_level, non_empty) {
            return DocumentShape::Nested(majors);
        }

        let keyed: Vec<(u32, &Value)> = doc
            .as_object()
            .map(|obj| {
                obj.iter()
                    .filter_map(|(key, value)| {
                        label_number(&self.major_pattern, key).map(|n| (n, value))
                    })
                    .collect()
            })
            .unwrap_or_default();

        if keyed.is_empty() {
            DocumentShape::Unrecognized
        } else {
            DocumentShape::Keyed(keyed)
        }
    }

    /// Flatten `doc` into hymns, in document order.
    pub fn build(&self, doc: &Value) -> Vec<CanonicalHymn> {
        self.groups(&self.detect(doc))
            .into_iter()
            .filter_map(|group| self.build_hymn(group))
            .collect()
    }

    /// Up to `limit` single-verse hymns from the start of `doc`.
    ///
    /// Walks the same groups as [`build`](Self::build) and splits each hymn
    /// into its verses, referenced as `"<Collection> major.minor.verse"`.
    pub fn sample(&self, doc: &Value, limit: usize) -> Vec<CanonicalHymn> {
        let mut sample = Vec::new();
        if limit == 0 {
            return sample;
        }
        for group in self.groups(&self.detect(doc)) {
            let Some(hymn) = self.build_hymn(group) else {
                continue;
            };
            for (i, verse) in hymn.verses.iter().enumerate() {
                let number = verse.number.unwrap_or(i as u32 + 1);
                let meta = HymnMeta {
                    reference: format!("{}.{}", hymn.reference, number),
                    attribution: hymn.attribution.clone(),
                    subject: hymn.subject.clone(),
                    theme: hymn.theme.clone(),
                    major_group: hymn.major_group,
                    minor_group: hymn.minor_group,
                };
                sample.push(CanonicalHymn::new(meta, vec![verse.clone()]));
                if sample.len() >= limit {
                    return sample;
                }
            }
        }
        sample
    }

    fn groups<'a>(&self, shape: &DocumentShape<'a>) -> Vec<RawGroup<'a>> {
        match shape {
            DocumentShape::Nested(majors) => self.nested_groups(majors),
            DocumentShape::Keyed(majors) => self.keyed_groups(majors),
            DocumentShape::Unrecognized => Vec::new(),
        }
    }

    fn nested_groups<'a>(&self, majors: &'a [Value]) -> Vec<RawGroup<'a>> {
        let mut groups = Vec::new();
        for (mi, major) in majors.iter().enumerate() {
            let major_no =
                first_ordinal(major, &self.keys.major_number).unwrap_or(mi as u32 + 1);
            let minors = first_array(major, &self.keys.minor_list).unwrap_or_default();
            for (si, minor) in minors.iter().enumerate() {
                groups.push(RawGroup {
                    major: major_no,
                    minor: first_ordinal(minor, &self.keys.minor_number)
                        .unwrap_or(si as u32 + 1),
                    group: Some(minor),
                    verses: first_array(minor, &self.keys.verse_list).unwrap_or_default(),
                    paths: &NESTED_VERSE_PATHS,
                });
            }
        }
        groups
    }

    fn keyed_groups<'a>(&self, majors: &[(u32, &'a Value)]) -> Vec<RawGroup<'a>> {
        let mut groups = Vec::new();
        for &(major_no, minors) in majors {
            let Some(minors) = minors.as_object() else {
                continue;
            };
            for (key, verses) in minors {
                let (Some(minor_no), Some(verses)) =
                    (label_number(&self.minor_pattern, key), verses.as_array())
                else {
                    continue;
                };
                groups.push(RawGroup {
                    major: major_no,
                    minor: minor_no,
                    group: None,
                    verses,
                    paths: &KEYED_VERSE_PATHS,
                });
            }
        }
        groups
    }

    fn extract_verse(&self, record: &Value, paths: &VersePaths) -> CanonicalVerse {
        CanonicalVerse {
            original_script: first_text(record, paths.script),
            transliteration: first_text(record, paths.transliteration),
            translation: first_text(record, paths.translation),
            number: first_ordinal(record, &self.keys.verse_number),
        }
    }

    fn build_hymn(&self, group: RawGroup<'_>) -> Option<CanonicalHymn> {
        let verses: Vec<CanonicalVerse> = group
            .verses
            .iter()
            .map(|record| self.extract_verse(record, group.paths))
            .filter(|verse| !verse.is_blank())
            .collect();
        if verses.is_empty() {
            return None;
        }

        let first_record = group.verses.first();
        let explicit = |keys: &[String]| {
            group
                .group
                .and_then(|g| first_opt_text(g, keys))
                .or_else(|| first_record.and_then(|v| first_opt_text(v, keys)))
        };

        let major = Some(group.major);
        let minor = Some(group.minor);

        let attribution = explicit(&self.keys.attribution).or_else(|| {
            inference::curated_attribution(major, minor).map(str::to_string)
        });
        let subject = explicit(&self.keys.subject).or_else(|| {
            inference::infer_subject_from_text(&verses)
                .or_else(|| inference::default_subject(major))
                .map(str::to_string)
        });
        let theme = explicit(&self.keys.theme);

        let meta = HymnMeta {
            reference: format!("{} {}.{}", self.collection, group.major, group.minor),
            attribution,
            subject,
            theme,
            major_group: major,
            minor_group: minor,
        };
        Some(CanonicalHymn::new(meta, verses))
    }
}
