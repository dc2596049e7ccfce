//! Query engine: text search, faceted filters, and pagination.
//!
//! Operates on an immutable [`Corpus`] and never reorders it: results are
//! the filtered subset in build-time order, sliced into pages. Parameters
//! arrive as raw strings and are parsed leniently. A malformed number falls
//! back to its default and the sentinel `All` means "no filter", so a
//! request is never rejected for its parameters.
//!
//! Used by both the `hymnal query` CLI command and `GET /hymns`.

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::builder::CorpusBuilder;
use crate::config::{Config, QueryConfig};
use crate::corpus::{load_corpus, Corpus};
use crate::models::CanonicalHymn;

/// Facet value that stands for "no filter".
pub const ALL_SENTINEL: &str = "All";

/// Parsed, validated query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pub page: usize,
    pub page_size: usize,
    /// Lowercased search text.
    pub text: Option<String>,
    pub attribution: Option<String>,
    pub subject: Option<String>,
    pub theme: Option<String>,
    /// Compared against the decimal rendering of the hymn's major group.
    pub major_group: Option<String>,
}

impl QueryParams {
    /// First page, default page size, no filters.
    pub fn defaults(limits: &QueryConfig) -> Self {
        Self {
            page: 1,
            page_size: limits.default_page_size,
            text: None,
            attribution: None,
            subject: None,
            theme: None,
            major_group: None,
        }
    }

    /// Build parameters from query-string pairs. The first occurrence of a key wins.
    ///
    /// Recognized keys: `page`, `pageSize`, `q`/`text`, `attribution`/`rishi`,
    /// `subject`/`deity`, `theme`, `majorGroup`/`mandala`. Others are ignored.
    pub fn from_pairs<I, K, V>(pairs: I, limits: &QueryConfig) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut page = None;
        let mut page_size = None;
        let mut text = None;
        let mut attribution = None;
        let mut subject = None;
        let mut theme = None;
        let mut major_group = None;

        for (key, value) in pairs {
            let value = value.as_ref();
            let slot = match key.as_ref() {
                "page" => &mut page,
                "pageSize" => &mut page_size,
                "q" | "text" => &mut text,
                "attribution" | "rishi" => &mut attribution,
                "subject" | "deity" => &mut subject,
                "theme" => &mut theme,
                "majorGroup" | "mandala" => &mut major_group,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.to_string());
            }
        }

        Self {
            page: parse_page(page.as_deref()),
            page_size: parse_page_size(page_size.as_deref(), limits),
            text: text.filter(|t| !t.is_empty()).map(|t| t.to_lowercase()),
            attribution: facet_filter(attribution),
            subject: facet_filter(subject),
            theme: facet_filter(theme),
            major_group: facet_filter(major_group),
        }
    }
}

fn parse_page(raw: Option<&str>) -> usize {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .map(|n| n.max(1) as usize)
        .unwrap_or(1)
}

fn parse_page_size(raw: Option<&str>, limits: &QueryConfig) -> usize {
    let requested = raw
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(limits.default_page_size as i64);
    requested.clamp(1, limits.max_page_size as i64) as usize
}

fn facet_filter(raw: Option<String>) -> Option<String> {
    raw.filter(|v| !v.is_empty() && v != ALL_SENTINEL)
}

/// One page of results.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPage<'a> {
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub items: Vec<&'a CanonicalHymn>,
}

fn matches(params: &QueryParams, hymn: &CanonicalHymn, haystack: &str) -> bool {
    if let Some(text) = &params.text {
        if !haystack.contains(text.as_str()) {
            return false;
        }
    }
    facet_eq(&params.attribution, hymn.attribution.as_deref())
        && facet_eq(&params.subject, hymn.subject.as_deref())
        && facet_eq(&params.theme, hymn.theme.as_deref())
        && match &params.major_group {
            Some(wanted) => hymn
                .major_group
                .is_some_and(|m| m.to_string() == *wanted),
            None => true,
        }
}

fn facet_eq(filter: &Option<String>, value: Option<&str>) -> bool {
    match filter {
        Some(wanted) => value == Some(wanted.as_str()),
        None => true,
    }
}

/// Filter the corpus and return the requested page.
pub fn query<'a>(corpus: &'a Corpus, params: &QueryParams) -> QueryPage<'a> {
    let filtered: Vec<&CanonicalHymn> = corpus
        .indexed()
        .filter(|(hymn, haystack)| matches(params, hymn, haystack))
        .map(|(hymn, _)| hymn)
        .collect();

    let total = filtered.len();
    let start = params
        .page
        .saturating_sub(1)
        .checked_mul(params.page_size)
        .unwrap_or(usize::MAX);
    let items = filtered
        .into_iter()
        .skip(start)
        .take(params.page_size)
        .collect();

    QueryPage {
        total,
        page: params.page,
        page_size: params.page_size,
        items,
    }
}

/// Distinct facet values present in the corpus, sorted.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Facets {
    pub attributions: Vec<String>,
    pub subjects: Vec<String>,
    pub themes: Vec<String>,
    pub major_groups: Vec<u32>,
}

pub fn facets(corpus: &Corpus) -> Facets {
    let mut attributions = BTreeSet::new();
    let mut subjects = BTreeSet::new();
    let mut themes = BTreeSet::new();
    let mut major_groups = BTreeSet::new();
    for hymn in corpus.hymns() {
        attributions.extend(hymn.attribution.clone());
        subjects.extend(hymn.subject.clone());
        themes.extend(hymn.theme.clone());
        major_groups.extend(hymn.major_group);
    }
    Facets {
        attributions: attributions.into_iter().collect(),
        subjects: subjects.into_iter().collect(),
        themes: themes.into_iter().collect(),
        major_groups: major_groups.into_iter().collect(),
    }
}

/// Filters accepted by the `query` command, as typed on the command line.
#[derive(Debug, Default, Clone)]
pub struct QueryArgs {
    pub text: Option<String>,
    pub attribution: Option<String>,
    pub subject: Option<String>,
    pub theme: Option<String>,
    pub major_group: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl QueryArgs {
    fn pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("q", &self.text),
            ("attribution", &self.attribution),
            ("subject", &self.subject),
            ("theme", &self.theme),
            ("majorGroup", &self.major_group),
            ("page", &self.page),
            ("pageSize", &self.page_size),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
        .collect()
    }
}

/// Run the query command: load the backing document once and print a page.
pub fn run_query(config: &Config, args: &QueryArgs, json: bool) -> Result<()> {
    let builder = CorpusBuilder::from_config(&config.corpus)?;
    let corpus = load_corpus(&config.corpus.path, &builder)?;
    let params = QueryParams::from_pairs(args.pairs(), &config.query);
    let page = query(&corpus, &params);

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    if page.items.is_empty() {
        println!("No results. (total: {})", page.total);
        return Ok(());
    }

    let first = (page.page - 1) * page.page_size;
    for (i, hymn) in page.items.iter().enumerate() {
        println!("{}. {}", first + i + 1, hymn.reference);
        if let Some(attribution) = &hymn.attribution {
            println!("    attribution: {}", attribution);
        }
        if let Some(subject) = &hymn.subject {
            println!("    subject: {}", subject);
        }
        println!("    verses: {}", hymn.verse_count);
        if let Some(line) = hymn.combined_translation.lines().next() {
            println!("    excerpt: \"{}\"", line.trim());
        }
        println!();
    }
    println!(
        "page {} of {} ({} total)",
        page.page,
        page.total.div_ceil(page.page_size).max(1),
        page.total
    );

    Ok(())
}
