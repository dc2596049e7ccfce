//! The in-memory corpus and its process-wide lazy cache.
//!
//! A [`Corpus`] is immutable once built: the hymns in build-time order plus a
//! lowercased search haystack per hymn. [`CorpusCache`] loads it on first use
//! with single-flight semantics: concurrent first callers share one read and
//! one parse of the backing document. A failed load leaves the cache empty so
//! the next caller tries again; a successful one is kept for the life of the
//! process.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::OnceCell;
use tracing::info;

use crate::builder::{CorpusBuilder, ShapeKind};
use crate::config::Config;
use crate::error::CorpusError;
use crate::models::CanonicalHymn;

/// Separator between fields in a haystack; never produced by lowercasing text.
const HAYSTACK_SEPARATOR: &str = "\u{0}";

#[derive(Debug)]
pub struct Corpus {
    hymns: Vec<CanonicalHymn>,
    haystacks: Vec<String>,
    shape: Option<ShapeKind>,
}

impl Corpus {
    /// Wrap already-built hymns, keeping their order.
    pub fn new(hymns: Vec<CanonicalHymn>) -> Self {
        let haystacks = hymns.iter().map(haystack).collect();
        Self {
            hymns,
            haystacks,
            shape: None,
        }
    }

    /// Detect the document's shape and flatten it.
    pub fn build(doc: &serde_json::Value, builder: &CorpusBuilder) -> Self {
        let shape = builder.detect(doc).kind();
        let mut corpus = Self::new(builder.build(doc));
        corpus.shape = Some(shape);
        corpus
    }

    pub fn hymns(&self) -> &[CanonicalHymn] {
        &self.hymns
    }

    pub fn len(&self) -> usize {
        self.hymns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hymns.is_empty()
    }

    /// Shape of the backing document, when built from one.
    pub fn shape(&self) -> Option<ShapeKind> {
        self.shape
    }

    pub fn verse_count(&self) -> usize {
        self.hymns.iter().map(|h| h.verse_count).sum()
    }

    /// Hymns paired with their lowercased search text.
    pub(crate) fn indexed(&self) -> impl Iterator<Item = (&CanonicalHymn, &str)> {
        self.hymns
            .iter()
            .zip(self.haystacks.iter().map(String::as_str))
    }
}

fn haystack(hymn: &CanonicalHymn) -> String {
    [
        hymn.combined_original_script.as_str(),
        hymn.combined_transliteration.as_str(),
        hymn.combined_translation.as_str(),
        hymn.reference.as_str(),
    ]
    .join(HAYSTACK_SEPARATOR)
    .to_lowercase()
}

/// Read, parse, and flatten the backing document at `path`.
pub fn load_corpus(path: &Path, builder: &CorpusBuilder) -> Result<Corpus, CorpusError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CorpusError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: serde_json::Value =
        serde_json::from_str(&raw).map_err(|source| CorpusError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(Corpus::build(&doc, builder))
}

/// Lazily loaded, shared corpus handle.
pub struct CorpusCache {
    path: PathBuf,
    builder: CorpusBuilder,
    cell: OnceCell<Arc<Corpus>>,
    loads: AtomicUsize,
}

impl CorpusCache {
    pub fn new(path: impl Into<PathBuf>, builder: CorpusBuilder) -> Self {
        Self {
            path: path.into(),
            builder,
            cell: OnceCell::new(),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let builder = CorpusBuilder::from_config(&config.corpus)?;
        Ok(Self::new(config.corpus.path.clone(), builder))
    }

    /// A cache that is already populated with `corpus`.
    pub fn preloaded(corpus: Corpus, builder: CorpusBuilder) -> Self {
        Self {
            path: PathBuf::new(),
            builder,
            cell: OnceCell::new_with(Some(Arc::new(corpus))),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The corpus, loading it on the first call.
    pub async fn get(&self) -> Result<Arc<Corpus>, CorpusError> {
        self.cell
            .get_or_try_init(|| self.load())
            .await
            .map(Arc::clone)
    }

    /// Number of load attempts made so far.
    pub fn load_attempts(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    async fn load(&self) -> Result<Arc<Corpus>, CorpusError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let path = self.path.clone();
        let builder = self.builder.clone();
        let corpus = tokio::task::spawn_blocking(move || load_corpus(&path, &builder))
            .await
            .map_err(|e| CorpusError::Task(e.to_string()))??;
        info!(
            path = %self.path.display(),
            shape = ?corpus.shape(),
            hymns = corpus.len(),
            "corpus loaded"
        );
        Ok(Arc::new(corpus))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ShapeKeys;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn builder() -> CorpusBuilder {
        CorpusBuilder::new("Rig Veda", ShapeKeys::default()).unwrap()
    }

    fn write_doc(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("rv.json");
        let doc = json!({"mandalas": [{"number": 1, "suktas": [
            {"number": 1, "riks": [{"english": "I praise Agni"}]},
            {"number": 2, "riks": [{"english": "Vayu, come"}, {"english": "these Soma drops"}]}
        ]}]});
        fs::write(&path, doc.to_string()).unwrap();
        path
    }

    #[test]
    fn test_haystack_is_lowercased_union() {
        let corpus = Corpus::build(
            &json!({"mandalas": [{"number": 1, "suktas": [
                {"number": 1, "riks": [{"samhita": "अग्नि", "transliteration": "AGNIM", "english": "Praise"}]}
            ]}]}),
            &builder(),
        );
        let (_, hay) = corpus.indexed().next().unwrap();
        assert!(hay.contains("अग्नि"));
        assert!(hay.contains("agnim"));
        assert!(hay.contains("praise"));
        assert!(hay.contains("rig veda 1.1"));
        assert_eq!(corpus.shape(), Some(ShapeKind::Nested));
    }

    #[test]
    fn test_load_corpus_errors() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            load_corpus(&missing, &builder()),
            Err(CorpusError::Read { .. })
        ));

        let garbled = dir.path().join("garbled.json");
        fs::write(&garbled, "{not json").unwrap();
        assert!(matches!(
            load_corpus(&garbled, &builder()),
            Err(CorpusError::Parse { .. })
        ));
    }

    #[test]
    fn test_unrecognized_document_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("other.json");
        fs::write(&path, r#"{"chapters": [1, 2]}"#).unwrap();
        let corpus = load_corpus(&path, &builder()).unwrap();
        assert!(corpus.is_empty());
        assert_eq!(corpus.shape(), Some(ShapeKind::Unrecognized));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_calls_share_one_load() {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(CorpusCache::new(write_doc(&dir), builder()));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move { cache.get().await.unwrap() }));
        }
        let mut corpora = Vec::new();
        for handle in handles {
            corpora.push(handle.await.unwrap());
        }

        assert_eq!(cache.load_attempts(), 1);
        assert!(corpora.iter().all(|c| Arc::ptr_eq(c, &corpora[0])));
        assert_eq!(corpora[0].len(), 2);
        assert_eq!(corpora[0].verse_count(), 3);
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("late.json");
        let cache = CorpusCache::new(&path, builder());

        assert!(cache.get().await.is_err());
        assert_eq!(cache.load_attempts(), 1);

        fs::write(&path, r#"{"Mandala 1": {"Sukta 1": [{"english": "x"}]}}"#).unwrap();
        let corpus = cache.get().await.unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(cache.load_attempts(), 2);

        // Later changes on disk are not observed.
        fs::write(&path, "{}").unwrap();
        assert_eq!(cache.get().await.unwrap().len(), 1);
        assert_eq!(cache.load_attempts(), 2);
    }

    #[tokio::test]
    async fn test_preloaded_cache_never_reads_disk() {
        let cache = CorpusCache::preloaded(Corpus::new(Vec::new()), builder());
        assert!(cache.get().await.unwrap().is_empty());
        assert_eq!(cache.load_attempts(), 0);
    }
}
