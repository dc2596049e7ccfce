//! Corpus aggregation: the offline refresh path.
//!
//! Pulls raw records from every configured [`SourceProvider`] in priority
//! order, normalizes them into one-verse hymns, and deduplicates the result.
//! A source that errors, times out, or returns an undecodable body is skipped
//! with a warning and recorded in the [`RefreshReport`]; it never aborts the
//! run. When no source yields anything, a bounded sample is walked out of the
//! existing backing document instead.
//!
//! The refresh path never touches a live [`crate::corpus::CorpusCache`]. It
//! only writes to disk: existing files are copied aside with a timestamp
//! suffix first, and nothing is written at all when no data was gathered.

use anyhow::{anyhow, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::builder::CorpusBuilder;
use crate::config::Config;
use crate::error::RefreshError;
use crate::models::CanonicalHymn;
use crate::normalize::{normalize, FieldAliases};
use crate::sources::{decode_payload, providers_from_config, SourceProvider};

/// Number of translation characters that take part in the dedup key.
pub const DEDUP_TRANSLATION_CHARS: usize = 80;

/// What happened to one source during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Fetched(usize),
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    pub name: String,
    pub status: SourceStatus,
}

/// Result of a successful aggregation.
#[derive(Debug)]
pub struct RefreshReport {
    /// Deduplicated records, in provider-priority then intra-source order.
    pub hymns: Vec<CanonicalHymn>,
    pub sources: Vec<SourceOutcome>,
    pub fallback_used: bool,
    pub duplicates_dropped: usize,
}

/// Settings for one aggregation run.
pub struct Aggregator<'a> {
    pub aliases: &'a FieldAliases,
    pub container_keys: &'a [String],
    /// Upper bound on each provider's fetch.
    pub timeout: Duration,
    pub builder: &'a CorpusBuilder,
    pub sample_limit: usize,
}

impl<'a> Aggregator<'a> {
    pub fn from_config(config: &'a Config, builder: &'a CorpusBuilder) -> Self {
        Self {
            aliases: &config.normalize,
            container_keys: &config.refresh.container_keys,
            timeout: Duration::from_secs(config.refresh.timeout_secs),
            builder,
            sample_limit: config.refresh.sample_limit(),
        }
    }

    /// Run every provider in order, falling back to sampling `existing`.
    ///
    /// Fails with [`RefreshError::NoData`] only when neither the providers nor
    /// the fallback produced a single record.
    pub async fn refresh(
        &self,
        providers: &[Box<dyn SourceProvider>],
        existing: &Path,
    ) -> Result<RefreshReport, RefreshError> {
        let mut hymns = Vec::new();
        let mut sources = Vec::with_capacity(providers.len());

        for provider in providers {
            let status = match self.fetch_records(provider.as_ref()).await {
                Ok(records) => {
                    let count = records.len();
                    hymns.extend(
                        records
                            .iter()
                            .map(|raw| normalize(raw, self.aliases).into_hymn()),
                    );
                    info!(source = provider.name(), records = count, "source fetched");
                    SourceStatus::Fetched(count)
                }
                Err(err) => {
                    warn!(source = provider.name(), error = %err, "skipping source");
                    SourceStatus::Skipped(err.to_string())
                }
            };
            sources.push(SourceOutcome {
                name: provider.name().to_string(),
                status,
            });
        }

        let mut fallback_used = false;
        if hymns.is_empty() {
            hymns = self.fallback_sample(existing).await;
            fallback_used = !hymns.is_empty();
        }
        if hymns.is_empty() {
            return Err(RefreshError::NoData);
        }

        let (hymns, duplicates_dropped) = dedup(hymns);
        Ok(RefreshReport {
            hymns,
            sources,
            fallback_used,
            duplicates_dropped,
        })
    }

    async fn fetch_records(&self, provider: &dyn SourceProvider) -> Result<Vec<Value>> {
        let body = tokio::time::timeout(self.timeout, provider.fetch())
            .await
            .map_err(|_| anyhow!("timed out after {:?}", self.timeout))??;
        decode_payload(&body, self.container_keys)
    }

    async fn fallback_sample(&self, existing: &Path) -> Vec<CanonicalHymn> {
        let raw = match tokio::fs::read_to_string(existing).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!(path = %existing.display(), error = %err, "fallback sampling failed");
                return Vec::new();
            }
        };

        let builder = self.builder.clone();
        let limit = self.sample_limit;
        let sampled = tokio::task::spawn_blocking(move || {
            serde_json::from_str::<Value>(&raw).map(|doc| builder.sample(&doc, limit))
        })
        .await
        .map_err(anyhow::Error::from)
        .and_then(|parsed| Ok(parsed?));

        match sampled {
            Ok(sample) => {
                info!(
                    path = %existing.display(),
                    records = sample.len(),
                    "derived fallback sample"
                );
                sample
            }
            Err(err) => {
                warn!(path = %existing.display(), error = %err, "fallback sampling failed");
                Vec::new()
            }
        }
    }
}

fn dedup_key(hymn: &CanonicalHymn) -> String {
    let translation = hymn
        .verses
        .first()
        .map(|v| v.translation.as_str())
        .unwrap_or("");
    let head: String = translation.chars().take(DEDUP_TRANSLATION_CHARS).collect();
    format!("{}|{}", hymn.reference, head)
}

/// Drop later records sharing a reference and translation prefix with an
/// earlier one. Returns the survivors and the number dropped.
pub fn dedup(hymns: Vec<CanonicalHymn>) -> (Vec<CanonicalHymn>, usize) {
    let before = hymns.len();
    let mut seen = HashSet::new();
    let kept: Vec<CanonicalHymn> = hymns
        .into_iter()
        .filter(|h| seen.insert(dedup_key(h)))
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

/// `<path>.bak.<UTC timestamp>` with `:` and `.` in the timestamp replaced by `-`.
pub fn backup_path(path: &Path, now: DateTime<Utc>) -> PathBuf {
    let stamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".bak.{}", stamp));
    PathBuf::from(name)
}

/// Copy `path` aside if it exists. Returns the backup location.
pub fn backup_if_exists(path: &Path) -> Result<Option<PathBuf>, RefreshError> {
    if !path.is_file() {
        return Ok(None);
    }
    let backup = backup_path(path, Utc::now());
    std::fs::copy(path, &backup).map_err(|source| RefreshError::Io {
        path: backup.clone(),
        source,
    })?;
    info!(from = %path.display(), to = %backup.display(), "backup written");
    Ok(Some(backup))
}

fn io_error(path: &Path, source: std::io::Error) -> RefreshError {
    RefreshError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Sibling of `path` the artifact is staged in before it replaces `path`.
pub fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write the merged records as pretty JSON, creating parent directories.
///
/// The JSON is written to [`staging_path`] and renamed over `path`, so `path`
/// holds either the previous artifact or the complete new one.
pub fn write_artifact(path: &Path, hymns: &[CanonicalHymn]) -> Result<(), RefreshError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }
    let json = serde_json::to_string_pretty(hymns)?;
    let staged = staging_path(path);
    if let Err(err) = std::fs::write(&staged, json) {
        let _ = std::fs::remove_file(&staged);
        return Err(io_error(&staged, err));
    }
    std::fs::rename(&staged, path).map_err(|e| io_error(path, e))?;
    info!(path = %path.display(), records = hymns.len(), "artifact written");
    Ok(())
}

/// Run the refresh command: aggregate, back up, write, and print a summary.
pub async fn run_refresh(config: &Config) -> Result<()> {
    let builder = CorpusBuilder::from_config(&config.corpus)?;
    let providers = providers_from_config(&config.refresh)?;
    let aggregator = Aggregator::from_config(config, &builder);

    let report = aggregator.refresh(&providers, &config.corpus.path).await?;

    let backups = [
        backup_if_exists(&config.corpus.path)?,
        backup_if_exists(&config.refresh.output)?,
    ];
    write_artifact(&config.refresh.output, &report.hymns)?;

    println!("refresh");
    for outcome in &report.sources {
        match &outcome.status {
            SourceStatus::Fetched(n) => println!("  {}: {} records", outcome.name, n),
            SourceStatus::Skipped(reason) => println!("  {}: skipped ({})", outcome.name, reason),
        }
    }
    if report.fallback_used {
        println!("  fallback sample: {} records", report.hymns.len());
    }
    println!("  duplicates dropped: {}", report.duplicates_dropped);
    for backup in backups.iter().flatten() {
        println!("  backup: {}", backup.display());
    }
    println!("  wrote {} records to {}", report.hymns.len(), config.refresh.output.display());
    println!("ok");

    Ok(())
}
