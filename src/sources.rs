//! Source providers for the refresh aggregator.
//!
//! A provider fetches one raw payload (a remote URL or a local file). The
//! aggregator owns the per-source time bound and decides what a failure
//! means; providers only report it. [`decode_payload`] turns a payload into
//! raw JSON records: whole-body JSON first, JSON Lines as the fallback.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{Config, RefreshConfig, SourceConfig};

/// Accept header sent to remote sources. Some only serve JSON Lines or text.
pub const ACCEPT: &str = "application/json; q=1.0, */*; q=0.1";

/// A named origin of raw corpus records.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Configured source name, unique within a refresh run.
    fn name(&self) -> &str;

    /// Provider kind (`"http"`, `"file"`, ...).
    fn kind(&self) -> &str;

    /// Where the payload comes from, for listings and logs.
    fn target(&self) -> String;

    /// Fetch the raw payload text.
    async fn fetch(&self) -> Result<String>;
}

/// Remote source fetched with a single GET.
pub struct HttpSource {
    name: String,
    url: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            name: name.into(),
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl SourceProvider for HttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        "http"
    }

    fn target(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.url))?;

        let status = response.status();
        if !status.is_success() {
            bail!("HTTP {}", status.as_u16());
        }
        Ok(response.text().await?)
    }
}

/// Local file source, read whole.
pub struct FileSource {
    name: String,
    path: PathBuf,
}

impl FileSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

#[async_trait]
impl SourceProvider for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        "file"
    }

    fn target(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read {}", self.path.display()))
    }
}

fn provider_from_config(source: &SourceConfig, timeout: Duration) -> Result<Box<dyn SourceProvider>> {
    match (&source.url, &source.path) {
        (Some(url), None) => Ok(Box::new(HttpSource::new(&source.name, url, timeout)?)),
        (None, Some(path)) => Ok(Box::new(FileSource::new(&source.name, path))),
        _ => bail!(
            "refresh source '{}' must set exactly one of `url` or `path`",
            source.name
        ),
    }
}

/// Build providers for every `[[refresh.sources]]` entry, in configured order.
pub fn providers_from_config(config: &RefreshConfig) -> Result<Vec<Box<dyn SourceProvider>>> {
    let timeout = Duration::from_secs(config.timeout_secs);
    config
        .sources
        .iter()
        .map(|source| provider_from_config(source, timeout))
        .collect()
}

/// Decode a payload into raw records.
///
/// - A JSON array yields its elements.
/// - A JSON object yields the array under the first of `container_keys` that
///   holds one; an object with no such key is an error.
/// - Anything that is not valid JSON as a whole is read as JSON Lines: blank
///   lines are skipped and any unparsable line is an error.
pub fn decode_payload(body: &str, container_keys: &[String]) -> Result<Vec<Value>> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(Value::Object(mut map)) => {
            let key = container_keys
                .iter()
                .find(|k| matches!(map.get(k.as_str()), Some(Value::Array(_))))
                .ok_or_else(|| {
                    anyhow!(
                        "JSON object has no array under any of [{}]",
                        container_keys.join(", ")
                    )
                })?;
            match map.remove(key.as_str()) {
                Some(Value::Array(items)) => Ok(items),
                _ => Ok(Vec::new()),
            }
        }
        Ok(_) => bail!("payload is neither a JSON array nor a JSON object"),
        Err(_) => decode_json_lines(body),
    }
}

fn decode_json_lines(body: &str) -> Result<Vec<Value>> {
    body.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("invalid JSON on line {}", i + 1))
        })
        .collect()
}

pub fn list_sources(config: &Config) -> Result<()> {
    let providers = providers_from_config(&config.refresh)?;
    if providers.is_empty() {
        println!("No refresh sources configured.");
        return Ok(());
    }

    println!("{:<20} {:<6} TARGET", "SOURCE", "KIND");
    for provider in &providers {
        println!(
            "{:<20} {:<6} {}",
            provider.name(),
            provider.kind(),
            provider.target()
        );
    }
    println!();
    println!(
        "timeout: {}s per source, fallback sample limit: {}",
        config.refresh.timeout_secs,
        config.refresh.sample_limit()
    );

    Ok(())
}
