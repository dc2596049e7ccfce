use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::builder::ShapeKeys;
use crate::normalize::FieldAliases;

/// Hard cap on the number of records derived by fallback sampling.
pub const FALLBACK_SAMPLE_CAP: usize = 1000;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub query: QueryConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub normalize: FieldAliases,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    /// Backing document consumed by the corpus builder.
    pub path: PathBuf,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default)]
    pub shape: ShapeKeys,
}

fn default_collection() -> String {
    "Rig Veda".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    30
}
fn default_max_page_size() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefreshConfig {
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_fallback_sample_limit")]
    pub fallback_sample_limit: usize,
    #[serde(default = "default_container_keys")]
    pub container_keys: Vec<String>,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout_secs: default_timeout_secs(),
            fallback_sample_limit: default_fallback_sample_limit(),
            container_keys: default_container_keys(),
            sources: Vec::new(),
        }
    }
}

fn default_output() -> PathBuf {
    PathBuf::from("dataset/hymns_refreshed.json")
}
fn default_timeout_secs() -> u64 {
    20
}
fn default_fallback_sample_limit() -> usize {
    FALLBACK_SAMPLE_CAP
}
fn default_container_keys() -> Vec<String> {
    vec!["items".to_string(), "data".to_string(), "verses".to_string()]
}

impl RefreshConfig {
    /// Configured sample limit, never above [`FALLBACK_SAMPLE_CAP`].
    pub fn sample_limit(&self) -> usize {
        self.fallback_sample_limit.min(FALLBACK_SAMPLE_CAP)
    }
}

/// One `[[refresh.sources]]` entry: a remote URL or a local file.
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Config {
    /// A config with defaults everywhere except the backing document path.
    pub fn minimal(corpus_path: impl Into<PathBuf>) -> Self {
        Self {
            corpus: CorpusConfig {
                path: corpus_path.into(),
                collection: default_collection(),
                shape: ShapeKeys::default(),
            },
            query: QueryConfig::default(),
            server: ServerConfig {
                bind: "127.0.0.1:3000".to_string(),
            },
            refresh: RefreshConfig::default(),
            normalize: FieldAliases::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.corpus.collection.trim().is_empty() {
        bail!("corpus.collection must not be empty");
    }
    if config.corpus.shape.major_label.is_empty() || config.corpus.shape.minor_label.is_empty() {
        bail!("corpus.shape labels must not be empty");
    }

    // Validate query
    if config.query.max_page_size < 1 {
        bail!("query.max_page_size must be >= 1");
    }
    if config.query.default_page_size < 1
        || config.query.default_page_size > config.query.max_page_size
    {
        bail!(
            "query.default_page_size must be in [1, {}]",
            config.query.max_page_size
        );
    }

    // Validate refresh
    if config.refresh.timeout_secs == 0 {
        bail!("refresh.timeout_secs must be > 0");
    }
    let mut names = HashSet::new();
    for source in &config.refresh.sources {
        if source.name.trim().is_empty() {
            bail!("refresh.sources entries must have a name");
        }
        if !names.insert(source.name.as_str()) {
            bail!("Duplicate refresh source name: '{}'", source.name);
        }
        match (&source.url, &source.path) {
            (Some(_), None) | (None, Some(_)) => {}
            _ => bail!(
                "refresh source '{}' must set exactly one of `url` or `path`",
                source.name
            ),
        }
    }

    if let Some(field) = config.normalize.first_empty_list() {
        bail!("normalize.{} must list at least one key", field);
    }

    Ok(())
}
