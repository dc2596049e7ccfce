//! # Hymnal
//!
//! Normalization and query engine for a scriptural hymn corpus.
//!
//! A single authoritative JSON document (nested arrays or label-keyed
//! objects) is flattened into a uniform list of hymns, each with its verses,
//! combined text, and attribution and subject metadata filled in from
//! explicit fields or lookup tables. The result is searchable by text,
//! filterable by facet, and paginated, through a CLI and a small HTTP API.
//! A separate refresh path merges records from remote or local sources into
//! a flat artifact on disk.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐
//! │  Backing    │──▶│  Builder     │──▶│ CorpusCache  │
//! │  document   │   │ shape + infer│   │ (lazy, once) │
//! └─────────────┘   └─────────────┘   └──────┬───────┘
//!                                            │
//!                        ┌───────────────────┤
//!                        ▼                   ▼
//!                   ┌──────────┐       ┌──────────┐
//!                   │   CLI    │       │   HTTP   │
//!                   │ (hymnal) │       │  (axum)  │
//!                   └──────────┘       └──────────┘
//!
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐
//! │  Sources    │──▶│ Normalizer   │──▶│  Aggregator  │──▶ artifact + backups
//! │ HTTP / file │   │ alias tables │   │ dedup/fallback│
//! └─────────────┘   └─────────────┘   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! hymnal stats                          # inspect the backing document
//! hymnal query agni --subject Agni      # search from the command line
//! hymnal get "Rig Veda 1.1"             # print one hymn
//! hymnal refresh                        # merge configured sources
//! hymnal serve                          # start the HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Typed corpus-load and refresh errors |
//! | [`models`] | Core data types |
//! | [`fields`] | Key-path lookup over raw JSON |
//! | [`normalize`] | Alias-driven record normalization |
//! | [`inference`] | Attribution and subject lookup tables |
//! | [`builder`] | Shape detection and flattening |
//! | [`corpus`] | In-memory corpus and lazy cache |
//! | [`query`] | Text search, facets, pagination |
//! | [`sources`] | Source providers and payload decoding |
//! | [`refresh`] | Aggregation, backups, artifact writing |
//! | [`get`] | Single-hymn lookup |
//! | [`stats`] | Corpus statistics |
//! | [`server`] | HTTP server |

pub mod builder;
pub mod config;
pub mod corpus;
pub mod error;
pub mod fields;
pub mod get;
pub mod inference;
pub mod models;
pub mod normalize;
pub mod query;
pub mod refresh;
pub mod server;
pub mod sources;
pub mod stats;
