//! Corpus statistics.
//!
//! A quick summary of what the builder made of the backing document: its
//! detected shape, hymn and verse counts, how many hymns ended up with an
//! attribution or subject, and a per-major-group breakdown. Used by
//! `hymnal stats` to check a new or refreshed document before serving it.

use anyhow::Result;
use std::collections::BTreeMap;

use crate::builder::CorpusBuilder;
use crate::config::Config;
use crate::corpus::{load_corpus, Corpus};

/// Counts for one major group.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GroupStats {
    pub hymns: usize,
    pub verses: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CorpusStats {
    pub hymns: usize,
    pub verses: usize,
    pub with_attribution: usize,
    pub with_subject: usize,
    pub by_major: BTreeMap<u32, GroupStats>,
}

pub fn corpus_stats(corpus: &Corpus) -> CorpusStats {
    let mut stats = CorpusStats {
        hymns: corpus.len(),
        verses: corpus.verse_count(),
        ..Default::default()
    };
    for hymn in corpus.hymns() {
        stats.with_attribution += usize::from(hymn.attribution.is_some());
        stats.with_subject += usize::from(hymn.subject.is_some());
        if let Some(major) = hymn.major_group {
            let group = stats.by_major.entry(major).or_default();
            group.hymns += 1;
            group.verses += hymn.verse_count;
        }
    }
    stats
}

fn percent(part: usize, whole: usize) -> usize {
    if whole > 0 {
        part * 100 / whole
    } else {
        0
    }
}

/// Run the stats command: build the corpus and print a summary.
pub fn run_stats(config: &Config) -> Result<()> {
    let builder = CorpusBuilder::from_config(&config.corpus)?;
    let corpus = load_corpus(&config.corpus.path, &builder)?;
    let stats = corpus_stats(&corpus);

    let shape = corpus
        .shape()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("Hymnal — Corpus Stats");
    println!("=====================");
    println!();
    println!("  Document:    {}", config.corpus.path.display());
    println!("  Shape:       {}", shape);
    println!("  Collection:  {}", builder.collection());
    println!();
    println!("  Hymns:       {}", stats.hymns);
    println!("  Verses:      {}", stats.verses);
    println!(
        "  Attributed:  {} / {} ({}%)",
        stats.with_attribution,
        stats.hymns,
        percent(stats.with_attribution, stats.hymns)
    );
    println!(
        "  Subject:     {} / {} ({}%)",
        stats.with_subject,
        stats.hymns,
        percent(stats.with_subject, stats.hymns)
    );

    if !stats.by_major.is_empty() {
        println!();
        println!("  By major group:");
        println!("  {:<8} {:>8} {:>8}", "GROUP", "HYMNS", "VERSES");
        println!("  {}", "-".repeat(26));
        for (major, group) in &stats.by_major {
            println!("  {:<8} {:>8} {:>8}", major, group.hymns, group.verses);
        }
    }

    Ok(())
}
