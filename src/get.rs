//! Single-hymn lookup by reference.

use anyhow::{bail, Result};

use crate::builder::CorpusBuilder;
use crate::config::Config;
use crate::corpus::{load_corpus, Corpus};
use crate::models::CanonicalHymn;

/// Find a hymn by its exact reference (e.g. `"Rig Veda 1.1"`).
pub fn find_hymn<'a>(corpus: &'a Corpus, reference: &str) -> Option<&'a CanonicalHymn> {
    corpus.hymns().iter().find(|h| h.reference == reference)
}

/// CLI entry point: print one hymn with all of its verses.
pub fn run_get(config: &Config, reference: &str, json: bool) -> Result<()> {
    let builder = CorpusBuilder::from_config(&config.corpus)?;
    let corpus = load_corpus(&config.corpus.path, &builder)?;
    let Some(hymn) = find_hymn(&corpus, reference) else {
        bail!("hymn not found: {}", reference);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(hymn)?);
        return Ok(());
    }

    println!("--- Hymn ---");
    println!("reference:   {}", hymn.reference);
    if let Some(attribution) = &hymn.attribution {
        println!("attribution: {}", attribution);
    }
    if let Some(subject) = &hymn.subject {
        println!("subject:     {}", subject);
    }
    if let Some(theme) = &hymn.theme {
        println!("theme:       {}", theme);
    }
    println!("verses:      {}", hymn.verse_count);
    println!();

    for (i, verse) in hymn.verses.iter().enumerate() {
        println!("[verse {}]", verse.number.unwrap_or(i as u32 + 1));
        for text in [
            &verse.original_script,
            &verse.transliteration,
            &verse.translation,
        ] {
            if !text.is_empty() {
                println!("{}", text);
            }
        }
        println!();
    }

    Ok(())
}
