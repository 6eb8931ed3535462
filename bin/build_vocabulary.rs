// Standalone tool to derive both role vocabularies from the corpus aggregates
// Usage: cargo run --bin build_vocabulary -- [config.json] [output_dir]

use anyhow::Result;
use std::env;
use std::path::{Path, PathBuf};

use duet_app::{corpus::CorpusAggregates, Config};
use duet_core::Vocabulary;

fn main() -> Result<()> {
    duet_app::logging::init(false, false);

    let args: Vec<String> = env::args().collect();
    let config = Config::load(args.get(1).map(Path::new))?;
    let output_dir = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/vocabulary"));

    println!("Reading corpus aggregates from:");
    println!("  {}", config.keyboard_notes_path.display());
    println!("  {}", config.string_notes_path.display());
    let aggregates = CorpusAggregates::load(&config)?;

    std::fs::create_dir_all(&output_dir)?;
    for (name, sequence) in [("keyboard", &aggregates.keyboard), ("string", &aggregates.string)] {
        let vocabulary = Vocabulary::build(sequence.iter());
        let path = output_dir.join(format!("{}.json", name));
        std::fs::write(&path, serde_json::to_string_pretty(&vocabulary)?)?;
        println!("{} vocabulary: {} tokens -> {}", name, vocabulary.len(), path.display());
    }

    println!("Done! {} tokens per role", aggregates.len());
    Ok(())
}
