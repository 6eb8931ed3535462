use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};

use duet_core::{Role, TokenSequence};
use midi_to_tokens::{InstrumentExtractor, MidiRenderer, Score, DEFAULT_DIVISOR};

#[derive(Parser, Debug)]
#[command(name = "midi-to-tokens")]
#[command(about = "Convert MIDI files to keyboard/string token streams and back", long_about = None)]
struct Args {
    /// Suppress informational messages (only errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the token stream of a MIDI file
    Tokens {
        midi: PathBuf,

        /// Which part(s) to extract
        #[arg(short, long, value_enum, default_value = "all")]
        role: Selection,

        /// Onset grid, in steps per quarter note
        #[arg(short, long, default_value_t = DEFAULT_DIVISOR)]
        divisor: u32,

        /// Print a JSON array instead of one token per line
        #[arg(long)]
        json: bool,
    },

    /// Render a JSON token array to a MIDI file
    Render {
        tokens: PathBuf,

        /// Output file path (default: `<tokens-name>.mid`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the tracks of a MIDI file and the instrument each resolves to
    Info { midi: PathBuf },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Selection {
    All,
    Keyboard,
    String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match args.command {
        Command::Tokens {
            midi,
            role,
            divisor,
            json,
        } => {
            let score = load_score(&midi)?;
            let extractor = InstrumentExtractor::new(divisor);
            let tokens = match role {
                Selection::All => extractor.extract_all(&score),
                Selection::Keyboard => extractor.extract(&score, Role::Keyboard),
                Selection::String => extractor.extract(&score, Role::String),
            };

            log::info!("{} tokens from {}", tokens.len(), midi.display());

            if json {
                println!("{}", serde_json::to_string(&tokens)?);
            } else {
                for token in &tokens {
                    println!("{}", token);
                }
            }
        }
        Command::Render { tokens, output } => {
            let text = fs::read_to_string(&tokens)
                .with_context(|| format!("Failed to read {}", tokens.display()))?;
            let sequence: TokenSequence = serde_json::from_str(&text)
                .with_context(|| format!("{} is not a JSON array of tokens", tokens.display()))?;

            let output_path = output.unwrap_or_else(|| tokens.with_extension("mid"));
            MidiRenderer::default()
                .render_to_file(&sequence, &output_path)
                .with_context(|| format!("Failed to render {}", output_path.display()))?;

            log::info!("Output saved to {}", output_path.display());
        }
        Command::Info { midi } => {
            let score = load_score(&midi)?;
            println!(
                "{} ({} ticks per quarter, {} notes)",
                midi.display(),
                score.ticks_per_quarter,
                score.note_count()
            );
            for part in &score.parts {
                let role = part.role().map(|r| r.to_string()).unwrap_or_else(|| "-".into());
                println!(
                    "  track {:>2}  {:<24} {:<18} {:<8} {} notes",
                    part.index,
                    part.name.as_deref().unwrap_or("(unnamed)"),
                    part.instrument.to_string(),
                    role,
                    part.notes.len()
                );
            }
        }
    }

    Ok(())
}

fn load_score(path: &Path) -> Result<Score> {
    if !path.exists() {
        anyhow::bail!("MIDI file not found: {}", path.display());
    }
    Score::from_file(path).with_context(|| format!("Failed to parse {}", path.display()))
}
