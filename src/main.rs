use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use duet_app::{config::Config, corpus, generate, logging, train, Overrides};
use duet_core::Role;

#[derive(Parser, Debug)]
#[command(name = "duet")]
#[command(about = "Build keyboard/string duet corpora from MIDI, train on them and generate", long_about = None)]
struct Args {
    /// JSON config file; unset fields keep their defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Suppress informational messages (only warnings and errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Show per-file details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan the song directory and write the manifest, statistics and exceptions log
    Prepare,

    /// Fold the manifest files into the two corpus aggregates
    Build,

    /// Train the transducer on the corpus (resumes from existing weights)
    Train,

    /// Generate keyboard and string MIDI files from the seed
    Generate {
        /// Part(s) of the seed to use
        #[arg(short, long, value_enum, default_value = "all")]
        role: SeedPart,
    },

    /// Print the effective configuration as JSON
    Config,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SeedPart {
    All,
    Keyboard,
    String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.quiet, args.verbose);

    let mut config = Config::load(args.config.as_deref())?;
    config.apply_overrides(&args.overrides);

    match args.command {
        Command::Prepare => {
            let summary = corpus::prepare_dataset(&config)?;
            println!(
                "{} of {} files accepted ({} qualified, {} failed)",
                summary.accepted, summary.scanned, summary.qualified, summary.failed
            );
        }
        Command::Build => {
            let aggregates = corpus::build_and_save(&config)?;
            println!("{} aligned tokens per role", aggregates.len());
        }
        Command::Train => {
            let report = train::train(&config)?;
            println!(
                "Trained {} epochs{}, best loss {}",
                report.history.len(),
                if report.stopped_early { " (stopped early)" } else { "" },
                report
                    .best_loss
                    .map(|l| format!("{:.4}", l))
                    .unwrap_or_else(|| "n/a".to_string())
            );
        }
        Command::Generate { role } => {
            let role = match role {
                SeedPart::All => None,
                SeedPart::Keyboard => Some(Role::Keyboard),
                SeedPart::String => Some(Role::String),
            };
            let generation = generate::generate(&config, role)?;
            println!(
                "Generated {} tokens: {} and {}",
                generation.string.len(),
                config.keyboard_output_path.display(),
                config.string_output_path.display()
            );
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
