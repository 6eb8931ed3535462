//! Layered configuration: built-in defaults, an optional JSON file, then
//! command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use duet_core::DEFAULT_WINDOW_LENGTH;
use midi_to_tokens::DEFAULT_DIVISOR;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Searched recursively for `.mid`/`.midi` files
    pub song_dir: PathBuf,
    /// Files that passed the length filter, one path per line
    pub manifest_path: PathBuf,
    pub exceptions_path: PathBuf,
    /// Per-file statistics (`Percentage,Note_P,Note_S,Path`)
    pub stats_path: PathBuf,

    pub keyboard_notes_path: PathBuf,
    pub string_notes_path: PathBuf,
    pub weights_path: PathBuf,
    pub log_dir: PathBuf,

    pub keyboard_output_path: PathBuf,
    pub string_output_path: PathBuf,
    pub seed_path: PathBuf,

    pub window_length: usize,
    /// Largest accepted `(max - min) / max` between the two role lengths
    pub tolerance: f64,
    /// Onset grid, in steps per quarter note
    pub divisor: u32,
    /// Worker threads for corpus preparation, 0 for one per core
    pub workers: usize,

    pub training: TrainingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub validation_split: f64,
    /// Epochs without validation improvement before stopping
    pub patience: usize,
    pub learning_rate: f32,
    pub shuffle_seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            song_dir: PathBuf::from("midi_songs"),
            manifest_path: PathBuf::from("data/prepared_dataset/all_songs.txt"),
            exceptions_path: PathBuf::from("data/prepared_dataset/exceptions.txt"),
            stats_path: PathBuf::from("data/prepared_dataset/midi_file_data.csv"),
            keyboard_notes_path: PathBuf::from("data/notes/keyboard_notes.json"),
            string_notes_path: PathBuf::from("data/notes/string_notes.json"),
            weights_path: PathBuf::from("data/weights/weights.json"),
            log_dir: PathBuf::from("data/logs"),
            keyboard_output_path: PathBuf::from("data/generated_midi/output_k.mid"),
            string_output_path: PathBuf::from("data/generated_midi/output_s.mid"),
            seed_path: PathBuf::from("data/seed.mid"),
            window_length: DEFAULT_WINDOW_LENGTH,
            tolerance: 0.1,
            divisor: DEFAULT_DIVISOR,
            workers: 0,
            training: TrainingConfig::default(),
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 200,
            batch_size: 128,
            validation_split: 0.3,
            patience: 3,
            learning_rate: 0.5,
            shuffle_seed: 42,
        }
    }
}

/// Command-line overrides; every field left unset keeps the loaded value
#[derive(Debug, Clone, Default, clap::Args)]
pub struct Overrides {
    /// Directory searched for MIDI files
    #[arg(long, global = true)]
    pub song_dir: Option<PathBuf>,

    /// Directory for every generated artifact (manifest, notes, weights, output)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    pub window_length: Option<usize>,

    #[arg(long, global = true)]
    pub tolerance: Option<f64>,

    #[arg(long, global = true)]
    pub workers: Option<usize>,

    #[arg(long, global = true)]
    pub epochs: Option<usize>,

    #[arg(long, global = true)]
    pub batch_size: Option<usize>,

    /// Seed MIDI file for generation
    #[arg(long, global = true)]
    pub seed: Option<PathBuf>,
}

impl Config {
    /// Defaults, overlaid with the JSON file at `path` when one is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(data_dir) = &overrides.data_dir {
            self.rebase(data_dir);
        }
        if let Some(song_dir) = &overrides.song_dir {
            self.song_dir = song_dir.clone();
        }
        if let Some(window_length) = overrides.window_length {
            self.window_length = window_length;
        }
        if let Some(tolerance) = overrides.tolerance {
            self.tolerance = tolerance;
        }
        if let Some(workers) = overrides.workers {
            self.workers = workers;
        }
        if let Some(epochs) = overrides.epochs {
            self.training.epochs = epochs;
        }
        if let Some(batch_size) = overrides.batch_size {
            self.training.batch_size = batch_size;
        }
        if let Some(seed) = &overrides.seed {
            self.seed_path = seed.clone();
        }
    }

    /// Put every generated artifact under `dir`, keeping the file names
    pub fn rebase(&mut self, dir: &Path) {
        let under = |path: &Path, sub: &str| {
            let name = path.file_name().map(PathBuf::from).unwrap_or_default();
            dir.join(sub).join(name)
        };

        self.manifest_path = under(&self.manifest_path, "prepared_dataset");
        self.exceptions_path = under(&self.exceptions_path, "prepared_dataset");
        self.stats_path = under(&self.stats_path, "prepared_dataset");
        self.keyboard_notes_path = under(&self.keyboard_notes_path, "notes");
        self.string_notes_path = under(&self.string_notes_path, "notes");
        self.weights_path = under(&self.weights_path, "weights");
        self.log_dir = dir.join("logs");
        self.keyboard_output_path = under(&self.keyboard_output_path, "generated_midi");
        self.string_output_path = under(&self.string_output_path, "generated_midi");
        self.seed_path = dir.join(self.seed_path.file_name().map(PathBuf::from).unwrap_or_default());
    }
}

/// Create the parent directory of `path` if it has one
pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.window_length, 100);
        assert_eq!(config.tolerance, 0.1);
        assert_eq!(config.training.epochs, 200);
        assert_eq!(config.training.batch_size, 128);
        assert_eq!(config.training.validation_split, 0.3);
        assert_eq!(config.training.patience, 3);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("duet.json");
        fs::write(&path, r#"{ "window_length": 32, "training": { "epochs": 5 } }"#).unwrap();

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.window_length, 32);
        assert_eq!(config.training.epochs, 5);
        assert_eq!(config.training.batch_size, 128);
        assert_eq!(config.song_dir, PathBuf::from("midi_songs"));
    }

    #[test]
    fn test_bad_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ window_length: ").unwrap();

        assert!(Config::load(Some(&path)).is_err());
        assert!(Config::load(Some(&dir.path().join("missing.json"))).is_err());
    }

    #[test]
    fn test_overrides_win() {
        let mut config = Config::default();
        config.apply_overrides(&Overrides {
            data_dir: Some(PathBuf::from("/tmp/run")),
            epochs: Some(3),
            seed: Some(PathBuf::from("song.mid")),
            ..Overrides::default()
        });

        assert_eq!(config.training.epochs, 3);
        assert_eq!(config.manifest_path, PathBuf::from("/tmp/run/prepared_dataset/all_songs.txt"));
        assert_eq!(config.weights_path, PathBuf::from("/tmp/run/weights/weights.json"));
        // An explicit seed is applied after the rebase
        assert_eq!(config.seed_path, PathBuf::from("song.mid"));
    }
}
