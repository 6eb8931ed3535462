//! Generation: seed file -> one window -> transducer -> two MIDI files

use std::path::PathBuf;

use anyhow::{Context, Result};
use thiserror::Error;

use duet_core::{one_hot, Role, TokenSequence, WindowSet};
use midi_to_tokens::{InstrumentExtractor, MidiRenderer, Score};

use crate::config::{ensure_parent, Config};
use crate::corpus::CorpusAggregates;
use crate::train::verify_vocabulary;
use crate::transducer::{Checkpoint, SequenceTransducer, SoftmaxTransducer};

#[derive(Debug, Error)]
pub enum GenerateError {
    /// The seed uses a token the keyboard vocabulary has never seen
    #[error("seed token '{token}' at position {position} is not in the keyboard vocabulary")]
    UnknownToken { token: String, position: usize },

    #[error("seed has {len} tokens, at least 2 are needed")]
    SeedTooShort { len: usize },

    #[error("no trained weights at {0}; run `duet train` first")]
    MissingWeights(PathBuf),

    #[error("model predicted code {0}, outside the string vocabulary")]
    InvalidPrediction(u32),

    #[error(transparent)]
    Vocabulary(#[from] duet_core::Error),
}

/// What one generation run produced
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    /// The seed window, as fed to the model
    pub keyboard: TokenSequence,
    pub string: TokenSequence,
}

/// Run one seed through a trained checkpoint.
///
/// The seed becomes a single window of `len - 1` tokens, the same shape
/// training windows have for a sequence one longer than the window.
pub fn generate_tokens<T: SequenceTransducer>(
    checkpoint: &Checkpoint<T>,
    seed: &TokenSequence,
) -> std::result::Result<Generation, GenerateError> {
    if seed.len() < 2 {
        return Err(GenerateError::SeedTooShort { len: seed.len() });
    }

    let keyboard_vocabulary = &checkpoint.keyboard_vocabulary;
    let codes = keyboard_vocabulary.encode(seed).map_err(|e| match e {
        duet_core::Error::UnknownToken { token, position } => {
            GenerateError::UnknownToken { token, position }
        }
        other => GenerateError::Vocabulary(other),
    })?;

    let windows = WindowSet::new(codes, seed.len() - 1)?;
    let Some(window) = windows.get(0) else {
        return Err(GenerateError::SeedTooShort { len: seed.len() });
    };

    let prediction = checkpoint
        .model
        .predict(&one_hot(window, keyboard_vocabulary.len()));

    let string = checkpoint
        .string_vocabulary
        .decode(&prediction)
        .map_err(|e| match e {
            duet_core::Error::UnknownCode { code, .. } => GenerateError::InvalidPrediction(code),
            other => GenerateError::Vocabulary(other),
        })?;
    let keyboard = keyboard_vocabulary.decode(window)?;

    Ok(Generation { keyboard, string })
}

/// Tokens of the seed file: every pitched part, or one role
pub fn seed_tokens(config: &Config, role: Option<Role>) -> Result<TokenSequence> {
    let score = Score::from_file(&config.seed_path)
        .with_context(|| format!("Failed to read seed {}", config.seed_path.display()))?;
    let extractor = InstrumentExtractor::new(config.divisor);
    Ok(match role {
        Some(role) => extractor.extract(&score, role),
        None => extractor.extract_all(&score),
    })
}

/// Generate from the configured seed and write both output files
pub fn generate(config: &Config, role: Option<Role>) -> Result<Generation> {
    let checkpoint = Checkpoint::<SoftmaxTransducer>::load_if_exists(&config.weights_path)?
        .ok_or_else(|| GenerateError::MissingWeights(config.weights_path.clone()))?;

    // Stored vocabularies must still describe the corpus on disk
    if CorpusAggregates::exists(config) {
        let aggregates = CorpusAggregates::load(config)?;
        verify_vocabulary(
            "keyboard",
            &checkpoint.keyboard_vocabulary,
            &duet_core::Vocabulary::build(aggregates.keyboard.iter()),
        )?;
        verify_vocabulary(
            "string",
            &checkpoint.string_vocabulary,
            &duet_core::Vocabulary::build(aggregates.string.iter()),
        )?;
    } else {
        log::warn!("No corpus aggregates found, using the vocabularies stored with the weights");
    }

    let seed = seed_tokens(config, role)?;
    log::info!("Seed {} has {} tokens", config.seed_path.display(), seed.len());

    let generation = generate_tokens(&checkpoint, &seed)?;

    let renderer = MidiRenderer::default();
    for (tokens, path) in [
        (&generation.keyboard, &config.keyboard_output_path),
        (&generation.string, &config.string_output_path),
    ] {
        ensure_parent(path)?;
        renderer
            .render_to_file(tokens, path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Output saved to {}", path.display());
    }

    Ok(generation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_core::Vocabulary;

    fn checkpoint() -> Checkpoint<SoftmaxTransducer> {
        let keyboard_vocabulary = Vocabulary::build(["C4", "D4", "Rest"]);
        let string_vocabulary = Vocabulary::build(["G3", "Rest"]);
        Checkpoint {
            model: SoftmaxTransducer::new(keyboard_vocabulary.len(), string_vocabulary.len(), 0.1),
            keyboard_vocabulary,
            string_vocabulary,
            window_length: 2,
            epoch: 1,
            loss: 1.0,
        }
    }

    #[test]
    fn test_window_drops_last_seed_token() {
        let seed = TokenSequence::from(&["C4", "Rest", "D4", "C4"][..]);
        let generation = generate_tokens(&checkpoint(), &seed).unwrap();

        assert_eq!(generation.keyboard.as_slice(), ["C4", "Rest", "D4"]);
        assert_eq!(generation.string.len(), 3);
    }

    #[test]
    fn test_unknown_seed_token_is_fatal() {
        let seed = TokenSequence::from(&["C4", "F#4", "D4"][..]);
        match generate_tokens(&checkpoint(), &seed) {
            Err(GenerateError::UnknownToken { token, position }) => {
                assert_eq!(token, "F#4");
                assert_eq!(position, 1);
            }
            other => panic!("expected UnknownToken, got {:?}", other),
        }
    }

    #[test]
    fn test_short_seed() {
        let seed = TokenSequence::from(&["C4"][..]);
        assert!(matches!(
            generate_tokens(&checkpoint(), &seed),
            Err(GenerateError::SeedTooShort { len: 1 })
        ));
    }

    #[test]
    fn test_missing_weights() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.rebase(dir.path());

        let err = generate(&config, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GenerateError>(),
            Some(GenerateError::MissingWeights(_))
        ));
    }
}
