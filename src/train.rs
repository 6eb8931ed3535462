//! Training driver
//!
//! Windows the corpus aggregates, holds out the tail as validation data,
//! resumes from an existing checkpoint, writes a checkpoint whenever the
//! training loss improves and stops once validation loss stalls.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use duet_core::{one_hot, Error, SequenceWindower, Vocabulary, WindowSet};

use crate::config::{ensure_parent, Config, TrainingConfig};
use crate::corpus::{self, CorpusAggregates};
use crate::transducer::{Checkpoint, OneHotWindow, SequenceTransducer, SoftmaxTransducer};

/// Windowed, integer-encoded training pairs
pub struct TrainingData {
    pub keyboard_vocabulary: Vocabulary,
    pub string_vocabulary: Vocabulary,
    pub inputs: WindowSet,
    pub targets: WindowSet,
}

impl TrainingData {
    pub fn from_aggregates(aggregates: &CorpusAggregates, window_length: usize) -> Result<Self> {
        let keyboard_vocabulary = Vocabulary::build(aggregates.keyboard.iter());
        let string_vocabulary = Vocabulary::build(aggregates.string.iter());

        let windower = SequenceWindower::new(window_length)?;
        let inputs = windower.window(&aggregates.keyboard, &keyboard_vocabulary)?;
        let targets = windower.window(&aggregates.string, &string_vocabulary)?;

        Ok(Self {
            keyboard_vocabulary,
            string_vocabulary,
            inputs,
            targets,
        })
    }

    /// Number of (input, target) window pairs
    pub fn len(&self) -> usize {
        self.inputs.len().min(self.targets.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn one_hot_batch(&self, indices: &[usize]) -> (Vec<OneHotWindow>, Vec<&[u32]>) {
        let width = self.keyboard_vocabulary.len();
        indices
            .iter()
            .filter_map(|&i| Some((self.inputs.get(i)?, self.targets.get(i)?)))
            .map(|(input, target)| (one_hot(input, width), target))
            .unzip()
    }

    /// Check a stored vocabulary pair against the one derived from the corpus
    pub fn verify(&self, keyboard: &Vocabulary, string: &Vocabulary) -> duet_core::Result<()> {
        verify_vocabulary("keyboard", keyboard, &self.keyboard_vocabulary)?;
        verify_vocabulary("string", string, &self.string_vocabulary)
    }
}

pub fn verify_vocabulary(role: &str, stored: &Vocabulary, derived: &Vocabulary) -> duet_core::Result<()> {
    if stored == derived {
        Ok(())
    } else {
        Err(Error::VocabularyMismatch {
            role: role.to_string(),
            stored: stored.len(),
            derived: derived.len(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
    pub epoch: usize,
    pub loss: f64,
    pub val_loss: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainReport {
    pub history: Vec<EpochRecord>,
    /// Epoch the run started after (0 for a fresh model)
    pub resumed_from: usize,
    pub best_loss: Option<f64>,
    pub checkpoints_written: usize,
    pub stopped_early: bool,
}

/// Train `checkpoint.model` on `data` and persist improvements to `weights_path`
pub fn fit<T>(
    checkpoint: &mut Checkpoint<T>,
    data: &TrainingData,
    settings: &TrainingConfig,
    weights_path: &Path,
) -> Result<TrainReport>
where
    T: SequenceTransducer + Serialize + DeserializeOwned,
{
    let total = data.len();
    let held_out = ((total as f64) * settings.validation_split.clamp(0.0, 1.0)).floor() as usize;
    let train_count = total - held_out.min(total);
    let validation: Vec<usize> = (train_count..total).collect();
    let mut order: Vec<usize> = (0..train_count).collect();

    let mut rng = StdRng::seed_from_u64(settings.shuffle_seed);
    let batch_size = settings.batch_size.max(1);

    let mut report = TrainReport {
        resumed_from: checkpoint.epoch,
        best_loss: (checkpoint.epoch > 0).then_some(checkpoint.loss),
        ..TrainReport::default()
    };
    let mut best_monitored = f64::INFINITY;
    let mut stale_epochs = 0;

    log::info!(
        "Training on {} windows, validating on {} (epochs {}..={})",
        train_count,
        validation.len(),
        checkpoint.epoch + 1,
        settings.epochs
    );

    for epoch in (checkpoint.epoch + 1)..=settings.epochs {
        order.shuffle(&mut rng);

        let mut loss_sum = 0.0;
        for batch in order.chunks(batch_size) {
            let (inputs, targets) = data.one_hot_batch(batch);
            loss_sum += checkpoint.model.fit_batch(&inputs, &targets) * batch.len() as f64;
        }
        let loss = if train_count == 0 { 0.0 } else { loss_sum / train_count as f64 };

        let val_loss = if validation.is_empty() {
            None
        } else {
            let mut sum = 0.0;
            for batch in validation.chunks(batch_size) {
                let (inputs, targets) = data.one_hot_batch(batch);
                sum += checkpoint.model.evaluate_batch(&inputs, &targets) * batch.len() as f64;
            }
            Some(sum / validation.len() as f64)
        };

        log::info!(
            "epoch {}/{}: loss {:.4}{}",
            epoch,
            settings.epochs,
            loss,
            val_loss.map(|v| format!(", val_loss {:.4}", v)).unwrap_or_default()
        );
        report.history.push(EpochRecord { epoch, loss, val_loss });

        // Checkpoint only on training loss improvement
        if report.best_loss.map_or(true, |best| loss < best) {
            report.best_loss = Some(loss);
            checkpoint.epoch = epoch;
            checkpoint.loss = loss;
            checkpoint.save(weights_path)?;
            report.checkpoints_written += 1;
            log::debug!("loss improved, saved {}", weights_path.display());
        }

        // Early stopping watches validation loss, or training loss without a validation set
        let monitored = val_loss.unwrap_or(loss);
        if monitored < best_monitored {
            best_monitored = monitored;
            stale_epochs = 0;
        } else {
            stale_epochs += 1;
            if stale_epochs >= settings.patience {
                log::info!("No improvement for {} epochs, stopping", stale_epochs);
                report.stopped_early = true;
                break;
            }
        }
    }

    Ok(report)
}

/// Append the epoch history to `<log_dir>/history.csv`
pub fn write_history(log_dir: &Path, history: &[EpochRecord]) -> Result<()> {
    let path = log_dir.join("history.csv");
    ensure_parent(&path)?;

    let append = path.exists();
    let file = File::options()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new().has_headers(!append).from_writer(file);
    for record in history {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Load or build the corpus, then train the baseline transducer
pub fn train(config: &Config) -> Result<TrainReport> {
    let aggregates = corpus::load_or_build(config)?;
    let data = TrainingData::from_aggregates(&aggregates, config.window_length)?;

    if data.is_empty() {
        anyhow::bail!(
            "corpus has {} tokens per role, too short for windows of {}",
            aggregates.len(),
            config.window_length
        );
    }

    log::info!(
        "Vocabulary: {} keyboard tokens, {} string tokens",
        data.keyboard_vocabulary.len(),
        data.string_vocabulary.len()
    );

    let mut checkpoint = match Checkpoint::<SoftmaxTransducer>::load_if_exists(&config.weights_path)? {
        Some(mut checkpoint) => {
            data.verify(&checkpoint.keyboard_vocabulary, &checkpoint.string_vocabulary)
                .context("Stored weights were trained on a different corpus")?;
            if checkpoint.window_length != config.window_length {
                anyhow::bail!(
                    "stored weights use window length {}, configured {}",
                    checkpoint.window_length,
                    config.window_length
                );
            }
            checkpoint.model.set_learning_rate(config.training.learning_rate);
            log::info!("Resuming from {} (epoch {})", config.weights_path.display(), checkpoint.epoch);
            checkpoint
        }
        None => Checkpoint {
            model: SoftmaxTransducer::new(
                data.keyboard_vocabulary.len(),
                data.string_vocabulary.len(),
                config.training.learning_rate,
            ),
            keyboard_vocabulary: data.keyboard_vocabulary.clone(),
            string_vocabulary: data.string_vocabulary.clone(),
            window_length: config.window_length,
            epoch: 0,
            loss: f64::INFINITY,
        },
    };

    let report = fit(&mut checkpoint, &data, &config.training, &config.weights_path)?;
    write_history(&config.log_dir, &report.history)?;
    Ok(report)
}
