//! Batch pipeline for keyboard/string MIDI duets
//!
//! `prepare` filters a MIDI collection down to files with one keyboard and
//! one string part of similar length, `build` folds those files into two
//! aligned token corpora, `train` fits a sequence transducer on windows of
//! them and `generate` turns a seed file into a string part.

pub mod config;
pub mod corpus;
pub mod generate;
pub mod logging;
pub mod train;
pub mod transducer;

pub use config::{Config, Overrides, TrainingConfig};
pub use corpus::{build_and_save, prepare_dataset, CorpusAggregates, PrepareSummary};
pub use generate::{generate, GenerateError, Generation};
pub use train::{train, TrainReport};
pub use transducer::{Checkpoint, SequenceTransducer, SoftmaxTransducer};
