//! Dataset preparation and corpus building
//!
//! Preparation scans the song directory, evaluates every file on a rayon
//! pool and funnels the outcomes over a channel to one writer thread that
//! owns the manifest, the statistics CSV and the exceptions log. Outcomes
//! are written in discovery order whatever order the workers finish in.
//!
//! Building reads the manifest and folds the aligned per-file role pairs
//! into two corpus-wide token sequences.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use duet_core::{align, LengthStats, Role, TokenSequence};
use midi_to_tokens::{InstrumentExtractor, Score};

use crate::config::{ensure_parent, Config};

/// One row of the statistics CSV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsRow {
    #[serde(rename = "Percentage")]
    pub percentage: f64,
    #[serde(rename = "Note_P")]
    pub keyboard_notes: usize,
    #[serde(rename = "Note_S")]
    pub string_notes: usize,
    #[serde(rename = "Path")]
    pub path: String,
}

/// Why a readable file was left out without being an error
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Not exactly two instruments carry notes
    InstrumentCount(usize),
    /// Two instruments, but not one keyboard and one string
    Roles,
    /// Both role streams came out empty
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// Within tolerance: a statistics row and a manifest entry
    Accepted { path: PathBuf, stats: LengthStats },
    /// Qualified but too far apart in length: a statistics row only
    Rejected { path: PathBuf, stats: LengthStats },
    Skipped { path: PathBuf, reason: SkipReason },
    Failed { path: PathBuf, error: String },
}

impl FileOutcome {
    pub fn path(&self) -> &Path {
        match self {
            FileOutcome::Accepted { path, .. }
            | FileOutcome::Rejected { path, .. }
            | FileOutcome::Skipped { path, .. }
            | FileOutcome::Failed { path, .. } => path,
        }
    }

    pub fn stats(&self) -> Option<&LengthStats> {
        match self {
            FileOutcome::Accepted { stats, .. } | FileOutcome::Rejected { stats, .. } => Some(stats),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrepareSummary {
    pub scanned: usize,
    /// Files with one keyboard and one string instrument
    pub qualified: usize,
    pub accepted: usize,
    pub failed: usize,
}

fn is_midi(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("mid") || e.eq_ignore_ascii_case("midi"))
        .unwrap_or(false)
}

/// All MIDI files under `dir`, recursively, sorted by path.
///
/// Symbolic links are not followed. Entries that cannot be read are logged
/// and left out.
pub fn discover_midi_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("Song directory {} does not exist", dir.display());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("skipping unreadable entry under {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_midi(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    Ok(files)
}

/// Structural filter: exactly two instruments with notes, one per role
pub fn check_structure(score: &Score) -> std::result::Result<(), SkipReason> {
    let partition = score.partition_by_instrument();
    if partition.len() != 2 {
        return Err(SkipReason::InstrumentCount(partition.len()));
    }

    let roles: Vec<Option<Role>> = partition.keys().map(|i| i.role()).collect();
    match roles.as_slice() {
        [Some(Role::Keyboard), Some(Role::String)] | [Some(Role::String), Some(Role::Keyboard)] => {
            Ok(())
        }
        _ => Err(SkipReason::Roles),
    }
}

pub fn evaluate_file(path: &Path, extractor: &InstrumentExtractor, tolerance: f64) -> FileOutcome {
    let path_buf = path.to_path_buf();

    let score = match Score::from_file(path) {
        Ok(score) => score,
        Err(e) => {
            return FileOutcome::Failed {
                path: path_buf,
                error: e.to_string(),
            }
        }
    };

    if let Err(reason) = check_structure(&score) {
        return FileOutcome::Skipped {
            path: path_buf,
            reason,
        };
    }

    let pair = extractor.extract_pair(&score);
    let Some(stats) = LengthStats::compute(&pair.keyboard, &pair.string) else {
        return FileOutcome::Skipped {
            path: path_buf,
            reason: SkipReason::Empty,
        };
    };

    log::debug!(
        "{}: keyboard {} tokens, string {} tokens ({:.3})",
        path.display(),
        stats.keyboard_len,
        stats.string_len,
        stats.percent_diff
    );

    if stats.within(tolerance) {
        FileOutcome::Accepted {
            path: path_buf,
            stats,
        }
    } else {
        FileOutcome::Rejected {
            path: path_buf,
            stats,
        }
    }
}

/// The three files preparation writes, all truncated at the start of a run
struct Sinks {
    manifest: BufWriter<File>,
    exceptions: BufWriter<File>,
    stats: csv::Writer<File>,
}

impl Sinks {
    fn create(config: &Config) -> Result<Self> {
        let open = |path: &Path| -> Result<File> {
            ensure_parent(path)?;
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))
        };

        Ok(Sinks {
            manifest: BufWriter::new(open(&config.manifest_path)?),
            exceptions: BufWriter::new(open(&config.exceptions_path)?),
            // The header is written with the first row; force it for empty runs
            stats: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(open(&config.stats_path)?),
        })
    }

    fn write_header(&mut self) -> Result<()> {
        self.stats.write_record(["Percentage", "Note_P", "Note_S", "Path"])?;
        Ok(())
    }

    fn write(&mut self, outcome: &FileOutcome, summary: &mut PrepareSummary) -> Result<()> {
        summary.scanned += 1;

        if let Some(stats) = outcome.stats() {
            summary.qualified += 1;
            self.stats.serialize(StatsRow {
                percentage: stats.percent_diff,
                keyboard_notes: stats.keyboard_len,
                string_notes: stats.string_len,
                path: outcome.path().display().to_string(),
            })?;
        }

        match outcome {
            FileOutcome::Accepted { path, .. } => {
                summary.accepted += 1;
                writeln!(self.manifest, "{}", path.display())?;
            }
            FileOutcome::Failed { path, error } => {
                summary.failed += 1;
                log::warn!("failed on {}: {}", path.display(), error);
                writeln!(self.exceptions, "{} {}", path.display(), error)?;
            }
            FileOutcome::Skipped { path, reason } => {
                log::debug!("skipped {}: {:?}", path.display(), reason);
            }
            FileOutcome::Rejected { .. } => {}
        }
        Ok(())
    }

    fn finish(mut self) -> Result<()> {
        self.manifest.flush()?;
        self.exceptions.flush()?;
        self.stats.flush()?;
        Ok(())
    }
}

/// Single writer: drains indexed outcomes and writes them in index order
fn write_outcomes(receiver: Receiver<(usize, FileOutcome)>, mut sinks: Sinks) -> Result<PrepareSummary> {
    let mut summary = PrepareSummary::default();
    let mut waiting: BTreeMap<usize, FileOutcome> = BTreeMap::new();
    let mut next = 0;

    sinks.write_header()?;
    for (index, outcome) in receiver {
        waiting.insert(index, outcome);
        while let Some(outcome) = waiting.remove(&next) {
            sinks.write(&outcome, &mut summary)?;
            next += 1;
        }
    }
    // Only reachable with gaps if a worker panicked
    for outcome in waiting.into_values() {
        sinks.write(&outcome, &mut summary)?;
    }

    sinks.finish()?;
    Ok(summary)
}

/// Scan the song directory and write the manifest, statistics and exceptions
pub fn prepare_dataset(config: &Config) -> Result<PrepareSummary> {
    let files = discover_midi_files(&config.song_dir)?;
    log::info!("Evaluating {} MIDI files under {}", files.len(), config.song_dir.display());

    let extractor = InstrumentExtractor::new(config.divisor);
    let tolerance = config.tolerance;
    let sinks = Sinks::create(config)?;

    let (sender, receiver) = unbounded();
    let writer = thread::spawn(move || write_outcomes(receiver, sinks));

    let evaluate_all = || {
        files
            .par_iter()
            .enumerate()
            .for_each_with(sender, |sender, (index, path)| {
                // The writer only goes away on an I/O error, reported by join below
                let _ = sender.send((index, evaluate_file(path, &extractor, tolerance)));
            });
    };

    if config.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()
            .context("Failed to build worker pool")?
            .install(evaluate_all);
    } else {
        evaluate_all();
    }

    let summary = writer
        .join()
        .map_err(|_| anyhow::anyhow!("writer thread panicked"))??;

    log::info!(
        "Scanned {}, qualified {}, accepted {}, failed {}",
        summary.scanned,
        summary.qualified,
        summary.accepted,
        summary.failed
    );
    Ok(summary)
}

/// Non-empty lines of the manifest, in order
pub fn read_manifest(path: &Path) -> Result<Vec<PathBuf>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open manifest {}", path.display()))?;

    let mut paths = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let trimmed = line.trim_end();
        if !trimmed.is_empty() {
            paths.push(PathBuf::from(trimmed));
        }
    }
    Ok(paths)
}

/// The two role sequences of a whole corpus, equal in length
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorpusAggregates {
    pub keyboard: TokenSequence,
    pub string: TokenSequence,
}

impl CorpusAggregates {
    /// Concatenate per-file pairs in order. Each pair is aligned first, so
    /// the aggregates stay equal in length.
    pub fn fold<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (TokenSequence, TokenSequence)>,
    {
        pairs
            .into_iter()
            .map(|(keyboard, string)| align(keyboard, string))
            .fold(Self::default(), |acc, (keyboard, string)| Self {
                keyboard: acc.keyboard.concat(keyboard),
                string: acc.string.concat(string),
            })
    }

    pub fn len(&self) -> usize {
        self.keyboard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyboard.is_empty()
    }

    pub fn exists(config: &Config) -> bool {
        config.keyboard_notes_path.exists() && config.string_notes_path.exists()
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        write_json(&config.keyboard_notes_path, &self.keyboard)?;
        write_json(&config.string_notes_path, &self.string)
    }

    pub fn load(config: &Config) -> Result<Self> {
        let keyboard: TokenSequence = read_json(&config.keyboard_notes_path)?;
        let string: TokenSequence = read_json(&config.string_notes_path)?;
        if keyboard.len() != string.len() {
            anyhow::bail!(
                "corpus aggregates differ in length ({} keyboard, {} string); rebuild them",
                keyboard.len(),
                string.len()
            );
        }
        Ok(Self { keyboard, string })
    }
}

/// Extract every manifest file in parallel and fold the pairs in manifest order
pub fn build_corpus(paths: &[PathBuf], extractor: &InstrumentExtractor) -> CorpusAggregates {
    let pairs: Vec<(TokenSequence, TokenSequence)> = paths
        .par_iter()
        .map(|path| {
            let pair = extractor.extract_pair_file(path);
            (pair.keyboard, pair.string)
        })
        .collect();
    CorpusAggregates::fold(pairs)
}

/// Read the manifest, build the aggregates and persist them
pub fn build_and_save(config: &Config) -> Result<CorpusAggregates> {
    let paths = read_manifest(&config.manifest_path)?;
    log::info!("Building corpus from {} files", paths.len());

    let aggregates = build_corpus(&paths, &InstrumentExtractor::new(config.divisor));
    aggregates.save(config)?;

    log::info!("Corpus holds {} aligned tokens per role", aggregates.len());
    Ok(aggregates)
}

/// Load persisted aggregates, building them from the manifest when absent
pub fn load_or_build(config: &Config) -> Result<CorpusAggregates> {
    if CorpusAggregates::exists(config) {
        CorpusAggregates::load(config)
    } else {
        build_and_save(config)
    }
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn seq(tokens: &[&str]) -> TokenSequence {
        TokenSequence::from(tokens)
    }

    #[test]
    fn test_fold_aligns_then_concatenates() {
        let aggregates = CorpusAggregates::fold(vec![
            (seq(&["C4", "D4", "E4"]), seq(&["G3", "Rest"])),
            (seq(&["Rest"]), seq(&["A3", "B3"])),
            (seq(&[]), seq(&["C3"])),
        ]);

        assert_eq!(aggregates.keyboard.as_slice(), ["C4", "D4", "Rest"]);
        assert_eq!(aggregates.string.as_slice(), ["G3", "Rest", "A3"]);
    }

    #[test]
    fn test_discover_is_recursive_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b/nested")).unwrap();
        fs::write(dir.path().join("b/nested/z.MID"), b"").unwrap();
        fs::write(dir.path().join("a.mid"), b"").unwrap();
        fs::write(dir.path().join("c.midi"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let files = discover_midi_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            names,
            vec![
                PathBuf::from("a.mid"),
                PathBuf::from("b/nested/z.MID"),
                PathBuf::from("c.midi"),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_does_not_follow_symlink_cycles() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.mid"), b"").unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("sub/loop")).unwrap();

        let files = discover_midi_files(dir.path()).unwrap();

        assert_eq!(files, vec![dir.path().join("a.mid")]);
    }

    #[test]
    fn test_discover_missing_directory() {
        assert!(discover_midi_files(Path::new("/nope/songs")).is_err());
    }

    #[test]
    fn test_read_manifest_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("all_songs.txt");
        fs::write(&path, "a.mid\n\nsongs/b.mid  \n").unwrap();

        assert_eq!(
            read_manifest(&path).unwrap(),
            vec![PathBuf::from("a.mid"), PathBuf::from("songs/b.mid")]
        );
    }

    #[test]
    fn test_unreadable_file_fails() {
        let outcome = evaluate_file(
            Path::new("/nope/missing.mid"),
            &InstrumentExtractor::default(),
            0.1,
        );
        assert!(matches!(outcome, FileOutcome::Failed { .. }));
    }

    #[test]
    fn test_aggregates_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.rebase(dir.path());

        let aggregates = CorpusAggregates::fold(vec![(seq(&["C4", "Rest"]), seq(&["0.4.7", "G3"]))]);
        aggregates.save(&config).unwrap();

        assert!(CorpusAggregates::exists(&config));
        assert_eq!(CorpusAggregates::load(&config).unwrap(), aggregates);
    }
}
