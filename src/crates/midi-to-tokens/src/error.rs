use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MidiError>;

#[derive(Debug, Error)]
pub enum MidiError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse MIDI data: {0}")]
    Parse(#[from] midly::Error),

    /// SMPTE timecode files carry no quarter-note grid
    #[error("unsupported timing: only metrical (ticks per quarter) files are supported")]
    UnsupportedTiming,

    #[error("failed to write MIDI data: {0}")]
    Write(io::Error),

    #[error(transparent)]
    Token(#[from] duet_core::Error),
}
