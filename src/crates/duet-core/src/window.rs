use crate::error::{Error, Result};
use crate::sequence::TokenSequence;
use crate::vocab::Vocabulary;

pub const DEFAULT_WINDOW_LENGTH: usize = 100;

/// Overlapping, integer-encoded slices of one sequence (stride 1).
///
/// A sequence of `n` codes gives `max(0, n - length)` windows; window `i`
/// covers codes `i..i + length`.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSet {
    codes: Vec<u32>,
    length: usize,
}

impl WindowSet {
    pub fn new(codes: Vec<u32>, length: usize) -> Result<Self> {
        if length == 0 {
            return Err(Error::InvalidWindowLength);
        }
        Ok(Self { codes, length })
    }

    pub fn len(&self) -> usize {
        self.codes.len().saturating_sub(self.length)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn window_length(&self) -> usize {
        self.length
    }

    pub fn get(&self, index: usize) -> Option<&[u32]> {
        if index < self.len() {
            Some(&self.codes[index..index + self.length])
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u32]> + '_ {
        self.codes.windows(self.length).take(self.len())
    }

    /// The encoded sequence the windows are cut from
    pub fn codes(&self) -> &[u32] {
        &self.codes
    }
}

/// Cuts sequences into fixed-length windows
#[derive(Debug, Clone, Copy)]
pub struct SequenceWindower {
    length: usize,
}

impl SequenceWindower {
    pub fn new(length: usize) -> Result<Self> {
        if length == 0 {
            return Err(Error::InvalidWindowLength);
        }
        Ok(Self { length })
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn window(&self, sequence: &TokenSequence, vocabulary: &Vocabulary) -> Result<WindowSet> {
        WindowSet::new(vocabulary.encode(sequence)?, self.length)
    }
}

impl Default for SequenceWindower {
    fn default() -> Self {
        Self {
            length: DEFAULT_WINDOW_LENGTH,
        }
    }
}

pub fn window(
    sequence: &TokenSequence,
    vocabulary: &Vocabulary,
    length: usize,
) -> Result<WindowSet> {
    SequenceWindower::new(length)?.window(sequence, vocabulary)
}

/// One-hot expansion of a window: one row per position, `width` columns.
///
/// Codes at or beyond `width` produce an all-zero row.
pub fn one_hot(window: &[u32], width: usize) -> Vec<Vec<f32>> {
    window
        .iter()
        .map(|&code| {
            let mut row = vec![0.0; width];
            if let Some(cell) = row.get_mut(code as usize) {
                *cell = 1.0;
            }
            row
        })
        .collect()
}
