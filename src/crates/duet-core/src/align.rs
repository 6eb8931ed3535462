use serde::{Deserialize, Serialize};

use crate::sequence::TokenSequence;

/// Truncate the longer of two role sequences to the length of the shorter.
///
/// The tail of the longer sequence is discarded; nothing is padded onto the
/// shorter one.
pub fn align(mut a: TokenSequence, mut b: TokenSequence) -> (TokenSequence, TokenSequence) {
    let len = a.len().min(b.len());
    a.truncate(len);
    b.truncate(len);
    (a, b)
}

/// Relative length difference `(max - min) / max`, `None` when both are empty
pub fn length_difference(a_len: usize, b_len: usize) -> Option<f64> {
    let max = a_len.max(b_len);
    if max == 0 {
        return None;
    }
    let min = a_len.min(b_len);
    Some((max - min) as f64 / max as f64)
}

/// Per-file length comparison between the two roles, before alignment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LengthStats {
    pub percent_diff: f64,
    pub keyboard_len: usize,
    pub string_len: usize,
}

impl LengthStats {
    pub fn compute(keyboard: &TokenSequence, string: &TokenSequence) -> Option<Self> {
        let percent_diff = length_difference(keyboard.len(), string.len())?;
        Some(Self {
            percent_diff,
            keyboard_len: keyboard.len(),
            string_len: string.len(),
        })
    }

    /// True when the two roles are close enough in length to be paired
    pub fn within(&self, tolerance: f64) -> bool {
        self.percent_diff <= tolerance
    }
}
