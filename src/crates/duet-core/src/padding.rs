use crate::sequence::TokenSequence;
use crate::token::REST;

/// Time covered by one token, in quarter notes (two tokens per quarter)
pub const UNIT: f64 = 0.5;

/// Keeps a token stream on a fixed time grid by filling silences with rests
#[derive(Debug, Clone, Copy)]
pub struct RestPadder {
    unit: f64,
}

impl RestPadder {
    pub fn new(unit: f64) -> Self {
        Self { unit }
    }

    pub fn unit(&self) -> f64 {
        self.unit
    }

    /// Grid position an event at `offset` should land on
    pub fn target_len(&self, offset: f64) -> f64 {
        offset / self.unit
    }

    /// Append rests until the sequence reaches the grid position of an event
    /// at `offset`, before that event's own token is pushed.
    ///
    /// Returns the number of rests inserted. Does nothing when the sequence
    /// is already at or past the target, or when the offset is not finite.
    pub fn pad(&self, offset: f64, sequence: &mut TokenSequence) -> usize {
        if !offset.is_finite() || !(self.unit > 0.0) {
            return 0;
        }

        let target = self.target_len(offset);
        let mut inserted = 0;
        while (sequence.len() as f64) < target {
            sequence.push(REST);
            inserted += 1;
        }
        inserted
    }
}

impl Default for RestPadder {
    fn default() -> Self {
        Self::new(UNIT)
    }
}
