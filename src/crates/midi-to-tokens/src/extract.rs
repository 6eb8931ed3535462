//! InstrumentExtractor: one token stream per role
//!
//! Parts matching a role are merged by onset, grouped into events and laid
//! on the [`UNIT`](duet_core::UNIT) grid with [`RestPadder`].

use std::path::Path;

use duet_core::{tokenize, Event, Instrument, RestPadder, Role, TokenSequence};

use crate::error::Result;
use crate::midi::{MidiNote, Part, Score};
use crate::track::{group_events, DEFAULT_DIVISOR};

/// The keyboard and string streams of one file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RolePair {
    pub keyboard: TokenSequence,
    pub string: TokenSequence,
}

impl RolePair {
    pub fn is_empty(&self) -> bool {
        self.keyboard.is_empty() && self.string.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InstrumentExtractor {
    padder: RestPadder,
    divisor: u32,
}

impl InstrumentExtractor {
    pub fn new(divisor: u32) -> Self {
        Self {
            padder: RestPadder::default(),
            divisor: divisor.max(1),
        }
    }

    /// Events of several parts merged into one timeline
    pub fn events<'a>(&self, parts: impl IntoIterator<Item = &'a Part>) -> Vec<Event> {
        let notes: Vec<MidiNote> = parts
            .into_iter()
            .flat_map(|part| part.notes.iter().cloned())
            .collect();
        group_events(&notes, self.divisor, self.padder.unit())
    }

    /// Pad and tokenize events that arrive in non-decreasing offset order
    pub fn tokens_from_events(&self, events: &[Event]) -> TokenSequence {
        let mut sequence = TokenSequence::new();
        for event in events {
            self.padder.pad(event.offset, &mut sequence);
            sequence.push(tokenize(event));
        }
        sequence
    }

    pub fn extract(&self, score: &Score, role: Role) -> TokenSequence {
        self.tokens_from_events(&self.events(score.parts_for(role)))
    }

    /// Every pitched part of the score, percussion excluded
    pub fn extract_all(&self, score: &Score) -> TokenSequence {
        let parts = score
            .parts
            .iter()
            .filter(|p| p.instrument != Instrument::Percussion);
        self.tokens_from_events(&self.events(parts))
    }

    pub fn extract_pair(&self, score: &Score) -> RolePair {
        RolePair {
            keyboard: self.extract(score, Role::Keyboard),
            string: self.extract(score, Role::String),
        }
    }

    pub fn try_extract_file(&self, path: &Path, role: Role) -> Result<TokenSequence> {
        Ok(self.extract(&Score::from_file(path)?, role))
    }

    pub fn try_extract_pair_file(&self, path: &Path) -> Result<RolePair> {
        Ok(self.extract_pair(&Score::from_file(path)?))
    }

    /// Like [`try_extract_file`](Self::try_extract_file), but a file that
    /// cannot be read or parsed yields an empty sequence and a warning.
    pub fn extract_file(&self, path: &Path, role: Role) -> TokenSequence {
        self.try_extract_file(path, role).unwrap_or_else(|e| {
            log::warn!("skipping {} ({} role): {}", path.display(), role, e);
            TokenSequence::new()
        })
    }

    pub fn extract_pair_file(&self, path: &Path) -> RolePair {
        self.try_extract_pair_file(path).unwrap_or_else(|e| {
            log::warn!("skipping {}: {}", path.display(), e);
            RolePair::default()
        })
    }
}

impl Default for InstrumentExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_DIVISOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_core::{EventKind, Pitch};

    fn part(index: usize, instrument: Instrument, notes: &[(u8, f64, f64)]) -> Part {
        Part {
            index,
            name: None,
            program: None,
            channel: Some(0),
            instrument,
            notes: notes
                .iter()
                .map(|&(key, start, length)| MidiNote {
                    key,
                    velocity: 100,
                    channel: 0,
                    start,
                    length,
                })
                .collect(),
        }
    }

    fn score(parts: Vec<Part>) -> Score {
        Score {
            ticks_per_quarter: 480,
            parts,
        }
    }

    #[test]
    fn test_tokens_from_events() {
        let extractor = InstrumentExtractor::default();
        let events = vec![
            Event::new(0.0, EventKind::Note(Pitch::new(60))),
            Event::new(0.5, EventKind::Note(Pitch::new(60))),
            Event::new(1.5, EventKind::Note(Pitch::new(62))),
        ];

        let tokens = extractor.tokens_from_events(&events);

        assert_eq!(tokens.as_slice(), ["C4", "C4", "Rest", "D4"]);
    }

    #[test]
    fn test_extract_selects_role() {
        let score = score(vec![
            part(0, Instrument::Piano, &[(60, 0.0, 0.5), (64, 0.5, 0.5)]),
            part(1, Instrument::Violin, &[(67, 1.0, 0.5)]),
            part(2, Instrument::Percussion, &[(36, 0.0, 0.5)]),
        ]);
        let extractor = InstrumentExtractor::default();

        assert_eq!(extractor.extract(&score, Role::Keyboard).as_slice(), ["C4", "E4"]);
        assert_eq!(
            extractor.extract(&score, Role::String).as_slice(),
            ["Rest", "Rest", "G4"]
        );
    }

    #[test]
    fn test_tracks_of_one_role_merge_by_onset() {
        // Two string tracks; the cello answers the violin and doubles at 1.0
        let score = score(vec![
            part(0, Instrument::Violin, &[(76, 0.0, 0.5), (72, 1.0, 0.5)]),
            part(1, Instrument::Violoncello, &[(48, 0.5, 0.5), (55, 1.0, 0.5)]),
        ]);

        let tokens = InstrumentExtractor::default().extract(&score, Role::String);

        // {C, G} in normal order starts on G: a fourth is tighter than a fifth
        assert_eq!(tokens.as_slice(), ["E5", "C3", "7.0"]);
    }

    #[test]
    fn test_rest_events_keep_the_grid() {
        let score = score(vec![part(
            0,
            Instrument::Harpsichord,
            &[(60, 0.0, 0.5), (62, 2.0, 0.5)],
        )]);

        let tokens = InstrumentExtractor::default().extract(&score, Role::Keyboard);

        // Rest event at 0.5, then padding up to 2.0
        assert_eq!(tokens.as_slice(), ["C4", "Rest", "Rest", "Rest", "D4"]);
    }

    #[test]
    fn test_extract_all_skips_percussion() {
        let score = score(vec![
            part(0, Instrument::Organ, &[(60, 0.0, 0.5)]),
            part(1, Instrument::Percussion, &[(36, 0.5, 0.5)]),
        ]);
        assert_eq!(
            InstrumentExtractor::default().extract_all(&score).as_slice(),
            ["C4"]
        );
    }

    #[test]
    fn test_missing_file_fails_soft() {
        let extractor = InstrumentExtractor::default();
        let path = Path::new("/definitely/not/here.mid");

        assert!(extractor.try_extract_file(path, Role::Keyboard).is_err());
        assert!(extractor.extract_file(path, Role::Keyboard).is_empty());
        assert!(extractor.extract_pair_file(path).is_empty());
    }
}
