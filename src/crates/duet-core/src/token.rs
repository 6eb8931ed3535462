//! Event <-> token mapping
//!
//! - Note: the octave-qualified pitch name (`"C4"`)
//! - Chord: pitch classes in normal order joined with dots (`"0.4.7"`)
//! - Rest: the literal `"Rest"`
//!
//! A token that contains a dot or is all digits is a chord, so a chord with a
//! single pitch class (`"7"`) is never mistaken for a pitch name.

use crate::error::{Error, Result};
use crate::event::{Event, EventKind};
use crate::pitch::{normal_order, Pitch};
use crate::sequence::Token;

pub const REST: &str = "Rest";

/// What a token asks the renderer to build
#[derive(Debug, Clone, PartialEq)]
pub enum Detokenized {
    Rest,
    /// Pitch classes, one note per entry
    Chord(Vec<u8>),
    Note(Pitch),
}

impl Detokenized {
    /// Instantiate the intent at `offset`. Chord pitch classes are voiced
    /// in the default octave.
    pub fn into_event(self, offset: f64) -> Event {
        let kind = match self {
            Detokenized::Rest => EventKind::Rest,
            Detokenized::Chord(pitch_classes) => EventKind::Chord(
                pitch_classes
                    .into_iter()
                    .map(Pitch::from_pitch_class)
                    .collect(),
            ),
            Detokenized::Note(pitch) => EventKind::Note(pitch),
        };
        Event::new(offset, kind)
    }
}

pub fn tokenize(event: &Event) -> Token {
    tokenize_kind(&event.kind)
}

pub fn tokenize_kind(kind: &EventKind) -> Token {
    match kind {
        EventKind::Note(pitch) => pitch.name(),
        EventKind::Chord(pitches) => {
            let pitch_classes: Vec<u8> = pitches.iter().map(|p| p.pitch_class()).collect();
            normal_order(&pitch_classes)
                .iter()
                .map(|pc| pc.to_string())
                .collect::<Vec<_>>()
                .join(".")
        }
        EventKind::Rest => REST.to_string(),
    }
}

pub fn is_chord_token(token: &str) -> bool {
    token.contains('.') || (!token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()))
}

pub fn detokenize(token: &str) -> Result<Detokenized> {
    if token == REST {
        return Ok(Detokenized::Rest);
    }

    if is_chord_token(token) {
        let pitch_classes = token
            .split('.')
            .map(|part| match part.parse::<u8>() {
                Ok(pc) if pc < 12 => Ok(pc),
                _ => Err(Error::invalid_token(token)),
            })
            .collect::<Result<Vec<u8>>>()?;
        return Ok(Detokenized::Chord(pitch_classes));
    }

    Pitch::from_name(token)
        .map(Detokenized::Note)
        .map_err(|_| Error::invalid_token(token))
}
