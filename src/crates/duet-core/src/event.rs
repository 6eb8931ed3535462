use serde::{Deserialize, Serialize};

use crate::pitch::Pitch;

/// What sounds at an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// Single note
    Note(Pitch),

    /// Simultaneous notes that start together
    Chord(Vec<Pitch>),

    /// Silence
    Rest,
}

/// A musical occurrence at a time offset measured in quarter notes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub offset: f64,
    pub kind: EventKind,
}

impl Event {
    pub fn new(offset: f64, kind: EventKind) -> Self {
        Self { offset, kind }
    }

    pub fn rest(offset: f64) -> Self {
        Self::new(offset, EventKind::Rest)
    }

    pub fn is_rest(&self) -> bool {
        matches!(self.kind, EventKind::Rest)
    }

    /// All pitches sounding at this event
    pub fn pitches(&self) -> Vec<Pitch> {
        match &self.kind {
            EventKind::Note(pitch) => vec![*pitch],
            EventKind::Chord(pitches) => pitches.clone(),
            EventKind::Rest => vec![],
        }
    }
}
