use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Note names in chromatic order
const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Octave used when a bare pitch class has to become a sounding note
pub const DEFAULT_OCTAVE: i32 = 4;

/// A sounding pitch, stored as its MIDI key number (middle C = 60)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pitch(u8);

impl Pitch {
    /// Create a pitch from a MIDI key. Keys above 127 are clamped.
    pub fn new(key: u8) -> Self {
        Pitch(key.min(127))
    }

    /// The pitch of `pitch_class` (0-11) in [`DEFAULT_OCTAVE`]
    pub fn from_pitch_class(pitch_class: u8) -> Self {
        Pitch::new(((DEFAULT_OCTAVE + 1) * 12) as u8 + pitch_class % 12)
    }

    pub fn key(self) -> u8 {
        self.0
    }

    pub fn pitch_class(self) -> u8 {
        self.0 % 12
    }

    pub fn octave(self) -> i32 {
        (self.0 / 12) as i32 - 1
    }

    /// Octave-qualified name, e.g. "C4", "F#3", "A#-1"
    pub fn name(self) -> String {
        format!("{}{}", NOTE_NAMES[self.pitch_class() as usize], self.octave())
    }

    /// Parse an octave-qualified pitch name.
    ///
    /// Accepts an upper or lower case letter, an optional `#` or `b`
    /// accidental, and a (possibly negative) octave number.
    pub fn from_name(name: &str) -> Result<Self> {
        let bytes = name.as_bytes();
        if bytes.is_empty() {
            return Err(Error::invalid_pitch(name));
        }

        let step = match bytes[0].to_ascii_uppercase() {
            b'C' => 0,
            b'D' => 2,
            b'E' => 4,
            b'F' => 5,
            b'G' => 7,
            b'A' => 9,
            b'B' => 11,
            _ => return Err(Error::invalid_pitch(name)),
        };

        let mut pos = 1;
        let mut alter = 0;
        match bytes.get(pos) {
            Some(b'#') => {
                alter = 1;
                pos += 1;
            }
            Some(b'b') => {
                alter = -1;
                pos += 1;
            }
            _ => {}
        }

        let octave: i32 = name[pos..]
            .parse()
            .map_err(|_| Error::invalid_pitch(name))?;

        let key = (octave + 1) * 12 + step + alter;
        if (0..=127).contains(&key) {
            Ok(Pitch(key as u8))
        } else {
            Err(Error::invalid_pitch(name))
        }
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Pitch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Pitch::from_name(s)
    }
}

/// Normal order of a chord's pitch-class set.
///
/// The distinct pitch classes are sorted and every rotation is compared:
/// smallest span from first to last wins, ties go to the smallest span from
/// the first element to the next-to-last, and so on towards the left, and a
/// remaining tie goes to the lowest starting pitch class. No inversion.
pub fn normal_order(pitch_classes: &[u8]) -> Vec<u8> {
    let mut set: Vec<u8> = pitch_classes.iter().map(|pc| pc % 12).collect();
    set.sort_unstable();
    set.dedup();

    let n = set.len();
    if n <= 1 {
        return set;
    }

    (0..n)
        .map(|start| (0..n).map(|i| set[(start + i) % n]).collect::<Vec<u8>>())
        .min_by_key(|rotation| {
            let spans: Vec<u8> = (1..n)
                .rev()
                .map(|i| (rotation[i] + 12 - rotation[0]) % 12)
                .collect();
            (spans, rotation[0])
        })
        .unwrap_or(set)
}
