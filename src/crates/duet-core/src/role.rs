//! Instrument roles and their allow-lists
//!
//! Instruments are resolved once, when a score is scanned, into the typed
//! [`Instrument`] enum. A [`Role`] is then a fixed table lookup instead of a
//! string comparison against instrument names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Keyboard,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Instrument {
    // Keyboards
    KeyboardInstrument,
    Piano,
    Harpsichord,
    Clavichord,
    Celesta,

    // Strings
    StringInstrument,
    Violin,
    Viola,
    Violoncello,
    Contrabass,
    Harp,
    Guitar,
    AcousticGuitar,
    ElectricGuitar,
    AcousticBass,
    ElectricBass,
    FretlessBass,
    Mandolin,
    Ukulele,
    Banjo,
    Lute,
    Sitar,
    Shamisen,
    Koto,

    // Everything else
    ElectricPiano,
    Organ,
    Percussion,
    Other,
}

const KEYBOARD_INSTRUMENTS: &[Instrument] = &[
    Instrument::KeyboardInstrument,
    Instrument::Piano,
    Instrument::Harpsichord,
    Instrument::Clavichord,
    Instrument::Celesta,
];

const STRING_INSTRUMENTS: &[Instrument] = &[
    Instrument::StringInstrument,
    Instrument::Violin,
    Instrument::Viola,
    Instrument::Violoncello,
    Instrument::Contrabass,
    Instrument::Harp,
    Instrument::Guitar,
    Instrument::AcousticGuitar,
    Instrument::ElectricGuitar,
    Instrument::AcousticBass,
    Instrument::ElectricBass,
    Instrument::FretlessBass,
    Instrument::Mandolin,
    Instrument::Ukulele,
    Instrument::Banjo,
    Instrument::Lute,
    Instrument::Sitar,
    Instrument::Shamisen,
    Instrument::Koto,
];

impl Role {
    pub const ALL: [Role; 2] = [Role::Keyboard, Role::String];

    /// The allow-list of instruments that play this role
    pub fn instruments(self) -> &'static [Instrument] {
        match self {
            Role::Keyboard => KEYBOARD_INSTRUMENTS,
            Role::String => STRING_INSTRUMENTS,
        }
    }

    pub fn accepts(self, instrument: Instrument) -> bool {
        self.instruments().contains(&instrument)
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::Keyboard => "keyboard",
            Role::String => "string",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "keyboard" | "k" => Ok(Role::Keyboard),
            "string" | "strings" | "s" => Ok(Role::String),
            _ => Err(Error::UnknownRole(s.to_string())),
        }
    }
}

impl Instrument {
    pub fn role(self) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.accepts(self))
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_are_disjoint() {
        for instrument in KEYBOARD_INSTRUMENTS {
            assert!(!Role::String.accepts(*instrument));
        }
        for instrument in STRING_INSTRUMENTS {
            assert!(!Role::Keyboard.accepts(*instrument));
        }
    }

    #[test]
    fn test_instrument_roles() {
        assert_eq!(Instrument::Piano.role(), Some(Role::Keyboard));
        assert_eq!(Instrument::Harpsichord.role(), Some(Role::Keyboard));
        assert_eq!(Instrument::Violin.role(), Some(Role::String));
        assert_eq!(Instrument::FretlessBass.role(), Some(Role::String));
        assert_eq!(Instrument::Organ.role(), None);
        assert_eq!(Instrument::Percussion.role(), None);
    }

    #[test]
    fn test_parse_role() {
        assert_eq!("keyboard".parse::<Role>().unwrap(), Role::Keyboard);
        assert_eq!("Strings".parse::<Role>().unwrap(), Role::String);
        assert!("drums".parse::<Role>().is_err());
        assert_eq!(Role::String.to_string(), "string");
    }
}
