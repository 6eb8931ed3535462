//! MIDI adapters for the duet pipeline
//!
//! Parses standard MIDI files into per-track [`Part`]s, resolves each part to
//! a typed [`Instrument`](duet_core::Instrument), extracts role token streams
//! with [`InstrumentExtractor`] and renders token streams back to MIDI with
//! [`MidiRenderer`].

pub mod error;
pub mod extract;
pub mod instruments;
pub mod midi;
pub mod output;
pub mod track;

pub use error::{MidiError, Result};
pub use extract::{InstrumentExtractor, RolePair};
pub use instruments::resolve_instrument;
pub use midi::{MidiNote, Part, Score};
pub use output::{MidiRenderer, RenderOptions};
pub use track::{group_events, DEFAULT_DIVISOR};
