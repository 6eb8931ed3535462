//! Core types and algorithms for keyboard/string note sequences
//!
//! This crate turns timed musical events into fixed-resolution token streams
//! and back. It has no file or MIDI dependencies: parsing and rendering live
//! in `midi-to-tokens`, the batch pipeline lives in the `duet` application.
//!
//! # Examples
//!
//! ```
//! use duet_core::{window, Event, EventKind, Pitch, RestPadder, TokenSequence, Vocabulary};
//!
//! let padder = RestPadder::default();
//! let mut sequence = TokenSequence::new();
//!
//! for event in [
//!     Event::new(0.0, EventKind::Note(Pitch::new(60))),
//!     Event::new(0.5, EventKind::Note(Pitch::new(60))),
//!     Event::new(1.5, EventKind::Note(Pitch::new(62))),
//! ] {
//!     padder.pad(event.offset, &mut sequence);
//!     sequence.push(duet_core::tokenize(&event));
//! }
//!
//! assert_eq!(sequence.as_slice(), ["C4", "C4", "Rest", "D4"]);
//!
//! let vocabulary = Vocabulary::build(sequence.iter());
//! let windows = window(&sequence, &vocabulary, 2).unwrap();
//! assert_eq!(windows.len(), 2);
//! ```
//!
//! # Main Components
//!
//! - **NoteTokenizer** ([`tokenize`], [`detokenize`]): events to canonical tokens and back
//! - **RestPadder**: keeps one token per [`UNIT`] of elapsed time
//! - **SequenceAligner** ([`align`]): truncates a role pair to a common length
//! - **Vocabulary** and **SequenceWindower** ([`window`]): integer-encoded training windows
//! - **Role** and **Instrument**: the typed instrument allow-lists

pub mod align;
pub mod error;
pub mod event;
pub mod padding;
pub mod pitch;
pub mod role;
pub mod sequence;
pub mod token;
pub mod vocab;
pub mod window;

pub use align::{align, length_difference, LengthStats};
pub use error::{Error, Result};
pub use event::{Event, EventKind};
pub use padding::{RestPadder, UNIT};
pub use pitch::{normal_order, Pitch};
pub use role::{Instrument, Role};
pub use sequence::{Token, TokenSequence};
pub use token::{detokenize, tokenize, Detokenized, REST};
pub use vocab::Vocabulary;
pub use window::{one_hot, window, SequenceWindower, WindowSet, DEFAULT_WINDOW_LENGTH};
