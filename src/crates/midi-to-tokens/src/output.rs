//! MidiRenderer: token streams back to playable MIDI
//!
//! Token `i` sounds at `i * UNIT` quarter notes for exactly one unit, so a
//! rendered file has the same grid the extractor packed the tokens onto.

use std::path::Path;

use duet_core::{detokenize, Event, TokenSequence, UNIT};
use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

use crate::error::{MidiError, Result};

/// Largest delta time one track event can carry
const MAX_DELTA: u64 = 0x0FFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub ticks_per_quarter: u16,
    /// GM program of the single voice
    pub program: u8,
    pub channel: u8,
    pub velocity: u8,
    /// Microseconds per quarter note
    pub tempo: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            ticks_per_quarter: 480,
            program: 0,
            channel: 0,
            velocity: 90,
            tempo: 500_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MidiRenderer {
    options: RenderOptions,
}

impl MidiRenderer {
    pub fn new(options: RenderOptions) -> Self {
        // Keep every field inside its MIDI data range
        let options = RenderOptions {
            ticks_per_quarter: options.ticks_per_quarter.clamp(1, 0x7FFF),
            program: options.program.min(127),
            channel: options.channel.min(15),
            velocity: options.velocity.clamp(1, 127),
            tempo: options.tempo.clamp(1, 0xFF_FFFF),
        };
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Lay tokens out on the grid, one event per token
    pub fn events(&self, tokens: &TokenSequence) -> Result<Vec<Event>> {
        tokens
            .iter()
            .enumerate()
            .map(|(i, token)| Ok(detokenize(token)?.into_event(i as f64 * UNIT)))
            .collect()
    }

    fn unit_ticks(&self) -> u32 {
        (self.options.ticks_per_quarter as f64 * UNIT).round().max(1.0) as u32
    }

    fn midi(&self, delta: u32, message: MidiMessage) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Midi {
                channel: u4::new(self.options.channel),
                message,
            },
        }
    }

    /// Emit ticks beyond [`MAX_DELTA`] as empty markers, returning what is
    /// left for the next event
    fn carry_delta(track: &mut Vec<TrackEvent<'static>>, mut pending: u64) -> u32 {
        while pending > MAX_DELTA {
            track.push(TrackEvent {
                delta: u28::new(MAX_DELTA as u32),
                kind: TrackEventKind::Meta(MetaMessage::Marker(b"")),
            });
            pending -= MAX_DELTA;
        }
        pending as u32
    }

    fn build_track(&self, events: &[Event]) -> Vec<TrackEvent<'static>> {
        let unit = self.unit_ticks();
        let velocity = u7::new(self.options.velocity);

        let mut track = vec![
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::TrackName(b"duet")),
            },
            TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(self.options.tempo))),
            },
            self.midi(
                0,
                MidiMessage::ProgramChange {
                    program: u7::new(self.options.program),
                },
            ),
        ];

        // Ticks since the last emitted event
        let mut pending_delta: u64 = 0;

        for event in events {
            let mut keys: Vec<u8> = event.pitches().iter().map(|p| p.key()).collect();
            keys.sort_unstable();
            keys.dedup();

            if keys.is_empty() {
                // Rests only advance the grid
                pending_delta += unit as u64;
                continue;
            }

            let first_delta = Self::carry_delta(&mut track, pending_delta);

            for (i, key) in keys.iter().enumerate() {
                let delta = if i == 0 { first_delta } else { 0 };
                track.push(self.midi(
                    delta,
                    MidiMessage::NoteOn {
                        key: u7::new(*key),
                        vel: velocity,
                    },
                ));
            }
            for (i, key) in keys.iter().enumerate() {
                let delta = if i == 0 { unit } else { 0 };
                track.push(self.midi(
                    delta,
                    MidiMessage::NoteOff {
                        key: u7::new(*key),
                        vel: u7::new(0),
                    },
                ));
            }
            pending_delta = 0;
        }

        let last_delta = Self::carry_delta(&mut track, pending_delta);
        track.push(TrackEvent {
            delta: u28::new(last_delta),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });
        track
    }

    fn smf(&self, tokens: &TokenSequence) -> Result<Smf<'static>> {
        let events = self.events(tokens)?;
        let mut smf = Smf::new(Header::new(
            Format::SingleTrack,
            Timing::Metrical(u15::new(self.options.ticks_per_quarter)),
        ));
        smf.tracks.push(self.build_track(&events));
        Ok(smf)
    }

    pub fn render_to_bytes(&self, tokens: &TokenSequence) -> Result<Vec<u8>> {
        let smf = self.smf(tokens)?;
        let mut bytes = Vec::new();
        smf.write_std(&mut bytes).map_err(MidiError::Write)?;
        Ok(bytes)
    }

    pub fn render_to_file(&self, tokens: &TokenSequence, path: &Path) -> Result<()> {
        let bytes = self.render_to_bytes(tokens)?;
        std::fs::write(path, bytes).map_err(MidiError::Write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_core::{EventKind, Pitch};

    #[test]
    fn test_rest_then_chord_offsets() {
        let tokens = TokenSequence::from(&["Rest", "0.4.7"][..]);
        let events = MidiRenderer::default().events(&tokens).unwrap();

        assert_eq!(events[0], Event::rest(0.0));
        assert_eq!(events[1].offset, 0.5);
        assert_eq!(
            events[1].kind,
            EventKind::Chord(vec![Pitch::new(60), Pitch::new(64), Pitch::new(67)])
        );
    }

    #[test]
    fn test_invalid_token_is_an_error() {
        let tokens = TokenSequence::from(&["C4", "nonsense"][..]);
        assert!(matches!(
            MidiRenderer::default().events(&tokens),
            Err(MidiError::Token(_))
        ));
    }

    #[test]
    fn test_track_timing() {
        let renderer = MidiRenderer::default();
        let events = renderer
            .events(&TokenSequence::from(&["C4", "Rest", "D4"][..]))
            .unwrap();
        let track = renderer.build_track(&events);

        let mut tick = 0;
        let mut on_ticks = Vec::new();
        for event in &track {
            tick += event.delta.as_int();
            if let TrackEventKind::Midi {
                message: MidiMessage::NoteOn { .. },
                ..
            } = event.kind
            {
                on_ticks.push(tick);
            }
        }

        // 480 ticks per quarter, one token every 240
        assert_eq!(on_ticks, vec![0, 480]);
        assert_eq!(tick, 720);
        assert!(matches!(
            track.last().map(|e| e.kind),
            Some(TrackEventKind::Meta(MetaMessage::EndOfTrack))
        ));
    }

    #[test]
    fn test_long_silence_keeps_its_length() {
        // 16383 ticks per unit: 20000 rests outgrow one delta
        let renderer = MidiRenderer::new(RenderOptions {
            ticks_per_quarter: 32_766,
            ..RenderOptions::default()
        });
        let mut tokens = TokenSequence::from(&["C4"][..]);
        for _ in 0..20_000 {
            tokens.push("Rest");
        }
        tokens.push("D4");

        let track = renderer.build_track(&renderer.events(&tokens).unwrap());

        let mut tick: u64 = 0;
        let mut on_ticks = Vec::new();
        for event in &track {
            tick += event.delta.as_int() as u64;
            if let TrackEventKind::Midi {
                message: MidiMessage::NoteOn { .. },
                ..
            } = event.kind
            {
                on_ticks.push(tick);
            }
        }
        assert_eq!(on_ticks, vec![0, 20_001 * 16_383]);
        assert!(track
            .iter()
            .any(|e| matches!(e.kind, TrackEventKind::Meta(MetaMessage::Marker(_)))));

        let bytes = renderer.render_to_bytes(&tokens).unwrap();
        let score = crate::Score::from_bytes(&bytes).unwrap();
        let extracted = crate::InstrumentExtractor::default().extract_all(&score);
        assert_eq!(extracted, tokens);
    }

    #[test]
    fn test_bytes_parse_back() {
        let bytes = MidiRenderer::default()
            .render_to_bytes(&TokenSequence::from(&["E4", "0.4.7", "Rest"][..]))
            .unwrap();

        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(smf.header.format, Format::SingleTrack);
        assert_eq!(smf.tracks.len(), 1);
    }

    #[test]
    fn test_options_are_clamped() {
        let renderer = MidiRenderer::new(RenderOptions {
            channel: 200,
            velocity: 0,
            ..RenderOptions::default()
        });
        assert_eq!(renderer.options().channel, 15);
        assert_eq!(renderer.options().velocity, 1);
    }
}
