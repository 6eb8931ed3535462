use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;

use duet_core::{Instrument, Role};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};

use crate::error::{MidiError, Result};
use crate::instruments::resolve_instrument;

/// A sounding note; times are in quarter notes from the start of the file
#[derive(Debug, Clone, PartialEq)]
pub struct MidiNote {
    pub key: u8,
    pub velocity: u8,
    pub channel: u8,
    pub start: f64,
    pub length: f64,
}

impl MidiNote {
    pub fn end(&self) -> f64 {
        self.start + self.length
    }
}

/// One MTrk chunk of a file
#[derive(Debug, Clone)]
pub struct Part {
    pub index: usize,
    pub name: Option<String>,
    pub program: Option<u8>,
    pub channel: Option<u8>,
    pub instrument: Instrument,
    pub notes: Vec<MidiNote>,
}

impl Part {
    pub fn role(&self) -> Option<Role> {
        self.instrument.role()
    }

    pub fn has_notes(&self) -> bool {
        !self.notes.is_empty()
    }
}

pub struct Score {
    pub ticks_per_quarter: u16,
    pub parts: Vec<Part>,
}

impl Score {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let smf = Smf::parse(data)?;
        Self::from_smf(&smf)
    }

    pub fn from_smf(smf: &Smf) -> Result<Self> {
        let ticks_per_quarter = match smf.header.timing {
            Timing::Metrical(tpq) if tpq.as_int() > 0 => tpq.as_int(),
            _ => return Err(MidiError::UnsupportedTiming),
        };

        let parts = smf
            .tracks
            .iter()
            .enumerate()
            .map(|(index, track)| collect_part(index, track, ticks_per_quarter))
            .collect();

        Ok(Score {
            ticks_per_quarter,
            parts,
        })
    }

    /// Parts whose instrument belongs to `role`, in track order
    pub fn parts_for(&self, role: Role) -> impl Iterator<Item = &Part> + '_ {
        self.parts
            .iter()
            .filter(move |part| part.has_notes() && role.accepts(part.instrument))
    }

    /// Parts that carry notes, grouped by resolved instrument
    pub fn partition_by_instrument(&self) -> BTreeMap<Instrument, Vec<&Part>> {
        let mut partition: BTreeMap<Instrument, Vec<&Part>> = BTreeMap::new();
        for part in self.parts.iter().filter(|p| p.has_notes()) {
            partition.entry(part.instrument).or_default().push(part);
        }
        partition
    }

    pub fn note_count(&self) -> usize {
        self.parts.iter().map(|p| p.notes.len()).sum()
    }
}

fn collect_part(index: usize, track: &[midly::TrackEvent<'_>], ticks_per_quarter: u16) -> Part {
    let to_quarters = |ticks: u64| ticks as f64 / ticks_per_quarter as f64;

    let mut tick: u64 = 0;
    let mut notes = Vec::new();
    let mut channel: Option<u8> = None;
    let mut program: Option<u8> = None;
    let mut track_name: Option<String> = None;
    let mut instrument_name: Option<String> = None;

    // Note-ons waiting for their note-off, first in first out per (channel, key)
    let mut pending: HashMap<(u8, u8), VecDeque<(u64, u8)>> = HashMap::new();

    for event in track {
        tick += event.delta.as_int() as u64;

        match event.kind {
            TrackEventKind::Midi { channel: ch, message } => {
                let ch = ch.as_int();
                match message {
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                        channel.get_or_insert(ch);
                        pending
                            .entry((ch, key.as_int()))
                            .or_default()
                            .push_back((tick, vel.as_int()));
                    }
                    // NoteOn with velocity 0 is a NoteOff
                    MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                        let key = key.as_int();
                        if let Some((start, velocity)) =
                            pending.get_mut(&(ch, key)).and_then(VecDeque::pop_front)
                        {
                            notes.push(MidiNote {
                                key,
                                velocity,
                                channel: ch,
                                start: to_quarters(start),
                                length: to_quarters(tick - start),
                            });
                        }
                    }
                    MidiMessage::ProgramChange { program: prog } => {
                        program.get_or_insert(prog.as_int());
                    }
                    _ => {}
                }
            }
            TrackEventKind::Meta(MetaMessage::TrackName(name)) => {
                track_name = track_name.or_else(|| clean_name(name));
            }
            TrackEventKind::Meta(MetaMessage::InstrumentName(name)) => {
                instrument_name = instrument_name.or_else(|| clean_name(name));
            }
            _ => {}
        }
    }

    // Unterminated notes ring until the last event of the track
    for ((ch, key), starts) in pending {
        for (start, velocity) in starts {
            notes.push(MidiNote {
                key,
                velocity,
                channel: ch,
                start: to_quarters(start),
                length: to_quarters(tick - start),
            });
        }
    }

    notes.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.key.cmp(&b.key)));

    let name = track_name.or(instrument_name);
    let instrument = resolve_instrument(name.as_deref(), program, channel);

    Part {
        index,
        name,
        program,
        channel,
        instrument,
        notes,
    }
}

/// Decode a meta text, dropping padding NULs and surrounding whitespace
fn clean_name(raw: &[u8]) -> Option<String> {
    let name = String::from_utf8_lossy(raw);
    let cleaned = name.trim_end_matches('\0').trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
