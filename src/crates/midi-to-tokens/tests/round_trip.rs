use duet_core::{Role, TokenSequence};
use midi_to_tokens::{InstrumentExtractor, MidiRenderer, Score};
use midly::num::{u15, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

const TPQ: u32 = 480;

fn midi(delta: u32, channel: u8, message: MidiMessage) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Midi {
            channel: u4::new(channel),
            message,
        },
    }
}

/// A track of (key, start, length) notes in quarter notes, with a program
/// change and a track name
fn track(
    name: &'static [u8],
    channel: u8,
    program: u8,
    notes: &[(u8, f64, f64)],
) -> Vec<TrackEvent<'static>> {
    let mut timeline: Vec<(u32, bool, u8)> = Vec::new();
    for &(key, start, length) in notes {
        let on = (start * TPQ as f64) as u32;
        let off = ((start + length) * TPQ as f64) as u32;
        timeline.push((on, true, key));
        timeline.push((off, false, key));
    }
    // Offs before ons at the same tick
    timeline.sort_by_key(|&(tick, is_on, key)| (tick, is_on, key));

    let mut events = vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(name)),
        },
        midi(
            0,
            channel,
            MidiMessage::ProgramChange {
                program: u7::new(program),
            },
        ),
    ];

    let mut last = 0;
    for (tick, is_on, key) in timeline {
        let message = if is_on {
            MidiMessage::NoteOn {
                key: u7::new(key),
                vel: u7::new(100),
            }
        } else {
            MidiMessage::NoteOff {
                key: u7::new(key),
                vel: u7::new(0),
            }
        };
        events.push(midi(tick - last, channel, message));
        last = tick;
    }
    events.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    events
}

fn write_file(dir: &std::path::Path, name: &str, tracks: Vec<Vec<TrackEvent<'static>>>) -> std::path::PathBuf {
    let mut smf = Smf::new(Header::new(Format::Parallel, Timing::Metrical(u15::new(TPQ as u16))));
    smf.tracks = tracks;
    let path = dir.join(name);
    smf.save(&path).unwrap();
    path
}

#[test]
fn test_extracts_both_roles_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "duet.mid",
        vec![
            track(b"Piano", 0, 0, &[(60, 0.0, 0.5), (64, 0.0, 0.5), (67, 0.0, 0.5), (62, 1.0, 0.5)]),
            track(b"Violin", 1, 40, &[(76, 0.0, 1.0), (74, 1.0, 0.5)]),
        ],
    );

    let pair = InstrumentExtractor::default().try_extract_pair_file(&path).unwrap();

    assert_eq!(pair.keyboard.as_slice(), ["0.4.7", "Rest", "D4"]);
    // A held note occupies one token; the rest of its length is padding
    assert_eq!(pair.string.as_slice(), ["E5", "Rest", "D5"]);
}

#[test]
fn test_program_decides_when_name_is_silent() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "programs.mid",
        vec![
            track(b"Track 1", 0, 6, &[(60, 0.0, 0.5)]),
            track(b"Track 2", 1, 42, &[(48, 0.0, 0.5)]),
            track(b"Track 3", 9, 0, &[(36, 0.0, 0.5)]),
        ],
    );

    let score = Score::from_file(&path).unwrap();
    let roles: Vec<Option<Role>> = score.parts.iter().map(|p| p.role()).collect();
    assert_eq!(roles, vec![Some(Role::Keyboard), Some(Role::String), None]);
}

#[test]
fn test_rendered_tokens_extract_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rendered.mid");
    let tokens = TokenSequence::from(&["C4", "0.4.7", "Rest", "Rest", "G3", "E4"][..]);

    MidiRenderer::default().render_to_file(&tokens, &path).unwrap();

    // The default voice is a piano, so the file reads back as a keyboard part
    let back = InstrumentExtractor::default().try_extract_file(&path, Role::Keyboard).unwrap();
    assert_eq!(back, tokens);
}

#[test]
fn test_malformed_file_is_contained() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.mid");
    std::fs::write(&path, b"MThd garbage").unwrap();

    let extractor = InstrumentExtractor::default();
    assert!(extractor.try_extract_file(&path, Role::String).is_err());
    assert!(extractor.extract_file(&path, Role::String).is_empty());
}
