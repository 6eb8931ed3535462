//! Grouping notes into Note/Chord/Rest events
//!
//! Onsets are snapped to a `1/divisor` quarter-note grid and compared as
//! integer grid positions, so that notes played "together" in a humanised
//! performance still land in the same chord.

use std::collections::BTreeSet;

use duet_core::{Event, EventKind, Pitch};

use crate::midi::MidiNote;

/// Twelve steps per quarter holds both sixteenths and triplet eighths
pub const DEFAULT_DIVISOR: u32 = 12;

fn grid(offset: f64, divisor: u32) -> i64 {
    (offset * divisor as f64).round() as i64
}

/// Snap an offset to the nearest `1/divisor` quarter note
pub fn quantize(offset: f64, divisor: u32) -> f64 {
    grid(offset, divisor) as f64 / divisor as f64
}

/// Group a stream of notes into events in non-decreasing offset order.
///
/// Notes sharing a quantised onset form one event: a Note when they carry
/// one distinct key, a Chord otherwise. When nothing is sounding for at
/// least `min_rest` quarter notes before the next onset, a Rest event is
/// emitted where the silence starts. Leading silence produces no event.
pub fn group_events(notes: &[MidiNote], divisor: u32, min_rest: f64) -> Vec<Event> {
    let divisor = divisor.max(1);

    let mut sorted: Vec<(i64, i64, u8)> = notes
        .iter()
        .map(|n| (grid(n.start, divisor), grid(n.end(), divisor), n.key))
        .collect();
    sorted.sort_unstable();

    let min_rest_steps = grid(min_rest, divisor);
    let to_offset = |step: i64| step as f64 / divisor as f64;

    let mut events = Vec::new();
    let mut sounding_until: Option<i64> = None;
    let mut i = 0;

    while i < sorted.len() {
        let onset = sorted[i].0;
        let mut keys = BTreeSet::new();
        let mut group_end = onset;

        while i < sorted.len() && sorted[i].0 == onset {
            keys.insert(sorted[i].2);
            group_end = group_end.max(sorted[i].1);
            i += 1;
        }

        if let Some(until) = sounding_until {
            if onset - until >= min_rest_steps.max(1) {
                events.push(Event::rest(to_offset(until)));
            }
        }

        let pitches: Vec<Pitch> = keys.into_iter().map(Pitch::new).collect();
        let kind = if pitches.len() == 1 {
            EventKind::Note(pitches[0])
        } else {
            EventKind::Chord(pitches)
        };
        events.push(Event::new(to_offset(onset), kind));

        sounding_until = Some(sounding_until.map_or(group_end, |u| u.max(group_end)));
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_core::UNIT;
    use proptest::prelude::*;

    fn note(key: u8, start: f64, length: f64) -> MidiNote {
        MidiNote {
            key,
            velocity: 100,
            channel: 0,
            start,
            length,
        }
    }

    #[test]
    fn test_simultaneous_notes_form_chord() {
        let events = group_events(
            &[note(60, 0.0, 1.0), note(64, 0.0, 1.0), note(67, 0.01, 1.0)],
            DEFAULT_DIVISOR,
            UNIT,
        );

        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].kind,
            EventKind::Chord(vec![Pitch::new(60), Pitch::new(64), Pitch::new(67)])
        );
    }

    #[test]
    fn test_unison_doubling_is_a_note() {
        let events = group_events(
            &[note(60, 0.0, 1.0), note(60, 0.0, 0.5)],
            DEFAULT_DIVISOR,
            UNIT,
        );
        assert_eq!(events, vec![Event::new(0.0, EventKind::Note(Pitch::new(60)))]);
    }

    #[test]
    fn test_rest_at_start_of_silence() {
        let events = group_events(
            &[note(60, 0.0, 0.5), note(62, 2.0, 0.5)],
            DEFAULT_DIVISOR,
            UNIT,
        );

        assert_eq!(
            events,
            vec![
                Event::new(0.0, EventKind::Note(Pitch::new(60))),
                Event::rest(0.5),
                Event::new(2.0, EventKind::Note(Pitch::new(62))),
            ]
        );
    }

    #[test]
    fn test_short_gap_and_overlap_have_no_rest() {
        // 0.25 gap is under one unit, the second pair overlaps
        let events = group_events(
            &[
                note(60, 0.0, 0.5),
                note(62, 0.75, 2.0),
                note(64, 1.0, 0.5),
                note(65, 2.5, 0.5),
            ],
            DEFAULT_DIVISOR,
            UNIT,
        );
        assert!(events.iter().all(|e| !e.is_rest()));
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn test_no_leading_rest() {
        let events = group_events(&[note(60, 4.0, 1.0)], DEFAULT_DIVISOR, UNIT);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].offset, 4.0);
    }

    #[test]
    fn test_offsets_non_decreasing() {
        let notes: Vec<MidiNote> = (0..40)
            .map(|i| note(48 + (i * 7 % 24) as u8, (i * 5 % 17) as f64 * 0.25, 0.3))
            .collect();
        let events = group_events(&notes, DEFAULT_DIVISOR, UNIT);
        assert!(events.windows(2).all(|w| w[0].offset <= w[1].offset));
    }

    #[test]
    fn test_quantize() {
        assert_eq!(quantize(0.49, 12), 0.5);
        assert_eq!(quantize(1.0 / 3.0, 12), 4.0 / 12.0);
        assert_eq!(quantize(2.0, 1), 2.0);
    }

    proptest! {
        #[test]
        fn test_events_never_go_back_in_time(
            raw in prop::collection::vec((21u8..109, 0u32..400, 1u32..48), 0..64),
            divisor in 1u32..25,
        ) {
            let notes: Vec<MidiNote> = raw
                .iter()
                .map(|&(key, start, length)| note(key, start as f64 / 16.0, length as f64 / 16.0))
                .collect();

            let events = group_events(&notes, divisor, UNIT);

            prop_assert!(events.windows(2).all(|w| w[0].offset <= w[1].offset));
            prop_assert!(events.first().map_or(true, |e| !e.is_rest()));
            prop_assert!(events.windows(2).all(|w| !(w[0].is_rest() && w[1].is_rest())));
        }
    }
}
