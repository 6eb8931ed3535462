//! Instrument resolution for MIDI tracks
//!
//! Every part is resolved once, at scan time, to a typed [`Instrument`].
//! Track name hints take precedence over the General MIDI program number.

use duet_core::Instrument;

/// GM channel 10, zero based
pub const PERCUSSION_CHANNEL: u8 = 9;

/// Map a General MIDI program number (0-127) to an instrument
pub fn instrument_from_program(program: u8) -> Instrument {
    match program {
        // Piano (0-7)
        0..=3 => Instrument::Piano,
        4 | 5 => Instrument::ElectricPiano,
        6 => Instrument::Harpsichord,
        7 => Instrument::Clavichord,

        // Chromatic percussion (8-15)
        8 => Instrument::Celesta,
        9..=15 => Instrument::Other,

        // Organ (16-23); accordions and harmonica are reeds, not keyboards here
        16..=20 => Instrument::Organ,
        21..=23 => Instrument::Other,

        // Guitar (24-31)
        24 | 25 => Instrument::AcousticGuitar,
        26..=31 => Instrument::ElectricGuitar,

        // Bass (32-39)
        32 => Instrument::AcousticBass,
        33 | 34 | 36 | 37 => Instrument::ElectricBass,
        35 => Instrument::FretlessBass,
        38 | 39 => Instrument::Other,

        // Strings (40-47)
        40 => Instrument::Violin,
        41 => Instrument::Viola,
        42 => Instrument::Violoncello,
        43 => Instrument::Contrabass,
        44 | 45 => Instrument::StringInstrument,
        46 => Instrument::Harp,
        47 => Instrument::Other,

        // String ensembles (48-51)
        48..=51 => Instrument::StringInstrument,

        // Ethnic (104-111)
        104 => Instrument::Sitar,
        105 => Instrument::Banjo,
        106 => Instrument::Shamisen,
        107 => Instrument::Koto,
        110 => Instrument::Violin,

        _ => Instrument::Other,
    }
}

/// Detect an instrument from a track name using keyword matching.
/// Returns `None` when no keyword gives a clear answer.
pub fn detect_instrument_from_name(track_name: &str) -> Option<Instrument> {
    let name_lower = track_name.to_lowercase();
    let has = |keywords: &[&str]| keywords.iter().any(|k| name_lower.contains(k));

    // Keyboards; harpsichord before harp, electric piano before piano
    if has(&["harpsichord", "cembalo"]) {
        return Some(Instrument::Harpsichord);
    }
    if has(&["clavichord", "clavi"]) {
        return Some(Instrument::Clavichord);
    }
    if has(&["celesta", "celeste"]) {
        return Some(Instrument::Celesta);
    }
    if has(&["electric piano", "e.piano", "rhodes", "wurli", "ep "]) {
        return Some(Instrument::ElectricPiano);
    }
    if has(&["organ"]) {
        return Some(Instrument::Organ);
    }
    if has(&["piano", "keyboard", "keys"]) {
        return Some(Instrument::Piano);
    }
    if has(&["drum", "perc"]) {
        return Some(Instrument::Percussion);
    }

    // Basses before guitars so that "bass guitar" is a bass
    if has(&["fretless"]) {
        return Some(Instrument::FretlessBass);
    }
    if has(&["contrabass", "double bass", "upright bass"]) {
        return Some(Instrument::Contrabass);
    }
    if has(&["acoustic bass"]) {
        return Some(Instrument::AcousticBass);
    }
    if has(&["electric bass", "bass guitar", "finger bass", "pick bass", "slap bass"]) {
        return Some(Instrument::ElectricBass);
    }

    // Bowed strings; viola does not contain "violin" but violoncello contains "viol"
    if has(&["violoncello", "cello"]) {
        return Some(Instrument::Violoncello);
    }
    if has(&["viola"]) {
        return Some(Instrument::Viola);
    }
    if has(&["violin", "fiddle"]) {
        return Some(Instrument::Violin);
    }
    if has(&["harp"]) {
        return Some(Instrument::Harp);
    }

    // Plucked
    if has(&["acoustic guitar", "nylon", "steel guitar"]) {
        return Some(Instrument::AcousticGuitar);
    }
    if has(&["electric guitar", "distortion", "overdrive", "e.guitar"]) {
        return Some(Instrument::ElectricGuitar);
    }
    if has(&["guitar", "gtr"]) {
        return Some(Instrument::Guitar);
    }

    let plucked = [
        ("mandolin", Instrument::Mandolin),
        ("ukulele", Instrument::Ukulele),
        ("banjo", Instrument::Banjo),
        ("lute", Instrument::Lute),
        ("sitar", Instrument::Sitar),
        ("shamisen", Instrument::Shamisen),
        ("koto", Instrument::Koto),
    ];
    // Whole words only: "lute" is inside "flute"
    let words: Vec<&str> = name_lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    if let Some((_, instrument)) = plucked.iter().find(|(k, _)| words.contains(k)) {
        return Some(*instrument);
    }

    if has(&["string", "str "]) {
        return Some(Instrument::StringInstrument);
    }

    None
}

/// Resolve the instrument of a part.
///
/// Channel 10 is always percussion. Otherwise the track name is tried
/// first, then the GM program, and a part with neither defaults to GM
/// program 0 (acoustic grand piano).
pub fn resolve_instrument(name: Option<&str>, program: Option<u8>, channel: Option<u8>) -> Instrument {
    if channel == Some(PERCUSSION_CHANNEL) {
        return Instrument::Percussion;
    }

    if let Some(instrument) = name.and_then(detect_instrument_from_name) {
        return instrument;
    }

    match program {
        Some(program) => instrument_from_program(program),
        None => Instrument::Piano,
    }
}
