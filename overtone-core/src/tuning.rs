//! # Musical Tuning Module
//!
//! This module maps frequencies to equal-tempered musical notes and back.
//! It provides the note math for the peak annotator: nearest semitone,
//! octave, note class, and the signed cents deviation a tuner display
//! needs.
//!
//! ## Features
//! - Frequency to note-number conversion against a configurable reference pitch
//! - Exact algebraic inverse for note-number to frequency
//! - Cents deviation in the ±50 cent range around the nearest semitone
//! - Precomputed note-name table for allocation-free display lookups

use once_cell::sync::Lazy;

/// The 12 chromatic note classes, starting at C (note class 0).
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Note number assigned to the reference pitch (A4 under the standard
/// equal-tempered convention).
pub const REFERENCE_NOTE_NUMBER: i32 = 69;

/// Statically computed names for the 128 MIDI-range note numbers.
///
/// Computed once on first use so per-peak display lookups never format.
/// Note number 0 is "C-1" by convention.
static MIDI_NOTE_NAMES: Lazy<Vec<String>> = Lazy::new(|| {
    (0..128i32)
        .map(|n| {
            let octave = n.div_euclid(12) - 1;
            let class = n.rem_euclid(12) as usize;
            format!("{}{}", NOTE_NAMES[class], octave)
        })
        .collect()
});

/// Fractional note number for a frequency: `69 + 12 * log2(f / reference)`.
///
/// The integer part selects the semitone; the fraction is the tuning
/// error that [`MusicNote::from_frequency`] turns into cents.
pub fn note_number_from_frequency(frequency_hz: f32, reference_pitch_hz: f32) -> f32 {
    REFERENCE_NOTE_NUMBER as f32 + 12.0 * (frequency_hz / reference_pitch_hz).log2()
}

/// Equal-tempered frequency of an integer note number.
///
/// Exact algebraic inverse of [`note_number_from_frequency`]:
/// `reference * 2^((n - 69) / 12)`.
pub fn frequency_from_note_number(note_number: i32, reference_pitch_hz: f32) -> f32 {
    reference_pitch_hz * 2.0f32.powf((note_number - REFERENCE_NOTE_NUMBER) as f32 / 12.0)
}

/// Looks up the precomputed name for a MIDI-range note number.
pub fn note_name(note_number: i32) -> Option<&'static str> {
    if (0..128).contains(&note_number) {
        Some(MIDI_NOTE_NAMES[note_number as usize].as_str())
    } else {
        None
    }
}

/// A spectral peak's frequency resolved to the nearest musical note.
///
/// Derived and immutable once constructed; all fields are plain values so
/// the type is `Copy` and safe to hand across threads by value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MusicNote {
    /// The frequency the note was derived from, in Hz.
    pub frequency_hz: f32,
    /// Nearest integer note number (semitones from C-1; A4 = 69).
    pub note_number: i32,
    /// Octave number; note number 0 maps to octave -1.
    pub octave: i32,
    /// Note class index 0-11 into [`NOTE_NAMES`].
    pub note_class: usize,
    /// Signed tuning error from the nearest semitone, in cents.
    pub cents_deviation: f32,
    /// Spectral magnitude the peak carried, in dB.
    pub magnitude_db: f32,
}

impl MusicNote {
    /// Resolves a frequency (plus its peak magnitude) to the nearest note.
    ///
    /// # Arguments
    /// * `frequency_hz` - Peak frequency in Hz; must be positive
    /// * `magnitude_db` - Peak level, carried through for display
    /// * `reference_pitch_hz` - Frequency of A4, conventionally 440 Hz
    pub fn from_frequency(frequency_hz: f32, magnitude_db: f32, reference_pitch_hz: f32) -> Self {
        let fractional = note_number_from_frequency(frequency_hz, reference_pitch_hz);
        let note_number = fractional.round() as i32;
        let cents_deviation = (fractional - note_number as f32) * 100.0;

        Self {
            frequency_hz,
            note_number,
            octave: note_number.div_euclid(12) - 1,
            note_class: note_number.rem_euclid(12) as usize,
            cents_deviation,
            magnitude_db,
        }
    }

    /// Display name such as "A4" or "C#-1".
    pub fn name(&self) -> String {
        match note_name(self.note_number) {
            Some(name) => name.to_string(),
            None => format!("{}{}", NOTE_NAMES[self.note_class], self.octave),
        }
    }
}
