//! # Spectral Peak Picking Module
//!
//! Scans a magnitude spectrum for prominent local maxima and annotates
//! each one with its musical note. The picker is deliberately simple and
//! deterministic: fixed threshold, plateau-inclusive neighbour test,
//! audible-band filter, then rank and truncate.

use crate::tuning::MusicNote;

/// One qualifying spectral peak, produced fresh each analysis cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectedPeak {
    /// Index of the spectrum bin the peak was found in.
    pub bin_index: usize,
    /// Bin centre frequency in Hz: `bin_index * sample_rate / fft_size`.
    pub frequency_hz: f32,
    /// Peak level in dB.
    pub magnitude_db: f32,
    /// Nearest equal-tempered note with its tuning deviation.
    pub note: MusicNote,
}

/// Local-maximum picker over decibel magnitude spectra.
///
/// Configured once at pipeline initialisation; `detect_into` is pure with
/// respect to the picker and writes into a caller-owned, reusable list.
#[derive(Debug, Clone)]
pub struct PeakPicker {
    threshold_db: f32,
    max_peaks: usize,
    band_low_hz: f32,
    band_high_hz: f32,
    reference_pitch_hz: f32,
}

impl PeakPicker {
    pub fn new(
        threshold_db: f32,
        max_peaks: usize,
        band_low_hz: f32,
        band_high_hz: f32,
        reference_pitch_hz: f32,
    ) -> Self {
        Self {
            threshold_db,
            max_peaks,
            band_low_hz,
            band_high_hz,
            reference_pitch_hz,
        }
    }

    /// Scans `spectrum_db` and replaces `out` with the ranked peak list.
    ///
    /// Algorithm:
    /// - Scan bins `[2, len - 2]`, skipping DC/near-DC and the final bin
    /// - A bin qualifies when it exceeds the threshold and is `>=` both
    ///   immediate neighbours (flat-topped plateaus may therefore yield
    ///   adjacent duplicate peaks; that behaviour is intentional and
    ///   covered by a test rather than merged away)
    /// - Bin index converts to frequency as `i * sample_rate / fft_size`
    /// - Peaks outside the audible band are discarded
    /// - Survivors are sorted by descending magnitude and truncated
    ///
    /// # Arguments
    /// * `spectrum_db` - Magnitude spectrum, `fft_size / 2` dB values
    /// * `fft_size` - Transform length the spectrum came from
    /// * `sample_rate` - Stream sample rate in Hz
    /// * `out` - Reusable output list, cleared and refilled
    pub fn detect_into(
        &self,
        spectrum_db: &[f32],
        fft_size: usize,
        sample_rate: f32,
        out: &mut Vec<DetectedPeak>,
    ) {
        out.clear();
        let half = spectrum_db.len();
        if half < 4 {
            return;
        }

        for i in 2..=(half - 2) {
            let mag = spectrum_db[i];
            if mag <= self.threshold_db {
                continue;
            }
            if mag < spectrum_db[i - 1] || mag < spectrum_db[i + 1] {
                continue;
            }

            let freq = i as f32 * sample_rate / fft_size as f32;
            if freq < self.band_low_hz || freq > self.band_high_hz {
                continue;
            }

            out.push(DetectedPeak {
                bin_index: i,
                frequency_hz: freq,
                magnitude_db: mag,
                note: MusicNote::from_frequency(freq, mag, self.reference_pitch_hz),
            });
        }

        // Strongest first; unstable sort avoids the temporary buffer a
        // stable sort would allocate.
        out.sort_unstable_by(|a, b| {
            b.magnitude_db
                .partial_cmp(&a.magnitude_db)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        out.truncate(self.max_peaks);
    }
}
