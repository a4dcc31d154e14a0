//! End-to-end scenarios for the full analysis pipeline: stream samples
//! in through the public interface, let the periodic analysis fire, and
//! check the published results.

use overtone_core::{AnalyzerConfig, PeakAnalyzer};
use overtone_core::tuning::NOTE_NAMES;

const SAMPLE_RATE: u32 = 44100;

fn running_analyzer() -> PeakAnalyzer {
    let mut analyzer = PeakAnalyzer::new(AnalyzerConfig::default());
    analyzer.initialize(SAMPLE_RATE);
    assert!(analyzer.is_running());
    analyzer
}

fn push_sine(analyzer: &mut PeakAnalyzer, freq: f32, amplitude: f32, count: usize) {
    let sr = SAMPLE_RATE as f32;
    for i in 0..count {
        let phase = 2.0 * std::f32::consts::PI * freq * i as f32 / sr;
        analyzer.push(phase.sin() * amplitude);
    }
}

/// Deterministic low-level broadband signal (no RNG dependency).
fn push_quiet_noise(analyzer: &mut PeakAnalyzer, amplitude: f32, count: usize) {
    let mut state: u32 = 0x1234_5678;
    for _ in 0..count {
        // xorshift32
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let unit = (state as f32 / u32::MAX as f32) * 2.0 - 1.0;
        analyzer.push(unit * amplitude);
    }
}

#[test]
fn pure_a440_is_reported_as_a_tuned_a4() {
    let mut analyzer = running_analyzer();
    // Two full windows so the analysed snapshot is all sine.
    push_sine(&mut analyzer, 440.0, 0.8, 2 * 4096);

    let peaks = analyzer.peaks();
    assert!(!peaks.is_empty(), "no peaks detected for a loud tone");

    let bin_width = SAMPLE_RATE as f32 / 4096.0; // ~10.77 Hz
    let top = &peaks[0];
    assert!(
        (top.frequency_hz - 440.0).abs() <= bin_width,
        "top peak at {} Hz, expected within one bin of 440",
        top.frequency_hz
    );
    assert_eq!(NOTE_NAMES[top.note.note_class], "A");
    assert_eq!(top.note.octave, 4);
    assert_eq!(top.note.note_number, 69);
    assert!(
        top.note.cents_deviation.abs() < 15.0,
        "cents deviation too large: {}",
        top.note.cents_deviation
    );
}

#[test]
fn peak_list_is_bounded_ranked_and_band_limited() {
    let mut analyzer = running_analyzer();
    // A harmonic-rich signal: several sines at once.
    let sr = SAMPLE_RATE as f32;
    for i in 0..(2 * 4096) {
        let t = i as f32 / sr;
        let mut s = 0.0;
        for (k, f) in [220.0f32, 440.0, 880.0, 1320.0, 2640.0, 5280.0].iter().enumerate() {
            s += (2.0 * std::f32::consts::PI * f * t).sin() * 0.5 / (k + 1) as f32;
        }
        analyzer.push(s);
    }

    let peaks = analyzer.peaks();
    assert!(!peaks.is_empty());
    assert!(peaks.len() <= 10, "more than max_peaks reported");
    assert!(
        peaks
            .windows(2)
            .all(|w| w[0].magnitude_db >= w[1].magnitude_db),
        "peak list not sorted by descending magnitude"
    );
    let half = 4096 / 2;
    for peak in peaks {
        assert!((20.0..=16384.0).contains(&peak.frequency_hz));
        assert!(peak.bin_index >= 2 && peak.bin_index < half - 1);
    }
}

#[test]
fn silence_produces_no_peaks() {
    let mut analyzer = running_analyzer();
    for _ in 0..(2 * 4096) {
        analyzer.push(0.0);
    }

    assert!(analyzer.peaks().is_empty());
    let consumer = analyzer.consumer();
    assert_eq!(consumer.peak_count(), 0);
    // The spectrum itself was still computed and published.
    assert_eq!(consumer.spectrum_bin_count(), 2048);
}

#[test]
fn below_threshold_signal_yields_a_spectrum_but_no_peaks() {
    let mut analyzer = running_analyzer();
    push_quiet_noise(&mut analyzer, 0.002, 2 * 4096);

    let consumer = analyzer.consumer();
    assert_eq!(consumer.peak_count(), 0, "quiet broadband signal crossed the threshold");

    // Correctly shaped spectrum: full bin count, energy above the silence
    // floor but below the peak threshold.
    assert_eq!(consumer.spectrum_bin_count(), 2048);
    let frame = consumer.latest();
    let max_db = frame
        .spectrum_db
        .iter()
        .cloned()
        .fold(f32::NEG_INFINITY, f32::max);
    assert!(max_db > -150.0, "spectrum flat at the floor: {max_db} dB");
    assert!(max_db <= -30.0, "quiet signal too loud: {max_db} dB");
}

#[test]
fn polled_results_match_the_producer_view() {
    let mut analyzer = running_analyzer();
    push_sine(&mut analyzer, 880.0, 0.8, 2 * 4096);

    let producer_top = analyzer.peaks()[0];
    let consumer = analyzer.consumer();
    assert_eq!(consumer.peak_count(), analyzer.peaks().len());
    assert_eq!(consumer.peak_frequency(0), producer_top.frequency_hz);
    assert_eq!(consumer.peak_magnitude(0), producer_top.magnitude_db);
    assert_eq!(consumer.peak_note_number(0), producer_top.note.note_number);
    assert_eq!(consumer.sample_rate(), SAMPLE_RATE as f32);
    assert_eq!(consumer.fft_size(), 4096);
}

#[test]
fn reference_pitch_configuration_shifts_note_mapping() {
    let config = AnalyzerConfig {
        reference_pitch_hz: 432.0,
        ..AnalyzerConfig::default()
    };
    let mut analyzer = PeakAnalyzer::new(config);
    analyzer.initialize(SAMPLE_RATE);

    push_sine(&mut analyzer, 432.0, 0.8, 2 * 4096);
    let top = analyzer.peaks()[0];
    assert_eq!(top.note.note_number, 69, "432 Hz should be A4 under a 432 reference");
    assert!(top.note.cents_deviation.abs() < 15.0);
}
