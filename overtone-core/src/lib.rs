// overtone-core/src/lib.rs

//! The core logic for the real-time spectral peak and pitch detector.
//! This crate owns the analysis pipeline: a rolling sample buffer, a
//! windowed FFT with decibel conversion, spectral peak picking, and
//! frequency-to-note mapping. It is completely headless and contains
//! no UI code; hosts stream samples in and poll the detected peaks.

pub mod analyzer;
pub mod capture;
pub mod params;
pub mod peaks;
pub mod ring;
pub mod spectrum;
pub mod tuning;

pub use analyzer::{AnalyzerConfig, PeakAnalyzer, PeakConsumer};
pub use peaks::DetectedPeak;
pub use tuning::MusicNote;

use spectrum::SILENCE_FLOOR_DB;

/// The result of a single analysis cycle, published wholesale.
///
/// Frames are replaced atomically, never mutated in place, so a polling
/// consumer always sees a structurally complete list.
#[derive(Debug, Clone)]
pub struct AnalysisFrame {
    /// Effective sample rate in Hz; 0.0 before the first cycle.
    pub sample_rate: f32,
    /// Transform size the spectrum was computed with.
    pub fft_size: usize,
    /// Magnitude spectrum in dB, `fft_size / 2` bins.
    pub spectrum_db: Vec<f32>,
    /// Detected peaks, strongest first.
    pub peaks: Vec<DetectedPeak>,
}

impl AnalysisFrame {
    /// A frame representing "no analysis yet": silence-floor spectrum,
    /// no peaks.
    pub fn empty(sample_rate: f32, fft_size: usize) -> Self {
        Self {
            sample_rate,
            fft_size,
            spectrum_db: vec![SILENCE_FLOOR_DB; fft_size / 2],
            peaks: Vec::new(),
        }
    }
}
