//! # Analysis Pipeline Module
//!
//! Wires the ring buffer, windowed spectrum, peak picker, and note mapper
//! into the streaming pipeline the host drives: one `push` per incoming
//! sample, with a full snapshot -> transform -> detect -> map cycle every
//! hop interval, run synchronously inline on the producer thread.
//!
//! ## Architecture
//! - **Producer thread**: the audio render thread calls `push` /
//!   `process_block`; analysis happens inline, no background threads
//! - **Consumers**: any thread polls a [`PeakConsumer`]; the latest frame
//!   is published through a triple buffer, so a poll sees either the
//!   previous or the current cycle, never a torn list
//! - **Lifecycle**: two states only. Uninitialised (no buffers, calls are
//!   safe no-ops) and running (everything allocated once, reused in place)

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use triple_buffer::TripleBuffer;

use crate::AnalysisFrame;
use crate::params::{ParameterId, ParameterSet};
use crate::peaks::{DetectedPeak, PeakPicker};
use crate::ring::RingBuffer;
use crate::spectrum::{SILENCE_FLOOR_DB, WindowedSpectrum};

/// Pipeline configuration, fixed at initialisation.
///
/// Loadable from JSON; every field has a default so partial files work.
/// Values are validated once by [`validate`](Self::validate) and never
/// mutated while the pipeline is running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Transform length N; must be a power of two.
    pub fft_size: usize,
    /// Minimum magnitude for a bin to qualify as a peak, in dB.
    pub threshold_db: f32,
    /// Maximum number of peaks reported per cycle.
    pub max_peaks: usize,
    /// Frequency of A4 in Hz.
    pub reference_pitch_hz: f32,
    /// Lower edge of the reported frequency band, in Hz.
    pub band_low_hz: f32,
    /// Upper edge of the reported frequency band, in Hz.
    pub band_high_hz: f32,
    /// Analysis trigger interval in samples; `None` means `fft_size / 8`.
    pub hop_samples: Option<usize>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            fft_size: 4096,
            threshold_db: -30.0,
            max_peaks: 10,
            reference_pitch_hz: 440.0,
            band_low_hz: 20.0,
            band_high_hz: 16384.0,
            hop_samples: None,
        }
    }
}

impl AnalyzerConfig {
    /// Effective analysis interval in samples.
    pub fn hop(&self) -> usize {
        self.hop_samples.unwrap_or(self.fft_size / 8)
    }

    /// Checks the configuration once, before any allocation happens.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.fft_size.is_power_of_two() || self.fft_size < 16 {
            anyhow::bail!(
                "transform size must be a power of two (>= 16), got {}",
                self.fft_size
            );
        }
        if self.max_peaks == 0 {
            anyhow::bail!("max_peaks must be non-zero");
        }
        if !self.reference_pitch_hz.is_finite() || self.reference_pitch_hz <= 0.0 {
            anyhow::bail!("reference pitch must be positive, got {}", self.reference_pitch_hz);
        }
        if !self.threshold_db.is_finite() {
            anyhow::bail!("peak threshold must be finite");
        }
        if self.band_low_hz < 0.0 || self.band_high_hz <= self.band_low_hz {
            anyhow::bail!(
                "frequency band [{}, {}] Hz is not ordered",
                self.band_low_hz,
                self.band_high_hz
            );
        }
        if self.hop_samples == Some(0) {
            anyhow::bail!("analysis interval must be non-zero");
        }
        Ok(())
    }
}

/// Everything the running state owns: allocated once at `initialize`,
/// reused in place every cycle, dropped as a unit at `deinitialize`.
struct Engine {
    ring: RingBuffer,
    spectrum: WindowedSpectrum,
    picker: PeakPicker,
    snapshot_scratch: Vec<f32>,
    spectrum_db: Vec<f32>,
    peaks: Vec<DetectedPeak>,
    samples_since_analysis: usize,
    sample_rate: f32,
}

/// The streaming peak/pitch detector.
///
/// Owned and driven by a single producer thread. Construction is cheap;
/// [`initialize`](Self::initialize) performs all allocation and is the
/// only transition into the running state. If the configuration is
/// rejected the analyzer stays inert and every subsequent call degrades
/// to a safe no-op returning neutral results; a real-time caller has no
/// recovery path mid-stream, so nothing is propagated.
pub struct PeakAnalyzer {
    config: AnalyzerConfig,
    params: ParameterSet,
    engine: Option<Engine>,
    frame_input: triple_buffer::Input<AnalysisFrame>,
    consumer: PeakConsumer,
}

impl PeakAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        let initial = AnalysisFrame::empty(0.0, config.fft_size);
        let (frame_input, frame_output) = TripleBuffer::new(&initial).split();
        Self {
            config,
            params: ParameterSet::new(),
            engine: None,
            frame_input,
            consumer: PeakConsumer {
                output: Arc::new(Mutex::new(frame_output)),
            },
        }
    }

    /// The configuration the analyzer was built with.
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Allocates all buffers and the transform plan, entering the running
    /// state. On a rejected configuration (or zero sample rate) the
    /// analyzer logs a warning and stays uninitialised.
    pub fn initialize(&mut self, sample_rate: u32) {
        if let Err(err) = self.config.validate() {
            log::warn!("analyzer configuration rejected, staying inert: {err}");
            self.engine = None;
            return;
        }
        if sample_rate == 0 {
            log::warn!("sample rate of 0 Hz rejected, staying inert");
            self.engine = None;
            return;
        }

        let n = self.config.fft_size;
        self.engine = Some(Engine {
            ring: RingBuffer::new(n),
            spectrum: WindowedSpectrum::new(n),
            picker: PeakPicker::new(
                self.config.threshold_db,
                self.config.max_peaks,
                self.config.band_low_hz,
                self.config.band_high_hz,
                self.config.reference_pitch_hz,
            ),
            snapshot_scratch: vec![0.0; n],
            spectrum_db: vec![SILENCE_FLOOR_DB; n / 2],
            // Worst case every other scanned bin qualifies before ranking.
            peaks: Vec::with_capacity(n / 4),
            samples_since_analysis: 0,
            sample_rate: sample_rate as f32,
        });
        log::info!(
            "analyzer running: fft_size={n}, hop={}, sample_rate={sample_rate} Hz",
            self.config.hop()
        );
    }

    /// Releases the transform plan and all buffers. Safe to call in any
    /// state and any number of times.
    pub fn deinitialize(&mut self) {
        self.engine = None;
    }

    /// Whether the pipeline is in its running state.
    pub fn is_running(&self) -> bool {
        self.engine.is_some()
    }

    /// Accepts one sample from the stream; O(1) except on analysis
    /// cycles, which stay within the host's per-buffer budget. A no-op
    /// while uninitialised.
    #[inline]
    pub fn push(&mut self, sample: f32) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        engine.ring.push(sample);
        engine.samples_since_analysis += 1;
        if engine.samples_since_analysis >= self.config.hop() {
            engine.samples_since_analysis = 0;
            Self::run_cycle(engine, &mut self.frame_input);
        }
    }

    /// One full snapshot -> transform -> detect -> map cycle, ending with
    /// the wholesale publication of the new frame.
    ///
    /// Publication reuses the triple buffer's input slot in place: the
    /// slot's vectors keep their capacity between cycles, so once every
    /// slot has been written the steady state performs no allocation.
    fn run_cycle(engine: &mut Engine, frame_input: &mut triple_buffer::Input<AnalysisFrame>) {
        engine.ring.snapshot_into(&mut engine.snapshot_scratch);
        engine
            .spectrum
            .analyze_into(&engine.snapshot_scratch, &mut engine.spectrum_db);
        engine.picker.detect_into(
            &engine.spectrum_db,
            engine.spectrum.fft_size(),
            engine.sample_rate,
            &mut engine.peaks,
        );

        let slot = frame_input.input_buffer_mut();
        slot.sample_rate = engine.sample_rate;
        slot.fft_size = engine.spectrum.fft_size();
        slot.spectrum_db.clear();
        slot.spectrum_db.extend_from_slice(&engine.spectrum_db);
        slot.peaks.clear();
        slot.peaks.extend_from_slice(&engine.peaks);
        frame_input.publish();
    }

    /// Block-level entry point mirroring a plugin render callback: honours
    /// bypass, applies the gain parameter, and feeds every input sample to
    /// the analysis stream.
    ///
    /// Mismatched buffer lengths are a caller contract violation, checked
    /// in debug builds only.
    pub fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(input.len(), output.len(), "channel buffer length mismatch");
        if self.params.is_bypassed() {
            let n = input.len().min(output.len());
            output[..n].copy_from_slice(&input[..n]);
            return;
        }
        let gain = self.params.gain();
        for (&sample, out) in input.iter().zip(output.iter_mut()) {
            self.push(sample);
            *out = sample * gain;
        }
    }

    pub fn parameter(&self, id: ParameterId) -> f32 {
        self.params.get(id)
    }

    pub fn set_parameter(&mut self, id: ParameterId, value: f32) {
        self.params.set(id, value);
    }

    /// Peaks from the most recent analysis cycle, for same-thread use.
    /// Empty while uninitialised or before the first cycle.
    pub fn peaks(&self) -> &[DetectedPeak] {
        self.engine.as_ref().map(|e| e.peaks.as_slice()).unwrap_or(&[])
    }

    /// dB spectrum from the most recent analysis cycle, for same-thread use.
    pub fn spectrum_db(&self) -> &[f32] {
        self.engine
            .as_ref()
            .map(|e| e.spectrum_db.as_slice())
            .unwrap_or(&[])
    }

    /// Effective sample rate in Hz, 0.0 while uninitialised.
    pub fn sample_rate(&self) -> f32 {
        self.engine.as_ref().map(|e| e.sample_rate).unwrap_or(0.0)
    }

    /// Configured transform size.
    pub fn fft_size(&self) -> usize {
        self.config.fft_size
    }

    /// A cloneable handle other threads can poll for the latest results.
    pub fn consumer(&self) -> PeakConsumer {
        self.consumer.clone()
    }
}

/// Read-only, index-bounded query surface for polling consumers.
///
/// This is the flat-getter bridge at the external boundary: inside the
/// core, peaks are a structured list; here every getter takes an index
/// and returns a neutral zero for anything out of range, because the
/// polling contexts it serves cannot handle exceptional control flow.
///
/// Reads are eventually consistent: a poll observes the previous or the
/// current cycle's frame, never a partially written one.
#[derive(Clone)]
pub struct PeakConsumer {
    output: Arc<Mutex<triple_buffer::Output<AnalysisFrame>>>,
}

impl PeakConsumer {
    fn with_frame<R>(&self, default: R, f: impl FnOnce(&AnalysisFrame) -> R) -> R {
        match self.output.try_lock() {
            Ok(mut output) => f(output.read()),
            Err(_) => default,
        }
    }

    /// A copy of the latest published frame.
    pub fn latest(&self) -> AnalysisFrame {
        self.with_frame(AnalysisFrame::empty(0.0, 0), |frame| frame.clone())
    }

    pub fn peak_count(&self) -> usize {
        self.with_frame(0, |frame| frame.peaks.len())
    }

    pub fn peak_frequency(&self, index: usize) -> f32 {
        self.with_frame(0.0, |frame| {
            frame.peaks.get(index).map(|p| p.frequency_hz).unwrap_or(0.0)
        })
    }

    pub fn peak_magnitude(&self, index: usize) -> f32 {
        self.with_frame(0.0, |frame| {
            frame.peaks.get(index).map(|p| p.magnitude_db).unwrap_or(0.0)
        })
    }

    pub fn peak_note_number(&self, index: usize) -> i32 {
        self.with_frame(0, |frame| {
            frame.peaks.get(index).map(|p| p.note.note_number).unwrap_or(0)
        })
    }

    pub fn peak_note_class(&self, index: usize) -> i32 {
        self.with_frame(0, |frame| {
            frame
                .peaks
                .get(index)
                .map(|p| p.note.note_class as i32)
                .unwrap_or(0)
        })
    }

    pub fn peak_octave(&self, index: usize) -> i32 {
        self.with_frame(0, |frame| {
            frame.peaks.get(index).map(|p| p.note.octave).unwrap_or(0)
        })
    }

    pub fn peak_cents(&self, index: usize) -> f32 {
        self.with_frame(0.0, |frame| {
            frame
                .peaks
                .get(index)
                .map(|p| p.note.cents_deviation)
                .unwrap_or(0.0)
        })
    }

    pub fn spectrum_bin_count(&self) -> usize {
        self.with_frame(0, |frame| frame.spectrum_db.len())
    }

    pub fn spectrum_bin(&self, index: usize) -> f32 {
        self.with_frame(0.0, |frame| {
            frame.spectrum_db.get(index).copied().unwrap_or(0.0)
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.with_frame(0.0, |frame| frame.sample_rate)
    }

    pub fn fft_size(&self) -> usize {
        self.with_frame(0, |frame| frame.fft_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> AnalyzerConfig {
        AnalyzerConfig {
            fft_size: 1024,
            ..AnalyzerConfig::default()
        }
    }

    fn push_sine(analyzer: &mut PeakAnalyzer, freq: f32, sample_rate: f32, count: usize) {
        for i in 0..count {
            let t = i as f32 / sample_rate;
            analyzer.push((2.0 * std::f32::consts::PI * freq * t).sin() * 0.8);
        }
    }

    #[test]
    fn uninitialized_analyzer_is_inert() {
        let mut analyzer = PeakAnalyzer::new(small_config());
        assert!(!analyzer.is_running());

        push_sine(&mut analyzer, 440.0, 44100.0, 4096);

        assert!(analyzer.peaks().is_empty());
        assert!(analyzer.spectrum_db().is_empty());
        assert_eq!(analyzer.sample_rate(), 0.0);
        assert_eq!(analyzer.consumer().peak_count(), 0);
    }

    #[test]
    fn rejected_configuration_degrades_silently() {
        let config = AnalyzerConfig {
            fft_size: 1000, // not a power of two
            ..AnalyzerConfig::default()
        };
        assert!(config.validate().is_err());

        let mut analyzer = PeakAnalyzer::new(config);
        analyzer.initialize(44100);
        assert!(!analyzer.is_running());

        // Still a safe no-op, not a panic.
        push_sine(&mut analyzer, 440.0, 44100.0, 2048);
        assert_eq!(analyzer.consumer().peak_count(), 0);
    }

    #[test]
    fn deinitialize_is_idempotent() {
        let mut analyzer = PeakAnalyzer::new(small_config());
        analyzer.initialize(44100);
        assert!(analyzer.is_running());

        analyzer.deinitialize();
        assert!(!analyzer.is_running());
        analyzer.deinitialize();
        assert!(!analyzer.is_running());

        // Pushing after teardown is a no-op.
        push_sine(&mut analyzer, 440.0, 44100.0, 2048);
        assert!(analyzer.peaks().is_empty());
    }

    #[test]
    fn zero_sample_rate_is_rejected() {
        let mut analyzer = PeakAnalyzer::new(small_config());
        analyzer.initialize(0);
        assert!(!analyzer.is_running());
    }

    #[test]
    fn analysis_runs_every_hop_interval() {
        let mut analyzer = PeakAnalyzer::new(small_config());
        analyzer.initialize(44100);
        let hop = analyzer.config().hop();
        assert_eq!(hop, 1024 / 8);

        // One sample short of a hop: nothing published yet.
        push_sine(&mut analyzer, 440.0, 44100.0, hop - 1);
        assert_eq!(analyzer.consumer().sample_rate(), 0.0);

        // Crossing the hop boundary publishes a frame.
        analyzer.push(0.0);
        assert_eq!(analyzer.consumer().sample_rate(), 44100.0);
        assert_eq!(analyzer.consumer().spectrum_bin_count(), 512);
    }

    #[test]
    fn bypass_pauses_analysis_and_passes_audio_through() {
        let mut analyzer = PeakAnalyzer::new(small_config());
        analyzer.initialize(44100);
        analyzer.set_parameter(ParameterId::Bypass, 1.0);

        let input: Vec<f32> = (0..2048).map(|i| (i as f32 * 0.01).sin()).collect();
        let mut output = vec![0.0f32; 2048];
        analyzer.process_block(&input, &mut output);

        assert_eq!(input, output);
        assert_eq!(analyzer.consumer().peak_count(), 0, "analysis ran while bypassed");
    }

    #[test]
    fn gain_scales_the_output_but_not_the_analysis() {
        let mut analyzer = PeakAnalyzer::new(small_config());
        analyzer.initialize(44100);
        analyzer.set_parameter(ParameterId::Gain, 0.5);

        let input = vec![0.8f32; 256];
        let mut output = vec![0.0f32; 256];
        analyzer.process_block(&input, &mut output);

        assert!(output.iter().all(|&v| (v - 0.4).abs() < 1e-6));
    }

    #[test]
    fn consumer_getters_return_neutral_defaults_out_of_range() {
        let mut analyzer = PeakAnalyzer::new(small_config());
        analyzer.initialize(44100);
        push_sine(&mut analyzer, 440.0, 44100.0, 2048);

        let consumer = analyzer.consumer();
        let count = consumer.peak_count();
        assert_eq!(consumer.peak_frequency(count + 5), 0.0);
        assert_eq!(consumer.peak_magnitude(count + 5), 0.0);
        assert_eq!(consumer.peak_note_number(count + 5), 0);
        assert_eq!(consumer.peak_note_class(count + 5), 0);
        assert_eq!(consumer.peak_octave(count + 5), 0);
        assert_eq!(consumer.peak_cents(count + 5), 0.0);
        assert_eq!(consumer.spectrum_bin(1 << 20), 0.0);
    }
}
