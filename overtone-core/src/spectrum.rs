//! # Windowed Spectrum Module
//!
//! This module turns a chronologically ordered block of samples into a
//! magnitude-in-decibels spectrum for the peak picker. It handles window
//! generation, the forward FFT, power scaling, and decibel conversion.
//!
//! ## Features
//! - High-performance FFT using RustFFT, planned once at construction
//! - Normalised Hann windowing for reduced spectral leakage
//! - Preallocated complex/scratch buffers; the hot path never allocates
//! - Epsilon-clamped decibel conversion so silence maps to a finite floor

use rustfft::{Fft, FftPlanner, num_complex::Complex};
use std::sync::Arc;

/// Smallest power value fed to the logarithm; anything below this is
/// treated as silence.
pub const POWER_EPSILON: f32 = 1e-8;

/// Decibel value every bin of a silent spectrum settles at:
/// `20 * log10(POWER_EPSILON)`.
pub const SILENCE_FLOOR_DB: f32 = -160.0;

/// Generates a symmetric, amplitude-normalised Hann window.
///
/// `w[i] = sqrt(8/3) * 0.5 * (1 - cos(2*pi*i / (n - 1)))`
///
/// The `sqrt(8/3)` factor compensates for the power the taper removes,
/// so a full-scale sine keeps roughly its unwindowed spectral level.
/// The window is symmetric (`w[i] == w[n-1-i]`) and zero at both edges.
pub fn hann_window_normalized(n: usize) -> Vec<f32> {
    match n {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let two_pi = std::f32::consts::PI * 2.0;
            let denom = (n - 1) as f32;
            let norm = (8.0f32 / 3.0).sqrt();
            (0..n)
                .map(|i| norm * 0.5 * (1.0 - (two_pi * i as f32 / denom).cos()))
                .collect()
        }
    }
}

/// Owns the analysis window, the FFT plan, and all scratch storage.
///
/// Everything is allocated once in [`new`](Self::new); dropping the value
/// releases the plan and buffers on every exit path. A single instance is
/// meant to live for the whole running lifetime of the pipeline.
pub struct WindowedSpectrum {
    fft_size: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    bins: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl WindowedSpectrum {
    /// Plans a forward FFT of length `fft_size` and precomputes the window.
    ///
    /// # Arguments
    /// * `fft_size` - Transform length; the pipeline validates this is a
    ///   power of two before construction
    pub fn new(fft_size: usize) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch_len = fft.get_inplace_scratch_len();
        Self {
            fft_size,
            window: hann_window_normalized(fft_size),
            bins: vec![Complex::new(0.0, 0.0); fft_size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            fft,
        }
    }

    /// Configured transform length.
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of magnitude bins produced per analysis: `fft_size / 2`.
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// The precomputed window coefficients.
    pub fn window(&self) -> &[f32] {
        &self.window
    }

    /// Transforms one block of samples into a decibel magnitude spectrum.
    ///
    /// Steps:
    /// 1. Elementwise multiply by the Hann window
    /// 2. Forward FFT
    /// 3. Squared magnitude per bin, scaled by `1 / fft_size`
    /// 4. `20 * log10(max(power, POWER_EPSILON))`
    ///
    /// # Arguments
    /// * `samples` - Oldest-first sample block, exactly `fft_size` long
    /// * `out_db` - Destination for the dB bins, exactly `fft_size / 2` long
    pub fn analyze_into(&mut self, samples: &[f32], out_db: &mut [f32]) {
        debug_assert_eq!(samples.len(), self.fft_size);
        debug_assert_eq!(out_db.len(), self.fft_size / 2);

        for ((bin, &sample), &w) in self.bins.iter_mut().zip(samples).zip(&self.window) {
            *bin = Complex::new(sample * w, 0.0);
        }

        self.fft.process_with_scratch(&mut self.bins, &mut self.scratch);

        let scale = 1.0 / self.fft_size as f32;
        for (out, bin) in out_db.iter_mut().zip(&self.bins) {
            let power = bin.norm_sqr() * scale;
            *out = 20.0 * power.max(POWER_EPSILON).log10();
        }
    }
}
