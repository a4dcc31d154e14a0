//! # Overtone - Terminal Peak & Pitch Monitor
//!
//! A thin host around `overtone-core`: captures live audio from the
//! default input device, streams every sample into the analysis
//! pipeline, and prints the detected spectral peaks with their musical
//! notes. All analysis lives in the core crate; this binary only wires
//! capture, configuration, and display together.
//!
//! ## Architecture
//! - **Audio thread**: CPAL capture callback, chunking samples into a channel
//! - **Main thread**: drains the channel, drives the analyzer, prints results
//! - **Communication**: crossbeam channel for thread-safe hand-off

use std::fs::File;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use overtone_core::params::ParameterId;
use overtone_core::tuning::NOTE_NAMES;
use overtone_core::{AnalyzerConfig, PeakAnalyzer, capture};

/// Samples handed from the capture callback to the analysis loop at a time.
const CHUNK_SIZE: usize = 1024;

/// Minimum time between printed updates.
const DISPLAY_INTERVAL: Duration = Duration::from_millis(250);

/// Real-time spectral peak and musical pitch monitor.
#[derive(Debug, Parser)]
#[command(name = "overtone", version, about)]
struct Args {
    /// JSON file with analyzer settings; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Preferred capture sample rate in Hz.
    #[arg(long, default_value_t = 44100)]
    sample_rate: u32,

    /// Transform size (power of two).
    #[arg(long)]
    fft_size: Option<usize>,

    /// Peak magnitude threshold in dB.
    #[arg(long)]
    threshold_db: Option<f32>,

    /// Maximum number of peaks to report.
    #[arg(long)]
    max_peaks: Option<usize>,

    /// Reference pitch for A4 in Hz.
    #[arg(long)]
    reference_pitch: Option<f32>,

    /// Linear monitoring gain (analysis is unaffected).
    #[arg(long, default_value_t = 1.0)]
    gain: f32,

    /// Stop after this many seconds; runs until interrupted if omitted.
    #[arg(long)]
    duration: Option<u64>,
}

fn load_config(args: &Args) -> Result<AnalyzerConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("opening config file {}", path.display()))?;
            serde_json::from_reader(file)
                .with_context(|| format!("parsing config file {}", path.display()))?
        }
        None => AnalyzerConfig::default(),
    };

    if let Some(fft_size) = args.fft_size {
        config.fft_size = fft_size;
    }
    if let Some(threshold_db) = args.threshold_db {
        config.threshold_db = threshold_db;
    }
    if let Some(max_peaks) = args.max_peaks {
        config.max_peaks = max_peaks;
    }
    if let Some(reference_pitch) = args.reference_pitch {
        config.reference_pitch_hz = reference_pitch;
    }

    config.validate()?;
    Ok(config)
}

fn format_peaks(analyzer: &PeakAnalyzer) -> String {
    let peaks = analyzer.peaks();
    match peaks.first() {
        None => "listening...".to_string(),
        Some(top) => {
            let note = &top.note;
            let mut line = format!(
                "{}{}  {:+.1} cents  {:7.1} Hz  {:6.1} dB",
                NOTE_NAMES[note.note_class],
                note.octave,
                note.cents_deviation,
                top.frequency_hz,
                top.magnitude_db,
            );
            if peaks.len() > 1 {
                line.push_str(&format!("  (+{} more)", peaks.len() - 1));
            }
            line
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = load_config(&args)?;

    let (sender, receiver) = crossbeam_channel::bounded::<Vec<f32>>(8);
    let (_stream, sample_rate) = capture::start_capture(sender, args.sample_rate, CHUNK_SIZE)?;

    let mut analyzer = PeakAnalyzer::new(config);
    analyzer.initialize(sample_rate);
    anyhow::ensure!(analyzer.is_running(), "analyzer failed to initialize");
    analyzer.set_parameter(ParameterId::Gain, args.gain);

    log::info!(
        "analyzing at {sample_rate} Hz, fft_size={}, press Ctrl-C to stop",
        analyzer.fft_size()
    );

    let started = Instant::now();
    let mut last_display = started;
    let mut monitor = vec![0.0f32; CHUNK_SIZE];

    loop {
        if let Some(seconds) = args.duration {
            if started.elapsed() >= Duration::from_secs(seconds) {
                break;
            }
        }

        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(chunk) => {
                monitor.resize(chunk.len(), 0.0);
                analyzer.process_block(&chunk, &mut monitor);
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }

        if last_display.elapsed() >= DISPLAY_INTERVAL {
            last_display = Instant::now();
            println!("{}", format_peaks(&analyzer));
        }
    }

    analyzer.deinitialize();
    Ok(())
}
