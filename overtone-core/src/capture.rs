//! # Audio Capture Module
//!
//! Live-input plumbing for hosts that do not bring their own audio
//! callback: selects a mono f32 input device via CPAL, opens a stream at
//! the requested rate, and hands fixed-size sample chunks to the analysis
//! thread over a channel.
//!
//! The core pipeline never depends on this module; it exists for the CLI
//! and for quick experiments against a microphone.

use anyhow::{Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;

/// Opens the default input device and streams `chunk_size`-sample frames
/// into `sender`.
///
/// The returned stream must be kept alive by the caller; dropping it
/// stops capture. Frames are sent with `try_send`, so a slow consumer
/// drops chunks instead of stalling the audio callback.
///
/// # Arguments
/// * `sender` - Channel the capture callback feeds full chunks into
/// * `target_sample_rate` - Preferred rate in Hz; the closest supported
///   rate wins and is returned
/// * `chunk_size` - Samples per delivered frame
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Live stream handle and the actual rate
/// * `Err(e)` - No usable device or stream construction failed
pub fn start_capture(
    sender: Sender<Vec<f32>>,
    target_sample_rate: u32,
    chunk_size: usize,
) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("no audio input device available"))?;
    log::info!("capturing from input device: {}", device.name()?);

    let ranges = device.supported_input_configs()?.collect::<Vec<_>>();
    let range = pick_mono_f32_config(ranges, target_sample_rate)
        .ok_or_else(|| anyhow!("no mono f32 input format available"))?;

    let sample_rate = target_sample_rate
        .clamp(range.min_sample_rate().0, range.max_sample_rate().0);
    let config: cpal::StreamConfig = range
        .with_sample_rate(cpal::SampleRate(sample_rate))
        .into();
    log::info!("selected sample rate: {sample_rate} Hz");

    let err_fn = |err| log::error!("audio stream error: {err}");

    // Accumulates callback deliveries until a full chunk is ready.
    let mut pending = Vec::with_capacity(chunk_size * 2);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            pending.extend_from_slice(data);
            while pending.len() >= chunk_size {
                let chunk = pending[..chunk_size].to_vec();
                if sender.try_send(chunk).is_err() {
                    log::debug!("analysis channel full, dropping a chunk");
                }
                pending.drain(..chunk_size);
            }
        },
        err_fn,
        None,
    )?;

    stream.play()?;
    Ok((stream, sample_rate))
}

/// Picks the mono f32 configuration whose supported rate range sits
/// closest to the target rate. A range that contains the target scores
/// zero, so it always beats a near-miss fixed rate.
fn pick_mono_f32_config(
    ranges: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    ranges
        .into_iter()
        .filter(|r| r.channels() == 1 && r.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|r| rate_distance(r.min_sample_rate().0, r.max_sample_rate().0, target_rate))
}

fn rate_distance(min_rate: u32, max_rate: u32, target_rate: u32) -> i64 {
    if (min_rate..=max_rate).contains(&target_rate) {
        return 0;
    }
    let below = (min_rate as i64 - target_rate as i64).abs();
    let above = (max_rate as i64 - target_rate as i64).abs();
    below.min(above)
}
