//! Audio capture module using cpal

use super::{AudioFrame, FrameQueue};
use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::Arc;
use tracing::{info, warn};

/// Running capture stream; dropping it stops the microphone
pub struct MicCapture {
    _stream: cpal::Stream,
}

/// Start capturing 16-bit mono frames of `block_size` samples into `queue`
pub fn start_capture(
    device_index: Option<usize>,
    sample_rate: u32,
    block_size: u32,
    queue: Arc<FrameQueue>,
) -> Result<MicCapture> {
    let host = cpal::default_host();

    // List available devices
    info!("Available audio input devices:");
    for (i, device) in host.input_devices()?.enumerate() {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let marker = if device_index == Some(i) { "*" } else { " " };
        info!("  {} [{}] {}", marker, i, name);
    }

    // Select device
    let device = if let Some(idx) = device_index {
        host.input_devices()?
            .nth(idx)
            .context("Device index out of range")?
    } else {
        host.default_input_device()
            .context("No default input device")?
    };

    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    info!("Using audio device: {}", device_name);

    let config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Fixed(block_size),
    };

    // The callback runs on the driver thread: push never blocks
    let stream = device.build_input_stream(
        &config,
        move |data: &[i16], _: &cpal::InputCallbackInfo| {
            queue.push(AudioFrame::from_samples(data));
        },
        |err| {
            warn!("Audio stream error: {}", err);
        },
        None,
    )?;

    stream.play()?;

    Ok(MicCapture { _stream: stream })
}
