//! Audio Frame Sources
//!
//! Frames arrive from either the local microphone (`mic` feature, cpal) or a
//! network stream of raw PCM datagrams, and are pushed into a shared
//! [`FrameQueue`] that the agent loop drains.

#[cfg(feature = "mic")]
pub mod mic;
pub mod queue;
pub mod udp;

pub use queue::{FrameQueue, OverflowPolicy, PushOutcome};
pub use udp::UdpFrameSource;

/// One block of 16-bit little-endian mono PCM, exactly as captured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    data: Vec<u8>,
}

impl AudioFrame {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Pack samples as little-endian bytes
    pub fn from_samples(samples: &[i16]) -> Self {
        let mut data = Vec::with_capacity(samples.len() * 2);
        for sample in samples {
            data.extend_from_slice(&sample.to_le_bytes());
        }
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Decode to samples; a trailing odd byte is ignored
    pub fn samples(&self) -> Vec<i16> {
        self.data
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect()
    }
}

/// Calculate audio energy (RMS) for VAD
pub fn calculate_energy(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum: i64 = samples.iter().map(|&s| (s as i64).pow(2)).sum();
    (sum as f32 / samples.len() as f32).sqrt()
}
