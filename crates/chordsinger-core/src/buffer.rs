//! Owned PCM audio buffers

use serde::{Deserialize, Serialize};

use crate::segment::ChordSegment;

/// Interleaved floating-point PCM in `[-1.0, 1.0]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcmBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    /// Bit depth of the source or destination encoding
    pub bits_per_sample: u16,
}

impl PcmBuffer {
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate, channels: 1, bits_per_sample: 16 }
    }

    /// A mono buffer of `len` zero samples
    pub fn silence(len: usize, sample_rate: u32) -> Self {
        Self::mono(vec![0.0; len], sample_rate)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Average interleaved channels down to one
    pub fn into_mono(self) -> Self {
        if self.channels <= 1 {
            return self;
        }
        let channels = self.channels as usize;
        let samples = self
            .samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();
        Self { samples, channels: 1, ..self }
    }

    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    /// New buffer with the same format and different samples
    pub fn with_samples(&self, samples: Vec<f32>) -> Self {
        Self {
            samples,
            sample_rate: self.sample_rate,
            channels: self.channels,
            bits_per_sample: self.bits_per_sample,
        }
    }
}

/// Synthesised speech for one chord segment
#[derive(Debug, Clone)]
pub struct Utterance {
    pub segment: ChordSegment,
    pub text: String,
    pub audio: PcmBuffer,
}
