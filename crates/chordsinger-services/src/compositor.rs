//! Timeline canvas and final vocal/instrumental mix

use chordsinger_core::{seconds_to_samples, PcmBuffer};
use fundsp::hacker::db_amp;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Silent full-song buffer that utterances are summed into
#[derive(Debug, Clone)]
pub struct TimelineCanvas {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl TimelineCanvas {
    /// `round(duration * sample_rate)` samples of silence
    pub fn new(duration: f64, sample_rate: u32) -> Self {
        Self::with_len(seconds_to_samples(duration, sample_rate), sample_rate)
    }

    pub fn with_len(len: usize, sample_rate: u32) -> Self {
        Self { samples: vec![0.0; len], sample_rate }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Add `audio` starting at sample `offset`, saturating at full scale.
    ///
    /// Whatever runs past the end of the canvas is dropped. Returns the number
    /// of samples written.
    pub fn overlay(&mut self, offset: usize, audio: &[f32]) -> usize {
        let Some(dest) = self.samples.get_mut(offset..) else {
            return 0;
        };
        let written = dest.len().min(audio.len());
        for (out, &s) in dest.iter_mut().zip(audio) {
            *out = (*out + s).clamp(-1.0, 1.0);
        }
        if written < audio.len() {
            debug!(offset, dropped = audio.len() - written, "Utterance runs past end of canvas");
        }
        written
    }

    /// Overlay at the sample corresponding to `start` seconds
    pub fn overlay_at(&mut self, start: f64, audio: &[f32]) -> usize {
        self.overlay(seconds_to_samples(start, self.sample_rate), audio)
    }

    pub fn into_buffer(self) -> PcmBuffer {
        PcmBuffer::mono(self.samples, self.sample_rate)
    }
}

/// Gain offsets applied before summing, in dB
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixLevels {
    pub instrumental_db: f32,
    pub vocals_db: f32,
}

/// Duck the instrumental, boost the vocals and sum them.
///
/// The output has the vocal canvas's length; a shorter instrumental is
/// treated as silence past its end.
pub fn mix(instrumental: &[f32], vocals: TimelineCanvas, levels: MixLevels) -> PcmBuffer {
    let duck = db_amp(levels.instrumental_db) as f32;
    let boost = db_amp(levels.vocals_db) as f32;
    let bed = instrumental.iter().copied().chain(std::iter::repeat(0.0));

    let samples = vocals
        .samples
        .iter()
        .zip(bed)
        .map(|(&v, b)| (b * duck + v * boost).clamp(-1.0, 1.0))
        .collect();
    PcmBuffer::mono(samples, vocals.sample_rate)
}
