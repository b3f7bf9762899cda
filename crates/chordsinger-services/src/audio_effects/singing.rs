//! Effects that make synthesised speech sit like a sung line

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::native::HighPassEffect;
use super::{AudioEffect, EffectChain, EffectError};

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VibratoSettings {
    pub rate_hz: f32,
    /// Phase increment scale per sample
    pub depth: f32,
}

impl Default for VibratoSettings {
    fn default() -> Self {
        Self { rate_hz: 4.5, depth: 0.015 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverbSettings {
    pub length_ms: f32,
    /// Time constant of the exponential decay
    pub decay_ms: f32,
    /// 0 = dry, 1 = fully wet
    pub mix: f32,
}

impl Default for ReverbSettings {
    fn default() -> Self {
        Self { length_ms: 80.0, decay_ms: 40.0, mix: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionSettings {
    pub threshold: f32,
    pub ratio: f32,
    /// Scale applied to the computed gain reduction
    pub amount: f32,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self { threshold: 0.6, ratio: 2.5, amount: 0.5 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreathSettings {
    pub enabled: bool,
    /// Standard deviation of the noise before filtering
    pub level: f32,
    pub cutoff_hz: f32,
}

impl Default for BreathSettings {
    fn default() -> Self {
        Self { enabled: true, level: 0.008, cutoff_hz: 3000.0 }
    }
}

/// Parameters for the whole singing chain
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectSettings {
    pub vibrato: VibratoSettings,
    pub reverb: ReverbSettings,
    pub compression: CompressionSettings,
    pub breath: BreathSettings,
}

impl EffectSettings {
    /// Expressive chain for melody-following vocals
    pub fn sung() -> Self {
        Self::default()
    }

    /// Subtle chain for steady, easy-to-follow vocals
    pub fn stable() -> Self {
        Self {
            vibrato: VibratoSettings { rate_hz: 3.5, depth: 0.01 },
            reverb: ReverbSettings { length_ms: 50.0, decay_ms: 30.0, mix: 0.2 },
            compression: CompressionSettings { threshold: 0.7, ratio: 2.0, amount: 0.3 },
            breath: BreathSettings { enabled: false, ..BreathSettings::default() },
        }
    }
}

/// Vibrato, reverb, compression and optional breath noise, in that order.
pub fn build_singing_chain(settings: &EffectSettings, sample_rate: f32, seed: u64) -> EffectChain {
    let mut chain = EffectChain::new()
        .with(Box::new(VibratoEffect::new(settings.vibrato, sample_rate)))
        .with(Box::new(ConvolutionReverbEffect::new(settings.reverb, sample_rate)))
        .with(Box::new(SoftKneeCompressor::new(settings.compression)));
    if settings.breath.enabled {
        chain.add(Box::new(BreathNoiseEffect::new(settings.breath, sample_rate, seed)));
    }
    chain
}

fn check_rate(sample_rate: f32) -> Result<(), EffectError> {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        Ok(())
    } else {
        Err(EffectError::InvalidSampleRate(sample_rate))
    }
}

// ============================================================================
// Vibrato
// ============================================================================

/// Phase-modulation vibrato.
///
/// A sine LFO is integrated into a running phase `φ`, and each output sample
/// is `x[n]·cos φ + x[n-1]·sin φ`.
#[derive(Debug)]
pub struct VibratoEffect {
    settings: VibratoSettings,
    sample_rate: f32,
}

impl VibratoEffect {
    pub fn new(settings: VibratoSettings, sample_rate: f32) -> Self {
        Self { settings, sample_rate }
    }
}

impl AudioEffect for VibratoEffect {
    fn name(&self) -> &str { "Vibrato" }

    fn process(&mut self, samples: &mut [f32]) -> Result<(), EffectError> {
        check_rate(self.sample_rate)?;
        let rate = self.settings.rate_hz as f64;
        let depth = self.settings.depth as f64;
        let sr = self.sample_rate as f64;

        let mut phase = 0.0f64;
        let mut prev = 0.0f64;
        for (i, sample) in samples.iter_mut().enumerate() {
            let t = i as f64 / sr;
            phase += (2.0 * PI * rate * t).sin() * depth;
            let current = *sample as f64;
            *sample = (current * phase.cos() + prev * phase.sin()) as f32;
            prev = current;
        }
        Ok(())
    }
}

// ============================================================================
// Reverb
// ============================================================================

/// Short convolution reverb with an exponentially decaying impulse response.
///
/// The impulse response sums to one so the wet signal keeps the dry level.
/// Convolution is causal and the tail past the buffer end is dropped.
#[derive(Debug)]
pub struct ConvolutionReverbEffect {
    settings: ReverbSettings,
    sample_rate: f32,
}

impl ConvolutionReverbEffect {
    pub fn new(settings: ReverbSettings, sample_rate: f32) -> Self {
        Self { settings, sample_rate }
    }

    /// Normalised impulse response at the current sample rate
    pub fn impulse_response(&self) -> Result<Vec<f32>, EffectError> {
        check_rate(self.sample_rate)?;
        let len = (self.settings.length_ms / 1000.0 * self.sample_rate).round() as usize;
        let decay = self.settings.decay_ms / 1000.0 * self.sample_rate;
        if len == 0 {
            return Ok(Vec::new());
        }
        if !(decay > 0.0) {
            return Err(EffectError::InvalidParameter {
                effect: "Reverb",
                reason: format!("decay {} ms must be positive", self.settings.decay_ms),
            });
        }
        let raw: Vec<f32> = (0..len).map(|k| (-(k as f32) / decay).exp()).collect();
        let sum: f32 = raw.iter().sum();
        Ok(raw.into_iter().map(|h| h / sum).collect())
    }
}

impl AudioEffect for ConvolutionReverbEffect {
    fn name(&self) -> &str { "Reverb" }

    fn process(&mut self, samples: &mut [f32]) -> Result<(), EffectError> {
        let ir = self.impulse_response()?;
        if ir.is_empty() {
            return Ok(());
        }
        let mix = self.settings.mix.clamp(0.0, 1.0);
        let n = samples.len();

        let mut wet = vec![0.0f32; n];
        for (j, &x) in samples.iter().enumerate() {
            if x == 0.0 {
                continue;
            }
            for (out, &h) in wet[j..].iter_mut().zip(&ir) {
                *out += x * h;
            }
        }

        for (sample, w) in samples.iter_mut().zip(wet) {
            *sample = *sample * (1.0 - mix) + w * mix;
        }
        Ok(())
    }
}

// ============================================================================
// Compression
// ============================================================================

/// Static soft-knee compressor; samples under the threshold pass untouched
#[derive(Debug)]
pub struct SoftKneeCompressor {
    settings: CompressionSettings,
}

impl SoftKneeCompressor {
    pub fn new(settings: CompressionSettings) -> Self {
        Self { settings }
    }

    fn gain_for(&self, level: f32) -> f32 {
        let s = &self.settings;
        if level <= s.threshold {
            return 1.0;
        }
        let reduction = (level - s.threshold) * (1.0 - 1.0 / s.ratio);
        (1.0 - reduction * s.amount).max(0.0)
    }
}

impl AudioEffect for SoftKneeCompressor {
    fn name(&self) -> &str { "Compressor" }

    fn process(&mut self, samples: &mut [f32]) -> Result<(), EffectError> {
        if !(self.settings.ratio >= 1.0) {
            return Err(EffectError::InvalidParameter {
                effect: "Compressor",
                reason: format!("ratio {} must be at least 1", self.settings.ratio),
            });
        }
        for sample in samples.iter_mut() {
            *sample *= self.gain_for(sample.abs());
        }
        Ok(())
    }
}

// ============================================================================
// Breath noise
// ============================================================================

/// Adds low-level high-passed Gaussian noise
#[derive(Debug)]
pub struct BreathNoiseEffect {
    settings: BreathSettings,
    sample_rate: f32,
    rng: fastrand::Rng,
}

impl BreathNoiseEffect {
    pub fn new(settings: BreathSettings, sample_rate: f32, seed: u64) -> Self {
        Self { settings, sample_rate, rng: fastrand::Rng::with_seed(seed) }
    }

    /// Box-Muller standard normal sample
    fn gaussian(&mut self) -> f32 {
        let u1 = 1.0 - self.rng.f64();
        let u2 = self.rng.f64();
        ((-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()) as f32
    }
}

impl AudioEffect for BreathNoiseEffect {
    fn name(&self) -> &str { "Breath" }

    fn process(&mut self, samples: &mut [f32]) -> Result<(), EffectError> {
        let mut filter = HighPassEffect::new(self.settings.cutoff_hz, self.sample_rate)?;
        let level = self.settings.level;
        let mut noise: Vec<f32> = (0..samples.len()).map(|_| self.gaussian() * level).collect();
        filter.process(&mut noise)?;
        for (sample, n) in samples.iter_mut().zip(noise) {
            *sample += n;
        }
        Ok(())
    }
}
