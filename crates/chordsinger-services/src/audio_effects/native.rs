//! Native audio effects using fundsp

use std::fmt;

use fundsp::hacker::*;

use super::{AudioEffect, EffectError};

/// High-pass filter
pub struct HighPassEffect {
    cutoff_hz: f32,
    sample_rate: f32,
    filter: An<FixedSvf<f64, HighpassMode<f64>>>,
}

impl HighPassEffect {
    /// Fails when the cutoff is not strictly between 0 Hz and Nyquist.
    pub fn new(cutoff_hz: f32, sample_rate: f32) -> Result<Self, EffectError> {
        check_design(cutoff_hz, sample_rate)?;
        let mut filter = highpass_hz(cutoff_hz, 0.707);
        filter.set_sample_rate(sample_rate as f64);
        Ok(Self { cutoff_hz, sample_rate, filter })
    }
}

fn check_design(cutoff_hz: f32, sample_rate: f32) -> Result<(), EffectError> {
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(EffectError::InvalidSampleRate(sample_rate));
    }
    if !(cutoff_hz > 0.0 && cutoff_hz < sample_rate / 2.0) {
        return Err(EffectError::InvalidParameter {
            effect: "High Pass",
            reason: format!("cutoff {cutoff_hz} Hz outside (0, {}) Hz", sample_rate / 2.0),
        });
    }
    Ok(())
}

impl fmt::Debug for HighPassEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HighPassEffect")
            .field("cutoff_hz", &self.cutoff_hz)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

impl AudioEffect for HighPassEffect {
    fn name(&self) -> &str { "High Pass" }

    fn process(&mut self, samples: &mut [f32]) -> Result<(), EffectError> {
        for sample in samples.iter_mut() {
            let input = Frame::from([*sample]);
            let output = self.filter.tick(&input);
            *sample = output[0];
        }
        Ok(())
    }
}
