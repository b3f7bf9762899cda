//! Audio effects chain and singing effects

mod native;
mod singing;

pub use native::HighPassEffect;
pub use singing::{
    build_singing_chain, BreathNoiseEffect, BreathSettings, CompressionSettings,
    ConvolutionReverbEffect, EffectSettings, ReverbSettings, SoftKneeCompressor, VibratoEffect,
    VibratoSettings,
};

use std::fmt::Debug;

use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq)]
pub enum EffectError {
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(f32),
    #[error("{effect}: {reason}")]
    InvalidParameter { effect: &'static str, reason: String },
    #[error("{0} produced non-finite samples")]
    NonFinite(String),
}

/// Audio effect that processes samples in place
pub trait AudioEffect: Send + Debug {
    fn name(&self) -> &str;
    fn process(&mut self, samples: &mut [f32]) -> Result<(), EffectError>;
}

/// Chain of audio effects processed in order.
///
/// A step that fails, or that produces NaN/infinite output, is discarded and
/// the chain carries on with that step's input.
#[derive(Debug, Default)]
pub struct EffectChain {
    effects: Vec<Box<dyn AudioEffect>>,
}

impl EffectChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, effect: Box<dyn AudioEffect>) {
        self.effects.push(effect);
    }

    pub fn with(mut self, effect: Box<dyn AudioEffect>) -> Self {
        self.add(effect);
        self
    }

    /// Run every effect in order; returns the names of steps that fell back.
    pub fn process(&mut self, samples: &mut [f32]) -> Vec<String> {
        let mut failed = Vec::new();
        for effect in &mut self.effects {
            let mut scratch = samples.to_vec();
            let outcome = effect.process(&mut scratch).and_then(|()| {
                if scratch.iter().all(|s| s.is_finite()) {
                    Ok(())
                } else {
                    Err(EffectError::NonFinite(effect.name().to_string()))
                }
            });
            match outcome {
                Ok(()) => samples.copy_from_slice(&scratch),
                Err(e) => {
                    warn!(effect = effect.name(), "Effect failed, keeping unprocessed audio: {e}");
                    failed.push(effect.name().to_string());
                }
            }
        }
        failed
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}
