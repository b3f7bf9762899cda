//! Melody pitch to bounded pitch-shift ratio

use serde::{Deserialize, Serialize};

/// Bounds used when mapping a melody frequency onto the synthesis voice
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchSettings {
    /// Comfortable singing band that frequencies are octave-folded into
    pub fold_min_hz: f32,
    pub fold_max_hz: f32,
    /// Hard vocal range applied after folding
    pub min_vocal_hz: f32,
    pub max_vocal_hz: f32,
    /// Nominal pitch of the speech engine
    pub baseline_hz: f32,
    pub min_ratio: f32,
    pub max_ratio: f32,
}

impl Default for PitchSettings {
    fn default() -> Self {
        Self {
            fold_min_hz: 180.0,
            fold_max_hz: 450.0,
            min_vocal_hz: 150.0,
            max_vocal_hz: 500.0,
            baseline_hz: 250.0,
            min_ratio: 0.8,
            max_ratio: 1.5,
        }
    }
}

/// Move `frequency` by whole octaves until it lies in `[min_hz, max_hz]`.
///
/// Returns `None` for zero, negative or non-finite input. A band narrower
/// than an octave may have no in-band octave; the result then ends just
/// below `max_hz` after the last halving.
pub fn fold_octave(frequency: f32, min_hz: f32, max_hz: f32) -> Option<f32> {
    if !frequency.is_finite() || frequency <= 0.0 || min_hz <= 0.0 || max_hz < min_hz {
        return None;
    }
    let mut folded = frequency;
    while folded < min_hz {
        folded *= 2.0;
    }
    while folded > max_hz {
        folded /= 2.0;
    }
    Some(folded)
}

/// Pure mapping from a target frequency to a resampling ratio
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PitchNormalizer {
    settings: PitchSettings,
}

impl PitchNormalizer {
    pub fn new(settings: PitchSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &PitchSettings {
        &self.settings
    }

    /// Fold into the comfortable band, then clamp to the vocal range.
    pub fn target_frequency(&self, frequency: f32) -> Option<f32> {
        let s = &self.settings;
        let folded = fold_octave(frequency, s.fold_min_hz, s.fold_max_hz)?;
        Some(folded.max(s.min_vocal_hz).min(s.max_vocal_hz))
    }

    /// Shift ratio relative to the engine baseline, clamped to
    /// `[min_ratio, max_ratio]`. Missing or invalid pitch gives unity.
    pub fn ratio(&self, frequency: Option<f32>) -> f32 {
        let s = &self.settings;
        let bound = |r: f32| r.max(s.min_ratio).min(s.max_ratio);
        let unity = bound(1.0);
        if s.baseline_hz <= 0.0 {
            return unity;
        }
        match frequency.and_then(|f| self.target_frequency(f)) {
            Some(target) => bound(target / s.baseline_hz),
            None => unity,
        }
    }
}
