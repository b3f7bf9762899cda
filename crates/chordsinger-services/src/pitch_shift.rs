//! Pitch shifting by resampling

use chordsinger_core::PcmBuffer;
use tracing::debug;

use crate::resample::{resample_to_len, ResampleError};

/// Length after shifting `len` samples by `ratio`, or `None` when the shift
/// would be a no-op or degenerate.
pub fn shifted_len(len: usize, ratio: f32) -> Option<usize> {
    if !ratio.is_finite() || ratio <= 0.0 {
        return None;
    }
    let new_len = (len as f64 / ratio as f64).round() as usize;
    (new_len >= 2).then_some(new_len)
}

/// Raise the perceived pitch by `ratio` (lower it for `ratio < 1`).
///
/// Playback length scales by `1 / ratio`. Non-positive ratios and results
/// shorter than two samples return an unmodified copy. The input is never
/// touched.
pub fn shift_pitch(buffer: &PcmBuffer, ratio: f32) -> Result<PcmBuffer, ResampleError> {
    let Some(new_len) = shifted_len(buffer.len(), ratio) else {
        debug!(ratio, len = buffer.len(), "Pitch shift skipped");
        return Ok(buffer.clone());
    };
    if new_len == buffer.len() {
        return Ok(buffer.clone());
    }
    let samples = resample_to_len(&buffer.samples, new_len)?;
    Ok(buffer.with_samples(samples))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_crossings(samples: &[f32]) -> usize {
        samples.windows(2).filter(|w| (w[0] < 0.0) != (w[1] < 0.0)).count()
    }

    fn sine(freq: f32, rate: u32, len: usize) -> PcmBuffer {
        let samples = (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin() * 0.5)
            .collect();
        PcmBuffer::mono(samples, rate)
    }

    #[test]
    fn test_length_scales_inversely() {
        let input = sine(250.0, 8000, 8000);
        let up = shift_pitch(&input, 1.25).unwrap();
        assert_eq!(up.len(), 6400);
        let down = shift_pitch(&input, 0.8).unwrap();
        assert_eq!(down.len(), 10000);
        assert_eq!(input.len(), 8000);
    }

    #[test]
    fn test_pitch_rises_with_ratio() {
        let input = sine(250.0, 8000, 8000);
        let up = shift_pitch(&input, 1.5).unwrap();
        // same number of cycles squeezed into fewer samples
        let cycles_in = zero_crossings(&input.samples) as f32;
        let cycles_out = zero_crossings(&up.samples) as f32;
        assert!((cycles_out - cycles_in).abs() / cycles_in < 0.05);
        assert!(up.len() < input.len());
    }

    #[test]
    fn test_degenerate_ratio_returns_copy() {
        let input = sine(250.0, 8000, 100);
        assert_eq!(shift_pitch(&input, 0.0).unwrap(), input);
        assert_eq!(shift_pitch(&input, -1.0).unwrap(), input);
        assert_eq!(shift_pitch(&input, f32::NAN).unwrap(), input);
        assert_eq!(shift_pitch(&input, 1000.0).unwrap(), input);
    }

    #[test]
    fn test_shifted_len_rounds() {
        assert_eq!(shifted_len(88200, 1.2), Some(73500));
        assert_eq!(shifted_len(3, 2.0), Some(2));
        assert_eq!(shifted_len(3, 4.0), None);
    }
}
