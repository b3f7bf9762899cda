//! Band-limited resampling with rubato

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use thiserror::Error;

const SINC_LEN: usize = 256;

#[derive(Debug, Error)]
pub enum ResampleError {
    #[error("Resample init error: {0}")]
    Init(String),
    #[error("Resample error: {0}")]
    Process(String),
    #[error("Invalid sample rate: {0}")]
    InvalidRate(u32),
}

fn sinc_params() -> SincInterpolationParameters {
    SincInterpolationParameters {
        sinc_len: SINC_LEN,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    }
}

/// Resample `samples` so the result has exactly `out_len` frames.
///
/// The ratio is `out_len / samples.len()`. The sinc filter delay is removed so
/// the output stays aligned with the input; rounding slack at the tail is
/// trimmed or zero-filled.
pub fn resample_to_len(samples: &[f32], out_len: usize) -> Result<Vec<f32>, ResampleError> {
    if samples.is_empty() || out_len == 0 {
        return Ok(vec![0.0; out_len]);
    }
    if out_len == samples.len() {
        return Ok(samples.to_vec());
    }

    let ratio = out_len as f64 / samples.len() as f64;
    let mut padded = samples.to_vec();
    padded.resize(samples.len() + SINC_LEN, 0.0);

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, sinc_params(), padded.len(), 1)
        .map_err(|e| ResampleError::Init(e.to_string()))?;
    let delay = resampler.output_delay();

    let input = vec![padded];
    let output = resampler
        .process(&input, None)
        .map_err(|e| ResampleError::Process(e.to_string()))?;

    let mut out: Vec<f32> = output
        .into_iter()
        .next()
        .unwrap_or_default()
        .into_iter()
        .skip(delay)
        .take(out_len)
        .collect();
    out.resize(out_len, 0.0);
    Ok(out)
}

/// Convert mono samples between sample rates, preserving duration.
pub fn resample_rate(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, ResampleError> {
    if from_rate == 0 {
        return Err(ResampleError::InvalidRate(from_rate));
    }
    if to_rate == 0 {
        return Err(ResampleError::InvalidRate(to_rate));
    }
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }
    let out_len = (samples.len() as f64 * to_rate as f64 / from_rate as f64).round() as usize;
    resample_to_len(samples, out_len)
}
