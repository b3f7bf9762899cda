//! Exact-length trimming and padding

use chordsinger_core::{ChordSegment, PcmBuffer};

/// Truncate or right-pad with silence to exactly `target_len` samples.
pub fn fit_to_length(mut buffer: PcmBuffer, target_len: usize) -> PcmBuffer {
    buffer.samples.resize(target_len, 0.0);
    buffer
}

/// Fit a buffer to the span of `segment` at the buffer's sample rate
pub fn fit_to_segment(buffer: PcmBuffer, segment: &ChordSegment) -> PcmBuffer {
    let target = segment.duration_samples(buffer.sample_rate);
    fit_to_length(buffer, target)
}
