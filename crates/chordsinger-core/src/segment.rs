//! Chord timeline and melody contour types

use serde::{Deserialize, Serialize};

use crate::error::{ChordSingerError, Result};

/// Label used for spans where the recognizer heard no chord
pub const NO_CHORD: &str = "N";

/// One chord span on the song timeline, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordSegment {
    pub label: String,
    pub start: f64,
    pub end: f64,
}

impl ChordSegment {
    /// Build a segment, rejecting non-finite, negative or empty spans.
    pub fn new(label: impl Into<String>, start: f64, end: f64) -> Result<Self> {
        let segment = Self { label: label.into(), start, end };
        segment.validate()?;
        Ok(segment)
    }

    pub fn validate(&self) -> Result<()> {
        let reason = if !self.start.is_finite() || !self.end.is_finite() {
            "non-finite time"
        } else if self.start < 0.0 {
            "negative start"
        } else if self.end <= self.start {
            "end must be after start"
        } else {
            return Ok(());
        };
        Err(ChordSingerError::InvalidSegment {
            label: self.label.clone(),
            reason: reason.to_string(),
        })
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Length of this segment in samples at the given rate
    pub fn duration_samples(&self, sample_rate: u32) -> usize {
        seconds_to_samples(self.duration(), sample_rate)
    }

    /// Sample index where this segment begins
    pub fn start_sample(&self, sample_rate: u32) -> usize {
        seconds_to_samples(self.start, sample_rate)
    }

    pub fn is_no_chord(&self) -> bool {
        is_no_chord(&self.label)
    }
}

/// `round(seconds * rate)`, floored at zero
pub fn seconds_to_samples(seconds: f64, sample_rate: u32) -> usize {
    (seconds * sample_rate as f64).round().max(0.0) as usize
}

/// Whether a label marks a span without a chord
pub fn is_no_chord(label: &str) -> bool {
    let trimmed = label.trim();
    trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case(NO_CHORD)
        || trimmed.eq_ignore_ascii_case("X")
        || trimmed.eq_ignore_ascii_case("no chord")
}

/// Canonicalise recognizer labels.
///
/// Harte-style labels (`"C:maj"`, `"A:min7"`) collapse to `"Cmaj"`, `"Amin7"`;
/// `"N"`/`"X"`/blank become [`NO_CHORD`]. Anything else passes through trimmed.
pub fn canonical_label(raw: &str) -> String {
    if is_no_chord(raw) {
        return NO_CHORD.to_string();
    }
    let trimmed = raw.trim();
    match trimmed.split_once(':') {
        Some((root, quality)) => format!("{}{}", root.trim(), quality.trim()),
        None => trimmed.to_string(),
    }
}

/// Ordered, validated chord timeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChordTimeline {
    segments: Vec<ChordSegment>,
}

impl ChordTimeline {
    /// Validate raw recognizer output.
    ///
    /// Invalid segments are dropped and returned alongside the timeline so the
    /// caller can report them. Survivors are sorted by start time.
    pub fn validated(raw: Vec<ChordSegment>) -> (Self, Vec<ChordSingerError>) {
        let mut rejected = Vec::new();
        let mut segments: Vec<ChordSegment> = raw
            .into_iter()
            .filter_map(|mut seg| match seg.validate() {
                Ok(()) => {
                    seg.label = canonical_label(&seg.label);
                    Some(seg)
                }
                Err(e) => {
                    rejected.push(e);
                    None
                }
            })
            .collect();
        segments.sort_by(|a, b| a.start.total_cmp(&b.start));
        (Self { segments }, rejected)
    }

    /// The progression presented when recognition yields nothing usable
    pub fn fallback() -> Self {
        let segments = [("C major", 0.0), ("G major", 2.0), ("A minor", 4.0), ("F major", 6.0)]
            .into_iter()
            .map(|(label, start)| ChordSegment {
                label: label.to_string(),
                start,
                end: start + 2.0,
            })
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[ChordSegment] {
        &self.segments
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChordSegment> {
        self.segments.iter()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// End of the last segment in seconds
    pub fn end_time(&self) -> f64 {
        self.segments.iter().map(|s| s.end).fold(0.0, f64::max)
    }
}

impl<'a> IntoIterator for &'a ChordTimeline {
    type Item = &'a ChordSegment;
    type IntoIter = std::slice::Iter<'a, ChordSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

/// A voiced pitch estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MelodyPoint {
    pub time: f64,
    pub frequency: f32,
}

impl MelodyPoint {
    pub fn is_voiced(&self) -> bool {
        self.time.is_finite() && self.frequency.is_finite() && self.frequency > 0.0
    }
}

/// Drop unvoiced points and order the rest by time.
pub fn voiced_contour(points: Vec<MelodyPoint>) -> Vec<MelodyPoint> {
    let mut voiced: Vec<MelodyPoint> = points.into_iter().filter(MelodyPoint::is_voiced).collect();
    voiced.sort_by(|a, b| a.time.total_cmp(&b.time));
    voiced
}

/// Mean voiced frequency inside `[segment.start, segment.end)`
pub fn mean_frequency_in(contour: &[MelodyPoint], segment: &ChordSegment) -> Option<f32> {
    let (sum, count) = contour
        .iter()
        .filter(|p| p.is_voiced() && p.time >= segment.start && p.time < segment.end)
        .fold((0.0f64, 0usize), |(sum, count), p| (sum + p.frequency as f64, count + 1));
    (count > 0).then(|| (sum / count as f64) as f32)
}
