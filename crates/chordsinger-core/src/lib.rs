//! chordsinger-core: Domain types for the chord-singing pipeline

mod buffer;
mod error;
mod job;
pub mod pitch;
pub mod pronunciation;
pub mod segment;

pub use buffer::{PcmBuffer, Utterance};
pub use error::{ChordSingerError, Result};
pub use job::{JobId, JobStatus, PipelineResult, Stage};
pub use pitch::{fold_octave, PitchNormalizer, PitchSettings};
pub use pronunciation::{filler_phrase, pronounce_chord, utterance_text, NO_CHORD_TEXT};
pub use segment::{
    canonical_label, is_no_chord, mean_frequency_in, seconds_to_samples, voiced_contour,
    ChordSegment, ChordTimeline, MelodyPoint, NO_CHORD,
};
