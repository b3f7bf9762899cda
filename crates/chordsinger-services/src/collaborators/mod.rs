//! Contracts for the external services the engine consumes, plus adapters

mod json;
mod separation;
mod speech;

pub use json::{JsonChordRecognizer, JsonMelodyExtractor};
pub use separation::{CommandSeparator, PassthroughSeparator};
pub use speech::{
    CommandBackend, HttpBackend, SpeechBackend, SynthesisChain, SynthesisError, ToneBackend,
};

use std::path::{Path, PathBuf};

use chordsinger_core::{voiced_contour, ChordSegment, ChordTimeline, MelodyPoint};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("{service}: {reason}")]
    Failed { service: &'static str, reason: String },
    #[error("{service} output is malformed: {source}")]
    Malformed {
        service: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// `(audio_path) -> chord segments`
pub trait ChordRecognizer: Send + Sync {
    fn name(&self) -> &str;
    fn recognize(&self, audio: &Path) -> Result<Vec<ChordSegment>, CollaboratorError>;
}

/// `(audio_path) -> voiced melody points`
pub trait MelodyExtractor: Send + Sync {
    fn name(&self) -> &str;
    fn extract(&self, audio: &Path) -> Result<Vec<MelodyPoint>, CollaboratorError>;
}

/// Stems produced by a separator.
///
/// Holds the guard for any scratch directory the stems live in, so they stay
/// on disk exactly as long as this value does.
#[derive(Debug)]
pub struct SeparatedStems {
    pub instrumental: PathBuf,
    pub vocals: Option<PathBuf>,
    pub scratch: Option<TempDir>,
}

impl SeparatedStems {
    /// The unseparated song standing in as the instrumental
    pub fn unseparated(audio: &Path) -> Self {
        Self { instrumental: audio.to_path_buf(), vocals: None, scratch: None }
    }
}

/// `(audio_path) -> (instrumental, vocals?)`
pub trait SourceSeparator: Send + Sync {
    fn name(&self) -> &str;
    fn separate(&self, audio: &Path, scratch_dir: &Path) -> Result<SeparatedStems, CollaboratorError>;
}

/// Recognize chords and validate them, substituting the fallback
/// progression when nothing usable comes back.
pub fn recognize_or_fallback(recognizer: &dyn ChordRecognizer, audio: &Path) -> ChordTimeline {
    let raw = match recognizer.recognize(audio) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(recognizer = recognizer.name(), "Chord recognition failed: {e}");
            Vec::new()
        }
    };
    let (timeline, rejected) = ChordTimeline::validated(raw);
    for e in &rejected {
        warn!(recognizer = recognizer.name(), "Dropped chord segment: {e}");
    }
    if timeline.is_empty() {
        warn!(recognizer = recognizer.name(), "No usable chords, using fallback progression");
        return ChordTimeline::fallback();
    }
    info!(recognizer = recognizer.name(), segments = timeline.len(), "Chords recognized");
    timeline
}

/// Extract the melody, or an empty contour when extraction fails.
pub fn extract_or_empty(extractor: &dyn MelodyExtractor, audio: &Path) -> Vec<MelodyPoint> {
    match extractor.extract(audio) {
        Ok(points) => {
            let contour = voiced_contour(points);
            info!(extractor = extractor.name(), points = contour.len(), "Melody extracted");
            contour
        }
        Err(e) => {
            warn!(extractor = extractor.name(), "Melody extraction failed, pitch stays at baseline: {e}");
            Vec::new()
        }
    }
}

/// Separate stems, or fall back to the unseparated song as instrumental.
pub fn separate_or_passthrough(
    separator: &dyn SourceSeparator,
    audio: &Path,
    scratch_dir: &Path,
) -> SeparatedStems {
    match separator.separate(audio, scratch_dir) {
        Ok(stems) => stems,
        Err(e) => {
            warn!(separator = separator.name(), "Separation failed, using original mix: {e}");
            SeparatedStems::unseparated(audio)
        }
    }
}
