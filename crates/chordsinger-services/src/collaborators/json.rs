//! Recognizer and extractor adapters that read precomputed JSON sidecars

use std::path::{Path, PathBuf};

use chordsinger_core::{ChordSegment, MelodyPoint};
use tracing::debug;

use super::{ChordRecognizer, CollaboratorError, MelodyExtractor};

fn read_sidecar(service: &'static str, path: &Path) -> Result<String, CollaboratorError> {
    if !path.exists() {
        return Err(CollaboratorError::Failed {
            service,
            reason: format!("{} not found", path.display()),
        });
    }
    debug!(service, path = %path.display(), "Reading sidecar");
    Ok(std::fs::read_to_string(path)?)
}

/// Chord timeline from a JSON array of `{label, start, end}` objects
#[derive(Debug, Clone)]
pub struct JsonChordRecognizer {
    path: PathBuf,
}

impl JsonChordRecognizer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<song>.chords.json` next to the song
    pub fn beside(song: &Path) -> Self {
        Self::new(song.with_extension("chords.json"))
    }
}

impl ChordRecognizer for JsonChordRecognizer {
    fn name(&self) -> &str { "json-chords" }

    fn recognize(&self, _audio: &Path) -> Result<Vec<ChordSegment>, CollaboratorError> {
        let text = read_sidecar("json-chords", &self.path)?;
        serde_json::from_str(&text)
            .map_err(|source| CollaboratorError::Malformed { service: "json-chords", source })
    }
}

/// Melody contour from a JSON array of `{time, frequency}` objects
#[derive(Debug, Clone)]
pub struct JsonMelodyExtractor {
    path: PathBuf,
}

impl JsonMelodyExtractor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<song>.melody.json` next to the song
    pub fn beside(song: &Path) -> Self {
        Self::new(song.with_extension("melody.json"))
    }
}

impl MelodyExtractor for JsonMelodyExtractor {
    fn name(&self) -> &str { "json-melody" }

    fn extract(&self, _audio: &Path) -> Result<Vec<MelodyPoint>, CollaboratorError> {
        let text = read_sidecar("json-melody", &self.path)?;
        serde_json::from_str(&text)
            .map_err(|source| CollaboratorError::Malformed { service: "json-melody", source })
    }
}
