//! Job identity, pipeline stages and results

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::buffer::PcmBuffer;
use crate::segment::{ChordTimeline, MelodyPoint};

/// Identifier of one conversion job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Preprocessing,
    Separating,
    ChordDetecting,
    MelodyExtracting,
    Synthesizing,
    Completed,
    Error,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Preprocessing => "preprocessing",
            Self::Separating => "separating",
            Self::ChordDetecting => "chord-detecting",
            Self::MelodyExtracting => "melody-extracting",
            Self::Synthesizing => "synthesizing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// Progress reported on entering the stage
    pub fn progress(&self) -> u8 {
        match self {
            Self::Preprocessing => 10,
            Self::Separating => 20,
            Self::ChordDetecting => 30,
            Self::MelodyExtracting => 50,
            Self::Synthesizing => 70,
            Self::Completed => 100,
            Self::Error => 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Externally visible state of a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub stage: Stage,
    pub progress: u8,
    pub message: String,
}

impl JobStatus {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self { stage, progress: stage.progress(), message: message.into() }
    }

    pub fn failed(cause: impl fmt::Display) -> Self {
        Self::new(Stage::Error, format!("Error: {cause}"))
    }
}

/// Output of one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub chord_timeline: ChordTimeline,
    pub melody_contour: Vec<MelodyPoint>,
    /// Song duration in seconds
    pub duration: f64,
    pub output_buffer: PcmBuffer,
    pub output_path: PathBuf,
    pub segment_count: usize,
    /// Indices of segments left silent because a step failed
    pub skipped_segments: Vec<usize>,
}
