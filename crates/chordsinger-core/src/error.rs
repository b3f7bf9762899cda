//! Error types for chordsinger

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChordSingerError {
    #[error("Invalid chord segment '{label}': {reason}")]
    InvalidSegment { label: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ChordSingerError>;
