//! Shared error types for the services crate.

use std::time::Duration;

use thiserror::Error;

use tutor_core::model::{ConfigError, CurriculumError};

/// A curriculum or configuration source could not be read.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DataLoadError {
    #[error("failed to read data file: {0}")]
    Io(#[from] std::io::Error),
    #[error("data request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("malformed data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Curriculum(#[from] CurriculumError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("data source unavailable: {0}")]
    Unavailable(String),
}

/// The recognizer produced no usable transcript.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RecognitionError {
    #[error("speech recognizer failed: {0}")]
    Recognizer(String),
    #[error("no speech detected")]
    NoSpeech,
    #[error("no result within {0:?}")]
    TimedOut(Duration),
}

/// Errors emitted while bootstrapping a learning session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("curriculum could not be loaded: {0}")]
    CurriculumUnavailable(#[source] DataLoadError),
}
