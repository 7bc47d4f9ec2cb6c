// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

use crate::phase::Phase;

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("cannot open video {}: {reason}", .video.display())]
    VideoOpen { video: PathBuf, reason: String },

    #[error("failed to decode {} at frame {frame}: {reason}", .video.display())]
    Decode {
        video: PathBuf,
        frame: usize,
        reason: String,
    },

    #[error("{phase} phase not detected in {video}")]
    PhaseNotFound { phase: Phase, video: String },

    #[error("pose landmarks unavailable for {}: {reason}", .video.display())]
    Landmarks { video: PathBuf, reason: String },

    #[error("video storage: {0}")]
    Storage(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}
