//! Landing and push-off detection for running stride videos.
//!
//! A video is decoded frame by frame, a pose estimator supplies the tracked
//! leg's hip, knee, ankle and heel positions, and [`phase::PhaseDetector`]
//! scans the resulting [`tracking::FrameRecord`]s once to find the push-off
//! frame (largest knee angle) and the landing frame (lowest valid heel).
//! [`compare::ComparisonOrchestrator`] runs that against a user video and an
//! ideal video and renders the key frames around each phase.

pub mod annotate;
pub mod compare;
pub mod config;
pub mod data;
pub mod error;
pub mod geometry;
pub mod keyframes;
pub mod phase;
pub mod pose_bridge;
pub mod storage;
pub mod tracking;
pub mod video;

pub use error::{AnalysisError, Result};
