// src/pose_bridge.rs - Pose landmarks exported by an external MediaPipe run
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{AnalysisError, Result};
use crate::tracking::{BodySide, JointSet, PoseBackend, PoseEstimator};
use crate::video::VideoFrame;

#[derive(Debug, Deserialize)]
struct LandmarkFile {
    frames: Vec<LandmarkEntry>,
}

#[derive(Debug, Deserialize)]
struct LandmarkEntry {
    frame: usize,
    #[serde(default)]
    landmarks: Option<Vec<[f64; 3]>>,
}

/// Looks up pose landmarks for each frame from a sidecar JSON file.
pub struct LandmarkFileEstimator {
    side: BodySide,
    poses: HashMap<usize, Vec<[f64; 3]>>,
}

impl LandmarkFileEstimator {
    pub fn from_json(json: &str, side: BodySide) -> serde_json::Result<Self> {
        let file: LandmarkFile = serde_json::from_str(json)?;
        let mut seen = HashSet::new();
        let mut poses = HashMap::new();
        for entry in file.frames {
            if !seen.insert(entry.frame) {
                warn!("Frame {} listed more than once in landmark file; using the later entry", entry.frame);
                poses.remove(&entry.frame);
            }
            if let Some(landmarks) = entry.landmarks.filter(|lms| !lms.is_empty()) {
                poses.insert(entry.frame, landmarks);
            }
        }

        Ok(Self { side, poses })
    }

    pub fn load(path: &Path, side: BodySide) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| AnalysisError::Landmarks {
            video: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let estimator = Self::from_json(&json, side).map_err(|e| AnalysisError::Landmarks {
            video: path.to_path_buf(),
            reason: format!("malformed landmark file: {}", e),
        })?;

        info!(
            "Loaded pose landmarks for {} frames from {}",
            estimator.poses.len(),
            path.display()
        );
        Ok(estimator)
    }

    pub fn pose_count(&self) -> usize {
        self.poses.len()
    }
}

impl PoseEstimator for LandmarkFileEstimator {
    fn detect(&mut self, frame: &VideoFrame) -> Option<JointSet> {
        let landmarks = self.poses.get(&frame.index)?;
        JointSet::from_pose_landmarks(landmarks, self.side)
    }
}

/// Resolves `run.mp4` to `run.<extension>` and loads it per analysis.
pub struct LandmarkFileBackend {
    extension: String,
}

impl LandmarkFileBackend {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }

    pub fn landmarks_path(&self, video: &Path) -> PathBuf {
        video.with_extension(&self.extension)
    }
}

impl Default for LandmarkFileBackend {
    fn default() -> Self {
        Self::new("landmarks.json")
    }
}

impl PoseBackend for LandmarkFileBackend {
    fn estimator_for(&self, video: &Path, side: BodySide) -> Result<Box<dyn PoseEstimator>> {
        let path = self.landmarks_path(video);
        debug!("Pose landmarks for {} read from {}", video.display(), path.display());
        Ok(Box::new(LandmarkFileEstimator::load(&path, side)?))
    }
}
