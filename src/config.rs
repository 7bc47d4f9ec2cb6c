// src/config.rs
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::keyframes::{LANDING_OFFSETS, PUSH_OFF_OFFSETS};
use crate::phase::{Phase, DEFAULT_HEEL_Y_LIMIT};
use crate::tracking::BodySide;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub tracked_side: BodySide,
    pub heel_y_limit: f64,
    pub landing_offsets: Vec<i64>,
    pub push_off_offsets: Vec<i64>,
    pub output_dir: PathBuf,
    pub videos_dir: PathBuf,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub landmarks_extension: String,
    pub export_angles: bool,
    pub sample_every: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let output_dir = directories::UserDirs::new()
            .and_then(|dirs| dirs.document_dir().map(|p| p.join("StrideAnalyzer")))
            .unwrap_or_else(|| PathBuf::from("./output"));

        Self {
            tracked_side: BodySide::Right,
            heel_y_limit: DEFAULT_HEEL_Y_LIMIT,
            landing_offsets: LANDING_OFFSETS.to_vec(),
            push_off_offsets: PUSH_OFF_OFFSETS.to_vec(),
            videos_dir: output_dir.join("videos"),
            output_dir,
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            landmarks_extension: "landmarks.json".to_string(),
            export_angles: true,
            sample_every: 10,
        }
    }
}

impl AnalysisConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.heel_y_limit.is_finite() || self.heel_y_limit <= 0.0 {
            return Err(AnalysisError::Config(format!(
                "heel_y_limit must be a positive number, got {}",
                self.heel_y_limit
            )));
        }
        if self.landing_offsets.is_empty() {
            return Err(AnalysisError::Config("landing_offsets must not be empty".into()));
        }
        if self.push_off_offsets.is_empty() {
            return Err(AnalysisError::Config("push_off_offsets must not be empty".into()));
        }
        if self.sample_every == 0 {
            return Err(AnalysisError::Config("sample_every must be at least 1".into()));
        }
        Ok(())
    }

    pub fn offsets(&self, phase: Phase) -> &[i64] {
        match phase {
            Phase::Landing => &self.landing_offsets,
            Phase::PushOff => &self.push_off_offsets,
        }
    }
}
