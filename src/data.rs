// src/data.rs
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use csv::{Reader, Writer};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::geometry::joint_angle;
use crate::phase::PhaseResult;
use crate::tracking::{BodySide, FrameRecord};

/// One row of the exported angle table.
///
/// Column names are consumed by downstream report tooling and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleSample {
    #[serde(rename = "frame index")]
    pub frame_index: usize,
    #[serde(rename = "angle in degrees")]
    pub angle_degrees: f64,
}

impl AngleSample {
    pub fn from_record(record: &FrameRecord) -> Self {
        let joints = &record.joints;
        Self {
            frame_index: record.frame_index,
            angle_degrees: joint_angle(joints.hip, joints.knee, joints.ankle),
        }
    }
}

/// Collects the knee angle of every pose frame, in sequence order.
#[derive(Debug, Default)]
pub struct AngleSeriesExtractor {
    samples: Vec<AngleSample>,
}

impl AngleSeriesExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, record: &FrameRecord) {
        self.samples.push(AngleSample::from_record(record));
    }

    pub fn finish(self) -> Vec<AngleSample> {
        self.samples
    }

    pub fn extract<I>(mut self, records: I) -> Vec<AngleSample>
    where
        I: IntoIterator<Item = FrameRecord>,
    {
        for record in records {
            self.observe(&record);
        }
        self.finish()
    }

    pub fn run<I, E>(mut self, records: I) -> std::result::Result<Vec<AngleSample>, E>
    where
        I: IntoIterator<Item = std::result::Result<FrameRecord, E>>,
    {
        for record in records {
            self.observe(&record?);
        }
        Ok(self.finish())
    }
}

pub fn write_angle_table(path: &Path, samples: &[AngleSample]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let mut writer = Writer::from_writer(file);
    if samples.is_empty() {
        writer.write_record(["frame index", "angle in degrees"])?;
    }
    for sample in samples {
        writer.serialize(sample)?;
    }
    writer.flush()?;

    info!("Wrote {} angle samples to {}", samples.len(), path.display());
    Ok(())
}

pub fn read_angle_table(path: &Path) -> Result<Vec<AngleSample>> {
    let mut reader = Reader::from_path(path)?;
    let mut samples = Vec::new();
    for row in reader.deserialize() {
        samples.push(row?);
    }
    Ok(samples)
}

/// Machine-readable outcome of one single-video analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub video: PathBuf,
    pub tracked_side: BodySide,
    pub landing_frame: Option<usize>,
    pub push_off_frame: Option<usize>,
    pub push_off_angle: Option<f64>,
    pub landing_heel_y: Option<f64>,
    pub frames_with_pose: usize,
    pub generated_at: DateTime<Local>,
}

impl AnalysisSummary {
    pub fn new(video: &Path, tracked_side: BodySide, phases: &PhaseResult) -> Self {
        Self {
            video: video.to_path_buf(),
            tracked_side,
            landing_frame: phases.landing_frame,
            push_off_frame: phases.push_off_frame,
            push_off_angle: phases.push_off_angle,
            landing_heel_y: phases.landing_heel_y,
            frames_with_pose: phases.frames_scanned,
            generated_at: Local::now(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
