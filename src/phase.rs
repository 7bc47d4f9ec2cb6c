// src/phase.rs - Landing and push-off detection
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::geometry::joint_angle;
use crate::tracking::FrameRecord;

/// Heel positions at or beyond the bottom edge of the frame are not trusted.
pub const DEFAULT_HEEL_Y_LIMIT: f64 = 1.0;

const KNEE_ANGLE_SENTINEL: f64 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Landing,
    PushOff,
}

impl Phase {
    pub const ALL: [Phase; 2] = [Phase::Landing, Phase::PushOff];

    pub fn slug(self) -> &'static str {
        match self {
            Phase::Landing => "landing",
            Phase::PushOff => "push_off",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Landing => write!(f, "landing"),
            Phase::PushOff => write!(f, "push-off"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseResult {
    pub landing_frame: Option<usize>,
    pub push_off_frame: Option<usize>,
    /// Knee angle at the push-off frame.
    pub push_off_angle: Option<f64>,
    /// Heel height at the landing frame.
    pub landing_heel_y: Option<f64>,
    /// Frames with a detected pose that were scanned.
    pub frames_scanned: usize,
}

impl PhaseResult {
    pub fn frame(&self, phase: Phase) -> Option<usize> {
        match phase {
            Phase::Landing => self.landing_frame,
            Phase::PushOff => self.push_off_frame,
        }
    }

    /// The detected frame for `phase`, or `PhaseNotFound` naming `video`.
    pub fn require(&self, phase: Phase, video: &str) -> Result<usize> {
        self.frame(phase).ok_or_else(|| AnalysisError::PhaseNotFound {
            phase,
            video: video.to_string(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.landing_frame.is_none() && self.push_off_frame.is_none()
    }
}

/// Single forward scan for the two stride phases.
///
/// Push-off is the frame with the largest hip-knee-ankle angle and landing is
/// the frame with the smallest valid heel height. Both use strict comparisons,
/// so the first frame reaching an extremum is kept. The two phases are found
/// independently; no ordering between them is enforced.
#[derive(Debug, Clone)]
pub struct PhaseDetector {
    heel_y_limit: f64,
    max_knee_angle: f64,
    push_off_frame: Option<usize>,
    min_heel_y: Option<f64>,
    landing_frame: Option<usize>,
    frames_scanned: usize,
}

impl Default for PhaseDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseDetector {
    pub fn new() -> Self {
        Self::with_heel_limit(DEFAULT_HEEL_Y_LIMIT)
    }

    pub fn with_heel_limit(heel_y_limit: f64) -> Self {
        Self {
            heel_y_limit,
            max_knee_angle: KNEE_ANGLE_SENTINEL,
            push_off_frame: None,
            min_heel_y: None,
            landing_frame: None,
            frames_scanned: 0,
        }
    }

    pub fn observe(&mut self, record: &FrameRecord) {
        let joints = &record.joints;
        self.frames_scanned += 1;

        let knee_angle = joint_angle(joints.hip, joints.knee, joints.ankle);
        if knee_angle > self.max_knee_angle {
            self.max_knee_angle = knee_angle;
            self.push_off_frame = Some(record.frame_index);
        }

        let heel_y = joints.heel.y;
        if heel_y < self.heel_y_limit && self.min_heel_y.map_or(true, |min| heel_y < min) {
            self.min_heel_y = Some(heel_y);
            self.landing_frame = Some(record.frame_index);
        }
    }

    pub fn finish(self) -> PhaseResult {
        PhaseResult {
            landing_frame: self.landing_frame,
            push_off_frame: self.push_off_frame,
            push_off_angle: self.push_off_frame.map(|_| self.max_knee_angle),
            landing_heel_y: self.min_heel_y,
            frames_scanned: self.frames_scanned,
        }
    }

    /// Scans infallible records to completion.
    pub fn detect<I>(mut self, records: I) -> PhaseResult
    where
        I: IntoIterator<Item = FrameRecord>,
    {
        for record in records {
            self.observe(&record);
        }
        self.finish()
    }

    /// Scans a fallible record stream, stopping at the first error.
    pub fn run<I, E>(mut self, records: I) -> std::result::Result<PhaseResult, E>
    where
        I: IntoIterator<Item = std::result::Result<FrameRecord, E>>,
    {
        for record in records {
            self.observe(&record?);
        }
        let result = self.finish();
        debug!(
            "Phase scan over {} frames: landing={:?} push_off={:?}",
            result.frames_scanned, result.landing_frame, result.push_off_frame
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point2D;
    use crate::tracking::JointSet;

    /// Record whose knee angle is `angle` degrees and heel sits at `heel_y`.
    fn record(frame_index: usize, angle: f64, heel_y: f64) -> FrameRecord {
        let knee = Point2D::new(0.5, 0.5);
        let hip = Point2D::new(0.6, 0.5);
        let theta = angle.to_radians();
        let ankle = Point2D::new(0.5 + 0.1 * theta.cos(), 0.5 + 0.1 * theta.sin());
        let heel = Point2D::new(0.45, heel_y);
        FrameRecord::new(frame_index, JointSet::new(hip, knee, ankle, heel))
    }

    #[test]
    fn empty_sequence_leaves_everything_unset() {
        let result = PhaseDetector::new().detect(Vec::new());
        assert_eq!(result, PhaseResult::default());
        assert!(result.is_empty());
    }

    #[test]
    fn single_frame_with_valid_heel() {
        let result = PhaseDetector::new().detect(vec![record(7, 120.0, 0.8)]);
        assert_eq!(result.push_off_frame, Some(7));
        assert_eq!(result.landing_frame, Some(7));
    }

    #[test]
    fn single_frame_with_heel_out_of_frame() {
        let result = PhaseDetector::new().detect(vec![record(7, 120.0, 1.0)]);
        assert_eq!(result.push_off_frame, Some(7));
        assert_eq!(result.landing_frame, None);
        assert_eq!(result.landing_heel_y, None);
    }

    #[test]
    fn zero_angle_still_sets_push_off() {
        let result = PhaseDetector::new().detect(vec![record(3, 0.0, 0.5)]);
        assert_eq!(result.push_off_frame, Some(3));
    }

    #[test]
    fn push_off_keeps_first_maximum() {
        let frames = vec![
            record(0, 10.0, 0.5),
            record(1, 170.0, 0.5),
            record(2, 170.0, 0.5),
            record(3, 90.0, 0.5),
        ];
        let result = PhaseDetector::new().detect(frames);
        assert_eq!(result.push_off_frame, Some(1));
        assert!((result.push_off_angle.unwrap() - 170.0).abs() < 1e-9);
    }

    #[test]
    fn landing_keeps_first_minimum() {
        let frames = vec![record(0, 90.0, 0.9), record(1, 90.0, 0.5), record(2, 90.0, 0.5)];
        let result = PhaseDetector::new().detect(frames);
        assert_eq!(result.landing_frame, Some(1));
        assert_eq!(result.landing_heel_y, Some(0.5));
    }

    #[test]
    fn invalid_heel_never_wins_landing() {
        let frames = vec![record(0, 90.0, 0.95), record(1, 90.0, 1.2), record(2, 90.0, 1.0)];
        let result = PhaseDetector::new().detect(frames);
        assert_eq!(result.landing_frame, Some(0));
    }

    #[test]
    fn larger_angle_moves_push_off_and_smaller_does_not() {
        let mut detector = PhaseDetector::new();
        detector.observe(&record(0, 100.0, 0.5));
        detector.observe(&record(1, 99.0, 0.5));
        assert_eq!(detector.clone().finish().push_off_frame, Some(0));

        detector.observe(&record(2, 100.0, 0.5));
        assert_eq!(detector.clone().finish().push_off_frame, Some(0));

        detector.observe(&record(3, 100.5, 0.5));
        assert_eq!(detector.finish().push_off_frame, Some(3));
    }

    #[test]
    fn phases_are_independent_of_order() {
        // Push-off found before landing in the clip.
        let frames = vec![record(10, 175.0, 0.7), record(11, 120.0, 0.6), record(12, 100.0, 0.9)];
        let result = PhaseDetector::new().detect(frames);
        assert_eq!(result.push_off_frame, Some(10));
        assert_eq!(result.landing_frame, Some(11));
    }

    #[test]
    fn custom_heel_limit() {
        let frames = vec![record(0, 90.0, 0.85), record(1, 90.0, 0.7)];
        let result = PhaseDetector::with_heel_limit(0.75).detect(frames);
        assert_eq!(result.landing_frame, Some(1));

        let result = PhaseDetector::with_heel_limit(0.5).detect(vec![record(0, 90.0, 0.6)]);
        assert_eq!(result.landing_frame, None);
    }

    #[test]
    fn run_stops_at_first_error() {
        let records: Vec<std::result::Result<FrameRecord, &str>> =
            vec![Ok(record(0, 90.0, 0.5)), Err("decode failed"), Ok(record(2, 170.0, 0.4))];
        assert_eq!(PhaseDetector::new().run(records), Err("decode failed"));
    }

    #[test]
    fn require_reports_missing_phase() {
        let result = PhaseResult {
            push_off_frame: Some(4),
            ..Default::default()
        };
        assert_eq!(result.require(Phase::PushOff, "user").unwrap(), 4);
        match result.require(Phase::Landing, "user") {
            Err(AnalysisError::PhaseNotFound { phase, video }) => {
                assert_eq!(phase, Phase::Landing);
                assert_eq!(video, "user");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
