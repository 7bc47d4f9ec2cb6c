// src/tracking.rs - Joint model and the landmark frame source
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::Result;
use crate::geometry::Point2D;
use crate::video::{FrameDecoder, FrameStream, VideoFrame};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodySide {
    Left,
    Right,
}

impl fmt::Display for BodySide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodySide::Left => write!(f, "left"),
            BodySide::Right => write!(f, "right"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Joint {
    Hip,
    Knee,
    Ankle,
    Heel,
}

impl Joint {
    pub const ALL: [Joint; 4] = [Joint::Hip, Joint::Knee, Joint::Ankle, Joint::Heel];

    /// Index of this joint in the 33-point MediaPipe pose layout.
    pub fn landmark_index(self, side: BodySide) -> usize {
        const LEFT_HIP: usize = 23;
        const RIGHT_HIP: usize = 24;
        const LEFT_KNEE: usize = 25;
        const RIGHT_KNEE: usize = 26;
        const LEFT_ANKLE: usize = 27;
        const RIGHT_ANKLE: usize = 28;
        const LEFT_HEEL: usize = 29;
        const RIGHT_HEEL: usize = 30;

        match (self, side) {
            (Joint::Hip, BodySide::Left) => LEFT_HIP,
            (Joint::Hip, BodySide::Right) => RIGHT_HIP,
            (Joint::Knee, BodySide::Left) => LEFT_KNEE,
            (Joint::Knee, BodySide::Right) => RIGHT_KNEE,
            (Joint::Ankle, BodySide::Left) => LEFT_ANKLE,
            (Joint::Ankle, BodySide::Right) => RIGHT_ANKLE,
            (Joint::Heel, BodySide::Left) => LEFT_HEEL,
            (Joint::Heel, BodySide::Right) => RIGHT_HEEL,
        }
    }
}

/// Tracked-side leg joints for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointSet {
    pub hip: Point2D,
    pub knee: Point2D,
    pub ankle: Point2D,
    pub heel: Point2D,
}

impl JointSet {
    pub fn new(hip: Point2D, knee: Point2D, ankle: Point2D, heel: Point2D) -> Self {
        Self { hip, knee, ankle, heel }
    }

    pub fn get(&self, joint: Joint) -> Point2D {
        match joint {
            Joint::Hip => self.hip,
            Joint::Knee => self.knee,
            Joint::Ankle => self.ankle,
            Joint::Heel => self.heel,
        }
    }

    /// Picks the tracked-side leg out of a full pose landmark list.
    ///
    /// Returns `None` when the list is too short to hold every required joint.
    pub fn from_pose_landmarks(landmarks: &[[f64; 3]], side: BodySide) -> Option<Self> {
        let point = |joint: Joint| {
            landmarks
                .get(joint.landmark_index(side))
                .map(|lm| Point2D::new(lm[0], lm[1]))
        };

        Some(Self {
            hip: point(Joint::Hip)?,
            knee: point(Joint::Knee)?,
            ankle: point(Joint::Ankle)?,
            heel: point(Joint::Heel)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRecord {
    pub frame_index: usize,
    pub joints: JointSet,
}

impl FrameRecord {
    pub fn new(frame_index: usize, joints: JointSet) -> Self {
        Self { frame_index, joints }
    }
}

/// Per-frame pose detection capability.
pub trait PoseEstimator {
    /// Returns `None` when no pose is found in the frame.
    fn detect(&mut self, frame: &VideoFrame) -> Option<JointSet>;
}

/// Builds a fresh estimator for each video analysis.
pub trait PoseBackend {
    fn estimator_for(&self, video: &Path, side: BodySide) -> Result<Box<dyn PoseEstimator>>;
}

/// Pairs a frame decoder with a pose backend to produce landmark frames.
pub struct LandmarkFrameSource<'a> {
    decoder: &'a dyn FrameDecoder,
    poses: &'a dyn PoseBackend,
    side: BodySide,
}

impl<'a> LandmarkFrameSource<'a> {
    pub fn new(decoder: &'a dyn FrameDecoder, poses: &'a dyn PoseBackend, side: BodySide) -> Self {
        Self { decoder, poses, side }
    }

    pub fn side(&self) -> BodySide {
        self.side
    }

    /// Opens `video` for one forward pass. Each call decodes the video again.
    pub fn open(&self, video: &Path) -> Result<LandmarkFrames> {
        let estimator = self.poses.estimator_for(video, self.side)?;
        let frames = self.decoder.open(video)?;
        debug!("Opened landmark frames for {} ({} side)", video.display(), self.side);

        Ok(LandmarkFrames {
            video: video.to_path_buf(),
            frames,
            estimator,
            decoded: 0,
            misses: 0,
        })
    }
}

/// Single-pass sequence of frames that carry a detected pose.
///
/// Frames without a pose are skipped, so indices may have gaps. Dropping the
/// sequence releases the underlying decoder.
pub struct LandmarkFrames {
    video: PathBuf,
    frames: FrameStream,
    estimator: Box<dyn PoseEstimator>,
    decoded: usize,
    misses: usize,
}

impl LandmarkFrames {
    pub fn video(&self) -> &Path {
        &self.video
    }

    pub fn decoded_frames(&self) -> usize {
        self.decoded
    }

    pub fn pose_misses(&self) -> usize {
        self.misses
    }
}

impl Iterator for LandmarkFrames {
    type Item = Result<FrameRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = match self.frames.next()? {
                Ok(frame) => frame,
                Err(e) => return Some(Err(e)),
            };
            self.decoded += 1;

            match self.estimator.detect(&frame) {
                Some(joints) => return Some(Ok(FrameRecord::new(frame.index, joints))),
                None => {
                    self.misses += 1;
                    trace!("No pose in frame {} of {}", frame.index, self.video.display());
                }
            }
        }
    }
}

impl Drop for LandmarkFrames {
    fn drop(&mut self) {
        debug!(
            "Closing {}: {} frames decoded, {} without pose",
            self.video.display(),
            self.decoded,
            self.misses
        );
    }
}
