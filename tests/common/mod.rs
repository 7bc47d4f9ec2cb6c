//! Synthetic video and pose doubles shared by the integration tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use image::DynamicImage;
use stride_phase::annotate::Annotator;
use stride_phase::error::{AnalysisError, Result};
use stride_phase::geometry::Point2D;
use stride_phase::tracking::{BodySide, JointSet, PoseBackend, PoseEstimator};
use stride_phase::video::{FrameDecoder, FrameStream, VideoFrame};

/// Leg whose hip-knee-ankle angle is `angle` degrees, heel at `heel_y`.
pub fn leg(angle: f64, heel_y: f64) -> JointSet {
    let knee = Point2D::new(0.5, 0.5);
    let hip = Point2D::new(0.6, 0.5);
    let theta = angle.to_radians();
    let ankle = Point2D::new(0.5 + 0.1 * theta.cos(), 0.5 + 0.1 * theta.sin());
    JointSet::new(hip, knee, ankle, Point2D::new(0.45, heel_y))
}

#[derive(Clone, Default)]
pub struct SyntheticVideo {
    pub frame_count: usize,
    /// Pose per frame index; frames not listed have no pose.
    pub poses: HashMap<usize, JointSet>,
    pub corrupt_at: Option<usize>,
}

impl SyntheticVideo {
    pub fn new(frame_count: usize) -> Self {
        Self {
            frame_count,
            ..Default::default()
        }
    }

    pub fn pose(mut self, frame: usize, joints: JointSet) -> Self {
        self.poses.insert(frame, joints);
        self
    }
}

/// In-memory "video files" keyed by path, counting every open and close.
#[derive(Default)]
pub struct SyntheticStudio {
    pub videos: HashMap<PathBuf, SyntheticVideo>,
    pub opens: Rc<RefCell<Vec<PathBuf>>>,
    pub closes: Rc<RefCell<Vec<PathBuf>>>,
}

impl SyntheticStudio {
    pub fn with(mut self, path: &str, video: SyntheticVideo) -> Self {
        self.videos.insert(PathBuf::from(path), video);
        self
    }

    pub fn open_count(&self, path: &str) -> usize {
        self.opens.borrow().iter().filter(|p| p.as_path() == Path::new(path)).count()
    }

    pub fn close_count(&self, path: &str) -> usize {
        self.closes.borrow().iter().filter(|p| p.as_path() == Path::new(path)).count()
    }

    fn video(&self, path: &Path) -> Result<&SyntheticVideo> {
        self.videos.get(path).ok_or_else(|| AnalysisError::VideoOpen {
            video: path.to_path_buf(),
            reason: "file does not exist".into(),
        })
    }
}

impl FrameDecoder for SyntheticStudio {
    fn open(&self, video: &Path) -> Result<FrameStream> {
        let clip = self.video(video)?.clone();
        self.opens.borrow_mut().push(video.to_path_buf());
        let path = video.to_path_buf();

        Ok(Box::new(SyntheticFrames {
            clip,
            path,
            next_index: 0,
            closes: Rc::clone(&self.closes),
        }))
    }
}

/// Frame stream that records its path in `closes` when dropped.
struct SyntheticFrames {
    clip: SyntheticVideo,
    path: PathBuf,
    next_index: usize,
    closes: Rc<RefCell<Vec<PathBuf>>>,
}

impl Iterator for SyntheticFrames {
    type Item = Result<VideoFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next_index;
        if index >= self.clip.frame_count {
            return None;
        }
        self.next_index += 1;

        if self.clip.corrupt_at == Some(index) {
            return Some(Err(AnalysisError::Decode {
                video: self.path.clone(),
                frame: index,
                reason: "corrupt packet".into(),
            }));
        }
        Some(Ok(VideoFrame::new(index, DynamicImage::new_rgb8(16, 16))))
    }
}

impl Drop for SyntheticFrames {
    fn drop(&mut self) {
        self.closes.borrow_mut().push(self.path.clone());
    }
}

pub struct SyntheticEstimator {
    poses: HashMap<usize, JointSet>,
}

impl PoseEstimator for SyntheticEstimator {
    fn detect(&mut self, frame: &VideoFrame) -> Option<JointSet> {
        self.poses.get(&frame.index).copied()
    }
}

impl PoseBackend for SyntheticStudio {
    fn estimator_for(&self, video: &Path, _side: BodySide) -> Result<Box<dyn PoseEstimator>> {
        let clip = self.video(video)?;
        Ok(Box::new(SyntheticEstimator {
            poses: clip.poses.clone(),
        }))
    }
}

/// Records render requests instead of writing images.
#[derive(Default)]
pub struct RecordingAnnotator {
    pub calls: RefCell<Vec<(PathBuf, bool)>>,
}

impl Annotator for RecordingAnnotator {
    fn render(&self, _frame: &DynamicImage, joints: Option<&JointSet>, output: &Path) -> Result<()> {
        self.calls.borrow_mut().push((output.to_path_buf(), joints.is_some()));
        Ok(())
    }
}
