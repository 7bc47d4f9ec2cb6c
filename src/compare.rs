// src/compare.rs - User vs. ideal stride comparison
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::annotate::Annotator;
use crate::config::AnalysisConfig;
use crate::data::{write_angle_table, AngleSample, AngleSeriesExtractor};
use crate::error::{AnalysisError, Result};
use crate::keyframes::{KeyFrameSelector, KeyFrameSet};
use crate::phase::{Phase, PhaseDetector, PhaseResult};
use crate::tracking::{LandmarkFrameSource, PoseBackend};
use crate::video::FrameDecoder;

pub const USER_LABEL: &str = "user";
pub const IDEAL_LABEL: &str = "ideal";

/// Detection pass over one video.
pub fn detect_phases(source: &LandmarkFrameSource<'_>, video: &Path, heel_y_limit: f64) -> Result<PhaseResult> {
    let frames = source.open(video)?;
    let result = PhaseDetector::with_heel_limit(heel_y_limit).run(frames)?;
    info!(
        "{}: landing={:?} push_off={:?} over {} pose frames",
        video.display(),
        result.landing_frame,
        result.push_off_frame,
        result.frames_scanned
    );
    Ok(result)
}

/// Angle-series pass over one video. Decodes the video independently of
/// [`detect_phases`].
pub fn extract_angles(source: &LandmarkFrameSource<'_>, video: &Path) -> Result<Vec<AngleSample>> {
    let frames = source.open(video)?;
    AngleSeriesExtractor::new().run(frames)
}

#[derive(Debug, Clone)]
pub struct RenderedFrame {
    pub frame_index: usize,
    pub path: PathBuf,
    pub annotated: bool,
}

#[derive(Debug)]
pub struct PhaseRenders {
    pub phase: Phase,
    /// Rendered key frames, or why none could be selected.
    pub outcome: Result<Vec<RenderedFrame>>,
}

#[derive(Debug)]
pub struct VideoComparison {
    pub label: String,
    pub video: PathBuf,
    pub phases: PhaseResult,
    pub renders: Vec<PhaseRenders>,
    pub angle_table: Option<PathBuf>,
}

#[derive(Debug)]
pub struct ComparisonReport {
    pub user: Result<VideoComparison>,
    pub ideal: Result<VideoComparison>,
}

impl ComparisonReport {
    pub fn videos(&self) -> [(&'static str, &Result<VideoComparison>); 2] {
        [(USER_LABEL, &self.user), (IDEAL_LABEL, &self.ideal)]
    }
}

pub struct ComparisonOrchestrator<'a> {
    decoder: &'a dyn FrameDecoder,
    poses: &'a dyn PoseBackend,
    annotator: &'a dyn Annotator,
    config: &'a AnalysisConfig,
}

impl<'a> ComparisonOrchestrator<'a> {
    pub fn new(
        decoder: &'a dyn FrameDecoder,
        poses: &'a dyn PoseBackend,
        annotator: &'a dyn Annotator,
        config: &'a AnalysisConfig,
    ) -> Self {
        Self {
            decoder,
            poses,
            annotator,
            config,
        }
    }

    /// Analyzes both videos independently and renders their key frames.
    ///
    /// Only invalid arguments fail the whole call; a video that cannot be
    /// decoded or a phase that was not detected is recorded in the report.
    pub fn compare(&self, user: &Path, ideal: &Path, output_dir: &Path) -> Result<ComparisonReport> {
        if user.as_os_str().is_empty() || ideal.as_os_str().is_empty() {
            return Err(AnalysisError::InvalidInput("both a user and an ideal video are required".into()));
        }
        self.config.validate()?;
        std::fs::create_dir_all(output_dir)?;

        let user = self.process_video(USER_LABEL, user, output_dir);
        if let Err(e) = &user {
            warn!("User video analysis failed: {}", e);
        }
        let ideal = self.process_video(IDEAL_LABEL, ideal, output_dir);
        if let Err(e) = &ideal {
            warn!("Ideal video analysis failed: {}", e);
        }

        Ok(ComparisonReport { user, ideal })
    }

    fn process_video(&self, label: &str, video: &Path, output_dir: &Path) -> Result<VideoComparison> {
        let source = LandmarkFrameSource::new(self.decoder, self.poses, self.config.tracked_side);
        let phases = detect_phases(&source, video, self.config.heel_y_limit)?;
        let label_dir = output_dir.join(label);

        let angle_table = if self.config.export_angles {
            let samples = extract_angles(&source, video)?;
            let path = label_dir.join("angles.csv");
            write_angle_table(&path, &samples)?;
            Some(path)
        } else {
            None
        };

        let selections: Vec<(Phase, Result<KeyFrameSet>)> = Phase::ALL
            .iter()
            .map(|&phase| {
                let selector = KeyFrameSelector::new(self.config.offsets(phase).to_vec());
                (phase, selector.select(phase, phases.frame(phase), label))
            })
            .collect();

        // frame index -> output files wanted for it
        let mut wanted: BTreeMap<usize, Vec<(Phase, PathBuf)>> = BTreeMap::new();
        for (phase, selection) in &selections {
            match selection {
                Ok(set) => {
                    for &frame in &set.frames {
                        let path = label_dir.join(format!("{}_frame_{:05}.png", phase.slug(), frame));
                        wanted.entry(frame).or_default().push((*phase, path));
                    }
                }
                Err(e) => warn!("{}", e),
            }
        }

        let mut rendered = self.render_frames(label, video, &wanted)?;

        let renders = selections
            .into_iter()
            .map(|(phase, selection)| PhaseRenders {
                phase,
                outcome: selection.map(|set| {
                    set.frames
                        .iter()
                        .filter_map(|frame| rendered.remove(&(phase, *frame)))
                        .collect()
                }),
            })
            .collect();

        Ok(VideoComparison {
            label: label.to_string(),
            video: video.to_path_buf(),
            phases,
            renders,
            angle_table,
        })
    }

    /// Decodes `video` once more and renders each wanted frame.
    fn render_frames(
        &self,
        label: &str,
        video: &Path,
        wanted: &BTreeMap<usize, Vec<(Phase, PathBuf)>>,
    ) -> Result<BTreeMap<(Phase, usize), RenderedFrame>> {
        let mut rendered = BTreeMap::new();
        let Some(&last) = wanted.keys().next_back() else {
            return Ok(rendered);
        };

        let mut estimator = self.poses.estimator_for(video, self.config.tracked_side)?;
        let frames = self.decoder.open(video)?;

        for frame in frames {
            let frame = frame?;
            if frame.index > last {
                break;
            }
            let Some(targets) = wanted.get(&frame.index) else {
                continue;
            };

            let joints = estimator.detect(&frame);
            for (phase, path) in targets {
                match self.annotator.render(&frame.image, joints.as_ref(), path) {
                    Ok(()) => {
                        info!("{} {} frame {} -> {}", label, phase, frame.index, path.display());
                        rendered.insert(
                            (*phase, frame.index),
                            RenderedFrame {
                                frame_index: frame.index,
                                path: path.clone(),
                                annotated: joints.is_some(),
                            },
                        );
                    }
                    Err(e) => warn!("Failed to render {} frame {}: {}", label, frame.index, e),
                }
            }
        }

        for (frame, targets) in wanted {
            for (phase, _) in targets {
                if !rendered.contains_key(&(*phase, *frame)) {
                    warn!("{} {} key frame {} was not rendered", label, phase, frame);
                }
            }
        }

        Ok(rendered)
    }
}
