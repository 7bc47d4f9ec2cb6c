// src/keyframes.rs
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::phase::Phase;

pub const LANDING_OFFSETS: [i64; 5] = [-2, -1, 0, 1, 2];
pub const PUSH_OFF_OFFSETS: [i64; 1] = [0];

/// Frames selected around one detected phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFrameSet {
    pub phase: Phase,
    pub frames: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct KeyFrameSelector {
    offsets: Vec<i64>,
}

impl KeyFrameSelector {
    pub fn new(offsets: impl Into<Vec<i64>>) -> Self {
        Self {
            offsets: offsets.into(),
        }
    }

    pub fn for_phase(phase: Phase) -> Self {
        match phase {
            Phase::Landing => Self::new(LANDING_OFFSETS),
            Phase::PushOff => Self::new(PUSH_OFF_OFFSETS),
        }
    }

    pub fn offsets(&self) -> &[i64] {
        &self.offsets
    }

    /// `frame + offset` for each offset, in offset order.
    ///
    /// An unset `frame` is a `PhaseNotFound` error for `video`. Offsets that
    /// would land before the first frame are dropped.
    pub fn select(&self, phase: Phase, frame: Option<usize>, video: &str) -> Result<KeyFrameSet> {
        let frame = frame.ok_or_else(|| AnalysisError::PhaseNotFound {
            phase,
            video: video.to_string(),
        })?;

        let frames = self
            .offsets
            .iter()
            .filter_map(|&offset| {
                let index = i64::try_from(frame).ok()?.checked_add(offset)?;
                usize::try_from(index).ok()
            })
            .collect::<Vec<_>>();

        if frames.len() < self.offsets.len() {
            debug!(
                "{} {} key frames around {} clipped at the start of the video",
                video, phase, frame
            );
        }

        Ok(KeyFrameSet { phase, frames })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landing_window_around_frame_50() {
        let set = KeyFrameSelector::for_phase(Phase::Landing)
            .select(Phase::Landing, Some(50), "user")
            .unwrap();
        assert_eq!(set.frames, vec![48, 49, 50, 51, 52]);
        assert_eq!(set.phase, Phase::Landing);
    }

    #[test]
    fn push_off_is_the_frame_itself() {
        let set = KeyFrameSelector::for_phase(Phase::PushOff)
            .select(Phase::PushOff, Some(17), "ideal")
            .unwrap();
        assert_eq!(set.frames, vec![17]);
    }

    #[test]
    fn offset_order_is_preserved() {
        let set = KeyFrameSelector::new(vec![3, -3, 0])
            .select(Phase::Landing, Some(10), "user")
            .unwrap();
        assert_eq!(set.frames, vec![13, 7, 10]);
    }

    #[test]
    fn unset_phase_is_an_error() {
        let err = KeyFrameSelector::for_phase(Phase::PushOff)
            .select(Phase::PushOff, None, "ideal")
            .unwrap_err();
        match err {
            AnalysisError::PhaseNotFound { phase, video } => {
                assert_eq!(phase, Phase::PushOff);
                assert_eq!(video, "ideal");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn window_is_clipped_at_frame_zero() {
        let set = KeyFrameSelector::for_phase(Phase::Landing)
            .select(Phase::Landing, Some(1), "user")
            .unwrap();
        assert_eq!(set.frames, vec![0, 1, 2, 3]);
    }
}
