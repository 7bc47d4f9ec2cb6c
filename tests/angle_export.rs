mod common;

use std::path::Path;

use common::{leg, SyntheticStudio, SyntheticVideo};
use stride_phase::compare::{detect_phases, extract_angles};
use stride_phase::data::{read_angle_table, write_angle_table};
use stride_phase::tracking::{BodySide, LandmarkFrameSource};

fn studio() -> SyntheticStudio {
    let video = SyntheticVideo::new(8)
        .pose(0, leg(95.0, 0.9))
        .pose(3, leg(160.5, 0.8))
        .pose(4, leg(172.25, 0.85))
        .pose(7, leg(110.0, 0.95));
    SyntheticStudio::default().with("run.mp4", video)
}

#[test]
fn table_round_trips_only_pose_frames() {
    let studio = studio();
    let source = LandmarkFrameSource::new(&studio, &studio, BodySide::Right);
    let samples = extract_angles(&source, Path::new("run.mp4")).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("angles.csv");
    write_angle_table(&path, &samples).unwrap();
    let read_back = read_angle_table(&path).unwrap();

    assert_eq!(read_back, samples);
    let frames: Vec<usize> = read_back.iter().map(|s| s.frame_index).collect();
    assert_eq!(frames, vec![0, 3, 4, 7]);
    assert!((read_back[2].angle_degrees - 172.25).abs() < 1e-6);
}

#[test]
fn angle_series_and_phase_scan_decode_independently() {
    let studio = studio();
    let source = LandmarkFrameSource::new(&studio, &studio, BodySide::Right);

    let phases = detect_phases(&source, Path::new("run.mp4"), 1.0).unwrap();
    let samples = extract_angles(&source, Path::new("run.mp4")).unwrap();

    assert_eq!(studio.open_count("run.mp4"), 2);
    let best = samples
        .iter()
        .max_by(|a, b| a.angle_degrees.total_cmp(&b.angle_degrees))
        .unwrap();
    assert_eq!(phases.push_off_frame, Some(best.frame_index));
}
