// src/annotate.rs - Draws the tracked leg onto key frames
use std::fs;
use std::path::Path;

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use tracing::debug;

use crate::error::Result;
use crate::geometry::Point2D;
use crate::tracking::JointSet;

pub trait Annotator {
    /// Writes `frame` to `output`, overlaid with `joints` when available.
    fn render(&self, frame: &DynamicImage, joints: Option<&JointSet>, output: &Path) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct SkeletonAnnotator {
    pub bone_color: Rgb<u8>,
    pub joint_color: Rgb<u8>,
    pub joint_radius: i32,
    pub line_width: i32,
}

impl Default for SkeletonAnnotator {
    fn default() -> Self {
        Self {
            bone_color: Rgb([70, 130, 240]),
            joint_color: Rgb([255, 152, 0]),
            joint_radius: 5,
            line_width: 3,
        }
    }
}

impl SkeletonAnnotator {
    pub fn draw(&self, frame: &DynamicImage, joints: &JointSet) -> RgbImage {
        let mut canvas = frame.to_rgb8();
        let (width, height) = canvas.dimensions();
        let px = |p: Point2D| p.to_pixel(width, height);

        let bones = [
            (joints.hip, joints.knee),
            (joints.knee, joints.ankle),
            (joints.ankle, joints.heel),
        ];
        let half = self.line_width / 2;
        for (from, to) in bones {
            let (x0, y0) = px(from);
            let (x1, y1) = px(to);
            // Thicken by drawing parallel segments.
            for dx in -half..=half {
                for dy in -half..=half {
                    let (dx, dy) = (dx as f32, dy as f32);
                    draw_line_segment_mut(&mut canvas, (x0 + dx, y0 + dy), (x1 + dx, y1 + dy), self.bone_color);
                }
            }
        }

        for point in [joints.hip, joints.knee, joints.ankle, joints.heel] {
            let (x, y) = px(point);
            draw_filled_circle_mut(&mut canvas, (x as i32, y as i32), self.joint_radius, self.joint_color);
        }

        canvas
    }
}

impl Annotator for SkeletonAnnotator {
    fn render(&self, frame: &DynamicImage, joints: Option<&JointSet>, output: &Path) -> Result<()> {
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }

        let image = match joints {
            Some(joints) => self.draw(frame, joints),
            None => frame.to_rgb8(),
        };
        image.save(output)?;

        debug!("Rendered {}", output.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg() -> JointSet {
        JointSet::new(
            Point2D::new(0.5, 0.1),
            Point2D::new(0.5, 0.5),
            Point2D::new(0.5, 0.9),
            Point2D::new(0.3, 0.9),
        )
    }

    #[test]
    fn draws_joints_in_pixel_space() {
        let frame = DynamicImage::new_rgb8(100, 100);
        let annotator = SkeletonAnnotator::default();
        let canvas = annotator.draw(&frame, &leg());

        assert_eq!(*canvas.get_pixel(50, 50), annotator.joint_color);
        assert_eq!(*canvas.get_pixel(50, 30), annotator.bone_color);
        assert_eq!(*canvas.get_pixel(5, 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn renders_raw_frame_without_joints() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("user").join("landing_frame_00003.png");
        let frame = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 6, Rgb([10, 20, 30])));

        SkeletonAnnotator::default().render(&frame, None, &output).unwrap();

        let written = image::open(&output).unwrap().to_rgb8();
        assert_eq!(written.dimensions(), (8, 6));
        assert_eq!(*written.get_pixel(3, 3), Rgb([10, 20, 30]));
    }
}
