// src/video.rs - ffmpeg-backed frame decoding
use std::fs;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use image::{DynamicImage, RgbImage};
use tracing::{debug, info, warn};

use crate::error::{AnalysisError, Result};

/// One decoded video frame.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub index: usize,
    pub image: DynamicImage,
}

impl VideoFrame {
    pub fn new(index: usize, image: DynamicImage) -> Self {
        Self { index, image }
    }
}

pub type FrameStream = Box<dyn Iterator<Item = Result<VideoFrame>>>;

/// Opens a video for a single forward pass over its frames.
pub trait FrameDecoder {
    fn open(&self, video: &Path) -> Result<FrameStream>;
}

#[derive(Debug, Clone)]
pub struct VideoInfo {
    pub path: PathBuf,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

pub struct FfmpegDecoder {
    ffmpeg: String,
    ffprobe: String,
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl FfmpegDecoder {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    pub fn probe(&self, video: &Path) -> Result<VideoInfo> {
        let open_error = |reason: String| AnalysisError::VideoOpen {
            video: video.to_path_buf(),
            reason,
        };

        if !video.exists() {
            return Err(open_error("file does not exist".into()));
        }
        if let Err(e) = fs::File::open(video) {
            return Err(open_error(format!("cannot read file: {}", e)));
        }

        let output = Command::new(&self.ffprobe)
            .args([
                "-v", "error",
                "-select_streams", "v:0",
                "-show_entries", "stream=width,height,r_frame_rate",
                "-of", "csv=p=0",
            ])
            .arg(video)
            .output()
            .map_err(|e| open_error(format!("failed to run {}: {}", self.ffprobe, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(open_error(format!("ffprobe failed: {}", stderr.trim())));
        }

        let info = String::from_utf8_lossy(&output.stdout);
        let parts: Vec<&str> = info.trim().split(',').collect();
        if parts.len() < 3 {
            return Err(open_error("no video stream or corrupted file".into()));
        }

        let width = parts[0]
            .parse()
            .map_err(|_| open_error(format!("invalid video width '{}'", parts[0])))?;
        let height = parts[1]
            .parse()
            .map_err(|_| open_error(format!("invalid video height '{}'", parts[1])))?;
        let fps = parse_frame_rate(parts[2])
            .ok_or_else(|| open_error(format!("invalid frame rate '{}'", parts[2])))?;

        Ok(VideoInfo {
            path: video.to_path_buf(),
            fps,
            width,
            height,
        })
    }
}

impl FrameDecoder for FfmpegDecoder {
    fn open(&self, video: &Path) -> Result<FrameStream> {
        let info = self.probe(video)?;
        if info.width == 0 || info.height == 0 {
            return Err(AnalysisError::VideoOpen {
                video: video.to_path_buf(),
                reason: format!("empty frame size {}x{}", info.width, info.height),
            });
        }

        let mut child = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(video)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AnalysisError::VideoOpen {
                video: video.to_path_buf(),
                reason: format!("failed to run {}: {}", self.ffmpeg, e),
            })?;

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(AnalysisError::VideoOpen {
                    video: video.to_path_buf(),
                    reason: "ffmpeg stdout unavailable".into(),
                });
            }
        };

        info!(
            "Decoding {} ({}x{} @ {:.2} fps)",
            video.display(),
            info.width,
            info.height,
            info.fps
        );

        Ok(Box::new(FfmpegFrames {
            video: video.to_path_buf(),
            child,
            stdout: BufReader::new(stdout),
            width: info.width,
            height: info.height,
            next_index: 0,
            finished: false,
        }))
    }
}

/// Raw `rgb24` frames read from an ffmpeg child process.
///
/// The child is killed and reaped when the stream is dropped.
struct FfmpegFrames {
    video: PathBuf,
    child: Child,
    stdout: BufReader<ChildStdout>,
    width: u32,
    height: u32,
    next_index: usize,
    finished: bool,
}

impl FfmpegFrames {
    fn decode_error(&self, reason: String) -> AnalysisError {
        AnalysisError::Decode {
            video: self.video.clone(),
            frame: self.next_index,
            reason,
        }
    }
}

impl Iterator for FfmpegFrames {
    type Item = Result<VideoFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut buf = vec![0u8; self.width as usize * self.height as usize * 3];
        match read_frame(&mut self.stdout, &mut buf) {
            Ok(true) => {}
            Ok(false) => {
                self.finished = true;
                return match self.child.wait() {
                    Ok(status) if status.success() => {
                        debug!("End of {} after {} frames", self.video.display(), self.next_index);
                        None
                    }
                    Ok(status) => Some(Err(self.decode_error(format!("ffmpeg exited with {}", status)))),
                    Err(e) => Some(Err(self.decode_error(e.to_string()))),
                };
            }
            Err(e) => {
                self.finished = true;
                return Some(Err(self.decode_error(e.to_string())));
            }
        }

        let Some(image) = RgbImage::from_raw(self.width, self.height, buf) else {
            self.finished = true;
            return Some(Err(self.decode_error("frame buffer size mismatch".into())));
        };

        let frame = VideoFrame::new(self.next_index, DynamicImage::ImageRgb8(image));
        self.next_index += 1;
        Some(Ok(frame))
    }
}

impl Drop for FfmpegFrames {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Fills `buf` with one frame. `Ok(false)` means a clean end of stream.
fn read_frame(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    if filled == 0 {
        Ok(false)
    } else if filled == buf.len() {
        Ok(true)
    } else {
        Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("truncated frame: {} of {} bytes", filled, buf.len()),
        ))
    }
}

fn parse_frame_rate(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let fps = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.parse().ok()?,
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

/// Saves every `every`-th frame of `video` as `frame_NNN.jpg` in `out_dir`.
///
/// `out_dir` is emptied first. Returns the number of images written.
pub fn sample_frames(
    decoder: &dyn FrameDecoder,
    video: &Path,
    every: usize,
    out_dir: &Path,
) -> Result<usize> {
    if every == 0 {
        return Err(AnalysisError::InvalidInput("sampling interval must be at least 1".into()));
    }

    let frames = decoder.open(video)?;

    if out_dir.exists() {
        fs::remove_dir_all(out_dir)?;
    }
    fs::create_dir_all(out_dir)?;

    let mut saved = 0;
    for frame in frames {
        let frame = frame?;
        if frame.index % every != 0 {
            continue;
        }
        let frame_path = out_dir.join(format!("frame_{:03}.jpg", saved));
        if let Err(e) = frame.image.to_rgb8().save(&frame_path) {
            warn!("Failed to save frame {}: {}", frame.index, e);
            continue;
        }
        saved += 1;
    }

    info!("Saved {} sampled frames to {}", saved, out_dir.display());
    Ok(saved)
}
