// src/storage.rs - Uploaded video library
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

use crate::error::{AnalysisError, Result};

pub const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "mov", "avi"];

#[derive(Debug, Clone)]
pub struct VideoEntry {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: DateTime<Local>,
    pub has_landmarks: bool,
}

pub struct VideoLibrary {
    videos_dir: PathBuf,
    landmarks_extension: String,
}

impl VideoLibrary {
    pub fn new(videos_dir: impl AsRef<Path>, landmarks_extension: impl Into<String>) -> Self {
        Self {
            videos_dir: videos_dir.as_ref().to_path_buf(),
            landmarks_extension: landmarks_extension.into(),
        }
    }

    pub fn videos_dir(&self) -> &Path {
        &self.videos_dir
    }

    /// Stored videos, newest first.
    pub fn list(&self) -> Result<Vec<VideoEntry>> {
        if !self.videos_dir.exists() {
            fs::create_dir_all(&self.videos_dir)?;
        }

        let mut videos = Vec::new();
        for entry in fs::read_dir(&self.videos_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() || !is_video(&path) {
                continue;
            }

            let metadata = entry.metadata()?;
            let modified = DateTime::<Local>::from(metadata.modified()?);
            let has_landmarks = path.with_extension(&self.landmarks_extension).exists();

            videos.push(VideoEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                path,
                size_bytes: metadata.len(),
                modified,
                has_landmarks,
            });
        }

        videos.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
        Ok(videos)
    }

    /// Copies `source` into the library as `name` (default: the source file name).
    pub fn save(&self, source: &Path, name: Option<&str>) -> Result<PathBuf> {
        let name = match name {
            Some(name) => name.to_string(),
            None => source
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .ok_or_else(|| AnalysisError::Storage(format!("{} has no file name", source.display())))?,
        };
        let target = self.resolve(&name)?;
        if !is_video(&target) {
            return Err(AnalysisError::Storage(format!(
                "unsupported video type '{}', expected one of {:?}",
                name, VIDEO_EXTENSIONS
            )));
        }

        fs::create_dir_all(&self.videos_dir)?;
        let partial = self
            .videos_dir
            .join(format!(".upload-{}.part", uuid::Uuid::new_v4()));
        if let Err(e) = fs::copy(source, &partial) {
            let _ = fs::remove_file(&partial);
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&partial, &target) {
            let _ = fs::remove_file(&partial);
            return Err(e.into());
        }

        info!("Saved {} to {}", source.display(), target.display());
        Ok(target)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let target = self.resolve(name)?;
        if !target.is_file() {
            return Err(AnalysisError::Storage(format!("no stored video named '{}'", name)));
        }
        fs::remove_file(&target)?;
        info!("Deleted {}", target.display());
        Ok(())
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let file_name = Path::new(name).file_name();
        if name.is_empty() || file_name.map(|n| n != name).unwrap_or(true) {
            return Err(AnalysisError::Storage(format!("invalid video name '{}'", name)));
        }
        Ok(self.videos_dir.join(name))
    }
}

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.iter().any(|v| ext.eq_ignore_ascii_case(v)))
        .unwrap_or(false)
}
