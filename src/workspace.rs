use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{Result, SubdubError};

/// Video extensions accepted as pipeline input, lowercase without the dot
pub const VIDEO_EXTENSIONS: [&str; 6] = ["mp4", "mov", "mkv", "avi", "m4v", "webm"];

/// Stem suffix of files this tool produced; never picked up as input
const PROCESSED_STEM_SUFFIX: &str = "_bilingual";

pub fn is_supported_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// `.mp4, .mov, ...`
pub fn supported_extensions_list() -> String {
    VIDEO_EXTENSIONS
        .iter()
        .map(|ext| format!(".{}", ext))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Existence and extension checks for a pipeline input; a missing file is reported as `shown_as`
pub async fn check_video_file(path: &Path, shown_as: &str) -> Result<()> {
    if !fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false) {
        return Err(SubdubError::FileNotFound(shown_as.to_string()));
    }

    if !is_supported_video(path) {
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        return Err(SubdubError::UnsupportedFormat(format!(
            "{}. Supported: {}",
            ext,
            supported_extensions_list()
        )));
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkspaceDirs {
    pub video_input: PathBuf,
    pub video_output: PathBuf,
    pub srt_output: PathBuf,
}

/// The three-folder layout under a workspace root
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dirs(&self) -> WorkspaceDirs {
        WorkspaceDirs {
            video_input: self.root.join("video_input"),
            video_output: self.root.join("video_output"),
            srt_output: self.root.join("srt_output"),
        }
    }

    /// Create the workspace folders if missing
    pub async fn ensure_directories(&self) -> Result<WorkspaceDirs> {
        let dirs = self.dirs();
        for dir in [&dirs.video_input, &dirs.video_output, &dirs.srt_output] {
            fs::create_dir_all(dir).await?;
            debug!("Workspace folder ready: {}", dir.display());
        }
        Ok(dirs)
    }

    /// Input videos directly inside `video_input/`, sorted by file name.
    /// Outputs from earlier runs (`*_bilingual.*`) are skipped.
    pub fn collect_videos(&self) -> Vec<PathBuf> {
        let input_dir = self.dirs().video_input;
        if !input_dir.is_dir() {
            return Vec::new();
        }

        let mut videos: Vec<PathBuf> = WalkDir::new(&input_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| is_supported_video(path))
            .filter(|path| {
                !path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().ends_with(PROCESSED_STEM_SUFFIX))
                    .unwrap_or(false)
            })
            .collect();

        videos.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        info!("Found {} video files in {}", videos.len(), input_dir.display());
        videos
    }
}
