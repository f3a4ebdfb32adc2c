//! Tool-facing operations over the workspace folders.
//!
//! These never return `Err`: every failure is reported inside the response value so a
//! caller can always serialize what it got back.

use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::cancel::CancellationToken;
use crate::config::Config;
use crate::error::SubdubError;
use crate::models::ModelRegistry;
use crate::pipeline::{Pipeline, PipelineRequest, Stage};
use crate::segment::{Mode, ModelSize};
use crate::workspace::{Workspace, WorkspaceDirs, check_video_file, supported_extensions_list};

#[derive(Debug, Clone, Serialize)]
pub struct SetupReport {
    pub success: bool,
    #[serde(flatten)]
    pub directories: Option<WorkspaceDirs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoListing {
    pub video_input_path: PathBuf,
    pub files: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub srt_output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dub_audio: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VideoReport {
    fn failure(error: &SubdubError) -> Self {
        Self {
            success: false,
            video_output: None,
            srt_output: None,
            dub_audio: None,
            failed_stage: error.stage(),
            error: Some(error.cause().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedVideo {
    pub input: String,
    pub video_output: PathBuf,
    pub srt_output: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dub_audio: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedVideo {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub processed: Vec<ProcessedVideo>,
    pub failed: Vec<FailedVideo>,
    pub message: String,
}

pub struct ToolService {
    workspace: Workspace,
    pipeline: Pipeline,
    bilingual: bool,
}

impl ToolService {
    pub fn new(config: &Config, cancel: CancellationToken) -> Self {
        let registry = Arc::new(ModelRegistry::new(config.clone()));
        let pipeline = Pipeline::new(config, registry).with_cancellation(cancel);
        Self::with_pipeline(
            Workspace::new(&config.workspace.root),
            pipeline,
            config.pipeline.bilingual,
        )
    }

    pub fn with_pipeline(workspace: Workspace, pipeline: Pipeline, bilingual: bool) -> Self {
        Self {
            workspace,
            pipeline,
            bilingual,
        }
    }

    pub async fn setup_workspace(&self) -> SetupReport {
        match self.workspace.ensure_directories().await {
            Ok(dirs) => {
                info!("Directory structure ready under {}", self.workspace.root().display());
                SetupReport {
                    success: true,
                    directories: Some(dirs),
                    error: None,
                }
            }
            Err(e) => SetupReport {
                success: false,
                directories: None,
                error: Some(e.to_string()),
            },
        }
    }

    pub async fn list_input_videos(&self) -> VideoListing {
        let dirs = self.prepare_workspace().await;
        let files: Vec<String> = self
            .workspace
            .collect_videos()
            .iter()
            .map(|path| file_name(path))
            .collect();

        VideoListing {
            video_input_path: dirs.video_input,
            count: files.len(),
            files,
        }
    }

    /// Process every video in `video_input/`, one after another
    pub async fn translate_videos(&self, mode: Mode, model_size: ModelSize) -> BatchReport {
        let dirs = self.prepare_workspace().await;
        let videos = self.workspace.collect_videos();

        if videos.is_empty() {
            return BatchReport {
                processed: Vec::new(),
                failed: Vec::new(),
                message: format!(
                    "No video files found in video_input folder. Please add {} files.",
                    supported_extensions_list().replace(", ", "/")
                ),
            };
        }

        let mut processed = Vec::new();
        let mut failed = Vec::new();

        for video in videos {
            let filename = file_name(&video);
            info!("Processing: {}", filename);

            let request = self.request(video, &dirs, mode, model_size);
            match self.pipeline.run(&request).await {
                Ok(result) => processed.push(ProcessedVideo {
                    input: filename,
                    video_output: result.video_output,
                    srt_output: result.srt_output,
                    dub_audio: result.dub_audio,
                }),
                Err(e) => {
                    warn!("Failed to process {}: {}", filename, e);
                    failed.push(FailedVideo {
                        filename,
                        error: e.cause().to_string(),
                    });
                }
            }
        }

        let message = format!("Processed {} videos, {} failed.", processed.len(), failed.len());
        BatchReport {
            processed,
            failed,
            message,
        }
    }

    /// Process `filename` from `video_input/`
    pub async fn translate_one_video(&self, filename: &str, mode: Mode, model_size: ModelSize) -> VideoReport {
        let dirs = self.prepare_workspace().await;

        if !is_plain_file_name(filename) {
            return VideoReport::failure(&SubdubError::Validation(format!(
                "Invalid filename: {}. Give the name of a file inside the video_input folder.",
                filename
            )));
        }

        let video_path = dirs.video_input.join(filename);
        let shown_as = format!("{}. Please ensure the file exists in video_input folder.", filename);
        if let Err(e) = check_video_file(&video_path, &shown_as).await {
            return VideoReport::failure(&e);
        }

        info!("Processing: {}", filename);
        let request = self.request(video_path, &dirs, mode, model_size);
        match self.pipeline.run(&request).await {
            Ok(result) => VideoReport {
                success: true,
                video_output: Some(result.video_output),
                srt_output: Some(result.srt_output),
                dub_audio: result.dub_audio,
                failed_stage: None,
                error: None,
            },
            Err(e) => {
                warn!("Failed to process {}: {}", filename, e);
                VideoReport::failure(&e)
            }
        }
    }

    /// Folder creation failures are left for the pipeline's own validation to report
    async fn prepare_workspace(&self) -> WorkspaceDirs {
        match self.workspace.ensure_directories().await {
            Ok(dirs) => dirs,
            Err(e) => {
                warn!("Failed to prepare workspace folders: {}", e);
                self.workspace.dirs()
            }
        }
    }

    fn request(&self, video_path: PathBuf, dirs: &WorkspaceDirs, mode: Mode, model_size: ModelSize) -> PipelineRequest {
        PipelineRequest::new(video_path, &dirs.video_output, &dirs.srt_output)
            .mode(mode)
            .model_size(model_size)
            .bilingual(self.bilingual)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_plain_file_name(filename: &str) -> bool {
    let mut components = Path::new(filename).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
