use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use super::Transcriber;
use crate::config::TranscriberConfig;
use crate::error::{Result, SubdubError};
use crate::media::{MediaCommand, MediaCommandBuilder};
use crate::segment::TimedSegment;

/// whisper.cpp `-oj` output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppOutput {
    #[serde(default)]
    pub result: Option<WhisperCppResult>,
    pub transcription: Vec<WhisperCppSegment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppResult {
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppSegment {
    pub offsets: WhisperCppOffsets,
    pub text: String,
}

/// Segment bounds in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppOffsets {
    pub from: i64,
    pub to: i64,
}

impl WhisperCppOutput {
    /// Convert to timed segments sorted by start time.
    ///
    /// Segments whose end does not come after their start cannot be shown as a cue
    /// and are dropped.
    pub fn into_segments(self) -> Vec<TimedSegment> {
        let mut segments: Vec<TimedSegment> = self
            .transcription
            .into_iter()
            .filter_map(|seg| {
                let start = seg.offsets.from.max(0) as f64 / 1000.0;
                let end = seg.offsets.to.max(0) as f64 / 1000.0;
                if end <= start {
                    warn!("Dropping zero-length segment at {:.3}s: {:?}", start, seg.text);
                    return None;
                }
                Some(TimedSegment::new(start, end, seg.text.trim()))
            })
            .collect();

        segments.sort_by(|a, b| a.start.total_cmp(&b.start));
        segments
    }
}

/// Parse whisper.cpp JSON output into segments
pub fn parse_whisper_json(json_content: &str) -> Result<Vec<TimedSegment>> {
    let output: WhisperCppOutput = serde_json::from_str(json_content)
        .map_err(|e| SubdubError::Transcription(format!("Failed to parse transcription JSON: {}", e)))?;

    if let Some(result) = &output.result {
        if result.language != "en" {
            debug!("whisper.cpp reported language '{}'", result.language);
        }
    }

    Ok(output.into_segments())
}

/// Transcriber that shells out to whisper.cpp with one ggml model
pub struct WhisperCppTranscriber {
    config: TranscriberConfig,
    model_path: PathBuf,
    media: MediaCommandBuilder,
}

impl WhisperCppTranscriber {
    pub fn new<P: Into<PathBuf>>(config: TranscriberConfig, model_path: P, ffmpeg_path: &str) -> Self {
        Self {
            config,
            model_path: model_path.into(),
            media: MediaCommandBuilder::new(ffmpeg_path),
        }
    }


    fn whisper_command(&self, audio_path: &Path, output_base: &Path) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.config.binary_path, "Transcription")
            .arg("-oj") // Output JSON format
            .arg("-of")
            .path(output_base)
            .arg("-m")
            .path(&self.model_path)
            .arg("-l")
            .arg(&self.config.language)
            .arg("-f")
            .path(audio_path);

        if let Some(threads) = self.config.threads {
            cmd = cmd.arg("-t").arg(threads.to_string());
        }

        cmd
    }
}

#[async_trait]
impl Transcriber for WhisperCppTranscriber {
    async fn transcribe(&self, media_path: &Path) -> Result<Vec<TimedSegment>> {
        info!(
            "Transcribing {} with {}",
            media_path.display(),
            self.model_path.display()
        );

        let temp_dir = tempfile::tempdir()
            .map_err(|e| SubdubError::Transcription(format!("Failed to create temp dir: {}", e)))?;
        let audio_path = temp_dir.path().join("audio.wav");
        let output_base = temp_dir.path().join("transcript");
        let output_path = temp_dir.path().join("transcript.json");

        let extraction = self
            .media
            .extract_audio(media_path, &audio_path)
            .run()
            .await
            .map_err(|e| SubdubError::Transcription(e.to_string()))?;
        if !extraction.success() {
            return Err(SubdubError::Transcription(format!(
                "Cannot read audio from {}: {}",
                media_path.display(),
                extraction.stderr.trim()
            )));
        }

        let output = self
            .whisper_command(&audio_path, &output_base)
            .run()
            .await
            .map_err(|e| SubdubError::Transcription(e.to_string()))?;

        if !output.success() {
            return Err(SubdubError::Transcription(format!(
                "whisper.cpp failed: {}",
                output.stderr.trim()
            )));
        }

        let json_content = fs::read_to_string(&output_path)
            .await
            .map_err(|e| SubdubError::Transcription(format!("Failed to read transcription: {}", e)))?;

        let segments = parse_whisper_json(&json_content)?;
        info!("Transcription produced {} segments", segments.len());
        Ok(segments)
    }
}
