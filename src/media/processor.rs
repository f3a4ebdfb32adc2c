use async_trait::async_trait;
use std::path::Path;
use tracing::info;

use super::{MediaCommandBuilder, Muxer};
use crate::config::MediaConfig;
use crate::error::{Result, SubdubError};

/// Muxer backed by the ffmpeg command line tool
pub struct FfmpegMuxer {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl FfmpegMuxer {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path);

        Self {
            config,
            command_builder,
        }
    }

    /// First line of `ffmpeg -version`
    pub async fn version_info(&self) -> Result<String> {
        let output = self
            .command_builder
            .version_check()
            .run()
            .await
            .map_err(|e| SubdubError::Config(format!("ffmpeg not found: {}", e)))?;

        if !output.success() {
            return Err(SubdubError::Config(format!(
                "ffmpeg version check failed: {}",
                output.stderr.trim()
            )));
        }

        Ok(output
            .stdout
            .lines()
            .next()
            .unwrap_or("Unknown version")
            .to_string())
    }
}

#[async_trait]
impl Muxer for FfmpegMuxer {
    async fn burn_subtitles(&self, video_in: &Path, srt_in: &Path, video_out: &Path) -> Result<()> {
        info!(
            "Burning subtitles from {} into {} -> {}",
            srt_in.display(),
            video_in.display(),
            video_out.display()
        );

        self.command_builder
            .burn_subtitles(video_in, srt_in, video_out, &self.config.subtitle_options)
            .execute()
            .await?;

        info!("Subtitle burn-in completed");
        Ok(())
    }

    async fn mux_dub(
        &self,
        video_in: &Path,
        dub_audio_in: &Path,
        srt_in: &Path,
        video_out: &Path,
    ) -> Result<()> {
        info!(
            "Mixing dub {} with {} -> {}",
            dub_audio_in.display(),
            video_in.display(),
            video_out.display()
        );

        self.command_builder
            .mux_dub(video_in, dub_audio_in, srt_in, video_out, &self.config.subtitle_options)
            .execute()
            .await?;

        info!("Dub mixing completed");
        Ok(())
    }

    async fn concat_audio(&self, manifest: &Path, audio_out: &Path) -> Result<()> {
        info!("Concatenating audio clips -> {}", audio_out.display());

        self.command_builder.concat_audio(manifest, audio_out).execute().await?;
        Ok(())
    }
}
