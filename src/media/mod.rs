// Media muxing through an external tool (ffmpeg)
//
// - Commands: command builders, filter-path escaping and the captured subprocess runner
// - Processor: the ffmpeg-backed `Muxer`

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use std::path::Path;

pub use commands::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::Result;

/// Muxing operations the pipeline relies on. Failures are `SubdubError::Mux`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Muxer: Send + Sync {
    /// Burn subtitles into the video, keeping the original audio stream as-is
    async fn burn_subtitles(&self, video_in: &Path, srt_in: &Path, video_out: &Path) -> Result<()>;

    /// Mix the dubbed track over the attenuated original audio and burn subtitles
    async fn mux_dub(
        &self,
        video_in: &Path,
        dub_audio_in: &Path,
        srt_in: &Path,
        video_out: &Path,
    ) -> Result<()>;

    /// Concatenate the audio files named in a concat manifest into one file
    async fn concat_audio(&self, manifest: &Path, audio_out: &Path) -> Result<()>;
}

/// Factory for creating muxer instances
pub struct MuxerFactory;

impl MuxerFactory {
    /// Create the default muxer implementation (FFmpeg-based)
    pub fn create_muxer(config: MediaConfig) -> Box<dyn Muxer> {
        Box::new(processor::FfmpegMuxer::new(config))
    }
}
