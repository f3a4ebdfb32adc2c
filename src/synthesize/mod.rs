// Chinese voice-over synthesis
//
// - EdgeTts: edge-tts command line implementation
//
// The voice track is a straight concatenation of per-segment clips in transcript
// order. It is not stretched or padded to the original segment timings.

pub mod edge_tts;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt, stream};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub use edge_tts::*;

use crate::error::{Result, SubdubError};
use crate::media::Muxer;
use crate::segment::TimedSegment;

/// Text-to-speech for one short clip
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Write synthesized speech for `text` to `destination`
    async fn synthesize_clip(&self, text: &str, destination: &Path) -> Result<()>;
}

/// Files removed when dropped; missing files are ignored and other failures only logged.
struct ScratchFiles {
    paths: Vec<PathBuf>,
}

impl ScratchFiles {
    fn new() -> Self {
        Self { paths: Vec::new() }
    }

    fn track(&mut self, path: PathBuf) {
        self.paths.push(path);
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        for path in &self.paths {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove scratch file {}: {}", path.display(), e),
            }
        }
    }
}

/// Synthesize every non-blank segment and concatenate the clips into `destination`.
///
/// Clips and the concat manifest live in `scratch_dir` and are removed before this
/// returns, on success and on failure.
pub async fn synthesize_track(
    synthesizer: &dyn SpeechSynthesizer,
    muxer: &dyn Muxer,
    segments: &[TimedSegment],
    destination: &Path,
    scratch_dir: &Path,
    concurrency: usize,
) -> Result<()> {
    let mut scratch = ScratchFiles::new();

    let clips: Vec<(usize, &str, PathBuf)> = segments
        .iter()
        .enumerate()
        .filter(|(_, segment)| !segment.is_blank())
        .map(|(index, segment)| {
            (index, segment.text.trim(), scratch_dir.join(format!("clip_{:05}.mp3", index)))
        })
        .collect();

    if clips.is_empty() {
        return Err(SubdubError::Synthesis(
            "no non-blank segments to synthesize".to_string(),
        ));
    }

    for (_, _, path) in &clips {
        scratch.track(path.clone());
    }

    info!(
        "Synthesizing {} clips ({} blank segments skipped)",
        clips.len(),
        segments.len() - clips.len()
    );

    let progress = ProgressBar::new(clips.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Synthesizing audio [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .map_err(|e| SubdubError::Synthesis(e.to_string()))?
            .progress_chars("#>-"),
    );

    let clip_paths: Vec<PathBuf> = stream::iter(clips)
        .map(|(index, text, path)| {
            let progress = progress.clone();
            async move {
                debug!("Synthesizing clip {}: {}", index, text);
                synthesizer.synthesize_clip(text, &path).await.map_err(|e| match e {
                    SubdubError::Synthesis(msg) => {
                        SubdubError::Synthesis(format!("segment {}: {}", index + 1, msg))
                    }
                    other => SubdubError::Synthesis(format!("segment {}: {}", index + 1, other)),
                })?;
                progress.inc(1);
                Ok::<PathBuf, SubdubError>(path)
            }
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;
    progress.finish_and_clear();

    let manifest_path = scratch_dir.join("concat_list.txt");
    scratch.track(manifest_path.clone());
    tokio::fs::write(&manifest_path, concat_manifest(&clip_paths)).await?;

    muxer
        .concat_audio(&manifest_path, destination)
        .await
        .map_err(|e| SubdubError::Synthesis(format!("clip concatenation failed: {}", e)))?;

    info!("Dubbed audio saved to: {}", destination.display());
    Ok(())
}

/// ffmpeg concat-demuxer manifest listing `clips` in order
pub fn concat_manifest(clips: &[PathBuf]) -> String {
    clips
        .iter()
        .map(|clip| {
            let path = clip.to_string_lossy().replace('\\', "/").replace('\'', "'\\''");
            format!("file '{}'\n", path)
        })
        .collect()
}
