// Speech recognition
//
// - WhisperCpp: whisper.cpp command line implementation
//
// Implementations must return segments sorted by start time; downstream stages
// never re-sort.

pub mod whisper_cpp;

use async_trait::async_trait;
use std::path::Path;

pub use whisper_cpp::*;

use crate::error::Result;
use crate::segment::TimedSegment;

/// English speech recognition over an audio or video file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the media file in English, ordered by start time
    async fn transcribe(&self, media_path: &Path) -> Result<Vec<TimedSegment>>;
}
