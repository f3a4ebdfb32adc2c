use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SubdubError};

/// A span of speech with its text, in seconds from the start of the media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl TimedSegment {
    pub fn new<S: Into<String>>(start: f64, end: f64, text: S) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Same timing, different text.
    pub fn with_text<S: Into<String>>(&self, text: S) -> Self {
        Self::new(self.start, self.end, text)
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Whisper model size. Larger models are slower but more accurate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    Tiny,
    #[default]
    Base,
    Small,
    Medium,
    Large,
}

impl ModelSize {
    pub const ALL: [ModelSize; 5] = [
        ModelSize::Tiny,
        ModelSize::Base,
        ModelSize::Small,
        ModelSize::Medium,
        ModelSize::Large,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
        }
    }
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelSize {
    type Err = SubdubError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "tiny" => Ok(ModelSize::Tiny),
            "base" => Ok(ModelSize::Base),
            "small" => Ok(ModelSize::Small),
            "medium" => Ok(ModelSize::Medium),
            "large" => Ok(ModelSize::Large),
            _ => Err(SubdubError::Validation(format!(
                "Invalid whisper model '{}'. Valid models: tiny, base, small, medium, large",
                s
            ))),
        }
    }
}

/// What the pipeline produces besides the subtitle file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Burn subtitles into the video, keep the original audio.
    #[default]
    Subs,
    /// Subtitles plus a synthesized Chinese voice-over mixed over the original audio.
    Dub,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Subs => f.write_str("subs"),
            Mode::Dub => f.write_str("dub"),
        }
    }
}

impl FromStr for Mode {
    type Err = SubdubError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "subs" => Ok(Mode::Subs),
            "dub" => Ok(Mode::Dub),
            _ => Err(SubdubError::Validation(format!(
                "Invalid mode '{}'. Valid modes: subs, dub",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_size_parsing() {
        assert_eq!("Medium".parse::<ModelSize>().unwrap(), ModelSize::Medium);
        assert_eq!(" tiny ".parse::<ModelSize>().unwrap(), ModelSize::Tiny);
        assert!("huge".parse::<ModelSize>().is_err());
        assert_eq!(ModelSize::default(), ModelSize::Base);
    }

    #[test]
    fn test_mode_serde_names() {
        assert_eq!(serde_json::to_string(&Mode::Dub).unwrap(), "\"dub\"");
        let mode: Mode = serde_json::from_str("\"subs\"").unwrap();
        assert_eq!(mode, Mode::Subs);
    }

    #[test]
    fn test_blank_segment() {
        assert!(TimedSegment::new(0.0, 1.0, "  \n").is_blank());
        assert!(!TimedSegment::new(0.0, 1.0, " hi ").is_blank());
    }
}
