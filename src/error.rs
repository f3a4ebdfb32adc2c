use thiserror::Error;

use crate::pipeline::Stage;

#[derive(Error, Debug)]
pub enum SubdubError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    /// Non-zero exit from the media tool, with its captured diagnostics.
    #[error("ffmpeg failed (exit {}): {}", .exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string()), .stderr.trim())]
    Mux {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Internal consistency error: {0}")]
    Consistency(String),

    #[error("{stage} timed out after {seconds}s")]
    Timeout { stage: Stage, seconds: u64 },

    #[error("Pipeline cancelled")]
    Cancelled,

    /// Terminal `Failed(stage, cause)` state of a pipeline run.
    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<SubdubError>,
    },
}

impl SubdubError {
    /// Attach the stage a failure happened in. Already-staged errors keep their original stage.
    pub fn at(self, stage: Stage) -> Self {
        match self {
            staged @ SubdubError::Stage { .. } => staged,
            other => SubdubError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage a pipeline failure was attributed to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            SubdubError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The underlying cause with any stage wrapper removed.
    pub fn cause(&self) -> &SubdubError {
        match self {
            SubdubError::Stage { source, .. } => source.cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, SubdubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mux_error_includes_diagnostics() {
        let err = SubdubError::Mux {
            exit_code: Some(1),
            stderr: "No such filter: 'subtitles'\n".to_string(),
        };
        assert_eq!(err.to_string(), "ffmpeg failed (exit 1): No such filter: 'subtitles'");
    }

    #[test]
    fn test_stage_wrapping_keeps_first_stage() {
        let err = SubdubError::Translation("count mismatch".to_string())
            .at(Stage::Translating)
            .at(Stage::Muxing);

        assert_eq!(err.stage(), Some(Stage::Translating));
        assert!(matches!(err.cause(), SubdubError::Translation(_)));
        assert_eq!(err.to_string(), "translating failed: Translation error: count mismatch");
    }
}
