use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, SubdubError};

fn default_batch_size() -> usize {
    8
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_synthesis_concurrency() -> usize {
    1
}

fn default_bilingual() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub transcriber: TranscriberConfig,
    pub translate: TranslateConfig,
    pub synthesis: SynthesisConfig,
    pub media: MediaConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    /// Path to whisper.cpp binary (e.g., whisper-cli)
    pub binary_path: String,
    /// Directory holding ggml model files; missing models are downloaded here
    pub models_dir: PathBuf,
    /// Forced source language
    pub language: String,
    /// Worker threads passed to whisper.cpp (whisper default when unset)
    #[serde(default)]
    pub threads: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// Ollama endpoint URL
    pub endpoint: String,
    /// LLM model to use for translation
    pub model: String,
    /// Number of lines sent per translation request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Maximum retries for failed HTTP requests (malformed responses are never retried)
    pub max_retries: u32,
    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Path to edge-tts binary
    pub binary_path: String,
    /// Voice used for every clip
    pub voice: String,
    /// Clips synthesized at once; order is restored before concatenation
    #[serde(default = "default_synthesis_concurrency")]
    pub concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Additional encoding options for subtitle burn-in
    /// Common options: ["-preset", "medium", "-crf", "23", "-pix_fmt", "yuv420p"]
    pub subtitle_options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Stack English above Chinese in each cue
    #[serde(default = "default_bilingual")]
    pub bilingual: bool,
    /// Upper bound for any single stage; unbounded when unset
    #[serde(default)]
    pub stage_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Directory containing video_input/, video_output/ and srt_output/
    pub root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transcriber: TranscriberConfig {
                binary_path: "whisper-cli".to_string(),
                models_dir: PathBuf::from(".subdub").join("models"),
                language: "en".to_string(),
                threads: None,
            },
            translate: TranslateConfig {
                endpoint: "http://localhost:11434".to_string(),
                model: "qwen2.5:7b".to_string(),
                batch_size: default_batch_size(),
                max_retries: 3,
                request_timeout_secs: default_request_timeout_secs(),
            },
            synthesis: SynthesisConfig {
                binary_path: "edge-tts".to_string(),
                voice: "zh-CN-YunxiNeural".to_string(),
                concurrency: default_synthesis_concurrency(),
            },
            media: MediaConfig {
                binary_path: "ffmpeg".to_string(),
                subtitle_options: vec![
                    // Example encoding options users can customize:
                    // "-preset".to_string(), "medium".to_string(),
                    // "-crf".to_string(), "23".to_string(),
                ],
            },
            pipeline: PipelineConfig::default(),
            workspace: WorkspaceConfig::default(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bilingual: default_bilingual(),
            stage_timeout_secs: None,
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
        }
    }
}

impl PipelineConfig {
    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubdubError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| SubdubError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SubdubError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SubdubError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.translate.batch_size == 0 {
            return Err(SubdubError::Config("translate.batch_size must be at least 1".to_string()));
        }
        if self.synthesis.concurrency == 0 {
            return Err(SubdubError::Config("synthesis.concurrency must be at least 1".to_string()));
        }
        Ok(())
    }
}
