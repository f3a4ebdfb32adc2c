use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

use super::SpeechSynthesizer;
use crate::config::SynthesisConfig;
use crate::error::{Result, SubdubError};
use crate::media::MediaCommand;

/// Speech synthesis through the `edge-tts` command line tool with a fixed voice
pub struct EdgeTtsSynthesizer {
    config: SynthesisConfig,
}

impl EdgeTtsSynthesizer {
    pub fn new(config: SynthesisConfig) -> Self {
        Self { config }
    }

    fn clip_command(&self, text: &str, destination: &Path) -> MediaCommand {
        MediaCommand::new(&self.config.binary_path, "Speech synthesis")
            .arg("--voice")
            .arg(&self.config.voice)
            .arg(format!("--text={}", text))
            .arg("--write-media")
            .path(destination)
    }
}

#[async_trait]
impl SpeechSynthesizer for EdgeTtsSynthesizer {
    async fn synthesize_clip(&self, text: &str, destination: &Path) -> Result<()> {
        let output = self
            .clip_command(text, destination)
            .run()
            .await
            .map_err(|e| SubdubError::Synthesis(e.to_string()))?;

        if !output.success() {
            return Err(SubdubError::Synthesis(format!(
                "edge-tts failed: {}",
                output.stderr.trim()
            )));
        }

        debug!("Clip written to {}", destination.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(binary: &str) -> SynthesisConfig {
        SynthesisConfig {
            binary_path: binary.to_string(),
            voice: "zh-CN-YunxiNeural".to_string(),
            concurrency: 1,
        }
    }

    #[test]
    fn test_clip_command_uses_fixed_voice() {
        let synthesizer = EdgeTtsSynthesizer::new(config("edge-tts"));
        let cmd = synthesizer.clip_command("你好", Path::new("/s/clip_00000.mp3"));

        assert_eq!(
            cmd.args,
            vec!["--voice", "zh-CN-YunxiNeural", "--text=你好", "--write-media", "/s/clip_00000.mp3"]
        );
    }

    #[test]
    fn test_dash_leading_text_stays_one_argument() {
        let synthesizer = EdgeTtsSynthesizer::new(config("edge-tts"));
        let cmd = synthesizer.clip_command("-你好", Path::new("/s/clip_00003.mp3"));

        assert_eq!(cmd.args[2], "--text=-你好");
        assert_eq!(cmd.args.len(), 5);
    }

    #[tokio::test]
    async fn test_missing_binary_is_synthesis_error() {
        let synthesizer = EdgeTtsSynthesizer::new(config("/nonexistent/edge-tts"));
        let err = synthesizer
            .synthesize_clip("你好", Path::new("clip.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, SubdubError::Synthesis(_)));
    }
}
