use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, SubdubError};

/// Captured result of an external tool invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// External tool command representation (ffmpeg, whisper-cli, edge-tts)
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add a path argument
    pub fn path<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").path(path)
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.path(path)
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Copy audio stream
    pub fn copy_audio(self) -> Self {
        self.audio_codec("copy")
    }

    /// Disable video
    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    /// Set audio sample rate
    pub fn audio_sample_rate(self, rate: u32) -> Self {
        self.arg("-ar").arg(rate.to_string())
    }

    /// Set audio channels
    pub fn audio_channels(self, channels: u32) -> Self {
        self.arg("-ac").arg(channels.to_string())
    }

    /// Add video filter
    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    /// Add a complex filter graph
    pub fn filter_complex<S: Into<String>>(self, graph: S) -> Self {
        self.arg("-filter_complex").arg(graph)
    }

    /// Map a stream or filter-graph label into the output
    pub fn map<S: Into<String>>(self, label: S) -> Self {
        self.arg("-map").arg(label)
    }

    /// Run the command, capturing stdout and stderr.
    ///
    /// Only a failure to start the process is an `Err`; a non-zero exit is reported
    /// in the returned output. The child is killed if the returned future is dropped.
    pub async fn run(&self) -> Result<CommandOutput> {
        debug!("Executing {}: {} {:?}", self.description, self.binary_path, self.args);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                SubdubError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to execute {}: {}", self.binary_path, e),
                ))
            })?;

        let output = CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        debug!("{} exit status: {:?}", self.description, output.exit_code);

        Ok(output)
    }

    /// Execute the command as a media-tool step; non-zero exit is a `Mux` error.
    pub async fn execute(&self) -> Result<CommandOutput> {
        let output = self.run().await?;

        if !output.success() {
            return Err(SubdubError::Mux {
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }

        Ok(output)
    }
}

/// Escape a path for embedding inside a filter-graph string such as `subtitles='...'`.
///
/// Windows verbatim prefixes (`\\?\`) are dropped, backslashes become forward slashes,
/// then `:` and `'` are backslash-escaped.
pub fn escape_filter_path(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let plain = match raw.strip_prefix(r"\\?\UNC\") {
        Some(share) => format!(r"\\{}", share),
        None => raw.strip_prefix(r"\\?\").unwrap_or(&*raw).to_string(),
    };
    plain
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', "\\'")
}

/// `subtitles='<escaped path>'` filter for burning in an SRT file.
pub fn subtitles_filter(srt_path: &Path) -> String {
    format!("subtitles='{}'", escape_filter_path(srt_path))
}

/// Builder for the media operations the pipeline needs
pub struct MediaCommandBuilder {
    binary_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Burn subtitles into the video, copying the original audio stream untouched
    pub fn burn_subtitles(
        &self,
        video_path: &Path,
        subtitle_path: &Path,
        output_path: &Path,
        additional_options: &[String],
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Subtitle burn-in")
            .overwrite()
            .input(video_path)
            .video_filter(subtitles_filter(subtitle_path))
            .copy_audio()
            .args(additional_options.iter().cloned())
            .output(output_path)
    }

    /// Mix the dub over the original audio at 10% and burn subtitles, re-encoding both streams
    pub fn mux_dub(
        &self,
        video_path: &Path,
        dub_audio_path: &Path,
        subtitle_path: &Path,
        output_path: &Path,
        additional_options: &[String],
    ) -> MediaCommand {
        let graph = format!(
            "[0:a]volume=0.1[original];[original][1:a]amix=inputs=2:duration=longest[audio];[0:v]{}[video]",
            subtitles_filter(subtitle_path)
        );

        MediaCommand::new(&self.binary_path, "Dub mixing")
            .overwrite()
            .input(video_path)
            .input(dub_audio_path)
            .filter_complex(graph)
            .map("[video]")
            .map("[audio]")
            .video_codec("libx264")
            .audio_codec("aac")
            .args(additional_options.iter().cloned())
            .output(output_path)
    }

    /// Concatenate the files listed in a concat-demuxer manifest without re-encoding
    pub fn concat_audio(&self, manifest_path: &Path, output_path: &Path) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Audio concatenation")
            .overwrite()
            .arg("-f")
            .arg("concat")
            .arg("-safe")
            .arg("0")
            .input(manifest_path)
            .arg("-c")
            .arg("copy")
            .output(output_path)
    }

    /// Extract 16 kHz mono PCM audio, the input format whisper.cpp expects
    pub fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Audio extraction")
            .overwrite()
            .input(video_path)
            .no_video()
            .audio_codec("pcm_s16le")
            .audio_sample_rate(16000)
            .audio_channels(1)
            .output(audio_path)
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check").arg("-version")
    }
}
