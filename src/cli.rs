use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::segment::{Mode, ModelSize};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Workspace root holding video_input/, video_output/ and srt_output/
    #[arg(short, long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the workspace folders
    Setup,

    /// List videos waiting in video_input/
    List,

    /// Process one video from video_input/
    Process {
        /// File name inside video_input/ (e.g. lecture.mp4)
        filename: String,

        /// subs: burn bilingual subtitles; dub: also add a Chinese voice-over
        #[arg(short, long, value_enum, default_value_t = Mode::Subs)]
        mode: Mode,

        /// Whisper model size
        #[arg(long, value_enum, default_value_t = ModelSize::Base)]
        model: ModelSize,

        /// Chinese-only subtitles instead of English + Chinese
        #[arg(long)]
        monolingual: bool,
    },

    /// Process every video in video_input/
    Batch {
        /// subs: burn bilingual subtitles; dub: also add a Chinese voice-over
        #[arg(short, long, value_enum, default_value_t = Mode::Subs)]
        mode: Mode,

        /// Whisper model size
        #[arg(long, value_enum, default_value_t = ModelSize::Tiny)]
        model: ModelSize,
    },

    /// List available whisper models and their status
    Models {
        /// Download all missing models
        #[arg(short, long)]
        download: bool,
    },

    /// Write a default configuration file
    InitConfig {
        /// Output path for the configuration file
        path: PathBuf,
    },
}

impl Commands {
    /// Commands that run the video pipeline and stop cooperatively on Ctrl-C
    pub fn runs_pipeline(&self) -> bool {
        matches!(self, Commands::Process { .. } | Commands::Batch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_defaults() {
        let args = Args::parse_from(["subdub", "process", "talk.mp4"]);
        match args.command {
            Commands::Process {
                filename,
                mode,
                model,
                monolingual,
            } => {
                assert_eq!(filename, "talk.mp4");
                assert_eq!(mode, Mode::Subs);
                assert_eq!(model, ModelSize::Base);
                assert!(!monolingual);
            }
            _ => panic!("expected process command"),
        }
    }

    #[test]
    fn test_batch_with_global_flags() {
        let args = Args::parse_from(["subdub", "batch", "--mode", "dub", "--model", "small", "--root", "/work", "-v"]);
        assert!(args.verbose);
        assert_eq!(args.root, Some(PathBuf::from("/work")));
        match args.command {
            Commands::Batch { mode, model } => {
                assert_eq!(mode, Mode::Dub);
                assert_eq!(model, ModelSize::Small);
            }
            _ => panic!("expected batch command"),
        }
    }

    #[test]
    fn test_only_pipeline_commands_trap_interrupts() {
        let pipeline = ["process a.mp4", "batch"];
        let plain = ["models --download", "setup", "list", "init-config subdub.toml"];

        for line in pipeline {
            let args = Args::parse_from(std::iter::once("subdub").chain(line.split(' ')));
            assert!(args.command.runs_pipeline(), "{line}");
        }
        for line in plain {
            let args = Args::parse_from(std::iter::once("subdub").chain(line.split(' ')));
            assert!(!args.command.runs_pipeline(), "{line}");
        }
    }

    #[test]
    fn test_rejects_unknown_model() {
        assert!(Args::try_parse_from(["subdub", "process", "a.mp4", "--model", "huge"]).is_err());
    }
}
