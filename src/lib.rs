//! subdub - English videos to bilingual (English + Chinese) subtitled videos
//!
//! Each video goes through local speech recognition (whisper-cpp), batched machine
//! translation (ollama), subtitle generation, and ffmpeg muxing. Dub mode also
//! synthesizes a Chinese voice-over (edge-tts) and mixes it over the original audio.

pub mod cancel;
pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod models;
pub mod pipeline;
pub mod segment;
pub mod setup;
pub mod subtitle;
pub mod synthesize;
pub mod tools;
pub mod transcribe;
pub mod translate;
pub mod workspace;

pub use error::{Result, SubdubError};
