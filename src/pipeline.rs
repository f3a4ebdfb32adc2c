//! Per-video pipeline: validate, transcribe, translate, merge, write subtitles, then
//! either burn subtitles in or synthesize a voice-over and mix it.
//!
//! Stages run strictly one after another. Each stage checks the cancellation token
//! before it starts and may be bounded by a timeout. Any failure ends the run as
//! `SubdubError::Stage { stage, source }`.

use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::cancel::CancellationToken;
use crate::config::Config;
use crate::error::{Result, SubdubError};
use crate::media::{Muxer, MuxerFactory};
use crate::models::ModelRegistry;
use crate::segment::{Mode, ModelSize, TimedSegment};
use crate::subtitle::{merge_bilingual, write_srt};
use crate::synthesize::{EdgeTtsSynthesizer, SpeechSynthesizer, synthesize_track};
use crate::translate::translate_batch;
use crate::workspace::check_video_file;

pub const VIDEO_SUFFIX: &str = "_bilingual.mp4";
pub const SRT_SUFFIX: &str = "_bilingual.srt";
pub const DUB_SUFFIX: &str = "_dub.mp3";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validating,
    Transcribing,
    Translating,
    Merging,
    WritingSubtitles,
    Synthesizing,
    Muxing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validating => "validating",
            Stage::Transcribing => "transcribing",
            Stage::Translating => "translating",
            Stage::Merging => "merging",
            Stage::WritingSubtitles => "writing subtitles",
            Stage::Synthesizing => "synthesizing",
            Stage::Muxing => "muxing",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub video_path: PathBuf,
    pub video_output_dir: PathBuf,
    pub srt_output_dir: PathBuf,
    pub mode: Mode,
    pub model_size: ModelSize,
    pub bilingual: bool,
}

impl PipelineRequest {
    pub fn new<P1, P2, P3>(video_path: P1, video_output_dir: P2, srt_output_dir: P3) -> Self
    where
        P1: Into<PathBuf>,
        P2: Into<PathBuf>,
        P3: Into<PathBuf>,
    {
        Self {
            video_path: video_path.into(),
            video_output_dir: video_output_dir.into(),
            srt_output_dir: srt_output_dir.into(),
            mode: Mode::default(),
            model_size: ModelSize::default(),
            bilingual: true,
        }
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn model_size(mut self, model_size: ModelSize) -> Self {
        self.model_size = model_size;
        self
    }

    pub fn bilingual(mut self, bilingual: bool) -> Self {
        self.bilingual = bilingual;
        self
    }
}

/// Absolute paths of everything a successful run produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResult {
    pub video_output: PathBuf,
    pub srt_output: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dub_audio: Option<PathBuf>,
}

/// Output locations derived from the input's base name; reruns overwrite them.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPaths {
    pub video: PathBuf,
    pub srt: PathBuf,
    pub dub_audio: PathBuf,
}

impl OutputPaths {
    pub fn derive(video_path: &Path, video_output_dir: &Path, srt_output_dir: &Path) -> Result<Self> {
        let stem = video_path
            .file_stem()
            .ok_or_else(|| SubdubError::Validation(format!("Invalid video filename: {}", video_path.display())))?
            .to_string_lossy();

        Ok(Self {
            video: video_output_dir.join(format!("{}{}", stem, VIDEO_SUFFIX)),
            srt: srt_output_dir.join(format!("{}{}", stem, SRT_SUFFIX)),
            dub_audio: video_output_dir.join(format!("{}{}", stem, DUB_SUFFIX)),
        })
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub batch_size: usize,
    pub synthesis_concurrency: usize,
    pub stage_timeout: Option<Duration>,
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            batch_size: config.translate.batch_size,
            synthesis_concurrency: config.synthesis.concurrency,
            stage_timeout: config.pipeline.stage_timeout(),
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            batch_size: 8,
            synthesis_concurrency: 1,
            stage_timeout: None,
        }
    }
}

/// Validated, absolute view of a request
struct ValidatedRequest {
    video_path: PathBuf,
    video_output_dir: PathBuf,
    outputs: OutputPaths,
}

pub struct Pipeline {
    registry: Arc<ModelRegistry>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    muxer: Arc<dyn Muxer>,
    options: PipelineOptions,
    cancel: CancellationToken,
}

impl Pipeline {
    /// Pipeline using edge-tts and ffmpeg as configured
    pub fn new(config: &Config, registry: Arc<ModelRegistry>) -> Self {
        Self::with_components(
            registry,
            Arc::new(EdgeTtsSynthesizer::new(config.synthesis.clone())),
            Arc::from(MuxerFactory::create_muxer(config.media.clone())),
            PipelineOptions::from_config(config),
        )
    }

    pub fn with_components(
        registry: Arc<ModelRegistry>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        muxer: Arc<dyn Muxer>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            registry,
            synthesizer,
            muxer,
            options,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Process one video
    pub async fn run(&self, request: &PipelineRequest) -> Result<PipelineResult> {
        let span = info_span!(
            "pipeline",
            run = %Uuid::new_v4(),
            video = %request.video_path.display()
        );

        self.run_stages(request).instrument(span).await
    }

    async fn run_stages(&self, request: &PipelineRequest) -> Result<PipelineResult> {
        let validated = self
            .stage(Stage::Validating, async { validate(request).await })
            .await?;
        let video_path = validated.video_path.as_path();
        let outputs = &validated.outputs;

        let english = self
            .stage(Stage::Transcribing, async {
                let transcriber = self.registry.get_transcriber(request.model_size).await?;
                transcriber.transcribe(video_path).await
            })
            .await?;
        info!("Transcribed {} English segments", english.len());

        let chinese = self
            .stage(Stage::Translating, async {
                let translator = self.registry.get_translator().await?;
                let texts: Vec<String> = english.iter().map(|s| s.text.clone()).collect();
                let translations = translate_batch(translator.as_ref(), &texts, self.options.batch_size).await?;
                pair_translations(&english, translations)
            })
            .await?;

        let cues = self
            .stage(Stage::Merging, async {
                let cues = if request.bilingual {
                    merge_bilingual(&english, &chinese)?
                } else {
                    chinese.clone()
                };
                Ok(drop_blank_cues(cues))
            })
            .await?;

        self.stage(Stage::WritingSubtitles, write_srt(&cues, &outputs.srt))
            .await?;

        let dub_audio = match request.mode {
            Mode::Subs => {
                self.stage(Stage::Muxing, async {
                    self.muxer
                        .burn_subtitles(video_path, &outputs.srt, &outputs.video)
                        .await?;
                    ensure_produced(&outputs.video)
                })
                .await?;
                None
            }
            Mode::Dub => {
                self.stage(Stage::Synthesizing, async {
                    let scratch = acquire_scratch(&validated.video_output_dir)?;
                    let outcome = synthesize_track(
                        self.synthesizer.as_ref(),
                        self.muxer.as_ref(),
                        &chinese,
                        &outputs.dub_audio,
                        scratch.path(),
                        self.options.synthesis_concurrency,
                    )
                    .await;
                    release_scratch(scratch);
                    outcome?;
                    ensure_produced(&outputs.dub_audio)
                })
                .await?;

                self.stage(Stage::Muxing, async {
                    self.muxer
                        .mux_dub(video_path, &outputs.dub_audio, &outputs.srt, &outputs.video)
                        .await?;
                    ensure_produced(&outputs.video)
                })
                .await?;
                Some(outputs.dub_audio.clone())
            }
        };

        info!("Done! Output file: {}", outputs.video.display());
        Ok(PipelineResult {
            video_output: outputs.video.clone(),
            srt_output: outputs.srt.clone(),
            dub_audio,
        })
    }

    /// Run one stage: cancellation check, optional timeout, failure attributed to `stage`
    async fn stage<T, F>(&self, stage: Stage, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.cancel.checkpoint().map_err(|e| e.at(stage))?;
        info!("Stage: {}", stage);

        let result = match self.options.stage_timeout {
            Some(limit) => match tokio::time::timeout(limit, work).await {
                Ok(result) => result,
                Err(_) => Err(SubdubError::Timeout {
                    stage,
                    seconds: limit.as_secs(),
                }),
            },
            None => work.await,
        };

        result.map_err(|e| {
            warn!("Stage {} failed: {}", stage, e);
            e.at(stage)
        })
    }
}

async fn validate(request: &PipelineRequest) -> Result<ValidatedRequest> {
    let video_path = &request.video_path;

    check_video_file(video_path, &video_path.display().to_string()).await?;

    for dir in [&request.video_output_dir, &request.srt_output_dir] {
        if !tokio::fs::metadata(dir).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Err(SubdubError::Validation(format!(
                "Output directory does not exist: {}",
                dir.display()
            )));
        }
    }

    // No verbatim `\\?\` prefix on Windows: these paths end up inside ffmpeg filter strings
    let video_path = std::path::absolute(video_path)?;
    let video_output_dir = std::path::absolute(&request.video_output_dir)?;
    let srt_output_dir = std::path::absolute(&request.srt_output_dir)?;
    let outputs = OutputPaths::derive(&video_path, &video_output_dir, &srt_output_dir)?;

    Ok(ValidatedRequest {
        video_path,
        video_output_dir,
        outputs,
    })
}

/// Attach translations to the English timings. Positions whose English text was blank
/// carry no Chinese text, whatever the placeholder translated to.
fn pair_translations(english: &[TimedSegment], translations: Vec<String>) -> Result<Vec<TimedSegment>> {
    if translations.len() != english.len() {
        return Err(SubdubError::Consistency(format!(
            "{} translations for {} segments",
            translations.len(),
            english.len()
        )));
    }

    Ok(english
        .iter()
        .zip(translations)
        .map(|(segment, translation)| {
            if segment.is_blank() {
                segment.with_text("")
            } else {
                segment.with_text(translation)
            }
        })
        .collect())
}

/// Positions with nothing recognized would render as cues without a text line
fn drop_blank_cues(cues: Vec<TimedSegment>) -> Vec<TimedSegment> {
    let total = cues.len();
    let kept: Vec<TimedSegment> = cues.into_iter().filter(|cue| !cue.is_blank()).collect();
    if kept.len() < total {
        info!("Skipped {} cues without text", total - kept.len());
    }
    kept
}

fn acquire_scratch(parent: &Path) -> Result<TempDir> {
    let scratch = tempfile::Builder::new()
        .prefix(".subdub-scratch-")
        .tempdir_in(parent)?;
    info!("Scratch directory: {}", scratch.path().display());
    Ok(scratch)
}

fn release_scratch(scratch: TempDir) {
    let path = scratch.path().to_path_buf();
    if let Err(e) = scratch.close() {
        warn!("Failed to remove scratch directory {}: {}", path.display(), e);
    }
}

fn ensure_produced(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(SubdubError::Mux {
            exit_code: Some(0),
            stderr: format!("expected output was not created: {}", path.display()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MockMuxer;
    use crate::synthesize::MockSpeechSynthesizer;
    use crate::transcribe::{MockTranscriber, Transcriber};
    use crate::translate::{MockTranslator, Translator};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Fixture {
        _root: tempfile::TempDir,
        input: PathBuf,
        video_dir: PathBuf,
        srt_dir: PathBuf,
    }

    fn fixture(filename: &str) -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let input_dir = root.path().join("video_input");
        let video_dir = root.path().join("video_output");
        let srt_dir = root.path().join("srt_output");
        for dir in [&input_dir, &video_dir, &srt_dir] {
            std::fs::create_dir_all(dir).unwrap();
        }
        let input = input_dir.join(filename);
        std::fs::write(&input, b"not really a video").unwrap();

        Fixture {
            _root: root,
            input,
            video_dir,
            srt_dir,
        }
    }

    impl Fixture {
        fn request(&self) -> PipelineRequest {
            PipelineRequest::new(&self.input, &self.video_dir, &self.srt_dir)
        }
    }

    fn english() -> Vec<TimedSegment> {
        vec![
            TimedSegment::new(0.0, 2.0, "Hello everyone."),
            TimedSegment::new(2.0, 3.0, " "),
            TimedSegment::new(3.0, 5.5, "Thanks for watching."),
        ]
    }

    fn transcriber_returning(segments: Vec<TimedSegment>) -> Arc<dyn Transcriber> {
        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .returning(move |_| Ok(segments.clone()));
        Arc::new(transcriber)
    }

    fn dictionary_translator() -> Arc<dyn Translator> {
        let mut translator = MockTranslator::new();
        translator.expect_translate_chunk().returning(|texts| {
            Ok(texts
                .iter()
                .map(|t| match t.as_str() {
                    "Hello everyone." => "大家好。".to_string(),
                    "Thanks for watching." => "感谢观看。".to_string(),
                    _ => "。".to_string(),
                })
                .collect())
        });
        Arc::new(translator)
    }

    fn writing_muxer() -> MockMuxer {
        let mut muxer = MockMuxer::new();
        muxer.expect_burn_subtitles().returning(|_, _, out| {
            std::fs::write(out, b"video")?;
            Ok(())
        });
        muxer.expect_mux_dub().returning(|_, _, _, out| {
            std::fs::write(out, b"video")?;
            Ok(())
        });
        muxer.expect_concat_audio().returning(|_, out| {
            std::fs::write(out, b"audio")?;
            Ok(())
        });
        muxer
    }

    fn pipeline(
        transcriber: Arc<dyn Transcriber>,
        translator: Arc<dyn Translator>,
        synthesizer: MockSpeechSynthesizer,
        muxer: MockMuxer,
    ) -> Pipeline {
        Pipeline::with_components(
            Arc::new(ModelRegistry::preloaded(transcriber, translator)),
            Arc::new(synthesizer),
            Arc::new(muxer),
            PipelineOptions::default(),
        )
    }

    fn no_synthesis() -> MockSpeechSynthesizer {
        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer.expect_synthesize_clip().never();
        synthesizer
    }

    fn scratch_dirs(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".subdub-scratch-"))
            .count()
    }

    #[test]
    fn test_output_paths_are_derived_from_stem() {
        let paths = OutputPaths::derive(
            Path::new("/in/My Talk.mov"),
            Path::new("/out/video"),
            Path::new("/out/srt"),
        )
        .unwrap();

        assert_eq!(paths.video, PathBuf::from("/out/video/My Talk_bilingual.mp4"));
        assert_eq!(paths.srt, PathBuf::from("/out/srt/My Talk_bilingual.srt"));
        assert_eq!(paths.dub_audio, PathBuf::from("/out/video/My Talk_dub.mp3"));
    }

    #[tokio::test]
    async fn test_subs_mode_writes_bilingual_srt() {
        let fx = fixture("talk.mp4");
        let pipeline = pipeline(
            transcriber_returning(english()),
            dictionary_translator(),
            no_synthesis(),
            writing_muxer(),
        );

        let result = pipeline.run(&fx.request()).await.unwrap();

        assert!(result.video_output.ends_with("video_output/talk_bilingual.mp4"));
        assert!(result.srt_output.ends_with("srt_output/talk_bilingual.srt"));
        assert!(result.video_output.is_absolute());
        assert_eq!(result.dub_audio, None);

        let srt = std::fs::read_to_string(&result.srt_output).unwrap();
        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:02,000\nHello everyone.\n大家好。\n\n\
             2\n00:00:03,000 --> 00:00:05,500\nThanks for watching.\n感谢观看。\n\n"
        );
    }

    #[test]
    fn test_blank_cues_are_dropped() {
        let cues = vec![
            TimedSegment::new(0.0, 1.0, "你好"),
            TimedSegment::new(1.0, 2.0, "\n"),
            TimedSegment::new(2.0, 3.0, ""),
        ];

        let kept = drop_blank_cues(cues);

        assert_eq!(kept, vec![TimedSegment::new(0.0, 1.0, "你好")]);
    }

    #[tokio::test]
    async fn test_monolingual_uses_chinese_only() {
        let fx = fixture("talk.mp4");
        let pipeline = pipeline(
            transcriber_returning(vec![TimedSegment::new(0.0, 2.0, "Hello everyone.")]),
            dictionary_translator(),
            no_synthesis(),
            writing_muxer(),
        );

        let result = pipeline.run(&fx.request().bilingual(false)).await.unwrap();

        let srt = std::fs::read_to_string(&result.srt_output).unwrap();
        assert_eq!(srt, "1\n00:00:00,000 --> 00:00:02,000\n大家好。\n\n");
    }

    #[tokio::test]
    async fn test_relative_paths_resolve_to_plain_absolute_paths() {
        let root = tempfile::Builder::new()
            .prefix(".subdub-relative-")
            .tempdir_in(".")
            .unwrap();
        let relative = PathBuf::from(root.path().file_name().unwrap());
        for dir in ["video_input", "video_output", "srt_output"] {
            std::fs::create_dir_all(relative.join(dir)).unwrap();
        }
        std::fs::write(relative.join("video_input/talk.mp4"), b"video").unwrap();

        let pipeline = pipeline(
            transcriber_returning(english()),
            dictionary_translator(),
            no_synthesis(),
            writing_muxer(),
        );
        let request = PipelineRequest::new(
            relative.join("video_input/talk.mp4"),
            relative.join("video_output"),
            relative.join("srt_output"),
        );

        let result = pipeline.run(&request).await.unwrap();

        assert!(result.srt_output.is_absolute());
        assert!(!result.srt_output.to_string_lossy().starts_with(r"\\?\"));
        assert!(result.srt_output.ends_with("srt_output/talk_bilingual.srt"));
        assert!(result.video_output.is_file());
    }

    #[tokio::test]
    async fn test_silent_video_produces_empty_srt() {
        let fx = fixture("silence.mp4");
        let mut translator = MockTranslator::new();
        translator.expect_translate_chunk().never();
        let pipeline = pipeline(
            transcriber_returning(Vec::new()),
            Arc::new(translator),
            no_synthesis(),
            writing_muxer(),
        );

        let result = pipeline.run(&fx.request()).await.unwrap();

        assert!(result.srt_output.is_file());
        assert_eq!(std::fs::read_to_string(&result.srt_output).unwrap(), "");
        assert!(result.video_output.is_file());
    }

    #[tokio::test]
    async fn test_dub_mode_synthesizes_chinese_text_only() {
        let fx = fixture("talk.mkv");
        let spoken = Arc::new(Mutex::new(Vec::new()));
        let record = spoken.clone();
        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer.expect_synthesize_clip().returning(move |text, dest| {
            record.lock().unwrap().push(text.to_string());
            std::fs::write(dest, b"clip")?;
            Ok(())
        });

        let pipeline = pipeline(
            transcriber_returning(english()),
            dictionary_translator(),
            synthesizer,
            writing_muxer(),
        );

        let result = pipeline.run(&fx.request().mode(Mode::Dub)).await.unwrap();

        assert_eq!(*spoken.lock().unwrap(), vec!["大家好。", "感谢观看。"]);
        let dub = result.dub_audio.unwrap();
        assert!(dub.ends_with("video_output/talk_dub.mp3"));
        assert!(dub.is_file());
        assert!(result.video_output.is_file());
        assert_eq!(scratch_dirs(&fx.video_dir), 0);
    }

    #[tokio::test]
    async fn test_dub_mux_failure_reports_stage_and_cleans_scratch() {
        let fx = fixture("talk.mp4");
        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer.expect_synthesize_clip().returning(|_, dest| {
            std::fs::write(dest, b"clip")?;
            Ok(())
        });
        let mut muxer = MockMuxer::new();
        muxer.expect_concat_audio().returning(|_, out| {
            std::fs::write(out, b"audio")?;
            Ok(())
        });
        muxer.expect_mux_dub().returning(|_, _, _, _| {
            Err(SubdubError::Mux {
                exit_code: Some(234),
                stderr: "Error initializing filter 'amix'".to_string(),
            })
        });

        let pipeline = pipeline(transcriber_returning(english()), dictionary_translator(), synthesizer, muxer);

        let err = pipeline.run(&fx.request().mode(Mode::Dub)).await.unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Muxing));
        assert!(err.to_string().contains("ffmpeg failed (exit 234): Error initializing filter 'amix'"));
        assert_eq!(scratch_dirs(&fx.video_dir), 0);
    }

    #[tokio::test]
    async fn test_synthesis_failure_cleans_scratch() {
        let fx = fixture("talk.mp4");
        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer
            .expect_synthesize_clip()
            .returning(|_, _| Err(SubdubError::Synthesis("no route to voice service".to_string())));
        let mut muxer = MockMuxer::new();
        muxer.expect_mux_dub().never();

        let pipeline = pipeline(transcriber_returning(english()), dictionary_translator(), synthesizer, muxer);

        let err = pipeline.run(&fx.request().mode(Mode::Dub)).await.unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Synthesizing));
        assert!(matches!(err.cause(), SubdubError::Synthesis(_)));
        assert_eq!(scratch_dirs(&fx.video_dir), 0);
    }

    #[tokio::test]
    async fn test_translation_count_mismatch_stops_before_subtitles() {
        let fx = fixture("talk.mp4");
        let mut translator = MockTranslator::new();
        translator
            .expect_translate_chunk()
            .returning(|_| Ok(vec!["只有一行".to_string()]));
        let mut muxer = MockMuxer::new();
        muxer.expect_burn_subtitles().never();

        let pipeline = pipeline(transcriber_returning(english()), Arc::new(translator), no_synthesis(), muxer);

        let err = pipeline.run(&fx.request()).await.unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Translating));
        assert!(matches!(err.cause(), SubdubError::Translation(_)));
        assert!(!fx.srt_dir.join("talk_bilingual.srt").exists());
    }

    #[tokio::test]
    async fn test_unsupported_extension_touches_nothing() {
        let fx = fixture("notes.txt");
        let mut transcriber = MockTranscriber::new();
        transcriber.expect_transcribe().never();
        let mut muxer = MockMuxer::new();
        muxer.expect_burn_subtitles().never();

        let pipeline = pipeline(Arc::new(transcriber), dictionary_translator(), no_synthesis(), muxer);

        let err = pipeline.run(&fx.request()).await.unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Validating));
        assert!(err.to_string().contains("Supported: .mp4, .mov, .mkv, .avi, .m4v, .webm"));
        assert_eq!(std::fs::read_dir(&fx.srt_dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_file_is_validation_failure() {
        let fx = fixture("talk.mp4");
        let mut transcriber = MockTranscriber::new();
        transcriber.expect_transcribe().never();
        let pipeline = pipeline(Arc::new(transcriber), dictionary_translator(), no_synthesis(), MockMuxer::new());

        let request = PipelineRequest::new(fx.input.with_file_name("gone.mp4"), &fx.video_dir, &fx.srt_dir);
        let err = pipeline.run(&request).await.unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Validating));
        assert!(matches!(err.cause(), SubdubError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let fx = fixture("talk.mp4");
        let token = CancellationToken::new();
        token.cancel();
        let mut transcriber = MockTranscriber::new();
        transcriber.expect_transcribe().never();

        let pipeline = pipeline(Arc::new(transcriber), dictionary_translator(), no_synthesis(), MockMuxer::new())
            .with_cancellation(token);

        let err = pipeline.run(&fx.request()).await.unwrap_err();
        assert!(matches!(err.cause(), SubdubError::Cancelled));
    }

    struct SlowTranscriber;

    #[async_trait]
    impl Transcriber for SlowTranscriber {
        async fn transcribe(&self, _media_path: &Path) -> Result<Vec<TimedSegment>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_stage_timeout() {
        let fx = fixture("talk.mp4");
        let pipeline = Pipeline::with_components(
            Arc::new(ModelRegistry::preloaded(Arc::new(SlowTranscriber), dictionary_translator())),
            Arc::new(no_synthesis()),
            Arc::new(MockMuxer::new()),
            PipelineOptions {
                stage_timeout: Some(Duration::from_millis(50)),
                ..PipelineOptions::default()
            },
        );

        let err = pipeline.run(&fx.request()).await.unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Transcribing));
        assert!(matches!(err.cause(), SubdubError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_rerun_overwrites_same_outputs() {
        let fx = fixture("talk.mp4");
        let pipeline = pipeline(
            transcriber_returning(english()),
            dictionary_translator(),
            no_synthesis(),
            writing_muxer(),
        );

        let first = pipeline.run(&fx.request()).await.unwrap();
        let second = pipeline.run(&fx.request()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read_dir(&fx.video_dir).unwrap().count(), 1);
        assert_eq!(std::fs::read_dir(&fx.srt_dir).unwrap().count(), 1);
    }
}
