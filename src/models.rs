use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::info;

use crate::config::Config;
use crate::error::{Result, SubdubError};
use crate::segment::ModelSize;
use crate::setup::SetupManager;
use crate::transcribe::{Transcriber, WhisperCppTranscriber};
use crate::translate::{OllamaTranslator, Translator};

type TranscriberSlot = Arc<OnceCell<Arc<dyn Transcriber>>>;

/// Lazily initialized model handles shared by every pipeline run.
///
/// Each transcriber size and the translator are initialized at most once, even when
/// first requested concurrently. A failed initialization leaves the slot empty so the
/// next request tries again.
pub struct ModelRegistry {
    config: Option<Config>,
    transcribers: Mutex<HashMap<ModelSize, TranscriberSlot>>,
    translator: OnceCell<Arc<dyn Translator>>,
}

impl ModelRegistry {
    pub fn new(config: Config) -> Self {
        Self {
            config: Some(config),
            transcribers: Mutex::new(HashMap::new()),
            translator: OnceCell::new(),
        }
    }

    /// Registry whose handles are already loaded; every model size maps to `transcriber`.
    pub fn preloaded(transcriber: Arc<dyn Transcriber>, translator: Arc<dyn Translator>) -> Self {
        let transcribers = ModelSize::ALL
            .into_iter()
            .map(|size| {
                let slot = Arc::new(OnceCell::new_with(Some(transcriber.clone())));
                (size, slot)
            })
            .collect();

        Self {
            config: None,
            transcribers: Mutex::new(transcribers),
            translator: OnceCell::new_with(Some(translator)),
        }
    }

    fn config(&self) -> Result<&Config> {
        self.config
            .as_ref()
            .ok_or_else(|| SubdubError::Config("model registry has no configuration to load models from".to_string()))
    }

    fn transcriber_slot(&self, size: ModelSize) -> TranscriberSlot {
        let mut slots = self
            .transcribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        slots.entry(size).or_default().clone()
    }

    /// Transcriber for `size`, resolving (and if needed downloading) its model on first use
    pub async fn get_transcriber(&self, size: ModelSize) -> Result<Arc<dyn Transcriber>> {
        let slot = self.transcriber_slot(size);

        let transcriber = slot
            .get_or_try_init(|| async {
                let config = self.config()?;
                info!("Loading whisper model ({})...", size);

                let setup = SetupManager::new(&config.transcriber.models_dir)?;
                let model_path = setup
                    .ensure_model(size)
                    .await
                    .map_err(|e| SubdubError::Transcription(format!("Cannot load model '{}': {}", size, e)))?;

                let transcriber: Arc<dyn Transcriber> = Arc::new(WhisperCppTranscriber::new(
                    config.transcriber.clone(),
                    model_path,
                    &config.media.binary_path,
                ));
                Ok::<_, SubdubError>(transcriber)
            })
            .await?;

        Ok(transcriber.clone())
    }

    /// Translator, connecting to the translation service on first use
    pub async fn get_translator(&self) -> Result<Arc<dyn Translator>> {
        let translator = self
            .translator
            .get_or_try_init(|| async {
                let config = self.config()?;
                info!("Loading translation model ({})...", config.translate.model);

                let translator: Arc<dyn Translator> =
                    Arc::new(OllamaTranslator::connect(config.translate.clone()).await?);
                Ok::<_, SubdubError>(translator)
            })
            .await?;

        Ok(translator.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcribe::MockTranscriber;
    use crate::translate::MockTranslator;

    #[tokio::test]
    async fn test_preloaded_handles_are_shared() {
        let registry = ModelRegistry::preloaded(
            Arc::new(MockTranscriber::new()),
            Arc::new(MockTranslator::new()),
        );

        let tiny = registry.get_transcriber(ModelSize::Tiny).await.unwrap();
        let large = registry.get_transcriber(ModelSize::Large).await.unwrap();
        assert!(Arc::ptr_eq(&tiny, &large));

        let first = registry.get_translator().await.unwrap();
        let second = registry.get_translator().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_existing_model_file_loads_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ggml-tiny.bin"), b"weights").unwrap();
        let mut config = Config::default();
        config.transcriber.models_dir = dir.path().to_path_buf();
        let registry = Arc::new(ModelRegistry::new(config));

        let (a, b) = tokio::join!(
            registry.get_transcriber(ModelSize::Tiny),
            registry.get_transcriber(ModelSize::Tiny)
        );

        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
    }
}
