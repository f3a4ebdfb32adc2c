use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::path::PathBuf;
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::error::{Result, SubdubError};
use crate::segment::ModelSize;

const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Locates and downloads whisper.cpp ggml models
pub struct SetupManager {
    client: Client,
    models_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub size: ModelSize,
    pub filename: String,
    pub url: String,
    pub size_mb: f64,
}

impl ModelInfo {
    pub fn for_size(size: ModelSize) -> Self {
        let (filename, size_mb) = match size {
            ModelSize::Tiny => ("ggml-tiny.bin", 75.0),
            ModelSize::Base => ("ggml-base.bin", 142.0),
            ModelSize::Small => ("ggml-small.bin", 466.0),
            ModelSize::Medium => ("ggml-medium.bin", 1500.0),
            ModelSize::Large => ("ggml-large-v3.bin", 2900.0),
        };

        Self {
            size,
            filename: filename.to_string(),
            url: format!("{}/{}", MODEL_BASE_URL, filename),
            size_mb,
        }
    }
}

impl SetupManager {
    pub fn new<P: Into<PathBuf>>(models_dir: P) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("subdub/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            models_dir: models_dir.into(),
        })
    }

    pub fn available_models(&self) -> Vec<ModelInfo> {
        ModelSize::ALL.into_iter().map(ModelInfo::for_size).collect()
    }

    pub fn model_path(&self, size: ModelSize) -> PathBuf {
        self.models_dir.join(ModelInfo::for_size(size).filename)
    }

    pub fn is_downloaded(&self, size: ModelSize) -> bool {
        self.model_path(size).is_file()
    }

    /// Path to the model file, downloading it first if it is missing
    pub async fn ensure_model(&self, size: ModelSize) -> Result<PathBuf> {
        let local_path = self.model_path(size);
        if local_path.is_file() {
            return Ok(local_path);
        }

        info!("Whisper model '{}' not found locally", size);
        self.download_model(&ModelInfo::for_size(size)).await
    }

    pub async fn download_model(&self, model: &ModelInfo) -> Result<PathBuf> {
        let local_path = self.models_dir.join(&model.filename);

        if local_path.exists() {
            info!("Model {} already exists at {}", model.size, local_path.display());
            return Ok(local_path);
        }

        async_fs::create_dir_all(&self.models_dir).await?;
        info!("Downloading {} model ({:.1} MB)...", model.size, model.size_mb);

        let mut response = self.client.get(&model.url).send().await?;

        if !response.status().is_success() {
            return Err(SubdubError::Config(format!(
                "Failed to download model {}: HTTP {}",
                model.size,
                response.status()
            )));
        }

        let total = response
            .content_length()
            .unwrap_or((model.size_mb * 1_000_000.0) as u64);
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .map_err(|e| SubdubError::Config(e.to_string()))?
                .progress_chars("#>-"),
        );

        // Download next to the target so an interrupted transfer never looks complete
        let temp_path = local_path.with_extension("part");
        let mut file = async_fs::File::create(&temp_path).await?;

        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            pb.inc(chunk.len() as u64);
        }

        file.flush().await?;
        drop(file);

        async_fs::rename(&temp_path, &local_path).await?;

        pb.finish_with_message(format!("Downloaded {}", model.size));
        info!("Successfully downloaded {} to {}", model.size, local_path.display());

        Ok(local_path)
    }
}
