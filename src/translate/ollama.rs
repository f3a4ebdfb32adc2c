use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::Translator;
use crate::config::TranslateConfig;
use crate::error::{Result, SubdubError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    #[serde(default)]
    pub done: bool,
}

/// JSON payload the model is asked to produce
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchTranslation {
    pub translations: Vec<String>,
}

/// Translator backed by a local ollama model
pub struct OllamaTranslator {
    client: Client,
    config: TranslateConfig,
}

impl OllamaTranslator {
    pub fn new(config: TranslateConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Create the translator and make sure the configured model is served
    pub async fn connect(config: TranslateConfig) -> Result<Self> {
        let translator = Self::new(config)?;
        check_ollama_availability(&translator.client, &translator.config.endpoint, &translator.config.model).await?;
        Ok(translator)
    }

    fn build_prompt(&self, texts: &[String]) -> String {
        let numbered = texts
            .iter()
            .enumerate()
            .map(|(i, text)| format!("{}. {}", i + 1, text))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are a professional subtitle translator.\n\
             Translate each of the following {} English subtitle lines into Simplified Chinese.\n\
             Translate every line separately. Do not merge, split, skip or reorder lines.\n\
             A line containing only \".\" must be translated as \"。\".\n\
             \n\
             Return ONLY JSON of the form {{\"translations\": [\"...\", \"...\"]}} with exactly {} strings.\n\
             \n\
             [Lines]\n\
             {}",
            texts.len(),
            texts.len(),
            numbered
        )
    }

    async fn generate(&self, prompt: String) -> Result<String> {
        let request = GenerateRequest {
            model: self.config.model.clone(),
            prompt,
            stream: false,
            format: "json".to_string(),
        };
        let url = format!("{}/api/generate", self.config.endpoint);

        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!("Sending translation request to {} (attempt {})", url, attempt);

            match self.client.post(&url).json(&request).send().await {
                Ok(response) if response.status().is_success() => {
                    let generated: GenerateResponse = response.json().await.map_err(|e| {
                        SubdubError::Translation(format!("Failed to parse response: {}", e))
                    })?;
                    return Ok(generated.response);
                }
                Ok(response) => {
                    let status = response.status();
                    let error_text = response.text().await.unwrap_or_default();
                    return Err(SubdubError::Translation(format!(
                        "Ollama API error {}: {}",
                        status, error_text
                    )));
                }
                Err(e) if attempt <= self.config.max_retries => {
                    let delay = retry_delay(attempt);
                    warn!("Translation request failed, retrying in {:?}: {}", delay, e);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Err(SubdubError::Translation(format!("HTTP request failed: {}", e)));
                }
            }
        }
    }
}

/// Linear backoff between transport retries
fn retry_delay(attempt: u32) -> Duration {
    Duration::from_millis(500 * u64::from(attempt))
}

#[async_trait]
impl Translator for OllamaTranslator {
    async fn translate_chunk(&self, texts: &[String]) -> Result<Vec<String>> {
        let raw = self.generate(self.build_prompt(texts)).await?;
        debug!("Raw ollama response: {}", raw);

        parse_batch_response(&raw)
    }
}

/// Extract the translations array from a model response.
///
/// Accepts bare JSON, JSON inside a markdown code block, or JSON embedded in other text.
pub fn parse_batch_response(response: &str) -> Result<Vec<String>> {
    let text = response.trim();

    if let Ok(parsed) = serde_json::from_str::<BatchTranslation>(text) {
        return Ok(parsed.translations);
    }

    let cleaned = remove_markdown_code_blocks(text);
    if let Ok(parsed) = serde_json::from_str::<BatchTranslation>(&cleaned) {
        return Ok(parsed.translations);
    }

    if let (Some(json_start), Some(json_end)) = (text.find('{'), text.rfind('}')) {
        if json_start < json_end {
            if let Ok(parsed) = serde_json::from_str::<BatchTranslation>(&text[json_start..=json_end]) {
                return Ok(parsed.translations);
            }
        }
    }

    Err(SubdubError::Translation(format!(
        "Malformed translation response: {}",
        text.chars().take(200).collect::<String>()
    )))
}

fn remove_markdown_code_blocks(text: &str) -> String {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
        .to_string()
}

/// Check if Ollama is reachable and the model is available
pub async fn check_ollama_availability(client: &Client, endpoint: &str, model: &str) -> Result<()> {
    let url = format!("{}/api/show", endpoint);

    let response = client
        .post(&url)
        .json(&json!({ "name": model }))
        .send()
        .await
        .map_err(|e| SubdubError::Translation(format!("Failed to connect to Ollama: {}", e)))?;

    if response.status().is_success() {
        info!("Ollama model '{}' is available", model);
        Ok(())
    } else {
        Err(SubdubError::Translation(format!(
            "Ollama model '{}' not found. Please pull the model first: ollama pull {}",
            model, model
        )))
    }
}
