// English -> Chinese machine translation
//
// - Ollama: LLM translation over the ollama HTTP API
//
// `translate_batch` owns chunking, blank-line substitution and count checking so
// every backend only has to translate one chunk at a time.

pub mod ollama;

use async_trait::async_trait;
use tracing::{debug, info};

pub use ollama::*;

use crate::error::{Result, SubdubError};

/// Substituted for blank input lines before they reach the translator
pub const BLANK_PLACEHOLDER: &str = ".";

/// Translates one chunk of English lines into Chinese
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    /// Must return exactly one translation per input line, in input order
    async fn translate_chunk(&self, texts: &[String]) -> Result<Vec<String>>;
}

/// Translate `texts` in chunks of `batch_size`, preserving count and order.
///
/// Blank entries are sent as [`BLANK_PLACEHOLDER`]; their translation is still returned
/// in position. A chunk whose response count differs from its input is an error.
pub async fn translate_batch(
    translator: &dyn Translator,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<String>> {
    let batch_size = batch_size.max(1);
    let total_batches = texts.len().div_ceil(batch_size);
    let mut results = Vec::with_capacity(texts.len());

    for (batch_index, chunk) in texts.chunks(batch_size).enumerate() {
        let sanitized: Vec<String> = chunk
            .iter()
            .map(|text| {
                if text.trim().is_empty() {
                    BLANK_PLACEHOLDER.to_string()
                } else {
                    text.trim().to_string()
                }
            })
            .collect();

        debug!("Translating batch {}/{} ({} lines)", batch_index + 1, total_batches, sanitized.len());
        let translations = translator.translate_chunk(&sanitized).await?;

        if translations.len() != sanitized.len() {
            return Err(SubdubError::Translation(format!(
                "batch {} returned {} translations for {} lines",
                batch_index + 1,
                translations.len(),
                sanitized.len()
            )));
        }

        results.extend(translations.into_iter().map(|t| t.trim().to_string()));
    }

    info!("Translated {} lines in {} batches", results.len(), total_batches);
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_chunks_preserve_order_and_count() {
        let mut translator = MockTranslator::new();
        translator
            .expect_translate_chunk()
            .times(3)
            .returning(|texts| Ok(texts.iter().map(|t| format!("zh:{}", t)).collect()));

        let input: Vec<String> = (0..7).map(|i| format!("line {}", i)).collect();
        let output = translate_batch(&translator, &input, 3).await.unwrap();

        assert_eq!(output.len(), input.len());
        for (i, translated) in output.iter().enumerate() {
            assert_eq!(translated, &format!("zh:line {}", i));
        }
    }

    #[tokio::test]
    async fn test_blank_lines_use_placeholder() {
        let mut translator = MockTranslator::new();
        translator
            .expect_translate_chunk()
            .with(eq(lines(&["Hello", ".", "."])))
            .times(1)
            .returning(|_| Ok(lines(&["你好", "。", "。"])));

        let output = translate_batch(&translator, &lines(&["Hello", "", "   "]), 8).await.unwrap();

        assert_eq!(output, lines(&["你好", "。", "。"]));
    }

    #[tokio::test]
    async fn test_count_mismatch_is_fatal() {
        let mut translator = MockTranslator::new();
        translator
            .expect_translate_chunk()
            .returning(|_| Ok(lines(&["只有一个"])));

        let err = translate_batch(&translator, &lines(&["one", "two"]), 8).await.unwrap_err();

        assert!(matches!(err, SubdubError::Translation(_)));
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_calls() {
        let mut translator = MockTranslator::new();
        translator.expect_translate_chunk().never();

        let output = translate_batch(&translator, &[], 8).await.unwrap();
        assert!(output.is_empty());
    }
}
