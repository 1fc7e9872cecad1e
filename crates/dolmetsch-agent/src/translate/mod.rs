//! Machine translation backends.
//!
//! The source language is always auto-detected; the target language is fixed
//! per translator instance by configuration.

pub mod deepl;
pub mod google;

use std::sync::Arc;

use async_trait::async_trait;

use dolmetsch_core::config::{TranslatorBackend, TranslatorConfig, MAX_TRANSLATION_CHARS};

pub use deepl::DeeplTranslator;
pub use google::GoogleTranslator;

#[async_trait]
pub trait Translator: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Target language code, e.g. `de`.
    fn target(&self) -> &str;

    /// Translate `text` into the target language.
    async fn translate(&self, text: &str) -> Result<String, TranslateError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("text is {len} characters, the limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error("translation quota exceeded")]
    QuotaExceeded,

    #[error("translator not configured: {0}")]
    NotConfigured(String),
}

/// Input checks shared by every backend.
///
/// Returns `Ok(None)` when there is nothing to translate, in which case the
/// caller hands the (trimmed) text back unchanged.
pub(crate) fn prepare_input(text: &str) -> Result<Option<&str>, TranslateError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    let len = text.chars().count();
    if len > MAX_TRANSLATION_CHARS {
        return Err(TranslateError::TooLong {
            len,
            max: MAX_TRANSLATION_CHARS,
        });
    }
    Ok(Some(text))
}

/// Build the translator selected in `[translator]`.
pub fn from_config(config: &TranslatorConfig) -> Result<Arc<dyn Translator>, TranslateError> {
    match config.backend {
        TranslatorBackend::Google => Ok(Arc::new(GoogleTranslator::new(
            &config.target,
            Some(config.google_base_url.clone()),
        ))),
        TranslatorBackend::Deepl => {
            let deepl = config.deepl.as_ref().ok_or_else(|| {
                TranslateError::NotConfigured(
                    "backend = \"deepl\" needs a [translator.deepl] section".to_string(),
                )
            })?;
            Ok(Arc::new(DeeplTranslator::new(
                deepl.api_key.clone(),
                &config.target,
                Some(deepl.base_url.clone()),
            )))
        }
    }
}
