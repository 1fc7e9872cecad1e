use async_trait::async_trait;
use tracing::{debug, warn};

use super::{prepare_input, TranslateError, Translator};

/// Google's public web translation endpoint (no API key).
pub struct GoogleTranslator {
    client: reqwest::Client,
    base_url: String,
    target: String,
}

impl GoogleTranslator {
    pub fn new(target: &str, base_url: Option<String>) -> Self {
        Self {
            client: crate::provider::http_client(crate::provider::TRANSLATE_TIMEOUT),
            base_url: base_url.unwrap_or_else(|| "https://translate.googleapis.com".to_string()),
            target: target.to_lowercase(),
        }
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    fn name(&self) -> &str {
        "google"
    }

    fn target(&self) -> &str {
        &self.target
    }

    async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        let Some(text) = prepare_input(text)? else {
            return Ok(text.trim().to_string());
        };
        let url = format!("{}/translate_a/single", self.base_url.trim_end_matches('/'));

        debug!(lang = %self.target, chars = text.chars().count(), "sending request to Google Translate");

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", self.target.as_str()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status == 429 {
            return Err(TranslateError::QuotaExceeded);
        }
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status, body = %body, "Google Translate error");
            return Err(TranslateError::Api {
                status,
                message: body,
            });
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| TranslateError::Parse(e.to_string()))?;
        parse_segments(&body)
    }
}

/// The response is a nested array; `[0]` holds one `[translated, original, ...]`
/// entry per sentence.
fn parse_segments(body: &serde_json::Value) -> Result<String, TranslateError> {
    let segments = body
        .get(0)
        .and_then(|s| s.as_array())
        .ok_or_else(|| TranslateError::Parse("missing translation segments".to_string()))?;

    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(|t| t.as_str()))
        .collect();

    if translated.is_empty() {
        return Err(TranslateError::Parse("empty translation".to_string()));
    }
    Ok(translated)
}
