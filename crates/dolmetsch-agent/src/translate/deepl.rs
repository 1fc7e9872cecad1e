use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{prepare_input, TranslateError, Translator};

/// DeepL REST API. Free-tier keys need `https://api-free.deepl.com`.
pub struct DeeplTranslator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    target: String,
}

impl DeeplTranslator {
    pub fn new(api_key: String, target: &str, base_url: Option<String>) -> Self {
        Self {
            client: crate::provider::http_client(crate::provider::TRANSLATE_TIMEOUT),
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.deepl.com".to_string()),
            target: target.to_lowercase(),
        }
    }
}

#[async_trait]
impl Translator for DeeplTranslator {
    fn name(&self) -> &str {
        "deepl"
    }

    fn target(&self) -> &str {
        &self.target
    }

    async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        let Some(text) = prepare_input(text)? else {
            return Ok(text.trim().to_string());
        };
        let url = format!("{}/v2/translate", self.base_url.trim_end_matches('/'));

        debug!(lang = %self.target, chars = text.chars().count(), "sending request to DeepL");

        let body = serde_json::json!({
            "text": [text],
            "target_lang": self.target.to_uppercase(),
        });
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        // 456: character quota of the plan used up
        if status == 456 || status == 429 {
            return Err(TranslateError::QuotaExceeded);
        }
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "DeepL API error");
            return Err(TranslateError::Api {
                status,
                message: text,
            });
        }

        let api_resp: ApiResponse = resp
            .json()
            .await
            .map_err(|e| TranslateError::Parse(e.to_string()))?;
        parse_response(api_resp)
    }
}

fn parse_response(resp: ApiResponse) -> Result<String, TranslateError> {
    resp.translations
        .into_iter()
        .next()
        .map(|t| t.text)
        .ok_or_else(|| TranslateError::Parse("no translations in response".to_string()))
}

#[derive(Deserialize)]
struct ApiResponse {
    translations: Vec<Translation>,
}

#[derive(Deserialize)]
struct Translation {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_translation_is_used() {
        let json = r#"{"translations": [{"detected_source_language": "EN", "text": "Hallo"}]}"#;
        assert_eq!(
            parse_response(serde_json::from_str(json).unwrap()).unwrap(),
            "Hallo"
        );
    }

    #[test]
    fn empty_translations_is_a_parse_error() {
        let json = r#"{"translations": []}"#;
        assert!(matches!(
            parse_response(serde_json::from_str(json).unwrap()),
            Err(TranslateError::Parse(_))
        ));
    }
}
