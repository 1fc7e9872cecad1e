//! Outbound delivery to Telegram chats.
//!
//! Telegram's message limit is 4096 characters; plain text is split at 4090
//! bytes into several messages when needed. Markup is never split, since a
//! cut could land inside a tag. Its limit applies to the text left after tags
//! and entities are parsed, counted in UTF-16 units as Telegram does; oversized
//! markup is rejected so the caller falls back to plain text.

use std::time::Duration;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::{ApiError, RequestError};
use tracing::{debug, warn};

use dolmetsch_agent::pipeline::{DeliveryError, Transport};
use dolmetsch_core::ConversationId;

use crate::error::TelegramError;

/// Maximum bytes per Telegram message (the limit is 4096 characters).
const CHUNK_MAX: usize = 4090;

/// Visible UTF-16 units per message.
const MESSAGE_MAX_UNITS: usize = 4096;

const CHUNK_PAUSE: Duration = Duration::from_millis(100);

const FENCE_CLOSE: &str = "\n```";

/// [`Transport`] backed by the Bot API.
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    async fn send_markup(&self, chat_id: ChatId, html: &str) -> Result<(), DeliveryError> {
        let units = visible_units(html);
        if units > MESSAGE_MAX_UNITS {
            return Err(DeliveryError::Rejected(format!(
                "markup shows {units} characters, one message holds {MESSAGE_MAX_UNITS}"
            )));
        }
        self.bot
            .send_message(chat_id, html)
            .parse_mode(ParseMode::Html)
            .await
            .map(|_| ())
            .map_err(classify)
    }

    async fn send_plain(&self, chat_id: ChatId, text: &str) -> Result<(), DeliveryError> {
        let chunks = split_chunks_smart(text);
        for (i, chunk) in chunks.iter().enumerate() {
            if let Err(e) = self.bot.send_message(chat_id, chunk).await {
                warn!(error = %e, chunk_index = i, "Telegram: failed to send chunk");
                return Err(classify(e));
            }
            if i + 1 < chunks.len() {
                tokio::time::sleep(CHUNK_PAUSE).await;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send(
        &self,
        conversation: &ConversationId,
        text: &str,
        render_as_markup: bool,
    ) -> Result<(), DeliveryError> {
        if text.trim().is_empty() {
            debug!(conversation = %conversation, "skipping empty message");
            return Ok(());
        }
        let chat_id = chat_id(conversation).map_err(|e| DeliveryError::Failed(e.to_string()))?;
        if render_as_markup {
            self.send_markup(chat_id, text).await
        } else {
            self.send_plain(chat_id, text).await
        }
    }
}

/// Telegram conversations are keyed by the decimal chat id.
pub fn chat_id(conversation: &ConversationId) -> Result<ChatId, TelegramError> {
    conversation
        .as_str()
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| TelegramError::InvalidChatId(conversation.to_string()))
}

/// Length of what the client shows for `html`, in UTF-16 units.
fn visible_units(html: &str) -> usize {
    dolmetsch_markup::visible_text(html).encode_utf16().count()
}

/// Entity-parse failures mean the markup was refused and plain text may work.
fn classify(err: RequestError) -> DeliveryError {
    match err {
        RequestError::Api(ApiError::CantParseEntities(reason)) => DeliveryError::Rejected(reason),
        RequestError::Api(ApiError::MessageIsTooLong) => {
            DeliveryError::Rejected("message is too long".to_string())
        }
        other => DeliveryError::Failed(other.to_string()),
    }
}

/// Code-fence-aware message splitter.
///
/// Splits on line boundaries. When a split falls inside a fenced code block,
/// the fence is closed before the boundary and re-opened at the start of the
/// next chunk.
pub fn split_chunks_smart(text: &str) -> Vec<String> {
    if text.len() <= CHUNK_MAX {
        return vec![text.to_string()];
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut fence_lang: Option<String> = None;

    for line in text.split('\n') {
        let cost = if current.is_empty() {
            line.len()
        } else {
            1 + line.len()
        };

        // Leave room for the closing fence.
        let budget = if fence_lang.is_some() {
            CHUNK_MAX - FENCE_CLOSE.len()
        } else {
            CHUNK_MAX
        };

        if !current.is_empty() && current.len() + cost > budget {
            if fence_lang.is_some() {
                current.push_str(FENCE_CLOSE);
            }
            chunks.push(std::mem::take(&mut current));
            if let Some(ref lang) = fence_lang {
                current.push_str("```");
                current.push_str(lang);
            }
        }

        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);

        let trimmed = line.trim_start();
        if let Some(after_fence) = trimmed.strip_prefix("```") {
            fence_lang = match fence_lang {
                Some(_) => None,
                None => Some(after_fence.trim().to_string()),
            };
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    // A single line longer than the limit still has to be cut.
    let mut result = Vec::new();
    for chunk in chunks {
        let mut remaining = chunk.as_str();
        while remaining.len() > CHUNK_MAX {
            let limit = floor_char_boundary(remaining, CHUNK_MAX);
            let head = &remaining[..limit];
            let split_at = head
                .rfind('\n')
                .or_else(|| head.rfind(' '))
                .filter(|&i| i > 0)
                .unwrap_or(limit);
            result.push(remaining[..split_at].to_string());
            remaining = remaining[split_at..].trim_start();
        }
        if !remaining.is_empty() {
            result.push(remaining.to_string());
        }
    }

    result
}

/// Largest char boundary of `s` that is `<= max`.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    let mut i = max.min(s.len());
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_single_chunk() {
        let chunks = split_chunks_smart("Hallo, Welt!");
        assert_eq!(chunks, vec!["Hallo, Welt!".to_string()]);
    }

    #[test]
    fn exactly_chunk_max_is_single_chunk() {
        let text = "a".repeat(CHUNK_MAX);
        assert_eq!(split_chunks_smart(&text).len(), 1);
    }

    #[test]
    fn over_limit_splits_on_newline() {
        let line = "a".repeat(2000);
        let text = format!("{line}\n{line}\n{line}");
        let chunks = split_chunks_smart(&text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], format!("{line}\n{line}"));
        assert_eq!(chunks[1], line);
    }

    #[test]
    fn long_multibyte_line_splits_on_char_boundary() {
        let text = "ü".repeat(5000); // 10000 bytes, no spaces or newlines
        let chunks = split_chunks_smart(&text);
        assert!(chunks.len() >= 3);
        for c in &chunks {
            assert!(c.len() <= CHUNK_MAX);
        }
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn long_line_prefers_word_boundary() {
        let text = "wort ".repeat(1500);
        let chunks = split_chunks_smart(text.trim_end());
        assert!(chunks.len() >= 2);
        assert!(chunks.iter().all(|c| c.len() <= CHUNK_MAX));
        assert!(chunks.iter().all(|c| c.starts_with("wort")));
    }

    #[test]
    fn code_fence_reopened_with_language() {
        let mut text = String::from("```python\n");
        for _ in 0..100 {
            text.push_str("print('hello world this is a reasonably long line of python code')\n");
        }
        text.push_str("```\n");

        let chunks = split_chunks_smart(&text);
        assert!(chunks.len() >= 2);
        assert!(chunks[0].ends_with("\n```"));
        assert!(chunks[1].starts_with("```python\n"));
        for c in &chunks {
            assert!(c.len() <= CHUNK_MAX, "chunk too large: {}", c.len());
        }
    }

    #[test]
    fn markup_limit_counts_visible_text() {
        // 8000 bytes of markup, 4000 visible characters
        let cyrillic = format!("<b>{}</b>", "ж".repeat(4000));
        assert!(cyrillic.len() > CHUNK_MAX);
        assert_eq!(visible_units(&cyrillic), 4000);

        let escaped = "&amp;".repeat(MESSAGE_MAX_UNITS);
        assert_eq!(visible_units(&escaped), MESSAGE_MAX_UNITS);

        assert_eq!(visible_units(&"a".repeat(MESSAGE_MAX_UNITS + 1)), 4097);
        // outside the BMP: two units each
        assert_eq!(visible_units(&"😀".repeat(2049)), 4098);
    }

    #[test]
    fn chat_id_round_trip() {
        let id = ConversationId::from(-1001234567890_i64);
        assert_eq!(chat_id(&id).unwrap(), ChatId(-1001234567890));
        assert!(matches!(
            chat_id(&ConversationId::from("web:abc")),
            Err(TelegramError::InvalidChatId(_))
        ));
    }

    #[test]
    fn entity_errors_are_rejections() {
        let err = RequestError::Api(ApiError::CantParseEntities(
            "Bad Request: can't parse entities".to_string(),
        ));
        assert!(matches!(classify(err), DeliveryError::Rejected(_)));
        assert!(matches!(
            classify(RequestError::Api(ApiError::MessageIsTooLong)),
            DeliveryError::Rejected(_)
        ));
        assert!(matches!(
            classify(RequestError::Api(ApiError::BotBlocked)),
            DeliveryError::Failed(_)
        ));
    }
}
