use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DolmetschError;

/// Opaque, stable identifier of one chat session.
///
/// For Telegram this is the decimal chat id; other transports may use any
/// string that stays stable for the lifetime of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ConversationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<i64> for ConversationId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

/// Active processing strategy of a conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Machine translation into the configured target language.
    #[default]
    Translate,
    /// Multi-turn conversation with the language model.
    Converse,
}

impl Mode {
    /// Every mode, in the order they are listed to users.
    pub const ALL: [Mode; 2] = [Mode::Translate, Mode::Converse];

    pub fn name(self) -> &'static str {
        match self {
            Mode::Translate => "translate",
            Mode::Converse => "converse",
        }
    }

    /// Comma-separated list of valid mode names, e.g. `translate, converse`.
    pub fn listing() -> String {
        Self::ALL
            .iter()
            .map(|m| m.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = DolmetschError;

    /// Case-insensitive parse of a mode name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Mode::ALL
            .into_iter()
            .find(|m| m.name() == lower)
            .ok_or_else(|| DolmetschError::UnknownMode {
                name: s.to_string(),
            })
    }
}

/// Author of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message of the multi-turn language-model transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
}

impl TranscriptEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One `(original, translated)` pair of the translation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationLogEntry {
    pub original: String,
    pub translated: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_defaults_to_translate() {
        assert_eq!(Mode::default(), Mode::Translate);
    }

    #[test]
    fn mode_parse_is_case_insensitive() {
        assert_eq!("Converse".parse::<Mode>().unwrap(), Mode::Converse);
        assert_eq!("TRANSLATE".parse::<Mode>().unwrap(), Mode::Translate);
        assert_eq!(" converse ".parse::<Mode>().unwrap(), Mode::Converse);
    }

    #[test]
    fn mode_parse_rejects_unknown() {
        let err = "chat".parse::<Mode>().unwrap_err();
        assert!(matches!(err, DolmetschError::UnknownMode { ref name } if name == "chat"));
    }

    #[test]
    fn mode_listing_names_every_mode() {
        assert_eq!(Mode::listing(), "translate, converse");
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&TranscriptEntry::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn conversation_id_from_chat_id() {
        let id = ConversationId::from(-100_123_i64);
        assert_eq!(id.as_str(), "-100123");
        assert_eq!(id.to_string(), "-100123");
    }
}
