use serde::{Deserialize, Serialize};

use dolmetsch_core::{Mode, Role, TranscriptEntry, TranslationLogEntry};

/// Everything the bot remembers about one conversation.
///
/// Created lazily on the first message and kept for the lifetime of the
/// process. The translation log and the transcript are append-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub mode: Mode,
    pub translation_log: Vec<TranslationLogEntry>,
    pub transcript: Vec<TranscriptEntry>,
}

impl ConversationState {
    pub fn push_translation(&mut self, original: impl Into<String>, translated: impl Into<String>) {
        self.translation_log.push(TranslationLogEntry {
            original: original.into(),
            translated: translated.into(),
        });
    }

    pub fn push_transcript(&mut self, role: Role, content: impl Into<String>) {
        self.transcript.push(TranscriptEntry {
            role,
            content: content.into(),
        });
    }
}
