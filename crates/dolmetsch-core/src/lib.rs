pub mod config;
pub mod error;
pub mod language;
pub mod types;

pub use error::{DolmetschError, Result};
pub use types::{ConversationId, Mode, Role, TranscriptEntry, TranslationLogEntry};
