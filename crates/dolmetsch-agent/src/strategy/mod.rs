//! The two interchangeable ways a message can be processed.
//!
//! A strategy receives the raw text together with exclusive access to the
//! conversation state, mutates the state it owns (translation log or
//! transcript) and returns the text to reply with.

pub mod converse;
pub mod translate;

use async_trait::async_trait;

use dolmetsch_core::Mode;
use dolmetsch_sessions::ConversationState;

use crate::provider::ProviderError;
use crate::translate::TranslateError;

pub use converse::ConverseStrategy;
pub use translate::TranslateStrategy;

/// Output of a strategy, input to rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingResult {
    pub text: String,
    /// Strategy that produced the text; decides how it is rendered.
    pub mode: Mode,
}

#[async_trait]
pub trait Strategy: Send + Sync {
    fn mode(&self) -> Mode;

    async fn process(
        &self,
        text: &str,
        state: &mut ConversationState,
    ) -> Result<ProcessingResult, StrategyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error("translation failed: {0}")]
    Translation(#[from] TranslateError),

    #[error("language model failed: {0}")]
    Llm(#[from] ProviderError),
}

impl StrategyError {
    /// What the chat user is told. Causes stay in the logs.
    pub fn user_notice(&self) -> &'static str {
        match self {
            StrategyError::Translation(TranslateError::TooLong { .. }) => {
                "That text is too long to translate. Please send a shorter message."
            }
            StrategyError::Translation(_) => {
                "Sorry, the translation failed. Please try again later."
            }
            StrategyError::Llm(_) => {
                "Sorry, the language model could not answer. Please try again later."
            }
        }
    }
}
