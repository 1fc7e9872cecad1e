use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use dolmetsch_core::{Mode, Role};
use dolmetsch_sessions::ConversationState;

use super::{ProcessingResult, Strategy, StrategyError};
use crate::runtime::LlmBackend;

/// Multi-turn conversation: the whole transcript is replayed on every call.
///
/// The user entry is appended before the call and kept even if the call
/// fails; the assistant entry is appended only on success.
pub struct ConverseStrategy {
    backend: Arc<dyn LlmBackend>,
}

impl ConverseStrategy {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Strategy for ConverseStrategy {
    fn mode(&self) -> Mode {
        Mode::Converse
    }

    async fn process(
        &self,
        text: &str,
        state: &mut ConversationState,
    ) -> Result<ProcessingResult, StrategyError> {
        state.push_transcript(Role::User, text);
        debug!(transcript_len = state.transcript.len(), "calling language model");

        let reply = self.backend.complete(&state.transcript).await?;
        state.push_transcript(Role::Assistant, reply.as_str());

        Ok(ProcessingResult {
            text: reply,
            mode: Mode::Converse,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use dolmetsch_core::TranscriptEntry;

    use crate::provider::ProviderError;

    /// Echoes the last message and records the transcript length it saw.
    #[derive(Default)]
    struct Echo {
        lengths: Mutex<Vec<usize>>,
        fail: bool,
    }

    #[async_trait]
    impl LlmBackend for Echo {
        async fn complete(&self, transcript: &[TranscriptEntry]) -> Result<String, ProviderError> {
            self.lengths.lock().unwrap().push(transcript.len());
            if self.fail {
                return Err(ProviderError::Unavailable("down".to_string()));
            }
            Ok(transcript
                .last()
                .map(|e| e.content.clone())
                .unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn nth_call_sees_full_history() {
        let echo = Arc::new(Echo::default());
        let strategy = ConverseStrategy::new(echo.clone());
        let mut state = ConversationState::default();

        for n in 1..=4 {
            let result = strategy.process(&format!("msg {n}"), &mut state).await.unwrap();
            assert_eq!(result.text, format!("msg {n}"));
            assert_eq!(result.mode, Mode::Converse);
        }

        assert_eq!(*echo.lengths.lock().unwrap(), vec![1, 3, 5, 7]);
        assert_eq!(state.transcript.len(), 8);
        assert_eq!(state.transcript[0], TranscriptEntry::user("msg 1"));
        assert_eq!(state.transcript[7], TranscriptEntry::assistant("msg 4"));
    }

    #[tokio::test]
    async fn failure_keeps_user_entry_only() {
        let strategy = ConverseStrategy::new(Arc::new(Echo {
            fail: true,
            ..Echo::default()
        }));
        let mut state = ConversationState::default();

        let err = strategy.process("hi", &mut state).await.unwrap_err();
        assert!(matches!(err, StrategyError::Llm(_)));
        assert_eq!(state.transcript, vec![TranscriptEntry::user("hi")]);
        assert!(state.translation_log.is_empty());
    }
}
