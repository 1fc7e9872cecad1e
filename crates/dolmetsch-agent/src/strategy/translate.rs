use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use dolmetsch_core::Mode;
use dolmetsch_sessions::ConversationState;

use super::{ProcessingResult, Strategy, StrategyError};
use crate::translate::Translator;

/// One backend call per message; successful pairs go to the translation log.
pub struct TranslateStrategy {
    translator: Arc<dyn Translator>,
}

impl TranslateStrategy {
    pub fn new(translator: Arc<dyn Translator>) -> Self {
        Self { translator }
    }

    pub fn translator(&self) -> &dyn Translator {
        &*self.translator
    }
}

#[async_trait]
impl Strategy for TranslateStrategy {
    fn mode(&self) -> Mode {
        Mode::Translate
    }

    async fn process(
        &self,
        text: &str,
        state: &mut ConversationState,
    ) -> Result<ProcessingResult, StrategyError> {
        let translated = self.translator.translate(text).await?;
        debug!(
            backend = %self.translator.name(),
            log_len = state.translation_log.len() + 1,
            "translated"
        );
        state.push_translation(text, translated.as_str());
        Ok(ProcessingResult {
            text: translated,
            mode: Mode::Translate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::TranslateError;

    struct Dictionary;

    #[async_trait]
    impl Translator for Dictionary {
        fn name(&self) -> &str {
            "dictionary"
        }
        fn target(&self) -> &str {
            "de"
        }
        async fn translate(&self, text: &str) -> Result<String, TranslateError> {
            match text {
                "hello" => Ok("hallo".to_string()),
                "cat" => Ok("Katze".to_string()),
                _ => Err(TranslateError::Api {
                    status: 400,
                    message: "unknown word".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn success_appends_pair() {
        let strategy = TranslateStrategy::new(Arc::new(Dictionary));
        let mut state = ConversationState::default();

        let result = strategy.process("hello", &mut state).await.unwrap();
        assert_eq!(result.text, "hallo");
        assert_eq!(result.mode, Mode::Translate);
        assert_eq!(state.translation_log.len(), 1);
        assert_eq!(state.translation_log[0].original, "hello");
        assert_eq!(state.translation_log[0].translated, "hallo");
    }

    #[tokio::test]
    async fn failure_leaves_log_untouched() {
        let strategy = TranslateStrategy::new(Arc::new(Dictionary));
        let mut state = ConversationState::default();
        strategy.process("cat", &mut state).await.unwrap();

        let err = strategy.process("xyzzy", &mut state).await.unwrap_err();
        assert!(matches!(err, StrategyError::Translation(_)));
        assert_eq!(state.translation_log.len(), 1);
        assert!(state.transcript.is_empty());
    }
}
