use async_trait::async_trait;
use tracing::info;

use dolmetsch_core::config::AgentConfig;
use dolmetsch_core::TranscriptEntry;

use crate::provider::{ChatRequest, LlmProvider, ProviderError};

/// Language-model backend as seen by the conversational strategy: the whole
/// ordered transcript in, one assistant reply out.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, transcript: &[TranscriptEntry]) -> Result<String, ProviderError>;
}

/// Holds the provider together with the model settings every request uses.
/// Shared across all conversations.
pub struct AgentRuntime {
    provider: Box<dyn LlmProvider>,
    model: String,
    system_prompt: String,
    max_tokens: u32,
}

impl AgentRuntime {
    pub fn new(provider: Box<dyn LlmProvider>, config: &AgentConfig) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            max_tokens: config.max_tokens,
        }
    }

    pub fn provider(&self) -> &dyn LlmProvider {
        &*self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, transcript: &[TranscriptEntry]) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            system: self.system_prompt.clone(),
            messages: transcript.to_vec(),
            max_tokens: self.max_tokens,
        }
    }
}

#[async_trait]
impl LlmBackend for AgentRuntime {
    async fn complete(&self, transcript: &[TranscriptEntry]) -> Result<String, ProviderError> {
        let req = self.build_request(transcript);
        info!(
            model = %req.model,
            provider = %self.provider.name(),
            messages = req.messages.len(),
            "processing chat request"
        );
        let resp = self.provider.send(&req).await?;
        info!(
            tokens_in = resp.tokens_in,
            tokens_out = resp.tokens_out,
            stop_reason = %resp.stop_reason,
            "chat request complete"
        );
        Ok(resp.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::provider::ChatResponse;

    /// Records every request and answers with the number of messages seen.
    struct Recorder {
        seen: Arc<Mutex<Vec<ChatRequest>>>,
    }

    #[async_trait]
    impl LlmProvider for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }
        async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
            self.seen.lock().unwrap().push(req.clone());
            Ok(ChatResponse {
                content: format!("{} messages", req.messages.len()),
                model: req.model.clone(),
                tokens_in: 0,
                tokens_out: 0,
                stop_reason: "stop".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn complete_sends_configured_settings_and_full_transcript() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let config = AgentConfig {
            model: "test-model".to_string(),
            system_prompt: "be nice".to_string(),
            max_tokens: 42,
        };
        let runtime = AgentRuntime::new(
            Box::new(Recorder {
                seen: Arc::clone(&seen),
            }),
            &config,
        );

        let transcript = vec![
            TranscriptEntry::user("a"),
            TranscriptEntry::assistant("b"),
            TranscriptEntry::user("c"),
        ];
        let reply = runtime.complete(&transcript).await.unwrap();
        assert_eq!(reply, "3 messages");

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].model, "test-model");
        assert_eq!(seen[0].system, "be nice");
        assert_eq!(seen[0].max_tokens, 42);
        assert_eq!(seen[0].messages, transcript);
    }
}
