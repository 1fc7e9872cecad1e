use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::provider::{ChatRequest, ChatResponse, LlmProvider, ProviderError};

/// Pause before retry `n` on the same slot is `n * RETRY_STEP`.
const RETRY_STEP: Duration = Duration::from_millis(200);

/// One entry of the failover chain.
pub struct ProviderSlot {
    pub provider: Box<dyn LlmProvider>,
    /// Extra attempts on this provider before moving to the next one.
    pub max_retries: u32,
}

impl ProviderSlot {
    pub fn new(provider: Box<dyn LlmProvider>, max_retries: u32) -> Self {
        Self {
            provider,
            max_retries,
        }
    }

    /// Send with this slot's retries. A rate limit ends the slot at once.
    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let name = self.provider.name();
        let mut attempt = 0;
        loop {
            let err = match self.provider.send(req).await {
                Ok(resp) => {
                    if attempt > 0 {
                        info!(provider = %name, attempt, "provider recovered on retry");
                    }
                    return Ok(resp);
                }
                Err(e) => e,
            };
            warn!(provider = %name, attempt, err = %err, "provider call failed");

            if matches!(err, ProviderError::RateLimited { .. }) || attempt >= self.max_retries {
                return Err(err);
            }
            attempt += 1;
            tokio::time::sleep(RETRY_STEP * attempt).await;
        }
    }
}

/// Failover chain over several LLM providers.
///
/// Slots are tried in order. The error of the last slot tried is returned
/// when none of them answers.
pub struct ProviderRouter {
    slots: Vec<ProviderSlot>,
}

impl ProviderRouter {
    pub fn new(slots: Vec<ProviderSlot>) -> Self {
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[async_trait]
impl LlmProvider for ProviderRouter {
    fn name(&self) -> &str {
        "router"
    }

    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let mut last_err = None;
        for (index, slot) in self.slots.iter().enumerate() {
            match slot.send(req).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if index + 1 < self.slots.len() {
                        info!(provider = %slot.provider.name(), "failing over to next provider");
                    }
                    last_err = Some(e);
                }
            }
        }
        Err(last_err
            .unwrap_or_else(|| ProviderError::Unavailable("no providers in router".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use dolmetsch_core::TranscriptEntry;

    /// Fails `failures` times with `error`, then answers with its name.
    struct Scripted {
        name: &'static str,
        failures: u32,
        rate_limited: bool,
        calls: Arc<AtomicU32>,
    }

    impl Scripted {
        fn new(name: &'static str, failures: u32, rate_limited: bool) -> (Self, Arc<AtomicU32>) {
            let calls = Arc::new(AtomicU32::new(0));
            let provider = Self {
                name,
                failures,
                rate_limited,
                calls: Arc::clone(&calls),
            };
            (provider, calls)
        }
    }

    #[async_trait]
    impl LlmProvider for Scripted {
        fn name(&self) -> &str {
            self.name
        }
        async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(if self.rate_limited {
                    ProviderError::RateLimited { retry_after_ms: 1 }
                } else {
                    ProviderError::Api {
                        status: 500,
                        message: format!("{} down", self.name),
                    }
                });
            }
            Ok(ChatResponse {
                content: self.name.to_string(),
                model: req.model.clone(),
                tokens_in: 1,
                tokens_out: 1,
                stop_reason: "end_turn".to_string(),
            })
        }
    }

    fn request() -> ChatRequest {
        ChatRequest {
            model: "m".to_string(),
            system: String::new(),
            messages: vec![TranscriptEntry::user("hallo")],
            max_tokens: 16,
        }
    }

    #[tokio::test]
    async fn retry_on_same_slot_recovers() {
        let (flaky, calls) = Scripted::new("flaky", 1, false);
        let router = ProviderRouter::new(vec![ProviderSlot::new(Box::new(flaky), 2)]);

        assert_eq!(router.send(&request()).await.unwrap().content, "flaky");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exhausted_slot_fails_over() {
        let (down, down_calls) = Scripted::new("down", u32::MAX, false);
        let (backup, _) = Scripted::new("backup", 0, false);
        let router = ProviderRouter::new(vec![
            ProviderSlot::new(Box::new(down), 1),
            ProviderSlot::new(Box::new(backup), 0),
        ]);

        assert_eq!(router.send(&request()).await.unwrap().content, "backup");
        assert_eq!(down_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn rate_limit_moves_on_without_retrying() {
        let (limited, limited_calls) = Scripted::new("limited", u32::MAX, true);
        let (backup, _) = Scripted::new("backup", 0, false);
        let router = ProviderRouter::new(vec![
            ProviderSlot::new(Box::new(limited), 3),
            ProviderSlot::new(Box::new(backup), 0),
        ]);

        assert!(router.send(&request()).await.is_ok());
        assert_eq!(limited_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn last_slot_error_is_returned() {
        let (first, _) = Scripted::new("first", u32::MAX, false);
        let (second, _) = Scripted::new("second", u32::MAX, true);
        let router = ProviderRouter::new(vec![
            ProviderSlot::new(Box::new(first), 0),
            ProviderSlot::new(Box::new(second), 0),
        ]);

        let err = router.send(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn empty_router_is_unavailable() {
        let router = ProviderRouter::new(Vec::new());
        assert!(router.is_empty());
        let err = router.send(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }
}
