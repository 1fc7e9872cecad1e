use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, instrument};

use dolmetsch_core::{ConversationId, Mode, Role};

use crate::types::ConversationState;

/// In-memory index of per-conversation state.
///
/// Each conversation sits behind its own async mutex so that a turn that
/// awaits a backend call holds only that conversation; the map itself is
/// sharded and never locked across an await. Nothing here can fail, and
/// nothing is ever removed.
#[derive(Default)]
pub struct ConversationStore {
    conversations: DashMap<ConversationId, Arc<Mutex<ConversationState>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to a conversation, creating the default state if absent.
    fn entry(&self, id: &ConversationId) -> Arc<Mutex<ConversationState>> {
        // Fast path: conversation already known
        if let Some(existing) = self.conversations.get(id) {
            return Arc::clone(existing.value());
        }
        let handle = self
            .conversations
            .entry(id.clone())
            .or_insert_with(|| {
                debug!(conversation = %id, "new conversation");
                Arc::new(Mutex::new(ConversationState::default()))
            });
        Arc::clone(handle.value())
    }

    /// Snapshot of a conversation's state.
    #[instrument(skip(self), fields(conversation = %id))]
    pub async fn get(&self, id: &ConversationId) -> ConversationState {
        self.entry(id).lock().await.clone()
    }

    #[instrument(skip(self), fields(conversation = %id))]
    pub async fn set_mode(&self, id: &ConversationId, mode: Mode) {
        self.entry(id).lock().await.mode = mode;
        debug!(%mode, "mode switched");
    }

    #[instrument(skip(self, original, translated), fields(conversation = %id))]
    pub async fn append_translation(&self, id: &ConversationId, original: &str, translated: &str) {
        self.entry(id)
            .lock()
            .await
            .push_translation(original, translated);
    }

    #[instrument(skip(self, content), fields(conversation = %id))]
    pub async fn append_transcript(&self, id: &ConversationId, role: Role, content: &str) {
        self.entry(id).lock().await.push_transcript(role, content);
    }

    /// Exclusive access to one conversation for the duration of a turn.
    ///
    /// Other conversations are unaffected. While the guard is held, the
    /// other methods of this store block for the same id.
    pub async fn lock(&self, id: &ConversationId) -> OwnedMutexGuard<ConversationState> {
        self.entry(id).lock_owned().await
    }

    /// Number of conversations seen so far.
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn id(s: &str) -> ConversationId {
        ConversationId::from(s)
    }

    #[tokio::test]
    async fn get_creates_default_state() {
        let store = ConversationStore::new();
        assert!(store.is_empty());

        let state = store.get(&id("1")).await;
        assert_eq!(state, ConversationState::default());
        assert_eq!(store.len(), 1);

        // idempotent
        store.get(&id("1")).await;
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn set_mode_is_per_conversation() {
        let store = ConversationStore::new();
        store.set_mode(&id("a"), Mode::Converse).await;

        assert_eq!(store.get(&id("a")).await.mode, Mode::Converse);
        assert_eq!(store.get(&id("b")).await.mode, Mode::Translate);
    }

    #[tokio::test]
    async fn appends_are_chronological() {
        let store = ConversationStore::new();
        let c = id("chat");
        store.append_translation(&c, "hello", "hallo").await;
        store.append_translation(&c, "cat", "Katze").await;
        store.append_transcript(&c, Role::User, "hi").await;
        store.append_transcript(&c, Role::Assistant, "hey").await;

        let state = store.get(&c).await;
        let originals: Vec<_> = state
            .translation_log
            .iter()
            .map(|e| e.original.as_str())
            .collect();
        assert_eq!(originals, ["hello", "cat"]);
        assert_eq!(state.transcript.len(), 2);
        assert_eq!(state.transcript[0].role, Role::User);
        assert_eq!(state.transcript[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn snapshot_is_detached() {
        let store = ConversationStore::new();
        let c = id("snap");
        let mut snapshot = store.get(&c).await;
        snapshot.mode = Mode::Converse;
        assert_eq!(store.get(&c).await.mode, Mode::Translate);
    }

    #[tokio::test]
    async fn lock_serializes_same_conversation_only() {
        let store = Arc::new(ConversationStore::new());
        let busy = id("busy");
        let mut guard = store.lock(&busy).await;

        // A different conversation is not blocked by the held guard.
        tokio::time::timeout(Duration::from_secs(1), store.get(&id("other")))
            .await
            .expect("other conversation must not block");

        let waiter = {
            let store = Arc::clone(&store);
            let busy = busy.clone();
            tokio::spawn(async move { store.get(&busy).await.mode })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        guard.mode = Mode::Converse;
        drop(guard);
        assert_eq!(waiter.await.unwrap(), Mode::Converse);
    }
}
