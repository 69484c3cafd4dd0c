//! In-memory conversation store, sharded per principal.
//!
//! The outer map lock is held only long enough to fetch or create a shard
//! handle; each shard has its own mutex, so appends for different
//! principals never contend while appends for the same principal are
//! strictly serialized by arrival order.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use chatforge_core::error::StorageError;
use chatforge_core::store::{ConversationStore, NewTurn};
use chatforge_core::turn::{PrincipalId, Turn, TurnId};

#[derive(Default)]
struct Shard {
    next_id: u64,
    turns: Vec<Turn>,
}

/// An in-memory `ConversationStore`. Turn ids are monotonic per principal,
/// assigned under the shard lock.
pub struct InMemoryConversationStore {
    shards: RwLock<HashMap<PrincipalId, Arc<Mutex<Shard>>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self {
            shards: RwLock::new(HashMap::new()),
        }
    }

    async fn shard(&self, principal: &PrincipalId) -> Option<Arc<Mutex<Shard>>> {
        self.shards.read().await.get(principal).cloned()
    }

    async fn shard_or_create(&self, principal: &PrincipalId) -> Arc<Mutex<Shard>> {
        if let Some(shard) = self.shard(principal).await {
            return shard;
        }
        let mut shards = self.shards.write().await;
        shards
            .entry(principal.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Shard::default())))
            .clone()
    }
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn append(
        &self,
        principal: &PrincipalId,
        turn: NewTurn,
    ) -> Result<Turn, StorageError> {
        let shard = self.shard_or_create(principal).await;
        let mut shard = shard.lock().await;

        shard.next_id += 1;
        let turn = Turn {
            id: TurnId(shard.next_id),
            principal_id: principal.clone(),
            input: turn.input,
            output: turn.output,
            created_at: Utc::now(),
        };
        shard.turns.push(turn.clone());

        debug!(principal = %principal, turn_id = %turn.id, "Appended turn");
        Ok(turn)
    }

    async fn recent(
        &self,
        principal: &PrincipalId,
        limit: usize,
    ) -> Result<Vec<Turn>, StorageError> {
        let Some(shard) = self.shard(principal).await else {
            return Ok(Vec::new());
        };
        let shard = shard.lock().await;
        let skip = shard.turns.len().saturating_sub(limit);
        Ok(shard.turns[skip..].to_vec())
    }

    async fn search(
        &self,
        principal: &PrincipalId,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Turn>, StorageError> {
        let Some(shard) = self.shard(principal).await else {
            return Ok(Vec::new());
        };
        let shard = shard.lock().await;
        let needle = query.to_lowercase();

        let mut hits = Vec::new();
        for turn in shard.turns.iter().rev() {
            if hits.len() == limit {
                break;
            }
            let serialized = serde_json::to_string(turn)
                .map_err(|e| StorageError::Unavailable(format!("turn serialization: {e}")))?;
            if serialized.to_lowercase().contains(&needle) {
                hits.push(turn.clone());
            }
        }
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatforge_core::turn::{TurnInput, TurnOutput};

    fn new_turn(message: &str, content: &str) -> NewTurn {
        NewTurn {
            input: TurnInput::message(message),
            output: TurnOutput {
                content: content.into(),
                tool_invocations: vec![],
                reasoning: None,
                truncated: false,
            },
        }
    }

    #[tokio::test]
    async fn append_assigns_monotonic_ids() {
        let store = InMemoryConversationStore::new();
        let p: PrincipalId = "alice".into();

        let a = store.append(&p, new_turn("one", "1")).await.unwrap();
        let b = store.append(&p, new_turn("two", "2")).await.unwrap();
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn recent_returns_last_n_oldest_first() {
        let store = InMemoryConversationStore::new();
        let p: PrincipalId = "alice".into();
        for i in 0..5 {
            store
                .append(&p, new_turn(&format!("msg {i}"), "ok"))
                .await
                .unwrap();
        }

        let window = store.recent(&p, 3).await.unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].input.message, "msg 2");
        assert_eq!(window[2].input.message, "msg 4");
        assert!(window[0].id < window[1].id && window[1].id < window[2].id);
    }

    #[tokio::test]
    async fn recent_for_unknown_principal_is_empty() {
        let store = InMemoryConversationStore::new();
        let window = store.recent(&"nobody".into(), 10).await.unwrap();
        assert!(window.is_empty());
    }

    #[tokio::test]
    async fn principals_are_isolated() {
        let store = InMemoryConversationStore::new();
        store
            .append(&"alice".into(), new_turn("private", "ok"))
            .await
            .unwrap();

        let bob_window = store.recent(&"bob".into(), 10).await.unwrap();
        assert!(bob_window.is_empty());
    }

    #[tokio::test]
    async fn search_is_case_insensitive_most_recent_first() {
        let store = InMemoryConversationStore::new();
        let p: PrincipalId = "alice".into();
        store.append(&p, new_turn("tell me about RUST", "sure")).await.unwrap();
        store.append(&p, new_turn("and python?", "also sure")).await.unwrap();
        store.append(&p, new_turn("more rust please", "ok")).await.unwrap();

        let hits = store.search(&p, "rust", 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].input.message, "more rust please");
        assert_eq!(hits[1].input.message, "tell me about RUST");
    }

    #[tokio::test]
    async fn search_respects_limit() {
        let store = InMemoryConversationStore::new();
        let p: PrincipalId = "alice".into();
        for i in 0..5 {
            store
                .append(&p, new_turn(&format!("rust question {i}"), "ok"))
                .await
                .unwrap();
        }

        let hits = store.search(&p, "rust", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].input.message, "rust question 4");
    }

    #[tokio::test]
    async fn concurrent_appends_for_one_principal_keep_total_order() {
        let store = Arc::new(InMemoryConversationStore::new());
        let p: PrincipalId = "alice".into();

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            let p = p.clone();
            handles.push(tokio::spawn(async move {
                store.append(&p, new_turn(&format!("m{i}"), "ok")).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let window = store.recent(&p, 50).await.unwrap();
        assert_eq!(window.len(), 20);
        for pair in window.windows(2) {
            assert!(pair[0].id < pair[1].id, "ids must be strictly increasing");
        }
    }
}
