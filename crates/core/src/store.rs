//! ConversationStore trait — the append-only per-principal turn log.
//!
//! The durable state the engine reads and writes. Principal scoping is
//! absolute: no operation can read another principal's window.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::turn::{PrincipalId, Turn, TurnInput, TurnOutput};

/// Default window size for `recent`.
pub const DEFAULT_RECENT_LIMIT: usize = 50;

/// Default cap for `search` results.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// A turn not yet appended. The store assigns the id and timestamp so that
/// id monotonicity is enforced under the same lock as append ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTurn {
    pub input: TurnInput,
    pub output: TurnOutput,
}

/// The append-only conversation log.
///
/// Implementations must serialize appends per principal (total order by
/// arrival) without blocking appends for other principals. A single global
/// lock across all principals is a scalability bug, not a design goal.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// The backend name (e.g. "in_memory").
    fn name(&self) -> &str;

    /// Append a completed turn. O(1) amortized; fails only on an
    /// unrecoverable storage fault. Returns the turn with its assigned id.
    async fn append(
        &self,
        principal: &PrincipalId,
        turn: NewTurn,
    ) -> std::result::Result<Turn, StorageError>;

    /// The last `limit` turns for a principal, oldest-first. Repeated calls
    /// with the same arguments return a consistent snapshot absent
    /// concurrent writes. Unknown principals yield an empty window.
    async fn recent(
        &self,
        principal: &PrincipalId,
        limit: usize,
    ) -> std::result::Result<Vec<Turn>, StorageError>;

    /// Turns whose serialized content case-insensitively contains `query`,
    /// most-recent-first, capped at `limit`.
    async fn search(
        &self,
        principal: &PrincipalId,
        query: &str,
        limit: usize,
    ) -> std::result::Result<Vec<Turn>, StorageError>;
}
