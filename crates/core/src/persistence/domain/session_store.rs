use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::emotion::Emotion;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("unknown session {0}")]
    UnknownSession(SessionId),
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Opaque identifier for one monitoring session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub i64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reference to the user who owns a session. Identity management lives
/// outside the core; this is carried through to the store untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Durable rolling totals across all completed sessions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalAggregate {
    pub total_sessions: u64,
    pub total_faces_detected: u64,
    pub most_common_emotion: Option<Emotion>,
}

/// Persistence seam for session records, per-face emotion logs, and the
/// global aggregate.
///
/// Every call is best-effort from the core's perspective: the worker and
/// the lifecycle manager log failures and keep going, so in-memory and
/// durable state may diverge transiently. Shared by the lifecycle manager
/// (create/finalize) and the worker (append), hence `Send + Sync`.
pub trait SessionStore: Send + Sync {
    fn create_session(&self, user: UserId) -> Result<SessionId, StoreError>;

    /// Records one `(session, emotion)` observation.
    fn append_emotion(&self, session: SessionId, emotion: Emotion) -> Result<(), StoreError>;

    /// Closes a session record with its final totals.
    fn finalize_session(
        &self,
        session: SessionId,
        total_faces: u64,
        dominant: Emotion,
    ) -> Result<(), StoreError>;

    /// Applies one completed session's delta to the rolling totals.
    fn update_global_aggregate(
        &self,
        delta_faces: u64,
        dominant: Emotion,
    ) -> Result<(), StoreError>;
}
