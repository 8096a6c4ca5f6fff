use std::sync::Mutex;

use crate::persistence::domain::session_store::{
    GlobalAggregate, SessionId, SessionStore, StoreError, UserId,
};
use crate::shared::emotion::Emotion;

/// One session's record as held by the in-memory store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: SessionId,
    pub user: UserId,
    pub total_faces: Option<u64>,
    pub dominant: Option<Emotion>,
}

impl SessionRecord {
    pub fn is_finalized(&self) -> bool {
        self.total_faces.is_some()
    }
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    sessions: Vec<SessionRecord>,
    logs: Vec<(SessionId, Emotion)>,
    aggregate: GlobalAggregate,
}

/// In-memory session store mirroring the durable schema
/// (sessions / emotion logs / global stats) without a database.
///
/// Serves as the default store for embedded use and as the test double for
/// every lifecycle and worker test.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<Inner>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> Vec<SessionRecord> {
        self.lock().sessions.clone()
    }

    pub fn emotions_for(&self, session: SessionId) -> Vec<Emotion> {
        self.lock()
            .logs
            .iter()
            .filter(|(id, _)| *id == session)
            .map(|&(_, emotion)| emotion)
            .collect()
    }

    pub fn global_aggregate(&self) -> GlobalAggregate {
        self.lock().aggregate.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("session store lock poisoned")
    }
}

impl SessionStore for MemorySessionStore {
    fn create_session(&self, user: UserId) -> Result<SessionId, StoreError> {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = SessionId(inner.next_id);
        inner.sessions.push(SessionRecord {
            id,
            user,
            total_faces: None,
            dominant: None,
        });
        Ok(id)
    }

    fn append_emotion(&self, session: SessionId, emotion: Emotion) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.sessions.iter().any(|s| s.id == session) {
            return Err(StoreError::UnknownSession(session));
        }
        inner.logs.push((session, emotion));
        Ok(())
    }

    fn finalize_session(
        &self,
        session: SessionId,
        total_faces: u64,
        dominant: Emotion,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let record = inner
            .sessions
            .iter_mut()
            .find(|s| s.id == session)
            .ok_or(StoreError::UnknownSession(session))?;
        record.total_faces = Some(total_faces);
        record.dominant = Some(dominant);
        Ok(())
    }

    fn update_global_aggregate(
        &self,
        delta_faces: u64,
        dominant: Emotion,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.aggregate.total_sessions += 1;
        inner.aggregate.total_faces_detected += delta_faces;
        inner.aggregate.most_common_emotion = Some(dominant);
        Ok(())
    }
}
