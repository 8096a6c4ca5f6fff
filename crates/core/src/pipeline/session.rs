use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::persistence::domain::session_store::{SessionId, SessionStore, UserId};
use crate::pipeline::aggregator::EmotionAggregator;

/// Lifecycle state machine for the single global monitoring session:
/// `Idle <-> Active`, at most one session active at a time.
///
/// The activation flag and current session id are written only here, from
/// the control surface, and read atomically by the producer and the worker.
/// Start/stop themselves must not be called concurrently; there is exactly
/// one control surface.
pub struct SessionManager {
    active: AtomicBool,
    current: Mutex<Option<SessionId>>,
    store: Arc<dyn SessionStore>,
    aggregator: Arc<EmotionAggregator>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, aggregator: Arc<EmotionAggregator>) -> Self {
        Self {
            active: AtomicBool::new(false),
            current: Mutex::new(None),
            store,
            aggregator,
        }
    }

    pub fn is_active(&self) -> bool {
        // pairs with the Release stores in start/stop: observing the flag
        // implies the session id written before it is visible too
        self.active.load(Ordering::Acquire)
    }

    pub fn current_session(&self) -> Option<SessionId> {
        *self.current.lock().expect("session id lock poisoned")
    }

    /// Activates a new session. Returns `false` without side effects when a
    /// session is already active (start-while-active is a no-op, not an
    /// error).
    ///
    /// A failed session-record write is logged and the session still
    /// activates with no id; the worker then skips log appends and `stop`
    /// skips finalization.
    pub fn start(&self, user: UserId) -> bool {
        if self.is_active() {
            return false;
        }

        self.aggregator.reset();

        let id = match self.store.create_session(user) {
            Ok(id) => Some(id),
            Err(e) => {
                log::error!("failed to create session record: {e}");
                None
            }
        };
        *self.current.lock().expect("session id lock poisoned") = id;

        self.active.store(true, Ordering::Release);
        log::info!("session {} started", id.map_or("<unrecorded>".into(), |i| i.to_string()));
        true
    }

    /// Finalizes and deactivates the current session; a no-op when idle.
    ///
    /// The dominant emotion is the argmax over the final histogram, ties
    /// resolved by canonical category order. Persistence failures are
    /// logged and do not roll back in-memory state.
    pub fn stop(&self) {
        if !self.is_active() {
            return;
        }

        let summary = self.aggregator.snapshot();
        let dominant = summary.dominant();

        if let Some(id) = self.current_session() {
            if let Err(e) = self
                .store
                .finalize_session(id, summary.total_faces(), dominant)
            {
                log::error!("failed to finalize session {id}: {e}");
            }
            if let Err(e) = self
                .store
                .update_global_aggregate(summary.total_faces(), dominant)
            {
                log::error!("failed to update global aggregate: {e}");
            }
            log::info!(
                "session {id} stopped: {} faces, dominant {dominant}",
                summary.total_faces()
            );
        }

        self.active.store(false, Ordering::Release);
        *self.current.lock().expect("session id lock poisoned") = None;
    }
}
