use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::persistence::domain::session_store::{
    GlobalAggregate, SessionId, SessionStore, StoreError, UserId,
};
use crate::shared::emotion::Emotion;

const SESSIONS_FILE: &str = "sessions.jsonl";
const EMOTION_LOG_FILE: &str = "emotion_log.jsonl";
const GLOBAL_STATS_FILE: &str = "global_stats.json";

/// File-backed session store: append-only JSON-lines event logs plus a
/// single global-stats document, all under one data directory.
///
/// Session records are written as started/finalized event pairs; readers
/// fold the pairs back together. Reopening an existing directory resumes
/// id allocation past the highest recorded session.
pub struct JsonSessionStore {
    dir: PathBuf,
    state: Mutex<State>,
}

struct State {
    next_id: i64,
    known: HashSet<i64>,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum SessionEvent {
    Started {
        id: SessionId,
        user: UserId,
        at_unix: u64,
    },
    Finalized {
        id: SessionId,
        at_unix: u64,
        total_faces: u64,
        dominant: Emotion,
    },
}

#[derive(Serialize, Deserialize)]
struct LogLine {
    session: SessionId,
    emotion: Emotion,
}

#[derive(Serialize, Deserialize)]
struct StatsDoc {
    #[serde(flatten)]
    aggregate: GlobalAggregate,
    last_updated_unix: u64,
}

impl JsonSessionStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let mut known = HashSet::new();
        let mut max_id = 0;
        for event in read_events(&dir.join(SESSIONS_FILE))? {
            if let SessionEvent::Started { id, .. } = event {
                known.insert(id.0);
                max_id = max_id.max(id.0);
            }
        }

        Ok(Self {
            dir,
            state: Mutex::new(State {
                next_id: max_id,
                known,
            }),
        })
    }

    pub fn global_aggregate(&self) -> Result<GlobalAggregate, StoreError> {
        let path = self.dir.join(GLOBAL_STATS_FILE);
        if !path.exists() {
            return Ok(GlobalAggregate::default());
        }
        let doc: StatsDoc = serde_json::from_str(&fs::read_to_string(path)?)?;
        Ok(doc.aggregate)
    }

    /// Emotions logged for one session, in append order.
    pub fn emotions_for(&self, session: SessionId) -> Result<Vec<Emotion>, StoreError> {
        let path = self.dir.join(EMOTION_LOG_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut emotions = Vec::new();
        for line in BufReader::new(fs::File::open(path)?).lines() {
            let parsed: LogLine = serde_json::from_str(&line?)?;
            if parsed.session == session {
                emotions.push(parsed.emotion);
            }
        }
        Ok(emotions)
    }

    fn append_line<T: Serialize>(&self, file: &str, value: &T) -> Result<(), StoreError> {
        let line = serde_json::to_string(value)?;
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(file))?;
        writeln!(f, "{line}")?;
        Ok(())
    }

    fn check_known(&self, session: SessionId) -> Result<(), StoreError> {
        let state = self.state.lock().expect("store state lock poisoned");
        if state.known.contains(&session.0) {
            Ok(())
        } else {
            Err(StoreError::UnknownSession(session))
        }
    }
}

impl SessionStore for JsonSessionStore {
    fn create_session(&self, user: UserId) -> Result<SessionId, StoreError> {
        let id = {
            let mut state = self.state.lock().expect("store state lock poisoned");
            state.next_id += 1;
            let id = SessionId(state.next_id);
            state.known.insert(id.0);
            id
        };
        self.append_line(
            SESSIONS_FILE,
            &SessionEvent::Started {
                id,
                user,
                at_unix: now_unix(),
            },
        )?;
        Ok(id)
    }

    fn append_emotion(&self, session: SessionId, emotion: Emotion) -> Result<(), StoreError> {
        self.check_known(session)?;
        self.append_line(EMOTION_LOG_FILE, &LogLine { session, emotion })
    }

    fn finalize_session(
        &self,
        session: SessionId,
        total_faces: u64,
        dominant: Emotion,
    ) -> Result<(), StoreError> {
        self.check_known(session)?;
        self.append_line(
            SESSIONS_FILE,
            &SessionEvent::Finalized {
                id: session,
                at_unix: now_unix(),
                total_faces,
                dominant,
            },
        )
    }

    fn update_global_aggregate(
        &self,
        delta_faces: u64,
        dominant: Emotion,
    ) -> Result<(), StoreError> {
        let mut aggregate = self.global_aggregate()?;
        aggregate.total_sessions += 1;
        aggregate.total_faces_detected += delta_faces;
        aggregate.most_common_emotion = Some(dominant);
        let doc = StatsDoc {
            aggregate,
            last_updated_unix: now_unix(),
        };
        fs::write(
            self.dir.join(GLOBAL_STATS_FILE),
            serde_json::to_string_pretty(&doc)?,
        )?;
        Ok(())
    }
}

fn read_events(path: &Path) -> Result<Vec<SessionEvent>, StoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut events = Vec::new();
    for line in BufReader::new(fs::File::open(path)?).lines() {
        events.push(serde_json::from_str(&line?)?);
    }
    Ok(events)
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
