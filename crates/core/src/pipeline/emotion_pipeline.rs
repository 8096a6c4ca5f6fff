use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::detection::domain::emotion_detector::EmotionDetector;
use crate::persistence::domain::session_store::{SessionStore, UserId};
use crate::pipeline::aggregator::EmotionAggregator;
use crate::pipeline::frame_queue::FrameQueue;
use crate::pipeline::session::SessionManager;
use crate::pipeline::worker;
use crate::shared::constants::IDLE_BACKOFF;
use crate::shared::emotion::EmotionSummary;
use crate::shared::frame::Frame;

/// State shared between the producer-facing facade and the worker thread.
pub(crate) struct PipelineShared {
    pub(crate) queue: FrameQueue,
    pub(crate) aggregator: Arc<EmotionAggregator>,
    pub(crate) sessions: SessionManager,
    pub(crate) store: Arc<dyn SessionStore>,
    latest_frame: Mutex<Option<Frame>>,
    pub(crate) shutdown: AtomicBool,
}

impl PipelineShared {
    pub(crate) fn new(store: Arc<dyn SessionStore>) -> Self {
        let aggregator = Arc::new(EmotionAggregator::new());
        Self {
            queue: FrameQueue::new(),
            sessions: SessionManager::new(store.clone(), aggregator.clone()),
            aggregator,
            store,
            latest_frame: Mutex::new(None),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Last-write-wins slot for the most recently processed frame.
    pub(crate) fn publish_latest(&self, frame: Frame) {
        *self.latest_frame.lock().expect("latest-frame lock poisoned") = Some(frame);
    }

    pub(crate) fn latest(&self) -> Option<Frame> {
        self.latest_frame
            .lock()
            .expect("latest-frame lock poisoned")
            .clone()
    }
}

/// The emotion-monitoring pipeline: one explicitly constructed context
/// owning the frame queue, the aggregator, the session lifecycle, and the
/// background worker thread.
///
/// Producer methods (`submit_frame`, `latest_frame`, `emotion_summary`)
/// never block: reads return immediately with possibly stale snapshots.
/// The control surface (`start_session`, `stop_session`) must not be
/// called from multiple threads at once. Dropping the pipeline stops and
/// joins the worker; in-flight frames finish first.
pub struct EmotionPipeline {
    shared: Arc<PipelineShared>,
    worker: Option<JoinHandle<()>>,
}

impl EmotionPipeline {
    pub fn new(
        detector: Box<dyn EmotionDetector>,
        annotator: Box<dyn FrameAnnotator>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self::with_backoff(detector, annotator, store, IDLE_BACKOFF)
    }

    /// As `new`, with an explicit worker back-off interval.
    pub fn with_backoff(
        detector: Box<dyn EmotionDetector>,
        annotator: Box<dyn FrameAnnotator>,
        store: Arc<dyn SessionStore>,
        backoff: Duration,
    ) -> Self {
        let shared = Arc::new(PipelineShared::new(store));
        let worker = {
            let shared = shared.clone();
            std::thread::spawn(move || worker::run(shared, detector, annotator, backoff))
        };
        Self {
            shared,
            worker: Some(worker),
        }
    }

    /// Buffers a frame for processing. Fire-and-forget: frames submitted
    /// while no session is active are dropped, and queue failures only
    /// cost the one frame.
    pub fn submit_frame(&self, frame: Frame) {
        if !self.shared.sessions.is_active() {
            log::trace!("frame {} dropped while idle", frame.sequence());
            return;
        }
        if let Err(e) = self.shared.queue.enqueue(frame) {
            log::warn!("{e}");
        }
    }

    /// The most recently processed (annotated) frame, if any. May lag the
    /// newest submission; that staleness is expected, not an error.
    pub fn latest_frame(&self) -> Option<Frame> {
        self.shared.latest()
    }

    /// Snapshot of the running per-session counters.
    pub fn emotion_summary(&self) -> EmotionSummary {
        self.shared.aggregator.snapshot()
    }

    /// Starts a session; `false` when one is already active.
    pub fn start_session(&self, user: UserId) -> bool {
        self.shared.sessions.start(user)
    }

    /// Stops and finalizes the current session; a no-op when idle.
    pub fn stop_session(&self) {
        self.shared.sessions.stop()
    }

    /// Frames buffered but not yet drained by the worker.
    pub fn pending_frames(&self) -> usize {
        self.shared.queue.len()
    }
}

impl Drop for EmotionPipeline {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::error!("worker thread panicked during shutdown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::domain::frame_annotator::NullFrameAnnotator;
    use crate::annotation::infrastructure::box_annotator::BoxAnnotator;
    use crate::detection::domain::emotion_detector::{
        BoundingBox, DetectorError, FaceObservation,
    };
    use crate::detection::infrastructure::scripted_detector::ScriptedDetector;
    use crate::persistence::infrastructure::memory_session_store::MemorySessionStore;
    use crate::shared::constants::OVERLAY_COLOR;
    use crate::shared::emotion::Emotion;
    use std::collections::HashMap;
    use std::time::Instant;

    const TEST_BACKOFF: Duration = Duration::from_millis(1);

    fn frame(sequence: u64) -> Frame {
        Frame::new(vec![0u8; 64 * 64 * 3], 64, 64, 3, sequence)
    }

    fn happy_face() -> FaceObservation {
        FaceObservation {
            region: BoundingBox {
                x: 8,
                y: 30,
                width: 20,
                height: 20,
            },
            scores: [(Emotion::Happy, 0.9)].into_iter().collect(),
        }
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        false
    }

    fn pipeline_with(
        script: HashMap<u64, Vec<FaceObservation>>,
    ) -> (EmotionPipeline, Arc<MemorySessionStore>) {
        let store = Arc::new(MemorySessionStore::new());
        let pipeline = EmotionPipeline::with_backoff(
            Box::new(ScriptedDetector::new(script)),
            Box::new(NullFrameAnnotator),
            store.clone(),
            TEST_BACKOFF,
        );
        (pipeline, store)
    }

    #[test]
    fn test_end_to_end_three_happy_frames() {
        let script = HashMap::from([
            (0, vec![happy_face()]),
            (1, vec![happy_face()]),
            (2, vec![happy_face()]),
        ]);
        let (pipeline, store) = pipeline_with(script);

        assert!(pipeline.start_session(UserId(1)));
        let session = store.sessions()[0].id;
        for i in 0..3 {
            pipeline.submit_frame(frame(i));
        }

        assert!(wait_until(|| pipeline.emotion_summary().total_faces() == 3));
        let summary = pipeline.emotion_summary();
        assert_eq!(summary.count(Emotion::Happy), 3);
        for emotion in Emotion::ALL {
            if emotion != Emotion::Happy {
                assert_eq!(summary.count(emotion), 0);
            }
        }

        pipeline.stop_session();

        let record = &store.sessions()[0];
        assert_eq!(record.total_faces, Some(3));
        assert_eq!(record.dominant, Some(Emotion::Happy));
        assert_eq!(store.emotions_for(session).len(), 3);

        let aggregate = store.global_aggregate();
        assert_eq!(aggregate.total_faces_detected, 3);
        assert_eq!(aggregate.most_common_emotion, Some(Emotion::Happy));
    }

    #[test]
    fn test_latest_frame_is_annotated_last_processed() {
        let store = Arc::new(MemorySessionStore::new());
        let pipeline = EmotionPipeline::with_backoff(
            Box::new(ScriptedDetector::new(HashMap::from([(
                0,
                vec![happy_face()],
            )]))),
            Box::new(BoxAnnotator::new()),
            store,
            TEST_BACKOFF,
        );

        pipeline.start_session(UserId(1));
        pipeline.submit_frame(frame(0));
        assert!(wait_until(|| pipeline.latest_frame().is_some()));

        let latest = pipeline.latest_frame().unwrap();
        assert_eq!(latest.sequence(), 0);
        // face box corner from the scripted observation is painted
        let offset = ((30 * 64 + 8) * 3) as usize;
        assert_eq!(&latest.data()[offset..offset + 3], &OVERLAY_COLOR);
    }

    #[test]
    fn test_frames_submitted_while_idle_are_dropped() {
        let (pipeline, _) = pipeline_with(HashMap::from([
            (0, vec![happy_face()]),
            (1, vec![happy_face()]),
        ]));

        pipeline.submit_frame(frame(0));
        pipeline.submit_frame(frame(1));
        assert_eq!(pipeline.pending_frames(), 0);

        pipeline.start_session(UserId(1));
        std::thread::sleep(TEST_BACKOFF * 20);
        assert_eq!(pipeline.emotion_summary().total_faces(), 0);
        assert!(pipeline.latest_frame().is_none());
    }

    #[test]
    fn test_queued_frames_carry_over_into_next_session() {
        let store = Arc::new(MemorySessionStore::new());
        let shared = Arc::new(PipelineShared::new(store.clone()));
        let mut detector = ScriptedDetector::new(HashMap::from([(0, vec![happy_face()])]));

        // a frame enqueued during one session but never drained
        assert!(shared.sessions.start(UserId(1)));
        shared.queue.enqueue(frame(0)).unwrap();
        shared.sessions.stop();

        // the queue is not purged at start, so it drains into the next one
        assert!(shared.sessions.start(UserId(2)));
        let second = shared.sessions.current_session().unwrap();
        for leftover in shared.queue.drain() {
            worker::process_frame(leftover, &mut detector, &NullFrameAnnotator, &shared);
        }

        let summary = shared.aggregator.snapshot();
        assert_eq!(summary.total_faces(), 1);
        assert_eq!(summary.count(Emotion::Happy), 1);
        assert_eq!(store.emotions_for(second), vec![Emotion::Happy]);
    }

    #[test]
    fn test_start_session_idempotence() {
        let (pipeline, store) = pipeline_with(HashMap::new());
        assert!(pipeline.start_session(UserId(1)));
        assert!(!pipeline.start_session(UserId(1)));
        assert_eq!(store.sessions().len(), 1);
    }

    #[test]
    fn test_stop_without_start_touches_no_store() {
        let (pipeline, store) = pipeline_with(HashMap::new());
        pipeline.stop_session();
        assert!(store.sessions().is_empty());
        assert_eq!(store.global_aggregate().total_sessions, 0);
    }

    #[test]
    fn test_detector_failure_leaves_summary_and_log_untouched() {
        struct FailOnFirst {
            inner: ScriptedDetector,
        }
        impl EmotionDetector for FailOnFirst {
            fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceObservation>, DetectorError> {
                if frame.sequence() == 0 {
                    return Err(DetectorError::Backend("transient".into()));
                }
                self.inner.detect(frame)
            }
        }

        let store = Arc::new(MemorySessionStore::new());
        let pipeline = EmotionPipeline::with_backoff(
            Box::new(FailOnFirst {
                inner: ScriptedDetector::new(HashMap::from([(1, vec![happy_face()])])),
            }),
            Box::new(NullFrameAnnotator),
            store.clone(),
            TEST_BACKOFF,
        );

        pipeline.start_session(UserId(1));
        let session = store.sessions()[0].id;
        pipeline.submit_frame(frame(0));
        pipeline.submit_frame(frame(1));

        // the worker keeps going past the failed frame
        assert!(wait_until(|| pipeline.emotion_summary().total_faces() == 1));
        assert_eq!(store.emotions_for(session), vec![Emotion::Happy]);
        assert_eq!(pipeline.latest_frame().map(|f| f.sequence()), Some(1));
    }

    #[test]
    fn test_summary_resets_between_sessions() {
        let (pipeline, _) = pipeline_with(HashMap::from([(0, vec![happy_face()])]));

        pipeline.start_session(UserId(1));
        pipeline.submit_frame(frame(0));
        assert!(wait_until(|| pipeline.emotion_summary().total_faces() == 1));
        pipeline.stop_session();

        pipeline.start_session(UserId(1));
        assert_eq!(pipeline.emotion_summary().total_faces(), 0);
    }

    #[test]
    fn test_drop_joins_worker_cleanly() {
        let (pipeline, _) = pipeline_with(HashMap::new());
        pipeline.start_session(UserId(1));
        pipeline.submit_frame(frame(0));
        drop(pipeline);
        // reaching here without deadlock is the assertion
    }
}
