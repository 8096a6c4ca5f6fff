use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::detection::domain::emotion_detector::EmotionDetector;
use crate::pipeline::emotion_pipeline::PipelineShared;
use crate::shared::frame::Frame;

/// Background consumer loop. Runs on its own thread for the pipeline's
/// lifetime; the facade stops it through the shutdown flag.
///
/// Sleeps `backoff` whenever the pipeline is idle or a drain comes up
/// empty. While a session is active, frames are processed strictly in
/// arrival order, one at a time; a stop only takes effect once the loop
/// observes it before the next drain, so in-flight frames always complete.
pub(crate) fn run(
    shared: Arc<PipelineShared>,
    mut detector: Box<dyn EmotionDetector>,
    annotator: Box<dyn FrameAnnotator>,
    backoff: Duration,
) {
    while !shared.shutdown.load(Ordering::Relaxed) {
        if !shared.sessions.is_active() {
            std::thread::sleep(backoff);
            continue;
        }

        let frames = shared.queue.drain();
        if frames.is_empty() {
            std::thread::sleep(backoff);
            continue;
        }

        for frame in frames {
            process_frame(frame, detector.as_mut(), annotator.as_ref(), &shared);
        }
    }
}

/// One frame through the pipeline: detect, aggregate, annotate, log,
/// publish.
///
/// A detector failure skips the frame entirely (no counters, no latest
/// slot update). A store failure loses only that log line. Neither is
/// fatal to the loop.
pub(crate) fn process_frame(
    mut frame: Frame,
    detector: &mut dyn EmotionDetector,
    annotator: &dyn FrameAnnotator,
    shared: &PipelineShared,
) {
    let observations = match detector.detect(&frame) {
        Ok(observations) => observations,
        Err(e) => {
            log::warn!("detector failed on frame {}, skipping: {e}", frame.sequence());
            return;
        }
    };

    let session = shared.sessions.current_session();
    for observation in &observations {
        let emotion = observation.dominant();
        shared.aggregator.increment(emotion);
        annotator.annotate(&mut frame, &observation.region, emotion);
        if let Some(id) = session {
            if let Err(e) = shared.store.append_emotion(id, emotion) {
                log::warn!("failed to log {emotion} for session {id}: {e}");
            }
        }
    }

    shared.publish_latest(frame);
}
