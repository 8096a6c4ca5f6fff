use crate::detection::domain::emotion_detector::BoundingBox;
use crate::shared::emotion::Emotion;
use crate::shared::frame::Frame;

/// Draws a per-face overlay (box plus emotion label) onto a frame.
///
/// Infallible by contract: implementations clip at frame edges rather than
/// reject out-of-bounds boxes, so a bad detection can never fail the worker.
pub trait FrameAnnotator: Send {
    fn annotate(&self, frame: &mut Frame, face: &BoundingBox, label: Emotion);
}

/// Annotator that leaves frames untouched.
///
/// For deployments that only want the numeric summary, and for tests where
/// pixel output is irrelevant.
pub struct NullFrameAnnotator;

impl FrameAnnotator for NullFrameAnnotator {
    fn annotate(&self, _frame: &mut Frame, _face: &BoundingBox, _label: Emotion) {}
}
