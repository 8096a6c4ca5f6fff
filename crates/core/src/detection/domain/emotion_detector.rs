use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::emotion::{Emotion, EmotionScores};
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("detector backend failure: {0}")]
    Backend(String),
    #[error("unsupported frame format: {0}")]
    UnsupportedFrame(String),
    #[error("invalid detection script: {0}")]
    Script(#[from] serde_json::Error),
}

/// Axis-aligned face box in pixel coordinates.
///
/// Coordinates may fall partially outside the frame; consumers clip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// One detected face: where it is and how each emotion category scored.
///
/// Produced per face per frame and consumed immediately by the worker;
/// never retained across frames.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceObservation {
    pub region: BoundingBox,
    pub scores: EmotionScores,
}

impl FaceObservation {
    /// Highest-scoring category for this face (canonical-order tie-break).
    pub fn dominant(&self) -> Emotion {
        self.scores.dominant()
    }
}

/// Domain interface for face/emotion detection.
///
/// Implementations may be stateful (caching, tracking), hence `&mut self`.
/// Internal failures must surface as `DetectorError`, never as a panic
/// across this seam; the worker logs the error and skips the frame.
pub trait EmotionDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceObservation>, DetectorError>;
}
