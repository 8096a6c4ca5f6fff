use std::collections::HashMap;

use serde::Deserialize;

use crate::detection::domain::emotion_detector::{
    BoundingBox, DetectorError, EmotionDetector, FaceObservation,
};
use crate::shared::emotion::{Emotion, EmotionScores};
use crate::shared::frame::Frame;

/// Detector that replays a pre-recorded script of observations keyed by
/// frame sequence number.
///
/// Frames without a script entry yield no faces. Used by the replay harness
/// and by integration tests that need deterministic detections without a
/// model backend.
pub struct ScriptedDetector {
    frames: HashMap<u64, Vec<FaceObservation>>,
}

/// Script wire format: a map from frame sequence number to face entries,
/// each with a box and a sparse emotion→score map. Unlisted categories
/// score zero.
#[derive(Deserialize)]
struct ScriptedFace {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    scores: HashMap<Emotion, f32>,
}

impl ScriptedDetector {
    pub fn new(frames: HashMap<u64, Vec<FaceObservation>>) -> Self {
        Self { frames }
    }

    /// Parses a JSON script, e.g.
    /// `{"0": [{"x":10,"y":10,"width":40,"height":40,"scores":{"happy":0.9}}]}`.
    pub fn from_json(json: &str) -> Result<Self, DetectorError> {
        let raw: HashMap<u64, Vec<ScriptedFace>> = serde_json::from_str(json)?;
        let frames = raw
            .into_iter()
            .map(|(seq, faces)| {
                let observations = faces
                    .into_iter()
                    .map(|f| FaceObservation {
                        region: BoundingBox {
                            x: f.x,
                            y: f.y,
                            width: f.width,
                            height: f.height,
                        },
                        scores: f.scores.into_iter().collect::<EmotionScores>(),
                    })
                    .collect();
                (seq, observations)
            })
            .collect();
        Ok(Self { frames })
    }
}

impl EmotionDetector for ScriptedDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceObservation>, DetectorError> {
        Ok(self
            .frames
            .get(&frame.sequence())
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn frame(sequence: u64) -> Frame {
        Frame::new(vec![0u8; 4 * 4 * 3], 4, 4, 3, sequence)
    }

    #[test]
    fn test_unknown_frame_yields_no_faces() {
        let mut detector = ScriptedDetector::new(HashMap::new());
        assert!(detector.detect(&frame(0)).unwrap().is_empty());
    }

    #[test]
    fn test_replays_observations_by_sequence() {
        let obs = FaceObservation {
            region: BoundingBox {
                x: 1,
                y: 2,
                width: 3,
                height: 4,
            },
            scores: [(Emotion::Neutral, 0.6)].into_iter().collect(),
        };
        let mut detector = ScriptedDetector::new(HashMap::from([(7, vec![obs.clone()])]));

        assert!(detector.detect(&frame(6)).unwrap().is_empty());
        assert_eq!(detector.detect(&frame(7)).unwrap(), vec![obs]);
    }

    #[test]
    fn test_from_json_parses_sparse_scores() {
        let script = r#"{
            "0": [{"x": 10, "y": 20, "width": 40, "height": 50,
                   "scores": {"happy": 0.9, "sad": 0.1}}],
            "2": []
        }"#;
        let mut detector = ScriptedDetector::from_json(script).unwrap();

        let faces = detector.detect(&frame(0)).unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].region.x, 10);
        assert_relative_eq!(faces[0].scores.get(Emotion::Happy), 0.9);
        assert_relative_eq!(faces[0].scores.get(Emotion::Fear), 0.0);
        assert_eq!(faces[0].dominant(), Emotion::Happy);

        assert!(detector.detect(&frame(2)).unwrap().is_empty());
    }

    #[test]
    fn test_from_json_rejects_malformed_script() {
        let result = ScriptedDetector::from_json("{\"0\": [{\"x\": true}]}");
        assert!(matches!(result, Err(DetectorError::Script(_))));
    }
}
