//! Live emotion-monitoring frame pipeline.
//!
//! Frames flow producer → queue → worker → detector/aggregator/store, with
//! the last annotated frame and a running summary exposed as snapshots.
//! Transport, authentication, and rendering live outside this crate and
//! talk to it through [`EmotionPipeline`] and the domain trait seams.

pub mod annotation;
pub mod detection;
pub mod persistence;
pub mod pipeline;
pub mod shared;

pub use crate::pipeline::emotion_pipeline::EmotionPipeline;
pub use crate::shared::emotion::{Emotion, EmotionScores, EmotionSummary};
pub use crate::shared::frame::Frame;
