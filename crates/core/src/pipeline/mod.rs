pub mod aggregator;
pub mod emotion_pipeline;
pub mod frame_queue;
pub mod session;
pub(crate) mod worker;
