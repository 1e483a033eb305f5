//! Receive-side playback

pub mod scheduler;
pub mod sink;
pub mod sizing;

pub use scheduler::PlaybackScheduler;
pub use sink::{MemorySink, PlaybackSink, SinkCounters};
pub use sizing::compute_ring_length;
