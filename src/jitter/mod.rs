//! Receive-side jitter buffering

pub mod buffer;

pub use buffer::{Insertion, JitterBuffer, Sequence, Slot};
