//! Voice payload codec
//!
//! Frames travel as raw PCM16; these wrappers sit where a compressing codec
//! would and keep its statistics.

pub mod encoder;
pub mod decoder;

pub use encoder::{EncoderStats, PcmEncoder};
pub use decoder::{DecoderStats, PcmDecoder};
