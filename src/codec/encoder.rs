//! Voice frame encoder
//!
//! The wire payload is the raw PCM16 frame; the encoder validates the frame
//! and keeps the statistics a real codec would.

use serde::Serialize;

use crate::constants::PCM_BUFFER_SIZE;
use crate::error::CodecError;

/// Identity PCM16 encoder
#[derive(Debug, Default)]
pub struct PcmEncoder {
    /// Frame counter for statistics
    frames_encoded: u64,
    /// Total bytes produced
    bytes_produced: u64,
}

impl PcmEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode one PCM frame into `output`, returning the payload length
    ///
    /// Input must be exactly one packet of PCM16 mono.
    pub fn encode(&mut self, pcm: &[u8], output: &mut Vec<u8>) -> Result<usize, CodecError> {
        if pcm.len() != PCM_BUFFER_SIZE {
            return Err(CodecError::InvalidFrameSize(pcm.len()));
        }

        output.clear();
        output.extend_from_slice(pcm);

        self.frames_encoded += 1;
        self.bytes_produced += pcm.len() as u64;

        Ok(pcm.len())
    }

    /// Get statistics
    pub fn stats(&self) -> EncoderStats {
        EncoderStats {
            frames_encoded: self.frames_encoded,
            bytes_produced: self.bytes_produced,
            average_frame_size: if self.frames_encoded > 0 {
                self.bytes_produced as f32 / self.frames_encoded as f32
            } else {
                0.0
            },
        }
    }

    /// Reset statistics
    pub fn reset_stats(&mut self) {
        self.frames_encoded = 0;
        self.bytes_produced = 0;
    }
}

/// Encoder statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct EncoderStats {
    pub frames_encoded: u64,
    pub bytes_produced: u64,
    pub average_frame_size: f32,
}
