//! Voice frame decoder
//!
//! Turns wire payloads into stereo playback frames and provides a silent
//! frame for concealment.

use serde::Serialize;

use crate::audio::pcm::pcm16_to_stereo;
use crate::constants::{BUFFER_FRAME_COUNT, PCM_BUFFER_SIZE};
use crate::error::CodecError;

/// PCM16 payload decoder
#[derive(Debug, Default)]
pub struct PcmDecoder {
    /// Frames decoded
    frames_decoded: u64,
    /// Frames concealed with silence
    frames_lost: u64,
    /// Total stereo frames produced
    samples_produced: u64,
}

impl PcmDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a payload into stereo frames, returning the frame count
    pub fn decode_into(&mut self, data: &[u8], output: &mut Vec<[f32; 2]>) -> Result<usize, CodecError> {
        if data.len() != PCM_BUFFER_SIZE {
            return Err(CodecError::InvalidFrameSize(data.len()));
        }

        pcm16_to_stereo(data, output).map_err(|e| CodecError::DecodingFailed(e.to_string()))?;

        self.frames_decoded += 1;
        self.samples_produced += output.len() as u64;
        Ok(output.len())
    }

    /// Fill `output` with one packet of silence
    pub fn conceal_into(&mut self, output: &mut Vec<[f32; 2]>) -> usize {
        output.clear();
        output.resize(BUFFER_FRAME_COUNT, [0.0; 2]);

        self.frames_lost += 1;
        self.samples_produced += BUFFER_FRAME_COUNT as u64;
        BUFFER_FRAME_COUNT
    }

    /// Get statistics
    pub fn stats(&self) -> DecoderStats {
        DecoderStats {
            frames_decoded: self.frames_decoded,
            frames_lost: self.frames_lost,
            samples_produced: self.samples_produced,
            loss_rate: if self.frames_decoded + self.frames_lost > 0 {
                self.frames_lost as f32 / (self.frames_decoded + self.frames_lost) as f32
            } else {
                0.0
            },
        }
    }

    /// Reset statistics
    pub fn reset_stats(&mut self) {
        self.frames_decoded = 0;
        self.frames_lost = 0;
        self.samples_produced = 0;
    }
}

/// Decoder statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct DecoderStats {
    pub frames_decoded: u64,
    pub frames_lost: u64,
    pub samples_produced: u64,
    pub loss_rate: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PcmEncoder;

    #[test]
    fn test_encode_decode() {
        let mut encoder = PcmEncoder::new();
        let mut decoder = PcmDecoder::new();

        let mut pcm = vec![0u8; PCM_BUFFER_SIZE];
        pcm[..2].copy_from_slice(&16384i16.to_le_bytes());
        let mut payload = Vec::new();
        encoder.encode(&pcm, &mut payload).unwrap();

        let mut frames = Vec::new();
        let count = decoder.decode_into(&payload, &mut frames).unwrap();
        assert_eq!(count, BUFFER_FRAME_COUNT);
        assert_eq!(frames[0], [0.5, 0.5]);
        assert_eq!(frames[1], [0.0, 0.0]);
    }

    #[test]
    fn test_conceal() {
        let mut decoder = PcmDecoder::new();
        let mut frames = vec![[1.0, 1.0]; 3];

        assert_eq!(decoder.conceal_into(&mut frames), BUFFER_FRAME_COUNT);
        assert!(frames.iter().all(|f| *f == [0.0, 0.0]));

        let stats = decoder.stats();
        assert_eq!(stats.frames_lost, 1);
        assert_eq!(stats.loss_rate, 1.0);
    }

    #[test]
    fn test_truncated_payload() {
        let mut decoder = PcmDecoder::new();
        let mut frames = Vec::new();
        assert!(decoder.decode_into(&[0u8; 5], &mut frames).is_err());
        assert_eq!(decoder.stats().loss_rate, 0.0);
    }
}
