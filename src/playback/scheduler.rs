//! Jitter buffer to sink scheduling

use tracing::debug;

use crate::codec::PcmDecoder;
use crate::config::VoiceConfig;
use crate::constants::BUFFER_FRAME_COUNT;
use crate::jitter::JitterBuffer;
use crate::stats::PlaybackStats;

use super::sink::PlaybackSink;

/// Moves packets from a jitter buffer into its sink once per tick
#[derive(Debug, Default)]
pub struct PlaybackScheduler {
    decoder: PcmDecoder,
    frames: Vec<[f32; 2]>,
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self {
            decoder: PcmDecoder::new(),
            frames: Vec::with_capacity(BUFFER_FRAME_COUNT),
        }
    }

    /// Push as many buffered packets as the sink has room for, returning
    /// the number pushed
    pub fn schedule<S: PlaybackSink + ?Sized>(
        &mut self,
        jitter: &mut JitterBuffer,
        sink: &mut S,
        stats: &mut PlaybackStats,
        config: &VoiceConfig,
    ) -> usize {
        stats.record_jitter_buffer_size(jitter.len());

        // Drain a deep buffer faster; between the thresholds keep the last pitch
        if jitter.len() > config.jitter_buffer_speedup {
            sink.set_pitch_scale(config.stream_speedup_pitch);
        } else if jitter.len() < config.jitter_buffer_slowdown {
            sink.set_pitch_scale(config.stream_standard_pitch);
        }

        let mut pushed = 0;
        while sink.can_push(BUFFER_FRAME_COUNT) {
            let Some(slot) = jitter.pop_front() else {
                break;
            };

            let blank = match slot.payload.as_deref() {
                Some(payload) => match self.decoder.decode_into(payload, &mut self.frames) {
                    Ok(_) => false,
                    Err(e) => {
                        debug!("Concealing undecodable packet: {}", e);
                        true
                    }
                },
                None => true,
            };
            if blank {
                self.decoder.conceal_into(&mut self.frames);
            }

            sink.push_frames(&self.frames);
            stats.record_push(blank);

            let counters = sink.counters();
            stats.record_ring(stats.ring_buffer_length.saturating_sub(counters.frames_available));
            pushed += 1;
        }

        stats.record_sink_counters(&sink.counters());
        pushed
    }

    pub fn decoder(&self) -> &PcmDecoder {
        &self.decoder
    }

    pub fn decoder_mut(&mut self) -> &mut PcmDecoder {
        &mut self.decoder
    }
}
