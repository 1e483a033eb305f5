//! Per-peer session state

use std::time::Instant;

use crate::jitter::JitterBuffer;
use crate::stats::PlaybackStats;

use super::PeerId;

/// Everything the registry keeps for one remote peer
#[derive(Debug)]
pub struct PeerAudio<S> {
    id: PeerId,
    pub(crate) jitter_buffer: JitterBuffer,
    pub(crate) stats: PlaybackStats,
    pub(crate) sink: S,
    joined_at: Instant,
    pub(crate) last_update: Option<Instant>,
    pub(crate) packets_received_this_frame: u32,
    /// Sink skip count at the last report
    pub(crate) playback_last_skips: u64,
}

impl<S> PeerAudio<S> {
    pub(crate) fn new(id: PeerId, jitter_buffer: JitterBuffer, stats: PlaybackStats, sink: S) -> Self {
        Self {
            id,
            jitter_buffer,
            stats,
            sink,
            joined_at: Instant::now(),
            last_update: None,
            packets_received_this_frame: 0,
            playback_last_skips: 0,
        }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn jitter_buffer(&self) -> &JitterBuffer {
        &self.jitter_buffer
    }

    pub fn jitter_buffer_mut(&mut self) -> &mut JitterBuffer {
        &mut self.jitter_buffer
    }

    pub fn stats(&self) -> &PlaybackStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut PlaybackStats {
        &mut self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn joined_at(&self) -> Instant {
        self.joined_at
    }

    /// When the last packet arrived, if any has
    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }

    pub fn packets_received_this_frame(&self) -> u32 {
        self.packets_received_this_frame
    }

    pub fn playback_last_skips(&self) -> u64 {
        self.playback_last_skips
    }
}
