//! Session registry for remote peers
//!
//! Owns one [`PeerAudio`] per peer keyed by id. Packet arrival, playback
//! scheduling and tick bookkeeping all go through here.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::codec::DecoderStats;
use crate::config::VoiceConfig;
use crate::constants::{PACKET_DELTA_TIME, VOICE_SAMPLE_RATE};
use crate::error::SessionError;
use crate::jitter::{Insertion, JitterBuffer, Sequence};
use crate::playback::{compute_ring_length, PlaybackScheduler, PlaybackSink};
use crate::stats::{CaptureStatsView, PlaybackStats, PlaybackStatsView};

use super::{PeerAudio, PeerId};

/// Registry shared between the network receiver and the playback tick
pub type SharedSessionRegistry<S = Box<dyn PlaybackSink>> = Arc<Mutex<SessionRegistry<S>>>;

/// All remote peers in the voice session
pub struct SessionRegistry<S = Box<dyn PlaybackSink>> {
    peers: HashMap<PeerId, PeerAudio<S>>,
    config: VoiceConfig,
    scheduler: PlaybackScheduler,
    playback_ring_buffer_length: usize,
    packets_received_this_frame: u32,
}

impl<S: PlaybackSink> SessionRegistry<S> {
    pub fn new(config: VoiceConfig) -> Self {
        let playback_ring_buffer_length =
            compute_ring_length(VOICE_SAMPLE_RATE, config.buffer_delay_threshold);
        Self {
            peers: HashMap::new(),
            config,
            scheduler: PlaybackScheduler::new(),
            playback_ring_buffer_length,
            packets_received_this_frame: 0,
        }
    }

    pub fn into_shared(self) -> SharedSessionRegistry<S> {
        Arc::new(Mutex::new(self))
    }

    /// Register a peer and size its sink, returning the ring length in frames
    pub fn add_peer(&mut self, id: PeerId, mut sink: S) -> Result<usize, SessionError> {
        if self.peers.contains_key(&id) {
            error!("Peer {} already has audio registered", id);
            return Err(SessionError::AlreadyRegistered(id));
        }

        let ring_length = compute_ring_length(VOICE_SAMPLE_RATE, self.config.buffer_delay_threshold);
        self.playback_ring_buffer_length = ring_length;
        sink.configure(VOICE_SAMPLE_RATE, ring_length);

        let entry = PeerAudio::new(
            id,
            JitterBuffer::from_config(&self.config),
            PlaybackStats::new(ring_length),
            sink,
        );
        self.peers.insert(id, entry);

        info!("Peer {} joined voice, playback ring {} frames", id, ring_length);
        Ok(ring_length)
    }

    /// Unregister a peer, dropping its buffers and sink
    pub fn remove_peer(&mut self, id: PeerId) -> Result<(), SessionError> {
        match self.peers.remove(&id) {
            Some(_) => {
                info!("Peer {} left voice", id);
                Ok(())
            }
            None => {
                error!("Attempted to remove unknown peer {}", id);
                Err(SessionError::NotRegistered(id))
            }
        }
    }

    /// Remove every peer, returning how many there were
    pub fn clear_all(&mut self) -> usize {
        let count = self.peers.len();
        self.peers.clear();
        self.packets_received_this_frame = 0;
        self.scheduler.decoder_mut().reset_stats();
        count
    }

    /// Route an arriving voice packet into its peer's jitter buffer.
    ///
    /// Packets for unknown peers are ignored.
    pub fn on_received_audio_packet(
        &mut self,
        id: PeerId,
        sequence: Sequence,
        payload: Bytes,
    ) -> Option<Insertion> {
        let Some(peer) = self.peers.get_mut(&id) else {
            if self.config.debug {
                debug!("Dropping packet {} from unregistered peer {}", sequence, id);
            }
            return None;
        };

        peer.packets_received_this_frame += 1;
        peer.last_update = Some(Instant::now());
        self.packets_received_this_frame += 1;

        Some(peer.jitter_buffer.insert(sequence, payload))
    }

    /// Feed every peer's sink from its jitter buffer, returning the number
    /// of packets pushed
    pub fn process_playback(&mut self) -> usize {
        let mut total = 0;
        for peer in self.peers.values_mut() {
            total += self.scheduler.schedule(
                &mut peer.jitter_buffer,
                &mut peer.sink,
                &mut peer.stats,
                &self.config,
            );

            if peer.stats.skips > peer.playback_last_skips {
                if self.config.debug {
                    debug!(
                        "Peer {} playback ran dry {} times",
                        peer.id(),
                        peer.stats.skips - peer.playback_last_skips
                    );
                }
                peer.playback_last_skips = peer.stats.skips;
            }
        }
        total
    }

    /// Reset the per-tick packet counters. Call once per scheduling tick.
    pub fn on_tick(&mut self) {
        for peer in self.peers.values_mut() {
            peer.packets_received_this_frame = 0;
        }
        self.packets_received_this_frame = 0;
    }

    /// Capture stats merged with every peer's playback stats
    pub fn playback_report(&self, capture: CaptureStatsView) -> SessionReport {
        let peers = self
            .peers
            .values()
            .map(|peer| {
                let excess_packets = peer.jitter_buffer.excess_packets();
                let report = PeerReport {
                    playback: peer.stats.view(),
                    playback_total_time_s: peer.joined_at().elapsed().as_secs_f64(),
                    excess_packets,
                    excess_s: excess_packets as f64 * PACKET_DELTA_TIME,
                };
                (peer.id(), report)
            })
            .collect();

        SessionReport {
            capture,
            decoder: self.decoder_stats(),
            peers,
        }
    }

    /// Payload decoder counters across all peers
    pub fn decoder_stats(&self) -> DecoderStats {
        self.scheduler.decoder().stats()
    }

    /// Apply new settings to the registry and every jitter buffer.
    ///
    /// Ring sizing only changes for peers added afterwards.
    pub fn set_config(&mut self, config: VoiceConfig) {
        for peer in self.peers.values_mut() {
            peer.jitter_buffer.apply_config(&config);
        }
        self.config = config;
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }

    pub fn peer(&self, id: PeerId) -> Option<&PeerAudio<S>> {
        self.peers.get(&id)
    }

    pub fn peer_mut(&mut self, id: PeerId) -> Option<&mut PeerAudio<S>> {
        self.peers.get_mut(&id)
    }

    pub fn peers_mut(&mut self) -> impl Iterator<Item = &mut PeerAudio<S>> {
        self.peers.values_mut()
    }

    /// Registered peer ids in ascending order
    pub fn peer_ids(&self) -> Vec<PeerId> {
        let mut ids: Vec<PeerId> = self.peers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn contains(&self, id: PeerId) -> bool {
        self.peers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Packets received from all peers since the last tick
    pub fn packets_received_this_frame(&self) -> u32 {
        self.packets_received_this_frame
    }

    /// Ring length used for the most recently configured sink
    pub fn playback_ring_buffer_length(&self) -> usize {
        self.playback_ring_buffer_length
    }
}

/// Session health report
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    #[serde(flatten)]
    pub capture: CaptureStatsView,
    pub decoder: DecoderStats,
    pub peers: BTreeMap<PeerId, PeerReport>,
}

/// One peer's entry in a [`SessionReport`]
#[derive(Debug, Clone, Serialize)]
pub struct PeerReport {
    #[serde(flatten)]
    pub playback: PlaybackStatsView,
    pub playback_total_time_s: f64,
    pub excess_packets: u64,
    pub excess_s: f64,
}
