//! Transport health counters
//!
//! Raw counters only ever grow until [`PlaybackStats::clear`] or
//! [`CaptureStats::clear`]. The `*View` types turn them into seconds and
//! percentages for reporting.

use serde::Serialize;

use crate::constants::{BUFFER_FRAME_COUNT, PACKET_DELTA_TIME, VOICE_SAMPLE_RATE};
use crate::playback::SinkCounters;

/// `100 * numerator / denominator`, or 0 when there is nothing to divide by
pub fn percent(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        100.0 * numerator / denominator
    } else {
        0.0
    }
}

fn frames_to_seconds(frames: f64, rate: u32) -> f64 {
    if rate > 0 {
        frames / rate as f64
    } else {
        0.0
    }
}

/// Device capture ring state as reported by the audio backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceRingSnapshot {
    pub pushed_frames: u64,
    pub discarded_frames: u64,
    pub buffer_length_frames: usize,
    pub frames_available: usize,
}

/// Process-wide capture counters
#[derive(Debug, Clone, Default)]
pub struct CaptureStats {
    pub mix_rate: u32,
    pub pushed_frames: u64,
    pub discarded_frames: u64,
    pub ring_limit: usize,
    pub ring_current_size: usize,
    pub ring_max_size: usize,
    pub ring_size_sum: u64,
    pub get_calls: u64,
    pub get_frames: u64,
}

impl CaptureStats {
    pub fn new(mix_rate: u32) -> Self {
        Self {
            mix_rate,
            ..Default::default()
        }
    }

    /// Count one block read from the device
    pub fn record_get(&mut self, frames: usize) {
        self.get_calls += 1;
        self.get_frames += frames as u64;
    }

    /// Take the device ring counters after a read
    pub fn record_device_ring(&mut self, snapshot: &DeviceRingSnapshot) {
        self.pushed_frames = snapshot.pushed_frames;
        self.discarded_frames = snapshot.discarded_frames;
        self.ring_limit = snapshot.buffer_length_frames;
        self.ring_current_size = snapshot.frames_available;
        self.ring_size_sum += snapshot.frames_available as u64;
        self.ring_max_size = self.ring_max_size.max(snapshot.frames_available);
    }

    /// Reset every counter, keeping the mix rate
    pub fn clear(&mut self) {
        *self = Self::new(self.mix_rate);
    }

    pub fn view(&self) -> CaptureStatsView {
        let rate = self.mix_rate;
        let pushed_s = frames_to_seconds(self.pushed_frames as f64, rate);
        let discarded_s = frames_to_seconds(self.discarded_frames as f64, rate);
        let get_s = frames_to_seconds(self.get_frames as f64, rate);

        let capture_ring_mean_size_s = if self.get_calls > 0 {
            frames_to_seconds(self.ring_size_sum as f64 / self.get_calls as f64, rate)
        } else {
            0.0
        };

        CaptureStatsView {
            capture_discarded_s: discarded_s,
            capture_pushed_s: pushed_s,
            capture_ring_limit_s: frames_to_seconds(self.ring_limit as f64, rate),
            capture_ring_current_size_s: frames_to_seconds(self.ring_current_size as f64, rate),
            capture_ring_max_size_s: frames_to_seconds(self.ring_max_size as f64, rate),
            capture_ring_mean_size_s,
            capture_get_s: get_s,
            capture_get_calls: self.get_calls,
            capture_mix_rate: rate,
            capture_get_percent: percent(get_s, pushed_s),
            capture_discard_percent: percent(discarded_s, pushed_s),
        }
    }
}

/// Capture counters in seconds and percentages
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CaptureStatsView {
    pub capture_discarded_s: f64,
    pub capture_pushed_s: f64,
    pub capture_ring_limit_s: f64,
    pub capture_ring_current_size_s: f64,
    pub capture_ring_max_size_s: f64,
    pub capture_ring_mean_size_s: f64,
    pub capture_get_s: f64,
    pub capture_get_calls: u64,
    pub capture_mix_rate: u32,
    pub capture_get_percent: f64,
    pub capture_discard_percent: f64,
}

/// Per-peer playback counters
#[derive(Debug, Clone)]
pub struct PlaybackStats {
    /// Sink ring capacity in frames
    pub ring_buffer_length: usize,
    /// Frames per pushed packet
    pub buffer_frame_count: usize,

    pub ring_current_size: usize,
    pub ring_max_size: usize,
    pub ring_size_sum: u64,

    /// Frames the sink handed to the mixer
    pub get_frames: u64,
    /// Packet pushes the sink accepted
    pub pushed_calls: u64,
    /// Packet pushes the sink rejected
    pub discarded_calls: u64,
    pub push_buffer_calls: u64,
    pub blank_push_calls: u64,
    /// Playback position in seconds
    pub position: f64,
    pub skips: u64,

    pub jitter_buffer_current_size: usize,
    pub jitter_buffer_max_size: usize,
    pub jitter_buffer_size_sum: u64,
    pub jitter_buffer_calls: u64,
}

impl PlaybackStats {
    pub fn new(ring_buffer_length: usize) -> Self {
        Self {
            ring_buffer_length,
            buffer_frame_count: BUFFER_FRAME_COUNT,
            ring_current_size: 0,
            ring_max_size: 0,
            ring_size_sum: 0,
            get_frames: 0,
            pushed_calls: 0,
            discarded_calls: 0,
            push_buffer_calls: 0,
            blank_push_calls: 0,
            position: 0.0,
            skips: 0,
            jitter_buffer_current_size: 0,
            jitter_buffer_max_size: 0,
            jitter_buffer_size_sum: 0,
            jitter_buffer_calls: 0,
        }
    }

    /// Sample jitter buffer occupancy in packets
    pub fn record_jitter_buffer_size(&mut self, size: usize) {
        self.jitter_buffer_current_size = size;
        self.jitter_buffer_max_size = self.jitter_buffer_max_size.max(size);
        self.jitter_buffer_size_sum += size as u64;
        self.jitter_buffer_calls += 1;
    }

    /// Sample sink ring occupancy in frames after a push
    pub fn record_ring(&mut self, size: usize) {
        self.ring_current_size = size;
        self.ring_max_size = self.ring_max_size.max(size);
        self.ring_size_sum += size as u64;
    }

    pub fn record_push(&mut self, blank: bool) {
        self.push_buffer_calls += 1;
        if blank {
            self.blank_push_calls += 1;
        }
    }

    pub fn record_sink_counters(&mut self, counters: &SinkCounters) {
        self.pushed_calls = counters.pushed;
        self.discarded_calls = counters.discarded;
        self.get_frames = counters.frames_consumed;
        self.position = counters.position;
        self.skips = counters.skips;
    }

    /// Reset every counter, keeping the ring sizing
    pub fn clear(&mut self) {
        *self = Self::new(self.ring_buffer_length);
    }

    pub fn view(&self) -> PlaybackStatsView {
        let rate = VOICE_SAMPLE_RATE;
        let frame_count = self.buffer_frame_count as f64;
        let pushed_frames = self.pushed_calls as f64 * frame_count;
        let discarded_frames = self.discarded_calls as f64 * frame_count;

        let playback_ring_mean_size_s = if self.push_buffer_calls > 0 {
            frames_to_seconds(self.ring_size_sum as f64 / self.push_buffer_calls as f64, rate)
        } else {
            0.0
        };
        let jitter_buffer_mean_size_s = if self.jitter_buffer_calls > 0 {
            self.jitter_buffer_size_sum as f64 / self.jitter_buffer_calls as f64 * PACKET_DELTA_TIME
        } else {
            0.0
        };

        PlaybackStatsView {
            playback_ring_limit_s: frames_to_seconds(self.ring_buffer_length as f64, rate),
            playback_ring_current_size_s: frames_to_seconds(self.ring_current_size as f64, rate),
            playback_ring_max_size_s: frames_to_seconds(self.ring_max_size as f64, rate),
            playback_ring_mean_size_s,
            jitter_buffer_current_size_s: self.jitter_buffer_current_size as f64 * PACKET_DELTA_TIME,
            jitter_buffer_max_size_s: self.jitter_buffer_max_size as f64 * PACKET_DELTA_TIME,
            jitter_buffer_mean_size_s,
            playback_position_s: self.position,
            playback_get_percent: percent(self.get_frames as f64, pushed_frames),
            playback_discard_percent: percent(discarded_frames, pushed_frames),
            playback_get_s: frames_to_seconds(self.get_frames as f64, rate),
            playback_pushed_s: frames_to_seconds(pushed_frames, rate),
            playback_discarded_s: frames_to_seconds(discarded_frames, rate),
            playback_push_buffer_calls: self.push_buffer_calls,
            playback_blank_s: self.blank_push_calls as f64 * PACKET_DELTA_TIME,
            playback_blank_percent: percent(self.blank_push_calls as f64, self.push_buffer_calls as f64),
            playback_skips: self.skips,
        }
    }
}

/// Playback counters in seconds and percentages
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PlaybackStatsView {
    pub playback_ring_limit_s: f64,
    pub playback_ring_current_size_s: f64,
    pub playback_ring_max_size_s: f64,
    pub playback_ring_mean_size_s: f64,
    pub jitter_buffer_current_size_s: f64,
    pub jitter_buffer_max_size_s: f64,
    pub jitter_buffer_mean_size_s: f64,
    pub playback_position_s: f64,
    pub playback_get_percent: f64,
    pub playback_discard_percent: f64,
    pub playback_get_s: f64,
    pub playback_pushed_s: f64,
    pub playback_discarded_s: f64,
    pub playback_push_buffer_calls: u64,
    pub playback_blank_s: f64,
    pub playback_blank_percent: f64,
    pub playback_skips: u64,
}
