//! Playback sink seam
//!
//! The sink is the output device's ring buffer for one peer. The crate only
//! pushes decoded packets into it and reads back its counters.

use std::collections::VecDeque;

/// Counters reported by a sink
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SinkCounters {
    /// Accepted `push_frames` calls
    pub pushed: u64,
    /// Rejected `push_frames` calls
    pub discarded: u64,
    /// Free room in the ring, in frames
    pub frames_available: usize,
    /// Frames handed to the mixer
    pub frames_consumed: u64,
    /// Playback position in seconds
    pub position: f64,
    /// Times the mixer ran dry
    pub skips: u64,
}

/// Output for one peer's decoded audio
pub trait PlaybackSink: Send {
    /// Size the ring; called once when the peer joins
    fn configure(&mut self, mix_rate: u32, ring_length: usize);

    /// Whether `frames` more frames fit right now
    fn can_push(&self, frames: usize) -> bool;

    /// Queue stereo frames, returning `false` if they were discarded
    fn push_frames(&mut self, frames: &[[f32; 2]]) -> bool;

    fn set_pitch_scale(&mut self, _pitch: f32) {}

    fn counters(&self) -> SinkCounters;
}

impl<T: PlaybackSink + ?Sized> PlaybackSink for Box<T> {
    fn configure(&mut self, mix_rate: u32, ring_length: usize) {
        (**self).configure(mix_rate, ring_length)
    }

    fn can_push(&self, frames: usize) -> bool {
        (**self).can_push(frames)
    }

    fn push_frames(&mut self, frames: &[[f32; 2]]) -> bool {
        (**self).push_frames(frames)
    }

    fn set_pitch_scale(&mut self, pitch: f32) {
        (**self).set_pitch_scale(pitch)
    }

    fn counters(&self) -> SinkCounters {
        (**self).counters()
    }
}

/// Bounded in-memory sink. Something else drains it with [`MemorySink::consume`].
#[derive(Debug, Clone)]
pub struct MemorySink {
    queue: VecDeque<[f32; 2]>,
    ring_length: usize,
    mix_rate: u32,
    pitch_scale: f32,
    pushed: u64,
    discarded: u64,
    frames_consumed: u64,
    skips: u64,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            ring_length: 0,
            mix_rate: 0,
            pitch_scale: 1.0,
            pushed: 0,
            discarded: 0,
            frames_consumed: 0,
            skips: 0,
        }
    }

    /// Pull `frames` frames as the mixer would, padding an underrun with
    /// silence and counting it as a skip
    pub fn consume(&mut self, frames: usize) -> Vec<[f32; 2]> {
        let take = frames.min(self.queue.len());
        let mut out: Vec<[f32; 2]> = self.queue.drain(..take).collect();
        if take < frames {
            self.skips += 1;
            out.resize(frames, [0.0; 2]);
        }
        self.frames_consumed += take as u64;
        out
    }

    /// Frames waiting to be played
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn pitch_scale(&self) -> f32 {
        self.pitch_scale
    }

    pub fn ring_length(&self) -> usize {
        self.ring_length
    }

    pub fn mix_rate(&self) -> u32 {
        self.mix_rate
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackSink for MemorySink {
    fn configure(&mut self, mix_rate: u32, ring_length: usize) {
        self.mix_rate = mix_rate;
        self.ring_length = ring_length;
        self.queue = VecDeque::with_capacity(ring_length);
    }

    fn can_push(&self, frames: usize) -> bool {
        self.ring_length - self.queue.len() >= frames
    }

    fn push_frames(&mut self, frames: &[[f32; 2]]) -> bool {
        if !self.can_push(frames.len()) {
            self.discarded += 1;
            return false;
        }
        self.queue.extend(frames.iter().copied());
        self.pushed += 1;
        true
    }

    fn set_pitch_scale(&mut self, pitch: f32) {
        self.pitch_scale = pitch;
    }

    fn counters(&self) -> SinkCounters {
        let position = if self.mix_rate > 0 {
            self.frames_consumed as f64 / self.mix_rate as f64
        } else {
            0.0
        };
        SinkCounters {
            pushed: self.pushed,
            discarded: self.discarded,
            frames_available: self.ring_length - self.queue.len(),
            frames_consumed: self.frames_consumed,
            position,
            skips: self.skips,
        }
    }
}
