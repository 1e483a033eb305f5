//! # Voice Transport
//!
//! Real-time voice chat transport: capture framing on the sending side,
//! jitter buffering and playback scheduling on the receiving side.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          CAPTURE (audio thread)                          │
//! │  ┌──────────────┐   ┌──────────────┐                                    │
//! │  │  Microphone  │   │  Loopback    │   stereo blocks @ device rate      │
//! │  └──────┬───────┘   └──────┬───────┘                                    │
//! │         ▼                  ▼                                            │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │           AcquisitionPipeline (audio::acquisition)              │    │
//! │  │   downmix → resample → echo cancel → 100ms PCM16 frames         │    │
//! │  └──────────────────────────────┬──────────────────────────────────┘    │
//! │                                 ▼                                       │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │   FrameRing (audio::frame_ring) - drop oldest under overload    │    │
//! │  └──────────────────────────────┬──────────────────────────────────┘    │
//! └─────────────────────────────────┼───────────────────────────────────────┘
//!                                   │ drained once per tick
//!                                   ▼  (network, out of scope)
//! ┌─────────────────────────────────┼───────────────────────────────────────┐
//! │                          RECEIVE (tick thread)                           │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │        SessionRegistry (session::registry) - per peer           │    │
//! │  │  ┌────────────┐   ┌────────────┐   ┌────────────┐               │    │
//! │  │  │  Jitter    │   │  Jitter    │   │  Jitter    │  reorder,     │    │
//! │  │  │  Buffer    │   │  Buffer    │   │  Buffer    │  gap fill     │    │
//! │  │  └─────┬──────┘   └─────┬──────┘   └─────┬──────┘               │    │
//! │  │        ▼                ▼                ▼                      │    │
//! │  │  ┌────────────┐   ┌────────────┐   ┌────────────┐               │    │
//! │  │  │ Playback   │   │ Playback   │   │ Playback   │  ring sized   │    │
//! │  │  │ Sink       │   │ Sink       │   │ Sink       │  at join      │    │
//! │  │  └────────────┘   └────────────┘   └────────────┘               │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │                 PlaybackStats / CaptureStats (stats)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod codec;
pub mod config;
pub mod error;
pub mod jitter;
pub mod playback;
pub mod session;
pub mod speech;
pub mod stats;

pub use error::{Error, Result};

/// Protocol constants shared by both ends of a voice session
pub mod constants {
    /// Voice channel count (mono)
    pub const CHANNEL_COUNT: u16 = 1;

    pub const MILLISECONDS_PER_SECOND: u32 = 1000;

    /// Duration of audio carried by one voice packet
    pub const MILLISECONDS_PER_PACKET: u32 = 100;

    /// Bytes per PCM sample (signed 16-bit)
    pub const BYTES_PER_SAMPLE: usize = 2;

    /// Sample rate of the voice protocol
    pub const VOICE_SAMPLE_RATE: u32 = 16_000;

    /// Samples in one voice packet
    pub const BUFFER_FRAME_COUNT: usize =
        (VOICE_SAMPLE_RATE * MILLISECONDS_PER_PACKET / MILLISECONDS_PER_SECOND) as usize;

    /// Bytes of PCM in one voice packet
    pub const PCM_BUFFER_SIZE: usize = BUFFER_FRAME_COUNT * BYTES_PER_SAMPLE * CHANNEL_COUNT as usize;

    /// Seconds of audio carried by one voice packet
    pub const PACKET_DELTA_TIME: f64 = MILLISECONDS_PER_PACKET as f64 / MILLISECONDS_PER_SECOND as f64;

    /// Capacity of the outbound frame ring
    pub const MAX_PENDING_FRAMES: usize = 10;

    /// Stereo frames read from the capture device per block
    pub const RECORD_MIX_FRAMES: usize = 2048;

    /// Initial resampler scratch capacity relative to the input block
    pub const RESAMPLED_BUFFER_FACTOR: usize = 4;

    /// Default device sample rate
    pub const DEFAULT_DEVICE_SAMPLE_RATE: u32 = 48_000;

    /// Default jitter buffer capacity in packets
    pub const DEFAULT_MAX_JITTER_BUFFER_SIZE: usize = 16;

    /// Default playback ring duration in seconds
    pub const DEFAULT_BUFFER_DELAY_THRESHOLD: f32 = 0.1;

    pub const DEFAULT_STREAM_STANDARD_PITCH: f32 = 1.0;

    pub const DEFAULT_STREAM_SPEEDUP_PITCH: f32 = 1.5;

    /// Jitter buffer depth above which playback speeds up
    pub const DEFAULT_JITTER_BUFFER_SPEEDUP: usize = 12;

    /// Jitter buffer depth below which playback returns to normal pitch
    pub const DEFAULT_JITTER_BUFFER_SLOWDOWN: usize = 6;

    /// Default depth of the speech recognizer hand-off queue
    pub const DEFAULT_RECOGNIZER_QUEUE_DEPTH: usize = 8;
}
