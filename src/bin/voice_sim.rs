//! Voice Transport Simulator
//!
//! Runs the full capture → network → playback path in one process. A
//! synthetic tone stands in for the microphone, and a lossy network that
//! reorders and duplicates packets stands in for the transport. Every
//! tick feeds the remote peers' sinks.
//!
//! Usage: `voice-sim [config.toml]`

use anyhow::{Context, Result};
use bytes::Bytes;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voice_transport::{
    audio::{AcquisitionPipeline, VoiceCapture},
    config::VoiceConfig,
    constants::*,
    jitter::Sequence,
    playback::MemorySink,
    session::{PeerId, SessionRegistry},
    stats::DeviceRingSnapshot,
};

/// Network conditions for one simulated peer link
#[derive(Debug, Clone, Copy)]
struct LinkProfile {
    loss: f64,
    duplicate: f64,
    max_delay_ticks: u32,
}

/// Per-peer link that drops, duplicates and delays packets
struct SimulatedLink {
    profile: LinkProfile,
    rng: StdRng,
    next_sequence: Sequence,
    in_flight: Vec<(u64, Sequence, Bytes)>,
    tick: u64,
}

impl SimulatedLink {
    fn new(profile: LinkProfile, seed: u64) -> Self {
        Self {
            profile,
            rng: StdRng::seed_from_u64(seed),
            next_sequence: 0,
            in_flight: Vec::new(),
            tick: 0,
        }
    }

    fn send(&mut self, payload: Bytes) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        if self.rng.gen_bool(self.profile.loss) {
            return;
        }
        let copies = if self.rng.gen_bool(self.profile.duplicate) { 2 } else { 1 };
        for _ in 0..copies {
            let delay = self.rng.gen_range(0..=self.profile.max_delay_ticks) as u64;
            self.in_flight.push((self.tick + delay, sequence, payload.clone()));
        }
    }

    /// Packets arriving this tick, in arbitrary order
    fn deliver(&mut self) -> Vec<(Sequence, Bytes)> {
        let tick = self.tick;
        self.tick += 1;

        let (due, pending): (Vec<_>, Vec<_>) = self
            .in_flight
            .drain(..)
            .partition(|(arrival, _, _)| *arrival <= tick);
        self.in_flight = pending;

        let mut due: Vec<(Sequence, Bytes)> = due.into_iter().map(|(_, seq, data)| (seq, data)).collect();
        due.shuffle(&mut self.rng);
        due
    }
}

/// Feed a 440 Hz tone through the capture callback at the device rate
fn run_capture(capture: Arc<VoiceCapture>, device_rate: u32) {
    let block_duration = Duration::from_secs_f64(RECORD_MIX_FRAMES as f64 / device_rate as f64);
    let silence = vec![0.0f32; RECORD_MIX_FRAMES * 2];
    let mut block = vec![0.0f32; RECORD_MIX_FRAMES * 2];
    let mut phase = 0.0f64;
    let step = 2.0 * std::f64::consts::PI * 440.0 / device_rate as f64;
    let mut pushed_frames = 0u64;

    while capture.is_running() {
        let started = Instant::now();

        for frame in block.chunks_exact_mut(2) {
            let sample = (phase.sin() * 0.3) as f32;
            frame[0] = sample;
            frame[1] = sample;
            phase = (phase + step) % (2.0 * std::f64::consts::PI);
        }
        pushed_frames += RECORD_MIX_FRAMES as u64;

        // Errors are logged by the capture context; the next block retries
        let _ = capture.process_block(&block, &silence);
        capture.record_device_ring(&DeviceRingSnapshot {
            pushed_frames,
            discarded_frames: 0,
            buffer_length_frames: RECORD_MIX_FRAMES * RESAMPLED_BUFFER_FACTOR,
            frames_available: 0,
        });

        if let Some(remaining) = block_duration.checked_sub(started.elapsed()) {
            thread::sleep(remaining);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => VoiceConfig::load(Path::new(&path))
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => VoiceConfig::load_or_default()?,
    };

    // Initialize logging
    let default_filter = if config.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting voice transport simulator");
    tracing::info!(
        "Jitter buffer {} packets, stretching {}, ring delay {}s",
        config.max_jitter_buffer_size,
        config.use_sample_stretching,
        config.buffer_delay_threshold
    );

    let device_rate = config.capture.device_sample_rate;
    let capture = Arc::new(VoiceCapture::new(
        &config.capture,
        AcquisitionPipeline::with_defaults(device_rate),
    ));
    capture.start();

    let capture_thread = {
        let capture = capture.clone();
        thread::Builder::new()
            .name("sim-capture".into())
            .spawn(move || run_capture(capture, device_rate))
            .context("Failed to spawn capture thread")?
    };

    let registry = SessionRegistry::<MemorySink>::new(config.clone()).into_shared();
    let profiles: [(PeerId, LinkProfile); 2] = [
        (
            1,
            LinkProfile {
                loss: 0.02,
                duplicate: 0.01,
                max_delay_ticks: 1,
            },
        ),
        (
            2,
            LinkProfile {
                loss: 0.10,
                duplicate: 0.05,
                max_delay_ticks: 3,
            },
        ),
    ];

    let mut links = Vec::with_capacity(profiles.len());
    {
        let mut registry = registry.lock();
        for (peer, profile) in profiles {
            registry.add_peer(peer, MemorySink::new())?;
            links.push((peer, SimulatedLink::new(profile, peer as u64)));
        }
    }

    let mut ticker = tokio::time::interval(Duration::from_millis(MILLISECONDS_PER_PACKET as u64));
    let mut last_stats_time = Instant::now();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down...");
                break;
            }
            _ = ticker.tick() => {}
        }

        let frames = capture.drain_frames();
        let mut registry = registry.lock();

        for (peer, link) in &mut links {
            for frame in &frames {
                link.send(Bytes::copy_from_slice(frame.payload()));
            }
            for (sequence, payload) in link.deliver() {
                registry.on_received_audio_packet(*peer, sequence, payload);
            }
        }

        // The mixer pulled one packet of audio from every sink since the last tick
        for peer in registry.peers_mut() {
            peer.sink_mut().consume(BUFFER_FRAME_COUNT);
        }
        registry.process_playback();
        registry.on_tick();

        if last_stats_time.elapsed() >= Duration::from_secs(5) {
            last_stats_time = Instant::now();

            let skipped = capture.skipped_frames();
            if skipped > 0 {
                tracing::warn!("Capture ring dropped {} frames", skipped);
                capture.clear_skipped_frames();
            }

            let encoded = capture.encoder_stats();
            tracing::info!(
                "Encoder: {} frames, {:.0} bytes/frame",
                encoded.frames_encoded,
                encoded.average_frame_size
            );

            let report = registry.playback_report(capture.capture_stats());
            match serde_json::to_string(&report) {
                Ok(json) => tracing::info!("Voice stats: {}", json),
                Err(e) => tracing::warn!("Failed to serialize stats: {}", e),
            }
        }
    }

    capture.stop();
    if capture_thread.join().is_err() {
        tracing::error!("Capture thread panicked");
    }

    let removed = registry.lock().clear_all();
    tracing::info!("Removed {} peers", removed);

    Ok(())
}
