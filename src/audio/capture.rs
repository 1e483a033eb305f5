//! Voice capture context
//!
//! Owns everything the capture callback and the network tick share. One
//! mutex covers the acquisition pipeline, the frame ring, the encoder and
//! the capture counters; it is held for a whole callback and for a whole
//! drain, never across device I/O.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::audio::acquisition::AcquisitionPipeline;
use crate::audio::frame_ring::{Frame, FrameRing};
use crate::codec::{EncoderStats, PcmEncoder};
use crate::config::CaptureConfig;
use crate::error::AudioError;
use crate::speech::RecognizerWorker;
use crate::stats::{CaptureStats, CaptureStatsView, DeviceRingSnapshot};

struct CaptureState {
    pipeline: AcquisitionPipeline,
    ring: FrameRing,
    encoder: PcmEncoder,
    stats: CaptureStats,
}

/// Capture side of one voice session
pub struct VoiceCapture {
    state: Mutex<CaptureState>,
    running: AtomicBool,
    recognizer: Option<RecognizerWorker>,
}

impl VoiceCapture {
    pub fn new(config: &CaptureConfig, pipeline: AcquisitionPipeline) -> Self {
        let stats = CaptureStats::new(pipeline.device_rate());
        Self {
            state: Mutex::new(CaptureState {
                pipeline,
                ring: FrameRing::new(config.max_pending_frames),
                encoder: PcmEncoder::new(),
                stats,
            }),
            running: AtomicBool::new(false),
            recognizer: None,
        }
    }

    /// Also hand every captured frame to a speech recognizer
    pub fn with_recognizer(mut self, recognizer: RecognizerWorker) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn start(&self) {
        let mut state = self.state.lock();
        state.ring.clear_evicted_count();
        state.pipeline.reset();
        self.running.store(true, Ordering::SeqCst);
        info!("Voice capture started at {} Hz", state.pipeline.device_rate());
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        info!("Voice capture stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Capture callback: frame one device block from microphone and loopback.
    ///
    /// Returns the number of voice frames queued. Blocks are ignored while
    /// stopped.
    pub fn process_block(&self, capture: &[f32], reference: &[f32]) -> Result<usize, AudioError> {
        if !self.is_running() {
            return Ok(0);
        }

        if let Err(e) = AcquisitionPipeline::validate_block(capture, reference) {
            warn!("Rejecting capture block: {}", e);
            return Err(e);
        }

        let mut guard = self.state.lock();
        let CaptureState {
            pipeline,
            ring,
            encoder,
            stats,
        } = &mut *guard;
        stats.record_get(capture.len() / 2);

        let recognizer = self.recognizer.as_ref();
        let result = pipeline.process_block(capture, reference, |pcm, loudness| {
            let slot = ring.acquire_next_slot();
            slot.pcm.copy_from_slice(pcm);
            slot.loudness = loudness;
            match encoder.encode(pcm, &mut slot.compressed) {
                Ok(size) => slot.buffer_size = size,
                Err(e) => warn!("Failed to encode voice frame: {}", e),
            }

            if let Some(recognizer) = recognizer {
                recognizer.submit_pcm16(pcm);
            }
        });

        if let Err(e) = &result {
            warn!("Dropping capture block: {}", e);
        }
        result
    }

    /// Take every pending frame, oldest first
    pub fn drain_frames(&self) -> Vec<Frame> {
        self.state.lock().ring.drain_all()
    }

    /// Frames evicted from the ring since the last start or clear
    pub fn skipped_frames(&self) -> u64 {
        self.state.lock().ring.evicted_count()
    }

    pub fn clear_skipped_frames(&self) {
        self.state.lock().ring.clear_evicted_count();
    }

    /// Record the device capture ring after a read
    pub fn record_device_ring(&self, snapshot: &DeviceRingSnapshot) {
        self.state.lock().stats.record_device_ring(snapshot);
    }

    pub fn capture_stats(&self) -> CaptureStatsView {
        self.state.lock().stats.view()
    }

    /// Clear the capture counters and the encoder's
    pub fn clear_capture_stats(&self) {
        let mut state = self.state.lock();
        state.stats.clear();
        state.encoder.reset_stats();
    }

    pub fn encoder_stats(&self) -> EncoderStats {
        self.state.lock().encoder.stats()
    }

    pub fn recognizer(&self) -> Option<&RecognizerWorker> {
        self.recognizer.as_ref()
    }
}
