//! Speech recognizer hand-off
//!
//! Captured frames are offered to a recognizer running on its own thread.
//! The capture path never waits on it: when the queue is full the frame is
//! dropped and counted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use tracing::{debug, warn};

use crate::audio::pcm::pcm16_to_mono;
use crate::error::RecognizerError;

/// Turns mono voice frames into text
pub trait SpeechRecognizer: Send + 'static {
    /// Recognize one frame of 16 kHz mono samples in `[-1, 1]`
    fn recognize(&mut self, pcm: &[f32]) -> Result<Vec<String>, RecognizerError>;
}

/// Runs a [`SpeechRecognizer`] on a dedicated thread
pub struct RecognizerWorker {
    frames_tx: Option<Sender<Vec<f32>>>,
    segments_rx: Receiver<String>,
    dropped_frames: Arc<AtomicU64>,
    failed_frames: Arc<AtomicU64>,
    thread_handle: Option<JoinHandle<()>>,
}

impl RecognizerWorker {
    /// Start the worker with room for `queue_depth` pending frames
    pub fn spawn<R: SpeechRecognizer>(mut recognizer: R, queue_depth: usize) -> Result<Self, RecognizerError> {
        let (frames_tx, frames_rx) = bounded::<Vec<f32>>(queue_depth.max(1));
        let (segments_tx, segments_rx) = unbounded::<String>();
        let failed_frames = Arc::new(AtomicU64::new(0));
        let failed = failed_frames.clone();

        let handle = thread::Builder::new()
            .name("speech-recognizer".into())
            .spawn(move || {
                for frame in frames_rx.iter() {
                    match recognizer.recognize(&frame) {
                        Ok(segments) => {
                            for segment in segments {
                                // Nobody listening is fine
                                let _ = segments_tx.send(segment);
                            }
                        }
                        Err(e) => {
                            warn!("Speech recognition failed, dropping frame: {}", e);
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
                debug!("Speech recognizer worker exiting");
            })
            .map_err(|e| RecognizerError::Failed(e.to_string()))?;

        Ok(Self {
            frames_tx: Some(frames_tx),
            segments_rx,
            dropped_frames: Arc::new(AtomicU64::new(0)),
            failed_frames,
            thread_handle: Some(handle),
        })
    }

    /// Queue a frame without blocking. Returns `false` if it was dropped.
    pub fn submit(&self, frame: Vec<f32>) -> bool {
        let Some(tx) = &self.frames_tx else {
            self.dropped_frames.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        match tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped_frames.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("Speech recognizer worker is gone, dropping frame");
                self.dropped_frames.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Queue a PCM16 little-endian frame
    pub fn submit_pcm16(&self, pcm: &[u8]) -> bool {
        let mut samples = Vec::with_capacity(pcm.len() / 2);
        if let Err(e) = pcm16_to_mono(pcm, &mut samples) {
            warn!("Not submitting frame to recognizer: {}", e);
            self.dropped_frames.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        self.submit(samples)
    }

    /// Recognized text, in recognition order
    pub fn segments(&self) -> &Receiver<String> {
        &self.segments_rx
    }

    /// Frames dropped because the queue was full or the worker gone
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    /// Frames the recognizer failed on
    pub fn failed_frames(&self) -> u64 {
        self.failed_frames.load(Ordering::Relaxed)
    }

    /// Let the worker finish queued frames and wait for it
    pub fn shutdown(&mut self) {
        self.frames_tx.take();
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for RecognizerWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for RecognizerWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognizerWorker")
            .field("running", &self.thread_handle.is_some())
            .field("dropped_frames", &self.dropped_frames())
            .field("failed_frames", &self.failed_frames())
            .finish()
    }
}
