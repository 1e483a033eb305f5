//! Sample-rate conversion into the voice protocol rate
//!
//! The acquisition stage only depends on the [`Resampler`] trait. The
//! default implementation wraps rubato's fixed-input FFT resampler and
//! buffers partial chunks across calls.

use rubato::{FftFixedIn, Resampler as _};

use crate::error::AudioError;

/// Input chunk fed to the FFT resampler
const CHUNK_SIZE: usize = 1024;

/// Number of sub-chunks for the FFT resampler (1 = lowest latency)
const SUB_CHUNKS: usize = 1;

/// Mono resampler used by the acquisition stage
pub trait Resampler: Send {
    /// Resample `input` from `source_rate` to `target_rate`, appending to
    /// `output`.
    ///
    /// Returns the number of samples appended. Buffering implementations
    /// may append fewer than the input nominally yields, or nothing at
    /// all; rubato's FFT resampler holds back its whole first chunk.
    fn process(
        &mut self,
        input: &[f32],
        source_rate: u32,
        target_rate: u32,
        output: &mut Vec<f32>,
    ) -> Result<usize, AudioError>;

    /// Drop any buffered input
    fn reset(&mut self) {}
}

struct FftState {
    source_rate: u32,
    target_rate: u32,
    inner: FftFixedIn<f32>,
    pending: Vec<f32>,
}

/// rubato-backed resampler; copies straight through when rates match
pub struct RubatoResampler {
    state: Option<FftState>,
}

impl RubatoResampler {
    pub fn new() -> Self {
        Self { state: None }
    }

    fn state_for(&mut self, source_rate: u32, target_rate: u32) -> Result<&mut FftState, AudioError> {
        let stale = match &self.state {
            Some(state) => state.source_rate != source_rate || state.target_rate != target_rate,
            None => true,
        };

        if stale {
            let inner = FftFixedIn::<f32>::new(
                source_rate as usize,
                target_rate as usize,
                CHUNK_SIZE,
                SUB_CHUNKS,
                1,
            )
            .map_err(|e| AudioError::ResampleFailed(e.to_string()))?;

            tracing::debug!("Resampler configured {} Hz -> {} Hz", source_rate, target_rate);
            self.state = Some(FftState {
                source_rate,
                target_rate,
                inner,
                pending: Vec::with_capacity(CHUNK_SIZE * 2),
            });
        }

        self.state
            .as_mut()
            .ok_or_else(|| AudioError::ResampleFailed("resampler state missing".into()))
    }
}

impl Default for RubatoResampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Resampler for RubatoResampler {
    fn process(
        &mut self,
        input: &[f32],
        source_rate: u32,
        target_rate: u32,
        output: &mut Vec<f32>,
    ) -> Result<usize, AudioError> {
        if source_rate == target_rate {
            output.extend_from_slice(input);
            return Ok(input.len());
        }

        let state = self.state_for(source_rate, target_rate)?;
        state.pending.extend_from_slice(input);

        let mut written = 0;
        while state.pending.len() >= state.inner.input_frames_next() {
            let needed = state.inner.input_frames_next();
            let chunk = [&state.pending[..needed]];
            let resampled = state
                .inner
                .process(&chunk, None)
                .map_err(|e| AudioError::ResampleFailed(e.to_string()))?;
            // Only consumed once rubato accepted it
            state.pending.drain(..needed);

            output.extend_from_slice(&resampled[0]);
            written += resampled[0].len();
        }

        Ok(written)
    }

    fn reset(&mut self) {
        if let Some(state) = &mut self.state {
            state.pending.clear();
            state.inner.reset();
        }
    }
}
