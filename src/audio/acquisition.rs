//! Capture acquisition stage
//!
//! Turns device-format stereo blocks into fixed-size mono PCM16 voice
//! frames: downmix, resample to the voice rate, run the echo stage, and
//! measure loudness. Device blocks and voice frames rarely line up, so the
//! resampled tail of each block is carried into the next call.

use crate::audio::echo::{Bypass, EchoCanceller};
use crate::audio::pcm::{downmix_stereo, float_to_s16, mean_abs_amplitude, s16_to_bytes};
use crate::audio::resample::{Resampler, RubatoResampler};
use crate::constants::{BUFFER_FRAME_COUNT, PCM_BUFFER_SIZE, RECORD_MIX_FRAMES, RESAMPLED_BUFFER_FACTOR, VOICE_SAMPLE_RATE};
use crate::error::AudioError;

/// Capture-to-frame pipeline for one microphone/reference pair
pub struct AcquisitionPipeline {
    device_rate: u32,
    capture_resampler: Box<dyn Resampler>,
    reference_resampler: Box<dyn Resampler>,
    echo: Box<dyn EchoCanceller>,

    mono_capture: Vec<f32>,
    mono_reference: Vec<f32>,

    /// Resampled capture not yet framed; carried into the next block
    capture_resampled: Vec<f32>,
    reference_resampled: Vec<f32>,

    capture_s16: Vec<i16>,
    reference_s16: Vec<i16>,
    cleaned_s16: Vec<i16>,
    pcm: Vec<u8>,

    frames_emitted: u64,
}

impl AcquisitionPipeline {
    /// Create a pipeline with explicit resamplers and echo stage
    pub fn new(
        device_rate: u32,
        capture_resampler: Box<dyn Resampler>,
        reference_resampler: Box<dyn Resampler>,
        echo: Box<dyn EchoCanceller>,
    ) -> Self {
        let scratch = RECORD_MIX_FRAMES * RESAMPLED_BUFFER_FACTOR;
        Self {
            device_rate,
            capture_resampler,
            reference_resampler,
            echo,
            mono_capture: Vec::with_capacity(RECORD_MIX_FRAMES),
            mono_reference: Vec::with_capacity(RECORD_MIX_FRAMES),
            capture_resampled: Vec::with_capacity(scratch),
            reference_resampled: Vec::with_capacity(scratch),
            capture_s16: vec![0; BUFFER_FRAME_COUNT],
            reference_s16: vec![0; BUFFER_FRAME_COUNT],
            cleaned_s16: vec![0; BUFFER_FRAME_COUNT],
            pcm: vec![0; PCM_BUFFER_SIZE],
            frames_emitted: 0,
        }
    }

    /// rubato resamplers with a pass-through echo stage
    pub fn with_defaults(device_rate: u32) -> Self {
        Self::new(
            device_rate,
            Box::new(RubatoResampler::new()),
            Box::new(RubatoResampler::new()),
            Box::new(Bypass),
        )
    }

    /// Replace the echo stage
    pub fn set_echo_canceller(&mut self, echo: Box<dyn EchoCanceller>) {
        self.echo = echo;
    }

    /// Check the shape of a microphone/loopback block pair
    pub fn validate_block(capture: &[f32], reference: &[f32]) -> Result<(), AudioError> {
        if capture.len() != reference.len() {
            return Err(AudioError::BlockMismatch {
                capture: capture.len(),
                reference: reference.len(),
            });
        }
        if capture.len() % 2 != 0 {
            return Err(AudioError::OddStereoBlock(capture.len()));
        }
        Ok(())
    }

    /// Process one interleaved stereo block from microphone and loopback.
    ///
    /// `on_frame` receives each completed PCM16 frame with its loudness.
    /// A resampling failure abandons the block without emitting anything,
    /// resets both resamplers and leaves the carried tail untouched.
    pub fn process_block<F>(&mut self, capture: &[f32], reference: &[f32], mut on_frame: F) -> Result<usize, AudioError>
    where
        F: FnMut(&[u8], f32),
    {
        Self::validate_block(capture, reference)?;

        downmix_stereo(capture, &mut self.mono_capture)?;
        downmix_stereo(reference, &mut self.mono_reference)?;

        let carried = self.capture_resampled.len();
        if let Err(e) = self.resample() {
            self.capture_resampler.reset();
            self.reference_resampler.reset();
            self.capture_resampled.truncate(carried);
            self.reference_resampled.truncate(carried);
            return Err(e);
        }

        // Missing loopback plays as silence
        let available = self.capture_resampled.len();
        self.reference_resampled.resize(available, 0.0);

        let mut cursor = 0;
        let mut emitted = 0;

        while available - cursor >= BUFFER_FRAME_COUNT {
            let capture_frame = &self.capture_resampled[cursor..cursor + BUFFER_FRAME_COUNT];
            let reference_frame = &self.reference_resampled[cursor..cursor + BUFFER_FRAME_COUNT];

            let loudness = mean_abs_amplitude(capture_frame);
            for (dst, sample) in self.capture_s16.iter_mut().zip(capture_frame) {
                *dst = float_to_s16(*sample);
            }
            for (dst, sample) in self.reference_s16.iter_mut().zip(reference_frame) {
                *dst = float_to_s16(*sample);
            }

            self.echo
                .process(&self.capture_s16, &self.reference_s16, &mut self.cleaned_s16);
            s16_to_bytes(&self.cleaned_s16, &mut self.pcm);

            on_frame(&self.pcm, loudness);

            cursor += BUFFER_FRAME_COUNT;
            emitted += 1;
        }

        self.capture_resampled.drain(..cursor);
        self.reference_resampled.drain(..cursor);
        self.frames_emitted += emitted as u64;

        Ok(emitted)
    }

    fn resample(&mut self) -> Result<(), AudioError> {
        self.reference_resampler.process(
            &self.mono_reference,
            self.device_rate,
            VOICE_SAMPLE_RATE,
            &mut self.reference_resampled,
        )?;
        self.capture_resampler.process(
            &self.mono_capture,
            self.device_rate,
            VOICE_SAMPLE_RATE,
            &mut self.capture_resampled,
        )?;
        Ok(())
    }

    /// Resampled samples waiting for the next block
    pub fn remainder_len(&self) -> usize {
        self.capture_resampled.len()
    }

    /// Drop the carried tail and any resampler backlog, e.g. when capture restarts
    pub fn reset(&mut self) {
        self.capture_resampled.clear();
        self.reference_resampled.clear();
        self.capture_resampler.reset();
        self.reference_resampler.reset();
    }

    pub fn device_rate(&self) -> u32 {
        self.device_rate
    }

    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    struct FailingResampler;

    impl Resampler for FailingResampler {
        fn process(&mut self, _: &[f32], _: u32, _: u32, _: &mut Vec<f32>) -> Result<usize, AudioError> {
            Err(AudioError::ResampleFailed("boom".into()))
        }
    }

    /// Pass-through resampler that fails on one chosen call and counts resets
    struct Scripted {
        fail_on_call: Option<usize>,
        calls: usize,
        resets: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn new(fail_on_call: Option<usize>) -> (Self, Arc<AtomicUsize>) {
            let resets = Arc::new(AtomicUsize::new(0));
            let resampler = Self {
                fail_on_call,
                calls: 0,
                resets: Arc::clone(&resets),
            };
            (resampler, resets)
        }
    }

    impl Resampler for Scripted {
        fn process(&mut self, input: &[f32], _: u32, _: u32, output: &mut Vec<f32>) -> Result<usize, AudioError> {
            self.calls += 1;
            if self.fail_on_call == Some(self.calls) {
                return Err(AudioError::ResampleFailed("scripted".into()));
            }
            output.extend_from_slice(input);
            Ok(input.len())
        }

        fn reset(&mut self) {
            self.resets.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Echo stage that subtracts the reference
    struct Subtract;

    impl EchoCanceller for Subtract {
        fn process(&mut self, capture: &[i16], reference: &[i16], output: &mut [i16]) {
            for ((out, c), r) in output.iter_mut().zip(capture).zip(reference) {
                *out = c.saturating_sub(*r);
            }
        }
    }

    fn stereo_block(frames: usize, value: f32) -> Vec<f32> {
        vec![value; frames * 2]
    }

    #[test]
    fn test_emits_frames_and_carries_remainder() {
        let mut pipeline = AcquisitionPipeline::with_defaults(VOICE_SAMPLE_RATE);
        let block = stereo_block(RECORD_MIX_FRAMES, 0.5);
        let silence = stereo_block(RECORD_MIX_FRAMES, 0.0);

        let mut loudness = Vec::new();
        let emitted = pipeline
            .process_block(&block, &silence, |pcm, level| {
                assert_eq!(pcm.len(), PCM_BUFFER_SIZE);
                loudness.push(level);
            })
            .unwrap();

        assert_eq!(emitted, 1);
        assert_eq!(pipeline.remainder_len(), RECORD_MIX_FRAMES - BUFFER_FRAME_COUNT);
        assert!((loudness[0] - 0.5).abs() < 1e-6);

        let emitted = pipeline.process_block(&block, &silence, |_, _| {}).unwrap();
        assert_eq!(emitted, 1);
        assert_eq!(pipeline.remainder_len(), 2 * RECORD_MIX_FRAMES - 2 * BUFFER_FRAME_COUNT);
        assert!(pipeline.remainder_len() < BUFFER_FRAME_COUNT);
    }

    #[test]
    fn test_remainder_stays_below_one_frame() {
        let mut pipeline = AcquisitionPipeline::with_defaults(VOICE_SAMPLE_RATE);
        let block = stereo_block(700, 0.1);

        let mut total = 0;
        for _ in 0..20 {
            total += pipeline.process_block(&block, &block, |_, _| {}).unwrap();
            assert!(pipeline.remainder_len() < BUFFER_FRAME_COUNT);
        }
        assert_eq!(total, 700 * 20 / BUFFER_FRAME_COUNT);
    }

    #[test]
    fn test_pcm_contents() {
        let mut pipeline = AcquisitionPipeline::new(
            VOICE_SAMPLE_RATE,
            Box::new(RubatoResampler::new()),
            Box::new(RubatoResampler::new()),
            Box::new(Subtract),
        );
        let capture = stereo_block(BUFFER_FRAME_COUNT, 0.75);
        let reference = stereo_block(BUFFER_FRAME_COUNT, 0.25);

        let mut first_sample = None;
        pipeline
            .process_block(&capture, &reference, |pcm, _| {
                first_sample = Some(i16::from_le_bytes([pcm[0], pcm[1]]));
            })
            .unwrap();

        assert_eq!(first_sample, Some(24576 - 8192));
        assert_eq!(pipeline.remainder_len(), 0);
    }

    #[test]
    fn test_resample_failure_abandons_block() {
        let block = stereo_block(RECORD_MIX_FRAMES, 0.2);
        let mut failing = AcquisitionPipeline::new(
            VOICE_SAMPLE_RATE,
            Box::new(FailingResampler),
            Box::new(RubatoResampler::new()),
            Box::new(Bypass),
        );
        let mut called = false;
        let result = failing.process_block(&block, &block, |_, _| called = true);
        assert!(matches!(result, Err(AudioError::ResampleFailed(_))));
        assert!(!called);
        assert_eq!(failing.remainder_len(), 0);
        assert_eq!(failing.frames_emitted(), 0);
    }

    #[test]
    fn test_failure_resets_both_resamplers_and_keeps_tail() {
        let (capture, capture_resets) = Scripted::new(Some(2));
        let (reference, reference_resets) = Scripted::new(None);
        let mut pipeline = AcquisitionPipeline::new(
            VOICE_SAMPLE_RATE,
            Box::new(capture),
            Box::new(reference),
            Box::new(Bypass),
        );
        let block = stereo_block(RECORD_MIX_FRAMES, 0.2);
        let tail = RECORD_MIX_FRAMES - BUFFER_FRAME_COUNT;

        assert_eq!(pipeline.process_block(&block, &block, |_, _| {}).unwrap(), 1);
        assert_eq!(pipeline.remainder_len(), tail);

        // The reference stage already ran when the capture stage failed
        let result = pipeline.process_block(&block, &block, |_, _| {});
        assert!(matches!(result, Err(AudioError::ResampleFailed(_))));
        assert_eq!(capture_resets.load(Ordering::SeqCst), 1);
        assert_eq!(reference_resets.load(Ordering::SeqCst), 1);
        assert_eq!(pipeline.remainder_len(), tail);

        assert_eq!(pipeline.process_block(&block, &block, |_, _| {}).unwrap(), 1);
        assert_eq!(pipeline.remainder_len(), tail + RECORD_MIX_FRAMES - BUFFER_FRAME_COUNT);
    }

    #[test]
    fn test_downsampled_device_blocks() {
        let mut pipeline = AcquisitionPipeline::with_defaults(48_000);
        let blocks = 100;

        let mut total = 0;
        for i in 0..blocks {
            let block: Vec<f32> = (0..RECORD_MIX_FRAMES * 2)
                .map(|n| ((i * RECORD_MIX_FRAMES + n / 2) as f32 * 0.05).sin() * 0.3)
                .collect();
            total += pipeline.process_block(&block, &block, |pcm, _| {
                assert_eq!(pcm.len(), PCM_BUFFER_SIZE);
            })
            .unwrap();
            assert!(pipeline.remainder_len() < BUFFER_FRAME_COUNT);
        }

        // 204800 input samples at a third of the rate, less the resampler delay
        let expected = blocks * RECORD_MIX_FRAMES / 3 / BUFFER_FRAME_COUNT;
        assert!(total.abs_diff(expected) <= 2, "emitted {}", total);
        assert_eq!(pipeline.frames_emitted(), total as u64);
    }

    #[test]
    fn test_upsampled_small_device_blocks() {
        // Each flushed chunk is larger than four times the block it completes
        let mut pipeline = AcquisitionPipeline::with_defaults(8_000);
        let block = stereo_block(256, 0.1);

        let mut total = 0;
        for _ in 0..200 {
            total += pipeline.process_block(&block, &block, |_, _| {}).unwrap();
            assert!(pipeline.remainder_len() < BUFFER_FRAME_COUNT);
        }

        // 51200 samples doubled is 64 frames at most
        assert!((61..=64).contains(&total), "emitted {}", total);
    }

    #[test]
    fn test_mismatched_blocks_rejected() {
        let mut pipeline = AcquisitionPipeline::with_defaults(VOICE_SAMPLE_RATE);
        let result = pipeline.process_block(&[0.0; 4], &[0.0; 6], |_, _| {});
        assert!(matches!(result, Err(AudioError::BlockMismatch { .. })));
    }

    #[test]
    fn test_validate_block() {
        assert!(AcquisitionPipeline::validate_block(&[0.0; 4], &[0.0; 4]).is_ok());
        assert!(matches!(
            AcquisitionPipeline::validate_block(&[0.0; 3], &[0.0; 3]),
            Err(AudioError::OddStereoBlock(3))
        ));
        assert!(matches!(
            AcquisitionPipeline::validate_block(&[0.0; 4], &[0.0; 2]),
            Err(AudioError::BlockMismatch { capture: 4, reference: 2 })
        ));
    }
}
