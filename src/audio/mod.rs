//! Capture-side audio subsystem

pub mod acquisition;
pub mod capture;
pub mod echo;
pub mod frame_ring;
pub mod pcm;
pub mod resample;

pub use acquisition::AcquisitionPipeline;
pub use capture::VoiceCapture;
pub use echo::{Bypass, EchoCanceller};
pub use frame_ring::{Frame, FrameRing};
pub use resample::{Resampler, RubatoResampler};
