//! Error types for the voice transport

use thiserror::Error;

use crate::session::PeerId;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Configuration serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Capture-side audio errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Resample failed: {0}")]
    ResampleFailed(String),

    #[error("Capture and reference blocks differ: {capture} vs {reference} samples")]
    BlockMismatch { capture: usize, reference: usize },

    #[error("Stereo block has odd sample count: {0}")]
    OddStereoBlock(usize),

    #[error("PCM buffer has odd byte count: {0}")]
    OddPcmBuffer(usize),
}

/// Codec errors
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Invalid frame size: {0}")]
    InvalidFrameSize(usize),

    #[error("Decoding failed: {0}")]
    DecodingFailed(String),
}

/// Session registry errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("Peer already registered: {0}")]
    AlreadyRegistered(PeerId),

    #[error("Peer not registered: {0}")]
    NotRegistered(PeerId),
}

/// Speech recognizer errors
#[derive(Error, Debug)]
pub enum RecognizerError {
    #[error("Recognition failed: {0}")]
    Failed(String),

    #[error("Recognizer worker is not running")]
    WorkerGone,
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;
