//! Remote peer registry

pub mod entry;
pub mod registry;

pub use entry::PeerAudio;
pub use registry::{PeerReport, SessionRegistry, SessionReport, SharedSessionRegistry};

/// Remote peer identifier
pub type PeerId = u32;
