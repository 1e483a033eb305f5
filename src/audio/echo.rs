//! Echo cancellation seam
//!
//! The filter itself lives outside this crate; the acquisition stage feeds
//! it synchronized capture and reference blocks of one packet each.

/// Echo-cancellation and high-pass stage
pub trait EchoCanceller: Send {
    /// Produce a cleaned block from near-end `capture` and far-end `reference`
    ///
    /// All three slices have the same length.
    fn process(&mut self, capture: &[i16], reference: &[i16], output: &mut [i16]);
}

/// Pass-through stage for hosts without an echo canceller
#[derive(Debug, Default, Clone, Copy)]
pub struct Bypass;

impl EchoCanceller for Bypass {
    fn process(&mut self, capture: &[i16], _reference: &[i16], output: &mut [i16]) {
        output.copy_from_slice(capture);
    }
}
