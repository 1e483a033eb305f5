//! Playback ring sizing

/// Ring length in frames for `duration` seconds of audio at `rate`.
///
/// Returns the power of two one above the highest set bit of
/// `round(rate * duration)`, so a target that is already a power of two
/// gets doubled. A zero target yields 1.
pub fn compute_ring_length(rate: u32, duration: f32) -> usize {
    let target = (rate as f64 * duration as f64).round();
    if !(target >= 1.0) {
        return 1;
    }
    let target = target.min(u32::MAX as f64) as u64;
    let highest_bit = 63 - target.leading_zeros();
    (1u64 << (highest_bit + 1)) as usize
}
