//! Fixed-capacity ring of outbound voice frames
//!
//! The capture callback fills slots, the transport drains them once per
//! tick. Under sustained overload the oldest frame is dropped so the ring
//! always holds the most recent audio.

use crate::constants::{MAX_PENDING_FRAMES, PCM_BUFFER_SIZE};

/// One packet worth of captured voice
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Raw PCM16 mono samples for the packet
    pub pcm: Vec<u8>,
    /// Encoded payload handed to the transport
    pub compressed: Vec<u8>,
    /// Number of valid bytes in `compressed`
    pub buffer_size: usize,
    /// Mean absolute amplitude of the packet
    pub loudness: f32,
}

impl Frame {
    pub fn new() -> Self {
        Self {
            pcm: vec![0; PCM_BUFFER_SIZE],
            compressed: Vec::with_capacity(PCM_BUFFER_SIZE),
            buffer_size: 0,
            loudness: 0.0,
        }
    }

    /// Encoded bytes of this frame
    pub fn payload(&self) -> &[u8] {
        &self.compressed[..self.buffer_size.min(self.compressed.len())]
    }

    fn reset(&mut self) {
        self.pcm.fill(0);
        self.compressed.clear();
        self.buffer_size = 0;
        self.loudness = 0.0;
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

/// Age-ordered ring of pending frames
pub struct FrameRing {
    slots: Vec<Frame>,
    count: usize,
    evicted: u64,
}

impl FrameRing {
    /// Create a ring holding at most `capacity` frames
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: (0..capacity).map(|_| Frame::new()).collect(),
            count: 0,
            evicted: 0,
        }
    }

    /// Next slot for the producer to fill.
    ///
    /// When the ring is full the oldest frame is evicted: every later slot
    /// moves one position toward the front and the last slot is handed out
    /// cleared.
    pub fn acquire_next_slot(&mut self) -> &mut Frame {
        let capacity = self.slots.len();
        if self.count < capacity {
            let slot = &mut self.slots[self.count];
            self.count += 1;
            slot.reset();
            return slot;
        }

        self.slots.rotate_left(1);
        self.evicted += 1;
        let slot = &mut self.slots[capacity - 1];
        slot.reset();
        slot
    }

    /// Take every pending frame, oldest first, leaving the ring empty
    pub fn drain_all(&mut self) -> Vec<Frame> {
        let drained = self.slots[..self.count]
            .iter_mut()
            .map(std::mem::take)
            .collect();
        self.count = 0;
        drained
    }

    /// Pending frames in age order
    pub fn frames(&self) -> &[Frame] {
        &self.slots[..self.count]
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.slots.len()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Frames dropped to make room since the last clear
    pub fn evicted_count(&self) -> u64 {
        self.evicted
    }

    pub fn clear_evicted_count(&mut self) {
        self.evicted = 0;
    }
}

impl Default for FrameRing {
    fn default() -> Self {
        Self::new(MAX_PENDING_FRAMES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(ring: &mut FrameRing, loudness: f32) {
        let slot = ring.acquire_next_slot();
        slot.loudness = loudness;
    }

    #[test]
    fn test_acquire_until_full() {
        let mut ring = FrameRing::new(3);
        for i in 0..3 {
            fill(&mut ring, i as f32);
        }

        assert!(ring.is_full());
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.evicted_count(), 0);
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let mut ring = FrameRing::new(3);
        for i in 0..5 {
            fill(&mut ring, i as f32);
        }

        assert_eq!(ring.len(), 3);
        assert_eq!(ring.evicted_count(), 2);

        let loudness: Vec<f32> = ring.frames().iter().map(|f| f.loudness).collect();
        assert_eq!(loudness, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_drain_empties_ring() {
        let mut ring = FrameRing::new(4);
        fill(&mut ring, 0.5);
        fill(&mut ring, 0.25);

        let drained = ring.drain_all();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].loudness, 0.5);
        assert_eq!(drained[1].loudness, 0.25);
        assert!(ring.is_empty());

        // Slots are reusable after draining
        fill(&mut ring, 1.0);
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.frames()[0].pcm.len(), PCM_BUFFER_SIZE);
    }

    #[test]
    fn test_evicted_slot_is_cleared() {
        let mut ring = FrameRing::new(1);
        {
            let slot = ring.acquire_next_slot();
            slot.compressed.extend_from_slice(&[1, 2, 3]);
            slot.buffer_size = 3;
        }

        let slot = ring.acquire_next_slot();
        assert!(slot.payload().is_empty());
        assert_eq!(ring.evicted_count(), 1);
    }
}
