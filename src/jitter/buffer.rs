//! Per-peer reorder buffer
//!
//! Slots are kept in ascending sequence order with the newest packet at
//! the back, so the slot for sequence `s` sits at
//! `len - 1 - (next_expected - s)`. Gaps are filled with invalid slots on
//! arrival; a late packet repairs its slot in place.

use std::collections::VecDeque;

use bytes::Bytes;
use tracing::debug;

use crate::config::VoiceConfig;

/// Packet sequence number as carried on the wire
pub type Sequence = i64;

/// One position in the jitter buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub payload: Option<Bytes>,
    /// `true` when real data arrived for this position
    pub valid: bool,
}

impl Slot {
    fn valid(payload: Bytes) -> Self {
        Self {
            payload: Some(payload),
            valid: true,
        }
    }

    fn filler(payload: Option<Bytes>) -> Self {
        Self { payload, valid: false }
    }
}

/// What an insertion did to the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// Appended at the back after `filled` gap slots; `evicted` slots were
    /// dropped from the front to stay within capacity
    Appended { filled: u64, evicted: u64 },
    /// Overwrote the slot at `index`, plus `stretched` filler slots after it
    Repaired { index: usize, stretched: usize },
    /// Older than anything still buffered; dropped
    TooLate,
}

/// Bounded reorder buffer for one remote peer
#[derive(Debug, Clone)]
pub struct JitterBuffer {
    slots: VecDeque<Slot>,
    /// Sequence of the newest slot; `None` until the first packet
    next_expected: Option<Sequence>,
    excess_packets: u64,
    max_size: usize,
    use_sample_stretching: bool,
    trace: bool,
}

impl JitterBuffer {
    /// Create a buffer holding at most `max_size` slots
    pub fn new(max_size: usize, use_sample_stretching: bool) -> Self {
        let max_size = max_size.max(1);
        Self {
            slots: VecDeque::with_capacity(max_size),
            next_expected: None,
            excess_packets: 0,
            max_size,
            use_sample_stretching,
            trace: false,
        }
    }

    pub fn from_config(config: &VoiceConfig) -> Self {
        let mut buffer = Self::new(config.max_jitter_buffer_size, config.use_sample_stretching);
        buffer.trace = config.debug;
        buffer
    }

    /// Pick up changed capacity, stretching and trace settings.
    ///
    /// A smaller capacity takes effect on the next insertion.
    pub fn apply_config(&mut self, config: &VoiceConfig) {
        self.max_size = config.max_jitter_buffer_size.max(1);
        self.use_sample_stretching = config.use_sample_stretching;
        self.trace = config.debug;
    }

    /// Insert an arriving packet
    pub fn insert(&mut self, sequence: Sequence, payload: Bytes) -> Insertion {
        // The first packet is treated as exactly on time
        let next_expected = *self
            .next_expected
            .get_or_insert_with(|| sequence.saturating_sub(1));
        let offset = sequence.saturating_sub(next_expected);

        if offset > 0 {
            let insertion = self.append(offset, payload);
            self.next_expected = Some(next_expected.saturating_add(offset));
            insertion
        } else {
            self.repair(sequence, offset, payload)
        }
    }

    fn append(&mut self, offset: i64, payload: Bytes) -> Insertion {
        let missing = (offset - 1) as u64;

        // Stretching repeats the newest payload across the gap
        let fill = if self.use_sample_stretching {
            self.slots.back().and_then(|slot| slot.payload.clone())
        } else {
            None
        };

        let len = self.slots.len() as u64;
        let excess = (len + missing + 1).saturating_sub(self.max_size as u64);

        let from_existing = excess.min(len) as usize;
        self.slots.drain(..from_existing);

        // Fillers that would be evicted immediately are never materialized
        let skipped = excess - from_existing as u64;
        for _ in 0..(missing - skipped) {
            self.slots.push_back(Slot::filler(fill.clone()));
        }
        self.slots.push_back(Slot::valid(payload));

        self.excess_packets += excess;

        if self.trace && (missing > 0 || excess > 0) {
            debug!("Jitter buffer filled {} missing packets, evicted {}", missing, excess);
        }

        Insertion::Appended {
            filled: missing,
            evicted: excess,
        }
    }

    fn repair(&mut self, sequence: Sequence, offset: i64, payload: Bytes) -> Insertion {
        // A drained buffer has nothing left to repair
        let newest = match self.slots.len().checked_sub(1) {
            Some(newest) => newest as i64,
            None => {
                if self.trace {
                    debug!("Dropping packet {} behind a drained buffer", sequence);
                }
                return Insertion::TooLate;
            }
        };
        let target = newest + offset;
        if target < 0 {
            if self.trace {
                debug!("Dropping packet {} too late to repair", sequence);
            }
            return Insertion::TooLate;
        }
        let target = target as usize;
        if self.trace {
            debug!("Repairing packet {} at slot {}", sequence, target);
        }

        // Fillers after a late packet were stretched from an older payload;
        // re-stretch them from this one up to the next real packet.
        let mut stretched = 0;
        let last = self.slots.len() - 1;
        if self.use_sample_stretching && !self.slots[target].valid {
            for slot in self.slots.range_mut(target + 1..last) {
                if slot.valid {
                    break;
                }
                *slot = Slot::filler(Some(payload.clone()));
                stretched += 1;
            }
        }

        // Last writer wins, even over a slot that already holds real data
        self.slots[target] = Slot::valid(payload);

        Insertion::Repaired {
            index: target,
            stretched,
        }
    }

    /// Remove the oldest slot for playback
    pub fn pop_front(&mut self) -> Option<Slot> {
        self.slots.pop_front()
    }

    pub fn front(&self) -> Option<&Slot> {
        self.slots.front()
    }

    /// Slots oldest first
    pub fn slots(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn use_sample_stretching(&self) -> bool {
        self.use_sample_stretching
    }

    /// Sequence of the newest buffered position, `None` before any packet
    pub fn next_expected_sequence(&self) -> Option<Sequence> {
        self.next_expected
    }

    /// Slots evicted to stay within capacity
    pub fn excess_packets(&self) -> u64 {
        self.excess_packets
    }

    pub fn clear_excess_packets(&mut self) {
        self.excess_packets = 0;
    }

    /// Forget all slots and the sequence position
    pub fn reset(&mut self) {
        self.slots.clear();
        self.next_expected = None;
    }
}
