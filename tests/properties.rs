//! Property tests for the capture ring and the jitter buffer

use bytes::Bytes;
use proptest::prelude::*;

use voice_transport::audio::FrameRing;
use voice_transport::jitter::JitterBuffer;
use voice_transport::stats::percent;

fn payload(sequence: i64) -> Bytes {
    Bytes::copy_from_slice(&sequence.to_le_bytes())
}

proptest! {
    #[test]
    fn ring_keeps_capacity_and_counts_evictions(capacity in 1usize..16, acquired in 0usize..64) {
        let mut ring = FrameRing::new(capacity);
        for i in 0..acquired {
            ring.acquire_next_slot().loudness = i as f32;
        }

        prop_assert_eq!(ring.len(), acquired.min(capacity));
        prop_assert_eq!(ring.evicted_count(), acquired.saturating_sub(capacity) as u64);

        // The newest frames survive, oldest first
        let first_kept = acquired.saturating_sub(capacity);
        let loudness: Vec<f32> = ring.frames().iter().map(|f| f.loudness).collect();
        let expected: Vec<f32> = (first_kept..acquired).map(|i| i as f32).collect();
        prop_assert_eq!(loudness, expected);
    }

    #[test]
    fn jitter_length_never_exceeds_capacity(
        max_size in 1usize..24,
        stretching in any::<bool>(),
        arrivals in prop::collection::vec(-50i64..200, 1..120),
    ) {
        let mut jitter = JitterBuffer::new(max_size, stretching);
        let first = arrivals[0];
        let mut newest = first;

        for seq in arrivals {
            jitter.insert(seq, payload(seq));
            newest = newest.max(seq);

            // Nothing is popped, so the window spans every sequence from the
            // first arrival to the newest and the overflow was evicted
            let spanned = (newest - first + 1) as u64;
            prop_assert!(jitter.len() <= max_size);
            prop_assert_eq!(jitter.len() as u64, spanned.min(max_size as u64));
            prop_assert_eq!(jitter.excess_packets(), spanned.saturating_sub(max_size as u64));
        }
    }

    #[test]
    fn jitter_valid_slots_hold_their_own_sequence(
        arrivals in prop::collection::vec(0i64..40, 1..80),
    ) {
        let mut jitter = JitterBuffer::new(64, true);
        for &seq in &arrivals {
            jitter.insert(seq, payload(seq));
        }

        let newest = jitter.next_expected_sequence().unwrap();
        let oldest = newest - jitter.len() as i64 + 1;
        for (i, slot) in jitter.slots().enumerate() {
            if slot.valid {
                let expected = payload(oldest + i as i64);
                prop_assert_eq!(slot.payload.as_ref(), Some(&expected));
            }
        }
    }

    #[test]
    fn in_order_arrivals_are_all_valid(start in -1000i64..1000, count in 1usize..32) {
        let mut jitter = JitterBuffer::new(32, true);
        for seq in start..start + count as i64 {
            jitter.insert(seq, payload(seq));
        }

        prop_assert_eq!(jitter.len(), count);
        prop_assert!(jitter.slots().all(|s| s.valid));
        prop_assert_eq!(jitter.excess_packets(), 0);
        prop_assert_eq!(jitter.next_expected_sequence(), Some(start + count as i64 - 1));
    }

    #[test]
    fn forward_gap_is_filled_with_invalid_slots(first in 0i64..1000, gap in 1i64..10) {
        let mut jitter = JitterBuffer::new(32, false);
        jitter.insert(first, payload(first));
        jitter.insert(first + gap + 1, payload(first + gap + 1));

        let validity: Vec<bool> = jitter.slots().map(|s| s.valid).collect();
        let mut expected = vec![true];
        expected.extend(std::iter::repeat(false).take(gap as usize));
        expected.push(true);
        prop_assert_eq!(validity, expected);
        prop_assert!(jitter.slots().filter(|s| !s.valid).all(|s| s.payload.is_none()));
    }

    #[test]
    fn percent_with_zero_denominator_is_zero(numerator in any::<f64>()) {
        prop_assert_eq!(percent(numerator, 0.0), 0.0);
    }
}
