use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use voice_transport::constants::PCM_BUFFER_SIZE;
use voice_transport::jitter::JitterBuffer;

fn in_order(c: &mut Criterion) {
    let payload = Bytes::from(vec![0u8; PCM_BUFFER_SIZE]);
    c.bench_function("jitter_insert_in_order", |b| {
        b.iter_batched(
            || JitterBuffer::new(16, true),
            |mut jitter| {
                for seq in 0..256 {
                    jitter.insert(seq, payload.clone());
                }
                black_box(jitter.len())
            },
            BatchSize::SmallInput,
        )
    });
}

fn reordered(c: &mut Criterion) {
    let payload = Bytes::from(vec![0u8; PCM_BUFFER_SIZE]);
    // Pairs swapped and every eighth packet lost
    let arrivals: Vec<i64> = (0..256i64)
        .map(|seq| if seq % 2 == 0 { seq + 1 } else { seq - 1 })
        .filter(|seq| seq % 8 != 3)
        .collect();

    c.bench_function("jitter_insert_reordered_lossy", |b| {
        b.iter_batched(
            || JitterBuffer::new(16, true),
            |mut jitter| {
                for &seq in &arrivals {
                    jitter.insert(seq, payload.clone());
                }
                black_box(jitter.excess_packets())
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, in_order, reordered);
criterion_main!(benches);
