//! Benchmarks for range partitioning and word counting

use chunkfan::chunk::{count_words, count_words_in, partition, WordCounter};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::num::NonZeroU64;
use std::time::Duration;
use tokio::runtime::Runtime;

/// Text of roughly `size` bytes with mixed ASCII and multibyte words
fn create_test_text(size: usize) -> Vec<u8> {
    let words = ["lorem", "ipsum", "dolor", "naïve", "café", "straße", "sit", "amet"];
    let mut text = String::with_capacity(size + 16);
    let mut i = 0;
    while text.len() < size {
        text.push_str(words[i % words.len()]);
        text.push(if i % 11 == 0 { '\n' } else { ' ' });
        i += 1;
    }
    text.into_bytes()
}

fn bench_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition");

    for chunk_size in [1024u64, 64 * 1024, 10 * 1024 * 1024] {
        let chunk = NonZeroU64::new(chunk_size).unwrap();
        group.bench_with_input(
            BenchmarkId::new("1GiB_object", chunk_size),
            &chunk,
            |b, &chunk| b.iter(|| partition(black_box(1 << 30), chunk).count()),
        );
    }

    group.finish();
}

fn bench_word_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("word_count");
    group.warm_up_time(Duration::from_secs(1));

    for size in [4 * 1024, 256 * 1024, 4 * 1024 * 1024] {
        let text = create_test_text(size);
        group.throughput(Throughput::Bytes(text.len() as u64));

        group.bench_with_input(BenchmarkId::new("whole", size), &text, |b, text| {
            b.iter(|| count_words(black_box(text)))
        });

        // Odd slice length so multibyte characters straddle updates
        group.bench_with_input(BenchmarkId::new("incremental_4093", size), &text, |b, text| {
            b.iter(|| {
                let mut counter = WordCounter::new();
                for slice in text.chunks(4093) {
                    counter.update(black_box(slice));
                }
                counter.finish()
            })
        });
    }

    group.finish();
}

fn bench_async_reader(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let text = create_test_text(1024 * 1024);

    let mut group = c.benchmark_group("word_count_reader");
    group.throughput(Throughput::Bytes(text.len() as u64));
    for buffer_size in [8 * 1024, 64 * 1024] {
        group.bench_with_input(
            BenchmarkId::from_parameter(buffer_size),
            &buffer_size,
            |b, &buffer_size| {
                b.to_async(&rt).iter(|| async {
                    let mut reader: &[u8] = &text;
                    count_words_in(&mut reader, buffer_size).await.unwrap()
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_partition, bench_word_count, bench_async_reader);
criterion_main!(benches);
