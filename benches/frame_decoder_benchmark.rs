//! Performance benchmarks for stream decoding
//!
//! Measures framing and interpretation of an answer stream delivered in
//! chunks of different sizes.
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use datachat::sse::{FrameDecoder, StreamInterpreter};

/// Build an answer stream of `tokens` token frames plus start and end.
fn generate_stream(tokens: usize) -> String {
    let mut body = String::from("data: {\"type\": \"start\", \"mode\": \"rag\"}\r\n\r\n");
    for i in 0..tokens {
        body.push_str(&format!(
            "data: {{\"type\": \"token\", \"content\": \"word {} é \"}}\r\n\r\n",
            i
        ));
    }
    body.push_str("data: {\"type\": \"end\", \"content\": null}\r\n\r\n");
    body
}

/// Benchmark framing alone at several chunk sizes
fn bench_decode_chunked(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_decode_chunked");
    let body = generate_stream(500);
    group.throughput(Throughput::Bytes(body.len() as u64));

    for chunk_size in [1, 7, 64, 4096].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_byte_chunks", chunk_size)),
            chunk_size,
            |b, &chunk_size| {
                b.iter(|| {
                    let mut decoder = FrameDecoder::new();
                    let mut frames = 0;
                    for chunk in body.as_bytes().chunks(chunk_size) {
                        frames += decoder.push_bytes(black_box(chunk)).len();
                    }
                    black_box(frames)
                });
            },
        );
    }

    group.finish();
}

/// Benchmark framing plus interpretation of every frame
fn bench_decode_and_interpret(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_decode_interpret");

    for tokens in [10, 100, 1000].iter() {
        let body = generate_stream(*tokens);
        group.throughput(Throughput::Elements(*tokens as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_tokens", tokens)),
            &body,
            |b, body| {
                b.iter(|| {
                    let mut decoder = FrameDecoder::new();
                    let mut interpreter = StreamInterpreter::new();
                    let mut records = 0;
                    for chunk in body.as_bytes().chunks(256) {
                        for frame in decoder.push_bytes(chunk) {
                            if interpreter.interpret(&frame).is_some() {
                                records += 1;
                            }
                        }
                    }
                    black_box(records)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_decode_chunked, bench_decode_and_interpret);

criterion_main!(benches);
