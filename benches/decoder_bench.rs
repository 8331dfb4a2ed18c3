use agent_chat_stream::streaming::{FrameExtractor, StreamDecoder, classify};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

fn sample_body(frames: usize) -> String {
    let mut body = String::from("data: {\"event\":\"message_start\"}\n");
    for i in 0..frames {
        let answer = format!("片段 {} of the streamed answer, with some ascii. ", i);
        body.push_str(&format!(
            "data: {}\n\n",
            serde_json::json!({"event": "message", "answer": answer})
        ));
    }
    body
}

fn benchmark_decode_chunked(c: &mut Criterion) {
    let body = sample_body(1000);
    let bytes = body.as_bytes();

    let mut group = c.benchmark_group("stream_decoder");
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    for chunk_size in [16usize, 256, 4096] {
        group.bench_function(format!("feed_{}b_chunks", chunk_size), |b| {
            b.iter(|| {
                let mut decoder = StreamDecoder::new();
                let mut count = 0;
                for chunk in bytes.chunks(chunk_size) {
                    count += decoder.feed(black_box(chunk)).len();
                }
                count += decoder.finish().len();
                black_box(count)
            });
        });
    }

    group.finish();
}

fn benchmark_long_unterminated_line(c: &mut Criterion) {
    // One frame delivered in many small pieces; scanning must stay linear
    let answer = "x".repeat(256 * 1024);
    let line = format!("data: {}\n", serde_json::json!({ "answer": answer }));

    c.bench_function("framer_long_line_64b_pieces", |b| {
        b.iter(|| {
            let mut framer = FrameExtractor::new();
            let mut frames = Vec::new();
            for piece in line.as_bytes().chunks(64) {
                let text = std::str::from_utf8(piece).unwrap_or_default();
                frames.extend(framer.push(black_box(text)));
            }
            black_box(frames.len())
        });
    });
}

fn benchmark_classify(c: &mut Criterion) {
    let mut framer = FrameExtractor::new();
    let frames = framer.push(&sample_body(100));

    c.bench_function("classify_frames", |b| {
        b.iter(|| {
            for frame in &frames {
                black_box(classify(black_box(frame)));
            }
        });
    });
}

criterion_group!(
    benches,
    benchmark_decode_chunked,
    benchmark_long_unterminated_line,
    benchmark_classify
);
criterion_main!(benches);
