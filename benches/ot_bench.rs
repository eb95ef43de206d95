use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use otsync_core::editor::{ChangeBatch, Position};
use otsync_core::ot::{Document, TextOperation};
use otsync_core::protocol::{decode_message, deserialize_operation, encode_message, serialize_operation};
use otsync_core::sync::{QueuedTransport, SessionConfig, SyncSession};
use otsync_core::RopeBuffer;

/// Operation that types `n` characters, one retain+insert per character
fn typing_ops(author: &str, base: usize, n: usize) -> Vec<TextOperation> {
    (0..n)
        .map(|i| {
            let mut op = TextOperation::new(Some(author.to_string()));
            op.retain(base + i);
            op.insert("a");
            op
        })
        .collect()
}

/// Benchmark applying a single insert to a large text
fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("ot_apply");

    for size in [100, 10_000, 100_000].iter() {
        let text = "a".repeat(*size);
        let mut op = TextOperation::new(Some("client1".to_string()));
        op.retain(size / 2);
        op.insert("hello");
        op.retain(size - size / 2);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(op.apply(&text).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark composing a burst of keystrokes into one operation
fn bench_compose_typing(c: &mut Criterion) {
    let mut group = c.benchmark_group("ot_compose_typing");

    for count in [10, 100, 1000].iter() {
        let ops = typing_ops("client1", 0, *count);
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter(|| {
                let mut iter = ops.iter();
                let first = iter.next().unwrap().clone();
                let composed = iter.fold(first, |acc, op| acc.compose(op).unwrap());
                black_box(composed)
            });
        });
    }

    group.finish();
}

/// Benchmark transforming two concurrent edits of a large document
fn bench_transform(c: &mut Criterion) {
    let size = 10_000;
    let mut a = TextOperation::new(Some("alice".to_string()));
    a.retain(100);
    a.insert("alice was here");
    a.retain(size - 100);

    let mut b_op = TextOperation::new(Some("bob".to_string()));
    b_op.retain(50);
    b_op.delete(&"a".repeat(100));
    b_op.retain(size - 150);

    c.bench_function("ot_transform_10k", |b| {
        b.iter(|| black_box(a.transform(&b_op).unwrap()));
    });
}

/// Benchmark rebasing a stale operation through server history
fn bench_document_rebase(c: &mut Criterion) {
    let mut group = c.benchmark_group("ot_document_rebase");
    group.sample_size(20);

    for behind in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(behind), behind, |b, &behind| {
            b.iter_batched(
                || {
                    let mut doc = Document::new("x".repeat(100), 0);
                    for (rev, op) in typing_ops("alice", 100, behind).into_iter().enumerate() {
                        doc.apply(op, rev as u64).unwrap();
                    }
                    doc
                },
                |mut doc| {
                    let mut stale = TextOperation::new(Some("bob".to_string()));
                    stale.insert("bob");
                    stale.retain(100);
                    black_box(doc.apply(stale, 0).unwrap())
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Benchmark a session typing while an operation is in flight
fn bench_session_typing(c: &mut Criterion) {
    c.bench_function("session_typing_1000_chars", |b| {
        b.iter(|| {
            let mut session = SyncSession::new(
                "client1".to_string(),
                RopeBuffer::new(""),
                QueuedTransport::new(),
                SessionConfig::default(),
            )
            .unwrap();
            for i in 0..1000 {
                let at = Position::new(0, i);
                let change = session.surface_mut().user_edit(at, at, "a").unwrap();
                session.handle_changes(&ChangeBatch::user(vec![change])).unwrap();
            }
            black_box(session.pending_operation().map(|op| op.target_length()))
        });
    });
}

/// Benchmark the JSON wire round trip
fn bench_serialization(c: &mut Criterion) {
    let mut op = TextOperation::new(Some("client1".to_string()));
    for _ in 0..100 {
        op.retain(10);
        op.insert("hello");
        op.delete("abc");
    }

    c.bench_function("ot_serialize_300_steps", |b| {
        b.iter(|| black_box(encode_message(&serialize_operation(&op)).unwrap()));
    });

    let json = encode_message(&serialize_operation(&op)).unwrap();
    c.bench_function("ot_deserialize_300_steps", |b| {
        b.iter(|| black_box(deserialize_operation(&decode_message(&json).unwrap()).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_apply,
    bench_compose_typing,
    bench_transform,
    bench_document_rebase,
    bench_session_typing,
    bench_serialization,
);

criterion_main!(benches);
