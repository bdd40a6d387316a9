use criterion::{black_box, criterion_group, criterion_main, Criterion};
use feedline_core::{exchange, SampleBlock};

const QUANTUM: usize = 128;

fn take_quantum(c: &mut Criterion) {
    let (mut w, mut r) = exchange();
    let block: Vec<f32> = (0..QUANTUM * 64).map(|i| (i as f32 * 0.01).sin()).collect();
    let mut q = [0.0_f32; QUANTUM];

    c.bench_function("take_quantum/steady", |b| {
        b.iter(|| {
            if r.available() < QUANTUM {
                w.deliver(SampleBlock::from_slice(&block).unwrap());
            }
            black_box(r.take_quantum(black_box(&mut q)));
        });
    });

    c.bench_function("take_quantum/starved", |b| {
        b.iter(|| black_box(r.take_quantum(black_box(&mut q))));
    });
}

fn deliver(c: &mut Criterion) {
    let (mut w, mut r) = exchange();
    let block: Vec<f32> = vec![0.25; QUANTUM * 8];
    let mut q = [0.0_f32; QUANTUM];

    c.bench_function("deliver/copy_on_send", |b| {
        b.iter(|| {
            w.deliver(SampleBlock::from_slice(black_box(&block)).unwrap());
            r.take_quantum(&mut q);
        });
    });
}

criterion_group!(benches, take_quantum, deliver);
criterion_main!(benches);
