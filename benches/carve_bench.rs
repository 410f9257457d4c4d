//! Benchmarks for whole-session carving throughput.

use artefact::domain::entities::CarvedArtifact;
use artefact::domain::repositories::{ByteSource, SinkError};
use artefact::domain::services::SignatureRegistry;
use artefact::{CarveOptions, CarveSession};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::sync::Arc;

const MIB: usize = 1024 * 1024;

/// Pseudo-random filler with a small JPEG every 64 KiB
fn synthetic_image(len: usize) -> Vec<u8> {
    let mut state = 0x2545_F491_4F6C_DD1Du64;
    let mut data: Vec<u8> = (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            // keep 0xFF out of the filler so only planted JPEGs match
            ((state >> 32) as u8).min(0xFE)
        })
        .collect();

    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0];
    jpeg.extend(std::iter::repeat_n(b'J', 2000));
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    for offset in (0..len.saturating_sub(jpeg.len())).step_by(64 * 1024) {
        data[offset..offset + jpeg.len()].copy_from_slice(&jpeg);
    }
    data
}

fn run(source: Arc<dyn ByteSource>, options: CarveOptions) -> u64 {
    let mut count = 0u64;
    let mut sink = |_: CarvedArtifact| -> Result<(), SinkError> {
        count += 1;
        Ok(())
    };
    CarveSession::new(source, options).run(&mut sink).unwrap();
    count
}

/// Sequential vs parallel carving over the same input
fn bench_session_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("carve_session");
    group.sample_size(10);

    let size = 32 * MIB;
    let source: Arc<dyn ByteSource> = Arc::new(synthetic_image(size));
    group.throughput(Throughput::Bytes(size as u64));

    let modes = [
        ("sequential", CarveOptions::new().sequential()),
        ("parallel", CarveOptions::new()),
    ];
    for (name, options) in modes {
        group.bench_with_input(BenchmarkId::new("all_formats", name), &options, |b, options| {
            b.iter(|| run(Arc::clone(&source), black_box(options.clone())));
        });
    }

    group.finish();
}

/// Effect of the window size on a single-format scan
fn bench_chunk_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_size");
    group.sample_size(10);

    let size = 16 * MIB;
    let source: Arc<dyn ByteSource> = Arc::new(synthetic_image(size));
    group.throughput(Throughput::Bytes(size as u64));

    for chunk in [64 * 1024, MIB, 8 * MIB] {
        let options = CarveOptions::new()
            .with_formats(["jpg"])
            .with_chunk_size(chunk)
            .with_overlap_size(4096);
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &options, |b, options| {
            b.iter(|| run(Arc::clone(&source), black_box(options.clone())));
        });
    }

    group.finish();
}

/// Header search over one megabyte with every built-in format
fn bench_header_matcher(c: &mut Criterion) {
    let data = synthetic_image(MIB);
    let matcher = SignatureRegistry::builtin().full_matcher().unwrap();

    c.bench_function("header_matcher_1mib", |b| {
        b.iter(|| matcher.hits(black_box(&data)).count());
    });
}

criterion_group!(benches, bench_session_modes, bench_chunk_sizes, bench_header_matcher);
criterion_main!(benches);
