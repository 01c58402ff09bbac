use astrokern::transpose::{TileShape, TransposeEngine, TransposeMode};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::distributions::Standard;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_buffer(len: usize) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(0x7A11_F32 + len as u64);
    (0..len).map(|_| rng.sample(Standard)).collect()
}

fn benchmark_transpose(c: &mut Criterion) {
    // nsamples x nchans: one aligned block and one with ragged edges in both axes.
    let shapes = [(65_536_usize, 1024_usize), (65_500, 1000)];

    let mut group = c.benchmark_group("transpose");
    for &(rows, cols) in &shapes {
        let input = random_buffer(rows * cols);
        let mut output = vec![0.0f32; rows * cols];
        let mut engine = TransposeEngine::<f32>::new(TileShape::DEFAULT).expect("engine");
        group.throughput(Throughput::Elements((rows * cols) as u64));

        let label = format!("{rows}x{cols}");
        if rows % 64 == 0 && cols % 16 == 0 {
            group.bench_with_input(BenchmarkId::new("exact", &label), &input, |b, input| {
                b.iter(|| {
                    engine
                        .transpose(black_box(input), &mut output, rows, cols, TransposeMode::Exact)
                        .expect("aligned transpose");
                });
            });
        }
        group.bench_with_input(BenchmarkId::new("padded", &label), &input, |b, input| {
            b.iter(|| {
                engine
                    .transpose(black_box(input), &mut output, rows, cols, TransposeMode::Padded)
                    .expect("padded transpose");
            });
        });
        group.bench_with_input(BenchmarkId::new("uniform", &label), &input, |b, input| {
            b.iter(|| {
                engine
                    .transpose(
                        black_box(input),
                        &mut output,
                        rows,
                        cols,
                        TransposeMode::PaddedUniform,
                    )
                    .expect("uniform transpose");
            });
        });
    }
    group.finish();
}

criterion_group!(transpose_benches, benchmark_transpose);
criterion_main!(transpose_benches);
