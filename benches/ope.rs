use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};
use secure_clustering_crypto::ope::{encrypt, keygen, par_encrypt_matrix, Dataset, OpeParams, DEFAULT_SENSITIVITY};

fn random_rows(rng: &mut StdRng, rows: usize) -> Vec<Vec<f64>> {
    (0..rows)
        .map(|_| (0..4).map(|_| rng.random_range(0.0..1000.0)).collect())
        .collect()
}

fn bench_keygen(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let mut group = c.benchmark_group("ope_keygen");

    for rows in [100usize, 1_000, 10_000] {
        let dataset = Dataset::from_rows(&random_rows(&mut rng, rows)).unwrap();
        let params = OpeParams::default();
        group.bench_with_input(BenchmarkId::from_parameter(rows), &dataset, |b, dataset| {
            b.iter(|| keygen(dataset, &params, &mut rng).unwrap());
        });
    }

    group.finish();
}

fn bench_encrypt(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let mut group = c.benchmark_group("ope_encrypt");

    for max_range in [2usize, 5, 20] {
        let dataset = Dataset::from_rows(&random_rows(&mut rng, 1_000)).unwrap();
        let params = OpeParams {
            max_range,
            ..OpeParams::default()
        };
        let key = keygen(&dataset, &params, &mut rng).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(max_range), &key, |b, key| {
            b.iter(|| encrypt(512.25, key, DEFAULT_SENSITIVITY, &mut rng).unwrap());
        });
    }

    group.finish();
}

fn bench_par_encrypt_matrix(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(2);
    let mut group = c.benchmark_group("ope_par_encrypt_matrix");

    for rows in [100usize, 1_000, 10_000] {
        let matrix = random_rows(&mut rng, rows);
        let dataset = Dataset::from_rows(&matrix).unwrap();
        let key = keygen(&dataset, &OpeParams::default(), &mut rng).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(rows), &matrix, |b, matrix| {
            b.iter(|| par_encrypt_matrix(matrix, &key, DEFAULT_SENSITIVITY).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_keygen, bench_encrypt, bench_par_encrypt_matrix);
criterion_main!(benches);
