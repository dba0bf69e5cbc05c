use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{rngs::StdRng, SeedableRng};
use secure_clustering_crypto::homomorphic::{
    decrypt_product, decrypt_scalar, encrypt_scalar, multiply, par_encrypt_matrix, SecretKey,
};

fn bench_encrypt(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let mut group = c.benchmark_group("liu_encrypt");

    for m in 3..=8 {
        let sk = SecretKey::generate(m, &mut rng).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(m), &sk, |b, sk| {
            b.iter(|| encrypt_scalar(42.5, sk, &mut rng));
        });
    }

    group.finish();
}

fn bench_decrypt(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let mut group = c.benchmark_group("liu_decrypt");

    for m in 3..=8 {
        let sk = SecretKey::generate(m, &mut rng).unwrap();
        let ct = encrypt_scalar(42.5, &sk, &mut rng);
        group.bench_with_input(BenchmarkId::from_parameter(m), &(sk, ct), |b, inp| {
            b.iter(|| decrypt_scalar(&inp.1, &inp.0).unwrap());
        });
    }

    group.finish();
}

fn bench_product(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(2);
    let mut group = c.benchmark_group("liu_product");

    for m in 3..=8 {
        let sk = SecretKey::generate(m, &mut rng).unwrap();
        let a = encrypt_scalar(6, &sk, &mut rng);
        let b = encrypt_scalar(7, &sk, &mut rng);
        group.bench_with_input(BenchmarkId::from_parameter(m), &(sk, a, b), |bench, inp| {
            bench.iter(|| {
                let product = multiply(&inp.1, &inp.2).unwrap();
                decrypt_product(&product, &inp.0).unwrap()
            });
        });
    }

    group.finish();
}

fn bench_encrypt_matrix(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(3);
    let mut group = c.benchmark_group("liu_par_encrypt_matrix");
    let sk = SecretKey::generate(3, &mut rng).unwrap();

    for size in [64usize, 256, 1024] {
        let rows: Vec<Vec<f64>> = (0..size)
            .map(|i| (0..8).map(|j| (i * 8 + j) as f64).collect())
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &rows, |b, rows| {
            b.iter(|| par_encrypt_matrix(rows, &sk));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encrypt, bench_decrypt, bench_product, bench_encrypt_matrix);
criterion_main!(benches);
