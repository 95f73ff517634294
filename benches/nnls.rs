use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::{Array1, Array2};

use isocor_core::nnls::{solve_nnls, NnlsConfig};

fn correction_matrix(n: usize) -> Array2<f64> {
    let m = n + 1;
    Array2::from_shape_fn((m, n + 1), |(row, col)| {
        if row == col {
            0.9
        } else if row == col + 1 {
            0.1
        } else {
            0.0
        }
    })
}

fn small_solve(c: &mut Criterion) {
    let a = correction_matrix(4);
    let v = Array1::from_vec(vec![0.1, 0.2, 0.3, 0.3, 0.1]);
    c.bench_function("nnls_n4", |b| {
        b.iter(|| solve_nnls(black_box(&a), black_box(&v), NnlsConfig::default(), || false))
    });
}

fn large_solve(c: &mut Criterion) {
    let a = correction_matrix(20);
    let v = Array1::from_elem(21, 1.0 / 21.0);
    c.bench_function("nnls_n20", |b| {
        b.iter(|| solve_nnls(black_box(&a), black_box(&v), NnlsConfig::default(), || false))
    });
}

criterion_group!(benches, small_solve, large_solve);
criterion_main!(benches);
