use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use csx_core::config::RuntimeConfig;
use csx_core::matrix::builder::MatrixBuilder;
use csx_core::matrix::csr::CsrMatrix;

fn banded_matrix(n: usize, band: usize) -> CsrMatrix {
    let mut b = MatrixBuilder::new(n, n);
    for row in 0..n {
        let lo = row.saturating_sub(band);
        let hi = (row + band).min(n - 1);
        for col in lo..=hi {
            b.push(col, row, 1.0 + (row as f64 - col as f64)).unwrap();
        }
    }
    b.build().unwrap()
}

fn bench_spmv(c: &mut Criterion) {
    let mut group = c.benchmark_group("csx/spmv");
    let cfg = RuntimeConfig::default();

    for &n in &[64usize, 512, 4096] {
        let csr = banded_matrix(n, 3);
        let tuned = csx_core::tune(&csr, &cfg, None).expect("tuning a banded matrix should not fail");
        let x = vec![1.0; n];
        let mut y = vec![0.0; n];

        group.throughput(Throughput::Elements(csr.nnz() as u64));
        group.bench_with_input(BenchmarkId::new("csx", n), &n, |b, _| {
            b.iter(|| {
                tuned.spmv(1.0, black_box(&x), 0.0, &mut y).unwrap();
                black_box(&y);
            });
        });
        group.bench_with_input(BenchmarkId::new("csr_reference", n), &n, |b, _| {
            b.iter(|| {
                csr.spmv_reference(1.0, black_box(&x), 0.0, &mut y);
                black_box(&y);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_spmv);
criterion_main!(benches);
