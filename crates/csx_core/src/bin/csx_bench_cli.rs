//! Times the tuning pipeline and repeated `spmv` calls over a synthetic
//! banded matrix, in the same timing-breakdown style as this corpus's other
//! CLI demo binaries.

use std::time::{Duration, Instant};

use clap::Parser;

use csx_core::config::RuntimeConfig;
use csx_core::matrix::builder::MatrixBuilder;
use csx_core::matrix::csr::CsrMatrix;

fn fmt_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs >= 1.0 {
        format!("{secs:.3}s")
    } else if secs >= 1e-3 {
        format!("{:.3}ms", secs * 1e3)
    } else if secs >= 1e-6 {
        format!("{:.3}us", secs * 1e6)
    } else {
        format!("{}ns", d.as_nanos())
    }
}

#[derive(Parser, Debug)]
#[command(about = "Benchmarks CSX tuning and spmv against plain CSR on a synthetic matrix.", version)]
struct Args {
    #[arg(long, default_value_t = 4096)]
    n: usize,

    #[arg(long, default_value_t = 4)]
    band: usize,

    #[arg(long, default_value_t = 1)]
    nr_threads: usize,

    #[arg(long, default_value_t = 200)]
    iters: usize,
}

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

fn main() {
    env_logger::init();
    let args = Args::parse();

    let csr = banded_matrix(args.n, args.band);
    let mut cfg = RuntimeConfig::default();
    cfg.nr_threads = args.nr_threads.max(1);

    let t = Instant::now();
    let tuned = csx_core::tune(&csr, &cfg, None).unwrap_or_else(|e| {
        eprintln!("tune failed: {e}");
        std::process::exit(1);
    });
    let tune_time = t.elapsed();

    let x = vec![1.0; csr.dim.ncols];
    let mut y = vec![0.0; csr.dim.nrows];
    let mut y_ref = vec![0.0; csr.dim.nrows];

    let t = Instant::now();
    for _ in 0..args.iters {
        tuned.spmv(1.0, &x, 0.0, &mut y).unwrap();
    }
    let csx_time = t.elapsed();

    let t = Instant::now();
    for _ in 0..args.iters {
        csr.spmv_reference(1.0, &x, 0.0, &mut y_ref);
    }
    let csr_time = t.elapsed();

    let max_diff = y.iter().zip(&y_ref).map(|(a, b)| (a - b).abs()).fold(0.0, f64::max);

    println!("dim: {} x {}  nnz: {}  iters: {}", csr.dim.nrows, csr.dim.ncols, csr.nnz(), args.iters);
    println!("tune:           {}", fmt_duration(tune_time));
    println!(
        "spmv (csx):     {} ({} / call)",
        fmt_duration(csx_time),
        fmt_duration(csx_time / args.iters as u32)
    );
    println!(
        "spmv (csr ref): {} ({} / call)",
        fmt_duration(csr_time),
        fmt_duration(csr_time / args.iters as u32)
    );
    println!("max |csx - csr_ref|: {max_diff:.3e}");
}
