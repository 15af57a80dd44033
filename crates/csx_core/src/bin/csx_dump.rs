//! Tunes a synthetic banded matrix and prints its per-partition CSX layout,
//! optionally writing the tuned image to disk.
//!
//! Matrix-Market ingress is out of scope for this crate (spec.md §1), so
//! this tool builds its input in-process rather than reading a `.mtx` file.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use clap::Parser;

use csx_core::config::RuntimeConfig;
use csx_core::matrix::builder::MatrixBuilder;
use csx_core::matrix::csr::CsrMatrix;
use csx_core::save;

#[derive(Parser, Debug)]
#[command(about = "Tunes a synthetic banded matrix and dumps its CSX layout.", version)]
struct Args {
    /// Matrix dimension (square).
    #[arg(long, default_value_t = 256)]
    n: usize,

    /// Half-bandwidth; row i gets non-zeros at columns [i-band, i+band].
    #[arg(long, default_value_t = 2)]
    band: usize,

    /// Number of worker partitions to tune for.
    #[arg(long, default_value_t = 1)]
    nr_threads: usize,

    /// Write the tuned image to this path.
    #[arg(long)]
    out: Option<PathBuf>,
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

    let tuned = match csx_core::tune(&csr, &cfg, None) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("tune failed: {e}");
            std::process::exit(1);
        }
    };

    println!("dim: {} x {}  nnz: {}", csr.dim.nrows, csr.dim.ncols, csr.nnz());
    println!("partitions: {}", args.nr_threads);

    let image = tuned.to_image(&cfg);
    for (i, img) in image.images.iter().enumerate() {
        println!(
            "  partition {i}: rows [{}, {}) nnz={} ctl_bytes={} patterns={}",
            img.row_start,
            img.row_start + img.nrows,
            img.nnz,
            img.ctl_size(),
            img.id_map.ids.len(),
        );
    }

    if let Some(path) = args.out {
        let file = match File::create(&path) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("failed to create {}: {e}", path.display());
                std::process::exit(1);
            }
        };
        if let Err(e) = save::save(BufWriter::new(file), &image) {
            eprintln!("failed to write {}: {e}", path.display());
            std::process::exit(1);
        }
        println!("wrote tuned image to {}", path.display());
    }
}
