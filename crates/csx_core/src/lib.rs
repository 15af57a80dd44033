//! Compressed Sparse eXtended (CSX) acceleration library.
//!
//! `tune` runs the full pipeline of spec.md §4 — partition, build the
//! internal coordinate form, collect statistics, pick and emit patterns —
//! and hands back a [`TunedMatrix`] whose [`TunedMatrix::spmv`] replays it.

pub mod codegen;
pub mod config;
pub mod csx;
pub mod encode;
pub mod error;
pub mod exec;
pub mod ir;
pub mod matrix;
pub mod partition;
pub mod pattern;
pub mod save;
pub mod stats;

use config::RuntimeConfig;
use csx::writer::build_image;
use error::CsxResult;
use exec::pool::WorkerPool;
use exec::{Executor, Permutation};
use ir::IrPartition;
use matrix::csr::CsrMatrix;
use save::{ThreadAssignment, TunedImage};

/// A matrix that has gone through the full tuning pipeline and is ready for
/// repeated `spmv` calls (spec.md §4's six stages, run once up front).
pub struct TunedMatrix {
    executor: Executor,
    pool: Option<WorkerPool>,
    symmetric: bool,
}

impl TunedMatrix {
    pub fn nrows(&self) -> usize {
        self.executor.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.executor.ncols()
    }

    /// `y <- alpha*A*x + beta*y`. Runs on the pooled workers if `cfg.nr_threads > 1`
    /// when this matrix was tuned, otherwise sequentially (spec.md §4.6).
    pub fn spmv(&self, alpha: f64, x: &[f64], beta: f64, y: &mut [f64]) -> CsxResult<()> {
        match &self.pool {
            Some(pool) => self.executor.spmv_pooled(pool, alpha, x, beta, y),
            None => self.executor.spmv(alpha, x, beta, y),
        }
    }

    /// Packages this matrix for [`save::save`]. Thread cpu/id/node triples
    /// are synthesised from `cfg.cpu_affinity` (spec.md §8's "modulo the
    /// thread-cpu/id/node triples, which may be re-mapped on load"); the
    /// NUMA node is resolved from the pinned cpu, not guessed.
    pub fn to_image(&self, cfg: &RuntimeConfig) -> TunedImage {
        let threads = (0..self.executor.images.len())
            .map(|i| {
                let cpu = cfg.cpu_affinity.get(i).copied().unwrap_or(0);
                ThreadAssignment {
                    cpu: cpu as u32,
                    id: i as u32,
                    numa_node: exec::pool::numa_node_of_cpu(cpu),
                }
            })
            .collect();
        TunedImage {
            symmetric: self.symmetric,
            threads,
            images: self.executor.images.clone(),
            permutation: self.executor.permutation.clone(),
        }
    }

    pub fn from_image(image: TunedImage, nr_threads: usize, cpu_affinity: &[usize]) -> Self {
        let pool = (nr_threads > 1).then(|| WorkerPool::new(image.images.len(), cpu_affinity));
        Self {
            symmetric: image.symmetric,
            executor: Executor::new(image.images, image.permutation),
            pool,
        }
    }
}

/// Runs the full tuning pipeline over `csr`: partition into `cfg.nr_threads`
/// row ranges, build each partition's internal coordinate form, run the
/// statistics/encode loop, and emit a `CsxImage` per partition (spec.md §4).
///
/// `permutation`, when given, is applied around every `spmv` call; this
/// crate never computes one itself (spec.md §4.6).
pub fn tune(csr: &CsrMatrix, cfg: &RuntimeConfig, permutation: Option<Permutation>) -> CsxResult<TunedMatrix> {
    cfg.validate()?;
    let bounds = partition::partition(csr, cfg.nr_threads.max(1))?;

    let mut images = Vec::with_capacity(bounds.len());
    for pb in &bounds {
        let ir = IrPartition::from_csr_rows(csr, pb.row_start, pb.row_start + pb.row_count);
        let encoded = encode::encode_partition(&ir, cfg);
        images.push(build_image(&encoded, cfg)?);
    }

    let pool = (cfg.nr_threads > 1).then(|| WorkerPool::new(images.len(), &cfg.cpu_affinity));

    Ok(TunedMatrix {
        executor: Executor::new(images, permutation),
        pool,
        symmetric: cfg.symmetric,
    })
}

/// Convenience one-shot: tune then immediately run a single `spmv`. Callers
/// doing more than one multiplication should keep the `TunedMatrix` instead
/// (spec.md §1's "amortised across repeated multiplications").
pub fn spmv_once(
    csr: &CsrMatrix,
    cfg: &RuntimeConfig,
    alpha: f64,
    x: &[f64],
    beta: f64,
    y: &mut [f64],
) -> CsxResult<()> {
    let tuned = tune(csr, cfg, None)?;
    tuned.spmv(alpha, x, beta, y)
}
