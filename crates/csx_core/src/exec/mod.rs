//! Executor: SpMV with permutation, per spec.md §4.6.

pub mod pool;

use crate::codegen::PartitionKernel;
use crate::csx::CsxImage;
use crate::error::{CsxError, CsxResult};

/// A zero-based permutation vector, `p[i]` is the original index of row/col
/// `i` after reordering (spec.md §4.6, from RCM — the core only consumes
/// one, never computes it).
#[derive(Debug, Clone)]
pub struct Permutation {
    pub forward: Vec<usize>,
    pub inverse: Vec<usize>,
}

impl Permutation {
    pub fn new(forward: Vec<usize>) -> Self {
        let mut inverse = vec![0; forward.len()];
        for (i, &p) in forward.iter().enumerate() {
            inverse[p] = i;
        }
        Self { forward, inverse }
    }

    fn permute_into(&self, src: &[f64], dst: &mut [f64]) {
        for (i, &p) in self.forward.iter().enumerate() {
            dst[i] = src[p];
        }
    }

    fn inverse_permute_into(&self, src: &[f64], dst: &mut [f64]) {
        for (i, &p) in self.inverse.iter().enumerate() {
            dst[i] = src[p];
        }
    }
}

/// Runs `y <- alpha*A*x + beta*y` over a set of per-partition CSX images,
/// optionally through a permutation (spec.md §4.6).
pub struct Executor {
    pub images: Vec<CsxImage>,
    pub permutation: Option<Permutation>,
}

impl Executor {
    pub fn new(images: Vec<CsxImage>, permutation: Option<Permutation>) -> Self {
        Self { images, permutation }
    }

    pub fn nrows(&self) -> usize {
        self.images.iter().map(|img| img.nrows).sum()
    }

    pub fn ncols(&self) -> usize {
        self.images.first().map(|img| img.ncols).unwrap_or(0)
    }

    /// Single-threaded reference path: runs every partition's kernel in
    /// sequence. `WorkerPool`-driven execution (`spmv_pooled`) dispatches
    /// the same per-partition kernels concurrently; both must agree
    /// bit-for-bit since partitions are row-disjoint (spec.md §8).
    pub fn spmv(&self, alpha: f64, x: &[f64], beta: f64, y: &mut [f64]) -> CsxResult<()> {
        self.validate(x, y)?;

        match &self.permutation {
            Some(p) => {
                let mut x_buf = vec![0.0; x.len()];
                p.permute_into(x, &mut x_buf);
                let mut y_buf = vec![0.0; y.len()];
                p.permute_into(y, &mut y_buf);

                for image in &self.images {
                    PartitionKernel::new(image).spmv(alpha, &x_buf, beta, &mut y_buf);
                }

                p.inverse_permute_into(&y_buf, y);
            }
            None => {
                for image in &self.images {
                    PartitionKernel::new(image).spmv(alpha, x, beta, y);
                }
            }
        }
        Ok(())
    }

    /// Same contract as `spmv`, but each partition's kernel runs on its
    /// own pooled worker, synchronised by the pool's two barriers (spec.md
    /// §5's "Execution concurrency").
    pub fn spmv_pooled(&self, pool: &pool::WorkerPool, alpha: f64, x: &[f64], beta: f64, y: &mut [f64]) -> CsxResult<()> {
        self.validate(x, y)?;
        if pool.nr_workers() != self.images.len() {
            return Err(CsxError::TunedMatrixInvalid(format!(
                "pool has {} workers but {} partitions were tuned",
                pool.nr_workers(),
                self.images.len()
            )));
        }

        match &self.permutation {
            Some(p) => {
                let mut x_buf = vec![0.0; x.len()];
                p.permute_into(x, &mut x_buf);
                let mut y_buf = vec![0.0; y.len()];
                p.permute_into(y, &mut y_buf);

                // SAFETY: partitions are row-disjoint; each worker only
                // touches `y_buf[image.row_start .. row_start + nrows]`.
                let y_ptr = SendPtr(y_buf.as_mut_ptr());
                let x_ptr = SendPtr(x_buf.as_ptr() as *mut f64);
                let len = y_buf.len();
                let x_len = x_buf.len();

                pool.run_round(|idx| {
                    let image = &self.images[idx];
                    let nrows_total = len;
                    let x_ptr = x_ptr;
                    let y_ptr = y_ptr;
                    let x_len = x_len;
                    let image_ptr = SendImagePtr(image as *const CsxImage);
                    Box::new(move || {
                        let x_slice = unsafe { std::slice::from_raw_parts(x_ptr.get() as *const f64, x_len) };
                        let y_slice = unsafe { std::slice::from_raw_parts_mut(y_ptr.get(), nrows_total) };
                        let image = unsafe { &*image_ptr.get() };
                        PartitionKernel::new(image).spmv(alpha, x_slice, beta, y_slice);
                    })
                })?;

                p.inverse_permute_into(&y_buf, y);
            }
            None => {
                // SAFETY: partitions are row-disjoint; each worker only
                // touches `y[image.row_start .. row_start + nrows]`.
                let y_ptr = SendPtr(y.as_mut_ptr());
                let x_ptr = SendPtr(x.as_ptr() as *mut f64);
                let len = y.len();
                let x_len = x.len();

                pool.run_round(|idx| {
                    let image = &self.images[idx];
                    let nrows_total = len;
                    let x_ptr = x_ptr;
                    let y_ptr = y_ptr;
                    let x_len = x_len;
                    let image_ptr = SendImagePtr(image as *const CsxImage);
                    Box::new(move || {
                        let x_slice = unsafe { std::slice::from_raw_parts(x_ptr.get() as *const f64, x_len) };
                        let y_slice = unsafe { std::slice::from_raw_parts_mut(y_ptr.get(), nrows_total) };
                        let image = unsafe { &*image_ptr.get() };
                        PartitionKernel::new(image).spmv(alpha, x_slice, beta, y_slice);
                    })
                })?;
            }
        }
        Ok(())
    }

    fn validate(&self, x: &[f64], y: &[f64]) -> CsxResult<()> {
        let ncols = self.ncols();
        let nrows = self.nrows();
        if x.len() != ncols {
            return Err(CsxError::VectorDimMismatch {
                expected: ncols,
                actual: x.len(),
            });
        }
        if y.len() != nrows {
            return Err(CsxError::VectorDimMismatch {
                expected: nrows,
                actual: y.len(),
            });
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
struct SendPtr(*mut f64);
unsafe impl Send for SendPtr {}

impl SendPtr {
    fn get(self) -> *mut f64 {
        self.0
    }
}

#[derive(Clone, Copy)]
struct SendImagePtr(*const CsxImage);
unsafe impl Send for SendImagePtr {}

impl SendImagePtr {
    fn get(self) -> *const CsxImage {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::csx::writer::build_image;
    use crate::encode::encode_partition;
    use crate::ir::IrPartition;
    use crate::matrix::builder::MatrixBuilder;

    fn identity_executor() -> Executor {
        let mut b = MatrixBuilder::new(3, 3);
        b.push(0, 0, 1.0).unwrap();
        b.push(1, 1, 1.0).unwrap();
        b.push(2, 2, 1.0).unwrap();
        let csr = b.build().unwrap();
        let part = IrPartition::from_csr_rows(&csr, 0, 3);
        let cfg = RuntimeConfig::default();
        let encoded = encode_partition(&part, &cfg);
        let image = build_image(&encoded, &cfg).unwrap();
        Executor::new(vec![image], None)
    }

    #[test]
    fn identity_scenario_matches_spec_example() {
        let exec = identity_executor();
        let mut y = vec![1.0, 1.0, 1.0];
        exec.spmv(2.0, &[1.0, 2.0, 3.0], 3.0, &mut y).unwrap();
        assert_eq!(y, vec![5.0, 7.0, 9.0]);
    }

    #[test]
    fn permutation_cancels_round_trip() {
        // A_p = P A0 P^T for an identity A0 is identity again (conjugating
        // the identity by any permutation leaves it unchanged); what this
        // exercises is that the surrounding permute/inverse-permute pair
        // in `spmv` cancels exactly, per spec.md §8 scenario 5.
        let mut b = MatrixBuilder::new(4, 4);
        for i in 0..4 {
            b.push(i, i, 1.0).unwrap();
        }
        let p = [3usize, 1, 0, 2];
        let csr = b.build().unwrap();
        let part = IrPartition::from_csr_rows(&csr, 0, 4);
        let cfg = RuntimeConfig::default();
        let encoded = encode_partition(&part, &cfg);
        let image = build_image(&encoded, &cfg).unwrap();
        let perm = Permutation::new(p.to_vec());
        let exec = Executor::new(vec![image], Some(perm));

        let mut y = vec![0.0; 4];
        exec.spmv(1.0, &[10.0, 20.0, 30.0, 40.0], 0.0, &mut y).unwrap();
        assert_eq!(y, vec![10.0, 20.0, 30.0, 40.0]);
    }
}
