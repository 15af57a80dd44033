//! End-to-end scenarios, one per spec.md §8's "Concrete end-to-end scenarios".

use csx_core::config::RuntimeConfig;
use csx_core::error::CsxError;
use csx_core::exec::Permutation;
use csx_core::matrix::builder::MatrixBuilder;
use csx_core::matrix::csr::CsrMatrix;

fn tune(csr: &CsrMatrix, cfg: &RuntimeConfig) -> csx_core::TunedMatrix {
    csx_core::tune(csr, cfg, None).expect("tune should succeed on a well-formed matrix")
}

#[test]
fn empty_matrix_tunes_to_p_empty_partitions_and_noop_spmv() {
    let csr = MatrixBuilder::new(0, 0).build().unwrap();
    let mut cfg = RuntimeConfig::default();
    cfg.nr_threads = 3;

    let tuned = tune(&csr, &cfg);
    assert_eq!(tuned.nrows(), 0);

    let mut y: Vec<f64> = vec![];
    tuned.spmv(1.0, &[], 0.0, &mut y).unwrap();
    assert!(y.is_empty());

    assert!(csr.check_invariants().is_ok());
}

#[test]
fn identity_3x3_matches_spec_example() {
    let mut b = MatrixBuilder::new(3, 3);
    for i in 0..3 {
        b.push(i, i, 1.0).unwrap();
    }
    let csr = b.build().unwrap();
    let cfg = RuntimeConfig::default();
    let tuned = tune(&csr, &cfg);

    let mut y = vec![1.0, 1.0, 1.0];
    tuned.spmv(2.0, &[1.0, 2.0, 3.0], 3.0, &mut y).unwrap();
    assert_eq!(y, vec![5.0, 7.0, 9.0]);
}

#[test]
fn horizontal_run_1x8_is_encoded_as_one_pattern_record() {
    let mut b = MatrixBuilder::new(1, 8);
    for c in 0..8 {
        b.push(c, 0, 1.0).unwrap();
    }
    let csr = b.build().unwrap();
    let cfg = RuntimeConfig::default();
    let tuned = tune(&csr, &cfg);

    let mut y = vec![0.0];
    tuned.spmv(1.0, &[1.0; 8], 0.0, &mut y).unwrap();
    assert_eq!(y, vec![8.0]);

    let image = tuned.to_image(&cfg);
    assert_eq!(image.images.len(), 1);
    assert_eq!(image.images[0].id_map.ids.len(), 1);
}

#[test]
fn block_row_2_10x10_is_encoded_as_one_block_record() {
    let mut b = MatrixBuilder::new(10, 10);
    for row in 0..2 {
        for col in 0..4 {
            b.push(col, row, 1.0).unwrap();
        }
    }
    let csr = b.build().unwrap();
    let mut cfg = RuntimeConfig::default();
    cfg.split_blocks = true;
    cfg.min_coverage = 0.1;
    cfg.min_unit_size = 2;

    let tuned = tune(&csr, &cfg);
    let image = tuned.to_image(&cfg);
    let partition = &image.images[0];

    // One record covering all 8 non-zeros, rather than two horizontal
    // records of size 4.
    assert_eq!(partition.nnz, 8);
    assert_eq!(partition.id_map.ids.len(), 1);

    let mut x = vec![0.0; 10];
    for c in 0..4 {
        x[c] = 1.0;
    }
    let mut y = vec![0.0; 10];
    tuned.spmv(1.0, &x, 0.0, &mut y).unwrap();
    assert_eq!(y[0], 4.0);
    assert_eq!(y[1], 4.0);
}

#[test]
fn permuted_identity_4x4_round_trips_through_permutation() {
    let mut b = MatrixBuilder::new(4, 4);
    for i in 0..4 {
        b.push(i, i, 1.0).unwrap();
    }
    let csr = b.build().unwrap();
    let cfg = RuntimeConfig::default();
    let perm = Permutation::new(vec![3, 1, 0, 2]);
    let tuned = csx_core::tune(&csr, &cfg, Some(perm)).unwrap();

    let mut y = vec![0.0; 4];
    tuned.spmv(1.0, &[10.0, 20.0, 30.0, 40.0], 0.0, &mut y).unwrap();
    assert_eq!(y, vec![10.0, 20.0, 30.0, 40.0]);
}

#[test]
fn save_restore_round_trip_matches_direct_spmv() {
    let mut b = MatrixBuilder::new(5, 5);
    for i in 0..5 {
        b.push(i, i, (i + 1) as f64).unwrap();
    }
    let csr = b.build().unwrap();
    let cfg = RuntimeConfig::default();
    let tuned = tune(&csr, &cfg);

    let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
    let mut y_direct = vec![0.0; 5];
    tuned.spmv(1.0, &x, 0.0, &mut y_direct).unwrap();

    let image = tuned.to_image(&cfg);
    let mut buf = Vec::new();
    csx_core::save::save(&mut buf, &image).unwrap();
    let restored = csx_core::save::restore(&buf[..]).unwrap();
    let restored_tuned = csx_core::TunedMatrix::from_image(restored, 1, &[]);

    let mut y_restored = vec![0.0; 5];
    restored_tuned.spmv(1.0, &x, 0.0, &mut y_restored).unwrap();

    assert_eq!(y_direct, y_restored);
}

#[test]
fn spmv_result_is_independent_of_partition_count() {
    let mut b = MatrixBuilder::new(20, 20);
    for row in 0..20 {
        for col in [row, (row + 1) % 20, (row + 5) % 20] {
            b.push(col, row, (row * 3 + col) as f64 % 7.0 + 1.0).unwrap();
        }
    }
    let csr = b.build().unwrap();
    let x: Vec<f64> = (0..20).map(|i| i as f64 * 0.5).collect();

    let mut y1 = vec![0.0; 20];
    let mut cfg1 = RuntimeConfig::default();
    cfg1.nr_threads = 1;
    tune(&csr, &cfg1).spmv(1.0, &x, 0.0, &mut y1).unwrap();

    let mut y4 = vec![0.0; 20];
    let mut cfg4 = RuntimeConfig::default();
    cfg4.nr_threads = 4;
    tune(&csr, &cfg4).spmv(1.0, &x, 0.0, &mut y4).unwrap();

    for (a, b) in y1.iter().zip(&y4) {
        assert!((a - b).abs() < 1e-9);
    }
}

#[test]
fn vector_dimension_mismatch_is_reported() {
    let mut b = MatrixBuilder::new(2, 2);
    b.push(0, 0, 1.0).unwrap();
    let csr = b.build().unwrap();
    let cfg = RuntimeConfig::default();
    let tuned = tune(&csr, &cfg);

    let mut y = vec![0.0; 2];
    let err = tuned.spmv(1.0, &[1.0, 2.0, 3.0], 0.0, &mut y).unwrap_err();
    assert!(matches!(err, CsxError::VectorDimMismatch { .. }));
}
