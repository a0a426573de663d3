//! The dense, sparse and hyper-sparse solve kernels are policy choices
//! and must agree with each other, before and after basis updates.

mod common;

use bfactor::{Factor, HVector, Int, UpdateHint};
use common::*;

fn build_factor(n: usize, seed: u64) -> Factor {
    let mut cols = dominant_cols(n, 4, seed);
    for r in 0..4 {
        cols.push(vec![(r, 9.0), ((r + 2) % n, 0.25)]);
    }
    let (a_start, a_index, a_value) = csc(n, &cols);
    let basic: Vec<Int> = (0..n as Int).collect();
    let mut factor = Factor::new();
    factor.setup(
        cols.len() as Int,
        n as Int,
        &a_start,
        &a_index,
        &a_value,
        &basic,
        0.1,
        1e-10,
        0,
    );
    assert_eq!(factor.build().unwrap(), 0);
    factor
}

fn solve_all_paths(factor: &Factor, rhs: &[f64]) -> Vec<Vec<f64>> {
    [1.0, 0.2, 0.01]
        .iter()
        .map(|&d| ftran_dense(factor, rhs, d))
        .collect()
}

#[test]
fn ftran_paths_agree() {
    let n = 24;
    let factor = build_factor(n, 41);
    let mut sparse_rhs = vec![0.0; n];
    sparse_rhs[5] = 1.0;
    for got in solve_all_paths(&factor, &sparse_rhs).windows(2) {
        assert_close(&got[1], &got[0], 1e-11);
    }

    let dense_rhs: Vec<f64> = (0..n).map(|i| 0.1 * i as f64 - 1.0).collect();
    for got in solve_all_paths(&factor, &dense_rhs).windows(2) {
        assert_close(&got[1], &got[0], 1e-11);
    }
}

#[test]
fn btran_paths_agree() {
    let n = 24;
    let factor = build_factor(n, 42);
    let mut sparse_rhs = vec![0.0; n];
    sparse_rhs[17] = -2.0;
    let paths: Vec<Vec<f64>> = [1.0, 0.2, 0.01]
        .iter()
        .map(|&d| btran_dense(&factor, &sparse_rhs, d))
        .collect();
    for got in paths.windows(2) {
        assert_close(&got[1], &got[0], 1e-11);
    }
}

#[test]
fn paths_agree_after_forrest_tomlin_updates() {
    let n = 24;
    let mut factor = build_factor(n, 43);
    let num_structural = (factor.num_col() - 4) as usize;

    for t in 0..4 {
        let irow = t as Int;
        let var_in = (num_structural + t) as Int;
        let m = factor.num_row();
        let mut aq = HVector::new(m);
        for pos in factor.a_start()[var_in as usize] as usize
            ..factor.a_start()[var_in as usize + 1] as usize
        {
            aq.set(factor.a_index()[pos], factor.a_value()[pos]);
        }
        aq.pack_flag = true;
        factor.ftran(&mut aq, 0.5);
        let mut ep = HVector::new(m);
        ep.set(irow, 1.0);
        ep.pack_flag = true;
        factor.btran(&mut ep, 0.5);
        assert_eq!(factor.update(&mut aq, &mut ep, irow), UpdateHint::Fine);
        factor.basic_index_mut()[irow as usize] = var_in;
    }

    let mut sparse_rhs = vec![0.0; n];
    sparse_rhs[1] = 1.0;
    sparse_rhs[9] = -0.5;
    for got in solve_all_paths(&factor, &sparse_rhs).windows(2) {
        assert_close(&got[1], &got[0], 1e-10);
    }
    let paths: Vec<Vec<f64>> = [1.0, 0.2, 0.01]
        .iter()
        .map(|&d| btran_dense(&factor, &sparse_rhs, d))
        .collect();
    for got in paths.windows(2) {
        assert_close(&got[1], &got[0], 1e-10);
    }

    // And against the dense reference.
    let b_mat = dense_basis(&factor);
    let want = dense_solve(&b_mat, &sparse_rhs);
    assert_close(&ftran_dense(&factor, &sparse_rhs, 1.0), &want, 1e-9);
}
