//! Shared helpers for the integration tests: dense reference solves and
//! conversions between dense matrices and the column-compressed form the
//! engine consumes.
#![allow(dead_code)]

use bfactor::{Factor, HVector, Int};

/// Column-compressed arrays from a dense column-major description:
/// `cols[j]` lists the (row, value) pairs of column j.
pub fn csc(num_row: usize, cols: &[Vec<(usize, f64)>]) -> (Vec<Int>, Vec<Int>, Vec<f64>) {
    let mut a_start = Vec::with_capacity(cols.len() + 1);
    let mut a_index = Vec::new();
    let mut a_value = Vec::new();
    a_start.push(0 as Int);
    for col in cols {
        for &(i, x) in col {
            assert!(i < num_row);
            a_index.push(i as Int);
            a_value.push(x);
        }
        a_start.push(a_index.len() as Int);
    }
    (a_start, a_index, a_value)
}

/// The dense basis matrix in the engine's row convention: column `k` is
/// the column of the variable basic at row `k`.
pub fn dense_basis(factor: &Factor) -> Vec<Vec<f64>> {
    let m = factor.num_row() as usize;
    let num_col = factor.num_col();
    let a_start = factor.a_start();
    let a_index = factor.a_index();
    let a_value = factor.a_value();
    let mut b = vec![vec![0.0; m]; m];
    for (k, &var) in factor.basic_index().iter().enumerate() {
        if var >= num_col {
            b[(var - num_col) as usize][k] = 1.0;
        } else {
            for pos in a_start[var as usize] as usize..a_start[var as usize + 1] as usize {
                b[a_index[pos] as usize][k] += a_value[pos];
            }
        }
    }
    b
}

/// Dense solve with partial pivoting, for reference results.
pub fn dense_solve(a: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = b.len();
    let mut m: Vec<Vec<f64>> = a.to_vec();
    let mut x = b.to_vec();
    for k in 0..n {
        let mut p = k;
        for i in k + 1..n {
            if m[i][k].abs() > m[p][k].abs() {
                p = i;
            }
        }
        assert!(m[p][k].abs() > 1e-12, "reference matrix is singular");
        m.swap(k, p);
        x.swap(k, p);
        for i in k + 1..n {
            let f = m[i][k] / m[k][k];
            if f == 0.0 {
                continue;
            }
            for j in k..n {
                m[i][j] -= f * m[k][j];
            }
            x[i] -= f * x[k];
        }
    }
    for k in (0..n).rev() {
        for j in k + 1..n {
            x[k] -= m[k][j] * x[j];
        }
        x[k] /= m[k][k];
    }
    x
}

pub fn mat_vec(a: &[Vec<f64>], x: &[f64]) -> Vec<f64> {
    a.iter()
        .map(|row| row.iter().zip(x).map(|(c, v)| c * v).sum())
        .collect()
}

/// Run ftran on a dense right-hand side, returning the dense solution.
pub fn ftran_dense(factor: &Factor, rhs: &[f64], expected_density: f64) -> Vec<f64> {
    let mut v = HVector::new(rhs.len() as Int);
    for (i, &x) in rhs.iter().enumerate() {
        if x != 0.0 {
            v.set(i as Int, x);
        }
    }
    factor.ftran(&mut v, expected_density);
    v.array.clone()
}

pub fn btran_dense(factor: &Factor, rhs: &[f64], expected_density: f64) -> Vec<f64> {
    let mut v = HVector::new(rhs.len() as Int);
    for (i, &x) in rhs.iter().enumerate() {
        if x != 0.0 {
            v.set(i as Int, x);
        }
    }
    factor.btran(&mut v, expected_density);
    v.array.clone()
}

pub fn assert_close(got: &[f64], want: &[f64], tol: f64) {
    assert_eq!(got.len(), want.len());
    for (k, (g, w)) in got.iter().zip(want).enumerate() {
        assert!(
            (g - w).abs() <= tol * (1.0 + w.abs()),
            "component {}: got {}, want {}",
            k,
            g,
            w
        );
    }
}

/// A seeded diagonally dominant sparse test matrix: column j has a strong
/// diagonal plus a few small off-diagonal entries.
pub fn dominant_cols(n: usize, extras: usize, seed: u64) -> Vec<Vec<(usize, f64)>> {
    use rand::{rngs::StdRng, Rng, SeedableRng};
    let mut rng = StdRng::seed_from_u64(seed);
    let mut cols = Vec::with_capacity(n);
    for j in 0..n {
        let mut col = vec![(j, 8.0 + (j % 5) as f64)];
        for _ in 0..extras {
            let i = rng.gen_range(0..n);
            if i != j && !col.iter().any(|&(r, _)| r == i) {
                let v: f64 = rng.gen_range(-1.0..1.0);
                if v.abs() > 1e-3 {
                    col.push((i, v));
                }
            }
        }
        col.sort_by_key(|&(r, _)| r);
        cols.push(col);
    }
    cols
}
