//! Structural edits around a live factorization: column additions and
//! deletions shift slack identifiers without touching L and U; row
//! additions extend the factors in place.

mod common;

use bfactor::{Factor, FactorError, Int};
use common::*;

#[test]
fn add_cols_shifts_slack_identifiers() {
    let cols = vec![vec![(0, 2.0), (1, 1.0)], vec![(0, 1.0), (1, 3.0)]];
    let (a_start, a_index, a_value) = csc(2, &cols);
    let mut factor = Factor::new();
    // Basis of two slacks (vars 2 and 3).
    factor.setup(2, 2, &a_start, &a_index, &a_value, &[2, 3], 0.1, 1e-10, 0);
    assert_eq!(factor.build().unwrap(), 0);

    factor.add_cols(3);
    assert_eq!(factor.num_col(), 5);
    assert_eq!(factor.basic_index(), &[5, 6]);
    // L and U survive the edit.
    let x = ftran_dense(&factor, &[4.0, -2.0], 1.0);
    assert_close(&x, &[4.0, -2.0], 1e-12);

    // Building needs the refreshed matrix view.
    assert_eq!(factor.build(), Err(FactorError::InvalidMatrix));
    let mut wide = cols.clone();
    wide.push(vec![(0, 1.0)]);
    wide.push(vec![(1, 1.0)]);
    wide.push(vec![]);
    let (a_start, a_index, a_value) = csc(2, &wide);
    factor.setup_matrix(&a_start, &a_index, &a_value);
    assert_eq!(factor.build().unwrap(), 0);
}

#[test]
fn delete_nonbasic_cols_shifts_slack_identifiers() {
    let cols = vec![vec![(0, 2.0), (1, 1.0)], vec![(0, 1.0), (1, 3.0)]];
    let (a_start, a_index, a_value) = csc(2, &cols);
    let mut factor = Factor::new();
    // Basic: structural column 0 and the slack of row 1 (var 3).
    factor.setup(2, 2, &a_start, &a_index, &a_value, &[0, 3], 0.1, 1e-10, 0);
    assert_eq!(factor.build().unwrap(), 0);

    // Deleting the trailing nonbasic column renumbers the slacks.
    factor.delete_nonbasic_cols(1);
    assert_eq!(factor.num_col(), 1);
    let mut vars: Vec<Int> = factor.basic_index().to_vec();
    vars.sort_unstable();
    assert_eq!(vars, vec![0, 2]);

    let narrow = vec![cols[0].clone()];
    let (a_start, a_index, a_value) = csc(2, &narrow);
    factor.setup_matrix(&a_start, &a_index, &a_value);
    assert_eq!(factor.build().unwrap(), 0);
}

#[test]
#[should_panic(expected = "is basic")]
fn delete_of_basic_column_is_a_contract_violation() {
    let cols = vec![vec![(0, 2.0), (1, 1.0)], vec![(0, 1.0), (1, 3.0)]];
    let (a_start, a_index, a_value) = csc(2, &cols);
    let mut factor = Factor::new();
    factor.setup(2, 2, &a_start, &a_index, &a_value, &[0, 1], 0.1, 1e-10, 0);
    factor.delete_nonbasic_cols(1);
}

#[test]
fn add_rows_extends_the_factorization() {
    let cols = vec![
        vec![(0, 2.0), (1, 1.0)],
        vec![(0, 1.0), (1, 3.0), (2, 1.0)],
        vec![(1, 1.0), (2, 4.0)],
    ];
    let (a_start, a_index, a_value) = csc(3, &cols);
    let mut factor = Factor::new();
    factor.setup(3, 3, &a_start, &a_index, &a_value, &[0, 1, 2], 0.1, 1e-10, 0);
    assert_eq!(factor.build().unwrap(), 0);

    // Two new rows crossing the basic columns; their slacks enter the
    // basis.
    let ar = vec![vec![(0, 1.0), (2, 2.0)], vec![(1, 1.0), (2, 1.0)]];
    // Row-wise storage: row r lists (col, value).
    let mut ar_start = vec![0 as Int];
    let mut ar_index = Vec::new();
    let mut ar_value = Vec::new();
    for row in &ar {
        for &(j, x) in row {
            ar_index.push(j as Int);
            ar_value.push(x);
        }
        ar_start.push(ar_index.len() as Int);
    }
    factor.add_rows(&ar_start, &ar_index, &ar_value);
    assert_eq!(factor.num_row(), 5);
    assert_eq!(factor.basic_index()[3], 3 + 3);
    assert_eq!(factor.basic_index()[4], 3 + 4);

    // The extended factorization must solve the extended basis. The A
    // view is stale after the edit, so build the reference by hand:
    // B_new = [[B, 0], [A_r, I]].
    let mut b_mat = vec![vec![0.0; 5]; 5];
    for (k, &var) in factor.basic_index()[..3].iter().enumerate() {
        for pos in a_start[var as usize] as usize..a_start[var as usize + 1] as usize {
            b_mat[a_index[pos] as usize][k] += a_value[pos];
        }
        // New-row entries of the old basic columns.
        for (r, row) in ar.iter().enumerate() {
            for &(j, x) in row {
                if j as Int == var {
                    b_mat[3 + r][k] += x;
                }
            }
        }
    }
    b_mat[3][3] = 1.0;
    b_mat[4][4] = 1.0;

    let b = vec![1.0, 2.0, 3.0, 4.0, 5.0];
    let want = dense_solve(&b_mat, &b);
    assert_close(&ftran_dense(&factor, &b, 1.0), &want, 1e-9);
}
