// Copyright (C) 2016-2018  ERGO-Code
//
// Factorization driver.
//
// build() produces PBQ = LU for the basis selected by basic_index. The
// inverse pivot sequence is accumulated in three parallel arrays: for
// pivot k, u_pivot_index[k] is its row, u_pivot_value[k] its value and
// permute[k] the basis position it came from. The lower factor is
// composed columnwise in l_index, l_value without the unit diagonal; the
// upper factor columnwise in u_index, u_value without the pivot. Row-wise
// mirrors of both factors are assembled by build_finish() once the pivot
// sequence is complete.
//
// The factorization runs in three phases:
//
//  1. build_simple() pivots the triangular prefix: slack columns and
//     columns with a single entry in an unpivoted row, repeated in waves.
//  2. build_kernel() factors the remaining kernel by Markowitz-threshold
//     pivoting (see kernel.rs).
//  3. When pivoting stalls, the rank-deficiency handler substitutes slack
//     pivots on the leftover rows (see deficiency.rs).
//
// After build, basic_index is permuted so that basic_index[row] is the
// variable whose column pivots on that row; right-hand sides and
// solutions of ftran/btran are indexed accordingly.

use std::time::Instant;

use crate::consts::*;
use crate::factor::{Factor, FactorError};

impl Factor {
    /// Factorize the current basis. Returns the rank deficiency (0 on
    /// full rank). When `refactor_info.use_refactor` is set, a replay of
    /// the recorded pivot sequence is attempted first and a full build
    /// runs only if the replay fails.
    pub fn build(&mut self) -> Result<Int, FactorError> {
        if !self.a_matrix_valid {
            return Err(FactorError::InvalidMatrix);
        }
        let tic = Instant::now();

        if self.refactor_info.use_refactor && self.rebuild().is_ok() {
            log::debug!(
                "build: replayed {} pivots in {:.3}s",
                self.num_row,
                tic.elapsed().as_secs_f64()
            );
            return Ok(0);
        }

        self.lu_clear();
        let queue = self.build_simple();
        self.kernel_setup(&queue);
        self.build_kernel(queue.len() as Int, tic)?;

        let num_pivot = self.u_pivot_index.len() as Int;
        if num_pivot < self.num_row || num_pivot < self.num_basic {
            self.build_handle_rank_deficiency();
        } else {
            self.rank_deficiency = 0;
            self.row_with_no_pivot.clear();
            self.col_with_no_pivot.clear();
            self.var_with_no_pivot.clear();
        }
        self.build_finish();

        log::debug!(
            "build: {} simple + {} kernel pivots, rank deficiency {}, {:.3}s",
            self.num_simple_pivot,
            self.num_kernel_pivot,
            self.rank_deficiency,
            tic.elapsed().as_secs_f64()
        );
        if self.debug_level > 0 {
            log::debug!(
                "{}",
                self.report_lu(ReportLuPart::Both, self.debug_level > 1)
            );
        }
        Ok(self.rank_deficiency)
    }

    /// Reset all factor storage for a new factorization.
    pub(crate) fn lu_clear(&mut self) {
        self.l_start.clear();
        self.l_start.push(0);
        self.l_index.clear();
        self.l_value.clear();
        self.l_pivot_index.clear();
        self.lr_start.clear();
        self.lr_index.clear();
        self.lr_value.clear();

        self.u_pivot_index.clear();
        self.u_pivot_value.clear();
        self.u_start.clear();
        self.u_last_p.clear();
        self.u_index.clear();
        self.u_value.clear();
        self.ur_start.clear();
        self.ur_lastp.clear();
        self.ur_space.clear();
        self.ur_index.clear();
        self.ur_value.clear();

        self.pf_pivot_index.clear();
        self.pf_pivot_value.clear();
        self.pf_start.clear();
        self.pf_start.push(0);
        self.pf_index.clear();
        self.pf_value.clear();

        self.permute.clear();
        self.l_pivot_lookup.fill(-1);
        self.u_pivot_lookup.fill(-1);
        self.mr_count_before.fill(0);

        self.refactor_info.use_refactor = false;
        self.refactor_info.pivot_row.clear();
        self.refactor_info.pivot_type.clear();

        self.rank_deficiency = 0;
        self.row_with_no_pivot.clear();
        self.col_with_no_pivot.clear();
        self.var_with_no_pivot.clear();
        self.num_simple_pivot = 0;
        self.num_kernel_pivot = 0;
        self.factor_valid = false;
        self.num_update = 0;
    }

    /// Record pivot k once its L and U entries have been pushed.
    /// `u_col_start` is the offset of the first U entry of this pivot.
    pub(crate) fn finish_pivot(
        &mut self,
        basis_pos: Int,
        irow: Int,
        pivot_value: f64,
        pivot_type: PivotType,
        u_col_start: Int,
    ) {
        self.l_start.push(self.l_index.len() as Int);
        self.u_start.push(u_col_start);
        self.u_last_p.push(self.u_index.len() as Int);
        self.u_pivot_index.push(irow);
        self.u_pivot_value.push(pivot_value);
        self.permute.push(basis_pos);
        self.refactor_info.pivot_row.push(irow);
        self.refactor_info.pivot_type.push(pivot_type);
        self.mr_count_before[irow as usize] = -1;
    }

    /// Extract the triangular prefix. Slack columns pivot immediately on
    /// their row; a structural column with a single A-matrix nonzero on a
    /// free row pivots as a singleton. The remaining columns are copied
    /// into the b-store and swept in waves: a column left with exactly
    /// one entry in an unpivoted row pivots on that entry, its entries in
    /// pivoted rows becoming its U column. Survivors are returned as
    /// (basis position, b-column) pairs for the kernel.
    pub(crate) fn build_simple(&mut self) -> Vec<(Int, Int)> {
        let m = self.num_row;
        let nb = self.num_basic;
        let min_pivot = self.pivot_tolerance.max(TINY_VALUE);

        self.b_var.clear();
        self.b_start.clear();
        self.b_start.push(0);
        self.b_index.clear();
        self.b_value.clear();
        let mut queue: Vec<(Int, Int)> = Vec::new();

        for ik in 0..nb {
            let ivar = self.basic_index[ik as usize];
            if ivar >= self.num_col {
                let irow = ivar - self.num_col;
                assert!(irow < m, "basic index {} out of range", ivar);
                if self.mr_count_before[irow as usize] >= 0 {
                    let us = self.u_index.len() as Int;
                    self.finish_pivot(ik, irow, 1.0, PivotType::Logical, us);
                    continue;
                }
                // duplicated slack; keep it as a (dead) kernel column
                self.b_var.push(ivar);
                self.b_index.push(irow);
                self.b_value.push(1.0);
            } else {
                let start = self.a_start[ivar as usize];
                let end = self.a_start[ivar as usize + 1];
                if end - start == 1 {
                    let irow = self.a_index[start as usize];
                    let value = self.a_value[start as usize];
                    assert!(irow >= 0 && irow < m);
                    if self.mr_count_before[irow as usize] >= 0 && value.abs() >= min_pivot {
                        let us = self.u_index.len() as Int;
                        self.finish_pivot(ik, irow, value, PivotType::ColSingleton, us);
                        continue;
                    }
                }
                self.b_var.push(ivar);
                for pos in start..end {
                    let irow = self.a_index[pos as usize];
                    assert!(irow >= 0 && irow < m);
                    self.b_index.push(irow);
                    self.b_value.push(self.a_value[pos as usize]);
                }
            }
            self.b_start.push(self.b_index.len() as Int);
            queue.push((ik, self.b_var.len() as Int - 1));
        }

        // Singleton waves over the copied columns.
        loop {
            let mut progressed = false;
            let mut keep: Vec<(Int, Int)> = Vec::with_capacity(queue.len());
            for &(ik, bcol) in &queue {
                let start = self.b_start[bcol as usize] as usize;
                let end = self.b_start[bcol as usize + 1] as usize;
                let mut live = 0;
                let mut pivot_row = -1;
                let mut pivot_value = 0.0;
                for pos in start..end {
                    let irow = self.b_index[pos];
                    if self.mr_count_before[irow as usize] >= 0 {
                        live += 1;
                        pivot_row = irow;
                        pivot_value = self.b_value[pos];
                    }
                }
                if live == 1 && pivot_value.abs() >= min_pivot {
                    let us = self.u_index.len() as Int;
                    for pos in start..end {
                        let irow = self.b_index[pos];
                        if self.mr_count_before[irow as usize] < 0 {
                            self.u_index.push(irow);
                            self.u_value.push(self.b_value[pos]);
                        }
                    }
                    self.finish_pivot(ik, pivot_row, pivot_value, PivotType::ColSingleton, us);
                    progressed = true;
                } else {
                    keep.push((ik, bcol));
                }
            }
            queue = keep;
            if !progressed || queue.is_empty() {
                break;
            }
        }

        self.num_simple_pivot = self.u_pivot_index.len() as Int;
        queue
    }

    /// Assemble the solve-side structures once the pivot sequence is
    /// complete: pivot lookups, the row-wise mirrors of L and U (the
    /// latter with spare space per row for the Forrest-Tomlin update),
    /// and the basic_index permutation.
    pub(crate) fn build_finish(&mut self) {
        let kk = self.u_pivot_index.len();
        let m = self.num_row as usize;

        self.l_pivot_index.clear();
        self.l_pivot_index.extend_from_slice(&self.u_pivot_index);
        self.l_pivot_lookup.fill(-1);
        self.u_pivot_lookup.fill(-1);
        for k in 0..kk {
            let irow = self.u_pivot_index[k];
            debug_assert!(irow >= 0);
            self.l_pivot_lookup[irow as usize] = k as Int;
            self.u_pivot_lookup[irow as usize] = k as Int;
        }

        // Permute basic_index into pivot-row order. Afterwards position
        // and pivot row coincide, so permute resets to the identity.
        if self.num_basic == self.num_row && kk == m {
            for k in 0..kk {
                self.iwork[self.u_pivot_index[k] as usize] =
                    self.basic_index[self.permute[k] as usize];
            }
            for i in 0..m {
                self.basic_index[i] = self.iwork[i];
            }
            for k in 0..kk {
                self.permute[k] = self.u_pivot_index[k];
            }
        }

        // Row-wise L. Entry (i, v) of column j scatters value v into the
        // row of i, recorded under the x-position of pivot j.
        let lnz = self.l_index.len();
        self.lr_start.clear();
        self.lr_start.resize(kk + 1, 0);
        for pos in 0..lnz {
            let b = self.l_pivot_lookup[self.l_index[pos] as usize];
            self.lr_start[b as usize + 1] += 1;
        }
        for k in 0..kk {
            self.lr_start[k + 1] += self.lr_start[k];
        }
        self.lr_index.clear();
        self.lr_index.resize(lnz, 0);
        self.lr_value.clear();
        self.lr_value.resize(lnz, 0.0);
        for k in 0..kk {
            self.iwork[k] = self.lr_start[k];
        }
        for j in 0..kk {
            let xpos = self.l_pivot_index[j];
            for pos in self.l_start[j] as usize..self.l_start[j + 1] as usize {
                let b = self.l_pivot_lookup[self.l_index[pos] as usize] as usize;
                let put = self.iwork[b] as usize;
                self.lr_index[put] = xpos;
                self.lr_value[put] = self.l_value[pos];
                self.iwork[b] += 1;
            }
        }

        // Row-wise U with spare space per row.
        self.ur_start.clear();
        self.ur_start.resize(kk, 0);
        self.ur_lastp.clear();
        self.ur_lastp.resize(kk, 0);
        self.ur_space.clear();
        self.ur_space.resize(kk, 0);
        for k in 0..kk {
            self.iwork[k] = 0;
        }
        for k in 0..kk {
            for pos in self.u_start[k] as usize..self.u_last_p[k] as usize {
                let b = self.u_pivot_lookup[self.u_index[pos] as usize];
                self.iwork[b as usize] += 1;
            }
        }
        let mut put: Int = 0;
        for k in 0..kk {
            let count = self.iwork[k];
            self.ur_start[k] = put;
            self.ur_lastp[k] = put;
            self.ur_space[k] = count + 4;
            put += count + 4;
        }
        self.ur_index.clear();
        self.ur_index.resize(put as usize, 0);
        self.ur_value.clear();
        self.ur_value.resize(put as usize, 0.0);
        for k in 0..kk {
            let xrow = self.u_pivot_index[k];
            for pos in self.u_start[k] as usize..self.u_last_p[k] as usize {
                let b = self.u_pivot_lookup[self.u_index[pos] as usize] as usize;
                let slot = self.ur_lastp[b] as usize;
                self.ur_index[slot] = xrow;
                self.ur_value[slot] = self.u_value[pos];
                self.ur_lastp[b] += 1;
            }
        }

        self.u_total_x = (self.u_index.len() + kk) as Int;
        self.u_merit_x = self.u_total_x;
        self.factor_valid = true;
        self.num_update = 0;
    }

    /// Extend the factorization for `ar_start.len() - 1` new rows whose
    /// slacks are basic. For each new row, a partial solve with U yields
    /// its L row; a unit slack pivot is appended. Requires a valid
    /// factorization with no pending updates.
    pub fn add_rows(&mut self, ar_start: &[Int], ar_index: &[Int], ar_value: &[f64]) {
        assert!(self.factor_valid, "add_rows requires a factorized basis");
        assert_eq!(self.num_update, 0, "add_rows with pending updates");
        assert_eq!(self.num_basic, self.num_row);
        let num_new_row = ar_start.len() as Int - 1;
        assert!(num_new_row >= 0);
        let old_m = self.num_row as usize;
        let old_k = self.u_pivot_index.len();

        // Structural variable -> pivot row of its basis column.
        let mut var_row: Vec<Int> = vec![-1; self.num_col as usize];
        for (row, &var) in self.basic_index.iter().enumerate() {
            if var < self.num_col {
                var_row[var as usize] = row as Int;
            }
        }

        // New L entries per existing pivot column.
        let mut col_extra: Vec<Vec<(Int, f64)>> = vec![Vec::new(); old_k];
        let mut w = vec![0.0f64; old_m];
        for r in 0..num_new_row as usize {
            for pos in ar_start[r] as usize..ar_start[r + 1] as usize {
                let jcol = ar_index[pos];
                assert!(jcol >= 0 && jcol < self.num_col);
                let row = var_row[jcol as usize];
                if row >= 0 {
                    w[row as usize] = ar_value[pos];
                }
            }
            // Solve z U = w by forward substitution over the pivot order.
            for k in 0..old_k {
                let p = self.u_pivot_index[k] as usize;
                let mut x = w[p];
                for pos in self.u_start[k] as usize..self.u_last_p[k] as usize {
                    x -= w[self.u_index[pos] as usize] * self.u_value[pos];
                }
                w[p] = x / self.u_pivot_value[k];
            }
            for (i, wi) in w.iter_mut().enumerate() {
                if wi.abs() >= TINY_VALUE {
                    let k = self.u_pivot_lookup[i] as usize;
                    col_extra[k].push(((old_m + r) as Int, *wi));
                }
                *wi = 0.0;
            }
        }

        // Rebuild L columnwise with the extension entries.
        let mut l_start = Vec::with_capacity(old_k + num_new_row as usize + 1);
        let mut l_index = Vec::with_capacity(self.l_index.len());
        let mut l_value = Vec::with_capacity(self.l_value.len());
        l_start.push(0 as Int);
        for k in 0..old_k {
            for pos in self.l_start[k] as usize..self.l_start[k + 1] as usize {
                l_index.push(self.l_index[pos]);
                l_value.push(self.l_value[pos]);
            }
            for &(i, v) in &col_extra[k] {
                l_index.push(i);
                l_value.push(v);
            }
            l_start.push(l_index.len() as Int);
        }
        self.l_start = l_start;
        self.l_index = l_index;
        self.l_value = l_value;

        // Append the slack pivots and grow the row-indexed arrays.
        let new_m = old_m + num_new_row as usize;
        self.l_pivot_lookup.resize(new_m, -1);
        self.u_pivot_lookup.resize(new_m, -1);
        self.mr_start.resize(new_m, 0);
        self.mr_count.resize(new_m, 0);
        self.mr_space.resize(new_m, 0);
        self.mr_count_before.resize(new_m, 0);
        self.mwz_column_index.resize(new_m, 0);
        self.mwz_column_mark.resize(new_m, 0);
        self.mwz_column_array.resize(new_m, 0.0);
        self.row_link_next.resize(new_m, -1);
        self.row_link_last.resize(new_m, -1);
        self.col_link_first.resize(new_m + 2, -1);
        self.dwork.resize(new_m, 0.0);
        let iwork_len = 2 * new_m.max(self.num_basic as usize + num_new_row as usize) + 2;
        if self.iwork.len() < iwork_len {
            self.iwork.resize(iwork_len, 0);
        }
        // The column side gains one basic slack per new row.
        let new_nb = self.num_basic as usize + num_new_row as usize;
        self.mc_var.resize(new_nb, -1);
        self.mc_start.resize(new_nb, 0);
        self.mc_count_a.resize(new_nb, 0);
        self.mc_count_n.resize(new_nb, 0);
        self.mc_space.resize(new_nb, 0);
        self.mc_min_pivot.resize(new_nb, 0.0);
        self.mc_index.clear();
        self.mc_value.clear();
        self.col_link_next.resize(new_nb, -1);
        self.col_link_last.resize(new_nb, -1);
        self.row_link_first.resize(new_nb + 2, -1);

        for r in 0..num_new_row as usize {
            let irow = (old_m + r) as Int;
            let us = self.u_index.len() as Int;
            self.l_start.push(self.l_index.len() as Int);
            self.u_start.push(us);
            self.u_last_p.push(us);
            self.u_pivot_index.push(irow);
            self.u_pivot_value.push(1.0);
            self.permute.push(irow);
            self.refactor_info.pivot_row.push(irow);
            self.refactor_info.pivot_type.push(PivotType::Logical);
            self.basic_index.push(self.num_col + irow);
        }
        self.num_row += num_new_row;
        self.num_basic += num_new_row;

        self.build_finish();
        // The constraint matrix view no longer matches: existing columns
        // gained entries in the new rows.
        self.invalid_a_matrix_action();
        log::debug!("add_rows: {} rows appended", num_new_row);
    }
}
