// Copyright (C) 2016-2018  ERGO-Code
//
// Rank deficiency handling.
//
// When kernel pivoting stalls, every remaining active column has no entry
// that passes the pivot tolerance. The leftover rows and basis positions
// are reported, and each singular basic column is replaced by the slack
// column of a free row so that the factorization completes nonsingular.
// The caller is expected to repair its basis from the reported lists.

use crate::consts::*;
use crate::factor::Factor;

impl Factor {
    /// Populate `row_with_no_pivot`, `col_with_no_pivot` and
    /// `var_with_no_pivot`, then substitute slack pivots on the free rows.
    pub(crate) fn build_handle_rank_deficiency(&mut self) {
        let m = self.num_row;
        let nb = self.num_basic;

        self.row_with_no_pivot.clear();
        self.col_with_no_pivot.clear();
        self.var_with_no_pivot.clear();
        for i in 0..m {
            if self.mr_count_before[i as usize] >= 0 {
                self.row_with_no_pivot.push(i);
            }
        }
        for ik in 0..nb as usize {
            self.iwork[ik] = 0;
        }
        for k in 0..self.permute.len() {
            let pos = self.permute[k];
            if pos >= 0 {
                self.iwork[pos as usize] = 1;
            }
        }
        for ik in 0..nb {
            if self.iwork[ik as usize] == 0 {
                self.col_with_no_pivot.push(ik);
                self.var_with_no_pivot.push(self.basic_index[ik as usize]);
            }
        }
        self.rank_deficiency = self
            .row_with_no_pivot
            .len()
            .max(self.col_with_no_pivot.len()) as Int;

        // Substitute a logical column for each deficient position. Extra
        // free rows (rectangular basis) still receive unit pivots so the
        // factor is square, but no basis position records them.
        for t in 0..self.row_with_no_pivot.len() {
            let irow = self.row_with_no_pivot[t];
            let us = self.u_index.len() as Int;
            if t < self.col_with_no_pivot.len() {
                let ik = self.col_with_no_pivot[t];
                self.basic_index[ik as usize] = self.num_col + irow;
                self.finish_pivot(ik, irow, 1.0, PivotType::Logical, us);
            } else {
                self.finish_pivot(-1, irow, 1.0, PivotType::Logical, us);
            }
        }

        // A substituted basis cannot be replayed.
        self.refactor_info.clear();

        log::debug!(
            "rank deficiency {}: {} rows, {} columns without pivot",
            self.rank_deficiency,
            self.row_with_no_pivot.len(),
            self.col_with_no_pivot.len()
        );
    }
}
