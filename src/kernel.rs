// Copyright (C) 2016-2018  ERGO-Code
//
// Markowitz-threshold pivoting on the active kernel.
//
// The kernel left over after the triangular prefix is stored columnwise in
// mc_index, mc_value and mirrored rowwise (pattern only) in mr_index. Each
// column owns a span of the arena: active entries (rows not yet pivoted)
// are packed at the low end, entries in already-pivoted rows are parked
// from the high end; the gap between them absorbs fill-in and newly parked
// entries. When a span overflows, the column is relocated to the arena end
// and the old span becomes garbage; the arena is compacted when garbage
// dominates. Rows work the same way without values.
//
// Pivot search follows Suhl/Suhl: columns and rows are kept in doubly
// linked lists by their active count, the lists are scanned in increasing
// count order, and a candidate must pass the relative threshold of its
// column before its Markowitz cost (row_count - 1) * (col_count - 1)
// competes. The search stops when the cost bound for the current count is
// reached or a fixed number of nonempty lists has been inspected.
//
//   U. Suhl, L. Suhl, "Computing Sparse LU Factorizations for Large-Scale
//   Linear Programming Bases", ORSA Journal on Computing (1990)

use std::time::Instant;

use crate::consts::*;
use crate::factor::{Factor, FactorError};
use crate::links::{link_add, link_del};

impl Factor {
    pub(crate) fn clink_add(&mut self, jcol: Int, count: Int) {
        link_add(
            jcol,
            count,
            &mut self.col_link_first,
            &mut self.col_link_next,
            &mut self.col_link_last,
        );
        if count >= 1 && count < self.min_col_count {
            self.min_col_count = count;
        }
    }

    pub(crate) fn clink_del(&mut self, jcol: Int) {
        link_del(
            jcol,
            &mut self.col_link_first,
            &mut self.col_link_next,
            &mut self.col_link_last,
        );
    }

    pub(crate) fn rlink_add(&mut self, irow: Int, count: Int) {
        link_add(
            irow,
            count,
            &mut self.row_link_first,
            &mut self.row_link_next,
            &mut self.row_link_last,
        );
        if count >= 1 && count < self.min_row_count {
            self.min_row_count = count;
        }
    }

    pub(crate) fn rlink_del(&mut self, irow: Int) {
        link_del(
            irow,
            &mut self.row_link_first,
            &mut self.row_link_next,
            &mut self.row_link_last,
        );
    }

    // Column store primitives. All assume sufficient span space; callers
    // grow spans beforehand with col_ensure_space / row_ensure_space.

    fn col_insert(&mut self, jcol: Int, irow: Int, value: f64) {
        debug_assert!(value.abs() >= TINY_VALUE);
        let iput = self.mc_start[jcol as usize] + self.mc_count_a[jcol as usize];
        self.mc_index[iput as usize] = irow;
        self.mc_value[iput as usize] = value;
        self.mc_count_a[jcol as usize] += 1;
    }

    fn col_store_n(&mut self, jcol: Int, irow: Int, value: f64) {
        self.mc_count_n[jcol as usize] += 1;
        let iput = self.mc_start[jcol as usize] + self.mc_space[jcol as usize]
            - self.mc_count_n[jcol as usize];
        self.mc_index[iput as usize] = irow;
        self.mc_value[iput as usize] = value;
    }

    fn col_fix_max(&mut self, jcol: Int) {
        let start = self.mc_start[jcol as usize] as usize;
        let end = start + self.mc_count_a[jcol as usize] as usize;
        let mut max_value: f64 = 0.0;
        for k in start..end {
            max_value = max_value.max(self.mc_value[k].abs());
        }
        self.mc_min_pivot[jcol as usize] = max_value * self.pivot_threshold;
    }

    /// Remove entry (irow, jcol) from the active part, returning its value.
    fn col_delete(&mut self, jcol: Int, irow: Int) -> f64 {
        let start = self.mc_start[jcol as usize];
        self.mc_count_a[jcol as usize] -= 1;
        let imov = (start + self.mc_count_a[jcol as usize]) as usize;
        let mut idel = start as usize;
        while self.mc_index[idel] != irow {
            idel += 1;
            debug_assert!(idel <= imov);
        }
        let value = self.mc_value[idel];
        self.mc_index[idel] = self.mc_index[imov];
        self.mc_value[idel] = self.mc_value[imov];
        value
    }

    fn row_insert(&mut self, jcol: Int, irow: Int) {
        let iput = self.mr_start[irow as usize] + self.mr_count[irow as usize];
        self.mr_index[iput as usize] = jcol;
        self.mr_count[irow as usize] += 1;
    }

    fn row_delete(&mut self, jcol: Int, irow: Int) {
        let start = self.mr_start[irow as usize];
        self.mr_count[irow as usize] -= 1;
        let imov = (start + self.mr_count[irow as usize]) as usize;
        let mut idel = start as usize;
        while self.mr_index[idel] != jcol {
            idel += 1;
            debug_assert!(idel <= imov);
        }
        self.mr_index[idel] = self.mr_index[imov];
    }

    /// Make room for `extra` further entries in column `jcol`, relocating
    /// the span to the arena end if necessary.
    fn col_ensure_space(&mut self, jcol: Int, extra: Int) {
        let j = jcol as usize;
        let need = self.mc_count_a[j] + self.mc_count_n[j] + extra;
        if need <= self.mc_space[j] {
            return;
        }
        let live = self.mc_index.len() as Int - self.mc_garbage;
        if self.mc_garbage > live + 1024 {
            self.kernel_compact_cols();
        }
        let old_start = self.mc_start[j] as usize;
        let old_space = self.mc_space[j] as usize;
        let na = self.mc_count_a[j] as usize;
        let nn = self.mc_count_n[j] as usize;
        let new_space = (2 * need + 4) as usize;
        let new_start = self.mc_index.len();
        self.mc_index.resize(new_start + new_space, -1);
        self.mc_value.resize(new_start + new_space, 0.0);
        for t in 0..na {
            self.mc_index[new_start + t] = self.mc_index[old_start + t];
            self.mc_value[new_start + t] = self.mc_value[old_start + t];
        }
        for t in 0..nn {
            self.mc_index[new_start + new_space - 1 - t] =
                self.mc_index[old_start + old_space - 1 - t];
            self.mc_value[new_start + new_space - 1 - t] =
                self.mc_value[old_start + old_space - 1 - t];
        }
        self.mc_garbage += old_space as Int;
        self.mc_start[j] = new_start as Int;
        self.mc_space[j] = new_space as Int;
    }

    fn row_ensure_space(&mut self, irow: Int, extra: Int) {
        let i = irow as usize;
        let need = self.mr_count[i] + extra;
        if need <= self.mr_space[i] {
            return;
        }
        let live = self.mr_index.len() as Int - self.mr_garbage;
        if self.mr_garbage > live + 1024 {
            self.kernel_compact_rows();
        }
        let old_start = self.mr_start[i] as usize;
        let old_space = self.mr_space[i] as usize;
        let rc = self.mr_count[i] as usize;
        let new_space = (2 * need + 4) as usize;
        let new_start = self.mr_index.len();
        self.mr_index.resize(new_start + new_space, -1);
        for t in 0..rc {
            self.mr_index[new_start + t] = self.mr_index[old_start + t];
        }
        self.mr_garbage += old_space as Int;
        self.mr_start[i] = new_start as Int;
        self.mr_space[i] = new_space as Int;
    }

    /// Rebuild the column arena without the accumulated garbage spans.
    fn kernel_compact_cols(&mut self) {
        let mut new_index: Vec<Int> = Vec::with_capacity(self.mc_index.len() / 2 + 16);
        let mut new_value: Vec<f64> = Vec::with_capacity(self.mc_index.len() / 2 + 16);
        for j in 0..self.num_basic as usize {
            if self.mc_space[j] <= 0 {
                continue;
            }
            let old_start = self.mc_start[j] as usize;
            let old_space = self.mc_space[j] as usize;
            let na = self.mc_count_a[j] as usize;
            let nn = self.mc_count_n[j] as usize;
            let new_space = na + nn + 4;
            let new_start = new_index.len();
            new_index.resize(new_start + new_space, -1);
            new_value.resize(new_start + new_space, 0.0);
            for t in 0..na {
                new_index[new_start + t] = self.mc_index[old_start + t];
                new_value[new_start + t] = self.mc_value[old_start + t];
            }
            for t in 0..nn {
                new_index[new_start + new_space - 1 - t] =
                    self.mc_index[old_start + old_space - 1 - t];
                new_value[new_start + new_space - 1 - t] =
                    self.mc_value[old_start + old_space - 1 - t];
            }
            self.mc_start[j] = new_start as Int;
            self.mc_space[j] = new_space as Int;
        }
        self.mc_index = new_index;
        self.mc_value = new_value;
        self.mc_garbage = 0;
    }

    fn kernel_compact_rows(&mut self) {
        let mut new_index: Vec<Int> = Vec::with_capacity(self.mr_index.len() / 2 + 16);
        for i in 0..self.num_row as usize {
            if self.mr_space[i] <= 0 {
                continue;
            }
            let old_start = self.mr_start[i] as usize;
            let rc = self.mr_count[i] as usize;
            let new_space = rc + 4;
            let new_start = new_index.len();
            new_index.resize(new_start + new_space, -1);
            for t in 0..rc {
                new_index[new_start + t] = self.mr_index[old_start + t];
            }
            self.mr_start[i] = new_start as Int;
            self.mr_space[i] = new_space as Int;
        }
        self.mr_index = new_index;
        self.mr_garbage = 0;
    }

    /// Populate the kernel stores from the basis columns that survived
    /// the triangular prefix. `queue` holds (basis position, b-column)
    /// pairs; entries in pivoted rows are parked immediately.
    pub(crate) fn kernel_setup(&mut self, queue: &[(Int, Int)]) {
        let m = self.num_row as usize;
        let nb = self.num_basic as usize;

        self.mc_index.clear();
        self.mc_value.clear();
        self.mr_index.clear();
        self.mc_garbage = 0;
        self.mr_garbage = 0;
        for j in 0..nb {
            self.mc_var[j] = -1;
            self.mc_start[j] = 0;
            self.mc_count_a[j] = 0;
            self.mc_count_n[j] = 0;
            self.mc_space[j] = 0;
            self.mc_min_pivot[j] = 0.0;
        }
        self.col_link_first.fill(-1);
        self.col_link_next.fill(-1);
        self.col_link_last.fill(-1);
        self.row_link_first.fill(-1);
        self.row_link_next.fill(-1);
        self.row_link_last.fill(-1);
        self.min_col_count = self.num_row + 1;
        self.min_row_count = self.num_basic + 1;

        // Row counts of active entries.
        for i in 0..m {
            self.iwork[i] = 0;
        }
        for &(_, bcol) in queue {
            let start = self.b_start[bcol as usize] as usize;
            let end = self.b_start[bcol as usize + 1] as usize;
            for pos in start..end {
                let i = self.b_index[pos] as usize;
                if self.mr_count_before[i] >= 0 {
                    self.iwork[i] += 1;
                }
            }
        }

        // Row spans.
        let mut put = 0usize;
        for i in 0..m {
            if self.mr_count_before[i] < 0 {
                self.mr_start[i] = 0;
                self.mr_count[i] = 0;
                self.mr_space[i] = 0;
                continue;
            }
            let rc = self.iwork[i] as usize;
            self.mr_start[i] = put as Int;
            self.mr_count[i] = 0;
            self.mr_space[i] = (2 * rc + 2) as Int;
            put += 2 * rc + 2;
        }
        self.mr_index.resize(put, -1);

        // Columns. Chains are built by prepending, so feeding them in
        // reverse makes the search visit lower basis positions first.
        for &(ik, bcol) in queue.iter().rev() {
            let start = self.b_start[bcol as usize] as usize;
            let end = self.b_start[bcol as usize + 1] as usize;
            let mut na = 0usize;
            let mut nn = 0usize;
            for pos in start..end {
                if self.mr_count_before[self.b_index[pos] as usize] >= 0 {
                    na += 1;
                } else {
                    nn += 1;
                }
            }
            let space = 2 * (na + nn) + 2;
            let cstart = self.mc_index.len();
            self.mc_index.resize(cstart + space, -1);
            self.mc_value.resize(cstart + space, 0.0);
            self.mc_var[ik as usize] = self.b_var[bcol as usize];
            self.mc_start[ik as usize] = cstart as Int;
            self.mc_space[ik as usize] = space as Int;
            let mut aput = cstart;
            let mut nput = cstart + space;
            for pos in start..end {
                let i = self.b_index[pos];
                let x = self.b_value[pos];
                if self.mr_count_before[i as usize] >= 0 {
                    self.mc_index[aput] = i;
                    self.mc_value[aput] = x;
                    aput += 1;
                } else {
                    nput -= 1;
                    self.mc_index[nput] = i;
                    self.mc_value[nput] = x;
                }
            }
            self.mc_count_a[ik as usize] = na as Int;
            self.mc_count_n[ik as usize] = nn as Int;
            self.col_fix_max(ik);
            self.clink_add(ik, na as Int);
            for t in 0..na {
                let i = self.mc_index[cstart + t];
                self.row_insert(ik, i);
            }
        }

        for i in (0..m).rev() {
            if self.mr_count_before[i] >= 0 {
                self.rlink_add(i as Int, self.mr_count[i]);
            }
        }
    }

    /// Search for the next pivot. Returns (column, row), or None when no
    /// eligible candidate remains (rank deficiency).
    pub(crate) fn kernel_search_pivot(&mut self) -> Option<(Int, Int)> {
        let m = self.num_row;
        let nb = self.num_basic;
        let strategy = self.markowitz_strategy;

        // Advance the minimum-count trackers past emptied lists.
        let mut mcc = self.min_col_count.max(1);
        while mcc <= m && self.col_link_first[mcc as usize] < 0 {
            mcc += 1;
        }
        self.min_col_count = mcc;
        let mut mrc = self.min_row_count.max(1);
        while mrc <= nb && self.row_link_first[mrc as usize] < 0 {
            mrc += 1;
        }
        self.min_row_count = mrc;
        if mcc > m || mrc > nb {
            return None;
        }
        let ideal_merit: Int = (mcc - 1) * (mrc - 1);

        let mut best_merit: Int = Int::MAX;
        let mut best_value: f64 = 0.0;
        let mut best_col: Int = -1;
        let mut best_row: Int = -1;
        let mut buckets_searched: Int = 0;
        let max_count = m.max(nb);

        let mut count = 1;
        while count <= max_count {
            for pass in 0..2 {
                let search_cols = if strategy == MARKOWITZ_STRATEGY_SWITCHED {
                    pass == 1
                } else {
                    pass == 0
                };
                if search_cols {
                    if count > m || self.col_link_first[count as usize] < 0 {
                        continue;
                    }
                    buckets_searched += 1;
                    let mut jcol = self.col_link_first[count as usize];
                    while jcol >= 0 {
                        let start = self.mc_start[jcol as usize];
                        let tol = self.mc_min_pivot[jcol as usize].max(self.pivot_tolerance);
                        for t in 0..self.mc_count_a[jcol as usize] {
                            let pos = (start + t) as usize;
                            let irow = self.mc_index[pos];
                            let av = self.mc_value[pos].abs();
                            if av < tol {
                                continue;
                            }
                            let merit = (count - 1) * (self.mr_count[irow as usize] - 1);
                            if merit < best_merit || (merit == best_merit && av > best_value) {
                                best_merit = merit;
                                best_value = av;
                                best_col = jcol;
                                best_row = irow;
                                if strategy == MARKOWITZ_STRATEGY_REFINED
                                    && best_merit <= ideal_merit
                                {
                                    return Some((best_col, best_row));
                                }
                            }
                        }
                        if strategy != MARKOWITZ_STRATEGY_ALTERNATE_BEST
                            && best_col >= 0
                            && best_merit <= ideal_merit
                        {
                            return Some((best_col, best_row));
                        }
                        jcol = self.col_link_next[jcol as usize];
                    }
                } else {
                    if count > nb || self.row_link_first[count as usize] < 0 {
                        continue;
                    }
                    buckets_searched += 1;
                    let mut irow = self.row_link_first[count as usize];
                    while irow >= 0 {
                        let rstart = self.mr_start[irow as usize];
                        for t in 0..self.mr_count[irow as usize] {
                            let jcol = self.mr_index[(rstart + t) as usize];
                            // value lives in the column store
                            let cstart = self.mc_start[jcol as usize];
                            let mut pos = cstart as usize;
                            while self.mc_index[pos] != irow {
                                pos += 1;
                            }
                            let av = self.mc_value[pos].abs();
                            let tol =
                                self.mc_min_pivot[jcol as usize].max(self.pivot_tolerance);
                            if av < tol {
                                continue;
                            }
                            let merit = (count - 1) * (self.mc_count_a[jcol as usize] - 1);
                            if merit < best_merit || (merit == best_merit && av > best_value) {
                                best_merit = merit;
                                best_value = av;
                                best_col = jcol;
                                best_row = irow;
                                if strategy == MARKOWITZ_STRATEGY_REFINED
                                    && best_merit <= ideal_merit
                                {
                                    return Some((best_col, best_row));
                                }
                            }
                        }
                        if strategy != MARKOWITZ_STRATEGY_ALTERNATE_BEST
                            && best_col >= 0
                            && best_merit <= ideal_merit
                        {
                            return Some((best_col, best_row));
                        }
                        irow = self.row_link_next[irow as usize];
                    }
                }
            }
            if best_col >= 0 && (best_merit <= ideal_merit || buckets_searched >= MAX_KERNEL_SEARCH)
            {
                return Some((best_col, best_row));
            }
            count += 1;
        }
        if best_col >= 0 {
            Some((best_col, best_row))
        } else {
            None
        }
    }

    /// Remove pivot (jcol, irow) from the active submatrix and apply the
    /// rank-1 update to the remaining columns. Records the pivot, its L
    /// column and its U column.
    pub(crate) fn kernel_eliminate(&mut self, jcol: Int, irow: Int) {
        debug_assert!(self.mc_var[jcol as usize] >= 0);
        let pivot_value = self.col_delete(jcol, irow);
        debug_assert!(pivot_value != 0.0);
        self.row_delete(jcol, irow);
        self.clink_del(jcol);
        self.rlink_del(irow);

        // Spike workspace: the scaled pivot column, which is also the L
        // column of this stage.
        let cstart = self.mc_start[jcol as usize];
        let spike_count = self.mc_count_a[jcol as usize];
        for t in 0..spike_count {
            let pos = (cstart + t) as usize;
            let i = self.mc_index[pos];
            let multiplier = self.mc_value[pos] / pivot_value;
            self.mwz_column_index[t as usize] = i;
            self.mwz_column_mark[i as usize] = 1;
            self.mwz_column_array[i as usize] = multiplier;
            self.l_index.push(i);
            self.l_value.push(multiplier);
            self.rlink_del(i);
            self.row_delete(jcol, i);
        }

        // U column: the parked entries of the pivot column.
        let u_col_start = self.u_index.len() as Int;
        let chigh = (cstart + self.mc_space[jcol as usize]) as usize;
        for pos in chigh - self.mc_count_n[jcol as usize] as usize..chigh {
            self.u_index.push(self.mc_index[pos]);
            self.u_value.push(self.mc_value[pos]);
        }
        self.finish_pivot(jcol, irow, pivot_value, PivotType::Markowitz, u_col_start);

        // Retire the pivot column and row spans.
        self.mc_garbage += self.mc_space[jcol as usize];
        self.mc_space[jcol as usize] = 0;
        self.mc_count_a[jcol as usize] = 0;
        self.mc_count_n[jcol as usize] = 0;
        self.mr_garbage += self.mr_space[irow as usize];
        let row_start = self.mr_start[irow as usize];
        let row_count = self.mr_count[irow as usize];
        self.mr_space[irow as usize] = 0;
        self.mr_count[irow as usize] = 0;

        // Eliminate into every other column with an entry in the pivot
        // row. The row list is copied out first since it is recycled.
        for t in 0..row_count as usize {
            self.iwork[t] = self.mr_index[row_start as usize + t];
        }
        for t in 0..row_count as usize {
            let jcol2 = self.iwork[t];
            debug_assert_ne!(jcol2, jcol);
            let my_value = self.col_delete(jcol2, irow);
            self.clink_del(jcol2);
            self.col_ensure_space(jcol2, 1);
            self.col_store_n(jcol2, irow, my_value);

            // Update the overlap between this column and the spike.
            let start2 = self.mc_start[jcol2 as usize];
            let mut pos = start2;
            let mut end2 = start2 + self.mc_count_a[jcol2 as usize];
            while pos < end2 {
                let i = self.mc_index[pos as usize];
                if self.mwz_column_mark[i as usize] == 1 {
                    self.mwz_column_mark[i as usize] = 2;
                    let v = self.mc_value[pos as usize]
                        - my_value * self.mwz_column_array[i as usize];
                    if v.abs() < TINY_VALUE {
                        // cancellation
                        end2 -= 1;
                        self.mc_index[pos as usize] = self.mc_index[end2 as usize];
                        self.mc_value[pos as usize] = self.mc_value[end2 as usize];
                        self.mc_count_a[jcol2 as usize] -= 1;
                        self.row_delete(jcol2, i);
                        continue;
                    }
                    self.mc_value[pos as usize] = v;
                }
                pos += 1;
            }

            // Fill-in: spike rows that did not overlap.
            for s in 0..spike_count as usize {
                let i = self.mwz_column_index[s];
                if self.mwz_column_mark[i as usize] == 2 {
                    self.mwz_column_mark[i as usize] = 1;
                    continue;
                }
                let v = -my_value * self.mwz_column_array[i as usize];
                if v.abs() >= TINY_VALUE {
                    self.col_ensure_space(jcol2, 1);
                    self.col_insert(jcol2, i, v);
                    self.row_ensure_space(i, 1);
                    self.row_insert(jcol2, i);
                }
            }

            self.col_fix_max(jcol2);
            self.clink_add(jcol2, self.mc_count_a[jcol2 as usize]);
        }

        // Relink the spike rows with their new counts and reset the
        // workspace.
        for t in 0..spike_count as usize {
            let i = self.mwz_column_index[t];
            self.mwz_column_mark[i as usize] = 0;
            self.mwz_column_array[i as usize] = 0.0;
            self.rlink_add(i, self.mr_count[i as usize]);
        }
    }

    /// Factor the kernel. Returns the number of kernel columns left
    /// without a pivot (the rank deficiency contribution).
    pub(crate) fn build_kernel(
        &mut self,
        nwork: Int,
        tic: Instant,
    ) -> Result<Int, FactorError> {
        let mut remaining = nwork;
        let mut since_check: Int = 0;
        while remaining > 0 {
            since_check += 1;
            if since_check >= KERNEL_TIME_CHECK_INTERVAL {
                since_check = 0;
                if tic.elapsed().as_secs_f64() > self.build_time_limit {
                    return Err(FactorError::TimeLimitExceeded);
                }
            }
            match self.kernel_search_pivot() {
                Some((jcol, irow)) => {
                    self.kernel_eliminate(jcol, irow);
                    self.num_kernel_pivot += 1;
                    remaining -= 1;
                }
                None => break,
            }
        }
        Ok(remaining)
    }
}
