// Copyright (C) 2016-2018  ERGO-Code
//
// Rank-one basis change: B' = B + (a_q - B e_p) e_p^T.
//
// The caller supplies aq = B^{-1} a_q (solved by ftran with pack_flag
// set, so aq carries the pre-U snapshot) and ep = B^{-T} e_p (solved by
// btran with pack_flag set, so ep carries the post-U snapshot), together
// with the pivotal row index. Which factors are produced depends on the
// configured update method:
//
//  FT   The departing pivot's row and column are removed from U, the new
//       column (pre-U aq) is spliced in at the end of the pivot order,
//       and the removed row, scaled by its column pivots, becomes an eta
//       applied to the pre-U vector. The new diagonal is
//       aq[iRow] * old_pivot.
//  PF   An eta built from the fully solved aq, applied after U.
//  MPF  An eta pair (pre-U aq minus the departing U column; post-U ep),
//       applied between L and U.
//  APF  An eta pair (a_q - B e_p recovered from the constraint matrix;
//       the fully solved ep), applied outside L and U.
//
// The entering pivot must satisfy |aq[iRow]| >= pivot_tolerance or the
// update is refused with a reinversion hint.

use crate::consts::*;
use crate::factor::Factor;
use crate::hvector::HVector;

impl Factor {
    /// Fold one basis column replacement into the factorization.
    /// The caller installs the entering variable in `basic_index_mut()`
    /// afterwards; the engine only adjusts the factors.
    pub fn update(&mut self, aq: &mut HVector, ep: &mut HVector, irow: Int) -> UpdateHint {
        assert!(self.factor_valid, "update requires a factorized basis");
        assert!(irow >= 0 && irow < self.num_row);
        let alpha = aq.array[irow as usize];
        if alpha.abs() < self.pivot_tolerance {
            return UpdateHint::Reinvert;
        }

        let hint = match self.update_method {
            UpdateMethod::Ft => self.update_ft(aq, irow),
            UpdateMethod::Pf => self.update_pf(aq, irow),
            UpdateMethod::Mpf => self.update_mpf(aq, ep, irow),
            UpdateMethod::Apf => self.update_apf(aq, ep, irow),
        };
        self.num_update += 1;

        // Keep the replay sequence aligned with the current basis: the
        // pivot of the replaced position moves to the end.
        if let Some(at) = self
            .refactor_info
            .pivot_row
            .iter()
            .position(|&r| r == irow)
        {
            self.refactor_info.pivot_row.remove(at);
            self.refactor_info.pivot_type.remove(at);
            self.refactor_info.pivot_row.push(irow);
            self.refactor_info.pivot_type.push(PivotType::Markowitz);
        }
        hint
    }

    /// Forrest-Tomlin with the new column at the end of the pivot order.
    fn update_ft(&mut self, aq: &mut HVector, irow: Int) -> UpdateHint {
        assert!(aq.pack_count > 0, "ftran must run with pack_flag set");
        let cp = self.u_pivot_lookup[irow as usize];
        assert!(cp >= 0);
        let cp = cp as usize;
        let old_pivot = self.u_pivot_value[cp];
        let alpha = aq.array[irow as usize];

        // Remove the departing row from the columns it touches; the
        // removed entries, scaled by their column pivots, form the eta.
        for t in self.ur_start[cp] as usize..self.ur_lastp[cp] as usize {
            let xpos = self.ur_index[t];
            let v = self.ur_value[t];
            let k = self.u_pivot_lookup[xpos as usize] as usize;
            let mut find = self.u_start[k] as usize;
            self.u_last_p[k] -= 1;
            let last = self.u_last_p[k] as usize;
            while self.u_index[find] != irow {
                find += 1;
                debug_assert!(find <= last);
            }
            self.u_index[find] = self.u_index[last];
            self.u_value[find] = self.u_value[last];
            self.u_total_x -= 1;
            self.pf_index.push(xpos);
            self.pf_value.push(v / self.u_pivot_value[k]);
        }
        self.pf_pivot_index.push(irow);
        self.pf_pivot_value.push(alpha * old_pivot);
        self.pf_start.push(self.pf_index.len() as Int);
        self.ur_lastp[cp] = self.ur_start[cp];

        // Remove the departing column from the row store.
        for t in self.u_start[cp] as usize..self.u_last_p[cp] as usize {
            let i = self.u_index[t];
            let j = self.u_pivot_lookup[i as usize] as usize;
            let mut find = self.ur_start[j] as usize;
            self.ur_lastp[j] -= 1;
            let last = self.ur_lastp[j] as usize;
            while self.ur_index[find] != irow {
                find += 1;
                debug_assert!(find <= last);
            }
            self.ur_index[find] = self.ur_index[last];
            self.ur_value[find] = self.ur_value[last];
            self.u_total_x -= 1;
        }
        self.u_last_p[cp] = self.u_start[cp];
        self.u_pivot_index[cp] = -1;
        self.u_pivot_value[cp] = 0.0;

        // Splice in the new column at the end of the pivot order.
        let knew = self.u_pivot_index.len() as Int;
        let col_start = self.u_index.len() as Int;
        for n in 0..aq.pack_count as usize {
            let i = aq.pack_index[n];
            let v = aq.pack_value[n];
            if i == irow || v.abs() < TINY_VALUE {
                continue;
            }
            self.u_index.push(i);
            self.u_value.push(v);
            self.u_total_x += 1;
            // Mirror into the row store, relocating the row when full.
            let j = self.u_pivot_lookup[i as usize] as usize;
            if self.ur_lastp[j] - self.ur_start[j] >= self.ur_space[j] {
                let count = (self.ur_lastp[j] - self.ur_start[j]) as usize;
                let new_space = 2 * count + 4;
                let new_start = self.ur_index.len();
                self.ur_index.resize(new_start + new_space, 0);
                self.ur_value.resize(new_start + new_space, 0.0);
                for s in 0..count {
                    self.ur_index[new_start + s] =
                        self.ur_index[self.ur_start[j] as usize + s];
                    self.ur_value[new_start + s] =
                        self.ur_value[self.ur_start[j] as usize + s];
                }
                self.ur_start[j] = new_start as Int;
                self.ur_lastp[j] = (new_start + count) as Int;
                self.ur_space[j] = new_space as Int;
            }
            let slot = self.ur_lastp[j] as usize;
            self.ur_index[slot] = irow;
            self.ur_value[slot] = v;
            self.ur_lastp[j] += 1;
        }
        let new_pivot = alpha * old_pivot;
        self.u_start.push(col_start);
        self.u_last_p.push(self.u_index.len() as Int);
        self.u_pivot_index.push(irow);
        self.u_pivot_value.push(new_pivot);
        self.u_pivot_lookup[irow as usize] = knew;
        // Empty row-store line for the new pivot.
        let line_start = self.ur_index.len();
        self.ur_index.resize(line_start + 4, 0);
        self.ur_value.resize(line_start + 4, 0.0);
        self.ur_start.push(line_start as Int);
        self.ur_lastp.push(line_start as Int);
        self.ur_space.push(4);
        self.u_total_x += 1;

        if new_pivot.abs() < self.pivot_tolerance {
            return UpdateHint::Reinvert;
        }
        if self.u_total_x > 2 * self.u_merit_x + self.num_row {
            log::debug!(
                "ft update fill {} exceeds policy bound, hinting reinvert",
                self.u_total_x
            );
            return UpdateHint::Reinvert;
        }
        UpdateHint::Fine
    }

    /// Product form: one eta from the solved entering column.
    fn update_pf(&mut self, aq: &mut HVector, irow: Int) -> UpdateHint {
        let alpha = aq.array[irow as usize];
        for n in 0..aq.count as usize {
            let i = aq.index[n];
            let v = aq.array[i as usize];
            if i == irow || v.abs() < TINY_VALUE {
                continue;
            }
            self.pf_index.push(i);
            self.pf_value.push(v);
        }
        self.pf_pivot_index.push(irow);
        self.pf_pivot_value.push(alpha);
        self.pf_start.push(self.pf_index.len() as Int);
        UpdateHint::Fine
    }

    /// Middle product form: column part (pre-U aq minus the departing U
    /// column), row part (post-U ep).
    fn update_mpf(&mut self, aq: &mut HVector, ep: &mut HVector, irow: Int) -> UpdateHint {
        assert!(aq.pack_count > 0, "ftran must run with pack_flag set");
        assert!(ep.pack_count > 0, "btran must run with pack_flag set");
        let cp = self.u_pivot_lookup[irow as usize];
        assert!(cp >= 0);
        let cp = cp as usize;
        let alpha = aq.array[irow as usize];

        for n in 0..aq.pack_count as usize {
            let v = aq.pack_value[n];
            if v.abs() < TINY_VALUE {
                continue;
            }
            self.pf_index.push(aq.pack_index[n]);
            self.pf_value.push(v);
        }
        for t in self.u_start[cp] as usize..self.u_last_p[cp] as usize {
            self.pf_index.push(self.u_index[t]);
            self.pf_value.push(-self.u_value[t]);
        }
        self.pf_index.push(irow);
        self.pf_value.push(-self.u_pivot_value[cp]);
        self.pf_start.push(self.pf_index.len() as Int);

        for n in 0..ep.pack_count as usize {
            let v = ep.pack_value[n];
            if v.abs() < TINY_VALUE {
                continue;
            }
            self.pf_index.push(ep.pack_index[n]);
            self.pf_value.push(v);
        }
        self.pf_start.push(self.pf_index.len() as Int);
        self.pf_pivot_index.push(irow);
        self.pf_pivot_value.push(alpha);
        UpdateHint::Fine
    }

    /// Alternate product form: column part a_q - B e_p recovered from the
    /// constraint matrix, row part the fully solved ep.
    fn update_apf(&mut self, aq: &mut HVector, ep: &mut HVector, irow: Int) -> UpdateHint {
        assert!(
            self.a_matrix_valid,
            "apf update reads the constraint matrix"
        );
        let alpha = aq.array[irow as usize];

        // a_q - B e_p = B (aq - e_p): a sparse mat-vec over the columns
        // of the current basis at the nonzeros of aq.
        let mut touched: Int = 0;
        for n in 0..aq.count as usize {
            let i = aq.index[n];
            let mut x = aq.array[i as usize];
            if i == irow {
                x -= 1.0;
            }
            if x.abs() < TINY_VALUE {
                continue;
            }
            let var = self.basic_index[i as usize];
            if var >= self.num_col {
                let r = (var - self.num_col) as usize;
                if self.dwork[r] == 0.0 {
                    self.iwork[touched as usize] = r as Int;
                    touched += 1;
                }
                self.dwork[r] += x;
            } else {
                for pos in self.a_start[var as usize] as usize
                    ..self.a_start[var as usize + 1] as usize
                {
                    let r = self.a_index[pos] as usize;
                    if self.dwork[r] == 0.0 {
                        self.iwork[touched as usize] = r as Int;
                        touched += 1;
                    }
                    self.dwork[r] += x * self.a_value[pos];
                }
            }
        }
        for t in 0..touched as usize {
            let r = self.iwork[t] as usize;
            let v = self.dwork[r];
            self.dwork[r] = 0.0;
            if v.abs() >= TINY_VALUE {
                self.pf_index.push(r as Int);
                self.pf_value.push(v);
            }
        }
        self.pf_start.push(self.pf_index.len() as Int);

        for n in 0..ep.count as usize {
            let i = ep.index[n];
            let v = ep.array[i as usize];
            if v.abs() < TINY_VALUE {
                continue;
            }
            self.pf_index.push(i);
            self.pf_value.push(v);
        }
        self.pf_start.push(self.pf_index.len() as Int);
        self.pf_pivot_index.push(irow);
        self.pf_pivot_value.push(alpha);
        UpdateHint::Fine
    }
}
