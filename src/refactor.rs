// Copyright (C) 2016-2018  ERGO-Code
//
// Refactorization by pivot-sequence replay.
//
// A successful build records its pivot rows (and how each pivot was
// found). A later build with use_refactor set replays that sequence
// against the current basic_index without any Markowitz search: each
// basis column is gathered, the already-built part of L is applied to
// it, and the entry on the recorded row becomes the pivot. The replay
// aborts as soon as a pivot falls below the relative threshold or the
// absolute tolerance, in which case a normal build runs.
//
// Updates rotate the replaced pivot to the end of the sequence, so a
// replay after updates factorizes the current basis provided the caller
// has installed the entering variables in basic_index.

use crate::consts::*;
use crate::factor::Factor;

/// Pivot sequence of the last successful build.
#[derive(Debug, Default, Clone)]
pub struct RefactorInfo {
    /// Arm the replay path of the next `build`.
    pub use_refactor: bool,
    /// Pivot rows in elimination order.
    pub pivot_row: Vec<Int>,
    /// How each pivot was originally found.
    pub pivot_type: Vec<PivotType>,
}

impl RefactorInfo {
    pub fn clear(&mut self) {
        self.use_refactor = false;
        self.pivot_row.clear();
        self.pivot_type.clear();
    }
}

impl Factor {
    /// Replay the recorded pivot sequence. Err(()) means the replay was
    /// abandoned; the caller falls back to a full build.
    pub(crate) fn rebuild(&mut self) -> Result<(), ()> {
        let m = self.num_row;
        if self.num_basic != m || self.refactor_info.pivot_row.len() != m as usize {
            return Err(());
        }
        let rows = self.refactor_info.pivot_row.clone();
        let types = self.refactor_info.pivot_type.clone();

        self.lu_clear();
        for k in 0..m as usize {
            let irow = rows[k];
            let var = self.basic_index[irow as usize];

            // Gather the basis column into dwork; touched rows in iwork.
            let mut nz: Int = 0;
            if var >= self.num_col {
                let r = (var - self.num_col) as usize;
                self.dwork[r] = 1.0;
                self.iwork[0] = r as Int;
                nz = 1;
            } else {
                for pos in
                    self.a_start[var as usize] as usize..self.a_start[var as usize + 1] as usize
                {
                    let r = self.a_index[pos] as usize;
                    if self.dwork[r] == 0.0 {
                        self.iwork[nz as usize] = r as Int;
                        nz += 1;
                    }
                    self.dwork[r] += self.a_value[pos];
                }
            }

            // Apply the part of L built so far.
            for j in 0..k {
                let p = rows[j] as usize;
                let x = self.dwork[p];
                if x == 0.0 {
                    continue;
                }
                for pos in self.l_start[j] as usize..self.l_start[j + 1] as usize {
                    let i = self.l_index[pos] as usize;
                    if self.dwork[i] == 0.0 {
                        self.iwork[nz as usize] = i as Int;
                        nz += 1;
                    }
                    self.dwork[i] -= x * self.l_value[pos];
                    if self.dwork[i] == 0.0 {
                        self.dwork[i] = SOLVE_ZERO;
                    }
                }
            }

            // The recorded row must still carry an acceptable pivot.
            let pivot_value = self.dwork[irow as usize];
            let mut cmx: f64 = 0.0;
            for t in 0..nz as usize {
                let i = self.iwork[t] as usize;
                if self.mr_count_before[i] >= 0 {
                    cmx = cmx.max(self.dwork[i].abs());
                }
            }
            if pivot_value.abs() < self.pivot_tolerance
                || pivot_value.abs() < self.pivot_threshold * cmx
            {
                for t in 0..nz as usize {
                    self.dwork[self.iwork[t] as usize] = 0.0;
                }
                self.refactor_info.clear();
                log::debug!("replay abandoned at pivot {} of {}", k, m);
                return Err(());
            }

            let us = self.u_index.len() as Int;
            for t in 0..nz as usize {
                let i = self.iwork[t];
                let x = self.dwork[i as usize];
                self.dwork[i as usize] = 0.0;
                if i == irow || x.abs() < TINY_VALUE {
                    continue;
                }
                if self.mr_count_before[i as usize] < 0 {
                    self.u_index.push(i);
                    self.u_value.push(x);
                } else {
                    self.l_index.push(i);
                    self.l_value.push(x / pivot_value);
                }
            }
            self.finish_pivot(irow, irow, pivot_value, types[k], us);
        }

        self.build_finish();
        self.refactor_info.use_refactor = false;
        Ok(())
    }
}
