// Copyright (C) 2016-2018  ERGO-Code
//
// Triangular solves with the factors and the accumulated update etas.
//
// FTRAN solves B x = b as the pipeline
//
//     (APF etas) -> L -> (FT | MPF etas) -> U -> (PF etas)
//
// and BTRAN solves B'x = b by the mirror pipeline in reverse order using
// the row-wise stores of L and U. Right-hand sides and solutions are
// indexed by row; build() permutes basic_index to match.
//
// Each triangular kernel comes in three flavours chosen from the expected
// density of the result and the density of the right-hand side:
//
//  - dense:  scan the pivot sequence, then rebuild the index list;
//  - sparse: scan the pivot sequence but skip zero positions, keeping the
//    index list current as fill appears;
//  - hyper:  depth first search from the nonzeros of the right-hand side
//    computes the exact result pattern in topological order, so work is
//    proportional to the result (adapted from T. Davis, CSPARSE).
//
// ftran_u records the pre-U vector in the pack arrays and btran_u records
// the post-U vector; the update routines consume those snapshots.

use crate::consts::*;
use crate::factor::Factor;
use crate::hvector::HVector;

enum SolveMode {
    Dense,
    Sparse,
    Hyper,
}

fn choose_mode(expected_density: f64, count: Int, dim: Int) -> SolveMode {
    let density = if dim > 0 {
        count as f64 / dim as f64
    } else {
        0.0
    };
    if expected_density >= DENSE_SOLVE_DENSITY || density >= DENSE_SOLVE_DENSITY {
        SolveMode::Dense
    } else if expected_density <= HYPER_SOLVE_DENSITY && density <= HYPER_SOLVE_DENSITY {
        SolveMode::Hyper
    } else {
        SolveMode::Sparse
    }
}

/// Hyper-sparse triangular solve. The graph has one node per row; the
/// neighbours of row r are index[start[k]..end[k]] where k = lookup[r].
/// When `pivot_value` is given the node value is divided by its pivot
/// before scattering. The DFS stacks and visit marks live on the vector.
#[allow(clippy::too_many_arguments)]
fn solve_hyper(
    lookup: &[Int],
    start: &[Int],
    end: &[Int],
    index: &[Int],
    value: &[f64],
    pivot_value: Option<&[f64]>,
    rhs: &mut HVector,
) {
    let m = rhs.size as usize;
    let HVector {
        count,
        index: rhs_index,
        array,
        iwork,
        cwork,
        ..
    } = rhs;
    // iwork partitions: finish list, node stack, position stack.
    let (list, rest) = iwork.split_at_mut(m);
    let (stack, pstack) = rest.split_at_mut(m);

    let mut nlist = 0usize;
    for t in 0..*count as usize {
        let seed = rhs_index[t];
        if cwork[seed as usize] != 0 {
            continue;
        }
        cwork[seed as usize] = 1;
        let mut head: i64 = 0;
        stack[0] = seed;
        pstack[0] = start[lookup[seed as usize] as usize];
        while head >= 0 {
            let node = stack[head as usize];
            let k = lookup[node as usize] as usize;
            let mut pos = pstack[head as usize];
            let mut done = true;
            while pos < end[k] {
                let inext = index[pos as usize];
                pos += 1;
                if cwork[inext as usize] != 0 {
                    continue;
                }
                cwork[inext as usize] = 1;
                pstack[head as usize] = pos;
                head += 1;
                stack[head as usize] = inext;
                pstack[head as usize] = start[lookup[inext as usize] as usize];
                done = false;
                break;
            }
            if done {
                head -= 1;
                list[nlist] = node;
                nlist += 1;
            }
        }
    }

    // Nodes finish after everything they reach, so the reverse finish
    // order processes each row before the rows it updates.
    let mut nz: Int = 0;
    for t in (0..nlist).rev() {
        let node = list[t];
        cwork[node as usize] = 0;
        let k = lookup[node as usize] as usize;
        let mut x = array[node as usize];
        if let Some(piv) = pivot_value {
            if x != 0.0 {
                x /= piv[k];
            }
        }
        if x.abs() < TINY_VALUE {
            array[node as usize] = 0.0;
            continue;
        }
        array[node as usize] = x;
        rhs_index[nz as usize] = node;
        nz += 1;
        for pos in start[k]..end[k] {
            array[index[pos as usize] as usize] -= x * value[pos as usize];
        }
    }
    *count = nz;
}

impl Factor {
    /// Solve B x = b in place. The right-hand side is indexed by row;
    /// the solution comes back in the same indexing.
    pub fn ftran(&self, rhs: &mut HVector, expected_density: f64) {
        assert!(self.factor_valid, "ftran requires a factorized basis");
        assert_eq!(
            self.num_basic, self.num_row,
            "solves require a square basis"
        );
        assert_eq!(rhs.size, self.num_row);
        if self.update_method == UpdateMethod::Apf {
            self.ftran_apf(rhs);
        }
        self.ftran_l(rhs, expected_density);
        match self.update_method {
            UpdateMethod::Ft => self.ftran_ft(rhs),
            UpdateMethod::Mpf => self.ftran_mpf(rhs),
            _ => {}
        }
        self.ftran_u(rhs, expected_density);
        if self.update_method == UpdateMethod::Pf {
            self.ftran_pf(rhs);
        }
        rhs.tight();
    }

    /// Solve B^T x = b in place.
    pub fn btran(&self, rhs: &mut HVector, expected_density: f64) {
        assert!(self.factor_valid, "btran requires a factorized basis");
        assert_eq!(
            self.num_basic, self.num_row,
            "solves require a square basis"
        );
        assert_eq!(rhs.size, self.num_row);
        if self.update_method == UpdateMethod::Pf {
            self.btran_pf(rhs);
        }
        self.btran_u(rhs, expected_density);
        match self.update_method {
            UpdateMethod::Ft => self.btran_ft(rhs),
            UpdateMethod::Mpf => self.btran_mpf(rhs),
            _ => {}
        }
        self.btran_l(rhs, expected_density);
        if self.update_method == UpdateMethod::Apf {
            self.btran_apf(rhs);
        }
        rhs.tight();
    }

    pub(crate) fn ftran_l(&self, rhs: &mut HVector, expected_density: f64) {
        let kk = self.l_pivot_index.len();
        match choose_mode(expected_density, rhs.count, self.num_row) {
            SolveMode::Dense => {
                for k in 0..kk {
                    let p = self.l_pivot_index[k] as usize;
                    let x = rhs.array[p];
                    if x == 0.0 {
                        continue;
                    }
                    for pos in self.l_start[k] as usize..self.l_start[k + 1] as usize {
                        rhs.array[self.l_index[pos] as usize] -= x * self.l_value[pos];
                    }
                }
                rhs.reindex();
            }
            SolveMode::Sparse => {
                for k in 0..kk {
                    let p = self.l_pivot_index[k] as usize;
                    let x = rhs.array[p];
                    if x == 0.0 {
                        continue;
                    }
                    for pos in self.l_start[k] as usize..self.l_start[k + 1] as usize {
                        let i = self.l_index[pos] as usize;
                        if rhs.array[i] == 0.0 {
                            rhs.index[rhs.count as usize] = i as Int;
                            rhs.count += 1;
                        }
                        rhs.array[i] -= x * self.l_value[pos];
                        if rhs.array[i] == 0.0 {
                            rhs.array[i] = SOLVE_ZERO;
                        }
                    }
                }
            }
            SolveMode::Hyper => {
                solve_hyper(
                    &self.l_pivot_lookup,
                    &self.l_start[..kk],
                    &self.l_start[1..],
                    &self.l_index,
                    &self.l_value,
                    None,
                    rhs,
                );
            }
        }
    }

    pub(crate) fn btran_l(&self, rhs: &mut HVector, expected_density: f64) {
        let kk = self.l_pivot_index.len();
        match choose_mode(expected_density, rhs.count, self.num_row) {
            SolveMode::Dense => {
                for k in (0..kk).rev() {
                    let p = self.l_pivot_index[k] as usize;
                    let x = rhs.array[p];
                    if x == 0.0 {
                        continue;
                    }
                    for pos in self.lr_start[k] as usize..self.lr_start[k + 1] as usize {
                        rhs.array[self.lr_index[pos] as usize] -= x * self.lr_value[pos];
                    }
                }
                rhs.reindex();
            }
            SolveMode::Sparse => {
                for k in (0..kk).rev() {
                    let p = self.l_pivot_index[k] as usize;
                    let x = rhs.array[p];
                    if x == 0.0 {
                        continue;
                    }
                    for pos in self.lr_start[k] as usize..self.lr_start[k + 1] as usize {
                        let i = self.lr_index[pos] as usize;
                        if rhs.array[i] == 0.0 {
                            rhs.index[rhs.count as usize] = i as Int;
                            rhs.count += 1;
                        }
                        rhs.array[i] -= x * self.lr_value[pos];
                        if rhs.array[i] == 0.0 {
                            rhs.array[i] = SOLVE_ZERO;
                        }
                    }
                }
            }
            SolveMode::Hyper => {
                solve_hyper(
                    &self.l_pivot_lookup,
                    &self.lr_start[..kk],
                    &self.lr_start[1..],
                    &self.lr_index,
                    &self.lr_value,
                    None,
                    rhs,
                );
            }
        }
    }

    pub(crate) fn ftran_u(&self, rhs: &mut HVector, expected_density: f64) {
        if rhs.pack_flag {
            rhs.pack();
        }
        let kk = self.u_pivot_index.len();
        match choose_mode(expected_density, rhs.count, self.num_row) {
            SolveMode::Dense => {
                for k in (0..kk).rev() {
                    let p = self.u_pivot_index[k];
                    if p < 0 {
                        continue;
                    }
                    let x0 = rhs.array[p as usize];
                    if x0 == 0.0 {
                        continue;
                    }
                    let x = x0 / self.u_pivot_value[k];
                    rhs.array[p as usize] = x;
                    for pos in self.u_start[k] as usize..self.u_last_p[k] as usize {
                        rhs.array[self.u_index[pos] as usize] -= x * self.u_value[pos];
                    }
                }
                rhs.reindex();
            }
            SolveMode::Sparse => {
                for k in (0..kk).rev() {
                    let p = self.u_pivot_index[k];
                    if p < 0 {
                        continue;
                    }
                    let x0 = rhs.array[p as usize];
                    if x0 == 0.0 {
                        continue;
                    }
                    let x = x0 / self.u_pivot_value[k];
                    rhs.array[p as usize] = x;
                    for pos in self.u_start[k] as usize..self.u_last_p[k] as usize {
                        let i = self.u_index[pos] as usize;
                        if rhs.array[i] == 0.0 {
                            rhs.index[rhs.count as usize] = i as Int;
                            rhs.count += 1;
                        }
                        rhs.array[i] -= x * self.u_value[pos];
                        if rhs.array[i] == 0.0 {
                            rhs.array[i] = SOLVE_ZERO;
                        }
                    }
                }
            }
            SolveMode::Hyper => {
                solve_hyper(
                    &self.u_pivot_lookup,
                    &self.u_start,
                    &self.u_last_p,
                    &self.u_index,
                    &self.u_value,
                    Some(&self.u_pivot_value),
                    rhs,
                );
            }
        }
    }

    pub(crate) fn btran_u(&self, rhs: &mut HVector, expected_density: f64) {
        let kk = self.u_pivot_index.len();
        match choose_mode(expected_density, rhs.count, self.num_row) {
            SolveMode::Dense => {
                for k in 0..kk {
                    let p = self.u_pivot_index[k];
                    if p < 0 {
                        continue;
                    }
                    let x0 = rhs.array[p as usize];
                    if x0 == 0.0 {
                        continue;
                    }
                    let x = x0 / self.u_pivot_value[k];
                    rhs.array[p as usize] = x;
                    for pos in self.ur_start[k] as usize..self.ur_lastp[k] as usize {
                        rhs.array[self.ur_index[pos] as usize] -= x * self.ur_value[pos];
                    }
                }
                rhs.reindex();
            }
            SolveMode::Sparse => {
                for k in 0..kk {
                    let p = self.u_pivot_index[k];
                    if p < 0 {
                        continue;
                    }
                    let x0 = rhs.array[p as usize];
                    if x0 == 0.0 {
                        continue;
                    }
                    let x = x0 / self.u_pivot_value[k];
                    rhs.array[p as usize] = x;
                    for pos in self.ur_start[k] as usize..self.ur_lastp[k] as usize {
                        let i = self.ur_index[pos] as usize;
                        if rhs.array[i] == 0.0 {
                            rhs.index[rhs.count as usize] = i as Int;
                            rhs.count += 1;
                        }
                        rhs.array[i] -= x * self.ur_value[pos];
                        if rhs.array[i] == 0.0 {
                            rhs.array[i] = SOLVE_ZERO;
                        }
                    }
                }
            }
            SolveMode::Hyper => {
                solve_hyper(
                    &self.u_pivot_lookup,
                    &self.ur_start,
                    &self.ur_lastp,
                    &self.ur_index,
                    &self.ur_value,
                    Some(&self.u_pivot_value),
                    rhs,
                );
            }
        }
        if rhs.pack_flag {
            rhs.pack();
        }
    }

    // Update-eta application. Etas are few relative to the factors, so
    // these always run in index-maintaining sequential form.

    pub(crate) fn ftran_ft(&self, rhs: &mut HVector) {
        for t in 0..self.pf_pivot_index.len() {
            let p = self.pf_pivot_index[t] as usize;
            let mut delta = 0.0;
            for pos in self.pf_start[t] as usize..self.pf_start[t + 1] as usize {
                delta += rhs.array[self.pf_index[pos] as usize] * self.pf_value[pos];
            }
            if delta == 0.0 {
                continue;
            }
            if rhs.array[p] == 0.0 {
                rhs.index[rhs.count as usize] = p as Int;
                rhs.count += 1;
            }
            rhs.array[p] -= delta;
            if rhs.array[p] == 0.0 {
                rhs.array[p] = SOLVE_ZERO;
            }
        }
    }

    pub(crate) fn btran_ft(&self, rhs: &mut HVector) {
        for t in (0..self.pf_pivot_index.len()).rev() {
            let p = self.pf_pivot_index[t] as usize;
            let x = rhs.array[p];
            if x == 0.0 {
                continue;
            }
            for pos in self.pf_start[t] as usize..self.pf_start[t + 1] as usize {
                let i = self.pf_index[pos] as usize;
                if rhs.array[i] == 0.0 {
                    rhs.index[rhs.count as usize] = i as Int;
                    rhs.count += 1;
                }
                rhs.array[i] -= x * self.pf_value[pos];
                if rhs.array[i] == 0.0 {
                    rhs.array[i] = SOLVE_ZERO;
                }
            }
        }
    }

    pub(crate) fn ftran_pf(&self, rhs: &mut HVector) {
        for t in 0..self.pf_pivot_index.len() {
            let p = self.pf_pivot_index[t] as usize;
            let x0 = rhs.array[p];
            if x0 == 0.0 {
                continue;
            }
            let x = x0 / self.pf_pivot_value[t];
            rhs.array[p] = x;
            for pos in self.pf_start[t] as usize..self.pf_start[t + 1] as usize {
                let i = self.pf_index[pos] as usize;
                if rhs.array[i] == 0.0 {
                    rhs.index[rhs.count as usize] = i as Int;
                    rhs.count += 1;
                }
                rhs.array[i] -= x * self.pf_value[pos];
                if rhs.array[i] == 0.0 {
                    rhs.array[i] = SOLVE_ZERO;
                }
            }
        }
    }

    pub(crate) fn btran_pf(&self, rhs: &mut HVector) {
        for t in (0..self.pf_pivot_index.len()).rev() {
            let p = self.pf_pivot_index[t] as usize;
            let mut s = 0.0;
            for pos in self.pf_start[t] as usize..self.pf_start[t + 1] as usize {
                s += rhs.array[self.pf_index[pos] as usize] * self.pf_value[pos];
            }
            let x0 = rhs.array[p];
            let x1 = (x0 - s) / self.pf_pivot_value[t];
            if x0 == 0.0 && x1 != 0.0 {
                rhs.index[rhs.count as usize] = p as Int;
                rhs.count += 1;
            }
            rhs.array[p] = x1;
        }
    }

    pub(crate) fn ftran_mpf(&self, rhs: &mut HVector) {
        for t in 0..self.pf_pivot_value.len() {
            let col = self.pf_start[2 * t] as usize..self.pf_start[2 * t + 1] as usize;
            let row = self.pf_start[2 * t + 1] as usize..self.pf_start[2 * t + 2] as usize;
            let mut s = 0.0;
            for pos in row {
                s += rhs.array[self.pf_index[pos] as usize] * self.pf_value[pos];
            }
            s /= self.pf_pivot_value[t];
            if s == 0.0 {
                continue;
            }
            for pos in col {
                let i = self.pf_index[pos] as usize;
                if rhs.array[i] == 0.0 {
                    rhs.index[rhs.count as usize] = i as Int;
                    rhs.count += 1;
                }
                rhs.array[i] -= s * self.pf_value[pos];
                if rhs.array[i] == 0.0 {
                    rhs.array[i] = SOLVE_ZERO;
                }
            }
        }
    }

    pub(crate) fn btran_mpf(&self, rhs: &mut HVector) {
        for t in (0..self.pf_pivot_value.len()).rev() {
            let col = self.pf_start[2 * t] as usize..self.pf_start[2 * t + 1] as usize;
            let row = self.pf_start[2 * t + 1] as usize..self.pf_start[2 * t + 2] as usize;
            let mut s = 0.0;
            for pos in col {
                s += rhs.array[self.pf_index[pos] as usize] * self.pf_value[pos];
            }
            s /= self.pf_pivot_value[t];
            if s == 0.0 {
                continue;
            }
            for pos in row {
                let i = self.pf_index[pos] as usize;
                if rhs.array[i] == 0.0 {
                    rhs.index[rhs.count as usize] = i as Int;
                    rhs.count += 1;
                }
                rhs.array[i] -= s * self.pf_value[pos];
                if rhs.array[i] == 0.0 {
                    rhs.array[i] = SOLVE_ZERO;
                }
            }
        }
    }

    pub(crate) fn ftran_apf(&self, rhs: &mut HVector) {
        for t in (0..self.pf_pivot_value.len()).rev() {
            let col = self.pf_start[2 * t] as usize..self.pf_start[2 * t + 1] as usize;
            let row = self.pf_start[2 * t + 1] as usize..self.pf_start[2 * t + 2] as usize;
            let mut s = 0.0;
            for pos in row {
                s += rhs.array[self.pf_index[pos] as usize] * self.pf_value[pos];
            }
            s /= self.pf_pivot_value[t];
            if s == 0.0 {
                continue;
            }
            for pos in col {
                let i = self.pf_index[pos] as usize;
                if rhs.array[i] == 0.0 {
                    rhs.index[rhs.count as usize] = i as Int;
                    rhs.count += 1;
                }
                rhs.array[i] -= s * self.pf_value[pos];
                if rhs.array[i] == 0.0 {
                    rhs.array[i] = SOLVE_ZERO;
                }
            }
        }
    }

    pub(crate) fn btran_apf(&self, rhs: &mut HVector) {
        for t in 0..self.pf_pivot_value.len() {
            let col = self.pf_start[2 * t] as usize..self.pf_start[2 * t + 1] as usize;
            let row = self.pf_start[2 * t + 1] as usize..self.pf_start[2 * t + 2] as usize;
            let mut s = 0.0;
            for pos in col {
                s += rhs.array[self.pf_index[pos] as usize] * self.pf_value[pos];
            }
            s /= self.pf_pivot_value[t];
            if s == 0.0 {
                continue;
            }
            for pos in row {
                let i = self.pf_index[pos] as usize;
                if rhs.array[i] == 0.0 {
                    rhs.index[rhs.count as usize] = i as Int;
                    rhs.count += 1;
                }
                rhs.array[i] -= s * self.pf_value[pos];
                if rhs.array[i] == 0.0 {
                    rhs.array[i] = SOLVE_ZERO;
                }
            }
        }
    }
}
