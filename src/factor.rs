// Copyright (C) 2016-2018  ERGO-Code

//! Engine state and configuration.
//!
//! `Factor` owns everything: a copy of the constraint matrix view, the
//! basic column selection, the L and U factors in column- and row-wise
//! form, the transient elimination kernel, the update buffers and the
//! scratch workspaces. Scratch is sized once in `setup*`; the solve and
//! update paths do not allocate after the first build.

use thiserror::Error;

use crate::consts::*;
use crate::refactor::RefactorInfo;

/// Recoverable failures of `Factor::build`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FactorError {
    /// The cooperative time budget expired inside the kernel. The
    /// factorization is invalid until a later build succeeds.
    #[error("factorization aborted: build time limit exceeded")]
    TimeLimitExceeded,
    /// The constraint matrix view was invalidated by a structural edit
    /// and has not been refreshed with `setup_matrix`.
    #[error("constraint matrix view is invalid; call setup_matrix first")]
    InvalidMatrix,
}

/// Sparse basis matrix factorization PBQ = LU with update and solves.
#[derive(Debug, Default)]
pub struct Factor {
    // Problem size and constraint matrix view.
    pub(crate) num_row: Int,
    pub(crate) num_col: Int,
    pub(crate) num_basic: Int,
    pub(crate) a_matrix_valid: bool,
    pub(crate) a_start: Vec<Int>,
    pub(crate) a_index: Vec<Int>,
    pub(crate) a_value: Vec<f64>,
    pub(crate) basic_index: Vec<Int>,

    // Configuration.
    pub(crate) pivot_threshold: f64,
    pub(crate) pivot_tolerance: f64,
    pub(crate) debug_level: Int,
    pub(crate) update_method: UpdateMethod,
    pub(crate) markowitz_strategy: Int,
    pub(crate) build_time_limit: f64,

    // Factorization state.
    pub(crate) factor_valid: bool,
    pub(crate) num_update: Int,

    /// Degree of rank deficiency found by the last build.
    pub rank_deficiency: Int,
    /// Rows not pivoted on.
    pub row_with_no_pivot: Vec<Int>,
    /// Basis positions not pivoted on.
    pub col_with_no_pivot: Vec<Int>,
    /// Variables not pivoted on (replaced by slacks).
    pub var_with_no_pivot: Vec<Int>,

    /// Pivots taken by the triangular-prefix phase of the last build.
    pub num_simple_pivot: Int,
    /// Pivots taken by the Markowitz kernel of the last build.
    pub num_kernel_pivot: Int,

    /// Pivot sequence of the last successful build, for replay.
    pub refactor_info: RefactorInfo,

    // Workspaces.
    pub(crate) iwork: Vec<Int>,
    pub(crate) dwork: Vec<f64>,

    // Copy of the non-unit basis columns taken at build time.
    pub(crate) b_var: Vec<Int>,
    pub(crate) b_start: Vec<Int>,
    pub(crate) b_index: Vec<Int>,
    pub(crate) b_value: Vec<f64>,

    // permute[k] is the pre-permutation basis position of pivot k.
    pub(crate) permute: Vec<Int>,

    // Kernel column store: active entries at the low end of each span,
    // entries in already-pivoted rows parked from the high end.
    pub(crate) mc_var: Vec<Int>,
    pub(crate) mc_start: Vec<Int>,
    pub(crate) mc_count_a: Vec<Int>,
    pub(crate) mc_count_n: Vec<Int>,
    pub(crate) mc_space: Vec<Int>,
    pub(crate) mc_index: Vec<Int>,
    pub(crate) mc_value: Vec<f64>,
    pub(crate) mc_min_pivot: Vec<f64>,
    pub(crate) mc_garbage: Int,

    // Kernel row mirror (pattern only; values live in the column store).
    pub(crate) mr_start: Vec<Int>,
    pub(crate) mr_count: Vec<Int>,
    pub(crate) mr_space: Vec<Int>,
    pub(crate) mr_count_before: Vec<Int>,
    pub(crate) mr_index: Vec<Int>,
    pub(crate) mr_garbage: Int,

    // Spike workspace for one pivot elimination.
    pub(crate) mwz_column_index: Vec<Int>,
    pub(crate) mwz_column_mark: Vec<i8>,
    pub(crate) mwz_column_array: Vec<f64>,

    // Count-bucket lists.
    pub(crate) col_link_first: Vec<Int>,
    pub(crate) col_link_next: Vec<Int>,
    pub(crate) col_link_last: Vec<Int>,
    pub(crate) row_link_first: Vec<Int>,
    pub(crate) row_link_next: Vec<Int>,
    pub(crate) row_link_last: Vec<Int>,
    pub(crate) min_col_count: Int,
    pub(crate) min_row_count: Int,

    // Factor L: unit lower triangular, columns in pivot order, plus the
    // row-wise mirror for BTRAN.
    pub(crate) l_pivot_lookup: Vec<Int>,
    pub(crate) l_pivot_index: Vec<Int>,
    pub(crate) l_start: Vec<Int>,
    pub(crate) l_index: Vec<Int>,
    pub(crate) l_value: Vec<f64>,
    pub(crate) lr_start: Vec<Int>,
    pub(crate) lr_index: Vec<Int>,
    pub(crate) lr_value: Vec<f64>,

    // Factor U: explicit pivots, columns in pivot order with deletion
    // support, plus the row-wise mirror with spare space per row so the
    // Forrest-Tomlin update can grow rows in place.
    pub(crate) u_pivot_lookup: Vec<Int>,
    pub(crate) u_pivot_index: Vec<Int>,
    pub(crate) u_pivot_value: Vec<f64>,
    /// U nonzeros (including pivots) right after the last build.
    pub u_merit_x: Int,
    /// Current U nonzeros, tracking update fill and deletion.
    pub u_total_x: Int,
    pub(crate) u_start: Vec<Int>,
    pub(crate) u_last_p: Vec<Int>,
    pub(crate) u_index: Vec<Int>,
    pub(crate) u_value: Vec<f64>,
    pub(crate) ur_start: Vec<Int>,
    pub(crate) ur_lastp: Vec<Int>,
    pub(crate) ur_space: Vec<Int>,
    pub(crate) ur_index: Vec<Int>,
    pub(crate) ur_value: Vec<f64>,

    // Update buffer: eta factors accumulated since the last build.
    pub(crate) pf_pivot_index: Vec<Int>,
    pub(crate) pf_pivot_value: Vec<f64>,
    pub(crate) pf_start: Vec<Int>,
    pub(crate) pf_index: Vec<Int>,
    pub(crate) pf_value: Vec<f64>,
}

impl Factor {
    pub fn new() -> Self {
        let mut f = Factor::default();
        f.pivot_threshold = DEFAULT_PIVOT_THRESHOLD;
        f.pivot_tolerance = DEFAULT_PIVOT_TOLERANCE;
        f.update_method = UpdateMethod::Ft;
        f.markowitz_strategy = MARKOWITZ_STRATEGY_OG;
        f.build_time_limit = INF;
        f
    }

    /// Attach a problem with a square basis. Copies the column-compressed
    /// constraint matrix view and the basic column selection; performs no
    /// factorization work.
    #[allow(clippy::too_many_arguments)]
    pub fn setup(
        &mut self,
        num_col: Int,
        num_row: Int,
        a_start: &[Int],
        a_index: &[Int],
        a_value: &[f64],
        basic_index: &[Int],
        pivot_threshold: f64,
        pivot_tolerance: f64,
        debug_level: Int,
    ) {
        self.setup_general(
            num_col,
            num_row,
            num_row,
            a_start,
            a_index,
            a_value,
            basic_index,
            pivot_threshold,
            pivot_tolerance,
            debug_level,
            UpdateMethod::Ft,
        );
    }

    /// Rectangular-basis variant: `num_basic` may differ from `num_row`.
    /// The factorization path supports it; FTRAN/BTRAN require a square
    /// basis.
    #[allow(clippy::too_many_arguments)]
    pub fn setup_general(
        &mut self,
        num_col: Int,
        num_row: Int,
        num_basic: Int,
        a_start: &[Int],
        a_index: &[Int],
        a_value: &[f64],
        basic_index: &[Int],
        pivot_threshold: f64,
        pivot_tolerance: f64,
        debug_level: Int,
        update_method: UpdateMethod,
    ) {
        assert!(num_row >= 0 && num_col >= 0 && num_basic >= 0);
        assert_eq!(a_start.len(), num_col as usize + 1);
        assert_eq!(basic_index.len(), num_basic as usize);
        for &var in basic_index {
            assert!(var >= 0 && var < num_col + num_row);
        }

        self.num_col = num_col;
        self.num_row = num_row;
        self.num_basic = num_basic;
        self.a_start = a_start.to_vec();
        self.a_index = a_index.to_vec();
        self.a_value = a_value.to_vec();
        self.basic_index = basic_index.to_vec();
        self.a_matrix_valid = true;

        self.pivot_threshold =
            pivot_threshold.clamp(TINY_VALUE, MAX_PIVOT_THRESHOLD);
        self.pivot_tolerance = pivot_tolerance.clamp(0.0, MAX_PIVOT_THRESHOLD);
        self.debug_level = debug_level;
        self.update_method = update_method;

        let m = num_row as usize;
        let nb = num_basic as usize;

        // Scratch; sized here so later phases never allocate them.
        self.iwork = vec![0; 2 * m.max(nb) + 2];
        self.dwork = vec![0.0; m];

        self.permute = Vec::with_capacity(m.max(nb));

        self.mc_var = vec![-1; nb];
        self.mc_start = vec![0; nb];
        self.mc_count_a = vec![0; nb];
        self.mc_count_n = vec![0; nb];
        self.mc_space = vec![0; nb];
        self.mc_min_pivot = vec![0.0; nb];

        self.mr_start = vec![0; m];
        self.mr_count = vec![0; m];
        self.mr_space = vec![0; m];
        self.mr_count_before = vec![0; m];

        self.mwz_column_index = vec![0; m];
        self.mwz_column_mark = vec![0; m];
        self.mwz_column_array = vec![0.0; m];

        self.col_link_first = vec![-1; m + 2];
        self.col_link_next = vec![-1; nb];
        self.col_link_last = vec![-1; nb];
        self.row_link_first = vec![-1; nb + 2];
        self.row_link_next = vec![-1; m];
        self.row_link_last = vec![-1; m];

        self.l_pivot_lookup = vec![-1; m];
        self.u_pivot_lookup = vec![-1; m];

        self.factor_valid = false;
        self.num_update = 0;
        self.refactor_info.clear();

        log::debug!(
            "factor setup: {} rows, {} cols, {} basic, tau {}, sigma {}",
            num_row,
            num_col,
            num_basic,
            self.pivot_threshold,
            self.pivot_tolerance
        );
    }

    /// Refresh the constraint matrix view after a structural edit.
    pub fn setup_matrix(&mut self, a_start: &[Int], a_index: &[Int], a_value: &[f64]) {
        assert_eq!(a_start.len(), self.num_col as usize + 1);
        self.a_start = a_start.to_vec();
        self.a_index = a_index.to_vec();
        self.a_value = a_value.to_vec();
        self.a_matrix_valid = true;
    }

    /// Mark the constraint matrix view stale. Existing factors remain
    /// usable for solves, but a build (and the alternate product-form
    /// update, which reads A) requires `setup_matrix` first. Replay
    /// information is discarded.
    pub fn invalid_a_matrix_action(&mut self) {
        self.a_matrix_valid = false;
        self.refactor_info.clear();
    }

    /// Set the relative pivot threshold tau; accepted in (0, 0.5].
    pub fn set_pivot_threshold(&mut self, new_pivot_threshold: f64) -> bool {
        if new_pivot_threshold > 0.0 && new_pivot_threshold <= MAX_PIVOT_THRESHOLD {
            self.pivot_threshold = new_pivot_threshold;
            true
        } else {
            false
        }
    }

    /// Set the minimum absolute pivot magnitude; accepted in (0, 0.5].
    pub fn set_min_abs_pivot(&mut self, new_pivot_tolerance: f64) -> bool {
        if new_pivot_tolerance > 0.0 && new_pivot_tolerance <= MAX_PIVOT_THRESHOLD {
            self.pivot_tolerance = new_pivot_tolerance;
            true
        } else {
            false
        }
    }

    /// Switch the update method. Only legal with no pending updates, as
    /// the accumulated eta buffers are method-specific.
    pub fn set_update_method(&mut self, update_method: UpdateMethod) {
        assert_eq!(self.num_update, 0, "update method change with pending updates");
        self.update_method = update_method;
    }

    pub fn update_method(&self) -> UpdateMethod {
        self.update_method
    }

    /// Select a Markowitz search strategy (0..=3). Strategy 0 is the
    /// canonical default.
    pub fn set_markowitz_strategy(&mut self, strategy: Int) -> bool {
        if (MARKOWITZ_STRATEGY_OG..=MARKOWITZ_STRATEGY_ALTERNATE_BEST).contains(&strategy) {
            self.markowitz_strategy = strategy;
            true
        } else {
            false
        }
    }

    /// Cooperative time budget for `build`, in seconds.
    pub fn set_build_time_limit(&mut self, build_time_limit: f64) {
        self.build_time_limit = build_time_limit;
    }

    pub fn num_row(&self) -> Int {
        self.num_row
    }

    pub fn num_col(&self) -> Int {
        self.num_col
    }

    pub fn num_basic(&self) -> Int {
        self.num_basic
    }

    /// Number of updates applied since the last build.
    pub fn num_update(&self) -> Int {
        self.num_update
    }

    /// The basic column selection. After a build this is permuted so that
    /// `basic_index()[row]` is the variable whose column pivots on `row`.
    pub fn basic_index(&self) -> &[Int] {
        &self.basic_index
    }

    /// Mutable access for the simplex driver, which installs the entering
    /// variable after each update.
    pub fn basic_index_mut(&mut self) -> &mut [Int] {
        &mut self.basic_index
    }

    pub fn a_start(&self) -> &[Int] {
        &self.a_start
    }

    pub fn a_index(&self) -> &[Int] {
        &self.a_index
    }

    pub fn a_value(&self) -> &[f64] {
        &self.a_value
    }

    /// Whether a successful build has produced solvable factors.
    pub fn is_factorized(&self) -> bool {
        self.factor_valid
    }

    /// Register `num_new_col` columns appended to the constraint matrix
    /// (all nonbasic). Slack identifiers shift up; L and U stay valid.
    pub fn add_cols(&mut self, num_new_col: Int) {
        assert!(num_new_col >= 0);
        for var in self.basic_index.iter_mut() {
            if *var >= self.num_col {
                *var += num_new_col;
            }
        }
        self.num_col += num_new_col;
        self.invalid_a_matrix_action();
    }

    /// Register deletion of the trailing `num_deleted_col` columns of the
    /// constraint matrix (all nonbasic). Slack identifiers shift down.
    pub fn delete_nonbasic_cols(&mut self, num_deleted_col: Int) {
        assert!(num_deleted_col >= 0 && num_deleted_col <= self.num_col);
        let new_num_col = self.num_col - num_deleted_col;
        for var in self.basic_index.iter_mut() {
            if *var >= self.num_col {
                *var -= num_deleted_col;
            } else {
                assert!(
                    *var < new_num_col,
                    "deleted column {} is basic",
                    *var
                );
            }
        }
        self.num_col = new_num_col;
        self.invalid_a_matrix_action();
    }
}
