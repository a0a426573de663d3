//! Numeric policy constants and small shared types.

/// Engine integer type.
///
/// All indices in the engine are of this signed type. Negative values are
/// sentinels: `-1` marks "none" in lookups and queues, and the count-bucket
/// lists encode their head links as `-2 - count` (see `links`).
pub type Int = i64;

/// Values below this magnitude are treated as zero and dropped from the
/// kernel and from solve results.
pub const TINY_VALUE: f64 = 1e-14;

/// Infinity for time limits and merit initialization.
pub const INF: f64 = f64::INFINITY;

/// Placeholder stored when a solve cancels an entry to exactly zero, so
/// the index list stays free of duplicates. Dropped by the final tighten.
pub const SOLVE_ZERO: f64 = 1e-100;

/// Default relative pivot threshold tau. A kernel pivot must satisfy
/// |pivot| >= tau * max|entry in its column|.
pub const DEFAULT_PIVOT_THRESHOLD: f64 = 0.1;

/// Largest accepted pivot threshold. Beyond 0.5 the Markowitz search
/// degenerates into partial pivoting and fill explodes.
pub const MAX_PIVOT_THRESHOLD: f64 = 0.5;

/// Default minimum absolute pivot magnitude. A candidate below this is
/// rejected as if no pivot existed.
pub const DEFAULT_PIVOT_TOLERANCE: f64 = 1e-10;

/// Number of nonempty count buckets inspected by the kernel pivot search
/// once a candidate has been found.
pub const MAX_KERNEL_SEARCH: Int = 8;

/// How many kernel pivots are performed between time-limit checks.
pub const KERNEL_TIME_CHECK_INTERVAL: Int = 128;

/// Expected or observed density above which solves scan the full array.
pub const DENSE_SOLVE_DENSITY: f64 = 0.4;

/// Expected density below which solves use the hyper-sparse DFS kernels.
pub const HYPER_SOLVE_DENSITY: f64 = 0.1;

// Markowitz search strategies. Strategy 0 is canonical; 1-3 vary only the
// scan order and termination granularity and are experimental.
pub const MARKOWITZ_STRATEGY_OG: Int = 0;
pub const MARKOWITZ_STRATEGY_REFINED: Int = 1;
pub const MARKOWITZ_STRATEGY_SWITCHED: Int = 2;
pub const MARKOWITZ_STRATEGY_ALTERNATE_BEST: Int = 3;

/// How one basis-column replacement is folded into the factorization.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMethod {
    /// Forrest-Tomlin: splice the new column into U, collect a row eta.
    #[default]
    Ft,
    /// Product form: append an eta built from the solved entering column.
    Pf,
    /// Middle product form: eta pair applied between L and U.
    Mpf,
    /// Alternate product form: eta pair applied outside L and U.
    Apf,
}

/// Outcome signal of `Factor::update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum UpdateHint {
    /// Update applied; the factorization remains serviceable.
    Fine,
    /// The caller should refactorize before the next solve. When the
    /// incoming pivot failed the tolerance check the update was not
    /// applied; otherwise it was applied but quality is degrading.
    Reinvert,
}

/// Which factor `Factor::report_lu` dumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLuPart {
    L,
    U,
    Both,
}

/// Provenance of a pivot, recorded for refactorization replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotType {
    /// Slack (identity) column, or a substituted slack after rank
    /// deficiency.
    Logical,
    /// Structural column with a single eligible entry.
    ColSingleton,
    /// Chosen by the Markowitz-threshold kernel search.
    Markowitz,
}
