//! Sparse basis matrix factorization, update and solves for simplex-type
//! solvers.
//!
//! Given a column-compressed constraint matrix A and an ordered selection
//! of basic columns, [`Factor::build`] produces a triangular
//! factorization PBQ = LU by Markowitz-threshold pivoting, reports rank
//! deficiency with the offending rows and columns, and supports
//!
//!  - repeated solves B x = b ([`Factor::ftran`]) and B^T x = b
//!    ([`Factor::btran`]) with density-adaptive sparse and hyper-sparse
//!    kernels, and
//!  - rank-one basis updates ([`Factor::update`]) by Forrest-Tomlin or
//!    one of the product-form variants, amortizing the factorization
//!    over many simplex iterations.
//!
//! Right-hand sides live in [`HVector`], a dense array paired with an
//! index list of nonzeros. After a build, `basic_index` is permuted so
//! that position and pivot row coincide; solutions are indexed by row.
//!
//! ```
//! use bfactor::{Factor, HVector};
//!
//! // 2x2 basis from the columns of A = [[2, 1], [1, 3]].
//! let a_start = [0i64, 2, 4];
//! let a_index = [0i64, 1, 0, 1];
//! let a_value = [2.0, 1.0, 1.0, 3.0];
//! let basic_index = [0i64, 1];
//! let mut factor = Factor::new();
//! factor.setup(2, 2, &a_start, &a_index, &a_value, &basic_index, 0.1, 1e-10, 0);
//! assert_eq!(factor.build().unwrap(), 0);
//!
//! let mut rhs = HVector::new(2);
//! rhs.set(0, 5.0);
//! rhs.set(1, 10.0);
//! factor.ftran(&mut rhs, 1.0);
//! assert!((rhs.array[0] - 1.0).abs() < 1e-12);
//! assert!((rhs.array[1] - 3.0).abs() < 1e-12);
//! ```

mod build;
mod consts;
mod deficiency;
mod factor;
mod hvector;
mod kernel;
mod links;
mod refactor;
mod report;
mod solve;
mod update;

pub use consts::{
    Int, PivotType, ReportLuPart, UpdateHint, UpdateMethod, DEFAULT_PIVOT_THRESHOLD,
    DEFAULT_PIVOT_TOLERANCE, INF, MARKOWITZ_STRATEGY_ALTERNATE_BEST, MARKOWITZ_STRATEGY_OG,
    MARKOWITZ_STRATEGY_REFINED, MARKOWITZ_STRATEGY_SWITCHED, MAX_KERNEL_SEARCH,
    MAX_PIVOT_THRESHOLD, TINY_VALUE,
};
pub use factor::{Factor, FactorError};
pub use hvector::HVector;
pub use refactor::RefactorInfo;
