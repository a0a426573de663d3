// Copyright (C) 2016-2018  ERGO-Code

//! Diagnostic dump of the factors.

use std::fmt::Write;

use crate::consts::*;
use crate::factor::Factor;

impl Factor {
    /// Render the requested factor(s) as text. With `full` the entries
    /// are listed pivot by pivot, otherwise only the summary line per
    /// factor is produced. Advisory output for debugging sessions; the
    /// engine never parses it back.
    pub fn report_lu(&self, l_u_or_both: ReportLuPart, full: bool) -> String {
        let mut out = String::new();
        let kk = self.u_pivot_index.len();
        if matches!(l_u_or_both, ReportLuPart::L | ReportLuPart::Both) {
            let _ = writeln!(
                out,
                "L: {} columns, {} off-diagonal nonzeros",
                kk,
                self.l_index.len()
            );
            if full {
                for k in 0..kk {
                    let _ = write!(out, "  col {:4} (row {:4}):", k, self.l_pivot_index[k]);
                    for pos in self.l_start[k] as usize..self.l_start[k + 1] as usize {
                        let _ = write!(
                            out,
                            " ({}, {:.6e})",
                            self.l_index[pos], self.l_value[pos]
                        );
                    }
                    let _ = writeln!(out);
                }
            }
        }
        if matches!(l_u_or_both, ReportLuPart::U | ReportLuPart::Both) {
            let live = self
                .u_pivot_index
                .iter()
                .filter(|&&p| p >= 0)
                .count();
            let _ = writeln!(
                out,
                "U: {} pivots ({} live), {} off-diagonal nonzeros",
                kk,
                live,
                self.u_index.len()
            );
            if full {
                for k in 0..kk {
                    let p = self.u_pivot_index[k];
                    if p < 0 {
                        let _ = writeln!(out, "  col {:4} retired", k);
                        continue;
                    }
                    let _ = write!(
                        out,
                        "  col {:4} (row {:4}, pivot {:.6e}):",
                        k, p, self.u_pivot_value[k]
                    );
                    for pos in self.u_start[k] as usize..self.u_last_p[k] as usize {
                        let _ = write!(
                            out,
                            " ({}, {:.6e})",
                            self.u_index[pos], self.u_value[pos]
                        );
                    }
                    let _ = writeln!(out);
                }
            }
        }
        out
    }
}
