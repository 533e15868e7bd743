//! Cascade Processor — match → remove → drop → refill until no clusters remain
//!
//! ```text
//! Scanning ──(no clusters)──> Done
//!    │
//!    └─(clusters)─> Matched ─> Removing ─> Dropping ─> Refilling ─┐
//!    ^                                                           │
//!    └───────────────────────────────────────────────────────────┘
//! ```
//!
//! One [`CascadeStep`] is recorded per Matched→Refilling traversal. Steps are
//! immutable once appended.

use serde::{Deserialize, Serialize};

use crate::error::{EngineResult, SpinError};
use crate::grid::{Cell, Grid, SymbolSource};
use crate::matcher::{count_scatters, find_matches, Cluster};
use crate::paytable::{ClusterWin, PayTable};
use crate::symbols::{SymbolId, SymbolSet};

/// A surviving symbol falling within its column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolShift {
    pub symbol: SymbolId,
    pub from_row: u8,
    pub to_row: u8,
}

/// A fresh symbol entering at the top of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refill {
    pub row: u8,
    pub symbol: SymbolId,
}

/// Everything that happened to one column during a cascade step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDrop {
    pub col: u8,
    /// Rows emptied by removal, top to bottom
    pub removed_rows: Vec<u8>,
    /// Survivors that moved, top to bottom
    pub shifts: Vec<SymbolShift>,
    /// New symbols in draw order, top to bottom
    pub refills: Vec<Refill>,
}

/// One recorded cascade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeStep {
    pub index: u32,
    pub grid_before: Grid,
    pub matched_clusters: Vec<ClusterWin>,
    /// Sum of cluster wins, before any multiplier
    pub win_amount: f64,
    pub grid_after_removal: Grid,
    /// Only columns that lost at least one symbol
    pub drop_pattern: Vec<ColumnDrop>,
    pub grid_after: Grid,
}

/// Result of running the cascade loop on one initial grid
#[derive(Debug, Clone)]
pub struct CascadeOutcome {
    pub steps: Vec<CascadeStep>,
    pub final_grid: Grid,
    /// Sum of step wins, before any multiplier
    pub base_win: f64,
    /// Highest scatter count seen on the initial or any post-cascade grid
    pub peak_scatter_count: u32,
}

/// Cascade Processor
pub struct CascadeProcessor<'a> {
    symbols: &'a SymbolSet,
    paytable: &'a PayTable,
    min_match_count: u32,
    max_cascades: u32,
}

impl<'a> CascadeProcessor<'a> {
    pub fn new(
        symbols: &'a SymbolSet,
        paytable: &'a PayTable,
        min_match_count: u32,
        max_cascades: u32,
    ) -> Self {
        Self {
            symbols,
            paytable,
            min_match_count,
            max_cascades,
        }
    }

    /// Run the loop from `initial`, refilling from `source`.
    ///
    /// Fails with [`SpinError::CascadeOverflow`] if clusters are still present
    /// after `max_cascades` steps.
    pub fn run(
        &self,
        initial: &Grid,
        bet: f64,
        source: &mut dyn SymbolSource,
    ) -> EngineResult<CascadeOutcome> {
        let mut grid = initial.clone();
        let mut steps: Vec<CascadeStep> = Vec::new();
        let mut peak_scatter_count = count_scatters(&grid, self.symbols);

        loop {
            let clusters = find_matches(&grid, self.symbols, self.min_match_count);
            if clusters.is_empty() {
                log::trace!("cascade scan {}: no clusters, done", steps.len());
                break;
            }
            if steps.len() as u32 >= self.max_cascades {
                log::error!(
                    "cascade ceiling of {} steps exceeded, spin voided",
                    self.max_cascades
                );
                return Err(SpinError::CascadeOverflow {
                    limit: self.max_cascades,
                });
            }

            let step = self.step(steps.len() as u32, grid, clusters, bet, source);
            log::trace!(
                "cascade {}: {} clusters, win {:.2}",
                step.index,
                step.matched_clusters.len(),
                step.win_amount
            );
            grid = step.grid_after.clone();
            peak_scatter_count = peak_scatter_count.max(count_scatters(&grid, self.symbols));
            steps.push(step);
        }

        let base_win = steps.iter().map(|s| s.win_amount).sum();
        Ok(CascadeOutcome {
            steps,
            final_grid: grid,
            base_win,
            peak_scatter_count,
        })
    }

    fn step(
        &self,
        index: u32,
        grid_before: Grid,
        clusters: Vec<Cluster>,
        bet: f64,
        source: &mut dyn SymbolSource,
    ) -> CascadeStep {
        let grid_after_removal = remove_clusters(&grid_before, &clusters);
        let (matched_clusters, win_amount) = self.paytable.cascade_win(clusters, bet);
        let (grid_after, drop_pattern) = drop_and_refill(&grid_after_removal, source);

        CascadeStep {
            index,
            grid_before,
            matched_clusters,
            win_amount,
            grid_after_removal,
            drop_pattern,
            grid_after,
        }
    }
}

/// Empty every cell belonging to a matched cluster.
pub fn remove_clusters(grid: &Grid, clusters: &[Cluster]) -> Grid {
    let mut removed = grid.clone();
    for pos in clusters.iter().flat_map(|c| &c.positions) {
        removed.set(*pos, None);
    }
    removed
}

/// Stable gravity for one column: survivors fall keeping their order, empties rise.
pub fn collapse_column(column: &[Cell]) -> (Vec<Cell>, Vec<SymbolShift>) {
    let survivors: Vec<(usize, SymbolId)> = column
        .iter()
        .enumerate()
        .filter_map(|(row, cell)| cell.map(|s| (row, s)))
        .collect();
    let empties = column.len() - survivors.len();

    let mut collapsed = vec![None; empties];
    let mut shifts = Vec::new();
    for (k, &(from, symbol)) in survivors.iter().enumerate() {
        let to = empties + k;
        if from != to {
            shifts.push(SymbolShift {
                symbol,
                from_row: from as u8,
                to_row: to as u8,
            });
        }
        collapsed.push(Some(symbol));
    }
    (collapsed, shifts)
}

/// Drop survivors and refill the top of every column, column by column.
pub fn drop_and_refill(grid: &Grid, source: &mut dyn SymbolSource) -> (Grid, Vec<ColumnDrop>) {
    let mut next = grid.clone();
    let mut pattern = Vec::new();

    for col in 0..grid.cols() {
        let column = grid.column(col);
        let removed_rows: Vec<u8> = column
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(|(row, _)| row as u8)
            .collect();
        if removed_rows.is_empty() {
            continue;
        }

        let (mut collapsed, shifts) = collapse_column(column);
        let mut refills = Vec::with_capacity(removed_rows.len());
        for (row, cell) in collapsed.iter_mut().enumerate().take(removed_rows.len()) {
            let symbol = source.next_symbol();
            *cell = Some(symbol);
            refills.push(Refill {
                row: row as u8,
                symbol,
            });
        }
        *next.column_mut(col) = collapsed;

        pattern.push(ColumnDrop {
            col: col as u8,
            removed_rows,
            shifts,
            refills,
        });
    }

    (next, pattern)
}
