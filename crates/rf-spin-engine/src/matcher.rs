//! Match Detector — pay-anywhere cluster counting
//!
//! A cluster is every position of one regular symbol on the grid. Adjacency
//! plays no part: two symbols at opposite corners belong to the same cluster.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::grid::{Grid, Position};
use crate::symbols::{SymbolId, SymbolSet};

/// All positions of one symbol type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub symbol: SymbolId,
    pub size: u32,
    /// Column-major
    pub positions: Vec<Position>,
}

/// Find every regular symbol whose grid-wide count reaches `min_count`.
///
/// Clusters are returned in ascending symbol id order. An empty result is the
/// terminal condition of the cascade loop.
pub fn find_matches(grid: &Grid, symbols: &SymbolSet, min_count: u32) -> Vec<Cluster> {
    let mut by_symbol: BTreeMap<SymbolId, Vec<Position>> = BTreeMap::new();
    for (pos, symbol) in grid.symbols() {
        if symbols.is_clustering(symbol) {
            by_symbol.entry(symbol).or_default().push(pos);
        }
    }

    by_symbol
        .into_iter()
        .filter(|(_, positions)| positions.len() as u32 >= min_count)
        .map(|(symbol, positions)| Cluster {
            symbol,
            size: positions.len() as u32,
            positions,
        })
        .collect()
}

/// Number of scatters currently on the grid
pub fn count_scatters(grid: &Grid, symbols: &SymbolSet) -> u32 {
    grid.count(symbols.scatter_id()) as u32
}
