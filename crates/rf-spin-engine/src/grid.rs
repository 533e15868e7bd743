//! Grid model and Grid Generator

use serde::{Deserialize, Serialize};

use crate::config::GridSpec;
use crate::rng::{DrawStream, RngScope, SpinSeed};
use crate::symbols::SymbolId;
use crate::weighted::WeightedTable;

/// A grid cell: a symbol, or `None` while a cascade has it emptied
pub type Cell = Option<SymbolId>;

/// Grid coordinate (column, row), row 0 at the top
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub col: u8,
    pub row: u8,
}

impl Position {
    pub fn new(col: u8, row: u8) -> Self {
        Self { col, row }
    }
}

/// Fixed-size `cols × rows` symbol matrix, stored column-major
///
/// Serializes as an array of columns, each listed top to bottom.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grid {
    columns: Vec<Vec<Cell>>,
}

impl Grid {
    /// All-empty grid of the given size
    pub fn empty(spec: GridSpec) -> Self {
        Self {
            columns: vec![vec![None; spec.rows as usize]; spec.cols as usize],
        }
    }

    /// Filled grid from columns listed top to bottom
    pub fn from_columns(columns: Vec<Vec<SymbolId>>) -> Self {
        Self {
            columns: columns
                .into_iter()
                .map(|col| col.into_iter().map(Some).collect())
                .collect(),
        }
    }

    pub fn cols(&self) -> usize {
        self.columns.len()
    }

    pub fn rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn spec(&self) -> GridSpec {
        GridSpec {
            cols: self.cols() as u8,
            rows: self.rows() as u8,
        }
    }

    pub fn get(&self, pos: Position) -> Cell {
        self.columns
            .get(pos.col as usize)
            .and_then(|c| c.get(pos.row as usize))
            .copied()
            .flatten()
    }

    pub fn set(&mut self, pos: Position, cell: Cell) {
        if let Some(slot) = self
            .columns
            .get_mut(pos.col as usize)
            .and_then(|c| c.get_mut(pos.row as usize))
        {
            *slot = cell;
        }
    }

    pub fn column(&self, col: usize) -> &[Cell] {
        &self.columns[col]
    }

    pub(crate) fn column_mut(&mut self, col: usize) -> &mut Vec<Cell> {
        &mut self.columns[col]
    }

    pub fn columns(&self) -> &[Vec<Cell>] {
        &self.columns
    }

    /// Every occupied position with its symbol, column-major
    pub fn symbols(&self) -> impl Iterator<Item = (Position, SymbolId)> + '_ {
        self.columns.iter().enumerate().flat_map(|(c, column)| {
            column.iter().enumerate().filter_map(move |(r, cell)| {
                cell.map(|s| (Position::new(c as u8, r as u8), s))
            })
        })
    }

    /// Number of cells holding `symbol`
    pub fn count(&self, symbol: SymbolId) -> usize {
        self.symbols().filter(|&(_, s)| s == symbol).count()
    }

    /// Positions holding `symbol`, column-major
    pub fn positions_of(&self, symbol: SymbolId) -> Vec<Position> {
        self.symbols()
            .filter(|&(_, s)| s == symbol)
            .map(|(p, _)| p)
            .collect()
    }

    pub fn is_full(&self) -> bool {
        self.columns.iter().flatten().all(Option::is_some)
    }

    /// Gravity resolved: no column has an empty cell below a filled cell.
    pub fn is_settled(&self) -> bool {
        self.columns.iter().all(|column| {
            let first_filled = column.iter().position(Option::is_some).unwrap_or(column.len());
            column[first_filled..].iter().all(Option::is_some)
        })
    }

    /// Sorted symbol multiset of one column (empties skipped)
    pub fn column_multiset(&self, col: usize) -> Vec<SymbolId> {
        let mut symbols: Vec<SymbolId> = self.columns[col].iter().flatten().copied().collect();
        symbols.sort_unstable();
        symbols
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SYMBOL SOURCES
// ═══════════════════════════════════════════════════════════════════════════════

/// Supplies symbols for the initial fill and every refill of one spin
pub trait SymbolSource {
    /// Next symbol in draw order
    fn next_symbol(&mut self) -> SymbolId;

    /// Number of symbols drawn so far
    fn drawn(&self) -> u64;
}

/// Seeded source: one grid-stream draw per symbol, mapped through the weights
pub struct WeightedSource<'a> {
    table: &'a WeightedTable<SymbolId>,
    stream: DrawStream,
}

impl<'a> WeightedSource<'a> {
    pub fn new(seed: &SpinSeed, table: &'a WeightedTable<SymbolId>) -> Self {
        Self {
            table,
            stream: DrawStream::new(seed, RngScope::Grid),
        }
    }
}

impl SymbolSource for WeightedSource<'_> {
    fn next_symbol(&mut self) -> SymbolId {
        self.table.pick(self.stream.next_f64())
    }

    fn drawn(&self) -> u64 {
        self.stream.cursor()
    }
}

/// Scripted source for replaying recorded reels and forcing outcomes
///
/// Yields `script` in order, then repeats `tail` forever. With an empty tail
/// the script itself repeats.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    script: Vec<SymbolId>,
    tail: Vec<SymbolId>,
    drawn: u64,
}

impl ScriptedSource {
    pub fn new(script: Vec<SymbolId>, tail: Vec<SymbolId>) -> Self {
        Self {
            script,
            tail,
            drawn: 0,
        }
    }

    /// Script an initial grid (columns top to bottom) followed by `tail` refills
    pub fn from_grid(columns: &[Vec<SymbolId>], tail: Vec<SymbolId>) -> Self {
        Self::new(columns.iter().flatten().copied().collect(), tail)
    }
}

impl SymbolSource for ScriptedSource {
    fn next_symbol(&mut self) -> SymbolId {
        let idx = self.drawn as usize;
        self.drawn += 1;
        if let Some(&symbol) = self.script.get(idx) {
            return symbol;
        }
        let (pool, offset) = if self.tail.is_empty() {
            (&self.script, idx)
        } else {
            (&self.tail, idx - self.script.len())
        };
        if pool.is_empty() {
            return SymbolId::default();
        }
        pool[offset % pool.len()]
    }

    fn drawn(&self) -> u64 {
        self.drawn
    }
}

/// Fill every cell in fixed column-major, top-to-bottom order.
pub fn fill(spec: GridSpec, source: &mut dyn SymbolSource) -> Grid {
    let mut grid = Grid::empty(spec);
    for column in &mut grid.columns {
        for cell in column.iter_mut() {
            *cell = Some(source.next_symbol());
        }
    }
    grid
}

/// Generate a full grid from a seed and a symbol weight table.
pub fn generate(spec: GridSpec, seed: &SpinSeed, weights: &WeightedTable<SymbolId>) -> Grid {
    let mut source = WeightedSource::new(seed, weights);
    fill(spec, &mut source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weighted::Weighted;

    fn weights() -> WeightedTable<SymbolId> {
        WeightedTable::new(
            &[Weighted::new(1, 5.0), Weighted::new(2, 3.0), Weighted::new(3, 1.0)],
            "symbol",
        )
        .unwrap()
    }

    #[test]
    fn test_generate_fills_every_cell() {
        let spec = GridSpec { cols: 6, rows: 5 };
        let seed = SpinSeed::parse("grid-fill").unwrap();
        let grid = generate(spec, &seed, &weights());
        assert_eq!(grid.cols(), 6);
        assert_eq!(grid.rows(), 5);
        assert!(grid.is_full());
        assert!(grid.is_settled());
    }

    #[test]
    fn test_generate_is_deterministic() {
        let spec = GridSpec { cols: 6, rows: 5 };
        let table = weights();
        let a = generate(spec, &SpinSeed::parse("same").unwrap(), &table);
        let b = generate(spec, &SpinSeed::parse("same").unwrap(), &table);
        let c = generate(spec, &SpinSeed::parse("other").unwrap(), &table);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_settled_detection() {
        let mut grid = Grid::from_columns(vec![vec![1, 2, 3], vec![1, 2, 3]]);
        assert!(grid.is_settled());

        grid.set(Position::new(0, 0), None);
        assert!(grid.is_settled(), "hole at the top is settled");

        grid.set(Position::new(1, 2), None);
        assert!(!grid.is_settled(), "hole at the bottom is not");
    }

    #[test]
    fn test_counts_and_positions() {
        let grid = Grid::from_columns(vec![vec![1, 2, 1], vec![3, 1, 2]]);
        assert_eq!(grid.count(1), 3);
        assert_eq!(
            grid.positions_of(2),
            vec![Position::new(0, 1), Position::new(1, 2)]
        );
        assert_eq!(grid.column_multiset(1), vec![1, 2, 3]);
    }

    #[test]
    fn test_scripted_source_replays_grid_then_tail() {
        let columns = vec![vec![1, 2], vec![3, 1]];
        let mut source = ScriptedSource::from_grid(&columns, vec![7, 8]);
        let grid = fill(GridSpec { cols: 2, rows: 2 }, &mut source);
        assert_eq!(grid, Grid::from_columns(columns));
        let tail: Vec<SymbolId> = (0..5).map(|_| source.next_symbol()).collect();
        assert_eq!(tail, vec![7, 8, 7, 8, 7]);
        assert_eq!(source.drawn(), 9);
    }

    #[test]
    fn test_serializes_as_columns() {
        let mut grid = Grid::from_columns(vec![vec![1, 2], vec![3, 4]]);
        grid.set(Position::new(1, 0), None);
        let json = serde_json::to_string(&grid).unwrap();
        assert_eq!(json, "[[1,2],[null,4]]");
    }
}
