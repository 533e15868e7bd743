//! Symbol definitions

use serde::{Deserialize, Serialize};

use crate::error::{EngineResult, SpinError};

/// Symbol identifier as it appears in grids
pub type SymbolId = u32;

/// Symbol classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// Paying symbol, counted for clusters
    Regular,
    /// Triggers and retriggers bonus mode by count, never clusters
    Scatter,
    /// Visual/feature symbol that neither clusters nor triggers
    Special,
}

/// A symbol definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    /// Unique symbol ID
    pub id: SymbolId,
    /// Symbol name (e.g., "HP1", "LP3", "SCATTER")
    pub name: String,
    /// Symbol classification
    pub kind: SymbolKind,
    /// Pay values (bet multiples) per cluster size tier, lowest tier first
    #[serde(default)]
    pub pays: Vec<f64>,
}

impl Symbol {
    /// Create a regular paying symbol
    pub fn regular(id: SymbolId, name: impl Into<String>, pays: &[f64]) -> Self {
        Self {
            id,
            name: name.into(),
            kind: SymbolKind::Regular,
            pays: pays.to_vec(),
        }
    }

    /// Create a scatter symbol
    pub fn scatter(id: SymbolId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: SymbolKind::Scatter,
            pays: Vec::new(),
        }
    }

    /// Create a non-paying special symbol
    pub fn special(id: SymbolId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: SymbolKind::Special,
            pays: Vec::new(),
        }
    }

    /// Does this symbol take part in cluster counting?
    pub fn clusters(&self) -> bool {
        self.kind == SymbolKind::Regular
    }
}

/// Validated symbol set with exactly one scatter
#[derive(Debug, Clone)]
pub struct SymbolSet {
    symbols: Vec<Symbol>,
    scatter_id: SymbolId,
}

impl SymbolSet {
    pub fn new(symbols: Vec<Symbol>) -> EngineResult<Self> {
        let mut seen = std::collections::BTreeSet::new();
        for symbol in &symbols {
            if !seen.insert(symbol.id) {
                return Err(SpinError::InvalidConfig(format!(
                    "duplicate symbol id {}",
                    symbol.id
                )));
            }
        }

        let mut scatters = symbols.iter().filter(|s| s.kind == SymbolKind::Scatter);
        let scatter_id = match (scatters.next(), scatters.next()) {
            (Some(s), None) => s.id,
            (None, _) => {
                return Err(SpinError::InvalidConfig("symbol set has no scatter".into()));
            }
            (Some(_), Some(_)) => {
                return Err(SpinError::InvalidConfig(
                    "symbol set has more than one scatter".into(),
                ));
            }
        };

        if !symbols.iter().any(Symbol::clusters) {
            return Err(SpinError::InvalidConfig(
                "symbol set has no regular symbols".into(),
            ));
        }

        Ok(Self {
            symbols,
            scatter_id,
        })
    }

    /// Get symbol by ID
    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: SymbolId) -> bool {
        self.get(id).is_some()
    }

    /// Regular symbol IDs in definition order
    pub fn regular_ids(&self) -> Vec<SymbolId> {
        self.symbols
            .iter()
            .filter(|s| s.clusters())
            .map(|s| s.id)
            .collect()
    }

    pub fn scatter_id(&self) -> SymbolId {
        self.scatter_id
    }

    /// Can this symbol form clusters?
    pub fn is_clustering(&self, id: SymbolId) -> bool {
        self.get(id).is_some_and(Symbol::clusters)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Reference symbol set for the default 6×5 pay-anywhere game
///
/// Pays are bet multiples for the 8–9, 10–11 and 12+ tiers.
/// HP = high paying, LP = low paying.
pub fn standard_symbols() -> Vec<Symbol> {
    vec![
        Symbol::regular(1, "HP1", &[10.0, 25.0, 50.0]),
        Symbol::regular(2, "HP2", &[2.5, 10.0, 25.0]),
        Symbol::regular(3, "HP3", &[2.0, 5.0, 15.0]),
        Symbol::regular(4, "HP4", &[1.5, 2.0, 12.0]),
        Symbol::regular(5, "LP1", &[1.0, 1.5, 10.0]),
        Symbol::regular(6, "LP2", &[0.8, 1.2, 8.0]),
        Symbol::regular(7, "LP3", &[0.5, 1.0, 5.0]),
        Symbol::regular(8, "LP4", &[0.4, 0.9, 4.0]),
        Symbol::regular(9, "LP5", &[0.25, 0.75, 2.0]),
        Symbol::scatter(10, "SCATTER"),
    ]
}
