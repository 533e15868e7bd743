//! Paytable and win calculation

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::WinTierThresholds;
use crate::error::{EngineResult, SpinError};
use crate::matcher::Cluster;
use crate::symbols::{SymbolId, SymbolSet};

/// A paid cluster as recorded in a cascade step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterWin {
    #[serde(flatten)]
    pub cluster: Cluster,
    /// Size tier index the cluster was paid at
    pub tier: usize,
    /// Win amount (bet × pay value)
    pub win_amount: f64,
}

/// Complete paytable keyed by `(symbol, size tier)`
///
/// Tier `i` covers cluster sizes `size_tiers[i] ..< size_tiers[i + 1]`; the last
/// tier is open-ended (e.g. `[8, 10, 12]` gives 8–9, 10–11, 12+).
#[derive(Debug, Clone)]
pub struct PayTable {
    size_tiers: Vec<u32>,
    pays: BTreeMap<SymbolId, Vec<f64>>,
}

impl PayTable {
    pub fn new(symbols: &SymbolSet, size_tiers: &[u32]) -> EngineResult<Self> {
        if size_tiers.is_empty() {
            return Err(SpinError::InvalidConfig("paytable has no size tiers".into()));
        }
        if size_tiers.windows(2).any(|w| w[0] >= w[1]) {
            return Err(SpinError::InvalidConfig(format!(
                "size tiers {:?} must be strictly ascending",
                size_tiers
            )));
        }

        let mut pays = BTreeMap::new();
        for symbol in symbols.iter().filter(|s| s.clusters()) {
            if symbol.pays.len() != size_tiers.len() {
                return Err(SpinError::InvalidConfig(format!(
                    "symbol {} has {} pay values for {} size tiers",
                    symbol.name,
                    symbol.pays.len(),
                    size_tiers.len()
                )));
            }
            if symbol.pays.iter().any(|p| !p.is_finite() || *p < 0.0) {
                return Err(SpinError::InvalidConfig(format!(
                    "symbol {} has a negative or non-finite pay value",
                    symbol.name
                )));
            }
            pays.insert(symbol.id, symbol.pays.clone());
        }

        Ok(Self {
            size_tiers: size_tiers.to_vec(),
            pays,
        })
    }

    /// Tier index for a cluster size, `None` below the lowest tier
    pub fn tier_for(&self, size: u32) -> Option<usize> {
        self.size_tiers.iter().rposition(|&min| size >= min)
    }

    /// Win for one cluster: `bet × pay(symbol, tier(size))`
    pub fn cluster_win(&self, symbol: SymbolId, size: u32, bet: f64) -> f64 {
        self.tier_for(size)
            .and_then(|tier| self.pays.get(&symbol).and_then(|p| p.get(tier)))
            .map_or(0.0, |pay| bet * pay)
    }

    /// Price every cluster of one cascade step; returns the priced clusters and their sum.
    pub fn cascade_win(&self, clusters: Vec<Cluster>, bet: f64) -> (Vec<ClusterWin>, f64) {
        let wins: Vec<ClusterWin> = clusters
            .into_iter()
            .map(|cluster| {
                let tier = self.tier_for(cluster.size).unwrap_or(0);
                let win_amount = self.cluster_win(cluster.symbol, cluster.size, bet);
                ClusterWin {
                    cluster,
                    tier,
                    win_amount,
                }
            })
            .collect();
        let total = wins.iter().map(|w| w.win_amount).sum();
        (wins, total)
    }

    pub fn size_tiers(&self) -> &[u32] {
        &self.size_tiers
    }
}

/// Presentation tier of a spin's total win
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinTier {
    None,
    Win,
    Big,
    Mega,
    Epic,
    Ultra,
}

impl WinTier {
    /// Classify by win-to-bet ratio
    pub fn classify(total_win: f64, bet: f64, thresholds: &WinTierThresholds) -> Self {
        if total_win <= 0.0 || bet <= 0.0 {
            return Self::None;
        }
        let ratio = total_win / bet;
        if ratio >= thresholds.ultra_win {
            Self::Ultra
        } else if ratio >= thresholds.epic_win {
            Self::Epic
        } else if ratio >= thresholds.mega_win {
            Self::Mega
        } else if ratio >= thresholds.big_win {
            Self::Big
        } else {
            Self::Win
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Position;
    use crate::symbols::{standard_symbols, Symbol};
    use approx::assert_relative_eq;

    fn paytable() -> PayTable {
        let symbols = SymbolSet::new(standard_symbols()).unwrap();
        PayTable::new(&symbols, &[8, 10, 12]).unwrap()
    }

    #[test]
    fn test_tier_banding() {
        let table = paytable();
        assert_eq!(table.tier_for(7), None);
        assert_eq!(table.tier_for(8), Some(0));
        assert_eq!(table.tier_for(9), Some(0));
        assert_eq!(table.tier_for(10), Some(1));
        assert_eq!(table.tier_for(11), Some(1));
        assert_eq!(table.tier_for(12), Some(2));
        assert_eq!(table.tier_for(30), Some(2));
    }

    #[test]
    fn test_cluster_win() {
        let table = paytable();
        // HP1 pays 10 / 25 / 50
        assert_relative_eq!(table.cluster_win(1, 8, 1.0), 10.0);
        assert_relative_eq!(table.cluster_win(1, 11, 2.0), 50.0);
        assert_relative_eq!(table.cluster_win(1, 15, 0.5), 25.0);
        assert_eq!(table.cluster_win(1, 7, 1.0), 0.0);
        // Scatter has no pay entry
        assert_eq!(table.cluster_win(10, 12, 1.0), 0.0);
    }

    #[test]
    fn test_cascade_win_sums_clusters() {
        let table = paytable();
        let clusters = vec![
            Cluster {
                symbol: 1,
                size: 8,
                positions: vec![Position::new(0, 0); 8],
            },
            Cluster {
                symbol: 9,
                size: 12,
                positions: vec![Position::new(1, 0); 12],
            },
        ];
        let (wins, total) = table.cascade_win(clusters, 1.0);
        assert_eq!(wins.len(), 2);
        assert_eq!(wins[1].tier, 2);
        assert_relative_eq!(total, 12.0);
    }

    #[test]
    fn test_rejects_mismatched_pays() {
        let symbols = SymbolSet::new(vec![
            Symbol::regular(1, "A", &[1.0, 2.0]),
            Symbol::scatter(2, "S"),
        ])
        .unwrap();
        assert!(PayTable::new(&symbols, &[8, 10, 12]).is_err());
        assert!(PayTable::new(&symbols, &[10, 8]).is_err());
        assert!(PayTable::new(&symbols, &[8, 10]).is_ok());
    }

    #[test]
    fn test_win_tier_classification() {
        let t = WinTierThresholds::default();
        assert_eq!(WinTier::classify(0.0, 1.0, &t), WinTier::None);
        assert_eq!(WinTier::classify(3.0, 1.0, &t), WinTier::Win);
        assert_eq!(WinTier::classify(15.0, 1.0, &t), WinTier::Big);
        assert_eq!(WinTier::classify(60.0, 2.0, &t), WinTier::Mega);
        assert_eq!(WinTier::classify(500.0, 1.0, &t), WinTier::Ultra);
    }
}
