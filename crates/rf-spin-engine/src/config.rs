//! Spin engine configuration
//!
//! Every policy constant of the game (grid size, thresholds, awards, tables)
//! lives here rather than in code, so math tuning never needs a rebuild.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineResult, SpinError};
use crate::symbols::{standard_symbols, Symbol, SymbolId};
use crate::weighted::Weighted;

/// Grid specification (columns × rows)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSpec {
    /// Number of columns (reels)
    pub cols: u8,
    /// Number of rows per column
    pub rows: u8,
}

impl GridSpec {
    /// Standard 6×5 pay-anywhere grid
    pub fn standard_6x5() -> Self {
        Self { cols: 6, rows: 5 }
    }

    /// Total grid positions
    pub fn total_positions(&self) -> usize {
        self.cols as usize * self.rows as usize
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        Self::standard_6x5()
    }
}

/// Accepted bet range (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetLimits {
    pub min_bet: f64,
    pub max_bet: f64,
}

impl BetLimits {
    pub fn contains(&self, bet: f64) -> bool {
        bet.is_finite() && bet >= self.min_bet && bet <= self.max_bet
    }
}

impl Default for BetLimits {
    fn default() -> Self {
        Self {
            min_bet: 0.20,
            max_bet: 100.0,
        }
    }
}

/// Thresholds for categorizing wins (bet multiples)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinTierThresholds {
    /// Minimum ratio for "big win"
    pub big_win: f64,
    /// Minimum ratio for "mega win"
    pub mega_win: f64,
    /// Minimum ratio for "epic win"
    pub epic_win: f64,
    /// Minimum ratio for "ultra win"
    pub ultra_win: f64,
}

impl Default for WinTierThresholds {
    fn default() -> Self {
        Self {
            big_win: 15.0,
            mega_win: 25.0,
            epic_win: 50.0,
            ultra_win: 100.0,
        }
    }
}

/// One multiplier trigger site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiplierSiteConfig {
    /// Site is evaluated at all
    pub enabled: bool,
    /// Probability that an eligible evaluation fires
    pub trigger_chance: f64,
    /// Evaluation requires `win / bet` strictly above this ratio
    pub min_win_ratio: f64,
    /// Multiplier values and their weights
    pub values: Vec<Weighted<f64>>,
    /// Number of simultaneous sub-events per trigger and their weights
    pub burst_sizes: Vec<Weighted<u32>>,
}

impl MultiplierSiteConfig {
    /// Site that never fires
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            trigger_chance: 0.0,
            min_win_ratio: 0.0,
            values: standard_multiplier_values(),
            burst_sizes: vec![Weighted::new(1, 1.0)],
        }
    }

    /// Site that fires on every eligible evaluation with one fixed value
    pub fn always(value: f64) -> Self {
        Self {
            enabled: true,
            trigger_chance: 1.0,
            min_win_ratio: 0.0,
            values: vec![Weighted::new(value, 1.0)],
            burst_sizes: vec![Weighted::new(1, 1.0)],
        }
    }
}

/// Weighted multiplier values shared by both sites by default (2×…500×)
pub fn standard_multiplier_values() -> Vec<Weighted<f64>> {
    [
        (2.0, 500.0),
        (3.0, 250.0),
        (4.0, 120.0),
        (5.0, 80.0),
        (6.0, 50.0),
        (8.0, 30.0),
        (10.0, 20.0),
        (12.0, 12.0),
        (15.0, 8.0),
        (20.0, 5.0),
        (25.0, 3.0),
        (50.0, 2.0),
        (100.0, 1.0),
        (250.0, 0.5),
        (500.0, 0.2),
    ]
    .into_iter()
    .map(|(value, weight)| Weighted::new(value, weight))
    .collect()
}

/// Multiplier Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiplierConfig {
    /// Evaluated after every winning cascade step
    pub cascade: MultiplierSiteConfig,
    /// Evaluated once at spin end
    pub spin: MultiplierSiteConfig,
    /// Visual characters a sub-event may be presented by
    pub characters: Vec<String>,
    /// Also suppress multipliers on bonus-mode retrigger spins
    pub suppress_on_retrigger: bool,
}

impl Default for MultiplierConfig {
    fn default() -> Self {
        Self {
            cascade: MultiplierSiteConfig {
                enabled: true,
                trigger_chance: 0.04,
                min_win_ratio: 0.0,
                values: standard_multiplier_values(),
                burst_sizes: vec![Weighted::new(1, 1.0)],
            },
            spin: MultiplierSiteConfig {
                enabled: true,
                trigger_chance: 0.03,
                min_win_ratio: 0.0,
                values: standard_multiplier_values(),
                burst_sizes: vec![
                    Weighted::new(1, 85.0),
                    Weighted::new(2, 12.0),
                    Weighted::new(3, 3.0),
                ],
            },
            characters: vec!["oracle".into(), "titan".into(), "phoenix".into()],
            suppress_on_retrigger: false,
        }
    }
}

/// Bonus Engine (free spins) configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusConfig {
    /// Scatters needed to enter bonus mode from base
    pub trigger_scatter_count: u32,
    /// Spins awarded on entry
    pub trigger_award: u32,
    /// Retriggers are possible during bonus mode
    pub retrigger_enabled: bool,
    /// Scatters needed to retrigger during bonus mode
    pub retrigger_scatter_count: u32,
    /// Spins added on retrigger
    pub retrigger_award: u32,
    /// Honor a caller's claim of a fresh bonus entry the store has not recorded.
    /// Off by default: the trigger spin already saves the entered state.
    pub accept_fresh_entry_claims: bool,
}

impl Default for BonusConfig {
    fn default() -> Self {
        Self {
            trigger_scatter_count: 4,
            trigger_award: 15,
            retrigger_enabled: true,
            retrigger_scatter_count: 4,
            retrigger_award: 5,
            accept_fresh_entry_claims: false,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Game name for logs
    pub name: String,
    /// Grid size
    pub grid: GridSpec,
    /// Symbol definitions with per-tier pays
    pub symbols: Vec<Symbol>,
    /// Symbol distribution in base mode
    pub base_weights: Vec<Weighted<SymbolId>>,
    /// Symbol distribution in bonus mode (base weights when absent)
    pub bonus_weights: Option<Vec<Weighted<SymbolId>>>,
    /// Lower bound of each cluster size tier, ascending
    pub size_tiers: Vec<u32>,
    /// Minimum grid-wide count for a cluster to win
    pub min_match_count: u32,
    /// Accepted bet range
    pub bet_limits: BetLimits,
    /// Safety ceiling on cascade steps per spin
    pub max_cascades: u32,
    /// Multiplier Engine settings
    pub multipliers: MultiplierConfig,
    /// Bonus Engine settings
    pub bonus: BonusConfig,
    /// Presentation tiers
    pub win_tiers: WinTierThresholds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "Cascade Standard 6x5".into(),
            grid: GridSpec::default(),
            symbols: standard_symbols(),
            base_weights: standard_weights(),
            bonus_weights: None,
            size_tiers: vec![8, 10, 12],
            min_match_count: 8,
            bet_limits: BetLimits::default(),
            max_cascades: 200,
            multipliers: MultiplierConfig::default(),
            bonus: BonusConfig::default(),
            win_tiers: WinTierThresholds::default(),
        }
    }
}

/// Base-mode weights for [`standard_symbols`]
pub fn standard_weights() -> Vec<Weighted<SymbolId>> {
    [
        (1, 4.0),
        (2, 6.0),
        (3, 8.0),
        (4, 10.0),
        (5, 12.0),
        (6, 14.0),
        (7, 16.0),
        (8, 18.0),
        (9, 20.0),
        (10, 2.5),
    ]
    .into_iter()
    .map(|(id, weight)| Weighted::new(id, weight))
    .collect()
}

impl EngineConfig {
    /// Check the scalar settings and cross-references.
    ///
    /// Table contents (weights, pays, tiers) are checked when the engine
    /// compiles them; [`crate::SpinEngine::new`] runs both.
    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |msg: String| Err(SpinError::InvalidConfig(msg));

        if self.grid.cols == 0 || self.grid.rows == 0 {
            return invalid(format!(
                "grid must be at least 1×1, got {}×{}",
                self.grid.cols, self.grid.rows
            ));
        }
        if self.min_match_count == 0 {
            return invalid("min_match_count must be at least 1".into());
        }
        if self.size_tiers.first().is_some_and(|&t| t != self.min_match_count) {
            return invalid(format!(
                "lowest size tier {} must equal min_match_count {}",
                self.size_tiers[0], self.min_match_count
            ));
        }
        let limits = self.bet_limits;
        if !(limits.min_bet.is_finite() && limits.max_bet.is_finite())
            || limits.min_bet <= 0.0
            || limits.min_bet > limits.max_bet
        {
            return invalid(format!(
                "bet limits [{}, {}] are not a positive range",
                limits.min_bet, limits.max_bet
            ));
        }
        if self.max_cascades == 0 {
            return invalid("max_cascades must be at least 1".into());
        }

        for (what, weights) in std::iter::once(("base", &self.base_weights))
            .chain(self.bonus_weights.iter().map(|w| ("bonus", w)))
        {
            if let Some(w) = weights
                .iter()
                .find(|w| !self.symbols.iter().any(|s| s.id == w.value))
            {
                return invalid(format!("{} weights reference unknown symbol {}", what, w.value));
            }
        }

        for (what, site) in [
            ("cascade", &self.multipliers.cascade),
            ("spin", &self.multipliers.spin),
        ] {
            if !(0.0..=1.0).contains(&site.trigger_chance) {
                return invalid(format!(
                    "{} multiplier trigger_chance {} outside [0, 1]",
                    what, site.trigger_chance
                ));
            }
            if site.values.iter().any(|v| !v.value.is_finite() || v.value <= 0.0) {
                return invalid(format!("{} multiplier values must be positive", what));
            }
            if site.burst_sizes.iter().any(|b| b.value == 0) {
                return invalid(format!("{} multiplier burst sizes must be at least 1", what));
            }
            if site.enabled && self.multipliers.characters.is_empty() {
                return invalid("multiplier characters list is empty".into());
            }
        }

        let bonus = &self.bonus;
        if bonus.trigger_scatter_count == 0 || bonus.retrigger_scatter_count == 0 {
            return invalid("scatter thresholds must be at least 1".into());
        }
        if bonus.trigger_award == 0 {
            return invalid("bonus trigger_award must be at least 1".into());
        }

        Ok(())
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse from YAML
    pub fn from_yaml(yaml: &str) -> EngineResult<Self> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Export as pretty JSON
    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn load(path: &Path) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            SpinError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&text),
            _ => Self::from_json(&text),
        }
    }
}
