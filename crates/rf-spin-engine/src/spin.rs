//! Spin request and result contract
//!
//! One canonical camelCase name per field. Unknown inbound fields are rejected
//! rather than treated as aliases.

use serde::{Deserialize, Serialize};

use crate::bonus::{BonusMode, BonusSessionState};
use crate::cascade::CascadeStep;
use crate::error::EngineResult;
use crate::grid::Grid;
use crate::multiplier::MultiplierEvent;
use crate::paytable::WinTier;

/// Bonus state as the client believes it to be
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClaimedBonusState {
    pub active: bool,
    pub spins_remaining: u32,
    pub accumulated_multiplier: f64,
}

impl ClaimedBonusState {
    pub fn to_state(&self) -> BonusSessionState {
        if self.active {
            BonusSessionState {
                mode: BonusMode::Bonus,
                spins_remaining: self.spins_remaining,
                accumulated_multiplier: self.accumulated_multiplier,
            }
        } else {
            BonusSessionState::base()
        }
    }
}

impl Default for ClaimedBonusState {
    fn default() -> Self {
        Self::from(&BonusSessionState::base())
    }
}

impl From<&BonusSessionState> for ClaimedBonusState {
    fn from(state: &BonusSessionState) -> Self {
        Self {
            active: state.is_active(),
            spins_remaining: state.spins_remaining,
            accumulated_multiplier: state.accumulated_multiplier,
        }
    }
}

/// Inbound spin request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SpinRequest {
    pub bet_amount: f64,
    pub rng_seed: String,
    #[serde(default)]
    pub bonus_state: ClaimedBonusState,
}

impl SpinRequest {
    pub fn new(bet_amount: f64, rng_seed: impl Into<String>) -> Self {
        Self {
            bet_amount,
            rng_seed: rng_seed.into(),
            bonus_state: ClaimedBonusState::default(),
        }
    }

    pub fn with_bonus_state(mut self, state: &BonusSessionState) -> Self {
        self.bonus_state = ClaimedBonusState::from(state);
        self
    }

    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Complete, immutable outcome of one spin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinResult {
    /// Grid before the first cascade
    pub initial_grid: Grid,
    /// Cascade steps in order
    pub cascade_steps: Vec<CascadeStep>,
    /// Multiplier triggers in order of evaluation
    pub multiplier_events: Vec<MultiplierEvent>,
    /// `baseWinBeforeMultipliers × appliedMultiplier`
    pub total_win: f64,
    /// Sum of cascade step wins before any multiplier
    pub base_win_before_multipliers: f64,
    /// Multiplier applied to this spin: the sub-event sum in base mode, the
    /// starting accumulator in bonus mode
    pub applied_multiplier: f64,
    /// Additive sum of every sub-event value (0 when none fired)
    pub multiplier_sum: f64,
    /// Number of individual sub-events across all events
    pub multiplier_sub_event_count: u32,
    /// Highest scatter count on the initial or any post-cascade grid
    pub scatter_count: u32,
    pub bonus_triggered: bool,
    pub bonus_retriggered: bool,
    pub bonus_spins_awarded: u32,
    /// Accumulator in effect from the next spin on
    pub new_accumulated_multiplier: f64,
    /// State to persist for the next spin
    pub new_bonus_state: BonusSessionState,
    /// State this spin started from
    pub starting_bonus_state: BonusSessionState,
    pub bet_amount: f64,
    pub rng_seed: String,
    /// Hex SHA-256 of `rngSeed`
    pub seed_digest: String,
    pub win_tier: WinTier,
}

impl SpinResult {
    pub fn is_win(&self) -> bool {
        self.total_win > 0.0
    }

    pub fn cascade_count(&self) -> usize {
        self.cascade_steps.len()
    }

    /// Compact JSON, the canonical byte form used for replay comparison
    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
