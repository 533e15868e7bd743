//! Bonus Engine — free-spins state machine and cross-spin accumulator
//!
//! ```text
//! Base ──(scatters ≥ trigger)──► Bonus { remaining = award, acc = 1 }
//! Bonus ──(spin)──► remaining - 1 (+ retrigger award), acc += this spin's multipliers
//! Bonus ──(remaining == 0)──► Base { acc = 1 }
//! ```
//!
//! The accumulator grown during a spin only applies from the next spin on.

use serde::{Deserialize, Serialize};

use crate::config::BonusConfig;
use crate::error::{EngineResult, SpinError};

/// Game mode of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusMode {
    #[default]
    Base,
    Bonus,
}

/// Persisted per-session bonus state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusSessionState {
    pub mode: BonusMode,
    pub spins_remaining: u32,
    /// Multiplier applied to every bonus-mode spin's base win
    pub accumulated_multiplier: f64,
}

impl BonusSessionState {
    /// Base mode, accumulator at rest
    pub fn base() -> Self {
        Self {
            mode: BonusMode::Base,
            spins_remaining: 0,
            accumulated_multiplier: 1.0,
        }
    }

    /// Fresh bonus entry with `spins` awarded
    pub fn entered(spins: u32) -> Self {
        Self {
            mode: BonusMode::Bonus,
            spins_remaining: spins,
            accumulated_multiplier: 1.0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.mode == BonusMode::Bonus
    }

    /// Multiplier the current spin's base win is scaled by
    pub fn current_multiplier(&self) -> f64 {
        if self.is_active() {
            self.accumulated_multiplier
        } else {
            1.0
        }
    }

    /// Reject states no sequence of spins can produce.
    ///
    /// The accumulator starts at 1 and only grows; an active bonus always has
    /// at least one spin left.
    pub fn validate(&self) -> EngineResult<()> {
        if !self.accumulated_multiplier.is_finite() || self.accumulated_multiplier < 1.0 {
            return Err(SpinError::InvalidConfig(format!(
                "bonus state accumulator {} must be finite and at least 1",
                self.accumulated_multiplier
            )));
        }
        if self.is_active() && self.spins_remaining == 0 {
            return Err(SpinError::InvalidConfig(
                "active bonus state has no spins remaining".into(),
            ));
        }
        Ok(())
    }
}

impl Default for BonusSessionState {
    fn default() -> Self {
        Self::base()
    }
}

/// Bonus Engine decision for one spin
#[derive(Debug, Clone, PartialEq)]
pub struct BonusOutcome {
    /// Base → Bonus transition happened
    pub triggered: bool,
    /// Spins were added during bonus mode
    pub retriggered: bool,
    /// Spins granted by this spin (trigger or retrigger award)
    pub spins_awarded: u32,
    /// State to persist for the next spin
    pub new_state: BonusSessionState,
}

impl BonusOutcome {
    /// Accumulator carried into the next spin
    pub fn new_accumulated_multiplier(&self) -> f64 {
        self.new_state.accumulated_multiplier
    }
}

/// Bonus Engine
#[derive(Debug, Clone)]
pub struct BonusEngine {
    config: BonusConfig,
}

impl BonusEngine {
    pub fn new(config: BonusConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BonusConfig {
        &self.config
    }

    /// Base-mode spin reaches the bonus entry threshold
    pub fn triggers(&self, state: &BonusSessionState, scatter_count: u32) -> bool {
        !state.is_active() && scatter_count >= self.config.trigger_scatter_count
    }

    /// Bonus-mode spin reaches the retrigger threshold
    pub fn retriggers(&self, state: &BonusSessionState, scatter_count: u32) -> bool {
        state.is_active()
            && self.config.retrigger_enabled
            && scatter_count >= self.config.retrigger_scatter_count
    }

    /// Advance the state machine by one spin.
    ///
    /// `spin_multiplier_sum` is the additive sum of every multiplier sub-event
    /// that fired this spin; it only grows the accumulator in bonus mode.
    pub fn settle(
        &self,
        state: &BonusSessionState,
        scatter_count: u32,
        spin_multiplier_sum: f64,
    ) -> BonusOutcome {
        if !state.is_active() {
            return if self.triggers(state, scatter_count) {
                log::debug!(
                    "Bonus triggered by {} scatters: {} spins",
                    scatter_count,
                    self.config.trigger_award
                );
                BonusOutcome {
                    triggered: true,
                    retriggered: false,
                    spins_awarded: self.config.trigger_award,
                    new_state: BonusSessionState::entered(self.config.trigger_award),
                }
            } else {
                BonusOutcome {
                    triggered: false,
                    retriggered: false,
                    spins_awarded: 0,
                    new_state: BonusSessionState::base(),
                }
            };
        }

        let retriggered = self.retriggers(state, scatter_count);
        let spins_awarded = if retriggered {
            self.config.retrigger_award
        } else {
            0
        };
        let spins_remaining = state.spins_remaining.saturating_sub(1) + spins_awarded;

        let new_state = if spins_remaining == 0 {
            log::debug!(
                "Bonus finished at accumulated ×{}",
                state.accumulated_multiplier
            );
            BonusSessionState::base()
        } else {
            BonusSessionState {
                mode: BonusMode::Bonus,
                spins_remaining,
                accumulated_multiplier: state.accumulated_multiplier + spin_multiplier_sum,
            }
        };

        if retriggered {
            log::debug!(
                "Bonus retriggered by {} scatters: +{} spins, {} remaining",
                scatter_count,
                spins_awarded,
                spins_remaining
            );
        }

        BonusOutcome {
            triggered: false,
            retriggered,
            spins_awarded,
            new_state,
        }
    }
}
