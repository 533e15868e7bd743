//! Spin Orchestrator
//!
//! `process_spin` is a pure function of `(bet, seed, bonus state)` and the
//! engine's configuration. It never touches session storage; the caller
//! persists `new_bonus_state` (see [`crate::session::SpinService`]).

use crate::bonus::{BonusEngine, BonusSessionState};
use crate::cascade::CascadeProcessor;
use crate::config::EngineConfig;
use crate::error::{EngineResult, SpinError};
use crate::grid::{self, SymbolSource, WeightedSource};
use crate::multiplier::{compose, MultiplierEngine, MultiplierEvent};
use crate::paytable::{PayTable, WinTier};
use crate::rng::SpinSeed;
use crate::spin::{SpinRequest, SpinResult};
use crate::symbols::{SymbolId, SymbolSet};
use crate::weighted::WeightedTable;

/// Spin engine compiled from a validated [`EngineConfig`]
///
/// Immutable after construction and shareable across worker threads.
pub struct SpinEngine {
    config: EngineConfig,
    symbols: SymbolSet,
    paytable: PayTable,
    base_weights: WeightedTable<SymbolId>,
    bonus_weights: Option<WeightedTable<SymbolId>>,
    multipliers: MultiplierEngine,
    bonus: BonusEngine,
}

impl SpinEngine {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;

        let symbols = SymbolSet::new(config.symbols.clone())?;
        let paytable = PayTable::new(&symbols, &config.size_tiers)?;
        let base_weights = WeightedTable::new(&config.base_weights, "base symbol")?;
        let bonus_weights = config
            .bonus_weights
            .as_ref()
            .map(|w| WeightedTable::new(w, "bonus symbol"))
            .transpose()?;
        let multipliers = MultiplierEngine::new(&config.multipliers, config.grid)?;
        let bonus = BonusEngine::new(config.bonus.clone());

        log::debug!(
            "Spin engine '{}' ready: {}×{} grid, {} symbols, min match {}",
            config.name,
            config.grid.cols,
            config.grid.rows,
            symbols.len(),
            config.min_match_count
        );

        Ok(Self {
            config,
            symbols,
            paytable,
            base_weights,
            bonus_weights,
            multipliers,
            bonus,
        })
    }

    /// Engine with the reference game configuration
    pub fn standard() -> EngineResult<Self> {
        Self::new(EngineConfig::default())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn symbols(&self) -> &SymbolSet {
        &self.symbols
    }

    pub fn paytable(&self) -> &PayTable {
        &self.paytable
    }

    pub fn bonus_engine(&self) -> &BonusEngine {
        &self.bonus
    }

    /// Symbol distribution for a spin starting in `state`
    pub fn weights_for(&self, state: &BonusSessionState) -> &WeightedTable<SymbolId> {
        match &self.bonus_weights {
            Some(bonus) if state.is_active() => bonus,
            _ => &self.base_weights,
        }
    }

    /// Run one spin with symbols drawn from the seed's grid stream.
    pub fn process_spin(
        &self,
        bet: f64,
        rng_seed: &str,
        state: &BonusSessionState,
    ) -> EngineResult<SpinResult> {
        let seed = self.check_inputs(bet, rng_seed, state)?;
        let mut source = WeightedSource::new(&seed, self.weights_for(state));
        self.run(bet, &seed, state, &mut source)
    }

    /// Run one spin with grid symbols taken from `source`.
    ///
    /// Multiplier decisions still follow the seed. Used for replaying recorded
    /// reels and for forcing specific grids.
    pub fn process_spin_with_source(
        &self,
        bet: f64,
        rng_seed: &str,
        state: &BonusSessionState,
        source: &mut dyn SymbolSource,
    ) -> EngineResult<SpinResult> {
        let seed = self.check_inputs(bet, rng_seed, state)?;
        self.run(bet, &seed, state, source)
    }

    /// Run a request trusting its claimed bonus state (no session store).
    pub fn process_request(&self, request: &SpinRequest) -> EngineResult<SpinResult> {
        self.process_spin(
            request.bet_amount,
            &request.rng_seed,
            &request.bonus_state.to_state(),
        )
    }

    fn check_inputs(
        &self,
        bet: f64,
        rng_seed: &str,
        state: &BonusSessionState,
    ) -> EngineResult<SpinSeed> {
        let limits = self.config.bet_limits;
        if !limits.contains(bet) {
            return Err(SpinError::InvalidBet {
                bet,
                min: limits.min_bet,
                max: limits.max_bet,
            });
        }
        let seed = SpinSeed::parse(rng_seed)?;
        state.validate()?;
        Ok(seed)
    }

    fn run(
        &self,
        bet: f64,
        seed: &SpinSeed,
        state: &BonusSessionState,
        source: &mut dyn SymbolSource,
    ) -> EngineResult<SpinResult> {
        let initial_grid = grid::fill(self.config.grid, source);
        let cascade = CascadeProcessor::new(
            &self.symbols,
            &self.paytable,
            self.config.min_match_count,
            self.config.max_cascades,
        )
        .run(&initial_grid, bet, source)?;

        let current = state.current_multiplier();
        let scatter_count = cascade.peak_scatter_count;

        let suppressed = if state.is_active() {
            self.config.multipliers.suppress_on_retrigger
                && self.bonus.retriggers(state, scatter_count)
        } else {
            self.bonus.triggers(state, scatter_count)
        };

        let mut multiplier_events: Vec<MultiplierEvent> = Vec::new();
        if suppressed {
            log::trace!(
                "multipliers suppressed: {} scatters on a trigger spin",
                scatter_count
            );
        } else {
            multiplier_events.extend(cascade.steps.iter().filter_map(|step| {
                self.multipliers
                    .evaluate_cascade(seed, step.index, step.win_amount * current, bet)
            }));
            multiplier_events.extend(self.multipliers.evaluate_spin(
                seed,
                cascade.steps.len() as u32,
                cascade.base_win * current,
                bet,
            ));
        }

        let composition = compose(&multiplier_events);
        let applied_multiplier = if state.is_active() {
            current
        } else {
            composition.applied()
        };
        let total_win = cascade.base_win * applied_multiplier;

        let bonus = self.bonus.settle(state, scatter_count, composition.sum);
        let win_tier = WinTier::classify(total_win, bet, &self.config.win_tiers);

        log::debug!(
            "spin {}: {} cascades, base {:.2} ×{} = {:.2}, {} multiplier sub-events, {:?} -> {:?}",
            seed.digest_hex(),
            cascade.steps.len(),
            cascade.base_win,
            applied_multiplier,
            total_win,
            composition.sub_event_count,
            state.mode,
            bonus.new_state.mode
        );

        Ok(SpinResult {
            initial_grid,
            cascade_steps: cascade.steps,
            multiplier_events,
            total_win,
            base_win_before_multipliers: cascade.base_win,
            applied_multiplier,
            multiplier_sum: composition.sum,
            multiplier_sub_event_count: composition.sub_event_count,
            scatter_count,
            bonus_triggered: bonus.triggered,
            bonus_retriggered: bonus.retriggered,
            bonus_spins_awarded: bonus.spins_awarded,
            new_accumulated_multiplier: bonus.new_accumulated_multiplier(),
            new_bonus_state: bonus.new_state,
            starting_bonus_state: state.clone(),
            bet_amount: bet,
            rng_seed: seed.as_str().to_string(),
            seed_digest: seed.digest_hex(),
            win_tier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bonus::BonusMode;
    use crate::grid::ScriptedSource;

    fn engine() -> SpinEngine {
        SpinEngine::standard().unwrap()
    }

    #[test]
    fn test_rejects_bet_outside_limits() {
        let engine = engine();
        let base = BonusSessionState::base();
        for bet in [0.0, 0.1, 100.01, f64::NAN, -1.0] {
            assert!(matches!(
                engine.process_spin(bet, "seed", &base),
                Err(SpinError::InvalidBet { .. })
            ));
        }
    }

    #[test]
    fn test_rejects_bet_before_consuming_source() {
        let engine = engine();
        let mut source = ScriptedSource::new(vec![1, 2, 3], vec![]);
        let result = engine.process_spin_with_source(0.0, "seed", &BonusSessionState::base(), &mut source);
        assert!(result.is_err());
        assert_eq!(source.drawn(), 0);

        let result = engine.process_spin_with_source(1.0, "", &BonusSessionState::base(), &mut source);
        assert!(matches!(result, Err(SpinError::InvalidSeed(_))));
        assert_eq!(source.drawn(), 0);
    }

    #[test]
    fn test_rejects_malformed_bonus_state_before_any_draw() {
        let engine = engine();
        for acc in [f64::NAN, 0.0, -4.0] {
            let state = BonusSessionState {
                mode: BonusMode::Bonus,
                spins_remaining: 5,
                accumulated_multiplier: acc,
            };
            let mut source = ScriptedSource::new(vec![1, 2, 3], vec![]);
            let result = engine.process_spin_with_source(1.0, "acc", &state, &mut source);
            assert!(matches!(result, Err(SpinError::InvalidConfig(_))));
            assert_eq!(source.drawn(), 0);
        }

        let exhausted = BonusSessionState {
            mode: BonusMode::Bonus,
            spins_remaining: 0,
            accumulated_multiplier: 3.0,
        };
        assert!(engine.process_spin(1.0, "exhausted", &exhausted).is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.base_weights.clear();
        assert!(matches!(
            SpinEngine::new(config),
            Err(SpinError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_spin_result_is_consistent() {
        let engine = engine();
        let result = engine
            .process_spin(1.0, "consistency", &BonusSessionState::base())
            .unwrap();
        assert!(result.initial_grid.is_full());
        assert_eq!(result.bet_amount, 1.0);
        assert_eq!(result.rng_seed, "consistency");
        assert_eq!(result.starting_bonus_state, BonusSessionState::base());
        let step_sum: f64 = result.cascade_steps.iter().map(|s| s.win_amount).sum();
        assert!((step_sum - result.base_win_before_multipliers).abs() < 1e-9);
        assert!(
            (result.total_win - result.base_win_before_multipliers * result.applied_multiplier)
                .abs()
                < 1e-9
        );
    }

    #[test]
    fn test_bonus_weights_used_in_bonus_mode() {
        let mut config = EngineConfig::default();
        config.bonus_weights = Some(vec![crate::weighted::Weighted::new(9, 1.0)]);
        let engine = SpinEngine::new(config).unwrap();

        let bonus = BonusSessionState {
            mode: BonusMode::Bonus,
            spins_remaining: 5,
            accumulated_multiplier: 1.0,
        };
        // Only LP5 can appear; the whole grid clusters until the ceiling trips
        assert!(matches!(
            engine.process_spin(1.0, "bonus-weights", &bonus),
            Err(SpinError::CascadeOverflow { limit: 200 })
        ));
        assert!(engine
            .process_spin(1.0, "bonus-weights", &BonusSessionState::base())
            .is_ok());
    }
}
