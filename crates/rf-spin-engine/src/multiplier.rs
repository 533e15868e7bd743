//! Multiplier Engine — random multiplier triggers and additive composition
//!
//! Two independent trigger sites:
//!
//! - **cascade**: evaluated after every winning cascade step, drawing from the
//!   `CascadeMultiplier(step)` RNG scope
//! - **spin**: evaluated once at spin end, drawing from the `SpinMultiplier` scope
//!
//! All sub-events that fire within one spin are **summed**. A 6× and a 2× from
//! cascades plus a 3× at spin end apply 11×, never 36×.
//!
//! Draw layout inside a scope: `[trigger, burst size, (value, col, row, character) × burst]`.

use serde::{Deserialize, Serialize};

use crate::config::{GridSpec, MultiplierConfig, MultiplierSiteConfig};
use crate::error::{EngineResult, SpinError};
use crate::grid::Position;
use crate::rng::{DrawStream, RngScope, SpinSeed};
use crate::weighted::WeightedTable;

/// Trigger site of a multiplier event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiplierKind {
    /// End-of-spin random multiplier
    Random,
    /// Per-cascade cascading multiplier
    CascadeRandom,
}

/// One multiplier sub-event; the client animates each one separately
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiplierDraw {
    pub value: f64,
    pub position: Position,
    pub character: String,
}

/// One trigger, possibly made of several simultaneous sub-events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiplierEvent {
    #[serde(rename = "type")]
    pub kind: MultiplierKind,
    /// Cascade step the event follows; spin-end events carry the step count
    pub cascade_index: u32,
    pub multipliers: Vec<MultiplierDraw>,
    /// Sum of `multipliers[..].value`
    pub total_multiplier: f64,
}

/// Additive composition of every sub-event in a spin
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MultiplierComposition {
    pub sub_event_count: u32,
    pub sum: f64,
}

impl MultiplierComposition {
    /// Multiplier applied to the base win: the sum, or 1 when nothing fired
    pub fn applied(&self) -> f64 {
        if self.sub_event_count == 0 { 1.0 } else { self.sum }
    }
}

/// Sum every sub-event value. Never multiplies.
pub fn compose(events: &[MultiplierEvent]) -> MultiplierComposition {
    events
        .iter()
        .flat_map(|e| &e.multipliers)
        .fold(MultiplierComposition::default(), |acc, draw| {
            MultiplierComposition {
                sub_event_count: acc.sub_event_count + 1,
                sum: acc.sum + draw.value,
            }
        })
}

struct TriggerSite {
    enabled: bool,
    trigger_chance: f64,
    min_win_ratio: f64,
    values: WeightedTable<f64>,
    burst_sizes: WeightedTable<u32>,
}

impl TriggerSite {
    fn compile(config: &MultiplierSiteConfig, what: &str) -> EngineResult<Self> {
        Ok(Self {
            enabled: config.enabled,
            trigger_chance: config.trigger_chance,
            min_win_ratio: config.min_win_ratio,
            values: WeightedTable::new(&config.values, &format!("{} multiplier value", what))?,
            burst_sizes: WeightedTable::new(
                &config.burst_sizes,
                &format!("{} multiplier burst", what),
            )?,
        })
    }

    fn eligible(&self, win: f64, bet: f64) -> bool {
        self.enabled && win > 0.0 && win / bet > self.min_win_ratio
    }
}

/// Multiplier Engine
pub struct MultiplierEngine {
    cascade: TriggerSite,
    spin: TriggerSite,
    characters: Vec<String>,
    grid: GridSpec,
}

impl MultiplierEngine {
    pub fn new(config: &MultiplierConfig, grid: GridSpec) -> EngineResult<Self> {
        let any_enabled = config.cascade.enabled || config.spin.enabled;
        if any_enabled && config.characters.is_empty() {
            return Err(SpinError::InvalidConfig(
                "multiplier characters list is empty".into(),
            ));
        }
        Ok(Self {
            cascade: TriggerSite::compile(&config.cascade, "cascade")?,
            spin: TriggerSite::compile(&config.spin, "spin")?,
            characters: config.characters.clone(),
            grid,
        })
    }

    /// Cascading multiplier after step `step_index` won `step_win`.
    pub fn evaluate_cascade(
        &self,
        seed: &SpinSeed,
        step_index: u32,
        step_win: f64,
        bet: f64,
    ) -> Option<MultiplierEvent> {
        if !self.cascade.eligible(step_win, bet) {
            return None;
        }
        let mut stream = DrawStream::new(seed, RngScope::CascadeMultiplier(step_index));
        self.fire(&self.cascade, &mut stream, MultiplierKind::CascadeRandom, step_index)
    }

    /// End-of-spin random multiplier; `step_count` is the number of cascade steps.
    pub fn evaluate_spin(
        &self,
        seed: &SpinSeed,
        step_count: u32,
        win: f64,
        bet: f64,
    ) -> Option<MultiplierEvent> {
        if !self.spin.eligible(win, bet) {
            return None;
        }
        let mut stream = DrawStream::new(seed, RngScope::SpinMultiplier);
        self.fire(&self.spin, &mut stream, MultiplierKind::Random, step_count)
    }

    fn fire(
        &self,
        site: &TriggerSite,
        stream: &mut DrawStream,
        kind: MultiplierKind,
        cascade_index: u32,
    ) -> Option<MultiplierEvent> {
        if !stream.chance(site.trigger_chance) {
            return None;
        }

        let burst = site.burst_sizes.pick(stream.next_f64());
        let multipliers: Vec<MultiplierDraw> = (0..burst)
            .map(|_| {
                let value = site.values.pick(stream.next_f64());
                let col = stream.index_below(self.grid.cols as usize) as u8;
                let row = stream.index_below(self.grid.rows as usize) as u8;
                let character = self.characters[stream.index_below(self.characters.len())].clone();
                MultiplierDraw {
                    value,
                    position: Position::new(col, row),
                    character,
                }
            })
            .collect();
        let total_multiplier: f64 = multipliers.iter().map(|m| m.value).sum();

        log::debug!(
            "{:?} multiplier fired after cascade {}: {} sub-events, total {}",
            kind,
            cascade_index,
            multipliers.len(),
            total_multiplier
        );

        Some(MultiplierEvent {
            kind,
            cascade_index,
            multipliers,
            total_multiplier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weighted::Weighted;

    fn event(kind: MultiplierKind, values: &[f64]) -> MultiplierEvent {
        MultiplierEvent {
            kind,
            cascade_index: 0,
            multipliers: values
                .iter()
                .map(|&value| MultiplierDraw {
                    value,
                    position: Position::new(0, 0),
                    character: "oracle".into(),
                })
                .collect(),
            total_multiplier: values.iter().sum(),
        }
    }

    #[test]
    fn test_composition_is_additive() {
        let events = vec![
            event(MultiplierKind::CascadeRandom, &[6.0]),
            event(MultiplierKind::CascadeRandom, &[2.0]),
            event(MultiplierKind::Random, &[3.0]),
        ];
        let composition = compose(&events);
        assert_eq!(composition.sub_event_count, 3);
        assert_eq!(composition.applied(), 11.0);
    }

    #[test]
    fn test_composition_counts_sub_events_not_events() {
        let events = vec![event(MultiplierKind::Random, &[2.0, 5.0, 10.0])];
        let composition = compose(&events);
        assert_eq!(composition.sub_event_count, 3);
        assert_eq!(composition.applied(), 17.0);
    }

    #[test]
    fn test_nothing_fired_applies_one() {
        assert_eq!(compose(&[]).applied(), 1.0);
    }

    fn forced_config(burst: u32) -> MultiplierConfig {
        let mut config = MultiplierConfig::default();
        config.cascade = MultiplierSiteConfig::always(3.0);
        config.spin = MultiplierSiteConfig::always(2.0);
        config.spin.burst_sizes = vec![Weighted::new(burst, 1.0)];
        config
    }

    #[test]
    fn test_forced_sites_fire() {
        let engine = MultiplierEngine::new(&forced_config(2), GridSpec::default()).unwrap();
        let seed = SpinSeed::parse("forced").unwrap();

        let cascade = engine.evaluate_cascade(&seed, 1, 4.0, 1.0).unwrap();
        assert_eq!(cascade.kind, MultiplierKind::CascadeRandom);
        assert_eq!(cascade.cascade_index, 1);
        assert_eq!(cascade.total_multiplier, 3.0);

        let spin = engine.evaluate_spin(&seed, 3, 4.0, 1.0).unwrap();
        assert_eq!(spin.kind, MultiplierKind::Random);
        assert_eq!(spin.cascade_index, 3);
        assert_eq!(spin.multipliers.len(), 2);
        assert_eq!(spin.total_multiplier, 4.0);
        for draw in &spin.multipliers {
            assert!(draw.position.col < 6 && draw.position.row < 5);
        }
    }

    #[test]
    fn test_no_win_never_fires() {
        let engine = MultiplierEngine::new(&forced_config(1), GridSpec::default()).unwrap();
        let seed = SpinSeed::parse("nowin").unwrap();
        assert!(engine.evaluate_cascade(&seed, 0, 0.0, 1.0).is_none());
        assert!(engine.evaluate_spin(&seed, 0, 0.0, 1.0).is_none());
    }

    #[test]
    fn test_min_win_ratio_gates_spin_site() {
        let mut config = forced_config(1);
        config.spin.min_win_ratio = 5.0;
        let engine = MultiplierEngine::new(&config, GridSpec::default()).unwrap();
        let seed = SpinSeed::parse("ratio").unwrap();
        assert!(engine.evaluate_spin(&seed, 0, 5.0, 1.0).is_none());
        assert!(engine.evaluate_spin(&seed, 0, 5.01, 1.0).is_some());
    }

    #[test]
    fn test_disabled_site_never_fires() {
        let mut config = forced_config(1);
        config.cascade = MultiplierSiteConfig::disabled();
        let engine = MultiplierEngine::new(&config, GridSpec::default()).unwrap();
        let seed = SpinSeed::parse("off").unwrap();
        assert!(engine.evaluate_cascade(&seed, 0, 100.0, 1.0).is_none());
    }

    #[test]
    fn test_evaluation_is_reproducible() {
        let engine = MultiplierEngine::new(&MultiplierConfig::default(), GridSpec::default()).unwrap();
        let seed = SpinSeed::parse("repro").unwrap();
        for step in 0..50 {
            assert_eq!(
                engine.evaluate_cascade(&seed, step, 3.0, 1.0),
                engine.evaluate_cascade(&seed, step, 3.0, 1.0)
            );
        }
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(event(MultiplierKind::CascadeRandom, &[4.0])).unwrap();
        assert_eq!(json["type"], "cascade_random");
        assert_eq!(json["cascadeIndex"], 0);
        assert_eq!(json["totalMultiplier"], 4.0);
        assert_eq!(json["multipliers"][0]["character"], "oracle");
    }
}
