//! Progressive multiplier reveal
//!
//! Executable form of the client playback contract:
//!
//! 1. Pre-count every multiplier sub-event before animating anything.
//! 2. While any are pending, show only `baseWinBeforeMultipliers`.
//! 3. Each revealed sub-event adds its value to a running multiplier.
//! 4. When none are pending, the running multiplier must equal the server's;
//!    on mismatch, log the divergence and snap to the server value.
//!
//! In base mode the running multiplier must reach the server's applied
//! multiplier. In bonus mode it starts at the accumulator the spin started
//! with and must reach the accumulator carried forward, while the win itself
//! is paid at the starting accumulator. Either way the paid total must equal
//! the base win times the applied multiplier.

use serde::Serialize;

use crate::error::SpinError;
use crate::spin::SpinResult;

/// What the client shows after one reveal
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealFrame {
    pub pending: u32,
    /// Running multiplier built from the revealed sub-events
    pub displayed_multiplier: f64,
    /// Multiplier `displayed_win` carries: 1 while pending, then the applied one
    pub paid_multiplier: f64,
    pub displayed_win: f64,
}

/// Client-side reveal state for one spin
#[derive(Debug, Clone)]
pub struct RevealTracker {
    pending: u32,
    running: f64,
    target: f64,
    base_win: f64,
    applied: f64,
    total_win: f64,
    divergence: Option<SpinError>,
}

impl RevealTracker {
    pub fn new(result: &SpinResult) -> Self {
        let starting = &result.starting_bonus_state;
        let (start, target) = if starting.is_active() {
            let carried = if result.new_bonus_state.is_active() {
                result.new_accumulated_multiplier
            } else {
                // Exit spin: the persisted accumulator already reset
                starting.accumulated_multiplier + result.multiplier_sum
            };
            (starting.accumulated_multiplier, carried)
        } else if result.multiplier_sub_event_count == 0 {
            (1.0, result.applied_multiplier)
        } else {
            (0.0, result.applied_multiplier)
        };

        Self::with_targets(
            result.multiplier_sub_event_count,
            start,
            target,
            result.base_win_before_multipliers,
            result.applied_multiplier,
            result.total_win,
        )
    }

    fn with_targets(
        pending: u32,
        start: f64,
        target: f64,
        base_win: f64,
        applied: f64,
        total_win: f64,
    ) -> Self {
        let mut tracker = Self {
            pending,
            running: start,
            target,
            base_win,
            applied,
            total_win,
            divergence: None,
        };
        if tracker.is_complete() {
            tracker.finish();
        }
        tracker
    }

    pub fn pending(&self) -> u32 {
        self.pending
    }

    pub fn is_complete(&self) -> bool {
        self.pending == 0
    }

    /// Divergence detected once nothing was left pending
    pub fn divergence(&self) -> Option<&SpinError> {
        self.divergence.as_ref()
    }

    pub fn frame(&self) -> RevealFrame {
        if self.is_complete() {
            RevealFrame {
                pending: 0,
                displayed_multiplier: self.running,
                paid_multiplier: self.applied,
                displayed_win: self.total_win,
            }
        } else {
            RevealFrame {
                pending: self.pending,
                displayed_multiplier: self.running,
                paid_multiplier: 1.0,
                displayed_win: self.base_win,
            }
        }
    }

    /// Reveal one sub-event of `value`.
    pub fn reveal(&mut self, value: f64) -> RevealFrame {
        if self.is_complete() {
            log::warn!("multiplier reveal of {} with nothing pending, ignored", value);
            return self.frame();
        }

        self.pending -= 1;
        self.running += value;
        if self.is_complete() {
            self.finish();
        }

        self.frame()
    }

    fn finish(&mut self) {
        if !same(self.running, self.target) {
            log::warn!(
                "multiplier reveal diverged: client {} vs server {}, correcting",
                self.running,
                self.target
            );
            self.divergence = Some(SpinError::AccumulatorDivergence {
                expected: self.target,
                observed: self.running,
            });
            self.running = self.target;
        }

        let expected_win = self.base_win * self.applied;
        if !same(self.total_win, expected_win) {
            let observed = self.total_win / self.base_win;
            log::warn!(
                "paid total {} is not base {} ×{}, showing the paid total",
                self.total_win,
                self.base_win,
                self.applied
            );
            if self.divergence.is_none() {
                self.divergence = Some(SpinError::AccumulatorDivergence {
                    expected: self.applied,
                    observed,
                });
            }
        }
    }
}

fn same(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

/// Play every sub-event of `result` in order.
///
/// Returns the initial frame followed by one frame per sub-event.
pub fn play(result: &SpinResult) -> (Vec<RevealFrame>, Option<SpinError>) {
    let mut tracker = RevealTracker::new(result);
    let mut frames = vec![tracker.frame()];
    for draw in result.multiplier_events.iter().flat_map(|e| &e.multipliers) {
        frames.push(tracker.reveal(draw.value));
    }
    (frames, tracker.divergence)
}
