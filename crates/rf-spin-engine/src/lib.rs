//! # rf-spin-engine — Server-authoritative cascading spin engine
//!
//! Turns a bet and an RNG seed into a complete, replayable cascade sequence
//! with additive random multipliers and a bonus-mode accumulator that carries
//! across spins.
//!
//! ## Features
//!
//! - **Deterministic**: every draw is a pure function of `(seed, scope, index)`
//! - **Pay-anywhere clusters**: global symbol counts, not adjacency
//! - **Cascades**: remove → stable gravity → refill from the same seed, with a safety ceiling
//! - **Additive multipliers**: per-cascade and end-of-spin sub-events are summed, never multiplied
//! - **Bonus mode**: trigger/retrigger state machine, accumulator applied from the next spin
//! - **Session guard**: claim reconciliation and one spin at a time per session
//!
//! ## Architecture
//!
//! ```text
//! SpinService ── SessionStore (load / save)
//!     │            reconcile(claim, stored)
//!     v
//! SpinEngine::process_spin(bet, seed, state)
//!     │
//!     ├── grid::fill         (RNG Provider → WeightedTable)
//!     ├── CascadeProcessor   (find_matches → PayTable → drop_and_refill)
//!     ├── MultiplierEngine   (cascade + spin sites, compose)
//!     └── BonusEngine        (settle)
//!           │
//!           v
//!     SpinResult → RevealTracker (client playback)
//! ```

pub mod bonus;
pub mod cascade;
pub mod config;
pub mod engine;
pub mod error;
pub mod grid;
pub mod matcher;
pub mod multiplier;
pub mod paytable;
pub mod reveal;
pub mod rng;
pub mod session;
pub mod spin;
pub mod symbols;
pub mod weighted;

pub use bonus::*;
pub use cascade::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use grid::*;
pub use matcher::*;
pub use multiplier::*;
pub use paytable::*;
pub use reveal::*;
pub use rng::*;
pub use session::*;
pub use spin::*;
pub use symbols::*;
pub use weighted::*;
