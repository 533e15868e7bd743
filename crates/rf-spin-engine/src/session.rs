//! Session State Store, claim reconciliation and the per-session spin guard
//!
//! A session's bonus state is a read-modify-write record: two spins for the
//! same session must never interleave. [`SpinService`] holds a per-session
//! lock for the whole load → spin → save sequence and rejects a second
//! concurrent request with [`SpinError::SessionBusy`] instead of queueing it.
//! A session's lock entry is dropped as soon as no request holds it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::bonus::BonusSessionState;
use crate::config::BonusConfig;
use crate::engine::SpinEngine;
use crate::error::{EngineResult, SpinError};
use crate::spin::{ClaimedBonusState, SpinRequest, SpinResult};

// ═══════════════════════════════════════════════════════════════════════════════
// STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Authoritative per-session bonus state
///
/// Each call is atomic on its own. A session that was never saved loads as
/// base mode.
pub trait SessionStore: Send + Sync {
    fn load(&self, session_id: &str) -> EngineResult<BonusSessionState>;
    fn save(&self, session_id: &str, state: &BonusSessionState) -> EngineResult<()>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    states: RwLock<HashMap<String, BonusSessionState>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions with a saved state
    pub fn len(&self) -> usize {
        self.states.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.read().is_empty()
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self, session_id: &str) -> EngineResult<BonusSessionState> {
        Ok(self
            .states
            .read()
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    fn save(&self, session_id: &str, state: &BonusSessionState) -> EngineResult<()> {
        self.states
            .write()
            .insert(session_id.to_string(), state.clone());
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECONCILIATION
// ═══════════════════════════════════════════════════════════════════════════════

/// How a claimed state was resolved against the stored one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Claim and store agree
    Agreed,
    /// Store disagreed and was used
    StoreWins,
    /// Caller claimed a fresh bonus entry the store had not recorded yet
    FreshEntryAccepted,
}

/// A claim that the bonus was just entered: active, full award, accumulator at 1
pub fn is_fresh_entry_claim(claim: &ClaimedBonusState, config: &BonusConfig) -> bool {
    claim.active
        && claim.spins_remaining == config.trigger_award
        && claim.accumulated_multiplier == 1.0
}

/// Resolve the caller's claimed bonus state against the stored record.
pub fn reconcile(
    claim: &ClaimedBonusState,
    stored: &BonusSessionState,
    config: &BonusConfig,
) -> (BonusSessionState, Reconciliation) {
    let claimed = claim.to_state();
    if claimed == *stored {
        return (claimed, Reconciliation::Agreed);
    }

    if config.accept_fresh_entry_claims
        && !stored.is_active()
        && is_fresh_entry_claim(claim, config)
    {
        log::warn!(
            "accepting claimed fresh bonus entry ({} spins) over stored base state",
            claim.spins_remaining
        );
        return (claimed, Reconciliation::FreshEntryAccepted);
    }

    log::warn!(
        "claimed bonus state {:?} overridden by stored {:?}",
        claimed,
        stored
    );
    (stored.clone(), Reconciliation::StoreWins)
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERVICE
// ═══════════════════════════════════════════════════════════════════════════════

/// Store + reconciliation + per-session guard around a [`SpinEngine`]
pub struct SpinService {
    engine: Arc<SpinEngine>,
    store: Arc<dyn SessionStore>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SpinService {
    pub fn new(engine: Arc<SpinEngine>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            engine,
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn engine(&self) -> &SpinEngine {
        &self.engine
    }

    pub fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    /// Run one spin for `session_id` and persist the resulting state.
    ///
    /// Nothing is saved when the spin fails.
    pub fn spin(&self, session_id: &str, request: &SpinRequest) -> EngineResult<SpinResult> {
        let lock = self.session_lock(session_id);
        let result = match lock.try_lock() {
            Some(_guard) => self.spin_locked(session_id, request),
            None => Err(SpinError::SessionBusy(session_id.to_string())),
        };
        self.release_lock(session_id, lock);
        result
    }

    /// Sessions with a live lock entry
    pub fn tracked_sessions(&self) -> usize {
        self.locks.lock().len()
    }

    fn spin_locked(&self, session_id: &str, request: &SpinRequest) -> EngineResult<SpinResult> {
        let stored = self.store.load(session_id)?;
        let (state, _) = reconcile(&request.bonus_state, &stored, &self.engine.config().bonus);
        let result = self
            .engine
            .process_spin(request.bet_amount, &request.rng_seed, &state)?;
        self.store.save(session_id, &result.new_bonus_state)?;
        Ok(result)
    }

    fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    /// Remove the entry when only the map and `lock` still reference it.
    fn release_lock(&self, session_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock();
        let idle = locks
            .get(session_id)
            .is_some_and(|current| Arc::ptr_eq(current, &lock) && Arc::strong_count(&lock) == 2);
        if idle {
            locks.remove(session_id);
        }
        drop(lock);
    }
}
