// THEORY:
// The `state_store` module owns the entity-id → analyzer mapping and its
// lifecycle. It adds "object permanence" to the engine: the stateless stream
// of per-tick samples is associated with the long-lived analyzer for the
// entity that produced it.
//
// Key architectural principles:
// 1.  **Get-Or-Create**: An unknown entity id is not an error. The first
//     sample for a new id births an analyzer in its calibration phase; every
//     later sample for that id reaches the same analyzer.
// 2.  **Encapsulated Mutable State**: Analyzers are never handed out by
//     reference. Consumers that want to render or inspect the store receive
//     `EntitySnapshot` value copies, so no caller can alias or corrupt a
//     live history buffer.
// 3.  **Explicit Sweeping**: Entities that stop being observed are kept by
//     default; the orchestrator may opt in to a mark-and-sweep against the
//     id set of the current scan. Eviction is a lifecycle decision that
//     belongs to the scan loop, not a side effect of an update.

use crate::core_modules::activity_classifier::{ActivityVerdict, EntityActivityState};
use crate::core_modules::arena::PositionArena;
use crate::core_modules::position::position::Position;
use crate::core_modules::telemetry::telemetry::TelemetrySample;
use crate::pipeline::EngineConfig;
use std::collections::{HashMap, HashSet};

/// A unique and persistent identifier for a tracked entity.
pub type EntityId = u64;

/// A read-only value copy of one entity's current classification state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntitySnapshot {
    pub id: EntityId,
    /// Verdict from the entity's most recent tick.
    pub is_afk: bool,
    /// Consecutive idle ticks as of the most recent tick.
    pub unchanged_ticks: u32,
    /// The position observed on the most recent tick.
    pub last_position: Position,
    /// How many positions the entity's sliding window currently holds.
    pub history_len: usize,
}

/// Owns every per-entity analyzer and routes samples to them.
pub struct ActivityStateStore {
    states: HashMap<EntityId, EntityActivityState>,
}

impl ActivityStateStore {
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
        }
    }

    /// Routes one sample to the analyzer for `id`, creating it on first
    /// sight, and returns the verdict for this tick.
    pub fn observe(
        &mut self,
        id: EntityId,
        sample: &TelemetrySample,
        config: &EngineConfig,
        arena: &mut PositionArena,
    ) -> ActivityVerdict {
        let state = self
            .states
            .entry(id)
            .or_insert_with(|| EntityActivityState::new(config));
        state.observe(sample, config, arena)
    }

    /// The verdict from the most recent tick for `id`, if it is tracked.
    pub fn verdict_of(&self, id: EntityId) -> Option<ActivityVerdict> {
        self.states.get(&id).map(|state| state.last_verdict())
    }

    /// Read-only value copies of every tracked entity's current state, for
    /// consumers like renderers. Never exposes live internal buffers.
    pub fn snapshot(&self) -> Vec<EntitySnapshot> {
        let mut entries: Vec<EntitySnapshot> = self
            .states
            .iter()
            .map(|(&id, state)| {
                let verdict = state.last_verdict();
                EntitySnapshot {
                    id,
                    is_afk: verdict.is_afk,
                    unchanged_ticks: verdict.unchanged_ticks,
                    last_position: state.last_position(),
                    history_len: state.history_len(),
                }
            })
            .collect();
        entries.sort_by_key(|snapshot| snapshot.id);
        entries
    }

    /// Mark-and-sweep: drops every analyzer whose id is absent from the
    /// current scan's observed set. Called by the orchestrator after a scan
    /// when eviction of departed entities is wanted.
    pub fn retain_observed(&mut self, observed: &HashSet<EntityId>) -> usize {
        let before = self.states.len();
        self.states.retain(|id, _| observed.contains(id));
        before - self.states.len()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.states.contains_key(&id)
    }
}

impl Default for ActivityStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn still_sample() -> TelemetrySample {
        TelemetrySample::new(10.0, 64.0, 10.0, 0.0, 0.0)
    }

    #[test]
    fn unknown_id_is_created_not_rejected() {
        let config = EngineConfig::default();
        let mut arena = PositionArena::default();
        let mut store = ActivityStateStore::new();

        assert!(!store.contains(7));
        let verdict = store.observe(7, &still_sample(), &config, &mut arena);
        assert!(!verdict.is_afk);
        assert!(store.contains(7));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn updates_for_one_id_reach_the_same_analyzer() {
        let config = EngineConfig::default();
        let mut arena = PositionArena::default();
        let mut store = ActivityStateStore::new();

        for _ in 0..4 {
            store.observe(42, &still_sample(), &config, &mut arena);
        }
        assert_eq!(store.len(), 1);
        assert_eq!(store.verdict_of(42).map(|v| v.unchanged_ticks), Some(3));
    }

    #[test]
    fn entities_are_tracked_independently() {
        let config = EngineConfig::default();
        let mut arena = PositionArena::default();
        let mut store = ActivityStateStore::new();

        for tick in 0..4 {
            store.observe(1, &still_sample(), &config, &mut arena);
            // Entity 2 moves a full block every tick.
            let roaming = TelemetrySample::new(tick as f64 * 2.0, 64.0, 0.0, 0.0, tick as f64 * 7.0);
            store.observe(2, &roaming, &config, &mut arena);
        }

        assert_eq!(store.verdict_of(1).map(|v| v.unchanged_ticks), Some(3));
        assert_eq!(store.verdict_of(2).map(|v| v.unchanged_ticks), Some(0));
    }

    #[test]
    fn snapshot_is_a_value_copy() {
        let config = EngineConfig::default();
        let mut arena = PositionArena::default();
        let mut store = ActivityStateStore::new();

        store.observe(5, &still_sample(), &config, &mut arena);
        let before = store.snapshot();

        // Mutating the copy must not touch the store.
        let mut copy = before[0];
        copy.unchanged_ticks = 999;
        assert_eq!(copy.unchanged_ticks, 999);
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn retain_observed_sweeps_departed_entities() {
        let config = EngineConfig::default();
        let mut arena = PositionArena::default();
        let mut store = ActivityStateStore::new();

        for id in 0..5 {
            store.observe(id, &still_sample(), &config, &mut arena);
        }

        let observed: HashSet<EntityId> = [0, 2, 4].into_iter().collect();
        let swept = store.retain_observed(&observed);
        assert_eq!(swept, 2);
        assert_eq!(store.len(), 3);
        assert!(store.contains(2));
        assert!(!store.contains(3));
    }

    #[test]
    fn unobserved_entities_persist_without_a_sweep() {
        let config = EngineConfig::default();
        let mut arena = PositionArena::default();
        let mut store = ActivityStateStore::new();

        store.observe(9, &still_sample(), &config, &mut arena);
        // Several scans go by without entity 9; nothing evicts it.
        for id in 100..103 {
            store.observe(id, &still_sample(), &config, &mut arena);
        }
        assert!(store.contains(9));
    }
}
