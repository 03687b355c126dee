// THEORY:
// The `pipeline` module is the final, top-level API for the entire idle
// detection engine. It encapsulates the full architectural stack (arena,
// per-entity histories, pattern matcher, classifiers, and the state store)
// into a single, easy-to-use interface driven by an external scan loop.
//
// Key architectural principles:
// 1.  **One Update Per Entity Per Tick**: The scan loop hands the engine one
//     telemetry sample per currently observed entity; the engine routes each
//     to its analyzer and returns one verdict per entity. The engine performs
//     no I/O of its own; acquisition happens strictly before an update.
// 2.  **Fail-Fast Configuration**: Threshold relationships are validated once
//     at construction. A configuration that can never produce a meaningful
//     pattern scan is rejected as a fatal `ConfigError` instead of silently
//     misclassifying forever.
// 3.  **Self-Contained Ticks**: Each update is a pure state transition over
//     the entity's own analyzer. A failed or skipped tick in a collaborator
//     leaves all stored state untouched; there is nothing to roll back.

use crate::core_modules::activity_classifier::ActivityVerdict;
use crate::core_modules::arena::PositionArena;
use crate::core_modules::state_store::{ActivityStateStore, EntityId, EntitySnapshot};
use crate::core_modules::telemetry::telemetry::TelemetrySample;
use std::collections::HashSet;
use thiserror::Error;

// Re-export key data structures for the public API.
pub use crate::core_modules::activity_classifier::ClassifierPhase;
pub use crate::core_modules::position::position::Position;

/// A fatal configuration problem, detected once at engine construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("`{option}` must be greater than zero")]
    NonPositive { option: &'static str },
    #[error("`{option}` must not be negative")]
    Negative { option: &'static str },
    #[error(
        "pattern_lookback ({pattern_lookback}) must be at most history_size - 2 ({history_size})"
    )]
    LookbackExceedsHistory {
        pattern_lookback: usize,
        history_size: usize,
    },
    #[error(
        "pattern_min_history ({pattern_min_history}) must be at most history_size ({history_size})"
    )]
    MinHistoryExceedsCapacity {
        pattern_min_history: usize,
        history_size: usize,
    },
}

/// A runtime fault in the engine's own machinery. The classification path
/// itself never fails; this surface exists for the concurrent service, whose
/// workers can become unreachable during shutdown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("worker for entity shard {shard} is no longer reachable")]
    WorkerUnavailable { shard: usize },
}

/// Configuration for the idle detection engine, allowing for tunable behavior.
/// All thresholds are heuristic and tuned empirically.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Consecutive idle ticks required before the dwell path flags AFK.
    pub afk_threshold: u32,
    /// Per-axis movement (in world units) still considered stationary.
    pub position_threshold: f64,
    /// Pitch/yaw movement (in degrees) still considered stationary.
    pub pitch_yaw_threshold: f64,
    /// Matching vectors in the look-back window required to call a pattern.
    pub pattern_threshold: usize,
    /// Capacity of each entity's position window.
    pub history_size: usize,
    /// How many adjacent-pair vectors the pattern scan walks back over.
    pub pattern_lookback: usize,
    /// Window length required before the pattern matcher runs at all.
    pub pattern_min_history: usize,
    /// Per-axis tolerance when comparing two movement vectors.
    pub pattern_diff_threshold: f64,
    /// Whether retired position records are pooled for reuse.
    pub arena_enabled: bool,
    /// Upper bound on the arena free list.
    pub arena_max_size: usize,
    /// Whether `process_scan` sweeps analyzers for entities absent from the
    /// scan. Off by default: the base engine never evicts.
    pub sweep_absent: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            afk_threshold: 15,
            position_threshold: 0.1,
            pitch_yaw_threshold: 0.05,
            pattern_threshold: 5,
            history_size: 25,
            pattern_lookback: 6,
            pattern_min_history: 8,
            pattern_diff_threshold: 0.01,
            arena_enabled: true,
            arena_max_size: 500,
            sweep_absent: false,
        }
    }
}

impl EngineConfig {
    /// Checks every threshold relationship. Run once at engine construction;
    /// any violation is fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.afk_threshold == 0 {
            return Err(ConfigError::NonPositive {
                option: "afk_threshold",
            });
        }
        if self.pattern_threshold == 0 {
            return Err(ConfigError::NonPositive {
                option: "pattern_threshold",
            });
        }
        if self.position_threshold < 0.0 {
            return Err(ConfigError::Negative {
                option: "position_threshold",
            });
        }
        if self.pitch_yaw_threshold < 0.0 {
            return Err(ConfigError::Negative {
                option: "pitch_yaw_threshold",
            });
        }
        if self.pattern_diff_threshold < 0.0 {
            return Err(ConfigError::Negative {
                option: "pattern_diff_threshold",
            });
        }
        if self.pattern_lookback + 2 > self.history_size {
            return Err(ConfigError::LookbackExceedsHistory {
                pattern_lookback: self.pattern_lookback,
                history_size: self.history_size,
            });
        }
        if self.pattern_min_history > self.history_size {
            return Err(ConfigError::MinHistoryExceedsCapacity {
                pattern_min_history: self.pattern_min_history,
                history_size: self.history_size,
            });
        }
        Ok(())
    }
}

/// The primary output of the engine for a single scan tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanReport {
    /// One verdict per observed entity, in the order supplied by the caller.
    pub verdicts: Vec<(EntityId, ActivityVerdict)>,
    /// How many of this scan's entities are currently classified AFK.
    pub afk_count: usize,
    /// Analyzers dropped by the absent-entity sweep (0 when sweeping is off).
    pub swept_entities: usize,
}

/// The main, top-level struct for the idle detection engine.
pub struct ActivityEngine {
    config: EngineConfig,
    store: ActivityStateStore,
    arena: PositionArena,
}

impl ActivityEngine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let arena = PositionArena::new(config.arena_enabled, config.arena_max_size);
        Ok(Self {
            config,
            store: ActivityStateStore::new(),
            arena,
        })
    }

    /// Processes one telemetry sample for one entity and returns its verdict.
    pub fn update_entity(&mut self, id: EntityId, sample: &TelemetrySample) -> ActivityVerdict {
        let previously_tracked = self.store.contains(id);
        let previous = self.store.verdict_of(id);

        let verdict = self.store.observe(id, sample, &self.config, &mut self.arena);

        if !previously_tracked {
            log::debug!("tracking new entity {id}");
        } else if previous.map(|v| v.is_afk) != Some(verdict.is_afk) {
            log::debug!(
                "entity {id} is now {}",
                if verdict.is_afk { "AFK" } else { "active" }
            );
        }
        log::trace!(
            "entity {id}: afk={} unchanged_ticks={}",
            verdict.is_afk,
            verdict.unchanged_ticks
        );
        verdict
    }

    /// Processes one full scan: one sample per currently observed entity.
    /// When `sweep_absent` is configured, analyzers for entities missing
    /// from `observations` are dropped afterwards.
    pub fn process_scan(&mut self, observations: &[(EntityId, TelemetrySample)]) -> ScanReport {
        let mut verdicts = Vec::with_capacity(observations.len());
        for (id, sample) in observations {
            verdicts.push((*id, self.update_entity(*id, sample)));
        }

        let swept_entities = if self.config.sweep_absent {
            let observed: HashSet<EntityId> = observations.iter().map(|(id, _)| *id).collect();
            self.sweep_absent_entities(&observed)
        } else {
            0
        };

        let afk_count = verdicts.iter().filter(|(_, v)| v.is_afk).count();
        ScanReport {
            verdicts,
            afk_count,
            swept_entities,
        }
    }

    /// Drops analyzers for every entity absent from `observed` and returns
    /// how many were swept. The concurrent service calls this directly so
    /// each worker can sweep its own shard.
    pub fn sweep_absent_entities(&mut self, observed: &HashSet<EntityId>) -> usize {
        let swept = self.store.retain_observed(observed);
        if swept > 0 {
            log::debug!("swept {swept} departed entities");
        }
        swept
    }

    /// The verdict from the most recent tick for `id`, if it is tracked.
    pub fn verdict_of(&self, id: EntityId) -> Option<ActivityVerdict> {
        self.store.verdict_of(id)
    }

    /// Read-only value copies of every tracked entity's state, for renderers.
    pub fn snapshot(&self) -> Vec<EntitySnapshot> {
        self.store.snapshot()
    }

    /// How many entities currently have an analyzer.
    pub fn tracked_entities(&self) -> usize {
        self.store.len()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
