// THEORY:
// The `parallel_pipeline` module exposes the engine as a concurrent service
// for deployments where scans arrive from an async runtime instead of a
// single blocking loop. The correctness requirement is serialization per
// entity: the read-modify-write across an entity's history, counters, and
// last pose must never interleave.
//
// Key architectural principles:
// 1.  **Sharded Single-Writer Workers**: Entities are routed to a fixed
//     worker by `id % worker_count`. Every update for an entity lands on the
//     same worker's channel and is processed in arrival order, so per-entity
//     serialization falls out of the topology; no locks around analyzer
//     state are ever needed.
// 2.  **Private Arenas**: Each worker owns a full sequential engine,
//     including its own position arena. The free list is never shared across
//     threads, so its mutation needs no synchronization either.
// 3.  **Same Semantics As Sequential**: A worker runs the exact sequential
//     `ActivityEngine` over its shard. For any workload, the concurrent
//     service produces the verdict sequence the sequential engine would.

use crate::core_modules::activity_classifier::ActivityVerdict;
use crate::core_modules::state_store::{EntityId, EntitySnapshot};
use crate::core_modules::telemetry::telemetry::TelemetrySample;
use crate::pipeline::{ActivityEngine, ConfigError, EngineConfig, EngineError, ScanReport};
use futures::future::join_all;
use std::collections::HashSet;
use tokio::sync::{mpsc, oneshot};

const MAX_WORKER_POOL_SIZE: usize = 8;

/// Message type for shard worker actors.
enum WorkerMessage {
    Observe {
        id: EntityId,
        sample: TelemetrySample,
        reply: oneshot::Sender<ActivityVerdict>,
    },
    Sweep {
        observed: HashSet<EntityId>,
        reply: oneshot::Sender<usize>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<EntitySnapshot>>,
    },
    Shutdown,
}

/// The engine as a concurrent scan service backed by sharded workers.
pub struct ParallelActivityEngine {
    config: EngineConfig,
    /// One channel per shard worker; shard = entity id % worker count.
    workers: Vec<mpsc::UnboundedSender<WorkerMessage>>,
}

impl ParallelActivityEngine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let worker_count = num_cpus::get().clamp(1, MAX_WORKER_POOL_SIZE);
        Self::with_worker_count(config, worker_count)
    }

    /// Builds the service with an explicit shard count. Exposed so tests can
    /// pin the topology.
    pub fn with_worker_count(
        config: EngineConfig,
        worker_count: usize,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let worker_count = worker_count.max(1);
        let mut workers = Vec::with_capacity(worker_count);

        for _ in 0..worker_count {
            let (tx, mut rx) = mpsc::unbounded_channel::<WorkerMessage>();
            // Sweeping is orchestrated by explicit messages, never by the
            // shard engine itself.
            let shard_config = EngineConfig {
                sweep_absent: false,
                ..config.clone()
            };

            // Spawn a worker task that owns its shard of the entity space.
            tokio::spawn(async move {
                // Validated above; the shard copy only differs in the sweep
                // flag, which validation does not inspect.
                let Ok(mut engine) = ActivityEngine::new(shard_config) else {
                    return;
                };

                while let Some(msg) = rx.recv().await {
                    match msg {
                        WorkerMessage::Observe { id, sample, reply } => {
                            let _ = reply.send(engine.update_entity(id, &sample));
                        }
                        WorkerMessage::Sweep { observed, reply } => {
                            let _ = reply.send(engine.sweep_absent_entities(&observed));
                        }
                        WorkerMessage::Snapshot { reply } => {
                            let _ = reply.send(engine.snapshot());
                        }
                        WorkerMessage::Shutdown => break,
                    }
                }
            });

            workers.push(tx);
        }

        Ok(Self { config, workers })
    }

    fn shard_of(&self, id: EntityId) -> usize {
        (id % self.workers.len() as u64) as usize
    }

    /// Processes one telemetry sample for one entity on its home shard.
    pub async fn update_entity(
        &self,
        id: EntityId,
        sample: TelemetrySample,
    ) -> Result<ActivityVerdict, EngineError> {
        let shard = self.shard_of(id);
        let (reply, response) = oneshot::channel();

        self.workers[shard]
            .send(WorkerMessage::Observe { id, sample, reply })
            .map_err(|_| EngineError::WorkerUnavailable { shard })?;

        response
            .await
            .map_err(|_| EngineError::WorkerUnavailable { shard })
    }

    /// Processes one full scan. Observations fan out to their shards, all
    /// verdicts are awaited together, and the report is reassembled in the
    /// caller's order. Updates for the same entity stay serialized because
    /// they traverse one shard channel in order.
    pub async fn process_scan(
        &self,
        observations: &[(EntityId, TelemetrySample)],
    ) -> Result<ScanReport, EngineError> {
        let mut pending = Vec::with_capacity(observations.len());
        for &(id, sample) in observations {
            let shard = self.shard_of(id);
            let (reply, response) = oneshot::channel();
            self.workers[shard]
                .send(WorkerMessage::Observe { id, sample, reply })
                .map_err(|_| EngineError::WorkerUnavailable { shard })?;
            pending.push((id, shard, response));
        }

        let mut verdicts = Vec::with_capacity(pending.len());
        let (ids, responses): (Vec<_>, Vec<_>) = pending
            .into_iter()
            .map(|(id, shard, response)| ((id, shard), response))
            .unzip();
        for ((id, shard), outcome) in ids.into_iter().zip(join_all(responses).await) {
            let verdict = outcome.map_err(|_| EngineError::WorkerUnavailable { shard })?;
            verdicts.push((id, verdict));
        }

        let swept_entities = if self.config.sweep_absent {
            let observed: HashSet<EntityId> = observations.iter().map(|(id, _)| *id).collect();
            self.sweep_absent(&observed).await?
        } else {
            0
        };

        let afk_count = verdicts.iter().filter(|(_, v)| v.is_afk).count();
        Ok(ScanReport {
            verdicts,
            afk_count,
            swept_entities,
        })
    }

    /// Asks every shard to drop analyzers for entities outside `observed`.
    pub async fn sweep_absent(&self, observed: &HashSet<EntityId>) -> Result<usize, EngineError> {
        let mut responses = Vec::with_capacity(self.workers.len());
        for (shard, worker) in self.workers.iter().enumerate() {
            let (reply, response) = oneshot::channel();
            worker
                .send(WorkerMessage::Sweep {
                    observed: observed.clone(),
                    reply,
                })
                .map_err(|_| EngineError::WorkerUnavailable { shard })?;
            responses.push((shard, response));
        }

        let mut swept = 0;
        for (shard, response) in responses {
            swept += response
                .await
                .map_err(|_| EngineError::WorkerUnavailable { shard })?;
        }
        Ok(swept)
    }

    /// Merged read-only snapshot across every shard, sorted by entity id.
    pub async fn snapshot(&self) -> Result<Vec<EntitySnapshot>, EngineError> {
        let mut merged = Vec::new();
        for (shard, worker) in self.workers.iter().enumerate() {
            let (reply, response) = oneshot::channel();
            worker
                .send(WorkerMessage::Snapshot { reply })
                .map_err(|_| EngineError::WorkerUnavailable { shard })?;
            merged.extend(
                response
                    .await
                    .map_err(|_| EngineError::WorkerUnavailable { shard })?,
            );
        }
        merged.sort_by_key(|snapshot| snapshot.id);
        Ok(merged)
    }

    /// Shuts down all shard workers cleanly.
    pub fn shutdown(&self) {
        for worker in &self.workers {
            let _ = worker.send(WorkerMessage::Shutdown);
        }
    }
}

impl Drop for ParallelActivityEngine {
    fn drop(&mut self) {
        // Best effort shutdown on drop.
        self.shutdown();
    }
}
