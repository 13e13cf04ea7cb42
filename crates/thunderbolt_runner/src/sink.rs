//! Where a run sends its deltas and metrics.
//!
//! Each run owns a sink task fed through a bounded channel. The tick loop
//! never waits on it: when the queue is full the emission is dropped and
//! counted. Sink failures are logged and dropped.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use thunderbolt_data::{CellDelta, MetricsSnapshot};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

#[async_trait]
pub trait Sink: Send + Sync {
    async fn emit_metrics(
        &self,
        run_id: Uuid,
        tick: u64,
        metrics: &MetricsSnapshot,
    ) -> anyhow::Result<()>;

    async fn broadcast_deltas(
        &self,
        run_id: Uuid,
        tick: u64,
        deltas: &[CellDelta],
    ) -> anyhow::Result<()>;
}

/// Discards everything.
pub struct NullSink;

#[async_trait]
impl Sink for NullSink {
    async fn emit_metrics(&self, _: Uuid, _: u64, _: &MetricsSnapshot) -> anyhow::Result<()> {
        Ok(())
    }

    async fn broadcast_deltas(&self, _: Uuid, _: u64, _: &[CellDelta]) -> anyhow::Result<()> {
        Ok(())
    }
}

/// One item handed to a sink.
#[derive(Debug, Clone, PartialEq)]
pub enum Emission {
    Deltas {
        run_id: Uuid,
        tick: u64,
        deltas: Vec<CellDelta>,
    },
    Metrics {
        run_id: Uuid,
        tick: u64,
        snapshot: MetricsSnapshot,
    },
}

impl Emission {
    #[must_use]
    pub fn tick(&self) -> u64 {
        match self {
            Emission::Deltas { tick, .. } | Emission::Metrics { tick, .. } => *tick,
        }
    }
}

/// Keeps every emission in memory, for tests and embedding.
#[derive(Clone, Default)]
pub struct CollectingSink {
    emissions: Arc<Mutex<Vec<Emission>>>,
}

impl CollectingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn emissions(&self) -> Vec<Emission> {
        self.emissions
            .lock()
            .map(|list| list.clone())
            .unwrap_or_default()
    }

    /// Ticks that carried a delta batch, in arrival order.
    #[must_use]
    pub fn delta_ticks(&self) -> Vec<u64> {
        self.emissions()
            .iter()
            .filter(|e| matches!(e, Emission::Deltas { .. }))
            .map(Emission::tick)
            .collect()
    }

    #[must_use]
    pub fn snapshots(&self) -> Vec<MetricsSnapshot> {
        self.emissions()
            .into_iter()
            .filter_map(|e| match e {
                Emission::Metrics { snapshot, .. } => Some(snapshot),
                Emission::Deltas { .. } => None,
            })
            .collect()
    }

    fn push(&self, emission: Emission) {
        if let Ok(mut list) = self.emissions.lock() {
            list.push(emission);
        }
    }
}

#[async_trait]
impl Sink for CollectingSink {
    async fn emit_metrics(
        &self,
        run_id: Uuid,
        tick: u64,
        metrics: &MetricsSnapshot,
    ) -> anyhow::Result<()> {
        self.push(Emission::Metrics {
            run_id,
            tick,
            snapshot: metrics.clone(),
        });
        Ok(())
    }

    async fn broadcast_deltas(
        &self,
        run_id: Uuid,
        tick: u64,
        deltas: &[CellDelta],
    ) -> anyhow::Result<()> {
        self.push(Emission::Deltas {
            run_id,
            tick,
            deltas: deltas.to_vec(),
        });
        Ok(())
    }
}

/// Emissions a run may queue ahead of its sink.
pub const SINK_QUEUE_DEPTH: usize = 16;

/// Spawns the task that drains `Emission`s into `sink`, queueing at most
/// `capacity` of them.
///
/// The task ends once every sender is dropped and the queue is empty.
pub fn spawn_sink_task(
    sink: Arc<dyn Sink>,
    capacity: usize,
) -> (mpsc::Sender<Emission>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<Emission>(capacity.max(1));
    let task = tokio::spawn(async move {
        while let Some(emission) = rx.recv().await {
            let result = match &emission {
                Emission::Deltas {
                    run_id,
                    tick,
                    deltas,
                } => sink.broadcast_deltas(*run_id, *tick, deltas).await,
                Emission::Metrics {
                    run_id,
                    tick,
                    snapshot,
                } => sink.emit_metrics(*run_id, *tick, snapshot).await,
            };
            if let Err(e) = result {
                tracing::warn!(tick = emission.tick(), error = %e, "Sink rejected emission");
            }
        }
    });
    (tx, task)
}
