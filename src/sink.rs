//! Built-in sinks for the command-line runner.

use async_trait::async_trait;
use serde::Serialize;
use std::io::Write;
use std::sync::Mutex;
use thunderbolt_data::{CellDelta, MetricsSnapshot};
use thunderbolt_runner::Sink;
use uuid::Uuid;

/// Writes every emission as structured `tracing` events.
pub struct TracingSink;

#[async_trait]
impl Sink for TracingSink {
    async fn emit_metrics(
        &self,
        run_id: Uuid,
        tick: u64,
        metrics: &MetricsSnapshot,
    ) -> anyhow::Result<()> {
        let c = &metrics.criticality;
        tracing::info!(
            %run_id,
            tick,
            plv = c.plv,
            entropy = c.entropy,
            lambda_hat = c.lambda_hat,
            lyapunov = c.lyapunov,
            edge_score = c.edge_score,
            zone = %c.zone,
            "Criticality"
        );
        if let Some(sq) = &metrics.sidequest {
            tracing::debug!(
                %run_id,
                tick,
                clustering = sq.clustering,
                sortedness = sq.sortedness,
                healing_rate = sq.healing_rate,
                pattern_stability = sq.pattern_stability,
                emergence = sq.emergence_score,
                ising_energy = sq.algotype_ising_energy,
                "Side quest"
            );
        }
        Ok(())
    }

    async fn broadcast_deltas(
        &self,
        run_id: Uuid,
        tick: u64,
        deltas: &[CellDelta],
    ) -> anyhow::Result<()> {
        let active = deltas.iter().filter(|d| !d.state.is_quiescent()).count();
        tracing::debug!(%run_id, tick, cells = deltas.len(), active, "Deltas");
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Record<'a> {
    Metrics {
        run_id: Uuid,
        tick: u64,
        metrics: &'a MetricsSnapshot,
    },
    Deltas {
        run_id: Uuid,
        tick: u64,
        deltas: &'a [CellDelta],
    },
}

/// One JSON object per line on any writer.
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl JsonLinesSink<std::io::Stdout> {
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self, record: &Record<'_>) -> anyhow::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow::anyhow!("JSON sink writer poisoned"))?;
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

#[async_trait]
impl<W: Write + Send + 'static> Sink for JsonLinesSink<W> {
    async fn emit_metrics(
        &self,
        run_id: Uuid,
        tick: u64,
        metrics: &MetricsSnapshot,
    ) -> anyhow::Result<()> {
        self.write(&Record::Metrics {
            run_id,
            tick,
            metrics,
        })
    }

    async fn broadcast_deltas(
        &self,
        run_id: Uuid,
        tick: u64,
        deltas: &[CellDelta],
    ) -> anyhow::Result<()> {
        self.write(&Record::Deltas {
            run_id,
            tick,
            deltas,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thunderbolt_core::lattice::Lattice;
    use thunderbolt_data::{Coord, Thunderbit};

    #[tokio::test]
    async fn test_json_lines_sink_writes_one_line_per_batch() {
        let sink = JsonLinesSink::new(Vec::new());
        let lattice = Lattice::filled(Coord::new(2, 2, 1), &Thunderbit::default()).unwrap();
        let deltas = lattice.deltas();
        sink.broadcast_deltas(Uuid::nil(), 1, &deltas).await.unwrap();
        sink.broadcast_deltas(Uuid::nil(), 2, &deltas).await.unwrap();

        let bytes = sink.into_inner();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["type"], "deltas");
        assert_eq!(first["tick"], 1);
        assert_eq!(first["deltas"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_tracing_sink_accepts_everything() {
        let sink = TracingSink;
        assert!(sink.broadcast_deltas(Uuid::nil(), 1, &[]).await.is_ok());
    }
}
