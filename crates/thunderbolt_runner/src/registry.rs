//! Live runs keyed by id.

use crate::clock::PhaseClock;
use crate::error::{Result, RunnerError};
use crate::runner::{spawn, RunSummary, RunnerHandle, RunnerState, SchedulingMode};
use crate::sink::Sink;
use std::collections::HashMap;
use std::sync::Arc;
use thunderbolt_core::config::SimConfig;
use thunderbolt_data::{Ruleset, TuningParams};
use uuid::Uuid;

pub struct RunRegistry {
    runs: HashMap<Uuid, RunnerHandle>,
    sink: Arc<dyn Sink>,
}

impl RunRegistry {
    /// Every run started here shares `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn Sink>) -> Self {
        Self {
            runs: HashMap::new(),
            sink,
        }
    }

    /// Spawns `state` and returns its id.
    pub fn start(
        &mut self,
        state: RunnerState,
        mode: SchedulingMode,
        max_ticks: Option<u64>,
    ) -> Uuid {
        let handle = spawn(state, mode, Arc::clone(&self.sink), max_ticks);
        let run_id = handle.run_id();
        tracing::info!(%run_id, active = self.runs.len() + 1, "Run registered");
        self.runs.insert(run_id, handle);
        run_id
    }

    /// Starts a run from `config`, subscribing to `clock` in clock-driven mode.
    pub fn start_from_config(
        &mut self,
        config: &SimConfig,
        clock: Option<&PhaseClock>,
    ) -> Result<Uuid> {
        let state = RunnerState::from_config(config)?;
        let mode = SchedulingMode::from_config(config, clock.map(PhaseClock::subscribe));
        Ok(self.start(state, mode, config.runner.max_ticks))
    }

    pub fn set_ruleset(&self, run_id: Uuid, ruleset: Ruleset) -> Result<()> {
        self.handle(run_id)?.set_ruleset(ruleset)
    }

    pub fn tune(&self, run_id: Uuid, params: TuningParams) -> Result<()> {
        self.handle(run_id)?.tune(params)
    }

    /// Stops the run and removes it.
    pub async fn stop(&mut self, run_id: Uuid) -> Result<RunSummary> {
        let handle = self
            .runs
            .remove(&run_id)
            .ok_or(RunnerError::UnknownRun(run_id))?;
        handle.stop().await
    }

    /// Stops every run, in no particular order.
    pub async fn stop_all(&mut self) -> Vec<Result<RunSummary>> {
        let handles: Vec<RunnerHandle> = self.runs.drain().map(|(_, handle)| handle).collect();
        futures::future::join_all(handles.into_iter().map(RunnerHandle::stop)).await
    }

    /// Removes every run whose task has ended on its own and collects their
    /// summaries. Runs still ticking are left alone.
    pub async fn reap_finished(&mut self) -> Vec<Result<RunSummary>> {
        let finished: Vec<Uuid> = self
            .runs
            .iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(run_id, _)| *run_id)
            .collect();
        let handles: Vec<RunnerHandle> = finished
            .iter()
            .filter_map(|run_id| self.runs.remove(run_id))
            .collect();
        if !handles.is_empty() {
            tracing::debug!(reaped = handles.len(), active = self.runs.len(), "Finished runs reaped");
        }
        futures::future::join_all(handles.into_iter().map(RunnerHandle::join)).await
    }

    #[must_use]
    pub fn contains(&self, run_id: Uuid) -> bool {
        self.runs.contains_key(&run_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    #[must_use]
    pub fn ids(&self) -> Vec<Uuid> {
        self.runs.keys().copied().collect()
    }

    fn handle(&self, run_id: Uuid) -> Result<&RunnerHandle> {
        self.runs.get(&run_id).ok_or(RunnerError::UnknownRun(run_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::StopReason;
    use crate::sink::CollectingSink;
    use std::time::Duration;
    use thunderbolt_core::lattice::{Grid, LegacyGrid};
    use thunderbolt_data::{Coord, RuleId};

    fn legacy_state() -> RunnerState {
        RunnerState::new(
            Grid::Legacy(LegacyGrid { size: 8, tick: 0 }),
            Ruleset::default(),
            1,
        )
    }

    fn timed() -> SchedulingMode {
        SchedulingMode::SelfTimed {
            interval: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn test_unknown_run() {
        let mut registry = RunRegistry::new(Arc::new(CollectingSink::new()));
        let ghost = Uuid::new_v4();
        assert!(matches!(
            registry.tune(ghost, TuningParams::default()),
            Err(RunnerError::UnknownRun(id)) if id == ghost
        ));
        assert!(matches!(
            registry.set_ruleset(ghost, Ruleset::new(RuleId::Diffusion)),
            Err(RunnerError::UnknownRun(_))
        ));
        assert!(matches!(
            registry.stop(ghost).await,
            Err(RunnerError::UnknownRun(_))
        ));
    }

    #[tokio::test]
    async fn test_start_route_and_stop() {
        let mut registry = RunRegistry::new(Arc::new(CollectingSink::new()));
        let a = registry.start(legacy_state(), timed(), None);
        let b = registry.start(legacy_state(), timed(), None);
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);

        registry
            .set_ruleset(a, Ruleset::new(RuleId::Diffusion))
            .unwrap();
        let summary = registry.stop(a).await.unwrap();
        assert_eq!(summary.run_id, a);
        assert_eq!(summary.reason, StopReason::Requested);
        assert_eq!(summary.ruleset.rule_id, RuleId::Diffusion);
        assert!(!registry.contains(a));
        assert!(registry.contains(b));

        let rest = registry.stop_all().await;
        assert_eq!(rest.len(), 1);
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_from_config() {
        let mut config = SimConfig::default();
        config.lattice.bounds = Coord::new(3, 3, 1);
        config.runner.max_ticks = Some(2);
        let sink = CollectingSink::new();
        let mut registry = RunRegistry::new(Arc::new(sink.clone()));

        let id = registry.start_from_config(&config, None).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        let summary = registry.stop(id).await.unwrap();
        assert_eq!(summary.reason, StopReason::MaxTicks);
        assert_eq!(summary.ticks, 2);
        assert_eq!(sink.delta_ticks(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reap_finished_drops_ended_runs_only() {
        let mut registry = RunRegistry::new(Arc::new(CollectingSink::new()));
        let short = registry.start(legacy_state(), timed(), Some(2));
        let long = registry.start(legacy_state(), timed(), None);
        tokio::time::sleep(Duration::from_secs(1)).await;

        let reaped = registry.reap_finished().await;
        assert_eq!(reaped.len(), 1);
        let summary = reaped.into_iter().next().unwrap().unwrap();
        assert_eq!(summary.run_id, short);
        assert_eq!(summary.reason, StopReason::MaxTicks);
        assert!(!registry.contains(short));
        assert!(registry.contains(long));
        assert_eq!(registry.len(), 1);

        assert!(registry.reap_finished().await.is_empty());
        registry.stop_all().await;
        assert!(registry.is_empty());
    }
}
