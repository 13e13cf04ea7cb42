//! Per-run tick loop.
//!
//! A run is a [`RunnerState`] moved into its own tokio task. The task is
//! either self-timed or driven by a [`PhaseClock`](crate::clock::PhaseClock)
//! subscription, and is steered through a command channel held by the
//! [`RunnerHandle`].

use crate::clock::{ClockEvent, ClockPhase};
use crate::error::{Result, RunnerError};
use crate::sink::{spawn_sink_task, Emission, Sink, SINK_QUEUE_DEPTH};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thunderbolt_core::config::{ScheduleKind, SimConfig};
use thunderbolt_core::history::MetricsHistory;
use thunderbolt_core::lattice::{Grid, Lattice, LegacyGrid};
use thunderbolt_core::metrics::TickMetrics;
use thunderbolt_core::neighborhood::check_radius;
use thunderbolt_core::perturbation::CriticalityFeedback;
use thunderbolt_core::stepper::{step, StepOutcome};
use thunderbolt_core::{CriticalityAnalyzer, LatticeError, SideQuestAnalyzer};
use thunderbolt_data::{CellDelta, Coord, Doctrine, MetricsSnapshot, Ruleset, TuningParams};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Result of one synchronous tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub deltas: Vec<CellDelta>,
    /// `None` when emission is disabled or the analyzers rejected the tick.
    pub snapshot: Option<MetricsSnapshot>,
}

/// Everything one run owns.
pub struct RunnerState {
    run_id: Uuid,
    grid: Grid,
    ruleset: Ruleset,
    seed: u64,
    history: MetricsHistory,
    criticality: CriticalityAnalyzer,
    sidequest: SideQuestAnalyzer,
    emit_criticality: bool,
    emit_sidequest: bool,
    doctrines: Option<HashMap<Coord, Doctrine>>,
    feedback: Option<Arc<CriticalityFeedback>>,
    metrics: Arc<TickMetrics>,
}

impl RunnerState {
    #[must_use]
    pub fn new(grid: Grid, ruleset: Ruleset, seed: u64) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            grid,
            ruleset,
            seed,
            history: MetricsHistory::default(),
            criticality: CriticalityAnalyzer::default(),
            sidequest: SideQuestAnalyzer::default(),
            emit_criticality: true,
            emit_sidequest: true,
            doctrines: None,
            feedback: None,
            metrics: Arc::new(TickMetrics::new()),
        }
    }

    /// Builds the initial grid and analyzers described by `config`.
    pub fn from_config(config: &SimConfig) -> std::result::Result<Self, LatticeError> {
        let seed = config.seed();
        let grid = match config.lattice.legacy_size {
            Some(size) => Grid::Legacy(LegacyGrid { size, tick: 0 }),
            None => {
                let mut lattice = Lattice::random(
                    config.lattice.bounds,
                    seed,
                    config.lattice.initial_density,
                )?;
                lattice.assign_doctrines(&config.lattice.doctrines, seed);
                Grid::Lattice(lattice)
            }
        };

        let mut state = Self::new(grid, config.lattice.ruleset(), seed);
        state.history = MetricsHistory::new(config.runner.history_depth);
        state.criticality = CriticalityAnalyzer::new(config.criticality.clone());
        state.sidequest = SideQuestAnalyzer::new(config.sidequest.clone());
        state.emit_criticality = config.runner.emit_criticality;
        state.emit_sidequest = config.runner.emit_sidequest;
        Ok(state)
    }

    /// Doctrine tags used by the overlay instead of the ones on the cells.
    #[must_use]
    pub fn with_doctrine_map(mut self, doctrines: HashMap<Coord, Doctrine>) -> Self {
        self.doctrines = Some(doctrines);
        self
    }

    /// Feeds every accepted criticality snapshot to `feedback`.
    #[must_use]
    pub fn with_feedback(mut self, feedback: Arc<CriticalityFeedback>) -> Self {
        self.feedback = Some(feedback);
        self
    }

    #[must_use]
    pub fn with_history_depth(mut self, depth: usize) -> Self {
        self.history = MetricsHistory::new(depth);
        self
    }

    #[must_use]
    pub fn with_emission(mut self, criticality: bool, sidequest: bool) -> Self {
        self.emit_criticality = criticality;
        self.emit_sidequest = sidequest;
        self
    }

    /// Steps once, analyses the result and records it in the history ring.
    pub fn tick(&mut self) -> std::result::Result<TickReport, LatticeError> {
        let started = Instant::now();
        let outcome = step(&self.grid, &self.ruleset, self.seed)?;
        let tick = outcome.grid.tick();

        let snapshot = if self.emit_criticality {
            self.analyze(&outcome, tick)
        } else {
            None
        };

        self.history.push_deltas(tick, &outcome.deltas);
        self.metrics.record_tick(
            tick,
            started.elapsed(),
            outcome.grid.cell_count(),
            outcome.deltas.len(),
        );
        self.grid = outcome.grid;

        Ok(TickReport {
            tick,
            deltas: outcome.deltas,
            snapshot,
        })
    }

    fn analyze(&self, outcome: &StepOutcome, tick: u64) -> Option<MetricsSnapshot> {
        let result = self
            .criticality
            .analyze(&outcome.deltas, &self.history, tick)
            .and_then(|criticality| {
                let sidequest = match (&outcome.local, self.emit_sidequest) {
                    (Some(local), true) => Some(self.sidequest.analyze(
                        &outcome.deltas,
                        local,
                        &self.history,
                        self.doctrines.as_ref(),
                        tick,
                    )?),
                    _ => None,
                };
                Ok(MetricsSnapshot {
                    tick,
                    criticality,
                    sidequest,
                })
            });

        match result {
            Ok(snapshot) => {
                if let Some(feedback) = &self.feedback {
                    feedback.observe(&snapshot.criticality);
                }
                Some(snapshot)
            }
            Err(e) => {
                warn!(run_id = %self.run_id, tick, error = %e, "Skipping analytics for tick");
                self.metrics.record_skipped_analysis();
                None
            }
        }
    }

    /// Replaces the ruleset. One whose neighbourhood the stepper would
    /// refuse is rejected and the current ruleset stays.
    pub fn set_ruleset(&mut self, ruleset: Ruleset) -> std::result::Result<(), LatticeError> {
        check_radius(ruleset.neighborhood_type)?;
        debug!(run_id = %self.run_id, rule = %ruleset.rule_id.name(), "Ruleset replaced");
        self.ruleset = ruleset;
        Ok(())
    }

    /// Merges `params` into the current tuning; unset fields are kept.
    pub fn tune(&mut self, params: &TuningParams) {
        self.ruleset.tuning.merge(params);
        debug!(run_id = %self.run_id, tuning = ?self.ruleset.tuning, "Tuning merged");
    }

    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub fn ruleset(&self) -> &Ruleset {
        &self.ruleset
    }

    #[must_use]
    pub fn history(&self) -> &MetricsHistory {
        &self.history
    }

    #[must_use]
    pub fn metrics(&self) -> Arc<TickMetrics> {
        Arc::clone(&self.metrics)
    }
}

/// How a spawned run decides when to tick.
#[derive(Debug)]
pub enum SchedulingMode {
    SelfTimed { interval: Duration },
    /// Steps once per `Hold` event.
    ClockDriven {
        events: broadcast::Receiver<ClockEvent>,
    },
}

impl SchedulingMode {
    /// Self-timed at `tick_interval_ms`, or subscribed to `events` for clock mode.
    ///
    /// Clock mode without a receiver falls back to self-timed.
    #[must_use]
    pub fn from_config(
        config: &SimConfig,
        events: Option<broadcast::Receiver<ClockEvent>>,
    ) -> Self {
        match (config.runner.mode, events) {
            (ScheduleKind::ClockDriven, Some(events)) => SchedulingMode::ClockDriven { events },
            _ => SchedulingMode::SelfTimed {
                interval: Duration::from_millis(config.runner.tick_interval_ms),
            },
        }
    }

    fn name(&self) -> &'static str {
        match self {
            SchedulingMode::SelfTimed { .. } => "self_timed",
            SchedulingMode::ClockDriven { .. } => "clock_driven",
        }
    }
}

#[derive(Debug, Clone)]
pub enum RunnerCommand {
    SetRuleset(Ruleset),
    Tune(TuningParams),
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Requested,
    MaxTicks,
    CommandsClosed,
    ClockClosed,
    Failed(String),
}

/// What a finished run reports back.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: Uuid,
    /// Ticks stepped by this task.
    pub ticks: u64,
    pub final_tick: u64,
    pub skipped_analyses: u64,
    pub ruleset: Ruleset,
    pub reason: StopReason,
}

/// Control side of a spawned run.
pub struct RunnerHandle {
    run_id: Uuid,
    commands: mpsc::UnboundedSender<RunnerCommand>,
    task: JoinHandle<RunSummary>,
    metrics: Arc<TickMetrics>,
}

impl RunnerHandle {
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    #[must_use]
    pub fn metrics(&self) -> Arc<TickMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn set_ruleset(&self, ruleset: Ruleset) -> Result<()> {
        self.send(RunnerCommand::SetRuleset(ruleset))
    }

    pub fn tune(&self, params: TuningParams) -> Result<()> {
        self.send(RunnerCommand::Tune(params))
    }

    /// A sender that outlives the handle, e.g. for a signal task.
    #[must_use]
    pub fn command_sender(&self) -> mpsc::UnboundedSender<RunnerCommand> {
        self.commands.clone()
    }

    fn send(&self, command: RunnerCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| RunnerError::ChannelClosed(self.run_id))
    }

    /// Requests a stop and waits for the task. A run that already ended
    /// returns its summary as is.
    pub async fn stop(self) -> Result<RunSummary> {
        let _ = self.commands.send(RunnerCommand::Stop);
        self.join().await
    }

    pub async fn join(self) -> Result<RunSummary> {
        self.task
            .await
            .map_err(|e| RunnerError::Task(e.to_string()))
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Moves `state` into a new task and starts ticking.
///
/// `max_ticks` bounds the number of steps this task takes.
pub fn spawn(
    state: RunnerState,
    mode: SchedulingMode,
    sink: Arc<dyn Sink>,
    max_ticks: Option<u64>,
) -> RunnerHandle {
    let run_id = state.run_id();
    let metrics = state.metrics();
    let (commands, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run_loop(state, mode, rx, sink, max_ticks));
    RunnerHandle {
        run_id,
        commands,
        task,
        metrics,
    }
}

async fn run_loop(
    mut state: RunnerState,
    mode: SchedulingMode,
    mut commands: mpsc::UnboundedReceiver<RunnerCommand>,
    sink: Arc<dyn Sink>,
    max_ticks: Option<u64>,
) -> RunSummary {
    let (emitter, sink_task) = spawn_sink_task(sink, SINK_QUEUE_DEPTH);
    let mut ticks = 0u64;
    info!(run_id = %state.run_id, mode = mode.name(), rule = state.ruleset.rule_id.name(), "Run started");

    let reason = if max_ticks == Some(0) {
        StopReason::MaxTicks
    } else {
        match mode {
            SchedulingMode::SelfTimed { interval } => {
                let mut timer = tokio::time::interval(interval);
                timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        biased;
                        command = commands.recv() => {
                            if let Some(reason) = apply_command(&mut state, command) {
                                break reason;
                            }
                        }
                        _ = timer.tick() => {
                            if let Some(reason) = advance(&mut state, &emitter, &mut ticks, max_ticks) {
                                break reason;
                            }
                        }
                    }
                }
            }
            SchedulingMode::ClockDriven { mut events } => loop {
                tokio::select! {
                    biased;
                    command = commands.recv() => {
                        if let Some(reason) = apply_command(&mut state, command) {
                            break reason;
                        }
                    }
                    event = events.recv() => match event {
                        Ok(ClockEvent { phase: ClockPhase::Hold, .. }) => {
                            if let Some(reason) = advance(&mut state, &emitter, &mut ticks, max_ticks) {
                                break reason;
                            }
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(missed)) => {
                            warn!(run_id = %state.run_id, missed, "Clock subscription lagged");
                        }
                        Err(RecvError::Closed) => break StopReason::ClockClosed,
                    }
                }
            },
        }
    };

    drop(emitter);
    if let Err(e) = sink_task.await {
        warn!(run_id = %state.run_id, error = %e, "Sink task ended abnormally");
    }

    let summary = RunSummary {
        run_id: state.run_id,
        ticks,
        final_tick: state.grid.tick(),
        skipped_analyses: state.metrics.skipped_analyses(),
        ruleset: state.ruleset,
        reason,
    };
    info!(
        run_id = %summary.run_id,
        ticks = summary.ticks,
        final_tick = summary.final_tick,
        reason = ?summary.reason,
        "Run stopped"
    );
    summary
}

fn apply_command(state: &mut RunnerState, command: Option<RunnerCommand>) -> Option<StopReason> {
    match command {
        Some(RunnerCommand::SetRuleset(ruleset)) => {
            if let Err(e) = state.set_ruleset(ruleset) {
                warn!(run_id = %state.run_id, error = %e, "Ruleset rejected");
            }
            None
        }
        Some(RunnerCommand::Tune(params)) => {
            state.tune(&params);
            None
        }
        Some(RunnerCommand::Stop) => Some(StopReason::Requested),
        None => Some(StopReason::CommandsClosed),
    }
}

/// Runs CPU-bound work in place, handing this worker's other tasks to
/// another thread first when the runtime has one.
fn run_blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current().map(|handle| handle.runtime_flavor()) {
        Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(f),
        _ => f(),
    }
}

fn advance(
    state: &mut RunnerState,
    emitter: &mpsc::Sender<Emission>,
    ticks: &mut u64,
    max_ticks: Option<u64>,
) -> Option<StopReason> {
    let report = match run_blocking(|| state.tick()) {
        Ok(report) => report,
        Err(e) => {
            error!(run_id = %state.run_id, error = %e, "Step failed");
            return Some(StopReason::Failed(e.to_string()));
        }
    };
    *ticks += 1;

    let run_id = state.run_id;
    let mut emissions = vec![Emission::Deltas {
        run_id,
        tick: report.tick,
        deltas: report.deltas,
    }];
    if let Some(snapshot) = report.snapshot {
        emissions.push(Emission::Metrics {
            run_id,
            tick: report.tick,
            snapshot,
        });
    }
    for emission in emissions {
        match emitter.try_send(emission) {
            Ok(()) => {}
            Err(TrySendError::Full(emission)) => {
                debug!(run_id = %run_id, tick = emission.tick(), "Sink queue full, emission dropped");
                state.metrics.increment_counter("dropped_emissions");
            }
            Err(TrySendError::Closed(_)) => {
                state.metrics.increment_counter("dropped_emissions");
            }
        }
    }

    match max_ticks {
        Some(limit) if *ticks >= limit => Some(StopReason::MaxTicks),
        _ => None,
    }
}
