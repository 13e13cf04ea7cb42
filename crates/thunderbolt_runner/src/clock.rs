//! Four-phase external clock.
//!
//! Clock-driven runs step once per [`ClockPhase::Hold`] and ignore the other
//! phases.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockPhase {
    Capture,
    Propagate,
    Hold,
    Release,
}

impl ClockPhase {
    pub const CYCLE: [ClockPhase; 4] = [
        ClockPhase::Capture,
        ClockPhase::Propagate,
        ClockPhase::Hold,
        ClockPhase::Release,
    ];

    #[must_use]
    pub fn next(self) -> Self {
        match self {
            ClockPhase::Capture => ClockPhase::Propagate,
            ClockPhase::Propagate => ClockPhase::Hold,
            ClockPhase::Hold => ClockPhase::Release,
            ClockPhase::Release => ClockPhase::Capture,
        }
    }
}

impl fmt::Display for ClockPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClockPhase::Capture => "capture",
            ClockPhase::Propagate => "propagate",
            ClockPhase::Hold => "hold",
            ClockPhase::Release => "release",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockEvent {
    pub phase: ClockPhase,
    /// Cycle counter; increments after every `Release`.
    pub tick: u64,
}

/// Broadcast publisher of clock events.
#[derive(Debug, Clone)]
pub struct PhaseClock {
    tx: broadcast::Sender<ClockEvent>,
}

impl Default for PhaseClock {
    fn default() -> Self {
        Self::new(64)
    }
}

impl PhaseClock {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ClockEvent> {
        self.tx.subscribe()
    }

    /// Publishes one event; returns how many subscribers received it.
    pub fn publish(&self, event: ClockEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Publishes one full cycle for `tick`.
    pub fn cycle(&self, tick: u64) {
        for phase in ClockPhase::CYCLE {
            self.publish(ClockEvent { phase, tick });
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Cycles the phases forever, one phase every `phase_period`.
    pub fn drive(&self, phase_period: Duration) -> JoinHandle<()> {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(phase_period);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut phase = ClockPhase::Capture;
            let mut tick = 0u64;
            loop {
                timer.tick().await;
                let _ = tx.send(ClockEvent { phase, tick });
                if phase == ClockPhase::Release {
                    tick += 1;
                }
                phase = phase.next();
            }
        })
    }
}
