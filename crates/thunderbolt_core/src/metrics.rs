//! Tick bookkeeping and structured logging setup.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Atomic counters for one run.
pub struct TickMetrics {
    tick_count: AtomicU64,
    cell_count: AtomicU64,
    delta_count: AtomicU64,
    skipped_analyses: AtomicU64,
    last_tick_micros: AtomicU64,
    pub counters: Mutex<HashMap<String, AtomicU64>>,
    start_time: Instant,
}

impl Default for TickMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl TickMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tick_count: AtomicU64::new(0),
            cell_count: AtomicU64::new(0),
            delta_count: AtomicU64::new(0),
            skipped_analyses: AtomicU64::new(0),
            last_tick_micros: AtomicU64::new(0),
            counters: Mutex::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Records a completed tick with its duration.
    pub fn record_tick(&self, tick: u64, duration: Duration, cells: usize, deltas: usize) {
        let count = self.tick_count.fetch_add(1, Ordering::Relaxed) + 1;
        self.cell_count.store(cells as u64, Ordering::Relaxed);
        self.delta_count.fetch_add(deltas as u64, Ordering::Relaxed);
        self.last_tick_micros
            .store(duration.as_micros() as u64, Ordering::Relaxed);

        if count % 1000 == 0 {
            tracing::info!(
                tick,
                cells,
                deltas,
                skipped = self.skipped_analyses(),
                duration_us = duration.as_micros() as u64,
                "Simulation tick"
            );
        }
    }

    /// Counts a tick whose analytics were skipped.
    pub fn record_skipped_analysis(&self) {
        self.skipped_analyses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_counter(&self, name: &str) {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .entry(name.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn counter(&self, name: &str) -> u64 {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .get(name)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn cell_count(&self) -> u64 {
        self.cell_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn delta_count(&self) -> u64 {
        self.delta_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn skipped_analyses(&self) -> u64 {
        self.skipped_analyses.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn last_tick_duration(&self) -> Duration {
        Duration::from_micros(self.last_tick_micros.load(Ordering::Relaxed))
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}
