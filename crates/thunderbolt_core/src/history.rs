//! Bounded ring of recent tick frames used by the analyzers.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thunderbolt_data::{CellDelta, CellState, Coord};

pub const DEFAULT_HISTORY_DEPTH: usize = 10;

/// What the analyzers remember about one past tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryFrame {
    pub tick: u64,
    pub flows: Vec<f64>,
    pub states: Vec<(Coord, CellState)>,
}

impl HistoryFrame {
    #[must_use]
    pub fn from_deltas(tick: u64, deltas: &[CellDelta]) -> Self {
        Self {
            tick,
            flows: deltas.iter().map(|d| d.sigma_flow).collect(),
            states: deltas.iter().map(|d| (d.coord, d.state)).collect(),
        }
    }

    /// Normalised state histogram indexed by [`CellState::index`].
    #[must_use]
    pub fn state_distribution(&self) -> [f64; 5] {
        state_distribution(self.states.iter().map(|&(_, s)| s))
    }
}

/// Normalised histogram of `states`; all zeros when empty.
pub fn state_distribution<I: IntoIterator<Item = CellState>>(states: I) -> [f64; 5] {
    let mut counts = [0usize; 5];
    let mut total = 0usize;
    for s in states {
        counts[s.index()] += 1;
        total += 1;
    }
    let mut dist = [0.0; 5];
    if total > 0 {
        for (d, c) in dist.iter_mut().zip(counts) {
            *d = c as f64 / total as f64;
        }
    }
    dist
}

/// Newest-first FIFO of frames, truncated to `depth`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsHistory {
    depth: usize,
    frames: VecDeque<HistoryFrame>,
}

impl Default for MetricsHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}

impl MetricsHistory {
    #[must_use]
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            frames: VecDeque::with_capacity(depth),
        }
    }

    pub fn push(&mut self, frame: HistoryFrame) {
        if self.depth == 0 {
            return;
        }
        self.frames.push_front(frame);
        self.frames.truncate(self.depth);
    }

    pub fn push_deltas(&mut self, tick: u64, deltas: &[CellDelta]) {
        self.push(HistoryFrame::from_deltas(tick, deltas));
    }

    #[must_use]
    pub fn newest(&self) -> Option<&HistoryFrame> {
        self.frames.front()
    }

    /// Frames newest first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryFrame> {
        self.frames.iter()
    }

    /// Concatenated flows, oldest frame first.
    #[must_use]
    pub fn flow_series(&self) -> Vec<f64> {
        self.frames
            .iter()
            .rev()
            .flat_map(|f| f.flows.iter().copied())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(tick: u64, flow: f64) -> HistoryFrame {
        HistoryFrame {
            tick,
            flows: vec![flow],
            states: vec![(Coord::new(0, 0, 0), CellState::Active)],
        }
    }

    #[test]
    fn test_newest_first_and_bounded() {
        let mut history = MetricsHistory::new(3);
        for t in 1..=5 {
            history.push(frame(t, t as f64));
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.newest().unwrap().tick, 5);
        assert_eq!(
            history.iter().map(|f| f.tick).collect::<Vec<_>>(),
            vec![5, 4, 3]
        );
        assert_eq!(history.flow_series(), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_zero_depth_keeps_nothing() {
        let mut history = MetricsHistory::new(0);
        history.push(frame(1, 0.0));
        assert!(history.is_empty());
    }

    #[test]
    fn test_state_distribution() {
        let dist = state_distribution([CellState::Active, CellState::Active, CellState::Inactive]);
        assert!((dist[CellState::Active.index()] - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(state_distribution(std::iter::empty()), [0.0; 5]);
    }
}
