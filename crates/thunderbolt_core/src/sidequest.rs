//! Secondary order and structure signals.

use crate::config::SideQuestConfig;
use crate::error::AnalysisError;
use crate::history::{state_distribution, MetricsHistory};
use std::collections::{BTreeMap, HashMap, HashSet};
use thunderbolt_data::{CellDelta, Coord, Doctrine, LocalMetrics, SideQuestMetrics};

const NEUTRAL: f64 = 0.5;
const FACE_OFFSETS: [(i32, i32, i32); 6] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

/// Kendall tau-b between position and value, rescaled to `[0, 1]`.
#[must_use]
pub fn sortedness(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 3 {
        return NEUTRAL;
    }
    let (mut concordant, mut discordant, mut value_ties) = (0i64, 0i64, 0i64);
    for i in 0..n {
        for j in (i + 1)..n {
            match values[j].partial_cmp(&values[i]) {
                Some(std::cmp::Ordering::Greater) => concordant += 1,
                Some(std::cmp::Ordering::Less) => discordant += 1,
                _ => value_ties += 1,
            }
        }
    }
    let pairs = (n * (n - 1) / 2) as i64;
    let denom = ((pairs as f64) * ((pairs - value_ties) as f64)).sqrt();
    if denom <= 0.0 {
        return NEUTRAL;
    }
    let tau = (concordant - discordant) as f64 / denom;
    ((tau + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// Share of previously quiescent cells that are active now.
///
/// Without a previous frame, or when nothing was quiescent, this is the current
/// active fraction.
#[must_use]
pub fn healing_rate(deltas: &[CellDelta], history: &MetricsHistory) -> f64 {
    let active_now: HashSet<Coord> = deltas
        .iter()
        .filter(|d| !d.state.is_quiescent())
        .map(|d| d.coord)
        .collect();

    let previously_quiescent: Vec<Coord> = history
        .newest()
        .map(|frame| {
            frame
                .states
                .iter()
                .filter(|(_, s)| s.is_quiescent())
                .map(|&(c, _)| c)
                .collect()
        })
        .unwrap_or_default();

    if previously_quiescent.is_empty() {
        if deltas.is_empty() {
            return 0.0;
        }
        return active_now.len() as f64 / deltas.len() as f64;
    }
    let healed = previously_quiescent
        .iter()
        .filter(|c| active_now.contains(c))
        .count();
    healed as f64 / previously_quiescent.len() as f64
}

/// Mean histogram intersection against up to `frames` prior distributions.
#[must_use]
pub fn pattern_stability(current: &[f64; 5], history: &MetricsHistory, frames: usize) -> f64 {
    let similarities: Vec<f64> = history
        .iter()
        .take(frames)
        .map(|frame| {
            let prior = frame.state_distribution();
            current.iter().zip(prior).map(|(p, q)| p.min(q)).sum()
        })
        .collect();
    if similarities.is_empty() {
        return NEUTRAL;
    }
    similarities.iter().sum::<f64>() / similarities.len() as f64
}

#[must_use]
pub fn emergence_score(entropy: f64, clustering: f64) -> f64 {
    (0.6 * (1.0 - entropy) + 0.4 * clustering).clamp(0.0, 1.0)
}

/// Fraction of active cells with an active face neighbour (no wrap).
#[must_use]
pub fn global_clustering(deltas: &[CellDelta]) -> f64 {
    let active: HashSet<Coord> = deltas
        .iter()
        .filter(|d| !d.state.is_quiescent())
        .map(|d| d.coord)
        .collect();
    if active.is_empty() {
        return 0.0;
    }
    let clustered = active
        .iter()
        .filter(|c| {
            FACE_OFFSETS
                .iter()
                .any(|&(dx, dy, dz)| active.contains(&c.offset(dx, dy, dz)))
        })
        .count();
    clustered as f64 / active.len() as f64
}

/// Ising-style overlay over doctrine tags.
#[derive(Debug, Clone, PartialEq)]
pub struct AlgotypeOverlay {
    pub clustering: f64,
    pub ising_energy: f64,
    pub distribution: BTreeMap<Doctrine, f64>,
}

/// Same-doctrine share and Ising energy of face-adjacent tagged pairs.
///
/// Each undirected pair is visited once, from its lexicographically smaller
/// end, by only following positive axis offsets.
#[must_use]
pub fn algotype_overlay(
    tags: &HashMap<Coord, Doctrine>,
    same_coupling: f64,
    cross_coupling: f64,
) -> AlgotypeOverlay {
    let mut counts: BTreeMap<Doctrine, usize> = BTreeMap::new();
    for d in tags.values() {
        *counts.entry(d.clone()).or_default() += 1;
    }
    let distribution = counts
        .into_iter()
        .map(|(d, c)| (d, c as f64 / tags.len() as f64))
        .collect();

    if tags.len() < 2 {
        return AlgotypeOverlay {
            clustering: NEUTRAL,
            ising_energy: 0.0,
            distribution,
        };
    }

    let (mut pairs, mut same, mut coupling) = (0usize, 0usize, 0.0);
    for (coord, doctrine) in tags {
        for (dx, dy, dz) in [(1, 0, 0), (0, 1, 0), (0, 0, 1)] {
            let Some(other) = tags.get(&coord.offset(dx, dy, dz)) else {
                continue;
            };
            pairs += 1;
            if other == doctrine {
                same += 1;
                coupling += same_coupling;
            } else {
                coupling += cross_coupling;
            }
        }
    }
    if pairs == 0 {
        return AlgotypeOverlay {
            clustering: 0.0,
            ising_energy: 0.0,
            distribution,
        };
    }
    AlgotypeOverlay {
        clustering: same as f64 / pairs as f64,
        ising_energy: -coupling,
        distribution,
    }
}

#[derive(Debug, Clone, Default)]
pub struct SideQuestAnalyzer {
    config: SideQuestConfig,
}

impl SideQuestAnalyzer {
    #[must_use]
    pub fn new(config: SideQuestConfig) -> Self {
        Self { config }
    }

    /// `doctrines` overrides the tags carried by the deltas when given.
    pub fn analyze(
        &self,
        deltas: &[CellDelta],
        local: &LocalMetrics,
        history: &MetricsHistory,
        doctrines: Option<&HashMap<Coord, Doctrine>>,
        tick: u64,
    ) -> Result<SideQuestMetrics, AnalysisError> {
        let flows: Vec<f64> = deltas
            .iter()
            .take(self.config.sortedness_window)
            .map(|d| d.sigma_flow)
            .collect();
        let current = state_distribution(deltas.iter().map(|d| d.state));
        let clustering = global_clustering(deltas);

        let tags: HashMap<Coord, Doctrine> = match doctrines {
            Some(map) => map.clone(),
            None => deltas
                .iter()
                .filter_map(|d| d.doctrine.clone().map(|doc| (d.coord, doc)))
                .collect(),
        };
        let overlay = algotype_overlay(
            &tags,
            self.config.same_doctrine_coupling,
            self.config.cross_doctrine_coupling,
        );

        Ok(SideQuestMetrics {
            clustering: AnalysisError::check("clustering", clustering)?,
            local_clustering: AnalysisError::check("local_clustering", local.clustering)?,
            sortedness: AnalysisError::check("sortedness", sortedness(&flows))?,
            healing_rate: AnalysisError::check("healing_rate", healing_rate(deltas, history))?,
            pattern_stability: AnalysisError::check(
                "pattern_stability",
                pattern_stability(&current, history, self.config.stability_frames),
            )?,
            emergence_score: AnalysisError::check(
                "emergence_score",
                emergence_score(local.entropy, clustering),
            )?,
            entropy: AnalysisError::check("entropy", local.entropy)?,
            divergence: AnalysisError::check("divergence", local.divergence)?,
            algotype_clustering: overlay.clustering,
            algotype_ising_energy: AnalysisError::check("ising_energy", overlay.ising_energy)?,
            doctrine_distribution: overlay.distribution,
            tick,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryFrame;
    use thunderbolt_data::{CellState, Thunderbit};

    fn delta(x: i32, y: i32, state: CellState, flow: f64) -> CellDelta {
        let cell = Thunderbit {
            state,
            sigma_flow: flow,
            ..Default::default()
        };
        CellDelta::from_cell(Coord::new(x, y, 0), Coord::new(10, 10, 1), &cell)
    }

    #[test]
    fn test_sortedness() {
        assert_eq!(sortedness(&[1.0, 2.0, 3.0, 4.0]), 1.0);
        assert_eq!(sortedness(&[4.0, 3.0, 2.0, 1.0]), 0.0);
        assert_eq!(sortedness(&[1.0, 2.0]), 0.5);
        assert_eq!(sortedness(&[0.3; 6]), 0.5);
    }

    #[test]
    fn test_healing_rate() {
        let mut history = MetricsHistory::default();
        assert_eq!(healing_rate(&[], &history), 0.0);

        let now = vec![
            delta(0, 0, CellState::Active, 0.9),
            delta(1, 0, CellState::Inactive, 0.0),
        ];
        assert_eq!(healing_rate(&now, &history), 0.5);

        history.push(HistoryFrame {
            tick: 1,
            flows: vec![0.0, 0.0],
            states: vec![
                (Coord::new(0, 0, 0), CellState::Inactive),
                (Coord::new(1, 0, 0), CellState::Dormant),
            ],
        });
        assert_eq!(healing_rate(&now, &history), 0.5);
    }

    #[test]
    fn test_pattern_stability() {
        let mut history = MetricsHistory::default();
        let current = state_distribution([CellState::Active, CellState::Inactive]);
        assert_eq!(pattern_stability(&current, &history, 5), 0.5);

        history.push(HistoryFrame {
            tick: 1,
            flows: vec![],
            states: vec![
                (Coord::new(0, 0, 0), CellState::Active),
                (Coord::new(1, 0, 0), CellState::Inactive),
            ],
        });
        assert!((pattern_stability(&current, &history, 5) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_emergence_clamped() {
        assert_eq!(emergence_score(0.0, 1.0), 1.0);
        assert_eq!(emergence_score(1.0, 0.0), 0.0);
        assert!((emergence_score(0.5, 0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_global_clustering() {
        assert_eq!(global_clustering(&[]), 0.0);
        let deltas = vec![
            delta(0, 0, CellState::Active, 0.9),
            delta(1, 0, CellState::Stable, 0.6),
            delta(5, 5, CellState::Active, 0.9),
            delta(6, 6, CellState::Inactive, 0.0),
        ];
        assert!((global_clustering(&deltas) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_algotype_overlay() {
        let a = Doctrine::new("a");
        let b = Doctrine::new("b");

        let lone: HashMap<Coord, Doctrine> = [(Coord::new(0, 0, 0), a.clone())].into();
        let overlay = algotype_overlay(&lone, 1.0, -1.0);
        assert_eq!((overlay.clustering, overlay.ising_energy), (0.5, 0.0));

        let apart: HashMap<Coord, Doctrine> = [
            (Coord::new(0, 0, 0), a.clone()),
            (Coord::new(5, 5, 0), a.clone()),
        ]
        .into();
        let overlay = algotype_overlay(&apart, 1.0, -1.0);
        assert_eq!((overlay.clustering, overlay.ising_energy), (0.0, 0.0));

        // a a b in a row: one same pair, one mixed pair.
        let row: HashMap<Coord, Doctrine> = [
            (Coord::new(0, 0, 0), a.clone()),
            (Coord::new(1, 0, 0), a.clone()),
            (Coord::new(2, 0, 0), b.clone()),
        ]
        .into();
        let overlay = algotype_overlay(&row, 1.0, -1.0);
        assert_eq!(overlay.clustering, 0.5);
        assert_eq!(overlay.ising_energy, 0.0);
        assert!((overlay.distribution[&a] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_analyze_prefers_external_doctrines() {
        let deltas = vec![
            delta(0, 0, CellState::Active, 0.9),
            delta(1, 0, CellState::Active, 0.9),
        ];
        let tags: HashMap<Coord, Doctrine> = [
            (Coord::new(0, 0, 0), Doctrine::new("x")),
            (Coord::new(1, 0, 0), Doctrine::new("x")),
        ]
        .into();
        let metrics = SideQuestAnalyzer::default()
            .analyze(
                &deltas,
                &LocalMetrics::default(),
                &MetricsHistory::default(),
                Some(&tags),
                4,
            )
            .unwrap();
        assert_eq!(metrics.algotype_clustering, 1.0);
        assert_eq!(metrics.algotype_ising_energy, -1.0);
        assert_eq!(metrics.clustering, 1.0);
        assert_eq!(metrics.tick, 4);

        let untagged = SideQuestAnalyzer::default()
            .analyze(
                &deltas,
                &LocalMetrics::default(),
                &MetricsHistory::default(),
                None,
                4,
            )
            .unwrap();
        assert_eq!(untagged.algotype_clustering, 0.5);
        assert!(untagged.doctrine_distribution.is_empty());
    }
}
