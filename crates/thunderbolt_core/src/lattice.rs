//! Grid containers: the sparse Thunderbit lattice and the legacy dense stub.

use crate::dynamics::classify_state;
use crate::error::LatticeError;
use crate::neighborhood::check_bounds;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f64::consts::TAU;
use thunderbolt_data::{CellDelta, Coord, Doctrine, Thunderbit};

/// Sparse 3D lattice keyed by coordinate.
///
/// Every key lies inside `bounds`; the box may be only partially occupied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    pub bounds: Coord,
    pub cells: HashMap<Coord, Thunderbit>,
    pub tick: u64,
}

impl Lattice {
    /// Empty lattice.
    pub fn new(bounds: Coord) -> Result<Self, LatticeError> {
        check_bounds(bounds)?;
        Ok(Self {
            bounds,
            cells: HashMap::new(),
            tick: 0,
        })
    }

    /// Fills every coordinate of the box with a copy of `template`.
    pub fn filled(bounds: Coord, template: &Thunderbit) -> Result<Self, LatticeError> {
        let mut lattice = Self::new(bounds)?;
        lattice.cells.reserve(bounds.volume());
        for coord in box_coords(bounds) {
            lattice.cells.insert(coord, template.clone());
        }
        Ok(lattice)
    }

    /// Fills the box with seeded random cells.
    ///
    /// Roughly `density` of the cells start with a high flow, the rest idle near
    /// zero; phases are uniform on `[0, 2π)`.
    pub fn random(bounds: Coord, seed: u64, density: f64) -> Result<Self, LatticeError> {
        let mut lattice = Self::new(bounds)?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let density = density.clamp(0.0, 1.0);
        for coord in box_coords(bounds) {
            let sigma_flow = if rng.gen_bool(density) {
                rng.gen_range(0.5..=1.0)
            } else {
                rng.gen_range(0.0..0.2)
            };
            let lambda_sensitivity = rng.gen_range(0.0..0.5);
            lattice.cells.insert(
                coord,
                Thunderbit {
                    state: classify_state(sigma_flow, lambda_sensitivity),
                    sigma_flow,
                    phi_phase: rng.gen_range(0.0..TAU),
                    lambda_sensitivity,
                    tick: 0,
                    doctrine: None,
                },
            );
        }
        Ok(lattice)
    }

    /// Builds a lattice from explicit cells, rejecting any outside `bounds`.
    pub fn from_cells<I>(bounds: Coord, cells: I) -> Result<Self, LatticeError>
    where
        I: IntoIterator<Item = (Coord, Thunderbit)>,
    {
        let mut lattice = Self::new(bounds)?;
        for (coord, cell) in cells {
            lattice.insert(coord, cell)?;
        }
        Ok(lattice)
    }

    pub fn insert(&mut self, coord: Coord, cell: Thunderbit) -> Result<(), LatticeError> {
        if !coord.within(self.bounds) {
            return Err(LatticeError::OutOfBounds {
                coord,
                bounds: self.bounds,
            });
        }
        self.cells.insert(coord, cell);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, coord: Coord) -> Option<&Thunderbit> {
        self.cells.get(&coord)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Occupied coordinates in lexicographic order.
    #[must_use]
    pub fn sorted_coords(&self) -> Vec<Coord> {
        let mut coords: Vec<Coord> = self.cells.keys().copied().collect();
        coords.sort_unstable();
        coords
    }

    /// Tags every cell with a doctrine drawn uniformly from `doctrines`.
    pub fn assign_doctrines(&mut self, doctrines: &[Doctrine], seed: u64) {
        if doctrines.is_empty() {
            return;
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        for coord in self.sorted_coords() {
            let pick = doctrines[rng.gen_range(0..doctrines.len())].clone();
            if let Some(cell) = self.cells.get_mut(&coord) {
                cell.doctrine = Some(pick);
            }
        }
    }

    /// Deltas describing the current cells, sorted by coordinate.
    #[must_use]
    pub fn deltas(&self) -> Vec<CellDelta> {
        self.sorted_coords()
            .into_iter()
            .filter_map(|c| {
                self.cells
                    .get(&c)
                    .map(|cell| CellDelta::from_cell(c, self.bounds, cell))
            })
            .collect()
    }
}

/// Every coordinate of the box, z outermost.
fn box_coords(bounds: Coord) -> impl Iterator<Item = Coord> {
    (0..bounds.z).flat_map(move |z| {
        (0..bounds.y).flat_map(move |y| (0..bounds.x).map(move |x| Coord::new(x, y, z)))
    })
}

/// Dense 2D grid kept for back-compat; it stores no per-cell state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyGrid {
    pub size: u32,
    pub tick: u64,
}

/// Either grid shape the stepper accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Grid {
    Legacy(LegacyGrid),
    Lattice(Lattice),
}

impl Grid {
    #[must_use]
    pub fn tick(&self) -> u64 {
        match self {
            Grid::Legacy(g) => g.tick,
            Grid::Lattice(l) => l.tick,
        }
    }

    /// Occupied cell count (`size²` for the legacy plane).
    #[must_use]
    pub fn cell_count(&self) -> usize {
        match self {
            Grid::Legacy(g) => g.size as usize * g.size as usize,
            Grid::Lattice(l) => l.len(),
        }
    }

    #[must_use]
    pub fn as_lattice(&self) -> Option<&Lattice> {
        match self {
            Grid::Lattice(l) => Some(l),
            Grid::Legacy(_) => None,
        }
    }
}

impl From<Lattice> for Grid {
    fn from(lattice: Lattice) -> Self {
        Grid::Lattice(lattice)
    }
}

impl From<LegacyGrid> for Grid {
    fn from(grid: LegacyGrid) -> Self {
        Grid::Legacy(grid)
    }
}
