//! Dense discrete-state grid used by the rule-engine helpers.

use crate::error::{LatticeError, RuleError};
use crate::neighborhood::{check_bounds, Stencil};
use serde::{Deserialize, Serialize};
use thunderbolt_data::{BoundaryCondition, Coord, NeighborhoodType};

/// A flat arena of `k`-ary cell states with a fixed topology.
///
/// Cells are stored x-fastest, then y, then z, the same order as
/// [`Coord::linear_index`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateGrid {
    pub bounds: Coord,
    pub cells: Vec<u8>,
    pub neighborhood: NeighborhoodType,
    pub boundary: BoundaryCondition,
}

impl StateGrid {
    /// All-zero grid with a periodic Moore radius-1 neighbourhood.
    pub fn new(bounds: Coord) -> Result<Self, LatticeError> {
        check_bounds(bounds)?;
        Ok(Self {
            bounds,
            cells: vec![0; bounds.volume()],
            neighborhood: NeighborhoodType::MOORE,
            boundary: BoundaryCondition::Periodic,
        })
    }

    /// Grid over existing cell values.
    pub fn from_cells(bounds: Coord, cells: Vec<u8>) -> Result<Self, RuleError> {
        check_bounds(bounds).map_err(|e| RuleError::malformed(e.to_string()))?;
        if cells.len() != bounds.volume() {
            return Err(RuleError::malformed(format!(
                "expected {} cells for bounds {bounds}, got {}",
                bounds.volume(),
                cells.len()
            )));
        }
        Ok(Self {
            bounds,
            cells,
            neighborhood: NeighborhoodType::MOORE,
            boundary: BoundaryCondition::Periodic,
        })
    }

    #[must_use]
    pub fn with_topology(
        mut self,
        neighborhood: NeighborhoodType,
        boundary: BoundaryCondition,
    ) -> Self {
        self.neighborhood = neighborhood;
        self.boundary = boundary;
        self
    }

    #[inline]
    #[must_use]
    pub fn index_of(&self, coord: Coord) -> usize {
        coord.linear_index(self.bounds) as usize
    }

    #[inline]
    #[must_use]
    pub fn coord_of(&self, index: usize) -> Coord {
        let w = self.bounds.x as usize;
        let h = self.bounds.y as usize;
        Coord::new(
            (index % w) as i32,
            ((index / w) % h) as i32,
            (index / (w * h)) as i32,
        )
    }

    #[must_use]
    pub fn get(&self, coord: Coord) -> Option<u8> {
        coord
            .within(self.bounds)
            .then(|| self.cells[self.index_of(coord)])
    }

    pub fn set(&mut self, coord: Coord, value: u8) -> Result<(), LatticeError> {
        if !coord.within(self.bounds) {
            return Err(LatticeError::OutOfBounds {
                coord,
                bounds: self.bounds,
            });
        }
        let idx = self.index_of(coord);
        self.cells[idx] = value;
        Ok(())
    }

    /// Neighbour indices for every cell, resolved once through a stencil.
    pub fn neighbor_indices(&self) -> Result<Vec<Vec<usize>>, RuleError> {
        let stencil = Stencil::new(self.neighborhood, self.boundary)
            .map_err(|e| RuleError::invalid_parameters(e.to_string()))?;
        Ok((0..self.cells.len())
            .map(|i| {
                stencil
                    .neighbors(self.coord_of(i), self.bounds)
                    .into_iter()
                    .map(|n| self.index_of(n))
                    .collect()
            })
            .collect())
    }

    /// Sum of neighbour states for every cell.
    pub fn neighbor_sums(&self) -> Result<Vec<u32>, RuleError> {
        Ok(self.sums_over(&self.neighbor_indices()?))
    }

    /// Sums cell states over precomputed neighbour lists.
    #[must_use]
    pub fn sums_over(&self, neighbors: &[Vec<usize>]) -> Vec<u32> {
        neighbors
            .iter()
            .map(|ns| ns.iter().map(|&n| u32::from(self.cells[n])).sum())
            .collect()
    }

    /// Copy of the grid carrying new cell values.
    #[must_use]
    pub fn with_cells(&self, cells: Vec<u8>) -> Self {
        Self {
            bounds: self.bounds,
            cells,
            neighborhood: self.neighborhood,
            boundary: self.boundary,
        }
    }

    /// Checks every cell is a valid `k`-ary state.
    pub fn check_states(&self, k: u32) -> Result<(), RuleError> {
        match self.cells.iter().find(|&&c| u32::from(c) >= k) {
            Some(bad) => Err(RuleError::malformed(format!(
                "cell state {bad} is not a valid {k}-ary state"
            ))),
            None => Ok(()),
        }
    }
}
