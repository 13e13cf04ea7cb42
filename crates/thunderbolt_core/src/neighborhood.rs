//! Lattice geometry: neighbour offsets, boundary handling and distances.
//!
//! Everything here is a pure function of its arguments. Offsets are enumerated
//! in a fixed `dz, dy, dx` order so that two calls with the same inputs always
//! return neighbours in the same order, which keeps sampling-based metrics
//! reproducible.

use crate::error::LatticeError;
use std::collections::HashSet;
use thunderbolt_data::{BoundaryCondition, Coord, NeighborhoodType};

/// Largest neighbourhood radius a stencil accepts.
pub const MAX_RADIUS: u32 = 8;

/// Rejects radii whose offset table would not fit a step's budget.
pub fn check_radius(neighborhood_type: NeighborhoodType) -> Result<(), LatticeError> {
    let radius = neighborhood_type.radius();
    if radius > MAX_RADIUS {
        return Err(LatticeError::RadiusTooLarge {
            radius,
            limit: MAX_RADIUS,
        });
    }
    Ok(())
}

/// Enumerates the non-zero offsets of a neighbourhood. Radius is checked by callers.
fn offsets(neighborhood_type: NeighborhoodType) -> Vec<(i32, i32, i32)> {
    let r = neighborhood_type.radius() as i32;
    let mut out = Vec::with_capacity(neighbor_count(neighborhood_type));
    for dz in -r..=r {
        for dy in -r..=r {
            for dx in -r..=r {
                if dx == 0 && dy == 0 && dz == 0 {
                    continue;
                }
                let inside = match neighborhood_type {
                    NeighborhoodType::VonNeumann { .. } => dx.abs() + dy.abs() + dz.abs() <= r,
                    NeighborhoodType::Moore { .. } => true,
                };
                if inside {
                    out.push((dx, dy, dz));
                }
            }
        }
    }
    out
}

/// Number of neighbours an interior cell has.
///
/// Closed form for both topologies: Moore is the cube minus its centre, Von
/// Neumann is the octahedral number minus its centre.
#[must_use]
pub fn neighbor_count(neighborhood_type: NeighborhoodType) -> usize {
    let r = u128::from(neighborhood_type.radius());
    let count = match neighborhood_type {
        NeighborhoodType::Moore { .. } => (2 * r + 1).pow(3) - 1,
        NeighborhoodType::VonNeumann { .. } => (2 * r + 1) * (2 * r * r + 2 * r + 3) / 3 - 1,
    };
    usize::try_from(count).unwrap_or(usize::MAX)
}

/// Maps one axis value through the boundary condition.
#[inline]
fn resolve_axis(c: i32, bound: i32, boundary: BoundaryCondition) -> Option<i32> {
    match boundary {
        BoundaryCondition::Clip => (0..bound).contains(&c).then_some(c),
        BoundaryCondition::Periodic => Some(c.rem_euclid(bound)),
        BoundaryCondition::Reflect => {
            let reflected = if c < 0 {
                -c
            } else if c >= bound {
                2 * bound - c - 2
            } else {
                c
            };
            (0..bound).contains(&reflected).then_some(reflected)
        }
    }
}

/// Applies a boundary condition to a coordinate, axis by axis.
///
/// Returns `None` when the coordinate has no image inside the box.
#[inline]
#[must_use]
pub fn apply_boundary(coord: Coord, bounds: Coord, boundary: BoundaryCondition) -> Option<Coord> {
    Some(Coord::new(
        resolve_axis(coord.x, bounds.x, boundary)?,
        resolve_axis(coord.y, bounds.y, boundary)?,
        resolve_axis(coord.z, bounds.z, boundary)?,
    ))
}

/// Validates lattice bounds.
pub fn check_bounds(bounds: Coord) -> Result<(), LatticeError> {
    if bounds.x <= 0 || bounds.y <= 0 || bounds.z <= 0 {
        return Err(LatticeError::InvalidBounds(bounds));
    }
    Ok(())
}

/// Neighbour coordinates of `coord` inside `bounds`.
///
/// The result is de-duplicated in first-seen order and never contains `coord`
/// itself, even when a periodic wrap on a thin axis folds an offset back onto
/// the centre.
pub fn compute(
    coord: Coord,
    bounds: Coord,
    neighborhood_type: NeighborhoodType,
    boundary: BoundaryCondition,
) -> Result<Vec<Coord>, LatticeError> {
    check_bounds(bounds)?;
    Ok(Stencil::new(neighborhood_type, boundary)?.neighbors(coord, bounds))
}

/// Precomputed offsets for one topology/boundary pair.
///
/// A step builds one stencil and resolves every cell through it instead of
/// re-enumerating offsets per cell.
#[derive(Debug, Clone)]
pub struct Stencil {
    offsets: Vec<(i32, i32, i32)>,
    boundary: BoundaryCondition,
}

impl Stencil {
    pub fn new(
        neighborhood_type: NeighborhoodType,
        boundary: BoundaryCondition,
    ) -> Result<Self, LatticeError> {
        check_radius(neighborhood_type)?;
        Ok(Self {
            offsets: offsets(neighborhood_type),
            boundary,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Resolves the neighbours of `coord`. Callers validate `bounds` first.
    #[must_use]
    pub fn neighbors(&self, coord: Coord, bounds: Coord) -> Vec<Coord> {
        let mut seen = HashSet::with_capacity(self.offsets.len());
        let mut out = Vec::with_capacity(self.offsets.len());
        for &(dx, dy, dz) in &self.offsets {
            let Some(n) = apply_boundary(coord.offset(dx, dy, dz), bounds, self.boundary) else {
                continue;
            };
            if n != coord && seen.insert(n) {
                out.push(n);
            }
        }
        out
    }
}

/// True when `b` is one of `a`'s neighbours under an unbounded lattice.
#[must_use]
pub fn is_adjacent(a: Coord, b: Coord, neighborhood_type: NeighborhoodType) -> bool {
    if a == b {
        return false;
    }
    let r = neighborhood_type.radius() as i64;
    match neighborhood_type {
        NeighborhoodType::VonNeumann { .. } => manhattan(a, b) <= r,
        NeighborhoodType::Moore { .. } => chebyshev(a, b) <= r,
    }
}

#[must_use]
pub fn manhattan(a: Coord, b: Coord) -> i64 {
    (i64::from(a.x) - i64::from(b.x)).abs()
        + (i64::from(a.y) - i64::from(b.y)).abs()
        + (i64::from(a.z) - i64::from(b.z)).abs()
}

#[must_use]
pub fn chebyshev(a: Coord, b: Coord) -> i64 {
    (i64::from(a.x) - i64::from(b.x))
        .abs()
        .max((i64::from(a.y) - i64::from(b.y)).abs())
        .max((i64::from(a.z) - i64::from(b.z)).abs())
}

#[must_use]
pub fn euclidean(a: Coord, b: Coord) -> f64 {
    let dx = f64::from(a.x) - f64::from(b.x);
    let dy = f64::from(a.y) - f64::from(b.y);
    let dz = f64::from(a.z) - f64::from(b.z);
    (dx * dx + dy * dy + dz * dz).sqrt()
}
