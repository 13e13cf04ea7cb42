use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer lattice coordinate.
///
/// Ordering is lexicographic over `(x, y, z)`, which is what the analyzers rely on
/// when they need to visit an undirected edge exactly once.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coord {
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns the coordinate shifted by `(dx, dy, dz)`.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    /// True when every axis lies in `[0, bound)`.
    #[must_use]
    pub fn within(self, bounds: Coord) -> bool {
        self.x >= 0
            && self.x < bounds.x
            && self.y >= 0
            && self.y < bounds.y
            && self.z >= 0
            && self.z < bounds.z
    }

    /// Number of cells in the box spanned by `self` used as bounds.
    #[must_use]
    pub fn volume(self) -> usize {
        self.x.max(0) as usize * self.y.max(0) as usize * self.z.max(0) as usize
    }

    /// Linear index of `self` inside `bounds` (x fastest, then y, then z).
    #[inline]
    #[must_use]
    pub fn linear_index(self, bounds: Coord) -> u64 {
        self.z as u64 * bounds.y as u64 * bounds.x as u64
            + self.y as u64 * bounds.x as u64
            + self.x as u64
    }
}

impl From<(i32, i32, i32)> for Coord {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}
