//! Rules and diagnostics built on top of the totalistic encoding.

use super::state_grid::StateGrid;
use super::totalistic::{apply_rule_number, rule_table, sum_buckets};
use crate::error::RuleError;
use serde::Serialize;

/// Direct XOR rule: `new = center ⊕ parity(neighbour sum)` on a binary grid.
pub fn xor_rule(grid: &StateGrid) -> Result<StateGrid, RuleError> {
    grid.check_states(2)?;
    let sums = grid.neighbor_sums()?;
    let next = grid
        .cells
        .iter()
        .zip(sums)
        .map(|(&center, sum)| center ^ (sum % 2) as u8)
        .collect();
    Ok(grid.with_cells(next))
}

/// Second-order reversible step: `next = f(current) ⊖ previous (mod k)`.
///
/// For binary rules this is `f(current) XOR previous`. Because the map is its
/// own inverse in the `previous` slot, calling it with the frames swapped,
/// `reversible_step(current, next)`, recovers `previous` exactly.
pub fn reversible_step(
    current: &StateGrid,
    previous: &StateGrid,
    rule_number: u128,
    k: u32,
    r: u32,
) -> Result<StateGrid, RuleError> {
    if current.bounds != previous.bounds {
        return Err(RuleError::malformed(format!(
            "frame bounds differ: {} vs {}",
            current.bounds, previous.bounds
        )));
    }
    previous.check_states(k)?;
    let forced = apply_rule_number(current, rule_number, k, r)?;
    let next = forced
        .cells
        .iter()
        .zip(&previous.cells)
        .map(|(&f, &p)| ((u32::from(f) + k - u32::from(p)) % k) as u8)
        .collect();
    Ok(current.with_cells(next))
}

/// Runs a second-order rule for `steps` generations, returning the last two
/// frames as `(previous, current)`.
pub fn run_reversible(
    previous: StateGrid,
    current: StateGrid,
    rule_number: u128,
    k: u32,
    r: u32,
    steps: usize,
) -> Result<(StateGrid, StateGrid), RuleError> {
    let (mut prev, mut cur) = (previous, current);
    for _ in 0..steps {
        let next = reversible_step(&cur, &prev, rule_number, k, r)?;
        prev = cur;
        cur = next;
    }
    Ok((prev, cur))
}

/// Static properties of a rule table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleAnalysis {
    pub k: u32,
    pub r: u32,
    pub table_size: usize,
    /// `(center, neighbour_sum)` entries that map the center onto itself.
    pub fixed_points: Vec<(u8, u32)>,
    /// Center → output is injective inside every neighbour-sum bucket.
    pub is_reversible: bool,
    /// Fraction of table entries mapping to a non-zero state.
    pub rule_lambda: f64,
}

/// Enumerates fixed points and checks the simplified reversibility criterion.
pub fn analyze_rule(rule_number: u128, k: u32, r: u32) -> Result<RuleAnalysis, RuleError> {
    let table = rule_table(rule_number, k, r)?;
    let buckets = sum_buckets(k, r);

    let mut fixed_points = Vec::new();
    for center in 0..k {
        for sum in 0..buckets {
            if u32::from(table[center as usize * buckets + sum]) == center {
                fixed_points.push((center as u8, sum as u32));
            }
        }
    }

    let is_reversible = (0..buckets).all(|sum| {
        let mut seen = vec![false; k as usize];
        (0..k as usize).all(|center| {
            let out = table[center * buckets + sum] as usize;
            !std::mem::replace(&mut seen[out], true)
        })
    });

    let non_quiescent = table.iter().filter(|&&v| v != 0).count();
    Ok(RuleAnalysis {
        k,
        r,
        table_size: table.len(),
        fixed_points,
        is_reversible,
        rule_lambda: non_quiescent as f64 / table.len() as f64,
    })
}
