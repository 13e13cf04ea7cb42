//! Outer-totalistic rules over `k` states and `r` neighbours.
//!
//! The transition depends only on `(center, sum of neighbour states)`. A rule
//! number read as `k`-ary digits, least significant first and zero padded,
//! fills a table of `k · (k·r + 1)` entries indexed by
//! `center · (k·r + 1) + sum`.

use super::state_grid::StateGrid;
use crate::error::RuleError;

fn check_params(k: u32, r: u32) -> Result<(), RuleError> {
    if k < 2 {
        return Err(RuleError::invalid_parameters(format!(
            "need at least 2 states, got k = {k}"
        )));
    }
    if k > u32::from(u8::MAX) + 1 {
        return Err(RuleError::invalid_parameters(format!(
            "at most 256 states fit in a cell, got k = {k}"
        )));
    }
    if r == 0 {
        return Err(RuleError::invalid_parameters("need at least 1 neighbour"));
    }
    Ok(())
}

/// Width of one center-state row of the table (`k·r + 1`).
#[must_use]
pub fn sum_buckets(k: u32, r: u32) -> usize {
    (k * r + 1) as usize
}

/// Number of table entries (`k · (k·r + 1)`).
#[must_use]
pub fn table_size(k: u32, r: u32) -> usize {
    k as usize * sum_buckets(k, r)
}

/// Table position of `(center, sum)`; sums past `k·r` clamp to the last bucket.
#[inline]
#[must_use]
pub fn table_index(center: u8, sum: u32, k: u32, r: u32) -> usize {
    let buckets = sum_buckets(k, r);
    usize::from(center) * buckets + (sum as usize).min(buckets - 1)
}

/// Decodes a rule number into its lookup table.
pub fn rule_table(rule_number: u128, k: u32, r: u32) -> Result<Vec<u8>, RuleError> {
    check_params(k, r)?;
    let size = table_size(k, r);
    let base = u128::from(k);
    let mut remaining = rule_number;
    let mut table = Vec::with_capacity(size);
    for _ in 0..size {
        table.push((remaining % base) as u8);
        remaining /= base;
    }
    if remaining != 0 {
        return Err(RuleError::RuleNumberOutOfRange {
            rule_number,
            table_size: size,
        });
    }
    Ok(table)
}

/// Encodes a lookup table back into its rule number.
pub fn encode_table(table: &[u8], k: u32) -> Result<u128, RuleError> {
    if k < 2 {
        return Err(RuleError::invalid_parameters(format!(
            "need at least 2 states, got k = {k}"
        )));
    }
    let base = u128::from(k);
    table.iter().rev().try_fold(0u128, |acc, &digit| {
        if u32::from(digit) >= k {
            return Err(RuleError::malformed(format!(
                "table digit {digit} is not a valid {k}-ary state"
            )));
        }
        acc.checked_mul(base)
            .and_then(|v| v.checked_add(u128::from(digit)))
            .ok_or_else(|| RuleError::invalid_parameters("table too large for a u128 rule number"))
    })
}

/// Applies a decoded table to every cell of `grid`.
///
/// The grid's topology must give no cell more than `r` neighbours.
pub fn apply_table(grid: &StateGrid, table: &[u8], k: u32, r: u32) -> Result<StateGrid, RuleError> {
    check_params(k, r)?;
    if table.len() != table_size(k, r) {
        return Err(RuleError::malformed(format!(
            "table has {} entries, expected {}",
            table.len(),
            table_size(k, r)
        )));
    }
    grid.check_states(k)?;

    let neighbors = grid.neighbor_indices()?;
    let widest = neighbors.iter().map(Vec::len).max().unwrap_or(0);
    if widest > r as usize {
        return Err(RuleError::invalid_parameters(format!(
            "grid cells have up to {widest} neighbours, the rule is defined for {r}"
        )));
    }
    let sums = grid.sums_over(&neighbors);
    let next = grid
        .cells
        .iter()
        .zip(sums)
        .map(|(&center, sum)| table[table_index(center, sum, k, r)])
        .collect();
    Ok(grid.with_cells(next))
}

/// One generation of an outer-totalistic rule; the table is built once per call.
pub fn apply_rule_number(
    grid: &StateGrid,
    rule_number: u128,
    k: u32,
    r: u32,
) -> Result<StateGrid, RuleError> {
    let table = rule_table(rule_number, k, r)?;
    apply_table(grid, &table, k, r)
}
