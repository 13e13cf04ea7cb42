//! Elementary (Wolfram-numbered) one-dimensional automata.
//!
//! A rule number encodes, in binary, the output bit for every neighbourhood
//! pattern. The pattern index is the binary value of the neighbourhood read
//! left to right, so for the classic radius-1 case `111 → bit 7`, `000 → bit 0`.

use crate::error::RuleError;

/// Wraps a possibly negative index onto `0..len`.
#[inline]
#[must_use]
pub fn wrap_index(index: isize, len: usize) -> usize {
    index.rem_euclid(len as isize) as usize
}

/// Number of neighbourhood patterns for a given radius (`2^(2r+1)`).
#[must_use]
pub fn pattern_count(radius: usize) -> usize {
    1usize << (2 * radius + 1)
}

fn check_rule(rule_number: u64, radius: usize) -> Result<(), RuleError> {
    let patterns = pattern_count(radius);
    if patterns > 64 {
        return Err(RuleError::invalid_parameters(format!(
            "radius {radius} needs {patterns} pattern bits, more than a u64 rule number holds"
        )));
    }
    if patterns < 64 && rule_number >> patterns != 0 {
        return Err(RuleError::RuleNumberOutOfRange {
            rule_number: u128::from(rule_number),
            table_size: patterns,
        });
    }
    Ok(())
}

/// Output bit of `rule_number` for a neighbourhood pattern index.
#[inline]
#[must_use]
pub fn rule_output(rule_number: u64, pattern: usize) -> u8 {
    ((rule_number >> pattern) & 1) as u8
}

/// One generation of a radius-1 elementary rule with wraparound edges.
pub fn apply_rule(cells: &[u8], rule_number: u64) -> Result<Vec<u8>, RuleError> {
    apply_rule_with_radius(cells, rule_number, 1)
}

/// One generation of an elementary rule with an arbitrary radius.
pub fn apply_rule_with_radius(
    cells: &[u8],
    rule_number: u64,
    radius: usize,
) -> Result<Vec<u8>, RuleError> {
    check_rule(rule_number, radius)?;
    if let Some(bad) = cells.iter().find(|&&c| c > 1) {
        return Err(RuleError::malformed(format!(
            "elementary cells must be 0 or 1, found {bad}"
        )));
    }
    if cells.is_empty() {
        return Ok(Vec::new());
    }

    let len = cells.len();
    let r = radius as isize;
    let next = (0..len)
        .map(|i| {
            let pattern = (-r..=r).fold(0usize, |acc, d| {
                (acc << 1) | cells[wrap_index(i as isize + d, len)] as usize
            });
            rule_output(rule_number, pattern)
        })
        .collect();
    Ok(next)
}

/// Space-time diagram: the seed row followed by `generations` successors.
pub fn evolve(seed: &[u8], rule_number: u64, generations: usize) -> Result<Vec<Vec<u8>>, RuleError> {
    let mut rows = Vec::with_capacity(generations + 1);
    rows.push(seed.to_vec());
    for _ in 0..generations {
        let next = match rows.last() {
            Some(row) => apply_rule(row, rule_number)?,
            None => break,
        };
        rows.push(next);
    }
    Ok(rows)
}
