use proptest::prelude::*;
use thunderbolt_lib::data::{BoundaryCondition, Coord, NeighborhoodType};
use thunderbolt_lib::engine::neighborhood::{compute, neighbor_count};
use thunderbolt_lib::engine::perturbation::correlation;
use thunderbolt_lib::engine::rules::totalistic::{encode_table, rule_table, table_size};

fn topology() -> impl Strategy<Value = NeighborhoodType> {
    prop_oneof![
        (1u32..=2).prop_map(|radius| NeighborhoodType::VonNeumann { radius }),
        (1u32..=2).prop_map(|radius| NeighborhoodType::Moore { radius }),
    ]
}

fn bounded_coord() -> impl Strategy<Value = (Coord, Coord)> {
    (1i32..8, 1i32..8, 1i32..8).prop_flat_map(|(bx, by, bz)| {
        (0..bx, 0..by, 0..bz)
            .prop_map(move |(x, y, z)| (Coord::new(x, y, z), Coord::new(bx, by, bz)))
    })
}

proptest! {
    #[test]
    fn periodic_stays_in_range((coord, bounds) in bounded_coord(), nt in topology()) {
        let neighbors = compute(coord, bounds, nt, BoundaryCondition::Periodic).unwrap();
        for n in &neighbors {
            prop_assert!(n.within(bounds), "{n} escaped {bounds}");
        }
        prop_assert!(!neighbors.contains(&coord));
    }

    #[test]
    fn clip_stays_in_range((coord, bounds) in bounded_coord(), nt in topology()) {
        let neighbors = compute(coord, bounds, nt, BoundaryCondition::Clip).unwrap();
        prop_assert!(neighbors.len() <= neighbor_count(nt));
        for n in &neighbors {
            prop_assert!(n.within(bounds));
        }
    }

    #[test]
    fn reflect_results_are_unique((coord, bounds) in bounded_coord(), nt in topology()) {
        let neighbors = compute(coord, bounds, nt, BoundaryCondition::Reflect).unwrap();
        let mut sorted = neighbors.clone();
        sorted.sort();
        sorted.dedup();
        prop_assert_eq!(sorted.len(), neighbors.len());
        prop_assert!(neighbors.iter().all(|n| n.within(bounds)));
    }

    #[test]
    fn binary_totalistic_round_trip(rule in 0u128..(1u128 << 26)) {
        let table = rule_table(rule, 2, 6).unwrap();
        prop_assert_eq!(table.len(), table_size(2, 6));
        prop_assert_eq!(encode_table(&table, 2).unwrap(), rule);
    }

    #[test]
    fn correlation_is_symmetric(
        a in prop::collection::vec(-10.0f64..10.0, 2..40),
        b in prop::collection::vec(-10.0f64..10.0, 2..40),
    ) {
        let ab = correlation(&a, &b);
        let ba = correlation(&b, &a);
        prop_assert!(ab.is_finite());
        prop_assert!((ab - ba).abs() < 1e-12);
        prop_assert!((-1.0 - 1e-9..=1.0 + 1e-9).contains(&ab));
    }
}

#[test]
fn test_interior_neighbor_counts() {
    let bounds = Coord::new(5, 5, 5);
    let center = Coord::new(2, 2, 2);
    let vn = compute(center, bounds, NeighborhoodType::VON_NEUMANN, BoundaryCondition::Clip).unwrap();
    let moore = compute(center, bounds, NeighborhoodType::MOORE, BoundaryCondition::Clip).unwrap();
    assert_eq!(vn.len(), 6);
    assert_eq!(moore.len(), 26);
}

#[test]
fn test_table_sizes() {
    for (k, r) in [(2, 1), (2, 8), (3, 6), (4, 2)] {
        assert_eq!(rule_table(0, k, r).unwrap().len(), (k * (k * r + 1)) as usize);
    }
}
