//! Ring Module Tests
//!
//! ## Test Scopes
//! - **Continuum**: Lower-bound lookups, wrap-around and clockwise walks over hand-placed points.
//! - **HashRing**: Deterministic placement, incremental add/remove, config-only updates.
//! - **Weights**: Weight multipliers, weight functions and full rebuilds.

#[cfg(test)]
mod tests {
    use crate::error::CacheError;
    use crate::ring::continuum::{Continuum, hash_key, node_points};
    use crate::ring::{HashRing, NodeSpec, WeightFn};
    use std::collections::HashSet;

    fn spec(name: &str, vnodes: u32) -> NodeSpec {
        NodeSpec::new(name, format!("{}.internal:8080", name)).with_vnodes(vnodes)
    }

    fn two_node_ring() -> HashRing {
        let ring = HashRing::new();
        ring.add_node(spec("A", 3)).unwrap();
        ring.add_node(spec("B", 3)).unwrap();
        ring
    }

    // ============================================================
    // HASH TESTS
    // ============================================================

    #[test]
    fn test_hash_is_stable_across_runs() {
        assert_eq!(
            hash_key("foo"),
            58686998438798322974467776505749455156u128,
            "Hash positions must never change between releases"
        );
        assert_eq!(hash_key("bar"), hash_key("bar"));
        assert_ne!(hash_key("foo"), hash_key("bar"));
    }

    #[test]
    fn test_node_points_follow_name_index_scheme() {
        let points = node_points(&spec("A", 3)).unwrap();

        assert_eq!(points.len(), 3);
        assert_eq!(points[0], hash_key("A-0"));
        assert_eq!(points[2], hash_key("A-2"));
    }

    // ============================================================
    // CONTINUUM TESTS (hand-placed points)
    // ============================================================

    fn manual_continuum() -> Continuum {
        let mut continuum = Continuum::new();
        continuum.insert_node(spec("A", 2), &[10, 30]);
        continuum.insert_node(spec("B", 1), &[20]);
        continuum
    }

    #[test]
    fn test_point_at_uses_lower_bound() {
        let continuum = manual_continuum();

        assert_eq!(continuum.point_at(20), Some((20, "B")), "Exact hit owns the key");
        assert_eq!(continuum.point_at(21), Some((30, "A")));
        assert_eq!(continuum.point_at(0), Some((10, "A")));
    }

    #[test]
    fn test_point_at_wraps_past_the_top() {
        let continuum = manual_continuum();

        assert_eq!(continuum.point_at(31), Some((10, "A")));
        assert_eq!(continuum.position(31), Some(0));
        assert_eq!(continuum.position(25), Some(2));
    }

    #[test]
    fn test_walk_visits_every_point_once() {
        let continuum = manual_continuum();

        let walked: Vec<u128> = continuum.walk(25).map(|(hash, _)| hash).collect();
        assert_eq!(walked, vec![30, 10, 20]);
    }

    #[test]
    fn test_owners_distinct_and_repeated() {
        let continuum = manual_continuum();

        assert_eq!(continuum.owners(15, None, true), vec!["B", "A"]);
        assert_eq!(continuum.owners(25, None, false), vec!["A", "A", "B"]);
        assert_eq!(continuum.owners(25, Some(2), false), vec!["A", "A"]);
        assert_eq!(continuum.owners(25, Some(10), true), vec!["A", "B"]);
        assert!(continuum.owners(25, Some(0), true).is_empty());
    }

    #[test]
    fn test_colliding_point_keeps_first_owner() {
        let mut continuum = manual_continuum();
        continuum.insert_node(spec("C", 1), &[20]);

        assert_eq!(continuum.point_at(20), Some((20, "B")));
        assert_eq!(continuum.distribution().get("C"), Some(&0));
        assert!(continuum.is_consistent());
    }

    #[test]
    fn test_empty_continuum_has_no_points() {
        let continuum = Continuum::new();

        assert!(continuum.point_at(42).is_none());
        assert!(continuum.position(42).is_none());
        assert!(continuum.is_consistent());
    }

    // ============================================================
    // LOOKUP TESTS
    // ============================================================

    #[test]
    fn test_empty_ring_reports_ring_empty() {
        let ring = HashRing::new();

        assert_eq!(ring.locate("foo"), Err(CacheError::RingEmpty));
        assert_eq!(ring.locate_many("foo", Some(2), true), Err(CacheError::RingEmpty));
        assert_eq!(ring.owners("foo", 2), Err(CacheError::RingEmpty));
        assert_eq!(ring.locate_position("foo"), Err(CacheError::RingEmpty));
    }

    #[test]
    fn test_locate_is_deterministic() {
        let ring = two_node_ring();

        assert_eq!(ring.locate("foo").unwrap(), "B");
        assert_eq!(ring.locate("baz").unwrap(), "A");
        for _ in 0..10 {
            assert_eq!(ring.locate("foo").unwrap(), "B");
        }

        let rebuilt = two_node_ring();
        assert_eq!(rebuilt.locate("foo").unwrap(), ring.locate("foo").unwrap());
    }

    #[test]
    fn test_locate_wraps_to_first_point() {
        let ring = two_node_ring();

        // "bar" hashes above every point of A and B
        assert_eq!(ring.locate_position("bar").unwrap(), 0);
        assert_eq!(ring.locate("bar").unwrap(), ring.points()[0].node);
    }

    #[test]
    fn test_locate_exact_point_hash_returns_its_owner() {
        let ring = two_node_ring();

        let point = ring.locate_point("A-1").unwrap();
        assert_eq!(point.hash, hash_key("A-1"));
        assert_eq!(point.node, "A");
    }

    #[test]
    fn test_remove_node_reroutes_everything() {
        let ring = two_node_ring();
        ring.remove_node("B").unwrap();

        for i in 0..200 {
            assert_eq!(ring.locate(&format!("key-{}", i)).unwrap(), "A");
        }
    }

    #[test]
    fn test_typed_accessors() {
        let ring = HashRing::new();
        ring.add_node(spec("A", 4).with_weight(2).with_instance_id("i-0a"))
            .unwrap();

        assert_eq!(ring.locate_address("anything").unwrap(), "A.internal:8080");
        assert_eq!(ring.locate_weight("anything").unwrap(), 2);
        assert_eq!(ring.locate_spec("anything").unwrap().vnodes, 4);
        assert_eq!(ring.instances(), vec!["i-0a".to_string()]);
    }

    #[test]
    fn test_locate_always_returns_configured_node() {
        let ring = HashRing::new();
        for name in ["n1", "n2", "n3", "n4"] {
            ring.add_node(spec(name, 40)).unwrap();
        }
        ring.remove_node("n2").unwrap();

        let configured: HashSet<String> = ring.nodes().into_iter().collect();
        for i in 0..1000 {
            let owner = ring.locate(&format!("user:{}", i)).unwrap();
            assert!(configured.contains(&owner), "{} is not configured", owner);
        }
    }

    // ============================================================
    // LOCATE_MANY TESTS
    // ============================================================

    #[test]
    fn test_locate_many_distinct() {
        let ring = HashRing::new();
        for name in ["n1", "n2", "n3"] {
            ring.add_node(spec(name, 20)).unwrap();
        }

        for i in 0..100 {
            let key = format!("k{}", i);
            let owners = ring.locate_many(&key, Some(2), true).unwrap();
            assert_eq!(owners.len(), 2);
            assert_ne!(owners[0], owners[1]);
            assert_eq!(owners[0], ring.locate(&key).unwrap());

            let all = ring.locate_many(&key, Some(10), true).unwrap();
            assert_eq!(all.len(), 3, "Capped at the number of distinct nodes");
            let unique: HashSet<&String> = all.iter().collect();
            assert_eq!(unique.len(), 3);
            assert_eq!(&all[..2], &owners[..]);
        }
    }

    #[test]
    fn test_locate_many_default_count() {
        let ring = two_node_ring();

        assert_eq!(ring.locate_many("foo", None, true).unwrap().len(), 2);
        assert_eq!(ring.locate_many("foo", None, false).unwrap().len(), 6);
        assert_eq!(ring.locate_many("foo", Some(4), false).unwrap().len(), 4);
    }

    #[test]
    fn test_locate_many_follows_clockwise_order() {
        let ring = two_node_ring();

        // From "baz" the walk meets A, A, then wraps to B, B, A, B
        let walk = ring.locate_many("baz", None, false).unwrap();
        assert_eq!(walk, vec!["A", "A", "B", "B", "A", "B"]);
        assert_eq!(ring.locate_many("baz", None, true).unwrap(), vec!["A", "B"]);
    }

    #[test]
    fn test_owners_carry_addresses() {
        let ring = two_node_ring();

        let owners = ring.owners("foo", 2).unwrap();
        assert_eq!(owners.len(), 2);
        assert_eq!(owners[0].name, "B");
        assert_eq!(owners[0].address, "B.internal:8080");
        assert_eq!(owners[1].name, "A");
    }

    // ============================================================
    // MEMBERSHIP MUTATION TESTS
    // ============================================================

    #[test]
    fn test_add_node_is_idempotent() {
        let ring = two_node_ring();
        let before = ring.points();

        let changed = ring.add_node(spec("A", 3)).unwrap();

        assert!(!changed);
        assert_eq!(ring.points(), before);
        assert_eq!(ring.size(), 6);
    }

    #[test]
    fn test_address_change_does_not_move_points() {
        let ring = two_node_ring();
        let before = ring.points();

        let moved = NodeSpec::new("A", "10.0.0.9:8080")
            .with_vnodes(3)
            .with_metadata("zone", "b");
        let changed = ring.add_node(moved).unwrap();

        assert!(!changed);
        assert_eq!(ring.points(), before);
        let stored = ring.node("A").unwrap();
        assert_eq!(stored.address, "10.0.0.9:8080");
        assert_eq!(stored.metadata.get("zone").map(String::as_str), Some("b"));
    }

    #[test]
    fn test_vnode_change_regenerates_points() {
        let ring = two_node_ring();

        let changed = ring.add_node(spec("A", 5)).unwrap();

        assert!(changed);
        assert_eq!(ring.size(), 8);
        assert_eq!(ring.distribution().get("A"), Some(&5));
        assert!(ring.is_consistent());
    }

    #[test]
    fn test_remove_inverts_add() {
        let ring = two_node_ring();
        let before = ring.points();

        ring.add_node(spec("C", 50)).unwrap();
        assert_eq!(ring.size(), 56);
        ring.remove_node("C").unwrap();

        assert_eq!(ring.points(), before);
        assert!(!ring.contains("C"));
    }

    #[test]
    fn test_remove_then_readd_restores_every_point() {
        let ring = two_node_ring();
        let before = ring.points();
        let only_a = HashRing::new();
        only_a.add_node(spec("A", 3)).unwrap();

        ring.remove_node("B").unwrap();

        assert_eq!(ring.size(), 3);
        assert_eq!(ring.points(), only_a.points());
        assert!(ring.is_consistent());
        assert_eq!(ring.locate_spec("foo").unwrap().name, "A");
        assert_eq!(ring.owners("foo", 2).unwrap().len(), 1);

        ring.add_node(spec("B", 3)).unwrap();

        assert_eq!(ring.distribution().get("B"), Some(&3));
        assert_eq!(ring.points(), before);
        assert!(ring.is_consistent());
        assert_eq!(ring.locate("foo").unwrap(), "B");
    }

    #[test]
    fn test_removing_hand_placed_node_drops_its_points() {
        let mut continuum = manual_continuum();

        continuum.remove_node("A").unwrap();

        assert_eq!(continuum.size(), 1);
        assert_eq!(continuum.point_at(0), Some((20, "B")));
        assert!(continuum.is_consistent());

        continuum.insert_node(spec("A", 2), &[10, 30]);
        assert_eq!(continuum.distribution().get("A"), Some(&2));
        assert!(continuum.is_consistent());
    }

    #[test]
    fn test_config_update_of_absent_node_is_ignored() {
        let mut continuum = manual_continuum();

        assert!(!continuum.update_config(spec("ghost", 1)));
        assert!(continuum.node("ghost").is_none());
        assert!(continuum.update_config(spec("B", 1).with_metadata("zone", "a")));
        assert!(continuum.is_consistent());
    }

    #[test]
    fn test_concurrent_update_and_remove_stay_consistent() {
        let ring = HashRing::new();

        for round in 0..500 {
            ring.add_node(spec("n1", 8)).unwrap();
            let moved = NodeSpec::new("n1", format!("10.0.0.{}:8080", round % 250)).with_vnodes(8);

            std::thread::scope(|s| {
                s.spawn(|| ring.add_node(moved).unwrap());
                s.spawn(|| {
                    let _ = ring.remove_node("n1");
                });
            });

            assert!(ring.is_consistent(), "round {}", round);
            if ring.contains("n1") {
                assert_eq!(ring.distribution().get("n1"), Some(&8), "round {}", round);
                assert_eq!(ring.size(), 8);
            } else {
                assert_eq!(ring.size(), 0, "round {}", round);
            }
        }
    }

    #[test]
    fn test_remove_unknown_node() {
        let ring = two_node_ring();

        assert_eq!(
            ring.remove_node("ghost"),
            Err(CacheError::NodeNotFound("ghost".to_string()))
        );
        assert_eq!(ring.size(), 6);
    }

    #[test]
    fn test_invalid_configs_fail_fast() {
        let ring = HashRing::new();

        assert!(matches!(
            ring.add_node(spec("A", 0)),
            Err(CacheError::InvalidNodeConfig(_))
        ));
        assert!(matches!(
            ring.add_node(spec("", 3)),
            Err(CacheError::InvalidNodeConfig(_))
        ));
        assert!(matches!(
            ring.add_node(spec("A", u32::MAX).with_weight(2)),
            Err(CacheError::InvalidNodeConfig(_))
        ));
        assert_eq!(ring.size(), 0);
    }

    #[test]
    fn test_with_nodes_matches_incremental_build() {
        let bulk = HashRing::with_nodes(vec![spec("A", 3), spec("B", 3)], None).unwrap();
        let incremental = two_node_ring();

        assert_eq!(bulk.points(), incremental.points());
    }

    // ============================================================
    // WEIGHT TESTS
    // ============================================================

    #[test]
    fn test_weight_multiplies_points() {
        let ring = HashRing::new();
        ring.add_node(spec("A", 10).with_weight(3)).unwrap();
        ring.add_node(spec("B", 10)).unwrap();

        let distribution = ring.distribution();
        assert_eq!(distribution.get("A"), Some(&30));
        assert_eq!(distribution.get("B"), Some(&10));
        assert_eq!(ring.size(), 40);
    }

    #[test]
    fn test_weight_fn_derives_weight_from_metadata() {
        let weight_fn = WeightFn::new(|spec: &NodeSpec| {
            spec.metadata
                .get("capacity")
                .and_then(|c| c.parse().ok())
                .unwrap_or(1)
        });
        let ring = HashRing::with_weight_fn(weight_fn);

        ring.add_node(spec("big", 10).with_metadata("capacity", "4"))
            .unwrap();
        ring.add_node(spec("small", 10)).unwrap();

        assert_eq!(ring.node("big").unwrap().weight, 4);
        assert_eq!(ring.distribution().get("big"), Some(&40));
        assert_eq!(ring.distribution().get("small"), Some(&10));
    }

    #[test]
    fn test_weight_fn_returning_zero_is_rejected() {
        let ring = HashRing::with_weight_fn(WeightFn::new(|_| 0));

        assert!(matches!(
            ring.add_node(spec("A", 3)),
            Err(CacheError::InvalidNodeConfig(_))
        ));
    }

    #[test]
    fn test_rebuild_reapplies_weight_fn() {
        let ring = two_node_ring();
        let before = ring.points();

        ring.rebuild().unwrap();
        assert_eq!(ring.points(), before, "Rebuild without changes is a no-op");

        ring.set_weight_fn(Some(WeightFn::new(|spec: &NodeSpec| {
            if spec.name == "A" { 2 } else { 1 }
        })));
        ring.rebuild().unwrap();

        assert_eq!(ring.size(), 9);
        assert_eq!(ring.node("A").unwrap().weight, 2);
        assert!(ring.is_consistent());
    }

    // ============================================================
    // REPORT TESTS
    // ============================================================

    #[test]
    fn test_continuum_report() {
        let ring = HashRing::new();
        assert_eq!(ring.continuum_report(), "Continuum empty\n");

        ring.add_node(spec("A", 2)).unwrap();
        let report = ring.continuum_report();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "Numpoints in continuum: 2");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("A ("));
    }

    #[test]
    fn test_summary_lists_nodes_sorted() {
        let ring = two_node_ring();

        let summary = ring.summary();
        assert_eq!(summary.size, 6);
        let names: Vec<&str> = summary.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(summary.distribution.get("B"), Some(&3));
    }
}
