//! Property tests for clustering and chunking invariants.

mod fixtures;

use fixtures::*;
use proptest::prelude::*;
use stop_planner::cluster::{ClusterOptions, cluster};
use stop_planner::manifest::{ManifestOptions, Waypoint, chunk_ranges, compute_manifest};
use stop_planner::stop::{Coordinates, Stop};

fn arb_stop() -> impl Strategy<Value = (f64, f64, Option<i64>, bool, usize)> {
    (
        32.0f64..34.0,
        -98.0f64..-96.0,
        proptest::option::of(-10i64..20),
        any::<bool>(),
        0usize..8,
    )
}

fn build(specs: &[(f64, f64, Option<i64>, bool, usize)]) -> Vec<Stop> {
    specs
        .iter()
        .enumerate()
        .map(|(i, &(lat, lng, due_in, locked, bucket))| {
            let mut stop = Stop::new(format!("s{i}")).at(lat, lng);
            stop.due_date = due_in.map(days_from_today);
            stop.locked = locked;
            stop.cluster_index = bucket;
            stop
        })
        .collect()
}

fn run(stops: &mut [Stop], options: &ClusterOptions) {
    let mut members: Vec<&mut Stop> = stops.iter_mut().collect();
    cluster(&mut members, options);
}

proptest! {
    #[test]
    fn prop_unlocked_stops_land_in_range(
        specs in prop::collection::vec(arb_stop(), 1..40),
        k in 1usize..8,
        weight in 0.0f64..1.0,
    ) {
        let mut stops = build(&specs);
        run(&mut stops, &ClusterOptions::new(k, today()).urgency_weight(weight));
        for stop in stops.iter().filter(|stop| !stop.locked) {
            prop_assert!(stop.cluster_index < k);
        }
    }

    #[test]
    fn prop_locked_stops_never_move(
        specs in prop::collection::vec(arb_stop(), 1..40),
        k in 2usize..8,
    ) {
        let mut stops = build(&specs);
        let before: Vec<(bool, usize)> =
            stops.iter().map(|stop| (stop.locked, stop.cluster_index)).collect();
        run(&mut stops, &ClusterOptions::new(k, today()).urgency_weight(0.5));
        for (stop, (locked, bucket)) in stops.iter().zip(before) {
            if locked {
                prop_assert_eq!(stop.cluster_index, bucket);
                prop_assert!(stop.locked);
            }
        }
    }

    #[test]
    fn prop_single_route_resets(specs in prop::collection::vec(arb_stop(), 1..40)) {
        let mut stops = build(&specs);
        run(&mut stops, &ClusterOptions::new(1, today()));
        prop_assert!(stops.iter().all(|stop| stop.cluster_index == 0 && !stop.locked));
    }

    #[test]
    fn prop_clustering_is_deterministic(
        specs in prop::collection::vec(arb_stop(), 1..40),
        k in 1usize..6,
    ) {
        let options = ClusterOptions::new(k, today()).urgency_weight(0.3);
        let mut a = build(&specs);
        let mut b = build(&specs);
        run(&mut a, &options);
        run(&mut b, &options);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_chunk_count(n in 2usize..300, max_batch in 2usize..40) {
        let expected = (n - 1).div_ceil(max_batch - 1);
        let ranges = chunk_ranges(n, max_batch);
        prop_assert_eq!(ranges.len(), expected);
        prop_assert!(ranges.iter().all(|range| range.len() <= max_batch));
        prop_assert_eq!(ranges.first().map(|r| r.start), Some(0));
        prop_assert_eq!(ranges.last().map(|r| r.end), Some(n));
        for pair in ranges.windows(2) {
            prop_assert_eq!(pair[1].start, pair[0].end - 1);
        }
    }

    #[test]
    fn prop_manifest_requests_match_chunk_count(n in 2usize..120) {
        let waypoints: Vec<Waypoint> = (0..n)
            .map(|i| Waypoint::new(format!("w{i}"), Coordinates::new(32.7, -96.8 + i as f64 * 0.001)))
            .collect();
        let provider = CountingLegs::new(25);
        let manifest =
            compute_manifest(&waypoints, &provider, &ManifestOptions::default(), None).unwrap();

        prop_assert_eq!(provider.calls(), (n - 1).div_ceil(24));
        prop_assert_eq!(manifest.entries.len(), n);
        for pair in manifest.entries.windows(2) {
            prop_assert!(pair[1].elapsed_millis >= pair[0].elapsed_millis);
        }
    }
}
