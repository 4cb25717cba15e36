//! Spatio-temporal route clustering.
//!
//! Partitions stops into `k` route buckets by iterative centroid relaxation.
//! The distance between a stop and a bucket is the planar distance to the
//! bucket centroid plus an urgency penalty that pushes due and overdue stops
//! towards the earlier route slots.
//!
//! Seeding is deterministic (evenly spaced stops in input order) and the
//! number of rounds is fixed, so the same input always yields the same
//! assignment and the cost of a pass is bounded.

use chrono::NaiveDate;
use tracing::debug;

use crate::stop::{Coordinates, Stop};

/// Rounds of assignment + centroid update when not configured otherwise.
pub const DEFAULT_ITERATIONS: usize = 10;

/// Penalty per route slot a due stop sits beyond its remaining days.
const URGENCY_PENALTY_PER_SLOT: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct ClusterOptions {
    /// Number of route buckets (`k`).
    pub route_count: usize,
    /// Blend of due-date pressure into the distance metric, in `[0, 1]`.
    pub urgency_weight: f64,
    /// Fixed number of relaxation rounds; there is no convergence check.
    pub iterations: usize,
    /// Reference day for due-date urgency.
    pub today: NaiveDate,
}

impl ClusterOptions {
    pub fn new(route_count: usize, today: NaiveDate) -> Self {
        Self {
            route_count,
            urgency_weight: 0.0,
            iterations: DEFAULT_ITERATIONS,
            today,
        }
    }

    pub fn urgency_weight(mut self, weight: f64) -> Self {
        self.urgency_weight = weight.clamp(0.0, 1.0);
        self
    }

    pub fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }
}

/// Assigns every unlocked stop to a route bucket in place.
///
/// Callers pass only the stops that should take part (active ones); stops
/// without coordinates are ignored. Locked stops keep their bucket but still
/// pull on the centroid of the bucket they sit in.
///
/// With a single route this is a reset: every stop goes to bucket 0 and its
/// lock is released.
pub fn cluster(stops: &mut [&mut Stop], options: &ClusterOptions) {
    let mut members: Vec<(&mut Stop, Coordinates)> = stops
        .iter_mut()
        .filter_map(|stop| stop.coordinates.map(|point| (&mut **stop, point)))
        .collect();

    let k = options.route_count;
    if members.is_empty() || k == 0 {
        return;
    }

    if k == 1 {
        for (stop, _) in members.iter_mut() {
            stop.cluster_index = 0;
            stop.locked = false;
        }
        return;
    }

    let n = members.len();
    let mut centroids: Vec<Coordinates> = (0..k).map(|i| members[i * n / k].1).collect();

    for _ in 0..options.iterations {
        for (stop, point) in members.iter_mut() {
            if stop.locked {
                continue;
            }
            let days_until_due = stop.days_until_due(options.today);
            stop.cluster_index =
                nearest_bucket(point, days_until_due, &centroids, options.urgency_weight);
        }

        for (bucket, centroid) in centroids.iter_mut().enumerate() {
            let assigned = members
                .iter()
                .filter(|(stop, _)| stop.cluster_index == bucket)
                .map(|(_, point)| point);
            if let Some(mean) = mean_of(assigned) {
                *centroid = mean;
            }
        }
    }

    debug!(
        stops = n,
        routes = k,
        iterations = options.iterations,
        urgency_weight = options.urgency_weight,
        "clustering pass complete"
    );
}

/// Index of the bucket minimizing distance plus urgency penalty. Ties go to
/// the lowest index.
fn nearest_bucket(
    point: &Coordinates,
    days_until_due: Option<i64>,
    centroids: &[Coordinates],
    urgency_weight: f64,
) -> usize {
    let mut best_bucket = 0;
    let mut best_distance = f64::INFINITY;

    for (bucket, centroid) in centroids.iter().enumerate() {
        let penalty = urgency_penalty(days_until_due, bucket, urgency_weight);
        let total = point.planar_distance(centroid) + penalty * urgency_weight;
        if total < best_distance {
            best_distance = total;
            best_bucket = bucket;
        }
    }

    best_bucket
}

fn urgency_penalty(days_until_due: Option<i64>, bucket: usize, urgency_weight: f64) -> f64 {
    if urgency_weight == 0.0 {
        return 0.0;
    }
    let Some(days) = days_until_due else {
        return 0.0;
    };
    let slot = bucket as i64;
    if days < slot {
        (slot - days.max(0)) as f64 * URGENCY_PENALTY_PER_SLOT
    } else {
        0.0
    }
}

fn mean_of<'a>(points: impl Iterator<Item = &'a Coordinates>) -> Option<Coordinates> {
    let (count, lat, lng) = points.fold((0usize, 0.0, 0.0), |(count, lat, lng), point| {
        (count + 1, lat + point.lat, lng + point.lng)
    });
    (count > 0).then(|| Coordinates::new(lat / count as f64, lng / count as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    #[test]
    fn test_penalty_zero_without_weight() {
        assert_eq!(urgency_penalty(Some(-3), 2, 0.0), 0.0);
    }

    #[test]
    fn test_penalty_zero_without_due_date() {
        assert_eq!(urgency_penalty(None, 2, 1.0), 0.0);
    }

    #[test]
    fn test_overdue_penalized_from_today() {
        // Overdue counts as due today: slot 2 is two slots late.
        let penalty = urgency_penalty(Some(-5), 2, 1.0);
        assert!((penalty - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_no_penalty_when_slot_is_in_time() {
        assert_eq!(urgency_penalty(Some(3), 2, 1.0), 0.0);
        assert_eq!(urgency_penalty(Some(1), 1, 1.0), 0.0);
    }

    #[test]
    fn test_ties_go_to_lowest_bucket() {
        let centroids = vec![Coordinates::new(0.0, -1.0), Coordinates::new(0.0, 1.0)];
        let bucket = nearest_bucket(&Coordinates::new(0.0, 0.0), None, &centroids, 0.0);
        assert_eq!(bucket, 0);
    }

    #[test]
    fn test_empty_bucket_keeps_centroid() {
        assert!(mean_of(std::iter::empty()).is_none());
    }

    #[test]
    fn test_urgent_stop_pulled_to_first_route() {
        // A far stop stays put; a stop near the boundary flips to route 0
        // once it is due.
        let centroids = vec![Coordinates::new(0.0, 1.0), Coordinates::new(0.0, -1.0)];
        let point = Coordinates::new(0.0, -0.9);
        assert_eq!(nearest_bucket(&point, None, &centroids, 1.0), 1);
        assert_eq!(nearest_bucket(&point, Some(-1), &centroids, 1.0), 1);

        let close = Coordinates::new(0.0, -0.05);
        assert_eq!(nearest_bucket(&close, None, &centroids, 1.0), 1);
        assert_eq!(nearest_bucket(&close, Some(0), &centroids, 1.0), 0);
    }

    #[test]
    fn test_no_coordinates_is_noop() {
        let mut stop = Stop::new("a");
        stop.cluster_index = 1;
        let mut refs = vec![&mut stop];
        cluster(&mut refs, &ClusterOptions::new(2, today()));
        assert_eq!(stop.cluster_index, 1);
    }
}
