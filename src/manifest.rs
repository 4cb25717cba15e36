//! Sequential ETA/distance stitching.
//!
//! Turns an ordered stop sequence into per-stop arrival estimates. Legs are
//! fetched from a [`LegProvider`] in overlapping chunks that respect its batch
//! limit, then folded into cumulative time and distance. The computation is
//! all-or-nothing: a failed chunk discards everything fetched so far.

use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::TimeOfDay;
use crate::error::RoutingError;
use crate::stop::{Coordinates, StopId};
use crate::traits::{Leg, LegProvider};

const METERS_TO_MILES: f64 = 0.000621371;

/// Unit distance labels are rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Miles,
    Kilometers,
}

impl DistanceUnit {
    pub fn from_meters(&self, meters: f64) -> f64 {
        match self {
            DistanceUnit::Miles => meters * METERS_TO_MILES,
            DistanceUnit::Kilometers => meters / 1000.0,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            DistanceUnit::Miles => "mi",
            DistanceUnit::Kilometers => "km",
        }
    }

    pub fn label(&self, meters: f64) -> String {
        format!("{:.1} {}", self.from_meters(meters), self.suffix())
    }
}

#[derive(Debug, Clone)]
pub struct ManifestOptions {
    pub start_time: TimeOfDay,
    /// Fixed time spent at every stop before driving on, in minutes.
    pub service_delay_minutes: u32,
    pub distance_unit: DistanceUnit,
    /// Fetch chunks concurrently. Results are reassembled in order either way.
    pub parallel: bool,
}

impl Default for ManifestOptions {
    fn default() -> Self {
        Self {
            start_time: TimeOfDay::default(),
            service_delay_minutes: 1,
            distance_unit: DistanceUnit::Miles,
            parallel: false,
        }
    }
}

/// Cooperative cancellation, honored between chunk requests.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A geocoded stop in route order.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub id: StopId,
    pub coordinates: Coordinates,
}

impl Waypoint {
    pub fn new(id: impl Into<StopId>, coordinates: Coordinates) -> Self {
        Self {
            id: id.into(),
            coordinates,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub stop_id: StopId,
    pub arrival: TimeOfDay,
    /// Milliseconds since the start time; monotone along the route.
    pub elapsed_millis: i64,
    pub cumulative_meters: f64,
    /// Raw duration of the leg arriving at this stop (0 for the first stop).
    pub leg_duration_secs: f64,
    pub eta: String,
    pub distance_label: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn total_meters(&self) -> f64 {
        self.entries.last().map_or(0.0, |entry| entry.cumulative_meters)
    }

    pub fn finish(&self) -> Option<TimeOfDay> {
        self.entries.last().map(|entry| entry.arrival)
    }
}

/// Index ranges of `len` points, each at most `max_batch` long, consecutive
/// ranges sharing one point.
pub fn chunk_ranges(len: usize, max_batch: usize) -> Vec<Range<usize>> {
    if len < 2 {
        return Vec::new();
    }
    let step = max_batch.max(2) - 1;
    (0..len - 1)
        .step_by(step)
        .map(|start| start..start + (len - start).min(step + 1))
        .collect()
}

/// Computes arrival time and cumulative distance for each waypoint.
///
/// Fails with [`RoutingError::InsufficientStops`] for fewer than two
/// waypoints, and with the provider's error if any chunk fails.
pub fn compute_manifest<P>(
    waypoints: &[Waypoint],
    provider: &P,
    options: &ManifestOptions,
    cancel: Option<&CancelToken>,
) -> Result<Manifest, RoutingError>
where
    P: LegProvider + Sync + ?Sized,
{
    if waypoints.len() < 2 {
        return Err(RoutingError::InsufficientStops {
            found: waypoints.len(),
        });
    }

    let legs = fetch_legs(waypoints, provider, options.parallel, cancel)?;
    let manifest = stitch(waypoints, &legs, options);

    info!(
        stops = waypoints.len(),
        total_meters = manifest.total_meters(),
        "manifest computed"
    );
    Ok(manifest)
}

fn fetch_legs<P>(
    waypoints: &[Waypoint],
    provider: &P,
    parallel: bool,
    cancel: Option<&CancelToken>,
) -> Result<Vec<Leg>, RoutingError>
where
    P: LegProvider + Sync + ?Sized,
{
    let points: Vec<Coordinates> = waypoints.iter().map(|w| w.coordinates).collect();
    let chunks = chunk_ranges(points.len(), provider.max_batch());

    let fetch = |range: &Range<usize>| -> Result<Vec<Leg>, RoutingError> {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(RoutingError::Cancelled);
        }
        let chunk = &points[range.clone()];
        debug!(start = range.start, points = chunk.len(), "requesting legs");
        let legs = provider.legs_for(chunk).inspect_err(|err| {
            warn!(%err, start = range.start, "leg request failed");
        })?;
        if legs.len() != chunk.len() - 1 {
            return Err(RoutingError::LegCountMismatch {
                expected: chunk.len() - 1,
                got: legs.len(),
            });
        }
        Ok(legs)
    };

    let per_chunk: Vec<Vec<Leg>> = if parallel {
        chunks.par_iter().map(fetch).collect::<Result<_, _>>()?
    } else {
        chunks.iter().map(fetch).collect::<Result<_, _>>()?
    };

    Ok(per_chunk.into_iter().flatten().collect())
}

/// Folds legs into the running clock. `legs[i]` leads into `waypoints[i + 1]`.
fn stitch(waypoints: &[Waypoint], legs: &[Leg], options: &ManifestOptions) -> Manifest {
    let delay_millis = i64::from(options.service_delay_minutes) * 60 * 1000;
    let unit = options.distance_unit;

    let mut elapsed_millis = 0i64;
    let mut cumulative_meters = 0.0;
    let mut entries = Vec::with_capacity(waypoints.len());

    for (index, waypoint) in waypoints.iter().enumerate() {
        let leg_duration_secs = match index.checked_sub(1).map(|i| legs[i]) {
            Some(leg) => {
                elapsed_millis += delay_millis + (leg.duration_secs * 1000.0).round() as i64;
                cumulative_meters += leg.distance_meters;
                leg.duration_secs
            }
            None => 0.0,
        };

        let arrival = options.start_time.plus_millis(elapsed_millis);
        entries.push(ManifestEntry {
            stop_id: waypoint.id.clone(),
            arrival,
            elapsed_millis,
            cumulative_meters,
            leg_duration_secs,
            eta: arrival.to_string(),
            distance_label: unit.label(cumulative_meters),
        });
    }

    Manifest { entries }
}
