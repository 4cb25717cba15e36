//! Test fixtures for stop-planner.
//!
//! Provides:
//! - Real Dallas-Fort Worth locations (from OpenStreetMap)
//! - A leg provider that counts requests and can be told to fail

#![allow(dead_code)]

pub mod dallas_locations;

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;
use stop_planner::error::RoutingError;
use stop_planner::stop::{Coordinates, Stop};
use stop_planner::traits::{Leg, LegProvider};

pub use dallas_locations::*;

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
}

pub fn days_from_today(days: i64) -> NaiveDate {
    today() + chrono::Duration::days(days)
}

/// A routed stop at a fixture location.
pub fn routed_at(location: &Location) -> Stop {
    Stop::new(location.name)
        .at(location.lat, location.lng)
        .with_status("routed")
}

/// Deterministic provider: a leg's length is the planar distance scaled to
/// meters and it is driven at 10 m/s.
pub struct CountingLegs {
    pub max_batch: usize,
    calls: AtomicUsize,
    fail_on_call: Option<usize>,
    batch_sizes: Mutex<Vec<usize>>,
}

impl CountingLegs {
    pub fn new(max_batch: usize) -> Self {
        Self {
            max_batch,
            calls: AtomicUsize::new(0),
            fail_on_call: None,
            batch_sizes: Mutex::new(Vec::new()),
        }
    }

    /// Fails the `n`th request (0-based).
    pub fn failing_on(mut self, n: usize) -> Self {
        self.fail_on_call = Some(n);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }

    pub fn leg_between(a: Coordinates, b: Coordinates) -> Leg {
        let meters = a.planar_distance(&b) * 100_000.0;
        Leg::new(meters / 10.0, meters)
    }
}

impl LegProvider for CountingLegs {
    fn max_batch(&self) -> usize {
        self.max_batch
    }

    fn legs_for(&self, points: &[Coordinates]) -> Result<Vec<Leg>, RoutingError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.batch_sizes.lock().unwrap().push(points.len());
        if self.fail_on_call == Some(call) {
            return Err(RoutingError::Provider("NoRoute".to_string()));
        }
        Ok(points
            .windows(2)
            .map(|pair| Self::leg_between(pair[0], pair[1]))
            .collect())
    }
}

/// Answers every request with the same fixed leg.
pub struct FixedLegs(pub Leg);

impl LegProvider for FixedLegs {
    fn legs_for(&self, points: &[Coordinates]) -> Result<Vec<Leg>, RoutingError> {
        Ok(vec![self.0; points.len().saturating_sub(1)])
    }
}
