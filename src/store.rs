//! Single owner of the session's stops.
//!
//! Every mutation of route assignment, locks and manifest fields goes through
//! [`StopStore`], which keeps `cluster_index < route_count` for all stops.

use chrono::NaiveDate;
use tracing::info;

use crate::cluster::{ClusterOptions, DEFAULT_ITERATIONS, cluster};
use crate::error::StoreError;
use crate::manifest::{CancelToken, Manifest, ManifestOptions, Waypoint, compute_manifest};
use crate::metrics::{self, Summary};
use crate::stop::{DRIVER_ID_FIELD, DRIVER_NAME_FIELD, Stop, StopId, StopStatus, ViewMode};
use crate::traits::LegProvider;
use crate::view::SortState;

/// Clustering inputs the store does not own itself.
#[derive(Debug, Clone)]
pub struct ClusterSettings {
    pub urgency_weight: f64,
    pub iterations: usize,
    pub today: NaiveDate,
}

impl ClusterSettings {
    pub fn new(urgency_weight: f64, today: NaiveDate) -> Self {
        Self {
            urgency_weight,
            iterations: DEFAULT_ITERATIONS,
            today,
        }
    }

    fn options(&self, route_count: usize) -> ClusterOptions {
        ClusterOptions::new(route_count, self.today)
            .urgency_weight(self.urgency_weight)
            .iterations(self.iterations)
    }
}

/// Outcome of [`StopStore::discard`], telling the caller which remote action
/// mirrors it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discarded {
    /// Routing view: the stop stays but is no longer routed.
    Unrouted,
    Removed,
}

#[derive(Debug, Clone)]
pub struct StopStore {
    stops: Vec<Stop>,
    baseline: Vec<Stop>,
    view: ViewMode,
    route_count: usize,
}

impl StopStore {
    pub fn new(stops: Vec<Stop>, view: ViewMode) -> Self {
        let mut store = Self {
            baseline: Vec::new(),
            stops,
            view,
            route_count: 1,
        };
        store.normalize_buckets();
        store.commit();
        store
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn get(&self, id: &StopId) -> Option<&Stop> {
        self.stops.iter().find(|stop| &stop.id == id)
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn route_count(&self) -> usize {
        self.route_count
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Active, geocoded stops in list order.
    pub fn routable(&self) -> impl Iterator<Item = &Stop> {
        self.stops.iter().filter(|stop| self.view.is_routable(stop))
    }

    /// Changes the number of routes.
    ///
    /// All manual locks are released, including ones that would still be in
    /// range, and everything is reclustered.
    pub fn set_route_count(
        &mut self,
        route_count: usize,
        settings: &ClusterSettings,
    ) -> Result<(), StoreError> {
        if route_count == 0 {
            return Err(StoreError::InvalidRouteCount(route_count));
        }
        for stop in self.stops.iter_mut() {
            stop.locked = false;
        }
        self.route_count = route_count;
        info!(route_count, "route count changed");
        self.recluster(settings);
        Ok(())
    }

    /// Runs a full clustering pass over the routable stops.
    pub fn recluster(&mut self, settings: &ClusterSettings) {
        let view = self.view;
        let mut members: Vec<&mut Stop> = self
            .stops
            .iter_mut()
            .filter(|stop| view.is_routable(stop))
            .collect();
        cluster(&mut members, &settings.options(self.route_count));
        self.normalize_buckets();
    }

    /// Moves a stop to a route by hand and locks it there.
    pub fn assign_manual(&mut self, id: &StopId, index: usize) -> Result<(), StoreError> {
        self.assign_manual_all(std::slice::from_ref(id), index)
    }

    /// Moves several stops to one route. Nothing changes if any id is unknown.
    pub fn assign_manual_all(&mut self, ids: &[StopId], index: usize) -> Result<(), StoreError> {
        if index >= self.route_count {
            return Err(StoreError::BucketOutOfRange {
                index,
                route_count: self.route_count,
            });
        }
        let positions = ids
            .iter()
            .map(|id| self.position(id))
            .collect::<Result<Vec<_>, _>>()?;
        for position in positions {
            let stop = &mut self.stops[position];
            stop.cluster_index = index;
            stop.locked = true;
        }
        Ok(())
    }

    /// Routable stops in list order, ready for a manifest.
    pub fn waypoints(&self) -> Vec<Waypoint> {
        self.routable().filter_map(to_waypoint).collect()
    }

    /// Routable stops of one route bucket, in list order.
    pub fn route_waypoints(&self, bucket: usize) -> Vec<Waypoint> {
        self.routable()
            .filter(|stop| stop.cluster_index == bucket)
            .filter_map(to_waypoint)
            .collect()
    }

    /// Computes and applies the manifest for the routable stops in list order.
    ///
    /// On failure no stop is touched. On success the result becomes the new
    /// undo baseline.
    pub fn compute_manifest<P>(
        &mut self,
        provider: &P,
        options: &ManifestOptions,
        cancel: Option<&CancelToken>,
    ) -> Result<Manifest, StoreError>
    where
        P: LegProvider + Sync + ?Sized,
    {
        let manifest = compute_manifest(&self.waypoints(), provider, options, cancel)?;
        self.apply_manifest(&manifest)?;
        self.commit();
        Ok(manifest)
    }

    /// Writes manifest results onto their stops. Nothing changes if any entry
    /// names an unknown stop.
    pub fn apply_manifest(&mut self, manifest: &Manifest) -> Result<(), StoreError> {
        let positions = manifest
            .entries
            .iter()
            .map(|entry| self.position(&entry.stop_id))
            .collect::<Result<Vec<_>, _>>()?;
        for (position, entry) in positions.into_iter().zip(&manifest.entries) {
            let stop = &mut self.stops[position];
            stop.eta = Some(entry.eta.clone());
            stop.distance_label = Some(entry.distance_label.clone());
            stop.leg_duration_secs = Some(entry.leg_duration_secs);
        }
        Ok(())
    }

    /// Makes the current state the one [`StopStore::undo`] returns to.
    pub fn commit(&mut self) {
        self.baseline = self.stops.clone();
    }

    /// Discards every change since the last commit.
    pub fn undo(&mut self) {
        self.stops = self.baseline.clone();
        self.normalize_buckets();
    }

    /// Replaces the whole list, e.g. with the persistence service's answer.
    pub fn replace(&mut self, stops: Vec<Stop>) {
        self.stops = stops;
        self.normalize_buckets();
        self.commit();
    }

    pub fn toggle_complete(&mut self, id: &StopId) -> Result<&StopStatus, StoreError> {
        let position = self.position(id)?;
        let stop = &mut self.stops[position];
        stop.status = if stop.is_completed() {
            StopStatus::Blank
        } else {
            StopStatus::Completed
        };
        Ok(&stop.status)
    }

    pub fn mark_completed(&mut self, ids: &[StopId]) -> Result<(), StoreError> {
        let positions = ids
            .iter()
            .map(|id| self.position(id))
            .collect::<Result<Vec<_>, _>>()?;
        for position in positions {
            self.stops[position].status = StopStatus::Completed;
        }
        Ok(())
    }

    /// Hands stops to another driver. Nothing changes if any id is unknown.
    pub fn reassign_driver(
        &mut self,
        ids: &[StopId],
        name: &str,
        driver_id: &str,
    ) -> Result<(), StoreError> {
        let positions = ids
            .iter()
            .map(|id| self.position(id))
            .collect::<Result<Vec<_>, _>>()?;
        for position in positions {
            let extra = &mut self.stops[position].extra;
            extra.insert(DRIVER_NAME_FIELD.to_string(), name.into());
            extra.insert(DRIVER_ID_FIELD.to_string(), driver_id.into());
        }
        Ok(())
    }

    /// Takes a stop out of the plan: unrouted in the routing view, removed
    /// everywhere else.
    pub fn discard(&mut self, id: &StopId) -> Result<Discarded, StoreError> {
        let position = self.position(id)?;
        if self.view == ViewMode::Routing {
            self.stops[position].status = StopStatus::Blank;
            Ok(Discarded::Unrouted)
        } else {
            self.stops.remove(position);
            Ok(Discarded::Removed)
        }
    }

    /// Moves the stop at `from` so that it ends up at `to`.
    pub fn move_stop(&mut self, from: usize, to: usize) -> Result<(), StoreError> {
        let len = self.stops.len();
        for position in [from, to] {
            if position >= len {
                return Err(StoreError::PositionOutOfRange { position, len });
            }
        }
        let stop = self.stops.remove(from);
        self.stops.insert(to, stop);
        Ok(())
    }

    /// Stable sort of the list by the given column.
    pub fn sort(&mut self, state: &SortState) {
        self.stops.sort_by(|a, b| state.compare(a, b));
    }

    /// Routable stops grouped by route, skipping empty routes.
    pub fn route_groups(&self) -> Vec<Vec<&Stop>> {
        (0..self.route_count)
            .map(|bucket| {
                self.routable()
                    .filter(|stop| stop.cluster_index == bucket)
                    .collect::<Vec<_>>()
            })
            .filter(|group| !group.is_empty())
            .collect()
    }

    pub fn estimate_hours(&self) -> Vec<Option<u32>> {
        metrics::estimate_hours(&self.stops, self.route_count, self.view)
    }

    pub fn summary(&self, today: NaiveDate) -> Summary {
        metrics::summarize(&self.stops, self.view, today)
    }

    fn position(&self, id: &StopId) -> Result<usize, StoreError> {
        self.stops
            .iter()
            .position(|stop| &stop.id == id)
            .ok_or_else(|| StoreError::UnknownStop(id.clone()))
    }

    /// Stops outside the clustering pass can still carry a stale bucket;
    /// send them back to the first route.
    fn normalize_buckets(&mut self) {
        let route_count = self.route_count;
        for stop in self.stops.iter_mut() {
            if stop.cluster_index >= route_count {
                stop.cluster_index = 0;
                stop.locked = false;
            }
        }
    }
}

fn to_waypoint(stop: &Stop) -> Option<Waypoint> {
    stop.coordinates
        .map(|coordinates| Waypoint::new(stop.id.clone(), coordinates))
}
