//! stop-planner core
//!
//! Groups geocoded service stops into routes with a due-date-aware k-means,
//! then turns each ordered route into per-stop arrival times and cumulative
//! distances using a batched directions provider.
//!
//! [`store::StopStore`] owns the session's stops; clustering and manifest
//! computation run through it. Travel legs come from any
//! [`traits::LegProvider`]: [`osrm::DirectionsClient`] over HTTP, or
//! [`haversine::HaversineLegs`] when no road router is available.

pub mod traits;
pub mod error;
pub mod stop;
pub mod clock;
pub mod cluster;
pub mod manifest;
pub mod metrics;
pub mod view;
pub mod store;
pub mod osrm;
pub mod haversine;
pub mod persistence;
pub mod config;

pub use config::PlannerConfig;
pub use error::{RoutingError, StoreError};
pub use stop::{Coordinates, Stop, StopId, StopStatus, ViewMode};
pub use store::StopStore;
