//! Dallas-Fort Worth locations for realistic test fixtures.
//!
//! Coordinates sourced from OpenStreetMap.

#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }
}

// ============================================================================
// Downtown Dallas
// ============================================================================

pub const DOWNTOWN_DALLAS: &[Location] = &[
    Location::new("Reunion Tower", 32.7755, -96.8089),
    Location::new("Dallas City Hall", 32.7763, -96.7968),
    Location::new("Dallas Farmers Market", 32.7770, -96.7890),
    Location::new("Majestic Theatre", 32.7823, -96.7948),
    Location::new("Dallas Museum of Art", 32.7877, -96.8010),
    Location::new("Klyde Warren Park", 32.7894, -96.8017),
    Location::new("Union Station", 32.7762, -96.8077),
    Location::new("Dealey Plaza", 32.7788, -96.8084),
];

// ============================================================================
// Fort Worth
// ============================================================================

pub const FORT_WORTH: &[Location] = &[
    Location::new("Sundance Square", 32.7532, -97.3327),
    Location::new("Fort Worth Water Gardens", 32.7477, -97.3264),
    Location::new("Kimbell Art Museum", 32.7487, -97.3649),
    Location::new("Fort Worth Stockyards", 32.7889, -97.3470),
    Location::new("Fort Worth Botanic Garden", 32.7404, -97.3630),
    Location::new("Dickies Arena", 32.7420, -97.3690),
];

// ============================================================================
// Plano / Frisco (north)
// ============================================================================

pub const NORTH_SUBURBS: &[Location] = &[
    Location::new("Legacy West", 33.0770, -96.8250),
    Location::new("Shops at Legacy", 33.0710, -96.8220),
    Location::new("Frisco Square", 33.1540, -96.8240),
    Location::new("Stonebriar Centre", 33.0990, -96.8110),
    Location::new("Collin Creek", 33.0230, -96.7090),
];

/// Every fixture location, downtown first.
pub fn all_locations() -> Vec<&'static Location> {
    DOWNTOWN_DALLAS
        .iter()
        .chain(FORT_WORTH)
        .chain(NORTH_SUBURBS)
        .collect()
}
