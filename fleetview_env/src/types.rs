//! Common types for the FleetView environment abstraction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, stable identifier of a simulated driver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriverId(String);

impl DriverId {
    /// Creates a DriverId from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DriverId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DriverId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for DriverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one client connection on the real-time transport.
///
/// Uses UUID v4 for global uniqueness without coordination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Creates a new random ConnectionId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a deterministic ConnectionId from a seed (for simulation).
    pub fn from_seed(seed: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[0..8].copy_from_slice(&seed.to_le_bytes());
        bytes[8..16].copy_from_slice(&seed.wrapping_mul(0x517cc1b727220a95).to_le_bytes());
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Show first 8 chars for readability
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// A WGS84 position in degrees.
///
/// Serialized as a GeoJSON position `[longitude, latitude]`. No range
/// validation is done here; the Routing Engine is the authority on validity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinate {
    /// Creates a coordinate from longitude and latitude (GeoJSON order).
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self { longitude, latitude }
    }

    /// Creates a coordinate from latitude and longitude (wire request order).
    pub fn from_lat_lng(latitude: f64, longitude: f64) -> Self {
        Self { longitude, latitude }
    }

    /// Returns true when both components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.longitude.is_finite() && self.latitude.is_finite()
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from([longitude, latitude]: [f64; 2]) -> Self {
        Self { longitude, latitude }
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(c: Coordinate) -> Self {
        [c.longitude, c.latitude]
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.longitude, self.latitude)
    }
}

/// Addressable broadcast channel on the real-time transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic(String);

impl Topic {
    /// The topic scoping broadcasts for one driver: `driver-<id>`.
    pub fn driver(driver_id: &DriverId) -> Self {
        Self(format!("driver-{}", driver_id))
    }

    /// Returns the topic name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_topic_name() {
        let topic = Topic::driver(&DriverId::new("d1"));
        assert_eq!(topic.as_str(), "driver-d1");
    }

    #[test]
    fn test_coordinate_serializes_as_geojson_position() {
        let c = Coordinate::from_lat_lng(-1.286389, 36.817223);
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "[36.817223,-1.286389]");

        let back: Coordinate = serde_json::from_str("[1.5,2.5]").unwrap();
        assert_eq!(back, Coordinate::new(1.5, 2.5));
    }

    #[test]
    fn test_coordinate_finiteness() {
        assert!(Coordinate::new(0.0, 0.0).is_finite());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_finite());
        assert!(!Coordinate::new(0.0, f64::INFINITY).is_finite());
    }

    #[test]
    fn test_connection_id_from_seed_is_deterministic() {
        assert_eq!(ConnectionId::from_seed(7), ConnectionId::from_seed(7));
        assert_ne!(ConnectionId::from_seed(7), ConnectionId::from_seed(8));
    }
}
