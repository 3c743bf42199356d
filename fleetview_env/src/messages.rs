//! Wire messages exchanged over the real-time transport.
//!
//! Every message is an `{ "event": <name>, "data": <payload> }` envelope.
//! Event names and camelCase payload fields match what browser clients
//! already speak.
//!
//! ```text
//! client ──start-tracking──►  coordinator ──driver-location──► driver-<id> topic
//! client ──stop-tracking───►              ──route-calculated─► topic / requester
//! client ──calculate-route─►              ──error────────────► requester
//! ```

use crate::types::{Coordinate, DriverId};
use serde::{Deserialize, Serialize};

// ============================================================================
// INBOUND
// ============================================================================

/// Lifecycle and routing requests sent by a client connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientRequest {
    /// Start (or restart with a new target) a driver simulation.
    StartTracking(StartTracking),

    /// Stop the driver this connection started.
    ///
    /// Clients send either no `data` or an empty object.
    StopTracking(Option<StopRequest>),

    /// Resolve a route without touching any driver session.
    CalculateRoute(RouteRequest),
}

/// Payload of `start-tracking`.
///
/// Coordinates are optional on the wire: an absent value is distinct from
/// a legitimate `0.0` (equator / prime meridian).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTracking {
    pub driver_id: DriverId,
    #[serde(default)]
    pub start_lat: Option<f64>,
    #[serde(default)]
    pub start_lng: Option<f64>,
    #[serde(default)]
    pub target_lat: Option<f64>,
    #[serde(default)]
    pub target_lng: Option<f64>,
}

/// Payload of `stop-tracking`. Carries nothing: the driver is implied by
/// the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StopRequest {}

/// A `{lat, lng}` pair as sent by clients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl From<LatLng> for Coordinate {
    fn from(p: LatLng) -> Self {
        Coordinate::from_lat_lng(p.lat, p.lng)
    }
}

/// Payload of `calculate-route`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub from: LatLng,
    pub to: LatLng,
}

// ============================================================================
// OUTBOUND
// ============================================================================

/// Messages pushed to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Per-tick position snapshot of one driver.
    DriverLocation(DriverLocation),

    /// Summary of one successful route resolution.
    RouteCalculated(RouteCalculated),

    /// Structured failure report sent to the requesting connection.
    Error(ErrorMessage),
}

impl ServerMessage {
    /// Returns the wire event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMessage::DriverLocation(_) => "driver-location",
            ServerMessage::RouteCalculated(_) => "route-calculated",
            ServerMessage::Error(_) => "error",
        }
    }
}

/// Payload of `driver-location`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverLocation {
    pub driver_id: DriverId,
    pub latitude: f64,
    pub longitude: f64,
}

impl DriverLocation {
    pub fn new(driver_id: DriverId, position: Coordinate) -> Self {
        Self {
            driver_id,
            latitude: position.latitude,
            longitude: position.longitude,
        }
    }

    /// Returns the reported position as a coordinate.
    pub fn position(&self) -> Coordinate {
        Coordinate::from_lat_lng(self.latitude, self.longitude)
    }
}

/// Payload of `route-calculated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteCalculated {
    pub distance_km: f64,
    pub eta_minutes: f64,
    pub route: RouteGeometry,
}

/// GeoJSON geometry of a resolved route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteGeometry {
    #[serde(rename = "type")]
    pub kind: GeometryKind,
    pub coordinates: Vec<Coordinate>,
}

impl RouteGeometry {
    pub fn line_string(coordinates: Vec<Coordinate>) -> Self {
        Self {
            kind: GeometryKind::LineString,
            coordinates,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryKind {
    LineString,
}

/// Payload of `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Stable machine-readable code (e.g. `ROUTING_UNAVAILABLE`)
    pub code: String,
    /// Human-readable description
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_start_tracking() {
        let raw = json!({
            "event": "start-tracking",
            "data": {
                "driverId": "d1",
                "startLat": 0.0,
                "startLng": 36.8,
                "targetLat": -1.3,
                "targetLng": 36.9
            }
        });

        let request: ClientRequest = serde_json::from_value(raw).unwrap();
        match request {
            ClientRequest::StartTracking(start) => {
                assert_eq!(start.driver_id, DriverId::new("d1"));
                // Zero is a real latitude, not "missing"
                assert_eq!(start.start_lat, Some(0.0));
                assert_eq!(start.target_lng, Some(36.9));
            }
            other => panic!("unexpected request: {:?}", other),
        }
    }

    #[test]
    fn test_parse_start_tracking_missing_fields() {
        let raw = json!({
            "event": "start-tracking",
            "data": { "driverId": "d2", "startLat": 1.0 }
        });

        let request: ClientRequest = serde_json::from_value(raw).unwrap();
        let ClientRequest::StartTracking(start) = request else {
            panic!("expected start-tracking");
        };
        assert_eq!(start.start_lng, None);
        assert_eq!(start.target_lat, None);
    }

    #[test]
    fn test_parse_stop_and_calculate() {
        let stop: ClientRequest =
            serde_json::from_value(json!({ "event": "stop-tracking" })).unwrap();
        assert_eq!(stop, ClientRequest::StopTracking(None));

        let calc: ClientRequest = serde_json::from_value(json!({
            "event": "calculate-route",
            "data": { "from": { "lat": 1.0, "lng": 2.0 }, "to": { "lat": 3.0, "lng": 4.0 } }
        }))
        .unwrap();
        let ClientRequest::CalculateRoute(route) = calc else {
            panic!("expected calculate-route");
        };
        assert_eq!(Coordinate::from(route.from), Coordinate::new(2.0, 1.0));
    }

    #[test]
    fn test_parse_stop_tracking_payload_forms() {
        let with_object: ClientRequest =
            serde_json::from_value(json!({ "event": "stop-tracking", "data": {} })).unwrap();
        assert_eq!(with_object, ClientRequest::StopTracking(Some(StopRequest {})));

        let with_null: ClientRequest =
            serde_json::from_value(json!({ "event": "stop-tracking", "data": null })).unwrap();
        assert_eq!(with_null, ClientRequest::StopTracking(None));

        // Extra fields some clients attach are ignored
        let with_extra: ClientRequest =
            serde_json::from_value(json!({ "event": "stop-tracking", "data": { "driverId": "d1" } })).unwrap();
        assert!(matches!(with_extra, ClientRequest::StopTracking(_)));
    }

    #[test]
    fn test_driver_location_wire_format() {
        let msg = ServerMessage::DriverLocation(DriverLocation::new(
            DriverId::new("d1"),
            Coordinate::new(36.8, -1.2),
        ));

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["event"], "driver-location");
        assert_eq!(value["data"]["driverId"], "d1");
        assert_eq!(value["data"]["latitude"], -1.2);
        assert_eq!(value["data"]["longitude"], 36.8);
    }

    #[test]
    fn test_route_calculated_wire_format() {
        let msg = ServerMessage::RouteCalculated(RouteCalculated {
            distance_km: 1.5,
            eta_minutes: 3.0,
            route: RouteGeometry::line_string(vec![
                Coordinate::new(0.0, 0.0),
                Coordinate::new(1.0, 1.0),
            ]),
        });

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["event"], "route-calculated");
        assert_eq!(value["data"]["distanceKm"], 1.5);
        assert_eq!(value["data"]["etaMinutes"], 3.0);
        assert_eq!(value["data"]["route"]["type"], "LineString");
        assert_eq!(value["data"]["route"]["coordinates"][1], json!([1.0, 1.0]));
        assert_eq!(msg.event_name(), "route-calculated");
    }
}
