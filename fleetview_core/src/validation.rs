//! Request validation.
//!
//! Presence is checked separately from numeric value: `0.0` is a real
//! latitude/longitude (equator, prime meridian) and is accepted.

use crate::error::TrackingError;
use fleetview_env::{Coordinate, StartTracking};

/// Validated endpoints of a start-tracking request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TripEndpoints {
    pub start: Coordinate,
    pub target: Coordinate,
}

/// Validates a `start-tracking` payload.
pub fn validate_start(request: &StartTracking) -> Result<TripEndpoints, TrackingError> {
    let start = Coordinate::from_lat_lng(
        require(request.start_lat, "startLat")?,
        require(request.start_lng, "startLng")?,
    );
    let target = Coordinate::from_lat_lng(
        require(request.target_lat, "targetLat")?,
        require(request.target_lng, "targetLng")?,
    );
    Ok(TripEndpoints { start, target })
}

/// Rejects coordinates with NaN or infinite components.
pub fn ensure_finite(coordinate: Coordinate, field: &'static str) -> Result<Coordinate, TrackingError> {
    if coordinate.is_finite() {
        Ok(coordinate)
    } else {
        Err(TrackingError::not_finite(field))
    }
}

fn require(value: Option<f64>, field: &'static str) -> Result<f64, TrackingError> {
    match value {
        None => Err(TrackingError::missing(field)),
        Some(v) if !v.is_finite() => Err(TrackingError::not_finite(field)),
        Some(v) => Ok(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetview_env::DriverId;

    fn request(start: (Option<f64>, Option<f64>), target: (Option<f64>, Option<f64>)) -> StartTracking {
        StartTracking {
            driver_id: DriverId::new("d1"),
            start_lat: start.0,
            start_lng: start.1,
            target_lat: target.0,
            target_lng: target.1,
        }
    }

    #[test]
    fn test_zero_coordinates_are_valid() {
        let endpoints = validate_start(&request((Some(0.0), Some(0.0)), (Some(0.0), Some(5.0)))).unwrap();
        assert_eq!(endpoints.start, Coordinate::new(0.0, 0.0));
        assert_eq!(endpoints.target, Coordinate::new(5.0, 0.0));
    }

    #[test]
    fn test_missing_target_is_invalid() {
        let err = validate_start(&request((Some(1.0), Some(2.0)), (None, Some(3.0)))).unwrap_err();
        assert_eq!(err, TrackingError::missing("targetLat"));
    }

    #[test]
    fn test_missing_start_is_invalid() {
        let err = validate_start(&request((Some(1.0), None), (Some(1.0), Some(3.0)))).unwrap_err();
        assert_eq!(err, TrackingError::missing("startLng"));
    }

    #[test]
    fn test_nan_is_invalid() {
        let err = validate_start(&request((Some(f64::NAN), Some(2.0)), (Some(1.0), Some(3.0)))).unwrap_err();
        assert_eq!(err, TrackingError::not_finite("startLat"));
    }

    #[test]
    fn test_ensure_finite() {
        assert!(ensure_finite(Coordinate::new(1.0, 2.0), "start").is_ok());
        assert!(ensure_finite(Coordinate::new(f64::INFINITY, 2.0), "start").is_err());
    }
}
