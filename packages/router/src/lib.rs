#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! OSRM trip-service client for repair-crew route optimization.
//!
//! Stop ordering, drive time, and geometry all come from the external
//! service; this crate only builds the request and parses the response.
//! The trip starts and ends at the depot (`roundtrip=true&source=first`).
//!
//! See <https://project-osrm.org/docs/v5.24.0/api/#trip-service>

use std::fmt::Write as _;

use civic_lens_database_models::GeoPoint;
use thiserror::Error;

/// An optimized multi-stop trip returned by the router.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedTrip {
    /// Input point indices (0 = depot) in visit order.
    pub stop_order: Vec<usize>,
    /// Encoded overview polyline of the full trip.
    pub polyline: String,
    /// Total trip distance in meters.
    pub distance_meters: f64,
    /// Total drive time in seconds.
    pub duration_seconds: f64,
}

/// Errors from route computation.
#[derive(Debug, Error)]
pub enum RouteError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// No drivable route connects the points.
    #[error("No drivable route between the requested points")]
    NoRoute,

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// The routing service rejected the request.
    #[error("Routing service error: {code}")]
    Service {
        /// OSRM error code (e.g. "InvalidQuery", "TooBig").
        code: String,
    },
}

/// Computes an optimized round trip from the depot through all waypoints.
///
/// The depot is both origin and destination; the service chooses the stop
/// permutation.
///
/// # Errors
///
/// * [`RouteError::NoRoute`] when the service finds no drivable path.
/// * [`RouteError::Http`] / [`RouteError::Parse`] / [`RouteError::Service`]
///   for transport, decoding, and service-side failures.
pub async fn compute_optimized_route(
    client: &reqwest::Client,
    base_url: &str,
    depot: GeoPoint,
    waypoints: &[GeoPoint],
) -> Result<RoutedTrip, RouteError> {
    let mut coords = format!("{},{}", depot.longitude, depot.latitude);
    for point in waypoints {
        write!(coords, ";{},{}", point.longitude, point.latitude).unwrap();
    }

    let resp = client
        .get(format!("{base_url}/trip/v1/driving/{coords}"))
        .query(&[
            ("roundtrip", "true"),
            ("source", "first"),
            ("overview", "full"),
            ("geometries", "polyline"),
        ])
        .send()
        .await?;

    let body: serde_json::Value = resp.json().await?;
    parse_response(&body, waypoints.len() + 1)
}

/// Parses an OSRM trip response.
///
/// `point_count` is the number of coordinates sent (depot + waypoints);
/// the response must assign each one a position in the trip.
fn parse_response(body: &serde_json::Value, point_count: usize) -> Result<RoutedTrip, RouteError> {
    let code = body["code"].as_str().ok_or_else(|| RouteError::Parse {
        message: "Missing code in OSRM response".to_string(),
    })?;

    match code {
        "Ok" => {}
        "NoRoute" | "NoTrips" => return Err(RouteError::NoRoute),
        other => {
            return Err(RouteError::Service {
                code: other.to_string(),
            });
        }
    }

    let Some(trip) = body["trips"].as_array().and_then(|t| t.first()) else {
        // "Ok" with zero trips is the service's empty result.
        return Err(RouteError::NoRoute);
    };

    let polyline = trip["geometry"]
        .as_str()
        .ok_or_else(|| RouteError::Parse {
            message: "Missing geometry in OSRM trip".to_string(),
        })?
        .to_string();

    let distance_meters = trip["distance"].as_f64().unwrap_or(0.0);
    let duration_seconds = trip["duration"].as_f64().unwrap_or(0.0);

    let waypoint_objs = body["waypoints"].as_array().ok_or_else(|| RouteError::Parse {
        message: "Missing waypoints in OSRM response".to_string(),
    })?;

    if waypoint_objs.len() != point_count {
        return Err(RouteError::Parse {
            message: format!(
                "OSRM returned {} waypoints for {point_count} input points",
                waypoint_objs.len()
            ),
        });
    }

    // waypoints[i] describes input point i; waypoint_index is its visit
    // position. Invert that into input indices in visit order.
    let mut stop_order = vec![usize::MAX; point_count];
    for (input_index, wp) in waypoint_objs.iter().enumerate() {
        let visit_pos = wp["waypoint_index"]
            .as_u64()
            .ok_or_else(|| RouteError::Parse {
                message: "Missing waypoint_index in OSRM waypoint".to_string(),
            })?;

        let visit_pos = usize::try_from(visit_pos).map_err(|_| RouteError::Parse {
            message: format!("waypoint_index {visit_pos} out of range"),
        })?;

        if visit_pos >= point_count || stop_order[visit_pos] != usize::MAX {
            return Err(RouteError::Parse {
                message: format!("Invalid waypoint_index {visit_pos} in OSRM response"),
            });
        }

        stop_order[visit_pos] = input_index;
    }

    Ok(RoutedTrip {
        stop_order,
        polyline,
        distance_meters,
        duration_seconds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trip_with_reordered_stops() {
        let body = serde_json::json!({
            "code": "Ok",
            "trips": [{
                "geometry": "_p~iF~ps|U_ulLnnqC",
                "distance": 15_234.7,
                "duration": 1842.3
            }],
            "waypoints": [
                {"waypoint_index": 0, "location": [-74.0060, 40.7128]},
                {"waypoint_index": 2, "location": [-74.0100, 40.7200]},
                {"waypoint_index": 1, "location": [-74.0080, 40.7150]}
            ]
        });

        let trip = parse_response(&body, 3).unwrap();
        // Visit order: depot, then input point 2, then input point 1.
        assert_eq!(trip.stop_order, vec![0, 2, 1]);
        assert_eq!(trip.polyline, "_p~iF~ps|U_ulLnnqC");
        assert!((trip.distance_meters - 15_234.7).abs() < 1e-6);
        assert!((trip.duration_seconds - 1842.3).abs() < 1e-6);
    }

    #[test]
    fn no_trips_maps_to_no_route() {
        let body = serde_json::json!({"code": "NoTrips", "message": "No trips found"});
        assert!(matches!(parse_response(&body, 2), Err(RouteError::NoRoute)));

        let body = serde_json::json!({"code": "Ok", "trips": [], "waypoints": []});
        assert!(matches!(parse_response(&body, 2), Err(RouteError::NoRoute)));
    }

    #[test]
    fn service_errors_surface_their_code() {
        let body = serde_json::json!({"code": "TooBig", "message": "Too many coordinates"});
        match parse_response(&body, 2) {
            Err(RouteError::Service { code }) => assert_eq!(code, "TooBig"),
            other => panic!("expected Service error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_responses() {
        let body = serde_json::json!({});
        assert!(matches!(
            parse_response(&body, 1),
            Err(RouteError::Parse { .. })
        ));

        // Waypoint count mismatch.
        let body = serde_json::json!({
            "code": "Ok",
            "trips": [{"geometry": "abc", "distance": 1.0, "duration": 1.0}],
            "waypoints": [{"waypoint_index": 0}]
        });
        assert!(matches!(
            parse_response(&body, 2),
            Err(RouteError::Parse { .. })
        ));

        // Duplicate visit position.
        let body = serde_json::json!({
            "code": "Ok",
            "trips": [{"geometry": "abc", "distance": 1.0, "duration": 1.0}],
            "waypoints": [{"waypoint_index": 0}, {"waypoint_index": 0}]
        });
        assert!(matches!(
            parse_response(&body, 2),
            Err(RouteError::Parse { .. })
        ));
    }
}
