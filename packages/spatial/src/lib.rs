#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Pure spatial computation for the map views.
//!
//! Provides marker decluttering (non-overlapping display positions for
//! co-located reports), great-circle distance, and heat-map point
//! weighting. Nothing here mutates stored report state; display positions
//! are derived per render and recomputed whenever the visible set changes.

use civic_lens_database_models::GeoPoint;
use civic_lens_report_models::IssueSeverity;

/// Box half-width for grouping nearby markers, in degrees (~50 m at the
/// equator).
pub const PROXIMITY_THRESHOLD: f64 = 0.0005;

/// Grid step between decluttered markers, in degrees (~15 m).
pub const OFFSET_STEP: f64 = 0.00015;

/// Upvote count at which the heat-map bonus saturates.
const UPVOTE_BONUS_CAP: f64 = 5.0;

/// Computes the display position for the point at `index`.
///
/// Markers whose latitude and longitude each differ by strictly less than
/// [`PROXIMITY_THRESHOLD`] form a group; members of a group of two or more
/// fan out on a two-column grid centered on their true locations, indexed
/// by their order of appearance in `points`. Isolated markers display at
/// their true location.
///
/// The grouping test is an axis-aligned box, not geodesic distance — a
/// deliberate approximation that holds at city scale but not near the
/// poles or across the antimeridian. Offsets are a function of the whole
/// visible set: adding or removing a nearby point can shift the display
/// position of existing markers.
///
/// # Panics
///
/// Panics if `index` is out of bounds for `points`.
#[must_use]
pub fn display_position(index: usize, points: &[GeoPoint]) -> GeoPoint {
    let point = points[index];

    let group_size = points.iter().filter(|p| in_box(point, **p)).count();
    if group_size <= 1 {
        return point;
    }

    // Rank within the group, in enumeration order of the full set.
    let group_index = points[..index].iter().filter(|p| in_box(point, **p)).count();

    #[allow(clippy::cast_precision_loss)]
    let row = (group_index / 2) as f64;
    #[allow(clippy::cast_precision_loss)]
    let col = (group_index % 2) as f64;

    GeoPoint::new(
        point.latitude + (row * OFFSET_STEP - OFFSET_STEP / 2.0),
        point.longitude + (col * OFFSET_STEP - OFFSET_STEP / 2.0),
    )
}

/// Computes display positions for every point in the visible set.
#[must_use]
pub fn display_positions(points: &[GeoPoint]) -> Vec<GeoPoint> {
    (0..points.len())
        .map(|i| display_position(i, points))
        .collect()
}

/// Whether `b` falls within the proximity box around `a`.
///
/// Symmetric and reflexive; exact-threshold differences are excluded
/// (strict `<`), so the grouping is deterministic for fixed inputs.
fn in_box(a: GeoPoint, b: GeoPoint) -> bool {
    (a.latitude - b.latitude).abs() < PROXIMITY_THRESHOLD
        && (a.longitude - b.longitude).abs() < PROXIMITY_THRESHOLD
}

/// Great-circle distance between two points in kilometers.
///
/// Haversine formula with Earth radius 6371 km.
#[must_use]
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + (d_lon / 2.0).sin().powi(2) * lat1.cos() * lat2.cos();
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Heat-map weight for a report.
///
/// Severity supplies the base weight (High 3, Medium 2, anything else 1,
/// case-insensitive), plus an upvote bonus of at most 1 that saturates at
/// [`UPVOTE_BONUS_CAP`] upvotes.
#[must_use]
pub fn heatmap_weight(severity: &str, upvote_count: usize) -> f64 {
    let base = severity
        .parse::<IssueSeverity>()
        .map_or(1.0, IssueSeverity::base_weight);

    #[allow(clippy::cast_precision_loss)]
    let bonus = (upvote_count as f64 / UPVOTE_BONUS_CAP).min(1.0);

    base + bonus
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn isolated_markers_keep_true_location() {
        let points = vec![
            GeoPoint::new(40.7128, -74.0060),
            GeoPoint::new(41.0, -75.0),
            GeoPoint::new(40.72, -74.01),
        ];
        for (i, point) in points.iter().enumerate() {
            assert_eq!(display_position(i, &points), *point);
        }
    }

    #[test]
    fn co_located_pair_gets_distinct_positions() {
        let points = vec![
            GeoPoint::new(40.7128, -74.0060),
            GeoPoint::new(40.71285, -74.00605),
            GeoPoint::new(41.0, -75.0),
        ];
        let displayed = display_positions(&points);

        assert_ne!(displayed[0], displayed[1]);
        // The far-away point is untouched.
        assert_eq!(displayed[2], points[2]);
    }

    #[test]
    fn cluster_of_three_fans_out_without_collisions() {
        let base = GeoPoint::new(40.7128, -74.0060);
        let points = vec![base, base, base];
        let displayed = display_positions(&points);

        assert_ne!(displayed[0], displayed[1]);
        assert_ne!(displayed[0], displayed[2]);
        assert_ne!(displayed[1], displayed[2]);

        // Two-column grid: index 0 -> (0,0), 1 -> (0,1), 2 -> (1,0).
        assert!(close(displayed[0].latitude, base.latitude - OFFSET_STEP / 2.0));
        assert!(close(displayed[0].longitude, base.longitude - OFFSET_STEP / 2.0));
        assert!(close(displayed[1].longitude, base.longitude + OFFSET_STEP / 2.0));
        assert!(close(displayed[2].latitude, base.latitude + OFFSET_STEP / 2.0));
    }

    #[test]
    fn exact_threshold_difference_is_not_grouped() {
        let points = vec![
            GeoPoint::new(40.0, -74.0),
            GeoPoint::new(40.0 + PROXIMITY_THRESHOLD, -74.0),
        ];
        let displayed = display_positions(&points);
        assert_eq!(displayed[0], points[0]);
        assert_eq!(displayed[1], points[1]);
    }

    #[test]
    fn haversine_zero_for_same_point() {
        let p = GeoPoint::new(40.7128, -74.0060);
        assert!(haversine_km(p, p).abs() < 1e-9);
    }

    #[test]
    fn haversine_nyc_to_la() {
        let nyc = GeoPoint::new(40.7128, -74.0060);
        let la = GeoPoint::new(34.0522, -118.2437);
        let d = haversine_km(nyc, la);
        assert!((d - 3936.0).abs() < 30.0, "got {d}");
    }

    #[test]
    fn heatmap_weight_by_severity() {
        assert!(close(heatmap_weight("High", 0), 3.0));
        assert!(close(heatmap_weight("HIGH", 0), 3.0));
        assert!(close(heatmap_weight("medium", 0), 2.0));
        assert!(close(heatmap_weight("Low", 0), 1.0));
        assert!(close(heatmap_weight("graffiti", 0), 1.0));
    }

    #[test]
    fn heatmap_upvote_bonus_caps_at_one() {
        assert!(close(heatmap_weight("High", 1), 3.2));
        assert!(close(heatmap_weight("High", 5), 4.0));
        assert!(close(heatmap_weight("High", 50), 4.0));
        assert!(close(heatmap_weight("Low", 3), 1.6));
    }
}
