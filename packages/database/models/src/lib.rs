#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Database row types and query parameter definitions.
//!
//! These types represent the shapes of data as stored in and retrieved from
//! the `reports` table. They are distinct from the API response types in
//! `civic_lens_server_models`, which are free to evolve independently of
//! the persisted schema.

use chrono::{DateTime, Utc};
use civic_lens_report_models::{IssueSeverity, ReportStatus};
use serde::{Deserialize, Serialize};

/// A geographic point in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees, [-90, 90].
    pub latitude: f64,
    /// Longitude in degrees, [-180, 180].
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a new point from the given coordinates.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both coordinates are finite and within WGS84 range.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A citizen report row as retrieved from the database.
///
/// `severity` and `status` are kept as raw stored text: legacy and seeded
/// rows carry mixed case variants ("HIGH", "Pending"), and reads must stay
/// case-insensitive. Use [`Self::severity`] and [`Self::effective_status`]
/// for the typed views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Opaque store-assigned identifier.
    pub id: String,
    /// Image URI or inline base64 data URL.
    pub image_url: String,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Free-text issue label, e.g. "Pothole".
    pub category: String,
    /// Severity tier as stored (any case variant).
    pub severity: String,
    /// Free-text description.
    pub description: String,
    /// Server-assigned creation timestamp. Immutable.
    pub created_at: DateTime<Utc>,
    /// Reporting user. Immutable.
    pub user_id: String,
    /// Triage status as stored; `None` for rows created before triage.
    pub status: Option<String>,
    /// User ids that upvoted this report. Unique membership.
    pub upvotes: Vec<String>,
}

impl ReportRow {
    /// The report's location as a [`GeoPoint`].
    #[must_use]
    pub const fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Parses the stored severity text, case-insensitively.
    ///
    /// Returns `None` for free-form legacy values outside the taxonomy.
    #[must_use]
    pub fn severity(&self) -> Option<IssueSeverity> {
        self.severity.parse().ok()
    }

    /// Resolves the effective triage status of this row.
    ///
    /// Absent, legacy `pending`, and unrecognized values resolve to
    /// [`ReportStatus::Todo`].
    #[must_use]
    pub fn effective_status(&self) -> ReportStatus {
        ReportStatus::from_stored(self.status.as_deref())
    }
}

/// Fields for inserting a new report.
///
/// `id` and `created_at` are assigned by the store at insert time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReport {
    /// Image URI or inline base64 data URL.
    pub image_url: String,
    /// Report location.
    pub location: GeoPoint,
    /// Free-text issue label.
    pub category: String,
    /// Severity tier.
    pub severity: IssueSeverity,
    /// Free-text description.
    pub description: String,
    /// Reporting user.
    pub user_id: String,
}

/// Parameters for querying reports from the database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportQuery {
    /// Filter by reporting user.
    pub user_id: Option<String>,
    /// Set-membership filter on the stored severity text.
    ///
    /// The comparison is case-sensitive at the store layer, so callers
    /// list every literal variant they accept (e.g. "High"/"high"/"HIGH").
    pub severities: Vec<String>,
    /// Maximum number of results to return.
    pub limit: u32,
    /// Number of results to skip.
    pub offset: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(severity: &str, status: Option<&str>) -> ReportRow {
        ReportRow {
            id: "r1".to_string(),
            image_url: "https://example.com/pothole.jpg".to_string(),
            latitude: 40.7128,
            longitude: -74.0060,
            category: "Pothole".to_string(),
            severity: severity.to_string(),
            description: "Large pothole".to_string(),
            created_at: Utc::now(),
            user_id: "user-1".to_string(),
            status: status.map(String::from),
            upvotes: Vec::new(),
        }
    }

    #[test]
    fn geo_point_validates_wgs84_range() {
        assert!(GeoPoint::new(40.7128, -74.0060).is_valid());
        assert!(GeoPoint::new(-90.0, 180.0).is_valid());
        assert!(!GeoPoint::new(90.1, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, -180.5).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn severity_reads_are_case_insensitive() {
        assert_eq!(row("HIGH", None).severity(), Some(IssueSeverity::High));
        assert_eq!(row("medium", None).severity(), Some(IssueSeverity::Medium));
        assert_eq!(row("urgent", None).severity(), None);
    }

    #[test]
    fn effective_status_defaults_to_todo() {
        assert_eq!(row("High", None).effective_status(), ReportStatus::Todo);
        assert_eq!(
            row("High", Some("pending")).effective_status(),
            ReportStatus::Todo
        );
        assert_eq!(
            row("High", Some("in-progress")).effective_status(),
            ReportStatus::InProgress
        );
        assert_eq!(row("High", Some("done")).effective_status(), ReportStatus::Done);
    }
}
