#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! API request and response types for the CivicLens server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the database row types to allow independent evolution of the API
//! contract.

use chrono::{DateTime, Utc};
use civic_lens_database_models::ReportRow;
use civic_lens_report_models::ReportStatus;
use serde::{Deserialize, Serialize};

/// A citizen report as returned by the API.
///
/// `severity` is the stored text (legacy rows carry mixed case); `status`
/// is the effective triage state, never absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiReport {
    /// Unique report id.
    pub id: String,
    /// Image URI or inline base64 data URL.
    pub image_url: String,
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Issue label, e.g. "Pothole".
    pub category: String,
    /// Severity tier as stored.
    pub severity: String,
    /// Issue description.
    pub description: String,
    /// When the report was created (ISO 8601).
    pub created_at: DateTime<Utc>,
    /// Reporting user.
    pub user_id: String,
    /// Effective triage status.
    pub status: ReportStatus,
    /// User ids that upvoted this report.
    pub upvotes: Vec<String>,
    /// Number of upvotes.
    pub upvote_count: usize,
}

impl From<ReportRow> for ApiReport {
    fn from(row: ReportRow) -> Self {
        let status = row.effective_status();
        let upvote_count = row.upvotes.len();
        Self {
            id: row.id,
            image_url: row.image_url,
            latitude: row.latitude,
            longitude: row.longitude,
            category: row.category,
            severity: row.severity,
            description: row.description,
            created_at: row.created_at,
            user_id: row.user_id,
            status,
            upvotes: row.upvotes,
            upvote_count,
        }
    }
}

/// Body of `POST /api/reports`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReportRequest {
    /// Base64-encoded image bytes (no data-URL prefix).
    pub image_base64: String,
    /// Image MIME type, e.g. `image/jpeg`.
    pub mime_type: String,
    /// Captured device latitude, if geolocation succeeded.
    pub latitude: Option<f64>,
    /// Captured device longitude, if geolocation succeeded.
    pub longitude: Option<f64>,
    /// User edit of the classifier's description.
    pub description: Option<String>,
    /// Reporting user.
    pub user_id: String,
}

/// Query parameters for `GET /api/reports`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQueryParams {
    /// Filter by reporting user.
    pub user_id: Option<String>,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
}

/// Body of `POST /api/reports/{id}/status`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetStatusRequest {
    /// The new triage status.
    pub status: ReportStatus,
}

/// Body of `POST /api/reports/{id}/upvote`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpvoteRequest {
    /// The toggling user.
    pub user_id: String,
}

/// Response of `POST /api/reports/{id}/upvote`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpvoteResponse {
    /// Whether the user is upvoting the report after the toggle.
    pub upvoted: bool,
    /// Upvote count after the toggle.
    pub count: usize,
}

/// Response of `GET /api/triage`: the kanban board buckets.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTriageBoard {
    /// Unassigned reports.
    pub todo: Vec<ApiReport>,
    /// Reports being worked on.
    pub in_progress: Vec<ApiReport>,
    /// Resolved reports.
    pub done: Vec<ApiReport>,
}

/// A map marker with its decluttered display position.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMarker {
    /// Report id.
    pub id: String,
    /// True latitude.
    pub latitude: f64,
    /// True longitude.
    pub longitude: f64,
    /// Display latitude (offset when co-located).
    pub display_latitude: f64,
    /// Display longitude (offset when co-located).
    pub display_longitude: f64,
    /// Issue label.
    pub category: String,
    /// Severity tier as stored.
    pub severity: String,
}

/// A weighted point for the heat layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHeatPoint {
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Heat weight.
    pub weight: f64,
}

/// Body of `POST /api/dispatch/route`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    /// Operator's live latitude, if available.
    pub operator_latitude: Option<f64>,
    /// Operator's live longitude, if available.
    pub operator_longitude: Option<f64>,
}

/// A single stop on the optimized dispatch route.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRouteStop {
    /// Report id of the stop.
    pub report_id: String,
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Issue label.
    pub category: String,
    /// Severity tier as stored.
    pub severity: String,
}

/// Response of `POST /api/dispatch/route`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRouteResponse {
    /// Depot latitude (origin and destination).
    pub depot_latitude: f64,
    /// Depot longitude.
    pub depot_longitude: f64,
    /// Stops in optimized visit order (depot excluded).
    pub stops: Vec<ApiRouteStop>,
    /// Encoded overview polyline, empty when no route was computed.
    pub polyline: String,
    /// Total trip distance in meters.
    pub distance_meters: f64,
    /// Total drive time in seconds.
    pub duration_seconds: f64,
    /// Human-readable notice when no route was computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// Response of `GET /api/reports/{id}/share`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiShareLinks {
    /// Resolved address, or a coordinate label fallback.
    pub address: String,
    /// Twitter/X web-intent URL.
    pub twitter: String,
    /// `mailto:` URL.
    pub email: String,
    /// WhatsApp share URL.
    pub whatsapp: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn api_report_resolves_effective_status() {
        let row = ReportRow {
            id: "r1".to_string(),
            image_url: "https://example.com/img.jpg".to_string(),
            latitude: 40.7128,
            longitude: -74.0060,
            category: "Pothole".to_string(),
            severity: "HIGH".to_string(),
            description: "desc".to_string(),
            created_at: Utc::now(),
            user_id: "user-1".to_string(),
            status: None,
            upvotes: vec!["userA".to_string()],
        };

        let api = ApiReport::from(row);
        assert_eq!(api.status, ReportStatus::Todo);
        assert_eq!(api.upvote_count, 1);
        // Stored severity text is passed through untouched.
        assert_eq!(api.severity, "HIGH");
    }

    #[test]
    fn api_report_serializes_camel_case() {
        let row = ReportRow {
            id: "r1".to_string(),
            image_url: "https://example.com/img.jpg".to_string(),
            latitude: 40.7128,
            longitude: -74.0060,
            category: "Pothole".to_string(),
            severity: "High".to_string(),
            description: "desc".to_string(),
            created_at: Utc::now(),
            user_id: "user-1".to_string(),
            status: Some("in-progress".to_string()),
            upvotes: Vec::new(),
        };

        let json = serde_json::to_value(ApiReport::from(row)).unwrap();
        assert_eq!(json["imageUrl"], "https://example.com/img.jpg");
        assert_eq!(json["status"], "in-progress");
        assert_eq!(json["upvoteCount"], 0);
    }

    #[test]
    fn submit_request_accepts_partial_location() {
        let body: SubmitReportRequest = serde_json::from_str(
            r#"{"imageBase64": "Zm9v", "mimeType": "image/jpeg", "userId": "user-1"}"#,
        )
        .unwrap();
        assert!(body.latitude.is_none());
        assert!(body.longitude.is_none());
        assert!(body.description.is_none());
    }
}
