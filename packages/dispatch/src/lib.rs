#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Dispatch prioritization: triage grouping, route-candidate selection,
//! and depot resolution.
//!
//! Two consumers sit on top of this crate. The triage board partitions
//! every report into exactly one status bucket. The route planner takes
//! the capped list of open high-severity reports and hands it to the
//! router as waypoints; route computation itself is delegated entirely to
//! the external directions service.

use civic_lens_database::{DbError, queries};
use civic_lens_database_models::{GeoPoint, ReportQuery, ReportRow};
use civic_lens_report_models::ReportStatus;
use civic_lens_spatial::haversine_km;
use switchy_database::Database;

/// Severity literals requested from the store.
///
/// The store comparison is case-sensitive and seeded/legacy rows carry
/// mixed case, so every accepted variant is listed explicitly.
pub const SEVERITY_QUERY_VARIANTS: [&str; 3] = ["High", "high", "HIGH"];

/// How many high-severity rows to fetch before status filtering.
pub const CANDIDATE_FETCH_LIMIT: u32 = 25;

/// Hard cap on the candidate list handed to the router.
///
/// External directions services commonly cap waypoint counts; ten keeps
/// the request well inside those limits.
pub const MAX_ROUTE_CANDIDATES: usize = 10;

/// Distance beyond which the depot relocates to the candidate cluster.
pub const DEPOT_RELOCATION_KM: f64 = 200.0;

/// Fallback municipal depot coordinate.
const DEFAULT_DEPOT: GeoPoint = GeoPoint::new(40.7128, -74.0060);

/// Errors that can occur during dispatch operations.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Store query failed.
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

/// Reports partitioned by effective triage status.
///
/// Every report lands in exactly one bucket; bucket-internal ordering is
/// the store's subscription order (creation time descending).
#[derive(Debug, Clone, Default)]
pub struct TriageBoard {
    /// Unassigned reports, including rows with no stored status.
    pub todo: Vec<ReportRow>,
    /// Reports a repair crew is working on.
    pub in_progress: Vec<ReportRow>,
    /// Resolved reports.
    pub done: Vec<ReportRow>,
}

/// Partitions reports into the three triage buckets.
#[must_use]
pub fn triage_board(reports: Vec<ReportRow>) -> TriageBoard {
    let mut board = TriageBoard::default();

    for report in reports {
        match report.effective_status() {
            ReportStatus::Todo => board.todo.push(report),
            ReportStatus::InProgress => board.in_progress.push(report),
            ReportStatus::Done => board.done.push(report),
        }
    }

    board
}

/// Whether a stored status leaves a report actionable for dispatch.
///
/// Absent and blank statuses count as pending so seeded rows are routed;
/// `pending` and `todo` match case-insensitively; anything else
/// (in-progress, done) drops the report.
#[must_use]
pub fn is_actionable(status: Option<&str>) -> bool {
    match status {
        None => true,
        Some(s) if s.trim().is_empty() => true,
        Some(s) => {
            let s = s.to_lowercase();
            s == "pending" || s == "todo"
        }
    }
}

/// Selects route candidates from fetched high-severity reports.
///
/// Keeps actionable reports in arrival order and truncates to
/// [`MAX_ROUTE_CANDIDATES`]. There is deliberately no re-sort before
/// truncation: arrival order is the store's `created_at DESC` query
/// order, and that contract is preserved as-is.
#[must_use]
pub fn select_candidates(reports: Vec<ReportRow>) -> Vec<ReportRow> {
    reports
        .into_iter()
        .filter(|r| is_actionable(r.status.as_deref()))
        .take(MAX_ROUTE_CANDIDATES)
        .collect()
}

/// Fetches the current dispatch candidate list from the store.
///
/// Queries up to [`CANDIDATE_FETCH_LIMIT`] rows matching any of
/// [`SEVERITY_QUERY_VARIANTS`], then applies [`select_candidates`].
///
/// # Errors
///
/// Returns [`DispatchError`] if the store query fails.
pub async fn fetch_candidates(db: &dyn Database) -> Result<Vec<ReportRow>, DispatchError> {
    let query = ReportQuery {
        user_id: None,
        severities: SEVERITY_QUERY_VARIANTS
            .iter()
            .map(ToString::to_string)
            .collect(),
        limit: CANDIDATE_FETCH_LIMIT,
        offset: 0,
    };

    let fetched = queries::query_reports(db, &query).await?;
    let candidates = select_candidates(fetched);
    log::info!("Selected {} dispatch candidates", candidates.len());

    Ok(candidates)
}

/// The configured depot coordinate.
///
/// Reads `HQ_LAT` / `HQ_LNG`, falling back to the default municipal
/// coordinate when unset or unparseable.
#[must_use]
pub fn configured_depot() -> GeoPoint {
    let parse = |name: &str| std::env::var(name).ok().and_then(|v| v.parse::<f64>().ok());

    match (parse("HQ_LAT"), parse("HQ_LNG")) {
        (Some(lat), Some(lng)) if GeoPoint::new(lat, lng).is_valid() => GeoPoint::new(lat, lng),
        _ => DEFAULT_DEPOT,
    }
}

/// Resolves the route origin/destination for a dispatch run.
///
/// The operator's live location replaces the configured depot when
/// available. If the first candidate lies more than
/// [`DEPOT_RELOCATION_KM`] from that point, the depot relocates to the
/// candidate instead: a configured depot hundreds of kilometers from the
/// issue cluster is almost certainly wrong for the current deployment and
/// would produce a nonsensical cross-country route. This is a heuristic,
/// not a guarantee.
#[must_use]
pub fn resolve_depot(operator_location: Option<GeoPoint>, candidates: &[ReportRow]) -> GeoPoint {
    let base = operator_location.unwrap_or_else(configured_depot);

    match candidates.first() {
        Some(first) if haversine_km(base, first.location()) > DEPOT_RELOCATION_KM => {
            log::info!(
                "Depot is {:.0} km from the candidate cluster, relocating to first candidate",
                haversine_km(base, first.location())
            );
            first.location()
        }
        _ => base,
    }
}
