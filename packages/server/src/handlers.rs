//! HTTP handler functions for the CivicLens API.

use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, web};
use civic_lens_ai::AiError;
use civic_lens_database::{DbError, queries};
use civic_lens_database_models::{GeoPoint, ReportQuery, ReportRow};
use civic_lens_geocoder::{coordinate_label, nominatim};
use civic_lens_report::{Caller, ReportError, ReportSubmission};
use civic_lens_report_models::IssueSeverity;
use civic_lens_router::RouteError;
use civic_lens_server_models::{
    ApiHealth, ApiHeatPoint, ApiMarker, ApiReport, ApiRouteResponse, ApiRouteStop, ApiShareLinks,
    ApiTriageBoard, ReportQueryParams, RouteRequest, SetStatusRequest, SubmitReportRequest,
    UpvoteRequest, UpvoteResponse,
};
use civic_lens_share::ShareIssue;
use switchy_database::Database;
use tokio::sync::broadcast;

use crate::{AppState, ServerConfig};

/// Row cap for the full-collection views (list default, SSE snapshots,
/// board, markers, heat layer).
const SNAPSHOT_LIMIT: u32 = 500;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /api/reports`
///
/// Classify-then-create: the image must pass the vision classifier before
/// any record is written. A rejected image is 422; nothing is persisted
/// until every field is validated.
pub async fn submit_report(
    state: web::Data<AppState>,
    body: web::Json<SubmitReportRequest>,
) -> HttpResponse {
    let Some(classifier) = &state.classifier else {
        return HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "error": "Image classifier is not configured"
        }));
    };

    let body = body.into_inner();

    let issue = match civic_lens_ai::classify(
        classifier.as_ref(),
        &body.image_base64,
        &body.mime_type,
    )
    .await
    {
        Ok(Some(issue)) => issue,
        Ok(None) => {
            return HttpResponse::UnprocessableEntity().json(serde_json::json!({
                "error": "Image does not depict a civic issue"
            }));
        }
        Err(e) => {
            log::error!("Classification failed: {e}");
            let message = match e {
                AiError::Malformed { .. } => "Classifier returned a malformed answer",
                _ => "Classification service unavailable",
            };
            return HttpResponse::BadGateway()
                .json(serde_json::json!({ "error": message }));
        }
    };

    let location = match (body.latitude, body.longitude) {
        (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
        _ => None,
    };

    let description = body
        .description
        .filter(|d| !d.trim().is_empty())
        .unwrap_or(issue.description);

    let submission = ReportSubmission {
        image_url: format!("data:{};base64,{}", body.mime_type, body.image_base64),
        location,
        category: issue.category,
        severity: issue.severity,
        description,
        user_id: body.user_id,
    };

    match civic_lens_report::create(state.db.as_ref(), &state.feed, submission).await {
        Ok(row) => HttpResponse::Created().json(ApiReport::from(row)),
        Err(e) => report_error_response(&e),
    }
}

/// `GET /api/reports`
pub async fn list_reports(
    state: web::Data<AppState>,
    params: web::Query<ReportQueryParams>,
) -> HttpResponse {
    let query = ReportQuery {
        user_id: params.user_id.clone(),
        severities: Vec::new(),
        limit: params.limit.unwrap_or(SNAPSHOT_LIMIT),
        offset: params.offset.unwrap_or(0),
    };

    match queries::query_reports(state.db.as_ref(), &query).await {
        Ok(rows) => {
            let reports: Vec<ApiReport> = rows.into_iter().map(ApiReport::from).collect();
            HttpResponse::Ok().json(reports)
        }
        Err(e) => {
            log::error!("Failed to query reports: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to query reports"
            }))
        }
    }
}

/// `GET /api/reports/watch`
///
/// SSE stream of full-collection snapshots. The first event is the
/// current snapshot; each change notice on the feed triggers a re-query
/// and a fresh event. A lagged subscriber just re-queries, so missed
/// notices never lose data. Dropping the connection drops the feed
/// receiver and unsubscribes.
pub async fn watch_reports(state: web::Data<AppState>) -> HttpResponse {
    let db = Arc::clone(&state.db);
    let mut rx = state.feed.subscribe();

    let stream = async_stream::stream! {
        match snapshot_event(db.as_ref()).await {
            Ok(event) => yield Ok::<_, actix_web::Error>(event),
            Err(e) => {
                log::error!("Failed to load initial snapshot: {e}");
                return;
            }
        }

        loop {
            match rx.recv().await {
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                    match snapshot_event(db.as_ref()).await {
                        Ok(event) => yield Ok(event),
                        Err(e) => {
                            log::error!("Failed to load snapshot: {e}");
                            break;
                        }
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(stream)
}

/// Loads the current snapshot and frames it as one SSE event.
async fn snapshot_event(db: &dyn Database) -> Result<web::Bytes, DbError> {
    let rows = queries::query_reports(db, &snapshot_query()).await?;
    let reports: Vec<ApiReport> = rows.into_iter().map(ApiReport::from).collect();
    let json = serde_json::to_string(&reports).map_err(|e| DbError::Conversion {
        message: format!("Failed to serialize snapshot: {e}"),
    })?;

    Ok(web::Bytes::from(format!("data: {json}\n\n")))
}

/// `POST /api/reports/{id}/status`
///
/// Operator-only: requires `Authorization: Bearer <ADMIN_TOKEN>`.
pub async fn set_status(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<SetStatusRequest>,
) -> HttpResponse {
    let id = path.into_inner();
    let caller = authenticate(&req, &state.config);

    if let Err(e) =
        civic_lens_report::set_status(state.db.as_ref(), &state.feed, &caller, &id, body.status)
            .await
    {
        return report_error_response(&e);
    }

    match queries::get_report(state.db.as_ref(), &id).await {
        Ok(Some(row)) => HttpResponse::Ok().json(ApiReport::from(row)),
        Ok(None) => HttpResponse::NotFound().json(serde_json::json!({
            "error": format!("Report not found: {id}")
        })),
        Err(e) => {
            log::error!("Failed to re-read report {id}: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to read report"
            }))
        }
    }
}

/// `POST /api/reports/{id}/upvote`
pub async fn toggle_upvote(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpvoteRequest>,
) -> HttpResponse {
    let id = path.into_inner();

    match civic_lens_report::toggle_upvote(state.db.as_ref(), &state.feed, &id, &body.user_id)
        .await
    {
        Ok(outcome) => HttpResponse::Ok().json(UpvoteResponse {
            upvoted: outcome.result.upvoted(),
            count: outcome.upvote_count,
        }),
        Err(e) => report_error_response(&e),
    }
}

/// `GET /api/reports/{id}/share`
///
/// Share-intent links for one report. The address comes from reverse
/// geocoding, with a coordinate label fallback when the geocoder is
/// unavailable or has nothing mapped at the location.
pub async fn share_links(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let id = path.into_inner();

    let row = match queries::get_report(state.db.as_ref(), &id).await {
        Ok(Some(row)) => row,
        Ok(None) => {
            return HttpResponse::NotFound().json(serde_json::json!({
                "error": format!("Report not found: {id}")
            }));
        }
        Err(e) => {
            log::error!("Failed to read report {id}: {e}");
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to read report"
            }));
        }
    };

    let address = match nominatim::reverse_geocode(
        &state.http,
        &state.config.nominatim_base_url,
        row.latitude,
        row.longitude,
    )
    .await
    {
        Ok(Some(address)) => address,
        Ok(None) => coordinate_label(row.latitude, row.longitude),
        Err(e) => {
            log::warn!("Reverse geocoding failed for report {id}: {e}");
            coordinate_label(row.latitude, row.longitude)
        }
    };

    let issue = ShareIssue {
        severity: row.severity().unwrap_or(IssueSeverity::Low),
        category: row.category,
        description: row.description,
        address: address.clone(),
        location: GeoPoint::new(row.latitude, row.longitude),
        has_photo: !row.image_url.is_empty(),
    };

    HttpResponse::Ok().json(ApiShareLinks {
        address,
        twitter: civic_lens_share::twitter_share_url(&issue),
        email: civic_lens_share::email_share_url(&issue),
        whatsapp: civic_lens_share::whatsapp_share_url(&issue),
    })
}

/// `GET /api/triage`
///
/// The three-bucket kanban board.
pub async fn triage(state: web::Data<AppState>) -> HttpResponse {
    match queries::query_reports(state.db.as_ref(), &snapshot_query()).await {
        Ok(rows) => {
            let board = civic_lens_dispatch::triage_board(rows);
            HttpResponse::Ok().json(ApiTriageBoard {
                todo: board.todo.into_iter().map(ApiReport::from).collect(),
                in_progress: board.in_progress.into_iter().map(ApiReport::from).collect(),
                done: board.done.into_iter().map(ApiReport::from).collect(),
            })
        }
        Err(e) => {
            log::error!("Failed to build triage board: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to build triage board"
            }))
        }
    }
}

/// `GET /api/markers`
///
/// Map markers with decluttered display positions. Display offsets are
/// derived per request and never persisted.
pub async fn markers(state: web::Data<AppState>) -> HttpResponse {
    match queries::query_reports(state.db.as_ref(), &snapshot_query()).await {
        Ok(rows) => {
            let points: Vec<GeoPoint> = rows.iter().map(ReportRow::location).collect();
            let displayed = civic_lens_spatial::display_positions(&points);

            let markers: Vec<ApiMarker> = rows
                .into_iter()
                .zip(displayed)
                .map(|(row, display)| ApiMarker {
                    id: row.id,
                    latitude: row.latitude,
                    longitude: row.longitude,
                    display_latitude: display.latitude,
                    display_longitude: display.longitude,
                    category: row.category,
                    severity: row.severity,
                })
                .collect();

            HttpResponse::Ok().json(markers)
        }
        Err(e) => {
            log::error!("Failed to build markers: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to build markers"
            }))
        }
    }
}

/// `GET /api/heatmap`
pub async fn heatmap(state: web::Data<AppState>) -> HttpResponse {
    match queries::query_reports(state.db.as_ref(), &snapshot_query()).await {
        Ok(rows) => {
            let points: Vec<ApiHeatPoint> = rows
                .iter()
                .map(|row| ApiHeatPoint {
                    latitude: row.latitude,
                    longitude: row.longitude,
                    weight: civic_lens_spatial::heatmap_weight(&row.severity, row.upvotes.len()),
                })
                .collect();

            HttpResponse::Ok().json(points)
        }
        Err(e) => {
            log::error!("Failed to build heat layer: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to build heat layer"
            }))
        }
    }
}

/// `GET /api/dispatch/candidates`
pub async fn dispatch_candidates(state: web::Data<AppState>) -> HttpResponse {
    match civic_lens_dispatch::fetch_candidates(state.db.as_ref()).await {
        Ok(candidates) => {
            let reports: Vec<ApiReport> = candidates.into_iter().map(ApiReport::from).collect();
            HttpResponse::Ok().json(reports)
        }
        Err(e) => {
            log::error!("Failed to fetch dispatch candidates: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to fetch dispatch candidates"
            }))
        }
    }
}

/// `POST /api/dispatch/route`
///
/// Resolves the depot, fetches the candidate list, and delegates route
/// computation to OSRM. Router failures are terminal for this attempt;
/// the caller retries by re-invoking with refreshed candidates.
pub async fn dispatch_route(
    state: web::Data<AppState>,
    body: web::Json<RouteRequest>,
) -> HttpResponse {
    let candidates = match civic_lens_dispatch::fetch_candidates(state.db.as_ref()).await {
        Ok(candidates) => candidates,
        Err(e) => {
            log::error!("Failed to fetch dispatch candidates: {e}");
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to fetch dispatch candidates"
            }));
        }
    };

    let operator_location = match (body.operator_latitude, body.operator_longitude) {
        (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
        _ => None,
    };
    let depot = civic_lens_dispatch::resolve_depot(operator_location, &candidates);

    if candidates.is_empty() {
        return HttpResponse::Ok().json(ApiRouteResponse {
            depot_latitude: depot.latitude,
            depot_longitude: depot.longitude,
            stops: Vec::new(),
            polyline: String::new(),
            distance_meters: 0.0,
            duration_seconds: 0.0,
            notice: Some("No open high-severity reports to route".to_string()),
        });
    }

    let waypoints: Vec<GeoPoint> = candidates.iter().map(ReportRow::location).collect();

    let trip = match civic_lens_router::compute_optimized_route(
        &state.http,
        &state.config.osrm_base_url,
        depot,
        &waypoints,
    )
    .await
    {
        Ok(trip) => trip,
        Err(RouteError::NoRoute) => {
            return HttpResponse::BadGateway().json(serde_json::json!({
                "error": "No drivable route between the dispatch stops"
            }));
        }
        Err(e) => {
            log::error!("Route computation failed: {e}");
            return HttpResponse::BadGateway().json(serde_json::json!({
                "error": "Routing service unavailable"
            }));
        }
    };

    // stop_order holds input indices in visit order; input 0 is the depot.
    let stops: Vec<ApiRouteStop> = trip
        .stop_order
        .iter()
        .filter_map(|&input_index| {
            input_index
                .checked_sub(1)
                .and_then(|i| candidates.get(i))
                .map(|report| ApiRouteStop {
                    report_id: report.id.clone(),
                    latitude: report.latitude,
                    longitude: report.longitude,
                    category: report.category.clone(),
                    severity: report.severity.clone(),
                })
        })
        .collect();

    HttpResponse::Ok().json(ApiRouteResponse {
        depot_latitude: depot.latitude,
        depot_longitude: depot.longitude,
        stops,
        polyline: trip.polyline,
        distance_meters: trip.distance_meters,
        duration_seconds: trip.duration_seconds,
        notice: None,
    })
}

/// Resolves the caller identity from the `Authorization` header.
///
/// Operator rights require a bearer token matching `ADMIN_TOKEN`;
/// everything else is an anonymous non-operator, and the lifecycle crate
/// enforces the authorization rule.
fn authenticate(req: &HttpRequest, config: &ServerConfig) -> Caller {
    let presented = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    match (presented, config.admin_token.as_deref()) {
        (Some(presented), Some(expected)) if presented == expected => {
            Caller::new("operator", true)
        }
        _ => Caller::new("anonymous", false),
    }
}

/// The full-collection query used by the snapshot views.
fn snapshot_query() -> ReportQuery {
    ReportQuery {
        user_id: None,
        severities: Vec::new(),
        limit: SNAPSHOT_LIMIT,
        offset: 0,
    }
}

/// Maps a lifecycle error to its HTTP response.
fn report_error_response(e: &ReportError) -> HttpResponse {
    match e {
        ReportError::InputInvalid { message } => {
            HttpResponse::BadRequest().json(serde_json::json!({ "error": message }))
        }
        ReportError::LocationUnavailable => HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Location unavailable"
        })),
        ReportError::Unauthorized => HttpResponse::Unauthorized().json(serde_json::json!({
            "error": "Unauthorized"
        })),
        ReportError::NotFound { id } => HttpResponse::NotFound().json(serde_json::json!({
            "error": format!("Report not found: {id}")
        })),
        ReportError::Conflict { .. } => HttpResponse::Conflict().json(serde_json::json!({
            "error": "Concurrent update conflict, retry the request"
        })),
        ReportError::Persistence(inner) => {
            log::error!("Persistence failure: {inner}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Persistence failure"
            }))
        }
    }
}
