#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the CivicLens application.
//!
//! Serves the REST API for submitting and triaging citizen reports: the
//! classify-then-create submission flow, the live report stream (SSE), the
//! kanban triage board, map markers and heat points, and the dispatch
//! route planner. External collaborators (vision classifier, Nominatim,
//! OSRM) are reached through their client crates.

mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use civic_lens_ai::providers::VisionProvider;
use civic_lens_database::feed::ReportFeed;
use civic_lens_database::{db, run_migrations};
use switchy_database::Database;

/// Server configuration resolved from the environment at startup.
pub struct ServerConfig {
    /// Bearer token authorizing operator endpoints; `None` disables them.
    pub admin_token: Option<String>,
    /// Base URL of the Nominatim reverse geocoder.
    pub nominatim_base_url: String,
    /// Base URL of the OSRM routing service.
    pub osrm_base_url: String,
}

impl ServerConfig {
    /// Reads the configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let admin_token = std::env::var("ADMIN_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        if admin_token.is_none() {
            log::warn!("ADMIN_TOKEN is not set; operator endpoints are disabled");
        }

        Self {
            admin_token,
            nominatim_base_url: std::env::var("NOMINATIM_BASE_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string()),
            osrm_base_url: std::env::var("OSRM_BASE_URL")
                .unwrap_or_else(|_| "https://router.project-osrm.org".to_string()),
        }
    }
}

/// Shared application state.
pub struct AppState {
    /// Database connection.
    pub db: Arc<dyn Database>,
    /// Change feed driving the SSE report stream.
    pub feed: Arc<ReportFeed>,
    /// HTTP client shared by the geocoder and router calls.
    pub http: reqwest::Client,
    /// Vision classifier; `None` when no provider credentials are
    /// configured (submission endpoint returns 503).
    pub classifier: Option<Arc<dyn VisionProvider>>,
    /// Environment configuration.
    pub config: ServerConfig,
}

/// Starts the CivicLens API server.
///
/// Connects to the database, runs migrations, builds the vision
/// classifier from the environment, and starts the Actix-Web HTTP server.
/// This is a regular async function — the caller is responsible for
/// providing the async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
///
/// # Panics
///
/// Panics if the database connection or migrations fail.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    log::info!("Connecting to database...");
    let db_conn = db::connect_from_env()
        .await
        .expect("Failed to connect to database");

    log::info!("Running migrations...");
    run_migrations(db_conn.as_ref())
        .await
        .expect("Failed to run migrations");

    let classifier = match civic_lens_ai::providers::create_provider_from_env() {
        Ok(provider) => Some(Arc::from(provider)),
        Err(e) => {
            log::warn!("Vision classifier unavailable: {e}");
            None
        }
    };

    let state = web::Data::new(AppState {
        db: Arc::from(db_conn),
        feed: Arc::new(ReportFeed::default()),
        http: reqwest::Client::new(),
        classifier,
        config: ServerConfig::from_env(),
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(handlers::health))
                    .route("/reports", web::post().to(handlers::submit_report))
                    .route("/reports", web::get().to(handlers::list_reports))
                    .route("/reports/watch", web::get().to(handlers::watch_reports))
                    .route(
                        "/reports/{id}/status",
                        web::post().to(handlers::set_status),
                    )
                    .route(
                        "/reports/{id}/upvote",
                        web::post().to(handlers::toggle_upvote),
                    )
                    .route("/reports/{id}/share", web::get().to(handlers::share_links))
                    .route("/triage", web::get().to(handlers::triage))
                    .route("/markers", web::get().to(handlers::markers))
                    .route("/heatmap", web::get().to(handlers::heatmap))
                    .route(
                        "/dispatch/candidates",
                        web::get().to(handlers::dispatch_candidates),
                    )
                    .route("/dispatch/route", web::post().to(handlers::dispatch_route)),
            )
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
