// ASI Dashboard - Web Server
// Serves the dashboard page and its session API under /viz/asi

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use rusqlite::Connection;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use uuid::Uuid;

use asi_dashboard::{
    AppConfig, Dataset, DropdownOptions, Event, ExportError, FilterSelection, SessionStore,
    SessionView, EXPORT_FILE_NAME, PATH_PREFIX, SVG_CONTENT_TYPE,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    /// Read-only snapshot, loaded once
    dataset: Arc<Dataset>,
    sessions: Arc<SessionStore>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Serialize)]
struct OptionsResponse {
    #[serde(flatten)]
    options: DropdownOptions,
    defaults: FilterSelection,
}

#[derive(Serialize)]
struct SessionResponse {
    session_id: Uuid,
    #[serde(flatten)]
    view: SessionView,
}

fn session_not_found(id: &Uuid) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error(format!("unknown session {}", id))),
    )
        .into_response()
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/options - Dropdown options and the default selection
async fn get_options(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(OptionsResponse {
        options: state.dataset.dropdown_options(),
        defaults: FilterSelection::default(),
    }))
}

/// POST /api/sessions - Open a session with the first paint already applied
async fn create_session(State(state): State<AppState>) -> impl IntoResponse {
    let (session_id, session) = state.sessions.create(&state.dataset);
    log::info!("opened session {} ({} active)", session_id, state.sessions.len());

    (
        StatusCode::CREATED,
        Json(ApiResponse::ok(SessionResponse {
            session_id,
            view: session.view(),
        })),
    )
}

/// POST /api/sessions/:id/events - Feed one user action to a session
async fn post_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(event): Json<Event>,
) -> Response {
    log::debug!("session {}: {:?}", id, event);

    match state.sessions.dispatch(&state.dataset, &id, event) {
        Some(transition) => (
            StatusCode::OK,
            Json(ApiResponse::ok(SessionResponse {
                session_id: id,
                view: transition.state.view(),
            })),
        )
            .into_response(),
        None => session_not_found(&id),
    }
}

/// GET /api/sessions/:id/export - Download the last rendered chart as plot.svg
async fn export_svg(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let Some(transition) = state.sessions.dispatch(&state.dataset, &id, Event::ExportPressed) else {
        return session_not_found(&id);
    };

    match transition.download {
        Some(Ok(bytes)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, SVG_CONTENT_TYPE.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
                ),
            ],
            bytes,
        )
            .into_response(),
        Some(Err(e @ ExportError::NothingToExport)) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<()>::error(e.to_string())),
        )
            .into_response(),
        Some(Err(e)) => {
            log::error!("export failed for session {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error(e.to_string())),
            )
                .into_response()
        }
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<()>::error("export produced no file")),
        )
            .into_response(),
    }
}

/// GET / - Serve the dashboard page
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

// ============================================================================
// Router
// ============================================================================

/// Assets directory, independent of the working directory
const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/web");

fn at(path: &str) -> String {
    format!("{}{}", PATH_PREFIX, path)
}

fn build_app(state: AppState) -> Router {
    Router::new()
        .route(&at("/"), get(serve_index))
        .route(&at("/api/health"), get(health_check))
        .route(&at("/api/options"), get(get_options))
        .route(&at("/api/sessions"), post(create_session))
        .route(&at("/api/sessions/:id/events"), post(post_event))
        .route(&at("/api/sessions/:id/export"), get(export_svg))
        .nest_service(&at("/static"), ServeDir::new(STATIC_DIR))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    asi_dashboard::init_logging();

    println!("🌐 {} - Web Server", asi_dashboard::APP_TITLE);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = AppConfig::from_env()?;

    if !config.database_path.exists() {
        eprintln!("❌ Database not found at {:?}", config.database_path);
        eprintln!("   Run: asi import <csv-dir> {}", config.database_path.display());
        eprintln!("   to build it first.");
        std::process::exit(1);
    }

    let conn = Connection::open(&config.database_path)
        .with_context(|| format!("Failed to open database {}", config.database_path.display()))?;
    let dataset = Dataset::load(&conn, &config.indicator_csv)?;
    drop(conn);

    let state = AppState {
        dataset: Arc::new(dataset),
        sessions: Arc::new(SessionStore::new()),
    };
    let app = build_app(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    log::info!("listening on http://{}{}/", addr, PATH_PREFIX);
    println!("\n🚀 Dashboard: http://{}{}/", addr, PATH_PREFIX);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Server terminated")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use asi_dashboard::{FactRow, UnitLookup, NO_DATA_MESSAGE};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn create_test_row(fy: &str, value: f64) -> FactRow {
        FactRow {
            indicator_code: "1".to_string(),
            state_code: "99".to_string(),
            nic_code: "99999".to_string(),
            nic_code_type: "Total".to_string(),
            sector_code: "3".to_string(),
            indicator_value: value,
            classification_year: 2008,
            financial_year: fy.to_string(),
            indicator_description: "Number of Factories".to_string(),
            unit_description: "-".to_string(),
            nic_description: "All Industries".to_string(),
            state_description: "All India".to_string(),
            sector_description: "Combined".to_string(),
        }
    }

    fn create_test_app() -> Router {
        create_test_app_with(vec![
            create_test_row("2017-18", 250000.0),
            create_test_row("2018-19", 260000.0),
        ])
    }

    fn create_test_app_with(rows: Vec<FactRow>) -> Router {
        let mut units = UnitLookup::new();
        units.insert("Number of Factories".to_string(), "-".to_string());
        let dataset = Dataset::new(rows, units);

        build_app(AppState {
            dataset: Arc::new(dataset),
            sessions: Arc::new(SessionStore::new()),
        })
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn open_session(app: &Router) -> (String, serde_json::Value) {
        let (status, json) = send(app, post_json(&at("/api/sessions"), "")).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = json["data"]["session_id"].as_str().unwrap().to_string();
        (id, json)
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_test_app();
        let request = Request::get(at("/api/health")).body(Body::empty()).unwrap();

        let (status, json) = send(&app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"], "OK");
    }

    #[tokio::test]
    async fn test_options_include_defaults() {
        let app = create_test_app();
        let request = Request::get(at("/api/options")).body(Body::empty()).unwrap();

        let (status, json) = send(&app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["indicators"][0], "Number of Factories");
        assert_eq!(json["data"]["defaults"]["classification_year"], 2008);
        assert_eq!(json["data"]["defaults"]["financial_years"][0], "Select All");
    }

    #[tokio::test]
    async fn test_new_session_shows_default_chart() {
        let app = create_test_app();

        let (_, json) = open_session(&app).await;

        assert_eq!(json["data"]["chart_visible"], true);
        assert_eq!(json["data"]["chart"]["y_label"], "Number of Factories (Quantity)");
        assert_eq!(json["data"]["classification_label"], "NIC Classification - 2008");
    }

    #[tokio::test]
    async fn test_apply_without_data_reports_message() {
        let app = create_test_app();
        let (id, _) = open_session(&app).await;
        let events = at(&format!("/api/sessions/{}/events", id));

        send(
            &app,
            post_json(&events, r#"{"type":"filter_changed","change":{"field":"sector","value":"Rural"}}"#),
        )
        .await;
        let (status, json) = send(&app, post_json(&events, r#"{"type":"apply_pressed"}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["chart_visible"], false);
        assert_eq!(json["data"]["error_text"], NO_DATA_MESSAGE);
        assert_eq!(json["data"]["selection"]["sector"], "Rural");
    }

    #[tokio::test]
    async fn test_export_download() {
        let app = create_test_app();
        let (id, _) = open_session(&app).await;
        let request = Request::get(at(&format!("/api/sessions/{}/export", id)))
            .body(Body::empty())
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], SVG_CONTENT_TYPE);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"plot.svg\""
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("<svg"));
    }

    #[tokio::test]
    async fn test_export_before_any_chart_is_not_found() {
        let app = create_test_app_with(Vec::new());
        let (id, session) = open_session(&app).await;
        assert_eq!(session["data"]["chart_visible"], false);

        let request = Request::get(at(&format!("/api/sessions/{}/export", id)))
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(&app, request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains("nothing to export"));
    }

    #[tokio::test]
    async fn test_stylesheet_served() {
        let app = create_test_app();
        let request = Request::get(at("/static/style.css")).body(Body::empty()).unwrap();

        let response = app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let app = create_test_app();
        let uri = at(&format!("/api/sessions/{}/events", Uuid::new_v4()));

        let (status, json) = send(&app, post_json(&uri, r#"{"type":"apply_pressed"}"#)).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);
    }
}
