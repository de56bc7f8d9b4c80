//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::app::AppState;
use crate::map::catalog::AssetCategory;
use crate::map::{EditorError, MapObject, PlacementOutcome};
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.client_origin);

    let game_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route("/map", get(map_handler));

    let editor_routes = Router::new()
        .route("/editor/catalog", get(catalog_handler))
        .route("/editor/objects", get(objects_handler))
        .route("/editor/place", post(place_handler))
        .route("/editor/clear", post(clear_handler))
        .route("/editor/export", get(export_handler));

    Router::new()
        .merge(game_routes)
        .merge(editor_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS from `CLIENT_ORIGIN`: "*" or a comma-separated origin list
fn cors_layer(client_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods([Method::GET, Method::POST, Method::OPTIONS]);

    if client_origin.trim() == "*" {
        return cors.allow_origin(Any).allow_headers(Any);
    }

    let allowed_origins: Vec<HeaderValue> = client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();

    cors.allow_origin(allowed_origins)
        .allow_headers([header::CONTENT_TYPE])
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_sessions: usize,
    total_frames: u64,
    obstacles: usize,
    collidable: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_sessions: state.sessions.active_sessions(),
        total_frames: state.sessions.total_frames(),
        obstacles: state.world.obstacles().len(),
        collidable: state.world.collidable_count(),
    })
}

// ============================================================================
// World map
// ============================================================================

async fn map_handler(State(state): State<AppState>) -> Json<Vec<MapObject>> {
    Json(state.world.objects().to_vec())
}

// ============================================================================
// Editor endpoints
// ============================================================================

#[derive(Serialize)]
struct CatalogItem {
    #[serde(rename = "type")]
    kind: String,
    image: String,
    category: AssetCategory,
    default_size: f32,
    placeholder: bool,
}

async fn catalog_handler(State(state): State<AppState>) -> Json<Vec<CatalogItem>> {
    let items = state
        .catalog
        .placeable()
        .map(|e| CatalogItem {
            kind: e.kind.clone(),
            image: e.image.clone(),
            category: e.category,
            default_size: e.default_size,
            placeholder: state.catalog.is_placeholder(&e.kind),
        })
        .collect();

    Json(items)
}

async fn objects_handler(State(state): State<AppState>) -> Json<Vec<MapObject>> {
    Json(state.editor.lock().objects().to_vec())
}

#[derive(Deserialize)]
struct PlaceRequest {
    #[serde(rename = "type")]
    kind: String,
    x: f32,
    y: f32,
}

#[derive(Serialize)]
struct PlaceResponse {
    #[serde(flatten)]
    outcome: PlacementOutcome,
    message: String,
}

async fn place_handler(
    State(state): State<AppState>,
    Json(req): Json<PlaceRequest>,
) -> Result<Json<PlaceResponse>, AppError> {
    let outcome = state.editor.lock().place(&req.kind, req.x, req.y)?;

    Ok(Json(PlaceResponse {
        message: outcome.message(),
        outcome,
    }))
}

#[derive(Serialize)]
struct ClearResponse {
    removed: usize,
}

async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let mut editor = state.editor.lock();
    let removed = editor.len();
    editor.clear();

    info!(removed, "Editor cleared");
    Json(ClearResponse { removed })
}

async fn export_handler(State(state): State<AppState>) -> Result<Response, AppError> {
    let json = state
        .editor
        .lock()
        .export_json()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"map_data.json\"",
            ),
        ],
        json,
    )
        .into_response())
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<EditorError> for AppError {
    fn from(err: EditorError) -> Self {
        match err {
            EditorError::UnknownType(_) => AppError::NotFound(err.to_string()),
            EditorError::NotPlaceable(_) | EditorError::OutOfBounds { .. } => {
                AppError::BadRequest(err.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
