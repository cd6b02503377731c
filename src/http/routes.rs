//! HTTP route definitions

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::app::AppState;
use crate::game::error::GameError;
use crate::game::snapshot::SnapshotBuilder;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;
use crate::ws::protocol::SessionSnapshot;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.client_origin);

    let game_routes = Router::new()
        .route("/game/create", post(create_handler))
        .route("/game/:session_id", get(status_handler))
        .route("/game/:session_id/join", post(join_handler))
        .route("/game/:session_id/ready", post(ready_handler))
        .route("/game/:session_id/leave", post(leave_handler));

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .nest("/api", game_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS for `CLIENT_ORIGIN`: "*" or a comma-separated origin list
fn cors_layer(client_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if client_origin.trim() == "*" {
        return cors.allow_origin(Any);
    }

    let allowed_origins: Vec<HeaderValue> = client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();
    cors.allow_origin(allowed_origins)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_sessions: usize,
    active_loops: usize,
    connected_players: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_sessions: state.registry.len(),
        active_loops: state.scheduler.active_loops(),
        connected_players: state.registry.total_players(),
    })
}

// ============================================================================
// Game session endpoints
// ============================================================================

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct CreateRequest {
    session_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateResponse {
    session_id: String,
    message: String,
}

async fn create_handler(
    State(state): State<AppState>,
    body: Option<Json<CreateRequest>>,
) -> (StatusCode, Json<CreateResponse>) {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let session_id = state.lobby.create_session(req.session_id);

    (
        StatusCode::CREATED,
        Json(CreateResponse {
            message: format!("Game session {session_id} created."),
            session_id,
        }),
    )
}

async fn status_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let handle = state
        .registry
        .get(&session_id)
        .ok_or(GameError::SessionNotFound(session_id))?;
    let snapshot = SnapshotBuilder::build(&handle.lock());
    Ok(Json(snapshot))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinRequest {
    player_id: Option<String>,
    player_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerRequest {
    player_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ActionResponse {
    session_id: String,
    player_id: String,
    message: String,
}

async fn join_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<JoinRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let (Some(player_id), Some(player_name)) = (
        req.player_id.filter(|s| !s.is_empty()),
        req.player_name.filter(|s| !s.is_empty()),
    ) else {
        return Err(AppError::BadRequest(
            "playerId and playerName are required".to_string(),
        ));
    };

    state.lobby.join_player(&session_id, &player_id, &player_name)?;

    Ok(Json(ActionResponse {
        message: format!("{player_name} joined the game."),
        session_id,
        player_id,
    }))
}

async fn ready_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<PlayerRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let player_id = required_player_id(req)?;
    state.lobby.set_ready(&session_id, &player_id)?;

    Ok(Json(ActionResponse {
        message: "Player is ready.".to_string(),
        session_id,
        player_id,
    }))
}

async fn leave_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<PlayerRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    let player_id = required_player_id(req)?;
    state.lobby.leave(&session_id, &player_id)?;

    Ok(Json(ActionResponse {
        message: "Player left the game.".to_string(),
        session_id,
        player_id,
    }))
}

fn required_player_id(req: PlayerRequest) -> Result<String, AppError> {
    req.player_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("playerId is required".to_string()))
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
}

impl From<GameError> for AppError {
    fn from(err: GameError) -> Self {
        match err {
            GameError::SessionNotFound(_) | GameError::PlayerNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            GameError::PlayerAlreadyInSession(_) | GameError::Unauthorized { .. } => {
                AppError::BadRequest(err.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
