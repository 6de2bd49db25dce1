//! HTTP API endpoints for reading room state.
//!
//! Used by host screens that poll instead of holding a socket.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::error::GameError;
use crate::state::AppState;
use crate::types::{Leaderboard, PlayerSnapshot, RoomStats};

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    msg: String,
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let status = match &self {
            GameError::NotFound { .. } => StatusCode::NOT_FOUND,
            GameError::StateConflict { .. } => StatusCode::CONFLICT,
            GameError::Validation(_) => StatusCode::BAD_REQUEST,
            GameError::Persistence(_) | GameError::ScoringFailed { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        };
        if status.is_server_error() {
            tracing::error!("API request failed: {}", self);
        }
        let body = ErrorBody {
            code: self.code(),
            msg: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Routes under `/api`
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/rooms/{code}", get(room_snapshot))
        .route("/api/rooms/{code}/leaderboard", get(leaderboard))
        .route("/api/rooms/{code}/stats", get(room_stats))
}

/// GET /api/rooms/{code}
///
/// Unauthenticated, so it serves the player view.
async fn room_snapshot(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<PlayerSnapshot>, GameError> {
    Ok(Json(state.get_player_snapshot(&code.to_uppercase()).await?))
}

/// GET /api/rooms/{code}/leaderboard
async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<Leaderboard>, GameError> {
    Ok(Json(state.get_leaderboard(&code.to_uppercase()).await?))
}

/// GET /api/rooms/{code}/stats
async fn room_stats(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<RoomStats>, GameError> {
    Ok(Json(state.room_stats(&code.to_uppercase()).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn app_with_room() -> (Router, Arc<AppState>, String) {
        let state = Arc::new(AppState::in_memory());
        let room = state.create_room("host", "Host", vec![]).await.unwrap();
        state.join_room(&room.code, "alice", "Alice").await.unwrap();
        let app = router().with_state(state.clone());
        (app, state, room.code)
    }

    #[tokio::test]
    async fn test_room_snapshot() {
        let (app, _, code) = app_with_room().await;

        let (status, body) = get_json(app, &format!("/api/rooms/{}", code)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["room"]["code"], code.as_str());
        assert_eq!(body["room"]["status"], "LOBBY");
        assert_eq!(body["players"][0]["name"], "Alice");
    }

    #[tokio::test]
    async fn test_room_snapshot_hides_answer_while_voting() {
        let (app, state, code) = app_with_room().await;
        state.join_room(&code, "bob", "Bob").await.unwrap();
        let question = state.start_round(&code).await.unwrap();
        state.start_voting(&code).await.unwrap();

        let (status, body) = get_json(app, &format!("/api/rooms/{}", code)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["room"]["status"], "VOTING");
        assert_eq!(body["question"], question.text.as_str());
        assert!(body.get("reveal").is_none());
        assert!(body["ballot"][0].get("target").is_none());
        assert!(!body.to_string().contains("correct_answer"));
    }

    #[tokio::test]
    async fn test_lowercase_code_is_accepted() {
        let (app, _, code) = app_with_room().await;

        let (status, _) = get_json(app, &format!("/api/rooms/{}/stats", code.to_lowercase())).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_room_is_404() {
        let (app, _, _) = app_with_room().await;

        let (status, body) = get_json(app, "/api/rooms/ZZZZZ/leaderboard").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_leaderboard_lists_members() {
        let (app, _, code) = app_with_room().await;

        let (status, body) = get_json(app, &format!("/api/rooms/{}/leaderboard", code)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["round_number"], 0);
        assert_eq!(body["totals"][0]["player_id"], "alice");
    }

    #[test]
    fn test_error_status_mapping() {
        let conflict = GameError::StateConflict {
            action: "cast a vote",
            status: crate::types::RoomStatus::Lobby,
        }
        .into_response();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let invalid = GameError::validation("bad").into_response();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let down = GameError::Persistence(crate::store::StoreError::Unavailable("x".to_string()))
            .into_response();
        assert_eq!(down.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
