//! HTTP Endpoints
//!
//! A generic JSON envelope around the turn API. Platform-specific envelopes
//! (smart-speaker requests and the like) are translated into this by the
//! caller.

use std::time::Duration;

use axum::{
    extract::{Json, Path, State},
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::ServerError;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let server = &state.config.server;
    let cors_layer = build_cors_layer(&server.cors_origins, server.cors_enabled);
    let timeout = Duration::from_secs(server.request_timeout_seconds);

    Router::new()
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        .route("/api/sessions/:id/utterances", post(post_utterance))
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(timeout))
                .layer(cors_layer),
        )
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - `cors_enabled = false` allows every origin (development only)
/// - Otherwise only the configured origins that parse are allowed
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins");
        return CorsLayer::permissive();
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!(origin = %origin, "Invalid CORS origin");
                None
            })
        })
        .collect();

    if parsed.is_empty() {
        tracing::warn!("No valid CORS origins configured, cross-origin requests will be rejected");
    } else {
        tracing::info!(origins = parsed.len(), "CORS configured");
    }

    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}

/// One utterance for a session
#[derive(Debug, Deserialize)]
pub struct UtteranceRequest {
    pub text: String,
}

/// Result of one turn
#[derive(Debug, Serialize, Deserialize)]
pub struct UtteranceResponse {
    pub spoken_output: String,
    pub session_updated: bool,
}

async fn post_utterance(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<UtteranceRequest>,
) -> Result<Json<UtteranceResponse>, ServerError> {
    if session_id.trim().is_empty() {
        return Err(ServerError::InvalidRequest("session id is empty".to_string()));
    }

    let turn = state.engine.handle_utterance(&session_id, &request.text).await?;

    Ok(Json(UtteranceResponse {
        spoken_output: turn.spoken_output,
        session_updated: turn.session_updated,
    }))
}

/// Get session info
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let Some(session) = state.engine.session(&id).await? else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("session `{}` not found", id) })),
        ));
    };

    let mut slots: Vec<&String> = session.slot_values.keys().collect();
    slots.sort();

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "session_id": session.id,
            "active_goal": session.active_goal(),
            "goals": session.goal_stack.ids(),
            "slots": slots,
            "turn_count": session.turn_count,
            "updated_at": session.updated_at,
        })),
    ))
}

/// Delete session
async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.end_session(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Health check
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let sessions = state
        .session_store
        .list_ids()
        .await
        .map(|ids| ids.len())
        .unwrap_or_default();

    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "sessions": sessions,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;
    use voice_intent_config::Settings;

    fn router() -> Router {
        create_router(AppState::new(Settings::default()).unwrap())
    }

    async fn say(app: &Router, session: &str, text: &str) -> UtteranceResponse {
        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/sessions/{}/utterances", session))
            .header("content-type", "application/json")
            .body(Body::from(serde_json::json!({ "text": text }).to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_utterance_turn() {
        let app = router();
        let turn = say(&app, "s1", "create a new lead").await;
        assert!(turn.session_updated);
        assert!(turn.spoken_output.ends_with("What is the person's first and last name?"));

        let turn = say(&app, "s1", "Jeff Douglas").await;
        assert!(turn.spoken_output.contains("Jeff Douglas"));
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let app = router();
        say(&app, "s2", "help").await;

        let response = app
            .clone()
            .oneshot(Request::get("/api/sessions/s2").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(
                Request::delete("/api/sessions/s2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(Request::get("/api/sessions/s2").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/sessions/s1/utterances")
            .header("content-type", "application/json")
            .body(Body::from("{\"message\": 1}"))
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
    }
}
