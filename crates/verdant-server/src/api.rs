//! API handlers for the Verdant agent server.

use crate::AppState;
use axum::{
    body::Bytes,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Upper bound on participant metadata carried in a join token.
const MAX_PARTICIPANT_METADATA_BYTES: usize = 16 * 1024;

/// Agent requested in a client's room configuration.
#[derive(Debug, Deserialize)]
pub struct AgentDispatch {
    pub agent_name: String,
}

/// Room configuration sent by the client.
#[derive(Debug, Default, Deserialize)]
pub struct RoomConfig {
    #[serde(default)]
    pub agents: Vec<AgentDispatch>,
}

/// Request body for connection details. Every field is optional and the
/// body itself may be empty.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectionDetailsRequest {
    #[serde(default)]
    pub room_config: Option<RoomConfig>,
    /// JSON-encoded diagnosis, forwarded verbatim as participant metadata.
    #[serde(default)]
    pub participant_metadata: Option<String>,
    #[serde(default)]
    pub participant_name: Option<String>,
}

impl ConnectionDetailsRequest {
    /// Whether the client wants this agent in its room. A request naming no
    /// agent gets the default one.
    pub fn wants_agent(&self, agent_name: &str) -> bool {
        match &self.room_config {
            Some(config) if !config.agents.is_empty() => config
                .agents
                .iter()
                .any(|agent| agent.agent_name == agent_name),
            _ => true,
        }
    }
}

/// Response body for connection details.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectionDetailsResponse {
    #[serde(rename = "serverUrl")]
    pub server_url: String,
    #[serde(rename = "roomName")]
    pub room_name: String,
    #[serde(rename = "participantName")]
    pub participant_name: String,
    #[serde(rename = "participantToken")]
    pub participant_token: String,
}

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("bad gateway: {0}")]
    BadGateway(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Health check handler.
///
/// Returns `200 OK` with server status and version.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Handler for `POST /api/connection-details`.
///
/// Creates a fresh room name, mints a join token carrying the client's
/// diagnosis as participant metadata, and dispatches the agent into the room.
pub async fn connection_details_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ConnectionDetailsResponse>, ApiError> {
    let request: ConnectionDetailsRequest = if body.is_empty() {
        ConnectionDetailsRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("invalid request body: {}", e)))?
    };

    let metadata = request
        .participant_metadata
        .as_deref()
        .filter(|m| !m.is_empty());
    if let Some(metadata) = metadata {
        if metadata.len() > MAX_PARTICIPANT_METADATA_BYTES {
            return Err(ApiError::BadRequest(format!(
                "participant metadata exceeds {} bytes",
                MAX_PARTICIPANT_METADATA_BYTES
            )));
        }
    }

    let suffix = Uuid::new_v4().simple().to_string();
    let room_name = format!("verdant_room_{}", &suffix[..12]);
    let participant_identity = format!("verdant_user_{}", &suffix[12..20]);
    let participant_name = request
        .participant_name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "user".to_string());

    let participant_token = state
        .voice_service
        .generate_join_token(&room_name, &participant_identity, &participant_name, metadata)
        .map_err(|e| ApiError::InternalServerError(format!("token generation failed: {}", e)))?;

    let has_diagnosis = verdant_voice::metadata::decode(metadata).is_some();
    let dispatched =
        request.wants_agent(&state.agent_name) && state.dispatcher.dispatch(&room_name);

    tracing::info!(
        room = %room_name,
        participant = %participant_identity,
        has_diagnosis,
        dispatched,
        "issued connection details"
    );

    Ok(Json(ConnectionDetailsResponse {
        server_url: state.voice_service.get_public_url().to_string(),
        room_name,
        participant_name,
        participant_token,
    }))
}
