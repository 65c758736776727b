//! Plant photo classification.
//!
//! Forwards a photo to the classifier and returns its prediction together
//! with the participant metadata the client passes on to
//! `/api/connection-details`.

use crate::{api::ApiError, classifier::ImageUpload, AppState};
use axum::{
    extract::{Extension, Multipart},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use verdant_types::PlantPrediction;

/// Maximum photo size: 10 MiB.
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// File name forwarded when the client sends none.
const DEFAULT_FILE_NAME: &str = "upload.jpg";

/// Response body for `POST /api/plant/predict`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: PlantPrediction,
    /// The prediction encoded as participant metadata.
    #[serde(rename = "participantMetadata")]
    pub participant_metadata: String,
}

/// Handler for `POST /api/plant/predict`.
///
/// Expects a multipart body with a `file` field.
pub async fn predict_handler(
    Extension(state): Extension<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<PredictResponse>, ApiError> {
    let upload = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(format!("multipart error: {}", e)))?
            .ok_or_else(|| ApiError::BadRequest("missing file".to_string()))?;

        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_FILE_NAME)
            .to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {}", e)))?;

        break ImageUpload {
            file_name,
            content_type,
            data: data.to_vec(),
        };
    };

    if upload.data.is_empty() {
        return Err(ApiError::BadRequest("missing file".to_string()));
    }
    if upload.data.len() > MAX_UPLOAD_SIZE {
        return Err(ApiError::BadRequest(format!(
            "file too large: {} bytes (max {})",
            upload.data.len(),
            MAX_UPLOAD_SIZE
        )));
    }

    let size = upload.data.len();
    let prediction = state.classifier.predict(upload).await.map_err(|e| {
        tracing::warn!(size, "plant classification failed: {}", e);
        ApiError::BadGateway("upstream request failed".to_string())
    })?;

    let participant_metadata = prediction
        .to_context()
        .to_metadata()
        .map_err(|e| ApiError::InternalServerError(format!("failed to encode diagnosis: {}", e)))?;

    tracing::info!(
        class = %prediction.class_name,
        health = ?prediction.health(),
        size,
        "plant photo classified"
    );

    Ok(Json(PredictResponse {
        prediction,
        participant_metadata,
    }))
}
