//! Client for the leaf/pod image classifier.
//!
//! The classifier is an external HTTP service accepting a multipart `file`
//! upload at `{base_url}/predict` and answering with a [`PlantPrediction`].

use reqwest::multipart::{Form, Part};
use std::time::Duration;
use thiserror::Error;
use verdant_types::PlantPrediction;

/// Errors talking to the classifier.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("classifier answered {status}: {body}")]
    Status { status: u16, body: String },
}

/// A photo to classify.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct PlantClassifier {
    client: reqwest::Client,
    base_url: String,
}

impl PlantClassifier {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn predict_url(&self) -> String {
        format!("{}/predict", self.base_url)
    }

    /// Forwards `upload` to the classifier and parses its verdict.
    pub async fn predict(&self, upload: ImageUpload) -> Result<PlantPrediction, ClassifierError> {
        let mut part = Part::bytes(upload.data).file_name(upload.file_name);
        if let Some(content_type) = upload.content_type.as_deref() {
            part = part.mime_str(content_type)?;
        }

        let response = self
            .client
            .post(self.predict_url())
            .multipart(Form::new().part("file", part))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<PlantPrediction>().await?)
    }
}
