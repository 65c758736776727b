//! The session host: the external runtime that actually runs the pipeline.
//!
//! Speech recognition, the language model, synthesis, voice activity and
//! turn detection all live behind the host. The bootstrap hands it a
//! composed [`Session`] and later a single reply instruction.

use crate::error::VoiceError;
use crate::noise::{AudioInputOptions, NoiseProfileTable};
use crate::pipeline::{AudioOutput, PipelineCapabilities, Session};
use crate::service::VoiceService;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use verdant_types::Subscription;

/// A session the host has started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub id: String,
}

#[async_trait]
pub trait SessionHost: Send + Sync {
    /// Starts `session` in `room` with the agent subscribed per
    /// `subscription`, applying `input` to every participant's audio.
    async fn start(
        &self,
        session: &Session,
        room: &str,
        subscription: Subscription,
        input: &AudioInputOptions,
    ) -> Result<SessionHandle, VoiceError>;

    /// Asks the running session to speak, following `instructions`.
    async fn generate_reply(
        &self,
        handle: &SessionHandle,
        instructions: &str,
    ) -> Result<(), VoiceError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartSessionRequest<'a> {
    room: RoomJoin<'a>,
    pipeline: &'a PipelineCapabilities,
    instructions: &'a str,
    output: &'a AudioOutput,
    noise_cancellation: NoiseProfileTable,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomJoin<'a> {
    url: &'a str,
    name: &'a str,
    identity: &'a str,
    token: String,
    subscription: Subscription,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartSessionResponse {
    session_id: String,
}

#[derive(Serialize)]
struct ReplyRequest<'a> {
    instructions: &'a str,
}

/// Pipeline gateway reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSessionHost {
    client: reqwest::Client,
    gateway_url: String,
    agent_identity: String,
    agent_name: String,
    voice: Arc<VoiceService>,
}

impl HttpSessionHost {
    pub fn new(
        gateway_url: impl Into<String>,
        agent_identity: impl Into<String>,
        agent_name: impl Into<String>,
        voice: Arc<VoiceService>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            gateway_url: gateway_url.into().trim_end_matches('/').to_string(),
            agent_identity: agent_identity.into(),
            agent_name: agent_name.into(),
            voice,
        }
    }
}

#[async_trait]
impl SessionHost for HttpSessionHost {
    async fn start(
        &self,
        session: &Session,
        room: &str,
        subscription: Subscription,
        input: &AudioInputOptions,
    ) -> Result<SessionHandle, VoiceError> {
        if self.gateway_url.is_empty() {
            return Err(VoiceError::Config(
                "pipeline gateway URL is not configured".to_string(),
            ));
        }

        let token =
            self.voice
                .generate_join_token(room, &self.agent_identity, &self.agent_name, None)?;

        let request = StartSessionRequest {
            room: RoomJoin {
                url: self.voice.get_url(),
                name: room,
                identity: &self.agent_identity,
                token,
                subscription,
            },
            pipeline: &session.capabilities,
            instructions: &session.instructions,
            output: &session.output,
            noise_cancellation: input.profile_table(),
        };

        let response: StartSessionResponse = self
            .client
            .post(format!("{}/v1/sessions", self.gateway_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| VoiceError::Session(format!("invalid gateway response: {}", e)))?;

        debug!(room, session_id = %response.session_id, "pipeline session started");

        Ok(SessionHandle {
            id: response.session_id,
        })
    }

    async fn generate_reply(
        &self,
        handle: &SessionHandle,
        instructions: &str,
    ) -> Result<(), VoiceError> {
        self.client
            .post(format!(
                "{}/v1/sessions/{}/reply",
                self.gateway_url, handle.id
            ))
            .json(&ReplyRequest { instructions })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{assemble, PipelineConfig};
    use crate::LiveKitConfig;

    fn host(gateway_url: &str) -> HttpSessionHost {
        let voice = Arc::new(VoiceService::new(LiveKitConfig::default()));
        HttpSessionHost::new(gateway_url, "verdant-agent", "Verdant", voice)
    }

    #[tokio::test]
    async fn missing_gateway_is_a_config_error() {
        let session = assemble(&PipelineConfig::default(), "test").unwrap();
        let err = host("")
            .start(
                &session,
                "room",
                Subscription::AudioOnly,
                &AudioInputOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, VoiceError::Config(_)));
    }

    #[tokio::test]
    async fn unreachable_gateway_is_an_http_error() {
        let session = assemble(&PipelineConfig::default(), "test").unwrap();
        let err = host("http://127.0.0.1:9/")
            .start(
                &session,
                "room",
                Subscription::AudioOnly,
                &AudioInputOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, VoiceError::Http(_)));
    }

    #[tokio::test]
    async fn reply_to_unreachable_gateway_is_an_http_error() {
        let handle = SessionHandle {
            id: "session-1".to_string(),
        };
        let err = host("http://127.0.0.1:9")
            .generate_reply(&handle, "Greet the user.")
            .await
            .unwrap_err();
        assert!(matches!(err, VoiceError::Http(_)));
    }

    #[test]
    fn reply_request_shape() {
        let json = serde_json::to_value(ReplyRequest {
            instructions: "Greet the user.",
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "instructions": "Greet the user." }));
    }

    #[test]
    fn start_request_shape() {
        let session = assemble(&PipelineConfig::default(), "be brief").unwrap();
        let request = StartSessionRequest {
            room: RoomJoin {
                url: "ws://lk",
                name: "room",
                identity: "verdant-agent",
                token: "jwt".to_string(),
                subscription: Subscription::AudioOnly,
            },
            pipeline: &session.capabilities,
            instructions: &session.instructions,
            output: &session.output,
            noise_cancellation: AudioInputOptions::default().profile_table(),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["room"]["subscription"], "audio_only");
        assert_eq!(json["pipeline"]["llm"]["provider"], "openai");
        assert_eq!(json["output"]["type"], "room");
        assert_eq!(json["noiseCancellation"]["telephony"], "telephony");
        assert_eq!(json["instructions"], "be brief");
    }
}
