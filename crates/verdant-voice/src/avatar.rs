//! Best-effort avatar attachment.
//!
//! An avatar renders the agent's face and lip-syncs it to the synthesized
//! speech. It is optional: if the provider is unreachable or rejects the
//! persona, the session runs audio-only.

use crate::error::VoiceError;
use crate::pipeline::Session;
use crate::service::VoiceService;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use verdant_types::PersonaConfig;

/// Upper bound on a single attach attempt.
const ATTACH_TIMEOUT: Duration = Duration::from_secs(15);

/// Identity prefix of the avatar's room participant.
const AVATAR_IDENTITY_PREFIX: &str = "avatar-";

/// A started avatar, bound to a session's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvatarBinding {
    /// Provider-side session identifier.
    pub session_id: String,
    /// Identity the avatar uses when it publishes into the room.
    pub participant_identity: String,
}

#[async_trait]
pub trait AvatarService: Send + Sync {
    async fn start(&self, persona: &PersonaConfig, room: &str)
        -> Result<AvatarBinding, VoiceError>;
}

/// Result of an attach attempt. Never an error for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvatarOutcome {
    /// The avatar is bound to the session output.
    Attached,
    /// No avatar service is configured.
    Skipped,
    /// The attempt failed; the session stays audio-only.
    Degraded(String),
}

impl AvatarOutcome {
    pub fn is_attached(&self) -> bool {
        matches!(self, Self::Attached)
    }
}

/// Tries to pair an avatar with `session`.
pub async fn attach(
    session: &mut Session,
    room: &str,
    persona: &PersonaConfig,
    service: Option<&dyn AvatarService>,
) -> AvatarOutcome {
    let Some(service) = service else {
        info!(room, "no avatar service configured, running audio-only");
        return AvatarOutcome::Skipped;
    };

    if let Err(e) = persona.validate() {
        warn!(room, "avatar persona rejected, running audio-only: {}", e);
        return AvatarOutcome::Degraded(e.to_string());
    }

    match tokio::time::timeout(ATTACH_TIMEOUT, service.start(persona, room)).await {
        Ok(Ok(binding)) => {
            info!(
                room,
                persona = %persona.name,
                avatar_session = %binding.session_id,
                "avatar attached"
            );
            session.bind_avatar(binding);
            AvatarOutcome::Attached
        }
        Ok(Err(e)) => {
            warn!(
                room,
                persona = %persona.name,
                "avatar attach failed, running audio-only: {}",
                e
            );
            AvatarOutcome::Degraded(e.to_string())
        }
        Err(_) => {
            warn!(
                room,
                timeout_secs = ATTACH_TIMEOUT.as_secs(),
                "avatar attach timed out, running audio-only"
            );
            AvatarOutcome::Degraded("avatar attach timed out".to_string())
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartAvatarRequest<'a> {
    persona_config: &'a PersonaConfig,
    livekit: LiveKitJoin<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LiveKitJoin<'a> {
    url: &'a str,
    room_name: &'a str,
    token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartAvatarResponse {
    session_id: String,
}

/// Avatar provider reached over HTTP.
///
/// The provider joins the room itself with a token minted here, then
/// consumes the agent's audio and publishes synced video.
#[derive(Debug, Clone)]
pub struct HttpAvatarService {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    voice: Arc<VoiceService>,
}

impl HttpAvatarService {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        voice: Arc<VoiceService>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            voice,
        }
    }
}

#[async_trait]
impl AvatarService for HttpAvatarService {
    async fn start(
        &self,
        persona: &PersonaConfig,
        room: &str,
    ) -> Result<AvatarBinding, VoiceError> {
        if self.api_key.is_empty() {
            return Err(VoiceError::Avatar("avatar API key is not configured".to_string()));
        }

        let identity = format!("{}{}", AVATAR_IDENTITY_PREFIX, persona.name.to_lowercase());
        let token = self
            .voice
            .generate_join_token(room, &identity, &persona.name, None)?;

        let request = StartAvatarRequest {
            persona_config: persona,
            livekit: LiveKitJoin {
                url: self.voice.get_url(),
                room_name: room,
                token,
            },
        };

        let response: StartAvatarResponse = self
            .client
            .post(format!("{}/v1/sessions", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(AvatarBinding {
            session_id: response.session_id,
            participant_identity: identity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{assemble, PipelineConfig};

    struct FixedAvatar(Result<AvatarBinding, String>);

    #[async_trait]
    impl AvatarService for FixedAvatar {
        async fn start(
            &self,
            _persona: &PersonaConfig,
            _room: &str,
        ) -> Result<AvatarBinding, VoiceError> {
            self.0.clone().map_err(VoiceError::Avatar)
        }
    }

    struct StalledAvatar;

    #[async_trait]
    impl AvatarService for StalledAvatar {
        async fn start(
            &self,
            _persona: &PersonaConfig,
            _room: &str,
        ) -> Result<AvatarBinding, VoiceError> {
            std::future::pending::<Result<AvatarBinding, VoiceError>>().await
        }
    }

    fn session() -> Session {
        assemble(&PipelineConfig::default(), "test").unwrap()
    }

    fn binding() -> AvatarBinding {
        AvatarBinding {
            session_id: "av-1".to_string(),
            participant_identity: "avatar-cara".to_string(),
        }
    }

    #[tokio::test]
    async fn successful_attach_binds_output() {
        let mut session = session();
        let service = FixedAvatar(Ok(binding()));
        let outcome =
            attach(&mut session, "room", &PersonaConfig::default(), Some(&service)).await;

        assert_eq!(outcome, AvatarOutcome::Attached);
        assert!(session.has_avatar());
    }

    #[tokio::test]
    async fn failure_degrades_to_audio_only() {
        let mut session = session();
        let service = FixedAvatar(Err("service unavailable".to_string()));
        let outcome =
            attach(&mut session, "room", &PersonaConfig::default(), Some(&service)).await;

        assert!(matches!(outcome, AvatarOutcome::Degraded(ref m) if m.contains("unavailable")));
        assert!(!session.has_avatar());
    }

    #[tokio::test]
    async fn missing_service_is_skipped() {
        let mut session = session();
        let outcome = attach(&mut session, "room", &PersonaConfig::default(), None).await;
        assert_eq!(outcome, AvatarOutcome::Skipped);
    }

    #[tokio::test]
    async fn invalid_persona_never_reaches_service() {
        let mut session = session();
        let service = FixedAvatar(Ok(binding()));
        let persona = PersonaConfig::new("Cara", "");
        let outcome = attach(&mut session, "room", &persona, Some(&service)).await;

        assert!(matches!(outcome, AvatarOutcome::Degraded(_)));
        assert!(!session.has_avatar());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_service_times_out() {
        let mut session = session();
        let outcome = attach(
            &mut session,
            "room",
            &PersonaConfig::default(),
            Some(&StalledAvatar),
        )
        .await;
        assert_eq!(
            outcome,
            AvatarOutcome::Degraded("avatar attach timed out".to_string())
        );
    }

    #[tokio::test]
    async fn unreachable_http_provider_degrades() {
        let voice = Arc::new(VoiceService::new(crate::LiveKitConfig::default()));
        let service = HttpAvatarService::new("http://127.0.0.1:9", "key", voice);
        let mut session = session();
        let outcome =
            attach(&mut session, "room", &PersonaConfig::default(), Some(&service)).await;

        assert!(matches!(outcome, AvatarOutcome::Degraded(_)));
        assert!(!session.has_avatar());
    }

    #[tokio::test]
    async fn http_provider_without_key_degrades() {
        let voice = Arc::new(VoiceService::new(crate::LiveKitConfig::default()));
        let service = HttpAvatarService::new("http://127.0.0.1:9", "", voice);
        let mut session = session();
        let outcome =
            attach(&mut session, "room", &PersonaConfig::default(), Some(&service)).await;

        assert!(matches!(outcome, AvatarOutcome::Degraded(ref m) if m.contains("API key")));
    }
}
