//! The room collaborator.
//!
//! The bootstrap only needs two things from a room: a way to connect with a
//! subscription mode, and a way to learn about the first remote participant.
//! `LiveKitRoom` provides both through the LiveKit room service API; media
//! itself is carried by the session host.

use crate::error::VoiceError;
use crate::service::VoiceService;
use async_trait::async_trait;
use livekit_protocol::{participant_info, ParticipantInfo};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use verdant_types::{ParticipantKind, Subscription};

/// Interval between participant list polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A remote participant as seen by the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantHandle {
    pub identity: String,
    pub kind: ParticipantKind,
    /// Raw metadata string; `None` when the participant carries none.
    pub metadata: Option<String>,
}

impl ParticipantHandle {
    pub fn new(
        identity: impl Into<String>,
        kind: ParticipantKind,
        metadata: Option<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            kind,
            metadata,
        }
    }
}

impl From<&ParticipantInfo> for ParticipantHandle {
    fn from(info: &ParticipantInfo) -> Self {
        let kind = if info.kind == participant_info::Kind::Sip as i32 {
            ParticipantKind::Telephony
        } else {
            ParticipantKind::Generic
        };
        let metadata = if info.metadata.is_empty() {
            None
        } else {
            Some(info.metadata.clone())
        };
        Self {
            identity: info.identity.clone(),
            kind,
            metadata,
        }
    }
}

#[async_trait]
pub trait Room: Send + Sync {
    fn name(&self) -> &str;

    /// Joins the room. `subscription` is recorded for the agent's media
    /// participant; the session host applies it when it joins the media path.
    async fn connect(&self, subscription: Subscription) -> Result<(), VoiceError>;

    /// Resolves once a remote participant has been admitted.
    ///
    /// Implementations may wait indefinitely; callers bound the wait.
    async fn next_participant(&self) -> Result<ParticipantHandle, VoiceError>;
}

/// A LiveKit room reached through the server-side room service.
#[derive(Debug)]
pub struct LiveKitRoom {
    service: Arc<VoiceService>,
    name: String,
    agent_identity: String,
    poll_interval: Duration,
}

impl LiveKitRoom {
    pub fn new(
        service: Arc<VoiceService>,
        name: impl Into<String>,
        agent_identity: impl Into<String>,
    ) -> Self {
        Self {
            service,
            name: name.into(),
            agent_identity: agent_identity.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn is_remote(&self, info: &ParticipantInfo) -> bool {
        info.identity != self.agent_identity
            && info.kind != participant_info::Kind::Agent as i32
            && info.state != participant_info::State::Disconnected as i32
    }
}

#[async_trait]
impl Room for LiveKitRoom {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self, subscription: Subscription) -> Result<(), VoiceError> {
        let room = self.service.ensure_room(&self.name).await?;
        info!(
            room = %room.name,
            sid = %room.sid,
            agent = %self.agent_identity,
            ?subscription,
            "agent connected to room"
        );
        Ok(())
    }

    async fn next_participant(&self) -> Result<ParticipantHandle, VoiceError> {
        loop {
            match self.service.list_participants(&self.name).await {
                Ok(participants) => {
                    if let Some(info) = participants.iter().find(|p| self.is_remote(p)) {
                        let handle = ParticipantHandle::from(info);
                        debug!(
                            room = %self.name,
                            identity = %handle.identity,
                            kind = handle.kind.label(),
                            "participant admitted"
                        );
                        return Ok(handle);
                    }
                }
                Err(e) => {
                    warn!(room = %self.name, "failed to list participants, retrying: {}", e);
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(identity: &str, kind: participant_info::Kind, metadata: &str) -> ParticipantInfo {
        ParticipantInfo {
            identity: identity.to_string(),
            kind: kind as i32,
            metadata: metadata.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn sip_participant_is_telephony() {
        let handle = ParticipantHandle::from(&info("caller", participant_info::Kind::Sip, ""));
        assert_eq!(handle.kind, ParticipantKind::Telephony);
        assert_eq!(handle.metadata, None);
    }

    #[test]
    fn standard_participant_keeps_metadata() {
        let handle = ParticipantHandle::from(&info(
            "farmer",
            participant_info::Kind::Standard,
            r#"{"className":"Black Pod"}"#,
        ));
        assert_eq!(handle.kind, ParticipantKind::Generic);
        assert_eq!(handle.metadata.as_deref(), Some(r#"{"className":"Black Pod"}"#));
    }

    #[test]
    fn agents_and_self_are_not_remote() {
        let service = Arc::new(VoiceService::new(crate::LiveKitConfig::default()));
        let room = LiveKitRoom::new(service, "room", "verdant-agent");

        assert!(!room.is_remote(&info("verdant-agent", participant_info::Kind::Standard, "")));
        assert!(!room.is_remote(&info("other-agent", participant_info::Kind::Agent, "")));
        assert!(room.is_remote(&info("farmer", participant_info::Kind::Standard, "")));
    }
}
