use crate::config::LiveKitConfig;
use crate::error::VoiceError;
use livekit_api::access_token::{AccessToken, VideoGrants};
use livekit_api::services::room::{CreateRoomOptions, RoomClient};
use livekit_protocol::{ParticipantInfo, Room};
use std::time::Duration;

/// Seconds an empty room survives before LiveKit closes it.
const ROOM_EMPTY_TIMEOUT_SECS: u32 = 300;

#[derive(Debug)]
pub struct VoiceService {
    config: LiveKitConfig,
    room_client: RoomClient,
}

impl VoiceService {
    pub fn new(config: LiveKitConfig) -> Self {
        let room_client =
            RoomClient::with_api_key(&config.url, &config.api_key, &config.api_secret);
        Self {
            config,
            room_client,
        }
    }

    pub fn get_url(&self) -> &str {
        &self.config.url
    }

    /// Returns the browser-facing URL. Falls back to the internal URL if no
    /// public URL is configured.
    pub fn get_public_url(&self) -> &str {
        if self.config.public_url.is_empty() {
            &self.config.url
        } else {
            &self.config.public_url
        }
    }

    /// Creates the room, or returns the existing one with the same name.
    pub async fn ensure_room(&self, name: &str) -> Result<Room, VoiceError> {
        let options = CreateRoomOptions {
            empty_timeout: ROOM_EMPTY_TIMEOUT_SECS,
            ..Default::default()
        };

        self.room_client
            .create_room(name, options)
            .await
            .map_err(|e| VoiceError::RoomService(e.to_string()))
    }

    /// Mints a join token. `metadata` becomes the participant's metadata as
    /// seen by every other participant, the agent included.
    pub fn generate_join_token(
        &self,
        room_name: &str,
        participant_identity: &str,
        participant_name: &str,
        metadata: Option<&str>,
    ) -> Result<String, VoiceError> {
        let mut token = AccessToken::with_api_key(&self.config.api_key, &self.config.api_secret)
            .with_identity(participant_identity)
            .with_name(participant_name)
            .with_grants(VideoGrants {
                room_join: true,
                room: room_name.to_string(),
                can_publish: true,
                can_subscribe: true,
                can_publish_data: true,
                ..Default::default()
            })
            .with_ttl(Duration::from_secs(self.config.token_ttl_seconds));

        if let Some(metadata) = metadata.filter(|m| !m.is_empty()) {
            token = token.with_metadata(metadata);
        }

        token.to_jwt().map_err(VoiceError::LiveKit)
    }

    pub async fn list_participants(
        &self,
        room_name: &str,
    ) -> Result<Vec<ParticipantInfo>, VoiceError> {
        self.room_client
            .list_participants(room_name)
            .await
            .map_err(|e| VoiceError::RoomService(e.to_string()))
    }
}
