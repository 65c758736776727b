//! Avatar persona definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a persona is unusable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PersonaError {
    #[error("persona name is empty")]
    EmptyName,
    #[error("avatar id is empty")]
    EmptyAvatarId,
}

/// Persona used when none is configured.
pub const DEFAULT_PERSONA_NAME: &str = "Cara";
/// Avatar rendered for [`DEFAULT_PERSONA_NAME`].
pub const DEFAULT_AVATAR_ID: &str = "960f614f-ea88-47c3-9883-f02094f70874";

/// A visual avatar persona.
///
/// Maps a display name to the avatar provider's identifier for the rendered
/// face and voice-synced animation. Missing keys fall back to the default
/// persona.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    /// Display name of the persona.
    pub name: String,
    /// Provider-side avatar identifier.
    #[serde(rename = "avatarId")]
    pub avatar_id: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_PERSONA_NAME.to_string(),
            avatar_id: DEFAULT_AVATAR_ID.to_string(),
        }
    }
}

impl PersonaConfig {
    pub fn new(name: impl Into<String>, avatar_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            avatar_id: avatar_id.into(),
        }
    }

    /// Rejects personas the provider would refuse anyway.
    pub fn validate(&self) -> Result<(), PersonaError> {
        if self.name.trim().is_empty() {
            return Err(PersonaError::EmptyName);
        }
        if self.avatar_id.trim().is_empty() {
            return Err(PersonaError::EmptyAvatarId);
        }
        Ok(())
    }
}
