//! Shared types for the Verdant voice agent.
//!
//! This crate holds the domain vocabulary that both the voice core and the
//! server speak: the plant diagnosis carried in participant metadata, the
//! transport classification of a participant, the noise-cancellation profile
//! chosen for it, and the avatar persona.
//!
//! Nothing here performs I/O. Encoding helpers produce the JSON strings the
//! room transports; decoding lives with the voice core, which must tolerate
//! whatever the room hands it.

use serde::{Deserialize, Serialize};

mod diagnosis;
mod persona;

pub use diagnosis::{
    DiagnosisMetadata, DiagnosticContext, HealthStatus, PlantPrediction, TopKEntry,
};
pub use persona::{PersonaConfig, PersonaError, DEFAULT_AVATAR_ID, DEFAULT_PERSONA_NAME};

/// Transport classification of a remote participant.
///
/// LiveKit distinguishes several participant kinds; the agent only cares
/// whether audio arrives through a telephony gateway or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantKind {
    /// Browser, mobile or any other WebRTC client.
    #[default]
    Generic,
    /// A caller bridged in through a SIP trunk.
    Telephony,
}

impl ParticipantKind {
    /// Returns the string label for this kind.
    pub fn label(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Telephony => "telephony",
        }
    }
}

/// Noise-cancellation profile applied to a participant's inbound audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseProfile {
    /// Tuned for narrow-band telephony audio.
    Telephony,
    /// Tuned for wide-band WebRTC audio.
    Generic,
}

impl NoiseProfile {
    /// Returns the profile identifier understood by the pipeline gateway.
    pub fn id(self) -> &'static str {
        match self {
            Self::Telephony => "bvc-telephony",
            Self::Generic => "bvc",
        }
    }
}

/// Which remote tracks the agent subscribes to once connected to a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subscription {
    /// Subscribe to audio tracks only.
    #[default]
    AudioOnly,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participant_kind_labels() {
        assert_eq!(ParticipantKind::Generic.label(), "generic");
        assert_eq!(ParticipantKind::Telephony.label(), "telephony");
        assert_eq!(ParticipantKind::default(), ParticipantKind::Generic);
    }

    #[test]
    fn noise_profile_ids_are_distinct() {
        assert_ne!(NoiseProfile::Telephony.id(), NoiseProfile::Generic.id());
        assert_eq!(NoiseProfile::Telephony.id(), "bvc-telephony");
    }

    #[test]
    fn subscription_serializes_snake_case() {
        let json = serde_json::to_string(&Subscription::AudioOnly).unwrap();
        assert_eq!(json, "\"audio_only\"");
    }
}
