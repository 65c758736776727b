//! Pipeline assembly.
//!
//! A session is composed from five external capabilities, each named by a
//! reference of the form `provider[/model][:variant]`, for example
//! `assemblyai/universal-streaming:en` or `silero`. Nothing here talks to
//! those providers; the session host resolves the references.

use crate::avatar::AvatarBinding;
use crate::error::VoiceError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// System instructions for the agronomist persona.
pub const AGENT_INSTRUCTIONS: &str = "You are an experienced agricultural expert specializing \
in cocoa crop management, soil health, pest and disease control, and sustainable farming \
practices. You help farmers with practical, science-backed advice. Keep your answers concise, \
clear and actionable. Your replies are read aloud by a text-to-speech system, so write complete, \
flowing sentences and avoid emojis, asterisks, parentheses, lists and other symbols or \
formatting. Speak warmly and respectfully so farmers feel valued and understood.";

/// The five stages every session needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    SpeechToText,
    LanguageModel,
    TextToSpeech,
    VoiceActivityDetector,
    TurnDetector,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Self::SpeechToText => "stt",
            Self::LanguageModel => "llm",
            Self::TextToSpeech => "tts",
            Self::VoiceActivityDetector => "vad",
            Self::TurnDetector => "turn_detection",
        }
    }
}

/// A parsed reference to an external capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityRef {
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

impl CapabilityRef {
    /// Parses a capability reference for `stage`.
    pub fn parse(stage: Stage, raw: &str) -> Result<Self, VoiceError> {
        let malformed = || {
            VoiceError::Config(format!(
                "malformed {} capability reference: {:?}",
                stage.label(),
                raw
            ))
        };

        let (head, variant) = match raw.split_once(':') {
            Some((head, variant)) => (head, Some(variant)),
            None => (raw, None),
        };
        let (provider, model) = match head.split_once('/') {
            Some((provider, model)) => (provider, Some(model)),
            None => (head, None),
        };

        if !valid_segment(provider)
            || !model.map_or(true, valid_segment)
            || !variant.map_or(true, valid_segment)
        {
            return Err(malformed());
        }

        Ok(Self {
            provider: provider.to_string(),
            model: model.map(str::to_string),
            variant: variant.map(str::to_string),
        })
    }
}

impl fmt::Display for CapabilityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.provider)?;
        if let Some(model) = &self.model {
            write!(f, "/{}", model)?;
        }
        if let Some(variant) = &self.variant {
            write!(f, ":{}", variant)?;
        }
        Ok(())
    }
}

/// Capability references as configured. Every entry is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub stt: Option<String>,
    pub llm: Option<String>,
    pub tts: Option<String>,
    pub vad: Option<String>,
    pub turn_detection: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stt: Some("assemblyai/universal-streaming:en".to_string()),
            llm: Some("openai/gpt-4.1-mini".to_string()),
            tts: Some("cartesia/sonic-3:9626c31c-bec5-4cca-baa8-f8ba9e84c8bc".to_string()),
            vad: Some("silero".to_string()),
            turn_detection: Some("livekit/multilingual".to_string()),
        }
    }
}

/// The resolved capability set of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineCapabilities {
    pub stt: CapabilityRef,
    pub llm: CapabilityRef,
    pub tts: CapabilityRef,
    pub vad: CapabilityRef,
    pub turn_detection: CapabilityRef,
}

/// Where the agent's synthesized speech goes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AudioOutput {
    /// Published straight into the room as the agent's audio track.
    #[default]
    Room,
    /// Routed through an avatar, which publishes synced audio and video.
    Avatar(AvatarBinding),
}

/// A composed pipeline, not yet started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub capabilities: PipelineCapabilities,
    pub instructions: String,
    pub output: AudioOutput,
}

impl Session {
    /// Routes the session's audio output through an avatar.
    pub fn bind_avatar(&mut self, binding: AvatarBinding) {
        self.output = AudioOutput::Avatar(binding);
    }

    pub fn has_avatar(&self) -> bool {
        matches!(self.output, AudioOutput::Avatar(_))
    }
}

fn require(stage: Stage, value: Option<&str>) -> Result<CapabilityRef, VoiceError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => CapabilityRef::parse(stage, raw),
        None => Err(VoiceError::Config(format!(
            "missing {} capability reference",
            stage.label()
        ))),
    }
}

/// Composes a session from configured capabilities.
///
/// Fails on the first missing or malformed reference.
pub fn assemble(config: &PipelineConfig, instructions: &str) -> Result<Session, VoiceError> {
    let capabilities = PipelineCapabilities {
        stt: require(Stage::SpeechToText, config.stt.as_deref())?,
        llm: require(Stage::LanguageModel, config.llm.as_deref())?,
        tts: require(Stage::TextToSpeech, config.tts.as_deref())?,
        vad: require(Stage::VoiceActivityDetector, config.vad.as_deref())?,
        turn_detection: require(Stage::TurnDetector, config.turn_detection.as_deref())?,
    };

    Ok(Session {
        capabilities,
        instructions: instructions.to_string(),
        output: AudioOutput::Room,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_assembles() {
        let session = assemble(&PipelineConfig::default(), AGENT_INSTRUCTIONS).unwrap();
        let caps = &session.capabilities;

        assert_eq!(caps.stt.provider, "assemblyai");
        assert_eq!(caps.stt.model.as_deref(), Some("universal-streaming"));
        assert_eq!(caps.stt.variant.as_deref(), Some("en"));
        assert_eq!(caps.llm.to_string(), "openai/gpt-4.1-mini");
        assert_eq!(caps.vad.provider, "silero");
        assert_eq!(caps.vad.model, None);
        assert_eq!(session.output, AudioOutput::Room);
        assert!(!session.has_avatar());
    }

    #[test]
    fn missing_capability_fails_fast() {
        let config = PipelineConfig {
            tts: None,
            ..PipelineConfig::default()
        };
        let err = assemble(&config, AGENT_INSTRUCTIONS).unwrap_err();
        assert!(matches!(err, VoiceError::Config(ref msg) if msg.contains("tts")));

        let config = PipelineConfig {
            vad: Some("   ".to_string()),
            ..PipelineConfig::default()
        };
        assert!(matches!(
            assemble(&config, AGENT_INSTRUCTIONS),
            Err(VoiceError::Config(_))
        ));
    }

    #[test]
    fn malformed_references_are_rejected() {
        for raw in [
            "openai/",
            "/gpt-4",
            "openai/gpt-4:",
            "open ai/gpt",
            "a/b/c",
            "deepgram:nova:3",
            "provider/model?x=1",
        ] {
            assert!(
                CapabilityRef::parse(Stage::LanguageModel, raw).is_err(),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn display_round_trips_reference() {
        for raw in ["silero", "openai/gpt-4.1-mini", "assemblyai/universal-streaming:en"] {
            let parsed = CapabilityRef::parse(Stage::SpeechToText, raw).unwrap();
            assert_eq!(parsed.to_string(), raw);
        }
    }

    #[test]
    fn binding_an_avatar_changes_output() {
        let mut session = assemble(&PipelineConfig::default(), "be brief").unwrap();
        session.bind_avatar(AvatarBinding {
            session_id: "av-1".to_string(),
            participant_identity: "avatar-cara".to_string(),
        });
        assert!(session.has_avatar());
        assert_eq!(session.instructions, "be brief");
    }
}
