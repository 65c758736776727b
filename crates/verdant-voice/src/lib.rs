//! Voice session bootstrap for the Verdant agent.
//!
//! Integrates with LiveKit for room management and join tokens, decides the
//! agent's first greeting from the diagnosis a participant carries in its
//! metadata, pairs an optional avatar, and starts the speech pipeline on an
//! external session host.
//!
//! The pipeline stages (speech-to-text, language model, text-to-speech,
//! voice activity and turn detection) and the avatar renderer are external
//! services. This crate composes references to them and never processes
//! audio itself.

pub mod avatar;
pub mod config;
pub mod error;
pub mod greeting;
pub mod host;
pub mod metadata;
pub mod noise;
pub mod pipeline;
pub mod room;
pub mod runner;
pub mod service;
pub mod waiter;

pub use avatar::{AvatarBinding, AvatarOutcome, AvatarService, HttpAvatarService};
pub use config::{LiveKitConfig, DEV_LIVEKIT_API_KEY, DEV_LIVEKIT_API_SECRET, DEV_LIVEKIT_URL};
pub use error::VoiceError;
pub use host::{HttpSessionHost, SessionHandle, SessionHost};
pub use noise::{select_profile, AudioInputOptions};
pub use pipeline::{assemble, CapabilityRef, PipelineConfig, Session, AGENT_INSTRUCTIONS};
pub use room::{LiveKitRoom, ParticipantHandle, Room};
pub use runner::{BootstrapReport, BootstrapState, RunnerConfig, SessionRunner};
pub use service::VoiceService;
pub use waiter::ParticipantWaiter;
