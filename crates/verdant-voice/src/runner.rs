//! Session bootstrap orchestration.
//!
//! One runner invocation drives one room from connection to the agent's
//! first spoken line:
//!
//! ```text
//! Connecting -> WaitingForParticipant -> ContextResolved
//!            -> AvatarAttachAttempted -> PipelineRunning -> GreetingSent
//! ```
//!
//! Only room, pipeline configuration and session host failures abort the
//! run. A missing participant, unusable metadata or a failed avatar degrade
//! the session instead.

use crate::avatar::{self, AvatarOutcome, AvatarService};
use crate::error::VoiceError;
use crate::greeting;
use crate::host::{SessionHandle, SessionHost};
use crate::metadata;
use crate::noise::AudioInputOptions;
use crate::pipeline::{self, PipelineConfig, AGENT_INSTRUCTIONS};
use crate::room::{ParticipantHandle, Room};
use crate::waiter::{ParticipantWaiter, DEFAULT_PARTICIPANT_WAIT};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use verdant_types::{DiagnosticContext, NoiseProfile, PersonaConfig, Subscription};

/// Tracks the agent subscribes to, both at connect and in the media session.
const AGENT_SUBSCRIPTION: Subscription = Subscription::AudioOnly;

/// Default pause between session start and the first greeting, leaving time
/// for the avatar and the pipeline to warm up.
pub const DEFAULT_GREETING_SETTLE: Duration = Duration::from_millis(1500);

/// Bootstrap progress of a single room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BootstrapState {
    Connecting,
    WaitingForParticipant,
    ContextResolved,
    AvatarAttachAttempted,
    PipelineRunning,
    GreetingSent,
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub participant_wait: Duration,
    pub greeting_settle: Duration,
    pub pipeline: PipelineConfig,
    pub persona: PersonaConfig,
    pub instructions: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            participant_wait: DEFAULT_PARTICIPANT_WAIT,
            greeting_settle: DEFAULT_GREETING_SETTLE,
            pipeline: PipelineConfig::default(),
            persona: PersonaConfig::default(),
            instructions: AGENT_INSTRUCTIONS.to_string(),
        }
    }
}

/// What a completed bootstrap looked like.
#[derive(Debug, Clone)]
pub struct BootstrapReport {
    pub room: String,
    pub state: BootstrapState,
    pub participant: Option<ParticipantHandle>,
    pub context: Option<DiagnosticContext>,
    pub avatar: AvatarOutcome,
    /// Profile applied to the first participant, if one joined in time.
    pub noise_profile: Option<NoiseProfile>,
    pub session: SessionHandle,
    pub greeting: String,
}

pub struct SessionRunner {
    config: RunnerConfig,
    host: Arc<dyn SessionHost>,
    avatar: Option<Arc<dyn AvatarService>>,
    input: AudioInputOptions,
}

impl SessionRunner {
    pub fn new(config: RunnerConfig, host: Arc<dyn SessionHost>) -> Self {
        Self {
            config,
            host,
            avatar: None,
            input: AudioInputOptions::default(),
        }
    }

    pub fn with_avatar(mut self, avatar: Arc<dyn AvatarService>) -> Self {
        self.avatar = Some(avatar);
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Checks the pipeline configuration without touching any room.
    pub fn validate(&self) -> Result<(), VoiceError> {
        pipeline::assemble(&self.config.pipeline, &self.config.instructions).map(|_| ())
    }

    /// Bootstraps `room` up to the first greeting.
    pub async fn run(&self, room: &dyn Room) -> Result<BootstrapReport, VoiceError> {
        let name = room.name().to_string();
        let mut state = BootstrapState::Connecting;
        info!(room = %name, ?state, "bootstrapping voice session");

        room.connect(AGENT_SUBSCRIPTION).await?;

        advance(&name, &mut state, BootstrapState::WaitingForParticipant);
        let participant = ParticipantWaiter::new(self.config.participant_wait)
            .wait(room)
            .await;

        let context = participant
            .as_ref()
            .and_then(|p| metadata::decode(p.metadata.as_deref()));
        advance(&name, &mut state, BootstrapState::ContextResolved);
        info!(
            room = %name,
            participant = participant.as_ref().map(|p| p.identity.as_str()).unwrap_or("<none>"),
            has_context = context.is_some(),
            "diagnostic context resolved"
        );

        // The avatar binds to the assembled session's output, so assembly
        // precedes the attach attempt; both still precede host start.
        let mut session = pipeline::assemble(&self.config.pipeline, &self.config.instructions)?;

        let avatar = avatar::attach(
            &mut session,
            &name,
            &self.config.persona,
            self.avatar.as_deref(),
        )
        .await;
        advance(&name, &mut state, BootstrapState::AvatarAttachAttempted);

        let handle = self
            .host
            .start(&session, &name, AGENT_SUBSCRIPTION, &self.input)
            .await?;
        let noise_profile = participant.as_ref().map(|p| self.input.profile_for(p));
        advance(&name, &mut state, BootstrapState::PipelineRunning);
        info!(
            room = %name,
            session_id = %handle.id,
            avatar = avatar.is_attached(),
            noise_profile = noise_profile.map(NoiseProfile::id).unwrap_or("<none>"),
            "pipeline running"
        );

        tokio::time::sleep(self.config.greeting_settle).await;

        let instructions = greeting::compute(context.as_ref());
        self.host.generate_reply(&handle, &instructions).await?;
        advance(&name, &mut state, BootstrapState::GreetingSent);

        Ok(BootstrapReport {
            room: name,
            state,
            participant,
            context,
            avatar,
            noise_profile,
            session: handle,
            greeting: instructions,
        })
    }
}

fn advance(room: &str, state: &mut BootstrapState, next: BootstrapState) {
    debug_assert!(next > *state);
    info!(room, from = ?*state, to = ?next, "bootstrap state changed");
    *state = next;
}
