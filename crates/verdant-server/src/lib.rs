//! Verdant agent server.
//!
//! A single [`AgentServer`] owns the LiveKit service, the session runner and
//! the HTTP surface. Its lifecycle is explicit: construct it from
//! configuration, register the session handler, run it until the shutdown
//! signal fires, and let it abort whatever bootstraps are still in flight.

pub mod api;
pub mod api_plant;
pub mod classifier;
pub mod config;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Router,
};
use classifier::PlantClassifier;
use config::Config;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use verdant_voice::{
    HttpAvatarService, HttpSessionHost, LiveKitRoom, Room, SessionRunner, VoiceError,
    VoiceService,
};

/// Errors that stop the server from starting or serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid agent configuration: {0}")]
    Voice(#[from] VoiceError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Spawns one bootstrap task per room.
#[derive(Clone)]
pub struct Dispatcher {
    voice: Arc<VoiceService>,
    agent_identity: String,
    runner: Option<Arc<SessionRunner>>,
    sessions: Arc<Mutex<JoinSet<()>>>,
}

impl Dispatcher {
    /// Starts bootstrapping `room_name`. Returns `false` when no session
    /// handler is registered.
    pub fn dispatch(&self, room_name: &str) -> bool {
        let Some(runner) = self.runner.clone() else {
            debug!(room = room_name, "no session handler registered, not dispatching");
            return false;
        };

        let room = LiveKitRoom::new(self.voice.clone(), room_name, &self.agent_identity);

        let mut sessions = self
            .sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        while sessions.try_join_next().is_some() {}

        sessions.spawn(async move {
            match runner.run(&room).await {
                Ok(report) => info!(
                    room = %report.room,
                    state = ?report.state,
                    avatar = ?report.avatar,
                    has_context = report.context.is_some(),
                    "voice session bootstrapped"
                ),
                Err(e) => error!(room = room.name(), "voice session bootstrap failed: {}", e),
            }
        });
        true
    }

    /// Number of bootstraps that have not been reaped yet.
    pub fn in_flight(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn abort_all(&self) {
        let mut sessions = self
            .sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !sessions.is_empty() {
            info!(count = sessions.len(), "aborting in-flight voice bootstraps");
        }
        sessions.abort_all();
    }
}

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub voice_service: Arc<VoiceService>,
    pub agent_name: String,
    pub dispatcher: Dispatcher,
    pub classifier: PlantClassifier,
}

pub struct AgentServer {
    config: Config,
    voice: Arc<VoiceService>,
    classifier: PlantClassifier,
    agent_identity: String,
    runner: Option<Arc<SessionRunner>>,
    sessions: Arc<Mutex<JoinSet<()>>>,
}

impl AgentServer {
    /// Initializes the server. Fails if the pipeline configuration is unusable.
    pub fn new(config: Config) -> Result<Self, ServerError> {
        verdant_voice::assemble(&config.pipeline, verdant_voice::AGENT_INSTRUCTIONS)?;

        let voice = Arc::new(VoiceService::new(config.livekit.clone()));
        let classifier = PlantClassifier::new(
            &config.classifier.base_url,
            Duration::from_secs(config.classifier.timeout_secs),
        );
        let agent_identity = format!("agent-{}", config.agent.agent_name);

        Ok(Self {
            config,
            voice,
            classifier,
            agent_identity,
            runner: None,
            sessions: Arc::new(Mutex::new(JoinSet::new())),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Builds the runner described by the configuration: the HTTP pipeline
    /// gateway as session host, plus the avatar provider when enabled and
    /// keyed.
    pub fn session_runner_from_config(&self) -> SessionRunner {
        let host = HttpSessionHost::new(
            &self.config.agent.gateway_url,
            &self.agent_identity,
            &self.config.agent.agent_name,
            self.voice.clone(),
        );
        let runner = SessionRunner::new(self.config.runner_config(), Arc::new(host));

        let avatar = &self.config.avatar;
        if !avatar.enabled {
            info!("avatar disabled, sessions run audio-only");
            runner
        } else if avatar.api_key.is_empty() {
            warn!("avatar enabled but no API key configured, sessions run audio-only");
            runner
        } else {
            runner.with_avatar(Arc::new(HttpAvatarService::new(
                &avatar.api_url,
                &avatar.api_key,
                self.voice.clone(),
            )))
        }
    }

    /// Registers the handler run for every dispatched room.
    pub fn register_session_handler(&mut self, runner: SessionRunner) {
        info!(agent = %self.agent_identity, "session handler registered");
        self.runner = Some(Arc::new(runner));
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher {
            voice: self.voice.clone(),
            agent_identity: self.agent_identity.clone(),
            runner: self.runner.clone(),
            sessions: self.sessions.clone(),
        }
    }

    /// Builds the HTTP router.
    pub fn router(&self) -> Router {
        let state = Arc::new(AppState {
            voice_service: self.voice.clone(),
            agent_name: self.config.agent.agent_name.clone(),
            dispatcher: self.dispatcher(),
            classifier: self.classifier.clone(),
        });

        Router::new()
            .route("/health", get(api::health))
            .route(
                "/api/connection-details",
                post(api::connection_details_handler),
            )
            .route(
                "/api/plant/predict",
                post(api_plant::predict_handler)
                    .layer(DefaultBodyLimit::max(api_plant::MAX_UPLOAD_SIZE + 64 * 1024)),
            )
            .layer(Extension(state))
            .layer(TraceLayer::new_for_http())
    }

    /// Serves until `shutdown` resolves, then aborts in-flight bootstraps.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.runner.is_none() {
            warn!("no session handler registered, rooms will not get an agent");
        }

        let addr = listener.local_addr()?;
        info!(%addr, agent = %self.agent_identity, "starting verdant agent server");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        self.shutdown();
        Ok(())
    }

    fn shutdown(&self) {
        self.dispatcher().abort_all();
        info!("verdant agent server shut down");
    }
}
