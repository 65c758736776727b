//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;
use verdant_types::{PersonaConfig, DEFAULT_AVATAR_ID, DEFAULT_PERSONA_NAME};
use verdant_voice::{LiveKitConfig, PipelineConfig, RunnerConfig, AGENT_INSTRUCTIONS};

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// LiveKit deployment and credentials.
    #[serde(default)]
    pub livekit: LiveKitConfig,

    /// Capability references for the speech pipeline.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Avatar provider settings.
    #[serde(default)]
    pub avatar: AvatarConfig,

    /// Agent behaviour.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Plant photo classifier.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Avatar provider configuration.
#[derive(Clone, Deserialize)]
pub struct AvatarConfig {
    /// Whether to attempt attaching an avatar at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL of the avatar provider API.
    #[serde(default = "default_avatar_api_url")]
    pub api_url: String,

    /// API key for the avatar provider.
    #[serde(default)]
    pub api_key: String,

    /// Display name of the persona the avatar renders.
    #[serde(default = "default_persona_name")]
    pub persona_name: String,

    /// Provider-side identifier of the rendered avatar.
    #[serde(default = "default_avatar_id")]
    pub avatar_id: String,
}

/// Agent behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Name clients use to request this agent in their room configuration.
    #[serde(default = "default_agent_name")]
    pub agent_name: String,

    /// Seconds to wait for the first participant before greeting anyway.
    #[serde(default = "default_participant_wait_secs")]
    pub participant_wait_secs: u64,

    /// Milliseconds between pipeline start and the first greeting.
    #[serde(default = "default_greeting_settle_ms")]
    pub greeting_settle_ms: u64,

    /// Base URL of the pipeline gateway that runs sessions.
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Overrides the built-in agronomist instructions.
    #[serde(default)]
    pub instructions: Option<String>,
}

/// Plant photo classifier settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Base URL of the classifier; photos are posted to `{base_url}/predict`.
    #[serde(default = "default_classifier_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_classifier_timeout_secs")]
    pub timeout_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "verdant_voice=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_true() -> bool {
    true
}

fn default_avatar_api_url() -> String {
    "https://api.anam.ai".to_string()
}

fn default_persona_name() -> String {
    DEFAULT_PERSONA_NAME.to_string()
}

fn default_avatar_id() -> String {
    DEFAULT_AVATAR_ID.to_string()
}

fn default_agent_name() -> String {
    "verdant-agent".to_string()
}

fn default_participant_wait_secs() -> u64 {
    30
}

fn default_greeting_settle_ms() -> u64 {
    1500
}

fn default_gateway_url() -> String {
    "http://127.0.0.1:8089".to_string()
}

fn default_classifier_base_url() -> String {
    "https://codoc-backend0.onrender.com".to_string()
}

fn default_classifier_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: default_avatar_api_url(),
            api_key: String::new(),
            persona_name: default_persona_name(),
            avatar_id: default_avatar_id(),
        }
    }
}

impl AvatarConfig {
    /// The configured persona.
    pub fn persona(&self) -> PersonaConfig {
        PersonaConfig::new(&self.persona_name, &self.avatar_id)
    }
}

impl fmt::Debug for AvatarConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvatarConfig")
            .field("enabled", &self.enabled)
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .field("persona_name", &self.persona_name)
            .field("avatar_id", &self.avatar_id)
            .finish()
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            agent_name: default_agent_name(),
            participant_wait_secs: default_participant_wait_secs(),
            greeting_settle_ms: default_greeting_settle_ms(),
            gateway_url: default_gateway_url(),
            instructions: None,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: default_classifier_base_url(),
            timeout_secs: default_classifier_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Builds the session runner settings from this configuration.
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            participant_wait: Duration::from_secs(self.agent.participant_wait_secs),
            greeting_settle: Duration::from_millis(self.agent.greeting_settle_ms),
            pipeline: self.pipeline.clone(),
            persona: self.avatar.persona(),
            instructions: self
                .agent
                .instructions
                .clone()
                .unwrap_or_else(|| AGENT_INSTRUCTIONS.to_string()),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `VERDANT_HOST` overrides `server.host`
/// - `VERDANT_PORT` overrides `server.port`
/// - `LIVEKIT_URL`, `LIVEKIT_API_KEY`, `LIVEKIT_API_SECRET` override `livekit.*`
/// - `VERDANT_GATEWAY_URL` overrides `agent.gateway_url`
/// - `ANAM_API_KEY` overrides `avatar.api_key`
/// - `PLANT_API_BASE_URL` overrides `classifier.base_url`
/// - `VERDANT_LOG_LEVEL` overrides `logging.level`
/// - `VERDANT_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(host) = var("VERDANT_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = var("VERDANT_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(url) = var("LIVEKIT_URL") {
        config.livekit.url = url;
    }
    if let Some(key) = var("LIVEKIT_API_KEY") {
        config.livekit.api_key = key;
    }
    if let Some(secret) = var("LIVEKIT_API_SECRET") {
        config.livekit.api_secret = secret;
    }
    if let Some(url) = var("VERDANT_GATEWAY_URL") {
        config.agent.gateway_url = url;
    }
    if let Some(key) = var("ANAM_API_KEY") {
        config.avatar.api_key = key;
    }
    if let Some(url) = var("PLANT_API_BASE_URL") {
        config.classifier.base_url = url;
    }
    if let Some(level) = var("VERDANT_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("VERDANT_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
