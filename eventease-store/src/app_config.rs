use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub kafka: KafkaConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Unset means the in-memory store
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    /// Unset means changes are only logged
    pub brokers: Option<String>,
    #[serde(default = "default_topic")]
    pub topic: String,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: None,
            topic: default_topic(),
        }
    }
}

fn default_topic() -> String { "inquiry.changes".to_string() }

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LifecycleConfig {
    #[serde(default = "default_currencies")]
    pub supported_currencies: Vec<String>,
    /// 0 disables the response window
    #[serde(default = "default_response_window_hours")]
    pub response_window_hours: u64,
    /// Pushes a live viewer may fall behind before it is dropped
    #[serde(default = "default_live_buffer")]
    pub live_buffer: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            supported_currencies: default_currencies(),
            response_window_hours: default_response_window_hours(),
            live_buffer: default_live_buffer(),
        }
    }
}

fn default_currencies() -> Vec<String> {
    vec!["GBP".to_string(), "EUR".to_string(), "USD".to_string()]
}

fn default_response_window_hours() -> u64 { 24 }

fn default_live_buffer() -> usize { 256 }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // optional per-environment overrides, e.g. config/production.toml
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. EVENTEASE__DATABASE__URL=postgres://...
            .add_source(config::Environment::with_prefix("EVENTEASE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
