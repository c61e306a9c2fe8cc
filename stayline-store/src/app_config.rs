use serde::Deserialize;
use std::env;
use stayline_core::pricing::PricingConfig;
use stayline_core::supplier::SandboxSupplierConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    /// Absent: bookings live in process memory only.
    pub database: Option<DatabaseConfig>,
    pub booking: BookingConfig,
    #[serde(default)]
    pub events: EventsConfig,
    pub supplier: SandboxSupplierConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Deadline handed to every request's collaborator calls.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 { 10 }

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

fn default_max_connections() -> u32 { 5 }
fn default_acquire_timeout() -> u64 { 3 }

#[derive(Debug, Deserialize, Clone)]
pub struct BookingConfig {
    /// How far in the past a check-in date may lie at creation time.
    pub check_in_grace_hours: i64,
    pub reference_length: usize,
    pub max_page_size: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EventsConfig {
    #[serde(default = "default_async_timeout")]
    pub async_handler_timeout_secs: u64,
}

fn default_async_timeout() -> u64 { 30 }

impl Default for EventsConfig {
    fn default() -> Self {
        Self { async_handler_timeout_secs: default_async_timeout() }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `STAYLINE_SERVER__PORT=8081` sets `server.port`
            .add_source(config::Environment::with_prefix("STAYLINE").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn from_toml(contents: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(contents, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
