use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PolicyConfig {
    #[serde(default = "default_max_seats")]
    pub max_seats_per_request: u32,
    /// How long RELEASED allocation records keep answering idempotent
    /// retries before the sweeper drops them.
    #[serde(default = "default_retention_seconds")]
    pub allocation_retention_seconds: u64,
    #[serde(default = "default_sweep_seconds")]
    pub sweep_interval_seconds: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SeedConfig {
    #[serde(default)]
    pub demo_data: bool,
}

fn default_port() -> u16 {
    5001
}

fn default_max_seats() -> u32 {
    10
}

fn default_retention_seconds() -> u64 {
    86_400
}

fn default_sweep_seconds() -> u64 {
    300
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: default_port() }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_seats_per_request: default_max_seats(),
            allocation_retention_seconds: default_retention_seconds(),
            sweep_interval_seconds: default_sweep_seconds(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in.
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("VIARO_SCHEDULE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
