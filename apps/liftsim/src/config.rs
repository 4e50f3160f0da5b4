//! Optional TOML configuration for both roles
//!
//! Every field has a default, so an empty file (or no file) is valid:
//!
//! ```toml
//! [elevator]
//! floor_min = 0
//! floor_max = 10
//! start_floor = 0
//! transit_ms = 1000
//! dwell_ms = 3000
//!
//! [network]
//! dispatcher_host = "127.0.0.1"
//! dispatcher_port = 4242
//! listen_host = "0.0.0.0"
//! connect_timeout_secs = 10
//! ```

use lift_actors::constants::network;
use lift_protocol::{ActorError, ElevatorConfig};
use lift_runtime::SupervisionConfig;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub elevator: ElevatorConfig,
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Where elevators connect when no address is given
    pub dispatcher_host: String,
    pub dispatcher_port: u16,
    /// Interface the dispatcher binds
    pub listen_host: String,
    pub connect_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            dispatcher_host: network::DEFAULT_DISPATCHER_HOST.to_string(),
            dispatcher_port: network::DEFAULT_DISPATCHER_PORT,
            listen_host: network::DEFAULT_LISTEN_HOST.to_string(),
            connect_timeout_secs: SupervisionConfig::default().connect_timeout_secs,
        }
    }
}

impl NetworkConfig {
    pub fn supervision(&self) -> SupervisionConfig {
        SupervisionConfig {
            connect_timeout_secs: self.connect_timeout_secs,
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_host, self.dispatcher_port)
    }
}

/// Load `path`, or defaults when no file was given
pub fn load(path: Option<&Path>) -> Result<FileConfig, ActorError> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };
    let text = fs::read_to_string(path).map_err(|e| {
        ActorError::Config(format!(
            "Cannot read {}: {}. Check the path passed to --config.",
            path.display(),
            e
        ))
    })?;
    parse(&text).map_err(|e| ActorError::Config(format!("{}: {}", path.display(), e)))
}

pub fn parse(text: &str) -> Result<FileConfig, ActorError> {
    toml::from_str(text).map_err(|e| ActorError::Config(format!("Invalid configuration: {}", e)))
}
