//! Configuration management for the tool mount server.
//!
//! This module provides a centralized configuration structure that can be
//! populated from environment variables, a `.env` file, or defaults.

use super::transport::TransportConfig;
use crate::domains::tools::dispatcher::DEFAULT_MAX_CALL_DEPTH;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Main configuration structure for the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Tool discovery and execution settings.
    pub mounting: MountingConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Settings for the discovery pass and for mounted tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountingConfig {
    /// Root directory searched for `TOOL.yaml` / `TOOL.yml` files.
    pub tools_dir: PathBuf,

    /// Mount specs found below `templates` directories too.
    pub include_templates: bool,

    /// Maximum nesting of tool-to-tool calls.
    pub max_call_depth: usize,

    /// Kill command tools that run longer than this. Unset means no limit.
    pub command_timeout_secs: Option<u64>,
}

impl MountingConfig {
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl Default for MountingConfig {
    fn default() -> Self {
        Self {
            tools_dir: PathBuf::from("tools"),
            include_templates: false,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            command_timeout_secs: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,

    /// Whether to include timestamps in log output.
    pub with_timestamps: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "tool-mount-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            mounting: MountingConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                with_timestamps: true,
            },
            transport: TransportConfig::default(),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables are expected to be prefixed with `MCP_`.
    /// For example: `MCP_SERVER_NAME`, `MCP_TOOLS_DIR`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        config.transport = TransportConfig::from_env();
        config.mounting = MountingConfig::from_env();

        config
    }
}

impl MountingConfig {
    /// Load mounting settings from `MCP_TOOLS_DIR`, `MCP_INCLUDE_TEMPLATES`,
    /// `MCP_MAX_CALL_DEPTH` and `MCP_COMMAND_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let mut mounting = Self::default();

        if let Ok(dir) = std::env::var("MCP_TOOLS_DIR") {
            if !dir.trim().is_empty() {
                mounting.tools_dir = PathBuf::from(dir.trim());
            }
        }
        info!("Tools directory: {}", mounting.tools_dir.display());

        if let Ok(value) = std::env::var("MCP_INCLUDE_TEMPLATES") {
            match parse_bool(&value) {
                Some(flag) => mounting.include_templates = flag,
                None => warn!("Invalid MCP_INCLUDE_TEMPLATES value: {}", value),
            }
        }

        if let Ok(value) = std::env::var("MCP_MAX_CALL_DEPTH") {
            match value.trim().parse::<usize>() {
                Ok(depth) if depth > 0 => mounting.max_call_depth = depth,
                _ => warn!(
                    "Invalid MCP_MAX_CALL_DEPTH value: {}, using {}",
                    value, mounting.max_call_depth
                ),
            }
        }

        if let Ok(value) = std::env::var("MCP_COMMAND_TIMEOUT_SECS") {
            match value.trim().parse::<u64>() {
                Ok(secs) => {
                    mounting.command_timeout_secs = Some(secs);
                    info!("Command timeout: {}s", secs);
                }
                Err(_) => warn!("Invalid MCP_COMMAND_TIMEOUT_SECS value: {}", value),
            }
        }

        mounting
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure env var tests run serially
    static ENV_TEST_LOCK: Mutex<()> = Mutex::new(());

    const MOUNT_VARS: [&str; 4] = [
        "MCP_TOOLS_DIR",
        "MCP_INCLUDE_TEMPLATES",
        "MCP_MAX_CALL_DEPTH",
        "MCP_COMMAND_TIMEOUT_SECS",
    ];

    fn clear_mount_vars() {
        for var in MOUNT_VARS {
            unsafe {
                std::env::remove_var(var);
            }
        }
    }

    #[test]
    fn test_mounting_defaults() {
        let mounting = MountingConfig::default();
        assert_eq!(mounting.tools_dir, PathBuf::from("tools"));
        assert!(!mounting.include_templates);
        assert_eq!(mounting.max_call_depth, DEFAULT_MAX_CALL_DEPTH);
        assert_eq!(mounting.command_timeout(), None);
    }

    #[test]
    fn test_mounting_from_env() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        clear_mount_vars();
        unsafe {
            std::env::set_var("MCP_TOOLS_DIR", "/srv/tools");
            std::env::set_var("MCP_INCLUDE_TEMPLATES", "true");
            std::env::set_var("MCP_MAX_CALL_DEPTH", "4");
            std::env::set_var("MCP_COMMAND_TIMEOUT_SECS", "30");
        }
        let mounting = MountingConfig::from_env();
        clear_mount_vars();

        assert_eq!(mounting.tools_dir, PathBuf::from("/srv/tools"));
        assert!(mounting.include_templates);
        assert_eq!(mounting.max_call_depth, 4);
        assert_eq!(mounting.command_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        clear_mount_vars();
        unsafe {
            std::env::set_var("MCP_INCLUDE_TEMPLATES", "maybe");
            std::env::set_var("MCP_MAX_CALL_DEPTH", "0");
            std::env::set_var("MCP_COMMAND_TIMEOUT_SECS", "soon");
        }
        let mounting = MountingConfig::from_env();
        clear_mount_vars();

        assert!(!mounting.include_templates);
        assert_eq!(mounting.max_call_depth, DEFAULT_MAX_CALL_DEPTH);
        assert_eq!(mounting.command_timeout_secs, None);
    }

    #[test]
    fn test_zero_timeout_means_unlimited() {
        let mounting = MountingConfig {
            command_timeout_secs: Some(0),
            ..MountingConfig::default()
        };
        assert_eq!(mounting.command_timeout(), None);
    }

    #[test]
    fn test_config_default_server_name() {
        let config = Config::default();
        assert_eq!(config.server.name, "tool-mount-server");
        assert_eq!(config.mounting.tools_dir, PathBuf::from("tools"));
    }
}
