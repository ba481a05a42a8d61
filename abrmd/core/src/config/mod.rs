//! TOML Configuration File Support
//!
//! Loads the broker's TCTI settings from `~/.config/abrmd/abrmd.toml`, the
//! environment and the command line.
//!
//! # Configuration Priority
//!
//! Values are applied with the following priority (highest first):
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Built-in defaults
//!
//! # Example Configuration
//!
//! ```toml
//! [tcti]
//! kind = "dynamic"
//! file_name = "libtss2-tcti-mssim.so.0"
//! conf_str = "host=localhost,port=2321"
//! ```
//!
//! # Environment Variables
//!
//! - `ABRMD_TCTI`: kind name (`none`, `device`, `socket`, `dynamic`)
//! - `ABRMD_TCTI_DEVICE`: device node
//! - `ABRMD_TCTI_SOCKET_ADDRESS`: simulator host
//! - `ABRMD_TCTI_SOCKET_PORT`: simulator port
//! - `ABRMD_TCTI_FILE_NAME`: TCTI library name
//! - `ABRMD_TCTI_CONF_STR`: TCTI configuration string

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transport::{
    kind_from_name, OptionError, TransportConfig, TransportFactory, TransportField,
};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// A command-line override was rejected
    #[error(transparent)]
    Option(#[from] OptionError),
}

/// Tracks where the effective configuration last came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[tcti]` section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TctiToml {
    /// Kind name
    pub kind: Option<String>,
    /// Device node
    pub device: Option<String>,
    /// Simulator host
    pub socket_address: Option<String>,
    /// Simulator port
    pub socket_port: Option<u16>,
    /// TCTI library name
    pub file_name: Option<String>,
    /// TCTI configuration string
    pub conf_str: Option<String>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerToml {
    /// TCTI configuration section
    pub tcti: TctiToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved broker configuration
#[derive(Clone, Debug)]
pub struct BrokerConfig {
    /// Downstream TCTI configuration
    pub transport: TransportConfig,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    source: ConfigSource,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::with_builtin_defaults(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl BrokerConfig {
    /// Configuration holding only built-in defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest-priority source that contributed a value
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// A factory seeded with the resolved transport configuration
    #[must_use]
    pub fn transport_factory(&self) -> TransportFactory {
        TransportFactory::with_config(self.transport.clone())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/abrmd/abrmd.toml` or
/// `~/.config/abrmd/abrmd.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("abrmd").join("abrmd.toml"))
}

/// Load configuration from the default path and the environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if a
/// kind name in the file or environment is not compiled in.
pub fn load_config() -> Result<BrokerConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path and the environment
///
/// A missing file is not an error; defaults are used.
///
/// # Errors
///
/// Same as [`load_config`].
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<BrokerConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration reading environment variables through `env`
///
/// # Errors
///
/// Same as [`load_config`].
pub fn load_config_with_env(
    path: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<BrokerConfig, ConfigError> {
    let mut config = BrokerConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: BrokerToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config)?;
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env)?;

    Ok(config)
}

fn apply_toml_config(config: &mut BrokerConfig, toml: &BrokerToml) -> Result<(), ConfigError> {
    let tcti = &toml.tcti;
    let transport = &mut config.transport;

    if let Some(ref name) = tcti.kind {
        transport.kind = kind_from_name(name)
            .map_err(|e| ConfigError::ValidationError(format!("[tcti] kind: {e}")))?;
    }
    if let Some(ref device) = tcti.device {
        transport.set(TransportField::DevicePath(device.clone()));
    }
    if let Some(ref address) = tcti.socket_address {
        transport.set(TransportField::SocketAddress(address.clone()));
    }
    if let Some(port) = tcti.socket_port {
        transport.set(TransportField::SocketPort(port));
    }
    if let Some(ref name) = tcti.file_name {
        transport.set(TransportField::LibraryName(name.clone()));
    }
    if let Some(ref conf) = tcti.conf_str {
        transport.set(TransportField::LibraryConf(conf.clone()));
    }
    Ok(())
}

fn apply_env_config(
    config: &mut BrokerConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    let transport = &mut config.transport;
    let mut touched = false;

    if let Some(name) = env("ABRMD_TCTI") {
        transport.kind = kind_from_name(&name)
            .map_err(|e| ConfigError::ValidationError(format!("ABRMD_TCTI: {e}")))?;
        touched = true;
    }
    if let Some(device) = env("ABRMD_TCTI_DEVICE") {
        transport.set(TransportField::DevicePath(device));
        touched = true;
    }
    if let Some(address) = env("ABRMD_TCTI_SOCKET_ADDRESS") {
        transport.set(TransportField::SocketAddress(address));
        touched = true;
    }
    if let Some(port) = env("ABRMD_TCTI_SOCKET_PORT") {
        match port.parse::<u16>() {
            Ok(port) => {
                transport.set(TransportField::SocketPort(port));
                touched = true;
            }
            Err(e) => tracing::warn!(value = %port, error = %e, "Ignoring ABRMD_TCTI_SOCKET_PORT"),
        }
    }
    if let Some(name) = env("ABRMD_TCTI_FILE_NAME") {
        transport.set(TransportField::LibraryName(name));
        touched = true;
    }
    if let Some(conf) = env("ABRMD_TCTI_CONF_STR") {
        transport.set(TransportField::LibraryConf(conf));
        touched = true;
    }

    if touched {
        config.source = ConfigSource::Env;
    }
    Ok(())
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Command-line TCTI options, applied after [`load_config`]
///
/// Values are stored by option long name and run through
/// [`TransportFactory::apply_option`], so they follow the same rules as the
/// option table.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    options: Vec<(String, String)>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an override for option `long`
    #[must_use]
    pub fn with_option(mut self, long: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(long, value);
        self
    }

    /// Add an override for option `long`
    pub fn push(&mut self, long: impl Into<String>, value: impl Into<String>) {
        self.options.push((long.into(), value.into()));
    }

    /// Whether any override is present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Apply the overrides in insertion order
    ///
    /// # Errors
    ///
    /// Returns the first [`OptionError`]; earlier overrides stay applied.
    pub fn apply(&self, config: &mut BrokerConfig) -> Result<(), ConfigError> {
        if self.options.is_empty() {
            return Ok(());
        }

        let mut factory = config.transport_factory();
        let result = self
            .options
            .iter()
            .try_for_each(|(long, value)| factory.apply_option(long, value));
        config.transport = factory.into_config();
        config.source = ConfigSource::Cli;
        result.map_err(ConfigError::from)
    }
}
