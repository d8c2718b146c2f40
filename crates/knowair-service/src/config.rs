//! Server configuration.

use std::path::{Path, PathBuf};

use knowair_core::{AlertConfig, AlertMode, Classifier};
use serde::{Deserialize, Serialize};

/// Server configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server settings.
    pub server: ServerConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// Alert thresholds and classifier mode.
    pub alerts: AlertsConfig,
    /// MQTT ingestion settings.
    pub mqtt: MqttConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - Server bind address is valid (host:port format)
    /// - Storage path is not empty
    /// - Alert thresholds are consistent (see [`AlertConfig::issues`])
    /// - MQTT settings, when enabled
    ///
    /// # Example
    ///
    /// ```
    /// use knowair_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.server.validate());
        errors.extend(self.storage.validate());
        errors.extend(self.alerts.validate());
        errors.extend(self.mqtt.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind: String,
    /// Capacity of the live reading broadcast channel.
    pub broadcast_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            broadcast_buffer: 100,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.bind.is_empty() {
            errors.push(ValidationError::new(
                "server.bind",
                "bind address cannot be empty",
            ));
        } else {
            match self.bind.rsplit_once(':') {
                None => errors.push(ValidationError::new(
                    "server.bind",
                    format!(
                        "invalid bind address '{}': expected format 'host:port'",
                        self.bind
                    ),
                )),
                Some((_, port)) => match port.parse::<u16>() {
                    Ok(0) => errors.push(ValidationError::new("server.bind", "port cannot be 0")),
                    Err(_) => errors.push(ValidationError::new(
                        "server.bind",
                        format!("invalid port '{}': must be a number 1-65535", port),
                    )),
                    Ok(_) => {}
                },
            }
        }

        // tokio::sync::broadcast panics on a zero capacity
        if self.broadcast_buffer == 0 {
            errors.push(ValidationError::new(
                "server.broadcast_buffer",
                "must be at least 1",
            ));
        }

        errors
    }
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: knowair_store::default_db_path(),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.path",
                "database path cannot be empty",
            ));
        }

        errors
    }
}

/// The `[alerts]` section: thresholds plus which classifier runs.
///
/// ```toml
/// [alerts]
/// mode = "range"
/// baseline_window_secs = 60
/// warn_pct = 35.0
/// high_pct = 80.0
///
/// [alerts.eco2]
/// min = 350.0
/// max = 600.0
/// hysteresis = 20.0
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Classifier applied after the sudden-change check.
    pub mode: AlertMode,
    /// Thresholds shared by both classifiers.
    #[serde(flatten)]
    pub thresholds: AlertConfig,
}

impl AlertsConfig {
    /// Build a classifier for the current settings.
    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.thresholds.clone(), self.mode)
    }

    /// Validate thresholds, reporting fields under `alerts.`.
    pub fn validate(&self) -> Vec<ValidationError> {
        self.thresholds
            .issues()
            .into_iter()
            .map(|issue| ValidationError {
                field: format!("alerts.{}", issue.field),
                message: issue.message,
            })
            .collect()
    }
}

/// MQTT subscriber configuration.
///
/// Telemetry is read from `{topic_prefix}+/data`, one topic level per device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Whether to run the subscriber (requires the `mqtt` feature).
    pub enabled: bool,
    /// Broker URL, `mqtt://host:port` or `mqtts://host:port`.
    pub broker: String,
    /// Topic prefix, including its trailing `/`.
    pub topic_prefix: String,
    /// Client identifier presented to the broker.
    pub client_id: String,
    /// Keep-alive interval in seconds.
    pub keep_alive: u64,
    /// Subscription QoS (0, 1 or 2).
    pub qos: u8,
    /// Optional username.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Optional password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            broker: "mqtt://localhost:1883".to_string(),
            topic_prefix: "knowair/".to_string(),
            client_id: "knowair-service".to_string(),
            keep_alive: 30,
            qos: 1,
            username: None,
            password: None,
        }
    }
}

impl MqttConfig {
    /// Subscription filter covering every device under the prefix.
    pub fn subscription_topic(&self) -> String {
        format!("{}+/data", self.topic_prefix)
    }

    /// Validate MQTT configuration. Nothing is checked while disabled.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if !self.enabled {
            return errors;
        }

        if !(self.broker.starts_with("mqtt://") || self.broker.starts_with("mqtts://")) {
            errors.push(ValidationError::new(
                "mqtt.broker",
                format!(
                    "invalid broker URL '{}': must start with mqtt:// or mqtts://",
                    self.broker
                ),
            ));
        }
        if self.topic_prefix.contains(['+', '#']) {
            errors.push(ValidationError::new(
                "mqtt.topic_prefix",
                "prefix cannot contain MQTT wildcards",
            ));
        }
        if self.client_id.is_empty() {
            errors.push(ValidationError::new(
                "mqtt.client_id",
                "client id cannot be empty",
            ));
        }
        if self.keep_alive == 0 {
            errors.push(ValidationError::new(
                "mqtt.keep_alive",
                "keep-alive must be at least 1 second",
            ));
        }
        if self.qos > 2 {
            errors.push(ValidationError::new(
                "mqtt.qos",
                format!("invalid QoS {}: must be 0, 1 or 2", self.qos),
            ));
        }
        if self.username.is_some() != self.password.is_some() {
            errors.push(ValidationError::new(
                "mqtt.username",
                "username and password must be set together",
            ));
        }

        errors
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind` or `alerts.eco2.hysteresis`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("knowair")
        .join("server.toml")
}
