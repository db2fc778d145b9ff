//! ClientConfig - construction parameters of the events client
//!
//! Fixed once per process and shared read-only by every `send` call.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{ContractError, Event};

/// Placeholder substituted by the event name template
pub const EVENT_NAME_PLACEHOLDER: &str = "{}";

/// Indexed form of the placeholder, substituted at every occurrence
pub const EVENT_NAME_INDEXED_PLACEHOLDER: &str = "{0}";

/// Complete client configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ClientConfig {
    /// Host identifier stamped on every event
    #[validate(length(min = 1, message = "host_name is required"))]
    pub host_name: String,

    /// Environment identifier stamped on every event
    #[validate(length(min = 1, message = "environment is required"))]
    pub environment: String,

    /// Time-series collaborator connection
    #[serde(default)]
    #[validate(nested)]
    pub time_series: TimeSeriesConfig,

    /// Queue collaborator connection
    #[serde(default)]
    #[validate(nested)]
    pub queue: QueueConfig,

    /// Fields merged into every event without overwriting caller data
    #[serde(default)]
    pub static_fields: Event,

    /// Prefix forced onto every field name except `environment` / `host`
    #[serde(default)]
    pub namespace: Option<String>,

    /// Series / event name template, e.g. `"billing.{}"` or `"{0}.{0}"`
    ///
    /// The first `{}` and every `{0}` take the event name; any other brace
    /// text is copied as is.
    #[serde(default)]
    pub event_name_format: Option<String>,
}

impl ClientConfig {
    /// Minimal configuration with default connections
    pub fn new(host_name: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
            environment: environment.into(),
            time_series: TimeSeriesConfig::default(),
            queue: QueueConfig::default(),
            static_fields: Event::new(),
            namespace: None,
            event_name_format: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_static_fields(mut self, fields: Event) -> Self {
        self.static_fields = fields;
        self
    }

    pub fn with_event_name_format(mut self, template: impl Into<String>) -> Self {
        self.event_name_format = Some(template.into());
        self
    }

    /// Validate every construction parameter
    ///
    /// # Errors
    /// Returns `ConfigValidation` naming the first offending field.
    pub fn check(&self) -> Result<(), ContractError> {
        self.validate().map_err(ContractError::from)?;

        if let Some(template) = &self.event_name_format {
            if !template.contains(EVENT_NAME_PLACEHOLDER)
                && !template.contains(EVENT_NAME_INDEXED_PLACEHOLDER)
            {
                return Err(ContractError::config_validation(
                    "event_name_format",
                    format!(
                        "template '{template}' has no '{EVENT_NAME_PLACEHOLDER}' or \
                         '{EVENT_NAME_INDEXED_PLACEHOLDER}' placeholder"
                    ),
                ));
            }
        }

        if self.namespace.as_deref() == Some("") {
            return Err(ContractError::config_validation(
                "namespace",
                "namespace cannot be empty, omit it instead",
            ));
        }

        if self.static_fields.keys().any(str::is_empty) {
            return Err(ContractError::config_validation(
                "static_fields",
                "field names cannot be empty",
            ));
        }

        self.check_connections()
    }

    fn check_connections(&self) -> Result<(), ContractError> {
        let ts = &self.time_series;
        if ts.port == 0 {
            return Err(ContractError::config_validation(
                "time_series.port",
                "port must be > 0",
            ));
        }
        if let TimeSeriesTransport::Udp { port: 0 } = ts.transport {
            return Err(ContractError::config_validation(
                "time_series.transport.port",
                "udp port must be > 0",
            ));
        }
        if ts.timeout_ms == 0 {
            return Err(ContractError::config_validation(
                "time_series.timeout_ms",
                "timeout_ms must be > 0",
            ));
        }
        if self.queue.port == 0 {
            return Err(ContractError::config_validation(
                "queue.port",
                "port must be > 0",
            ));
        }
        if self.queue.timeout_ms == 0 {
            return Err(ContractError::config_validation(
                "queue.timeout_ms",
                "timeout_ms must be > 0",
            ));
        }
        Ok(())
    }

    /// Series / event name after applying the optional template
    pub fn format_event_name(&self, event_name: &str) -> String {
        match &self.event_name_format {
            Some(template) => apply_template(template, event_name),
            None => event_name.to_string(),
        }
    }
}

fn apply_template(template: &str, event_name: &str) -> String {
    let mut out = String::with_capacity(template.len() + event_name.len());
    let mut rest = template;
    let mut positional_used = false;

    while let Some(at) = rest.find('{') {
        out.push_str(&rest[..at]);
        let tail = &rest[at..];
        if !positional_used && tail.starts_with(EVENT_NAME_PLACEHOLDER) {
            out.push_str(event_name);
            positional_used = true;
            rest = &tail[EVENT_NAME_PLACEHOLDER.len()..];
        } else if tail.starts_with(EVENT_NAME_INDEXED_PLACEHOLDER) {
            out.push_str(event_name);
            rest = &tail[EVENT_NAME_INDEXED_PLACEHOLDER.len()..];
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

/// Transport used to reach the time-series store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TimeSeriesTransport {
    /// HTTP(S) series endpoint
    #[default]
    Http,
    /// One datagram per write, fire-and-forget
    Udp { port: u16 },
}

/// Time-series collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TimeSeriesConfig {
    #[serde(default = "default_ts_host")]
    #[validate(length(min = 1, message = "time_series.host cannot be empty"))]
    pub host: String,

    #[serde(default = "default_ts_port")]
    pub port: u16,

    #[serde(default = "default_ts_username")]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_ts_database")]
    #[validate(length(min = 1, message = "time_series.database cannot be empty"))]
    pub database: String,

    #[serde(default)]
    pub ssl: bool,

    #[serde(default)]
    pub transport: TimeSeriesTransport,

    /// Network timeout per write
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for TimeSeriesConfig {
    fn default() -> Self {
        Self {
            host: default_ts_host(),
            port: default_ts_port(),
            username: default_ts_username(),
            password: String::new(),
            database: default_ts_database(),
            ssl: false,
            transport: TimeSeriesTransport::default(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_ts_host() -> String {
    "localhost".to_string()
}

fn default_ts_port() -> u16 {
    8086
}

fn default_ts_username() -> String {
    "app".to_string()
}

fn default_ts_database() -> String {
    "developer-metrics".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

/// Queue collaborator configuration (Redis list consumed by logstash)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QueueConfig {
    #[serde(default = "default_queue_host")]
    #[validate(length(min = 1, message = "queue.host cannot be empty"))]
    pub host: String,

    #[serde(default = "default_queue_port")]
    pub port: u16,

    /// Database index selected after connecting
    #[serde(default)]
    pub db: u32,

    /// List key the records are appended to
    #[serde(default = "default_queue_key")]
    #[validate(length(min = 1, message = "queue.key cannot be empty"))]
    pub key: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            host: default_queue_host(),
            port: default_queue_port(),
            db: 0,
            key: default_queue_key(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_queue_host() -> String {
    "localhost".to_string()
}

fn default_queue_port() -> u16 {
    6379
}

fn default_queue_key() -> String {
    "logstash".to_string()
}
