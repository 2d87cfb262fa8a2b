use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub scheduler: SchedulerConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let trigger_secret =
            env::var("SCHEDULER_SECRET").unwrap_or_else(|_| "local-dev-secret".to_string());
        let read_retention_days = retention_days("SCHEDULER_READ_RETENTION_DAYS", 30)?;
        let unread_retention_days = retention_days("SCHEDULER_UNREAD_RETENTION_DAYS", 180)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            scheduler: SchedulerConfig {
                trigger_secret,
                read_retention_days,
                unread_retention_days,
            },
        })
    }
}

fn retention_days(var: &'static str, default: i64) -> Result<i64, ConfigError> {
    let raw = match env::var(var) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    let days = raw
        .parse::<i64>()
        .map_err(|_| ConfigError::InvalidRetention { var })?;
    if days < 1 {
        return Err(ConfigError::InvalidRetention { var });
    }
    Ok(days)
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Controls for the externally triggered scheduler endpoint and the
/// notification cleanup task.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Shared secret expected from the recurring external trigger.
    pub trigger_secret: String,
    /// Read notifications older than this many days are purged.
    pub read_retention_days: i64,
    /// Unread notifications older than this many days are purged.
    pub unread_retention_days: i64,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidRetention { var: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidRetention { var } => {
                write!(f, "{var} must be a positive number of days")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidRetention { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
