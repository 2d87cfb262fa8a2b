use crate::config::{AppEnvironment, TelemetryConfig};
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum TelemetryError {
    Filter { value: String, source: ParseError },
    Install(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::Filter { value, .. } => {
                write!(f, "log filter '{value}' is not a valid tracing directive")
            }
            TelemetryError::Install(err) => {
                write!(f, "failed to install tracing subscriber: {err}")
            }
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::Filter { source, .. } => Some(source),
            TelemetryError::Install(err) => Some(&**err),
        }
    }
}

fn fallback_filter(log_level: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(log_level).map_err(|source| TelemetryError::Filter {
        value: log_level.to_string(),
        source,
    })
}

/// Installs the global tracing subscriber. `RUST_LOG` wins over the
/// configured level when both are set. Development runs keep ANSI color
/// for local readability; test and production emit plain compact lines
/// for log shipping.
pub fn init(config: &TelemetryConfig, environment: AppEnvironment) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => fallback_filter(&config.log_level)?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();

    match environment {
        AppEnvironment::Development => builder.try_init(),
        AppEnvironment::Test | AppEnvironment::Production => {
            builder.with_ansi(false).try_init()
        }
    }
    .map_err(TelemetryError::Install)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_directive_style_filter() {
        assert!(fallback_filter("info,admissions_tracker=debug").is_ok());
    }

    #[test]
    fn rejects_a_malformed_filter_with_the_offending_value() {
        match fallback_filter("tracker=chatty") {
            Err(TelemetryError::Filter { value, .. }) => assert_eq!(value, "tracker=chatty"),
            Err(other) => panic!("unexpected error kind: {other}"),
            Ok(_) => panic!("filter unexpectedly parsed"),
        }
    }
}
