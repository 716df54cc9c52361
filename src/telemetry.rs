//! Tracing setup for the two ways the binary runs. The server logs at the
//! configured level on stdout; one-shot `report` runs log warnings and above
//! on stderr, keeping stdout clean for the run summary.

use crate::config::TelemetryConfig;
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum TelemetryError {
    Filter { value: String, source: ParseError },
    Init(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::Filter { value, .. } => {
                write!(f, "invalid log filter '{}'", value)
            }
            TelemetryError::Init(err) => {
                write!(f, "failed to install tracing subscriber: {err}")
            }
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::Filter { source, .. } => Some(source),
            TelemetryError::Init(err) => Some(&**err),
        }
    }
}

fn parse_filter(value: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(value).map_err(|source| TelemetryError::Filter {
        value: value.to_string(),
        source,
    })
}

// RUST_LOG wins over the configured fallback when it is set and valid.
fn effective_filter(fallback: &str) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => parse_filter(fallback),
    }
}

/// Installs the global subscriber for the HTTP server.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = effective_filter(&config.log_level)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Init)
}

/// Installs the subscriber for one-shot report runs: warnings and above,
/// written to stderr.
pub fn init_cli() -> Result<(), TelemetryError> {
    let filter = effective_filter("warn")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(TelemetryError::Init)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_with_a_bad_level_is_rejected() {
        let error = parse_filter("dialer_attendance=notalevel").expect_err("bad level");
        assert!(matches!(error, TelemetryError::Filter { value, .. } if value.contains("notalevel")));
    }

    #[test]
    fn plain_level_and_directive_filters_parse() {
        assert!(parse_filter("info").is_ok());
        assert!(parse_filter("warn,hyper=info").is_ok());
    }
}
