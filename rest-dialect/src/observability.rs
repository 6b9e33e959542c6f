//! Tracing setup
//!
//! Logs are emitted as JSON lines. The filter comes from
//! `service.log_level`, which accepts anything `EnvFilter` does
//! (`info`, `rest_dialect=debug,tower_http=warn`, ...). An invalid directive
//! falls back to `info`.

use tracing_subscriber::EnvFilter;

use crate::{
    config::Config,
    error::{Error, Result},
};

/// Install the global JSON tracing subscriber
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: &Config) -> Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter(&config.service.log_level))
        .try_init()
        .map_err(|e| Error::Tracing(e.to_string()))?;

    tracing::info!("Tracing initialized for service: {}", config.service.name);

    Ok(())
}

fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_accepts_directives() {
        let filter = env_filter("rest_dialect=debug,tower_http=warn");
        assert!(filter.to_string().contains("rest_dialect=debug"));
    }

    #[test]
    fn test_env_filter_falls_back_to_info() {
        let filter = env_filter("rest_dialect=loud");
        assert_eq!(filter.to_string(), "info");
    }

    #[test]
    fn test_init_tracing_twice_is_an_error() {
        let config = Config::default();
        // A parallel test may have installed the subscriber first.
        let _ = init_tracing(&config);
        assert!(matches!(init_tracing(&config), Err(Error::Tracing(_))));
    }
}
