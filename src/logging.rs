//! Logging setup.
//!
//! Logs go to stderr so answers printed on stdout stay pipeable.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::models::LoggingConfig;

/// Pick the filter directive: `RUST_LOG` wins, then `--verbose`, then the config level.
pub fn filter_directive(config: &LoggingConfig, verbose: bool, env: Option<&str>) -> String {
    if let Some(env) = env.filter(|v| !v.trim().is_empty()) {
        return env.to_string();
    }
    let level = if verbose { "debug" } else { config.level.as_str() };
    format!("{level},aral_ai={level}")
}

/// Install the global subscriber. Safe to call more than once.
pub fn init_logging(config: &LoggingConfig, verbose: bool) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directive = filter_directive(config, verbose, env.as_deref());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));

    let console_layer = fmt::layer()
        .with_target(verbose)
        .with_writer(std::io::stderr);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .try_init();

    tracing::debug!(directive = %directive, "logging initialized");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_overrides_everything() {
        let config = LoggingConfig::default();
        assert_eq!(filter_directive(&config, true, Some("trace")), "trace");
    }

    #[test]
    fn test_verbose_forces_debug() {
        let config = LoggingConfig::default();
        assert_eq!(
            filter_directive(&config, true, None),
            "debug,aral_ai=debug"
        );
    }

    #[test]
    fn test_config_level_used_by_default() {
        let config = LoggingConfig {
            level: "info".to_string(),
        };
        assert_eq!(filter_directive(&config, false, Some("  ")), "info,aral_ai=info");
    }
}
