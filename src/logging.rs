//! Tracing subscriber setup

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Environment, LogFormat, Settings};

/// Directives used when `RUST_LOG` is unset. sqlx logs every statement at
/// INFO, which drowns request logs, so it is held at WARN everywhere.
pub fn default_directives(env: &Environment) -> &'static str {
    match env {
        Environment::Dev => "bistro_boss_backend=debug,tower_http=debug,sqlx=warn,info",
        Environment::Staging => "bistro_boss_backend=debug,tower_http=info,sqlx=warn,info",
        Environment::Prod => "bistro_boss_backend=info,tower_http=info,sqlx=warn,warn",
    }
}

pub fn init_logging(settings: &Settings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&settings.env)));
    let registry = tracing_subscriber::registry().with(filter);

    match settings.log_format {
        // One object per line, span fields (request id) merged in
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true).flatten_event(true))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_file(true).with_line_number(true))
            .try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
    }
    .context("Failed to install tracing subscriber")?;

    tracing::info!(env = ?settings.env, format = ?settings.log_format, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_environment_quiets_sqlx() {
        for env in [Environment::Dev, Environment::Staging, Environment::Prod] {
            assert!(default_directives(&env).contains("sqlx=warn"));
        }
    }

    #[test]
    fn default_directives_parse() {
        for env in [Environment::Dev, Environment::Staging, Environment::Prod] {
            assert!(EnvFilter::try_new(default_directives(&env)).is_ok());
        }
    }
}
