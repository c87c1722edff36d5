use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

/// Default token lifetime: 365 days ("remember me").
const DEFAULT_JWT_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Self::Prod)
    }
}

/// Log line format, `LOG_FORMAT=json|pretty|compact`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl LogFormat {
    /// Unset or unknown values fall back to JSON in production and pretty
    /// output elsewhere.
    pub fn resolve(raw: Option<&str>, env: &Environment) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("json") => Self::Json,
            Some("pretty") => Self::Pretty,
            Some("compact") => Self::Compact,
            _ if env.is_prod() => Self::Json,
            _ => Self::Pretty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub log_format: LogFormat,
    pub server_addr: String,

    // Database (in-memory store when unset)
    pub database_url: Option<String>,
    pub database_max_connections: u32,

    // CORS
    pub cors_allow_origins: Vec<String>,

    // Session tokens
    pub jwt_secret: String,
    pub jwt_ttl_seconds: i64,

    // Photo uploads
    pub upload_dir: PathBuf,
    pub public_base_url: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let env = Environment::from_str(
            &env::var("ENV")
                .or_else(|_| env::var("NODE_ENV"))
                .unwrap_or_else(|_| "dev".to_string()),
        );

        let log_format = LogFormat::resolve(env::var("LOG_FORMAT").ok().as_deref(), &env);

        let port = env::var("PORT").unwrap_or_else(|_| "5000".to_string());
        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| format!("0.0.0.0:{}", port));

        // Database
        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        // CORS
        let cors_allow_origins = env::var("CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // Session tokens
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }
        let jwt_ttl_seconds = match env::var("JWT_TTL_SECONDS") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("JWT_TTL_SECONDS is not a number: {}", raw))?,
            Err(_) => DEFAULT_JWT_TTL_SECONDS,
        };

        // Photo uploads
        let upload_dir = PathBuf::from(env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()));
        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", port));

        Ok(Settings {
            env,
            log_format,
            server_addr,
            database_url,
            database_max_connections,
            cors_allow_origins,
            jwt_secret,
            jwt_ttl_seconds,
            upload_dir,
            public_base_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_accepts_node_style_names() {
        assert_eq!(Environment::from_str("production"), Environment::Prod);
        assert_eq!(Environment::from_str("PROD"), Environment::Prod);
        assert_eq!(Environment::from_str("staging"), Environment::Staging);
        assert_eq!(Environment::from_str("development"), Environment::Dev);
        assert!(Environment::from_str("").is_dev());
    }

    #[test]
    fn log_format_defaults_follow_environment() {
        assert_eq!(LogFormat::resolve(None, &Environment::Prod), LogFormat::Json);
        assert_eq!(LogFormat::resolve(None, &Environment::Dev), LogFormat::Pretty);
        assert_eq!(LogFormat::resolve(Some("bogus"), &Environment::Staging), LogFormat::Pretty);
        assert_eq!(LogFormat::resolve(Some(" Compact "), &Environment::Prod), LogFormat::Compact);
        assert_eq!(LogFormat::resolve(Some("json"), &Environment::Dev), LogFormat::Json);
    }
}
