/*
 * Responsibility
 * - 環境変数や設定の読み込み (PORT, AUTH_MODE, PIPELINE_STAGES, audit limits など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::middleware::audit::AuditPolicy;
use crate::middleware::http::HttpSettings;
use crate::middleware::pipeline::{self, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<String>) -> Self {
        match value
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// Read `LOG_FORMAT`. Call after `.env` has been loaded.
    pub fn from_env() -> Self {
        Self::parse(std::env::var("LOG_FORMAT").ok())
    }

    fn parse(value: Option<String>) -> Self {
        match value.unwrap_or_default().trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// How bearer tokens are verified. Key material is not printable.
#[derive(Clone)]
pub enum AuthMode {
    Unverified,
    Hs256 { secret: String },
    EdDsa { public_key_pem: String },
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::Unverified => f.write_str("Unverified"),
            AuthMode::Hs256 { .. } => f.write_str("Hs256"),
            AuthMode::EdDsa { .. } => f.write_str("EdDsa"),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub auth_mode: AuthMode,
    pub auth_issuer: Option<String>,
    pub auth_audience: Option<String>,
    pub access_token_leeway_seconds: u64,

    pub pipeline_stages: Vec<Stage>,
    pub audit: AuditPolicy,
    pub http: HttpSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the process environment in `from_env`).
    pub fn from_lookup<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = match var("PORT") {
            Some(s) => s.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 3000,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(var("APP_ENV"));

        let auth_mode = match var("AUTH_MODE")
            .unwrap_or_else(|| "hs256".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "unverified" => AuthMode::Unverified,
            "hs256" => AuthMode::Hs256 {
                secret: var("AUTH_HS256_SECRET")
                    .filter(|s| !s.is_empty())
                    .ok_or(ConfigError::Missing("AUTH_HS256_SECRET"))?,
            },
            "eddsa" => AuthMode::EdDsa {
                public_key_pem: var("ACCESS_JWT_PUBLIC_KEY_PEM")
                    .ok_or(ConfigError::Missing("ACCESS_JWT_PUBLIC_KEY_PEM"))?
                    .replace("\\n", "\n"),
            },
            _ => return Err(ConfigError::Invalid("AUTH_MODE")),
        };

        // Accepting unsigned tokens is a development convenience only.
        if app_env.is_production() && matches!(auth_mode, AuthMode::Unverified) {
            return Err(ConfigError::Invalid("AUTH_MODE"));
        }

        let auth_issuer = var("AUTH_ISSUER").filter(|s| !s.trim().is_empty());
        let auth_audience = var("AUTH_AUDIENCE").filter(|s| !s.trim().is_empty());

        let access_token_leeway_seconds = parse_or(&var, "ACCESS_TOKEN_LEEWAY_SECONDS", 0u64)?;

        let pipeline_stages = match var("PIPELINE_STAGES") {
            Some(list) => pipeline::parse_stages(&list)?,
            None => pipeline::DEFAULT_STAGES.to_vec(),
        };

        let defaults = AuditPolicy::default();
        let audit = AuditPolicy {
            capture_max_bytes: parse_or(&var, "AUDIT_CAPTURE_MAX_BYTES", defaults.capture_max_bytes)?,
            log_max_body_bytes: parse_or(
                &var,
                "AUDIT_LOG_MAX_BODY_BYTES",
                defaults.log_max_body_bytes,
            )?,
        };

        let defaults = HttpSettings::default();
        let http = HttpSettings {
            body_limit_bytes: parse_or(&var, "REQUEST_BODY_LIMIT_BYTES", defaults.body_limit_bytes)?,
            timeout: Duration::from_secs(parse_or(
                &var,
                "REQUEST_TIMEOUT_SECONDS",
                defaults.timeout.as_secs(),
            )?),
        };

        Ok(Self {
            addr,
            app_env,
            auth_mode,
            auth_issuer,
            auth_audience,
            access_token_leeway_seconds,
            pipeline_stages,
            audit,
            http,
        })
    }
}

fn parse_or<F, T>(var: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match var(key) {
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_with_hs256_secret() {
        let config = Config::from_lookup(lookup(&[("AUTH_HS256_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.addr.port(), 3000);
        assert_eq!(config.app_env, AppEnv::Development);
        assert!(matches!(config.auth_mode, AuthMode::Hs256 { .. }));
        assert_eq!(config.pipeline_stages, pipeline::DEFAULT_STAGES.to_vec());
        assert_eq!(config.access_token_leeway_seconds, 0);
        assert!(config.auth_issuer.is_none());
    }

    #[test]
    fn hs256_requires_secret() {
        let err = Config::from_lookup(lookup(&[])).err();
        assert_eq!(err, Some(ConfigError::Missing("AUTH_HS256_SECRET")));
    }

    #[test]
    fn unverified_is_refused_in_production() {
        let err = Config::from_lookup(lookup(&[
            ("AUTH_MODE", "unverified"),
            ("APP_ENV", "production"),
        ]))
        .err();
        assert_eq!(err, Some(ConfigError::Invalid("AUTH_MODE")));

        let dev = Config::from_lookup(lookup(&[("AUTH_MODE", "unverified")])).unwrap();
        assert!(matches!(dev.auth_mode, AuthMode::Unverified));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("AUTH_MODE", "unverified"),
            ("AUDIT_CAPTURE_MAX_BYTES", "lots"),
        ]))
        .err();
        assert_eq!(err, Some(ConfigError::Invalid("AUDIT_CAPTURE_MAX_BYTES")));

        let err = Config::from_lookup(lookup(&[("AUTH_MODE", "unverified"), ("PORT", "http")])).err();
        assert_eq!(err, Some(ConfigError::Invalid("PORT")));
    }

    #[test]
    fn pipeline_order_comes_from_env() {
        let config = Config::from_lookup(lookup(&[
            ("AUTH_MODE", "unverified"),
            ("PIPELINE_STAGES", "authentication, logging"),
        ]))
        .unwrap();
        assert_eq!(
            config.pipeline_stages,
            vec![Stage::Authentication, Stage::Logging]
        );
    }

    #[test]
    fn log_format_parsing() {
        assert_eq!(LogFormat::parse(Some("JSON".into())), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some(" json ".into())), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some("pretty".into())), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(None), LogFormat::Pretty);
    }

    #[test]
    fn debug_hides_secret() {
        let config = Config::from_lookup(lookup(&[("AUTH_HS256_SECRET", "s3cret")])).unwrap();
        assert!(!format!("{config:?}").contains("s3cret"));
    }
}
