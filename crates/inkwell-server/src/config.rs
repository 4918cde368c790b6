use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use inkwell_stream::openai::OpenAiConfig;

/// JWT secrets shipped in sample `.env` files. Never accepted.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("INKWELL_JWT_SECRET is unset or still a placeholder")]
    JwtSecret,

    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {name}: '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
    pub openai: OpenAiConfig,
    pub unsplash_access_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let jwt_secret = var("INKWELL_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            return Err(ConfigError::JwtSecret);
        }

        let host = var("INKWELL_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = var("INKWELL_PORT").unwrap_or_else(|| "3000".into());
        let addr = format!("{}:{}", host, port)
            .parse()
            .map_err(|_| ConfigError::Invalid {
                name: "INKWELL_HOST/INKWELL_PORT",
                value: format!("{}:{}", host, port),
            })?;

        let defaults = OpenAiConfig::default();
        let openai = OpenAiConfig {
            api_key: var("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?,
            base_url: var("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            model: var("OPENAI_MODEL").unwrap_or(defaults.model),
        };

        Ok(Self {
            addr,
            db_path: var("INKWELL_DB_PATH").unwrap_or_else(|| "inkwell.db".into()).into(),
            jwt_secret,
            upload_dir: var("INKWELL_UPLOAD_DIR").unwrap_or_else(|| "./uploads".into()).into(),
            openai,
            unsplash_access_key: var("UNSPLASH_ACCESS_KEY").unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_fill_in_optional_values() {
        let config = Config::from_lookup(lookup(&[
            ("INKWELL_JWT_SECRET", "a-real-secret"),
            ("OPENAI_API_KEY", "sk-test"),
        ]))
        .unwrap();

        assert_eq!(config.addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.db_path, PathBuf::from("inkwell.db"));
        assert_eq!(config.upload_dir, PathBuf::from("./uploads"));
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
        assert!(config.unsplash_access_key.is_empty());
    }

    #[test]
    fn placeholder_secrets_are_rejected() {
        for secret in ["", "dev-secret-change-me", "change-me-to-a-random-string"] {
            let err = Config::from_lookup(lookup(&[
                ("INKWELL_JWT_SECRET", secret),
                ("OPENAI_API_KEY", "sk-test"),
            ]))
            .unwrap_err();
            assert_eq!(err, ConfigError::JwtSecret);
        }
    }

    #[test]
    fn model_key_is_required() {
        let err = Config::from_lookup(lookup(&[("INKWELL_JWT_SECRET", "a-real-secret")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("OPENAI_API_KEY"));
    }

    #[test]
    fn bad_port_is_reported() {
        let err = Config::from_lookup(lookup(&[
            ("INKWELL_JWT_SECRET", "a-real-secret"),
            ("OPENAI_API_KEY", "sk-test"),
            ("INKWELL_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
