//! Environment-backed configuration.
//!
//! Every setting has a default; see [`Config::from_env`] for the variable names.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::net::IpAddr;
use std::path::PathBuf;

use crate::cache::CacheConfig;
use crate::constants::{
    DEFAULT_EMBED_CACHE_MAX_ITEMS, DEFAULT_EMBED_CACHE_TTL_SECS, DEFAULT_EMBED_MODEL,
    DEFAULT_LOCALE, DEFAULT_RERANK_CACHE_MAX_ITEMS, DEFAULT_RERANK_CACHE_TTL_SECS,
    DEFAULT_RERANK_MODEL, MAX_CACHE_TTL_SECS,
};

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port. Default: `8000`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Embedding model id reported by `/health` and `/embed`.
    pub embed_model: String,

    /// Local embedding model directory. `None` runs the stub embedder.
    pub embed_model_path: Option<PathBuf>,

    /// Reranker model id reported once the reranker is loaded.
    pub rerank_model: String,

    /// Local cross-encoder directory. `None` makes the reranker unavailable.
    pub rerank_model_path: Option<PathBuf>,

    /// Whether the reranker may be loaded at all. Default: `true`.
    pub rerank_enabled: bool,

    /// Load the reranker during startup instead of on the first rerank miss.
    pub eager_load_reranker: bool,

    /// Locale used when a request carries none. Default: `en`.
    pub default_locale: String,

    pub embed_cache_max_items: u64,
    pub embed_cache_ttl_secs: u64,
    pub rerank_cache_max_items: u64,
    pub rerank_cache_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            embed_model_path: None,
            rerank_model: DEFAULT_RERANK_MODEL.to_string(),
            rerank_model_path: None,
            rerank_enabled: true,
            eager_load_reranker: false,
            default_locale: DEFAULT_LOCALE.to_string(),
            embed_cache_max_items: DEFAULT_EMBED_CACHE_MAX_ITEMS,
            embed_cache_ttl_secs: DEFAULT_EMBED_CACHE_TTL_SECS,
            rerank_cache_max_items: DEFAULT_RERANK_CACHE_MAX_ITEMS,
            rerank_cache_ttl_secs: DEFAULT_RERANK_CACHE_TTL_SECS,
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "PORT";
    const ENV_BIND_ADDR: &'static str = "BIND_ADDR";
    const ENV_EMBED_MODEL: &'static str = "EMBED_MODEL";
    const ENV_EMBED_MODEL_PATH: &'static str = "EMBED_MODEL_PATH";
    const ENV_RERANK_MODEL: &'static str = "RERANK_MODEL";
    const ENV_RERANK_MODEL_PATH: &'static str = "RERANK_MODEL_PATH";
    const ENV_RERANK_ENABLED: &'static str = "RERANK_ENABLED";
    const ENV_EAGER_LOAD_RERANKER: &'static str = "EAGER_LOAD_RERANKER";
    const ENV_DEFAULT_LOCALE: &'static str = "DEFAULT_LOCALE";
    const ENV_EMBED_CACHE_MAX_ITEMS: &'static str = "EMBED_CACHE_MAX_ITEMS";
    const ENV_EMBED_CACHE_TTL: &'static str = "EMBED_CACHE_TTL_SECONDS";
    const ENV_RERANK_CACHE_MAX_ITEMS: &'static str = "RERANK_CACHE_MAX_ITEMS";
    const ENV_RERANK_CACHE_TTL: &'static str = "RERANK_CACHE_TTL_SECONDS";

    /// Loads configuration from environment variables (falling back to defaults).
    ///
    /// `RERANK_ENABLED` is on unless set to `0`, `false` or `no`; `EAGER_LOAD_RERANKER` is
    /// off unless set to `1`, `true` or `yes`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            port: Self::parse_port_from_env(defaults.port)?,
            bind_addr: Self::parse_bind_addr_from_env(defaults.bind_addr)?,
            embed_model: Self::parse_string_from_env(Self::ENV_EMBED_MODEL, defaults.embed_model),
            embed_model_path: Self::parse_optional_path_from_env(Self::ENV_EMBED_MODEL_PATH),
            rerank_model: Self::parse_string_from_env(
                Self::ENV_RERANK_MODEL,
                defaults.rerank_model,
            ),
            rerank_model_path: Self::parse_optional_path_from_env(Self::ENV_RERANK_MODEL_PATH),
            rerank_enabled: Self::parse_flag_from_env(Self::ENV_RERANK_ENABLED)
                .is_none_or(|v| !matches!(v.as_str(), "0" | "false" | "no")),
            eager_load_reranker: Self::parse_flag_from_env(Self::ENV_EAGER_LOAD_RERANKER)
                .is_some_and(|v| matches!(v.as_str(), "1" | "true" | "yes")),
            default_locale: Self::parse_string_from_env(
                Self::ENV_DEFAULT_LOCALE,
                defaults.default_locale,
            ),
            embed_cache_max_items: Self::parse_u64_from_env(
                Self::ENV_EMBED_CACHE_MAX_ITEMS,
                defaults.embed_cache_max_items,
            )?,
            embed_cache_ttl_secs: Self::parse_u64_from_env(
                Self::ENV_EMBED_CACHE_TTL,
                defaults.embed_cache_ttl_secs,
            )?,
            rerank_cache_max_items: Self::parse_u64_from_env(
                Self::ENV_RERANK_CACHE_MAX_ITEMS,
                defaults.rerank_cache_max_items,
            )?,
            rerank_cache_ttl_secs: Self::parse_u64_from_env(
                Self::ENV_RERANK_CACHE_TTL,
                defaults.rerank_cache_ttl_secs,
            )?,
        })
    }

    /// Validates cache bounds and model paths (does not load anything).
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            (Self::ENV_EMBED_CACHE_MAX_ITEMS, self.embed_cache_max_items),
            (Self::ENV_RERANK_CACHE_MAX_ITEMS, self.rerank_cache_max_items),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroCapacity { name });
            }
        }

        for (name, value) in [
            (Self::ENV_EMBED_CACHE_TTL, self.embed_cache_ttl_secs),
            (Self::ENV_RERANK_CACHE_TTL, self.rerank_cache_ttl_secs),
        ] {
            if value > MAX_CACHE_TTL_SECS {
                return Err(ConfigError::TtlOutOfRange {
                    name,
                    value,
                    max: MAX_CACHE_TTL_SECS,
                });
            }
        }

        for path in [&self.embed_model_path, &self.rerank_model_path]
            .into_iter()
            .flatten()
        {
            if !path.exists() {
                return Err(ConfigError::PathNotFound { path: path.clone() });
            }
            if !path.is_dir() {
                return Err(ConfigError::NotADirectory { path: path.clone() });
            }
        }

        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn embed_cache(&self) -> CacheConfig {
        CacheConfig::from_secs(self.embed_cache_max_items, self.embed_cache_ttl_secs)
    }

    pub fn rerank_cache(&self) -> CacheConfig {
        CacheConfig::from_secs(self.rerank_cache_max_items, self.rerank_cache_ttl_secs)
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_optional_path_from_env(var_name: &str) -> Option<PathBuf> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(default)
    }

    fn parse_flag_from_env(var_name: &str) -> Option<String> {
        env::var(var_name).ok().map(|v| v.trim().to_lowercase())
    }

    fn parse_u64_from_env(name: &'static str, default: u64) -> Result<u64, ConfigError> {
        match env::var(name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|e| ConfigError::InvalidNumber {
                    name,
                    value,
                    source: e,
                }),
            Err(_) => Ok(default),
        }
    }
}
