/// Configuration management for the blog service
///
/// Loaded once at startup from environment variables (after `dotenvy` has read `.env`).
use db_pool::env_utils::{parse_env_optional, parse_env_with_default};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const MIN_SECRET_KEY_BYTES: usize = 32;
const DEV_SECRET_KEY: &str = "yatube-development-secret-key-change-me";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Storage backend selection
    pub storage: StorageConfig,
    /// Session cookie settings
    pub session: SessionConfig,
    /// Page cache configuration
    pub cache: CacheConfig,
    /// Uploaded media settings
    pub media: MediaConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

/// Session cookie configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// HS256 signing key for session and reset tokens
    #[serde(skip_serializing)]
    pub secret_key: String,
    /// Session lifetime in seconds
    pub ttl_secs: u64,
    /// Mark the cookie `Secure`
    pub secure_cookie: bool,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret_key", &"[REDACTED]")
            .field("ttl_secs", &self.ttl_secs)
            .field("secure_cookie", &self.secure_cookie)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageCacheBackend {
    Memory,
    Redis,
}

/// Page cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub backend: PageCacheBackend,
    /// Redis URL, required for the redis backend
    pub redis_url: Option<String>,
    /// Lifetime of the cached main listing
    pub index_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory holding uploaded files (`posts/` lives under it)
    pub root: PathBuf,
    pub max_upload_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let app = AppConfig {
            env: app_env,
            host: std::env::var("BLOG_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_env_with_default("BLOG_PORT", 8000),
        };
        let production = app.is_production();

        let storage = StorageConfig {
            backend: match std::env::var("STORAGE_BACKEND")
                .unwrap_or_else(|_| "postgres".to_string())
                .to_ascii_lowercase()
                .as_str()
            {
                "postgres" => StorageBackend::Postgres,
                "memory" if production => {
                    return Err("STORAGE_BACKEND=memory is not allowed in production".to_string())
                }
                "memory" => StorageBackend::Memory,
                other => return Err(format!("Unknown STORAGE_BACKEND '{}'", other)),
            },
        };

        let session = {
            let secret_key = match std::env::var("SECRET_KEY") {
                Ok(value) => value,
                Err(_) if production => {
                    return Err("SECRET_KEY must be set in production".to_string())
                }
                Err(_) => DEV_SECRET_KEY.to_string(),
            };
            if production && secret_key.len() < MIN_SECRET_KEY_BYTES {
                return Err(format!(
                    "SECRET_KEY must be at least {} bytes in production",
                    MIN_SECRET_KEY_BYTES
                ));
            }

            SessionConfig {
                secret_key,
                ttl_secs: parse_env_with_default("SESSION_TTL_SECS", 1_209_600),
                secure_cookie: production,
            }
        };

        let cache = {
            let backend = match std::env::var("PAGE_CACHE_BACKEND")
                .unwrap_or_else(|_| "memory".to_string())
                .to_ascii_lowercase()
                .as_str()
            {
                "memory" => PageCacheBackend::Memory,
                "redis" => PageCacheBackend::Redis,
                other => return Err(format!("Unknown PAGE_CACHE_BACKEND '{}'", other)),
            };
            let redis_url: Option<String> = parse_env_optional("REDIS_URL");
            if backend == PageCacheBackend::Redis && redis_url.is_none() {
                return Err("REDIS_URL must be set when PAGE_CACHE_BACKEND=redis".to_string());
            }

            CacheConfig {
                backend,
                redis_url,
                index_ttl_secs: parse_env_with_default("INDEX_CACHE_TTL_SECS", 20),
            }
        };

        let media = MediaConfig {
            root: PathBuf::from(std::env::var("MEDIA_ROOT").unwrap_or_else(|_| "media".to_string())),
            max_upload_bytes: parse_env_with_default("MAX_UPLOAD_BYTES", 5 * 1024 * 1024),
        };

        Ok(Config {
            app,
            storage,
            session,
            cache,
            media,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: &[&str] = &[
        "APP_ENV",
        "BLOG_HOST",
        "BLOG_PORT",
        "STORAGE_BACKEND",
        "SECRET_KEY",
        "SESSION_TTL_SECS",
        "PAGE_CACHE_BACKEND",
        "REDIS_URL",
        "INDEX_CACHE_TTL_SECS",
        "MEDIA_ROOT",
        "MAX_UPLOAD_BYTES",
    ];

    fn clear_env() {
        for key in VARS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial_test::serial]
    fn test_defaults() {
        clear_env();
        let config = Config::from_env().unwrap();
        assert_eq!(config.app.port, 8000);
        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert_eq!(config.cache.backend, PageCacheBackend::Memory);
        assert_eq!(config.cache.index_ttl_secs, 20);
        assert_eq!(config.session.ttl_secs, 1_209_600);
        assert!(!config.session.secure_cookie);
        assert_eq!(config.media.max_upload_bytes, 5 * 1024 * 1024);
    }

    #[test]
    #[serial_test::serial]
    fn test_production_requires_secret_key() {
        clear_env();
        std::env::set_var("APP_ENV", "production");
        assert!(Config::from_env().is_err());

        std::env::set_var("SECRET_KEY", "short");
        assert!(Config::from_env().is_err());

        std::env::set_var("SECRET_KEY", "a".repeat(48));
        let config = Config::from_env().unwrap();
        assert!(config.session.secure_cookie);
        clear_env();
    }

    #[test]
    #[serial_test::serial]
    fn test_production_rejects_memory_storage() {
        clear_env();
        std::env::set_var("APP_ENV", "production");
        std::env::set_var("SECRET_KEY", "a".repeat(48));
        std::env::set_var("STORAGE_BACKEND", "memory");
        assert!(Config::from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial_test::serial]
    fn test_redis_backend_needs_url() {
        clear_env();
        std::env::set_var("PAGE_CACHE_BACKEND", "redis");
        assert!(Config::from_env().is_err());

        std::env::set_var("REDIS_URL", "redis://localhost:6379");
        let config = Config::from_env().unwrap();
        assert_eq!(config.cache.backend, PageCacheBackend::Redis);
        clear_env();
    }

    #[test]
    #[serial_test::serial]
    fn test_debug_redacts_secret() {
        clear_env();
        std::env::set_var("SECRET_KEY", "super-secret-signing-material");
        let config = Config::from_env().unwrap();
        assert!(!format!("{:?}", config).contains("super-secret"));
        clear_env();
    }
}
