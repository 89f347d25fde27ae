/// Configuration management for Scrapp Service
///
/// All settings are read from the process environment (optionally seeded from
/// a `.env` file) once at startup.
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default secret used when `SECRET_KEY` is absent. Only acceptable in development.
pub const DEV_SECRET_KEY: &str = "dev-secret-not-for-prod";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Classifier artifact locations and upload limits
    pub classifier: ClassifierConfig,
    /// External chat-completion service
    pub chat: ChatConfig,
    /// Community post listing
    pub posts: PostsConfig,
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
    /// Debug mode: human-readable logs instead of JSON
    pub debug: bool,
    #[serde(skip_serializing)]
    pub secret_key: String,
    /// Accepted `Host` header values; `*` accepts any
    pub allowed_hosts: Vec<String>,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins, or `*`
    pub allowed_origins: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub model_path: String,
    pub labels_path: String,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(skip_serializing)]
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostsConfig {
    pub page_size: i64,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Fails when `GEMINI_API_KEY` is missing: the chat endpoint cannot work
    /// without it and the service refuses to start half-configured.
    pub fn from_env() -> Result<Self, String> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| "GEMINI_API_KEY is not set".to_string())?;

        let page_size: i64 = env_or("POSTS_PAGE_SIZE", 10);
        if page_size < 1 {
            return Err(format!("POSTS_PAGE_SIZE must be positive, got {}", page_size));
        }

        Ok(Config {
            app: AppConfig {
                env: env_string("APP_ENV", "development"),
                host: env_string("SCRAPP_HOST", "0.0.0.0"),
                port: env_or("SCRAPP_PORT", 8000),
                debug: env_string("DEBUG", "1") == "1",
                secret_key: env_string("SECRET_KEY", DEV_SECRET_KEY),
                allowed_hosts: split_list(&env_string("ALLOWED_HOSTS", "127.0.0.1,localhost")),
            },
            cors: CorsConfig {
                allowed_origins: env_string("CORS_ALLOWED_ORIGINS", "*"),
            },
            classifier: ClassifierConfig {
                model_path: env_string("MODEL_PATH", "export/scrapp-trash-model.onnx"),
                labels_path: env_string("LABELS_PATH", "export/labels.txt"),
                max_upload_bytes: env_or("MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
            },
            chat: ChatConfig {
                api_key,
                model: env_string("GEMINI_MODEL", "gemini-1.5-flash"),
                base_url: env_string(
                    "GEMINI_BASE_URL",
                    "https://generativelanguage.googleapis.com",
                ),
                timeout_secs: env_or("GEMINI_TIMEOUT_SECS", 30),
            },
            posts: PostsConfig { page_size },
        })
    }

    pub fn is_development(&self) -> bool {
        self.app.env == "development"
    }

    /// Whether the dev fallback secret is in use outside development
    pub fn uses_insecure_secret(&self) -> bool {
        !self.is_development() && self.app.secret_key == DEV_SECRET_KEY
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }
}
