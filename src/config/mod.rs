//! Configuration module for the portfolio backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::errors::AppError;

/// Google endpoints used when no override is configured.
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const DEFAULT_DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
pub const DEFAULT_FOLDER_NAME: &str = "Teacher Portfolio Evidence";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API authentication
    pub api_psk: Option<String>,
    /// Path to the SQLite file backing the local store
    pub db_path: PathBuf,
    /// Path to Tantivy search index directory
    pub index_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub drive: DriveConfig,
}

/// OAuth client and endpoint settings for the Drive adapter.
#[derive(Debug, Clone)]
pub struct DriveConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    /// Long-lived refresh token; lets sign-in proceed without an authorization code
    pub refresh_token: Option<String>,
    pub token_url: String,
    pub api_base: String,
    pub upload_base: String,
    /// Folder evidence files are uploaded into
    pub folder_name: String,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            redirect_uri: None,
            refresh_token: None,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_base: DEFAULT_DRIVE_API_BASE.to_string(),
            upload_base: DEFAULT_DRIVE_UPLOAD_BASE.to_string(),
            folder_name: DEFAULT_FOLDER_NAME.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let api_psk = env::var("PORTFOLIO_API_PSK").ok();

        let db_path = env::var("PORTFOLIO_DB_PATH")
            .unwrap_or_else(|_| "./data/portfolio.sqlite".to_string())
            .into();

        let index_path = env::var("PORTFOLIO_INDEX_PATH")
            .unwrap_or_else(|_| "./data/index".to_string())
            .into();

        let raw_bind = env::var("PORTFOLIO_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let bind_addr = raw_bind.parse().map_err(|e| {
            AppError::Configuration(format!("Invalid PORTFOLIO_BIND_ADDR '{}': {}", raw_bind, e))
        })?;

        let log_level = env::var("PORTFOLIO_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            api_psk,
            db_path,
            index_path,
            bind_addr,
            log_level,
            drive: DriveConfig::from_env(),
        })
    }
}

impl DriveConfig {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            client_id: env::var("DRIVE_CLIENT_ID").unwrap_or_default(),
            client_secret: env::var("DRIVE_CLIENT_SECRET").ok(),
            redirect_uri: env::var("DRIVE_REDIRECT_URI").ok(),
            refresh_token: env::var("DRIVE_REFRESH_TOKEN").ok(),
            token_url: env::var("DRIVE_TOKEN_URL").unwrap_or(defaults.token_url),
            api_base: env::var("DRIVE_API_BASE").unwrap_or(defaults.api_base),
            upload_base: env::var("DRIVE_UPLOAD_BASE").unwrap_or(defaults.upload_base),
            folder_name: env::var("DRIVE_FOLDER_NAME").unwrap_or(defaults.folder_name),
        }
    }
}
