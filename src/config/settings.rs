//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use std::path::Path;
use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub identity: IdentityConfig,
    pub image_host: ImageHostConfig,
    pub points: PointsConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
    pub features: FeaturesConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Attempts for a transaction aborted by a serialization conflict or deadlock
    pub transaction_retries: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    pub url: String,
    pub prefix: String,
    pub ttl_seconds: u64,
    /// Upper bound for a single command, connecting included
    pub command_timeout_ms: u64,
}

/// External identity provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentityConfig {
    /// Shared HS256 secret used to verify bearer tokens
    pub jwt_secret: String,
    pub issuer: Option<String>,
    /// User ids granted the admin role when their record is first created
    pub bootstrap_admins: Vec<String>,
}

/// Image host (unsigned upload preset) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageHostConfig {
    pub upload_url: String,
    pub upload_preset: String,
    pub timeout_seconds: u64,
    /// Largest accepted proof upload request
    pub max_upload_bytes: usize,
}

/// Default awards copied onto every new event
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PointsConfig {
    pub organizer_award: i32,
    pub participant_award: i32,
}

/// Per-user limits on registration attempts
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    pub registrations_per_minute: u32,
    pub burst: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: String,
    pub json: bool,
}

/// Feature flags configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeaturesConfig {
    /// Fan event changes out through Redis pub/sub
    pub live_updates: bool,
    pub proof_uploads: bool,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        Self::load(config::File::with_name("config").required(false))
    }

    /// Load settings from an explicit file, still honouring environment overrides
    pub fn from_path(path: &Path) -> Result<Self, config::ConfigError> {
        Self::load(config::File::from(path).required(true))
    }

    fn load(file: config::File<config::FileSourceFile, config::FileFormat>) -> Result<Self, config::ConfigError> {
        let defaults = config::Config::try_from(&Settings::default())?;
        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("GOLOOP")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("identity.bootstrap_admins")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::GoLoopError> {
        super::validation::validate_settings(self)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/goloop".to_string(),
                max_connections: 10,
                min_connections: 1,
                transaction_retries: 5,
            },
            redis: RedisConfig {
                url: "redis://localhost:6379".to_string(),
                prefix: "goloop:".to_string(),
                ttl_seconds: 60,
                command_timeout_ms: 2000,
            },
            identity: IdentityConfig {
                jwt_secret: String::new(),
                issuer: None,
                bootstrap_admins: vec![],
            },
            image_host: ImageHostConfig {
                upload_url: "https://api.cloudinary.com/v1_1/goloop/image/upload".to_string(),
                upload_preset: "goloop_unsigned".to_string(),
                timeout_seconds: 30,
                max_upload_bytes: 10 * 1024 * 1024,
            },
            points: PointsConfig {
                organizer_award: 3,
                participant_award: 1,
            },
            rate_limit: RateLimitConfig {
                registrations_per_minute: 10,
                burst: 5,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                directory: "logs".to_string(),
                json: false,
            },
            features: FeaturesConfig {
                live_updates: true,
                proof_uploads: true,
            },
        }
    }
}
