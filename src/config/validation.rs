//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{GoLoopError, Result};
use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_server_config(&settings.server)?;
    validate_database_config(&settings.database)?;
    validate_redis_config(&settings.redis)?;
    validate_identity_config(&settings.identity)?;
    validate_points_config(&settings.points)?;
    validate_rate_limit_config(&settings.rate_limit)?;
    validate_logging_config(&settings.logging)?;

    if settings.features.proof_uploads {
        validate_image_host_config(&settings.image_host)?;
    }

    Ok(())
}

fn validate_server_config(config: &super::ServerConfig) -> Result<()> {
    if config.host.is_empty() {
        return Err(GoLoopError::Config(
            "Server host is required".to_string()
        ));
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(GoLoopError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(GoLoopError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(GoLoopError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    if config.transaction_retries == 0 {
        return Err(GoLoopError::Config(
            "Transaction retries must be at least 1".to_string()
        ));
    }

    Ok(())
}

/// Validate Redis configuration
fn validate_redis_config(config: &super::RedisConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(GoLoopError::Config(
            "Redis URL is required".to_string()
        ));
    }

    if config.command_timeout_ms == 0 {
        return Err(GoLoopError::Config(
            "Redis command timeout must be greater than 0".to_string()
        ));
    }

    Ok(())
}

fn validate_identity_config(config: &super::IdentityConfig) -> Result<()> {
    if config.jwt_secret.is_empty() {
        return Err(GoLoopError::Config(
            "Identity provider JWT secret is required".to_string()
        ));
    }

    if config.bootstrap_admins.iter().any(|uid| uid.trim().is_empty()) {
        return Err(GoLoopError::Config(
            "Bootstrap admin ids cannot be blank".to_string()
        ));
    }

    Ok(())
}

fn validate_image_host_config(config: &super::ImageHostConfig) -> Result<()> {
    url::Url::parse(&config.upload_url)
        .map_err(|e| GoLoopError::Config(format!("Invalid image host upload URL: {}", e)))?;

    if config.upload_preset.is_empty() {
        return Err(GoLoopError::Config(
            "Image host upload preset is required".to_string()
        ));
    }

    if config.timeout_seconds == 0 {
        return Err(GoLoopError::Config(
            "Image host timeout must be greater than 0".to_string()
        ));
    }

    if config.max_upload_bytes == 0 {
        return Err(GoLoopError::Config(
            "Image host upload limit must be greater than 0".to_string()
        ));
    }

    Ok(())
}

fn validate_points_config(config: &super::PointsConfig) -> Result<()> {
    if config.organizer_award <= 0 || config.participant_award <= 0 {
        return Err(GoLoopError::Config(
            "Point awards must be positive".to_string()
        ));
    }

    Ok(())
}

fn validate_rate_limit_config(config: &super::RateLimitConfig) -> Result<()> {
    if config.registrations_per_minute == 0 {
        return Err(GoLoopError::Config(
            "Registrations per minute must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(GoLoopError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(GoLoopError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> Settings {
        let mut settings = Settings::default();
        settings.identity.jwt_secret = "secret".to_string();
        settings
    }

    #[test]
    fn test_valid_settings_pass() {
        assert!(validate_settings(&valid_settings()).is_ok());
    }

    #[test]
    fn test_missing_jwt_secret_is_rejected() {
        let settings = Settings::default();
        assert!(matches!(validate_settings(&settings), Err(GoLoopError::Config(_))));
    }

    #[test]
    fn test_pool_bounds() {
        let mut settings = valid_settings();
        settings.database.min_connections = 20;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_awards_must_be_positive() {
        let mut settings = valid_settings();
        settings.points.participant_award = 0;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_image_host_checked_only_when_uploads_enabled() {
        let mut settings = valid_settings();
        settings.image_host.upload_url = "not a url".to_string();
        assert!(validate_settings(&settings).is_err());

        settings.features.proof_uploads = false;
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_zero_limits_are_rejected() {
        let mut settings = valid_settings();
        settings.redis.command_timeout_ms = 0;
        assert!(validate_settings(&settings).is_err());

        let mut settings = valid_settings();
        settings.image_host.max_upload_bytes = 0;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut settings = valid_settings();
        settings.logging.level = "verbose".to_string();
        assert!(validate_settings(&settings).is_err());
    }
}
