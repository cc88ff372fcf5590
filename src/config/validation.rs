use crate::config::types::{
    AnalyzerConfig, BatchConfig, CheckerConfig, Config, LimitsConfig, StorageConfig,
};
use crate::ConfigError;

const MAX_POOL_SIZE: usize = 1000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_analyzer_config(&config.analyzer)?;
    validate_checker_config(&config.single)?;
    validate_batch_config(&config.batch, &config.analyzer)?;
    validate_limits_config(&config.limits)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates primary fetch settings
fn validate_analyzer_config(config: &AnalyzerConfig) -> Result<(), ConfigError> {
    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be > 0".to_string(),
        ));
    }

    if config.probe_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "probe_timeout_ms must be > 0".to_string(),
        ));
    }

    if config.probe_timeout() >= config.request_timeout() {
        return Err(ConfigError::Validation(format!(
            "probe_timeout_ms ({}ms) must be shorter than request_timeout_secs ({}s)",
            config.probe_timeout_ms, config.request_timeout_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.freshness_window_secs == 0 {
        return Err(ConfigError::Validation(
            "freshness_window_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates single-page checker sizing
fn validate_checker_config(config: &CheckerConfig) -> Result<(), ConfigError> {
    validate_pool_size("single.probe_workers", config.probe_workers)?;
    validate_pool_size("single.probe_queue_capacity", config.probe_queue_capacity)?;
    Ok(())
}

/// Validates batch orchestrator sizing
fn validate_batch_config(config: &BatchConfig, analyzer: &AnalyzerConfig) -> Result<(), ConfigError> {
    validate_pool_size("batch.max_concurrent_analyses", config.max_concurrent_analyses)?;
    validate_pool_size("batch.url_queue_capacity", config.url_queue_capacity)?;
    validate_pool_size("batch.probe_workers", config.probe_workers)?;
    validate_pool_size("batch.probe_queue_capacity", config.probe_queue_capacity)?;

    if config.probe_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "batch.probe_timeout_ms must be > 0".to_string(),
        ));
    }

    if config.probe_timeout() >= analyzer.request_timeout() {
        return Err(ConfigError::Validation(format!(
            "batch.probe_timeout_ms ({}ms) must be shorter than request_timeout_secs ({}s)",
            config.probe_timeout_ms, analyzer.request_timeout_secs
        )));
    }

    Ok(())
}

/// Validates the process-wide governors
fn validate_limits_config(config: &LimitsConfig) -> Result<(), ConfigError> {
    if config.requests_per_second < 1 {
        return Err(ConfigError::Validation(
            "requests_per_second must be >= 1".to_string(),
        ));
    }

    if config.burst < 1 {
        return Err(ConfigError::Validation("burst must be >= 1".to_string()));
    }

    if config.max_memory_mb < 1 {
        return Err(ConfigError::Validation(
            "max_memory_mb must be >= 1".to_string(),
        ));
    }

    // The admission controller counts KiB permits in a u32
    let budget_kib = config.max_memory_mb.saturating_mul(1024);
    if budget_kib > u64::from(u32::MAX) {
        return Err(ConfigError::Validation(format!(
            "max_memory_mb is too large, got {}",
            config.max_memory_mb
        )));
    }

    if config.overhead_multiplier < 1 {
        return Err(ConfigError::Validation(
            "overhead_multiplier must be >= 1".to_string(),
        ));
    }

    if config.assumed_content_length == 0 {
        return Err(ConfigError::Validation(
            "assumed_content_length must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_pool_size(name: &str, value: usize) -> Result<(), ConfigError> {
    if value < 1 || value > MAX_POOL_SIZE {
        return Err(ConfigError::Validation(format!(
            "{} must be between 1 and {}, got {}",
            name, MAX_POOL_SIZE, value
        )));
    }
    Ok(())
}
