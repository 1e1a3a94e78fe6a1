use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Job interval must be positive: {field} = {value}")]
    InvalidJobInterval { field: String, value: u64 },

    #[error("retention_days must be positive")]
    InvalidRetention,

    #[error("Invalid endpoint for {field}: '{url}' (expected http:// or https://)")]
    InvalidEndpoint { field: String, url: String },

    #[error("max_changes_per_batch must be positive")]
    InvalidBatchLimit,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_wal(config)?;
    validate_endpoints(config)?;
    validate_api_limits(config)?;
    Ok(())
}

fn validate_wal(config: &Config) -> Result<(), ValidationError> {
    if config.wal.recovery_interval_secs == 0 {
        return Err(ValidationError::InvalidJobInterval {
            field: "recovery_interval_secs".to_string(),
            value: 0,
        });
    }

    if config.wal.cleanup_interval_secs == 0 {
        return Err(ValidationError::InvalidJobInterval {
            field: "cleanup_interval_secs".to_string(),
            value: 0,
        });
    }

    if config.wal.retention_days == 0 {
        return Err(ValidationError::InvalidRetention);
    }

    Ok(())
}

fn validate_endpoints(config: &Config) -> Result<(), ValidationError> {
    let endpoints = [
        ("indexes.vector.endpoint", &config.indexes.vector.endpoint),
        ("indexes.graph.endpoint", &config.indexes.graph.endpoint),
    ];

    for (field, url) in endpoints {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ValidationError::InvalidEndpoint {
                field: field.to_string(),
                url: url.clone(),
            });
        }
    }

    Ok(())
}

fn validate_api_limits(config: &Config) -> Result<(), ValidationError> {
    if config.server.api.max_changes_per_batch == 0 {
        return Err(ValidationError::InvalidBatchLimit);
    }

    Ok(())
}
