use super::{types::Config, AuthMethod, CacheBackend, ConfigError};

/// Shortest and longest accepted token length.
const TOKEN_LENGTH_RANGE: std::ops::RangeInclusive<usize> = 4..=64;

/// Validate configuration
/// Currently validates:
/// - Auth section exists (enforced by serde), api_key present for api_key auth
/// - Server port is not 0
/// - Redis backend has a URL
/// - Admission TTLs and timeouts are non-zero, token length is sane
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.auth.method == AuthMethod::ApiKey
        && config.auth.api_key.as_deref().unwrap_or("").is_empty()
    {
        return Err(ConfigError::ValidationError(
            "auth.api_key must be set when auth.method = \"api_key\"".to_string(),
        ));
    }

    if config.cache.backend == CacheBackend::Redis && config.cache.url.is_none() {
        return Err(ConfigError::ValidationError(
            "cache.url must be set when cache.backend = \"redis\"".to_string(),
        ));
    }

    if config.cache.timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "cache.timeout_ms cannot be 0".to_string(),
        ));
    }

    let admission = &config.admission;
    if admission.quota_ttl_secs == 0 || admission.gate_token_ttl_secs == 0 {
        return Err(ConfigError::ValidationError(
            "admission TTLs cannot be 0".to_string(),
        ));
    }

    if admission.call_timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "admission.call_timeout_ms cannot be 0".to_string(),
        ));
    }

    if !TOKEN_LENGTH_RANGE.contains(&admission.token_length) {
        return Err(ConfigError::ValidationError(format!(
            "admission.token_length must be within {}..={}",
            TOKEN_LENGTH_RANGE.start(),
            TOKEN_LENGTH_RANGE.end()
        )));
    }

    Ok(())
}
