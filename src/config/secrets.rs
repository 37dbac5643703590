//! Credential Access
//!
//! The Gemini API key lives in the environment, optionally seeded from a
//! local `.env` file. `GEMINI_API` is the primary variable name;
//! `GOOGLE_API_KEY` is accepted as an alias.

use std::sync::Once;
use thiserror::Error;

/// Primary environment variable holding the API key
pub const API_KEY_ENV: &str = "GEMINI_API";
/// Accepted alias for the API key
pub const API_KEY_ENV_ALIAS: &str = "GOOGLE_API_KEY";

static DOTENV_INIT: Once = Once::new();

/// Errors related to credential access
#[derive(Debug, Error)]
pub enum SecretsError {
    #[error("API key not found: set {API_KEY_ENV} (or {API_KEY_ENV_ALIAS}) in the environment or a .env file")]
    NotFound,

    #[error("Invalid API key: {0}")]
    InvalidFormat(String),
}

/// Load the local `.env` file into the environment (idempotent)
pub fn load_dotenv() {
    DOTENV_INIT.call_once(|| {
        if let Ok(path) = dotenv::dotenv() {
            tracing::debug!("Loaded environment from {:?}", path);
        }
    });
}

/// Retrieve and validate the Gemini API key
pub fn gemini_api_key() -> Result<String, SecretsError> {
    load_dotenv();

    let key = std::env::var(API_KEY_ENV)
        .or_else(|_| std::env::var(API_KEY_ENV_ALIAS))
        .map_err(|_| SecretsError::NotFound)?;

    let key = key.trim().to_string();
    validate_api_key(&key)?;
    Ok(key)
}

/// Check whether an API key is configured and well-formed
pub fn has_api_key() -> bool {
    gemini_api_key().is_ok()
}

/// Validate a Google API key.
/// Keys start with "AIza" and are typically 39 characters long.
pub fn validate_api_key(api_key: &str) -> Result<(), SecretsError> {
    let api_key = api_key.trim();

    const MAX_API_KEY_LENGTH: usize = 100;

    if api_key.is_empty() {
        return Err(SecretsError::InvalidFormat(
            "API key cannot be empty".to_string(),
        ));
    }

    if api_key.len() > MAX_API_KEY_LENGTH {
        return Err(SecretsError::InvalidFormat(format!(
            "API key is too long (max {} characters)",
            MAX_API_KEY_LENGTH
        )));
    }

    if !api_key.starts_with("AIza") {
        return Err(SecretsError::InvalidFormat(
            "Google API key must start with 'AIza'".to_string(),
        ));
    }

    if api_key.len() < 30 {
        return Err(SecretsError::InvalidFormat(
            "API key is too short".to_string(),
        ));
    }

    if !api_key
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return Err(SecretsError::InvalidFormat(
            "API key contains invalid characters".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plausible_key() -> String {
        format!("AIza{}", "a".repeat(35))
    }

    #[test]
    fn test_validate_typical_key() {
        assert!(validate_api_key(&plausible_key()).is_ok());
    }

    #[test]
    fn test_validate_trims_whitespace() {
        let key = format!("  {}\n", plausible_key());
        assert!(validate_api_key(&key).is_ok());
    }

    #[test]
    fn test_validate_empty() {
        let result = validate_api_key("");
        match result {
            Err(SecretsError::InvalidFormat(msg)) => assert!(msg.contains("empty")),
            _ => panic!("expected InvalidFormat for empty key"),
        }
    }

    #[test]
    fn test_validate_whitespace_only() {
        assert!(validate_api_key("   ").is_err());
        assert!(validate_api_key("\t\n").is_err());
    }

    #[test]
    fn test_validate_wrong_prefix() {
        let result = validate_api_key("gsk_abcdefghijklmnopqrstuvwxyz0123456789");
        match result {
            Err(SecretsError::InvalidFormat(msg)) => assert!(msg.contains("AIza")),
            _ => panic!("expected InvalidFormat for wrong prefix"),
        }
    }

    #[test]
    fn test_validate_prefix_is_case_sensitive() {
        assert!(validate_api_key(&format!("aiza{}", "a".repeat(35))).is_err());
    }

    #[test]
    fn test_validate_too_short() {
        assert!(validate_api_key("AIzaShort").is_err());
    }

    #[test]
    fn test_validate_too_long() {
        let key = format!("AIza{}", "a".repeat(120));
        assert!(validate_api_key(&key).is_err());
    }

    #[test]
    fn test_validate_invalid_characters() {
        let key = format!("AIza{}!!", "a".repeat(33));
        assert!(validate_api_key(&key).is_err());
    }

    #[test]
    fn test_validate_allows_dash_and_underscore() {
        let key = format!("AIza-_{}", "a".repeat(33));
        assert!(validate_api_key(&key).is_ok());
    }
}
