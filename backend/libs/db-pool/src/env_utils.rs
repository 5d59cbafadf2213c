//! Environment variable parsing utilities
//!
//! Small helpers so configuration loaders never need `unwrap()` on env input.

use std::str::FromStr;

/// Parse an environment variable with a default fallback.
///
/// Missing and unparsable values both fall back to `default`.
pub fn parse_env_with_default<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse an environment variable, returning `None` if missing or invalid.
pub fn parse_env_optional<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Parse an environment variable that must be present and valid.
pub fn parse_env_required<T: FromStr>(key: &str) -> Result<T, String> {
    std::env::var(key)
        .map_err(|_| format!("Environment variable {} not found", key))?
        .parse()
        .map_err(|_| format!("Failed to parse environment variable {}", key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[serial_test::serial]
    fn test_parse_env_with_default() {
        let result: u32 = parse_env_with_default("DB_POOL_TEST_MISSING_XYZ", 42);
        assert_eq!(result, 42);

        std::env::set_var("DB_POOL_TEST_PORT", "8080");
        let result: u16 = parse_env_with_default("DB_POOL_TEST_PORT", 3000);
        assert_eq!(result, 8080);

        std::env::set_var("DB_POOL_TEST_PORT", "not-a-port");
        let result: u16 = parse_env_with_default("DB_POOL_TEST_PORT", 3000);
        assert_eq!(result, 3000);
        std::env::remove_var("DB_POOL_TEST_PORT");
    }

    #[test]
    #[serial_test::serial]
    fn test_parse_env_optional_and_required() {
        assert_eq!(parse_env_optional::<u32>("DB_POOL_TEST_MISSING_XYZ"), None);
        assert!(parse_env_required::<u32>("DB_POOL_TEST_MISSING_XYZ").is_err());

        std::env::set_var("DB_POOL_TEST_REQ", "456");
        assert_eq!(parse_env_optional::<u32>("DB_POOL_TEST_REQ"), Some(456));
        assert_eq!(parse_env_required::<u32>("DB_POOL_TEST_REQ"), Ok(456));
        std::env::remove_var("DB_POOL_TEST_REQ");
    }
}
