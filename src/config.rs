use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "https://backend-fake-review-detection.onrender.com";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub backend_url: String,
    pub host: String,
    pub port: u16,
    pub request_timeout: Duration,
    pub slow_network_after: Duration,
    pub slow_network_hide_after: Duration,
    pub max_upload_bytes: usize,
    pub session_idle_timeout: Duration,
    pub access_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let backend_url = std::env::var("BACKEND_URL")
            .unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = parse_var("PORT", 5001)?;
        let timeout_secs: u64 = parse_var("REQUEST_TIMEOUT_SECS", 60)?;
        let slow_after_ms: u64 = parse_var("SLOW_NETWORK_AFTER_MS", 7000)?;
        let slow_hide_ms: u64 = parse_var("SLOW_NETWORK_HIDE_MS", 5000)?;
        let max_upload_mb: usize = parse_var("MAX_UPLOAD_MB", 25)?;
        let session_idle_mins: u64 = parse_var("SESSION_IDLE_MINS", 120)?;

        let access_password = std::env::var("ACCESS_PASSWORD")
            .ok()
            .filter(|p| !p.is_empty());

        Ok(Self {
            backend_url,
            host,
            port,
            request_timeout: Duration::from_secs(timeout_secs),
            slow_network_after: Duration::from_millis(slow_after_ms),
            slow_network_hide_after: Duration::from_millis(slow_hide_ms),
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            session_idle_timeout: Duration::from_secs(session_idle_mins * 60),
            access_password,
        })
    }

    /// Configuration pointing at an arbitrary backend, used by tests.
    #[cfg(test)]
    pub fn for_backend(backend_url: &str) -> Self {
        Self {
            backend_url: backend_url.trim_end_matches('/').to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            request_timeout: Duration::from_secs(5),
            slow_network_after: Duration::from_millis(7000),
            slow_network_hide_after: Duration::from_millis(5000),
            max_upload_bytes: 1024 * 1024,
            session_idle_timeout: Duration::from_secs(60 * 60),
            access_password: None,
        }
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_variable_uses_default() {
        let port: u16 = parse_var("REVIEWGUARD_TEST_UNSET_PORT", 5001).unwrap();
        assert_eq!(port, 5001);
    }

    #[test]
    fn garbage_number_names_the_variable() {
        std::env::set_var("REVIEWGUARD_TEST_BAD_PORT", "eighty");
        let err = parse_var::<u16>("REVIEWGUARD_TEST_BAD_PORT", 5001).unwrap_err();
        assert!(err.to_string().contains("REVIEWGUARD_TEST_BAD_PORT"));
        std::env::remove_var("REVIEWGUARD_TEST_BAD_PORT");
    }
}
