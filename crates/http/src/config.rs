//! Client configuration

use crate::error::{ApiError, ApiResult};
use gridlink_sheet::LoadOptions;
use std::fmt;
use std::time::Duration;

/// Production API root
pub const DEFAULT_API_ROOT: &str = "https://api.smartsheet.com/2.0";

/// Environment variable holding the API token
pub const ENV_TOKEN: &str = "GRIDLINK_API_TOKEN";
/// Environment variable overriding the API root
pub const ENV_API_ROOT: &str = "GRIDLINK_API_ROOT";
/// Environment variable switching strict validation on
pub const ENV_STRICT_VALIDATION: &str = "GRIDLINK_STRICT_VALIDATION";

/// Configuration for [`Client`](crate::Client)
#[derive(Clone)]
pub struct ClientConfig {
    /// API root every endpoint is appended to
    pub api_root: String,

    /// Bearer token attached to every request
    pub token: String,

    /// Total request timeout
    pub timeout: Duration,

    /// User-Agent header value
    pub user_agent: String,

    /// Reject unknown wire fields while loading objects
    pub strict_validation: bool,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_root", &self.api_root)
            .field("token", &"***")
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("strict_validation", &self.strict_validation)
            .finish()
    }
}

impl ClientConfig {
    /// Create a config for the given token with default values
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            api_root: DEFAULT_API_ROOT.to_string(),
            token: token.into(),
            timeout: Duration::from_secs(30),
            user_agent: format!("gridlink/{}", env!("CARGO_PKG_VERSION")),
            strict_validation: false,
        }
    }

    /// Set the API root
    #[must_use]
    pub fn api_root(mut self, url: impl Into<String>) -> Self {
        self.api_root = url.into();
        self
    }

    /// Set the total timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set timeout from seconds
    #[must_use]
    pub fn timeout_secs(mut self, secs: f64) -> Self {
        self.timeout = Duration::from_secs_f64(secs);
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Enable/disable strict validation of loaded objects
    #[must_use]
    pub fn strict_validation(mut self, strict: bool) -> Self {
        self.strict_validation = strict;
        self
    }

    /// Options passed to every object load
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            strict_validation: self.strict_validation,
        }
    }

    /// Read the configuration from the process environment
    pub fn from_env() -> ApiResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> ApiResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup(ENV_TOKEN)
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| ApiError::Config(format!("{ENV_TOKEN} is not set")))?;

        let mut config = Self::new(token);
        if let Some(root) = lookup(ENV_API_ROOT).filter(|root| !root.trim().is_empty()) {
            config.api_root = root;
        }
        config.strict_validation = lookup(ENV_STRICT_VALIDATION).is_some_and(|v| is_truthy(&v));
        Ok(config)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "yes" | "true" | "y" | "1"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("t");
        assert_eq!(config.api_root, DEFAULT_API_ROOT);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(!config.load_options().strict_validation);
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::new("t")
            .api_root("http://localhost:9000")
            .timeout_secs(2.5)
            .user_agent("test")
            .strict_validation(true);
        assert_eq!(config.api_root, "http://localhost:9000");
        assert_eq!(config.timeout, Duration::from_millis(2500));
        assert_eq!(config.user_agent, "test");
        assert!(config.load_options().strict_validation);
    }

    #[test]
    fn test_debug_hides_token() {
        let debug = format!("{:?}", ClientConfig::new("secret-token"));
        assert!(!debug.contains("secret-token"));
    }

    #[test]
    fn test_from_lookup() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_TOKEN, "abc"),
            (ENV_API_ROOT, "http://127.0.0.1:1234"),
            (ENV_STRICT_VALIDATION, "Yes"),
        ]))
        .unwrap();
        assert_eq!(config.token, "abc");
        assert_eq!(config.api_root, "http://127.0.0.1:1234");
        assert!(config.strict_validation);
    }

    #[test]
    fn test_from_lookup_requires_token() {
        let err = ClientConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn test_truthy_values() {
        for value in ["yes", "TRUE", "y", "1", " True "] {
            assert!(is_truthy(value), "{value}");
        }
        for value in ["no", "0", "false", "", "on"] {
            assert!(!is_truthy(value), "{value}");
        }
    }
}
