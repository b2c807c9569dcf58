use std::time::Duration;

use payperagent::{
    user_agent, PayPerAgentError, DEFAULT_GATEWAY_URL, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS,
};

/// Connection and retry settings for a [`PayPerAgentClient`](crate::PayPerAgentClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub gateway_url: String,
    /// Retry with a payment proof on 402 when a signer is configured.
    pub auto_retry: bool,
    /// Upper bound on signed retries per request.
    pub max_retries: u32,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            auto_retry: true,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: user_agent(),
        }
    }
}

impl ClientConfig {
    pub fn new(gateway_url: impl Into<String>) -> Self {
        Self {
            gateway_url: gateway_url.into(),
            ..Self::default()
        }
    }

    /// Read settings from the environment, falling back to defaults.
    ///
    /// - `PAYPERAGENT_GATEWAY_URL` (or `API_URL`)
    /// - `PAYPERAGENT_AUTO_RETRY` (`true`/`false`/`1`/`0`)
    /// - `PAYPERAGENT_MAX_RETRIES`
    /// - `PAYPERAGENT_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let gateway_url = non_empty_var("PAYPERAGENT_GATEWAY_URL")
            .or_else(|| non_empty_var("API_URL"))
            .unwrap_or(defaults.gateway_url);

        let auto_retry = std::env::var("PAYPERAGENT_AUTO_RETRY")
            .ok()
            .and_then(|v| parse_bool(&v))
            .unwrap_or(defaults.auto_retry);

        let max_retries = std::env::var("PAYPERAGENT_MAX_RETRIES")
            .ok()
            .and_then(|r| r.trim().parse().ok())
            .unwrap_or(defaults.max_retries);

        let timeout = std::env::var("PAYPERAGENT_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.trim().parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        Self {
            gateway_url,
            auto_retry,
            max_retries,
            timeout,
            user_agent: defaults.user_agent,
        }
    }

    /// Check the gateway URL and strip trailing slashes so endpoints can be appended.
    pub fn validated(mut self) -> Result<Self, PayPerAgentError> {
        let trimmed = self.gateway_url.trim().trim_end_matches('/').to_string();
        let parsed = url::Url::parse(&trimmed).map_err(|e| {
            PayPerAgentError::ConfigError(format!("invalid gateway URL {trimmed:?}: {e}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PayPerAgentError::ConfigError(format!(
                "gateway URL must be http(s), got {}",
                parsed.scheme()
            )));
        }
        if self.timeout.is_zero() {
            return Err(PayPerAgentError::ConfigError(
                "timeout must be greater than zero".to_string(),
            ));
        }
        self.gateway_url = trimmed;
        Ok(self)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
