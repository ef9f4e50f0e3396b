use pagesmith_utils::error::ConfigError;

use super::model::Config;

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

impl Config {
    /// Validate configuration values
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(invalid("server.bind", "must be a socket address like 0.0.0.0:8000"));
        }
        if self.server.max_concurrent_rounds == 0 {
            return Err(invalid("server.max_concurrent_rounds", "must be greater than 0"));
        }

        let owner = self.github.owner.trim();
        if owner.is_empty() {
            return Err(invalid("github.owner", "must not be empty"));
        }
        if owner.contains('/') || owner.contains(char::is_whitespace) {
            return Err(invalid("github.owner", "must be a bare account name"));
        }
        if !self.github.api_base.starts_with("http://") && !self.github.api_base.starts_with("https://") {
            return Err(invalid("github.api_base", "must be an http(s) URL"));
        }
        if self.github.branch.trim().is_empty() {
            return Err(invalid("github.branch", "must not be empty"));
        }
        if self.github.probe_attempts == 0 {
            return Err(invalid("github.probe_attempts", "must be at least 1"));
        }
        if self.github.probe_attempts > 20 {
            return Err(invalid("github.probe_attempts", "exceeds maximum of 20"));
        }

        if self.llm.model.trim().is_empty() {
            return Err(invalid("llm.model", "must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(invalid("llm.temperature", "must be between 0.0 and 2.0"));
        }
        if self.llm.max_tokens == 0 {
            return Err(invalid("llm.max_tokens", "must be greater than 0"));
        }
        if self.llm.timeout.is_zero() {
            return Err(invalid("llm.timeout_secs", "must be greater than 0"));
        }

        if self.notify.initial_delay.is_zero() {
            return Err(invalid("notify.initial_delay_ms", "must be greater than 0"));
        }
        if self.notify.max_delay < self.notify.initial_delay {
            return Err(invalid(
                "notify.max_delay_secs",
                "must not be smaller than notify.initial_delay_ms",
            ));
        }
        if self.notify.budget.is_zero() {
            return Err(invalid("notify.budget_secs", "must be greater than 0"));
        }
        if self.notify.request_timeout.is_zero() {
            return Err(invalid("notify.request_timeout_secs", "must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn valid() -> Config {
        Config::builder()
            .owner("octo")
            .github_token("ghp_x")
            .llm_api_key("sk-x")
            .shared_secret("s")
            .build()
            .unwrap()
    }

    fn assert_invalid_key(config: Config, expected_key: &str) {
        match config.validate() {
            Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, expected_key),
            other => panic!("Expected InvalidValue for {expected_key}, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_probe_attempts() {
        let mut config = valid();
        config.github.probe_attempts = 0;
        assert_invalid_key(config, "github.probe_attempts");
    }

    #[test]
    fn test_rejects_owner_with_slash() {
        let mut config = valid();
        config.github.owner = "octo/repo".to_string();
        assert_invalid_key(config, "github.owner");
    }

    #[test]
    fn test_rejects_cap_below_initial_delay() {
        let mut config = valid();
        config.notify.initial_delay = Duration::from_secs(10);
        config.notify.max_delay = Duration::from_secs(5);
        assert_invalid_key(config, "notify.max_delay_secs");
    }

    #[test]
    fn test_rejects_bad_bind_address() {
        let mut config = valid();
        config.server.bind = "localhost".to_string();
        assert_invalid_key(config, "server.bind");
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let mut config = valid();
        config.server.max_concurrent_rounds = 0;
        assert_invalid_key(config, "server.max_concurrent_rounds");
    }
}
