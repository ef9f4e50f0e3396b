use std::time::Duration;

use pagesmith_utils::error::ConfigError;

use super::model::*;

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// Use this when embedding pagesmith or in tests, where behavior must not
    /// depend on the process environment or a config file.
    ///
    /// # Example
    ///
    /// ```rust
    /// use pagesmith_config::Config;
    /// use std::time::Duration;
    ///
    /// let config = Config::builder()
    ///     .owner("octo")
    ///     .github_token("ghp_example")
    ///     .llm_api_key("sk-example")
    ///     .shared_secret("let-me-in")
    ///     .probe_delay(Duration::from_millis(250))
    ///     .build()
    ///     .expect("valid config");
    /// assert_eq!(config.github.branch, "main");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for programmatic configuration of pagesmith.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    server: ServerConfig,
    github: GithubConfig,
    llm: LlmConfig,
    notify: NotifyConfig,
    github_token: Option<String>,
    llm_api_key: Option<String>,
    shared_secret: Option<String>,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            server: ServerConfig::default(),
            github: GithubConfig::for_owner(""),
            llm: LlmConfig::default(),
            notify: NotifyConfig::default(),
            github_token: None,
            llm_api_key: None,
            shared_secret: None,
        }
    }

    #[must_use]
    pub fn bind(mut self, bind: impl Into<String>) -> Self {
        self.server.bind = bind.into();
        self
    }

    #[must_use]
    pub fn max_concurrent_rounds(mut self, limit: usize) -> Self {
        self.server.max_concurrent_rounds = limit;
        self
    }

    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.github.owner = owner.into();
        self
    }

    #[must_use]
    pub fn github_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.github.api_base = api_base.into();
        self
    }

    #[must_use]
    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.github.branch = branch.into();
        self
    }

    #[must_use]
    pub fn probe_attempts(mut self, attempts: u32) -> Self {
        self.github.probe_attempts = attempts;
        self
    }

    #[must_use]
    pub fn probe_delay(mut self, delay: Duration) -> Self {
        self.github.probe_delay = delay;
        self
    }

    #[must_use]
    pub fn llm_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.llm.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.llm.model = model.into();
        self
    }

    #[must_use]
    pub fn notify_backoff(mut self, initial: Duration, cap: Duration) -> Self {
        self.notify.initial_delay = initial;
        self.notify.max_delay = cap;
        self
    }

    #[must_use]
    pub fn notify_budget(mut self, budget: Duration) -> Self {
        self.notify.budget = budget;
        self
    }

    #[must_use]
    pub fn github_token(mut self, token: impl Into<String>) -> Self {
        self.github_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn llm_api_key(mut self, key: impl Into<String>) -> Self {
        self.llm_api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn shared_secret(mut self, secret: impl Into<String>) -> Self {
        self.shared_secret = Some(secret.into());
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRequired` if a credential was not provided and
    /// `ConfigError::InvalidValue` if validation fails.
    pub fn build(self) -> Result<Config, ConfigError> {
        let missing = |what: &str| ConfigError::MissingRequired(format!("{what} not provided"));

        let config = Config {
            server: self.server,
            github: self.github,
            llm: self.llm,
            notify: self.notify,
            credentials: Credentials {
                github_token: Secret::new(self.github_token.ok_or_else(|| missing("github token"))?),
                llm_api_key: Secret::new(self.llm_api_key.ok_or_else(|| missing("llm api key"))?),
                shared_secret: Secret::new(
                    self.shared_secret.ok_or_else(|| missing("shared secret"))?,
                ),
                sources: CredentialSources::default(),
            },
        };
        config.validate()?;
        Ok(config)
    }
}
