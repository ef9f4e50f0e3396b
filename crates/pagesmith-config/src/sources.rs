use std::path::{Path, PathBuf};
use std::time::Duration;

use pagesmith_utils::error::ConfigError;
use tracing::debug;

use super::model::*;

/// File looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "pagesmith.toml";

/// Values supplied on the command line; these win over every other source.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub bind: Option<String>,
    pub owner: Option<String>,
}

impl Config {
    /// Load configuration with precedence CLI > environment > file > defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an explicit config file is missing or malformed,
    /// a credential is not set, or a value fails validation.
    pub fn load(overrides: &CliOverrides) -> Result<Self, ConfigError> {
        let file = discover_file(overrides.config_path.as_deref())?;
        Self::resolve(file.unwrap_or_default(), |key| std::env::var(key).ok(), overrides)
    }

    /// Resolve a parsed file plus an environment lookup into a validated config.
    ///
    /// The environment is injected so resolution stays deterministic in tests.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRequired` for unset credentials or owner and
    /// `ConfigError::InvalidValue` for out-of-range values.
    pub fn resolve<F>(file: FileConfig, env: F, overrides: &CliOverrides) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        let server = ServerConfig {
            bind: overrides
                .bind
                .clone()
                .or_else(|| lookup(BIND_ENV))
                .or(file.server.bind)
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            max_concurrent_rounds: file
                .server
                .max_concurrent_rounds
                .unwrap_or(DEFAULT_MAX_CONCURRENT_ROUNDS),
        };

        let owner = overrides
            .owner
            .clone()
            .or_else(|| lookup(OWNER_ENV))
            .or(file.github.owner)
            .ok_or_else(|| {
                ConfigError::MissingRequired(format!(
                    "repository owner (set [github] owner, {OWNER_ENV}, or --owner)"
                ))
            })?;

        let github = GithubConfig {
            owner,
            api_base: file
                .github
                .api_base
                .unwrap_or_else(|| DEFAULT_GITHUB_API_BASE.to_string()),
            branch: file
                .github
                .branch
                .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            probe_attempts: file
                .github
                .probe_attempts
                .unwrap_or(DEFAULT_PROBE_ATTEMPTS),
            probe_delay: Duration::from_millis(
                file.github.probe_delay_ms.unwrap_or(DEFAULT_PROBE_DELAY_MS),
            ),
        };

        let llm = LlmConfig {
            base_url: file
                .llm
                .base_url
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            model: file
                .llm
                .model
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            max_tokens: file.llm.max_tokens.unwrap_or(DEFAULT_LLM_MAX_TOKENS),
            temperature: file.llm.temperature.unwrap_or(DEFAULT_LLM_TEMPERATURE),
            timeout: Duration::from_secs(file.llm.timeout_secs.unwrap_or(DEFAULT_LLM_TIMEOUT_SECS)),
        };

        let notify = NotifyConfig {
            initial_delay: Duration::from_millis(
                file.notify
                    .initial_delay_ms
                    .unwrap_or(DEFAULT_NOTIFY_INITIAL_DELAY_MS),
            ),
            max_delay: Duration::from_secs(
                file.notify
                    .max_delay_secs
                    .unwrap_or(DEFAULT_NOTIFY_MAX_DELAY_SECS),
            ),
            budget: Duration::from_secs(
                file.notify.budget_secs.unwrap_or(DEFAULT_NOTIFY_BUDGET_SECS),
            ),
            request_timeout: Duration::from_secs(
                file.notify
                    .request_timeout_secs
                    .unwrap_or(DEFAULT_NOTIFY_REQUEST_TIMEOUT_SECS),
            ),
        };

        let sources = CredentialSources {
            github_token_env: file
                .github
                .token_env
                .unwrap_or_else(|| DEFAULT_GITHUB_TOKEN_ENV.to_string()),
            llm_api_key_env: file
                .llm
                .api_key_env
                .unwrap_or_else(|| DEFAULT_LLM_API_KEY_ENV.to_string()),
            secret_env: file
                .auth
                .secret_env
                .unwrap_or_else(|| DEFAULT_SECRET_ENV.to_string()),
        };

        let require = |env_name: &str, what: &str| {
            lookup(env_name).map(Secret::new).ok_or_else(|| {
                ConfigError::MissingRequired(format!(
                    "{what} not found in environment variable '{env_name}'"
                ))
            })
        };

        let credentials = Credentials {
            github_token: require(&sources.github_token_env, "repository host token")?,
            llm_api_key: require(&sources.llm_api_key_env, "generation API key")?,
            shared_secret: require(&sources.secret_env, "shared secret")?,
            sources,
        };

        let config = Self {
            server,
            github,
            llm,
            notify,
            credentials,
        };
        config.validate()?;
        Ok(config)
    }

    /// Render the effective configuration as TOML with credentials redacted.
    #[must_use]
    pub fn render(&self) -> String {
        let view = FileConfig {
            server: ServerSection {
                bind: Some(self.server.bind.clone()),
                max_concurrent_rounds: Some(self.server.max_concurrent_rounds),
            },
            github: GithubSection {
                owner: Some(self.github.owner.clone()),
                api_base: Some(self.github.api_base.clone()),
                branch: Some(self.github.branch.clone()),
                token_env: Some(self.credentials.sources.github_token_env.clone()),
                probe_attempts: Some(self.github.probe_attempts),
                probe_delay_ms: Some(self.github.probe_delay.as_millis() as u64),
            },
            llm: LlmSection {
                base_url: Some(self.llm.base_url.clone()),
                model: Some(self.llm.model.clone()),
                api_key_env: Some(self.credentials.sources.llm_api_key_env.clone()),
                max_tokens: Some(self.llm.max_tokens),
                temperature: Some(self.llm.temperature),
                timeout_secs: Some(self.llm.timeout.as_secs()),
            },
            notify: NotifySection {
                initial_delay_ms: Some(self.notify.initial_delay.as_millis() as u64),
                max_delay_secs: Some(self.notify.max_delay.as_secs()),
                budget_secs: Some(self.notify.budget.as_secs()),
                request_timeout_secs: Some(self.notify.request_timeout.as_secs()),
            },
            auth: AuthSection {
                secret_env: Some(self.credentials.sources.secret_env.clone()),
            },
        };

        // FileConfig holds only plain values, so serialization cannot fail.
        let mut rendered = toml::to_string_pretty(&view).unwrap_or_default();
        rendered.push_str("\n# credentials: github token, generation key, shared secret = [REDACTED]\n");
        rendered
    }
}

/// Read and parse one TOML config file.
///
/// # Errors
///
/// Returns `ConfigError::InvalidFile` when the file cannot be read or parsed.
pub fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidFile {
        path: path.display().to_string(),
        reason,
    };
    let raw = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    toml::from_str(&raw).map_err(|e| invalid(e.to_string()))
}

fn discover_file(explicit: Option<&Path>) -> Result<Option<FileConfig>, ConfigError> {
    if let Some(path) = explicit {
        debug!(path = %path.display(), "Loading explicit configuration file");
        return read_file(path).map(Some);
    }

    let candidate = Path::new(DEFAULT_CONFIG_FILE);
    if candidate.is_file() {
        debug!(path = %candidate.display(), "Discovered configuration file");
        return read_file(candidate).map(Some);
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_with_credentials() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("GITHUB_TOKEN", "ghp_token"),
            ("OPENAI_API_KEY", "sk-key"),
            ("PAGESMITH_SECRET", "shh"),
        ])
    }

    fn resolve_with(
        file: FileConfig,
        env: &HashMap<&'static str, &'static str>,
        overrides: &CliOverrides,
    ) -> Result<Config, ConfigError> {
        Config::resolve(file, |key| env.get(key).map(|v| v.to_string()), overrides)
    }

    fn file_with_owner(owner: &str) -> FileConfig {
        let mut file = FileConfig::default();
        file.github.owner = Some(owner.to_string());
        file
    }

    #[test]
    fn test_defaults_applied() {
        let config = resolve_with(
            file_with_owner("octo"),
            &env_with_credentials(),
            &CliOverrides::default(),
        )
        .unwrap();

        assert_eq!(config.server.bind, DEFAULT_BIND);
        assert_eq!(config.github.branch, "main");
        assert_eq!(config.github.probe_attempts, DEFAULT_PROBE_ATTEMPTS);
        assert_eq!(config.notify.initial_delay, Duration::from_secs(1));
        assert_eq!(config.notify.max_delay, Duration::from_secs(60));
        assert_eq!(config.notify.budget, Duration::from_secs(600));
        assert_eq!(config.credentials.shared_secret.expose(), "shh");
    }

    #[test]
    fn test_precedence_cli_over_env_over_file() {
        let mut env = env_with_credentials();
        env.insert(OWNER_ENV, "from-env");
        env.insert(BIND_ENV, "127.0.0.1:9000");

        let mut file = file_with_owner("from-file");
        file.server.bind = Some("127.0.0.1:7000".to_string());

        let config = resolve_with(file.clone(), &env, &CliOverrides::default()).unwrap();
        assert_eq!(config.github.owner, "from-env");
        assert_eq!(config.server.bind, "127.0.0.1:9000");

        let overrides = CliOverrides {
            owner: Some("from-cli".to_string()),
            bind: Some("127.0.0.1:6000".to_string()),
            ..CliOverrides::default()
        };
        let config = resolve_with(file, &env, &overrides).unwrap();
        assert_eq!(config.github.owner, "from-cli");
        assert_eq!(config.server.bind, "127.0.0.1:6000");
    }

    #[test]
    fn test_missing_owner_is_reported() {
        let err = resolve_with(
            FileConfig::default(),
            &env_with_credentials(),
            &CliOverrides::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(msg) if msg.contains("owner")));
    }

    #[test]
    fn test_missing_credential_names_env_var() {
        let mut env = env_with_credentials();
        env.remove("OPENAI_API_KEY");

        let err = resolve_with(file_with_owner("octo"), &env, &CliOverrides::default())
            .unwrap_err();
        match err {
            ConfigError::MissingRequired(msg) => assert!(msg.contains("OPENAI_API_KEY")),
            other => panic!("Expected MissingRequired, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_credential_env_names() {
        let env = HashMap::from([
            ("GH_PAT", "ghp_token"),
            ("OPENAI_API_KEY", "sk-key"),
            ("secret", "legacy"),
        ]);
        let mut file = file_with_owner("octo");
        file.github.token_env = Some("GH_PAT".to_string());
        file.auth.secret_env = Some("secret".to_string());

        let config = resolve_with(file, &env, &CliOverrides::default()).unwrap();
        assert_eq!(config.credentials.github_token.expose(), "ghp_token");
        assert_eq!(config.credentials.shared_secret.expose(), "legacy");
    }

    #[test]
    fn test_blank_env_value_counts_as_unset() {
        let mut env = env_with_credentials();
        env.insert("PAGESMITH_SECRET", "  ");
        let err = resolve_with(file_with_owner("octo"), &env, &CliOverrides::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(_)));
    }

    #[test]
    fn test_read_file_and_render_redacts() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            tmp,
            "[github]\nowner = \"octo\"\nprobe_delay_ms = 500\n\n[llm]\nmodel = \"gpt-4.1\""
        )
        .unwrap();

        let file = read_file(tmp.path()).unwrap();
        let config = resolve_with(file, &env_with_credentials(), &CliOverrides::default()).unwrap();
        assert_eq!(config.github.probe_delay, Duration::from_millis(500));
        assert_eq!(config.llm.model, "gpt-4.1");

        let rendered = config.render();
        assert!(rendered.contains("owner = \"octo\""));
        assert!(!rendered.contains("ghp_token"));
        assert!(!rendered.contains("sk-key"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn test_read_file_reports_path_on_parse_error() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "[github\nowner = ").unwrap();
        let err = read_file(tmp.path()).unwrap_err();
        match err {
            ConfigError::InvalidFile { path, .. } => {
                assert_eq!(path, tmp.path().display().to_string())
            }
            other => panic!("Expected InvalidFile, got {:?}", other),
        }
    }
}
