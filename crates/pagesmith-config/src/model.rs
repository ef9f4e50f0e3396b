use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default listen address (matches the port the service has always used)
pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
/// Default number of rounds allowed to run at the same time
pub const DEFAULT_MAX_CONCURRENT_ROUNDS: usize = 4;

pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";
/// Existence probes per path before a path is considered new
pub const DEFAULT_PROBE_ATTEMPTS: u32 = 3;
pub const DEFAULT_PROBE_DELAY_MS: u64 = 2_000;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_LLM_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_LLM_MAX_TOKENS: u32 = 8_192;
pub const DEFAULT_LLM_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 180;

pub const DEFAULT_NOTIFY_INITIAL_DELAY_MS: u64 = 1_000;
pub const DEFAULT_NOTIFY_MAX_DELAY_SECS: u64 = 60;
pub const DEFAULT_NOTIFY_BUDGET_SECS: u64 = 600;
pub const DEFAULT_NOTIFY_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_SECRET_ENV: &str = "PAGESMITH_SECRET";

/// Environment variable overriding `[github] owner`
pub const OWNER_ENV: &str = "PAGESMITH_GITHUB_OWNER";
/// Environment variable overriding `[server] bind`
pub const BIND_ENV: &str = "PAGESMITH_BIND";

/// Credential or shared secret read from the environment.
///
/// `Debug` and `Display` never reveal the value; call [`Secret::expose`] at the
/// single point where it is sent upstream or compared.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// On-disk `pagesmith.toml` shape. Every key is optional; absent keys take
/// environment or built-in defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub github: GithubSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub notify: NotifySection,
    #[serde(default)]
    pub auth: AuthSection,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    pub bind: Option<String>,
    pub max_concurrent_rounds: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GithubSection {
    pub owner: Option<String>,
    pub api_base: Option<String>,
    pub branch: Option<String>,
    pub token_env: Option<String>,
    pub probe_attempts: Option<u32>,
    pub probe_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LlmSection {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key_env: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotifySection {
    pub initial_delay_ms: Option<u64>,
    pub max_delay_secs: Option<u64>,
    pub budget_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthSection {
    pub secret_env: Option<String>,
}

/// Resolved, validated, immutable process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub github: GithubConfig,
    pub llm: LlmConfig,
    pub notify: NotifyConfig,
    pub credentials: Credentials,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: String,
    pub max_concurrent_rounds: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubConfig {
    /// Account or organization that owns generated repositories
    pub owner: String,
    pub api_base: String,
    pub branch: String,
    pub probe_attempts: u32,
    pub probe_delay: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Wall-clock budget measured from the first delivery attempt
    pub budget: Duration,
    pub request_timeout: Duration,
}

/// Credentials resolved from the environment at startup.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub github_token: Secret,
    pub llm_api_key: Secret,
    pub shared_secret: Secret,
    /// Env var names the values came from, kept for `pagesmith config`
    pub sources: CredentialSources,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSources {
    pub github_token_env: String,
    pub llm_api_key_env: String,
    pub secret_env: String,
}

impl Default for CredentialSources {
    fn default() -> Self {
        Self {
            github_token_env: DEFAULT_GITHUB_TOKEN_ENV.to_string(),
            llm_api_key_env: DEFAULT_LLM_API_KEY_ENV.to_string(),
            secret_env: DEFAULT_SECRET_ENV.to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            max_concurrent_rounds: DEFAULT_MAX_CONCURRENT_ROUNDS,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            max_tokens: DEFAULT_LLM_MAX_TOKENS,
            temperature: DEFAULT_LLM_TEMPERATURE,
            timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(DEFAULT_NOTIFY_INITIAL_DELAY_MS),
            max_delay: Duration::from_secs(DEFAULT_NOTIFY_MAX_DELAY_SECS),
            budget: Duration::from_secs(DEFAULT_NOTIFY_BUDGET_SECS),
            request_timeout: Duration::from_secs(DEFAULT_NOTIFY_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl GithubConfig {
    /// Defaults for everything except the owner, which has no sensible default.
    #[must_use]
    pub fn for_owner(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            api_base: DEFAULT_GITHUB_API_BASE.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            probe_attempts: DEFAULT_PROBE_ATTEMPTS,
            probe_delay: Duration::from_millis(DEFAULT_PROBE_DELAY_MS),
        }
    }
}
