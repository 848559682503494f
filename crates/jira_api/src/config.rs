use std::time::Duration;

use reqwest::Url;

use crate::error::{JiraError, Result};

pub const ISSUE_ENDPOINT_PATH: &str = "rest/api/2/issue/";
pub const DEFAULT_USER_AGENT: &str = "jira-test-reporter";
pub const DEFAULT_COOLDOWN_MS: u64 = 200;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_CONNECTIONS: usize = 4;

/// Connection settings for one Jira server.
#[derive(Clone)]
pub struct JiraConfig {
    pub server_address: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
    pub cooldown: Duration,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub max_connections: usize,
}

impl std::fmt::Debug for JiraConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraConfig")
            .field("server_address", &self.server_address)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("cooldown", &self.cooldown)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl JiraConfig {
    /// Creates a configuration with default timeouts, cooldown and connection limit.
    pub fn new(
        server_address: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server_address: server_address.into(),
            username: username.into(),
            password: password.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cooldown: Duration::from_millis(DEFAULT_COOLDOWN_MS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Sets the `User-Agent` sent with every request.
    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    /// Sets the minimum interval between request starts.
    pub fn with_cooldown(mut self, duration: Duration) -> Self {
        self.cooldown = duration;
        self
    }

    /// Sets the whole-request timeout of the HTTP client.
    pub fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    /// Sets the connect timeout of the HTTP client.
    pub fn with_connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = duration;
        self
    }

    /// Sets the number of concurrent sessions, at least one.
    pub fn with_max_connections(mut self, connections: usize) -> Self {
        self.max_connections = connections.max(1);
        self
    }

    /// Server address with exactly one trailing slash.
    pub fn server_root(&self) -> String {
        format!("{}/", self.server_address.trim().trim_end_matches('/'))
    }

    /// `<server>/rest/api/2/issue/`
    pub fn issue_endpoint(&self) -> String {
        format!("{}{}", self.server_root(), ISSUE_ENDPOINT_PATH)
    }

    /// Parses the issue endpoint, failing when the server address is not a URL.
    pub fn issue_url(&self) -> Result<Url> {
        Url::parse(&self.issue_endpoint())
            .map_err(|err| JiraError::InvalidUrl(format!("{}: {}", self.server_address, err)))
    }
}

/// Checks a user-supplied server address the same way the settings form does.
pub fn validate_server_address(value: &str) -> std::result::Result<(), String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("You must provide an URL.".to_string());
    }
    Url::parse(trimmed)
        .map(|_| ())
        .map_err(|_| "This is not a valid URL.".to_string())
}
