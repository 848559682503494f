//! Persistent reporter settings and the per-job filing configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use jira_api::{validate_server_address, JiraConfig};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{ReporterError, Result};
use crate::payload::IssueTarget;
use crate::pipeline::FilingPolicy;

/// Default per-request timeout in seconds.
fn default_timeout_secs() -> u64 {
    jira_api::config::DEFAULT_TIMEOUT_SECS
}

/// Server location, credentials and logging flags shared by every job.
#[derive(Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ReporterSettings {
    pub server_address: String,
    pub username: String,
    pub password: String,
    pub debug: bool,
    pub verbose_debug: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ReporterSettings {
    fn default() -> Self {
        Self {
            server_address: String::new(),
            username: String::new(),
            password: String::new(),
            debug: false,
            verbose_debug: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for ReporterSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReporterSettings")
            .field("server_address", &self.server_address)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("debug", &self.debug)
            .field("verbose_debug", &self.verbose_debug)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ReporterSettings {
    /// Server address, always with a trailing slash.
    pub fn server_address(&self) -> String {
        let trimmed = self.server_address.trim();
        if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{}/", trimmed)
        }
    }

    /// Checks the server address the way the settings form does.
    pub fn validate(&self) -> std::result::Result<(), String> {
        validate_server_address(&self.server_address)
    }

    /// Per-request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Client configuration for these server settings.
    pub fn to_client_config(&self) -> JiraConfig {
        JiraConfig::new(self.server_address(), &self.username, &self.password)
            .with_timeout(self.request_timeout())
    }

    /// env_logger filter matching the configured debug flags.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose_debug {
            "info,jira_test_reporter_lib=trace,jira_api=trace"
        } else if self.debug {
            "info,jira_test_reporter_lib=debug,jira_api=debug"
        } else {
            "info"
        }
    }
}

/// Loads and saves [`ReporterSettings`] as JSON in the platform config directory.
pub struct SettingsManager {
    path: PathBuf,
}

impl SettingsManager {
    /// Uses `settings.json` in the platform config directory.
    pub fn new() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("org", "jira-test-reporter", "jira-test-reporter")
            .ok_or_else(|| ReporterError::Config("could not determine config directory".into()))?;
        Ok(Self::with_path(dirs.config_dir().join("settings.json")))
    }

    /// Uses an explicit settings file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the settings file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads settings, falling back to defaults on read/parse errors.
    pub fn load(&self) -> ReporterSettings {
        if !self.path.exists() {
            return ReporterSettings::default();
        }
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) => {
                warn!("Could not read {}: {}", self.path.display(), err);
                return ReporterSettings::default();
            }
        };
        serde_json::from_str(&content).unwrap_or_else(|err| {
            warn!("Ignoring malformed settings in {}: {}", self.path.display(), err);
            ReporterSettings::default()
        })
    }

    /// Persists settings, creating parent directories when needed.
    pub fn save(&self, settings: &ReporterSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Per-job filing configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct JobSettings {
    pub project_key: String,
    pub component: String,
    pub create_all: bool,
}

impl JobSettings {
    /// Project and component issues are filed under.
    pub fn target(&self) -> IssueTarget {
        IssueTarget::new(self.project_key.clone(), self.component.clone())
    }

    /// Eligibility policy for this job.
    pub fn policy(&self) -> FilingPolicy {
        FilingPolicy::new(self.create_all)
    }
}

/// Rejects a blank project key with the form's message.
pub fn validate_project_key(value: &str) -> std::result::Result<(), String> {
    if value.trim().is_empty() {
        Err("You must provide a project key.".to_string())
    } else {
        Ok(())
    }
}
