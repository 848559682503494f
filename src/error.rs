//! Error model for the reporter core.

use std::io;

use jira_api::JiraError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReporterError>;

/// Errors that stop a run before or instead of filing issues.
#[derive(Debug, Error)]
pub enum ReporterError {
    /// Missing project key; affects every record so the whole run stops.
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Jira(#[from] JiraError),
}
