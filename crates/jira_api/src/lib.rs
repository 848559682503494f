//! Typed Jira issue-creation client crate used by the test reporter.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod rate_limiter;
pub mod service;

pub use client::{JiraClient, JiraSession};
pub use config::{validate_server_address, JiraConfig};
pub use error::{JiraError, Result};
pub use models::{
    ComponentRef, CreatedIssue, IssueCreateRequest, IssueFields, IssueTypeRef, ProjectRef,
    BUG_ISSUE_TYPE,
};
pub use service::{IssueSession, TicketService};

pub use reqwest::StatusCode;
