//! Client seam between the submission pipeline and a ticket service.
//!
//! A submission opens a session, creates one issue through it and drops it.
//! Dropping an [`IssueSession`] releases whatever connection resources it
//! holds, so release happens on every exit path including errors and
//! cancelled futures.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CreatedIssue, IssueCreateRequest};

#[async_trait]
pub trait TicketService: Send + Sync {
    type Session: IssueSession;

    /// Acquires a connection slot for one submission.
    async fn open_session(&self) -> Result<Self::Session>;
}

#[async_trait]
pub trait IssueSession: Send {
    /// Creates an issue. `Ok` only when the service answered `201 Created`;
    /// the decoded reference is `None` when the body was not understood.
    async fn create_issue(&mut self, request: &IssueCreateRequest) -> Result<Option<CreatedIssue>>;
}
