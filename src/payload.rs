//! Turns a failing test case into a Jira issue-creation payload.

use jira_api::{
    ComponentRef, IssueCreateRequest, IssueFields, IssueTypeRef, ProjectRef, BUG_ISSUE_TYPE,
};

use crate::error::{ReporterError, Result};
use crate::failure::FailureRecord;

/// Where issues are filed: a required project key and an optional component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueTarget {
    pub project_key: String,
    pub component: String,
}

impl IssueTarget {
    /// Creates a target from a project key and a possibly blank component.
    pub fn new(project_key: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            project_key: project_key.into(),
            component: component.into(),
        }
    }

    /// Rejects a target whose project key is blank.
    pub fn validate(&self) -> Result<()> {
        if self.project_key.trim().is_empty() {
            return Err(ReporterError::InvalidTarget(
                "You must provide a project key.".to_string(),
            ));
        }
        Ok(())
    }

    /// Component to attach as configured, or `None` when it is blank.
    pub fn component_name(&self) -> Option<&str> {
        if self.component.trim().is_empty() {
            None
        } else {
            Some(&self.component)
        }
    }
}

/// Issue contents derived from one failure, before wire encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuePayload {
    pub project_key: String,
    pub component: Option<String>,
    pub summary: String,
    pub description: String,
    pub issue_type: &'static str,
}

impl IssuePayload {
    /// Converts the payload into the issue-creation wire model.
    pub fn to_request(&self) -> IssueCreateRequest {
        IssueCreateRequest {
            fields: IssueFields {
                project: ProjectRef {
                    key: self.project_key.clone(),
                },
                components: self.component.as_ref().map(|name| {
                    vec![ComponentRef {
                        name: name.clone(),
                    }]
                }),
                summary: self.summary.clone(),
                description: self.description.clone(),
                issuetype: IssueTypeRef {
                    name: self.issue_type.to_string(),
                },
            },
        }
    }

    /// Serializes the request body sent to Jira.
    pub fn to_json(&self) -> Result<String> {
        Ok(self.to_request().to_json()?)
    }
}

/// Builds one issue payload per failing test case.
pub struct IssuePayloadBuilder;

impl IssuePayloadBuilder {
    /// Builds the payload for `record`, failing on an invalid target.
    pub fn build(record: &FailureRecord, target: &IssueTarget) -> Result<IssuePayload> {
        target.validate()?;
        Ok(IssuePayload {
            project_key: target.project_key.trim().to_string(),
            component: target.component_name().map(str::to_string),
            summary: Self::summary(record),
            description: Self::description(record),
            issue_type: BUG_ISSUE_TYPE,
        })
    }

    /// `The test <name> failed <class>: <details>`
    pub fn summary(record: &FailureRecord) -> String {
        format!(
            "The test {} failed {}: {}",
            record.name, record.class_name, record.error_details
        )
    }

    /// `Test class: <class> -- <stack trace>`
    pub fn description(record: &FailureRecord) -> String {
        format!(
            "Test class: {} -- {}",
            record.class_name, record.error_stack_trace
        )
    }
}
