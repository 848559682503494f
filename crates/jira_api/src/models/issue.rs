use serde::{Deserialize, Serialize};

pub const BUG_ISSUE_TYPE: &str = "Bug";

/// Body of `POST rest/api/2/issue/`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct IssueCreateRequest {
    pub fields: IssueFields,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct IssueFields {
    pub project: ProjectRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<ComponentRef>>,
    pub summary: String,
    pub description: String,
    pub issuetype: IssueTypeRef,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ProjectRef {
    pub key: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ComponentRef {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct IssueTypeRef {
    pub name: String,
}

impl IssueCreateRequest {
    /// Serializes the request body.
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string(self).map_err(crate::JiraError::from)
    }
}

/// Reference returned by Jira for a newly created issue.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CreatedIssue {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default, rename = "self")]
    pub self_link: Option<String>,
}
