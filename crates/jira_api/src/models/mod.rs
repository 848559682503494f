mod issue;

pub use issue::{
    ComponentRef, CreatedIssue, IssueCreateRequest, IssueFields, IssueTypeRef, ProjectRef,
    BUG_ISSUE_TYPE,
};
