//! Failing test cases as handed over by the build system.
//!
//! The build step receives a JSON document describing the current build and
//! its failed test cases. Records are read-only once loaded.

use std::path::Path;

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Status of a test case in the current build, as reported by the build system.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    Passed,
    Skipped,
    #[default]
    Failed,
    Fixed,
    Regression,
}

impl CaseStatus {
    /// Name as written by the build system.
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Passed => "PASSED",
            CaseStatus::Skipped => "SKIPPED",
            CaseStatus::Failed => "FAILED",
            CaseStatus::Fixed => "FIXED",
            CaseStatus::Regression => "REGRESSION",
        }
    }
}

/// One failing test case. `age` counts the consecutive builds the failure
/// has been observed in; 1 means it is new in this build.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    pub class_name: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub error_details: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub error_stack_trace: String,
    #[serde(default = "first_occurrence")]
    pub age: u32,
    #[serde(default)]
    pub status: CaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_since: Option<u64>,
}

fn first_occurrence() -> u32 {
    1
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl FailureRecord {
    /// New failure with empty details, first seen in this build.
    pub fn new(class_name: impl Into<String>, name: impl Into<String>) -> Self {
        let class_name = class_name.into();
        let name = name.into();
        Self {
            title: format!("{}.{}", class_name, name),
            class_name,
            name,
            error_details: String::new(),
            error_stack_trace: String::new(),
            age: first_occurrence(),
            status: CaseStatus::Failed,
            package_name: None,
            failed_since: None,
        }
    }

    /// Sets the error message and stack trace.
    pub fn with_error(mut self, details: impl Into<String>, stack_trace: impl Into<String>) -> Self {
        self.error_details = details.into();
        self.error_stack_trace = stack_trace.into();
        self
    }

    /// Sets the number of builds the failure has been seen in.
    pub fn with_age(mut self, age: u32) -> Self {
        self.age = age;
        self
    }

    /// `<class>.<name>`
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.class_name, self.name)
    }

    /// True when the failure is new in this build.
    pub fn is_first_occurrence(&self) -> bool {
        self.age == 1
    }
}

/// Test results of one build as exported by the build system.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct BuildResults {
    #[serde(default)]
    pub build_status: Option<String>,
    #[serde(default)]
    pub failed_tests: Vec<FailureRecord>,
}

impl BuildResults {
    /// Reads an exported results document from `path`.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::{BuildResults, CaseStatus, FailureRecord};
    use std::env;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn decodes_host_record_with_nulls_and_defaults() {
        let record: FailureRecord = serde_json::from_str(
            r#"{
                "className": "AuthTests",
                "name": "testLogin",
                "errorDetails": null,
                "errorStackTrace": "at AuthTests.testLogin:42"
            }"#,
        )
        .expect("decode record");

        assert_eq!(record.error_details, "");
        assert_eq!(record.error_stack_trace, "at AuthTests.testLogin:42");
        assert_eq!(record.age, 1);
        assert_eq!(record.status, CaseStatus::Failed);
        assert!(record.is_first_occurrence());
    }

    #[test]
    fn decodes_status_and_age() {
        let record: FailureRecord = serde_json::from_str(
            r#"{"className":"A","name":"b","age":3,"status":"REGRESSION","failedSince":12}"#,
        )
        .expect("decode record");
        assert_eq!(record.age, 3);
        assert_eq!(record.status, CaseStatus::Regression);
        assert_eq!(record.failed_since, Some(12));
        assert_eq!(record.status.as_str(), "REGRESSION");
    }

    #[test]
    fn full_name_joins_class_and_test() {
        let record = FailureRecord::new("AuthTests", "testLogin");
        assert_eq!(record.full_name(), "AuthTests.testLogin");
        assert_eq!(record.title, "AuthTests.testLogin");
    }

    #[tokio::test]
    async fn loads_build_results_from_file() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        let path = env::temp_dir().join(format!("jira-reporter-results-{nanos}.json"));
        tokio::fs::write(
            &path,
            r#"{"buildStatus":"UNSTABLE","failedTests":[{"className":"A","name":"b","age":2}]}"#,
        )
        .await
        .expect("write results");

        let results = BuildResults::load(&path).await.expect("load results");
        assert_eq!(results.build_status.as_deref(), Some("UNSTABLE"));
        assert_eq!(results.failed_tests.len(), 1);
        assert_eq!(results.failed_tests[0].age, 2);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn missing_results_file_is_an_io_error() {
        let path = env::temp_dir().join("jira-reporter-results-does-not-exist.json");
        assert!(BuildResults::load(&path).await.is_err());
    }
}
