//! Files Jira issues for failing test cases reported by a build.

pub mod error;
pub mod failure;
pub mod payload;
pub mod pipeline;
pub mod retry;
pub mod runner;
pub mod settings;

pub use error::{ReporterError, Result};
pub use failure::{BuildResults, CaseStatus, FailureRecord};
pub use payload::{IssuePayload, IssuePayloadBuilder, IssueTarget};
pub use pipeline::{
    FailureClass, FilingPolicy, IssueSubmissionPipeline, PipelineOptions, SubmissionOutcome,
    SubmissionReport,
};
pub use retry::RetryPolicy;
pub use runner::{perform, run, RunRequest};
pub use settings::{JobSettings, ReporterSettings, SettingsManager};

/// Installs the process logger; `RUST_LOG` overrides the settings' flags.
pub fn init_logging(settings: &ReporterSettings) {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(settings.log_filter()),
    )
    .format_timestamp_millis()
    .try_init();
}
