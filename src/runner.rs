//! Build-step adapter: examines a build's failed tests and files issues.
//!
//! Filing is best-effort. A run only returns an error for configuration
//! defects (no project key, unusable client settings); failed submissions
//! are reported in the [`SubmissionReport`] and logged.

use jira_api::{JiraClient, TicketService};
use log::{debug, info, log_enabled, warn, Level};

use crate::error::Result;
use crate::failure::{BuildResults, FailureRecord};
use crate::pipeline::{IssueSubmissionPipeline, PipelineOptions, SubmissionReport};
use crate::settings::{JobSettings, ReporterSettings};

/// Everything one build step needs: results, job, server settings and pipeline options.
pub struct RunRequest {
    pub results: BuildResults,
    pub job: JobSettings,
    pub settings: ReporterSettings,
    pub options: PipelineOptions,
}

/// Runs the build step against the Jira server named in the settings.
pub async fn run(request: RunRequest) -> Result<SubmissionReport> {
    if let Err(message) = request.settings.validate() {
        warn!("Server address is not usable ({}); submissions will fail", message);
    }
    let client = JiraClient::new(
        request
            .settings
            .to_client_config()
            .with_max_connections(request.options.concurrency),
    )?;
    perform(&request, &client).await
}

/// Runs the build step against any ticket service.
pub async fn perform<S>(request: &RunRequest, client: &S) -> Result<SubmissionReport>
where
    S: TicketService,
{
    info!("Examining test results...");
    if let Some(status) = &request.results.build_status {
        debug!("Build result is {}", status);
    }

    let failures = &request.results.failed_tests;
    if log_enabled!(Level::Debug) {
        for record in failures {
            log_failure_details(record, &request.job);
        }
    }

    let pipeline = IssueSubmissionPipeline::new(request.options.clone());
    let report = pipeline
        .submit(
            failures,
            &request.job.target(),
            &request.job.policy(),
            client,
        )
        .await?;

    info!("Done.");
    Ok(report)
}

fn log_failure_details(record: &FailureRecord, job: &JobSettings) {
    debug!("projectKey: {}", job.project_key);
    debug!("component: {}", job.component);
    debug!("errorDetails: {}", record.error_details);
    debug!("fullName: {}", record.full_name());
    debug!("title: {}", record.title);
    if let Some(package) = &record.package_name {
        debug!("packageName: {}", package);
    }
    debug!("name: {}", record.name);
    debug!("className: {}", record.class_name);
    if let Some(build) = record.failed_since {
        debug!("failedSince: {}", build);
    }
    debug!("status: {}", record.status.as_str());
    debug!("age: {}", record.age);
    debug!("ErrorStackTrace: {}", record.error_stack_trace);
    debug!("----------------------------");
}
