//! Decides which failures get an issue and submits them.
//!
//! Every record ends in exactly one [`SubmissionOutcome`]; outcomes come
//! back in input order even when submissions run concurrently. Errors on one
//! record are recorded and never stop the rest of the batch. Only a target
//! without a project key aborts the run, before any request is made.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use jira_api::{IssueCreateRequest, IssueSession, JiraError, TicketService};
use log::{info, log_enabled, trace, warn, Level};
use tokio::time::{sleep, timeout, Instant};

use crate::error::Result;
use crate::failure::FailureRecord;
use crate::payload::{IssuePayloadBuilder, IssueTarget};
use crate::retry::RetryPolicy;

pub const DEFAULT_CONCURRENCY: usize = 4;
/// Most submissions ever in flight at once.
pub const MAX_CONCURRENCY: usize = 8;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Decides which failures deserve a new issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilingPolicy {
    /// File every failure, not only the ones new in this build.
    pub create_all: bool,
}

impl FilingPolicy {
    /// Creates a policy; `create_all` files old failures too.
    pub fn new(create_all: bool) -> Self {
        Self { create_all }
    }

    /// True for new failures, or for every failure under `create_all`.
    pub fn is_eligible(&self, record: &FailureRecord) -> bool {
        self.create_all || record.is_first_occurrence()
    }
}

/// Why a submission failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Authentication,
    Transport,
    Timeout,
    RemoteRejection { status: u16 },
    Serialization,
    DeadlineExceeded,
}

impl FailureClass {
    /// Transport-level failures, timeouts included.
    pub fn is_transport(&self) -> bool {
        matches!(self, FailureClass::Transport | FailureClass::Timeout)
    }

    /// Short label used in log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureClass::Authentication => "authentication",
            FailureClass::Transport => "transport",
            FailureClass::Timeout => "timeout",
            FailureClass::RemoteRejection { .. } => "remote rejection",
            FailureClass::Serialization => "serialization",
            FailureClass::DeadlineExceeded => "deadline exceeded",
        }
    }
}

impl From<&JiraError> for FailureClass {
    fn from(err: &JiraError) -> Self {
        match err {
            JiraError::Http { status, .. } => FailureClass::RemoteRejection {
                status: status.as_u16(),
            },
            JiraError::Authentication(_) => FailureClass::Authentication,
            JiraError::Timeout(_) => FailureClass::Timeout,
            JiraError::Network(_) | JiraError::InvalidUrl(_) | JiraError::Other(_) => {
                FailureClass::Transport
            }
            JiraError::Serialization(_) => FailureClass::Serialization,
        }
    }
}

/// Terminal state of one record within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Filed,
    Skipped,
    Failed { class: FailureClass, message: String },
}

impl SubmissionOutcome {
    fn failed(class: FailureClass, message: impl Into<String>) -> Self {
        SubmissionOutcome::Failed {
            class,
            message: message.into(),
        }
    }

    /// True when an issue was created.
    pub fn is_filed(&self) -> bool {
        matches!(self, SubmissionOutcome::Filed)
    }

    /// True when the record was not eligible.
    pub fn is_skipped(&self) -> bool {
        matches!(self, SubmissionOutcome::Skipped)
    }

    /// Classification of a failed outcome, `None` otherwise.
    pub fn failure_class(&self) -> Option<FailureClass> {
        match self {
            SubmissionOutcome::Failed { class, .. } => Some(*class),
            _ => None,
        }
    }
}

/// Outcomes of one run, index-aligned with the input records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionReport {
    pub outcomes: Vec<SubmissionOutcome>,
}

impl SubmissionReport {
    /// Number of records with a created issue.
    pub fn filed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_filed()).count()
    }

    /// Number of records skipped as ineligible.
    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    /// Number of records whose submission failed.
    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.failure_class().is_some())
            .count()
    }

    /// Aggregate line logged at the end of a run.
    pub fn summary_line(&self) -> String {
        format!(
            "{} failure(s) examined: {} filed, {} skipped, {} failed",
            self.outcomes.len(),
            self.filed(),
            self.skipped(),
            self.failed()
        )
    }
}

/// Concurrency, timeout, deadline and retry knobs for one run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Upper bound on submissions in flight at once.
    pub concurrency: usize,
    pub request_timeout: Duration,
    /// Overall budget; once spent no new submissions start.
    pub deadline: Option<Duration>,
    pub retry: RetryPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            deadline: None,
            retry: RetryPolicy::none(),
        }
    }
}

impl PipelineOptions {
    /// Sets the submissions in flight, clamped to `1..=MAX_CONCURRENCY`.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }

    /// Sets the timeout applied to each HTTP call.
    pub fn with_request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = duration;
        self
    }

    /// Sets the overall budget for the run.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets the retry policy for transient failures.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Files issues for a batch of failures.
#[derive(Debug, Clone, Default)]
pub struct IssueSubmissionPipeline {
    options: PipelineOptions,
}

impl IssueSubmissionPipeline {
    /// Creates a pipeline with the given options.
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    /// Options this pipeline runs with.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Processes every record and returns one outcome per record, in input
    /// order. Fails only when the target has no project key.
    pub async fn submit<S>(
        &self,
        records: &[FailureRecord],
        target: &IssueTarget,
        policy: &FilingPolicy,
        client: &S,
    ) -> Result<SubmissionReport>
    where
        S: TicketService,
    {
        target.validate()?;
        let deadline = self.options.deadline.map(|budget| Instant::now() + budget);

        let outcomes = stream::iter(records)
            .map(|record| self.process(record, target, policy, client, deadline))
            .buffered(self.options.concurrency.clamp(1, MAX_CONCURRENCY))
            .collect::<Vec<_>>()
            .await;

        let report = SubmissionReport { outcomes };
        info!("{}", report.summary_line());
        Ok(report)
    }

    async fn process<S>(
        &self,
        record: &FailureRecord,
        target: &IssueTarget,
        policy: &FilingPolicy,
        client: &S,
        deadline: Option<Instant>,
    ) -> SubmissionOutcome
    where
        S: TicketService,
    {
        let name = record.full_name();
        if !policy.is_eligible(record) {
            info!("{}: this issue is old (age {}); not reporting", name, record.age);
            return SubmissionOutcome::Skipped;
        }

        let request = match IssuePayloadBuilder::build(record, target) {
            Ok(payload) => payload.to_request(),
            Err(err) => {
                warn!("{}: could not build issue payload: {}", name, err);
                return SubmissionOutcome::failed(FailureClass::Serialization, err.to_string());
            }
        };
        if log_enabled!(Level::Trace) {
            if let Ok(json) = request.to_json() {
                trace!("{}: JSON payload: {}", name, json);
            }
        }

        let retry = &self.options.retry;
        let mut attempts = 0;
        loop {
            if deadline_passed(deadline) {
                return deadline_exceeded(&name);
            }

            attempts += 1;
            match self.submit_once(client, &request, deadline, &name).await {
                Ok(()) => return SubmissionOutcome::Filed,
                Err(AttemptError::DeadlineExceeded) => return deadline_exceeded(&name),
                Err(AttemptError::Failed(class, message)) => {
                    if class.is_transport() && retry.allows_another(attempts) {
                        let delay = retry.delay_after(attempts);
                        warn!(
                            "{}: attempt {} failed ({}: {}); retrying in {:?}",
                            name,
                            attempts,
                            class.as_str(),
                            message,
                            delay
                        );
                        sleep(delay).await;
                        continue;
                    }
                    warn!("{}: failed to file issue ({}): {}", name, class.as_str(), message);
                    return SubmissionOutcome::failed(class, message);
                }
            }
        }
    }

    /// One attempt. Waiting for a session (connection slot and pacing) is not
    /// timed; only the call itself is. The session is dropped on every path.
    async fn submit_once<S>(
        &self,
        client: &S,
        request: &IssueCreateRequest,
        deadline: Option<Instant>,
        name: &str,
    ) -> std::result::Result<(), AttemptError>
    where
        S: TicketService,
    {
        let mut session = client
            .open_session()
            .await
            .map_err(|err| AttemptError::Failed(FailureClass::from(&err), err.to_string()))?;
        if deadline_passed(deadline) {
            return Err(AttemptError::DeadlineExceeded);
        }

        info!("{}: reporting issue", name);
        match timeout(self.options.request_timeout, session.create_issue(request)).await {
            Ok(Ok(created)) => {
                match created.and_then(|issue| issue.key) {
                    Some(key) => info!("{}: filed {}", name, key),
                    None => info!("{}: filed (no issue key in response)", name),
                }
                Ok(())
            }
            Ok(Err(err)) => Err(AttemptError::Failed(FailureClass::from(&err), err.to_string())),
            Err(_) => Err(AttemptError::Failed(
                FailureClass::Timeout,
                format!("no response within {:?}", self.options.request_timeout),
            )),
        }
    }
}

enum AttemptError {
    DeadlineExceeded,
    Failed(FailureClass, String),
}

fn deadline_passed(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|deadline| Instant::now() >= deadline)
}

fn deadline_exceeded(name: &str) -> SubmissionOutcome {
    warn!("{}: run deadline exceeded; not reporting", name);
    SubmissionOutcome::failed(
        FailureClass::DeadlineExceeded,
        "run deadline exceeded before submission",
    )
}
