use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client as HttpClient, StatusCode, Url};
use serde_json::Value;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, trace};

use crate::auth::basic_auth_header;
use crate::config::JiraConfig;
use crate::error::{JiraError, Result};
use crate::models::{CreatedIssue, IssueCreateRequest};
use crate::rate_limiter::RateLimiter;
use crate::service::{IssueSession, TicketService};

/// Jira client handing out paced, slot-bounded sessions.
#[derive(Clone)]
pub struct JiraClient {
    http: HttpClient,
    config: Arc<JiraConfig>,
    limiter: RateLimiter,
    slots: Arc<Semaphore>,
}

impl JiraClient {
    /// Creates a client whose limiter uses the configured cooldown.
    pub fn new(config: JiraConfig) -> Result<Self> {
        let limiter = RateLimiter::new(config.cooldown);
        Self::new_with_limiter(config, limiter)
    }

    /// Creates a client sharing an existing limiter.
    pub fn new_with_limiter(config: JiraConfig, limiter: RateLimiter) -> Result<Self> {
        let http = build_http_client(&config)?;
        let slots = Arc::new(Semaphore::new(config.max_connections.max(1)));
        Ok(Self {
            http,
            config: Arc::new(config),
            limiter,
            slots,
        })
    }

    /// Returns the configuration the client was built with.
    pub fn config(&self) -> &JiraConfig {
        &self.config
    }

    /// Returns the limiter pacing session starts.
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Connection slots not currently held by a session.
    pub fn available_connections(&self) -> usize {
        self.slots.available_permits()
    }
}

#[async_trait]
impl TicketService for JiraClient {
    type Session = JiraSession;

    async fn open_session(&self) -> Result<JiraSession> {
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|err| JiraError::Other(err.to_string()))?;
        self.limiter.hit().await;
        trace!(available = self.slots.available_permits(), "opened Jira session");
        Ok(JiraSession {
            http: self.http.clone(),
            config: self.config.clone(),
            _permit: permit,
        })
    }
}

/// One submission's hold on a connection slot, already paced by the rate
/// limiter; the slot returns to the client when the session is dropped.
pub struct JiraSession {
    http: HttpClient,
    config: Arc<JiraConfig>,
    _permit: OwnedSemaphorePermit,
}

#[async_trait]
impl IssueSession for JiraSession {
    async fn create_issue(&mut self, request: &IssueCreateRequest) -> Result<Option<CreatedIssue>> {
        let url: Url = self.config.issue_url()?;
        let auth = basic_auth_header(&self.config.username, &self.config.password)?;
        let body = request.to_json()?;

        debug!(
            "Creating issue in project {} at URL {}",
            request.fields.project.key, url
        );
        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, auth)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        debug!("statusCode: {}", status.as_u16());
        let text = response.text().await.unwrap_or_default();
        if status == StatusCode::CREATED {
            Ok(serde_json::from_str::<CreatedIssue>(&text).ok())
        } else {
            Err(build_http_error(status, &text))
        }
    }
}

impl Drop for JiraSession {
    fn drop(&mut self) {
        trace!("released Jira session");
    }
}

fn build_http_client(config: &JiraConfig) -> Result<HttpClient> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, header_value(&config.user_agent)?);

    HttpClient::builder()
        .default_headers(headers)
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .build()
        .map_err(|err| JiraError::Other(err.to_string()))
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|err| JiraError::Other(err.to_string()))
}

fn build_http_error(status: StatusCode, body: &str) -> JiraError {
    let message = extract_error_messages(body).unwrap_or_else(|| body.trim().to_string());
    JiraError::http(status, message)
}

/// Flattens Jira's `{"errorMessages": [...], "errors": {field: msg}}` body.
fn extract_error_messages(body: &str) -> Option<String> {
    let value = serde_json::from_str::<Value>(body).ok()?;
    let mut messages: Vec<String> = value
        .get("errorMessages")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if let Some(fields) = value.get("errors").and_then(Value::as_object) {
        for (field, message) in fields {
            if let Some(text) = message.as_str() {
                messages.push(format!("{}: {}", field, text));
            }
        }
    }
    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::{extract_error_messages, JiraClient};
    use crate::config::JiraConfig;
    use crate::error::JiraError;
    use crate::models::{IssueCreateRequest, IssueFields, IssueTypeRef, ProjectRef};
    use crate::service::{IssueSession, TicketService};
    use mockito::Matcher;
    use reqwest::StatusCode;
    use serde_json::json;
    use std::time::Duration;

    fn request() -> IssueCreateRequest {
        IssueCreateRequest {
            fields: IssueFields {
                project: ProjectRef { key: "APP".into() },
                components: None,
                summary: "The test testLogin failed AuthTests: \"quoted\" \\ path".into(),
                description: "Test class: AuthTests -- at AuthTests.testLogin:42".into(),
                issuetype: IssueTypeRef { name: "Bug".into() },
            },
        }
    }

    fn client_for(server: &str) -> JiraClient {
        let config = JiraConfig::new(server, "u", "p")
            .with_cooldown(Duration::ZERO)
            .with_timeout(Duration::from_secs(5));
        JiraClient::new(config).expect("client")
    }

    #[tokio::test]
    async fn created_response_yields_issue_reference() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/api/2/issue/")
            .match_header("authorization", "Basic dTpw")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::to_value(request()).unwrap()))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"10000","key":"APP-1","self":"http://x/rest/api/2/issue/10000"}"#)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let mut session = client.open_session().await.expect("session");
        let created = session.create_issue(&request()).await.expect("created");

        mock.assert_async().await;
        assert_eq!(created.and_then(|issue| issue.key).as_deref(), Some("APP-1"));
    }

    #[tokio::test]
    async fn created_with_unreadable_body_is_still_success() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/rest/api/2/issue/")
            .with_status(201)
            .with_body("<html>ok</html>")
            .create_async()
            .await;

        let client = client_for(&server.url());
        let mut session = client.open_session().await.expect("session");
        let created = session.create_issue(&request()).await.expect("created");
        assert!(created.is_none());
    }

    #[tokio::test]
    async fn other_success_codes_are_rejections() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/rest/api/2/issue/")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = client_for(&server.url());
        let mut session = client.open_session().await.expect("session");
        let err = session.create_issue(&request()).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::OK));
    }

    #[tokio::test]
    async fn server_error_carries_jira_messages() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/rest/api/2/issue/")
            .with_status(400)
            .with_body(
                json!({
                    "errorMessages": ["Bad request"],
                    "errors": {"components": "Component name 'x' is not valid"}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = client_for(&format!("{}/", server.url()));
        let mut session = client.open_session().await.expect("session");
        match session.create_issue(&request()).await {
            Err(JiraError::Http { status, message }) => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(
                    message,
                    "Bad request; components: Component name 'x' is not valid"
                );
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn malformed_server_address_fails_before_sending() {
        let client = client_for("jira.example.com");
        let mut session = client.open_session().await.expect("session");
        let err = session.create_issue(&request()).await.unwrap_err();
        assert!(matches!(err, JiraError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn refused_connection_is_a_network_error() {
        let client = client_for("http://127.0.0.1:1");
        let mut session = client.open_session().await.expect("session");
        let err = session.create_issue(&request()).await.unwrap_err();
        assert!(err.is_transient(), "expected transient error, got {:?}", err);
    }

    #[tokio::test]
    async fn dropping_session_returns_connection_slot() {
        let config = JiraConfig::new("http://127.0.0.1:1", "u", "p").with_max_connections(1);
        let client = JiraClient::new(config).expect("client");

        let first = client.open_session().await.expect("session");
        assert_eq!(client.available_connections(), 0);
        let blocked =
            tokio::time::timeout(Duration::from_millis(50), client.open_session()).await;
        assert!(blocked.is_err());

        drop(first);
        assert_eq!(client.available_connections(), 1);
        let _second = client.open_session().await.expect("session after release");
    }

    #[tokio::test]
    async fn sessions_are_paced_when_opened() {
        let config = JiraConfig::new("http://127.0.0.1:1", "u", "p")
            .with_cooldown(Duration::from_millis(40))
            .with_max_connections(2);
        let client = JiraClient::new(config).expect("client");

        let _first = client.open_session().await.expect("first session");
        let start = tokio::time::Instant::now();
        let _second = client.open_session().await.expect("second session");

        assert!(start.elapsed() >= Duration::from_millis(35));
    }

    #[test]
    fn error_body_without_jira_shape_is_ignored() {
        assert_eq!(extract_error_messages("boom"), None);
        assert_eq!(extract_error_messages(r#"{"errorMessages":[]}"#), None);
    }
}
