//! Long-running operation protocol.
//!
//! [`submit_and_await`] sends a mutation request and resolves its final
//! response. A synchronous completion (200/201 under the default policy) is
//! handled as a degenerate poll that issues no further requests. An accepted
//! response (202) creates a [`Poller`] that follows the service supplied
//! polling URL until a terminal status is observed, then applies the
//! final-state-via rule to decide which body is the result.
//!
//! Polling strategies, in order of preference:
//!
//! * `Azure-AsyncOperation` header: the operation body carries `status`.
//! * `Location` header: 202 means in progress, any other 2xx means done.
//! * neither: the original resource is re-read and
//!   `properties.provisioningState` is inspected.
use crate::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

pub const ASYNC_OPERATION: &str = "azure-asyncoperation";
pub const LOCATION: &str = "location";
pub const RETRY_AFTER: &str = "retry-after";

#[derive(Debug, Error)]
pub enum LroError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("operation did not complete within {}; last polled {url}", format_limit(.limit))]
    Timeout { limit: Duration, url: Url },

    #[error("malformed operation response: {0}")]
    Protocol(String),
}

fn format_limit(limit: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*limit)
}

/// A failure reported by the service, either as a non-2xx status or as a
/// failed or canceled operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("({code}) {message}")]
pub struct ServerError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub target: Option<String>,
    pub details: Vec<ErrorDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
}

/// The management-plane error body, `{"error": {...}}` or the bare object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorEnvelope {
    Wrapped { error: ErrorBody },
    Bare(ErrorBody),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    target: Option<String>,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

impl ServerError {
    /// Builds the error from a failed HTTP response.
    pub fn from_response(resp: &HttpResponse) -> Self {
        let parsed = serde_json::from_slice::<ErrorEnvelope>(&resp.body)
            .ok()
            .map(|e| match e {
                ErrorEnvelope::Wrapped { error } => error,
                ErrorEnvelope::Bare(error) => error,
            })
            .filter(|e| e.code.is_some() || e.message.is_some());

        let fallback = || {
            let text = resp.text();
            if text.trim().is_empty() {
                resp.status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            } else {
                text
            }
        };

        match parsed {
            Some(body) => Self {
                status: resp.status,
                code: body.code.unwrap_or_else(|| status_code_name(resp.status)),
                message: body.message.unwrap_or_else(fallback),
                target: body.target,
                details: body.details,
            },
            None => Self {
                status: resp.status,
                code: status_code_name(resp.status),
                message: fallback(),
                target: None,
                details: Vec::new(),
            },
        }
    }

    /// Builds the error for an operation that ended as `Failed` or `Canceled`.
    fn from_operation(resp: &HttpResponse, status: OperationStatus) -> Self {
        let error = resp.json().and_then(|body| {
            body.get("error")
                .cloned()
                .or_else(|| body.pointer("/properties/error").cloned())
        });
        let body = error.and_then(|e| serde_json::from_value::<ErrorBody>(e).ok());

        Self {
            status: resp.status,
            code: body
                .as_ref()
                .and_then(|b| b.code.clone())
                .unwrap_or_else(|| status.to_string()),
            message: body
                .as_ref()
                .and_then(|b| b.message.clone())
                .unwrap_or_else(|| format!("the operation ended with status '{}'", status)),
            target: body.as_ref().and_then(|b| b.target.clone()),
            details: body.map(|b| b.details).unwrap_or_default(),
        }
    }
}

fn status_code_name(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(|r| r.replace(' ', ""))
        .unwrap_or_else(|| status.as_u16().to_string())
}

/// Which response constitutes the final result of an accepted operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinalStateVia {
    /// The operation body's `resourceLocation`, else the original URL for PUT/PATCH.
    /// For POST the operation body itself.
    #[default]
    AzureAsyncOperation,
    /// The terminal response of the location URL when it has a body.
    Location,
    /// Always re-read the original URL.
    OriginalUri,
}

/// Which initial status codes mean "done" and which mean "accepted".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPolicy {
    pub done: &'static [u16],
    pub accepted: &'static [u16],
}

impl StatusPolicy {
    /// PUT create or replace.
    pub const CREATE: Self = Self {
        done: &[200, 201],
        accepted: &[202],
    };

    fn classify(&self, status: StatusCode) -> Option<Initial> {
        let code = status.as_u16();
        if self.accepted.contains(&code) {
            Some(Initial::Accepted)
        } else if self.done.contains(&code) {
            Some(Initial::Done)
        } else {
            None
        }
    }
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self::CREATE
    }
}

enum Initial {
    Done,
    Accepted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LroOptions {
    pub final_state_via: FinalStateVia,
    pub policy: StatusPolicy,
}

/// Caller controls for waiting.
#[derive(Debug, Clone, Copy)]
pub struct PollOptions {
    /// Delay between polls when the service sends no `Retry-After`.
    pub interval: Duration,
    /// Overall bound on polling. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Return as soon as the operation is accepted.
    pub no_wait: bool,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Some(Duration::from_secs(30 * 60)),
            no_wait: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    InProgress,
    Succeeded,
    Failed,
    Canceled,
}

impl OperationStatus {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            "canceled" | "cancelled" => Self::Canceled,
            _ => Self::InProgress,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InProgress => "InProgress",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Canceled => "Canceled",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    AsyncOperation,
    Location,
    ResourceState,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::AsyncOperation => write!(f, "async-operation"),
            Strategy::Location => write!(f, "location"),
            Strategy::ResourceState => write!(f, "resource-state"),
        }
    }
}

/// An accepted operation that was not waited for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOperation {
    pub polling_url: Url,
    pub strategy: Strategy,
}

/// The outcome of [`submit_and_await`].
#[derive(Debug)]
pub enum Completion {
    /// The response whose body is the final resource state.
    Done(HttpResponse),
    Pending(PendingOperation),
}

/// Transient state of one operation.
#[derive(Debug)]
pub struct Poller {
    strategy: Strategy,
    polling_url: Url,
    original_url: Url,
    method: Method,
    final_state_via: FinalStateVia,
    status: OperationStatus,
    retry_after: Option<Duration>,
    polls: u32,
    last: HttpResponse,
}

impl Poller {
    /// A poller for a synchronous completion. It is already terminal.
    fn completed(method: Method, original_url: Url, resp: HttpResponse) -> Self {
        Self {
            strategy: Strategy::ResourceState,
            polling_url: original_url.clone(),
            original_url,
            method,
            final_state_via: FinalStateVia::OriginalUri,
            status: OperationStatus::Succeeded,
            retry_after: None,
            polls: 0,
            last: resp,
        }
    }

    /// A poller for an accepted operation.
    fn accepted(
        method: Method,
        original_url: Url,
        resp: HttpResponse,
        final_state_via: FinalStateVia,
    ) -> Result<Self, LroError> {
        let header_url = |name: &str| -> Result<Option<Url>, LroError> {
            resp.header(name)
                .map(|raw| {
                    original_url
                        .join(raw)
                        .map_err(|e| LroError::Protocol(format!("invalid {} header: {}", name, e)))
                })
                .transpose()
        };

        let (strategy, polling_url) = if let Some(url) = header_url(ASYNC_OPERATION)? {
            (Strategy::AsyncOperation, url)
        } else if let Some(url) = header_url(LOCATION)? {
            (Strategy::Location, url)
        } else {
            (Strategy::ResourceState, original_url.clone())
        };

        Ok(Self {
            strategy,
            polling_url,
            original_url,
            method,
            final_state_via,
            status: OperationStatus::InProgress,
            retry_after: retry_after(&resp),
            polls: 0,
            last: resp,
        })
    }

    pub fn status(&self) -> OperationStatus {
        self.status
    }

    pub fn polls(&self) -> u32 {
        self.polls
    }

    pub fn pending(&self) -> PendingOperation {
        PendingOperation {
            polling_url: self.polling_url.clone(),
            strategy: self.strategy,
        }
    }

    fn observe(&mut self, resp: HttpResponse) -> Result<(), LroError> {
        if !resp.status.is_success() {
            return Err(ServerError::from_response(&resp).into());
        }

        self.retry_after = retry_after(&resp);

        self.status = match self.strategy {
            Strategy::AsyncOperation => {
                let status = resp
                    .json()
                    .and_then(|b| b.get("status").and_then(Value::as_str).map(String::from))
                    .ok_or_else(|| {
                        LroError::Protocol("operation body has no 'status' field".into())
                    })?;
                OperationStatus::parse(&status)
            }
            Strategy::Location => {
                if let Some(url) = resp
                    .header(LOCATION)
                    .and_then(|next| self.polling_url.join(next).ok())
                {
                    self.polling_url = url;
                }
                if resp.status == StatusCode::ACCEPTED {
                    OperationStatus::InProgress
                } else {
                    OperationStatus::Succeeded
                }
            }
            Strategy::ResourceState => resp
                .json()
                .and_then(|b| {
                    b.pointer("/properties/provisioningState")
                        .and_then(Value::as_str)
                        .map(OperationStatus::parse)
                })
                .unwrap_or(OperationStatus::Succeeded),
        };

        self.last = resp;
        Ok(())
    }

    async fn poll_until_terminal(
        &mut self,
        transport: &dyn Transport,
        interval: Duration,
    ) -> Result<(), LroError> {
        while !self.status.is_terminal() {
            let delay = self.retry_after.unwrap_or(interval);
            tokio::time::sleep(delay).await;

            let resp = transport
                .send(HttpRequest::get(self.polling_url.clone()))
                .await?;
            self.polls += 1;
            self.observe(resp)?;

            debug!(
                strategy = %self.strategy,
                status = %self.status,
                polls = self.polls,
                "polled operation"
            );
        }
        Ok(())
    }

    /// Resolves the final response after a successful terminal status.
    async fn finish(self, transport: &dyn Transport) -> Result<HttpResponse, LroError> {
        match self.status {
            OperationStatus::Succeeded => {}
            status => return Err(ServerError::from_operation(&self.last, status).into()),
        }

        let is_put = matches!(self.method, Method::PUT | Method::PATCH);

        let final_url = match (self.strategy, self.final_state_via) {
            // Synchronous completion or resource state polling: the last body is the resource.
            (Strategy::ResourceState, _) => None,
            (_, FinalStateVia::OriginalUri) if is_put => Some(self.original_url.clone()),
            (Strategy::AsyncOperation, FinalStateVia::AzureAsyncOperation)
                if self.method == Method::POST =>
            {
                None
            }
            (Strategy::AsyncOperation, _) => {
                let resource_location = self
                    .last
                    .json()
                    .and_then(|b| b.get("resourceLocation").and_then(Value::as_str).map(String::from))
                    .and_then(|loc| self.original_url.join(&loc).ok());
                match resource_location {
                    Some(url) => Some(url),
                    None if is_put => Some(self.original_url.clone()),
                    None => None,
                }
            }
            (Strategy::Location, _) => {
                if self.last.is_empty() && is_put {
                    Some(self.original_url.clone())
                } else {
                    None
                }
            }
        };

        let Some(url) = final_url else {
            return Ok(self.last);
        };

        debug!(url = %url, "fetching final resource state");
        let resp = transport.send(HttpRequest::get(url)).await?;
        if !resp.status.is_success() {
            return Err(ServerError::from_response(&resp).into());
        }
        Ok(resp)
    }
}

fn retry_after(resp: &HttpResponse) -> Option<Duration> {
    resp.header(RETRY_AFTER)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Sends `request` and awaits the operation it starts.
///
/// Status codes are classified by `lro.policy`. Anything that is neither
/// done nor accepted is returned as a [`ServerError`]. With
/// `poll.no_wait`, an accepted operation returns [`Completion::Pending`]
/// without any follow-up request.
pub async fn submit_and_await(
    transport: &dyn Transport,
    request: HttpRequest,
    lro: &LroOptions,
    poll: &PollOptions,
) -> Result<Completion, LroError> {
    let method = request.method.clone();
    let original_url = request.url.clone();

    let initial = transport.send(request).await?;
    info!(status = initial.status.as_u16(), url = %original_url, "initial response");

    let mut poller = match lro.policy.classify(initial.status) {
        Some(Initial::Done) => Poller::completed(method, original_url, initial),
        Some(Initial::Accepted) => {
            Poller::accepted(method, original_url, initial, lro.final_state_via)?
        }
        None => return Err(ServerError::from_response(&initial).into()),
    };

    if !poller.status().is_terminal() {
        if poll.no_wait {
            let pending = poller.pending();
            info!(url = %pending.polling_url, "operation accepted; not waiting for completion");
            return Ok(Completion::Pending(pending));
        }

        let url = poller.polling_url.clone();
        let run = poller.poll_until_terminal(transport, poll.interval);
        match poll.timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .map_err(|_| LroError::Timeout { limit, url })??,
            None => run.await?,
        }
    }

    poller.finish(transport).await.map(Completion::Done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses and records every request.
    struct Scripted {
        responses: Mutex<VecDeque<HttpResponse>>,
        seen: Mutex<Vec<(Method, String)>>,
    }

    impl Scripted {
        fn new(responses: Vec<HttpResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<(Method, String)> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen
                .lock()
                .unwrap()
                .push((request.method.clone(), request.url.to_string()));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| TransportError::Network("script exhausted".into()))
        }
    }

    fn put() -> HttpRequest {
        HttpRequest {
            method: Method::PUT,
            url: Url::parse("https://mgmt.test/res/1?api-version=1").unwrap(),
            headers: Default::default(),
            body: Some(json!({})),
        }
    }

    fn fast() -> PollOptions {
        PollOptions {
            interval: Duration::from_millis(1),
            timeout: Some(Duration::from_secs(5)),
            no_wait: false,
        }
    }

    fn body(v: Value) -> Vec<u8> {
        serde_json::to_vec(&v).unwrap()
    }

    fn done_body(resp: Completion) -> Value {
        match resp {
            Completion::Done(r) => r.json().unwrap(),
            Completion::Pending(p) => panic!("unexpected pending {:?}", p),
        }
    }

    #[tokio::test]
    async fn test_created_needs_no_polling() {
        let t = Scripted::new(vec![HttpResponse::new(
            StatusCode::CREATED,
            body(json!({"name": "r"})),
        )]);
        let out = submit_and_await(&t, put(), &LroOptions::default(), &fast())
            .await
            .unwrap();
        assert_eq!(done_body(out), json!({"name": "r"}));
        assert_eq!(t.seen().len(), 1);
    }

    #[tokio::test]
    async fn test_async_operation_then_final_get() {
        let t = Scripted::new(vec![
            HttpResponse::new(StatusCode::ACCEPTED, "")
                .with_header("Azure-AsyncOperation", "https://mgmt.test/ops/9")
                .with_header("Retry-After", "0"),
            HttpResponse::new(StatusCode::OK, body(json!({"status": "InProgress"}))),
            HttpResponse::new(StatusCode::OK, body(json!({"status": "Succeeded"}))),
            HttpResponse::new(StatusCode::OK, body(json!({"name": "final"}))),
        ]);
        let out = submit_and_await(&t, put(), &LroOptions::default(), &fast())
            .await
            .unwrap();
        assert_eq!(done_body(out), json!({"name": "final"}));

        let seen = t.seen();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[1], (Method::GET, "https://mgmt.test/ops/9".to_string()));
        assert_eq!(
            seen[3],
            (
                Method::GET,
                "https://mgmt.test/res/1?api-version=1".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_resource_location_is_preferred() {
        let t = Scripted::new(vec![
            HttpResponse::new(StatusCode::ACCEPTED, "")
                .with_header("Azure-AsyncOperation", "/ops/1"),
            HttpResponse::new(
                StatusCode::OK,
                body(json!({"status": "Succeeded", "resourceLocation": "/elsewhere"})),
            ),
            HttpResponse::new(StatusCode::OK, body(json!({"name": "moved"}))),
        ]);
        submit_and_await(&t, put(), &LroOptions::default(), &fast())
            .await
            .unwrap();
        assert_eq!(t.seen()[2].1, "https://mgmt.test/elsewhere");
    }

    #[tokio::test]
    async fn test_location_polling_uses_terminal_body() {
        let t = Scripted::new(vec![
            HttpResponse::new(StatusCode::ACCEPTED, "").with_header("Location", "/loc/1"),
            HttpResponse::new(StatusCode::ACCEPTED, ""),
            HttpResponse::new(StatusCode::OK, body(json!({"name": "via-location"}))),
        ]);
        let lro = LroOptions {
            final_state_via: FinalStateVia::Location,
            ..Default::default()
        };
        let out = submit_and_await(&t, put(), &lro, &fast()).await.unwrap();
        assert_eq!(done_body(out), json!({"name": "via-location"}));
        assert_eq!(t.seen().len(), 3);
    }

    #[tokio::test]
    async fn test_resource_state_polling() {
        let t = Scripted::new(vec![
            HttpResponse::new(StatusCode::ACCEPTED, ""),
            HttpResponse::new(
                StatusCode::OK,
                body(json!({"properties": {"provisioningState": "Updating"}})),
            ),
            HttpResponse::new(
                StatusCode::OK,
                body(json!({"properties": {"provisioningState": "Succeeded"}})),
            ),
        ]);
        let out = submit_and_await(&t, put(), &LroOptions::default(), &fast())
            .await
            .unwrap();
        assert_eq!(
            done_body(out),
            json!({"properties": {"provisioningState": "Succeeded"}})
        );
        assert!(t.seen()[1..].iter().all(|(m, _)| *m == Method::GET));
    }

    #[tokio::test]
    async fn test_original_uri_final_state_ignores_resource_location() {
        let t = Scripted::new(vec![
            HttpResponse::new(StatusCode::ACCEPTED, "")
                .with_header("Azure-AsyncOperation", "/ops/1"),
            HttpResponse::new(
                StatusCode::OK,
                body(json!({"status": "Succeeded", "resourceLocation": "/elsewhere"})),
            ),
            HttpResponse::new(StatusCode::OK, body(json!({"name": "original"}))),
        ]);
        let lro = LroOptions {
            final_state_via: FinalStateVia::OriginalUri,
            ..Default::default()
        };
        let out = submit_and_await(&t, put(), &lro, &fast()).await.unwrap();
        assert_eq!(done_body(out), json!({"name": "original"}));
        assert_eq!(
            t.seen()[2],
            (
                Method::GET,
                "https://mgmt.test/res/1?api-version=1".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_location_empty_terminal_body_reads_original_url() {
        let t = Scripted::new(vec![
            HttpResponse::new(StatusCode::ACCEPTED, "").with_header("Location", "/loc/1"),
            HttpResponse::new(StatusCode::OK, ""),
            HttpResponse::new(StatusCode::OK, body(json!({"name": "reread"}))),
        ]);
        let lro = LroOptions {
            final_state_via: FinalStateVia::Location,
            ..Default::default()
        };
        let out = submit_and_await(&t, put(), &lro, &fast()).await.unwrap();
        assert_eq!(done_body(out), json!({"name": "reread"}));

        let seen = t.seen();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[1].1, "https://mgmt.test/loc/1");
        assert_eq!(seen[2].1, "https://mgmt.test/res/1?api-version=1");
    }

    #[tokio::test]
    async fn test_resource_state_failure_reads_properties_error() {
        let t = Scripted::new(vec![
            HttpResponse::new(StatusCode::ACCEPTED, ""),
            HttpResponse::new(
                StatusCode::OK,
                body(json!({"properties": {
                    "provisioningState": "Failed",
                    "error": {"code": "QuotaExceeded", "message": "no capacity"}
                }})),
            ),
        ]);
        let err = submit_and_await(&t, put(), &LroOptions::default(), &fast())
            .await
            .unwrap_err();
        match err {
            LroError::Server(e) => {
                assert_eq!(e.status, StatusCode::OK);
                assert_eq!(e.code, "QuotaExceeded");
                assert_eq!(e.message, "no capacity");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(t.seen().len(), 2);
    }

    #[tokio::test]
    async fn test_retry_after_overrides_interval() {
        let t = Scripted::new(vec![
            HttpResponse::new(StatusCode::ACCEPTED, "")
                .with_header("Azure-AsyncOperation", "/ops/1")
                .with_header("Retry-After", "0"),
            HttpResponse::new(StatusCode::OK, body(json!({"status": "Running"})))
                .with_header("Retry-After", "0"),
            HttpResponse::new(StatusCode::OK, body(json!({"status": "Succeeded"}))),
            HttpResponse::new(StatusCode::OK, body(json!({"name": "r"}))),
        ]);
        let slow = PollOptions {
            interval: Duration::from_secs(60),
            timeout: Some(Duration::from_secs(120)),
            no_wait: false,
        };
        let out = tokio::time::timeout(
            Duration::from_secs(5),
            submit_and_await(&t, put(), &LroOptions::default(), &slow),
        )
        .await
        .expect("Retry-After should replace the 60s interval")
        .unwrap();
        assert_eq!(done_body(out), json!({"name": "r"}));
        assert_eq!(t.seen().len(), 4);
    }

    #[tokio::test]
    async fn test_no_wait_returns_pending() {
        let t = Scripted::new(vec![
            HttpResponse::new(StatusCode::ACCEPTED, "")
                .with_header("Azure-AsyncOperation", "https://mgmt.test/ops/9"),
        ]);
        let opts = PollOptions {
            no_wait: true,
            ..fast()
        };
        let out = submit_and_await(&t, put(), &LroOptions::default(), &opts)
            .await
            .unwrap();
        match out {
            Completion::Pending(p) => {
                assert_eq!(p.polling_url.as_str(), "https://mgmt.test/ops/9");
                assert_eq!(p.strategy, Strategy::AsyncOperation);
            }
            Completion::Done(_) => panic!("expected pending"),
        }
        assert_eq!(t.seen().len(), 1);
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let t = Scripted::new(vec![HttpResponse::new(
            StatusCode::BAD_REQUEST,
            body(json!({"error": {"code": "InvalidParameter", "message": "bad ip"}})),
        )]);
        let err = submit_and_await(&t, put(), &LroOptions::default(), &fast())
            .await
            .unwrap_err();
        match err {
            LroError::Server(e) => {
                assert_eq!(e.status, StatusCode::BAD_REQUEST);
                assert_eq!(e.code, "InvalidParameter");
                assert_eq!(e.message, "bad ip");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_without_body() {
        let t = Scripted::new(vec![HttpResponse::new(StatusCode::NOT_FOUND, "")]);
        let err = submit_and_await(&t, put(), &LroOptions::default(), &fast())
            .await
            .unwrap_err();
        match err {
            LroError::Server(e) => {
                assert_eq!(e.code, "NotFound");
                assert_eq!(e.message, "Not Found");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_operation() {
        let t = Scripted::new(vec![
            HttpResponse::new(StatusCode::ACCEPTED, "")
                .with_header("Azure-AsyncOperation", "/ops/1"),
            HttpResponse::new(
                StatusCode::OK,
                body(json!({
                    "status": "Failed",
                    "error": {"code": "Conflict", "message": "zone in use"}
                })),
            ),
        ]);
        let err = submit_and_await(&t, put(), &LroOptions::default(), &fast())
            .await
            .unwrap_err();
        match err {
            LroError::Server(e) => {
                assert_eq!(e.code, "Conflict");
                assert_eq!(e.message, "zone in use");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(t.seen().len(), 2);
    }

    #[tokio::test]
    async fn test_canceled_operation_without_error_body() {
        let t = Scripted::new(vec![
            HttpResponse::new(StatusCode::ACCEPTED, "")
                .with_header("Azure-AsyncOperation", "/ops/1"),
            HttpResponse::new(StatusCode::OK, body(json!({"status": "Canceled"}))),
        ]);
        let err = submit_and_await(&t, put(), &LroOptions::default(), &fast())
            .await
            .unwrap_err();
        assert!(matches!(err, LroError::Server(ref e) if e.code == "Canceled"));
    }

    #[tokio::test]
    async fn test_timeout_is_distinct() {
        let mut responses = vec![
            HttpResponse::new(StatusCode::ACCEPTED, "")
                .with_header("Azure-AsyncOperation", "/ops/1"),
        ];
        responses.extend(
            (0..1000).map(|_| HttpResponse::new(StatusCode::OK, body(json!({"status": "Running"})))),
        );
        let t = Scripted::new(responses);
        let opts = PollOptions {
            interval: Duration::from_millis(20),
            timeout: Some(Duration::from_millis(50)),
            no_wait: false,
        };
        let err = submit_and_await(&t, put(), &LroOptions::default(), &opts)
            .await
            .unwrap_err();
        assert!(matches!(err, LroError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_missing_status_is_protocol_error() {
        let t = Scripted::new(vec![
            HttpResponse::new(StatusCode::ACCEPTED, "")
                .with_header("Azure-AsyncOperation", "/ops/1"),
            HttpResponse::new(StatusCode::OK, body(json!({"state": "?"}))),
        ]);
        let err = submit_and_await(&t, put(), &LroOptions::default(), &fast())
            .await
            .unwrap_err();
        assert!(matches!(err, LroError::Protocol(_)));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(OperationStatus::parse("succeeded"), OperationStatus::Succeeded);
        assert_eq!(OperationStatus::parse("Cancelled"), OperationStatus::Canceled);
        assert_eq!(OperationStatus::parse("Accepted"), OperationStatus::InProgress);
    }
}
