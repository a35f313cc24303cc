//! Management-plane client.
//!
//! [`ArmClient::execute`] runs one invocation end to end: validation,
//! request construction, submission, LRO completion and response
//! deserialization.
use crate::commands::CommandSpec;
use crate::config::client::ClientConfig;
use crate::error::ArmctlError;
use crate::invocation::Invocation;
use crate::lro::{Completion, PendingOperation, PollOptions, submit_and_await};
use crate::schema::OperationResult;
use crate::transport::{HttpTransport, Transport};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// How an invocation ended.
#[derive(Debug)]
pub enum Outcome {
    Completed(OperationResult),
    /// Accepted by the service but not awaited.
    Pending(PendingOperation),
}

#[derive(Clone)]
pub struct ArmClient {
    transport: Arc<dyn Transport>,
    endpoint: Url,
    subscription: String,
    poll: PollOptions,
}

impl ArmClient {
    /// A client backed by the reqwest transport.
    pub fn new(config: &ClientConfig) -> Result<Self, ArmctlError> {
        let transport =
            HttpTransport::new(config.request_timeout(), config.access_token.clone())?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    pub fn with_transport(transport: Arc<dyn Transport>, config: &ClientConfig) -> Self {
        Self {
            transport,
            endpoint: config.endpoint.clone(),
            subscription: config.subscription.clone(),
            poll: config.poll_options(),
        }
    }

    pub fn poll_options(&self) -> &PollOptions {
        &self.poll
    }

    /// Runs `spec` with `invocation`.
    ///
    /// Validation errors are returned before any request is sent.
    pub async fn execute(
        &self,
        spec: &CommandSpec,
        invocation: Invocation,
    ) -> Result<Outcome, ArmctlError> {
        let invocation = spec.validate(invocation)?;
        let request = spec.request(&self.endpoint, &self.subscription, &invocation)?;

        info!(command = spec.name, method = %request.method, url = %request.url, "submitting");
        debug!(body = ?request.body, "request body");

        let completion =
            submit_and_await(self.transport.as_ref(), request.into(), &spec.lro, &self.poll)
                .await?;

        match completion {
            Completion::Done(resp) => {
                let result = OperationResult::from_slice(spec.response, &resp.body)?;
                info!(command = spec.name, "operation completed");
                Ok(Outcome::Completed(result))
            }
            Completion::Pending(pending) => Ok(Outcome::Pending(pending)),
        }
    }
}

impl std::fmt::Debug for ArmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmClient")
            .field("endpoint", &self.endpoint)
            .field("subscription", &self.subscription)
            .field("poll", &self.poll)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{HumanDuration, PollInterval};
    use crate::transport::{HttpRequest, HttpResponse, TransportError};
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
        status: StatusCode,
        body: &'static str,
    }

    #[async_trait]
    impl Transport for Counting {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse::new(self.status, self.body))
        }
    }

    fn config() -> ClientConfig {
        ClientConfig {
            endpoint: Url::parse("https://mgmt.test").unwrap(),
            subscription: "sub".into(),
            access_token: None,
            poll_interval: PollInterval::from_secs(1),
            timeout: HumanDuration::from_secs(10),
            request_timeout: HumanDuration::from_secs(10),
            no_wait: false,
        }
    }

    #[cfg(feature = "vmware")]
    #[tokio::test]
    async fn test_validation_never_reaches_transport() {
        let transport = Arc::new(Counting {
            calls: AtomicUsize::new(0),
            status: StatusCode::CREATED,
            body: "{}",
        });
        let client = ArmClient::with_transport(transport.clone(), &config());
        let err = client
            .execute(
                &crate::commands::dns_service::CREATE,
                Invocation::new().with("dns_service", "x"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ArmctlError::Validation(_)));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[cfg(feature = "vmware")]
    #[tokio::test]
    async fn test_schema_mismatch_is_deserialize_error() {
        let transport = Arc::new(Counting {
            calls: AtomicUsize::new(0),
            status: StatusCode::OK,
            body: r#"{"properties": {"revision": "one"}}"#,
        });
        let client = ArmClient::with_transport(transport, &config());
        let err = client
            .execute(
                &crate::commands::dns_service::CREATE,
                Invocation::new()
                    .with("dns_service", "svc")
                    .with("private_cloud", "cloud")
                    .with("resource_group", "rg"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ArmctlError::Deserialize(_)));
    }
}
