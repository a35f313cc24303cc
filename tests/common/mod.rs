//! A scripted management endpoint on a loopback socket.
#![allow(dead_code)]

use armctl::config::client::ClientConfig;
use armctl::config::types::HumanDuration;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

/// One canned response.
#[derive(Debug, Clone)]
pub struct Reply {
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
}

impl Reply {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn json(status: u16, body: Value) -> Self {
        Self::new(status)
            .header("Content-Type", "application/json")
            .body(body.to_string())
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    fn into_response(self) -> Response<Full<Bytes>> {
        let mut builder = Response::builder()
            .status(StatusCode::from_u16(self.status).unwrap());
        for (name, value) in self.headers {
            builder = builder.header(name, value);
        }
        builder.body(Full::new(Bytes::from(self.body))).unwrap()
    }
}

/// A request as the server received it.
#[derive(Debug, Clone)]
pub struct Seen {
    pub method: String,
    /// Path and query.
    pub target: String,
    pub body: Option<Value>,
    pub authorization: Option<String>,
    pub request_id: Option<String>,
}

pub struct MockServer {
    pub base: Url,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl MockServer {
    /// Serves `script(base)` in order, one reply per request, then 500s.
    pub async fn start(script: impl FnOnce(&Url) -> Vec<Reply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();
        let replies = Arc::new(Mutex::new(VecDeque::from(script(&base))));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let recorded = seen.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let replies = replies.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let svc = service_fn(move |req: Request<Incoming>| {
                        let replies = replies.clone();
                        let recorded = recorded.clone();
                        async move {
                            let (method, target, authorization, request_id) = {
                                let header = |name: &str| {
                                    req.headers()
                                        .get(name)
                                        .and_then(|v| v.to_str().ok())
                                        .map(String::from)
                                };
                                (
                                    req.method().to_string(),
                                    req.uri()
                                        .path_and_query()
                                        .map(|p| p.to_string())
                                        .unwrap_or_default(),
                                    header("authorization"),
                                    header("x-ms-client-request-id"),
                                )
                            };
                            let bytes = req.into_body().collect().await?.to_bytes();
                            recorded.lock().unwrap().push(Seen {
                                method,
                                target,
                                body: serde_json::from_slice(&bytes).ok(),
                                authorization,
                                request_id,
                            });
                            let reply = replies
                                .lock()
                                .unwrap()
                                .pop_front()
                                .unwrap_or_else(|| Reply::new(500).body("script exhausted"));
                            Ok::<_, hyper::Error>(reply.into_response())
                        }
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), svc)
                        .await;
                });
            }
        });

        Self { base, seen }
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    /// A client configuration pointed at this server with fast polling.
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            endpoint: self.base.clone(),
            subscription: "sub1".into(),
            access_token: Some("secret-token".parse().unwrap()),
            poll_interval: Duration::from_millis(10).try_into().unwrap(),
            timeout: HumanDuration::from_secs(10),
            request_timeout: HumanDuration::from_secs(5),
            no_wait: false,
        }
    }
}
