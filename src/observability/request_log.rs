//! Request logging interceptor.
//!
//! # Responsibilities
//! - Time every request/response pair
//! - Assemble a structured record (method, path, query, client IP, headers,
//!   status, response time, content type/length, referer)
//! - Hand records to the external log sink off the response path
//!
//! # Design Decisions
//! - Fire-and-forget: the record is queued on an unbounded channel and
//!   persisted by a writer task, so slow log storage never adds latency
//! - Sink failures go to the operational log and never touch the response

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use tokio::sync::mpsc;

/// One logged request/response pair.
#[derive(Debug, Clone)]
pub struct RequestLogRecord {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub client_ip: String,
    pub user_agent: Option<String>,
    /// Newline-joined `key: value1, value2` pairs.
    pub headers: String,
    pub status: u16,
    pub response_time_ms: u64,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub referer: Option<String>,
}

/// External destination for request records.
pub trait LogSink: Send + Sync {
    fn record(
        &self,
        record: RequestLogRecord,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Default sink: structured tracing events.
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn record(
        &self,
        record: RequestLogRecord,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!(
            method = %record.method,
            path = %record.path,
            status = record.status,
            response_time_ms = record.response_time_ms,
            client_ip = %record.client_ip,
            "request"
        );
        Ok(())
    }
}

/// Interceptor installed around every request when logging is enabled.
pub struct RequestLogger {
    tx: mpsc::UnboundedSender<RequestLogRecord>,
}

impl RequestLogger {
    pub fn new(sink: Arc<dyn LogSink>) -> Arc<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<RequestLogRecord>();
        tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                if let Err(e) = sink.record(record) {
                    tracing::warn!(error = %e, "Failed to persist request log record");
                }
            }
        });
        Arc::new(Self { tx })
    }

    /// Middleware body: time the call, run the rest of the stack, queue the
    /// record. The response is returned untouched either way.
    pub async fn handle(self: Arc<Self>, request: Request<Body>, next: Next) -> Response {
        let start = Instant::now();

        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0);
        let method = request.method().to_string();
        let path = request.uri().path().to_string();
        let query = request.uri().query().map(reassemble_query);
        let client_ip = client_ip(request.headers(), peer);
        let user_agent = header_string(request.headers(), header::USER_AGENT);
        let referer = header_string(request.headers(), header::REFERER);
        let headers = join_headers(request.headers());

        let response = next.run(request).await;

        let record = RequestLogRecord {
            method,
            path,
            query,
            client_ip,
            user_agent,
            headers,
            status: response.status().as_u16(),
            response_time_ms: start.elapsed().as_millis() as u64,
            content_type: header_string(response.headers(), header::CONTENT_TYPE),
            content_length: header_string(response.headers(), header::CONTENT_LENGTH)
                .and_then(|v| v.parse().ok()),
            referer,
        };
        if self.tx.send(record).is_err() {
            tracing::warn!("Request log writer gone; dropping record");
        }

        response
    }
}

/// Headers consulted for the original client address, in order.
const CLIENT_IP_HEADERS: [&str; 5] = [
    "x-real-ip",
    "x-client-ip",
    "x-forwarded",
    "forwarded-for",
    "forwarded",
];

/// Resolve the client IP: first hop of `X-Forwarded-For`, then the other
/// forwarding headers, then the transport peer, then `"unknown"`.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded_for) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first_hop) = forwarded_for.split(',').next() {
            let first_hop = first_hop.trim();
            if !first_hop.is_empty() {
                return first_hop.to_string();
            }
        }
    }

    for name in CLIENT_IP_HEADERS {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            if !value.is_empty() {
                return value.to_string();
            }
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Re-join decoded `key=value` pairs with `&`.
fn reassemble_query(raw: &str) -> String {
    url::form_urlencoded::parse(raw.as_bytes())
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn join_headers(headers: &HeaderMap) -> String {
    let mut lines = Vec::new();
    for name in headers.keys() {
        let values: Vec<&str> = headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        lines.push(format!("{name}: {}", values.join(", ")));
    }
    lines.join("\n")
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}
