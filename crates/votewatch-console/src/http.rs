//! Same-origin JSON client for the voting cluster API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Method, Url};
use serde_json::Value;

use votewatch_protocol::{
    MembershipSnapshot, PollSnapshot, VoteReceipt, VoteRequest, POLL_PATH_PREFIX, STATUS_PATH,
    VOTE_PATH,
};

use crate::ClientError;

/// Method, headers and body of one request. Defaults to a bare `GET`.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: Vec::new(),
            body: None,
        }
    }
}

impl RequestOptions {
    /// A `POST` carrying `body` as JSON.
    pub fn post_json(body: Value) -> Self {
        Self {
            method: Method::POST,
            headers: Vec::new(),
            body: Some(body),
        }
    }
}

/// The three backend calls the monitor engine depends on.
#[async_trait]
pub trait MonitorBackend: Send + Sync {
    /// `GET /poll/{poll_id}`.
    async fn fetch_poll(&self, poll_id: &str) -> Result<PollSnapshot, ClientError>;

    /// `GET /status`.
    async fn fetch_status(&self) -> Result<MembershipSnapshot, ClientError>;

    /// `POST /vote`.
    async fn submit_vote(&self, vote: &VoteRequest) -> Result<VoteReceipt, ClientError>;

    /// Origin every request is resolved against, for display.
    fn origin(&self) -> String;
}

/// reqwest-backed client bound to a single origin.
pub struct HttpClient {
    origin: Url,
    client: Client,
}

impl HttpClient {
    /// Create a client for `origin`. With `timeout = None` requests only
    /// fail when the transport itself gives up.
    pub fn new(origin: &str, timeout: Option<Duration>) -> Result<Self, ClientError> {
        let origin = Url::parse(origin.trim_end_matches('/'))
            .map_err(|e| ClientError::InvalidPath(format!("{origin} ({e})")))?;
        if origin.cannot_be_a_base() {
            return Err(ClientError::InvalidPath(origin.to_string()));
        }

        let mut builder = ClientBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self { origin, client })
    }

    /// Issue a request against an origin-relative `path` and parse the JSON
    /// body. An empty success body parses as `null`.
    pub async fn request(&self, path: &str, options: RequestOptions) -> Result<Value, ClientError> {
        let url = self.resolve(path)?;
        let body = self.execute(url, options).await?;
        parse_body(&body)
    }

    /// Resolve `path` against the origin, refusing anything that would
    /// leave it.
    pub fn resolve(&self, path: &str) -> Result<Url, ClientError> {
        let url = self
            .origin
            .join(path)
            .map_err(|_| ClientError::InvalidPath(path.to_string()))?;
        if url.origin() != self.origin.origin() {
            return Err(ClientError::InvalidPath(path.to_string()));
        }
        Ok(url)
    }

    /// URL of the tally for `poll_id`, which is encoded as a single path
    /// segment.
    pub fn poll_url(&self, poll_id: &str) -> Result<Url, ClientError> {
        let mut url = self.origin.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidPath(self.origin.to_string()))?
            .clear()
            .push(POLL_PATH_PREFIX.trim_start_matches('/'))
            .push(poll_id);
        Ok(url)
    }

    async fn execute(&self, url: Url, options: RequestOptions) -> Result<String, ClientError> {
        let method = options.method.clone();
        tracing::debug!(method = %method, url = %url, "backend request");

        let mut request = self.client.request(options.method, url.clone());
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::debug!(method = %method, url = %url, error = %e, "transport failure");
            ClientError::from(e)
        })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::debug!(
                method = %method,
                url = %url,
                status = status.as_u16(),
                "backend rejected request"
            );
            return Err(ClientError::Http {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_string(),
                body,
            });
        }

        Ok(body)
    }
}

fn parse_body(body: &str) -> Result<Value, ClientError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| ClientError::Decode(e.to_string()))
}

#[async_trait]
impl MonitorBackend for HttpClient {
    async fn fetch_poll(&self, poll_id: &str) -> Result<PollSnapshot, ClientError> {
        let poll_id = poll_id.trim();
        let url = self.poll_url(poll_id)?;
        let body = self.execute(url, RequestOptions::default()).await?;
        Ok(PollSnapshot::from_json(poll_id, parse_body(&body)?)?)
    }

    async fn fetch_status(&self) -> Result<MembershipSnapshot, ClientError> {
        let raw = self.request(STATUS_PATH, RequestOptions::default()).await?;
        Ok(MembershipSnapshot::from_json(raw)?)
    }

    async fn submit_vote(&self, vote: &VoteRequest) -> Result<VoteReceipt, ClientError> {
        let body = vote.to_json()?;
        let url = self.resolve(VOTE_PATH)?;
        let text = self.execute(url, RequestOptions::post_json(body)).await?;
        // The status code alone decides success; the body is informational.
        let receipt = serde_json::from_str::<Value>(&text)
            .map(|v| VoteReceipt::from_json(&v))
            .unwrap_or_default();
        Ok(receipt)
    }

    fn origin(&self) -> String {
        self.origin.origin().ascii_serialization()
    }
}
