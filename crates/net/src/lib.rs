use std::fmt;
use std::io::Read;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use url::Url;

mod memory;

pub use memory::{MemoryFetcher, Route};

const USER_AGENT: &str = "frugal/0.1";
const MAX_REDIRECTS: u32 = 8;
const MAX_BODY_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Case-insensitive parse of an HTTP method token.
    pub fn parse(value: &str) -> Option<Self> {
        [
            Method::Get,
            Method::Post,
            Method::Put,
            Method::Patch,
            Method::Delete,
        ]
        .into_iter()
        .find(|m| m.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl FetchRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::Get,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// URL as sent on the wire: fragments never leave the client.
    pub fn wire_url(&self) -> Url {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url
    }
}

#[derive(Clone, Debug)]
pub struct FetchResponse {
    /// Final URL after redirects.
    pub url: Url,
    pub requested_url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
    pub duration_ms: u128,
}

impl FetchResponse {
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn redirected(&self) -> bool {
        self.url != self.requested_url
    }
}

#[derive(Debug)]
pub enum NetError {
    InvalidUrl(String),
    Transport(String),
    Body(String),
    /// The worker thread went away without reporting.
    Disconnected,
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::InvalidUrl(url) => write!(f, "invalid response url: {url}"),
            NetError::Transport(err) => write!(f, "transport error: {err}"),
            NetError::Body(err) => write!(f, "failed to read body: {err}"),
            NetError::Disconnected => f.write_str("fetch worker disconnected"),
        }
    }
}

impl std::error::Error for NetError {}

/// Issues a request and reads the whole body as text.
///
/// Non-2xx statuses are responses, not errors; only failures to talk to the server at all
/// are `NetError`s.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, NetError>;
}

/// Blocking HTTP client following redirects.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .redirects(MAX_REDIRECTS)
            .build();
        Self { agent }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, NetError> {
        let start = Instant::now();
        let wire_url = request.wire_url();
        let mut call = self.agent.request(request.method.as_str(), wire_url.as_str());
        for (name, value) in &request.headers {
            call = call.set(name, value);
        }
        let result = match &request.body {
            Some(body) => call.send_bytes(body),
            None => call.call(),
        };
        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(err)) => return Err(NetError::Transport(err.to_string())),
        };

        let final_url = Url::parse(response.get_url())
            .map_err(|_| NetError::InvalidUrl(response.get_url().to_string()))?;
        let status = response.status();
        let content_type = response.header("content-type").map(str::to_string);

        let body = read_body(response.into_reader(), MAX_BODY_BYTES)?;

        log::debug!(
            target: "net",
            "{} {} -> {} ({} bytes)",
            request.method.as_str(),
            wire_url,
            status,
            body.len()
        );

        Ok(FetchResponse {
            url: final_url,
            requested_url: request.url.clone(),
            status,
            content_type,
            body,
            duration_ms: start.elapsed().as_millis(),
        })
    }
}

/// Read a whole body as text, refusing anything longer than `limit` bytes.
fn read_body(reader: impl Read, limit: u64) -> Result<String, NetError> {
    let mut body = String::new();
    reader
        .take(limit.saturating_add(1))
        .read_to_string(&mut body)
        .map_err(|e| NetError::Body(e.to_string()))?;
    if body.len() as u64 > limit {
        return Err(NetError::Body(format!("body exceeds {limit} bytes")));
    }
    Ok(body)
}

/// Run `fetcher` on a worker thread and hand the outcome to `cb` there.
pub fn fetch_in_background(
    fetcher: Arc<dyn Fetcher>,
    request: FetchRequest,
    cb: Arc<dyn Fn(Result<FetchResponse, NetError>) + Send + Sync>,
) {
    thread::spawn(move || {
        let result = fetcher.fetch(&request);
        if let Err(err) = &result {
            log::warn!(target: "net", "fetch {} failed: {err}", request.url);
        }
        cb(result);
    });
}
