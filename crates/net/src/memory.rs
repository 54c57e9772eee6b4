use crate::{FetchRequest, FetchResponse, Fetcher, MAX_REDIRECTS, NetError};
use std::collections::HashMap;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};
use url::Url;

/// Canned answer for one URL.
#[derive(Clone, Debug)]
pub struct Route {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
    /// Answer with a redirect to this URL instead of a body.
    pub redirect_to: Option<String>,
    pub latency: Duration,
}

impl Route {
    pub fn html(body: &str) -> Self {
        Self {
            status: 200,
            content_type: Some("text/html; charset=utf-8".to_string()),
            body: body.to_string(),
            redirect_to: None,
            latency: Duration::ZERO,
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            ..Self::html(body)
        }
    }

    pub fn redirect(to: &str) -> Self {
        Self {
            status: 302,
            content_type: None,
            body: String::new(),
            redirect_to: Some(to.to_string()),
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

/// In-process fetcher serving canned routes, for tests and offline runs.
///
/// Routes are keyed by URL without fragment. Unknown URLs answer `404`. Every request is
/// recorded in arrival order.
#[derive(Default)]
pub struct MemoryFetcher {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, url: &str, route: Route) {
        let key = Url::parse(url).map_or_else(|_| url.to_string(), |u| key_for(&u));
        if let Ok(mut routes) = self.routes.lock() {
            routes.insert(key, route);
        }
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|log| log.len()).unwrap_or(0)
    }

    fn lookup(&self, url: &Url) -> Option<Route> {
        self.routes
            .lock()
            .ok()
            .and_then(|routes| routes.get(&key_for(url)).cloned())
    }
}

fn key_for(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

impl Fetcher for MemoryFetcher {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, NetError> {
        let start = Instant::now();
        if let Ok(mut log) = self.requests.lock() {
            log.push(request.clone());
        }

        let mut current = request.wire_url();
        for _ in 0..=MAX_REDIRECTS {
            let Some(route) = self.lookup(&current) else {
                return Ok(FetchResponse {
                    url: current,
                    requested_url: request.url.clone(),
                    status: 404,
                    content_type: None,
                    body: String::new(),
                    duration_ms: start.elapsed().as_millis(),
                });
            };
            if !route.latency.is_zero() {
                thread::sleep(route.latency);
            }
            if let Some(to) = &route.redirect_to {
                current = current
                    .join(to)
                    .map_err(|_| NetError::InvalidUrl(to.clone()))?;
                continue;
            }
            return Ok(FetchResponse {
                url: current,
                requested_url: request.url.clone(),
                status: route.status,
                content_type: route.content_type,
                body: route.body,
                duration_ms: start.elapsed().as_millis(),
            });
        }
        Err(NetError::Transport(format!(
            "too many redirects from {}",
            request.url
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("url")
    }

    #[test]
    fn follows_redirects_and_reports_final_url() {
        let fetcher = MemoryFetcher::new();
        fetcher.route("https://a.test/old", Route::redirect("/new"));
        fetcher.route("https://a.test/new", Route::html("<p>new</p>"));

        let response = fetcher
            .fetch(&FetchRequest::get(url("https://a.test/old#frag")))
            .expect("fetch");
        assert_eq!(response.url.as_str(), "https://a.test/new");
        assert_eq!(response.requested_url.as_str(), "https://a.test/old#frag");
        assert!(response.redirected());
        assert!(response.is_ok());
        assert_eq!(response.body, "<p>new</p>");
        assert_eq!(fetcher.request_count(), 1);
    }

    #[test]
    fn unknown_route_is_not_found() {
        let fetcher = MemoryFetcher::new();
        let response = fetcher
            .fetch(&FetchRequest::get(url("https://a.test/missing")))
            .expect("fetch");
        assert_eq!(response.status, 404);
        assert!(!response.is_ok());
    }

    #[test]
    fn redirect_loops_are_errors() {
        let fetcher = MemoryFetcher::new();
        fetcher.route("https://a.test/a", Route::redirect("/b"));
        fetcher.route("https://a.test/b", Route::redirect("/a"));
        assert!(matches!(
            fetcher.fetch(&FetchRequest::get(url("https://a.test/a"))),
            Err(NetError::Transport(_))
        ));
    }
}
