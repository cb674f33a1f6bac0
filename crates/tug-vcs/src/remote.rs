//! Remote filesystem: the single HTTP seam every driver fetches through.
//!
//! A [`RemoteFilesystem`] performs one GET per call and hands back the body
//! together with the headers drivers care about (`Link` pagination). Non-2xx
//! answers never reach the caller as a response: they are mapped to
//! [`Error::Transport`] or [`Error::RateLimited`].

use backon::{ExponentialBuilder, Retryable};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, LINK};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};
use tug_config::Config;
use tug_core::{BoxFuture, Error, Result};

#[cfg(any(test, feature = "testing"))]
use dashmap::DashMap;

static NEXT_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<(.+?)>; *rel="next""#).expect("invalid link regex"));

/// Accept header for the GitHub REST API.
const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// A successful response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResponse {
    /// Requested URL.
    pub url: String,
    /// HTTP status.
    pub status: u16,
    /// Response body.
    pub body: String,
    /// Raw `Link` header.
    pub link: Option<String>,
}

impl RemoteResponse {
    /// URL of the next page announced by the `Link` header.
    #[must_use]
    pub fn next_page(&self) -> Option<String> {
        self.link.as_deref().and_then(parse_next_link)
    }
}

/// Extract the `rel="next"` target of a `Link` header; the first one wins.
#[must_use]
pub fn parse_next_link(header: &str) -> Option<String> {
    header
        .split(',')
        .find_map(|link| NEXT_LINK.captures(link).map(|caps| caps[1].to_string()))
}

/// Fetch collaborator used by the VCS drivers.
pub trait RemoteFilesystem: Send + Sync + std::fmt::Debug {
    /// GET `url` on behalf of `origin`, the VCS host whose credentials apply.
    ///
    /// # Errors
    /// Returns [`Error::Transport`] for network failures and non-2xx answers,
    /// [`Error::RateLimited`] when the API quota is exhausted.
    fn get<'a>(&'a self, origin: &'a str, url: &'a str) -> BoxFuture<'a, Result<RemoteResponse>>;
}

/// `reqwest` backed remote filesystem.
#[derive(Clone)]
pub struct HttpRemoteFilesystem {
    client: Client,
    config: Arc<Config>,
}

impl std::fmt::Debug for HttpRemoteFilesystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRemoteFilesystem")
            .field("client", &"reqwest::Client")
            .field("retries", &self.config.http.retries)
            .finish()
    }
}

impl HttpRemoteFilesystem {
    /// Build a client from the HTTP section of `config`.
    ///
    /// # Errors
    /// Returns error if the client cannot be built.
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.http.timeout())
            .user_agent(config.http.user_agent.clone())
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    async fn fetch(&self, origin: &str, url: &str) -> Result<RemoteResponse> {
        let mut request = self.client.get(url).header(ACCEPT, GITHUB_ACCEPT);
        if let Some(token) = self.config.github_token(origin) {
            request = request.header(AUTHORIZATION, format!("token {token}"));
        }

        trace!(url, origin, "GET");
        let response = request.send().await.map_err(|e| transport(url, &e))?;
        let status = response.status();
        let headers = response.headers().clone();

        if let Some(err) = rate_limit(url, status, &headers) {
            return Err(err);
        }
        if !status.is_success() {
            debug!(url, status = status.as_u16(), "request failed");
            return Err(Error::http_status(url, status.as_u16()));
        }

        let body = response.text().await.map_err(|e| transport(url, &e))?;

        Ok(RemoteResponse {
            url: url.to_string(),
            status: status.as_u16(),
            body,
            link: header(&headers, LINK.as_str()),
        })
    }
}

impl RemoteFilesystem for HttpRemoteFilesystem {
    fn get<'a>(&'a self, origin: &'a str, url: &'a str) -> BoxFuture<'a, Result<RemoteResponse>> {
        Box::pin(async move {
            let backoff = ExponentialBuilder::default()
                .with_min_delay(Duration::from_millis(200))
                .with_max_times(self.config.http.retries);

            (|| self.fetch(origin, url))
                .retry(backoff)
                .when(|e: &Error| matches!(e, Error::Transport { .. }) && e.is_retryable())
                .notify(|e: &Error, delay: Duration| {
                    warn!(url, error = %e, ?delay, "retrying request");
                })
                .await
        })
    }
}

fn transport(url: &str, err: &reqwest::Error) -> Error {
    Error::Transport {
        url: url.to_string(),
        status: err.status().map(|s| s.as_u16()),
        message: err.to_string(),
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn rate_limit(url: &str, status: StatusCode, headers: &HeaderMap) -> Option<Error> {
    let exhausted = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN
            && header(headers, "x-ratelimit-remaining").as_deref() == Some("0"));
    if !exhausted {
        return None;
    }

    let reset_at = header(headers, "x-ratelimit-reset").and_then(|v| v.parse().ok());
    warn!(url, reset_at, "API rate limit exhausted");
    Some(Error::RateLimited {
        url: url.to_string(),
        reset_at,
    })
}

/// A canned response of [`StaticRemoteFilesystem`].
#[cfg(any(test, feature = "testing"))]
#[derive(Debug, Clone)]
struct Fixture {
    status: u16,
    body: String,
    link: Option<String>,
}

/// Remote filesystem answering from fixtures, for offline runs and tests.
///
/// Unknown URLs answer 404.
#[cfg(any(test, feature = "testing"))]
#[derive(Debug, Default)]
pub struct StaticRemoteFilesystem {
    fixtures: DashMap<String, Fixture>,
    calls: DashMap<String, usize>,
}

#[cfg(any(test, feature = "testing"))]
impl StaticRemoteFilesystem {
    /// Create an empty filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with a 200 and `body`.
    pub fn insert(&self, url: impl Into<String>, body: impl Into<String>) {
        self.insert_with(url, 200, body, None);
    }

    /// Answer `url` with a 200, `body` and a `Link` header pointing at `next`.
    pub fn insert_page(&self, url: impl Into<String>, body: impl Into<String>, next: &str) {
        self.insert_with(url, 200, body, Some(format!("<{next}>; rel=\"next\"")));
    }

    /// Answer `url` with an arbitrary status.
    pub fn insert_with(
        &self,
        url: impl Into<String>,
        status: u16,
        body: impl Into<String>,
        link: Option<String>,
    ) {
        self.fixtures.insert(
            url.into(),
            Fixture {
                status,
                body: body.into(),
                link,
            },
        );
    }

    /// Forget the fixture of `url`.
    pub fn remove(&self, url: &str) {
        self.fixtures.remove(url);
    }

    /// Number of requests made for `url`.
    #[must_use]
    pub fn calls(&self, url: &str) -> usize {
        self.calls.get(url).map_or(0, |c| *c)
    }

    /// Number of requests made overall.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls.iter().map(|entry| *entry.value()).sum()
    }
}

#[cfg(any(test, feature = "testing"))]
impl RemoteFilesystem for StaticRemoteFilesystem {
    fn get<'a>(&'a self, _origin: &'a str, url: &'a str) -> BoxFuture<'a, Result<RemoteResponse>> {
        *self.calls.entry(url.to_string()).or_insert(0) += 1;
        let fixture = self.fixtures.get(url).map(|f| f.value().clone());

        Box::pin(async move {
            let fixture = fixture.ok_or_else(|| Error::http_status(url, 404))?;
            if !(200..300).contains(&fixture.status) {
                return Err(Error::http_status(url, fixture.status));
            }
            Ok(RemoteResponse {
                url: url.to_string(),
                status: fixture.status,
                body: fixture.body,
                link: fixture.link,
            })
        })
    }
}
