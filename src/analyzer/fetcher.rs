//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the analyzer, including:
//! - Building the shared HTTP client
//! - GET requests for the analyzed page, with time-to-first-byte and memory
//!   admission before the body is read
//! - HEAD probes for link reachability
//! - Error classification
//!
//! Every request races the caller's cancellation token.

use crate::analyzer::governor::{Admission, AdmissionController};
use crate::config::AnalyzerConfig;
use crate::{AnalyzerError, Result};
use reqwest::header::HeaderMap;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Cookie attributes relevant to the cookie profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieInfo {
    pub name: String,
    /// Domain attribute, None when the cookie is host-only
    pub domain: Option<String>,
    /// Max-Age attribute
    pub max_age: Option<Duration>,
}

/// A successfully fetched page
#[derive(Debug)]
pub struct FetchedPage {
    /// URL after following redirects
    pub final_url: Url,
    pub status: u16,
    pub headers: HeaderMap,
    pub cookies: Vec<CookieInfo>,
    pub body: String,
    /// Time until response headers arrived
    pub ttfb: Duration,
    /// Time until the body was fully read
    pub elapsed: Duration,
    /// Content-Length announced by the server, if any
    pub content_length: Option<u64>,
}

impl FetchedPage {
    /// Header value as a string, empty when absent or not valid UTF-8
    pub fn header(&self, name: &str) -> &str {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    /// Body size in bytes
    pub fn size(&self) -> u64 {
        self.body.len() as u64
    }
}

/// Answer to a reachability probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResponse {
    /// The server answered with this status
    Status(u16),
    /// Transport failure or timeout
    Failed(String),
}

/// Builds the HTTP client shared by page fetches and probes
///
/// # Arguments
///
/// * `config` - Analyzer settings (user agent and primary request timeout)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &AnalyzerConfig) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.request_timeout())
        .connect_timeout(config.request_timeout())
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches the page to analyze
///
/// Once the headers arrive the page is admitted against `admission` for its
/// Content-Length, or `assumed_length` when the server sends none. The body
/// is then read chunk by chunk and may not grow past the admitted estimate.
/// The returned [`Admission`] keeps the budget held until it is dropped.
///
/// # Errors
///
/// | Condition | Error |
/// |-----------|-------|
/// | Token cancelled | `Cancelled` |
/// | Request timed out | `Timeout` |
/// | Transport failure | `Fetch` |
/// | Status other than 200 | `HttpStatus` |
/// | Estimate over budget, or body larger than estimate | `ResourceExhausted` |
pub async fn fetch_page(
    client: &Client,
    url: &Url,
    admission: &AdmissionController,
    assumed_length: u64,
    cancel: &CancellationToken,
) -> Result<(FetchedPage, Admission)> {
    if cancel.is_cancelled() {
        return Err(AnalyzerError::Cancelled);
    }

    tracing::debug!(url = %url, "Fetching page");
    let started = Instant::now();

    let mut response = with_cancel(cancel, client.get(url.clone()).send())
        .await?
        .map_err(|e| classify_error(url, e))?;
    let ttfb = started.elapsed();

    let status = response.status();
    if status != StatusCode::OK {
        return Err(AnalyzerError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let final_url = response.url().clone();
    let headers = response.headers().clone();
    let content_length = response.content_length();
    let cookies = response
        .cookies()
        .map(|c| CookieInfo {
            name: c.name().to_string(),
            domain: c.domain().map(str::to_string),
            max_age: c.max_age(),
        })
        .collect();

    let estimate = content_length.unwrap_or(assumed_length);
    let admitted = match admission.admit(estimate, cancel).await {
        Ok(admitted) => admitted,
        Err(_) if cancel.is_cancelled() => return Err(AnalyzerError::Cancelled),
        Err(e) => return Err(e),
    };

    let mut bytes = Vec::with_capacity(estimate.min(64 * 1024) as usize);
    loop {
        let chunk = with_cancel(cancel, response.chunk())
            .await?
            .map_err(|e| classify_error(url, e))?;
        let Some(chunk) = chunk else {
            break;
        };
        append_within(&mut bytes, &chunk, estimate, url)?;
    }
    let elapsed = started.elapsed();

    tracing::debug!(
        url = %url,
        status = status.as_u16(),
        bytes = bytes.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Fetched page"
    );

    let body = String::from_utf8(bytes)
        .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());

    let page = FetchedPage {
        final_url,
        status: status.as_u16(),
        headers,
        cookies,
        body,
        ttfb,
        elapsed,
        content_length,
    };
    Ok((page, admitted))
}

/// Appends a body chunk unless it would pass `limit` bytes
fn append_within(body: &mut Vec<u8>, chunk: &[u8], limit: u64, url: &Url) -> Result<()> {
    let size = (body.len() + chunk.len()) as u64;
    if size > limit {
        return Err(AnalyzerError::ResourceExhausted(format!(
            "body of {} exceeds admitted estimate of {} bytes",
            url, limit
        )));
    }
    body.extend_from_slice(chunk);
    Ok(())
}

/// Sends a HEAD probe; the body is never read
///
/// Returns `Err(Cancelled)` only when the token fires. Every other failure
/// is folded into `ProbeResponse::Failed`.
pub async fn probe(
    client: &Client,
    url: &Url,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<ProbeResponse> {
    let request = client.head(url.clone()).timeout(timeout).send();

    match with_cancel(cancel, request).await? {
        Ok(response) => Ok(ProbeResponse::Status(response.status().as_u16())),
        Err(e) if e.is_timeout() => Ok(ProbeResponse::Failed("timeout".to_string())),
        Err(e) => Ok(ProbeResponse::Failed(e.to_string())),
    }
}

/// Runs `fut` unless the token fires first
async fn with_cancel<F, T>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AnalyzerError::Cancelled),
        out = fut => Ok(out),
    }
}

fn classify_error(url: &Url, e: reqwest::Error) -> AnalyzerError {
    if e.is_timeout() {
        AnalyzerError::Timeout {
            url: url.to_string(),
        }
    } else {
        AnalyzerError::Fetch {
            url: url.to_string(),
            source: e,
        }
    }
}
