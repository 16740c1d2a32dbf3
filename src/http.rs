//! HTTP fetching with exponential backoff retry logic.
//!
//! # Architecture
//!
//! - [`Transport`]: one HTTP exchange, request in, body out
//! - [`ReqwestTransport`]: builds a fresh `reqwest::Client` per call so every
//!   connection is closed when the call returns, whatever the outcome
//! - [`RetryTransport`]: decorator that retries any [`Transport`] according
//!   to a [`FetchPolicy`]
//!
//! # Retry Strategy
//!
//! - 3 attempts in total
//! - Exponential backoff starting at 1 second, capped at 30 seconds
//! - Random jitter (0-250ms) added to each delay
//! - Retried on HTTP 400-599 and on connection-level failures

use crate::error::FetchError;
use crate::models::RawPayload;
use rand::{Rng, rng};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::fmt;
use std::ops::RangeInclusive;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Desktop browser User-Agent sent by every source.
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

/// Timeout, attempt budget and backoff shape for one logical fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// Total attempts, including the first.
    pub max_attempts: usize,
    /// Delay before the second attempt; doubles for each one after.
    pub backoff_factor: Duration,
    /// Upper bound for a single backoff delay.
    pub max_delay: Duration,
    /// Upper bound for the random jitter added to each delay.
    pub jitter_ms: u64,
    /// Response statuses that trigger another attempt.
    pub retry_statuses: RangeInclusive<u16>,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            backoff_factor: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter_ms: 250,
            retry_statuses: 400..=599,
        }
    }
}

impl FetchPolicy {
    /// Delay to wait after the `attempt`-th failure (1-based).
    pub fn delay_after(&self, attempt: usize) -> Duration {
        let shift = attempt.saturating_sub(1).min(16) as u32;
        let delay = self.backoff_factor.saturating_mul(1 << shift);
        let delay = delay.min(self.max_delay);
        if self.jitter_ms == 0 {
            return delay;
        }
        delay + Duration::from_millis(rng().random_range(0..=self.jitter_ms))
    }
}

/// Request method, with the JSON body for POST.
#[derive(Debug, Clone, PartialEq)]
pub enum Method {
    Get,
    Post(serde_json::Value),
}

/// Everything needed to perform one request against a source endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub method: Method,
    pub headers: &'static [(&'static str, &'static str)],
}

impl HttpRequest {
    pub fn get(url: impl Into<String>, headers: &'static [(&'static str, &'static str)]) -> Self {
        Self {
            url: url.into(),
            method: Method::Get,
            headers,
        }
    }

    pub fn post_json(
        url: impl Into<String>,
        body: serde_json::Value,
        headers: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self {
            url: url.into(),
            method: Method::Post(body),
            headers,
        }
    }

    fn header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(n), Ok(v)) => {
                    map.insert(n, v);
                }
                _ => warn!(header = %name, "Skipping invalid header"),
            }
        }
        map
    }
}

/// One HTTP exchange.
pub trait Transport {
    async fn send(&self, request: &HttpRequest) -> Result<RawPayload, FetchError>;
}

/// [`Transport`] backed by a per-call `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<RawPayload, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .default_headers(request.header_map())
            .build()?;

        let builder = match &request.method {
            Method::Get => client.get(&request.url),
            Method::Post(body) => client.post(&request.url).json(body),
        };

        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: request.url.clone(),
            });
        }

        let body = resp.text().await?;
        debug!(bytes = body.len(), "Received response body");
        Ok(RawPayload::new(body))
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Transport`].
///
/// Errors that [`FetchError::is_retryable`] rejects are returned at once.
/// When the attempt budget runs out the last error is wrapped in
/// [`FetchError::Exhausted`].
pub struct RetryTransport<T> {
    inner: T,
    policy: FetchPolicy,
}

impl<T: Transport> RetryTransport<T> {
    pub fn new(inner: T, policy: FetchPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<T> fmt::Debug for RetryTransport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryTransport")
            .field("policy", &self.policy)
            .finish()
    }
}

impl<T: Transport> Transport for RetryTransport<T> {
    async fn send(&self, request: &HttpRequest) -> Result<RawPayload, FetchError> {
        let total_t0 = Instant::now();
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            attempt += 1;
            match self.inner.send(request).await {
                Ok(payload) => return Ok(payload),
                Err(e) if !e.is_retryable(&self.policy.retry_statuses) => {
                    error!(attempt, error = %e, "Fetch failed with non-retryable error");
                    return Err(e);
                }
                Err(e) => {
                    let elapsed_ms_attempt = attempt_t0.elapsed().as_millis();
                    let elapsed_ms_total = total_t0.elapsed().as_millis();

                    if attempt >= max_attempts {
                        error!(
                            attempt,
                            max = max_attempts,
                            elapsed_ms_attempt,
                            elapsed_ms_total,
                            error = %e,
                            "Fetch exhausted retries"
                        );
                        return Err(FetchError::Exhausted {
                            attempts: attempt,
                            last: Box::new(e),
                        });
                    }

                    let delay = self.policy.delay_after(attempt);
                    warn!(
                        attempt,
                        max = max_attempts,
                        elapsed_ms_attempt,
                        elapsed_ms_total,
                        ?delay,
                        error = %e,
                        "Fetch attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Perform `request` with the retry behavior described by `policy`.
///
/// This is the entry point source connectors use for their `fetch`. Its span
/// carries the URL for every attempt logged underneath.
#[instrument(level = "info", skip_all, fields(url = %request.url))]
pub async fn fetch_with_backoff(
    request: &HttpRequest,
    policy: &FetchPolicy,
) -> Result<RawPayload, FetchError> {
    let t0 = Instant::now();
    let transport = RetryTransport::new(ReqwestTransport::new(policy.timeout), policy.clone());
    let res = transport.send(request).await;
    let elapsed_ms_total = t0.elapsed().as_millis();

    match &res {
        Ok(payload) => info!(
            elapsed_ms_total,
            bytes = payload.body.len(),
            "fetch_with_backoff succeeded"
        ),
        Err(e) => error!(elapsed_ms_total, error = %e, "fetch_with_backoff failed"),
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn instant_policy() -> FetchPolicy {
        FetchPolicy {
            backoff_factor: Duration::ZERO,
            jitter_ms: 0,
            ..FetchPolicy::default()
        }
    }

    /// Fails with `status` for the first `failures` calls, then succeeds.
    struct Flaky {
        failures: usize,
        status: u16,
        calls: AtomicUsize,
    }

    impl Flaky {
        fn new(failures: usize, status: u16) -> Self {
            Self {
                failures,
                status,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Transport for Flaky {
        async fn send(&self, request: &HttpRequest) -> Result<RawPayload, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(FetchError::Status {
                    status: self.status,
                    url: request.url.clone(),
                })
            } else {
                Ok(RawPayload::new("ok"))
            }
        }
    }

    fn request() -> HttpRequest {
        HttpRequest::get("https://example.test/hot", &[])
    }

    #[test]
    fn test_default_policy_matches_source_contract() {
        let p = FetchPolicy::default();
        assert_eq!(p.timeout, Duration::from_secs(30));
        assert_eq!(p.max_attempts, 3);
        assert!(p.retry_statuses.contains(&400));
        assert!(p.retry_statuses.contains(&599));
        assert!(!p.retry_statuses.contains(&302));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let p = FetchPolicy {
            jitter_ms: 0,
            max_delay: Duration::from_secs(3),
            ..FetchPolicy::default()
        };
        assert_eq!(p.delay_after(1), Duration::from_secs(1));
        assert_eq!(p.delay_after(2), Duration::from_secs(2));
        assert_eq!(p.delay_after(3), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let t = RetryTransport::new(Flaky::new(2, 503), instant_policy());
        let payload = t.send(&request()).await.unwrap();
        assert_eq!(payload.body, "ok");
        assert_eq!(t.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_after_max_attempts() {
        let t = RetryTransport::new(Flaky::new(10, 429), instant_policy());
        let err = t.send(&request()).await.unwrap_err();
        assert!(matches!(err, FetchError::Exhausted { attempts: 3, .. }));
        assert_eq!(t.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_status_outside_range_is_not_retried() {
        let policy = FetchPolicy {
            retry_statuses: 500..=599,
            ..instant_policy()
        };
        let t = RetryTransport::new(Flaky::new(10, 404), policy);
        let err = t.send(&request()).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert_eq!(t.inner.calls.load(Ordering::SeqCst), 1);
    }

    /// Serves `responses` in order, one per connection, on a loopback port.
    async fn serve(responses: Vec<&'static str>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
        });
        format!("http://{addr}/hot")
    }

    #[tokio::test]
    async fn test_reqwest_transport_retries_server_errors() {
        let url = serve(vec![
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 11\r\nConnection: close\r\n\r\n{\"data\":[]}",
        ])
        .await;

        let payload = fetch_with_backoff(&HttpRequest::get(url, &[]), &instant_policy())
            .await
            .unwrap();
        assert_eq!(payload.body, r#"{"data":[]}"#);
    }

    /// A loopback URL nothing is listening on.
    async fn closed_port_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}/hot")
    }

    #[tokio::test]
    async fn test_connection_refused_is_retried_then_exhausted() {
        let url = closed_port_url().await;
        let err = fetch_with_backoff(&HttpRequest::get(url, &[]), &instant_policy())
            .await
            .unwrap_err();

        match err {
            FetchError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, FetchError::Transport(ref e) if e.is_connect()));
            }
            other => panic!("expected exhausted retries, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_silent_server_times_out_each_attempt() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&accepted);
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                held.push(socket);
            }
        });

        let policy = FetchPolicy {
            timeout: Duration::from_millis(200),
            ..instant_policy()
        };
        let started = Instant::now();
        let err = fetch_with_backoff(&HttpRequest::get(format!("http://{addr}/hot"), &[]), &policy)
            .await
            .unwrap_err();

        match err {
            FetchError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, FetchError::Transport(ref e) if e.is_timeout()));
            }
            other => panic!("expected exhausted retries, got {other:?}"),
        }
        assert_eq!(accepted.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_fetch_logs_carry_the_url_once() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let url = closed_port_url().await;
        let _ = fetch_with_backoff(&HttpRequest::get(url, &[]), &instant_policy()).await;

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let attempt_lines: Vec<&str> = output
            .lines()
            .filter(|l| l.contains("Fetch attempt failed") || l.contains("Fetch exhausted retries"))
            .collect();
        assert_eq!(attempt_lines.len(), 3);
        for line in attempt_lines {
            assert_eq!(line.matches("url=").count(), 1, "{line}");
        }
    }
}
