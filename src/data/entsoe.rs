//! ENTSO-E transparency platform client.
//!
//! One GET per (zone code, window) with a fixed timeout, retried a bounded
//! number of times. A failed code is a value, not a run error: the resolver
//! moves on to the next code.

use std::thread;

use reqwest::blocking::Client;

use crate::data::window::QueryWindow;
use crate::domain::{FeedDescriptor, FetchPolicy};
use crate::error::AppError;

pub const DEFAULT_BASE_URL: &str = "https://web-api.tp.entsoe.eu/api";

/// Longest error body kept for logs and run summaries.
const ERROR_BODY_LIMIT: usize = 300;

/// A fully-formed request for one zone code, minus the credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
    pub document_type: &'static str,
    pub process_type: Option<&'static str>,
    pub domain: Vec<(&'static str, String)>,
    pub period_start: String,
    pub period_end: String,
}

impl FeedRequest {
    pub fn new(feed: &FeedDescriptor, code: &str, window: &QueryWindow) -> Self {
        Self {
            document_type: feed.document_type,
            process_type: feed.process_type,
            domain: feed.domain.pairs(code),
            period_start: window.period_start(),
            period_end: window.period_end(),
        }
    }

    /// Query parameters in the order the service documents them.
    pub fn query<'a>(&'a self, token: &'a str) -> Vec<(&'static str, &'a str)> {
        let mut params = vec![("documentType", self.document_type)];
        if let Some(process_type) = self.process_type {
            params.push(("processType", process_type));
        }
        for (name, value) in &self.domain {
            params.push((*name, value.as_str()));
        }
        params.push(("periodStart", self.period_start.as_str()));
        params.push(("periodEnd", self.period_end.as_str()));
        params.push(("securityToken", token));
        params
    }
}

/// Why a code produced no body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    Status { status: u16, body: String },
    Transport(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Status { status, body } => write!(f, "HTTP {status}: {body}"),
            FetchError::Transport(msg) => write!(f, "transport error: {msg}"),
        }
    }
}

/// Anything that can answer a feed request with a raw XML body.
///
/// Implementations must be shareable across resolver workers.
pub trait MarketSource: Sync {
    fn fetch(&self, request: &FeedRequest) -> Result<String, FetchError>;
}

pub struct EntsoeClient {
    client: Client,
    base_url: String,
    token: String,
    policy: FetchPolicy,
}

impl EntsoeClient {
    /// Build a client with the token from `ENTSOE_API_KEY` (or `API_KEY`), loading `.env` first.
    pub fn from_env(base_url: &str, policy: FetchPolicy) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let token = ["ENTSOE_API_KEY", "API_KEY"]
            .iter()
            .find_map(|name| std::env::var(name).ok().filter(|v| !v.trim().is_empty()))
            .ok_or_else(|| AppError::config("Missing ENTSOE_API_KEY (or API_KEY) in environment (.env)."))?;
        Self::new(base_url, token, policy)
    }

    pub fn new(base_url: &str, token: String, policy: FetchPolicy) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(policy.timeout)
            .build()
            .map_err(|e| AppError::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            token,
            policy,
        })
    }

    fn send_once(&self, request: &FeedRequest) -> Result<String, FetchError> {
        // Errors are stripped of their URL: it carries the security token.
        let resp = self
            .client
            .get(&self.base_url)
            .query(&request.query(&self.token))
            .send()
            .map_err(|e| FetchError::Transport(e.without_url().to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| FetchError::Transport(e.without_url().to_string()))?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate(&body, ERROR_BODY_LIMIT),
            });
        }
        Ok(body)
    }
}

impl MarketSource for EntsoeClient {
    fn fetch(&self, request: &FeedRequest) -> Result<String, FetchError> {
        let code = request.domain.first().map(|(_, c)| c.as_str()).unwrap_or_default();
        with_retries(&self.policy, code, || self.send_once(request))
    }
}

/// Run `attempt` until it succeeds or `policy.max_attempts` is used up,
/// sleeping `policy.retry_delay` between attempts. Returns the last failure.
pub fn with_retries<F>(policy: &FetchPolicy, code: &str, mut attempt: F) -> Result<String, FetchError>
where
    F: FnMut() -> Result<String, FetchError>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut n = 1;
    loop {
        match attempt() {
            Ok(body) => {
                tracing::debug!(code, attempt = n, bytes = body.len(), "fetch succeeded");
                return Ok(body);
            }
            Err(err) => {
                tracing::warn!(code, attempt = n, max_attempts, error = %err, "fetch attempt failed");
                if n >= max_attempts {
                    return Err(err);
                }
            }
        }
        n += 1;
        if !policy.retry_delay.is_zero() {
            thread::sleep(policy.retry_delay);
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::time::Duration;

    use super::*;
    use crate::domain::{ENERGY_PRICE, GENERATION_FORECAST};

    fn instant_policy(max_attempts: u32) -> FetchPolicy {
        FetchPolicy {
            max_attempts,
            retry_delay: Duration::ZERO,
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn query_lists_parameters_in_service_order() {
        let window = QueryWindow::parse("2025-02-04", 1, 1).unwrap();
        let req = FeedRequest::new(&ENERGY_PRICE, "10YAT-APG------L", &window);
        let names: Vec<&str> = req.query("secret").iter().map(|(k, _)| *k).collect();
        assert_eq!(
            names,
            vec!["documentType", "out_Domain", "in_Domain", "periodStart", "periodEnd", "securityToken"]
        );

        let req = FeedRequest::new(&GENERATION_FORECAST, "X1", &window);
        let query = req.query("secret");
        assert!(query.contains(&("processType", "A01")));
        assert!(query.contains(&("in_Domain", "X1")));
        assert!(query.contains(&("periodStart", "202502032300")));
    }

    #[test]
    fn retries_until_success() {
        let calls = Cell::new(0);
        let body = with_retries(&instant_policy(3), "X1", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(FetchError::Status {
                    status: 503,
                    body: "busy".to_string(),
                })
            } else {
                Ok("<ok/>".to_string())
            }
        })
        .unwrap();
        assert_eq!(body, "<ok/>");
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn gives_up_after_max_attempts_with_last_error() {
        let calls = Cell::new(0);
        let err = with_retries(&instant_policy(3), "X1", || {
            calls.set(calls.get() + 1);
            Err(FetchError::Transport(format!("timeout #{}", calls.get())))
        })
        .unwrap_err();
        assert_eq!(calls.get(), 3);
        assert_eq!(err, FetchError::Transport("timeout #3".to_string()));
    }

    fn local_client(base_url: String) -> EntsoeClient {
        EntsoeClient {
            client: Client::builder().no_proxy().timeout(Duration::from_secs(5)).build().unwrap(),
            base_url,
            token: "secret-token-123".to_string(),
            policy: instant_policy(1),
        }
    }

    /// Answer one request with `response` and hand back the request head.
    fn serve_once(response: String) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/api", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&head).into_owned()
        });
        (url, handle)
    }

    #[test]
    fn error_status_keeps_a_truncated_body() {
        let body = "x".repeat(ERROR_BODY_LIMIT + 50);
        let (url, server) = serve_once(format!(
            "HTTP/1.1 400 Bad Request\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        ));
        let window = QueryWindow::parse("2025-02-04", 1, 1).unwrap();
        let request = FeedRequest::new(&GENERATION_FORECAST, "X1", &window);

        let err = local_client(url).fetch(&request).unwrap_err();
        let FetchError::Status { status, body } = &err else {
            panic!("expected a status error, got {err:?}");
        };
        assert_eq!(*status, 400);
        assert_eq!(body.chars().count(), ERROR_BODY_LIMIT + 1);
        assert!(body.ends_with('…'));

        let head = server.join().unwrap();
        assert!(head.starts_with("GET /api?documentType=A71&processType=A01&in_Domain=X1"));
        assert!(head.contains("securityToken=secret-token-123"));
    }

    #[test]
    fn success_returns_the_body() {
        let xml = "<GL_MarketDocument/>";
        let (url, server) = serve_once(format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{xml}",
            xml.len()
        ));
        let window = QueryWindow::parse("2025-02-04", 1, 1).unwrap();
        let request = FeedRequest::new(&ENERGY_PRICE, "10YAT-APG------L", &window);

        assert_eq!(local_client(url).fetch(&request).unwrap(), xml);
        server.join().unwrap();
    }

    #[test]
    fn transport_error_never_shows_the_token() {
        // Bind then drop to get a port with nothing listening.
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let window = QueryWindow::parse("2025-02-04", 1, 1).unwrap();
        let request = FeedRequest::new(&GENERATION_FORECAST, "X1", &window);

        let err = local_client(format!("http://127.0.0.1:{port}/api")).fetch(&request).unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)), "{err:?}");
        assert!(!err.to_string().contains("secret-token-123"), "{err}");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("€€€", 2), "€€…");
        assert_eq!(truncate("abc", 5), "abc");
    }
}
