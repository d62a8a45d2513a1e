// src/core/probe/headers.rs

use super::Outcome;
use reqwest::header::HeaderMap;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Security headers inspected on every HTTP response.
pub const SECURITY_HEADERS: [&str; 4] = [
    "strict-transport-security",
    "content-security-policy",
    "x-frame-options",
    "x-content-type-options",
];

/// Which of the security headers an HTTP service sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderReport {
    pub status: u16,
    /// Lowercase header name to value, for the headers that were present.
    pub present: BTreeMap<String, String>,
    pub missing: Vec<String>,
}

impl HeaderReport {
    /// Case-insensitive.
    pub fn is_missing(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        self.missing.iter().any(|m| *m == name)
    }

    /// Sorts each entry of `SECURITY_HEADERS` into present or missing.
    pub fn inspect(status: u16, headers: &HeaderMap) -> Self {
        let mut report = Self { status, ..Self::default() };
        for name in SECURITY_HEADERS {
            match check_header(headers, name) {
                Some(value) => {
                    report.present.insert(name.to_string(), value);
                }
                None => report.missing.push(name.to_string()),
            }
        }
        report
    }
}

pub fn build_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("VanguardRecon/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .connect_timeout(timeout)
        .no_proxy()
        .build()
}

/// Returns the header value, or a placeholder when it is present but not UTF-8.
fn check_header(headers: &HeaderMap, name: &str) -> Option<String> {
    let value = headers.get(name)?;
    match value.to_str() {
        Ok(s) => Some(s.to_string()),
        Err(_) => {
            warn!(header_name = name, "Header found but contained invalid UTF-8.");
            Some("[Invalid UTF-8]".to_string())
        }
    }
}

/// Issues `GET http://host:port/` and inspects the response headers.
///
/// The client's own timeout bounds the whole exchange.
pub async fn fetch_headers(client: &reqwest::Client, url_host: &str, port: u16, budget: Duration) -> Outcome<HeaderReport> {
    let url = format!("http://{url_host}:{port}/");
    let request = client.get(&url).timeout(budget).send();
    match request.await {
        Ok(response) => {
            let report = HeaderReport::inspect(response.status().as_u16(), response.headers());
            debug!(url = %url, status = report.status, missing = ?report.missing, "Inspected response headers.");
            Outcome::Success(report)
        }
        Err(e) if e.is_timeout() => Outcome::Timeout,
        Err(e) if e.is_connect() => {
            debug!(url = %url, error = %e, "HTTP connect failed.");
            Outcome::Unreachable
        }
        Err(e) => {
            debug!(url = %url, error = %e, "HTTP exchange failed.");
            Outcome::ParseFailure
        }
    }
}
