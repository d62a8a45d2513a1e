// src/core/probe/mod.rs

//! Network probe primitives.
//!
//! Every probe performs a single interaction with the target under a hard
//! time budget and reports an [`Outcome`]. Transport errors never escape this
//! module: they become `Timeout`, `Unreachable` or `ParseFailure`.

pub mod banner;
pub mod headers;
pub mod reachability;
pub mod tls;

use crate::core::target::Target;
use async_trait::async_trait;
use std::future::Future;
use std::io;
use std::time::Duration;
use tracing::debug;

pub use self::headers::HeaderReport;
pub use self::tls::CertificateInfo;

/// Result of one probe.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Timeout,
    Unreachable,
    ParseFailure,
}

impl<T> Outcome<T> {
    /// Folds every non-success outcome into `None`.
    pub fn success(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Timeout | Outcome::Unreachable | Outcome::ParseFailure => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Timeout => Outcome::Timeout,
            Outcome::Unreachable => Outcome::Unreachable,
            Outcome::ParseFailure => Outcome::ParseFailure,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::Timeout => "timeout",
            Outcome::Unreachable => "unreachable",
            Outcome::ParseFailure => "parse-failure",
        }
    }
}

/// Which probe a check needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    Banner,
    HttpHeaders,
    TlsCertificate,
    Reachability,
}

/// What a successful probe observed.
#[derive(Debug, Clone, PartialEq)]
pub enum Evidence {
    Banner(String),
    Headers(HeaderReport),
    Certificate(CertificateInfo),
    Reachable,
}

/// The probe layer as seen by the orchestrator. Stubbed in tests.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, kind: ProbeKind, target: &Target, port: u16) -> Outcome<Evidence>;
}

/// Probes that talk to the real network.
pub struct NetworkProber {
    timeout: Duration,
    http: reqwest::Client,
}

impl NetworkProber {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self { timeout, http: headers::build_client(timeout)? })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Prober for NetworkProber {
    async fn probe(&self, kind: ProbeKind, target: &Target, port: u16) -> Outcome<Evidence> {
        let host = target.as_str();
        let outcome = match kind {
            ProbeKind::Banner => banner::grab_banner(host, port, self.timeout).await.map(Evidence::Banner),
            ProbeKind::HttpHeaders => headers::fetch_headers(&self.http, &target.url_host(), port, self.timeout)
                .await
                .map(Evidence::Headers),
            ProbeKind::TlsCertificate => tls::fetch_certificate(host, port, self.timeout)
                .await
                .map(Evidence::Certificate),
            ProbeKind::Reachability => reachability::check_reachable(host, port, self.timeout)
                .await
                .map(|()| Evidence::Reachable),
        };
        debug!(target = host, port, probe = ?kind, outcome = outcome.label(), "Probe finished.");
        outcome
    }
}

/// Runs `fut` under `budget`, turning an elapsed budget into `Outcome::Timeout`.
pub(crate) async fn within<T, F>(budget: Duration, fut: F) -> Outcome<T>
where
    F: Future<Output = Outcome<T>>,
{
    tokio::time::timeout(budget, fut).await.unwrap_or(Outcome::Timeout)
}

pub(crate) fn io_outcome<T>(err: &io::Error) -> Outcome<T> {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Outcome::Timeout,
        _ => Outcome::Unreachable,
    }
}
