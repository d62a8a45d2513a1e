// src/core/probe/tls.rs

use super::{io_outcome, Outcome};
use chrono::{DateTime, Utc};
use native_tls::TlsConnector;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tokio::task::spawn_blocking;
use tracing::{debug, error, info};
use x509_parser::prelude::*;

/// Fields of the peer certificate needed by the checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    pub subject_name: String,
    pub issuer_name: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

impl CertificateInfo {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.not_after < now
    }

    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        self.not_after.signed_duration_since(now).num_days()
    }
}

/// Completes a TLS handshake and returns the peer certificate.
///
/// The chain and hostname are not validated: the certificate is inspected, not
/// trusted. native-tls is blocking, so the handshake runs on the blocking pool
/// under `budget`.
///
/// # Arguments
/// * `host` - Hostname or IP literal, also sent as SNI.
/// * `port` - The TLS port.
/// * `budget` - Upper bound for connect, handshake and read together.
///
/// # Returns
/// `Outcome::Success` with the parsed certificate, `Timeout` when the budget ran
/// out, `Unreachable` when no handshake happened and `ParseFailure` when the
/// certificate could not be read.
pub async fn fetch_certificate(host: &str, port: u16, budget: Duration) -> Outcome<CertificateInfo> {
    let host_owned = host.to_string();
    debug!(host, port, "Spawning blocking task for TLS handshake.");
    let task = spawn_blocking(move || perform_handshake(&host_owned, port, budget));

    match tokio::time::timeout(budget, task).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            error!(panic = %e, "Blocking TLS probe task panicked!");
            Outcome::ParseFailure
        }
        Err(_) => Outcome::Timeout,
    }
}

fn perform_handshake(host: &str, port: u16, budget: Duration) -> Outcome<CertificateInfo> {
    let connector = match TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Failed to create TlsConnector");
            return Outcome::Unreachable;
        }
    };

    let addr = match (host, port).to_socket_addrs().map(|mut addrs| addrs.next()) {
        Ok(Some(addr)) => addr,
        Ok(None) => return Outcome::Unreachable,
        Err(e) => return io_outcome(&e),
    };

    let stream = match TcpStream::connect_timeout(&addr, budget) {
        Ok(s) => s,
        Err(e) => {
            debug!(host, port, error = %e, "TCP connection failed");
            return io_outcome(&e);
        }
    };
    if stream.set_read_timeout(Some(budget)).is_err() || stream.set_write_timeout(Some(budget)).is_err() {
        return Outcome::Unreachable;
    }

    let stream = match connector.connect(host, stream) {
        Ok(s) => s,
        Err(e) => {
            debug!(host, port, error = %e, "TLS handshake failed");
            return Outcome::Unreachable;
        }
    };

    let cert = match stream.peer_certificate() {
        Ok(Some(c)) => c,
        Ok(None) => {
            debug!(host, port, "TLS connection successful, but no peer certificate provided.");
            return Outcome::ParseFailure;
        }
        Err(e) => {
            debug!(error = %e, "Failed to retrieve peer certificate from stream");
            return Outcome::ParseFailure;
        }
    };

    let Ok(cert_der) = cert.to_der() else {
        return Outcome::ParseFailure;
    };
    match parse_certificate(&cert_der) {
        Some(info) => {
            info!(subject = %info.subject_name, not_after = %info.not_after, "Parsed peer certificate.");
            Outcome::Success(info)
        }
        None => Outcome::ParseFailure,
    }
}

/// Extracts subject, issuer and validity window from a DER certificate.
pub fn parse_certificate(der: &[u8]) -> Option<CertificateInfo> {
    let (_, x509) = parse_x509_certificate(der)
        .map_err(|e| debug!(error = %e, "Failed to parse X.509 certificate"))
        .ok()?;
    let validity = x509.validity();
    Some(CertificateInfo {
        subject_name: x509.subject().to_string(),
        issuer_name: x509.issuer().to_string(),
        not_before: asn1_time_to_chrono_utc(&validity.not_before),
        not_after: asn1_time_to_chrono_utc(&validity.not_after),
    })
}

fn asn1_time_to_chrono_utc(time: &ASN1Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn certificate(not_after: DateTime<Utc>) -> CertificateInfo {
        CertificateInfo {
            subject_name: "CN=example.test".into(),
            issuer_name: "CN=Test CA".into(),
            not_before: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            not_after,
        }
    }

    #[test]
    fn expiry_is_relative_to_now() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let expired = certificate(Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap());
        let valid = certificate(Utc.with_ymd_and_hms(2025, 6, 11, 0, 0, 0).unwrap());
        assert!(expired.is_expired_at(now));
        assert!(!valid.is_expired_at(now));
        assert_eq!(valid.days_until_expiry(now), 10);
    }

    #[test]
    fn garbage_der_is_rejected() {
        assert!(parse_certificate(b"not a certificate").is_none());
    }

    #[tokio::test]
    async fn closed_port_gives_no_certificate() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let outcome = fetch_certificate("127.0.0.1", port, Duration::from_secs(2)).await;
        assert_eq!(outcome, Outcome::Unreachable);
    }
}
