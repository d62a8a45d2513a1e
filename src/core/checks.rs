// src/core/checks.rs

//! The check registry.
//!
//! A check is a pure function from the evidence of one probe to at most one
//! [`Vulnerability`]. The registry decides which checks run for an open
//! `(port, service)` pair; registering an entry is the only thing needed to
//! extend coverage, the orchestrator never changes.

use crate::core::knowledge_base::get_finding_detail;
use crate::core::models::Vulnerability;
use crate::core::probe::{Evidence, ProbeKind};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use strum::EnumIter;
use tracing::debug;

static RE_OUTDATED_OPENSSH: Lazy<Regex> = Lazy::new(|| Regex::new(r"OpenSSH_[5-7]\.").unwrap());

/// Service names the registry understands. Parsed case-sensitively from the
/// normalized name reported by the port scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceKind {
    Ssh,
    Http,
    Https,
    Rdp,
    Other(String),
}

impl ServiceKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "ssh" => ServiceKind::Ssh,
            "http" => ServiceKind::Http,
            "https" => ServiceKind::Https,
            "rdp" => ServiceKind::Rdp,
            other => ServiceKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ServiceKind::Ssh => "ssh",
            ServiceKind::Http => "http",
            ServiceKind::Https => "https",
            ServiceKind::Rdp => "rdp",
            ServiceKind::Other(name) => name,
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every check the scanner knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum CheckKind {
    OutdatedSsh,
    MissingFrameOptions,
    ExpiredCertificate,
    ExposedRemoteDesktop,
}

impl CheckKind {
    /// Knowledge-base code of the finding this check raises.
    pub fn code(self) -> &'static str {
        match self {
            CheckKind::OutdatedSsh => "SSH_OUTDATED_VERSION",
            CheckKind::MissingFrameOptions => "HTTP_X_FRAME_OPTIONS_MISSING",
            CheckKind::ExpiredCertificate => "TLS_CERTIFICATE_EXPIRED",
            CheckKind::ExposedRemoteDesktop => "RDP_EXPOSED",
        }
    }

    /// The probe whose evidence this check reads.
    pub fn probe(self) -> ProbeKind {
        match self {
            CheckKind::OutdatedSsh => ProbeKind::Banner,
            CheckKind::MissingFrameOptions => ProbeKind::HttpHeaders,
            CheckKind::ExpiredCertificate => ProbeKind::TlsCertificate,
            CheckKind::ExposedRemoteDesktop => ProbeKind::Reachability,
        }
    }

    /// Decides whether `evidence` from `port` is a finding.
    ///
    /// Evidence of the wrong kind never matches. `now` is only read by the
    /// certificate check.
    pub fn evaluate(self, port: u16, service: &str, evidence: &Evidence, now: DateTime<Utc>) -> Option<Vulnerability> {
        let description = match (self, evidence) {
            (CheckKind::OutdatedSsh, Evidence::Banner(banner)) if RE_OUTDATED_OPENSSH.is_match(banner) => {
                Some(format!("SSH banner: {banner}"))
            }
            (CheckKind::MissingFrameOptions, Evidence::Headers(headers)) if headers.is_missing("x-frame-options") => None,
            (CheckKind::ExpiredCertificate, Evidence::Certificate(cert)) if cert.is_expired_at(now) => Some(format!(
                "Certificate {} expired on {} ({} days ago)",
                cert.subject_name,
                cert.not_after.format("%Y-%m-%d"),
                -cert.days_until_expiry(now)
            )),
            (CheckKind::ExposedRemoteDesktop, Evidence::Reachable) => None,
            _ => return None,
        };
        self.finding(port, service, description)
    }

    fn finding(self, port: u16, service: &str, description: Option<String>) -> Option<Vulnerability> {
        let Some(detail) = get_finding_detail(self.code()) else {
            debug!(code = self.code(), "No knowledge-base entry for check.");
            return None;
        };
        Some(Vulnerability {
            id: format!("{service}-{port}-{}", self.code().to_ascii_lowercase()),
            severity: detail.severity,
            port,
            service: service.to_string(),
            issue: detail.issue.to_string(),
            risk_score: detail.risk_score,
            cve: detail.cve.map(String::from),
            description: description.unwrap_or_else(|| detail.description.to_string()),
            remediation: detail.remediation.to_string(),
        })
    }
}

/// Maps `(port, service)` to the ordered checks to run against it.
#[derive(Debug, Clone)]
pub struct CheckRegistry {
    entries: BTreeMap<(u16, ServiceKind), Vec<CheckKind>>,
}

impl CheckRegistry {
    pub fn empty() -> Self {
        Self { entries: BTreeMap::new() }
    }

    /// Appends `check` to the list for `(port, service)`. Duplicates are ignored.
    pub fn register(&mut self, port: u16, service: ServiceKind, check: CheckKind) -> &mut Self {
        let checks = self.entries.entry((port, service)).or_default();
        if !checks.contains(&check) {
            checks.push(check);
        }
        self
    }

    /// Checks registered for an exact port and service name. Unknown pairs get none.
    pub fn checks_for(&self, port: u16, service_name: &str) -> &[CheckKind] {
        self.entries
            .get(&(port, ServiceKind::from_name(service_name)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CheckRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register(22, ServiceKind::Ssh, CheckKind::OutdatedSsh)
            .register(80, ServiceKind::Http, CheckKind::MissingFrameOptions)
            .register(443, ServiceKind::Https, CheckKind::ExpiredCertificate)
            .register(3389, ServiceKind::Rdp, CheckKind::ExposedRemoteDesktop);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::Severity;
    use crate::core::probe::{CertificateInfo, HeaderReport};
    use chrono::TimeZone;
    use strum::IntoEnumIterator;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn headers(missing: &[&str]) -> Evidence {
        Evidence::Headers(HeaderReport {
            status: 200,
            missing: missing.iter().map(|s| s.to_string()).collect(),
            ..HeaderReport::default()
        })
    }

    fn certificate(not_after: DateTime<Utc>) -> Evidence {
        Evidence::Certificate(CertificateInfo {
            subject_name: "CN=host".into(),
            issuer_name: "CN=ca".into(),
            not_before: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            not_after,
        })
    }

    #[test]
    fn every_check_has_a_knowledge_base_entry() {
        for check in CheckKind::iter() {
            assert!(get_finding_detail(check.code()).is_some(), "{check:?}");
        }
    }

    #[test]
    fn old_openssh_banner_is_high() {
        let evidence = Evidence::Banner("SSH-2.0-OpenSSH_7.4p1 Debian-10".into());
        let vuln = CheckKind::OutdatedSsh.evaluate(22, "ssh", &evidence, now()).unwrap();
        assert_eq!(vuln.severity, Severity::High);
        assert_eq!(vuln.risk_score, 7.5);
        assert_eq!(vuln.id, "ssh-22-ssh_outdated_version");
        assert_eq!(vuln.description, "SSH banner: SSH-2.0-OpenSSH_7.4p1 Debian-10");

        let current = Evidence::Banner("SSH-2.0-OpenSSH_9.6".into());
        assert!(CheckKind::OutdatedSsh.evaluate(22, "ssh", &current, now()).is_none());
    }

    #[test]
    fn missing_frame_options_is_medium() {
        let vuln = CheckKind::MissingFrameOptions
            .evaluate(80, "http", &headers(&["x-frame-options"]), now())
            .unwrap();
        assert_eq!((vuln.severity, vuln.risk_score), (Severity::Medium, 5.0));
        assert!(CheckKind::MissingFrameOptions.evaluate(80, "http", &headers(&["content-security-policy"]), now()).is_none());
    }

    #[test]
    fn expired_certificate_is_medium() {
        let expired = certificate(Utc.with_ymd_and_hms(2025, 5, 20, 0, 0, 0).unwrap());
        let vuln = CheckKind::ExpiredCertificate.evaluate(443, "https", &expired, now()).unwrap();
        assert_eq!((vuln.severity, vuln.risk_score), (Severity::Medium, 6.0));
        assert_eq!(vuln.description, "Certificate CN=host expired on 2025-05-20 (12 days ago)");

        let valid = certificate(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        assert!(CheckKind::ExpiredCertificate.evaluate(443, "https", &valid, now()).is_none());
    }

    #[test]
    fn reachable_rdp_is_critical() {
        let vuln = CheckKind::ExposedRemoteDesktop.evaluate(3389, "rdp", &Evidence::Reachable, now()).unwrap();
        assert_eq!((vuln.severity, vuln.port, vuln.risk_score), (Severity::Critical, 3389, 9.0));
    }

    #[test]
    fn mismatched_evidence_never_matches() {
        for check in CheckKind::iter() {
            let wrong = match check.probe() {
                ProbeKind::Reachability => Evidence::Banner("OpenSSH_5.1".into()),
                _ => Evidence::Reachable,
            };
            assert!(check.evaluate(1, "x", &wrong, now()).is_none(), "{check:?}");
        }
    }

    #[test]
    fn evaluation_is_repeatable() {
        let evidence = Evidence::Banner("SSH-2.0-OpenSSH_6.6".into());
        let first = CheckKind::OutdatedSsh.evaluate(22, "ssh", &evidence, now());
        let second = CheckKind::OutdatedSsh.evaluate(22, "ssh", &evidence, now());
        assert_eq!(first, second);
    }

    #[test]
    fn dispatch_requires_exact_port_and_service() {
        let registry = CheckRegistry::default();
        assert_eq!(registry.checks_for(3389, "rdp"), &[CheckKind::ExposedRemoteDesktop]);
        assert!(registry.checks_for(3389, "RDP").is_empty());
        assert!(registry.checks_for(8080, "http").is_empty());
        assert!(registry.checks_for(22, "unknown").is_empty());
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn registering_extends_coverage() {
        let mut registry = CheckRegistry::default();
        registry
            .register(8080, ServiceKind::Http, CheckKind::MissingFrameOptions)
            .register(8080, ServiceKind::Http, CheckKind::MissingFrameOptions);
        assert_eq!(registry.checks_for(8080, "http"), &[CheckKind::MissingFrameOptions]);
        assert_eq!(registry.len(), 5);
        assert!(CheckRegistry::empty().is_empty());
    }

    #[test]
    fn service_kind_round_trips_names() {
        assert_eq!(ServiceKind::from_name("https"), ServiceKind::Https);
        assert_eq!(ServiceKind::from_name("ms-sql-s").as_str(), "ms-sql-s");
        assert_eq!(ServiceKind::Rdp.to_string(), "rdp");
    }
}
