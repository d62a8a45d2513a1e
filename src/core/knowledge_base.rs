//! Static, read-only table of every finding a check can raise, with the
//! human-readable texts and the numeric score attached to it.
//! Keeping the texts here lets the checks stay small pure functions.

use crate::core::models::Severity;

/// Everything needed to turn a check hit into a `Vulnerability`.
pub struct FindingDetail {
    /// Machine-readable code, also the last segment of the vulnerability id.
    pub code: &'static str,
    /// Short label shown in lists.
    pub issue: &'static str,
    pub severity: Severity,
    pub risk_score: f64,
    pub cve: Option<&'static str>,
    pub description: &'static str,
    pub remediation: &'static str,
}

static FINDINGS: &[FindingDetail] = &[
    FindingDetail {
        code: "SSH_OUTDATED_VERSION",
        issue: "Outdated SSH version detected",
        severity: Severity::High,
        risk_score: 7.5,
        cve: None,
        description: "The SSH banner advertises an OpenSSH release from the 5.x-7.x series. These releases are out of support and carry publicly documented weaknesses, including user enumeration and outdated key exchange defaults.",
        remediation: "Update to latest SSH version",
    },
    FindingDetail {
        code: "HTTP_X_FRAME_OPTIONS_MISSING",
        issue: "Missing X-Frame-Options header",
        severity: Severity::Medium,
        risk_score: 5.0,
        cve: None,
        description: "Website vulnerable to clickjacking attacks. Without X-Frame-Options an attacker can load the site in an invisible frame and trick visitors into clicking on hidden controls.",
        remediation: "Add X-Frame-Options header",
    },
    FindingDetail {
        code: "TLS_CERTIFICATE_EXPIRED",
        issue: "SSL certificate expired",
        severity: Severity::Medium,
        risk_score: 6.0,
        cve: None,
        description: "SSL certificate has expired. Clients will show security warnings, and users trained to click through them become easy targets for interception.",
        remediation: "Renew SSL certificate",
    },
    FindingDetail {
        code: "RDP_EXPOSED",
        issue: "RDP exposed to internet",
        severity: Severity::Critical,
        risk_score: 9.0,
        cve: None,
        description: "RDP service accessible from external network. Exposed remote-desktop endpoints are a primary target for credential brute forcing and pre-authentication exploits.",
        remediation: "Restrict RDP access to trusted networks only",
    },
];

/// Looks up the detail for a finding code, `None` for unknown codes.
pub fn get_finding_detail(code: &str) -> Option<&'static FindingDetail> {
    FINDINGS.iter().find(|f| f.code == code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_unique_and_scores_in_range() {
        for (i, finding) in FINDINGS.iter().enumerate() {
            assert!((0.0..=10.0).contains(&finding.risk_score), "{}", finding.code);
            assert!(!finding.remediation.is_empty());
            assert!(FINDINGS[i + 1..].iter().all(|other| other.code != finding.code));
        }
    }

    #[test]
    fn unknown_codes_are_absent() {
        assert!(get_finding_detail("RDP_EXPOSED").is_some());
        assert!(get_finding_detail("NOT_A_FINDING").is_none());
    }
}
