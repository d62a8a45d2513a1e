// src/core/risk.rs

use crate::core::models::{SeveritySummary, Vulnerability};

/// Aggregate view of a finding list.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RiskSummary {
    /// Unrounded mean risk score; drives the narrative risk level.
    pub mean: f64,
    /// `mean` rounded to one decimal, as stored on the report.
    pub risk_score: f64,
    pub severity_summary: SeveritySummary,
}

/// Mean risk score and per-severity counts of `vulnerabilities`.
///
/// Scores are summed in ascending order so any permutation of the same
/// findings yields a bit-identical mean. Empty input gives 0.0.
pub fn aggregate(vulnerabilities: &[Vulnerability]) -> RiskSummary {
    let mut severity_summary = SeveritySummary::default();
    for vulnerability in vulnerabilities {
        severity_summary.record(vulnerability.severity);
    }

    if vulnerabilities.is_empty() {
        return RiskSummary { severity_summary, ..RiskSummary::default() };
    }

    let mut scores: Vec<f64> = vulnerabilities.iter().map(|v| v.risk_score).collect();
    scores.sort_by(f64::total_cmp);
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;

    RiskSummary { mean, risk_score: round_one_decimal(mean), severity_summary }
}

/// Rounds the way `{:.1}` formats, so a stored score and its rendering agree
/// (6.25 becomes 6.2, not 6.3).
fn round_one_decimal(value: f64) -> f64 {
    format!("{value:.1}").parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::Severity;

    fn vuln(severity: Severity, risk_score: f64) -> Vulnerability {
        Vulnerability {
            id: format!("x-{risk_score}"),
            severity,
            port: 1,
            service: "x".into(),
            issue: "x".into(),
            risk_score,
            cve: None,
            description: String::new(),
            remediation: String::new(),
        }
    }

    #[test]
    fn empty_list_scores_zero() {
        let summary = aggregate(&[]);
        assert_eq!(summary.mean, 0.0);
        assert_eq!(summary.risk_score, 0.0);
        assert_eq!(summary.severity_summary.total(), 0);
    }

    #[test]
    fn mean_and_counts() {
        let summary = aggregate(&[vuln(Severity::Critical, 9.0), vuln(Severity::Medium, 5.0), vuln(Severity::High, 7.5)]);
        assert!((summary.mean - 21.5 / 3.0).abs() < 1e-12);
        assert_eq!(summary.risk_score, 7.2);
        assert_eq!(summary.severity_summary.count(Severity::Critical), 1);
        assert_eq!(summary.severity_summary.count(Severity::High), 1);
        assert_eq!(summary.severity_summary.count(Severity::Medium), 1);
        assert_eq!(summary.severity_summary.count(Severity::Low), 0);
    }

    #[test]
    fn exact_halves_round_like_the_rendered_score() {
        let summary = aggregate(&[vuln(Severity::High, 7.5), vuln(Severity::Medium, 5.0)]);
        assert_eq!(summary.mean, 6.25);
        assert_eq!(summary.risk_score, 6.2);
        assert_eq!(format!("{:.1}", summary.mean), summary.risk_score.to_string());

        assert_eq!(aggregate(&[vuln(Severity::Critical, 9.0), vuln(Severity::High, 7.5)]).risk_score, 8.2);
    }

    #[test]
    fn permutations_are_bit_identical() {
        let scores = [0.1, 7.5, 0.2, 9.0, 0.3, 5.0, 6.0];
        let forward: Vec<_> = scores.iter().map(|&s| vuln(Severity::Low, s)).collect();
        let mut backward = forward.clone();
        backward.reverse();
        let mut shuffled = forward.clone();
        shuffled.swap(0, 4);
        shuffled.swap(2, 6);

        let expected = aggregate(&forward).mean.to_bits();
        assert_eq!(aggregate(&backward).mean.to_bits(), expected);
        assert_eq!(aggregate(&shuffled).mean.to_bits(), expected);
    }
}
