// src/core/store.rs

use crate::core::error::ReportNotFound;
use crate::core::models::Report;
use dashmap::DashMap;
use std::sync::Arc;

/// Latest report per target. Values are replaced whole, never edited.
#[derive(Debug, Default)]
pub struct ReportStore {
    reports: DashMap<String, Arc<Report>>,
}

impl ReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `report` under its target, dropping any earlier one.
    pub fn insert(&self, report: Arc<Report>) {
        self.reports.insert(report.target.clone(), report);
    }

    pub fn get(&self, target: &str) -> Result<Arc<Report>, ReportNotFound> {
        self.reports
            .get(target)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ReportNotFound(target.to_string()))
    }

    /// Point-in-time snapshot sorted by target.
    pub fn list_all(&self) -> Vec<Arc<Report>> {
        let mut reports: Vec<Arc<Report>> = self.reports.iter().map(|entry| Arc::clone(entry.value())).collect();
        reports.sort_by(|a, b| a.target.cmp(&b.target));
        reports
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{NarrativeAnalysis, SeveritySummary};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn report(target: &str, risk_score: f64) -> Arc<Report> {
        Arc::new(Report {
            target: target.to_string(),
            scan_time: Utc::now(),
            open_ports: Vec::new(),
            services: BTreeMap::new(),
            versions: BTreeMap::new(),
            os_guess: None,
            scan_error: None,
            vulnerabilities: Vec::new(),
            vulnerability_count: 0,
            risk_score,
            severity_summary: SeveritySummary::default(),
            narrative_analysis: NarrativeAnalysis::Raw { analysis: String::new() },
        })
    }

    #[test]
    fn missing_target_is_an_error() {
        let store = ReportStore::new();
        assert_eq!(store.get("10.0.0.1").unwrap_err(), ReportNotFound("10.0.0.1".into()));
    }

    #[test]
    fn insert_replaces_previous_report() {
        let store = ReportStore::new();
        store.insert(report("a.example", 1.0));
        store.insert(report("a.example", 2.0));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a.example").unwrap().risk_score, 2.0);
    }

    #[test]
    fn snapshot_is_sorted_and_detached() {
        let store = ReportStore::new();
        store.insert(report("zeta.example", 0.0));
        store.insert(report("alpha.example", 0.0));
        let snapshot = store.list_all();
        store.insert(report("mid.example", 0.0));

        let targets: Vec<&str> = snapshot.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(targets, vec!["alpha.example", "zeta.example"]);
        assert_eq!(store.list_all().len(), 3);
    }
}
