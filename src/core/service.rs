// src/core/service.rs

//! The consumer-facing entry point.
//!
//! [`ScanService`] validates a target, runs one job per request on the tokio
//! runtime and keeps the latest [`Report`] per target. Front-ends only talk to
//! this type.

use crate::core::error::{ReportNotFound, SummarizerError, TargetError};
use crate::core::models::{Report, ScanPhase};
use crate::core::narrative::Narrator;
use crate::core::orchestrator::Orchestrator;
use crate::core::risk;
use crate::core::store::ReportStore;
use crate::core::target::Target;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub struct ScanService {
    orchestrator: Orchestrator,
    narrator: Narrator,
    store: ReportStore,
    // Only targets with a job queued or running have an entry in either map.
    phases: DashMap<String, ScanPhase>,
    // One job per target at a time; later requests queue on this.
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ScanService {
    pub fn new(orchestrator: Orchestrator, narrator: Narrator) -> Self {
        Self {
            orchestrator,
            narrator,
            store: ReportStore::new(),
            phases: DashMap::new(),
            locks: DashMap::new(),
        }
    }

    /// Validates `input` and spawns a scan job for it.
    ///
    /// Returns immediately. Invalid input is rejected here, before any network
    /// activity. The handle resolves to the stored report; dropping it does not
    /// cancel the job.
    pub fn start_scan(self: &Arc<Self>, input: &str) -> Result<JoinHandle<Arc<Report>>, TargetError> {
        let target = Target::parse(input)?;
        // A job already running for this target keeps reporting its own phase.
        self.phases.entry(target.to_string()).or_insert(ScanPhase::Pending);
        info!(target = %target, "Scan job accepted.");

        let service = Arc::clone(self);
        Ok(tokio::spawn(async move { service.generate_report(&target).await }))
    }

    /// Runs the whole pipeline for `target` and stores the result.
    ///
    /// Jobs for the same target run one after the other; jobs for different
    /// targets run concurrently. A failed port scan or summarizer never fails
    /// the job, it only shows in the report.
    ///
    /// # Arguments
    /// * `target` - An already validated target.
    ///
    /// # Returns
    /// The stored report, which replaces any earlier report for the same target.
    pub async fn generate_report(&self, target: &Target) -> Arc<Report> {
        let key = target.to_string();
        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        let running = lock.lock().await;

        let assessment = self.orchestrator.assess(target, |phase| self.set_phase(&key, phase)).await;

        self.set_phase(&key, ScanPhase::Aggregating);
        let summary = risk::aggregate(&assessment.vulnerabilities);
        let narrative_analysis = self.narrator.analyze(&key, &assessment.vulnerabilities).await;

        let report = Arc::new(Report {
            target: key.clone(),
            scan_time: Utc::now(),
            open_ports: assessment.scan.open_ports.iter().copied().collect(),
            services: assessment.scan.services,
            versions: assessment.scan.versions,
            os_guess: assessment.scan.os_guess,
            scan_error: assessment.scan_error,
            vulnerability_count: assessment.vulnerabilities.len(),
            vulnerabilities: assessment.vulnerabilities,
            risk_score: summary.risk_score,
            severity_summary: summary.severity_summary,
            narrative_analysis,
        });

        self.store.insert(Arc::clone(&report));
        debug!(target = %key, phase = %ScanPhase::Complete, "Job phase changed.");
        self.phases.remove(&key);

        drop(running);
        drop(lock);
        // Nobody else holds or waits on the lock once the map owns the only handle.
        self.locks.remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);
        info!(
            target = %key,
            findings = report.vulnerability_count,
            risk_score = report.risk_score,
            scan_error = ?report.scan_error,
            "Report stored."
        );
        report
    }

    /// Latest report for `target`. Input is normalized the same way as in
    /// [`start_scan`](Self::start_scan).
    pub fn get_report(&self, target: &str) -> Result<Arc<Report>, ReportNotFound> {
        let key = Target::parse(target).map(|t| t.to_string()).map_err(|_| ReportNotFound(target.to_string()))?;
        self.store.get(&key)
    }

    pub fn list_reports(&self) -> Vec<Arc<Report>> {
        self.store.list_all()
    }

    /// Configures (or, with an empty key, clears) the summarizer credential.
    pub async fn set_summarizer_credential(&self, api_key: &str) -> Result<(), SummarizerError> {
        self.narrator.set_credential(api_key).await
    }

    /// Phase of the job queued or running for `target`, or `Complete` when
    /// none is and a report is stored. `None` if no job was ever started.
    pub fn job_phase(&self, target: &str) -> Option<ScanPhase> {
        let key = Target::parse(target).ok()?.to_string();
        if let Some(phase) = self.phases.get(&key) {
            return Some(*phase.value());
        }
        self.store.get(&key).ok().map(|_| ScanPhase::Complete)
    }

    fn set_phase(&self, key: &str, phase: ScanPhase) {
        debug!(target = key, phase = %phase, "Job phase changed.");
        self.phases.insert(key.to_string(), phase);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ScanError;
    use crate::core::models::{NarrativeAnalysis, ScanData, Severity};
    use crate::core::narrative::tests::serve_once;
    use crate::core::narrative::{local_analysis, SummarizerSettings};
    use crate::core::orchestrator::tests::{missing_frame_options, Behaviour, StubProber, StubScanner};
    use crate::core::portscan::PortScanner;
    use crate::core::probe::{Evidence, Outcome};
    use crate::core::target::PortRange;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;

    fn service(scanner: impl PortScanner + 'static, prober: StubProber, narrator: Narrator) -> Arc<ScanService> {
        let orchestrator = Orchestrator::new(Arc::new(scanner), Arc::new(prober)).with_check_timeout(Duration::from_millis(300));
        Arc::new(ScanService::new(orchestrator, narrator))
    }

    fn unconfigured() -> Narrator {
        Narrator::new(SummarizerSettings::default())
    }

    #[tokio::test]
    async fn exposed_rdp_report() {
        let svc = service(
            StubScanner::open(&[(22, "ssh"), (3389, "rdp")]),
            StubProber::default().on(3389, Behaviour::Answer(Outcome::Success(Evidence::Reachable))),
            unconfigured(),
        );
        let report = svc.start_scan("10.0.0.5").unwrap().await.unwrap();

        assert_eq!(report.open_ports, vec![22, 3389]);
        assert_eq!(report.vulnerability_count, report.vulnerabilities.len());
        assert_eq!(report.vulnerability_count, 1);
        assert_eq!(report.vulnerabilities[0].severity, Severity::Critical);
        assert_eq!(report.risk_score, 9.0);
        assert_eq!(report.severity_summary.critical, 1);
        assert!(report.vulnerabilities.iter().all(|v| report.open_ports.contains(&v.port)));
        assert_eq!(report.narrative_analysis, local_analysis("10.0.0.5", &report.vulnerabilities));
        assert_eq!(svc.job_phase("10.0.0.5"), Some(ScanPhase::Complete));
    }

    #[tokio::test]
    async fn failed_scan_still_yields_a_report() {
        let svc = service(StubScanner::failing(), StubProber::default(), unconfigured());
        let report = svc.start_scan("10.0.0.9").unwrap().await.unwrap();

        assert_eq!(report.vulnerability_count, 0);
        assert_eq!(report.risk_score, 0.0);
        assert!(report.open_ports.is_empty());
        assert!(report.scan_error.is_some());
        assert_eq!(report.narrative_analysis, local_analysis("10.0.0.9", &[]));
        assert!(Arc::ptr_eq(&svc.get_report("10.0.0.9").unwrap(), &report));
    }

    #[tokio::test]
    async fn summarizer_error_matches_unconfigured_narrative() {
        let endpoint = serve_once("HTTP/1.1 500 Internal Server Error", "{\"error\": \"boom\"}".to_string()).await;
        let narrator = Narrator::new(SummarizerSettings { endpoint, timeout: Duration::from_secs(5), ..SummarizerSettings::default() });
        let svc = service(
            StubScanner::open(&[(80, "http")]),
            StubProber::default().on(80, Behaviour::Answer(Outcome::Success(missing_frame_options()))),
            narrator,
        );
        svc.set_summarizer_credential("sk-test").await.unwrap();

        let report = svc.start_scan("http://web.example:8080/login").unwrap().await.unwrap();
        assert_eq!(report.target, "web.example");
        assert_eq!(report.vulnerability_count, 1);
        assert_eq!(report.risk_score, 5.0);
        assert_eq!(report.narrative_analysis, local_analysis("web.example", &report.vulnerabilities));
    }

    #[tokio::test]
    async fn rescan_replaces_previous_report() {
        let svc = service(StubScanner::open(&[(80, "http")]), StubProber::default(), unconfigured());
        let first = svc.start_scan("host.example").unwrap().await.unwrap();
        let second = svc.start_scan("HOST.example").unwrap().await.unwrap();

        let stored = svc.get_report("host.example").unwrap();
        assert!(Arc::ptr_eq(&stored, &second));
        assert!(!Arc::ptr_eq(&stored, &first));
        assert_eq!(svc.list_reports().len(), 1);
    }

    #[tokio::test]
    async fn invalid_targets_are_rejected_before_scanning() {
        let scanner = Arc::new(StubScanner::open(&[(80, "http")]));
        let orchestrator = Orchestrator::new(scanner.clone(), Arc::new(StubProber::default()));
        let svc = Arc::new(ScanService::new(orchestrator, unconfigured()));

        assert_eq!(svc.start_scan("   ").unwrap_err(), TargetError::Empty);
        assert!(matches!(svc.start_scan("-oX"), Err(TargetError::InvalidHost(_))));
        assert!(matches!(svc.start_scan(&"a".repeat(300)), Err(TargetError::TooLong(_))));
        assert_eq!(scanner.calls.load(Ordering::SeqCst), 0);
        assert!(svc.job_phase("-oX").is_none());
    }

    #[tokio::test]
    async fn unknown_target_has_no_report() {
        let svc = service(StubScanner::open(&[]), StubProber::default(), unconfigured());
        assert_eq!(svc.get_report("never.example").unwrap_err(), ReportNotFound("never.example".into()));
        assert!(svc.job_phase("never.example").is_none());
    }

    /// Scanner that records how many scans overlap.
    #[derive(Default)]
    struct SlowScanner {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl PortScanner for SlowScanner {
        async fn scan(&self, target: &Target, _ports: &PortRange) -> Result<ScanData, ScanError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(ScanData { target: target.to_string(), ..ScanData::default() })
        }
    }

    #[tokio::test]
    async fn jobs_for_one_target_do_not_overlap() {
        let scanner = Arc::new(SlowScanner::default());
        let orchestrator = Orchestrator::new(scanner.clone(), Arc::new(StubProber::default()));
        let svc = Arc::new(ScanService::new(orchestrator, unconfigured()));

        let first = svc.start_scan("10.1.1.1").unwrap();
        let second = svc.start_scan("10.1.1.1").unwrap();
        let (_, latest) = (first.await.unwrap(), second.await.unwrap());

        assert_eq!(scanner.peak.load(Ordering::SeqCst), 1);
        assert_eq!(svc.list_reports().len(), 1);
        assert!(Arc::ptr_eq(&svc.get_report("10.1.1.1").unwrap(), &latest));
    }

    #[tokio::test]
    async fn stored_score_matches_narrative_score() {
        let svc = service(
            StubScanner::open(&[(22, "ssh"), (80, "http")]),
            StubProber::default()
                .on(22, Behaviour::Answer(Outcome::Success(Evidence::Banner("SSH-2.0-OpenSSH_7.4".into()))))
                .on(80, Behaviour::Answer(Outcome::Success(missing_frame_options()))),
            unconfigured(),
        );
        let report = svc.start_scan("10.0.0.7").unwrap().await.unwrap();

        assert_eq!(report.vulnerability_count, 2);
        assert_eq!(report.risk_score, 6.2);
        let NarrativeAnalysis::Sections(sections) = &report.narrative_analysis else {
            panic!("expected local sections, got {:?}", report.narrative_analysis);
        };
        assert_eq!(sections.risk_assessment, format!("Overall risk score: {:.1}/10", report.risk_score));
    }

    #[tokio::test]
    async fn detected_versions_reach_the_report() {
        let svc = service(
            StubScanner::open(&[(22, "ssh"), (80, "http")]).version(22, "OpenSSH 7.4"),
            StubProber::default(),
            unconfigured(),
        );
        let report = svc.start_scan("10.0.0.8").unwrap().await.unwrap();
        assert_eq!(report.versions.get(&22).map(String::as_str), Some("OpenSSH 7.4"));
        assert!(!report.versions.contains_key(&80));
    }

    /// Scanner that blocks each scan until the test hands out a permit.
    struct GatedScanner {
        gate: Semaphore,
    }

    #[async_trait]
    impl PortScanner for GatedScanner {
        async fn scan(&self, target: &Target, _ports: &PortRange) -> Result<ScanData, ScanError> {
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
            Ok(ScanData { target: target.to_string(), ..ScanData::default() })
        }
    }

    #[tokio::test]
    async fn queued_job_does_not_reset_running_phase() {
        let scanner = Arc::new(GatedScanner { gate: Semaphore::new(0) });
        let orchestrator = Orchestrator::new(scanner.clone(), Arc::new(StubProber::default()));
        let svc = Arc::new(ScanService::new(orchestrator, unconfigured()));

        let first = svc.start_scan("10.2.2.2").unwrap();
        while svc.job_phase("10.2.2.2") != Some(ScanPhase::Scanning) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let second = svc.start_scan("10.2.2.2").unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(svc.job_phase("10.2.2.2"), Some(ScanPhase::Scanning));

        scanner.gate.add_permits(2);
        first.await.unwrap();
        second.await.unwrap();

        assert_eq!(svc.job_phase("10.2.2.2"), Some(ScanPhase::Complete));
        assert!(svc.phases.is_empty());
        assert!(svc.locks.is_empty());
    }
}
