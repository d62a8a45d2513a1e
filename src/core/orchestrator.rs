// src/core/orchestrator.rs

use crate::core::checks::CheckRegistry;
use crate::core::error::ScanError;
use crate::core::models::{ScanData, ScanPhase, Vulnerability};
use crate::core::portscan::PortScanner;
use crate::core::probe::{within, Prober};
use crate::core::target::{PortRange, Target};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_CONCURRENT_CHECKS: usize = 32;

/// What one assessment saw and found.
#[derive(Debug, Clone, Default)]
pub struct Assessment {
    /// Empty (apart from the target) when the port scan failed.
    pub scan: ScanData,
    pub scan_error: Option<String>,
    pub vulnerabilities: Vec<Vulnerability>,
}

/// Runs the port scan and fans the registered checks out over the open ports.
pub struct Orchestrator {
    scanner: Arc<dyn PortScanner>,
    prober: Arc<dyn Prober>,
    registry: Arc<CheckRegistry>,
    ports: PortRange,
    check_timeout: Duration,
    max_concurrent_checks: usize,
}

impl Orchestrator {
    pub fn new(scanner: Arc<dyn PortScanner>, prober: Arc<dyn Prober>) -> Self {
        Self {
            scanner,
            prober,
            registry: Arc::new(CheckRegistry::default()),
            ports: PortRange::default(),
            check_timeout: DEFAULT_CHECK_TIMEOUT,
            max_concurrent_checks: DEFAULT_MAX_CONCURRENT_CHECKS,
        }
    }

    pub fn with_registry(mut self, registry: CheckRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_ports(mut self, ports: PortRange) -> Self {
        self.ports = ports;
        self
    }

    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = timeout;
        self
    }

    pub fn with_max_concurrent_checks(mut self, limit: usize) -> Self {
        self.max_concurrent_checks = limit.max(1);
        self
    }

    /// Delegates to the port-scan primitive. No retries.
    pub async fn scan_ports(&self, target: &Target) -> Result<ScanData, ScanError> {
        self.scanner.scan(target, &self.ports).await
    }

    /// Scans and checks `target`, degrading a failed scan to "no findings".
    ///
    /// # Arguments
    /// * `target` - The validated host to scan.
    ///
    /// # Returns
    /// The findings in dispatch order (port ascending, then registry order).
    /// Empty when the port scan failed or nothing matched.
    pub async fn assess_vulnerabilities(&self, target: &Target) -> Vec<Vulnerability> {
        self.assess(target, |_| {}).await.vulnerabilities
    }

    /// Same as [`assess_vulnerabilities`](Self::assess_vulnerabilities), keeping
    /// the scan data and reporting each phase change to `on_phase`.
    pub async fn assess(&self, target: &Target, on_phase: impl Fn(ScanPhase) + Send + Sync) -> Assessment {
        on_phase(ScanPhase::Scanning);
        let scan = match self.scan_ports(target).await {
            Ok(scan) => scan,
            Err(e) => {
                warn!(target = %target, error = %e, "Port scan failed, reporting no findings.");
                return Assessment {
                    scan: ScanData { target: target.to_string(), ..ScanData::default() },
                    scan_error: Some(e.to_string()),
                    vulnerabilities: Vec::new(),
                };
            }
        };

        on_phase(ScanPhase::Checking);
        let vulnerabilities = self.dispatch_checks(target, &scan).await;
        Assessment { scan, scan_error: None, vulnerabilities }
    }

    /// Runs every registered check for every open port concurrently.
    ///
    /// Output follows dispatch order (port ascending, then registry order), not
    /// completion order. A check that times out, panics or gets no probe signal
    /// contributes nothing and does not affect its siblings.
    pub async fn dispatch_checks(&self, target: &Target, scan: &ScanData) -> Vec<Vulnerability> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_checks));
        let target = Arc::new(target.clone());
        let now = Utc::now();
        let mut join_set: JoinSet<(usize, Option<Vulnerability>)> = JoinSet::new();
        let mut dispatched = 0usize;

        for &port in &scan.open_ports {
            let service = scan.service_name(port);
            for &check in self.registry.checks_for(port, service) {
                let slot = dispatched;
                dispatched += 1;

                let prober = Arc::clone(&self.prober);
                let semaphore = Arc::clone(&semaphore);
                let target = Arc::clone(&target);
                let service = service.to_string();
                let budget = self.check_timeout;

                join_set.spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return (slot, None);
                    };
                    let outcome = within(budget, prober.probe(check.probe(), &target, port)).await;
                    debug!(port, check = ?check, outcome = outcome.label(), "Check probe finished.");
                    let finding = outcome
                        .success()
                        .and_then(|evidence| check.evaluate(port, &service, &evidence, now));
                    (slot, finding)
                });
            }
        }

        info!(target = %target, checks = dispatched, "Dispatched checks.");

        let mut found: Vec<(usize, Vulnerability)> = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((slot, Some(vulnerability))) => found.push((slot, vulnerability)),
                Ok((_, None)) => {}
                Err(e) => warn!(error = %e, "Check task failed, treating it as no finding."),
            }
        }
        found.sort_by_key(|(slot, _)| *slot);

        info!(target = %target, findings = found.len(), "Checks finished.");
        found.into_iter().map(|(_, vulnerability)| vulnerability).collect()
    }
}
