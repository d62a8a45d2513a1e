// src/core/portscan.rs

//! The external port-scan primitive.
//!
//! [`NmapScanner`] shells out to `nmap` with service/version and OS detection,
//! reads its XML report from stdout and flattens it into [`ScanData`].

use crate::core::error::ScanError;
use crate::core::models::ScanData;
use crate::core::target::{PortRange, Target};
use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use serde::Deserialize;
use std::net::IpAddr;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Anything that can list the open ports and services of a host.
#[async_trait]
pub trait PortScanner: Send + Sync {
    async fn scan(&self, target: &Target, ports: &PortRange) -> Result<ScanData, ScanError>;
}

pub struct NmapScanner {
    binary: PathBuf,
    timeout: Duration,
    os_detection: bool,
}

impl NmapScanner {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self { binary: binary.into(), timeout, os_detection: true }
    }

    /// OS detection (`-O`) needs raw sockets; nmap refuses to run without root when it is on.
    pub fn with_os_detection(mut self, enabled: bool) -> Self {
        self.os_detection = enabled;
        self
    }

    fn command(&self, address: IpAddr, ports: &PortRange) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-sV");
        if self.os_detection {
            cmd.arg("-O").arg("--osscan-limit");
        }
        cmd.arg("-p")
            .arg(ports.to_string())
            .arg("-oX")
            .arg("-");
        if address.is_ipv6() {
            cmd.arg("-6");
        }
        cmd.arg(address.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl PortScanner for NmapScanner {
    async fn scan(&self, target: &Target, ports: &PortRange) -> Result<ScanData, ScanError> {
        let address = resolve(target).await?;
        let mut cmd = self.command(address, ports);
        info!(target = %target, %address, ports = %ports, "Starting port scan.");
        debug!("Executing nmap: {:?}", cmd);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| ScanError::Timeout(self.timeout))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(status = %output.status, stderr = %stderr, "nmap exited with error");
            return Err(ScanError::Failed { status: output.status.to_string(), stderr });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let data = parse_nmap_xml(target.as_str(), &stdout)?;
        info!(target = %target, open_ports = data.open_ports.len(), os = ?data.os_guess, "Port scan finished.");
        Ok(data)
    }
}

/// Turns the target into the address handed to the scanner.
pub async fn resolve(target: &Target) -> Result<IpAddr, ScanError> {
    if let Some(ip) = target.ip() {
        return Ok(ip);
    }
    let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());
    let lookup = resolver.lookup_ip(target.as_str()).await.map_err(|e| ScanError::Unresolvable {
        host: target.to_string(),
        reason: e.to_string(),
    })?;
    lookup.iter().next().ok_or_else(|| ScanError::Unresolvable {
        host: target.to_string(),
        reason: "no addresses returned".to_string(),
    })
}

// --- nmap XML schema (only the parts that are read) ---

#[derive(Debug, Deserialize)]
struct NmapRun {
    #[serde(rename = "host", default)]
    hosts: Vec<Host>,
}

#[derive(Debug, Deserialize)]
struct Host {
    status: Option<Status>,
    ports: Option<Ports>,
    os: Option<Os>,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(rename = "@state")]
    state: String,
}

#[derive(Debug, Deserialize)]
struct Ports {
    #[serde(rename = "port", default)]
    ports: Vec<Port>,
}

#[derive(Debug, Deserialize)]
struct Port {
    #[serde(rename = "@protocol")]
    protocol: String,
    #[serde(rename = "@portid")]
    portid: u16,
    state: PortState,
    service: Option<Service>,
}

#[derive(Debug, Deserialize)]
struct PortState {
    #[serde(rename = "@state")]
    state: String,
}

#[derive(Debug, Deserialize)]
struct Service {
    #[serde(rename = "@name")]
    name: Option<String>,
    #[serde(rename = "@product")]
    product: Option<String>,
    #[serde(rename = "@version")]
    version: Option<String>,
    #[serde(rename = "@tunnel")]
    tunnel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Os {
    #[serde(rename = "osmatch", default)]
    matches: Vec<OsMatch>,
}

#[derive(Debug, Deserialize)]
struct OsMatch {
    #[serde(rename = "@name")]
    name: String,
}

/// Flattens an nmap XML report into open ports and normalized service names.
///
/// Only TCP ports in the `open` state are kept. Fails when the report has no
/// host that answered.
pub fn parse_nmap_xml(target: &str, xml: &str) -> Result<ScanData, ScanError> {
    let run: NmapRun = quick_xml::de::from_str(xml).map_err(|e| ScanError::Parse(e.to_string()))?;

    let mut data = ScanData { target: target.to_string(), ..ScanData::default() };
    let mut answered = false;

    for host in run.hosts {
        if host.status.as_ref().is_some_and(|s| s.state != "up") {
            continue;
        }
        answered = true;

        let open = host
            .ports
            .map(|p| p.ports)
            .unwrap_or_default()
            .into_iter()
            .filter(|p| p.protocol == "tcp" && p.state.state == "open");
        for port in open {
            data.open_ports.insert(port.portid);
            data.services.insert(port.portid, normalize_service(port.service.as_ref()));
            if let Some(version) = port.service.as_ref().and_then(describe_version) {
                data.versions.insert(port.portid, version);
            }
        }

        if data.os_guess.is_none() {
            data.os_guess = host.os.and_then(|os| os.matches.into_iter().next()).map(|m| m.name);
        }
    }

    if !answered {
        return Err(ScanError::HostDown(target.to_string()));
    }
    Ok(data)
}

fn normalize_service(service: Option<&Service>) -> String {
    let Some(service) = service else {
        return "unknown".to_string();
    };
    let name = service.name.as_deref().map(str::trim).filter(|n| !n.is_empty()).unwrap_or("unknown");
    let tunneled = service.tunnel.as_deref() == Some("ssl");
    match name {
        "http" if tunneled => "https",
        "ssl/http" => "https",
        "ms-wbt-server" => "rdp",
        other => other,
    }
    .to_string()
}

fn describe_version(service: &Service) -> Option<String> {
    match (service.product.as_deref(), service.version.as_deref()) {
        (Some(product), Some(version)) => Some(format!("{product} {version}")),
        (Some(product), None) => Some(product.to_string()),
        _ => None,
    }
}
