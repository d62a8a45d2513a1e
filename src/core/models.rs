// src/core/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use strum::{Display, EnumIter};

// --- Findings ---

/// Ordinal risk bucket of a finding, most severe first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

/// A single finding produced by one check against one open port.
///
/// Built only by `checks::CheckKind::evaluate`, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vulnerability {
    /// `<service>-<port>-<check code>`, stable across runs.
    pub id: String,
    pub severity: Severity,
    pub port: u16,
    pub service: String,
    pub issue: String,
    pub risk_score: f64,
    pub cve: Option<String>,
    pub description: String,
    pub remediation: String,
}

// --- Port Scan ---

/// Normalized output of one port-scan invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScanData {
    pub target: String,
    pub open_ports: BTreeSet<u16>,
    /// One normalized service name per open port ("unknown" when the scanner had none).
    pub services: BTreeMap<u16, String>,
    /// "product version" strings for ports where version detection succeeded.
    pub versions: BTreeMap<u16, String>,
    /// Best OS match reported by the scanner. Informational only.
    pub os_guess: Option<String>,
}

impl ScanData {
    pub fn service_name(&self, port: u16) -> &str {
        self.services.get(&port).map(String::as_str).unwrap_or("unknown")
    }
}

// --- Risk ---

/// Number of findings per severity bucket.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeveritySummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeveritySummary {
    pub fn count(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }

    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }
}

// --- Narrative Analysis ---

/// The four named sections of a narrative analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NarrativeSections {
    #[serde(default, deserialize_with = "text_or_joined")]
    pub risk_assessment: String,
    #[serde(default, deserialize_with = "list_or_text")]
    pub priority_recommendations: Vec<String>,
    #[serde(default, deserialize_with = "text_or_joined")]
    pub executive_summary: String,
    #[serde(default, deserialize_with = "list_or_text")]
    pub remediation_steps: Vec<String>,
}

/// Narrative attached to a report: either the structured sections, or the raw
/// summarizer text when it could not be parsed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum NarrativeAnalysis {
    Raw { analysis: String },
    Sections(NarrativeSections),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrList {
    Text(String),
    List(Vec<String>),
}

// Summarizers are inconsistent about whether a section is a string or a list.
fn list_or_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match TextOrList::deserialize(deserializer)? {
        TextOrList::List(items) => items,
        TextOrList::Text(text) => text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect(),
    })
}

fn text_or_joined<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match TextOrList::deserialize(deserializer)? {
        TextOrList::Text(text) => text,
        TextOrList::List(items) => items.join("\n"),
    })
}

// --- Report ---

/// Lifecycle of a scan job for one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ScanPhase {
    Pending,
    Scanning,
    Checking,
    Aggregating,
    Complete,
}

/// The assembled result of one scan job. Stored behind an `Arc` and never
/// mutated; a later scan of the same target replaces it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub target: String,
    pub scan_time: DateTime<Utc>,
    pub open_ports: Vec<u16>,
    pub services: BTreeMap<u16, String>,
    /// "product version" per port, where the scanner detected one.
    #[serde(default)]
    pub versions: BTreeMap<u16, String>,
    pub os_guess: Option<String>,
    /// Set when the port scan itself failed, so an empty finding list can be
    /// told apart from a clean host.
    pub scan_error: Option<String>,
    pub vulnerabilities: Vec<Vulnerability>,
    pub vulnerability_count: usize,
    pub risk_score: f64,
    pub severity_summary: SeveritySummary,
    pub narrative_analysis: NarrativeAnalysis,
}
