// src/core/mod.rs

/// Data structures shared by the whole pipeline: `Vulnerability`, `ScanData`,
/// `Report` and `Severity`.
pub mod models;

/// Error types surfaced by target parsing, port scanning, summarization and lookups.
pub mod error;

/// Target host and port-range parsing. Rejects malformed input before any network I/O.
pub mod target;

/// Static table of finding texts (issue, description, remediation) per check.
pub mod knowledge_base;

/// Network probe primitives (banner, HTTP headers, TLS certificate, reachability).
pub mod probe;

/// The check registry mapping `(port, service)` to checks, and the checks themselves.
pub mod checks;

/// External port-scan primitive (nmap) and output normalization.
pub mod portscan;

/// Port scan + concurrent check dispatch.
pub mod orchestrator;

/// Deterministic risk aggregation.
pub mod risk;

/// Narrative analysis: external summarizer with a local deterministic fallback.
pub mod narrative;

/// In-memory store of the latest report per target.
pub mod store;

/// Report assembly and the consumer-facing scan service.
pub mod service;

/// JSON export of finished reports.
pub mod export;
