// src/core/error.rs

use std::time::Duration;

/// Rejection of a target before any network activity.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("target is empty")]
    Empty,
    #[error("target is {0} characters long, the limit is 253")]
    TooLong(usize),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("'{0}' is not a valid hostname or IP address")]
    InvalidHost(String),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PortRangeError {
    #[error("port list is empty")]
    Empty,
    #[error("'{0}' is not a valid port")]
    InvalidPort(String),
    #[error("range {start}-{end} is reversed")]
    Reversed { start: u16, end: u16 },
}

/// The external port scan failed or the target could not be resolved.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("could not resolve {host}: {reason}")]
    Unresolvable { host: String, reason: String },
    #[error("failed to launch port scanner: {0}")]
    Launch(#[from] std::io::Error),
    #[error("port scan exceeded {0:?}")]
    Timeout(Duration),
    #[error("port scanner exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("unreadable port scanner output: {0}")]
    Parse(String),
    #[error("host {0} did not answer the port scan")]
    HostDown(String),
}

/// The external summarizer did not produce usable text.
#[derive(Debug, thiserror::Error)]
pub enum SummarizerError {
    #[error("no summarizer credential configured")]
    NotConfigured,
    #[error("summarizer request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("summarizer did not answer within {0:?}")]
    Timeout(Duration),
    #[error("summarizer answered with status {0}")]
    Status(reqwest::StatusCode),
    #[error("summarizer reply contained no text")]
    EmptyReply,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("no report stored for target {0}")]
pub struct ReportNotFound(pub String);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid value '{value}' for {key}: {reason}")]
pub struct ConfigError {
    pub key: String,
    pub value: String,
    pub reason: String,
}
