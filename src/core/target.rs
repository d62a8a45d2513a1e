// src/core/target.rs

use crate::core::error::{PortRangeError, TargetError};
use std::fmt;
use std::net::IpAddr;
use std::ops::RangeInclusive;
use std::str::FromStr;
use url::Url;

const MAX_HOSTNAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// A validated scan target: an IP literal or a lowercase DNS hostname.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Target {
    host: String,
}

impl Target {
    /// Parses user input into a target.
    ///
    /// Accepts a bare hostname, an IPv4/IPv6 literal (optionally bracketed) or a
    /// URL, in which case only its host part is kept. Anything that could be
    /// mistaken for a command-line option by the port scanner (a leading `-`)
    /// is rejected as an invalid host.
    pub fn parse(input: &str) -> Result<Self, TargetError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(TargetError::Empty);
        }

        let host = if trimmed.contains("://") {
            let url = Url::parse(trimmed).map_err(|e| TargetError::InvalidUrl(e.to_string()))?;
            url.host_str()
                .ok_or_else(|| TargetError::InvalidUrl(format!("{trimmed} has no host")))?
                .to_string()
        } else {
            trimmed.to_string()
        };

        let host = host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(Self { host: ip.to_string() });
        }

        let host = host.strip_suffix('.').unwrap_or(host).to_ascii_lowercase();
        if host.len() > MAX_HOSTNAME_LEN {
            return Err(TargetError::TooLong(host.len()));
        }
        if !is_valid_hostname(&host) {
            return Err(TargetError::InvalidHost(host));
        }
        Ok(Self { host })
    }

    pub fn as_str(&self) -> &str {
        &self.host
    }

    pub fn ip(&self) -> Option<IpAddr> {
        self.host.parse().ok()
    }

    /// Host part suitable for a URL authority (IPv6 literals are bracketed).
    pub fn url_host(&self) -> String {
        match self.ip() {
            Some(IpAddr::V6(v6)) => format!("[{v6}]"),
            _ => self.host.clone(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.host)
    }
}

fn is_valid_hostname(host: &str) -> bool {
    !host.is_empty()
        && host.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= MAX_LABEL_LEN
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

/// A set of TCP ports, written the way nmap's `-p` expects (`22,80,1000-2000`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortRange {
    ranges: Vec<RangeInclusive<u16>>,
}

impl Default for PortRange {
    /// The first thousand ports plus RDP, which sits outside them.
    fn default() -> Self {
        Self { ranges: vec![1..=1000, 3389..=3389] }
    }
}

impl FromStr for PortRange {
    type Err = PortRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut ranges = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let range = match part.split_once('-') {
                Some((start, end)) => {
                    let (start, end) = (parse_port(start)?, parse_port(end)?);
                    if start > end {
                        return Err(PortRangeError::Reversed { start, end });
                    }
                    start..=end
                }
                None => {
                    let port = parse_port(part)?;
                    port..=port
                }
            };
            ranges.push(range);
        }
        if ranges.is_empty() {
            return Err(PortRangeError::Empty);
        }
        Ok(Self { ranges })
    }
}

fn parse_port(raw: &str) -> Result<u16, PortRangeError> {
    match raw.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(PortRangeError::InvalidPort(raw.trim().to_string())),
        Ok(port) => Ok(port),
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .ranges
            .iter()
            .map(|r| if r.start() == r.end() { r.start().to_string() } else { format!("{}-{}", r.start(), r.end()) })
            .collect();
        f.write_str(&parts.join(","))
    }
}
