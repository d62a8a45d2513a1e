// src/lib.rs

//! Network reconnaissance and heuristic vulnerability assessment.
//!
//! The `core` module holds the scan pipeline (port scan, probes, checks, risk,
//! narrative, report store). The terminal front-end in `main.rs` is one consumer
//! of [`core::service::ScanService`].

pub mod config;
pub mod core;
pub mod logging;
