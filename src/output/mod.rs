//! Output module for session summaries and status reports
//!
//! This module handles:
//! - Formatting the operator summary of a full-scan session
//! - Loading and printing per-source progress from the database

mod report;

pub use report::{format_session_summary, load_status, print_status, SourceStatus, StatusReport};
