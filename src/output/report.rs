//! Status reporting from the harvest database
//!
//! This module provides functionality for summarising a session and for
//! displaying the progress of every configured source.

use crate::config::Config;
use crate::harvest::{ScanStatus, SessionOutcome};
use crate::state::{checkpoint_key, Checkpoint, RotationState, ScanKind};
use crate::storage::SqliteStorage;
use crate::Result;

/// Human-readable summary of one full-scan session
pub fn format_session_summary(outcome: &SessionOutcome) -> String {
    let header = format!(
        "{}: +{} pages, +{} items in {:.1}s; total {} pages, {} items",
        outcome.source_name,
        outcome.pages_this_session,
        outcome.items_this_session,
        outcome.elapsed.as_secs_f64(),
        outcome.pages_scanned,
        outcome.total_collected
    );

    match outcome.status {
        ScanStatus::Done => format!("{}\nFull scan complete.", header),
        ScanStatus::Paused(reason) => {
            format!("{}\nPaused ({}); run again to continue.", header, reason)
        }
    }
}

/// Progress of one configured source
#[derive(Debug, Clone)]
pub struct SourceStatus {
    pub id: String,
    pub name: String,
    pub provider: String,
    pub enabled: bool,
    pub checkpoint: Checkpoint,
    /// Items in the sink for this source, from any path
    pub items_saved: u64,
}

/// Harvest progress across the whole pool
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub sources: Vec<SourceStatus>,
    /// Stored rotation offset, as persisted (not reduced to the pool size)
    pub rotation_offset: usize,
}

/// Loads the status of every configured source
///
/// Read-only: nothing is written to storage.
pub fn load_status(config: &Config, storage: &SqliteStorage) -> Result<StatusReport> {
    let mut sources = Vec::with_capacity(config.sources.len());

    for entry in &config.sources {
        let key = checkpoint_key(&entry.id, ScanKind::FullScan);
        sources.push(SourceStatus {
            id: entry.id.clone(),
            name: entry.name.clone(),
            provider: entry.provider.clone(),
            enabled: entry.enabled,
            checkpoint: Checkpoint::load(storage, &key)?,
            items_saved: storage.count_items(&entry.id)?,
        });
    }

    let rotation_offset = RotationState::load(storage)?.last_store_index;

    Ok(StatusReport {
        sources,
        rotation_offset,
    })
}

fn scan_state(checkpoint: &Checkpoint) -> &'static str {
    if checkpoint.active {
        if checkpoint.is_replaying() {
            "active (mid-page)"
        } else {
            "active"
        }
    } else if checkpoint.completed {
        "done"
    } else if checkpoint.pages_scanned > 0 {
        "inactive"
    } else {
        "idle"
    }
}

/// Prints the status report to stdout
pub fn print_status(report: &StatusReport) {
    println!("=== Harvest Status ===\n");

    if report.sources.is_empty() {
        println!("No sources configured.");
        return;
    }

    println!("Full scans:");
    for source in &report.sources {
        let disabled = if source.enabled { "" } else { " [disabled]" };
        println!(
            "  {} ({}, {}){}: {}",
            source.name,
            source.id,
            source.provider,
            disabled,
            scan_state(&source.checkpoint)
        );
        println!(
            "    pages scanned: {}, collected: {}, cursor: {}",
            source.checkpoint.pages_scanned,
            source.checkpoint.total_collected,
            source.checkpoint.short_cursor()
        );
        println!("    items saved: {}", source.items_saved);
    }
    println!();

    let active = report.sources.iter().filter(|s| s.enabled).count();
    if active > 0 {
        println!(
            "Rotation: next tick starts at index {} of {} active sources",
            report.rotation_offset % active,
            active
        );
    } else {
        println!("Rotation: no active sources");
    }
}
