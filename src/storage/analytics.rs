//! Swap analytics persisted as JSON lines

use anyhow::Result;
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, error};
use crate::execution::{AnalyticsSink, SwapEvent};

pub const ANALYTICS_DIR: &str = "output/analytics";

pub fn save_swap_event(dir: &str, event: &SwapEvent) -> Result<PathBuf> {
    let filename = PathBuf::from(dir).join(format!("swaps_{}.jsonl", Utc::now().format("%Y-%m-%d")));

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&filename)?;

    writeln!(file, "{}", serde_json::to_string(event)?)?;

    debug!(
        event_id = %event.id,
        label = %event.label,
        tx_hash = %event.tx_hash,
        "Saved swap event"
    );

    Ok(filename)
}

/// Appends every event to the day's file. Write failures are logged and dropped.
pub struct JsonlAnalytics {
    dir: String,
}

impl JsonlAnalytics {
    pub fn new(dir: impl Into<String>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Default for JsonlAnalytics {
    fn default() -> Self {
        Self::new(ANALYTICS_DIR)
    }
}

impl AnalyticsSink for JsonlAnalytics {
    fn record(&self, event: &SwapEvent) {
        if let Err(e) = save_swap_event(&self.dir, event) {
            error!("Failed to save swap event: {}", e);
        }
    }
}
