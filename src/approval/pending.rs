//! Locally submitted approval transactions awaiting a receipt

use alloy::primitives::{Address, B256};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingApproval {
    pub tx_hash: B256,
    pub token: Address,
    pub spender: Address,
    pub added_at: DateTime<Utc>,
    /// `Some(success)` once the receipt was seen.
    pub outcome: Option<bool>,
}

/// Approval transactions keyed by hash. An entry counts as pending while it
/// has no receipt and is younger than the tracking window.
#[derive(Debug, Clone)]
pub struct PendingApprovals {
    entries: HashMap<B256, PendingApproval>,
    window: Duration,
}

impl PendingApprovals {
    pub fn new(window_secs: i64) -> Self {
        Self {
            entries: HashMap::new(),
            window: Duration::seconds(window_secs),
        }
    }

    pub fn add(&mut self, tx_hash: B256, token: Address, spender: Address) {
        self.add_at(tx_hash, token, spender, Utc::now());
    }

    pub fn add_at(&mut self, tx_hash: B256, token: Address, spender: Address, added_at: DateTime<Utc>) {
        debug!(%tx_hash, %token, %spender, "Tracking approval transaction");
        self.entries.insert(tx_hash, PendingApproval {
            tx_hash,
            token,
            spender,
            added_at,
            outcome: None,
        });
    }

    pub fn get(&self, tx_hash: &B256) -> Option<&PendingApproval> {
        self.entries.get(tx_hash)
    }

    /// Hash of the newest outstanding approval for the pair.
    pub fn pending_for(&self, token: Address, spender: Address) -> Option<B256> {
        self.pending_for_at(token, spender, Utc::now())
    }

    pub fn pending_for_at(&self, token: Address, spender: Address, now: DateTime<Utc>) -> Option<B256> {
        self.entries
            .values()
            .filter(|p| p.token == token && p.spender == spender)
            .filter(|p| p.outcome.is_none() && now - p.added_at < self.window)
            .max_by_key(|p| p.added_at)
            .map(|p| p.tx_hash)
    }

    /// Records the receipt outcome. Returns the entry if it was tracked.
    pub fn finalize(&mut self, tx_hash: B256, success: bool) -> Option<&PendingApproval> {
        let entry = self.entries.get_mut(&tx_hash)?;
        entry.outcome = Some(success);
        Some(entry)
    }

    /// Drops entries that are finalized or past the window.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let window = self.window;
        self.entries.retain(|_, p| p.outcome.is_none() && now - p.added_at < window);
    }

    pub fn outstanding(&self) -> Vec<B256> {
        let now = Utc::now();
        self.entries
            .values()
            .filter(|p| p.outcome.is_none() && now - p.added_at < self.window)
            .map(|p| p.tx_hash)
            .collect()
    }
}
