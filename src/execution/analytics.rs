//! Swap analytics events

use alloy::primitives::{Address, B256};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;
use crate::types::{RouterVersion, Trade};

pub const SWAP_CATEGORY: &str = "Swap";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub category: String,
    pub action: String,
    /// `IN/OUT/V2|V3/SH|MH`, the hop tag following the single-hop-only setting.
    pub label: String,
    pub chain_id: u64,
    pub tx_hash: B256,
    pub input_symbol: String,
    pub output_symbol: String,
    pub version: RouterVersion,
    pub single_hop_only: bool,
    pub input_amount: String,
    pub output_amount: String,
}

/// Event action by recipient: none, the account itself, or someone else.
pub fn swap_action(recipient: Option<Address>, account: Address) -> &'static str {
    match recipient {
        None => "Swap w/o Send",
        Some(r) if r == account => "Swap w/o Send + recipient",
        Some(_) => "Swap w/ Send",
    }
}

pub fn swap_label(trade: &Trade, single_hop_only: bool) -> String {
    format!(
        "{}/{}/{}/{}",
        trade.input.asset.symbol(),
        trade.output.asset.symbol(),
        trade.version,
        if single_hop_only { "SH" } else { "MH" }
    )
}

impl SwapEvent {
    pub fn new(
        trade: &Trade,
        tx_hash: B256,
        account: Address,
        recipient: Option<Address>,
        single_hop_only: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            category: SWAP_CATEGORY.to_string(),
            action: swap_action(recipient, account).to_string(),
            label: swap_label(trade, single_hop_only),
            chain_id: trade.input.asset.chain_id(),
            tx_hash,
            input_symbol: trade.input.asset.symbol().to_string(),
            output_symbol: trade.output.asset.symbol().to_string(),
            version: trade.version,
            single_hop_only,
            input_amount: trade.input.to_string(),
            output_amount: trade.output.to_string(),
        }
    }
}

/// Fire-and-forget event consumer. Implementations must not fail the swap.
pub trait AnalyticsSink: Send + Sync {
    fn record(&self, event: &SwapEvent);
}

/// Emits events as structured log lines.
pub struct TracingAnalytics;

impl AnalyticsSink for TracingAnalytics {
    fn record(&self, event: &SwapEvent) {
        info!(
            event_id = %event.id,
            category = %event.category,
            action = %event.action,
            label = %event.label,
            tx_hash = %event.tx_hash,
            "📈 Swap event"
        );
    }
}

/// Sends each event to every inner sink.
pub struct FanoutAnalytics(pub Vec<Box<dyn AnalyticsSink>>);

impl AnalyticsSink for FanoutAnalytics {
    fn record(&self, event: &SwapEvent) {
        for sink in &self.0 {
            sink.record(event);
        }
    }
}
