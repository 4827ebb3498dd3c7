//! Console summaries of a swap session

use std::collections::HashMap;
use std::time::Instant;
use tracing::{error, info, warn};
use crate::{
    errors::ErrorClass,
    routing::Resolution,
    types::{ApprovalState, PermitSignatureState, SlippageTolerance, SwapPhase, Trade, TradeState},
    validation::{GuardDecision, OwnershipStatus},
};

fn trade_state_line(state: &TradeState) -> String {
    match state {
        TradeState::Invalid => "-".to_string(),
        TradeState::Loading => "loading".to_string(),
        TradeState::NoRouteFound => "no route".to_string(),
        TradeState::Valid(t) => format!("{} -> {}", t.input, t.output),
    }
}

pub fn print_resolution(resolution: &Resolution) {
    info!("\n💱 QUOTE #{}", resolution.generation);
    info!("   V2: {}", trade_state_line(&resolution.v2));
    info!("   V3: {}", trade_state_line(&resolution.v3));
    match &resolution.best {
        Some(trade) => print_trade(trade),
        None if resolution.route_not_found => warn!("   ⚠️  Insufficient liquidity for this trade"),
        None => info!("   No trade"),
    }
}

pub fn print_trade(trade: &Trade) {
    info!("   Best: {} via {} ({} hop{})",
        trade.version,
        trade.route.path.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(" > "),
        trade.route.hops(),
        if trade.route.is_single_hop() { "" } else { "s" }
    );
    info!("   Input:  {}", trade.input);
    info!("   Output: {}", trade.output);
    info!("   Price:  {:.6} {}/{}", trade.execution_price, trade.output.asset, trade.input.asset);
    match trade.price_impact {
        Some(impact) => info!("   Impact: {:.2}%", impact * rust_decimal_macros::dec!(100)),
        None => info!("   Impact: unknown"),
    }
}

pub fn print_slippage(slippage: SlippageTolerance, auto: bool) {
    info!("🎚️  Slippage: {} ({})", slippage, if auto { "auto" } else { "manual" });
}

pub fn print_guard_decision(decision: GuardDecision) {
    match decision {
        GuardDecision::Allow => info!("🛡️  Price impact: OK"),
        GuardDecision::ConfirmRequired { severity } => {
            warn!("🛡️  Price impact severity {}: confirmation required", severity)
        }
        GuardDecision::Blocked { severity } => {
            error!("🛑 Price impact severity {}: swap blocked outside expert mode", severity)
        }
    }
}

pub fn print_approval(state: ApprovalState, permit: PermitSignatureState, show_approve_flow: bool) {
    let label = match state {
        ApprovalState::Unknown => "unknown".to_string(),
        ApprovalState::NotApproved => "not approved".to_string(),
        ApprovalState::Pending { tx_hash: Some(hash), .. } => format!("pending ({:?})", hash),
        ApprovalState::Pending { tx_hash: None, .. } => "pending".to_string(),
        ApprovalState::Approved => "approved".to_string(),
    };
    info!("🔐 Approval: {} | permit: {:?} | approve step shown: {}", label, permit, show_approve_flow);
}

pub fn print_ownership(status: OwnershipStatus) {
    match status {
        OwnershipStatus::Renounced => info!("👤 Output token ownership: renounced"),
        OwnershipStatus::Owned(owner) => warn!("👤 Output token owned by {}", owner),
        OwnershipStatus::Unknown => info!("👤 Output token ownership: unknown"),
    }
}

pub fn print_swap_phase(phase: &SwapPhase) {
    match phase {
        SwapPhase::Idle => info!("🔄 Swap: idle"),
        SwapPhase::Confirming => info!("🔄 Swap: awaiting confirmation"),
        SwapPhase::Submitting => info!("🔄 Swap: submitting"),
        SwapPhase::Success { tx_hash } => warn!("\n✅ SWAP SUBMITTED\n   Tx Hash: {:?}", tx_hash),
        SwapPhase::Failed { message } => error!("\n❌ SWAP FAILED\n   Error: {}", message),
    }
}

pub fn print_session_stats(start_time: Instant, error_counts: &HashMap<ErrorClass, u32>) {
    info!("\n📊 Session Statistics ({}s)", start_time.elapsed().as_secs());
    if error_counts.is_empty() {
        info!("   No errors");
        return;
    }
    info!("   Error summary:");
    for (class, count) in error_counts {
        info!("     {}: {}", class.as_str(), count);
    }
}
