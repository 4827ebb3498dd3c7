//! Price impact severity and the pre-swap guard

use async_trait::async_trait;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::{info, warn};
use crate::{
    config::ImpactThresholds,
    routing::RoutingEngine,
    types::{fiat_stablecoin, Asset, CurrencyAmount, QuoteRequest, Token, TradeType},
};

/// Severity tier 0..=4 for an impact fraction.
pub fn severity(impact: Option<Decimal>, thresholds: &ImpactThresholds) -> u8 {
    let Some(impact) = impact else {
        return 0;
    };
    if impact >= thresholds.blocked {
        4
    } else if impact >= thresholds.high {
        3
    } else if impact >= thresholds.medium {
        2
    } else if impact >= thresholds.low {
        1
    } else {
        0
    }
}

/// `1 - out/in` over fiat values; `None` when either side is unknown or zero.
pub fn fiat_value_impact(fiat_in: Option<Decimal>, fiat_out: Option<Decimal>) -> Option<Decimal> {
    let (fiat_in, fiat_out) = (fiat_in?, fiat_out?);
    if fiat_in.is_zero() || fiat_out.is_zero() {
        return None;
    }
    Some(dec!(1) - fiat_out / fiat_in)
}

pub fn worse_impact(a: Option<Decimal>, b: Option<Decimal>) -> Option<Decimal> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Value of `amount` in the chain's fiat stablecoin, quoted through `engine`.
pub async fn fiat_value(engine: &dyn RoutingEngine, amount: &CurrencyAmount) -> Option<Decimal> {
    let chain_id = amount.asset.chain_id();
    let (stable, decimals) = fiat_stablecoin(chain_id)?;
    if amount.asset.token_address() == Some(stable) {
        return amount.to_decimal();
    }

    let stable_asset = Asset::Token(Token {
        chain_id,
        address: stable,
        decimals,
        symbol: "USD".into(),
        name: "USD".into(),
        permit: None,
    });
    let request = QuoteRequest {
        input: amount.asset.clone(),
        output: stable_asset,
        amount: amount.clone(),
        trade_type: TradeType::ExactInput,
        single_hop_only: false,
    };

    match engine.quote(&request).await {
        Ok(Some(trade)) => trade.output.to_decimal(),
        Ok(None) => None,
        Err(e) => {
            warn!("⚠️ Fiat valuation failed for {}: {}", amount.asset, e);
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GuardDecision {
    Allow,
    /// Allowed only after the user explicitly confirms the impact.
    ConfirmRequired { severity: u8 },
    Blocked { severity: u8 },
}

/// Asks the user to accept a high price impact.
#[async_trait]
pub trait ImpactConfirmer: Send + Sync {
    async fn confirm_price_impact(&self, impact: Decimal) -> bool;
}

/// Confirms every prompt.
pub struct AcceptAll;

#[async_trait]
impl ImpactConfirmer for AcceptAll {
    async fn confirm_price_impact(&self, _impact: Decimal) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
pub struct PriceImpactGuard {
    thresholds: ImpactThresholds,
}

impl PriceImpactGuard {
    pub fn new(thresholds: ImpactThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ImpactThresholds {
        &self.thresholds
    }

    /// Expert mode always allows. Otherwise the top tier blocks and the one
    /// below it needs confirmation.
    pub fn evaluate(&self, execution_impact: Option<Decimal>, fiat_impact: Option<Decimal>, expert_mode: bool) -> GuardDecision {
        let severity = severity(worse_impact(execution_impact, fiat_impact), &self.thresholds);
        if expert_mode {
            return GuardDecision::Allow;
        }
        match severity {
            4 => GuardDecision::Blocked { severity },
            3 => GuardDecision::ConfirmRequired { severity },
            _ => GuardDecision::Allow,
        }
    }

    /// Resolves a decision to go/no-go, prompting when confirmation is needed.
    pub async fn authorize(&self, decision: GuardDecision, impact: Option<Decimal>, confirmer: &dyn ImpactConfirmer) -> bool {
        match decision {
            GuardDecision::Allow => true,
            GuardDecision::Blocked { severity } => {
                warn!("🛑 Swap blocked: price impact severity {}", severity);
                false
            }
            GuardDecision::ConfirmRequired { .. } => {
                let confirmed = confirmer.confirm_price_impact(impact.unwrap_or_default()).await;
                info!("Price impact confirmation: {}", if confirmed { "accepted" } else { "declined" });
                confirmed
            }
        }
    }
}
