//! Coordinator configuration settings and environment variable handling

use alloy::primitives::Address;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::env;
use std::str::FromStr;
use std::time::Duration;

// Slippage constants
pub const DEFAULT_SLIPPAGE_BPS: u32 = 50; // 0.5%
pub const MAX_SLIPPAGE_BPS: u32 = 5_000; // 50%
pub const SLIPPAGE_SAFETY_MARGIN_PCT: Decimal = dec!(3);
pub const NATIVE_BUY_MARGIN_PCT: Decimal = dec!(1);

// Price impact tiers, as fractions
pub const ALLOWED_PRICE_IMPACT_LOW: Decimal = dec!(0.01);
pub const ALLOWED_PRICE_IMPACT_MEDIUM: Decimal = dec!(0.03);
pub const ALLOWED_PRICE_IMPACT_HIGH: Decimal = dec!(0.05);
pub const BLOCKED_PRICE_IMPACT_NON_EXPERT: Decimal = dec!(0.15);

// Routing
pub const BETTER_TRADE_THRESHOLD_BPS: u32 = 0;
pub const QUOTE_TIMEOUT_MS: u64 = 8_000;
pub const ENGINE_CALL_TIMEOUT_MS: u64 = 4_000;

// Execution
pub const DEFAULT_DEADLINE_SECS: u64 = 30 * 60;
pub const MAX_DEADLINE_SECS: u64 = 3 * 24 * 60 * 60;
pub const PENDING_APPROVAL_WINDOW_SECS: i64 = 86_400;

pub const DEFAULT_TAX_SERVICE_URL: &str = "https://api.honeypot.is/v2/IsHoneypot";
pub const TAX_SERVICE_CHAINS: &[u64] = &[1, 56, 8453];

/// Severity tier boundaries, lowest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpactThresholds {
    pub low: Decimal,
    pub medium: Decimal,
    pub high: Decimal,
    pub blocked: Decimal,
}

impl Default for ImpactThresholds {
    fn default() -> Self {
        Self {
            low: ALLOWED_PRICE_IMPACT_LOW,
            medium: ALLOWED_PRICE_IMPACT_MEDIUM,
            high: ALLOWED_PRICE_IMPACT_HIGH,
            blocked: BLOCKED_PRICE_IMPACT_NON_EXPERT,
        }
    }
}

/// Margins added to observed token taxes by the auto-slippage estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoSlippagePolicy {
    pub safety_margin_pct: Decimal,
    pub native_buy_margin_pct: Decimal,
}

impl Default for AutoSlippagePolicy {
    fn default() -> Self {
        Self {
            safety_margin_pct: SLIPPAGE_SAFETY_MARGIN_PCT,
            native_buy_margin_pct: NATIVE_BUY_MARGIN_PCT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaxServiceConfig {
    pub base_url: String,
    pub supported_chains: Vec<u64>,
    pub timeout: Duration,
}

impl Default for TaxServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_TAX_SERVICE_URL.to_string(),
            supported_chains: TAX_SERVICE_CHAINS.to_vec(),
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoutingConfig {
    pub better_trade_threshold_bps: u32,
    pub quote_timeout: Duration,
    pub engine_call_timeout: Duration,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            better_trade_threshold_bps: BETTER_TRADE_THRESHOLD_BPS,
            quote_timeout: Duration::from_millis(QUOTE_TIMEOUT_MS),
            engine_call_timeout: Duration::from_millis(ENGINE_CALL_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: Option<String>,
    pub chain_id: u64,
    pub private_key: Option<String>,
    // Preference defaults
    pub default_slippage_bps: u32,
    pub auto_slippage: bool,
    pub expert_mode: bool,
    pub single_hop_only: bool,
    // Subsystems
    pub slippage_policy: AutoSlippagePolicy,
    pub impact_thresholds: ImpactThresholds,
    pub routing: RoutingConfig,
    pub tax_service: TaxServiceConfig,
    pub deadline_secs: u64,
    pub unlimited_approval: bool,
    // Session driver
    pub input_token: Option<Address>,
    pub output_token: Option<Address>,
    pub amount: Option<String>,
    pub execute: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: None,
            chain_id: 1,
            private_key: None,
            default_slippage_bps: DEFAULT_SLIPPAGE_BPS,
            auto_slippage: true,
            expert_mode: false,
            single_hop_only: false,
            slippage_policy: AutoSlippagePolicy::default(),
            impact_thresholds: ImpactThresholds::default(),
            routing: RoutingConfig::default(),
            tax_service: TaxServiceConfig::default(),
            deadline_secs: DEFAULT_DEADLINE_SECS,
            unlimited_approval: true,
            input_token: None,
            output_token: None,
            amount: None,
            execute: false,
        }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_decimal(key: &str, default: Decimal) -> Decimal {
    env::var(key)
        .ok()
        .and_then(|s| Decimal::from_str(&s).ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Native-currency tokens are written as "ETH"/"NATIVE" in the env and map to `None`.
fn env_address(key: &str) -> Option<Address> {
    env::var(key).ok().and_then(|s| Address::from_str(s.trim()).ok())
}

impl Config {
    pub fn load() -> Self {
        let defaults = Self::default();
        Self {
            rpc_url: env::var("RPC_URL").ok(),
            chain_id: env_u64("CHAIN_ID", defaults.chain_id),
            private_key: env::var("PRIVATE_KEY").ok(),
            default_slippage_bps: env::var("DEFAULT_SLIPPAGE_BPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SLIPPAGE_BPS)
                .min(MAX_SLIPPAGE_BPS),
            auto_slippage: env_bool("AUTO_SLIPPAGE", defaults.auto_slippage),
            expert_mode: env_bool("EXPERT_MODE", defaults.expert_mode),
            single_hop_only: env_bool("SINGLE_HOP_ONLY", defaults.single_hop_only),
            slippage_policy: AutoSlippagePolicy {
                safety_margin_pct: env_decimal("SLIPPAGE_SAFETY_MARGIN_PCT", SLIPPAGE_SAFETY_MARGIN_PCT)
                    .max(dec!(0)),
                native_buy_margin_pct: env_decimal("NATIVE_BUY_MARGIN_PCT", NATIVE_BUY_MARGIN_PCT)
                    .max(dec!(0)),
            },
            impact_thresholds: ImpactThresholds {
                low: env_decimal("IMPACT_LOW", ALLOWED_PRICE_IMPACT_LOW),
                medium: env_decimal("IMPACT_MEDIUM", ALLOWED_PRICE_IMPACT_MEDIUM),
                high: env_decimal("IMPACT_HIGH", ALLOWED_PRICE_IMPACT_HIGH),
                blocked: env_decimal("IMPACT_BLOCKED", BLOCKED_PRICE_IMPACT_NON_EXPERT),
            },
            routing: RoutingConfig {
                better_trade_threshold_bps: env::var("BETTER_TRADE_THRESHOLD_BPS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(BETTER_TRADE_THRESHOLD_BPS),
                quote_timeout: Duration::from_millis(env_u64("QUOTE_TIMEOUT_MS", QUOTE_TIMEOUT_MS)),
                engine_call_timeout: Duration::from_millis(
                    env_u64("ENGINE_CALL_TIMEOUT_MS", ENGINE_CALL_TIMEOUT_MS),
                ),
            },
            tax_service: TaxServiceConfig {
                base_url: env::var("TAX_SERVICE_URL")
                    .unwrap_or_else(|_| DEFAULT_TAX_SERVICE_URL.to_string()),
                ..TaxServiceConfig::default()
            },
            deadline_secs: env_u64("DEADLINE_SECS", DEFAULT_DEADLINE_SECS)
                .clamp(60, MAX_DEADLINE_SECS),
            unlimited_approval: env_bool("UNLIMITED_APPROVAL", true),
            input_token: env_address("INPUT_TOKEN"),
            output_token: env_address("OUTPUT_TOKEN"),
            amount: env::var("AMOUNT").ok(),
            execute: env_bool("EXECUTE", false),
        }
    }

    /// Thresholds must be strictly increasing for severity tiers to make sense.
    pub fn validate(&self) -> Result<(), String> {
        let t = &self.impact_thresholds;
        if !(t.low < t.medium && t.medium < t.high && t.high < t.blocked) {
            return Err(format!(
                "price impact thresholds must increase: {} < {} < {} < {}",
                t.low, t.medium, t.high, t.blocked
            ));
        }
        if self.default_slippage_bps > MAX_SLIPPAGE_BPS {
            return Err(format!("default slippage {} bps above maximum", self.default_slippage_bps));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn unordered_thresholds_are_rejected() {
        let mut config = Config::default();
        config.impact_thresholds.high = dec!(0.2);
        assert!(config.validate().is_err());
    }
}
