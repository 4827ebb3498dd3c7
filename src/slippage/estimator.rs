//! Automatic slippage from token buy/sell taxes

use alloy::primitives::Address;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use crate::{
    config::{AutoSlippagePolicy, PreferenceStore, MAX_SLIPPAGE_BPS},
    errors::SwapResult,
    network::TaxService,
    types::{Asset, SlippageTolerance, TaxQuote},
};

/// Token whose taxes drive the estimate: the output token, or the input
/// token when selling into the native currency.
pub fn tax_lookup_target(input: &Asset, output: &Asset) -> Option<Address> {
    if output.is_native() {
        input.token_address()
    } else {
        output.token_address()
    }
}

/// `(native in ? buy + buy margin : native out ? sell : 0) + safety margin`,
/// floored to whole basis points.
pub fn auto_slippage_bps(tax: &TaxQuote, input_native: bool, output_native: bool, policy: &AutoSlippagePolicy) -> u32 {
    let tax_pct = if input_native {
        tax.buy_tax_pct + policy.native_buy_margin_pct
    } else if output_native {
        tax.sell_tax_pct
    } else {
        Decimal::ZERO
    };
    let pct = (tax_pct + policy.safety_margin_pct).max(Decimal::ZERO);
    let bps = (pct * dec!(100)).floor().to_u32().unwrap_or(MAX_SLIPPAGE_BPS);
    bps.min(MAX_SLIPPAGE_BPS)
}

pub struct SlippageEstimator {
    tax_service: Arc<dyn TaxService>,
    preferences: PreferenceStore,
    policy: AutoSlippagePolicy,
    last_applied: Mutex<Option<SlippageTolerance>>,
    /// Bumped per call; a lookup that finishes under an older generation is dropped.
    generation: AtomicU64,
}

impl SlippageEstimator {
    pub fn new(tax_service: Arc<dyn TaxService>, preferences: PreferenceStore, policy: AutoSlippagePolicy) -> Self {
        Self {
            tax_service,
            preferences,
            policy,
            last_applied: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Re-estimates after the pair or the auto-slippage flag changed.
    ///
    /// `chain_id` is `None` without a provider connection. Returns the value
    /// written to the preference store, or `None` when nothing was written.
    /// A lookup overtaken by a later call is discarded, error included.
    pub async fn on_selection_changed(
        &self,
        input: &Asset,
        output: &Asset,
        chain_id: Option<u64>,
    ) -> SwapResult<Option<SlippageTolerance>> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let Some(chain_id) = chain_id else {
            return Ok(None);
        };
        if !self.preferences.snapshot().await.auto_slippage {
            self.forget_applied().await;
            return Ok(None);
        }
        let Some(token) = tax_lookup_target(input, output) else {
            debug!("Both sides native, no tax lookup");
            return Ok(None);
        };

        let lookup = self.tax_service.get_tax(chain_id, token).await;
        if !self.is_current(generation) {
            debug!(generation, %token, "Discarding superseded tax lookup");
            return Ok(None);
        }
        let tax = lookup?;
        if tax.is_honeypot {
            warn!("🍯 {} looks like a honeypot: selling may be impossible", token);
        }

        let bps = auto_slippage_bps(&tax, input.is_native(), output.is_native(), &self.policy);
        let slippage = SlippageTolerance::from_bps(bps);

        let mut last = self.last_applied.lock().await;
        if !self.is_current(generation) {
            debug!(generation, %token, "Discarding superseded tax lookup");
            return Ok(None);
        }
        if *last == Some(slippage) {
            debug!(bps, "Auto slippage unchanged");
            return Ok(None);
        }

        self.preferences.set_slippage(slippage).await;
        *last = Some(slippage);
        info!(
            "🎚️ Auto slippage set to {} (buy tax {}%, sell tax {}%)",
            slippage, tax.buy_tax_pct, tax.sell_tax_pct
        );
        Ok(Some(slippage))
    }

    /// Drops the duplicate-write memory so the next estimate is written
    /// even if it matches the last one. Called when auto slippage is turned
    /// off, since the user may set a manual value meanwhile.
    pub async fn forget_applied(&self) {
        *self.last_applied.lock().await = None;
    }

    pub async fn last_applied(&self) -> Option<SlippageTolerance> {
        *self.last_applied.lock().await
    }
}
