//! Swap confirmation and submission state machine

use alloy::primitives::Address;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use crate::{
    config::PreferenceStore,
    execution::{
        analytics::{AnalyticsSink, SwapEvent},
        calldata::{SwapCallback, SwapParameters},
    },
    types::{ExecuteOutcome, PermitSignature, SwapPhase, SwapState, Trade},
    validation::{worse_impact, ImpactConfirmer, PriceImpactGuard},
};

/// Inputs to a submission that are known only at execution time.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    pub fiat_impact: Option<Decimal>,
    pub permit: Option<PermitSignature>,
}

/// Sole owner of [`SwapState`].
pub struct SwapExecutor {
    state: RwLock<SwapState>,
    callback: Option<Arc<dyn SwapCallback>>,
    account: Option<Address>,
    guard: PriceImpactGuard,
    confirmer: Arc<dyn ImpactConfirmer>,
    analytics: Arc<dyn AnalyticsSink>,
    preferences: PreferenceStore,
    deadline_secs: u64,
}

impl SwapExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        callback: Option<Arc<dyn SwapCallback>>,
        account: Option<Address>,
        guard: PriceImpactGuard,
        confirmer: Arc<dyn ImpactConfirmer>,
        analytics: Arc<dyn AnalyticsSink>,
        preferences: PreferenceStore,
        deadline_secs: u64,
    ) -> Self {
        Self {
            state: RwLock::new(SwapState::default()),
            callback,
            account,
            guard,
            confirmer,
            analytics,
            preferences,
            deadline_secs,
        }
    }

    pub async fn state(&self) -> SwapState {
        self.state.read().await.clone()
    }

    pub async fn phase(&self) -> SwapPhase {
        self.state.read().await.phase()
    }

    /// Starts a new attempt for `trade`, discarding the previous one.
    ///
    /// In expert mode the confirmation step is skipped and the swap is
    /// executed right away; otherwise returns `None` and waits for
    /// [`SwapExecutor::execute_swap`].
    pub async fn request_swap(&self, trade: Trade, context: ExecutionContext) -> Option<ExecuteOutcome> {
        let expert_mode = self.preferences.snapshot().await.expert_mode;
        {
            let mut state = self.state.write().await;
            *state = SwapState {
                trade_to_confirm: Some(trade),
                show_confirm: !expert_mode,
                ..SwapState::default()
            };
        }

        if expert_mode {
            Some(self.execute_swap(context).await)
        } else {
            None
        }
    }

    /// Replaces the trade under confirmation with a re-quoted one.
    pub async fn accept_changes(&self, trade: Trade) {
        let mut state = self.state.write().await;
        if state.trade_to_confirm.is_some() {
            state.trade_to_confirm = Some(trade);
        }
    }

    /// Submits the trade under confirmation.
    ///
    /// Without a swap callback, or with nothing to confirm, this is a no-op.
    /// An attempt is submitted at most once: while it is in flight or after
    /// it produced a hash, further calls return
    /// [`ExecuteOutcome::AlreadyAttempted`] until the next `request_swap`.
    /// A guard veto leaves the state as it was. Provider errors are stored
    /// verbatim and never retried.
    pub async fn execute_swap(&self, context: ExecutionContext) -> ExecuteOutcome {
        let Some(callback) = self.callback.clone() else {
            warn!("⚠️ Swap requested without a swap callback");
            return ExecuteOutcome::NoCallback;
        };
        let trade = {
            let mut state = self.state.write().await;
            let Some(trade) = state.trade_to_confirm.clone() else {
                warn!("⚠️ Swap requested with no trade to confirm");
                return ExecuteOutcome::NoCallback;
            };
            if state.attempting_txn || state.tx_hash.is_some() {
                warn!("⚠️ Swap already submitted for this attempt");
                return ExecuteOutcome::AlreadyAttempted;
            }
            state.attempting_txn = true;
            trade
        };

        let preferences = self.preferences.snapshot().await;
        let decision = self.guard.evaluate(trade.price_impact, context.fiat_impact, preferences.expert_mode);
        let impact = worse_impact(trade.price_impact, context.fiat_impact);
        if !self.guard.authorize(decision, impact, self.confirmer.as_ref()).await {
            self.state.write().await.attempting_txn = false;
            return ExecuteOutcome::Vetoed;
        }

        let Some(recipient) = preferences.recipient.or(self.account) else {
            return self.fail("No recipient for the swap output".to_string()).await;
        };

        self.state.write().await.swap_error_message = None;

        let params = SwapParameters {
            recipient,
            slippage: preferences.slippage,
            deadline: Utc::now().timestamp() as u64 + self.deadline_secs,
            permit: context.permit,
        };

        info!(
            "🚀 Submitting {} swap {} -> {} (slippage {})",
            trade.version, trade.input, trade.output, params.slippage
        );

        match callback.submit(&trade, &params).await {
            Ok(tx_hash) => {
                {
                    let mut state = self.state.write().await;
                    state.attempting_txn = false;
                    state.tx_hash = Some(tx_hash);
                }
                info!("✅ Swap submitted: {:?}", tx_hash);

                let account = self.account.unwrap_or(recipient);
                self.analytics.record(&SwapEvent::new(
                    &trade,
                    tx_hash,
                    account,
                    preferences.recipient,
                    preferences.single_hop_only,
                ));
                ExecuteOutcome::Submitted { tx_hash }
            }
            Err(e) => self.fail(e.display_message()).await,
        }
    }

    async fn fail(&self, message: String) -> ExecuteOutcome {
        error!("❌ Swap failed: {}", message);
        let mut state = self.state.write().await;
        state.attempting_txn = false;
        state.tx_hash = None;
        state.swap_error_message = Some(message.clone());
        ExecuteOutcome::Failed { message }
    }

    /// Closes the confirmation and returns to idle.
    pub async fn dismiss(&self) {
        *self.state.write().await = SwapState::default();
    }
}
