//! One swap screen: token selection, quoting, approval and submission

use alloy::primitives::{Address, B256, U256};
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use crate::{
    approval::ApprovalCoordinator,
    config::PreferenceStore,
    errors::{ErrorRecovery, RecoveryAction, SwapError, SwapResult},
    execution::{slippage_limits, ExecutionContext, SwapExecutor},
    network::{ChainReader, WalletClient},
    routing::{wrap_call, wrap_type, Resolution, TradeResolver},
    slippage::SlippageEstimator,
    types::{
        ApprovalOutcome, ApprovalState, Asset, CurrencyAmount, ExecuteOutcome, QuoteRequest, RouterVersion,
        Token, Trade, WrapType,
    },
    validation::{
        check_ownership, fiat_value, fiat_value_impact, severity, worse_impact, GuardDecision, OwnershipStatus,
        PriceImpactGuard,
    },
};

/// Current pair and typed amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapSelection {
    pub input: Option<Asset>,
    pub output: Option<Asset>,
    pub typed_value: String,
    /// Whether `typed_value` is the input amount (exact input) or the output amount.
    pub typed_on_input: bool,
}

impl Default for SwapSelection {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            typed_value: String::new(),
            typed_on_input: true,
        }
    }
}

/// Reason the swap cannot proceed with the current inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    ConnectWallet,
    SelectToken,
    EnterAmount,
    InsufficientLiquidity { single_hop_only: bool },
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::ConnectWallet => f.write_str("Connect Wallet"),
            InputError::SelectToken => f.write_str("Select a token"),
            InputError::EnterAmount => f.write_str("Enter an amount"),
            InputError::InsufficientLiquidity { single_hop_only: true } => {
                f.write_str("Insufficient liquidity for this trade. Try enabling multi-hop trades.")
            }
            InputError::InsufficientLiquidity { single_hop_only: false } => {
                f.write_str("Insufficient liquidity for this trade.")
            }
        }
    }
}

/// Collaborators a session is built from.
pub struct SessionParts {
    pub chain_id: u64,
    pub reader: Arc<dyn ChainReader>,
    pub wallet: Option<Arc<dyn WalletClient>>,
    pub resolver: TradeResolver,
    pub approvals: ApprovalCoordinator,
    pub estimator: SlippageEstimator,
    pub guard: PriceImpactGuard,
    pub executor: SwapExecutor,
    pub preferences: PreferenceStore,
    pub recovery: ErrorRecovery,
}

pub struct SwapSession {
    chain_id: u64,
    reader: Arc<dyn ChainReader>,
    wallet: Option<Arc<dyn WalletClient>>,
    resolver: TradeResolver,
    approvals: ApprovalCoordinator,
    estimator: SlippageEstimator,
    guard: PriceImpactGuard,
    executor: SwapExecutor,
    preferences: PreferenceStore,
    recovery: ErrorRecovery,
    selection: RwLock<SwapSelection>,
    /// Set once an approval went pending in this session; cleared when the
    /// input token changes.
    approval_submitted: RwLock<bool>,
}

impl SwapSession {
    pub fn new(parts: SessionParts) -> Self {
        Self {
            chain_id: parts.chain_id,
            reader: parts.reader,
            wallet: parts.wallet,
            resolver: parts.resolver,
            approvals: parts.approvals,
            estimator: parts.estimator,
            guard: parts.guard,
            executor: parts.executor,
            preferences: parts.preferences,
            recovery: parts.recovery,
            selection: RwLock::new(SwapSelection::default()),
            approval_submitted: RwLock::new(false),
        }
    }

    pub fn account(&self) -> Option<Address> {
        self.wallet.as_ref().map(|w| w.account())
    }

    pub fn resolver(&self) -> &TradeResolver {
        &self.resolver
    }

    pub fn approvals(&self) -> &ApprovalCoordinator {
        &self.approvals
    }

    pub fn executor(&self) -> &SwapExecutor {
        &self.executor
    }

    pub fn preferences(&self) -> &PreferenceStore {
        &self.preferences
    }

    pub fn recovery(&self) -> &ErrorRecovery {
        &self.recovery
    }

    pub async fn selection(&self) -> SwapSelection {
        self.selection.read().await.clone()
    }

    pub async fn approval_submitted(&self) -> bool {
        *self.approval_submitted.read().await
    }

    /// Selecting the asset already on the other side switches the pair.
    pub async fn select_input(&self, asset: Asset) {
        let same_as_output = self.selection.read().await.output.as_ref().is_some_and(|o| o.same_as(&asset));
        if same_as_output {
            self.switch_tokens().await;
            return;
        }
        *self.approval_submitted.write().await = false;
        self.selection.write().await.input = Some(asset);
        self.on_pair_changed().await;
    }

    pub async fn select_output(&self, asset: Asset) {
        let same_as_input = self.selection.read().await.input.as_ref().is_some_and(|i| i.same_as(&asset));
        if same_as_input {
            self.switch_tokens().await;
            return;
        }
        self.selection.write().await.output = Some(asset);
        self.on_pair_changed().await;
    }

    pub async fn type_input(&self, value: &str) {
        let mut selection = self.selection.write().await;
        selection.typed_value = value.to_string();
        selection.typed_on_input = true;
    }

    pub async fn type_output(&self, value: &str) {
        let mut selection = self.selection.write().await;
        selection.typed_value = value.to_string();
        selection.typed_on_input = false;
    }

    /// Swaps input and output; the typed amount stays on the same asset.
    pub async fn switch_tokens(&self) {
        *self.approval_submitted.write().await = false;
        {
            let mut selection = self.selection.write().await;
            let SwapSelection { input, output, typed_on_input, .. } = &mut *selection;
            std::mem::swap(input, output);
            *typed_on_input = !*typed_on_input;
        }
        debug!("Switched swap direction");
        self.on_pair_changed().await;
    }

    pub async fn set_auto_slippage(&self, enabled: bool) {
        self.preferences.set_auto_slippage(enabled).await;
        if enabled {
            self.on_pair_changed().await;
        } else {
            self.estimator.forget_applied().await;
        }
    }

    async fn on_pair_changed(&self) {
        let selection = self.selection().await;
        let (Some(input), Some(output)) = (selection.input, selection.output) else {
            return;
        };
        if let Err(e) = self.estimator.on_selection_changed(&input, &output, Some(self.chain_id)).await {
            self.report(&e).await;
        }
    }

    pub async fn wrap_type(&self) -> WrapType {
        let selection = self.selection.read().await;
        match (&selection.input, &selection.output) {
            (Some(input), Some(output)) => wrap_type(input, output),
            _ => WrapType::NotApplicable,
        }
    }

    /// Re-quotes the current selection. Wrap pairs and incomplete inputs
    /// clear the resolution. `None` means a newer quote superseded this one.
    pub async fn refresh_quote(&self) -> Option<Resolution> {
        let request = match self.wrap_type().await {
            WrapType::NotApplicable => self.quote_request().await,
            _ => None,
        };
        let resolution = self.resolver.resolve(request).await?;
        if resolution.route_not_found {
            if let Some(request) = &resolution.request {
                let error = SwapError::NoRoute {
                    input: request.input.to_string(),
                    output: request.output.to_string(),
                };
                self.report(&error).await;
            }
        }
        Some(resolution)
    }

    async fn quote_request(&self) -> Option<QuoteRequest> {
        let selection = self.selection().await;
        let single_hop_only = self.preferences.snapshot().await.single_hop_only;
        QuoteRequest::from_typed(
            selection.input?,
            selection.output?,
            &selection.typed_value,
            selection.typed_on_input,
            single_hop_only,
        )
    }

    pub async fn trade(&self) -> Option<Trade> {
        self.resolver.current().await.best
    }

    pub async fn input_error(&self) -> Option<InputError> {
        if self.account().is_none() {
            return Some(InputError::ConnectWallet);
        }
        let selection = self.selection().await;
        let (Some(input), Some(output)) = (&selection.input, &selection.output) else {
            return Some(InputError::SelectToken);
        };
        let asset = if selection.typed_on_input { input } else { output };
        if CurrencyAmount::parse(asset.clone(), &selection.typed_value).is_none_or(|a| a.is_zero()) {
            return Some(InputError::EnterAmount);
        }
        if wrap_type(input, output) != WrapType::NotApplicable {
            return None;
        }

        let resolution = self.resolver.current().await;
        if resolution.route_not_found {
            let single_hop_only = self.preferences.snapshot().await.single_hop_only;
            return Some(InputError::InsufficientLiquidity { single_hop_only });
        }
        None
    }

    /// Price impact measured on the fiat values of both legs.
    pub async fn fiat_impact(&self, trade: &Trade) -> Option<Decimal> {
        let engine = self.resolver.engine(trade.version);
        let (fiat_in, fiat_out) = tokio::join!(
            fiat_value(engine.as_ref(), &trade.input),
            fiat_value(engine.as_ref(), &trade.output),
        );
        fiat_value_impact(fiat_in, fiat_out)
    }

    /// Severity of the worse of execution and fiat impact.
    pub async fn impact_severity(&self, trade: &Trade) -> u8 {
        let fiat = self.fiat_impact(trade).await;
        severity(worse_impact(trade.price_impact, fiat), self.guard.thresholds())
    }

    pub async fn guard_decision(&self, trade: &Trade) -> GuardDecision {
        let fiat = self.fiat_impact(trade).await;
        let expert_mode = self.preferences.snapshot().await.expert_mode;
        self.guard.evaluate(trade.price_impact, fiat, expert_mode)
    }

    /// Points the approval coordinator at the current trade and reads the
    /// allowance. The spender is the router of the engine that quoted it.
    pub async fn refresh_approval(&self) -> SwapResult<ApprovalState> {
        let (Some(trade), Some(owner)) = (self.trade().await, self.account()) else {
            self.approvals.set_target(None, None).await;
            return Ok(self.approvals.approval_state().await);
        };

        let spender = self.resolver.engine(trade.version).router();
        let slippage = self.preferences.slippage().await;
        let (amount, _) = slippage_limits(&trade, slippage);

        let state = self
            .approvals
            .check_allowance(trade.input_asset(), spender, owner, amount, permit_token(&trade))
            .await?;
        self.note_pending(state).await;
        Ok(state)
    }

    async fn note_pending(&self, state: ApprovalState) {
        if state.is_pending() {
            *self.approval_submitted.write().await = true;
        }
    }

    /// Whether the two-step approve-then-swap flow should be shown.
    pub async fn show_approve_flow(&self) -> bool {
        if self.input_error().await.is_some() {
            return false;
        }
        let state = self.approvals.approval_state().await;
        let in_flow = match state {
            ApprovalState::NotApproved | ApprovalState::Pending { .. } => true,
            ApprovalState::Approved => self.approval_submitted().await,
            ApprovalState::Unknown => false,
        };
        if !in_flow {
            return false;
        }

        match self.trade().await {
            Some(trade) => {
                let expert_mode = self.preferences.snapshot().await.expert_mode;
                !(self.impact_severity(&trade).await > 3 && !expert_mode)
            }
            None => true,
        }
    }

    pub async fn approve(&self) -> SwapResult<ApprovalOutcome> {
        match self.approvals.request_approval().await {
            Ok(outcome) => {
                self.note_pending(self.approvals.approval_state().await).await;
                Ok(outcome)
            }
            Err(e) => {
                self.report(&e).await;
                Err(e)
            }
        }
    }

    /// Re-checks outstanding approval receipts.
    pub async fn poll_approvals(&self) -> SwapResult<ApprovalState> {
        self.approvals.reconcile_pending().await
    }

    async fn execution_context(&self, trade: &Trade) -> ExecutionContext {
        let permit = match trade.version {
            RouterVersion::V3 => self.approvals.valid_permit().await,
            RouterVersion::V2 => None,
        };
        ExecutionContext {
            fiat_impact: self.fiat_impact(trade).await,
            permit,
        }
    }

    /// Opens the confirmation for the current trade. In expert mode the swap
    /// is submitted immediately and its outcome returned.
    pub async fn swap(&self) -> Option<ExecuteOutcome> {
        let Some(trade) = self.trade().await else {
            warn!("⚠️ Swap requested without a trade");
            return None;
        };
        let context = self.execution_context(&trade).await;
        self.executor.request_swap(trade, context).await
    }

    /// Submits the trade under confirmation.
    pub async fn confirm_swap(&self) -> ExecuteOutcome {
        let Some(trade) = self.executor.state().await.trade_to_confirm else {
            return self.executor.execute_swap(ExecutionContext::default()).await;
        };
        let context = self.execution_context(&trade).await;
        self.executor.execute_swap(context).await
    }

    /// Replaces the trade under confirmation with the latest quote.
    pub async fn accept_changes(&self) {
        if let Some(trade) = self.trade().await {
            self.executor.accept_changes(trade).await;
        }
    }

    /// Closes the confirmation; a successful swap also clears the typed amount.
    pub async fn dismiss(&self) {
        if self.executor.state().await.tx_hash.is_some() {
            let mut selection = self.selection.write().await;
            selection.typed_value.clear();
            selection.typed_on_input = true;
        }
        self.executor.dismiss().await;
    }

    /// Wraps or unwraps the typed amount of the native currency.
    pub async fn wrap(&self) -> SwapResult<B256> {
        let kind = self.wrap_type().await;
        let wallet = self.wallet.clone().ok_or_else(|| SwapError::Execution {
            message: "No wallet connected".to_string(),
        })?;
        let selection = self.selection().await;
        let amount = selection
            .input
            .and_then(|asset| CurrencyAmount::parse(asset, &selection.typed_value))
            .map(|a| a.raw)
            .filter(|raw| *raw > U256::ZERO)
            .ok_or_else(|| SwapError::Execution { message: "Enter an amount".to_string() })?;

        let call = wrap_call(kind, self.chain_id, amount)?;
        match wallet.send_transaction(call).await {
            Ok(tx_hash) => {
                info!("🔁 {:?} submitted: {:?}", kind, tx_hash);
                Ok(tx_hash)
            }
            Err(e) => {
                let e = SwapError::from(e);
                self.report(&e).await;
                Err(e)
            }
        }
    }

    /// Ownership of the selected output token, `None` for the native currency.
    pub async fn output_ownership(&self) -> Option<OwnershipStatus> {
        let token = self.selection.read().await.output.as_ref()?.token_address()?;
        Some(check_ownership(self.reader.as_ref(), token).await)
    }

    async fn report(&self, error: &SwapError) {
        match self.recovery.handle_error(error).await {
            RecoveryAction::Cancel | RecoveryAction::Ignore => {}
            RecoveryAction::Advisory { message, .. } => warn!("⚠️ {}", message),
            RecoveryAction::Surface { message } => warn!("❌ {}", message),
        }
    }
}

/// Permits are only used through the V3 router, for tokens that support them.
fn permit_token(trade: &Trade) -> Option<Token> {
    if trade.version != RouterVersion::V3 {
        return None;
    }
    trade.input_asset().as_token().filter(|t| t.permit.is_some()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::ApprovalSettings;
    use crate::config::{ImpactThresholds, RoutingConfig, SwapPreferences};
    use crate::errors::ErrorClass;
    use crate::execution::TracingAnalytics;
    use crate::network::TaxService;
    use crate::routing::{build_trade, RoutingEngine};
    use crate::test_support::{usdc, FakeChain, FakeWallet, ROUTER};
    use crate::types::{Route, SlippageTolerance, TaxQuote, WETH_MAINNET, USDC_MAINNET};
    use crate::validation::AcceptAll;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    /// Quotes 1:1 with a fixed impact, or nothing.
    struct FixedEngine {
        version: RouterVersion,
        impact: Option<Decimal>,
        routes: bool,
    }

    #[async_trait]
    impl RoutingEngine for FixedEngine {
        fn version(&self) -> RouterVersion {
            self.version
        }

        fn router(&self) -> Address {
            ROUTER
        }

        async fn quote(&self, request: &QuoteRequest) -> SwapResult<Option<Trade>> {
            if !self.routes {
                return Ok(None);
            }
            let route = Route {
                path: vec![
                    request.input.wrapped_address().unwrap_or_default(),
                    request.output.wrapped_address().unwrap_or_default(),
                ],
                fees: vec![3000],
            };
            Ok(Some(build_trade(
                request,
                self.version,
                route,
                request.amount.raw,
                request.amount.raw,
                self.impact,
            )))
        }
    }

    struct NoTax;

    #[async_trait]
    impl TaxService for NoTax {
        async fn get_tax(&self, _chain_id: u64, _token: Address) -> SwapResult<TaxQuote> {
            Ok(TaxQuote::default())
        }
    }

    fn session(chain: Arc<FakeChain>, wallet: Option<Arc<FakeWallet>>, impact: Option<Decimal>, routes: bool) -> SwapSession {
        let preferences = PreferenceStore::new(SwapPreferences {
            slippage: SlippageTolerance::from_bps(50),
            auto_slippage: false,
            expert_mode: false,
            single_hop_only: false,
            recipient: None,
        });
        let engine = |version| -> Arc<dyn RoutingEngine> { Arc::new(FixedEngine { version, impact, routes }) };
        let routing = RoutingConfig {
            better_trade_threshold_bps: 0,
            quote_timeout: Duration::from_millis(50),
            engine_call_timeout: Duration::from_millis(50),
        };
        let wallet: Option<Arc<dyn WalletClient>> = wallet.map(|w| w as Arc<dyn WalletClient>);
        let guard = PriceImpactGuard::new(ImpactThresholds::default());

        SwapSession::new(SessionParts {
            chain_id: 1,
            reader: chain.clone(),
            wallet: wallet.clone(),
            resolver: TradeResolver::new(engine(RouterVersion::V2), engine(RouterVersion::V3), routing),
            approvals: ApprovalCoordinator::new(chain, wallet.clone(), ApprovalSettings::default()),
            estimator: SlippageEstimator::new(Arc::new(NoTax), preferences.clone(), Default::default()),
            guard: guard.clone(),
            executor: SwapExecutor::new(
                None,
                wallet.as_ref().map(|w| w.account()),
                guard,
                Arc::new(AcceptAll),
                Arc::new(TracingAnalytics),
                preferences.clone(),
                1200,
            ),
            preferences,
            recovery: ErrorRecovery::new(),
        })
    }

    fn weth() -> Asset {
        crate::test_support::token(WETH_MAINNET, "WETH", 18)
    }

    #[tokio::test]
    async fn input_errors_follow_the_form() {
        let chain = Arc::new(FakeChain::default());
        let disconnected = session(chain.clone(), None, None, true);
        assert_eq!(disconnected.input_error().await, Some(InputError::ConnectWallet));

        let s = session(chain, Some(Arc::new(FakeWallet::default())), None, false);
        assert_eq!(s.input_error().await, Some(InputError::SelectToken));

        s.select_input(usdc(false)).await;
        s.select_output(Asset::native(1)).await;
        assert_eq!(s.input_error().await, Some(InputError::EnterAmount));

        s.type_input("10").await;
        s.refresh_quote().await.unwrap();
        assert_eq!(
            s.input_error().await,
            Some(InputError::InsufficientLiquidity { single_hop_only: false })
        );
        assert_eq!(s.recovery().snapshot().await.get(&ErrorClass::Transient), Some(&1));
    }

    #[tokio::test]
    async fn auto_slippage_toggle_restores_estimate() {
        let s = session(Arc::new(FakeChain::default()), Some(Arc::new(FakeWallet::default())), None, true);
        s.select_input(Asset::native(1)).await;
        s.select_output(usdc(false)).await;

        s.set_auto_slippage(true).await;
        assert_eq!(s.preferences().slippage().await.bps, 400);

        s.set_auto_slippage(false).await;
        s.preferences().set_slippage(SlippageTolerance::from_bps(100)).await;
        s.set_auto_slippage(true).await;

        let prefs = s.preferences().snapshot().await;
        assert!(prefs.auto_slippage);
        assert_eq!(prefs.slippage.bps, 400);
    }

    #[tokio::test]
    async fn switch_tokens_flips_pair_and_typed_side() {
        let s = session(Arc::new(FakeChain::default()), Some(Arc::new(FakeWallet::default())), None, true);
        s.select_input(Asset::native(1)).await;
        s.select_output(usdc(false)).await;
        s.type_input("1").await;
        *s.approval_submitted.write().await = true;

        s.switch_tokens().await;
        let selection = s.selection().await;
        assert!(selection.input.unwrap().token_address() == Some(USDC_MAINNET));
        assert!(selection.output.unwrap().is_native());
        assert!(!selection.typed_on_input);
        assert!(!s.approval_submitted().await);

        // Picking the current input as output switches back.
        s.select_output(usdc(false)).await;
        assert!(s.selection().await.input.unwrap().is_native());
    }

    #[tokio::test]
    async fn approve_flow_tracks_submission_in_session() {
        let chain = Arc::new(FakeChain::default());
        let wallet = Arc::new(FakeWallet::default());
        let s = session(chain.clone(), Some(wallet.clone()), Some(dec!(0.001)), true);
        s.select_input(usdc(false)).await;
        s.select_output(Asset::native(1)).await;
        s.type_input("25").await;
        s.refresh_quote().await.unwrap();

        assert_eq!(s.refresh_approval().await.unwrap(), ApprovalState::NotApproved);
        assert!(s.show_approve_flow().await);

        let outcome = s.approve().await.unwrap();
        let ApprovalOutcome::Submitted { tx_hash } = outcome else {
            panic!("unexpected outcome {:?}", outcome);
        };
        assert!(s.approval_submitted().await);
        assert_eq!(wallet.sent()[0].to, USDC_MAINNET);

        chain.set_receipt(tx_hash, true);
        assert_eq!(s.poll_approvals().await.unwrap(), ApprovalState::Approved);
        assert!(s.show_approve_flow().await);

        // A new input token resets the two-step flow.
        s.select_input(weth()).await;
        assert!(!s.approval_submitted().await);
    }

    #[tokio::test]
    async fn approve_flow_hidden_for_native_input_and_blocked_impact() {
        let chain = Arc::new(FakeChain::default());
        let native = session(chain.clone(), Some(Arc::new(FakeWallet::default())), None, true);
        native.select_input(Asset::native(1)).await;
        native.select_output(usdc(false)).await;
        native.type_input("1").await;
        native.refresh_quote().await.unwrap();
        assert_eq!(native.refresh_approval().await.unwrap(), ApprovalState::Approved);
        assert!(!native.show_approve_flow().await);

        let blocked = session(chain, Some(Arc::new(FakeWallet::default())), Some(dec!(0.2)), true);
        blocked.select_input(usdc(false)).await;
        blocked.select_output(Asset::native(1)).await;
        blocked.type_input("1").await;
        blocked.refresh_quote().await.unwrap();
        assert_eq!(blocked.refresh_approval().await.unwrap(), ApprovalState::NotApproved);
        assert!(!blocked.show_approve_flow().await);
    }

    #[tokio::test]
    async fn wrap_pair_skips_routing_and_deposits() {
        let wallet = Arc::new(FakeWallet::default());
        let s = session(Arc::new(FakeChain::default()), Some(wallet.clone()), None, true);
        s.select_input(Asset::native(1)).await;
        s.select_output(weth()).await;
        s.type_input("0.5").await;

        assert_eq!(s.wrap_type().await, WrapType::Wrap);
        let resolution = s.refresh_quote().await.unwrap();
        assert!(resolution.best.is_none());
        assert_eq!(s.input_error().await, None);

        s.wrap().await.unwrap();
        let sent = wallet.sent();
        assert_eq!(sent[0].to, WETH_MAINNET);
        assert_eq!(sent[0].value, U256::from(500_000_000_000_000_000u64));
    }

    #[tokio::test]
    async fn output_ownership_reads_owner() {
        let chain = Arc::new(FakeChain::default());
        chain.owners.lock().unwrap().insert(USDC_MAINNET, Address::ZERO);
        let s = session(chain, None, None, true);
        s.select_output(Asset::native(1)).await;
        assert_eq!(s.output_ownership().await, None);
        s.select_output(usdc(false)).await;
        assert_eq!(s.output_ownership().await, Some(OwnershipStatus::Renounced));
    }
}
