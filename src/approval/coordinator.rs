//! Allowance checks, approval submission and permit signing for the input token

use alloy::{
    primitives::{Address, B256, U256},
    sol_types::SolCall,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use crate::{
    approval::{pending::PendingApprovals, permit::sign_permit},
    errors::{SwapError, SwapResult},
    network::{contracts::IERC20, ChainReader, TransactionCall, WalletClient},
    types::{ApprovalOutcome, ApprovalState, ApprovalTarget, Asset, PermitSignature, PermitSignatureState, Token},
};

#[derive(Debug, Clone)]
pub struct ApprovalSettings {
    /// Approve `U256::MAX` instead of the trade amount.
    pub unlimited_approval: bool,
    /// Permit validity from signing time.
    pub permit_ttl_secs: u64,
    pub pending_window_secs: i64,
}

impl Default for ApprovalSettings {
    fn default() -> Self {
        Self {
            unlimited_approval: false,
            permit_ttl_secs: crate::config::DEFAULT_DEADLINE_SECS,
            pending_window_secs: crate::config::PENDING_APPROVAL_WINDOW_SECS,
        }
    }
}

#[derive(Debug, Clone)]
struct Tracked {
    /// `None` when the input is native or nothing is selected.
    target: Option<ApprovalTarget>,
    /// Token metadata when permits may be used for this target.
    permit_token: Option<Token>,
    approval: ApprovalState,
    permit_state: PermitSignatureState,
    permit: Option<PermitSignature>,
}

impl Tracked {
    fn fresh(target: Option<ApprovalTarget>, permit_token: Option<Token>) -> Self {
        let approval = match target {
            Some(_) => ApprovalState::NotApproved,
            None => ApprovalState::Unknown,
        };
        Self {
            target,
            permit_token,
            approval,
            permit_state: PermitSignatureState::NotSigned,
            permit: None,
        }
    }

    /// Moves forward only; a later state never gives way to an earlier one.
    fn advance(&mut self, next: ApprovalState) {
        if next.rank() >= self.approval.rank() {
            if next != self.approval {
                debug!(from = ?self.approval, to = ?next, "Approval state advanced");
            }
            self.approval = next;
        }
    }
}

/// Owns the approval and permit state of the current swap input.
pub struct ApprovalCoordinator {
    reader: Arc<dyn ChainReader>,
    wallet: Option<Arc<dyn WalletClient>>,
    settings: ApprovalSettings,
    pending: RwLock<PendingApprovals>,
    state: RwLock<Tracked>,
}

impl ApprovalCoordinator {
    pub fn new(
        reader: Arc<dyn ChainReader>,
        wallet: Option<Arc<dyn WalletClient>>,
        settings: ApprovalSettings,
    ) -> Self {
        let pending = PendingApprovals::new(settings.pending_window_secs);
        Self {
            reader,
            wallet,
            settings,
            pending: RwLock::new(pending),
            state: RwLock::new(Tracked::fresh(None, None)),
        }
    }

    pub fn account(&self) -> Option<Address> {
        self.wallet.as_ref().map(|w| w.account())
    }

    /// Points the coordinator at a new token/spender/owner/amount. Any change
    /// of target resets approval and permit state.
    pub async fn set_target(&self, target: Option<ApprovalTarget>, permit_token: Option<Token>) {
        let mut state = self.state.write().await;
        if state.target == target {
            state.permit_token = permit_token;
            return;
        }
        debug!(?target, "Approval target changed");
        *state = Tracked::fresh(target, permit_token);
    }

    /// Sets the target for `asset` and queries its allowance.
    ///
    /// The native currency needs no approval and reports `Approved`.
    pub async fn check_allowance(
        &self,
        asset: &Asset,
        spender: Address,
        owner: Address,
        amount: U256,
        permit_token: Option<Token>,
    ) -> SwapResult<ApprovalState> {
        let Some(token) = asset.token_address() else {
            let mut state = self.state.write().await;
            *state = Tracked::fresh(None, None);
            state.approval = ApprovalState::Approved;
            return Ok(ApprovalState::Approved);
        };

        self.set_target(Some(ApprovalTarget { token, spender, owner, amount }), permit_token).await;
        self.refresh().await
    }

    /// Re-reads the allowance for the current target.
    pub async fn refresh(&self) -> SwapResult<ApprovalState> {
        let Some(target) = self.state.read().await.target else {
            return Ok(self.approval_state().await);
        };

        let allowance = self.reader.allowance(target.token, target.owner, target.spender).await?;
        let pending = self.pending.read().await.pending_for(target.token, target.spender);

        let observed = match pending {
            Some(tx_hash) => ApprovalState::Pending { tx_hash: Some(tx_hash), optimistic: false },
            None if allowance >= target.amount => ApprovalState::Approved,
            None => ApprovalState::NotApproved,
        };

        let mut state = self.state.write().await;
        if state.target != Some(target) {
            // Target moved while the allowance was in flight.
            return Ok(state.approval);
        }
        state.advance(observed);
        Ok(state.approval)
    }

    /// Requests approval for the current target.
    ///
    /// Signs a permit when the token supports one; a user rejection of the
    /// signature cancels without falling back, any other signing failure falls
    /// back to an on-chain approval.
    pub async fn request_approval(&self) -> SwapResult<ApprovalOutcome> {
        let (target, permit_token, approval) = {
            let state = self.state.read().await;
            (state.target, state.permit_token.clone(), state.approval)
        };

        let target = target.ok_or_else(|| SwapError::InvalidApproval("no token selected".to_string()))?;
        if approval != ApprovalState::NotApproved {
            warn!("⚠️ Approve called while state is {:?}", approval);
            return Ok(ApprovalOutcome::Skipped);
        }
        if self.valid_permit().await.is_some() {
            debug!("Permit already signed for the current target");
            return Ok(ApprovalOutcome::Skipped);
        }
        let wallet = self.wallet.clone()
            .ok_or_else(|| SwapError::InvalidApproval("no wallet connected".to_string()))?;

        if let Some(token) = permit_token {
            self.set_permit_state(target, PermitSignatureState::Signing).await;
            let deadline = Utc::now().timestamp() as u64 + self.settings.permit_ttl_secs;

            match sign_permit(self.reader.as_ref(), wallet.as_ref(), &token, &target, deadline).await {
                Ok(signature) => {
                    let mut state = self.state.write().await;
                    if state.target == Some(target) {
                        state.permit_state = PermitSignatureState::Signed;
                        state.permit = Some(signature);
                    }
                    return Ok(ApprovalOutcome::PermitSigned);
                }
                Err(e) if e.is_user_rejection() => {
                    info!("🚫 Permit signature rejected for {}", token.symbol);
                    self.set_permit_state(target, PermitSignatureState::NotSigned).await;
                    return Ok(ApprovalOutcome::Cancelled);
                }
                Err(e) => {
                    warn!("⚠️ Permit failed for {}, falling back to approve: {}", token.symbol, e);
                    self.set_permit_state(target, PermitSignatureState::NotSigned).await;
                }
            }
        }

        self.submit_approval(wallet.as_ref(), target).await
    }

    async fn submit_approval(&self, wallet: &dyn WalletClient, target: ApprovalTarget) -> SwapResult<ApprovalOutcome> {
        let amount = if self.settings.unlimited_approval { U256::MAX } else { target.amount };
        let call = TransactionCall {
            to: target.token,
            data: IERC20::approveCall { spender: target.spender, amount }.abi_encode().into(),
            value: U256::ZERO,
        };

        let tx_hash = match wallet.send_transaction(call).await {
            Ok(tx_hash) => tx_hash,
            Err(e) if e.is_user_rejection() => {
                info!("🚫 Approval transaction rejected");
                return Ok(ApprovalOutcome::Cancelled);
            }
            Err(e) => {
                warn!("❌ Failed to approve token: {}", e.display_message());
                return Err(e.into());
            }
        };

        info!("📝 Approval submitted for {} -> {}: {:?}", target.token, target.spender, tx_hash);
        self.pending.write().await.add(tx_hash, target.token, target.spender);

        let mut state = self.state.write().await;
        if state.target == Some(target) {
            state.advance(ApprovalState::Pending { tx_hash: Some(tx_hash), optimistic: true });
        }
        Ok(ApprovalOutcome::Submitted { tx_hash })
    }

    /// Applies the receipt of a tracked approval once it is mined.
    pub async fn reconcile_receipt(&self, tx_hash: B256) -> SwapResult<ApprovalState> {
        let Some(success) = self.reader.receipt_status(tx_hash).await? else {
            return Ok(self.approval_state().await);
        };

        let entry = self.pending.write().await.finalize(tx_hash, success).cloned();
        let mut state = self.state.write().await;
        let Some(entry) = entry else {
            return Ok(state.approval);
        };
        let Some(target) = state.target else {
            return Ok(state.approval);
        };
        if entry.token != target.token || entry.spender != target.spender {
            return Ok(state.approval);
        }

        if success {
            info!("✅ Approval confirmed: {:?}", tx_hash);
            state.advance(ApprovalState::Approved);
        } else if state.approval.is_pending() {
            warn!("❌ Approval transaction failed: {:?}", tx_hash);
            state.approval = ApprovalState::NotApproved;
        }
        Ok(state.approval)
    }

    /// Reconciles every outstanding approval.
    pub async fn reconcile_pending(&self) -> SwapResult<ApprovalState> {
        let outstanding = self.pending.read().await.outstanding();
        for tx_hash in outstanding {
            self.reconcile_receipt(tx_hash).await?;
        }
        self.pending.write().await.prune(Utc::now());
        Ok(self.approval_state().await)
    }

    pub async fn approval_state(&self) -> ApprovalState {
        self.state.read().await.approval
    }

    pub async fn permit_state(&self) -> PermitSignatureState {
        self.state.read().await.permit_state
    }

    /// Permit usable for the current target, if one was signed and has not expired.
    pub async fn valid_permit(&self) -> Option<PermitSignature> {
        let state = self.state.read().await;
        let target = state.target?;
        let now = Utc::now().timestamp() as u64;
        state.permit.clone().filter(|p| p.covers(&target, now))
    }

    /// Approval as the swap sees it: a valid permit counts as approved.
    pub async fn effective_state(&self) -> ApprovalState {
        if self.valid_permit().await.is_some() {
            return ApprovalState::Approved;
        }
        self.approval_state().await
    }

    /// No-op once the target has moved on.
    async fn set_permit_state(&self, target: ApprovalTarget, permit_state: PermitSignatureState) {
        let mut state = self.state.write().await;
        if state.target == Some(target) {
            state.permit_state = permit_state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::WalletError;
    use crate::test_support::{usdc, FakeChain, FakeWallet, ACCOUNT, ROUTER};
    use crate::types::USDC_MAINNET;
    use alloy::primitives::Bytes;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    /// Holds its first signature request until released, then rejects it.
    struct SlowRejectingWallet {
        inner: FakeWallet,
        gated: AtomicBool,
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl WalletClient for SlowRejectingWallet {
        fn account(&self) -> Address {
            self.inner.account()
        }

        fn chain_id(&self) -> u64 {
            self.inner.chain_id()
        }

        async fn send_transaction(&self, call: TransactionCall) -> Result<B256, WalletError> {
            self.inner.send_transaction(call).await
        }

        async fn sign_typed_data_hash(&self, hash: B256) -> Result<Bytes, WalletError> {
            if self.gated.swap(false, Ordering::SeqCst) {
                self.started.notify_one();
                self.release.notified().await;
                return Err(WalletError::from_code(4001, "User denied message signature"));
            }
            self.inner.sign_typed_data_hash(hash).await
        }
    }

    fn coordinator(chain: Arc<FakeChain>, wallet: Arc<FakeWallet>) -> ApprovalCoordinator {
        ApprovalCoordinator::new(chain, Some(wallet), ApprovalSettings::default())
    }

    fn permit_token() -> Option<Token> {
        usdc(true).as_token().cloned()
    }

    const AMOUNT: u64 = 1_000_000;

    #[tokio::test]
    async fn sufficient_allowance_is_approved() {
        let chain = Arc::new(FakeChain::default());
        chain.set_allowance(USDC_MAINNET, ACCOUNT, ROUTER, U256::from(AMOUNT));
        let coordinator = coordinator(chain, Arc::new(FakeWallet::default()));

        let state = coordinator
            .check_allowance(&usdc(false), ROUTER, ACCOUNT, U256::from(AMOUNT), None)
            .await
            .unwrap();
        assert_eq!(state, ApprovalState::Approved);

        let native = coordinator
            .check_allowance(&Asset::native(1), ROUTER, ACCOUNT, U256::from(AMOUNT), None)
            .await
            .unwrap();
        assert_eq!(native, ApprovalState::Approved);
    }

    #[tokio::test]
    async fn approve_goes_pending_then_approved() {
        let chain = Arc::new(FakeChain::default());
        let wallet = Arc::new(FakeWallet::default());
        let coordinator = coordinator(chain.clone(), wallet.clone());

        let state = coordinator
            .check_allowance(&usdc(false), ROUTER, ACCOUNT, U256::from(AMOUNT), None)
            .await
            .unwrap();
        assert_eq!(state, ApprovalState::NotApproved);

        let outcome = coordinator.request_approval().await.unwrap();
        let ApprovalOutcome::Submitted { tx_hash } = outcome else {
            panic!("expected submission, got {:?}", outcome);
        };
        assert_eq!(
            coordinator.approval_state().await,
            ApprovalState::Pending { tx_hash: Some(tx_hash), optimistic: true }
        );
        assert_eq!(wallet.sent()[0].to, USDC_MAINNET);

        // Allowance not visible yet: still pending, never back to NotApproved.
        let state = coordinator.refresh().await.unwrap();
        assert!(state.is_pending());

        chain.set_allowance(USDC_MAINNET, ACCOUNT, ROUTER, U256::from(AMOUNT));
        chain.set_receipt(tx_hash, true);
        let state = coordinator.reconcile_pending().await.unwrap();
        assert_eq!(state, ApprovalState::Approved);

        // Approved never regresses for the same target.
        chain.set_allowance(USDC_MAINNET, ACCOUNT, ROUTER, U256::ZERO);
        assert_eq!(coordinator.refresh().await.unwrap(), ApprovalState::Approved);
    }

    #[tokio::test]
    async fn target_change_resets_state() {
        let chain = Arc::new(FakeChain::default());
        chain.set_allowance(USDC_MAINNET, ACCOUNT, ROUTER, U256::from(AMOUNT));
        let coordinator = coordinator(chain, Arc::new(FakeWallet::default()));

        coordinator
            .check_allowance(&usdc(false), ROUTER, ACCOUNT, U256::from(AMOUNT), None)
            .await
            .unwrap();
        let other = crate::test_support::token(Address::repeat_byte(0x44), "DAI", 18);
        let state = coordinator
            .check_allowance(&other, ROUTER, ACCOUNT, U256::from(AMOUNT), None)
            .await
            .unwrap();
        assert_eq!(state, ApprovalState::NotApproved);
    }

    #[tokio::test]
    async fn late_permit_rejection_leaves_new_target_alone() {
        let wallet = Arc::new(SlowRejectingWallet {
            inner: FakeWallet::default(),
            gated: AtomicBool::new(true),
            started: Notify::new(),
            release: Notify::new(),
        });
        let coordinator = ApprovalCoordinator::new(
            Arc::new(FakeChain::default()),
            Some(wallet.clone()),
            ApprovalSettings::default(),
        );
        coordinator
            .check_allowance(&usdc(true), ROUTER, ACCOUNT, U256::from(AMOUNT), permit_token())
            .await
            .unwrap();

        let (first, second) = tokio::join!(coordinator.request_approval(), async {
            wallet.started.notified().await;
            coordinator
                .check_allowance(&usdc(true), ROUTER, ACCOUNT, U256::from(2 * AMOUNT), permit_token())
                .await
                .unwrap();
            let outcome = coordinator.request_approval().await.unwrap();
            wallet.release.notify_one();
            outcome
        });

        assert_eq!(first.unwrap(), ApprovalOutcome::Cancelled);
        assert_eq!(second, ApprovalOutcome::PermitSigned);
        assert_eq!(coordinator.permit_state().await, PermitSignatureState::Signed);
        assert_eq!(coordinator.valid_permit().await.unwrap().amount, U256::from(2 * AMOUNT));
    }

    #[tokio::test]
    async fn permit_skips_approval_transaction() {
        let chain = Arc::new(FakeChain::default());
        let wallet = Arc::new(FakeWallet::default());
        let coordinator = coordinator(chain, wallet.clone());

        coordinator
            .check_allowance(&usdc(true), ROUTER, ACCOUNT, U256::from(AMOUNT), permit_token())
            .await
            .unwrap();
        let outcome = coordinator.request_approval().await.unwrap();

        assert_eq!(outcome, ApprovalOutcome::PermitSigned);
        assert_eq!(coordinator.permit_state().await, PermitSignatureState::Signed);
        assert_eq!(coordinator.effective_state().await, ApprovalState::Approved);
        assert!(wallet.sent().is_empty());

        let permit = coordinator.valid_permit().await.unwrap();
        assert_eq!(permit.v(), 27);
        assert_eq!(permit.amount, U256::from(AMOUNT));
    }

    #[tokio::test]
    async fn rejected_permit_does_not_fall_back() {
        let chain = Arc::new(FakeChain::default());
        let wallet = Arc::new(FakeWallet::rejecting_signatures());
        let coordinator = coordinator(chain, wallet.clone());

        coordinator
            .check_allowance(&usdc(true), ROUTER, ACCOUNT, U256::from(AMOUNT), permit_token())
            .await
            .unwrap();
        let outcome = coordinator.request_approval().await.unwrap();

        assert_eq!(outcome, ApprovalOutcome::Cancelled);
        assert_eq!(coordinator.approval_state().await, ApprovalState::NotApproved);
        assert_eq!(coordinator.permit_state().await, PermitSignatureState::NotSigned);
        assert!(wallet.sent().is_empty());
    }

    #[tokio::test]
    async fn other_permit_failures_fall_back_to_approve() {
        let chain = Arc::new(FakeChain::default());
        let wallet = Arc::new(FakeWallet::default());
        *wallet.sign_error.lock().unwrap() = Some(crate::errors::WalletError::Rpc {
            code: -32603,
            message: "eth_signTypedData_v4 not supported".into(),
        });
        let coordinator = coordinator(chain, wallet.clone());

        coordinator
            .check_allowance(&usdc(true), ROUTER, ACCOUNT, U256::from(AMOUNT), permit_token())
            .await
            .unwrap();
        let outcome = coordinator.request_approval().await.unwrap();

        assert!(matches!(outcome, ApprovalOutcome::Submitted { .. }));
        assert_eq!(wallet.sent().len(), 1);
        assert!(coordinator.approval_state().await.is_pending());
    }

    #[tokio::test]
    async fn failed_receipt_returns_to_not_approved() {
        let chain = Arc::new(FakeChain::default());
        let coordinator = coordinator(chain.clone(), Arc::new(FakeWallet::default()));

        coordinator
            .check_allowance(&usdc(false), ROUTER, ACCOUNT, U256::from(AMOUNT), None)
            .await
            .unwrap();
        let ApprovalOutcome::Submitted { tx_hash } = coordinator.request_approval().await.unwrap() else {
            panic!("expected submission");
        };

        chain.set_receipt(tx_hash, false);
        let state = coordinator.reconcile_receipt(tx_hash).await.unwrap();
        assert_eq!(state, ApprovalState::NotApproved);
    }
}
