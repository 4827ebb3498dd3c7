//! Swap Coordinator - Main Entry Point
//!
//! Quotes INPUT_TOKEN -> OUTPUT_TOKEN for AMOUNT, reports slippage, price
//! impact and approval, and submits approval and swap when EXECUTE=true.

use swap_coordinator::*;
use alloy::primitives::Address;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use swap_coordinator::{
    approval::{ApprovalCoordinator, ApprovalSettings},
    config::{PreferenceStore, SwapPreferences},
    errors::ErrorRecovery,
    execution::{AnalyticsSink, FanoutAnalytics, RouterSwapCallback, SwapCallback, SwapExecutor, TracingAnalytics},
    network::{AlloyChainReader, AlloyWallet, ChainReader, HttpTaxService, WalletClient},
    routing::{RoutingEngine, TradeResolver, UnavailableEngine, V2ReserveEngine, V3QuoterEngine},
    slippage::SlippageEstimator,
    storage::{JsonlAnalytics, ANALYTICS_DIR},
    validation::{AcceptAll, PriceImpactGuard},
};

const APPROVAL_POLL_INTERVAL: Duration = Duration::from_secs(3);
const APPROVAL_POLL_ATTEMPTS: u32 = 40;

async fn load_asset(reader: &AlloyChainReader, chain_id: u64, token: Option<Address>) -> Result<Asset> {
    match token {
        None => Ok(Asset::native(chain_id)),
        Some(address) => {
            let token = reader.load_token(chain_id, address).await
                .with_context(|| format!("Failed to load token {}", address))?;
            Ok(Asset::Token(token))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    let _logging_guard = utils::setup_logging()?;
    utils::setup_output_directories()?;

    // Load configuration
    let config = CONFIG.clone();
    config.validate().map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    info!("🔀 Swap Coordinator v{}", env!("CARGO_PKG_VERSION"));
    info!("📋 Configuration:");
    info!("   Chain: {}", config.chain_id);
    info!("   Default Slippage: {} bps (auto: {})", config.default_slippage_bps, config.auto_slippage);
    info!("   Expert Mode: {}", config.expert_mode);
    info!("   Single Hop Only: {}", config.single_hop_only);
    info!("   Deadline: {}s", config.deadline_secs);
    info!("   Execute: {}", config.execute);
    if !config.execute {
        info!("   ⚠️  DRY RUN - no transactions will be sent");
    }

    let start_time = Instant::now();
    let chain_id = config.chain_id;

    // Setup network providers
    let provider = network::setup_provider(&config).await?;
    let reader = Arc::new(AlloyChainReader::new(provider.clone()));
    let wallet: Option<Arc<dyn WalletClient>> = match network::setup_signer(&config)? {
        Some(signer) => {
            let signing_provider = network::setup_signing_provider(&provider, signer.clone());
            let wallet = AlloyWallet::new(signing_provider, signer, chain_id);
            info!("👛 Wallet: {}", wallet.account());
            Some(Arc::new(wallet))
        }
        None => {
            warn!("⚠️  No PRIVATE_KEY set, running read-only");
            None
        }
    };

    // Routing engines
    let v2: Arc<dyn RoutingEngine> = match v2_deployment(chain_id) {
        Some((router, factory)) => Arc::new(V2ReserveEngine::new(provider.clone(), chain_id, router, factory)),
        None => {
            warn!("⚠️  No V2 router on chain {}", chain_id);
            Arc::new(UnavailableEngine(RouterVersion::V2))
        }
    };
    let v3: Arc<dyn RoutingEngine> = match v3_deployment(chain_id) {
        Some((router, factory, quoter)) => Arc::new(V3QuoterEngine::new(provider.clone(), router, factory, quoter)),
        None => {
            warn!("⚠️  No V3 router on chain {}", chain_id);
            Arc::new(UnavailableEngine(RouterVersion::V3))
        }
    };

    let callback: Option<Arc<dyn SwapCallback>> = wallet.clone().map(|w| {
        let v2_router = v2_deployment(chain_id).map(|(router, _)| router);
        let v3_router = v3_deployment(chain_id).map(|(router, _, _)| router);
        Arc::new(RouterSwapCallback::new(w, v2_router, v3_router)) as Arc<dyn SwapCallback>
    });

    let preferences = PreferenceStore::new(SwapPreferences::from_config(&config));
    let guard = PriceImpactGuard::new(config.impact_thresholds.clone());
    let analytics: Arc<dyn AnalyticsSink> = Arc::new(FanoutAnalytics(vec![
        Box::new(TracingAnalytics),
        Box::new(JsonlAnalytics::new(ANALYTICS_DIR)),
    ]));
    let tax_service = Arc::new(HttpTaxService::new(config.tax_service.clone())?);
    let chain_reader: Arc<dyn ChainReader> = reader.clone();

    let session = SwapSession::new(SessionParts {
        chain_id,
        reader: chain_reader.clone(),
        wallet: wallet.clone(),
        resolver: TradeResolver::new(v2, v3, config.routing.clone()),
        approvals: ApprovalCoordinator::new(
            chain_reader,
            wallet.clone(),
            ApprovalSettings {
                unlimited_approval: config.unlimited_approval,
                permit_ttl_secs: config.deadline_secs,
                ..ApprovalSettings::default()
            },
        ),
        estimator: SlippageEstimator::new(tax_service, preferences.clone(), config.slippage_policy.clone()),
        guard: guard.clone(),
        executor: SwapExecutor::new(
            callback,
            wallet.as_ref().map(|w| w.account()),
            guard,
            Arc::new(AcceptAll),
            analytics,
            preferences.clone(),
            config.deadline_secs,
        ),
        preferences,
        recovery: ErrorRecovery::new(),
    });

    // Selection
    let input = load_asset(&reader, chain_id, config.input_token).await?;
    let output = load_asset(&reader, chain_id, config.output_token).await?;
    info!("🪙 Pair: {} -> {}", input, output);
    session.select_input(input).await;
    session.select_output(output).await;
    session.type_input(config.amount.as_deref().unwrap_or_default()).await;

    if let Some(status) = session.output_ownership().await {
        utils::print_ownership(status);
    }
    let prefs = session.preferences().snapshot().await;
    utils::print_slippage(prefs.slippage, prefs.auto_slippage);

    if session.wrap_type().await != WrapType::NotApplicable {
        if let Some(e) = session.input_error().await {
            warn!("⚠️  {}", e);
        } else if config.execute {
            match session.wrap().await {
                Ok(tx_hash) => info!("✅ Wrap submitted: {:?}", tx_hash),
                Err(e) => error!("❌ Wrap failed: {}", e),
            }
        } else {
            info!("🔁 {:?} ready, set EXECUTE=true to submit", session.wrap_type().await);
        }
        utils::print_session_stats(start_time, &session.recovery().snapshot().await);
        return Ok(());
    }

    let Some(resolution) = session.refresh_quote().await else {
        return Err(anyhow::anyhow!("Quote superseded"));
    };
    utils::print_resolution(&resolution);

    if let Some(e) = session.input_error().await {
        warn!("⚠️  {}", e);
        utils::print_session_stats(start_time, &session.recovery().snapshot().await);
        return Ok(());
    }
    let Some(trade) = resolution.best else {
        return Ok(());
    };

    let decision = session.guard_decision(&trade).await;
    utils::print_guard_decision(decision);

    let approval = session.refresh_approval().await?;
    utils::print_approval(
        approval,
        session.approvals().permit_state().await,
        session.show_approve_flow().await,
    );

    if !config.execute {
        info!("🏁 Dry run complete, set EXECUTE=true to submit");
        utils::print_session_stats(start_time, &session.recovery().snapshot().await);
        return Ok(());
    }

    if approval == ApprovalState::NotApproved {
        let outcome = session.approve().await?;
        info!("🔐 Approval outcome: {:?}", outcome);
        if outcome == ApprovalOutcome::Cancelled {
            return Ok(());
        }
    }

    let mut attempts = 0;
    while session.approvals().effective_state().await != ApprovalState::Approved {
        attempts += 1;
        if attempts > APPROVAL_POLL_ATTEMPTS {
            return Err(anyhow::anyhow!("Approval not confirmed in time"));
        }
        tokio::time::sleep(APPROVAL_POLL_INTERVAL).await;
        let state = session.poll_approvals().await?;
        info!("⏳ Approval state: {:?}", state);
        if state == ApprovalState::NotApproved {
            return Err(anyhow::anyhow!("Approval transaction failed"));
        }
    }

    // Re-quote after waiting on the approval
    if let Some(resolution) = session.refresh_quote().await {
        utils::print_resolution(&resolution);
    }

    let outcome = match session.swap().await {
        Some(outcome) => outcome,
        None => session.confirm_swap().await,
    };
    info!("🔄 Swap outcome: {:?}", outcome);
    utils::print_swap_phase(&session.executor().phase().await);
    session.dismiss().await;

    utils::print_session_stats(start_time, &session.recovery().snapshot().await);
    Ok(())
}
