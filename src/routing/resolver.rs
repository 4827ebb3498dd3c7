//! Trade resolution across the V2 and V3 engines

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use crate::{
    config::RoutingConfig,
    routing::{comparison::select_trade, engine::RoutingEngine},
    types::{QuoteRequest, RouterVersion, Trade, TradeState},
};

const RETRY_INTERVAL: Duration = Duration::from_millis(250);

/// Snapshot of the latest applied resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub generation: u64,
    pub request: Option<QuoteRequest>,
    pub v2: TradeState,
    pub v3: TradeState,
    pub best: Option<Trade>,
    pub route_not_found: bool,
}

impl Resolution {
    fn empty() -> Self {
        Self {
            generation: 0,
            request: None,
            v2: TradeState::Invalid,
            v3: TradeState::Invalid,
            best: None,
            route_not_found: false,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.v2, TradeState::Loading) || matches!(self.v3, TradeState::Loading)
    }

    pub fn state_for(&self, version: RouterVersion) -> &TradeState {
        match version {
            RouterVersion::V2 => &self.v2,
            RouterVersion::V3 => &self.v3,
        }
    }
}

/// Resolves quotes from both engines. Each call to [`TradeResolver::resolve`]
/// takes a new generation; results of older generations are dropped.
pub struct TradeResolver {
    v2: Arc<dyn RoutingEngine>,
    v3: Arc<dyn RoutingEngine>,
    config: RoutingConfig,
    generation: AtomicU64,
    preferred: RwLock<RouterVersion>,
    current: RwLock<Resolution>,
}

impl TradeResolver {
    pub fn new(v2: Arc<dyn RoutingEngine>, v3: Arc<dyn RoutingEngine>, config: RoutingConfig) -> Self {
        Self {
            v2,
            v3,
            config,
            generation: AtomicU64::new(0),
            preferred: RwLock::new(RouterVersion::V3),
            current: RwLock::new(Resolution::empty()),
        }
    }

    pub fn engine(&self, version: RouterVersion) -> &Arc<dyn RoutingEngine> {
        match version {
            RouterVersion::V2 => &self.v2,
            RouterVersion::V3 => &self.v3,
        }
    }

    /// Engine that wins ties.
    pub async fn set_preferred(&self, version: RouterVersion) {
        *self.preferred.write().await = version;
    }

    pub async fn preferred(&self) -> RouterVersion {
        *self.preferred.read().await
    }

    pub async fn current(&self) -> Resolution {
        self.current.read().await.clone()
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Quotes `request` on both engines and applies the result.
    ///
    /// Returns `None` when a newer call superseded this one before it finished.
    /// `None` as the request clears the resolution.
    pub async fn resolve(&self, request: Option<QuoteRequest>) -> Option<Resolution> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(request) = request else {
            let mut current = self.current.write().await;
            *current = Resolution { generation, ..Resolution::empty() };
            return Some(current.clone());
        };

        {
            let mut current = self.current.write().await;
            *current = Resolution {
                generation,
                request: Some(request.clone()),
                v2: TradeState::Loading,
                v3: TradeState::Loading,
                best: None,
                route_not_found: false,
            };
        }

        let started = Instant::now();
        let (v2, v3) = tokio::join!(
            self.quote_engine(self.v2.as_ref(), &request, generation, started),
            self.quote_engine(self.v3.as_ref(), &request, generation, started),
        );

        let preferred = self.preferred().await;
        let mut current = self.current.write().await;
        if !self.is_current(generation) || current.generation != generation {
            debug!(generation, "Discarding superseded quote");
            return None;
        }

        let best = select_trade(v2.trade(), v3.trade(), preferred, self.config.better_trade_threshold_bps);
        let route_not_found = matches!(v2, TradeState::NoRouteFound) && matches!(v3, TradeState::NoRouteFound);

        match &best {
            Some(trade) => info!(
                "💱 {} quote: {} -> {} (impact {:?})",
                trade.version, trade.input, trade.output, trade.price_impact
            ),
            None if route_not_found => warn!(
                "⚠️ No route for {} -> {}: insufficient liquidity",
                request.input, request.output
            ),
            None => {}
        }

        *current = Resolution {
            generation,
            request: Some(request),
            v2,
            v3,
            best,
            route_not_found,
        };
        Some(current.clone())
    }

    /// Retries transient failures until the quote timeout, then reports no route.
    async fn quote_engine(
        &self,
        engine: &dyn RoutingEngine,
        request: &QuoteRequest,
        generation: u64,
        started: Instant,
    ) -> TradeState {
        loop {
            match tokio::time::timeout(self.config.engine_call_timeout, engine.quote(request)).await {
                Ok(Ok(Some(trade))) => return TradeState::Valid(trade),
                Ok(Ok(None)) => return TradeState::NoRouteFound,
                Ok(Err(e)) => warn!("{} quote failed: {}", engine.version(), e),
                Err(_) => warn!(
                    "{} quote timed out after {:?}",
                    engine.version(), self.config.engine_call_timeout
                ),
            }

            let elapsed = started.elapsed();
            if elapsed >= self.config.quote_timeout {
                return TradeState::NoRouteFound;
            }
            if !self.is_current(generation) {
                return TradeState::Loading;
            }
            tokio::time::sleep(RETRY_INTERVAL.min(self.config.quote_timeout - elapsed)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{SwapError, SwapResult};
    use crate::routing::engine::build_trade;
    use crate::types::{Asset, CurrencyAmount, Route, Token, TradeType, USDC_MAINNET};
    use alloy::primitives::{Address, U256};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;

    /// Quotes 2x the input; sleeps longer for larger amounts.
    struct DelayedEngine {
        version: RouterVersion,
        delay_per_unit: Duration,
    }

    #[async_trait]
    impl RoutingEngine for DelayedEngine {
        fn version(&self) -> RouterVersion {
            self.version
        }

        fn router(&self) -> Address {
            Address::ZERO
        }

        async fn quote(&self, request: &QuoteRequest) -> SwapResult<Option<Trade>> {
            let units = request.amount.raw.to::<u64>();
            tokio::time::sleep(self.delay_per_unit * units as u32).await;
            Ok(Some(build_trade(
                request,
                self.version,
                Route { path: Vec::new(), fees: Vec::new() },
                request.amount.raw,
                request.amount.raw * U256::from(2u64),
                None,
            )))
        }
    }

    struct FailingEngine {
        version: RouterVersion,
        calls: AtomicU32,
    }

    #[async_trait]
    impl RoutingEngine for FailingEngine {
        fn version(&self) -> RouterVersion {
            self.version
        }

        fn router(&self) -> Address {
            Address::ZERO
        }

        async fn quote(&self, _request: &QuoteRequest) -> SwapResult<Option<Trade>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(SwapError::Network {
                message: "rpc down".into(),
                source: None,
                retry_count: 1,
            })
        }
    }

    struct NoRouteEngine(RouterVersion);

    #[async_trait]
    impl RoutingEngine for NoRouteEngine {
        fn version(&self) -> RouterVersion {
            self.0
        }

        fn router(&self) -> Address {
            Address::ZERO
        }

        async fn quote(&self, _request: &QuoteRequest) -> SwapResult<Option<Trade>> {
            Ok(None)
        }
    }

    fn request(raw: u64) -> QuoteRequest {
        let output = Asset::Token(Token {
            chain_id: 1,
            address: USDC_MAINNET,
            decimals: 6,
            symbol: "USDC".into(),
            name: "USD Coin".into(),
            permit: None,
        });
        let input = Asset::native(1);
        QuoteRequest {
            amount: CurrencyAmount::new(input.clone(), U256::from(raw)),
            input,
            output,
            trade_type: TradeType::ExactInput,
            single_hop_only: false,
        }
    }

    fn config() -> RoutingConfig {
        RoutingConfig {
            better_trade_threshold_bps: 0,
            quote_timeout: Duration::from_millis(120),
            engine_call_timeout: Duration::from_millis(500),
        }
    }

    #[tokio::test]
    async fn only_latest_request_is_applied() {
        let engine = |version| -> Arc<dyn RoutingEngine> {
            Arc::new(DelayedEngine { version, delay_per_unit: Duration::from_millis(2) })
        };
        let resolver = TradeResolver::new(engine(RouterVersion::V2), engine(RouterVersion::V3), config());

        let (slow, fast) = tokio::join!(
            resolver.resolve(Some(request(100))),
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                resolver.resolve(Some(request(5))).await
            },
        );

        assert!(slow.is_none());
        let fast = fast.unwrap();
        assert_eq!(fast.best.unwrap().input.raw, U256::from(5u64));

        let current = resolver.current().await;
        assert_eq!(current.generation, 2);
        assert_eq!(current.best.unwrap().output.raw, U256::from(10u64));
    }

    #[tokio::test]
    async fn transient_failures_become_no_route_after_timeout() {
        let failing = Arc::new(FailingEngine { version: RouterVersion::V3, calls: AtomicU32::new(0) });
        let resolver = TradeResolver::new(
            Arc::new(NoRouteEngine(RouterVersion::V2)),
            failing.clone(),
            RoutingConfig { engine_call_timeout: Duration::from_millis(20), ..config() },
        );

        let resolution = resolver.resolve(Some(request(1))).await.unwrap();
        assert_eq!(resolution.v3, TradeState::NoRouteFound);
        assert!(resolution.route_not_found);
        assert!(resolution.best.is_none());
        assert!(failing.calls.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn one_engine_routing_is_enough() {
        let resolver = TradeResolver::new(
            Arc::new(NoRouteEngine(RouterVersion::V2)),
            Arc::new(DelayedEngine { version: RouterVersion::V3, delay_per_unit: Duration::ZERO }),
            config(),
        );

        let resolution = resolver.resolve(Some(request(3))).await.unwrap();
        assert!(!resolution.route_not_found);
        assert_eq!(resolution.best.unwrap().version, RouterVersion::V3);

        let cleared = resolver.resolve(None).await.unwrap();
        assert_eq!(cleared.v2, TradeState::Invalid);
        assert!(cleared.best.is_none());
    }
}
