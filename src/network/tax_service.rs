//! Token tax inspection over HTTP

use alloy::primitives::Address;
use anyhow::Context;
use async_trait::async_trait;
use rust_decimal::prelude::*;
use serde::Deserialize;
use tracing::{debug, warn};
use crate::{
    config::TaxServiceConfig,
    errors::{SwapError, SwapResult},
    network::retry::{retry_with_backoff, RetryConfig},
    types::TaxQuote,
};

#[async_trait]
pub trait TaxService: Send + Sync {
    async fn get_tax(&self, chain_id: u64, token: Address) -> SwapResult<TaxQuote>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimulationResult {
    #[serde(default)]
    buy_tax: Option<f64>,
    #[serde(default)]
    sell_tax: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HoneypotResult {
    #[serde(default)]
    is_honeypot: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaxResponse {
    #[serde(default)]
    simulation_result: Option<SimulationResult>,
    #[serde(default)]
    honeypot_result: Option<HoneypotResult>,
}

/// Client for a honeypot.is-compatible inspection API. The chain is passed as
/// `chainID`, so one base URL serves every supported network.
pub struct HttpTaxService {
    client: reqwest::Client,
    config: TaxServiceConfig,
    retry: RetryConfig,
}

impl HttpTaxService {
    pub fn new(config: TaxServiceConfig) -> SwapResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                warn!("⚠️ Failed to initialize HTTP client: {}", e);
                SwapError::Network {
                    message: "Failed to build HTTP client".to_string(),
                    source: Some(e.into()),
                    retry_count: 0,
                }
            })?;

        Ok(Self {
            client,
            config,
            retry: RetryConfig {
                max_attempts: 2,
                initial_delay_ms: 200,
                ..Default::default()
            },
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn to_quote(token: Address, response: TaxResponse) -> SwapResult<TaxQuote> {
        let simulation = response.simulation_result.ok_or_else(|| SwapError::TaxLookup {
            asset: token,
            reason: "response has no simulation result".to_string(),
        })?;

        let pct = |v: Option<f64>| {
            v.and_then(Decimal::from_f64)
                .unwrap_or_default()
                .round_dp(2)
        };

        Ok(TaxQuote {
            buy_tax_pct: pct(simulation.buy_tax),
            sell_tax_pct: pct(simulation.sell_tax),
            is_honeypot: response.honeypot_result.map(|h| h.is_honeypot).unwrap_or(false),
        })
    }
}

#[async_trait]
impl TaxService for HttpTaxService {
    async fn get_tax(&self, chain_id: u64, token: Address) -> SwapResult<TaxQuote> {
        if !self.config.supported_chains.contains(&chain_id) {
            return Err(SwapError::UnsupportedChain(chain_id));
        }

        let operation = || async {
            let response = self.client
                .get(&self.config.base_url)
                .query(&[
                    ("address", token.to_string()),
                    ("chainID", chain_id.to_string()),
                ])
                .send()
                .await
                .context("HTTP request failed")?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                warn!("⚠️ Tax service returned error status {}: {}", status, body);
                return Err(anyhow::anyhow!("Tax service error: {} - {}", status, body));
            }

            response.json::<TaxResponse>().await
                .context("Failed to parse tax response")
        };

        let response = retry_with_backoff(operation, &self.retry, "tax lookup").await
            .map_err(|e| SwapError::TaxLookup {
                asset: token,
                reason: e.to_string(),
            })?;

        let quote = Self::to_quote(token, response)?;
        debug!(
            token = %token,
            buy = %quote.buy_tax_pct,
            sell = %quote.sell_tax_pct,
            honeypot = quote.is_honeypot,
            "Fetched token taxes"
        );
        Ok(quote)
    }
}
