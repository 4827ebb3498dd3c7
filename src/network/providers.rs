//! Network provider setup

use alloy::{
    network::EthereumWallet,
    providers::{Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
};
use anyhow::{Context, Result};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};
use crate::{
    config::Config,
    network::retry::{retry_with_backoff, RetryConfig},
    ConcreteProvider,
};

pub async fn setup_provider(config: &Config) -> Result<Arc<ConcreteProvider>> {
    let rpc_url = config.rpc_url.as_ref()
        .context("RPC_URL is required")?;

    let provider: Arc<ConcreteProvider> = Arc::new(
        ProviderBuilder::new()
            .on_http(rpc_url.parse()?)
            .boxed()
    );

    info!("🔗 Testing connection to chain {}...", config.chain_id);
    let chain_id = retry_with_backoff(
        || async {
            provider.get_chain_id().await
                .context("Failed to get chain id")
        },
        &RetryConfig {
            max_attempts: 5,
            initial_delay_ms: 500,
            max_delay_ms: 10000,
            exponential_base: 2.0,
        },
        "RPC connection",
    ).await
    .map_err(|e| {
        warn!("⚠️ Network connection attempt failed: {}", e);
        anyhow::anyhow!("Network connection failed: {}", e)
    })?;

    if chain_id != config.chain_id {
        return Err(anyhow::anyhow!(
            "RPC reports chain {} but CHAIN_ID is {}",
            chain_id,
            config.chain_id
        ));
    }

    info!("✅ Connected to chain {}", chain_id);
    Ok(provider)
}

pub fn setup_signer(config: &Config) -> Result<Option<PrivateKeySigner>> {
    config.private_key
        .as_ref()
        .map(|pk| PrivateKeySigner::from_str(pk).context("Failed to parse private key"))
        .transpose()
}

/// Wraps the read provider with nonce/gas fillers and the local wallet.
pub fn setup_signing_provider(
    provider: &Arc<ConcreteProvider>,
    signer: PrivateKeySigner,
) -> Arc<dyn Provider> {
    let wallet = EthereumWallet::from(signer);
    Arc::new(
        ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_provider(provider.as_ref().clone())
    )
}
