//! User preferences shared by the session components

use alloy::primitives::Address;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use crate::types::SlippageTolerance;
use super::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapPreferences {
    pub slippage: SlippageTolerance,
    pub auto_slippage: bool,
    pub expert_mode: bool,
    pub single_hop_only: bool,
    pub recipient: Option<Address>,
}

impl SwapPreferences {
    pub fn from_config(config: &Config) -> Self {
        Self {
            slippage: SlippageTolerance::from_bps(config.default_slippage_bps),
            auto_slippage: config.auto_slippage,
            expert_mode: config.expert_mode,
            single_hop_only: config.single_hop_only,
            recipient: None,
        }
    }
}

/// Handle to preferences owned outside the coordinator. Cloning shares the
/// same underlying state.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    inner: Arc<RwLock<SwapPreferences>>,
}

impl PreferenceStore {
    pub fn new(preferences: SwapPreferences) -> Self {
        Self {
            inner: Arc::new(RwLock::new(preferences)),
        }
    }

    pub async fn snapshot(&self) -> SwapPreferences {
        self.inner.read().await.clone()
    }

    pub async fn slippage(&self) -> SlippageTolerance {
        self.inner.read().await.slippage
    }

    pub async fn set_slippage(&self, slippage: SlippageTolerance) {
        debug!(bps = slippage.bps, "Slippage tolerance updated");
        self.inner.write().await.slippage = slippage;
    }

    pub async fn set_expert_mode(&self, enabled: bool) {
        self.inner.write().await.expert_mode = enabled;
    }

    pub async fn set_auto_slippage(&self, enabled: bool) {
        self.inner.write().await.auto_slippage = enabled;
    }

    pub async fn set_recipient(&self, recipient: Option<Address>) {
        self.inner.write().await.recipient = recipient;
    }
}
