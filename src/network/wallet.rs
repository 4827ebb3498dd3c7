//! Chain reads and wallet actions used by the approval and swap flows

use alloy::{
    network::ReceiptResponse,
    primitives::{Address, B256, Bytes, U256, keccak256},
    providers::Provider,
    rpc::types::eth::TransactionRequest,
    signers::{local::PrivateKeySigner, SignerSync},
    sol_types::{SolCall, SolValue},
    transports::TransportError,
};
use anyhow::Context;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};
use crate::{
    errors::{SwapError, SwapResult, WalletError},
    network::{
        contracts::IERC20,
        retry::{retry_with_backoff, RetryConfig},
    },
    types::{known_permit, Token},
    ConcreteProvider,
};

/// Transaction to be signed and submitted by the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionCall {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

/// Read-only contract calls.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> SwapResult<U256>;

    /// EIP-2612 `nonces(owner)`.
    async fn permit_nonce(&self, token: Address, owner: Address) -> SwapResult<U256>;

    async fn contract_owner(&self, contract: Address) -> SwapResult<Address>;

    /// `Some(success)` once mined, `None` while pending.
    async fn receipt_status(&self, tx_hash: B256) -> SwapResult<Option<bool>>;
}

/// Connected account able to submit transactions and sign typed data.
#[async_trait]
pub trait WalletClient: Send + Sync {
    fn account(&self) -> Address;

    fn chain_id(&self) -> u64;

    async fn send_transaction(&self, call: TransactionCall) -> Result<B256, WalletError>;

    /// Signs an EIP-712 signing hash, returning the 65-byte `r || s || v` signature.
    async fn sign_typed_data_hash(&self, hash: B256) -> Result<Bytes, WalletError>;
}

pub(crate) fn encode_call(signature: &str, args: Vec<u8>) -> Bytes {
    let mut data = keccak256(signature)[..4].to_vec();
    data.extend_from_slice(&args);
    data.into()
}

fn map_transport_error(e: TransportError) -> WalletError {
    match e.as_error_resp() {
        Some(payload) => WalletError::from_code(payload.code, payload.message.to_string()),
        None => WalletError::Other(e.to_string()),
    }
}

pub struct AlloyChainReader {
    provider: Arc<ConcreteProvider>,
    retry: RetryConfig,
}

impl AlloyChainReader {
    pub fn new(provider: Arc<ConcreteProvider>) -> Self {
        Self {
            provider,
            retry: RetryConfig::default(),
        }
    }

    async fn call(&self, to: Address, data: Bytes, context: &str) -> SwapResult<Bytes> {
        let operation = || {
            let data = data.clone();
            async move {
                let tx = TransactionRequest::default().to(to).input(data.into());
                self.provider.call(&tx).await
                    .with_context(|| format!("eth_call to {} failed", to))
            }
        };

        retry_with_backoff(operation, &self.retry, context).await
    }

    /// Reads ERC-20 metadata and attaches known permit support.
    pub async fn load_token(&self, chain_id: u64, address: Address) -> SwapResult<Token> {
        let decimals_raw = self.call(address, IERC20::decimalsCall {}.abi_encode().into(), "token decimals").await?;
        let decimals = IERC20::decimalsCall::abi_decode_returns(&decimals_raw, true)
            .map_err(|e| SwapError::Contract {
                contract: address,
                message: "Failed to decode decimals".to_string(),
                source: e.into(),
            })?
            .tokenDecimals;

        // Some tokens return bytes32 for these; fall back to the address.
        let symbol = self.call(address, IERC20::symbolCall {}.abi_encode().into(), "token symbol").await
            .ok()
            .and_then(|raw| IERC20::symbolCall::abi_decode_returns(&raw, true).ok())
            .map(|r| r.tokenSymbol)
            .unwrap_or_else(|| address.to_string());
        let name = self.call(address, IERC20::nameCall {}.abi_encode().into(), "token name").await
            .ok()
            .and_then(|raw| IERC20::nameCall::abi_decode_returns(&raw, true).ok())
            .map(|r| r.tokenName)
            .unwrap_or_else(|| symbol.clone());

        Ok(Token {
            chain_id,
            address,
            decimals,
            symbol,
            name,
            permit: known_permit(chain_id, address),
        })
    }
}

#[async_trait]
impl ChainReader for AlloyChainReader {
    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> SwapResult<U256> {
        let data = encode_call("allowance(address,address)", (owner, spender).abi_encode_params());
        let result = self.call(token, data, "allowance").await?;
        U256::abi_decode(&result, true).map_err(|e| SwapError::Contract {
            contract: token,
            message: "Failed to decode allowance".to_string(),
            source: e.into(),
        })
    }

    async fn permit_nonce(&self, token: Address, owner: Address) -> SwapResult<U256> {
        let data = encode_call("nonces(address)", owner.abi_encode());
        let result = self.call(token, data, "permit nonce").await?;
        U256::abi_decode(&result, true).map_err(|e| SwapError::Contract {
            contract: token,
            message: "Failed to decode permit nonce".to_string(),
            source: e.into(),
        })
    }

    async fn contract_owner(&self, contract: Address) -> SwapResult<Address> {
        let data = encode_call("owner()", Vec::new());
        let result = self.call(contract, data, "contract owner").await?;
        Address::abi_decode(&result, true).map_err(|e| SwapError::Contract {
            contract,
            message: "Failed to decode owner".to_string(),
            source: e.into(),
        })
    }

    async fn receipt_status(&self, tx_hash: B256) -> SwapResult<Option<bool>> {
        let receipt = retry_with_backoff(
            || async {
                self.provider.get_transaction_receipt(tx_hash).await
                    .context("Failed to fetch receipt")
            },
            &self.retry,
            "transaction receipt",
        ).await?;
        Ok(receipt.map(|r| r.status()))
    }
}

/// Local private-key wallet over a filler-equipped provider.
pub struct AlloyWallet {
    provider: Arc<dyn Provider>,
    signer: PrivateKeySigner,
    chain_id: u64,
}

impl AlloyWallet {
    pub fn new(provider: Arc<dyn Provider>, signer: PrivateKeySigner, chain_id: u64) -> Self {
        Self { provider, signer, chain_id }
    }
}

#[async_trait]
impl WalletClient for AlloyWallet {
    fn account(&self) -> Address {
        self.signer.address()
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn send_transaction(&self, call: TransactionCall) -> Result<B256, WalletError> {
        let tx = TransactionRequest::default()
            .from(self.account())
            .to(call.to)
            .value(call.value)
            .input(call.data.into());

        debug!(to = %call.to, value = %call.value, "Submitting transaction");
        let pending = self.provider
            .send_transaction(tx)
            .await
            .map_err(map_transport_error)?;

        let tx_hash = *pending.tx_hash();
        info!("📡 Transaction sent: {:?}", tx_hash);
        Ok(tx_hash)
    }

    async fn sign_typed_data_hash(&self, hash: B256) -> Result<Bytes, WalletError> {
        let signature = self.signer
            .sign_hash_sync(&hash)
            .map_err(|e| WalletError::Other(format!("Signing failed: {}", e)))?;
        Ok(Bytes::copy_from_slice(&signature.as_bytes()))
    }
}
