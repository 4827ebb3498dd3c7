//! In-memory collaborators shared by unit tests

use alloy::primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use crate::{
    errors::{SwapError, SwapResult, WalletError},
    network::{ChainReader, TransactionCall, WalletClient},
    types::{Asset, PermitInfo, PermitKind, Token, USDC_MAINNET},
};

pub const ACCOUNT: Address = Address::repeat_byte(0xAA);
pub const ROUTER: Address = Address::repeat_byte(0xBB);

pub fn usdc(permit: bool) -> Asset {
    Asset::Token(Token {
        chain_id: 1,
        address: USDC_MAINNET,
        decimals: 6,
        symbol: "USDC".into(),
        name: "USD Coin".into(),
        permit: permit.then(|| PermitInfo {
            kind: PermitKind::Amount,
            version: "2".into(),
            name: None,
        }),
    })
}

pub fn token(address: Address, symbol: &str, decimals: u8) -> Asset {
    Asset::Token(Token {
        chain_id: 1,
        address,
        decimals,
        symbol: symbol.into(),
        name: symbol.into(),
        permit: None,
    })
}

#[derive(Default)]
pub struct FakeChain {
    pub allowances: Mutex<HashMap<(Address, Address, Address), U256>>,
    pub receipts: Mutex<HashMap<B256, bool>>,
    pub owners: Mutex<HashMap<Address, Address>>,
    pub fail_reads: Mutex<bool>,
}

impl FakeChain {
    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.allowances.lock().unwrap().insert((token, owner, spender), amount);
    }

    pub fn set_receipt(&self, tx_hash: B256, success: bool) {
        self.receipts.lock().unwrap().insert(tx_hash, success);
    }

    fn check_reads(&self) -> SwapResult<()> {
        if *self.fail_reads.lock().unwrap() {
            return Err(SwapError::Network {
                message: "rpc unavailable".into(),
                source: None,
                retry_count: 1,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChainReader for FakeChain {
    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> SwapResult<U256> {
        self.check_reads()?;
        Ok(self.allowances.lock().unwrap().get(&(token, owner, spender)).copied().unwrap_or_default())
    }

    async fn permit_nonce(&self, _token: Address, _owner: Address) -> SwapResult<U256> {
        self.check_reads()?;
        Ok(U256::ZERO)
    }

    async fn contract_owner(&self, contract: Address) -> SwapResult<Address> {
        self.check_reads()?;
        self.owners.lock().unwrap().get(&contract).copied().ok_or_else(|| SwapError::Contract {
            contract,
            message: "owner() reverted".into(),
            source: anyhow::anyhow!("execution reverted"),
        })
    }

    async fn receipt_status(&self, tx_hash: B256) -> SwapResult<Option<bool>> {
        self.check_reads()?;
        Ok(self.receipts.lock().unwrap().get(&tx_hash).copied())
    }
}

pub struct FakeWallet {
    pub account: Address,
    pub sign_error: Mutex<Option<WalletError>>,
    pub send_error: Mutex<Option<WalletError>>,
    pub sent: Mutex<Vec<TransactionCall>>,
    pub signatures_requested: Mutex<u32>,
}

impl Default for FakeWallet {
    fn default() -> Self {
        Self {
            account: ACCOUNT,
            sign_error: Mutex::new(None),
            send_error: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            signatures_requested: Mutex::new(0),
        }
    }
}

impl FakeWallet {
    pub fn rejecting_signatures() -> Self {
        let wallet = Self::default();
        *wallet.sign_error.lock().unwrap() = Some(WalletError::from_code(4001, "User denied message signature"));
        wallet
    }

    pub fn sent(&self) -> Vec<TransactionCall> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletClient for FakeWallet {
    fn account(&self) -> Address {
        self.account
    }

    fn chain_id(&self) -> u64 {
        1
    }

    async fn send_transaction(&self, call: TransactionCall) -> Result<B256, WalletError> {
        if let Some(e) = self.send_error.lock().unwrap().clone() {
            return Err(e);
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(call);
        Ok(B256::with_last_byte(sent.len() as u8))
    }

    async fn sign_typed_data_hash(&self, _hash: B256) -> Result<Bytes, WalletError> {
        *self.signatures_requested.lock().unwrap() += 1;
        if let Some(e) = self.sign_error.lock().unwrap().clone() {
            return Err(e);
        }
        let mut signature = vec![0x11u8; 64];
        signature.push(27);
        Ok(Bytes::from(signature))
    }
}
