//! Off-chain permit signing (EIP-2612 and DAI-style)

use alloy::{
    primitives::{B256, U256},
    sol_types::{Eip712Domain, SolStruct},
};
use tracing::{debug, info};
use crate::{
    errors::{SwapResult, WalletError},
    network::{contracts::{dai, Permit}, ChainReader, WalletClient},
    types::{ApprovalTarget, PermitKind, PermitSignature, Token},
};

const SIGNATURE_LEN: usize = 65;

pub fn permit_domain(token: &Token) -> Eip712Domain {
    let info = token.permit.as_ref();
    let name = info
        .and_then(|p| p.name.clone())
        .unwrap_or_else(|| token.name.clone());
    let version = info.map(|p| p.version.clone()).unwrap_or_else(|| "1".to_string());

    Eip712Domain::new(
        Some(name.into()),
        Some(version.into()),
        Some(U256::from(token.chain_id)),
        Some(token.address),
        None,
    )
}

/// EIP-712 signing hash of the permit message for `target`.
pub fn permit_signing_hash(
    token: &Token,
    kind: PermitKind,
    target: &ApprovalTarget,
    nonce: U256,
    deadline: u64,
) -> B256 {
    let domain = permit_domain(token);
    match kind {
        PermitKind::Amount => Permit {
            owner: target.owner,
            spender: target.spender,
            value: target.amount,
            nonce,
            deadline: U256::from(deadline),
        }
        .eip712_signing_hash(&domain),
        PermitKind::Allowed => dai::Permit {
            holder: target.owner,
            spender: target.spender,
            nonce,
            expiry: U256::from(deadline),
            allowed: true,
        }
        .eip712_signing_hash(&domain),
    }
}

/// Reads the permit nonce and asks the wallet to sign.
///
/// Wallet failures, including a user rejection, come back as
/// [`crate::errors::SwapError::Wallet`].
pub async fn sign_permit(
    reader: &dyn ChainReader,
    wallet: &dyn WalletClient,
    token: &Token,
    target: &ApprovalTarget,
    deadline: u64,
) -> SwapResult<PermitSignature> {
    let kind = token.permit.as_ref().map(|p| p.kind).unwrap_or(PermitKind::Amount);
    let nonce = reader.permit_nonce(token.address, target.owner).await?;
    let hash = permit_signing_hash(token, kind, target, nonce, deadline);
    debug!(token = %token.address, %nonce, ?kind, "Requesting permit signature");

    let signature = wallet.sign_typed_data_hash(hash).await?;
    if signature.len() != SIGNATURE_LEN {
        return Err(WalletError::Other(format!(
            "Malformed permit signature: expected {} bytes, got {}",
            SIGNATURE_LEN,
            signature.len()
        ))
        .into());
    }

    info!("✍️ Permit signed for {} -> {}", token.symbol, target.spender);
    Ok(PermitSignature {
        token: token.address,
        spender: target.spender,
        owner: target.owner,
        amount: match kind {
            PermitKind::Amount => target.amount,
            PermitKind::Allowed => U256::MAX,
        },
        nonce,
        deadline,
        allowed: kind == PermitKind::Allowed,
        signature,
    })
}
