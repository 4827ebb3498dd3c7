//! Token contract ownership check

use alloy::primitives::Address;
use serde::Serialize;
use tracing::debug;
use crate::{network::ChainReader, types::RENOUNCED_ADDRESSES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OwnershipStatus {
    Renounced,
    Owned(Address),
    /// The contract has no `owner()` or the call failed.
    Unknown,
}

pub async fn check_ownership(reader: &dyn ChainReader, token: Address) -> OwnershipStatus {
    match reader.contract_owner(token).await {
        Ok(owner) if RENOUNCED_ADDRESSES.contains(&owner) => OwnershipStatus::Renounced,
        Ok(owner) => OwnershipStatus::Owned(owner),
        Err(e) => {
            debug!(%token, "Ownership lookup failed: {}", e);
            OwnershipStatus::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeChain;
    use alloy::primitives::address;

    #[tokio::test]
    async fn dead_and_zero_owners_are_renounced() {
        let chain = FakeChain::default();
        let dead = Address::repeat_byte(1);
        let zero = Address::repeat_byte(2);
        let owned = Address::repeat_byte(3);
        {
            let mut owners = chain.owners.lock().unwrap();
            owners.insert(dead, address!("000000000000000000000000000000000000dEaD"));
            owners.insert(zero, Address::ZERO);
            owners.insert(owned, Address::repeat_byte(9));
        }

        assert_eq!(check_ownership(&chain, dead).await, OwnershipStatus::Renounced);
        assert_eq!(check_ownership(&chain, zero).await, OwnershipStatus::Renounced);
        assert_eq!(check_ownership(&chain, owned).await, OwnershipStatus::Owned(Address::repeat_byte(9)));
        assert_eq!(check_ownership(&chain, Address::repeat_byte(4)).await, OwnershipStatus::Unknown);
    }
}
