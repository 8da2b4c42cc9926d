//! Round-robin pool of signing identities and per-identity nonce sequencing.

use std::{collections::HashMap, fmt};

use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{context::RunContext, error::LedgerError, ledger::LedgerClient};

/// An address and the key that signs for it.
#[derive(Clone)]
pub struct Identity {
    address: Address,
    signer: PrivateKeySigner,
}

impl Identity {
    /// Wraps a signer.
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self { address: signer.address(), signer }
    }

    /// Address of the identity.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Signer of the identity.
    pub const fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity").field("address", &self.address).finish_non_exhaustive()
    }
}

/// How the pool hands out nonces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NonceSequencing {
    /// Read the nonce from the ledger on every use. Safe only because the
    /// submission barrier keeps at most one transaction per identity in flight.
    #[default]
    Ledger,
    /// Read each identity's nonce once, then hand out strictly increasing
    /// values from a single authority.
    Authority,
}

/// Fixed, ordered pool of identities reused round-robin.
#[derive(Debug)]
pub struct IdentityPool {
    identities: Vec<Identity>,
    sequencing: NonceSequencing,
    next_nonces: Mutex<HashMap<Address, u64>>,
}

impl IdentityPool {
    /// Creates a pool. Returns `None` if `identities` is empty.
    pub fn new(identities: Vec<Identity>, sequencing: NonceSequencing) -> Option<Self> {
        if identities.is_empty() {
            return None;
        }
        Some(Self { identities, sequencing, next_nonces: Mutex::new(HashMap::new()) })
    }

    /// Number of identities in the pool.
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// Always false; a pool holds at least one identity.
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Nonce sequencing mode.
    pub const fn sequencing(&self) -> NonceSequencing {
        self.sequencing
    }

    /// Identity used for payload `index`.
    pub fn identity_at(&self, index: usize) -> &Identity {
        &self.identities[index % self.identities.len()]
    }

    /// Returns the nonce to sign the next transaction of `identity` with.
    pub async fn next_nonce<L>(
        &self,
        ledger: &L,
        ctx: &RunContext,
        identity: &Identity,
    ) -> Result<u64, LedgerError>
    where
        L: LedgerClient + ?Sized,
    {
        match self.sequencing {
            NonceSequencing::Ledger => ledger.get_nonce(ctx, identity.address()).await,
            NonceSequencing::Authority => {
                let mut next = self.next_nonces.lock().await;
                let nonce = match next.get(&identity.address()) {
                    Some(nonce) => *nonce,
                    None => {
                        let nonce = ledger.get_nonce(ctx, identity.address()).await?;
                        debug!(address = %identity.address(), nonce, "seeded nonce authority");
                        nonce
                    }
                };
                next.insert(identity.address(), nonce + 1);
                Ok(nonce)
            }
        }
    }

    /// Forgets the cached nonce of `identity` after a failed submission so the
    /// next use re-reads it from the ledger.
    pub async fn invalidate(&self, identity: &Identity) {
        if self.sequencing == NonceSequencing::Authority {
            self.next_nonces.lock().await.remove(&identity.address());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::SessionToken,
        secrets::{GeneratedIdentities, SecretProvider},
        testing::MockLedger,
    };

    fn pool(size: usize, sequencing: NonceSequencing) -> IdentityPool {
        let ids = GeneratedIdentities::new(size).with_seed(1).load().unwrap();
        IdentityPool::new(ids, sequencing).unwrap()
    }

    #[test]
    fn identity_at_wraps_around() {
        let pool = pool(3, NonceSequencing::Ledger);
        assert_eq!(pool.identity_at(0).address(), pool.identity_at(3).address());
        assert_eq!(pool.identity_at(1).address(), pool.identity_at(7).address());
        assert_ne!(pool.identity_at(0).address(), pool.identity_at(1).address());
    }

    #[test]
    fn empty_pool_is_rejected() {
        assert!(IdentityPool::new(Vec::new(), NonceSequencing::Ledger).is_none());
    }

    #[test]
    fn debug_does_not_leak_key() {
        let pool = pool(1, NonceSequencing::Ledger);
        let identity = pool.identity_at(0);
        let key = alloy_primitives::hex::encode(identity.signer().to_bytes());
        assert!(!format!("{identity:?}").contains(&key));
    }

    #[tokio::test]
    async fn ledger_sequencing_reads_every_time() {
        let ledger = MockLedger::new(1337);
        let ctx = RunContext::new(1337, SessionToken::new("t"));
        let pool = pool(1, NonceSequencing::Ledger);
        let identity = pool.identity_at(0);
        ledger.set_nonce(identity.address(), 4);

        assert_eq!(pool.next_nonce(&ledger, &ctx, identity).await.unwrap(), 4);
        assert_eq!(pool.next_nonce(&ledger, &ctx, identity).await.unwrap(), 4);
        assert_eq!(ledger.nonce_queries(), 2);
    }

    #[tokio::test]
    async fn authority_hands_out_increasing_nonces() {
        let ledger = MockLedger::new(1337);
        let ctx = RunContext::new(1337, SessionToken::new("t"));
        let pool = pool(1, NonceSequencing::Authority);
        let identity = pool.identity_at(0);
        ledger.set_nonce(identity.address(), 9);

        assert_eq!(pool.next_nonce(&ledger, &ctx, identity).await.unwrap(), 9);
        assert_eq!(pool.next_nonce(&ledger, &ctx, identity).await.unwrap(), 10);
        assert_eq!(ledger.nonce_queries(), 1);

        pool.invalidate(identity).await;
        assert_eq!(pool.next_nonce(&ledger, &ctx, identity).await.unwrap(), 9);
        assert_eq!(ledger.nonce_queries(), 2);
    }
}
