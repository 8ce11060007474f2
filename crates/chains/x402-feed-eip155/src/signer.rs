//! The wallet that pays.
//!
//! The signing primitive itself lives outside this crate: anything that can
//! report its address and sign a 32-byte digest is a [`WalletSigner`]. The
//! shipped binary uses alloy's [`PrivateKeySigner`].

use alloy_primitives::{Address, B256, Signature};
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use x402_feed_types::chain::ChainId;

/// Signs EIP-712 digests on behalf of one address.
///
/// Implemented for [`PrivateKeySigner`] and for `Arc<T>`, since alloy's own
/// `Signer` trait is not implemented for `Arc`.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn address(&self) -> Address;

    async fn sign_hash(&self, hash: &B256) -> Result<Signature, alloy_signer::Error>;
}

#[async_trait]
impl WalletSigner for PrivateKeySigner {
    fn address(&self) -> Address {
        PrivateKeySigner::address(self)
    }

    async fn sign_hash(&self, hash: &B256) -> Result<Signature, alloy_signer::Error> {
        alloy_signer::Signer::sign_hash(self, hash).await
    }
}

#[async_trait]
impl<T: WalletSigner + ?Sized> WalletSigner for Arc<T> {
    fn address(&self) -> Address {
        (**self).address()
    }

    async fn sign_hash(&self, hash: &B256) -> Result<Signature, alloy_signer::Error> {
        (**self).sign_hash(hash).await
    }
}

/// Runs at most one sign call at a time on the wrapped signer.
///
/// For signers that are not safe for concurrent use, such as hardware wallets.
/// The lock is held only around the sign call itself.
pub struct SerializedSigner<S> {
    inner: S,
    lock: Mutex<()>,
}

impl<S> SerializedSigner<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            lock: Mutex::new(()),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for SerializedSigner<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SerializedSigner").field(&self.inner).finish()
    }
}

#[async_trait]
impl<S: WalletSigner> WalletSigner for SerializedSigner<S> {
    fn address(&self) -> Address {
        self.inner.address()
    }

    async fn sign_hash(&self, hash: &B256) -> Result<Signature, alloy_signer::Error> {
        let _guard = self.lock.lock().await;
        self.inner.sign_hash(hash).await
    }
}

/// The paying wallet: its address, home network and signer.
///
/// Built once at startup and shared behind an `Arc`. There is no way to change
/// any of it afterwards.
pub struct WalletIdentity<S> {
    address: Address,
    network: ChainId,
    signer: S,
}

impl<S: WalletSigner> WalletIdentity<S> {
    pub fn new(signer: S, network: ChainId) -> Self {
        Self {
            address: signer.address(),
            network,
            signer,
        }
    }
}

impl<S> WalletIdentity<S> {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn network(&self) -> &ChainId {
        &self.network
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }
}

impl<S> fmt::Debug for WalletIdentity<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletIdentity")
            .field("address", &self.address)
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}
