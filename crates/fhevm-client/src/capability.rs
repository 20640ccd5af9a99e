//! Trait boundaries to the external collaborators
//!
//! Everything the platform does for us crosses one of these seams: the
//! FHE engine, the decryption oracle, the wallet signer, and the contract
//! runtime. The client never reaches around them, which is also what
//! makes the orchestration layer testable with in-process stubs.

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;

use fhevm_core::Result;

use crate::config::ClientConfig;
use crate::decrypt::DecryptionAuthorization;

/// Output of one encryption capability call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedOutput {
    /// Opaque ciphertext bytes.
    pub ciphertext: Bytes,
    /// Handle identifying the ciphertext for later decryption, if the
    /// capability assigns one.
    pub handle: Option<B256>,
}

/// The FHE encryption engine. CPU-bound, no network.
#[async_trait]
pub trait EncryptionProvider: Send + Sync {
    /// Encrypt fixed-width plaintext bytes under the given bit width.
    async fn encrypt(&self, plaintext: Bytes, bit_width: u32) -> Result<EncryptedOutput>;
}

/// The platform's decryption service.
#[async_trait]
pub trait DecryptionOracle: Send + Sync {
    /// User-scoped decryption, gated by a signed authorization.
    async fn request_user_decryption(
        &self,
        handle: B256,
        authorization: &DecryptionAuthorization,
    ) -> Result<Bytes>;

    /// Public decryption settled by the external oracle. Latency is
    /// unbounded; callers apply their own timeout.
    async fn request_public_decryption(&self, handle: B256) -> Result<Bytes>;
}

/// A wallet capable of signing 32-byte digests.
///
/// A declined request surfaces as [`fhevm_core::Error::SignatureRejected`]
/// so callers can treat it as an expected outcome.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Address the signatures are attributable to.
    fn address(&self) -> Address;

    /// Sign a prehashed 32-byte digest. Suspends while the wallet waits
    /// for user interaction.
    async fn sign_hash(&self, hash: B256) -> Result<Bytes>;
}

/// Binding to the contract runtime. Pure pass-through: no retry and no
/// interpretation of contract-specific semantics on this side.
#[async_trait]
pub trait ContractRuntime: Send + Sync {
    /// Establish the provider connection for this configuration. Invoked
    /// exactly once per client by `init()`.
    async fn establish(&self, config: &ClientConfig) -> Result<()>;

    /// Submit a state-changing contract call; returns the transaction
    /// hash.
    async fn send(&self, method: &str, args: Vec<serde_json::Value>) -> Result<B256>;

    /// Read-only contract call.
    async fn call(&self, method: &str, args: Vec<serde_json::Value>) -> Result<Bytes>;
}
