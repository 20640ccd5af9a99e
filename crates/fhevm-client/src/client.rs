//! Client façade
//!
//! Owns the lifecycle (uninitialized -> initializing -> ready | failed)
//! and composes the encryption and decryption orchestrators with the
//! pass-through contract runtime. Every collaborator is injected through
//! [`ClientBuilder`]; instances are independent, so multiple clients can
//! coexist without shared globals.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256};
use parking_lot::RwLock;
use tokio::sync::OnceCell;

use fhevm_core::{ClearValue, EncryptedValue, Error, Result, TypedValue};

use crate::capability::{ContractRuntime, DecryptionOracle, EncryptionProvider, WalletSigner};
use crate::config::ClientConfig;
use crate::decrypt::Decryptor;
use crate::encrypt::Encryptor;

/// Client lifecycle state. Transitions are one-directional except
/// `Failed -> Initializing` on retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

/// Stateful client for an FHE-enabled contract.
pub struct FhevmClient {
    config: ClientConfig,
    runtime: Arc<dyn ContractRuntime>,
    encryptor: Encryptor,
    decryptor: Decryptor,
    state: RwLock<ClientState>,
    /// Set exactly once on successful establishment; a failed attempt
    /// leaves it empty so a retry can run.
    established: OnceCell<()>,
}

impl std::fmt::Debug for FhevmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FhevmClient")
            .field("config", &self.config)
            .field("state", &*self.state.read())
            .finish_non_exhaustive()
    }
}

impl FhevmClient {
    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ClientState {
        *self.state.read()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Validate the configuration and establish the provider connection.
    ///
    /// Idempotent under concurrency: only the first caller performs
    /// establishment; concurrent callers await that same attempt and
    /// observe its outcome. After a failure the client is `Failed` and
    /// `init()` may be retried.
    pub async fn init(&self) -> Result<()> {
        self.established
            .get_or_try_init(|| async {
                *self.state.write() = ClientState::Initializing;

                if let Err(e) = self.config.validate() {
                    *self.state.write() = ClientState::Failed;
                    return Err(e);
                }

                match self.runtime.establish(&self.config).await {
                    Ok(()) => {
                        *self.state.write() = ClientState::Ready;
                        tracing::info!(
                            network = %self.config.network,
                            contract = %self.config.contract_address,
                            "client initialized"
                        );
                        Ok(())
                    }
                    Err(e) => {
                        *self.state.write() = ClientState::Failed;
                        tracing::error!(error = %e, "client initialization failed");
                        Err(e)
                    }
                }
            })
            .await
            .map(|_| ())
    }

    fn require_ready(&self) -> Result<()> {
        if self.state() == ClientState::Ready {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    /// Encrypt a single value.
    pub async fn encrypt_one(&self, item: TypedValue) -> Result<EncryptedValue> {
        self.require_ready()?;
        self.encryptor.encrypt_one(item).await
    }

    /// Encrypt an ordered batch; atomic, order-preserving.
    pub async fn encrypt_batch(&self, items: Vec<TypedValue>) -> Result<Vec<EncryptedValue>> {
        self.require_ready()?;
        self.encryptor.encrypt_batch(items).await
    }

    /// User-scoped decryption authorized by an EIP-712 signature.
    pub async fn user_decrypt(
        &self,
        encrypted: &EncryptedValue,
        contract: Address,
        user: Address,
    ) -> Result<ClearValue> {
        self.require_ready()?;
        self.decryptor.user_decrypt(encrypted, contract, user).await
    }

    /// Oracle-mediated public decryption; awaits indefinitely.
    pub async fn public_decrypt(&self, encrypted: &EncryptedValue) -> Result<ClearValue> {
        self.require_ready()?;
        self.decryptor.public_decrypt(encrypted).await
    }

    /// Public decryption with a bound on the local wait.
    pub async fn public_decrypt_with_timeout(
        &self,
        encrypted: &EncryptedValue,
        wait: Duration,
    ) -> Result<ClearValue> {
        self.require_ready()?;
        self.decryptor
            .public_decrypt_with_timeout(encrypted, wait)
            .await
    }

    /// Public decryption that abandons the local wait when `cancel`
    /// completes.
    pub async fn public_decrypt_cancellable(
        &self,
        encrypted: &EncryptedValue,
        cancel: impl Future<Output = ()>,
    ) -> Result<ClearValue> {
        self.require_ready()?;
        self.decryptor
            .public_decrypt_cancellable(encrypted, cancel)
            .await
    }

    /// Number of decryption requests currently awaiting settlement.
    pub fn pending_decryptions(&self) -> usize {
        self.decryptor.pending_decryptions()
    }

    /// Submit a state-changing contract call. Pure delegation to the
    /// contract runtime; no retry, no interpretation.
    pub async fn send(&self, method: &str, args: Vec<serde_json::Value>) -> Result<B256> {
        self.require_ready()?;
        self.runtime.send(method, args).await
    }

    /// Read-only contract call. Pure delegation.
    pub async fn call(&self, method: &str, args: Vec<serde_json::Value>) -> Result<Bytes> {
        self.require_ready()?;
        self.runtime.call(method, args).await
    }
}

/// Wires the external collaborators into a client instance.
pub struct ClientBuilder {
    config: ClientConfig,
    encryption: Option<Arc<dyn EncryptionProvider>>,
    oracle: Option<Arc<dyn DecryptionOracle>>,
    runtime: Option<Arc<dyn ContractRuntime>>,
    signer: Option<Arc<dyn WalletSigner>>,
    authorization_ttl: Option<Duration>,
}

impl ClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            encryption: None,
            oracle: None,
            runtime: None,
            signer: None,
            authorization_ttl: None,
        }
    }

    pub fn encryption(mut self, provider: Arc<dyn EncryptionProvider>) -> Self {
        self.encryption = Some(provider);
        self
    }

    pub fn oracle(mut self, oracle: Arc<dyn DecryptionOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn runtime(mut self, runtime: Arc<dyn ContractRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Optional: user-scoped decryption is unavailable without a signer.
    pub fn signer(mut self, signer: Arc<dyn WalletSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn authorization_ttl(mut self, ttl: Duration) -> Self {
        self.authorization_ttl = Some(ttl);
        self
    }

    /// Build an uninitialized client. Fails `InvalidConfig` when a
    /// required collaborator is missing; config semantics are validated
    /// later by `init()`.
    pub fn build(self) -> Result<FhevmClient> {
        let encryption = self
            .encryption
            .ok_or_else(|| Error::InvalidConfig("encryption provider is required".into()))?;
        let oracle = self
            .oracle
            .ok_or_else(|| Error::InvalidConfig("decryption oracle is required".into()))?;
        let runtime = self
            .runtime
            .ok_or_else(|| Error::InvalidConfig("contract runtime is required".into()))?;

        let mut decryptor = Decryptor::new(oracle, self.signer, self.config.network.chain_id());
        if let Some(ttl) = self.authorization_ttl {
            decryptor = decryptor.with_authorization_ttl(ttl);
        }

        Ok(FhevmClient {
            config: self.config,
            runtime,
            encryptor: Encryptor::new(encryption),
            decryptor,
            state: RwLock::new(ClientState::Uninitialized),
            established: OnceCell::new(),
        })
    }
}
