//! Authorization & decryption orchestrator
//!
//! Two paths out of ciphertext:
//!
//! - **User-scoped**: an EIP-712 authorization binds contract address,
//!   requester address, and ciphertext handle under a bounded validity
//!   window; the signed authorization accompanies the decryption request.
//! - **Public**: no signature, oracle-mediated, unbounded latency. The
//!   orchestrator imposes no timeout; callers bound the *local wait* with
//!   [`Decryptor::public_decrypt_with_timeout`] or
//!   [`Decryptor::public_decrypt_cancellable`]. Neither aborts the
//!   underlying oracle request, which this client does not own.
//!
//! A call moves pending -> authorizing (user path) -> requesting ->
//! settled, and settles exactly once.

use std::borrow::Cow;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{sol, Eip712Domain, SolStruct};
use parking_lot::Mutex;

use fhevm_core::{registry, ClearValue, EncryptedValue, Error, Result};

use crate::capability::{DecryptionOracle, WalletSigner};

/// Default validity window for a decryption authorization. Short by
/// design to limit the replay value of a captured signature.
pub const DEFAULT_AUTHORIZATION_TTL: Duration = Duration::from_secs(300);

/// EIP-712 domain name for decryption authorizations.
const EIP712_DOMAIN_NAME: &str = "FhevmDecryption";
const EIP712_DOMAIN_VERSION: &str = "1";

sol! {
    /// Structured message the user signs to authorize decryption of one
    /// ciphertext handle, scoped to a contract and requester.
    struct UserDecryptRequestVerification {
        bytes32 handle;
        address contractAddress;
        address userAddress;
        uint256 expiry;
    }
}

/// A signed, time-boxed decryption authorization. Never persisted beyond
/// process memory; valid only for the exact (contract, user, handle)
/// scope it was signed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptionAuthorization {
    pub contract: Address,
    pub user: Address,
    pub handle: B256,
    /// Unix timestamp after which the authorization is void.
    pub expiry: u64,
    /// Signature over the EIP-712 structured message.
    pub signature: Bytes,
}

impl DecryptionAuthorization {
    pub fn is_valid_at(&self, now: u64) -> bool {
        now < self.expiry
    }

    /// Whether this authorization covers the given scope exactly.
    pub fn covers(&self, contract: Address, user: Address, handle: B256) -> bool {
        self.contract == contract && self.user == user && self.handle == handle
    }
}

type AuthScope = (Address, Address, B256);

/// Drives both decryption paths against the injected oracle and signer.
pub struct Decryptor {
    oracle: Arc<dyn DecryptionOracle>,
    signer: Option<Arc<dyn WalletSigner>>,
    chain_id: u64,
    authorization_ttl: Duration,
    /// Valid authorizations, reusable while their window holds.
    auth_cache: Mutex<HashMap<AuthScope, DecryptionAuthorization>>,
    in_flight: AtomicUsize,
}

impl Decryptor {
    pub fn new(
        oracle: Arc<dyn DecryptionOracle>,
        signer: Option<Arc<dyn WalletSigner>>,
        chain_id: u64,
    ) -> Self {
        Self {
            oracle,
            signer,
            chain_id,
            authorization_ttl: DEFAULT_AUTHORIZATION_TTL,
            auth_cache: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Override the authorization validity window.
    pub fn with_authorization_ttl(mut self, ttl: Duration) -> Self {
        self.authorization_ttl = ttl;
        self
    }

    /// Number of decryption requests currently awaiting settlement.
    pub fn pending_decryptions(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// User-scoped decryption.
    ///
    /// Signs (or reuses) an authorization for the exact (contract, user,
    /// handle) scope, submits it with the handle, and decodes the
    /// plaintext under the ciphertext's stored type. A declined signature
    /// settles `SignatureRejected`; a lapsed validity window settles
    /// `AuthorizationExpired`.
    pub async fn user_decrypt(
        &self,
        encrypted: &EncryptedValue,
        contract: Address,
        user: Address,
    ) -> Result<ClearValue> {
        let info = registry::resolve(encrypted.type_tag)?;
        let handle = encrypted.require_handle()?;

        let authorization = self.authorize(contract, user, handle).await?;

        let now = unix_now();
        if !authorization.is_valid_at(now) {
            return Err(Error::AuthorizationExpired {
                expiry: authorization.expiry,
                now,
            });
        }

        tracing::debug!(
            %contract,
            %user,
            %handle,
            expiry = authorization.expiry,
            "requesting user decryption"
        );

        let _guard = FlightGuard::new(&self.in_flight);
        let plaintext = self
            .oracle
            .request_user_decryption(handle, &authorization)
            .await?;

        registry::decode(&plaintext, info.ty)
    }

    /// Public decryption. Awaits the oracle indefinitely.
    pub async fn public_decrypt(&self, encrypted: &EncryptedValue) -> Result<ClearValue> {
        let info = registry::resolve(encrypted.type_tag)?;
        let handle = encrypted.require_handle()?;

        tracing::debug!(%handle, "requesting public decryption");

        let _guard = FlightGuard::new(&self.in_flight);
        let plaintext = self.oracle.request_public_decryption(handle).await?;

        registry::decode(&plaintext, info.ty)
    }

    /// Public decryption with a caller-applied bound on the local wait.
    /// Settles `OracleTimeout` when the bound elapses; the underlying
    /// oracle request is not aborted.
    pub async fn public_decrypt_with_timeout(
        &self,
        encrypted: &EncryptedValue,
        wait: Duration,
    ) -> Result<ClearValue> {
        match tokio::time::timeout(wait, self.public_decrypt(encrypted)).await {
            Ok(result) => result,
            Err(_) => Err(Error::OracleTimeout { waited: wait }),
        }
    }

    /// Public decryption that abandons the local wait when `cancel`
    /// completes, settling `Cancelled`. The underlying oracle request is
    /// not aborted.
    pub async fn public_decrypt_cancellable(
        &self,
        encrypted: &EncryptedValue,
        cancel: impl Future<Output = ()>,
    ) -> Result<ClearValue> {
        tokio::select! {
            result = self.public_decrypt(encrypted) => result,
            _ = cancel => Err(Error::Cancelled),
        }
    }

    /// Produce (or reuse) a valid authorization for the given scope.
    async fn authorize(
        &self,
        contract: Address,
        user: Address,
        handle: B256,
    ) -> Result<DecryptionAuthorization> {
        let now = unix_now();

        if let Some(cached) = self.auth_cache.lock().get(&(contract, user, handle)) {
            if cached.is_valid_at(now) && cached.covers(contract, user, handle) {
                tracing::debug!(%contract, %user, "reusing cached authorization");
                return Ok(cached.clone());
            }
        }

        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| Error::InvalidConfig("no signer configured for user decryption".into()))?;

        let expiry = now + self.authorization_ttl.as_secs();
        let digest = self.signing_hash(contract, user, handle, expiry);

        // Suspends while the wallet waits for the user; rejection is an
        // expected, call-level outcome.
        let signature = signer.sign_hash(digest).await?;

        let authorization = DecryptionAuthorization {
            contract,
            user,
            handle,
            expiry,
            signature,
        };
        self.auth_cache
            .lock()
            .insert((contract, user, handle), authorization.clone());

        tracing::debug!(%contract, %user, expiry, "authorization signed");
        Ok(authorization)
    }

    /// EIP-712 signing hash binding the scope and window under the
    /// decryption domain.
    fn signing_hash(&self, contract: Address, user: Address, handle: B256, expiry: u64) -> B256 {
        let message = UserDecryptRequestVerification {
            handle,
            contractAddress: contract,
            userAddress: user,
            expiry: U256::from(expiry),
        };
        let domain = Eip712Domain::new(
            Some(Cow::Borrowed(EIP712_DOMAIN_NAME)),
            Some(Cow::Borrowed(EIP712_DOMAIN_VERSION)),
            Some(U256::from(self.chain_id)),
            Some(contract),
            None,
        );
        message.eip712_signing_hash(&domain)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// RAII in-flight counter guard.
struct FlightGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> FlightGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, keccak256};
    use alloy_signer::SignerSync;
    use alloy_signer_local::PrivateKeySigner;
    use async_trait::async_trait;
    use fhevm_core::FheType;

    const CHAIN_ID: u64 = 11_155_111;

    fn contract() -> Address {
        address!("2222222222222222222222222222222222222222")
    }

    /// Oracle that echoes a fixed plaintext per handle.
    struct EchoOracle {
        store: Mutex<HashMap<B256, Bytes>>,
    }

    impl EchoOracle {
        fn with(entries: &[(B256, &[u8])]) -> Arc<Self> {
            Arc::new(Self {
                store: Mutex::new(
                    entries
                        .iter()
                        .map(|(h, p)| (*h, Bytes::copy_from_slice(p)))
                        .collect(),
                ),
            })
        }
    }

    #[async_trait]
    impl DecryptionOracle for EchoOracle {
        async fn request_user_decryption(
            &self,
            handle: B256,
            authorization: &DecryptionAuthorization,
        ) -> Result<Bytes> {
            assert!(authorization.covers(authorization.contract, authorization.user, handle));
            self.request_public_decryption(handle).await
        }

        async fn request_public_decryption(&self, handle: B256) -> Result<Bytes> {
            self.store
                .lock()
                .get(&handle)
                .cloned()
                .ok_or_else(|| Error::DecryptionFailed(format!("unknown handle {handle}")))
        }
    }

    /// Oracle that never settles.
    struct StuckOracle;

    #[async_trait]
    impl DecryptionOracle for StuckOracle {
        async fn request_user_decryption(
            &self,
            _handle: B256,
            _authorization: &DecryptionAuthorization,
        ) -> Result<Bytes> {
            std::future::pending().await
        }

        async fn request_public_decryption(&self, _handle: B256) -> Result<Bytes> {
            std::future::pending().await
        }
    }

    /// Signer backed by a real private key, counting sign requests.
    struct LocalSigner {
        inner: PrivateKeySigner,
        signs: AtomicUsize,
    }

    impl LocalSigner {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                inner: PrivateKeySigner::random(),
                signs: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl WalletSigner for LocalSigner {
        fn address(&self) -> Address {
            self.inner.address()
        }

        async fn sign_hash(&self, hash: B256) -> Result<Bytes> {
            self.signs.fetch_add(1, Ordering::SeqCst);
            let signature = self
                .inner
                .sign_hash_sync(&hash)
                .map_err(|e| Error::transport(fhevm_core::Origin::Signer, e))?;
            Ok(Bytes::copy_from_slice(&signature.as_bytes()))
        }
    }

    /// Signer that always declines.
    struct RejectingSigner;

    #[async_trait]
    impl WalletSigner for RejectingSigner {
        fn address(&self) -> Address {
            Address::ZERO
        }

        async fn sign_hash(&self, _hash: B256) -> Result<Bytes> {
            Err(Error::SignatureRejected)
        }
    }

    fn encrypted(value: &[u8], ty: FheType) -> (EncryptedValue, B256) {
        let handle = keccak256(value);
        (
            EncryptedValue {
                ciphertext: Bytes::copy_from_slice(value),
                type_tag: ty.tag(),
                handle: Some(handle),
            },
            handle,
        )
    }

    #[tokio::test]
    async fn test_user_decrypt_round_trip() {
        let signer = LocalSigner::new();
        let user = signer.address();
        let (enc, handle) = encrypted(&[42], FheType::Uint8);
        let oracle = EchoOracle::with(&[(handle, &[42])]);

        let dec = Decryptor::new(oracle, Some(signer), CHAIN_ID);
        let value = dec.user_decrypt(&enc, contract(), user).await.unwrap();
        assert_eq!(value, ClearValue::Uint(42));
    }

    #[tokio::test]
    async fn test_signature_rejection_is_first_class() {
        let (enc, handle) = encrypted(&[1], FheType::Uint8);
        let oracle = EchoOracle::with(&[(handle, &[1])]);
        let dec = Decryptor::new(oracle, Some(Arc::new(RejectingSigner)), CHAIN_ID);

        let err = dec
            .user_decrypt(&enc, contract(), Address::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SignatureRejected));
    }

    #[tokio::test]
    async fn test_user_decrypt_without_signer() {
        let (enc, handle) = encrypted(&[1], FheType::Uint8);
        let oracle = EchoOracle::with(&[(handle, &[1])]);
        let dec = Decryptor::new(oracle, None, CHAIN_ID);

        let err = dec
            .user_decrypt(&enc, contract(), Address::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_authorization_reused_within_window() {
        let signer = LocalSigner::new();
        let user = signer.address();
        let (enc, handle) = encrypted(&[7], FheType::Uint8);
        let oracle = EchoOracle::with(&[(handle, &[7])]);
        let dec = Decryptor::new(oracle, Some(signer.clone()), CHAIN_ID);

        dec.user_decrypt(&enc, contract(), user).await.unwrap();
        dec.user_decrypt(&enc, contract(), user).await.unwrap();
        assert_eq!(signer.signs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_authorization_not_reused_across_contracts() {
        let signer = LocalSigner::new();
        let user = signer.address();
        let (enc, handle) = encrypted(&[7], FheType::Uint8);
        let oracle = EchoOracle::with(&[(handle, &[7])]);
        let dec = Decryptor::new(oracle, Some(signer.clone()), CHAIN_ID);

        dec.user_decrypt(&enc, contract(), user).await.unwrap();
        let other = address!("3333333333333333333333333333333333333333");
        dec.user_decrypt(&enc, other, user).await.unwrap();
        assert_eq!(signer.signs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_ttl_expires_immediately() {
        let signer = LocalSigner::new();
        let user = signer.address();
        let (enc, handle) = encrypted(&[7], FheType::Uint8);
        let oracle = EchoOracle::with(&[(handle, &[7])]);
        let dec = Decryptor::new(oracle, Some(signer), CHAIN_ID)
            .with_authorization_ttl(Duration::ZERO);

        let err = dec.user_decrypt(&enc, contract(), user).await.unwrap_err();
        assert!(matches!(err, Error::AuthorizationExpired { .. }));
    }

    #[tokio::test]
    async fn test_public_decrypt_round_trip() {
        let (enc, handle) = encrypted(&[0, 0, 0, 99], FheType::Uint32);
        let oracle = EchoOracle::with(&[(handle, &[0, 0, 0, 99])]);
        let dec = Decryptor::new(oracle, None, CHAIN_ID);

        let value = dec.public_decrypt(&enc).await.unwrap();
        assert_eq!(value, ClearValue::Uint(99));
    }

    #[tokio::test]
    async fn test_unknown_handle_fails_decryption() {
        let (enc, _) = encrypted(&[5], FheType::Uint8);
        let oracle = EchoOracle::with(&[]);
        let dec = Decryptor::new(oracle, None, CHAIN_ID);

        let err = dec.public_decrypt(&enc).await.unwrap_err();
        assert!(matches!(err, Error::DecryptionFailed(_)));
    }

    #[tokio::test]
    async fn test_unsupported_stored_tag_never_coerces() {
        let enc = EncryptedValue {
            ciphertext: Bytes::from(vec![5u8]),
            type_tag: 0x2a,
            handle: Some(B256::repeat_byte(1)),
        };
        let oracle = EchoOracle::with(&[(B256::repeat_byte(1), &[5])]);
        let dec = Decryptor::new(oracle, None, CHAIN_ID);

        let err = dec.public_decrypt(&enc).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedType(0x2a)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_timeout_settles_oracle_timeout() {
        let (enc, _) = encrypted(&[1], FheType::Uint8);
        let dec = Decryptor::new(Arc::new(StuckOracle), None, CHAIN_ID);

        let err = dec
            .public_decrypt_with_timeout(&enc, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::OracleTimeout { .. }));
    }

    #[tokio::test]
    async fn test_cancellation_abandons_local_wait() {
        let (enc, _) = encrypted(&[1], FheType::Uint8);
        let dec = Decryptor::new(Arc::new(StuckOracle), None, CHAIN_ID);

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        tx.send(()).unwrap();
        let err = dec
            .public_decrypt_cancellable(&enc, async {
                let _ = rx.await;
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_counter() {
        let (enc, _) = encrypted(&[1], FheType::Uint8);
        let dec = Arc::new(Decryptor::new(Arc::new(StuckOracle), None, CHAIN_ID));
        assert_eq!(dec.pending_decryptions(), 0);

        let waiter = {
            let dec = dec.clone();
            let enc = enc.clone();
            tokio::spawn(async move {
                dec.public_decrypt_with_timeout(&enc, Duration::from_secs(1))
                    .await
            })
        };
        tokio::task::yield_now().await;
        assert_eq!(dec.pending_decryptions(), 1);

        let err = waiter.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::OracleTimeout { .. }));
        assert_eq!(dec.pending_decryptions(), 0);
    }

    #[test]
    fn test_signing_hash_binds_scope_and_window() {
        let dec = Decryptor::new(Arc::new(StuckOracle), None, CHAIN_ID);
        let handle = B256::repeat_byte(9);
        let user = address!("4444444444444444444444444444444444444444");

        let base = dec.signing_hash(contract(), user, handle, 1000);
        assert_ne!(base, dec.signing_hash(contract(), user, handle, 1001));
        assert_ne!(
            base,
            dec.signing_hash(contract(), user, B256::repeat_byte(8), 1000)
        );
        let other = address!("5555555555555555555555555555555555555555");
        assert_ne!(base, dec.signing_hash(other, user, handle, 1000));
        assert_ne!(base, dec.signing_hash(contract(), other, handle, 1000));
    }
}
