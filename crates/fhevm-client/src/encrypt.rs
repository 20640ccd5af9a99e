//! Encryption orchestrator

use std::sync::Arc;

use futures::future;

use fhevm_core::{registry, EncryptedValue, Result, TypedValue};

use crate::capability::EncryptionProvider;

/// Validates and encodes values, then delegates to the encryption
/// capability. Stateless apart from the provider handle.
pub struct Encryptor {
    provider: Arc<dyn EncryptionProvider>,
}

impl Encryptor {
    pub fn new(provider: Arc<dyn EncryptionProvider>) -> Self {
        Self { provider }
    }

    /// Encrypt a single value.
    ///
    /// Fails `ValueOutOfRange` before the capability is invoked when the
    /// value does not fit its declared type.
    pub async fn encrypt_one(&self, item: TypedValue) -> Result<EncryptedValue> {
        registry::check_range(&item)?;

        let info = registry::resolve(item.ty.tag())?;
        let plaintext = registry::encode(&item);
        let out = self.provider.encrypt(plaintext, info.bit_width).await?;

        tracing::debug!(ty = %item.ty, has_handle = out.handle.is_some(), "encrypted value");

        Ok(EncryptedValue {
            ciphertext: out.ciphertext,
            type_tag: item.ty.tag(),
            handle: out.handle,
        })
    }

    /// Encrypt an ordered batch.
    ///
    /// All items are range-checked before any capability call, so a batch
    /// either produces every ciphertext or none; a partially encrypted
    /// batch is never handed back. Capability calls run concurrently and
    /// results keep input order regardless of completion order.
    pub async fn encrypt_batch(&self, items: Vec<TypedValue>) -> Result<Vec<EncryptedValue>> {
        for item in &items {
            registry::check_range(item)?;
        }

        let count = items.len();
        let encrypted =
            future::try_join_all(items.into_iter().map(|item| self.encrypt_one(item))).await?;

        tracing::debug!(count, "encrypted batch");
        Ok(encrypted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::EncryptedOutput;
    use alloy_primitives::{keccak256, Bytes};
    use async_trait::async_trait;
    use fhevm_core::{Error, FheType};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Identity "encryption": ciphertext == plaintext, handle == keccak.
    /// Optionally sleeps longer for smaller values so completion order is
    /// the reverse of submission order.
    struct IdentityProvider {
        staggered: bool,
        calls: AtomicUsize,
    }

    impl IdentityProvider {
        fn new(staggered: bool) -> Self {
            Self {
                staggered,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EncryptionProvider for IdentityProvider {
        async fn encrypt(&self, plaintext: Bytes, _bit_width: u32) -> Result<EncryptedOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.staggered {
                let value = plaintext.last().copied().unwrap_or(0) as u64;
                tokio::time::sleep(Duration::from_millis(256 - value)).await;
            }
            Ok(EncryptedOutput {
                handle: Some(keccak256(&plaintext)),
                ciphertext: plaintext,
            })
        }
    }

    #[tokio::test]
    async fn test_encrypt_one() {
        let enc = Encryptor::new(Arc::new(IdentityProvider::new(false)));
        let out = enc
            .encrypt_one(TypedValue::new(42u64, FheType::Uint8))
            .await
            .unwrap();
        assert_eq!(out.type_tag, FheType::Uint8.tag());
        assert_eq!(out.ciphertext.as_ref(), [42]);
        assert!(out.handle.is_some());
    }

    #[tokio::test]
    async fn test_encrypt_one_out_of_range() {
        let enc = Encryptor::new(Arc::new(IdentityProvider::new(false)));
        let err = enc
            .encrypt_one(TypedValue::new(300u64, FheType::Uint8))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ValueOutOfRange { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_order_matches_input_under_reversed_completion() {
        let enc = Encryptor::new(Arc::new(IdentityProvider::new(true)));

        // Smaller values finish last, so completion order is the reverse
        // of input order.
        let items: Vec<_> = (1u64..=8)
            .map(|v| TypedValue::new(v, FheType::Uint8))
            .collect();
        let out = enc.encrypt_batch(items).await.unwrap();

        assert_eq!(out.len(), 8);
        for (i, enc_value) in out.iter().enumerate() {
            assert_eq!(enc_value.ciphertext.as_ref(), [i as u8 + 1]);
        }
    }

    #[tokio::test]
    async fn test_batch_fails_atomically_before_capability_calls() {
        let provider = Arc::new(IdentityProvider::new(false));
        let enc = Encryptor::new(provider.clone());

        let items = vec![
            TypedValue::new(1u64, FheType::Uint8),
            TypedValue::new(70_000u64, FheType::Uint16), // out of range
            TypedValue::new(3u64, FheType::Uint8),
        ];
        let err = enc.encrypt_batch(items).await.unwrap_err();

        assert!(matches!(err, Error::ValueOutOfRange { .. }));
        // Upfront validation means the capability never ran.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let enc = Encryptor::new(Arc::new(IdentityProvider::new(false)));
        let out = enc.encrypt_batch(Vec::new()).await.unwrap();
        assert!(out.is_empty());
    }
}
