//! fhevm-client: Orchestration client for an FHE-enabled contract platform
//!
//! A thin, fully asynchronous layer between an application and the
//! platform's external capabilities:
//!
//! - [`Encryptor`] validates and encodes values, then delegates to the
//!   injected [`EncryptionProvider`]; batches run concurrently with
//!   input-order results and atomic failure.
//! - [`Decryptor`] drives both decryption paths: user-scoped (EIP-712
//!   authorization signed by the wallet) and public (oracle-mediated,
//!   unbounded latency, caller-applied timeouts).
//! - [`FhevmClient`] is the stateful façade: explicit configuration,
//!   idempotent `init()`, and pass-through contract `send`/`call`.
//!
//! All collaborators are injected as trait objects; the crate owns no
//! network connections, keys, or persisted state.

pub mod capability;
pub mod client;
pub mod config;
pub mod decrypt;
pub mod encrypt;

pub use capability::{
    ContractRuntime, DecryptionOracle, EncryptedOutput, EncryptionProvider, WalletSigner,
};
pub use client::{ClientBuilder, ClientState, FhevmClient};
pub use config::{ClientConfig, Network};
pub use decrypt::{DecryptionAuthorization, Decryptor};
pub use encrypt::Encryptor;

pub use fhevm_core::{ClearValue, EncryptedValue, Error, FheType, Result, TypedValue};
